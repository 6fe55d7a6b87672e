/// Static metadata extraction
///
/// Reads the `NAME`, `DESCRIPTION` and `PARAMETERS` constants of a script by
/// parsing it, never by running it. Only top-level bindings whose right-hand
/// side is a literal are considered:
///
/// ```rhai
/// const NAME = "Kitchen lights";
/// const DESCRIPTION = "Turn the kitchen lights on or off";
/// const PARAMETERS = #{
///     brightness: #{ description: "0-255", type: "integer", "default": 255 },
/// };
/// ```
///
/// `default` is a reserved word in Rhai and must be written as a quoted key.
/// An unquoted `default:` is a syntax error, so the script fails to parse and
/// discovery skips it with a warning.
use rhai::{Engine, OptimizationLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::ScriptError;
use super::value::ExportableValue;

pub const NAME_CONSTANT: &str = "NAME";
pub const DESCRIPTION_CONSTANT: &str = "DESCRIPTION";
pub const PARAMETERS_CONSTANT: &str = "PARAMETERS";

/// Parameter every capability accepts implicitly
pub const CACHE_PARAMETER: &str = "cache";

/// Declared schema of one capability parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ParameterSpec {
    fn cache() -> Self {
        Self {
            name: Some("Cache".to_string()),
            description: Some("Reuse the compiled script between calls".to_string()),
            required: false,
            default: Some(serde_json::Value::Bool(true)),
            example: None,
            kind: Some("boolean".to_string()),
        }
    }
}

/// Human-facing description of a capability
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ScriptMetadata {
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, ParameterSpec>,
}

impl ScriptMetadata {
    /// Metadata for a capability with nothing declared
    pub fn with_defaults(default_name: &str) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(CACHE_PARAMETER.to_string(), ParameterSpec::cache());

        Self {
            name: default_name.to_string(),
            description: String::new(),
            parameters,
        }
    }
}

/// Parse-only extractor, independent of the execution engine
pub struct MetadataExtractor {
    parser: Engine,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    pub fn new() -> Self {
        // No packages, no resolver, no folding: `1 + 2` stays an expression
        let mut parser = Engine::new_raw();
        parser.set_optimization_level(OptimizationLevel::None);
        Self { parser }
    }

    /// Extract metadata from script contents.
    ///
    /// Fails only when the contents do not parse. Fields that are missing,
    /// non-literal, or of the wrong shape fall back to their defaults.
    pub fn extract(
        &self,
        contents: &str,
        origin: &str,
        default_name: &str,
    ) -> Result<ScriptMetadata, ScriptError> {
        let ast = self.parser.compile(contents).map_err(|e| ScriptError::Syntax {
            origin: origin.to_string(),
            message: e.err_type().to_string(),
            line: e.position().line(),
        })?;

        let mut metadata = ScriptMetadata::with_defaults(default_name);

        for (name, _, value) in ast.iter_literal_variables(true, true) {
            let Some(value) = ExportableValue::from_dynamic(&value) else {
                continue;
            };

            match name {
                NAME_CONSTANT => match value {
                    ExportableValue::Text(text) => metadata.name = text,
                    other => ignored(origin, name, &other),
                },
                DESCRIPTION_CONSTANT => match value {
                    ExportableValue::Text(text) => metadata.description = text,
                    other => ignored(origin, name, &other),
                },
                PARAMETERS_CONSTANT => match parse_parameters(value) {
                    Ok(parameters) => metadata.parameters.extend(parameters),
                    Err(e) => {
                        tracing::debug!(origin = origin, error = %e, "ignoring PARAMETERS");
                    }
                },
                _ => {}
            }
        }

        metadata
            .parameters
            .insert(CACHE_PARAMETER.to_string(), ParameterSpec::cache());

        Ok(metadata)
    }
}

fn ignored(origin: &str, name: &str, value: &ExportableValue) {
    tracing::debug!(
        origin = origin,
        constant = name,
        found = value.type_name(),
        "ignoring metadata constant with unexpected type"
    );
}

fn parse_parameters(
    value: ExportableValue,
) -> Result<BTreeMap<String, ParameterSpec>, serde_json::Error> {
    serde_json::from_value(serde_json::Value::from(value))
}

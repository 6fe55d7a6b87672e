/// Script executor
///
/// Runs a compiled unit and shapes the outcome into a response. A runtime
/// fault never escapes: it becomes an error-shaped response.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::engine::{CompiledUnit, ScriptEngine};
use super::harvest::{select_outputs, SeedBindings, RESERVED_NAMES};
use super::value::ExportableValue;

/// Binding read as `stdout` under the process convention
pub const RETURN_RESPONSE_BINDING: &str = "return_response";

/// Exit code reported for a failed run under the process convention
pub const FAILURE_RETURNCODE: i32 = 13;

/// Shape of the payload returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseConvention {
    /// Harvested bindings, or `{error}`
    #[default]
    Bindings,
    /// `{stdout, stderr, returncode}`
    Process,
}

impl fmt::Display for ResponseConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bindings => write!(f, "bindings"),
            Self::Process => write!(f, "process"),
        }
    }
}

impl FromStr for ResponseConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bindings" => Ok(Self::Bindings),
            "process" => Ok(Self::Process),
            other => Err(format!(
                "Invalid response convention '{}'. Valid options: bindings, process",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScriptResponse {
    Process {
        stdout: ExportableValue,
        stderr: String,
        returncode: i32,
    },
    Error {
        error: String,
    },
    Bindings(BTreeMap<String, ExportableValue>),
}

impl ScriptResponse {
    pub fn is_error(&self) -> bool {
        match self {
            Self::Error { .. } => true,
            Self::Process { returncode, .. } => *returncode != 0,
            Self::Bindings(_) => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

pub struct Executor {
    engine: Arc<ScriptEngine>,
    convention: ResponseConvention,
}

impl Executor {
    pub fn new(engine: Arc<ScriptEngine>, convention: ResponseConvention) -> Self {
        Self { engine, convention }
    }

    pub fn convention(&self) -> ResponseConvention {
        self.convention
    }

    /// Run `unit` against a fresh namespace seeded with `seed`
    pub fn run(&self, unit: &CompiledUnit, seed: &SeedBindings) -> ScriptResponse {
        let namespace = match self.engine.execute(unit, seed) {
            Ok(namespace) => namespace,
            Err(message) => {
                tracing::error!(
                    operation = "execute",
                    status = "error",
                    origin = unit.origin(),
                    error = %message,
                    "Error executing script"
                );
                return self.failure(message);
            }
        };

        tracing::debug!(operation = "execute", status = "ok", origin = unit.origin());

        match self.convention {
            ResponseConvention::Bindings => {
                ScriptResponse::Bindings(select_outputs(seed, &namespace, RESERVED_NAMES))
            }
            // A script that sets no `return_response` answers with an empty object
            ResponseConvention::Process => match namespace.get(RETURN_RESPONSE_BINDING) {
                Some(Some(stdout)) if *stdout != ExportableValue::Null => ScriptResponse::Process {
                    stdout: stdout.clone(),
                    stderr: String::new(),
                    returncode: 0,
                },
                _ => ScriptResponse::Bindings(BTreeMap::new()),
            },
        }
    }

    fn failure(&self, message: String) -> ScriptResponse {
        match self.convention {
            ResponseConvention::Bindings => ScriptResponse::Error { error: message },
            ResponseConvention::Process => ScriptResponse::Process {
                stdout: ExportableValue::Text(String::new()),
                stderr: format!("Error executing script: {}", message),
                returncode: FAILURE_RETURNCODE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::engine::INLINE_ORIGIN;
    use serde_json::json;
    use tempfile::TempDir;

    fn run(convention: ResponseConvention, source: &str) -> ScriptResponse {
        let temp = TempDir::new().unwrap();
        let engine = Arc::new(ScriptEngine::new(temp.path(), "rhai"));
        let unit = engine.compile(source, INLINE_ORIGIN).unwrap();
        Executor::new(engine, convention).run(&unit, &SeedBindings::new())
    }

    #[test]
    fn test_function_definitions_are_not_harvested() {
        let response = run(
            ResponseConvention::Bindings,
            r#"
fn half(x) { x / 2 }
let doubled = half(246);
let out = doubled;
"#,
        );
        assert_eq!(response.to_json(), json!({"doubled": 123, "out": 123}));
    }

    #[test]
    fn test_function_then_out_yields_only_out() {
        let response = run(
            ResponseConvention::Bindings,
            r#"
fn greet(name) { "hello " + name }
greet("kitchen");
let out = 123;
"#,
        );
        assert_eq!(response.to_json(), json!({"out": 123}));
    }

    #[test]
    fn test_import_inside_uncalled_function_is_harmless() {
        let response = run(
            ResponseConvention::Bindings,
            r#"
fn load() {
    import "./missing" as missing;
    missing::value
}
let out = 123;
"#,
        );
        assert_eq!(response.to_json(), json!({"out": 123}));
    }

    #[test]
    fn test_failing_top_level_import_yields_error() {
        let response = run(
            ResponseConvention::Bindings,
            r#"
import "./missing" as missing;
let out = 123;
"#,
        );
        assert!(response.is_error());

        let json = response.to_json();
        assert!(json.get("out").is_none());
        assert!(json["error"].as_str().unwrap().contains("missing"));
    }

    #[test]
    fn test_process_convention_success() {
        let response = run(
            ResponseConvention::Process,
            r#"let return_response = "done"; let other = 1;"#,
        );
        assert_eq!(
            response.to_json(),
            json!({"stdout": "done", "stderr": "", "returncode": 0})
        );
    }

    #[test]
    fn test_process_convention_without_return_response_is_empty() {
        let response = run(ResponseConvention::Process, "let other = 1;");
        assert_eq!(response.to_json(), json!({}));
        assert!(!response.is_error());

        let response = run(ResponseConvention::Process, "let return_response = ();");
        assert_eq!(response.to_json(), json!({}));
    }

    #[test]
    fn test_process_convention_failure() {
        let response = run(ResponseConvention::Process, r#"throw "boom";"#);
        let json = response.to_json();
        assert_eq!(json["returncode"], json!(13));
        assert_eq!(json["stdout"], json!(""));
        assert!(json["stderr"]
            .as_str()
            .unwrap()
            .starts_with("Error executing script: "));
    }

    #[test]
    fn test_convention_parsing() {
        assert_eq!(
            "process".parse::<ResponseConvention>().unwrap(),
            ResponseConvention::Process
        );
        assert!("xml".parse::<ResponseConvention>().is_err());
        assert_eq!(ResponseConvention::default().to_string(), "bindings");
    }
}

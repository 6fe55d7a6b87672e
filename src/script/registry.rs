//! Registered capabilities
//!
//! The set of independently invocable capabilities. Two built-ins are always
//! present; everything else is replaced wholesale by each discovery pass.
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use super::discovery::DiscoveredScript;
use super::metadata::{ParameterSpec, ScriptMetadata};

/// Ad-hoc execution of a `file` or inline `source`
pub const EXEC_CAPABILITY: &str = "exec";
/// Re-run discovery
pub const RELOAD_CAPABILITY: &str = "reload";

/// Capabilities that survive every discovery pass
pub const PROTECTED_CAPABILITIES: &[&str] = &[EXEC_CAPABILITY, RELOAD_CAPABILITY];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum CapabilityHandler {
    /// Runs the request's own `file` or `source`
    Inline,
    /// Triggers a discovery pass
    Reload,
    /// Runs a discovered script file
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredCapability {
    pub identifier: String,
    pub handler: CapabilityHandler,
    pub metadata: ScriptMetadata,
}

impl RegisteredCapability {
    fn exec() -> Self {
        let mut metadata = ScriptMetadata::with_defaults("Execute script");
        metadata.description = "Run a script file or inline source".to_string();
        metadata.parameters.insert(
            "file".to_string(),
            ParameterSpec {
                description: Some("Path of the script, relative to the config directory".to_string()),
                example: Some(serde_json::Value::from("scripts/hello.rhai")),
                kind: Some("string".to_string()),
                ..Default::default()
            },
        );
        metadata.parameters.insert(
            "source".to_string(),
            ParameterSpec {
                description: Some("Inline script source".to_string()),
                example: Some(serde_json::Value::from("let out = 1 + 2;")),
                kind: Some("string".to_string()),
                ..Default::default()
            },
        );

        Self {
            identifier: EXEC_CAPABILITY.to_string(),
            handler: CapabilityHandler::Inline,
            metadata,
        }
    }

    fn reload() -> Self {
        Self {
            identifier: RELOAD_CAPABILITY.to_string(),
            handler: CapabilityHandler::Reload,
            metadata: ScriptMetadata {
                name: "Reload scripts".to_string(),
                description: "Rescan the script directory".to_string(),
                parameters: BTreeMap::new(),
            },
        }
    }
}

impl From<DiscoveredScript> for RegisteredCapability {
    fn from(script: DiscoveredScript) -> Self {
        Self {
            identifier: script.identifier,
            handler: CapabilityHandler::File(script.path),
            metadata: script.metadata,
        }
    }
}

/// Thread-safe capability set.
///
/// Lookups hand out `Arc`s, so an invocation that resolved a capability keeps
/// running even if a discovery pass removes it meanwhile.
pub struct CapabilityRegistry {
    capabilities: RwLock<BTreeMap<String, Arc<RegisteredCapability>>>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    /// Registry holding only the built-in capabilities
    pub fn new() -> Self {
        let mut capabilities = BTreeMap::new();
        for builtin in [RegisteredCapability::exec(), RegisteredCapability::reload()] {
            capabilities.insert(builtin.identifier.clone(), Arc::new(builtin));
        }

        Self {
            capabilities: RwLock::new(capabilities),
        }
    }

    pub fn get(&self, identifier: &str) -> Option<Arc<RegisteredCapability>> {
        self.capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identifier)
            .cloned()
    }

    /// All capabilities, ordered by identifier
    pub fn list(&self) -> Vec<Arc<RegisteredCapability>> {
        self.capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Remove every non-protected capability and register `scripts` instead
    pub fn replace_discovered(&self, scripts: Vec<DiscoveredScript>) -> usize {
        let mut capabilities = self
            .capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let before = capabilities.len();
        capabilities.retain(|id, _| PROTECTED_CAPABILITIES.contains(&id.as_str()));
        let removed = before - capabilities.len();

        let mut added = 0;
        for script in scripts {
            if PROTECTED_CAPABILITIES.contains(&script.identifier.as_str()) {
                continue;
            }
            let capability = RegisteredCapability::from(script);
            capabilities.insert(capability.identifier.clone(), Arc::new(capability));
            added += 1;
        }

        tracing::info!(
            operation = "registry.replace",
            removed = removed,
            added = added,
            "capabilities registered"
        );

        added
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::script::{CapabilityHandler, ParameterSpec, RegisteredCapability};

// ============================================================================
// Health API
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub capabilities: usize,
    pub cached_units: usize,
}

// ============================================================================
// Services API
// ============================================================================

/// One registered capability as listed by `GET /api/services`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ServiceInfo {
    pub identifier: String,
    pub name: String,
    pub description: String,
    pub fields: BTreeMap<String, ParameterSpec>,
    /// Script path for discovered capabilities, absent for built-ins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl From<&RegisteredCapability> for ServiceInfo {
    fn from(capability: &RegisteredCapability) -> Self {
        let file = match &capability.handler {
            CapabilityHandler::File(path) => Some(path.display().to_string()),
            CapabilityHandler::Inline | CapabilityHandler::Reload => None,
        };

        Self {
            identifier: capability.identifier.clone(),
            name: capability.metadata.name.clone(),
            description: capability.metadata.description.clone(),
            fields: capability.metadata.parameters.clone(),
            file,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InvokeQuery {
    #[serde(default)]
    pub return_response: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

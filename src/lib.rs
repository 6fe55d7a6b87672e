// Library interface for ScriptPro
// The binary and the integration tests both build on these modules

pub mod api;
pub mod cli;
pub mod cli_utils;
pub mod commands;
pub mod config;
pub mod config_discovery;
pub mod hot_reload;
pub mod http;
pub mod logging;
pub mod merger;
pub mod script;
pub mod xdg;

// Re-export commonly used types
pub use config::ScriptProConfig;
pub use config_discovery::{discover_config, load_config_with_discovery};
pub use script::{Dispatcher, InvocationRequest, ResponseConvention, ScriptError, ScriptResponse};

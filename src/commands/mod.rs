pub mod call;
pub mod check;
pub mod config;
pub mod exec;
pub mod list;
pub mod serve;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::cli::InvocationArgs;
use crate::script::ScriptResponse;

/// Collect `-p key=value` pairs into a payload object
fn params_payload(args: &InvocationArgs) -> Map<String, Value> {
    args.params.iter().cloned().collect()
}

/// Print a response as pretty JSON on stdout and exit non-zero if the script failed
fn finish(response: Option<ScriptResponse>) -> Result<()> {
    let Some(response) = response else {
        return Ok(());
    };

    let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
    println!("{}", json);

    match response {
        ScriptResponse::Process { returncode, .. } if returncode != 0 => {
            std::process::exit(returncode)
        }
        ScriptResponse::Error { .. } => std::process::exit(1),
        _ => Ok(()),
    }
}

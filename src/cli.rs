use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::script::ResponseConvention;

/// ScriptPro - on-demand script execution engine
///
/// Runs Rhai scripts from a script directory or inline source, caches their
/// compiled form, and returns the bindings they leave behind as JSON.
#[derive(Parser, Debug)]
#[command(name = "scriptpro")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "On-demand script execution engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Common configuration arguments shared across commands
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonConfigArgs {
    /// Config file path
    #[arg(short = 'c', long, env = "SCRIPTPRO_CONFIG")]
    pub config: Option<String>,

    /// Script directory (discovery root)
    #[arg(long = "scripts-dir", env = "SCRIPTPRO_CONFIG_SCRIPTS_DIR")]
    pub config_scripts_dir: Option<String>,

    /// Response convention (bindings|process)
    #[arg(long = "response-convention", env = "SCRIPTPRO_CONFIG_RESPONSE_CONVENTION")]
    pub config_response_convention: Option<ResponseConvention>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a script file or inline source
    Exec(ExecArgs),

    /// Invoke a discovered capability by identifier
    Call(CallArgs),

    /// List registered capabilities
    List(ListArgs),

    /// Parse a script and show its metadata without running it
    Check(CheckArgs),

    /// Serve capabilities over HTTP
    Serve(ServeArgs),

    /// Configuration management utilities
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct ExecArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Script file, relative to the config directory
    #[arg(short, long)]
    pub file: Option<String>,

    /// Inline script source
    #[arg(short, long)]
    pub source: Option<String>,

    #[command(flatten)]
    pub invocation: InvocationArgs,
}

#[derive(Parser, Debug)]
pub struct CallArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Capability identifier (e.g. "lights__kitchen")
    pub capability: String,

    #[command(flatten)]
    pub invocation: InvocationArgs,
}

/// Options shared by commands that invoke a script
#[derive(Parser, Debug, Clone, Default)]
pub struct InvocationArgs {
    /// Parameter passed to the script as key=value (value parsed as JSON, else string)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// Compile fresh and don't store the compiled script
    #[arg(long)]
    pub no_cache: bool,

    /// Run without printing a response
    #[arg(long)]
    pub no_response: bool,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Print capabilities with their metadata as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Script file to check
    pub file: String,
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Address to listen on
    #[arg(long = "bind", env = "SCRIPTPRO_CONFIG_BIND")]
    pub config_bind: Option<String>,

    /// Reload when scripts change on disk
    #[arg(long = "watch", env = "SCRIPTPRO_CONFIG_WATCH")]
    pub config_watch: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Validate {
        /// Path to config file
        path: String,
    },
    /// Generate example config file
    Generate,
    /// Show effective configuration (merged from all sources)
    Show {
        #[command(flatten)]
        common: CommonConfigArgs,
    },
}

/// Parse `key=value`. The value is JSON when it parses as such, otherwise a string.
pub fn parse_param(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value: no `=` found in `{}`", s))?;

    if key.is_empty() {
        return Err(format!("invalid key=value: empty key in `{}`", s));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

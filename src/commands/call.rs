/// `scriptpro call` command implementation
use anyhow::Result;
use serde_json::Value;

use crate::cli::CallArgs;
use crate::merger::MergedConfig;
use crate::script::metadata::CACHE_PARAMETER;

pub fn run(args: CallArgs) -> Result<()> {
    let merged = MergedConfig::load(&args.common)?;
    let dispatcher = merged.dispatcher()?;

    let mut payload = super::params_payload(&args.invocation);
    if args.invocation.no_cache {
        payload.insert(CACHE_PARAMETER.to_string(), Value::Bool(false));
    }

    let response = dispatcher.call(&args.capability, payload, !args.invocation.no_response)?;
    super::finish(response)
}

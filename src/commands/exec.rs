/// `scriptpro exec` command implementation
///
/// Runs a script file or inline source once, without a discovery pass.
use anyhow::Result;
use tracing::info;

use crate::cli::ExecArgs;
use crate::merger::MergedConfig;
use crate::script::{Dispatcher, InvocationRequest};

pub fn run(args: ExecArgs) -> Result<()> {
    let merged = MergedConfig::load(&args.common)?;
    let dispatcher = Dispatcher::new(&merged.config, &merged.base_dir)?;

    // `-p file=...`, `-p cache=false` and friends mean the same as in a payload
    let mut request = InvocationRequest::from_payload(super::params_payload(&args.invocation));
    if args.file.is_some() {
        request.file = args.file;
    }
    if args.source.is_some() {
        request.source = args.source;
    }
    if args.invocation.no_cache {
        request.cache = Some(false);
    }

    info!(
        operation = "exec",
        file = request.file.as_deref().unwrap_or(""),
        inline = request.source.is_some(),
        "running script"
    );

    let response = dispatcher.handle(request, !args.invocation.no_response)?;
    super::finish(response)
}

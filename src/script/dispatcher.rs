//! Invocation dispatcher
//!
//! Resolves a request to a script, consults the compiled-unit cache, and runs
//! the unit through the executor. Owns the process-scoped components (engine,
//! cache, registry); there is no global state.
use anyhow::Result;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::cache::CompiledUnitCache;
use super::cache_key::{normalize_path, IdentityKey};
use super::discovery::ScriptDiscovery;
use super::engine::{CompiledUnit, ScriptEngine, INLINE_ORIGIN};
use super::error::ScriptError;
use super::executor::{Executor, ResponseConvention, ScriptResponse};
use super::harvest::SeedBindings;
use super::metadata::CACHE_PARAMETER;
use super::registry::{CapabilityHandler, CapabilityRegistry};
use super::value::ExportableValue;
use crate::config::ScriptProConfig;

/// Seed binding holding the whole request payload
pub const PAYLOAD_BINDING: &str = "data";

/// A parsed invocation payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationRequest {
    pub file: Option<String>,
    pub source: Option<String>,
    pub cache: Option<bool>,
    /// Everything else, passed through as seed bindings
    pub extra: Map<String, Value>,
}

impl InvocationRequest {
    /// Request running a script file
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            file: Some(path.into()),
            ..Default::default()
        }
    }

    /// Request running inline source text
    pub fn source(text: impl Into<String>) -> Self {
        Self {
            source: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// Split a JSON object payload into the well-known fields and pass-through extras.
    ///
    /// Well-known fields with an unexpected type are treated as absent.
    pub fn from_payload(mut payload: Map<String, Value>) -> Self {
        let file = take_string(&mut payload, "file");
        let source = take_string(&mut payload, "source");
        let cache = match payload.remove(CACHE_PARAMETER) {
            Some(Value::Bool(b)) => Some(b),
            Some(other) => {
                tracing::warn!(value = %other, "ignoring non-boolean cache parameter");
                None
            }
            None => None,
        };

        Self {
            file,
            source,
            cache,
            extra: payload,
        }
    }

    /// The request as the JSON object it was received as
    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = self.extra.clone();
        if let Some(file) = &self.file {
            payload.insert("file".to_string(), Value::from(file.clone()));
        }
        if let Some(source) = &self.source {
            payload.insert("source".to_string(), Value::from(source.clone()));
        }
        if let Some(cache) = self.cache {
            payload.insert(CACHE_PARAMETER.to_string(), Value::Bool(cache));
        }
        payload
    }

    /// Seed bindings: extra fields plus the whole payload as `data`
    fn seed_bindings(&self) -> SeedBindings {
        let mut seed: SeedBindings = self
            .extra
            .iter()
            .map(|(name, value)| (name.clone(), ExportableValue::from(value.clone())))
            .collect();
        seed.insert(
            PAYLOAD_BINDING.to_string(),
            ExportableValue::from(Value::Object(self.payload())),
        );
        seed
    }
}

fn take_string(payload: &mut Map<String, Value>, field: &str) -> Option<String> {
    match payload.remove(field)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::String(_) | Value::Null => None,
        other => {
            tracing::warn!(field = field, value = %other, "ignoring non-string request field");
            None
        }
    }
}

/// Where the code of one invocation comes from
enum ScriptSource {
    File { key: IdentityKey, path: PathBuf },
    Inline { key: IdentityKey, text: String },
}

impl ScriptSource {
    fn key(&self) -> &IdentityKey {
        match self {
            Self::File { key, .. } | Self::Inline { key, .. } => key,
        }
    }
}

pub struct Dispatcher {
    base_dir: PathBuf,
    cache_default: bool,
    engine: Arc<ScriptEngine>,
    cache: Arc<CompiledUnitCache>,
    registry: Arc<CapabilityRegistry>,
    executor: Executor,
    discovery: ScriptDiscovery,
}

impl Dispatcher {
    /// Build a dispatcher. Relative paths (script root, request files) resolve
    /// against `base_dir`. No discovery pass runs until `reload` is called.
    pub fn new(config: &ScriptProConfig, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = normalize_path(&base_dir.into());
        let scripts_root = normalize_path(&base_dir.join(&config.scripts.dir));

        let engine = Arc::new(ScriptEngine::new(&scripts_root, &config.scripts.extension));
        let discovery = ScriptDiscovery::new(&scripts_root, config.scripts.extension.clone())
            .with_exclude(&config.scripts.exclude)?;

        Ok(Self {
            base_dir,
            cache_default: config.cache.enabled,
            executor: Executor::new(engine.clone(), config.response.convention),
            engine,
            cache: Arc::new(CompiledUnitCache::new()),
            registry: Arc::new(CapabilityRegistry::new()),
            discovery,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn scripts_root(&self) -> &Path {
        self.discovery.root()
    }

    pub fn extension(&self) -> &str {
        self.discovery.extension()
    }

    pub fn convention(&self) -> ResponseConvention {
        self.executor.convention()
    }

    pub fn engine(&self) -> &ScriptEngine {
        &self.engine
    }

    pub fn cache(&self) -> &CompiledUnitCache {
        &self.cache
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run a discovery pass, replace the registered capabilities and drop
    /// every cached unit. Returns the number of discovered capabilities.
    pub fn reload(&self) -> Result<usize> {
        let scripts = self.discovery.discover()?;
        let count = self.registry.replace_discovered(scripts);
        self.cache.clear();

        tracing::info!(
            operation = "reload",
            root = %self.discovery.root().display(),
            capabilities = count,
            "Scripts reloaded"
        );

        Ok(count)
    }

    /// Invoke a registered capability by identifier
    pub fn call(
        &self,
        identifier: &str,
        payload: Map<String, Value>,
        want_response: bool,
    ) -> Result<Option<ScriptResponse>, ScriptError> {
        let capability = self
            .registry
            .get(identifier)
            .ok_or_else(|| ScriptError::UnknownCapability(identifier.to_string()))?;

        tracing::debug!(operation = "call", capability = identifier);

        match &capability.handler {
            CapabilityHandler::Inline => {
                self.handle(InvocationRequest::from_payload(payload), want_response)
            }
            CapabilityHandler::Reload => {
                self.reload()
                    .map_err(|e| ScriptError::Discovery(format!("{:#}", e)))?;
                Ok(None)
            }
            CapabilityHandler::File(path) => {
                let mut request = InvocationRequest::from_payload(payload);
                request.file = Some(path.display().to_string());
                request.source = None;
                self.handle(request, want_response)
            }
        }
    }

    /// Handle one invocation.
    ///
    /// Returns `Ok(None)` when no response was requested. A request with
    /// neither `file` nor `source` is rejected before anything runs; without
    /// a requested response it is only logged.
    pub fn handle(
        &self,
        request: InvocationRequest,
        want_response: bool,
    ) -> Result<Option<ScriptResponse>, ScriptError> {
        let source = match self.resolve(&request) {
            Ok(source) => source,
            Err(e) => {
                tracing::error!(operation = "dispatch", status = "invalid", error = %e);
                return if want_response { Err(e) } else { Ok(None) };
            }
        };

        let use_cache = request.cache.unwrap_or(self.cache_default);
        let unit = if use_cache {
            self.cache
                .get_or_compile(source.key(), || self.compile(&source))?
        } else {
            tracing::debug!(operation = "dispatch", key = %source.key(), "cache bypassed");
            Arc::new(self.compile(&source)?)
        };

        let response = self.executor.run(&unit, &request.seed_bindings());

        Ok(want_response.then_some(response))
    }

    fn resolve(&self, request: &InvocationRequest) -> Result<ScriptSource, ScriptError> {
        let present = |field: &Option<String>| field.clone().filter(|s| !s.is_empty());

        if let Some(file) = present(&request.file) {
            let key = IdentityKey::for_file(Path::new(&file), &self.base_dir);
            if let Some(path) = key.path().map(Path::to_path_buf) {
                return Ok(ScriptSource::File { key, path });
            }
        }

        if let Some(text) = present(&request.source) {
            return Ok(ScriptSource::Inline {
                key: IdentityKey::for_source(&text),
                text,
            });
        }

        Err(ScriptError::Validation)
    }

    fn compile(&self, source: &ScriptSource) -> Result<CompiledUnit, ScriptError> {
        match source {
            ScriptSource::File { path, .. } => {
                let text = fs::read_to_string(path).map_err(|e| ScriptError::Read {
                    path: path.clone(),
                    source: e,
                })?;
                let origin = path
                    .strip_prefix(&self.base_dir)
                    .unwrap_or(path)
                    .display()
                    .to_string();
                self.engine.compile(&text, &origin)
            }
            ScriptSource::Inline { text, .. } => self.engine.compile(text, INLINE_ORIGIN),
        }
    }
}

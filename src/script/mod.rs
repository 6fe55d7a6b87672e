/// Script engine core
///
/// Compile, cache, execute and harvest scripts, plus static discovery of
/// script directories into invocable capabilities.
pub mod cache;
pub mod cache_key;
pub mod discovery;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod executor;
pub mod harvest;
pub mod metadata;
pub mod registry;
pub mod value;

pub use cache::{CacheStats, CompiledUnitCache};
pub use cache_key::IdentityKey;
pub use discovery::{capability_id, DiscoveredScript, ScriptDiscovery, IDENTIFIER_DELIMITER};
pub use dispatcher::{Dispatcher, InvocationRequest};
pub use engine::{CompiledUnit, ScriptEngine, INLINE_ORIGIN};
pub use error::ScriptError;
pub use executor::{Executor, ResponseConvention, ScriptResponse};
pub use harvest::{select_outputs, Namespace, SeedBindings, RESERVED_NAMES};
pub use metadata::{MetadataExtractor, ParameterSpec, ScriptMetadata};
pub use registry::{
    CapabilityHandler, CapabilityRegistry, RegisteredCapability, EXEC_CAPABILITY,
    PROTECTED_CAPABILITIES, RELOAD_CAPABILITY,
};
pub use value::ExportableValue;

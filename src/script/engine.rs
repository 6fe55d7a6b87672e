/// Embedded script engine
///
/// Compiles source text into reusable units and runs them against a fresh
/// namespace. The engine is shared by every worker; compiled units are
/// immutable and can be executed concurrently.
use rhai::module_resolvers::FileModuleResolver;
use rhai::{Engine, Scope, AST};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use super::error::ScriptError;
use super::harvest::{Namespace, SeedBindings};
use super::value::ExportableValue;

/// Origin label used for inline source text
pub const INLINE_ORIGIN: &str = "<string>";

/// An immutable, re-runnable compiled script
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    origin: String,
    ast: AST,
}

impl CompiledUnit {
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

pub struct ScriptEngine {
    engine: Engine,
    compilations: AtomicU64,
}

impl ScriptEngine {
    /// Create an engine whose `import` statements resolve relative to `module_root`
    pub fn new(module_root: &Path, extension: &str) -> Self {
        let mut engine = Engine::new();

        // Modules are re-read on every import so edits show up without a restart
        let mut resolver = FileModuleResolver::new_with_path_and_extension(module_root, extension);
        resolver.enable_cache(false);
        engine.set_module_resolver(resolver);

        engine.on_print(|text| {
            tracing::info!(target: "scriptpro::script", "{}", text);
        });
        engine.on_debug(|text, source, pos| {
            tracing::debug!(
                target: "scriptpro::script",
                origin = source.unwrap_or(INLINE_ORIGIN),
                line = pos.line().unwrap_or(0),
                "{}",
                text
            );
        });

        Self {
            engine,
            compilations: AtomicU64::new(0),
        }
    }

    /// Compile source text. The origin label tags diagnostics.
    pub fn compile(&self, source: &str, origin: &str) -> Result<CompiledUnit, ScriptError> {
        self.compilations.fetch_add(1, Ordering::Relaxed);

        let mut ast = self.engine.compile(source).map_err(|e| ScriptError::Syntax {
            origin: origin.to_string(),
            message: e.err_type().to_string(),
            line: e.position().line(),
        })?;
        ast.set_source(origin);

        tracing::debug!(operation = "compile", origin = origin, "compiled script");

        Ok(CompiledUnit {
            origin: origin.to_string(),
            ast,
        })
    }

    /// Run a compiled unit against a fresh namespace seeded with `seed`.
    ///
    /// Returns the namespace as the run left it, or the runtime fault message.
    pub fn execute(&self, unit: &CompiledUnit, seed: &SeedBindings) -> Result<Namespace, String> {
        let mut scope = Scope::new();
        for (name, value) in seed {
            scope.push_dynamic(name.as_str(), value.to_dynamic());
        }

        self.engine
            .run_ast_with_scope(&mut scope, &unit.ast)
            .map_err(|e| e.to_string())?;

        // Later pushes shadow earlier ones, so the last binding of a name wins
        let mut namespace = Namespace::new();
        for (name, _, value) in scope.iter() {
            namespace.insert(name.to_string(), ExportableValue::from_dynamic(&value));
        }

        Ok(namespace)
    }

    /// Number of compile calls made through this engine
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }
}

//! Script discovery
//!
//! Walks the script root and turns every script file into a capability
//! candidate with a stable identifier and statically extracted metadata.
//! A file that cannot be read or parsed is skipped with a warning; it never
//! aborts the walk.
use anyhow::{Context, Result};
use glob::Pattern;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use super::metadata::{MetadataExtractor, ScriptMetadata};
use super::registry::PROTECTED_CAPABILITIES;

/// Replaces path separators in capability identifiers
pub const IDENTIFIER_DELIMITER: &str = "__";

/// A script file found during a discovery pass
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredScript {
    pub identifier: String,
    pub path: PathBuf,
    pub metadata: ScriptMetadata,
}

pub struct ScriptDiscovery {
    root: PathBuf,
    extension: String,
    exclude: Vec<Pattern>,
    extractor: MetadataExtractor,
}

impl ScriptDiscovery {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            exclude: Vec::new(),
            extractor: MetadataExtractor::new(),
        }
    }

    /// Skip relative paths matching any of the given glob patterns
    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = patterns
            .iter()
            .map(|p| Pattern::new(p).with_context(|| format!("Invalid exclude pattern: {}", p)))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Scan the script root and return every registrable script, ordered by identifier
    pub fn discover(&self) -> Result<Vec<DiscoveredScript>> {
        if !self.root.is_dir() {
            tracing::warn!(
                operation = "discover",
                root = %self.root.display(),
                "Script directory does not exist, no capabilities registered"
            );
            return Ok(Vec::new());
        }

        let mut discovered: BTreeMap<String, DiscoveredScript> = BTreeMap::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(operation = "discover", error = %e, "Failed to read directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(identifier) = capability_id(&self.root, path, &self.extension) else {
                continue;
            };

            if self.is_excluded(path) {
                tracing::debug!(path = %path.display(), "excluded from discovery");
                continue;
            }

            if PROTECTED_CAPABILITIES.contains(&identifier.as_str()) {
                tracing::warn!(
                    path = %path.display(),
                    capability = %identifier,
                    "Script name clashes with a built-in capability, skipping"
                );
                continue;
            }

            if let Some(existing) = discovered.get(&identifier) {
                tracing::warn!(
                    path = %path.display(),
                    capability = %identifier,
                    existing = %existing.path.display(),
                    "Duplicate capability identifier, skipping"
                );
                continue;
            }

            match self.load(path, &identifier) {
                Ok(metadata) => {
                    discovered.insert(
                        identifier.clone(),
                        DiscoveredScript {
                            identifier,
                            path: path.to_path_buf(),
                            metadata,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to register script, skipping"
                    );
                }
            }
        }

        Ok(discovered.into_values().collect())
    }

    fn load(&self, path: &Path, identifier: &str) -> Result<ScriptMetadata> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?;

        let metadata = self.extractor.extract(
            &contents,
            &path.display().to_string(),
            identifier,
        )?;

        Ok(metadata)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        self.exclude.iter().any(|p| p.matches_path(relative))
    }
}

/// Derive the capability identifier for a script path.
///
/// `sub/dir/task.rhai` under `root` becomes `sub__dir__task`. Returns `None`
/// for paths outside `root` or without the script extension.
pub fn capability_id(root: &Path, path: &Path, extension: &str) -> Option<String> {
    if path.extension()? != extension {
        return None;
    }

    let relative = path.strip_prefix(root).ok()?.with_extension("");

    let parts = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    if parts.is_empty() {
        return None;
    }

    Some(parts.join(IDENTIFIER_DELIMITER))
}

//! Output harvesting
//!
//! Scripts never declare a return value. The response is inferred by diffing
//! the namespace a run started with against the namespace it left behind.
use std::collections::BTreeMap;

use super::value::ExportableValue;

/// Names that are part of the calling convention and never harvested
pub const RESERVED_NAMES: &[&str] = &[
    "data",
    "return_response",
    super::metadata::NAME_CONSTANT,
    super::metadata::DESCRIPTION_CONSTANT,
    super::metadata::PARAMETERS_CONSTANT,
];

/// Seed bindings: the namespace before a run
pub type SeedBindings = BTreeMap<String, ExportableValue>;

/// Final namespace of a run. `None` marks a binding that exists but holds a
/// value with no exportable representation.
pub type Namespace = BTreeMap<String, Option<ExportableValue>>;

/// Select the bindings that make up a response.
///
/// A binding is kept when it is not excluded, is exportable, and was either
/// created by the run or changed from its seed value.
pub fn select_outputs(
    before: &SeedBindings,
    after: &Namespace,
    excluded: &[&str],
) -> BTreeMap<String, ExportableValue> {
    after
        .iter()
        .filter(|(name, _)| !excluded.contains(&name.as_str()))
        .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
        .filter(|(name, value)| before.get(name.as_str()) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

//! Lookup seams between the core and external data sources.

use std::collections::{BTreeMap, HashMap};

/// Resolves entity (or class) identifiers to display names.
///
/// Absence is explicit: callers decide what a missing name becomes.
pub trait EntityNames {
    fn display_name(&self, entity_id: &str) -> Option<&str>;

    /// Name or `""` when unknown.
    fn name_or_empty(&self, entity_id: &str) -> &str {
        self.display_name(entity_id).unwrap_or("")
    }
}

impl EntityNames for HashMap<String, String> {
    fn display_name(&self, entity_id: &str) -> Option<&str> {
        self.get(entity_id).map(String::as_str)
    }
}

impl EntityNames for BTreeMap<String, String> {
    fn display_name(&self, entity_id: &str) -> Option<&str> {
        self.get(entity_id).map(String::as_str)
    }
}

/// A name table that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

impl EntityNames for NoNames {
    fn display_name(&self, _entity_id: &str) -> Option<&str> {
        None
    }
}

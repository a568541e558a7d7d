// ==========================================
// Tabular Import - Table namer
// ==========================================
// Deterministic, collision-free destination identifiers.
// Pure function of the source name and the names chosen so far in one job.
// ==========================================

use crate::domain::TabularSource;
use std::collections::HashSet;

const FALLBACK_TABLE_NAME: &str = "table";
const RESERVED_PREFIX: &str = "sqlite_";

/// Lowercase, ASCII non-alphanumeric runs collapsed to `_`, edges trimmed.
///
/// Returns an empty string when nothing alphanumeric remains.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// First of `base`, `base_2`, `base_3`, ... not in `taken`.
pub fn first_unused(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TableNamer;

impl TableNamer {
    pub fn new() -> Self {
        Self
    }

    /// The caller registers the returned name in `existing_names`
    /// before naming the next source.
    pub fn name(&self, source: &TabularSource, existing_names: &HashSet<String>) -> String {
        self.name_for(source.name(), existing_names)
    }

    pub fn name_for(&self, source_name: &str, existing_names: &HashSet<String>) -> String {
        let mut base = sanitize_identifier(source_name);
        if base.is_empty() {
            base = FALLBACK_TABLE_NAME.to_string();
        }
        if base.starts_with(RESERVED_PREFIX) {
            base = format!("t_{base}");
        }
        first_unused(&base, existing_names)
    }
}

// ==========================================
// Tabular Import - Data cleaner
// ==========================================
// Responsibility: header normalization / missing-value normalization
// Red line: runs once inside FileLoader, downstream never re-reads raw null tokens
// ==========================================

use crate::domain::{CellValue, TabularSource};
use std::collections::HashSet;

/// Tokens treated as missing regardless of configuration (case-insensitive, trimmed).
pub const DEFAULT_MISSING_TOKENS: [&str; 5] = ["NA", "NULL", "NAN", "#N/A", "N/A"];

#[derive(Debug, Clone, Default)]
pub struct DataCleaner {
    /// Additional upper-cased missing tokens
    extra_tokens: Vec<String>,
}

impl DataCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra_tokens = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { extra_tokens }
    }

    /// Whether a raw cell text denotes a missing value.
    pub fn is_missing(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return true;
        }
        let upper = trimmed.to_uppercase();
        DEFAULT_MISSING_TOKENS.contains(&upper.as_str()) || self.extra_tokens.contains(&upper)
    }

    pub fn normalize_cell(&self, raw: &str) -> CellValue {
        if self.is_missing(raw) {
            CellValue::Missing
        } else {
            CellValue::Value(raw.to_string())
        }
    }

    /// Replace missing tokens of a whole source with `CellValue::Missing`.
    ///
    /// Idempotent: a normalized source maps to itself.
    pub fn normalize_missing(&self, source: &TabularSource) -> TabularSource {
        source.map_values(|raw| self.normalize_cell(raw))
    }

    /// Normalize header cells: trim, collapse whitespace runs to `_`,
    /// name blank headers `column_<n>`, disambiguate duplicates with `_2`, `_3`, ...
    pub fn normalize_column_names<S: AsRef<str>>(&self, headers: &[S]) -> Vec<String> {
        let normalized: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                let name = collapse_whitespace(h.as_ref());
                if name.is_empty() {
                    format!("column_{}", idx + 1)
                } else {
                    name
                }
            })
            .collect();

        let reserved: HashSet<&str> = normalized.iter().map(String::as_str).collect();
        let mut used: HashSet<String> = HashSet::with_capacity(normalized.len());
        let mut out = Vec::with_capacity(normalized.len());
        for name in &normalized {
            let unique = if used.contains(name) {
                let mut n = 2;
                loop {
                    let candidate = format!("{name}_{n}");
                    if !used.contains(&candidate) && !reserved.contains(candidate.as_str()) {
                        break candidate;
                    }
                    n += 1;
                }
            } else {
                name.clone()
            };
            used.insert(unique.clone());
            out.push(unique);
        }
        out
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column_names() {
        let cleaner = DataCleaner::new();
        let names = cleaner.normalize_column_names(&[" Customer  Name ", "Amount", "", "Notes"]);
        assert_eq!(names, vec!["Customer_Name", "Amount", "column_3", "Notes"]);
    }

    #[test]
    fn test_duplicate_headers_get_suffix() {
        let cleaner = DataCleaner::new();
        let names = cleaner.normalize_column_names(&["id", "id ", "id", "id_2"]);
        assert_eq!(names, vec!["id", "id_3", "id_4", "id_2"]);
    }

    #[test]
    fn test_missing_tokens_case_insensitive() {
        let cleaner = DataCleaner::new();
        for raw in ["", "   ", "NA", "na", "Null", "NaN", "#N/A", " n/a "] {
            assert!(cleaner.is_missing(raw), "{raw:?} should be missing");
        }
        for raw in ["0", "none", "NAB", "x"] {
            assert!(!cleaner.is_missing(raw), "{raw:?} should be present");
        }
    }

    #[test]
    fn test_extra_tokens() {
        let cleaner = DataCleaner::with_extra_tokens(["-", "missing"]);
        assert!(cleaner.is_missing("-"));
        assert!(cleaner.is_missing("MISSING"));
        assert!(!DataCleaner::new().is_missing("-"));
    }

    #[test]
    fn test_normalize_missing_is_idempotent() {
        let cleaner = DataCleaner::new();
        let source = TabularSource::new(
            "s",
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec!["NULL".into(), "1".into()],
                vec!["x".into(), CellValue::Missing],
            ],
        )
        .unwrap();

        let once = cleaner.normalize_missing(&source);
        let twice = cleaner.normalize_missing(&once);

        assert_eq!(once, twice);
        assert_eq!(once.cell(0, "a"), Some(&CellValue::Missing));
        assert_eq!(once.cell(1, "a"), Some(&CellValue::from("x")));
    }
}

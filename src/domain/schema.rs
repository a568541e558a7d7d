// ==========================================
// Tabular Import - Inferred column schema
// ==========================================
// Type lattice:
//   Integer <= Float <= Text
//   Boolean <= Text
//   Timestamp <= Text
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredType {
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
}

impl InferredType {
    /// Least upper bound of two tags. Total, commutative, associative.
    pub fn join(self, other: InferredType) -> InferredType {
        use InferredType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }

    /// Native SQLite declared type.
    pub fn sql_type(&self) -> &'static str {
        match self {
            InferredType::Integer => "INTEGER",
            InferredType::Float => "REAL",
            InferredType::Boolean => "BOOLEAN",
            InferredType::Timestamp => "TIMESTAMP",
            InferredType::Text => "TEXT",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InferredType::Integer => "integer",
            InferredType::Float => "float",
            InferredType::Boolean => "boolean",
            InferredType::Timestamp => "timestamp",
            InferredType::Text => "text",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inferred type of one source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub inferred_type: InferredType,
    pub nullable: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, inferred_type: InferredType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            inferred_type,
            nullable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InferredType::*;
    use super::*;

    const ALL: [InferredType; 5] = [Integer, Float, Boolean, Timestamp, Text];

    #[test]
    fn test_join_is_commutative_and_idempotent() {
        for a in ALL {
            assert_eq!(a.join(a), a);
            for b in ALL {
                assert_eq!(a.join(b), b.join(a));
            }
        }
    }

    #[test]
    fn test_join_is_associative() {
        for a in ALL {
            for b in ALL {
                for c in ALL {
                    assert_eq!(a.join(b).join(c), a.join(b.join(c)));
                }
            }
        }
    }

    #[test]
    fn test_join_widening_rules() {
        assert_eq!(Integer.join(Float), Float);
        assert_eq!(Integer.join(Timestamp), Text);
        assert_eq!(Boolean.join(Integer), Text);
        assert_eq!(Text.join(Float), Text);
    }
}

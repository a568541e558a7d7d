// ==========================================
// Tabular Import - Schema inferencer
// ==========================================
// Column type = join of the classification of every present value.
// Total: never fails, the worst case is Text.
// ==========================================

use crate::domain::{CellValue, ColumnSchema, InferredType, TabularSource};
use crate::importer::value_parser::classify;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaInferencer;

impl SchemaInferencer {
    pub fn new() -> Self {
        Self
    }

    pub fn infer(&self, source: &TabularSource) -> Vec<ColumnSchema> {
        let schema: Vec<ColumnSchema> = source
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, name)| infer_column(name, source.column_values(idx)))
            .collect();

        debug!(
            source = source.name(),
            columns = ?schema.iter().map(|c| (c.name.as_str(), c.inferred_type.as_str())).collect::<Vec<_>>(),
            "schema inferred"
        );
        schema
    }
}

fn infer_column<'a, I>(name: &str, values: I) -> ColumnSchema
where
    I: Iterator<Item = &'a CellValue>,
{
    let mut current: Option<InferredType> = None;
    let mut nullable = false;

    for value in values {
        match value {
            CellValue::Missing => nullable = true,
            // Text is the top of the lattice; only nullability can still change
            CellValue::Value(_) if current == Some(InferredType::Text) => {}
            CellValue::Value(raw) => {
                let tag = classify(raw);
                current = Some(current.map_or(tag, |c| c.join(tag)));
            }
        }
    }

    match current {
        Some(inferred_type) => ColumnSchema::new(name, inferred_type, nullable),
        None => ColumnSchema::new(name, InferredType::Text, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_column(values: &[Option<&str>]) -> ColumnSchema {
        let rows = values
            .iter()
            .map(|v| vec![v.map_or(CellValue::Missing, CellValue::from)])
            .collect();
        let source = TabularSource::new("s", vec!["c".to_string()], rows).unwrap();
        SchemaInferencer::new().infer(&source).remove(0)
    }

    #[test]
    fn test_integer_float_text() {
        let ints = single_column(&[Some("1"), Some("2"), Some("3")]);
        assert_eq!(ints.inferred_type, InferredType::Integer);
        assert!(!ints.nullable);

        assert_eq!(
            single_column(&[Some("1"), Some("2.5")]).inferred_type,
            InferredType::Float
        );
        assert_eq!(
            single_column(&[Some("1"), Some("2"), Some("x")]).inferred_type,
            InferredType::Text
        );
    }

    #[test]
    fn test_mixed_int_text_converges_regardless_of_order() {
        assert_eq!(
            single_column(&[Some("x"), Some("1"), Some("2")]).inferred_type,
            InferredType::Text
        );
        assert_eq!(
            single_column(&[Some("1"), Some("x"), Some("2.5")]).inferred_type,
            InferredType::Text
        );
    }

    #[test]
    fn test_boolean_and_timestamp_columns() {
        assert_eq!(
            single_column(&[Some("true"), Some("FALSE")]).inferred_type,
            InferredType::Boolean
        );
        assert_eq!(
            single_column(&[Some("2024-01-01"), Some("2024-01-02 10:00:00")]).inferred_type,
            InferredType::Timestamp
        );
        assert_eq!(
            single_column(&[Some("2024-01-01"), Some("7")]).inferred_type,
            InferredType::Text
        );
    }

    #[test]
    fn test_missing_values() {
        let col = single_column(&[Some("10"), None]);
        assert_eq!(col.inferred_type, InferredType::Integer);
        assert!(col.nullable);

        let empty = single_column(&[None, None]);
        assert_eq!(empty.inferred_type, InferredType::Text);
        assert!(empty.nullable);

        let nullable_after_text = single_column(&[Some("x"), None]);
        assert_eq!(nullable_after_text.inferred_type, InferredType::Text);
        assert!(nullable_after_text.nullable);
    }

    #[test]
    fn test_zero_rows_is_nullable_text() {
        let source = TabularSource::new("s", vec!["a".to_string()], vec![]).unwrap();
        let schema = SchemaInferencer::new().infer(&source);
        assert_eq!(schema, vec![ColumnSchema::new("a", InferredType::Text, true)]);
    }
}

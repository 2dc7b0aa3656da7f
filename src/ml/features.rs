//! Feature preparation - maps a raw input mapping to the fixed-order row
//! the pipeline expects.
//!
//! When the expected feature-name list is known (loaded from the
//! `feature_names_original.json` sidecar), the output columns are exactly
//! that list in that order; missing fields default to 0 and extra fields are
//! dropped. Without a list, the raw keys are used in their given order.
//!
//! No validation happens here; `validate::validate_input` runs first in the
//! request pipeline.

use serde_json::{Map, Value};

/// A single-row tabular record: ordered column names plus one float row.
///
/// The pipeline's ONNX export consumes a float32 `[1, n_features]` tensor;
/// categorical fields are encoded at export time, so non-numeric JSON values
/// coerce to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    values: Vec<f32>,
}

impl FeatureFrame {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Value of a column by name
    pub fn get(&self, name: &str) -> Option<f32> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i).copied())
    }
}

/// Build the single-row feature record from a raw input mapping.
pub fn prepare_features(raw: &Map<String, Value>, expected: Option<&[String]>) -> FeatureFrame {
    match expected {
        Some(names) => {
            let values = names
                .iter()
                .map(|name| raw.get(name).map(numeric_value).unwrap_or(0.0))
                .collect();
            FeatureFrame {
                columns: names.to_vec(),
                values,
            }
        }
        None => FeatureFrame {
            columns: raw.keys().cloned().collect(),
            values: raw.values().map(numeric_value).collect(),
        },
    }
}

fn numeric_value(value: &Value) -> f32 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0) as f32,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_expected_names_fill_missing_with_zero() {
        let expected: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let input = raw(json!({ "b": 5 }));

        let frame = prepare_features(&input, Some(&expected));

        assert_eq!(frame.columns(), &["a", "b", "c"]);
        assert_eq!(frame.values(), &[0.0, 5.0, 0.0]);
    }

    #[test]
    fn test_expected_names_drop_extra_fields() {
        let expected: Vec<String> = vec!["age".into(), "monthly_income".into()];
        let input = raw(json!({ "monthly_income": 1000, "age": 30, "department": "Sales" }));

        let frame = prepare_features(&input, Some(&expected));

        assert_eq!(frame.columns(), &["age", "monthly_income"]);
        assert_eq!(frame.values(), &[30.0, 1000.0]);
        assert!(frame.get("department").is_none());
    }

    #[test]
    fn test_without_expected_names_keys_keep_given_order() {
        let input = raw(json!({ "zeta": 1, "alpha": 2, "mid": 3 }));

        let frame = prepare_features(&input, None);

        assert_eq!(frame.columns(), &["zeta", "alpha", "mid"]);
        assert_eq!(frame.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_non_numeric_values_coerce_to_zero() {
        let input = raw(json!({
            "age": 41,
            "overtime": true,
            "department": "Consulting",
            "notes": null
        }));

        let frame = prepare_features(&input, None);

        assert_eq!(frame.get("age"), Some(41.0));
        assert_eq!(frame.get("overtime"), Some(1.0));
        assert_eq!(frame.get("department"), Some(0.0));
        assert_eq!(frame.get("notes"), Some(0.0));
    }

    #[test]
    fn test_empty_input_with_expected_names_is_all_zero() {
        let expected: Vec<String> = vec!["a".into(), "b".into()];
        let input = Map::new();

        let frame = prepare_features(&input, Some(&expected));

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.values(), &[0.0, 0.0]);
    }
}

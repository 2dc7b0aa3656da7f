//! Input validation for prediction requests
//!
//! Deliberately permissive: only the required-field set and two numeric
//! ranges are checked, and every rule is evaluated so the caller sees the
//! full list of violations at once.

use serde_json::Value;

/// Required fields, in the order their errors are reported.
pub const REQUIRED_FIELDS: [&str; 4] = [
    "age",
    "monthly_income",
    "hours_worked",
    "years_at_company",
];

/// Outcome of validating one raw input mapping.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a raw input mapping.
///
/// Rules are not short-circuited: a request missing two fields with an
/// out-of-range age yields three errors.
pub fn validate_input(raw: &Value) -> ValidationReport {
    let Some(fields) = raw.as_object() else {
        return ValidationReport {
            errors: vec!["input must be a JSON object".to_string()],
        };
    };

    let mut errors = Vec::new();

    for field in REQUIRED_FIELDS {
        if !fields.contains_key(field) {
            errors.push(format!("missing required field: {}", field));
        }
    }

    if let Some(age) = fields.get("age") {
        match age.as_f64() {
            Some(a) if (18.0..=100.0).contains(&a) => {}
            _ => errors.push("age must be a number between 18 and 100".to_string()),
        }
    }

    if let Some(income) = fields.get("monthly_income") {
        match income.as_f64() {
            Some(i) if i >= 0.0 => {}
            _ => errors.push("monthly_income must be a non-negative number".to_string()),
        }
    }

    ValidationReport { errors }
}

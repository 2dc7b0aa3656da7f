//! Prediction model and request/response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::ml::Prediction;

/// History page size when the caller gives no limit.
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

/// One persisted prediction. Append-only; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PredictionRecord {
    pub id: i64,
    pub employee_id: Option<i64>,
    pub input_data: serde_json::Value,
    pub prediction: i32,
    pub probability: f64,
    pub class_name: String,
    pub created_at: DateTime<Utc>,
    pub model_version: String,
}

/// Incoming prediction request.
///
/// `None` fields are excluded from the stored input snapshot and from the
/// feature mapping, so only what the caller actually sent reaches the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<i64>,

    // Demographics
    pub age: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<String>,

    // Employment
    pub monthly_income: f64,
    pub hours_worked: f64,
    pub years_at_company: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_in_current_role: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_years_experience: Option<f64>,

    // Role and department
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    // Satisfaction scores (0-5)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_satisfaction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_life_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_satisfaction: Option<f64>,

    // Other factors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overtime: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_companies: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_since_promotion: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commute_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_children: Option<String>,
}

impl PredictRequest {
    /// Raw input mapping fed to validation, feature assembly and the stored
    /// input snapshot. Fields keep their declaration order.
    pub fn to_input_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// Prediction response, single and batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: i32,
    pub probability: f64,
    pub probability_class_0: f64,
    pub probability_class_1: f64,
    pub class_name: String,
    pub threshold_used: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_id: Option<i64>,
}

impl PredictResponse {
    pub fn from_outcome(outcome: Prediction, employee_id: Option<i64>, prediction_id: i64) -> Self {
        Self {
            prediction: outcome.prediction,
            probability: outcome.probability,
            probability_class_0: outcome.probability_class_0,
            probability_class_1: outcome.probability_class_1,
            class_name: outcome.class_name,
            threshold_used: outcome.threshold_used,
            employee_id,
            prediction_id: Some(prediction_id),
        }
    }

    /// Sentinel slot for a failed batch item: keeps the output list aligned
    /// with the input list instead of aborting the batch.
    pub fn failure(employee_id: Option<i64>, detail: &str) -> Self {
        Self {
            prediction: -1,
            probability: 0.0,
            probability_class_0: 0.0,
            probability_class_1: 0.0,
            class_name: format!("Error: {}", detail),
            threshold_used: 0.5,
            employee_id,
            prediction_id: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct HistoryFilter {
    pub employee_id: Option<i64>,
    pub limit: Option<i64>,
}

impl PredictionRecord {
    pub async fn insert(
        pool: &PgPool,
        employee_id: Option<i64>,
        input_data: &serde_json::Value,
        outcome: &Prediction,
        model_version: &str,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO predictions (employee_id, input_data, prediction, probability, class_name, model_version)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(employee_id)
        .bind(input_data)
        .bind(outcome.prediction)
        .bind(outcome.probability)
        .bind(&outcome.class_name)
        .bind(model_version)
        .fetch_one(pool)
        .await?;

        Ok(row.0)
    }

    /// Persisted predictions, newest first. Exact employee match when given.
    pub async fn list(pool: &PgPool, filter: HistoryFilter) -> Result<Vec<Self>, sqlx::Error> {
        let limit = filter.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

        match filter.employee_id {
            Some(employee_id) => {
                sqlx::query_as::<_, PredictionRecord>(
                    r#"
                    SELECT * FROM predictions
                    WHERE employee_id = $1
                    ORDER BY created_at DESC
                    LIMIT $2
                    "#,
                )
                .bind(employee_id)
                .bind(limit)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, PredictionRecord>(
                    r#"
                    SELECT * FROM predictions
                    ORDER BY created_at DESC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(pool)
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_request() -> PredictRequest {
        serde_json::from_value(json!({
            "age": 32,
            "monthly_income": 75000.0,
            "hours_worked": 45.0,
            "years_at_company": 5.0
        }))
        .unwrap()
    }

    #[test]
    fn test_input_map_drops_unset_fields() {
        let request = minimal_request();
        let map = request.to_input_map();

        assert_eq!(map.len(), 4);
        assert!(!map.contains_key("employee_id"));
        assert!(!map.contains_key("department"));
        assert_eq!(map["age"], json!(32.0));
    }

    #[test]
    fn test_input_map_keeps_set_fields() {
        let request = PredictRequest {
            employee_id: Some(7),
            department: Some("Consulting".to_string()),
            overtime: Some(1),
            ..minimal_request()
        };
        let map = request.to_input_map();

        assert_eq!(map["employee_id"], json!(7));
        assert_eq!(map["department"], json!("Consulting"));
        assert_eq!(map["overtime"], json!(1));
    }

    #[test]
    fn test_failure_sentinel_shape() {
        let sentinel = PredictResponse::failure(Some(42), "model is not available");

        assert_eq!(sentinel.prediction, -1);
        assert_eq!(sentinel.probability, 0.0);
        assert_eq!(sentinel.probability_class_0, 0.0);
        assert_eq!(sentinel.probability_class_1, 0.0);
        assert_eq!(sentinel.class_name, "Error: model is not available");
        assert_eq!(sentinel.threshold_used, 0.5);
        assert_eq!(sentinel.employee_id, Some(42));
        assert!(sentinel.prediction_id.is_none());
    }

    #[test]
    fn test_response_from_outcome() {
        let outcome = Prediction {
            prediction: 1,
            probability: 0.85,
            probability_class_0: 0.15,
            probability_class_1: 0.85,
            class_name: "Attrition".to_string(),
            threshold_used: 0.72,
        };

        let response = PredictResponse::from_outcome(outcome, Some(1), 123);
        assert_eq!(response.prediction, 1);
        assert_eq!(response.probability, 0.85);
        assert_eq!(response.class_name, "Attrition");
        assert_eq!(response.threshold_used, 0.72);
        assert_eq!(response.prediction_id, Some(123));
    }

    #[test]
    fn test_history_filter_defaults() {
        let filter: HistoryFilter = serde_json::from_value(json!({})).unwrap();
        assert!(filter.employee_id.is_none());
        assert!(filter.limit.is_none());
        assert_eq!(filter.limit.unwrap_or(DEFAULT_HISTORY_LIMIT), 100);
    }
}

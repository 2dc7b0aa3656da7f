//! Inference - runs the loaded pipeline and applies the decision threshold
//!
//! The pipeline's native hard label is read but not trusted: the final label
//! is always re-derived by comparing the positive-class probability against
//! the stored threshold (default 0.5). The boundary is inclusive on the
//! attrition side.

use ndarray::Array2;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::artifacts::{ModelBundle, ThresholdInfo};
use super::features::FeatureFrame;

/// Threshold applied when no threshold artifact was loaded.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Class label for a positive (index 1) prediction.
pub const POSITIVE_CLASS: &str = "Attrition";

/// Class label for a negative (index 0) prediction.
pub const NEGATIVE_CLASS: &str = "No attrition";

/// Prediction output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// 0 = no attrition, 1 = attrition
    pub prediction: i32,
    /// Probability of attrition (positive class)
    pub probability: f64,
    pub probability_class_0: f64,
    pub probability_class_1: f64,
    pub class_name: String,
    /// Threshold the label decision was made against
    pub threshold_used: f64,
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model is not loaded")]
    NotLoaded,
    #[error("inference failed: {0}")]
    Failed(String),
}

/// Threshold to use for the label decision.
pub fn resolve_threshold(info: Option<&ThresholdInfo>) -> f64 {
    info.map(|i| i.optimal_threshold).unwrap_or(DEFAULT_THRESHOLD)
}

/// Label decision: 1 iff the positive-class probability reaches the threshold.
pub fn apply_threshold(positive_probability: f64, threshold: f64) -> i32 {
    if positive_probability >= threshold {
        1
    } else {
        0
    }
}

/// Fixed two-way class-name mapping.
pub fn class_label(prediction: i32) -> &'static str {
    if prediction == 1 {
        POSITIVE_CLASS
    } else {
        NEGATIVE_CLASS
    }
}

/// Pick the label and probability output names from the session's outputs.
///
/// sklearn-exported pipelines emit `label` and `probabilities`; fall back to
/// positional order when the names differ.
fn output_pair(names: &[String]) -> Result<(String, String), InferenceError> {
    if names.len() < 2 {
        return Err(InferenceError::Failed(
            "pipeline must expose label and probability outputs".to_string(),
        ));
    }

    let probabilities = names
        .iter()
        .find(|n| n.to_ascii_lowercase().contains("prob"))
        .unwrap_or(&names[1])
        .clone();
    let label = names
        .iter()
        .find(|n| **n != probabilities)
        .unwrap_or(&names[0])
        .clone();

    Ok((label, probabilities))
}

/// Run the pipeline on a single-row feature record.
///
/// ONNX runtime failures surface as `InferenceError::Failed` carrying the
/// message text only; the underlying error type never escapes.
pub(crate) fn run(
    bundle: &mut ModelBundle,
    frame: &FeatureFrame,
) -> Result<Prediction, InferenceError> {
    let (label_name, proba_name) = output_pair(bundle.output_names())?;
    let threshold = resolve_threshold(bundle.threshold.as_ref());

    // Single-row float32 input tensor
    let width = frame.len();
    let input_array = Array2::<f32>::from_shape_vec((1, width), frame.values().to_vec())
        .map_err(|e| InferenceError::Failed(format!("input shape error: {}", e)))?;
    let input_tensor = Value::from_array(input_array)
        .map_err(|e| InferenceError::Failed(format!("tensor error: {}", e)))?;

    let outputs = bundle
        .pipeline_mut()
        .run(ort::inputs![input_tensor])
        .map_err(|e| InferenceError::Failed(e.to_string()))?;

    let label_output = outputs
        .get(&label_name)
        .ok_or_else(|| InferenceError::Failed(format!("missing output: {}", label_name)))?;
    let native_label = label_output
        .try_extract_tensor::<i64>()
        .map_err(|e| InferenceError::Failed(format!("label extract error: {}", e)))?
        .1
        .first()
        .copied()
        .ok_or_else(|| InferenceError::Failed("empty label output".to_string()))?;

    let proba_output = outputs
        .get(&proba_name)
        .ok_or_else(|| InferenceError::Failed(format!("missing output: {}", proba_name)))?;
    let proba_tensor = proba_output
        .try_extract_tensor::<f32>()
        .map_err(|e| InferenceError::Failed(format!("probability extract error: {}", e)))?;
    let probabilities = proba_tensor.1;

    if probabilities.len() < 2 {
        return Err(InferenceError::Failed(
            "expected a two-class probability pair".to_string(),
        ));
    }
    let probability_class_0 = probabilities[0] as f64;
    let probability_class_1 = probabilities[1] as f64;

    // The threshold decision is authoritative, not the pipeline's own label
    let prediction = apply_threshold(probability_class_1, threshold);
    if i64::from(prediction) != native_label {
        tracing::debug!(
            native = native_label,
            adjusted = prediction,
            threshold,
            "threshold overrides the pipeline's native label"
        );
    }

    Ok(Prediction {
        prediction,
        probability: probability_class_1,
        probability_class_0,
        probability_class_1,
        class_name: class_label(prediction).to_string(),
        threshold_used: threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        assert_eq!(apply_threshold(0.5, 0.5), 1);
        assert_eq!(apply_threshold(0.4999, 0.5), 0);
        assert_eq!(apply_threshold(0.72, 0.72), 1);
        assert_eq!(apply_threshold(0.7199, 0.72), 0);
    }

    #[test]
    fn test_default_threshold_when_no_artifact() {
        assert_eq!(resolve_threshold(None), 0.5);
    }

    #[test]
    fn test_stored_threshold_wins() {
        let info = ThresholdInfo {
            optimal_threshold: 0.72,
            precision: None,
            recall: None,
            f1_score: None,
        };
        assert_eq!(resolve_threshold(Some(&info)), 0.72);
    }

    #[test]
    fn test_class_names() {
        assert_eq!(class_label(1), "Attrition");
        assert_eq!(class_label(0), "No attrition");
    }

    #[test]
    fn test_output_pair_prefers_probability_name() {
        let names = vec!["output_label".to_string(), "output_probability".to_string()];
        let (label, proba) = output_pair(&names).unwrap();
        assert_eq!(label, "output_label");
        assert_eq!(proba, "output_probability");

        // Name order must not matter
        let names = vec!["probabilities".to_string(), "label".to_string()];
        let (label, proba) = output_pair(&names).unwrap();
        assert_eq!(label, "label");
        assert_eq!(proba, "probabilities");
    }

    #[test]
    fn test_output_pair_falls_back_to_position() {
        let names = vec!["first".to_string(), "second".to_string()];
        let (label, proba) = output_pair(&names).unwrap();
        assert_eq!(label, "first");
        assert_eq!(proba, "second");
    }

    #[test]
    fn test_output_pair_requires_two_outputs() {
        let names = vec!["only".to_string()];
        assert!(output_pair(&names).is_err());
    }
}

//! ML Module - model artifacts, feature preparation and inference
//!
//! The trained attrition pipeline is exported to ONNX together with a set of
//! optional JSON sidecars (feature names, decision threshold, metadata). This
//! module loads that bundle once per process and runs per-request inference.

pub mod artifacts;
pub mod features;
pub mod inference;
pub mod validate;

// Re-export common types
pub use artifacts::{ModelContext, ModelStatus, Sidecar, ThresholdInfo};
pub use features::{prepare_features, FeatureFrame};
pub use inference::{InferenceError, Prediction};
pub use validate::{validate_input, ValidationReport};

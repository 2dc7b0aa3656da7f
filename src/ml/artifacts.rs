//! Model artifact store
//!
//! Loads the serialized model bundle from a base directory: the mandatory
//! pipeline (`attrition_pipeline.onnx`) plus independently optional sidecars
//! (companion preprocessor, feature-name lists, decision threshold, model
//! metadata). Optional artifacts never block a load; a corrupt one is logged
//! and treated as absent rather than failing startup.
//!
//! The bundle lives inside an explicit [`ModelContext`] owned by the
//! application state, so tests can build a fresh context per test instead of
//! sharing process-wide globals.

use std::fs;
use std::path::{Path, PathBuf};

use ort::session::{builder::GraphOptimizationLevel, Session};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::features::FeatureFrame;
use super::inference::{self, InferenceError, Prediction, DEFAULT_THRESHOLD};

// Artifact file names inside the base directory
pub const PIPELINE_FILE: &str = "attrition_pipeline.onnx";
pub const PREPROCESSOR_FILE: &str = "preprocessor.onnx";
pub const FEATURE_NAMES_ORIGINAL_FILE: &str = "feature_names_original.json";
pub const FEATURE_NAMES_TRANSFORMED_FILE: &str = "feature_names_transformed.json";
pub const THRESHOLD_FILE: &str = "threshold.json";
pub const METADATA_FILE: &str = "model_metadata.json";

/// Version reported when no metadata artifact was loaded.
pub const DEFAULT_MODEL_VERSION: &str = "1.0.0";

/// Stored decision-threshold record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdInfo {
    pub optimal_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f1_score: Option<f64>,
}

/// Stored model metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Snapshot of what the artifact store currently holds, for the status API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub model_loaded: bool,
    pub model_version: String,
    pub threshold: f64,
    pub has_preprocessor: bool,
    pub original_feature_count: Option<usize>,
    pub transformed_feature_count: Option<usize>,
}

/// Per-artifact load outcome for optional sidecars.
///
/// Distinguishes a missing file from a present-but-unreadable one so that
/// corruption is observable in logs and tests instead of silently identical
/// to absence.
#[derive(Debug)]
pub enum Sidecar<T> {
    Loaded(T),
    Absent,
    Corrupt(String),
}

impl<T> Sidecar<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Sidecar::Loaded(value) => Some(value),
            Sidecar::Absent | Sidecar::Corrupt(_) => None,
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Sidecar::Corrupt(_))
    }
}

/// Read one optional JSON sidecar.
pub fn load_json_sidecar<T: DeserializeOwned>(path: &Path) -> Sidecar<T> {
    if !path.exists() {
        return Sidecar::Absent;
    }
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => Sidecar::Loaded(value),
            Err(e) => Sidecar::Corrupt(e.to_string()),
        },
        Err(e) => Sidecar::Corrupt(e.to_string()),
    }
}

fn sidecar_to_option<T>(name: &str, sidecar: Sidecar<T>) -> Option<T> {
    if let Sidecar::Corrupt(reason) = &sidecar {
        tracing::warn!(artifact = name, %reason, "optional artifact is corrupt; treating as absent");
    }
    sidecar.into_option()
}

fn open_session(path: &Path) -> Result<Session, String> {
    Session::builder()
        .map_err(|e| e.to_string())?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| e.to_string())?
        .commit_from_file(path)
        .map_err(|e| e.to_string())
}

/// Everything loaded from the artifact directory. Immutable after a
/// successful load apart from the session's internal run state.
pub struct ModelBundle {
    pipeline: Session,
    output_names: Vec<String>,
    pub preprocessor: Option<Session>,
    pub feature_names_original: Option<Vec<String>>,
    pub feature_names_transformed: Option<Vec<String>>,
    pub threshold: Option<ThresholdInfo>,
    pub metadata: Option<ModelMetadata>,
}

impl ModelBundle {
    pub(crate) fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub(crate) fn pipeline_mut(&mut self) -> &mut Session {
        &mut self.pipeline
    }
}

/// Process-lifetime holder of the loaded model bundle.
///
/// Constructed once at startup and handed to request handlers through the
/// application state. The write lock serializes racing lazy loads, so two
/// requests that both observe "not loaded" still leave a single consistent
/// bundle behind.
pub struct ModelContext {
    base_dir: PathBuf,
    bundle: RwLock<Option<ModelBundle>>,
}

impl ModelContext {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            bundle: RwLock::new(None),
        }
    }

    /// Load the artifact bundle from disk.
    ///
    /// Returns `false` without touching state when the mandatory pipeline is
    /// missing or unreadable; callers may retry later. Optional artifacts
    /// load independently and never affect the result.
    pub fn load(&self) -> bool {
        let mut guard = self.bundle.write();
        if guard.is_some() {
            return true;
        }

        let pipeline_path = self.base_dir.join(PIPELINE_FILE);
        if !pipeline_path.exists() {
            tracing::warn!(path = %pipeline_path.display(), "pipeline artifact not found");
            return false;
        }

        let pipeline = match open_session(&pipeline_path) {
            Ok(session) => session,
            Err(reason) => {
                tracing::error!(path = %pipeline_path.display(), %reason, "failed to load pipeline artifact");
                return false;
            }
        };
        let output_names = pipeline.outputs().iter().map(|o| o.name().to_string()).collect();
        tracing::info!(path = %pipeline_path.display(), "pipeline loaded");

        let preprocessor_path = self.base_dir.join(PREPROCESSOR_FILE);
        let preprocessor = if preprocessor_path.exists() {
            match open_session(&preprocessor_path) {
                Ok(session) => {
                    tracing::info!("preprocessor loaded");
                    Some(session)
                }
                Err(reason) => {
                    tracing::warn!(%reason, "preprocessor artifact is corrupt; treating as absent");
                    None
                }
            }
        } else {
            None
        };

        let feature_names_original = sidecar_to_option(
            FEATURE_NAMES_ORIGINAL_FILE,
            load_json_sidecar(&self.base_dir.join(FEATURE_NAMES_ORIGINAL_FILE)),
        );
        let feature_names_transformed = sidecar_to_option(
            FEATURE_NAMES_TRANSFORMED_FILE,
            load_json_sidecar(&self.base_dir.join(FEATURE_NAMES_TRANSFORMED_FILE)),
        );
        let threshold = sidecar_to_option(
            THRESHOLD_FILE,
            load_json_sidecar(&self.base_dir.join(THRESHOLD_FILE)),
        );
        let metadata = sidecar_to_option(
            METADATA_FILE,
            load_json_sidecar(&self.base_dir.join(METADATA_FILE)),
        );

        *guard = Some(ModelBundle {
            pipeline,
            output_names,
            preprocessor,
            feature_names_original,
            feature_names_transformed,
            threshold,
            metadata,
        });
        tracing::info!(dir = %self.base_dir.display(), "model artifacts loaded");
        true
    }

    /// Whether the mandatory pipeline artifact is currently held.
    pub fn is_loaded(&self) -> bool {
        self.bundle.read().is_some()
    }

    /// Load on demand if needed; true when a bundle is available afterwards.
    pub fn ensure_loaded(&self) -> bool {
        self.is_loaded() || self.load()
    }

    /// Run inference on a prepared feature record.
    pub fn predict(&self, frame: &FeatureFrame) -> Result<Prediction, InferenceError> {
        let mut guard = self.bundle.write();
        let bundle = guard.as_mut().ok_or(InferenceError::NotLoaded)?;
        inference::run(bundle, frame)
    }

    /// Expected raw feature names, when that sidecar was loaded.
    pub fn feature_names(&self) -> Option<Vec<String>> {
        self.bundle
            .read()
            .as_ref()
            .and_then(|b| b.feature_names_original.clone())
    }

    /// Version string from the metadata artifact, or the default.
    pub fn model_version(&self) -> String {
        self.bundle
            .read()
            .as_ref()
            .and_then(|b| b.metadata.as_ref())
            .and_then(|m| m.model_version.clone())
            .unwrap_or_else(|| DEFAULT_MODEL_VERSION.to_string())
    }

    /// Snapshot of the held artifacts.
    pub fn status(&self) -> ModelStatus {
        let guard = self.bundle.read();
        match guard.as_ref() {
            Some(bundle) => ModelStatus {
                model_loaded: true,
                model_version: bundle
                    .metadata
                    .as_ref()
                    .and_then(|m| m.model_version.clone())
                    .unwrap_or_else(|| DEFAULT_MODEL_VERSION.to_string()),
                threshold: inference::resolve_threshold(bundle.threshold.as_ref()),
                has_preprocessor: bundle.preprocessor.is_some(),
                original_feature_count: bundle.feature_names_original.as_ref().map(|f| f.len()),
                transformed_feature_count: bundle.feature_names_transformed.as_ref().map(|f| f.len()),
            },
            None => ModelStatus {
                model_loaded: false,
                model_version: DEFAULT_MODEL_VERSION.to_string(),
                threshold: DEFAULT_THRESHOLD,
                has_preprocessor: false,
                original_feature_count: None,
                transformed_feature_count: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_starts_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let context = ModelContext::new(dir.path());
        assert!(!context.is_loaded());
    }

    #[test]
    fn test_load_fails_without_mandatory_artifact() {
        let dir = tempfile::tempdir().unwrap();
        // Optional artifacts alone must not make the load succeed
        fs::write(
            dir.path().join(THRESHOLD_FILE),
            json!({ "optimal_threshold": 0.72 }).to_string(),
        )
        .unwrap();

        let context = ModelContext::new(dir.path());
        assert!(!context.load());
        assert!(!context.is_loaded());
        assert!(!context.ensure_loaded());
    }

    #[test]
    fn test_load_is_retryable_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let context = ModelContext::new(dir.path());

        assert!(!context.load());
        assert!(!context.load());
        assert!(!context.is_loaded());
    }

    #[test]
    fn test_predict_without_bundle_is_invalid_state() {
        let dir = tempfile::tempdir().unwrap();
        let context = ModelContext::new(dir.path());
        let frame = crate::ml::prepare_features(&serde_json::Map::new(), None);

        let err = context.predict(&frame).unwrap_err();
        assert!(matches!(err, InferenceError::NotLoaded));
    }

    #[test]
    fn test_defaults_when_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let context = ModelContext::new(dir.path());
        assert_eq!(context.model_version(), DEFAULT_MODEL_VERSION);
        assert!(context.feature_names().is_none());
    }

    #[test]
    fn test_status_when_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let context = ModelContext::new(dir.path());

        let status = context.status();
        assert!(!status.model_loaded);
        assert_eq!(status.model_version, DEFAULT_MODEL_VERSION);
        assert_eq!(status.threshold, DEFAULT_THRESHOLD);
        assert!(!status.has_preprocessor);
        assert!(status.original_feature_count.is_none());
    }

    #[test]
    fn test_sidecar_absent() {
        let dir = tempfile::tempdir().unwrap();
        let sidecar: Sidecar<Vec<String>> = load_json_sidecar(&dir.path().join("missing.json"));
        assert!(matches!(sidecar, Sidecar::Absent));
    }

    #[test]
    fn test_sidecar_corrupt_is_distinguishable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(THRESHOLD_FILE);
        fs::write(&path, "not json at all").unwrap();

        let sidecar: Sidecar<ThresholdInfo> = load_json_sidecar(&path);
        assert!(sidecar.is_corrupt());
        assert!(sidecar.into_option().is_none());
    }

    #[test]
    fn test_sidecar_threshold_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(THRESHOLD_FILE);
        fs::write(
            &path,
            json!({ "optimal_threshold": 0.72, "f1_score": 0.61 }).to_string(),
        )
        .unwrap();

        let sidecar: Sidecar<ThresholdInfo> = load_json_sidecar(&path);
        let info = sidecar.into_option().unwrap();
        assert_eq!(info.optimal_threshold, 0.72);
        assert_eq!(info.f1_score, Some(0.61));
        assert!(info.precision.is_none());
    }

    #[test]
    fn test_sidecar_metadata_keeps_extra_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(METADATA_FILE);
        fs::write(
            &path,
            json!({ "model_version": "2.3.0", "trained_at": "2026-05-01" }).to_string(),
        )
        .unwrap();

        let sidecar: Sidecar<ModelMetadata> = load_json_sidecar(&path);
        let metadata = sidecar.into_option().unwrap();
        assert_eq!(metadata.model_version.as_deref(), Some("2.3.0"));
        assert_eq!(metadata.extra["trained_at"], json!("2026-05-01"));
    }
}

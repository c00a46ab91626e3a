//! Model Adapter: loads the trained classifier and turns an [`AnswerSet`]
//! into a `(domain, confidence)` prediction.
//!
//! The adapter decides its operating state exactly once, at construction:
//! a valid artifact bundle gives `Ready`, anything else gives `Demo`.
//! `Demo` is terminal for the adapter's lifetime and returns a fixed
//! canned result, a deliberate availability-over-correctness policy: a
//! student mid-session always gets *a* recommendation, never a crash.

pub mod bundle;
pub mod network;

use std::path::Path;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::catalog::AnswerSet;
use crate::encoder::encode;

pub use bundle::{ArtifactBundle, BundleError, BundleManifest, LayerSpec};
pub use network::{DenseLayer, MlpClassifier};

/// Canned result served in demo mode and on any prediction failure.
pub const DEMO_DOMAIN: &str = "informatique / ingénierie";
pub const DEMO_CONFIDENCE: f32 = 85.0;

/// Distinguishes a genuine model output from the canned fallback, so
/// callers and tests never have to guess which one they got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub domain: String,
    /// Percentage in `[0, 100]`.
    pub confidence: f32,
    pub source: PredictionSource,
}

impl Prediction {
    fn fallback() -> Self {
        Self {
            domain: DEMO_DOMAIN.to_string(),
            confidence: DEMO_CONFIDENCE,
            source: PredictionSource::Fallback,
        }
    }
}

enum ModelState {
    Ready(ArtifactBundle),
    Demo,
}

pub struct ModelAdapter {
    state: ModelState,
}

impl ModelAdapter {
    /// Loads the bundle under `dir`. A rejected or missing bundle logs the
    /// reason and constructs the adapter in demo mode; this never fails.
    pub fn load(dir: &Path) -> Self {
        match ArtifactBundle::load(dir) {
            Ok(bundle) => {
                info!(
                    classes = bundle.labels.len(),
                    features = bundle.feature_columns.len(),
                    "orientation model loaded"
                );
                Self {
                    state: ModelState::Ready(bundle),
                }
            }
            Err(e) => {
                warn!("model bundle rejected ({e}); running in demo mode");
                Self::demo()
            }
        }
    }

    /// Adapter that only ever serves the canned result.
    pub fn demo() -> Self {
        Self {
            state: ModelState::Demo,
        }
    }

    /// Wraps an already validated bundle, mainly for tests.
    pub fn from_bundle(bundle: ArtifactBundle) -> Self {
        Self {
            state: ModelState::Ready(bundle),
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self.state, ModelState::Demo)
    }

    /// Class labels the loaded model can produce; empty in demo mode.
    pub fn known_labels(&self) -> &[String] {
        match &self.state {
            ModelState::Ready(bundle) => &bundle.labels,
            ModelState::Demo => &[],
        }
    }

    /// Predicts the career domain for a complete answer set.
    ///
    /// Infallible by contract: demo mode and every internal error collapse
    /// to the fixed fallback result, tagged [`PredictionSource::Fallback`].
    pub fn predict(&self, answers: &AnswerSet) -> Prediction {
        match &self.state {
            ModelState::Demo => Prediction::fallback(),
            ModelState::Ready(bundle) => match infer(bundle, answers) {
                Ok(prediction) => prediction,
                Err(e) => {
                    error!("prediction failed ({e}); serving fallback result");
                    Prediction::fallback()
                }
            },
        }
    }
}

fn infer(bundle: &ArtifactBundle, answers: &AnswerSet) -> anyhow::Result<Prediction> {
    let features = encode(answers, &bundle.feature_columns)?;
    let proba = bundle.network.predict_proba(&features);

    // Arg-max class; the bundle guarantees proba.len() == labels.len() >= 1.
    let (class, confidence) = proba
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, p)| {
            if *p > best.1 {
                (i, *p)
            } else {
                best
            }
        });

    Ok(Prediction {
        domain: bundle.labels[class].clone(),
        confidence: confidence * 100.0,
        source: PredictionSource::Model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::first_option_answers;

    #[test]
    fn demo_mode_is_deterministic() {
        let adapter = ModelAdapter::demo();
        for _ in 0..3 {
            let p = adapter.predict(&first_option_answers());
            assert_eq!(p.domain, DEMO_DOMAIN);
            assert_eq!(p.confidence, DEMO_CONFIDENCE);
            assert_eq!(p.source, PredictionSource::Fallback);
        }
    }

    #[test]
    fn missing_bundle_directory_degrades_to_demo() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = ModelAdapter::load(&dir.path().join("nowhere"));
        assert!(adapter.is_demo());
        let p = adapter.predict(&AnswerSet::new());
        assert_eq!((p.domain.as_str(), p.confidence), (DEMO_DOMAIN, DEMO_CONFIDENCE));
    }
}

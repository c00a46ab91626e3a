//! Versioned model artifact bundle.
//!
//! A bundle directory holds the four files the adapter needs:
//! `manifest.json`, `feature_columns.json`, `labels.json` and
//! `model.safetensors`. The manifest pins a SHA-256 fingerprint of the
//! feature-column list plus the class list and layer shapes, so a bundle
//! whose parts drifted apart is rejected at load time instead of silently
//! mispredicting. Rejection is not fatal to the application: the adapter
//! falls back to demo mode.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use safetensors::tensor::Dtype;
use safetensors::SafeTensors;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::network::{DenseLayer, MlpClassifier, NetworkError};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const FEATURE_COLUMNS_FILE: &str = "feature_columns.json";
pub const LABELS_FILE: &str = "labels.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("missing model artifacts: {}", .0.join(", "))]
    MissingArtifacts(Vec<String>),
    #[error("failed to read bundle file")]
    Io(#[from] std::io::Error),
    #[error("malformed bundle file")]
    Json(#[from] serde_json::Error),
    #[error("schema fingerprint mismatch: manifest has {manifest}, columns hash to {actual}")]
    SchemaDrift { manifest: String, actual: String },
    #[error("label list does not match the classes recorded in the manifest")]
    ClassListMismatch,
    #[error("manifest declares no classes")]
    EmptyClasses,
    #[error("weight file: {0}")]
    Weights(String),
    #[error("tensor {tensor}: expected shape {expected:?}, found {actual:?}")]
    TensorShape {
        tensor: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("tensor {tensor}: expected f32 data")]
    TensorDtype { tensor: String },
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("classifier input width {model} does not match {schema} feature columns")]
    InputWidth { model: usize, schema: usize },
    #[error("classifier output width {model} does not match {classes} classes")]
    OutputWidth { model: usize, classes: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub input: usize,
    pub output: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    pub version: u32,
    /// Fingerprint of the feature-column list, see [`schema_fingerprint`].
    pub schema_sha256: String,
    /// Ordered class labels; the label encoder's inverse lookup table.
    pub classes: Vec<String>,
    /// Dense layers in forward order.
    pub layers: Vec<LayerSpec>,
}

/// Hex SHA-256 over the newline-joined feature-column list. Computed at
/// export time and re-checked at load time.
pub fn schema_fingerprint(columns: &[String]) -> String {
    let mut hasher = Sha256::new();
    for column in columns {
        hasher.update(column.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// A fully validated, read-only artifact bundle.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub manifest: BundleManifest,
    pub feature_columns: Vec<String>,
    pub labels: Vec<String>,
    pub network: MlpClassifier,
}

impl ArtifactBundle {
    /// Loads and cross-checks the bundle under `dir`.
    ///
    /// Any missing file or internal inconsistency is an error; the caller
    /// decides how to degrade.
    pub fn load(dir: &Path) -> Result<Self, BundleError> {
        let paths: [(&str, PathBuf); 4] = [
            (MANIFEST_FILE, dir.join(MANIFEST_FILE)),
            (FEATURE_COLUMNS_FILE, dir.join(FEATURE_COLUMNS_FILE)),
            (LABELS_FILE, dir.join(LABELS_FILE)),
            (WEIGHTS_FILE, dir.join(WEIGHTS_FILE)),
        ];
        let missing: Vec<String> = paths
            .iter()
            .filter(|(_, path)| !path.exists())
            .map(|(name, _)| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(BundleError::MissingArtifacts(missing));
        }

        let manifest: BundleManifest = serde_json::from_str(&fs::read_to_string(&paths[0].1)?)?;
        let feature_columns: Vec<String> = serde_json::from_str(&fs::read_to_string(&paths[1].1)?)?;
        let labels: Vec<String> = serde_json::from_str(&fs::read_to_string(&paths[2].1)?)?;

        let actual = schema_fingerprint(&feature_columns);
        if actual != manifest.schema_sha256 {
            return Err(BundleError::SchemaDrift {
                manifest: manifest.schema_sha256.clone(),
                actual,
            });
        }
        if labels != manifest.classes {
            return Err(BundleError::ClassListMismatch);
        }
        if labels.is_empty() {
            return Err(BundleError::EmptyClasses);
        }

        let weight_bytes = fs::read(&paths[3].1)?;
        let tensors = SafeTensors::deserialize(&weight_bytes)
            .map_err(|e| BundleError::Weights(e.to_string()))?;

        let mut layers = Vec::with_capacity(manifest.layers.len());
        for spec in &manifest.layers {
            let weight = load_matrix(&tensors, &format!("{}.weight", spec.name), spec.input, spec.output)?;
            let bias = load_vector(&tensors, &format!("{}.bias", spec.name), spec.output)?;
            layers.push(DenseLayer { weight, bias });
        }
        let network = MlpClassifier::new(layers)?;

        if network.input_width() != feature_columns.len() {
            return Err(BundleError::InputWidth {
                model: network.input_width(),
                schema: feature_columns.len(),
            });
        }
        if network.output_width() != labels.len() {
            return Err(BundleError::OutputWidth {
                model: network.output_width(),
                classes: labels.len(),
            });
        }

        Ok(Self {
            manifest,
            feature_columns,
            labels,
            network,
        })
    }
}

fn tensor_data<'a>(
    tensors: &'a SafeTensors,
    name: &str,
    expected_shape: &[usize],
) -> Result<&'a [u8], BundleError> {
    let view = tensors
        .tensor(name)
        .map_err(|e| BundleError::Weights(e.to_string()))?;
    if view.dtype() != Dtype::F32 {
        return Err(BundleError::TensorDtype {
            tensor: name.to_string(),
        });
    }
    if view.shape() != expected_shape {
        return Err(BundleError::TensorShape {
            tensor: name.to_string(),
            expected: expected_shape.to_vec(),
            actual: view.shape().to_vec(),
        });
    }
    Ok(view.data())
}

fn f32_values(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn load_matrix(
    tensors: &SafeTensors,
    name: &str,
    rows: usize,
    cols: usize,
) -> Result<Array2<f32>, BundleError> {
    let data = tensor_data(tensors, name, &[rows, cols])?;
    Array2::from_shape_vec((rows, cols), f32_values(data)).map_err(|e| BundleError::Weights(e.to_string()))
}

fn load_vector(tensors: &SafeTensors, name: &str, len: usize) -> Result<Array1<f32>, BundleError> {
    let data = tensor_data(tensors, name, &[len])?;
    Ok(Array1::from_vec(f32_values(data)))
}

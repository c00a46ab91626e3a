//! Shared fixtures: a tiny but genuine artifact bundle written to disk.

use std::fs;
use std::path::Path;

use boussole::model::bundle::{
    schema_fingerprint, BundleManifest, LayerSpec, FEATURE_COLUMNS_FILE, LABELS_FILE,
    MANIFEST_FILE, WEIGHTS_FILE,
};
use safetensors::tensor::{Dtype, TensorView};

pub const SCIENCES_PROMPT: &str = "Aimes-tu les matières scientifiques (maths, physique, chimie) ?";
pub const ARTS_PROMPT: &str = "Es-tu intéressé(e) par les arts (musique, dessin, théâtre) ?";

pub fn feature_columns() -> Vec<String> {
    vec![
        format!("{SCIENCES_PROMPT}_Oui, beaucoup"),
        format!("{SCIENCES_PROMPT}_Un peu"),
        format!("{SCIENCES_PROMPT}_Pas du tout"),
        format!("{ARTS_PROMPT}_Oui"),
    ]
}

pub fn labels() -> Vec<String> {
    vec![
        "informatique / ingénierie".to_string(),
        "arts / création".to_string(),
    ]
}

fn le_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Writes a one-layer softmax classifier over two survey questions:
/// strong science answers push class 0, arts interest pushes class 1.
pub fn write_bundle(dir: &Path) {
    let columns = feature_columns();
    let classes = labels();

    let weight = le_bytes(&[
        4.0, 0.0, // Oui, beaucoup
        1.0, 1.0, // Un peu
        0.0, 2.0, // Pas du tout
        0.0, 4.0, // arts Oui
    ]);
    let bias = le_bytes(&[0.0, 0.0]);
    let tensors = vec![
        (
            "dense_0.weight".to_string(),
            TensorView::new(Dtype::F32, vec![4, 2], &weight).unwrap(),
        ),
        (
            "dense_0.bias".to_string(),
            TensorView::new(Dtype::F32, vec![2], &bias).unwrap(),
        ),
    ];
    fs::write(
        dir.join(WEIGHTS_FILE),
        safetensors::serialize(tensors, &None).unwrap(),
    )
    .unwrap();

    let manifest = BundleManifest {
        version: 1,
        schema_sha256: schema_fingerprint(&columns),
        classes: classes.clone(),
        layers: vec![LayerSpec {
            name: "dense_0".to_string(),
            input: 4,
            output: 2,
        }],
    };
    fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.join(FEATURE_COLUMNS_FILE),
        serde_json::to_string(&columns).unwrap(),
    )
    .unwrap();
    fs::write(dir.join(LABELS_FILE), serde_json::to_string(&classes).unwrap()).unwrap();
}

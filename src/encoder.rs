//! Feature Encoder: one-hot expansion reconciled against the training schema.
//!
//! The classifier was trained on a dummy-encoded frame whose column names
//! follow the `"{prompt}_{value}"` convention. Serving-time answers must be
//! expanded the same way and then forced into the exact column order the
//! training run froze: columns the live expansion lacks are zero-filled,
//! columns the schema does not know are dropped. Encoding drift here
//! corrupts predictions without any shape error, so this reconciliation is
//! the load-bearing step of the whole pipeline.

use std::collections::HashSet;

use ndarray::Array1;
use thiserror::Error;

use crate::catalog::AnswerSet;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("feature schema is empty")]
    SchemaMismatch,
}

/// Column name produced by the dummy encoding for one prompt/value pair.
pub fn one_hot_column(prompt: &str, value: &str) -> String {
    format!("{prompt}_{value}")
}

/// Expands `answers` into indicator columns, then reorders, zero-fills and
/// drops to match `schema` exactly.
///
/// Pure function of its inputs. The output always has length
/// `schema.len()` and every element is 0.0 or 1.0.
pub fn encode(answers: &AnswerSet, schema: &[String]) -> Result<Array1<f32>, EncodeError> {
    if schema.is_empty() {
        return Err(EncodeError::SchemaMismatch);
    }

    let expanded: HashSet<String> = answers
        .iter()
        .map(|(prompt, value)| one_hot_column(prompt, value))
        .collect();

    Ok(Array1::from_iter(schema.iter().map(|column| {
        if expanded.contains(column) {
            1.0
        } else {
            0.0
        }
    })))
}

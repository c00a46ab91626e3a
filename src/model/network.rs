//! Forward pass of the orientation classifier.
//!
//! The trained network is a small dense stack (ReLU hidden layers, softmax
//! head). Dropout only exists at training time, so inference is a chain of
//! affine transforms with the activations applied between them.

use ndarray::{Array1, Array2};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("network has no layers")]
    Empty,
    #[error("layer {index}: weight shape ({rows}, {cols}) does not match bias length {bias}")]
    BiasShape {
        index: usize,
        rows: usize,
        cols: usize,
        bias: usize,
    },
    #[error("layer {index}: input width {input} does not chain with previous output {previous}")]
    BrokenChain {
        index: usize,
        input: usize,
        previous: usize,
    },
}

/// One affine layer, Keras layout: weight is `(input, output)` and the
/// activation is `x · W + b`.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

#[derive(Debug, Clone)]
pub struct MlpClassifier {
    layers: Vec<DenseLayer>,
}

impl MlpClassifier {
    /// Validates that layer shapes chain: every weight's output width must
    /// equal its bias length and the next layer's input width.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self, NetworkError> {
        if layers.is_empty() {
            return Err(NetworkError::Empty);
        }
        for (index, layer) in layers.iter().enumerate() {
            let (rows, cols) = layer.weight.dim();
            if cols != layer.bias.len() {
                return Err(NetworkError::BiasShape {
                    index,
                    rows,
                    cols,
                    bias: layer.bias.len(),
                });
            }
            if index > 0 {
                let previous = layers[index - 1].weight.dim().1;
                if rows != previous {
                    return Err(NetworkError::BrokenChain {
                        index,
                        input: rows,
                        previous,
                    });
                }
            }
        }
        Ok(Self { layers })
    }

    pub fn input_width(&self) -> usize {
        self.layers[0].weight.dim().0
    }

    pub fn output_width(&self) -> usize {
        self.layers[self.layers.len() - 1].weight.dim().1
    }

    /// Runs the forward pass and returns the softmax distribution over
    /// classes. The caller guarantees `x.len() == input_width()`.
    pub fn predict_proba(&self, x: &Array1<f32>) -> Array1<f32> {
        let last = self.layers.len() - 1;
        let mut activation = x.clone();
        for (index, layer) in self.layers.iter().enumerate() {
            activation = activation.dot(&layer.weight) + &layer.bias;
            if index < last {
                activation.mapv_inplace(|v| v.max(0.0));
            }
        }
        softmax(activation)
    }
}

/// Numerically stable softmax: shift by the max logit before exponentiating.
fn softmax(mut logits: Array1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    logits.mapv_inplace(|v| (v - max).exp());
    let sum = logits.sum();
    logits.mapv_inplace(|v| v / sum);
    logits
}

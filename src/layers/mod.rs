pub mod batch_norm;
pub mod dense;
pub mod dropout;
pub mod initialization;

pub use batch_norm::BatchNormLayer;
pub use dense::DenseLayer;
pub use dropout::DropoutLayer;
pub use initialization::WeightInit;

use serde::{Serialize, Deserialize};

/// One stage of the policy network
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum NetworkLayer {
    Dense(DenseLayer),
    BatchNorm(BatchNormLayer),
    Dropout(DropoutLayer),
}

impl NetworkLayer {
    pub fn parameter_count(&self) -> usize {
        match self {
            NetworkLayer::Dense(layer) => layer.parameter_count(),
            NetworkLayer::BatchNorm(layer) => layer.parameter_count(),
            NetworkLayer::Dropout(_) => 0,
        }
    }

    /// Shapes of the `(weight-like, bias-like)` parameters the optimizer
    /// updates, or `None` for layers without trainable parameters. Batch
    /// norm's gamma is handled as a one-row weight matrix.
    pub fn parameter_shapes(&self) -> Option<((usize, usize), usize)> {
        match self {
            NetworkLayer::Dense(layer) => Some((layer.weights.dim(), layer.biases.len())),
            NetworkLayer::BatchNorm(layer) => Some(((1, layer.num_features()), layer.num_features())),
            NetworkLayer::Dropout(_) => None,
        }
    }

    pub fn as_dense(&self) -> Option<&DenseLayer> {
        match self {
            NetworkLayer::Dense(layer) => Some(layer),
            _ => None,
        }
    }

    pub(crate) fn clear_cache(&mut self) {
        match self {
            NetworkLayer::Dense(layer) => layer.clear_cache(),
            NetworkLayer::BatchNorm(layer) => layer.clear_cache(),
            NetworkLayer::Dropout(layer) => layer.clear_cache(),
        }
    }
}

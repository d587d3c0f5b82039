use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Serialize, Deserialize};

use crate::error::{MindError, Result};

/// Batch Normalization Layer
///
/// Normalizes each feature across the batch to mean 0 and variance 1, then
/// scales and shifts with the learnable `gamma` and `beta`. Inference uses
/// the running statistics gathered during training.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BatchNormLayer {
    /// Scale parameter
    pub gamma: Array1<f32>,

    /// Shift parameter
    pub beta: Array1<f32>,

    /// Running mean for inference
    pub running_mean: Array1<f32>,

    /// Running variance for inference
    pub running_var: Array1<f32>,

    /// Weight of the newest batch in the running statistics
    pub momentum: f32,

    pub epsilon: f32,

    #[serde(skip)]
    cache: Option<NormCache>,
}

#[derive(Clone, Debug)]
struct NormCache {
    normalized: Array2<f32>,
    inv_std: Array1<f32>,
    /// Normalized with this batch's own statistics rather than the running ones
    batch_stats: bool,
}

impl BatchNormLayer {
    pub const DEFAULT_MOMENTUM: f32 = 0.01;
    pub const DEFAULT_EPSILON: f32 = 1e-3;

    pub fn new(num_features: usize, momentum: f32, epsilon: f32) -> Result<Self> {
        if num_features == 0 {
            return Err(MindError::invalid_parameter("batch_norm", "needs at least one feature"));
        }
        if !(momentum > 0.0 && momentum <= 1.0) || !(epsilon > 0.0) {
            return Err(MindError::invalid_parameter(
                "batch_norm",
                "momentum must be in (0, 1] and epsilon positive",
            ));
        }
        Ok(BatchNormLayer {
            gamma: Array1::ones(num_features),
            beta: Array1::zeros(num_features),
            running_mean: Array1::zeros(num_features),
            running_var: Array1::ones(num_features),
            momentum,
            epsilon,
            cache: None,
        })
    }

    pub fn with_defaults(num_features: usize) -> Result<Self> {
        Self::new(num_features, Self::DEFAULT_MOMENTUM, Self::DEFAULT_EPSILON)
    }

    pub fn num_features(&self) -> usize {
        self.gamma.len()
    }

    /// Trainable parameters: gamma and beta
    pub fn parameter_count(&self) -> usize {
        self.gamma.len() + self.beta.len()
    }

    fn running_inv_std(&self) -> Array1<f32> {
        self.running_var.mapv(|v| 1.0 / (v + self.epsilon).sqrt())
    }

    fn scale_shift(&self, normalized: &Array2<f32>) -> Array2<f32> {
        normalized * &self.gamma + &self.beta
    }

    /// Normalize with the running statistics, without caching.
    pub fn infer(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let normalized = (&inputs - &self.running_mean) * &self.running_inv_std();
        self.scale_shift(&normalized)
    }

    /// Training forward pass. Batches of more than one row are normalized
    /// with their own statistics, which also update the running ones; a
    /// single row falls back to the running statistics.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let rows = inputs.nrows();
        let (normalized, inv_std, batch_stats) = if rows > 1 {
            let mean = inputs.sum_axis(Axis(0)) / rows as f32;
            let centered = &inputs - &mean;
            let var = centered.mapv(|c| c * c).sum_axis(Axis(0)) / rows as f32;
            let inv_std = var.mapv(|v| 1.0 / (v + self.epsilon).sqrt());

            let keep = 1.0 - self.momentum;
            self.running_mean = &self.running_mean * keep + &mean * self.momentum;
            self.running_var = &self.running_var * keep + &var * self.momentum;

            (centered * &inv_std, inv_std, true)
        } else {
            let inv_std = self.running_inv_std();
            ((&inputs - &self.running_mean) * &inv_std, inv_std, false)
        };

        let output = self.scale_shift(&normalized);
        self.cache = Some(NormCache {
            normalized,
            inv_std,
            batch_stats,
        });
        output
    }

    /// Returns `(error w.r.t. this layer's inputs, gamma gradients, beta gradients)`.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<(Array2<f32>, Array1<f32>, Array1<f32>)> {
        let cache = self.cache.as_ref().ok_or_else(|| {
            MindError::TrainingBatch("forward_batch() must be called before backward_batch()".to_string())
        })?;

        let grad_beta = output_errors.sum_axis(Axis(0));
        let grad_gamma = (&output_errors * &cache.normalized).sum_axis(Axis(0));
        let grad_normalized = &output_errors * &self.gamma;

        let input_errors = if cache.batch_stats {
            let n = output_errors.nrows() as f32;
            let sum_grad = grad_normalized.sum_axis(Axis(0));
            let sum_grad_norm = (&grad_normalized * &cache.normalized).sum_axis(Axis(0));
            let centered = grad_normalized * n - &sum_grad - &cache.normalized * &sum_grad_norm;
            centered * &(&cache.inv_std / n)
        } else {
            grad_normalized * &cache.inv_std
        };

        Ok((input_errors, grad_gamma, grad_beta))
    }

    pub(crate) fn clear_cache(&mut self) {
        self.cache = None;
    }
}

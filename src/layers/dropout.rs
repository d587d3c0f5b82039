use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{MindError, Result};

/// Dropout Layer
///
/// Randomly zeroes units with probability `dropout_rate` while training and
/// rescales the survivors by `1 / (1 - rate)`. Inference is the identity.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DropoutLayer {
    pub dropout_rate: f32,

    size: usize,

    #[serde(skip)]
    cached_mask: Option<Array2<f32>>,
}

impl DropoutLayer {
    pub fn new(size: usize, dropout_rate: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&dropout_rate) {
            return Err(MindError::invalid_parameter("dropout_rate", "must be in [0, 1)"));
        }

        Ok(DropoutLayer {
            dropout_rate,
            size,
            cached_mask: None,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Training-mode forward pass; the mask is kept for the backward pass.
    pub fn forward_batch<R: Rng + ?Sized>(&mut self, inputs: ArrayView2<f32>, rng: &mut R) -> Array2<f32> {
        if self.dropout_rate == 0.0 {
            self.cached_mask = None;
            return inputs.to_owned();
        }

        let scale = 1.0 / (1.0 - self.dropout_rate);
        let rate = self.dropout_rate;
        let mask = Array2::from_shape_fn(inputs.dim(), |_| {
            if rng.gen::<f32>() >= rate { scale } else { 0.0 }
        });
        let outputs = &inputs * &mask;
        self.cached_mask = Some(mask);
        outputs
    }

    pub fn backward_batch(&self, grad_output: ArrayView2<f32>) -> Array2<f32> {
        match &self.cached_mask {
            Some(mask) => &grad_output * mask,
            None => grad_output.to_owned(),
        }
    }

    pub(crate) fn clear_cache(&mut self) {
        self.cached_mask = None;
    }
}

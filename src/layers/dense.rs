use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use super::initialization::WeightInit;
use crate::activations::Activation;
use crate::error::{MindError, Result};

/// A fully connected (dense) layer with optional L2 weight penalty
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    /// L2 coefficient; the penalty is `l2 * sum(w^2)`
    pub l2: f32,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a new dense layer with the given sizes and activation.
    /// Weights follow `init`; biases start at zero.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        let weights = init.initialize_weights((input_size, output_size), rng)?;
        let biases = init.initialize_biases(output_size);
        Ok(DenseLayer {
            weights,
            biases,
            activation,
            l2: 0.0,
            pre_activation_output: None,
            inputs: None,
        })
    }

    pub fn with_l2(mut self, l2: f32) -> Self {
        self.l2 = l2;
        self
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Forward pass without caching anything, for inference.
    pub fn infer(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Forward pass that keeps the inputs and pre-activations for
    /// `backward_batch`.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Returns `(error w.r.t. this layer's inputs, weight gradients, bias gradients)`.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<(Array2<f32>, Array2<f32>, Array1<f32>)> {
        let (pre_activation_output, inputs) = match (&self.pre_activation_output, &self.inputs) {
            (Some(pre), Some(inputs)) => (pre, inputs),
            _ => {
                return Err(MindError::TrainingBatch(
                    "forward_batch() must be called before backward_batch()".to_string(),
                ))
            }
        };

        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = output_errors.to_owned() * &activation_deriv;
        let mut weight_gradients = inputs.t().dot(&adjusted_error);
        if self.l2 > 0.0 {
            weight_gradients.scaled_add(2.0 * self.l2, &self.weights);
        }
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        let input_errors = adjusted_error.dot(&self.weights.t());

        Ok((input_errors, weight_gradients, bias_gradients))
    }

    /// Current value of the L2 penalty term
    pub fn l2_penalty(&self) -> f32 {
        if self.l2 > 0.0 {
            self.l2 * self.weights.mapv(|w| w * w).sum()
        } else {
            0.0
        }
    }

    pub(crate) fn clear_cache(&mut self) {
        self.inputs = None;
        self.pre_activation_output = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer(activation: Activation) -> DenseLayer {
        let mut rng = StdRng::seed_from_u64(3);
        DenseLayer::new(2, 2, activation, WeightInit::Zeros, &mut rng).unwrap()
    }

    #[test]
    fn test_infer_matches_forward() {
        let mut l = layer(Activation::Relu);
        l.weights = array![[1.0, -1.0], [0.5, 2.0]];
        let x = array![[1.0, 2.0]];
        let inferred = l.infer(x.view());
        let forwarded = l.forward_batch(x.view());
        assert_eq!(inferred, forwarded);
        assert_eq!(inferred, array![[2.0, 3.0]]);
    }

    #[test]
    fn test_backward_requires_forward() {
        let l = layer(Activation::Linear);
        assert!(l.backward_batch(array![[1.0, 1.0]].view()).is_err());
    }

    #[test]
    fn test_l2_adds_weight_gradient() {
        let mut l = layer(Activation::Linear).with_l2(0.5);
        l.weights = array![[1.0, 0.0], [0.0, 1.0]];
        l.forward_batch(array![[0.0, 0.0]].view());
        let (_, wg, bg) = l.backward_batch(array![[0.0, 0.0]].view()).unwrap();
        assert_eq!(wg, array![[1.0, 0.0], [0.0, 1.0]]);
        assert_eq!(bg, array![0.0, 0.0]);
        assert!((l.l2_penalty() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sizes_and_parameter_count() {
        let mut rng = StdRng::seed_from_u64(4);
        let l = DenseLayer::new(16, 64, Activation::Relu, WeightInit::HeNormal, &mut rng).unwrap();
        assert_eq!((l.input_size(), l.output_size()), (16, 64));
        assert_eq!(l.parameter_count(), 16 * 64 + 64);
    }
}

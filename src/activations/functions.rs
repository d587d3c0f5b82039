use ndarray::{Array2, ArrayView2, Axis};
use serde::{Serialize, Deserialize};

/// An enumeration of the activation functions a dense layer can apply.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    /// Row-wise softmax. Its derivative is reported as 1 because the
    /// network pairs it with cross-entropy, whose combined gradient with
    /// respect to the logits is `output - target`.
    Softmax,
}

impl Activation {
    /// Apply the activation function to a batch of rows in-place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => {
                inputs.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
            Activation::Softmax => {
                for mut row in inputs.axis_iter_mut(Axis(0)) {
                    // Shift by the row max for numerical stability
                    let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
                    row.mapv_inplace(|v| (v - max).exp());
                    let sum = row.sum();
                    if sum > 0.0 && sum.is_finite() {
                        row.mapv_inplace(|v| v / sum);
                    }
                }
            }
        }
    }

    /// Compute the derivative of the activation function for a batch of
    /// pre-activation values.
    pub fn derivative_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => inputs.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear | Activation::Softmax => Array2::ones(inputs.dim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_relu_clips_negatives() {
        let mut x = array![[-1.0, 0.0, 2.5]];
        Activation::Relu.apply_batch(&mut x);
        assert_eq!(x, array![[0.0, 0.0, 2.5]]);
        let d = Activation::Relu.derivative_batch(array![[-1.0, 0.5]].view());
        assert_eq!(d, array![[0.0, 1.0]]);
    }

    #[test]
    fn test_softmax_rows_are_distributions() {
        let mut x = array![[1000.0, 1000.0, 0.0, -5.0], [0.1, 0.2, 0.3, 0.4]];
        Activation::Softmax.apply_batch(&mut x);
        for row in x.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
        assert!((x[[0, 0]] - 0.5).abs() < 1e-5);
    }
}

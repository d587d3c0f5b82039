use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Normal, Uniform};
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{MindError, Result};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Xavier/Glorot uniform initialization
    XavierUniform,

    /// He/Kaiming normal initialization (for ReLU)
    HeNormal,

    /// All zeros
    Zeros,
}

impl WeightInit {
    /// Initialize a `(fan_in, fan_out)` weight matrix
    pub fn initialize_weights<R: Rng + ?Sized>(&self, shape: (usize, usize), rng: &mut R) -> Result<Array2<f32>> {
        let (fan_in, fan_out) = shape;

        match self {
            WeightInit::XavierUniform => {
                let limit = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
                Ok(Array2::random_using(shape, Uniform::new_inclusive(-limit, limit), rng))
            }

            WeightInit::HeNormal => {
                let std = (2.0 / fan_in.max(1) as f32).sqrt();
                let normal = Normal::new(0.0, std)
                    .map_err(|e| MindError::invalid_parameter("weight_init".to_string(), e.to_string()))?;
                Ok(Array2::random_using(shape, normal, rng))
            }

            WeightInit::Zeros => Ok(Array2::zeros(shape)),
        }
    }

    /// Biases always start at zero
    pub fn initialize_biases(&self, size: usize) -> Array1<f32> {
        Array1::zeros(size)
    }

    /// Get the recommended initialization for an activation function
    pub fn for_activation(activation: Activation) -> Self {
        match activation {
            Activation::Relu => WeightInit::HeNormal,
            Activation::Linear | Activation::Softmax => WeightInit::XavierUniform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_xavier_uniform_respects_limit() {
        let mut rng = StdRng::seed_from_u64(1);
        let w = WeightInit::XavierUniform.initialize_weights((32, 4), &mut rng).unwrap();
        let limit = (6.0f32 / 36.0).sqrt();
        assert!(w.iter().all(|&v| v.abs() <= limit));
    }

    #[test]
    fn test_seeded_init_is_reproducible() {
        let a = WeightInit::HeNormal.initialize_weights((16, 8), &mut StdRng::seed_from_u64(9)).unwrap();
        let b = WeightInit::HeNormal.initialize_weights((16, 8), &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zeros_and_biases() {
        let mut rng = StdRng::seed_from_u64(1);
        let w = WeightInit::Zeros.initialize_weights((3, 2), &mut rng).unwrap();
        assert!(w.iter().all(|&v| v == 0.0));
        assert_eq!(WeightInit::HeNormal.initialize_biases(4), Array1::<f32>::zeros(4));
        assert_eq!(WeightInit::for_activation(Activation::Relu), WeightInit::HeNormal);
    }
}

//! Parameter update rules for the policy network.
//!
//! Optimizers keep per-layer state indexed by the position of the layer
//! among the network's trainable layers, so one instance serves exactly one
//! network.

use ndarray::{Array1, Array2, Zip};
use serde::{Serialize, Deserialize};

pub trait Optimizer {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);
    /// Called once after every layer has been updated for a batch
    fn step(&mut self) {}
}

/// Adam with bias-corrected moment estimates
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    /// Completed steps, starting at 1 for the first update
    pub t: i32,
}

impl Adam {
    /// One moment slot per `(weight shape, bias length)` entry
    pub fn new<I>(shapes: I, beta1: f32, beta2: f32, epsilon: f32) -> Self
    where
        I: IntoIterator<Item = ((usize, usize), usize)>,
    {
        let mut m_weights = Vec::new();
        let mut m_biases = Vec::new();
        for (weights, biases) in shapes {
            m_weights.push(Array2::<f32>::zeros(weights));
            m_biases.push(Array1::<f32>::zeros(biases));
        }

        Adam {
            beta1,
            beta2,
            epsilon,
            v_weights: m_weights.clone(),
            v_biases: m_biases.clone(),
            m_weights,
            m_biases,
            t: 1,
        }
    }

    pub fn with_defaults<I>(shapes: I) -> Self
    where
        I: IntoIterator<Item = ((usize, usize), usize)>,
    {
        Self::new(shapes, 0.9, 0.999, 1e-8)
    }

    pub fn layer_count(&self) -> usize {
        self.m_weights.len()
    }

    /// Whether the moment slots fit these parameter shapes
    pub fn matches<I>(&self, shapes: I) -> bool
    where
        I: IntoIterator<Item = ((usize, usize), usize)>,
    {
        let shapes: Vec<_> = shapes.into_iter().collect();
        shapes.len() == self.m_weights.len()
            && shapes
                .iter()
                .zip(self.m_weights.iter().zip(&self.m_biases))
                .all(|(&(w, b), (mw, mb))| mw.dim() == w && mb.len() == b)
    }

    fn corrections(&self) -> (f32, f32) {
        (1.0 - self.beta1.powi(self.t), 1.0 - self.beta2.powi(self.t))
    }
}

impl Optimizer for Adam {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let (Some(m), Some(v)) = (self.m_weights.get_mut(layer), self.v_weights.get_mut(layer)) else {
            return;
        };

        Zip::from(weights)
            .and(m)
            .and(v)
            .and(gradients)
            .for_each(|w, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                *w -= learning_rate * (*m / c1) / ((*v / c2).sqrt() + eps);
            });
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let (Some(m), Some(v)) = (self.m_biases.get_mut(layer), self.v_biases.get_mut(layer)) else {
            return;
        };

        Zip::from(biases)
            .and(m)
            .and(v)
            .and(gradients)
            .for_each(|b, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                *b -= learning_rate * (*m / c1) / ((*v / c2).sqrt() + eps);
            });
    }

    fn step(&mut self) {
        self.t = self.t.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_adam_first_step_is_learning_rate_sized() {
        let mut adam = Adam::with_defaults([((1, 2), 2)]);
        assert_eq!(adam.layer_count(), 1);

        let mut w = array![[0.0, 0.0]];
        adam.update_weights(0, &mut w, &array![[2.0, -3.0]], 0.01);
        adam.step();
        assert!((w[[0, 0]] + 0.01).abs() < 1e-4);
        assert!((w[[0, 1]] - 0.01).abs() < 1e-4);
        assert_eq!(adam.t, 2);
    }

    #[test]
    fn test_shape_check() {
        let adam = Adam::with_defaults([((16, 64), 64), ((1, 64), 64)]);
        assert!(adam.matches([((16, 64), 64), ((1, 64), 64)]));
        assert!(!adam.matches([((16, 64), 64)]));
        assert!(!adam.matches([((16, 64), 64), ((1, 32), 32)]));
    }
}

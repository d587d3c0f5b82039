use ndarray::ArrayView1;
use rand::Rng;

use crate::error::{MindError, Result};

/// Result of one selection
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub explored: bool,
    pub epsilon: f32,
}

/// Epsilon-greedy selection whose exploration rate shrinks as the agent
/// becomes more efficient.
///
/// The random source is passed in, so a seeded or mocked generator makes
/// selection fully deterministic.
#[derive(Clone, Debug)]
pub struct ActionSelector {
    pub min_epsilon: f32,
    pub max_epsilon: f32,
    /// Exploration given up per unit of efficiency
    pub efficiency_weight: f32,
}

impl Default for ActionSelector {
    fn default() -> Self {
        ActionSelector {
            min_epsilon: 0.01,
            max_epsilon: 0.3,
            efficiency_weight: 0.2,
        }
    }
}

impl ActionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// `max(0.01, 0.3 - efficiency * 0.2)` with the default weights
    pub fn epsilon(&self, efficiency: f32) -> f32 {
        (self.max_epsilon - efficiency * self.efficiency_weight).max(self.min_epsilon)
    }

    pub fn select<R: Rng + ?Sized>(
        &self,
        distribution: ArrayView1<f32>,
        efficiency: f32,
        rng: &mut R,
    ) -> Result<Selection> {
        if distribution.is_empty() {
            return Err(MindError::invalid_parameter("distribution", "must not be empty"));
        }

        let epsilon = self.epsilon(efficiency);
        if rng.gen::<f32>() < epsilon {
            return Ok(Selection {
                index: rng.gen_range(0..distribution.len()),
                explored: true,
                epsilon,
            });
        }

        Ok(Selection {
            index: argmax(distribution),
            explored: false,
            epsilon,
        })
    }
}

/// Index of the largest value; ties go to the lowest index and NaN never wins.
pub fn argmax(values: ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

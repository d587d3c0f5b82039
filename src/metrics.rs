use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

/// Per-agent learning statistics with bounded histories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningMetrics {
    /// Rewards passed to learn ticks
    pub rewards: VecDeque<f32>,

    /// Training batch losses
    pub losses: VecDeque<f32>,

    /// Exploration rate at each decision
    pub epsilons: VecDeque<f32>,

    pub decisions: u64,
    pub explorations: u64,
    pub fallbacks: u64,
    pub training_steps: u64,
    pub training_failures: u64,

    history_size: usize,
}

impl LearningMetrics {
    pub const DEFAULT_HISTORY: usize = 100;

    pub fn new(history_size: usize) -> Self {
        let history_size = history_size.max(1);
        LearningMetrics {
            rewards: VecDeque::with_capacity(history_size),
            losses: VecDeque::with_capacity(history_size),
            epsilons: VecDeque::with_capacity(history_size),
            decisions: 0,
            explorations: 0,
            fallbacks: 0,
            training_steps: 0,
            training_failures: 0,
            history_size,
        }
    }

    fn push(history: &mut VecDeque<f32>, value: f32, limit: usize) {
        if history.len() >= limit {
            history.pop_front();
        }
        history.push_back(value);
    }

    pub fn record_decision(&mut self, epsilon: f32, explored: bool) {
        self.decisions += 1;
        if explored {
            self.explorations += 1;
        }
        Self::push(&mut self.epsilons, epsilon, self.history_size);
    }

    pub fn record_fallback(&mut self) {
        self.fallbacks += 1;
    }

    pub fn record_reward(&mut self, reward: f32) {
        Self::push(&mut self.rewards, reward, self.history_size);
    }

    pub fn record_training(&mut self, loss: f32) {
        self.training_steps += 1;
        Self::push(&mut self.losses, loss, self.history_size);
    }

    pub fn record_training_failure(&mut self) {
        self.training_failures += 1;
    }

    pub fn mean_reward(&self) -> Option<f32> {
        mean(&self.rewards)
    }

    pub fn mean_loss(&self) -> Option<f32> {
        mean(&self.losses)
    }

    pub fn exploration_ratio(&self) -> f32 {
        if self.decisions == 0 {
            0.0
        } else {
            self.explorations as f32 / self.decisions as f32
        }
    }
}

impl Default for LearningMetrics {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HISTORY)
    }
}

fn mean(values: &VecDeque<f32>) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

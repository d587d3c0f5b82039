use ndarray::Array1;
use rand::Rng;
use std::collections::VecDeque;

use crate::types::Action;

/// One decision tick as seen by the learner.
#[derive(Clone, Debug, PartialEq)]
pub struct Experience {
    pub state: Array1<f32>,
    pub action: Action,
    /// `None` until a learn tick fills it
    pub reward: Option<f32>,
    /// `None` until the following decision tick observes it
    pub next_state: Option<Array1<f32>>,
}

impl Experience {
    /// A freshly recorded experience awaiting its reward
    pub fn pending(state: Array1<f32>, action: Action) -> Self {
        Experience {
            state,
            action,
            reward: None,
            next_state: None,
        }
    }

    /// Reward with unset treated as zero
    pub fn reward_value(&self) -> f32 {
        self.reward.unwrap_or(0.0)
    }
}

/// Fixed-capacity FIFO of experiences with uniform sampling.
#[derive(Clone, Debug)]
pub struct ExperienceStore {
    buffer: VecDeque<Experience>,
    capacity: usize,
}

impl ExperienceStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ExperienceStore {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the oldest record when full.
    pub fn record(&mut self, experience: Experience) {
        while self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(experience);
    }

    /// Set the reward of the most recent record. Returns `false` when the
    /// store is empty.
    pub fn fill_latest_reward(&mut self, reward: f32) -> bool {
        match self.buffer.back_mut() {
            Some(latest) => {
                latest.reward = Some(reward);
                true
            }
            None => false,
        }
    }

    /// Set the next-state of the most recent record.
    pub fn fill_latest_next_state(&mut self, next_state: Array1<f32>) -> bool {
        match self.buffer.back_mut() {
            Some(latest) => {
                latest.next_state = Some(next_state);
                true
            }
            None => false,
        }
    }

    /// Draw `batch_size` records uniformly with replacement; the batch size
    /// is clamped to the current length.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<&Experience> {
        let len = self.buffer.len();
        if len == 0 {
            return Vec::new();
        }
        (0..batch_size.min(len))
            .map(|_| &self.buffer[rng.gen_range(0..len)])
            .collect()
    }

    /// Up to `n` rewards, newest first, skipping unset and zero rewards
    pub fn recent_nonzero_rewards(&self, n: usize) -> Vec<f32> {
        self.buffer
            .iter()
            .rev()
            .filter_map(|e| e.reward)
            .filter(|&r| r != 0.0)
            .take(n)
            .collect()
    }

    pub fn latest(&self) -> Option<&Experience> {
        self.buffer.back()
    }

    /// Records from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

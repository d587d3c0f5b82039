//! # Penguin AI - Per-Agent Decision Making and Online Learning
//!
//! Penguin AI gives every simulated penguin in a colony its own small neural
//! policy. On each decision tick the agent's state and surroundings are
//! encoded into a 16-wide feature vector, the policy produces a distribution
//! over four actions and an epsilon-greedy selector picks one. On each learn
//! tick the observed reward is attached to the last decision and, once enough
//! experience has accumulated, the policy is trained on a replayed batch.
//!
//! ## Key Features
//!
//! - **Policy network**: 16 → 64 → 64 → 32 → 4 with dropout, batch norm, L2 and Adam
//! - **Adaptive exploration**: epsilon shrinks as the agent gets more efficient
//! - **Experience replay**: bounded FIFO store with uniform sampling
//! - **Reward shaping**: outcome-based rewards bounded to [-10, 10]
//! - **Checkpoints**: atomic bincode files, one per agent or shared base
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use penguin_ai::colony::Colony;
//! use penguin_ai::config::MindConfig;
//! use std::collections::HashMap;
//!
//! let mut colony = Colony::new(MindConfig::default()).unwrap();
//! colony.register("pingu").unwrap();
//! colony.register("pinga").unwrap();
//!
//! let decisions = colony.decide_all(&HashMap::new());
//! for (id, decision) in &decisions {
//!     println!("{id}: {} ({})", decision.action, decision.reasoning);
//! }
//! colony.learn("pingu", 5.0).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - ReLU, linear and softmax
//! - [`agent`] - The per-agent decide/learn controller
//! - [`checkpoint`] - Named parameter files on disk
//! - [`colony`] - Registry running ticks for many agents
//! - [`config`] - Runtime configuration and world bounds
//! - [`encoder`] - Environment snapshot to feature vector
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense, batch-norm and dropout layers
//! - [`metrics`] - Learning statistics
//! - [`network`] - Feed-forward network and minibatch training
//! - [`optimizer`] - Adam
//! - [`policy`] - Policy model: predict, train, save, load
//! - [`replay_buffer`] - Experience store
//! - [`reward`] - Outcome to reward mapping
//! - [`selector`] - Epsilon-greedy action selection
//! - [`types`] - Actions, agent state and decisions

pub mod activations;
pub mod agent;
pub mod checkpoint;
pub mod colony;
pub mod config;
pub mod encoder;
pub mod error;
pub mod layers;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod policy;
pub mod replay_buffer;
pub mod reward;
pub mod selector;
pub mod types;

#[cfg(test)]
mod tests;

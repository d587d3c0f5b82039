//! # Agent Controller Module
//!
//! One [`AgentController`] drives one penguin. A simulation calls it in two
//! alternating ticks:
//!
//! - **decide**: encode the agent and its surroundings, ask the policy for
//!   an action distribution, pick an action epsilon-greedily and record a
//!   pending experience.
//! - **learn**: attach the observed reward to that experience, update the
//!   efficiency statistic and, once enough experiences exist, train the
//!   policy on a sampled batch.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use penguin_ai::agent::AgentController;
//! use penguin_ai::config::MindConfig;
//! use penguin_ai::encoder::EnvironmentSnapshot;
//!
//! let mut agent = AgentController::builder("pingu")
//!     .config(MindConfig::default())
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let snapshot = EnvironmentSnapshot {
//!     nearest_fish_distance: Some(120.0),
//!     ..Default::default()
//! };
//! let decision = agent.decide(Some(&snapshot));
//! println!("{} ({:.2}): {}", decision.action, decision.confidence, decision.reasoning);
//!
//! agent.learn(7.0);
//! ```

mod controller;

pub use controller::{AgentController, AgentControllerBuilder, LearnReport};

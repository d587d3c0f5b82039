//! # Configuration
//!
//! All tunables of the decision-and-learning core live in [`MindConfig`].
//! Every field has a default, so a JSON file only needs to name what it
//! overrides:
//!
//! ```rust
//! use penguin_ai::config::MindConfig;
//!
//! let config = MindConfig::from_json_str(r#"{ "batch_size": 16, "seed": 7 }"#).unwrap();
//! assert_eq!(config.batch_size, 16);
//! assert_eq!(config.experience_capacity, 1000);
//! ```

use serde::{Serialize, Deserialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::encoder::StateEncoder;
use crate::error::{MindError, Result};
use crate::types::{Position, NUM_ACTIONS};

/// Rectangle that decision targets are clamped into
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    /// Divisor applied to positions before they enter the feature vector
    pub position_scale: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        WorldBounds {
            min_x: 50.0,
            max_x: 950.0,
            min_y: 50.0,
            max_y: 650.0,
            position_scale: 1000.0,
        }
    }
}

impl WorldBounds {
    /// Nearest point inside the bounds. A NaN coordinate maps to the
    /// lower bound of its axis.
    pub fn clamp(&self, position: Position) -> Position {
        Position {
            x: clamp_axis(position.x, self.min_x, self.max_x),
            y: clamp_axis(position.y, self.min_y, self.max_y),
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        (self.min_x..=self.max_x).contains(&position.x) && (self.min_y..=self.max_y).contains(&position.y)
    }
}

fn clamp_axis(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Shape and regularization of the policy network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub hidden_sizes: Vec<usize>,
    /// Dropout after each of the first hidden layers; shorter than
    /// `hidden_sizes` means the remaining layers have none
    pub dropout_rates: Vec<f32>,
    /// Hidden layers (0-based) followed by batch normalization
    pub batch_norm_layers: Vec<usize>,
    /// L2 penalty on the weights of the regularized layers
    pub l2: f32,
    /// Number of leading hidden layers that carry the L2 penalty
    pub l2_layers: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            hidden_sizes: vec![64, 64, 32],
            dropout_rates: vec![0.3, 0.2],
            batch_norm_layers: vec![1],
            l2: 1e-4,
            l2_layers: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MindConfig {
    /// Width of the encoded state; must equal the encoder output
    pub input_width: usize,
    pub experience_capacity: usize,
    pub batch_size: usize,
    /// Store length required before a learn tick trains
    pub min_experiences_to_train: usize,
    /// Scale of the reward nudge in `train_on_batch`
    pub learning_rate: f32,
    /// Step size handed to the optimizer when fitting targets
    pub optimizer_learning_rate: f32,
    /// Lower bound for every entry of a renormalized training target
    pub probability_floor: f32,
    pub network: NetworkConfig,
    pub world: WorldBounds,
    pub checkpoint_dir: PathBuf,
    /// Checkpoint tried first by `PolicyModel::initialize`
    pub base_checkpoint: String,
    /// Seed for the controller's random source; entropy when absent
    pub seed: Option<u64>,
}

impl Default for MindConfig {
    fn default() -> Self {
        MindConfig {
            input_width: StateEncoder::WIDTH,
            experience_capacity: 1000,
            batch_size: 32,
            min_experiences_to_train: 32,
            learning_rate: 0.1,
            optimizer_learning_rate: 0.001,
            probability_floor: 0.01,
            network: NetworkConfig::default(),
            world: WorldBounds::default(),
            checkpoint_dir: PathBuf::from("models"),
            base_checkpoint: "penguin-behavior-base".to_string(),
            seed: None,
        }
    }
}

impl MindConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MindConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Layer sizes from input to output, e.g. `[16, 64, 64, 32, 4]`
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.network.hidden_sizes.len() + 2);
        sizes.push(self.input_width);
        sizes.extend_from_slice(&self.network.hidden_sizes);
        sizes.push(NUM_ACTIONS);
        sizes
    }

    /// Check the configuration once, at startup.
    pub fn validate(&self) -> Result<()> {
        if self.input_width != StateEncoder::WIDTH {
            return Err(MindError::dimension_mismatch(
                format!("input_width {}", StateEncoder::WIDTH),
                format!("input_width {}", self.input_width),
            ));
        }
        if self.experience_capacity == 0 {
            return Err(MindError::invalid_parameter("experience_capacity", "must be greater than 0"));
        }
        if self.batch_size == 0 {
            return Err(MindError::invalid_parameter("batch_size", "must be greater than 0"));
        }
        if self.min_experiences_to_train == 0 {
            return Err(MindError::invalid_parameter("min_experiences_to_train", "must be greater than 0"));
        }
        if !(self.probability_floor > 0.0 && self.probability_floor < 1.0 / NUM_ACTIONS as f32) {
            return Err(MindError::invalid_parameter(
                "probability_floor",
                "must lie in (0, 1/num_actions)",
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(MindError::invalid_parameter("learning_rate", "must be finite and positive"));
        }
        if !(self.optimizer_learning_rate.is_finite() && self.optimizer_learning_rate > 0.0) {
            return Err(MindError::invalid_parameter("optimizer_learning_rate", "must be finite and positive"));
        }
        if self.network.hidden_sizes.is_empty() || self.network.hidden_sizes.contains(&0) {
            return Err(MindError::invalid_parameter("network.hidden_sizes", "need at least one non-empty hidden layer"));
        }
        if self.network.dropout_rates.iter().any(|r| !(0.0..1.0).contains(r)) {
            return Err(MindError::invalid_parameter("network.dropout_rates", "each rate must be in [0, 1)"));
        }
        if self.network.batch_norm_layers.iter().any(|&i| i >= self.network.hidden_sizes.len()) {
            return Err(MindError::invalid_parameter("network.batch_norm_layers", "index past the last hidden layer"));
        }
        if self.network.l2 < 0.0 {
            return Err(MindError::invalid_parameter("network.l2", "must not be negative"));
        }
        let w = &self.world;
        if !(w.min_x < w.max_x && w.min_y < w.max_y && w.position_scale > 0.0) {
            return Err(MindError::invalid_parameter("world", "bounds must be non-empty and scale positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MindConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layer_sizes(), vec![16, 64, 64, 32, 4]);
    }

    #[test]
    fn test_input_width_mismatch_fails_fast() {
        let err = MindConfig::from_json_str(r#"{ "input_width": 12 }"#).unwrap_err();
        assert!(matches!(err, MindError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MindConfig::from_json_str(r#"{ "world": { "max_x": 2000.0 } }"#).unwrap();
        assert_eq!(config.world.max_x, 2000.0);
        assert_eq!(config.world.min_x, 50.0);
        assert_eq!(config.base_checkpoint, "penguin-behavior-base");
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mind.json");
        let config = MindConfig { seed: Some(42), ..MindConfig::default() };
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(MindConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_batch_norm_index_must_name_a_hidden_layer() {
        let err = MindConfig::from_json_str(r#"{ "network": { "batch_norm_layers": [3] } }"#).unwrap_err();
        assert!(matches!(err, MindError::InvalidParameter { .. }));
    }

    #[test]
    fn test_world_bounds_clamp() {
        let bounds = WorldBounds::default();
        let p = bounds.clamp(Position::new(-10.0, 9000.0));
        assert_eq!(p, Position::new(50.0, 650.0));
        assert!(bounds.contains(p));
    }

    #[test]
    fn test_world_bounds_clamp_non_finite() {
        let bounds = WorldBounds::default();
        let p = bounds.clamp(Position::new(f32::NAN, f32::INFINITY));
        assert_eq!(p, Position::new(50.0, 650.0));
        assert!(bounds.contains(p));

        let p = bounds.clamp(Position::new(f32::NEG_INFINITY, f32::NAN));
        assert_eq!(p, Position::new(50.0, 50.0));
    }
}

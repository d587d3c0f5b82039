//! The policy: a small feed-forward network mapping an encoded state to a
//! distribution over {move, collect, socialize, rest}.
//!
//! ## Training rule
//!
//! `train_on_batch` is a reward-weighted imitation step. For every sample
//! the current output row becomes the target after
//!
//! 1. `target[action] += learning_rate * reward`
//! 2. if the row sum is positive, `target[j] = max(floor, target[j] / sum)`
//!
//! and the network is then fitted toward these targets with one optimizer
//! step. The shape of this update is part of the observable agent
//! behavior and must stay as it is.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};
use tracing::{debug, error, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::MindConfig;
use crate::error::{MindError, Result};
use crate::network::NeuralNetwork;

const CHECKPOINT_FORMAT: u32 = 2;

#[derive(Serialize, Deserialize)]
struct Checkpoint {
    format: u32,
    train_steps: u64,
    network: NeuralNetwork,
}

/// Where the parameters came from after `initialize`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelSource {
    Loaded,
    Fresh,
}

pub struct PolicyModel {
    network: Option<NeuralNetwork>,
    store: CheckpointStore,
    config: MindConfig,
    rng: StdRng,
    train_steps: u64,
}

impl PolicyModel {
    pub fn new(config: &MindConfig, rng: StdRng) -> Self {
        PolicyModel {
            network: None,
            store: CheckpointStore::new(config.checkpoint_dir.clone()),
            config: config.clone(),
            rng,
            train_steps: 0,
        }
    }

    pub fn with_seed(config: &MindConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Load the base checkpoint, or build fresh parameters when there is
    /// none. A missing or unusable checkpoint is the normal first-run path.
    pub fn initialize(&mut self) -> Result<ModelSource> {
        let name = self.config.base_checkpoint.clone();
        match self.read_checkpoint(&name) {
            Ok(checkpoint) => {
                self.network = Some(checkpoint.network);
                self.train_steps = checkpoint.train_steps;
                info!(checkpoint = %name, "Model loaded");
                Ok(ModelSource::Loaded)
            }
            Err(MindError::CheckpointLoad { reason, .. }) => {
                info!(checkpoint = %name, %reason, "No usable checkpoint, creating new policy network");
                let network = NeuralNetwork::for_policy(&self.config, &mut self.rng)?;
                info!(parameters = network.parameter_count(), "Policy network created");
                self.network = Some(network);
                self.train_steps = 0;
                Ok(ModelSource::Fresh)
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.network.is_some()
    }

    pub fn train_steps(&self) -> u64 {
        self.train_steps
    }

    pub fn network(&self) -> Option<&NeuralNetwork> {
        self.network.as_ref()
    }

    fn network_ref(&self) -> Result<&NeuralNetwork> {
        self.network.as_ref().ok_or(MindError::ModelNotInitialized)
    }

    /// Action distribution for one encoded state. Entries are non-negative.
    pub fn predict(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        let output = self.network_ref()?.forward(state)?;
        if output.iter().any(|p| !p.is_finite()) {
            return Err(MindError::Numerical("policy produced a non-finite output".to_string()));
        }
        Ok(output.mapv(|p| p.max(0.0)))
    }

    /// Build the adjusted training targets for a batch of current outputs.
    pub fn adjusted_targets(
        mut outputs: Array2<f32>,
        actions: &[usize],
        rewards: &[f32],
        learning_rate: f32,
        floor: f32,
    ) -> Array2<f32> {
        for ((mut row, &action), &reward) in outputs.rows_mut().into_iter().zip(actions).zip(rewards) {
            if let Some(value) = row.get_mut(action) {
                *value += learning_rate * reward;
            }
            let sum = row.sum();
            if sum > 0.0 {
                row.mapv_inplace(|v| (v / sum).max(floor));
            } else {
                // Row collapsed under a large penalty; keep it non-negative
                row.mapv_inplace(|v| v.max(floor));
            }
        }
        outputs
    }

    /// One reward-weighted imitation step; returns the batch loss.
    pub fn train_on_batch(&mut self, states: &[ArrayView1<f32>], actions: &[usize], rewards: &[f32]) -> Result<f32> {
        let width = self.network_ref()?.input_size();
        let outputs = self.network_ref()?.output_size();

        if states.is_empty() {
            return Err(MindError::TrainingBatch("empty batch".to_string()));
        }
        if states.len() != actions.len() || states.len() != rewards.len() {
            return Err(MindError::TrainingBatch(format!(
                "batch columns differ: {} states, {} actions, {} rewards",
                states.len(),
                actions.len(),
                rewards.len()
            )));
        }
        if let Some(&bad) = actions.iter().find(|&&a| a >= outputs) {
            return Err(MindError::TrainingBatch(format!("action {} out of range 0..{}", bad, outputs)));
        }

        let mut inputs = Array2::zeros((states.len(), width));
        for (mut row, state) in inputs.rows_mut().into_iter().zip(states) {
            if state.len() != width {
                return Err(MindError::TrainingBatch(format!(
                    "state width {} does not match model input {}",
                    state.len(),
                    width
                )));
            }
            row.assign(state);
        }

        let current = self.network_ref()?.infer(inputs.view())?;
        let targets = Self::adjusted_targets(
            current,
            actions,
            rewards,
            self.config.learning_rate,
            self.config.probability_floor,
        );

        let learning_rate = self.config.optimizer_learning_rate;
        let network = self.network.as_mut().ok_or(MindError::ModelNotInitialized)?;
        let loss = network
            .train_minibatch(inputs.view(), targets.view(), learning_rate, &mut self.rng)
            .map_err(|e| MindError::TrainingBatch(e.to_string()))?;

        self.train_steps += 1;
        debug!(step = self.train_steps, batch = states.len(), loss, "Trained policy batch");
        Ok(loss)
    }

    /// Persist the parameters under `name`. Failures are logged and returned.
    pub fn save(&self, name: &str) -> Result<()> {
        let result = self.network_ref().and_then(|network| {
            let checkpoint = Checkpoint {
                format: CHECKPOINT_FORMAT,
                train_steps: self.train_steps,
                network: network.clone(),
            };
            let bytes = bincode::serialize(&checkpoint).map_err(|e| MindError::checkpoint_save(name, e))?;
            self.store.save(name, &bytes)
        });

        match &result {
            Ok(()) => info!(checkpoint = %name, "Model saved"),
            Err(e) => error!(checkpoint = %name, error = %e, "Model save failed"),
        }
        result
    }

    /// Replace the parameters with the checkpoint `name`. On failure the
    /// current parameters are left untouched.
    pub fn load(&mut self, name: &str) -> Result<()> {
        match self.read_checkpoint(name) {
            Ok(checkpoint) => {
                self.network = Some(checkpoint.network);
                self.train_steps = checkpoint.train_steps;
                info!(checkpoint = %name, "Model loaded");
                Ok(())
            }
            Err(e) => {
                warn!(checkpoint = %name, error = %e, "Model load failed");
                Err(e)
            }
        }
    }

    fn read_checkpoint(&self, name: &str) -> Result<Checkpoint> {
        let bytes = self.store.load(name)?;
        let checkpoint: Checkpoint = bincode::deserialize(&bytes).map_err(|e| MindError::checkpoint_load(name, e))?;
        if checkpoint.format != CHECKPOINT_FORMAT {
            return Err(MindError::checkpoint_load(
                name,
                format!("unsupported format {}", checkpoint.format),
            ));
        }
        let network = NeuralNetwork::new(checkpoint.network.layers, checkpoint.network.optimizer)
            .map_err(|e| MindError::checkpoint_load(name, e))?;

        let expected = self.config.layer_sizes();
        if network.input_size() != expected[0] || network.output_size() != expected[expected.len() - 1] {
            return Err(MindError::checkpoint_load(
                name,
                format!(
                    "shape {}->{} does not match {}->{}",
                    network.input_size(),
                    network.output_size(),
                    expected[0],
                    expected[expected.len() - 1]
                ),
            ));
        }
        Ok(Checkpoint { network, ..checkpoint })
    }

    /// Human-readable description of the architecture
    pub fn summary(&self) -> String {
        let Some(network) = &self.network else {
            return "Model not initialized".to_string();
        };
        let sizes = self.config.layer_sizes();
        let mut lines = vec!["Policy network:".to_string(), format!("  input: {}", sizes[0])];
        let hidden = &sizes[1..sizes.len() - 1];
        for (i, size) in hidden.iter().enumerate() {
            let dropout = self
                .config
                .network
                .dropout_rates
                .get(i)
                .map_or(String::new(), |r| format!(", dropout {}", r));
            let norm = if self.config.network.batch_norm_layers.contains(&i) {
                ", batch norm"
            } else {
                ""
            };
            lines.push(format!("  hidden {}: {} (relu{}{})", i + 1, size, norm, dropout));
        }
        lines.push(format!("  output: {} (softmax)", sizes[sizes.len() - 1]));
        lines.push(format!("  parameters: {}", network.parameter_count()));
        lines.push(format!("  train steps: {}", self.train_steps));
        lines.join("\n")
    }
}

//! A registry of agent controllers keyed by agent id.

use std::collections::HashMap;

use ndarray::parallel::prelude::{IntoParallelRefMutIterator, ParallelIterator};
use tracing::{info, warn};

use crate::agent::{AgentController, LearnReport};
use crate::config::MindConfig;
use crate::encoder::EnvironmentSnapshot;
use crate::error::{MindError, Result};
use crate::policy::ModelSource;
use crate::types::Decision;

/// Owns one controller per agent.
///
/// Every controller is reachable only through `&mut Colony`, so two ticks
/// for the same agent can never run at the same time. `decide_all` hands
/// each worker thread an exclusive borrow of a different controller.
pub struct Colony {
    config: MindConfig,
    agents: HashMap<String, AgentController>,
    next_seed: Option<u64>,
}

impl Colony {
    pub fn new(config: MindConfig) -> Result<Self> {
        config.validate()?;
        let next_seed = config.seed;
        Ok(Colony {
            config,
            agents: HashMap::new(),
            next_seed,
        })
    }

    pub fn config(&self) -> &MindConfig {
        &self.config
    }

    /// Create and initialize a controller for `id`. Registering an id
    /// twice is an error.
    pub fn register<S: Into<String>>(&mut self, id: S) -> Result<ModelSource> {
        let id = id.into();
        if self.agents.contains_key(&id) {
            return Err(MindError::invalid_parameter("id".to_string(), format!("agent {} already registered", id)));
        }

        let mut builder = AgentController::builder(id.clone()).config(self.config.clone()).uninitialized();
        if let Some(seed) = self.next_seed {
            builder = builder.seed(seed);
            self.next_seed = Some(seed.wrapping_add(1));
        }
        let mut controller = builder.build()?;
        let source = controller.initialize()?;

        info!(agent = %id, ?source, agents = self.agents.len() + 1, "Agent registered");
        self.agents.insert(id, controller);
        Ok(source)
    }

    /// Drop the controller for `id`; no further ticks run for it.
    pub fn remove(&mut self, id: &str) -> Option<AgentController> {
        let removed = self.agents.remove(id);
        if removed.is_some() {
            info!(agent = %id, agents = self.agents.len(), "Agent removed");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&AgentController> {
        self.agents.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut AgentController> {
        self.agents.get_mut(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// One decision tick per agent, in parallel. Agents without an entry in
    /// `snapshots` decide from default surroundings.
    pub fn decide_all(&mut self, snapshots: &HashMap<String, EnvironmentSnapshot>) -> HashMap<String, Decision> {
        self.agents
            .par_iter_mut()
            .map(|(id, agent)| {
                let decision = agent.decide(snapshots.get(id));
                (id.clone(), decision)
            })
            .collect()
    }

    pub fn decide(&mut self, id: &str, snapshot: Option<&EnvironmentSnapshot>) -> Result<Decision> {
        let agent = self.agent_mut(id)?;
        Ok(agent.decide(snapshot))
    }

    pub fn learn(&mut self, id: &str, reward: f32) -> Result<LearnReport> {
        let agent = self.agent_mut(id)?;
        Ok(agent.learn(reward))
    }

    /// Run one extra training batch for every agent with enough
    /// experiences, one agent at a time. Returns the number of batches that
    /// succeeded.
    pub fn global_training_pass(&mut self) -> usize {
        let mut trained = 0;
        for (id, agent) in self.agents.iter_mut() {
            if agent.experiences().len() < agent.config().min_experiences_to_train {
                continue;
            }
            match agent.replay() {
                Ok(_) => trained += 1,
                Err(e) => warn!(agent = %id, error = %e, "Global training batch failed"),
            }
        }
        info!(trained, agents = self.agents.len(), "Global training pass complete");
        trained
    }

    /// Save every agent's model; returns the ids whose save failed.
    pub fn save_all(&self) -> Vec<String> {
        self.agents
            .iter()
            .filter(|(_, agent)| agent.save_model().is_err())
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn agent_mut(&mut self, id: &str) -> Result<&mut AgentController> {
        self.agents
            .get_mut(id)
            .ok_or_else(|| MindError::invalid_parameter("id".to_string(), format!("unknown agent {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn colony_in(dir: &std::path::Path) -> Colony {
        let config = MindConfig {
            checkpoint_dir: dir.to_path_buf(),
            seed: Some(11),
            ..MindConfig::default()
        };
        Colony::new(config).unwrap()
    }

    #[test]
    fn test_register_and_remove() {
        let dir = tempdir().unwrap();
        let mut colony = colony_in(dir.path());

        assert_eq!(colony.register("a").unwrap(), ModelSource::Fresh);
        colony.register("b").unwrap();
        assert!(colony.register("a").is_err());
        assert_eq!(colony.len(), 2);

        assert!(colony.remove("a").is_some());
        assert!(colony.remove("a").is_none());
        assert!(colony.decide("a", None).is_err());
        assert_eq!(colony.len(), 1);
    }

    #[test]
    fn test_decide_all_covers_every_agent() {
        let dir = tempdir().unwrap();
        let mut colony = colony_in(dir.path());
        for id in ["a", "b", "c"] {
            colony.register(id).unwrap();
        }

        let mut snapshots = HashMap::new();
        snapshots.insert(
            "a".to_string(),
            EnvironmentSnapshot {
                nearest_fish_distance: Some(10.0),
                ..Default::default()
            },
        );

        let decisions = colony.decide_all(&snapshots);
        assert_eq!(decisions.len(), 3);
        for id in ["a", "b", "c"] {
            assert!(!decisions[id].is_fallback());
            assert_eq!(colony.get(id).unwrap().experiences().len(), 1);
        }
    }

    #[test]
    fn test_global_pass_skips_agents_without_enough_experience() {
        let dir = tempdir().unwrap();
        let mut colony = colony_in(dir.path());
        colony.register("busy").unwrap();
        colony.register("idle").unwrap();

        let needed = colony.config().min_experiences_to_train;
        for _ in 0..needed {
            colony.decide("busy", None).unwrap();
            colony.learn("busy", 1.0).unwrap();
        }

        assert_eq!(colony.global_training_pass(), 1);
    }
}

//! Turns a raw environment snapshot plus agent state into the fixed-width
//! feature vector the policy network consumes.
//!
//! Encoding never fails. Absent fields fall back to documented defaults:
//! distances read as "far" (1.0), densities as mid-range values rather than
//! zero so an agent with no information is not biased toward any action.

use ndarray::Array1;
use serde::{Serialize, Deserialize};

use crate::config::WorldBounds;
use crate::types::AgentState;

/// Everything the caller may know about the surroundings of one agent.
/// All fields are optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSnapshot {
    pub nearest_fish_distance: Option<f32>,
    pub nearest_yarn_distance: Option<f32>,
    pub nearest_agent_distance: Option<f32>,
    /// Number of other agents nearby
    pub nearby_agents: Option<usize>,
    pub fish_count: Option<usize>,
    pub yarn_count: Option<usize>,
    /// Ambient mood on a 0..100 scale
    pub factory_mood: Option<f32>,
    pub turbo_mode: Option<bool>,
    /// Fraction of the day elapsed, 0..1
    pub time_of_day: Option<f32>,
    /// Weather factor, 0..1
    pub weather: Option<f32>,
}

/// Snapshot with every field normalized to [0, 1]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEnvironment {
    pub nearest_fish_distance: f32,
    pub nearest_yarn_distance: f32,
    pub nearest_agent_distance: f32,
    pub crowd_density: f32,
    pub fish_density: f32,
    pub yarn_density: f32,
    pub factory_mood: f32,
    pub turbo_mode: f32,
    pub time_of_day: f32,
    pub weather: f32,
}

impl Default for ProcessedEnvironment {
    fn default() -> Self {
        ProcessedEnvironment {
            nearest_fish_distance: 1.0,
            nearest_yarn_distance: 1.0,
            nearest_agent_distance: 1.0,
            crowd_density: 0.5,
            fish_density: 0.3,
            yarn_density: 0.1,
            factory_mood: 0.7,
            turbo_mode: 0.0,
            time_of_day: 0.5,
            weather: 0.8,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StateEncoder {
    world: WorldBounds,
}

impl StateEncoder {
    /// Length of every encoded vector
    pub const WIDTH: usize = 16;
    /// Memory entries appended to the vector
    pub const MEMORY_FEATURES: usize = 4;
    /// Distance that normalizes to 1.0
    pub const DISTANCE_HORIZON: f32 = 500.0;
    pub const AGENT_CAP: f32 = 10.0;
    pub const ITEM_CAP: f32 = 20.0;
    /// Divisor for lifetime counters
    pub const COUNTER_SCALE: f32 = 100.0;

    pub fn new(world: WorldBounds) -> Self {
        StateEncoder { world }
    }

    /// Normalize a snapshot; `None` yields the defaults.
    pub fn process(&self, snapshot: Option<&EnvironmentSnapshot>) -> ProcessedEnvironment {
        let defaults = ProcessedEnvironment::default();
        let Some(env) = snapshot else {
            return defaults;
        };

        ProcessedEnvironment {
            nearest_fish_distance: env.nearest_fish_distance.map_or(defaults.nearest_fish_distance, normalize_distance),
            nearest_yarn_distance: env.nearest_yarn_distance.map_or(defaults.nearest_yarn_distance, normalize_distance),
            nearest_agent_distance: env.nearest_agent_distance.map_or(defaults.nearest_agent_distance, normalize_distance),
            crowd_density: env.nearby_agents.map_or(defaults.crowd_density, |n| unit(n as f32 / Self::AGENT_CAP)),
            fish_density: env.fish_count.map_or(defaults.fish_density, |n| unit(n as f32 / Self::ITEM_CAP)),
            yarn_density: env.yarn_count.map_or(defaults.yarn_density, |n| unit(n as f32 / Self::ITEM_CAP)),
            factory_mood: env.factory_mood.map_or(defaults.factory_mood, |m| unit(m / 100.0)),
            turbo_mode: env.turbo_mode.map_or(defaults.turbo_mode, |t| if t { 1.0 } else { 0.0 }),
            time_of_day: env.time_of_day.map_or(defaults.time_of_day, unit),
            weather: env.weather.map_or(defaults.weather, unit),
        }
    }

    /// Build the feature vector:
    ///
    /// ```text
    /// [x, y, happiness, energy, fish_dist, yarn_dist, agent_dist, crowd,
    ///  efficiency, fish, yarn, social, memory[0..4]]
    /// ```
    pub fn encode(&self, agent: &AgentState, snapshot: Option<&EnvironmentSnapshot>) -> Array1<f32> {
        let env = self.process(snapshot);
        let perf = &agent.performance;
        let scale = self.world.position_scale;

        let mut features = Vec::with_capacity(Self::WIDTH);
        features.extend([
            unit(agent.position.x / scale),
            unit(agent.position.y / scale),
            unit(agent.happiness() / 100.0),
            unit(agent.energy() / 100.0),
            env.nearest_fish_distance,
            env.nearest_yarn_distance,
            env.nearest_agent_distance,
            env.crowd_density,
            unit(perf.efficiency),
            unit(perf.fish_collected as f32 / Self::COUNTER_SCALE),
            unit(perf.yarn_collected as f32 / Self::COUNTER_SCALE),
            unit(perf.social_interactions as f32 / Self::COUNTER_SCALE),
        ]);
        features.extend(agent.memory.iter().take(Self::MEMORY_FEATURES).map(|&code| f32::from(code)));

        debug_assert_eq!(features.len(), Self::WIDTH);
        Array1::from_vec(features)
    }
}

fn normalize_distance(distance: f32) -> f32 {
    unit(distance / StateEncoder::DISTANCE_HORIZON)
}

/// Clamp to [0, 1], mapping NaN to 0
fn unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, Position};

    fn encoder() -> StateEncoder {
        StateEncoder::new(WorldBounds::default())
    }

    #[test]
    fn test_defaults_without_snapshot() {
        let env = encoder().process(None);
        assert_eq!(env, ProcessedEnvironment::default());
        assert_eq!(env.nearest_fish_distance, 1.0);
        assert_eq!(env.crowd_density, 0.5);
    }

    #[test]
    fn test_normalization_rules() {
        let snapshot = EnvironmentSnapshot {
            nearest_fish_distance: Some(250.0),
            nearest_yarn_distance: Some(5000.0),
            nearest_agent_distance: Some(-3.0),
            nearby_agents: Some(25),
            fish_count: Some(5),
            ..Default::default()
        };
        let env = encoder().process(Some(&snapshot));
        assert_eq!(env.nearest_fish_distance, 0.5);
        assert_eq!(env.nearest_yarn_distance, 1.0);
        assert_eq!(env.nearest_agent_distance, 0.0);
        assert_eq!(env.crowd_density, 1.0);
        assert_eq!(env.fish_density, 0.25);
        assert_eq!(env.yarn_density, 0.1);
    }

    #[test]
    fn test_encode_layout() {
        let mut agent = AgentState::new("pingu");
        agent.position = Position::new(500.0, 250.0);
        agent.remember(Action::Socialize);
        agent.remember(Action::Collect);

        let v = encoder().encode(&agent, None);
        assert_eq!(v.len(), StateEncoder::WIDTH);
        assert_eq!(v[0], 0.5);
        assert_eq!(v[1], 0.25);
        assert_eq!(v[2], 0.5);
        assert_eq!(v[3], 1.0);
        assert_eq!(v[7], 0.5);
        assert_eq!(v[12], 1.0);
        assert_eq!(v[13], 2.0);
        assert_eq!(v[14], 0.0);
    }
}

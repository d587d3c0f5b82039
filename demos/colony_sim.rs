//! A toy colony: penguins wander a rectangle full of fish and yarn, decide
//! with their own policies and learn from what each action achieved.
//!
//! ```text
//! cargo run --example colony_sim -- [config.json] [ticks]
//! RUST_LOG=penguin_ai=debug cargo run --example colony_sim
//! ```

use penguin_ai::colony::Colony;
use penguin_ai::config::MindConfig;
use penguin_ai::encoder::EnvironmentSnapshot;
use penguin_ai::reward::Outcome;
use penguin_ai::types::{Action, Position};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PENGUINS: usize = 6;
const FISH: usize = 25;
const YARN: usize = 5;
const PICKUP_RANGE: f32 = 60.0;
const SOCIAL_RANGE: f32 = 120.0;
const TRAINING_PASS_EVERY: usize = 50;

struct World {
    fish: Vec<Position>,
    yarn: Vec<Position>,
    positions: HashMap<String, Position>,
    rng: StdRng,
}

impl World {
    fn new(config: &MindConfig, ids: &[String], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let spawn = |rng: &mut StdRng| {
            Position::new(
                rng.gen_range(config.world.min_x..config.world.max_x),
                rng.gen_range(config.world.min_y..config.world.max_y),
            )
        };
        let fish = (0..FISH).map(|_| spawn(&mut rng)).collect();
        let yarn = (0..YARN).map(|_| spawn(&mut rng)).collect();
        let positions = ids.iter().map(|id| (id.clone(), spawn(&mut rng))).collect();
        World { fish, yarn, positions, rng }
    }

    fn nearest(items: &[Position], from: Position) -> Option<(usize, f32)> {
        items
            .iter()
            .enumerate()
            .map(|(i, p)| (i, distance(*p, from)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn snapshot(&self, id: &str, tick: usize) -> EnvironmentSnapshot {
        let here = self.positions[id];
        let others: Vec<f32> = self
            .positions
            .iter()
            .filter(|(other, _)| other.as_str() != id)
            .map(|(_, p)| distance(*p, here))
            .collect();
        EnvironmentSnapshot {
            nearest_fish_distance: Self::nearest(&self.fish, here).map(|(_, d)| d),
            nearest_yarn_distance: Self::nearest(&self.yarn, here).map(|(_, d)| d),
            nearest_agent_distance: others.iter().copied().min_by(f32::total_cmp),
            nearby_agents: Some(others.iter().filter(|&&d| d < SOCIAL_RANGE * 2.0).count()),
            fish_count: Some(self.fish.len()),
            yarn_count: Some(self.yarn.len()),
            factory_mood: Some(70.0),
            turbo_mode: Some(false),
            time_of_day: Some((tick % 240) as f32 / 240.0),
            weather: Some(0.8),
        }
    }

    /// Apply one action and report what came of it
    fn apply(&mut self, id: &str, action: Action, target: Option<Position>, bounds: &MindConfig) -> Outcome {
        let here = self.positions[id];
        let mut outcome = Outcome::default();
        match action {
            Action::Move => {
                if let Some(target) = target {
                    outcome.distance = distance(here, target);
                    outcome.reached_target = true;
                    outcome.new_area_explored = outcome.distance > 100.0;
                    self.positions.insert(id.to_string(), target);
                }
            }
            Action::Collect => {
                if let Some((i, d)) = Self::nearest(&self.fish, here) {
                    if d < PICKUP_RANGE {
                        self.fish.swap_remove(i);
                        outcome.fish_collected = 1;
                    }
                }
                if let Some((i, d)) = Self::nearest(&self.yarn, here) {
                    if d < PICKUP_RANGE {
                        self.yarn.swap_remove(i);
                        outcome.yarn_collected = 1;
                    }
                }
            }
            Action::Socialize => {
                let company = self
                    .positions
                    .iter()
                    .any(|(other, p)| other.as_str() != id && distance(*p, here) < SOCIAL_RANGE);
                outcome.social_success = company;
                outcome.social_failure = !company;
            }
            Action::Rest => {}
        }

        // Respawn what was eaten so the world never runs dry
        while self.fish.len() < FISH {
            let p = Position::new(
                self.rng.gen_range(bounds.world.min_x..bounds.world.max_x),
                self.rng.gen_range(bounds.world.min_y..bounds.world.max_y),
            );
            self.fish.push(p);
        }
        while self.yarn.len() < YARN {
            let p = Position::new(
                self.rng.gen_range(bounds.world.min_x..bounds.world.max_x),
                self.rng.gen_range(bounds.world.min_y..bounds.world.max_y),
            );
            self.yarn.push(p);
        }
        outcome
    }
}

fn distance(a: Position, b: Position) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => MindConfig::from_json_file(path)?,
        None => MindConfig {
            seed: Some(2024),
            ..MindConfig::default()
        },
    };
    let ticks: usize = args.next().map(|t| t.parse::<usize>()).transpose()?.unwrap_or(500);

    let ids: Vec<String> = (0..PENGUINS).map(|i| format!("penguin-{}", i)).collect();
    let mut colony = Colony::new(config.clone())?;
    for id in &ids {
        colony.register(id.clone())?;
    }
    let mut world = World::new(&config, &ids, config.seed.unwrap_or(0));

    for tick in 0..ticks {
        let snapshots: HashMap<String, EnvironmentSnapshot> =
            ids.iter().map(|id| (id.clone(), world.snapshot(id, tick))).collect();
        let decisions = colony.decide_all(&snapshots);

        for id in &ids {
            let Some(decision) = decisions.get(id) else { continue };
            let outcome = world.apply(id, decision.action, decision.target, &config);
            if let Some(agent) = colony.get_mut(id) {
                let position = world.positions[id];
                agent.update_position(position.x, position.y);
                agent.learn_from_outcome(&outcome);
            }
        }

        if (tick + 1) % TRAINING_PASS_EVERY == 0 {
            colony.global_training_pass();
        }
    }

    for id in &ids {
        if let Some(agent) = colony.get(id) {
            let state = agent.state();
            let metrics = agent.metrics();
            tracing::info!(
                agent = %id,
                fish = state.performance.fish_collected,
                yarn = state.performance.yarn_collected,
                social = state.performance.social_interactions,
                efficiency = state.performance.efficiency,
                mean_reward = metrics.mean_reward().unwrap_or(0.0),
                exploration = metrics.exploration_ratio(),
                "Final agent stats"
            );
        }
    }

    let failed = colony.save_all();
    if !failed.is_empty() {
        tracing::warn!(?failed, "Some checkpoints were not saved");
    }
    Ok(())
}

use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::MindConfig;
use crate::encoder::{EnvironmentSnapshot, StateEncoder};
use crate::error::{MindError, Result};
use crate::metrics::LearningMetrics;
use crate::policy::{ModelSource, PolicyModel};
use crate::replay_buffer::{Experience, ExperienceStore};
use crate::reward::{Outcome, RewardCalculator};
use crate::selector::ActionSelector;
use crate::types::{Action, AgentState, Decision, Position};

/// Rewards averaged into the efficiency statistic
const EFFICIENCY_WINDOW: usize = 10;
/// Confidence boost per unit of efficiency
const EFFICIENCY_CONFIDENCE_WEIGHT: f32 = 0.2;
const MIN_CONFIDENCE: f32 = 0.1;
const MAX_CONFIDENCE: f32 = 0.95;
/// Half-widths of the random target offset
const MOVE_REACH: f32 = 150.0;
const COLLECT_REACH: f32 = 100.0;
const REST_ENERGY_GAIN: f32 = 5.0;
const ACTIVE_ENERGY_COST: f32 = 1.0;
/// Bound of the per-tick happiness random walk
const HAPPINESS_DRIFT: f32 = 1.0;

/// What a learn tick did
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LearnReport {
    /// A pending experience received the reward
    pub filled: bool,
    /// Loss of the training batch, if one ran and succeeded
    pub loss: Option<f32>,
    /// A training batch was attempted
    pub trained: bool,
}

/// Runs decision and learn ticks for one agent.
///
/// The controller exclusively owns the agent's state, experience store and
/// policy model; `decide` and `learn` take `&mut self`, so ticks for one
/// agent are sequential by construction.
pub struct AgentController {
    state: AgentState,
    config: MindConfig,
    encoder: StateEncoder,
    policy: PolicyModel,
    selector: ActionSelector,
    rewards: RewardCalculator,
    store: ExperienceStore,
    metrics: LearningMetrics,
    rng: StdRng,
}

impl AgentController {
    /// Create a controller with an initialized policy.
    pub fn new<S: Into<String>>(id: S, config: MindConfig) -> Result<Self> {
        AgentControllerBuilder::new(id).config(config).build()
    }

    pub fn builder<S: Into<String>>(id: S) -> AgentControllerBuilder {
        AgentControllerBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn config(&self) -> &MindConfig {
        &self.config
    }

    pub fn experiences(&self) -> &ExperienceStore {
        &self.store
    }

    pub fn metrics(&self) -> &LearningMetrics {
        &self.metrics
    }

    pub fn policy(&self) -> &PolicyModel {
        &self.policy
    }

    #[cfg(test)]
    pub(crate) fn experiences_mut(&mut self) -> &mut ExperienceStore {
        &mut self.store
    }

    /// Initialize the policy if that has not happened yet.
    pub fn initialize(&mut self) -> Result<ModelSource> {
        let source = self.policy.initialize()?;
        info!(agent = %self.state.id, ?source, "Agent policy initialized");
        Ok(source)
    }

    /// One decision tick. Internal failures yield [`Decision::fallback`]
    /// and leave the agent state and experience store untouched.
    pub fn decide(&mut self, snapshot: Option<&EnvironmentSnapshot>) -> Decision {
        match self.try_decide(snapshot) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(agent = %self.state.id, error = %e, "Decision failed, using fallback");
                self.metrics.record_fallback();
                Decision::fallback()
            }
        }
    }

    fn try_decide(&mut self, snapshot: Option<&EnvironmentSnapshot>) -> Result<Decision> {
        let features = self.encoder.encode(&self.state, snapshot);
        let distribution = self.policy.predict(features.view())?;
        let efficiency = self.state.performance.efficiency;
        let selection = self.selector.select(distribution.view(), efficiency, &mut self.rng)?;
        let action = Action::from_index(selection.index)
            .ok_or_else(|| MindError::invalid_parameter("action".to_string(), format!("index {} out of range", selection.index)))?;

        let confidence = (distribution[selection.index] + efficiency * EFFICIENCY_CONFIDENCE_WEIGHT)
            .clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);
        let reasoning = Self::rationale(action, &self.state).to_string();
        let target = if action.needs_target() {
            Some(self.target_for(action))
        } else {
            None
        };

        self.store.fill_latest_next_state(features.clone());
        self.store.record(Experience::pending(features, action));

        self.state.remember(action);
        self.state.current_action = Some(action);
        if action == Action::Rest {
            self.state.adjust_energy(REST_ENERGY_GAIN);
        } else {
            self.state.adjust_energy(-ACTIVE_ENERGY_COST);
        }
        let drift = self.rng.gen_range(-HAPPINESS_DRIFT..=HAPPINESS_DRIFT);
        self.state.adjust_happiness(drift);

        self.metrics.record_decision(selection.epsilon, selection.explored);
        debug!(
            agent = %self.state.id,
            %action,
            confidence,
            explored = selection.explored,
            "Decision made"
        );

        Ok(Decision {
            action,
            target,
            confidence,
            reasoning,
        })
    }

    /// Fixed explanation for `action` given the state before the tick.
    pub fn rationale(action: Action, state: &AgentState) -> &'static str {
        match action {
            Action::Move if state.energy() > 50.0 => "Exploring for new opportunities",
            Action::Move => "Moving to conserve energy",
            Action::Collect if state.happiness() < 70.0 => "Collecting items to boost happiness",
            Action::Collect => "Productive collection behavior",
            Action::Socialize if state.performance.social_interactions < 5 => "Seeking social interaction",
            Action::Socialize => "Maintaining social bonds",
            Action::Rest if state.energy() < 30.0 => "Resting to recover energy",
            Action::Rest => "Strategic rest period",
        }
    }

    fn target_for(&mut self, action: Action) -> Position {
        let reach = match action {
            Action::Collect => COLLECT_REACH,
            _ => MOVE_REACH,
        };
        let origin = self.state.position;
        let target = Position::new(
            origin.x + self.rng.gen_range(-reach..=reach),
            origin.y + self.rng.gen_range(-reach..=reach),
        );
        self.config.world.clamp(target)
    }

    /// One learn tick. Training failures are logged and counted; the
    /// experience that triggered training is kept either way.
    pub fn learn(&mut self, reward: f32) -> LearnReport {
        let mut report = LearnReport::default();
        if !reward.is_finite() {
            warn!(agent = %self.state.id, reward, "Ignoring non-finite reward");
            return report;
        }

        report.filled = self.store.fill_latest_reward(reward);
        self.metrics.record_reward(reward);
        self.update_performance(reward);

        if self.store.len() >= self.config.min_experiences_to_train {
            report.trained = true;
            match self.replay() {
                Ok(loss) => report.loss = Some(loss),
                Err(e) => warn!(agent = %self.state.id, error = %e, "Experience replay failed"),
            }
        }
        report
    }

    /// Compute the reward for the current action from its outcome, then learn from it.
    pub fn learn_from_outcome(&mut self, outcome: &Outcome) -> (f32, LearnReport) {
        let action = self.state.current_action.unwrap_or(Action::Rest);
        let reward = self.rewards.calculate(action, outcome, &self.state);
        (reward, self.learn(reward))
    }

    fn update_performance(&mut self, reward: f32) {
        let recent = self.store.recent_nonzero_rewards(EFFICIENCY_WINDOW);
        if !recent.is_empty() {
            let mean = recent.iter().sum::<f32>() / recent.len() as f32;
            self.state.performance.efficiency = (mean / 10.0).clamp(0.0, 1.0);
        }

        let perf = &mut self.state.performance;
        if reward > 5.0 {
            perf.fish_collected += 1;
        }
        if reward > 10.0 {
            perf.yarn_collected += 1;
        }
        if reward > 0.0 && self.state.current_action == Some(Action::Socialize) {
            perf.social_interactions += 1;
        }
    }

    /// Train the policy once on a batch sampled from the experience store.
    pub fn replay(&mut self) -> Result<f32> {
        if self.store.len() < self.config.min_experiences_to_train {
            return Err(MindError::TrainingBatch(format!(
                "{} experiences stored, {} needed",
                self.store.len(),
                self.config.min_experiences_to_train
            )));
        }

        let batch = self.store.sample(self.config.batch_size, &mut self.rng);
        let states: Vec<ArrayView1<f32>> = batch.iter().map(|e| e.state.view()).collect();
        let actions: Vec<usize> = batch.iter().map(|e| e.action.index()).collect();
        let rewards: Vec<f32> = batch.iter().map(|e| e.reward_value()).collect();

        match self.policy.train_on_batch(&states, &actions, &rewards) {
            Ok(loss) => {
                self.metrics.record_training(loss);
                Ok(loss)
            }
            Err(e) => {
                self.metrics.record_training_failure();
                Err(e)
            }
        }
    }

    /// Reward the calculator would give the current action for `outcome`.
    pub fn reward_for(&self, outcome: &Outcome) -> f32 {
        let action = self.state.current_action.unwrap_or(Action::Rest);
        self.rewards.calculate(action, outcome, &self.state)
    }

    /// Move the agent. Non-finite coordinates are ignored.
    pub fn update_position(&mut self, x: f32, y: f32) {
        if !(x.is_finite() && y.is_finite()) {
            warn!(agent = %self.state.id, x, y, "Ignoring non-finite position");
            return;
        }
        self.state.position = Position::new(x, y);
    }

    pub fn update_happiness(&mut self, delta: f32) {
        self.state.adjust_happiness(delta);
    }

    pub fn update_energy(&mut self, delta: f32) {
        self.state.adjust_energy(delta);
    }

    pub fn checkpoint_name(&self) -> String {
        format!("penguin-ai-{}", self.state.id)
    }

    pub fn save_model(&self) -> Result<()> {
        self.policy.save(&self.checkpoint_name())
    }

    pub fn load_model(&mut self) -> Result<()> {
        let name = self.checkpoint_name();
        self.policy.load(&name)
    }
}

/// Builder for [`AgentController`]
pub struct AgentControllerBuilder {
    id: String,
    config: MindConfig,
    selector: ActionSelector,
    position: Option<Position>,
    initialize: bool,
}

impl AgentControllerBuilder {
    pub fn new<S: Into<String>>(id: S) -> Self {
        AgentControllerBuilder {
            id: id.into(),
            config: MindConfig::default(),
            selector: ActionSelector::default(),
            position: None,
            initialize: true,
        }
    }

    pub fn config(mut self, config: MindConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn selector(mut self, selector: ActionSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Skip policy initialization; decisions fall back until
    /// [`AgentController::initialize`] is called.
    pub fn uninitialized(mut self) -> Self {
        self.initialize = false;
        self
    }

    pub fn build(self) -> Result<AgentController> {
        self.config.validate()?;
        if self.id.is_empty() {
            return Err(MindError::invalid_parameter("id", "must not be empty"));
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let policy = PolicyModel::new(&self.config, StdRng::seed_from_u64(rng.gen()));

        let mut state = AgentState::new(self.id);
        if let Some(position) = self.position {
            state.position = position;
        }

        let mut controller = AgentController {
            state,
            encoder: StateEncoder::new(self.config.world.clone()),
            policy,
            selector: self.selector,
            rewards: RewardCalculator::new(),
            store: ExperienceStore::new(self.config.experience_capacity),
            metrics: LearningMetrics::default(),
            config: self.config,
            rng,
        };

        if self.initialize {
            controller.initialize()?;
        }
        Ok(controller)
    }
}

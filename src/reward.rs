//! Composite reward shaping.
//!
//! ```text
//! reward = clamp((base(action, outcome, state) + 2 * efficiency)
//!                * happiness_factor * energy_factor, -10, 10)
//! ```
//!
//! The constants are hand-tuned and intentionally kept as they are.

use serde::{Serialize, Deserialize};

use crate::types::{Action, AgentState};

pub const MIN_REWARD: f32 = -10.0;
pub const MAX_REWARD: f32 = 10.0;

/// What happened as a result of an action. Fields irrelevant to the
/// action taken are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Outcome {
    pub fish_collected: u32,
    pub yarn_collected: u32,
    pub social_success: bool,
    pub social_failure: bool,
    pub reached_target: bool,
    /// Distance travelled during the tick
    pub distance: f32,
    pub new_area_explored: bool,
}

/// One-off bonuses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstFish,
    FishStreak5,
    FishStreak10,
    YarnCollector,
    SocialButterfly,
    Explorer,
    EfficiencyMaster,
    HappyPenguin,
}

impl Achievement {
    pub fn reward(self) -> f32 {
        match self {
            Achievement::FirstFish => 5.0,
            Achievement::FishStreak5 => 8.0,
            Achievement::FishStreak10 => 15.0,
            Achievement::YarnCollector => 20.0,
            Achievement::SocialButterfly => 10.0,
            Achievement::Explorer => 12.0,
            Achievement::EfficiencyMaster => 25.0,
            Achievement::HappyPenguin => 8.0,
        }
    }
}

/// Penalty events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    Collision,
    Stuck,
    EnergyDepletion,
    Unhappiness,
    Inefficiency,
}

impl Penalty {
    pub fn reward(self) -> f32 {
        match self {
            Penalty::Collision => -3.0,
            Penalty::Stuck => -2.0,
            Penalty::EnergyDepletion => -5.0,
            Penalty::Unhappiness => -4.0,
            Penalty::Inefficiency => -6.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RewardCalculator;

impl RewardCalculator {
    pub fn new() -> Self {
        RewardCalculator
    }

    /// Scalar reward in [-10, 10] for `action` given its `outcome`.
    pub fn calculate(&self, action: Action, outcome: &Outcome, agent: &AgentState) -> f32 {
        let base = match action {
            Action::Collect => Self::collection_reward(outcome),
            Action::Socialize => Self::social_reward(outcome, agent),
            Action::Move => Self::movement_reward(outcome, agent),
            Action::Rest => Self::rest_reward(agent),
        };

        let reward = (base + Self::efficiency_bonus(agent))
            * Self::happiness_factor(agent.happiness())
            * Self::energy_factor(agent.energy());

        if reward.is_nan() {
            0.0
        } else {
            reward.clamp(MIN_REWARD, MAX_REWARD)
        }
    }

    fn collection_reward(outcome: &Outcome) -> f32 {
        let mut reward = 0.0;
        if outcome.fish_collected > 0 {
            reward += 5.0 + outcome.fish_collected as f32 * 2.0;
        }
        if outcome.yarn_collected > 0 {
            reward += 10.0 + outcome.yarn_collected as f32 * 3.0;
        }
        reward
    }

    fn social_reward(outcome: &Outcome, agent: &AgentState) -> f32 {
        let mut reward = 0.0;
        if outcome.social_success {
            reward += 3.0;
            // Newcomers get extra encouragement
            if agent.performance.social_interactions < 5 {
                reward += 2.0;
            }
        }
        if outcome.social_failure {
            reward -= 1.0;
        }
        reward
    }

    fn movement_reward(outcome: &Outcome, agent: &AgentState) -> f32 {
        let mut reward = 0.0;
        if outcome.reached_target {
            reward += 1.0;
        }
        if agent.energy() < 30.0 && outcome.distance > 100.0 {
            reward -= 2.0;
        }
        if outcome.new_area_explored {
            reward += 1.5;
        }
        reward
    }

    fn rest_reward(agent: &AgentState) -> f32 {
        let energy = agent.energy();
        if energy < 30.0 {
            3.0
        } else if energy > 80.0 {
            -0.5
        } else {
            1.0
        }
    }

    fn efficiency_bonus(agent: &AgentState) -> f32 {
        agent.performance.efficiency * 2.0
    }

    /// 0.5 at zero happiness up to 1.0 at full happiness
    pub fn happiness_factor(happiness: f32) -> f32 {
        0.5 + (happiness / 100.0) * 0.5
    }

    pub fn energy_factor(energy: f32) -> f32 {
        if energy < 20.0 {
            0.7
        } else if energy > 80.0 {
            1.2
        } else {
            1.0
        }
    }

    pub fn achievement_reward(&self, achievement: Achievement) -> f32 {
        achievement.reward()
    }

    pub fn penalty_reward(&self, penalty: Penalty) -> f32 {
        penalty.reward()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(happiness: f32, energy: f32, efficiency: f32) -> AgentState {
        let mut state = AgentState::new("pingu");
        state.set_happiness(happiness);
        state.set_energy(energy);
        state.performance.efficiency = efficiency;
        state
    }

    #[test]
    fn test_collect_scenario_clamps_to_ten() {
        let calc = RewardCalculator::new();
        let outcome = Outcome { fish_collected: 3, ..Default::default() };
        // (5 + 6 + 2) * 1.0 * 1.2 = 15.6 -> 10
        assert_eq!(calc.calculate(Action::Collect, &outcome, &agent(100.0, 100.0, 1.0)), 10.0);
    }

    #[test]
    fn test_calculator_is_a_copyable_default_value() {
        let calc = RewardCalculator::default();
        let copy = calc;
        let outcome = Outcome { fish_collected: 1, ..Default::default() };
        let state = agent(60.0, 40.0, 0.5);
        assert_eq!(
            calc.calculate(Action::Collect, &outcome, &state),
            copy.calculate(Action::Collect, &outcome, &state)
        );
    }

    #[test]
    fn test_collect_unclamped() {
        let calc = RewardCalculator::new();
        let outcome = Outcome { fish_collected: 1, ..Default::default() };
        // (5 + 2) * 0.75 * 1.0 = 5.25
        let r = calc.calculate(Action::Collect, &outcome, &agent(50.0, 50.0, 0.0));
        assert!((r - 5.25).abs() < 1e-6);
    }

    #[test]
    fn test_social_newcomer_bonus_and_failure() {
        let calc = RewardCalculator::new();
        let mut state = agent(100.0, 50.0, 0.0);
        let success = Outcome { social_success: true, ..Default::default() };
        assert_eq!(calc.calculate(Action::Socialize, &success, &state), 5.0);

        state.performance.social_interactions = 5;
        assert_eq!(calc.calculate(Action::Socialize, &success, &state), 3.0);

        let failure = Outcome { social_failure: true, ..Default::default() };
        assert_eq!(calc.calculate(Action::Socialize, &failure, &state), -1.0);
    }

    #[test]
    fn test_tired_long_move_is_penalized() {
        let calc = RewardCalculator::new();
        let outcome = Outcome { distance: 150.0, ..Default::default() };
        // -2 * 1.0 * 1.0
        assert_eq!(calc.calculate(Action::Move, &outcome, &agent(100.0, 25.0, 0.0)), -2.0);

        let explored = Outcome { reached_target: true, new_area_explored: true, ..Default::default() };
        assert_eq!(calc.calculate(Action::Move, &explored, &agent(100.0, 50.0, 0.0)), 2.5);
    }

    #[test]
    fn test_rest_bands() {
        let calc = RewardCalculator::new();
        let none = Outcome::default();
        // 3 * 1.0 * 0.7
        assert!((calc.calculate(Action::Rest, &none, &agent(100.0, 10.0, 0.0)) - 2.1).abs() < 1e-6);
        assert_eq!(calc.calculate(Action::Rest, &none, &agent(100.0, 50.0, 0.0)), 1.0);
        assert!((calc.calculate(Action::Rest, &none, &agent(100.0, 90.0, 0.0)) + 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_lookup_tables() {
        let calc = RewardCalculator::new();
        assert_eq!(calc.achievement_reward(Achievement::EfficiencyMaster), 25.0);
        assert_eq!(calc.achievement_reward(Achievement::FirstFish), 5.0);
        assert_eq!(calc.penalty_reward(Penalty::Inefficiency), -6.0);
        assert_eq!(calc.penalty_reward(Penalty::Collision), -3.0);
    }
}

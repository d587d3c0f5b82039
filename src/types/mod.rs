use serde::{Serialize, Deserialize};
use std::fmt;

/// Number of recent action codes an agent remembers
pub const MEMORY_LEN: usize = 16;

/// Number of actions in the closed action set
pub const NUM_ACTIONS: usize = 4;

/// The closed set of things an agent can do in one tick.
///
/// The index mapping is total and fixed: it is the output layout of the
/// policy network and the code written into agent memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Move,
    Collect,
    Socialize,
    Rest,
}

impl Action {
    pub const ALL: [Action; NUM_ACTIONS] = [Action::Move, Action::Collect, Action::Socialize, Action::Rest];

    /// Position of this action in the policy output
    pub fn index(self) -> usize {
        match self {
            Action::Move => 0,
            Action::Collect => 1,
            Action::Socialize => 2,
            Action::Rest => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Action> {
        Action::ALL.get(index).copied()
    }

    /// Code stored in agent memory
    pub fn code(self) -> u8 {
        self.index() as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Move => "move",
            Action::Collect => "collect",
            Action::Socialize => "socialize",
            Action::Rest => "rest",
        }
    }

    /// Whether a decision for this action carries a target coordinate
    pub fn needs_target(self) -> bool {
        matches!(self, Action::Move | Action::Collect)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Controller state machine: `Idle` until the first decision, then the
/// activity matching the last chosen action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Idle,
    Moving,
    Collecting,
    Socializing,
    Resting,
}

impl From<Option<Action>> for Activity {
    fn from(action: Option<Action>) -> Self {
        match action {
            None => Activity::Idle,
            Some(Action::Move) => Activity::Moving,
            Some(Action::Collect) => Activity::Collecting,
            Some(Action::Socialize) => Activity::Socializing,
            Some(Action::Rest) => Activity::Resting,
        }
    }
}

/// 2D world coordinate
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Position { x, y }
    }
}

/// Lifetime counters plus the rolling efficiency statistic
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Performance {
    pub fish_collected: u32,
    pub yarn_collected: u32,
    pub social_interactions: u32,
    /// Rolling statistic in [0, 1]
    pub efficiency: f32,
}

/// Agent-local mutable state, owned by exactly one controller.
///
/// `happiness` and `energy` are bounded to [0, 100] and clamped on every
/// write, so they are only reachable through setters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: String,
    pub position: Position,
    happiness: f32,
    energy: f32,
    pub current_action: Option<Action>,
    /// Recent action codes, newest first
    pub memory: [u8; MEMORY_LEN],
    pub performance: Performance,
}

impl AgentState {
    pub const DEFAULT_HAPPINESS: f32 = 50.0;
    pub const DEFAULT_ENERGY: f32 = 100.0;

    pub fn new<S: Into<String>>(id: S) -> Self {
        AgentState {
            id: id.into(),
            position: Position::default(),
            happiness: Self::DEFAULT_HAPPINESS,
            energy: Self::DEFAULT_ENERGY,
            current_action: None,
            memory: [0; MEMORY_LEN],
            performance: Performance::default(),
        }
    }

    pub fn happiness(&self) -> f32 {
        self.happiness
    }

    pub fn energy(&self) -> f32 {
        self.energy
    }

    pub fn set_happiness(&mut self, value: f32) {
        self.happiness = clamp_level(value);
    }

    pub fn set_energy(&mut self, value: f32) {
        self.energy = clamp_level(value);
    }

    pub fn adjust_happiness(&mut self, delta: f32) {
        self.set_happiness(self.happiness + delta);
    }

    pub fn adjust_energy(&mut self, delta: f32) {
        self.set_energy(self.energy + delta);
    }

    pub fn activity(&self) -> Activity {
        Activity::from(self.current_action)
    }

    /// Push an action code to the front of memory, dropping the oldest
    pub fn remember(&mut self, action: Action) {
        self.memory.rotate_right(1);
        self.memory[0] = action.code();
    }
}

fn clamp_level(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Output of one decision tick
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub target: Option<Position>,
    /// In [0, 1]
    pub confidence: f32,
    pub reasoning: String,
}

impl Decision {
    pub const FALLBACK_CONFIDENCE: f32 = 0.1;
    pub const FALLBACK_REASONING: &'static str = "fallback";

    /// Decision returned when a tick fails internally
    pub fn fallback() -> Self {
        Decision {
            action: Action::Rest,
            target: None,
            confidence: Self::FALLBACK_CONFIDENCE,
            reasoning: Self::FALLBACK_REASONING.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.reasoning == Self::FALLBACK_REASONING
    }
}

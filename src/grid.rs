//! Reference [`Environment`]: a square frozen-lake style grid.
//!
//! The agent starts on `start` and tries to reach `goal`. Walking off the
//! board bounces the agent back with a small penalty, stepping on a hazard
//! ends the episode. In slippery mode an action is occasionally swapped for a
//! different one.

use rand::Rng;
use rand::prelude::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ConfigError;
use crate::{Action, Environment, Position, StepOutcome, Transition};

/// Reward granted for each kind of transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTable {
    pub goal: f32,
    pub hazard: f32,
    #[serde(rename = "move")]
    pub step: f32,
    pub out_of_bounds: f32,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            goal: 100.0,
            hazard: -10.0,
            step: 1.0,
            out_of_bounds: -0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub size: usize,
    pub start: Position,
    /// Defaults to the bottom-right corner.
    pub goal: Option<Position>,
    pub hazards: Vec<Position>,
    pub rewards: RewardTable,
    /// Chance that an action is replaced by a random different one.
    pub slip_probability: f32,
    /// When set, [`GridWorld::generate`] scatters extra hazards with this density.
    pub hazard_density: Option<f32>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 4,
            start: (0, 0),
            goal: None,
            hazards: Vec::new(),
            rewards: RewardTable::default(),
            slip_probability: 0.0,
            hazard_density: None,
        }
    }
}

impl GridConfig {
    pub fn goal(&self) -> Position {
        self.goal.unwrap_or_else(|| {
            let last = self.size as i32 - 1;
            (last, last)
        })
    }

    fn contains(&self, pos: Position) -> bool {
        let size = self.size as i32;
        (0..size).contains(&pos.0) && (0..size).contains(&pos.1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size < 2 {
            return Err(ConfigError::GridTooSmall);
        }
        let goal = self.goal();
        for (name, position) in [("start", self.start), ("goal", goal)] {
            if !self.contains(position) {
                return Err(ConfigError::CellOutOfBounds {
                    name,
                    position,
                    size: self.size,
                });
            }
        }
        if self.start == goal {
            return Err(ConfigError::StartIsGoal);
        }
        for &hazard in &self.hazards {
            if !self.contains(hazard) {
                return Err(ConfigError::CellOutOfBounds {
                    name: "hazard",
                    position: hazard,
                    size: self.size,
                });
            }
            if hazard == self.start || hazard == goal {
                return Err(ConfigError::HazardOnEndpoint(hazard));
            }
        }
        if !(0.0..=1.0).contains(&self.slip_probability) {
            return Err(ConfigError::InvalidRate {
                name: "slip_probability",
                value: self.slip_probability,
            });
        }
        if let Some(density) = self.hazard_density {
            if !(0.0..=1.0).contains(&density) {
                return Err(ConfigError::InvalidRate {
                    name: "hazard_density",
                    value: density,
                });
            }
        }
        Ok(())
    }

    /// Add random hazards while keeping one start-to-goal path clear.
    ///
    /// A monotone path is carved first, one random row or column step at a
    /// time, then every cell off that path becomes a hazard with probability
    /// `density`.
    pub fn with_random_hazards<R: Rng>(
        mut self,
        density: f32,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&density) {
            return Err(ConfigError::InvalidRate {
                name: "hazard_density",
                value: density,
            });
        }
        self.validate()?;

        let goal = self.goal();
        let mut path = BTreeSet::from([self.start, goal]);
        let mut current = self.start;
        while current != goal {
            let row_step = (goal.0 - current.0).signum();
            let col_step = (goal.1 - current.1).signum();
            current = if row_step == 0 {
                (current.0, current.1 + col_step)
            } else if col_step == 0 || rng.random_bool(0.5) {
                (current.0 + row_step, current.1)
            } else {
                (current.0, current.1 + col_step)
            };
            path.insert(current);
        }

        let size = self.size as i32;
        for row in 0..size {
            for col in 0..size {
                let cell = (row, col);
                if !path.contains(&cell)
                    && !self.hazards.contains(&cell)
                    && rng.random_bool(density as f64)
                {
                    self.hazards.push(cell);
                }
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridWorld {
    size: usize,
    start: Position,
    goal: Position,
    hazards: BTreeSet<Position>,
    rewards: RewardTable,
    slip_probability: f32,
    action_space: Vec<Action>,
    position: Position,
    accumulated_reward: f32,
    game_over: bool,
    won: bool,
}

impl GridWorld {
    /// Build a grid from an explicit layout. `hazard_density` is ignored here.
    pub fn new(config: &GridConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            size: config.size,
            start: config.start,
            goal: config.goal(),
            hazards: config.hazards.iter().copied().collect(),
            rewards: config.rewards.clone(),
            slip_probability: config.slip_probability,
            action_space: vec![Action::Down, Action::Right, Action::Up, Action::Left],
            position: config.start,
            accumulated_reward: 0.0,
            game_over: false,
            won: false,
        })
    }

    /// Like [`GridWorld::new`], but also scatters random hazards when the
    /// config asks for a `hazard_density`.
    pub fn generate<R: Rng>(config: &GridConfig, rng: &mut R) -> Result<Self, ConfigError> {
        match config.hazard_density {
            Some(density) => Self::new(&config.clone().with_random_hazards(density, rng)?),
            None => Self::new(config),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn rewards(&self) -> &RewardTable {
        &self.rewards
    }

    pub fn is_hazard(&self, pos: Position) -> bool {
        self.hazards.contains(&pos)
    }

    fn in_bounds(&self, pos: Position) -> bool {
        let size = self.size as i32;
        (0..size).contains(&pos.0) && (0..size).contains(&pos.1)
    }

    fn slip<R: Rng>(&self, action: Action, rng: &mut R) -> Action {
        if self.slip_probability <= 0.0 || !rng.random_bool(self.slip_probability as f64) {
            return action;
        }
        let alternatives: Vec<Action> = self
            .action_space
            .iter()
            .copied()
            .filter(|&a| a != action)
            .collect();
        alternatives.choose(rng).copied().unwrap_or(action)
    }
}

impl Environment for GridWorld {
    fn reset(&mut self) {
        self.position = self.start;
        self.accumulated_reward = 0.0;
        self.game_over = false;
        self.won = false;
    }

    fn apply<R: Rng>(&mut self, action: Action, rng: &mut R) -> StepOutcome {
        if self.game_over {
            return StepOutcome {
                transition: Transition::Halted,
                reward_delta: 0.0,
                game_over: true,
                won: self.won,
            };
        }

        let action = self.slip(action, rng);
        let (dr, dc) = action.delta();
        let target = (self.position.0 + dr, self.position.1 + dc);

        let (transition, reward_delta) = if !self.in_bounds(target) {
            (Transition::Bounced, self.rewards.out_of_bounds)
        } else if target == self.goal {
            self.position = target;
            self.game_over = true;
            self.won = true;
            (Transition::Goal, self.rewards.goal)
        } else if self.hazards.contains(&target) {
            self.position = target;
            self.game_over = true;
            (Transition::Hazard, self.rewards.hazard)
        } else {
            self.position = target;
            (Transition::Moved, self.rewards.step)
        };

        self.accumulated_reward += reward_delta;
        StepOutcome {
            transition,
            reward_delta,
            game_over: self.game_over,
            won: self.won,
        }
    }

    fn position(&self) -> Position {
        self.position
    }

    fn goal_position(&self) -> Position {
        self.goal
    }

    fn hazards(&self) -> Vec<Position> {
        self.hazards.iter().copied().collect()
    }

    fn accumulated_reward(&self) -> f32 {
        self.accumulated_reward
    }

    fn game_over(&self) -> bool {
        self.game_over
    }

    fn won(&self) -> bool {
        self.won
    }

    fn action_space(&self) -> &[Action] {
        &self.action_space
    }
}

//! Genetic-algorithm search for action sequences that walk an agent from a
//! start cell to a goal cell across a grid sprinkled with hazards.
//!
//! The engine is split the same way every run uses it:
//!
//! - [`Environment`]: the world a gene is replayed against ([`grid::GridWorld`] is the
//!   reference implementation)
//! - [`fitness::FitnessEvaluator`]: replays a gene and scores it
//! - [`operators::GeneticOperators`]: crossover and mutation
//! - [`SelectionStrategy`]: turns a scored generation into the next one
//!   (see [`algorithms`])
//! - [`stagnation::StagnationGuard`]: breaks out of a repeated best gene
//! - [`manager::PopulationManager`]: owns the RNG and drives the generation loop

use rand::Rng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::ConfigError;
use crate::operators::GeneticOperators;

pub mod config;
pub mod encoding;
pub mod error;
pub mod fitness;
pub mod grid;
pub mod manager;
pub mod operators;
pub mod stagnation;

pub mod algorithms {
    pub mod elitist_growth;
    pub mod fitness_proportionate;
    pub mod tournament;
}

/// Grid coordinates as `(row, col)`. Signed so that off-grid targets can be represented.
pub type Position = (i32, i32);

/// One move of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    pub fn opposite(self) -> Action {
        match self {
            Action::Up => Action::Down,
            Action::Down => Action::Up,
            Action::Left => Action::Right,
            Action::Right => Action::Left,
        }
    }

    /// Row/column offset applied by this action.
    pub fn delta(self) -> Position {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Action::Up => 'u',
            Action::Down => 'd',
            Action::Left => 'l',
            Action::Right => 'r',
        }
    }

    pub fn from_symbol(symbol: char) -> Result<Action, ConfigError> {
        match symbol {
            'u' => Ok(Action::Up),
            'd' => Ok(Action::Down),
            'l' => Ok(Action::Left),
            'r' => Ok(Action::Right),
            other => Err(ConfigError::InvalidActionSymbol(other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A candidate path attempt.
pub type Gene = Vec<Action>;

/// One generation of genes.
pub type Population = Vec<Gene>;

/// Manhattan distance between two cells.
pub fn manhattan(a: Position, b: Position) -> i32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

/// What a single [`Environment::apply`] call did to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Ordinary move onto a free cell.
    Moved,
    /// Target cell was off the grid; position unchanged.
    Bounced,
    /// Entered a hazard cell; the episode is over.
    Hazard,
    /// Entered the goal cell; the episode is over and won.
    Goal,
    /// The episode had already ended; nothing happened.
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub transition: Transition,
    pub reward_delta: f32,
    pub game_over: bool,
    pub won: bool,
}

/// The world a gene is replayed against.
///
/// The search engine only ever resets it and feeds it actions. Layout, rewards
/// and transition rules belong to the implementor.
pub trait Environment {
    /// Return the agent to the start and clear the episode flags. The hazard layout is kept.
    fn reset(&mut self);

    /// Apply one action. Stochastic environments draw from `rng` so that a
    /// seeded run stays reproducible.
    fn apply<R: Rng>(&mut self, action: Action, rng: &mut R) -> StepOutcome;

    fn position(&self) -> Position;
    fn goal_position(&self) -> Position;
    fn hazards(&self) -> Vec<Position>;
    fn accumulated_reward(&self) -> f32;
    fn game_over(&self) -> bool;
    fn won(&self) -> bool;

    /// Ordered set of actions this environment accepts.
    fn action_space(&self) -> &[Action];
}

/// A gene together with the fitness of one replay of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phenotype {
    pub gene: Gene,
    pub fitness: f32,
}

/// Turns a scored generation into the next population.
pub trait SelectionStrategy {
    fn kind(&self) -> config::StrategyKind;

    /// Length of the random genes that make up generation zero.
    fn initial_gene_length(&self, gene_length: usize) -> usize {
        gene_length
    }

    fn next_population(
        &mut self,
        evaluated: &[Phenotype],
        operators: &GeneticOperators,
        rng: &mut Pcg64,
    ) -> Population;
}

/// Compare two f32 values, treating NaN as less than all other values.
/// This ensures NaN fitness individuals sort to the end (lowest priority).
pub(crate) fn cmp_f32_nan_last(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Index of the fittest phenotype; the first one wins ties.
pub(crate) fn fittest_index(evaluated: &[Phenotype]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, p) in evaluated.iter().enumerate() {
        match best {
            Some(b) if cmp_f32_nan_last(p.fitness, evaluated[b].fitness) != Ordering::Greater => {}
            _ => best = Some(i),
        }
    }
    best
}

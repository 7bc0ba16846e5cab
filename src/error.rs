use std::path::PathBuf;

use crate::{Action, Position};

/// Configuration rejected at construction time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 1")]
    ZeroPopulation,
    #[error("Gene length must be at least 1")]
    ZeroGeneLength,
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f32 },
    #[error("max_generations must be positive when set")]
    ZeroGenerationCap,
    #[error("stagnation_threshold must be positive when set")]
    ZeroStagnationThreshold,
    #[error("Invalid action symbol {0:?}, expected one of u, d, l, r")]
    InvalidActionSymbol(char),
    #[error("Action {0:?} is not part of the environment's action space")]
    ForeignAction(Action),
    #[error("Action space must not be empty")]
    EmptyActionSpace,
    #[error("Invalid action weights: {0}")]
    InvalidActionWeights(String),
    #[error("goal_bias must be a finite positive weight, got {0}")]
    InvalidGoalBias(f32),
    #[error("A population can only be seeded before the first generation is evaluated")]
    RunAlreadyStarted,
    #[error("Seeded population has {actual} genes, expected {expected}")]
    PopulationSizeMismatch { expected: usize, actual: usize },
    #[error("Grid size must be at least 2")]
    GridTooSmall,
    #[error("{name} cell {position:?} lies outside a {size}x{size} grid")]
    CellOutOfBounds {
        name: &'static str,
        position: Position,
        size: usize,
    },
    #[error("Start and goal must be different cells")]
    StartIsGoal,
    #[error("Hazard at {0:?} covers the start or the goal")]
    HazardOnEndpoint(Position),
}

/// Failure to load a [`crate::config::Config`] from disk.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigError),
}

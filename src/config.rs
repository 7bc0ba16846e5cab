use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::SelectionStrategy;
use crate::algorithms::elitist_growth::ElitistGrowth;
use crate::algorithms::fitness_proportionate::FitnessProportionate;
use crate::algorithms::tournament::Tournament;
use crate::error::{ConfigError, LoadError};
use crate::grid::GridConfig;

/// Which [`SelectionStrategy`] drives a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    ElitistGrowth,
    FitnessProportionate,
    Tournament,
}

impl StrategyKind {
    /// Repeats of the same best gene tolerated before the guard truncates it.
    /// Growing genes get more patience than fixed-length ones.
    pub fn default_stagnation_threshold(self) -> usize {
        match self {
            StrategyKind::ElitistGrowth => 50,
            StrategyKind::FitnessProportionate | StrategyKind::Tournament => 10,
        }
    }

    /// Instantiate the strategy described by `config`.
    pub fn build(self, config: &SearchConfig) -> Box<dyn SelectionStrategy> {
        let threshold = config
            .stagnation_threshold
            .unwrap_or_else(|| self.default_stagnation_threshold());
        match self {
            StrategyKind::ElitistGrowth => Box::new(ElitistGrowth::new(
                config.population_size,
                config.gene_length,
                threshold,
            )),
            StrategyKind::FitnessProportionate => Box::new(FitnessProportionate::new(
                config.population_size,
                config.gene_length,
                threshold,
            )),
            StrategyKind::Tournament => Box::new(Tournament::new(
                config.population_size,
                config.gene_length,
                config.elite_fraction,
                threshold,
            )),
        }
    }
}

/// Constants of the fitness function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    /// Fitness assigned to any gene that walks into a hazard.
    pub hazard_fitness: f32,
    /// Bonus added when the goal is reached; dwarfs every shaping term.
    pub goal_bonus: f32,
    /// Subtracted once per adjacent pair of opposite actions.
    pub oscillation_penalty: f32,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            hazard_fitness: 0.0,
            goal_bonus: 1000.0,
            oscillation_penalty: 0.8,
        }
    }
}

/// Parameters of the search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub population_size: usize,
    /// Fixed gene length, or the target length for elitist growth.
    pub gene_length: usize,
    pub mutation_rate: f32,
    /// Share of the population carried over unchanged by tournament selection.
    pub elite_fraction: f32,
    /// `None` lets the search run until the goal is reached.
    pub max_generations: Option<usize>,
    pub selection_strategy: StrategyKind,
    pub rng_seed: u64,
    pub fitness: FitnessWeights,
    /// Overrides [`StrategyKind::default_stagnation_threshold`].
    pub stagnation_threshold: Option<usize>,
    /// Per-action sampling weights for fresh actions, in action-space order.
    pub action_weights: Option<Vec<f32>>,
    /// Weight for actions that lead from the start towards the goal.
    /// Ignored when `action_weights` is set.
    pub goal_bias: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            gene_length: 10,
            mutation_rate: 0.1,
            elite_fraction: 0.2,
            max_generations: None,
            selection_strategy: StrategyKind::Tournament,
            rng_seed: 42,
            fitness: FitnessWeights::default(),
            stagnation_threshold: None,
            action_weights: None,
            goal_bias: None,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::ZeroPopulation);
        }
        if self.gene_length == 0 {
            return Err(ConfigError::ZeroGeneLength);
        }

        let check_rate = |value: f32, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidRate { name, value })
            }
        };
        check_rate(self.mutation_rate, "mutation_rate")?;
        check_rate(self.elite_fraction, "elite_fraction")?;

        if self.max_generations == Some(0) {
            return Err(ConfigError::ZeroGenerationCap);
        }
        if self.stagnation_threshold == Some(0) {
            return Err(ConfigError::ZeroStagnationThreshold);
        }
        if let Some(bias) = self.goal_bias {
            if !(bias.is_finite() && bias > 0.0) {
                return Err(ConfigError::InvalidGoalBias(bias));
            }
        }
        // Weight lengths depend on the environment and are checked by `ActionSampler`.
        Ok(())
    }
}

/// A complete run description as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub grid: GridConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let config: Config = toml::from_str(content)?;
        config.search.validate()?;
        config.grid.validate()?;
        Ok(config)
    }
}

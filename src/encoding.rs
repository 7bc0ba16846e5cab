use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use crate::error::ConfigError;
use crate::{Action, Gene, Population, Position, manhattan};

/// Draws fresh actions, uniformly or from a biased distribution.
#[derive(Debug, Clone)]
pub struct ActionSampler {
    actions: Vec<Action>,
    weights: Option<WeightedIndex<f32>>,
}

impl ActionSampler {
    pub fn uniform(actions: &[Action]) -> Result<Self, ConfigError> {
        if actions.is_empty() {
            return Err(ConfigError::EmptyActionSpace);
        }
        Ok(Self {
            actions: actions.to_vec(),
            weights: None,
        })
    }

    /// `weights[i]` is the relative chance of drawing `actions[i]`.
    pub fn weighted(actions: &[Action], weights: &[f32]) -> Result<Self, ConfigError> {
        if actions.is_empty() {
            return Err(ConfigError::EmptyActionSpace);
        }
        if weights.len() != actions.len() {
            return Err(ConfigError::InvalidActionWeights(format!(
                "expected {} weights, got {}",
                actions.len(),
                weights.len()
            )));
        }
        let index = WeightedIndex::new(weights.iter().copied())
            .map_err(|e| ConfigError::InvalidActionWeights(e.to_string()))?;
        Ok(Self {
            actions: actions.to_vec(),
            weights: Some(index),
        })
    }

    /// Weight actions that shorten the distance from `from` to `goal` by
    /// `bias`; every other action keeps weight 1.
    pub fn goal_biased(
        actions: &[Action],
        from: Position,
        goal: Position,
        bias: f32,
    ) -> Result<Self, ConfigError> {
        if !(bias.is_finite() && bias > 0.0) {
            return Err(ConfigError::InvalidGoalBias(bias));
        }
        let current = manhattan(from, goal);
        let weights: Vec<f32> = actions
            .iter()
            .map(|a| {
                let (dr, dc) = a.delta();
                if manhattan((from.0 + dr, from.1 + dc), goal) < current {
                    bias
                } else {
                    1.0
                }
            })
            .collect();
        Self::weighted(actions, &weights)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Action {
        match &self.weights {
            Some(index) => self.actions[index.sample(rng)],
            None => self.actions[rng.random_range(0..self.actions.len())],
        }
    }
}

/// `size` independent genes of `length` freshly drawn actions each.
pub fn initialize_population<R: Rng>(
    size: usize,
    length: usize,
    sampler: &ActionSampler,
    rng: &mut R,
) -> Population {
    (0..size)
        .map(|_| (0..length).map(|_| sampler.sample(rng)).collect())
        .collect()
}

/// Parse a gene written as action symbols, e.g. `"ddrr"`.
pub fn parse_gene(symbols: &str) -> Result<Gene, ConfigError> {
    symbols
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(Action::from_symbol)
        .collect()
}

pub fn format_gene(gene: &[Action]) -> String {
    gene.iter().map(|a| a.symbol()).collect()
}

/// Reject genes that use actions the environment does not accept.
pub fn validate_gene(gene: &[Action], action_space: &[Action]) -> Result<(), ConfigError> {
    match gene.iter().find(|a| !action_space.contains(a)) {
        Some(&foreign) => Err(ConfigError::ForeignAction(foreign)),
        None => Ok(()),
    }
}

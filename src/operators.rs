use rand::Rng;
use rand::prelude::IndexedRandom;

use crate::encoding::ActionSampler;
use crate::error::ConfigError;
use crate::{Action, Gene};

/// Crossover and mutation over action genes.
///
/// Parents are only ever borrowed; every child is a fresh allocation, so a
/// later mutation can never reach back into a selected parent.
#[derive(Debug, Clone)]
pub struct GeneticOperators {
    mutation_rate: f32,
    sampler: ActionSampler,
}

impl GeneticOperators {
    pub fn new(mutation_rate: f32, sampler: ActionSampler) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&mutation_rate) {
            return Err(ConfigError::InvalidRate {
                name: "mutation_rate",
                value: mutation_rate,
            });
        }
        Ok(Self {
            mutation_rate,
            sampler,
        })
    }

    pub fn mutation_rate(&self) -> f32 {
        self.mutation_rate
    }

    pub fn action_space(&self) -> &[Action] {
        self.sampler.actions()
    }

    pub fn sampler(&self) -> &ActionSampler {
        &self.sampler
    }

    /// Single-point crossover with a cut drawn from `[1, len - 1]`.
    /// Genes shorter than two actions are cut at 1.
    pub fn crossover<R: Rng>(&self, parent_a: &[Action], parent_b: &[Action], rng: &mut R) -> Gene {
        let cut = if parent_a.len() < 2 {
            1
        } else {
            rng.random_range(1..parent_a.len())
        };
        Self::crossover_at(parent_a, parent_b, cut)
    }

    /// `parent_a[..cut]` followed by `parent_b[cut..]`, always `parent_a.len()` long.
    /// Positions past the end of a shorter `parent_b` come from `parent_a`.
    pub fn crossover_at(parent_a: &[Action], parent_b: &[Action], cut: usize) -> Gene {
        parent_a
            .iter()
            .enumerate()
            .map(|(i, &a)| {
                if i < cut {
                    a
                } else {
                    parent_b.get(i).copied().unwrap_or(a)
                }
            })
            .collect()
    }

    /// With probability `mutation_rate`, replace one random position with a
    /// different action. Returns the mutated index.
    pub fn mutate<R: Rng>(&self, gene: &mut Gene, rng: &mut R) -> Option<usize> {
        if gene.is_empty() || !rng.random_bool(self.mutation_rate as f64) {
            return None;
        }
        let idx = rng.random_range(0..gene.len());
        let current = gene[idx];
        let alternatives: Vec<Action> = self
            .action_space()
            .iter()
            .copied()
            .filter(|&a| a != current)
            .collect();
        let replacement = *alternatives.choose(rng)?;
        gene[idx] = replacement;
        Some(idx)
    }

    pub fn random_action<R: Rng>(&self, rng: &mut R) -> Action {
        self.sampler.sample(rng)
    }

    pub fn random_gene<R: Rng>(&self, length: usize, rng: &mut R) -> Gene {
        (0..length).map(|_| self.sampler.sample(rng)).collect()
    }

    /// Append `count` freshly sampled actions.
    pub fn extend<R: Rng>(&self, gene: &mut Gene, count: usize, rng: &mut R) {
        gene.extend((0..count).map(|_| self.sampler.sample(rng)));
    }
}

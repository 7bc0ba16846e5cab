//! Greedy elitist growth.
//!
//! A single incumbent gene is kept across generations. Every individual of the
//! next generation is a (possibly mutated) copy of the incumbent with a short
//! random suffix appended, so genes grow until they reach the target length.
//! The search converges quickly but narrowly; the [`StagnationGuard`] shortens
//! an incumbent that stops changing.

use rand::Rng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::StrategyKind;
use crate::operators::GeneticOperators;
use crate::stagnation::StagnationGuard;
use crate::{Action, Gene, Phenotype, Population, SelectionStrategy, cmp_f32_nan_last, fittest_index};

/// Independent chances of appending one more action to a suffix.
const EXTRA_ACTION_CHANCES: [f64; 2] = [0.5, 0.2];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElitistGrowth {
    population_size: usize,
    target_length: usize,
    best_gene: Gene,
    /// `None` until a generation has been scored, and again after the guard
    /// truncates the incumbent.
    best_fitness: Option<f32>,
    guard: StagnationGuard,
}

impl ElitistGrowth {
    pub fn new(population_size: usize, target_length: usize, stagnation_threshold: usize) -> Self {
        Self {
            population_size,
            target_length,
            best_gene: Vec::new(),
            best_fitness: None,
            guard: StagnationGuard::new(stagnation_threshold),
        }
    }

    pub fn best_gene(&self) -> &[Action] {
        &self.best_gene
    }

    pub fn best_fitness(&self) -> Option<f32> {
        self.best_fitness
    }

    pub fn guard(&self) -> &StagnationGuard {
        &self.guard
    }

    fn suffix_length<R: Rng>(&self, base_length: usize, rng: &mut R) -> usize {
        let mut length = 1;
        for chance in EXTRA_ACTION_CHANCES {
            if rng.random_bool(chance) {
                length += 1;
            }
        }
        length.min(self.target_length.saturating_sub(base_length))
    }

    fn promote(&mut self, candidate: &Phenotype) {
        let accept = match self.best_fitness {
            None => true,
            Some(best) => cmp_f32_nan_last(candidate.fitness, best) != Ordering::Less,
        };
        if accept {
            self.best_gene = candidate.gene.clone();
            self.best_fitness = Some(candidate.fitness);
        }
    }
}

impl SelectionStrategy for ElitistGrowth {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ElitistGrowth
    }

    fn initial_gene_length(&self, gene_length: usize) -> usize {
        gene_length.min(1)
    }

    fn next_population(
        &mut self,
        evaluated: &[Phenotype],
        operators: &GeneticOperators,
        rng: &mut Pcg64,
    ) -> Population {
        if let Some(idx) = fittest_index(evaluated) {
            self.promote(&evaluated[idx]);
        }
        if self.guard.check(&mut self.best_gene) {
            // The remembered fitness belonged to the longer gene.
            self.best_fitness = None;
        }

        (0..self.population_size)
            .map(|_| {
                let mut gene = self.best_gene.clone();
                operators.mutate(&mut gene, rng);
                let suffix = self.suffix_length(gene.len(), rng);
                operators.extend(&mut gene, suffix, rng);
                gene
            })
            .collect()
    }
}

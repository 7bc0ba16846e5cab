use rand::Rng;
use rand::seq::index;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::StrategyKind;
use crate::operators::GeneticOperators;
use crate::stagnation::StagnationGuard;
use crate::{Phenotype, Population, SelectionStrategy, cmp_f32_nan_last, fittest_index};

/// Binary tournament selection with a fixed share of elites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    population_size: usize,
    gene_length: usize,
    elite_fraction: f32,
    guard: StagnationGuard,
}

impl Tournament {
    pub fn new(
        population_size: usize,
        gene_length: usize,
        elite_fraction: f32,
        stagnation_threshold: usize,
    ) -> Self {
        Self {
            population_size,
            gene_length,
            elite_fraction,
            guard: StagnationGuard::new(stagnation_threshold),
        }
    }

    pub fn guard(&self) -> &StagnationGuard {
        &self.guard
    }

    /// Number of individuals carried over unchanged each generation.
    pub fn elite_count(&self) -> usize {
        ((self.elite_fraction * self.population_size as f32).floor() as usize)
            .min(self.population_size)
    }

    /// The fitter of two candidates; equal fitness keeps the lower index.
    pub fn winner(evaluated: &[Phenotype], a: usize, b: usize) -> usize {
        match cmp_f32_nan_last(evaluated[a].fitness, evaluated[b].fitness) {
            Ordering::Greater => a,
            Ordering::Less => b,
            Ordering::Equal => a.min(b),
        }
    }

    /// Indices of the `count` fittest individuals, best first. The sort is
    /// stable, so ties keep population order.
    pub fn elite_indices(evaluated: &[Phenotype], count: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..evaluated.len()).collect();
        order.sort_by(|&a, &b| cmp_f32_nan_last(evaluated[b].fitness, evaluated[a].fitness));
        order.truncate(count);
        order
    }

    /// One binary tournament per output slot, drawing two distinct candidates.
    fn select_parents<R: Rng>(&self, evaluated: &[Phenotype], rng: &mut R) -> Vec<usize> {
        let n = evaluated.len();
        (0..self.population_size)
            .map(|_| {
                if n < 2 {
                    return 0;
                }
                let picks = index::sample(rng, n, 2);
                Self::winner(evaluated, picks.index(0), picks.index(1))
            })
            .collect()
    }
}

impl SelectionStrategy for Tournament {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Tournament
    }

    fn next_population(
        &mut self,
        evaluated: &[Phenotype],
        operators: &GeneticOperators,
        rng: &mut Pcg64,
    ) -> Population {
        if evaluated.is_empty() {
            return (0..self.population_size)
                .map(|_| operators.random_gene(self.gene_length, rng))
                .collect();
        }

        let mut next: Population = Self::elite_indices(evaluated, self.elite_count())
            .into_iter()
            .map(|i| evaluated[i].gene.clone())
            .collect();

        let pool = self.select_parents(evaluated, rng);
        while next.len() < self.population_size {
            let a = pool[rng.random_range(0..pool.len())];
            let b = pool[rng.random_range(0..pool.len())];
            let mut child = operators.crossover(&evaluated[a].gene, &evaluated[b].gene, rng);
            operators.mutate(&mut child, rng);
            next.push(child);
        }

        // The regrown leader takes the first bred slot; elites are never displaced.
        if let Some(leader) = fittest_index(evaluated) {
            if let Some(shaken) = self.guard.check_and_regrow(&evaluated[leader].gene, operators, rng) {
                if let Some(slot) = next.get_mut(self.elite_count()) {
                    *slot = shaken;
                }
            }
        }
        next
    }
}

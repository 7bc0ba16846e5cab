use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::config::StrategyKind;
use crate::operators::GeneticOperators;
use crate::stagnation::StagnationGuard;
use crate::{Phenotype, Population, SelectionStrategy, fittest_index};

/// Roulette-wheel selection. Every child is bred; nothing survives unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessProportionate {
    population_size: usize,
    gene_length: usize,
    guard: StagnationGuard,
}

impl FitnessProportionate {
    pub fn new(population_size: usize, gene_length: usize, stagnation_threshold: usize) -> Self {
        Self {
            population_size,
            gene_length,
            guard: StagnationGuard::new(stagnation_threshold),
        }
    }

    pub fn guard(&self) -> &StagnationGuard {
        &self.guard
    }

    /// Selection probability of each individual.
    ///
    /// Negative and NaN fitness count as zero, so a gene that walked into a
    /// hazard never gets negative mass. When nothing carries weight the
    /// distribution is uniform.
    pub fn selection_probabilities(fitness: &[f32]) -> Vec<f32> {
        let weights: Vec<f32> = fitness
            .iter()
            .map(|&f| if f > 0.0 { f } else { 0.0 })
            .collect();
        let total: f32 = weights.iter().sum();
        if total > 0.0 && total.is_finite() {
            weights.iter().map(|w| w / total).collect()
        } else {
            vec![1.0 / fitness.len() as f32; fitness.len()]
        }
    }
}

impl SelectionStrategy for FitnessProportionate {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FitnessProportionate
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

        let fitness: Vec<f32> = evaluated.iter().map(|p| p.fitness).collect();
        let probabilities = Self::selection_probabilities(&fitness);
        let wheel = WeightedIndex::<f32>::new(&probabilities).ok();
        let spin = |rng: &mut Pcg64| match &wheel {
            Some(wheel) => wheel.sample(rng),
            None => rng.random_range(0..evaluated.len()),
        };

        let mut next: Population = (0..self.population_size)
            .map(|_| {
                let a = spin(rng);
                let b = spin(rng);
                let mut child = operators.crossover(&evaluated[a].gene, &evaluated[b].gene, rng);
                operators.mutate(&mut child, rng);
                child
            })
            .collect();

        if let Some(leader) = fittest_index(evaluated) {
            if let Some(shaken) = self.guard.check_and_regrow(&evaluated[leader].gene, operators, rng) {
                if let Some(slot) = next.first_mut() {
                    *slot = shaken;
                }
            }
        }
        next
    }
}

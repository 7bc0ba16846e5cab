use log::{debug, info, warn};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::{SearchConfig, StrategyKind};
use crate::encoding::{ActionSampler, format_gene, initialize_population, validate_gene};
use crate::error::ConfigError;
use crate::fitness::{Evaluation, FitnessEvaluator};
use crate::operators::GeneticOperators;
use crate::{
    Action, Environment, Gene, Phenotype, Population, SelectionStrategy, cmp_f32_nan_last,
    fittest_index,
};

/// Where the generation loop currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Init,
    Evaluate,
    Select,
    TerminatedSuccess,
    TerminatedTimeout,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::TerminatedSuccess | RunState::TerminatedTimeout)
    }
}

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Solved,
    TimedOut,
}

/// Progress report of a run. Only the [`PopulationManager`] writes to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmStats {
    best_gene: Gene,
    best_fitness: f32,
    generation: usize,
    total_genes_evaluated: usize,
    outcome: Option<Outcome>,
}

impl Default for AlgorithmStats {
    fn default() -> Self {
        Self {
            best_gene: Vec::new(),
            best_fitness: f32::NEG_INFINITY,
            generation: 0,
            total_genes_evaluated: 0,
            outcome: None,
        }
    }
}

impl AlgorithmStats {
    /// Best gene seen so far; the winning gene once the run is solved.
    pub fn best_gene(&self) -> &[Action] {
        &self.best_gene
    }

    /// `NEG_INFINITY` until the first generation has been scored.
    pub fn best_fitness(&self) -> f32 {
        self.best_fitness
    }

    /// Completed selection rounds; the index of the current generation.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn total_genes_evaluated(&self) -> usize {
        self.total_genes_evaluated
    }

    /// `None` while the run is still going.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_solved(&self) -> bool {
        self.outcome == Some(Outcome::Solved)
    }
}

/// Drives the generation loop.
///
/// The manager owns the environment, the population and the only RNG of the
/// run. Every component borrows that RNG in turn, so a fixed `rng_seed`
/// reproduces population order, selection draws and mutation sites.
///
/// ```text
/// Init -> Evaluate -> (goal reached ? TerminatedSuccess : Select) -> Evaluate -> ...
///                                            Select -> TerminatedTimeout (cap reached)
/// ```
pub struct PopulationManager<E: Environment> {
    config: SearchConfig,
    environment: E,
    evaluator: FitnessEvaluator,
    operators: GeneticOperators,
    strategy: Box<dyn SelectionStrategy>,
    rng: Pcg64,
    population: Population,
    evaluated: Vec<Phenotype>,
    state: RunState,
    stats: AlgorithmStats,
}

impl<E: Environment> PopulationManager<E> {
    /// Build a manager running the strategy named by `config.selection_strategy`.
    pub fn new(config: SearchConfig, environment: E) -> Result<Self, ConfigError> {
        config.validate()?;
        let strategy = config.selection_strategy.build(&config);
        Self::with_strategy(config, environment, strategy)
    }

    /// Build a manager around a caller-supplied strategy.
    pub fn with_strategy(
        config: SearchConfig,
        mut environment: E,
        strategy: Box<dyn SelectionStrategy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        environment.reset();
        let sampler = Self::action_sampler(&config, &environment)?;
        let operators = GeneticOperators::new(config.mutation_rate, sampler)?;

        Ok(Self {
            evaluator: FitnessEvaluator::new(config.fitness.clone()),
            rng: Pcg64::seed_from_u64(config.rng_seed),
            config,
            environment,
            operators,
            strategy,
            population: Vec::new(),
            evaluated: Vec::new(),
            state: RunState::Init,
            stats: AlgorithmStats::default(),
        })
    }

    fn action_sampler(config: &SearchConfig, environment: &E) -> Result<ActionSampler, ConfigError> {
        let actions = environment.action_space();
        match (&config.action_weights, config.goal_bias) {
            (Some(weights), _) => ActionSampler::weighted(actions, weights),
            (None, Some(bias)) => ActionSampler::goal_biased(
                actions,
                environment.position(),
                environment.goal_position(),
                bias,
            ),
            (None, None) => ActionSampler::uniform(actions),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> &AlgorithmStats {
        &self.stats
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    /// Genes waiting to be evaluated.
    pub fn population(&self) -> &[Gene] {
        &self.population
    }

    /// Scores of the most recently evaluated generation.
    pub fn last_generation(&self) -> &[Phenotype] {
        &self.evaluated
    }

    /// Replace the random generation-zero population.
    ///
    /// Only allowed before the first generation is evaluated. Genes must use
    /// the environment's actions and there must be exactly `population_size`.
    pub fn seed_population(&mut self, genes: Vec<Gene>) -> Result<(), ConfigError> {
        if self.state != RunState::Init {
            return Err(ConfigError::RunAlreadyStarted);
        }
        if genes.len() != self.config.population_size {
            return Err(ConfigError::PopulationSizeMismatch {
                expected: self.config.population_size,
                actual: genes.len(),
            });
        }
        for gene in &genes {
            validate_gene(gene, self.environment.action_space())?;
        }
        self.population = genes;
        self.state = RunState::Evaluate;
        Ok(())
    }

    /// Replay a single gene against the environment without touching the run statistics.
    pub fn evaluate(&mut self, gene: &[Action]) -> Evaluation {
        self.evaluator.evaluate(&mut self.environment, gene, &mut self.rng)
    }

    /// Advance one generation: evaluate, then either stop or breed the next population.
    pub fn step(&mut self) -> RunState {
        if self.state == RunState::Init {
            self.initialize();
        }
        if self.state.is_terminal() {
            return self.state;
        }

        self.evaluate_generation();
        if self.state == RunState::Select {
            self.select();
        }
        self.state
    }

    /// Run until the goal is reached or the generation cap is hit.
    ///
    /// Without `max_generations` this never returns on an unsolvable layout.
    pub fn run(&mut self) -> AlgorithmStats {
        self.run_with_callback(|_| {})
    }

    /// Like [`run`](Self::run), calling `callback` once per generation.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> AlgorithmStats
    where
        F: FnMut(&AlgorithmStats),
    {
        while !self.state.is_terminal() {
            self.step();
            callback(&self.stats);
        }
        self.stats.clone()
    }

    fn initialize(&mut self) {
        let length = self.strategy.initial_gene_length(self.config.gene_length);
        info!(
            "initializing {:?} search: {} genes of length {}",
            self.strategy.kind(),
            self.config.population_size,
            length
        );
        self.population = initialize_population(
            self.config.population_size,
            length,
            self.operators.sampler(),
            &mut self.rng,
        );
        self.state = RunState::Evaluate;
    }

    fn evaluate_generation(&mut self) {
        let population = std::mem::take(&mut self.population);
        let mut evaluated = Vec::with_capacity(population.len());

        for gene in population {
            let evaluation = self
                .evaluator
                .evaluate(&mut self.environment, &gene, &mut self.rng);
            self.stats.total_genes_evaluated += 1;

            if evaluation.won {
                info!(
                    "goal reached in generation {} by {} (fitness {:.3}, {} genes evaluated)",
                    self.stats.generation,
                    format_gene(&gene[..evaluation.steps_applied]),
                    evaluation.fitness,
                    self.stats.total_genes_evaluated
                );
                self.stats.best_gene = gene.clone();
                self.stats.best_fitness = evaluation.fitness;
                self.stats.outcome = Some(Outcome::Solved);
                evaluated.push(Phenotype {
                    gene,
                    fitness: evaluation.fitness,
                });
                self.evaluated = evaluated;
                self.state = RunState::TerminatedSuccess;
                return;
            }

            evaluated.push(Phenotype {
                gene,
                fitness: evaluation.fitness,
            });
        }

        if let Some(leader) = fittest_index(&evaluated) {
            let leader = &evaluated[leader];
            if cmp_f32_nan_last(leader.fitness, self.stats.best_fitness) == Ordering::Greater {
                self.stats.best_gene = leader.gene.clone();
                self.stats.best_fitness = leader.fitness;
            }
            debug!(
                "generation {}: leader {} fitness {:.3}, best so far {:.3}",
                self.stats.generation,
                format_gene(&leader.gene),
                leader.fitness,
                self.stats.best_fitness
            );
        }

        self.evaluated = evaluated;
        self.state = RunState::Select;
    }

    fn select(&mut self) {
        self.population =
            self.strategy
                .next_population(&self.evaluated, &self.operators, &mut self.rng);
        self.stats.generation += 1;

        if let Some(cap) = self.config.max_generations {
            if self.stats.generation >= cap {
                warn!(
                    "generation cap {} reached without reaching the goal; best fitness {:.3}",
                    cap, self.stats.best_fitness
                );
                self.stats.outcome = Some(Outcome::TimedOut);
                self.state = RunState::TerminatedTimeout;
                return;
            }
        }
        self.state = RunState::Evaluate;
    }
}

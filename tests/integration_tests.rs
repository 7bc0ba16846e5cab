use rand::SeedableRng;
use rand_pcg::Pcg64;
use symbios_pathfinder::{
    Action, Environment, Phenotype, SelectionStrategy,
    algorithms::{fitness_proportionate::FitnessProportionate, tournament::Tournament},
    config::{Config, FitnessWeights, SearchConfig, StrategyKind},
    encoding::{ActionSampler, parse_gene},
    error::{ConfigError, LoadError},
    fitness::FitnessEvaluator,
    grid::{GridConfig, GridWorld},
    manager::{Outcome, PopulationManager, RunState},
    operators::GeneticOperators,
    stagnation::StagnationGuard,
};

// --- Shared Infrastructure ---

fn lake(hazards: Vec<(i32, i32)>) -> GridWorld {
    GridWorld::new(&GridConfig {
        hazards,
        ..GridConfig::default()
    })
    .expect("valid grid")
}

fn operators(mutation_rate: f32) -> GeneticOperators {
    let sampler = ActionSampler::uniform(&Action::ALL).expect("non-empty action space");
    GeneticOperators::new(mutation_rate, sampler).expect("valid mutation rate")
}

fn gene(symbols: &str) -> Vec<Action> {
    parse_gene(symbols).expect("valid gene")
}

fn scored(fitness: &[f32]) -> Vec<Phenotype> {
    fitness
        .iter()
        .enumerate()
        .map(|(i, &f)| Phenotype {
            // Distinct genes so tests can tell individuals apart.
            gene: vec![Action::ALL[i % 4]; i / 4 + 1],
            fitness: f,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Genetic operators
    // ========================================================================

    #[test]
    fn test_forced_mutation_changes_exactly_one_index() {
        let ops = operators(1.0);
        for seed in 0..50 {
            let mut rng = Pcg64::seed_from_u64(seed);
            let mut g = ops.random_gene(8, &mut rng);
            let before = g.clone();

            let idx = ops.mutate(&mut g, &mut rng).expect("mutation is forced");

            let changed: Vec<usize> = (0..g.len()).filter(|&i| g[i] != before[i]).collect();
            assert_eq!(changed, vec![idx], "seed {seed}: exactly one site must change");
            assert_eq!(g.len(), before.len());
        }
    }

    #[test]
    fn test_disabled_mutation_is_identity() {
        let ops = operators(0.0);
        let mut rng = Pcg64::seed_from_u64(7);
        let mut g = gene("ddrrul");
        assert_eq!(ops.mutate(&mut g, &mut rng), None);
        assert_eq!(g, gene("ddrrul"));
    }

    #[test]
    fn test_crossover_at_every_cut() {
        let a = gene("uuuuuu");
        let b = gene("dddddd");
        for cut in 1..a.len() {
            let child = GeneticOperators::crossover_at(&a, &b, cut);
            assert_eq!(child.len(), a.len());
            assert_eq!(&child[..cut], &a[..cut], "cut {cut}: prefix must come from A");
            assert_eq!(&child[cut..], &b[cut..], "cut {cut}: suffix must come from B");
        }
    }

    #[test]
    fn test_random_crossover_keeps_parent_a_length() {
        let ops = operators(0.0);
        let mut rng = Pcg64::seed_from_u64(3);
        let a = gene("udlrudlr");
        let b = gene("rrrrdddd");
        for _ in 0..100 {
            let child = ops.crossover(&a, &b, &mut rng);
            assert_eq!(child.len(), a.len());
            // The cut lies in [1, len - 1], so the first action always comes from A.
            assert_eq!(child[0], a[0]);
        }
    }

    // ========================================================================
    // Fitness evaluation
    // ========================================================================

    #[test]
    fn test_evaluation_is_deterministic_on_a_fixed_lake() {
        let evaluator = FitnessEvaluator::default();
        let mut env = lake(vec![(2, 2)]);
        let mut rng = Pcg64::seed_from_u64(1);
        let g = gene("rrdlud");

        let first = evaluator.evaluate(&mut env, &g, &mut rng);
        let second = evaluator.evaluate(&mut env, &g, &mut rng);
        assert_eq!(first, second);
    }

    #[test]
    fn test_shaped_fitness_combines_reward_distance_and_oscillation() {
        let evaluator = FitnessEvaluator::default();
        let mut env = lake(vec![]);
        let mut rng = Pcg64::seed_from_u64(1);

        // Four ordinary moves ending on (1, 1), four cells from the goal.
        let plain = evaluator.evaluate(&mut env, &gene("rrdl"), &mut rng);
        assert_eq!(plain.final_position, (1, 1));
        assert!((plain.fitness - 4.0 / 5.0).abs() < 1e-6);

        // Right then left: back on the start with one oscillation penalty.
        let wobble = evaluator.evaluate(&mut env, &gene("rl"), &mut rng);
        assert!((wobble.fitness - (2.0 / 7.0 - 0.8)).abs() < 1e-6);

        // A bounce off the top edge only costs the out-of-bounds reward.
        let bounce = evaluator.evaluate(&mut env, &gene("u"), &mut rng);
        assert_eq!(bounce.final_position, (0, 0));
        assert!((bounce.fitness - (-0.2 / 7.0)).abs() < 1e-6);

        assert!(plain.fitness > wobble.fitness);
    }

    #[test]
    fn test_hazard_stops_evaluation_and_pins_fitness() {
        let evaluator = FitnessEvaluator::new(FitnessWeights {
            hazard_fitness: -5.0,
            ..FitnessWeights::default()
        });
        let mut env = lake(vec![(1, 1)]);
        let mut rng = Pcg64::seed_from_u64(1);

        // Hazard entered by the second action; the tails differ.
        let a = evaluator.evaluate(&mut env, &gene("drrrdd"), &mut rng);
        let b = evaluator.evaluate(&mut env, &gene("drlulu"), &mut rng);
        for eval in [a, b] {
            assert!(eval.hit_hazard);
            assert!(!eval.won);
            assert_eq!(eval.steps_applied, 2);
            assert_eq!(eval.final_position, (1, 1));
            assert_eq!(eval.fitness, -5.0);
        }
    }

    #[test]
    fn test_path_through_hazard_scores_exactly_the_hazard_value() {
        let weights = FitnessWeights::default();
        let evaluator = FitnessEvaluator::new(weights.clone());
        let mut env = lake(vec![(1, 1)]);
        let mut rng = Pcg64::seed_from_u64(9);

        let through = evaluator.evaluate(&mut env, &gene("rdrrdd"), &mut rng);
        assert_eq!(through.fitness, weights.hazard_fitness);

        // Same moves on a lake without the hazard would have been shaped instead.
        let mut open = lake(vec![]);
        let shaped = evaluator.evaluate(&mut open, &gene("rdrrdd"), &mut rng);
        assert!(shaped.won);
        assert_ne!(shaped.fitness, weights.hazard_fitness);
    }

    #[test]
    fn test_goal_bonus_dominates_shaping() {
        let evaluator = FitnessEvaluator::default();
        let mut env = lake(vec![]);
        let mut rng = Pcg64::seed_from_u64(1);

        // The goal is reached after six actions; the trailing ones are never applied.
        let eval = evaluator.evaluate(&mut env, &gene("rrrdddlllu"), &mut rng);
        assert!(eval.won);
        assert_eq!(eval.steps_applied, 6);
        assert_eq!(eval.final_position, (3, 3));
        assert!((eval.fitness - (1000.0 + 105.0)).abs() < 1e-3);
        assert!(env.won());
    }

    // ========================================================================
    // Selection
    // ========================================================================

    #[test]
    fn test_fps_all_zero_fitness_is_uniform() {
        let probabilities = FitnessProportionate::selection_probabilities(&[0.0; 5]);
        assert_eq!(probabilities.len(), 5);
        for p in probabilities {
            assert!((p - 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn test_fps_clamps_negative_fitness_to_zero_mass() {
        let probabilities = FitnessProportionate::selection_probabilities(&[-10.0, 0.0, 5.0, 15.0]);
        assert_eq!(probabilities[0], 0.0);
        assert_eq!(probabilities[1], 0.0);
        assert!((probabilities[2] - 0.25).abs() < 1e-6);
        assert!((probabilities[3] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_tournament_strictly_fitter_candidate_wins() {
        let evaluated = scored(&[1.0, 3.0, 2.0]);
        assert_eq!(Tournament::winner(&evaluated, 0, 1), 1);
        assert_eq!(Tournament::winner(&evaluated, 1, 0), 1);
        assert_eq!(Tournament::winner(&evaluated, 2, 0), 2);
    }

    #[test]
    fn test_tournament_tie_keeps_lower_index() {
        let evaluated = scored(&[2.0, 2.0, 2.0]);
        assert_eq!(Tournament::winner(&evaluated, 2, 1), 1);
        assert_eq!(Tournament::winner(&evaluated, 0, 2), 0);
    }

    #[test]
    fn test_tournament_keeps_elites_in_front() {
        let evaluated = scored(&[1.0, 5.0, 3.0, 4.0, 2.0]);
        let mut strategy = Tournament::new(5, 1, 0.4, 10);
        assert_eq!(strategy.elite_count(), 2);

        let mut rng = Pcg64::seed_from_u64(11);
        let next = strategy.next_population(&evaluated, &operators(0.5), &mut rng);
        assert_eq!(next.len(), 5);
        assert_eq!(next[0], evaluated[1].gene);
        assert_eq!(next[1], evaluated[3].gene);
    }

    // ========================================================================
    // Stagnation
    // ========================================================================

    #[test]
    fn test_stagnation_guard_truncates_after_threshold_repeats() {
        let threshold = 3;
        let mut guard = StagnationGuard::new(threshold);
        let mut best = gene("rrdd");

        // First sighting plus threshold - 1 repeats.
        for _ in 0..threshold {
            assert!(!guard.check(&mut best));
        }
        assert_eq!(guard.repeat_count(), threshold - 1);

        assert!(guard.check(&mut best), "threshold-th repeat must fire");
        assert_eq!(best, gene("rrd"));
        assert_eq!(guard.repeat_count(), 0);
        assert_eq!(guard.last_best(), None);
        assert_eq!(guard.trips(), 1);
    }

    #[test]
    fn test_stagnation_guard_resets_on_new_best() {
        let mut guard = StagnationGuard::new(3);
        let mut a = gene("rr");
        let mut b = gene("rd");
        guard.check(&mut a);
        guard.check(&mut a);
        guard.check(&mut a);
        assert_eq!(guard.repeat_count(), 2);

        assert!(!guard.check(&mut b));
        assert_eq!(guard.repeat_count(), 0);
        assert_eq!(guard.last_best(), Some(b.as_slice()));
    }

    // ========================================================================
    // End-to-end runs
    // ========================================================================

    #[test]
    fn test_elitist_growth_solves_open_lake() {
        let config = SearchConfig {
            population_size: 20,
            gene_length: 6,
            mutation_rate: 0.3,
            max_generations: Some(200),
            selection_strategy: StrategyKind::ElitistGrowth,
            rng_seed: 42,
            ..SearchConfig::default()
        };
        let mut manager = PopulationManager::new(config, lake(vec![])).expect("valid config");
        let stats = manager.run();

        assert_eq!(stats.outcome(), Some(Outcome::Solved));
        assert_eq!(manager.state(), RunState::TerminatedSuccess);
        assert!(stats.best_fitness() > 0.0);
        assert!(stats.generation() < 200);
        assert!(stats.best_gene().len() <= 6);

        // Replaying the winner on a fresh lake reaches the goal.
        let mut env = lake(vec![]);
        let mut rng = Pcg64::seed_from_u64(0);
        let replay = FitnessEvaluator::default().evaluate(&mut env, stats.best_gene(), &mut rng);
        assert!(replay.won);
        assert_eq!(replay.final_position, (3, 3));
    }

    #[test]
    fn test_same_seed_reproduces_the_whole_run() {
        let config = SearchConfig {
            population_size: 12,
            gene_length: 10,
            mutation_rate: 0.2,
            max_generations: Some(30),
            selection_strategy: StrategyKind::Tournament,
            rng_seed: 1234,
            ..SearchConfig::default()
        };
        let hazards = vec![(1, 1), (2, 3), (3, 0)];

        let mut first = PopulationManager::new(config.clone(), lake(hazards.clone())).unwrap();
        let mut second = PopulationManager::new(config, lake(hazards)).unwrap();
        assert_eq!(first.run(), second.run());
        assert_eq!(first.last_generation(), second.last_generation());
    }

    #[test]
    fn test_unsolvable_lake_times_out_at_the_cap() {
        let config = SearchConfig {
            population_size: 8,
            gene_length: 10,
            max_generations: Some(15),
            selection_strategy: StrategyKind::Tournament,
            ..SearchConfig::default()
        };
        // The goal is walled off by hazards.
        let mut manager = PopulationManager::new(config, lake(vec![(2, 3), (3, 2)])).unwrap();

        let mut reports = 0;
        let stats = manager.run_with_callback(|_| reports += 1);

        assert_eq!(stats.outcome(), Some(Outcome::TimedOut));
        assert_eq!(manager.state(), RunState::TerminatedTimeout);
        assert_eq!(stats.generation(), 15);
        assert_eq!(stats.total_genes_evaluated(), 15 * 8);
        assert_eq!(reports, 15);
    }

    #[test]
    fn test_seeded_winner_stops_at_first_evaluation() {
        let config = SearchConfig {
            population_size: 3,
            gene_length: 6,
            ..SearchConfig::default()
        };
        let mut manager = PopulationManager::new(config, lake(vec![(1, 1)])).unwrap();
        manager
            .seed_population(vec![gene("rrrddd"), gene("dddrrr"), gene("rdrdrd")])
            .expect("valid seed");

        assert_eq!(manager.step(), RunState::TerminatedSuccess);
        let stats = manager.stats();
        assert!(stats.is_solved());
        assert_eq!(stats.best_gene(), gene("rrrddd").as_slice());
        assert_eq!(stats.total_genes_evaluated(), 1);
        assert_eq!(stats.generation(), 0);

        // Terminal states are sticky.
        assert_eq!(manager.step(), RunState::TerminatedSuccess);
        assert_eq!(manager.stats().total_genes_evaluated(), 1);
    }

    #[test]
    fn test_stats_serialize_after_a_run() {
        let config = SearchConfig {
            population_size: 6,
            gene_length: 8,
            max_generations: Some(5),
            selection_strategy: StrategyKind::FitnessProportionate,
            ..SearchConfig::default()
        };
        let mut manager = PopulationManager::new(config, lake(vec![(2, 3), (3, 2)])).unwrap();
        let stats = manager.run();

        let json = serde_json::to_string(&stats).expect("stats serialize");
        let back = serde_json::from_str(&json).expect("stats deserialize");
        assert_eq!(stats, back);
    }

    // ========================================================================
    // Configuration files
    // ========================================================================

    #[test]
    fn test_config_loads_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [search]
            population_size = 12
            gene_length = 8
            selection_strategy = "fitness_proportionate"
            max_generations = 50
            rng_seed = 7

            [search.fitness]
            hazard_fitness = -1.0

            [grid]
            size = 5
            hazards = [[1, 1], [2, 3]]
            slip_probability = 0.1

            [grid.rewards]
            move = 0.5
            "#,
        )
        .expect("valid config");

        assert_eq!(config.search.population_size, 12);
        assert_eq!(config.search.selection_strategy, StrategyKind::FitnessProportionate);
        assert_eq!(config.search.max_generations, Some(50));
        assert_eq!(config.search.fitness.hazard_fitness, -1.0);
        assert_eq!(config.search.fitness.goal_bonus, 1000.0);
        assert_eq!(config.search.mutation_rate, 0.1);
        assert_eq!(config.grid.goal(), (4, 4));
        assert_eq!(config.grid.hazards, vec![(1, 1), (2, 3)]);
        assert_eq!(config.grid.rewards.step, 0.5);
        assert_eq!(config.grid.rewards.goal, 100.0);
    }

    #[test]
    fn test_invalid_toml_config_is_rejected() {
        let err = Config::from_toml_str("[search]\npopulation_size = 0\n").unwrap_err();
        assert!(matches!(err, LoadError::Invalid(ConfigError::ZeroPopulation)));

        let err = Config::from_toml_str("[search]\npopulation_size = \"many\"\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }
}

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::FitnessWeights;
use crate::{Action, Environment, Position, manhattan};

/// Result of replaying one gene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub fitness: f32,
    pub won: bool,
    pub hit_hazard: bool,
    /// Actions actually applied; a hazard or the goal cuts the replay short.
    pub steps_applied: usize,
    pub final_position: Position,
}

/// Scores genes by replaying them against an [`Environment`].
///
/// Terminal outcomes take precedence over shaping:
/// 1. hazard: fitness is pinned to `hazard_fitness`
/// 2. goal: `goal_bonus + reward - oscillation` over the applied prefix
/// 3. otherwise: `reward / (distance_to_goal + 1) - oscillation`
#[derive(Debug, Clone, Default)]
pub struct FitnessEvaluator {
    weights: FitnessWeights,
}

impl FitnessEvaluator {
    pub fn new(weights: FitnessWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    pub fn evaluate<E: Environment, R: Rng>(
        &self,
        env: &mut E,
        gene: &[Action],
        rng: &mut R,
    ) -> Evaluation {
        env.reset();

        for (i, &action) in gene.iter().enumerate() {
            let outcome = env.apply(action, rng);
            if outcome.won {
                let oscillation = self.oscillation(&gene[..=i]);
                return Evaluation {
                    fitness: self.weights.goal_bonus + env.accumulated_reward() - oscillation,
                    won: true,
                    hit_hazard: false,
                    steps_applied: i + 1,
                    final_position: env.position(),
                };
            }
            if outcome.game_over {
                return Evaluation {
                    fitness: self.weights.hazard_fitness,
                    won: false,
                    hit_hazard: true,
                    steps_applied: i + 1,
                    final_position: env.position(),
                };
            }
        }

        let distance = manhattan(env.position(), env.goal_position());
        let fitness =
            env.accumulated_reward() / (distance + 1) as f32 - self.oscillation(gene);
        Evaluation {
            fitness,
            won: false,
            hit_hazard: false,
            steps_applied: gene.len(),
            final_position: env.position(),
        }
    }

    fn oscillation(&self, gene: &[Action]) -> f32 {
        self.weights.oscillation_penalty * opposite_pairs(gene) as f32
    }
}

/// Number of adjacent pairs where an action is immediately undone.
pub fn opposite_pairs(gene: &[Action]) -> usize {
    gene.windows(2).filter(|w| w[1] == w[0].opposite()).count()
}

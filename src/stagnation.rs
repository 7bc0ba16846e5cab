use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::operators::GeneticOperators;
use crate::{Action, Gene, encoding::format_gene};

/// Detects a search that keeps crowning the same best gene.
///
/// Every best-gene determination is reported through [`StagnationGuard::check`].
/// Once the same gene has been reported `threshold` more times in a row, the
/// guard drops the final action of the stored gene, which knocks a
/// length-limited search out of its local optimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagnationGuard {
    threshold: usize,
    last_best: Option<Gene>,
    repeat_count: usize,
    trips: usize,
}

impl StagnationGuard {
    /// A `threshold` of 0 fires on every report; [`SearchConfig::validate`]
    /// rejects it for managed runs.
    ///
    /// [`SearchConfig::validate`]: crate::config::SearchConfig::validate
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            last_best: None,
            repeat_count: 0,
            trips: 0,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn repeat_count(&self) -> usize {
        self.repeat_count
    }

    pub fn last_best(&self) -> Option<&[Action]> {
        self.last_best.as_deref()
    }

    /// How many times the guard has fired.
    pub fn trips(&self) -> usize {
        self.trips
    }

    /// Record `best` and report whether the repeat threshold was just reached.
    /// Firing resets the counter and forgets the remembered gene.
    pub fn observe(&mut self, best: &[Action]) -> bool {
        match &self.last_best {
            Some(last) if last.as_slice() == best => self.repeat_count += 1,
            _ => {
                self.last_best = Some(best.to_vec());
                self.repeat_count = 0;
            }
        }

        if self.repeat_count >= self.threshold {
            self.repeat_count = 0;
            self.last_best = None;
            self.trips += 1;
            return true;
        }
        false
    }

    /// [`observe`](Self::observe) `best` and drop its final action when the guard fires.
    pub fn check(&mut self, best: &mut Gene) -> bool {
        if !self.observe(best) {
            return false;
        }
        info!(
            "best gene {} repeated {} times; dropping its final action",
            format_gene(best),
            self.threshold
        );
        best.pop();
        true
    }

    /// Variant of [`check`](Self::check) for fixed-length populations: on firing,
    /// returns a copy of `best` whose final action was replaced by a fresh one.
    pub fn check_and_regrow<R: Rng>(
        &mut self,
        best: &[Action],
        operators: &GeneticOperators,
        rng: &mut R,
    ) -> Option<Gene> {
        let mut gene = best.to_vec();
        if !self.check(&mut gene) {
            return None;
        }
        let missing = best.len() - gene.len();
        operators.extend(&mut gene, missing, rng);
        Some(gene)
    }
}

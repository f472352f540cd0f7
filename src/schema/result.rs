//! Result, history and progress types produced by search runs.

use serde::{Deserialize, Serialize};

use super::Candidate;

/// Per-epoch metrics reported by one model fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Validation accuracy per epoch.
    pub val_acc: Vec<f64>,
    /// Training loss per epoch.
    #[serde(default)]
    pub loss: Vec<f64>,
}

impl FitResult {
    /// Fitness of a bounded run: the first epoch's validation accuracy.
    pub fn first_val_acc(&self) -> Option<f64> {
        self.val_acc.first().copied()
    }
}

/// Everything observed while evaluating one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number (1-based).
    pub round: usize,
    /// Evaluated genomes in evaluation order.
    pub candidates: Vec<Candidate>,
    /// Raw fit histories, aligned with `candidates`.
    pub fits: Vec<FitResult>,
}

impl RoundRecord {
    /// Mean fitness of the round (0 when empty).
    pub fn mean_fitness(&self) -> f64 {
        if self.candidates.is_empty() {
            return 0.0;
        }
        self.candidates.iter().map(|c| c.fitness).sum::<f64>() / self.candidates.len() as f64
    }

    /// Highest-fitness candidate of the round. Ties keep the earliest.
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates
            .iter()
            .reduce(|best, c| if c.fitness > best.fitness { c } else { best })
    }
}

/// Outcome of a complete search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The genome reported by the strategy, with its fitness.
    pub best: Candidate,
    /// One summary value per round.
    ///
    /// Tournament: population mean fitness. Serial tournament: winning
    /// fitness. Generational: best fitness of the generation.
    pub history: Vec<f64>,
    /// Raw evaluations of every round.
    pub rounds: Vec<RoundRecord>,
    /// Run statistics.
    pub stats: SearchStats,
}

/// Summary statistics for a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Strategy name.
    pub strategy: String,
    /// Rounds completed.
    pub rounds: usize,
    /// Model fits performed.
    pub total_evaluations: u64,
    /// Trainer backend resets issued.
    pub session_resets: usize,
    /// Wall-clock time in seconds.
    pub elapsed_seconds: f64,
}

/// Progress snapshot handed to callbacks after every round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProgress {
    /// Strategy name.
    pub strategy: String,
    /// Round just completed (1-based).
    pub round: usize,
    /// Total rounds configured.
    pub total_rounds: usize,
    /// Summary value appended to the history this round.
    pub round_fitness: f64,
    /// Highest fitness evaluated this round.
    pub round_best: f64,
    /// Highest fitness evaluated so far.
    pub best_fitness: f64,
    /// Model fits performed so far.
    pub evaluations: u64,
}

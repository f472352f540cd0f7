//! Serial champion/challenger tournament.

use std::time::Instant;

use log::{debug, info};

use super::mutation::{MutationRate, mutate};
use super::trainer::{evaluate, random_genome};
use super::{SearchError, Trainer};
use crate::schema::{
    Candidate, FitParams, PathGenome, RoundRecord, SearchProgress, SearchResult, SearchStats,
    SerialTournamentConfig,
};

const STRATEGY: &str = "serial-tournament";

/// Two-genome search: a champion defends against a fresh random challenger
/// every round.
pub struct SerialTournamentSearch {
    config: SerialTournamentConfig,
    fit: FitParams,
    champion: Option<PathGenome>,
}

impl SerialTournamentSearch {
    pub fn new(config: SerialTournamentConfig, fit: FitParams) -> Self {
        Self {
            config,
            fit,
            champion: None,
        }
    }

    /// Champion genome after the last completed round.
    pub fn champion(&self) -> Option<&PathGenome> {
        self.champion.as_ref()
    }

    /// Run the search (blocking).
    pub fn run<T: Trainer>(&mut self, trainer: &mut T) -> Result<SearchResult, SearchError> {
        self.run_with_callback(trainer, |_| {})
    }

    /// Run the search with a per-round progress callback.
    pub fn run_with_callback<T, F>(
        &mut self,
        trainer: &mut T,
        mut callback: F,
    ) -> Result<SearchResult, SearchError>
    where
        T: Trainer,
        F: FnMut(&SearchProgress),
    {
        self.config.validate(trainer.depth(), trainer.width())?;
        self.fit.validate()?;

        let start_time = Instant::now();
        let total = self.config.rounds;
        let max_modules = self.config.max_modules_per_layer;
        let rate = MutationRate::ModuleBudget {
            max_modules_per_layer: max_modules,
        };

        let mut champion = random_genome(trainer, max_modules)?;
        let mut challenger = random_genome(trainer, max_modules)?;

        let mut history = Vec::with_capacity(total);
        let mut rounds = Vec::with_capacity(total);
        let mut best = None;
        let mut best_fitness = f64::NEG_INFINITY;

        for round in 1..=total {
            info!("Round {round}/{total}");
            debug!("Champion:   {champion}");
            debug!("Challenger: {challenger}");

            let (champion_fitness, champion_fit) = evaluate(trainer, &champion, &self.fit)?;
            let (challenger_fitness, challenger_fit) = evaluate(trainer, &challenger, &self.fit)?;

            trainer.increment_training_counter(&challenger);
            trainer.increment_training_counter(&champion);

            debug!("Champion: {champion_fitness:.5}, challenger: {challenger_fitness:.5}");
            let record = RoundRecord {
                round,
                candidates: vec![
                    Candidate::new(champion.clone(), champion_fitness),
                    Candidate::new(challenger.clone(), challenger_fitness),
                ],
                fits: vec![champion_fit, challenger_fit],
            };

            let winning_fitness = if challenger_fitness > champion_fitness {
                info!("Challenger wins ({challenger_fitness:.5} > {champion_fitness:.5})");
                champion = challenger.clone();
                challenger_fitness
            } else {
                info!("Champion wins ({champion_fitness:.5} >= {challenger_fitness:.5})");
                champion_fitness
            };
            history.push(winning_fitness);
            best_fitness = best_fitness.max(winning_fitness);
            best = Some(Candidate::new(champion.clone(), winning_fitness));

            rounds.push(record);
            trainer.print_training_counter();

            callback(&SearchProgress {
                strategy: STRATEGY.to_string(),
                round,
                total_rounds: total,
                round_fitness: winning_fitness,
                round_best: winning_fitness,
                best_fitness,
                evaluations: 2 * round as u64,
            });

            if round != total {
                champion = mutate(trainer, &champion, rate, max_modules)?;
                challenger = random_genome(trainer, max_modules)?;
            }
        }

        self.champion = Some(champion);
        let best = best.ok_or(SearchError::EmptyPopulation)?;
        info!(
            "Serial tournament finished: champion {} with fitness {:.5}",
            best.genome, best.fitness
        );

        Ok(SearchResult {
            best,
            history,
            rounds,
            stats: SearchStats {
                strategy: STRATEGY.to_string(),
                rounds: total,
                total_evaluations: 2 * total as u64,
                session_resets: 0,
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
            },
        })
    }
}

//! Pairwise tournament search.
//!
//! Every season the whole population is evaluated, then genomes are paired
//! at random. In each pair the loser's slot and the winner's own slot are
//! both overwritten with independently mutated copies of the winner.

use std::time::Instant;

use log::{debug, info};

use super::mutation::{MutationRate, mutate};
use super::trainer::{evaluate_round, random_genome};
use super::{SearchError, SearchRng, Trainer};
use crate::schema::{
    BestPolicy, Candidate, FitParams, PathGenome, RoundRecord, SearchProgress, SearchResult,
    SearchStats, TournamentConfig,
};

const STRATEGY: &str = "tournament";

/// Pairwise tournament over a fixed-size population.
pub struct TournamentSearch {
    config: TournamentConfig,
    fit: FitParams,
    rng: SearchRng,
    population: Vec<PathGenome>,
}

impl TournamentSearch {
    pub fn new(config: TournamentConfig, fit: FitParams, rng: SearchRng) -> Self {
        Self {
            config,
            fit,
            rng,
            population: Vec::new(),
        }
    }

    /// Current population. After a run this holds the mutated genomes that
    /// would enter the next season.
    pub fn population(&self) -> &[PathGenome] {
        &self.population
    }

    /// Run the search (blocking).
    pub fn run<T: Trainer>(&mut self, trainer: &mut T) -> Result<SearchResult, SearchError> {
        self.run_with_callback(trainer, |_| {})
    }

    /// Run the search with a per-season progress callback.
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
        let seasons = self.config.seasons;
        let rate = MutationRate::PopulationScaled {
            population_size: self.config.population_size,
        };

        self.population = (0..self.config.population_size)
            .map(|_| random_genome(trainer, self.config.max_modules_per_layer))
            .collect::<Result<_, _>>()?;

        let mut history = Vec::with_capacity(seasons);
        let mut rounds: Vec<RoundRecord> = Vec::with_capacity(seasons);
        let mut best_ever: Option<Candidate> = None;
        let mut evaluations = 0u64;

        for season in 1..=seasons {
            info!("Season {season}/{seasons}: evaluating fitness");
            let record = evaluate_round(trainer, &self.population, &self.fit, season)?;
            evaluations += record.candidates.len() as u64;

            let mean = record.mean_fitness();
            history.push(mean);
            for path in &self.population {
                trainer.increment_training_counter(path);
            }

            let season_best = record.best().cloned().ok_or(SearchError::EmptyPopulation)?;
            if best_ever
                .as_ref()
                .is_none_or(|best| season_best.fitness > best.fitness)
            {
                best_ever = Some(season_best.clone());
            }

            info!("Season {season}/{seasons}: select, transfer and mutate");
            self.select_and_mutate(trainer, &record, rate)?;
            trainer.print_training_counter();

            callback(&SearchProgress {
                strategy: STRATEGY.to_string(),
                round: season,
                total_rounds: seasons,
                round_fitness: mean,
                round_best: season_best.fitness,
                best_fitness: best_ever.as_ref().map_or(season_best.fitness, |b| b.fitness),
                evaluations,
            });
            rounds.push(record);
        }

        let best = match self.config.best {
            BestPolicy::FinalRound => rounds.last().and_then(RoundRecord::best).cloned(),
            BestPolicy::BestEver => best_ever,
        }
        .ok_or(SearchError::EmptyPopulation)?;

        info!(
            "Tournament finished: best {} with fitness {:.5}",
            best.genome, best.fitness
        );

        Ok(SearchResult {
            best,
            history,
            rounds,
            stats: SearchStats {
                strategy: STRATEGY.to_string(),
                rounds: seasons,
                total_evaluations: evaluations,
                session_resets: 0,
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
            },
        })
    }

    /// Pair shuffled slots and replace both slots of each pair with mutated
    /// copies of the pair's winner. Ties keep the first drawn as winner.
    fn select_and_mutate<T: Trainer>(
        &mut self,
        trainer: &mut T,
        record: &RoundRecord,
        rate: MutationRate,
    ) -> Result<(), SearchError> {
        let max_modules = self.config.max_modules_per_layer;
        let mut draft: Vec<usize> = (0..self.population.len()).collect();
        self.rng.shuffle(&mut draft);

        while let (Some(first), Some(second)) = (draft.pop(), draft.pop()) {
            let fitness = |i: usize| record.candidates[i].fitness;
            let (best, worst) = if fitness(second) > fitness(first) {
                (second, first)
            } else {
                (first, second)
            };
            let winner = &record.candidates[best].genome;
            debug!(
                "slot {best} ({:.4}) beats slot {worst} ({:.4})",
                fitness(best),
                fitness(worst)
            );

            self.population[worst] = mutate(trainer, winner, rate, max_modules)?;
            self.population[best] = mutate(trainer, winner, rate, max_modules)?;
        }
        Ok(())
    }
}

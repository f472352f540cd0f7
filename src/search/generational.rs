//! Generational evolutionary search.

use std::cmp::Ordering;
use std::time::Instant;

use log::{debug, info};

use super::crossover::{alternating_offspring, union_offspring};
use super::mutation::{MutationRate, mutate};
use super::selection::{roulette_selection, truncation_selection};
use super::trainer::{evaluate_round, random_genome};
use super::{SearchError, SearchRng, Trainer};
use crate::schema::{
    Candidate, CrossoverPolicy, FitParams, GenerationalConfig, PathGenome, SearchProgress,
    SearchResult, SearchStats, SelectionPolicy,
};

const STRATEGY: &str = "generational";

/// Evaluate, select, recombine and mutate a whole population per generation.
pub struct GenerationalSearch {
    config: GenerationalConfig,
    fit: FitParams,
    rng: SearchRng,
    population: Vec<PathGenome>,
}

impl GenerationalSearch {
    pub fn new(config: GenerationalConfig, fit: FitParams, rng: SearchRng) -> Self {
        Self {
            config,
            fit,
            rng,
            population: Vec::new(),
        }
    }

    /// Population of the last evaluated generation, sorted by descending fitness.
    pub fn population(&self) -> &[PathGenome] {
        &self.population
    }

    /// Run the search (blocking).
    pub fn run<T: Trainer>(&mut self, trainer: &mut T) -> Result<SearchResult, SearchError> {
        self.run_with_callback(trainer, |_| {})
    }

    /// Run the search with a per-generation progress callback.
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
        let generations = self.config.generations;

        self.population = (0..self.config.population_size)
            .map(|_| random_genome(trainer, self.config.max_modules_per_layer))
            .collect::<Result<_, _>>()?;

        let mut history = Vec::with_capacity(generations);
        let mut rounds = Vec::with_capacity(generations);
        let mut best: Option<Candidate> = None;
        let mut evaluations = 0u64;
        let mut session_resets = 0;

        for generation in 1..=generations {
            info!(
                "Generation {generation}/{generations}: evaluating {} paths",
                self.population.len()
            );
            let record = evaluate_round(trainer, &self.population, &self.fit, generation)?;
            evaluations += record.candidates.len() as u64;

            if self.config.clear_session_every > 0
                && generation % self.config.clear_session_every == 0
            {
                info!("Resetting trainer backend");
                trainer.reset_backend_session()?;
                session_resets += 1;
            }

            let ranked = rank(&record.candidates);
            self.population = ranked.iter().map(|c| c.genome.clone()).collect();
            for path in &self.population {
                trainer.increment_training_counter(path);
            }

            let leader = ranked.first().ok_or(SearchError::EmptyPopulation)?;
            if best.as_ref().is_none_or(|b| leader.fitness > b.fitness) {
                best = Some(leader.clone());
            }
            history.push(leader.fitness);

            callback(&SearchProgress {
                strategy: STRATEGY.to_string(),
                round: generation,
                total_rounds: generations,
                round_fitness: leader.fitness,
                round_best: leader.fitness,
                best_fitness: best.as_ref().map_or(leader.fitness, |b| b.fitness),
                evaluations,
            });
            rounds.push(record);

            if generation == generations {
                break;
            }

            self.population = self.next_generation(trainer, &ranked)?;
        }

        let best = best.ok_or(SearchError::EmptyPopulation)?;
        info!(
            "Generational search finished: best {} with fitness {:.5}",
            best.genome, best.fitness
        );

        Ok(SearchResult {
            best,
            history,
            rounds,
            stats: SearchStats {
                strategy: STRATEGY.to_string(),
                rounds: generations,
                total_evaluations: evaluations,
                session_resets,
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
            },
        })
    }

    /// Survivors followed by mutated offspring.
    fn next_generation<T: Trainer>(
        &mut self,
        trainer: &mut T,
        ranked: &[Candidate],
    ) -> Result<Vec<PathGenome>, SearchError> {
        let survivors = match self.config.selection {
            SelectionPolicy::Truncation => truncation_selection(ranked, self.config.keep_fraction)?,
            SelectionPolicy::Roulette => {
                roulette_selection(ranked, self.config.survivors(), &mut self.rng)?
            }
        };
        for c in ranked {
            let mark = if survivors.iter().any(|s| s.genome == c.genome) {
                "*"
            } else {
                ""
            };
            debug!("{:<50} {:<10.5}{mark}", c.genome.to_string(), c.fitness);
        }

        let parents: Vec<PathGenome> = survivors.into_iter().map(|c| c.genome).collect();
        let needed = ranked.len() - parents.len();

        let offspring = match self.config.crossover {
            CrossoverPolicy::Alternating => alternating_offspring(&parents, needed, &mut self.rng)?,
            CrossoverPolicy::Union => {
                let mut children = Vec::with_capacity(needed);
                while children.len() < needed {
                    children.extend(union_offspring(&parents, &mut self.rng)?);
                }
                children.truncate(needed);
                children
            }
        };
        if offspring.len() != needed {
            return Err(SearchError::OffspringCount {
                expected: needed,
                actual: offspring.len(),
            });
        }

        let max_modules = self.config.max_modules_per_layer;
        let mut next = parents;
        for child in &offspring {
            next.push(mutate(trainer, child, MutationRate::WidestLayer, max_modules)?);
        }
        Ok(next)
    }
}

/// Candidates sorted by descending fitness; equal fitness keeps evaluation order.
fn rank(candidates: &[Candidate]) -> Vec<Candidate> {
    let mut ranked = candidates.to_vec();
    ranked.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal));
    ranked
}

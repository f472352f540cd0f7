//! Survivor selection strategies.

use std::cmp::Ordering;

use log::trace;

use super::{SearchError, SearchRng};
use crate::schema::{Candidate, ConfigError};

/// Keep the top `keep_fraction` of a population sorted by descending fitness.
///
/// Returns a prefix of the input. Deterministic.
pub fn truncation_selection(
    population: &[Candidate],
    keep_fraction: f64,
) -> Result<Vec<Candidate>, SearchError> {
    if !(keep_fraction > 0.0 && keep_fraction <= 1.0) {
        return Err(ConfigError::InvalidKeepFraction(keep_fraction).into());
    }
    if let Some(position) = population
        .windows(2)
        .position(|pair| pair[0].fitness < pair[1].fitness)
    {
        return Err(SearchError::UnsortedPopulation(position + 1));
    }

    let keep = (keep_fraction * population.len() as f64).floor() as usize;
    if keep == 0 {
        return Err(ConfigError::NoSurvivors {
            population_size: population.len(),
            keep_fraction,
        }
        .into());
    }
    Ok(population[..keep].to_vec())
}

/// Fitness-proportionate draw of one index.
///
/// A threshold is drawn uniformly from `(0, Σfitness]` and each fitness is
/// subtracted in order; the first index where the running value reaches
/// zero or below is returned. Zero-fitness entries are never drawn while any
/// positive fitness exists. When every fitness is zero the index is uniform.
pub fn select_one_index(fitness: &[f64], rng: &mut SearchRng) -> Option<usize> {
    if fitness.is_empty() {
        return None;
    }
    let total: f64 = fitness.iter().sum();
    if total <= 0.0 {
        return Some(rng.index(fitness.len()));
    }

    let mut value = (1.0 - rng.unit()) * total;
    for (i, f) in fitness.iter().enumerate() {
        value -= f;
        if value <= 0.0 && *f > 0.0 {
            return Some(i);
        }
    }
    // Rounding can leave a tiny positive remainder.
    fitness.iter().rposition(|&f| f > 0.0)
}

/// Roulette selection with elitism.
///
/// The fittest candidate always survives; the remaining
/// `survivors_target - 1` are drawn by [`select_one_index`] without
/// replacement. Survivors are returned fittest first, then in draw order.
pub fn roulette_selection(
    population: &[Candidate],
    survivors_target: usize,
    rng: &mut SearchRng,
) -> Result<Vec<Candidate>, SearchError> {
    if survivors_target == 0 || survivors_target > population.len() {
        return Err(ConfigError::InvalidSurvivorTarget {
            target: survivors_target,
            population_size: population.len(),
        }
        .into());
    }
    if let Some((index, c)) = population
        .iter()
        .enumerate()
        .find(|(_, c)| !(c.fitness.is_finite() && c.fitness >= 0.0))
    {
        return Err(SearchError::InvalidFitness {
            index,
            fitness: c.fitness,
        });
    }

    let mut pool = population.to_vec();
    pool.sort_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(Ordering::Equal));

    let mut survivors = Vec::with_capacity(survivors_target);
    if let Some(elite) = pool.pop() {
        survivors.push(elite);
    }

    while survivors.len() < survivors_target {
        let fitness: Vec<f64> = pool.iter().map(|c| c.fitness).collect();
        let Some(i) = select_one_index(&fitness, rng) else {
            break;
        };
        trace!("roulette drew {} (fitness {:.4})", pool[i].genome, pool[i].fitness);
        survivors.push(pool.remove(i));
    }

    if survivors.len() != survivors_target {
        return Err(SearchError::SurvivorCount {
            expected: survivors_target,
            actual: survivors.len(),
        });
    }
    Ok(survivors)
}

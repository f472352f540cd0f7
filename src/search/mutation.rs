//! Mutation delegate: the core picks the rate, the trainer mutates.

use log::trace;

use super::{SearchError, Trainer};
use crate::schema::PathGenome;

/// Per-module mutation probability policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MutationRate {
    /// `population_size / (depth × width)`.
    PopulationScaled { population_size: usize },
    /// `1 / (max_modules_per_layer × depth)`.
    ModuleBudget { max_modules_per_layer: usize },
    /// `1 / (N × depth)`, `N` the largest layer size of the mutated genome.
    WidestLayer,
}

impl MutationRate {
    /// Probability for mutating `genome`, clamped to `[0, 1]`.
    pub fn probability(&self, genome: &PathGenome, depth: usize, width: usize) -> f64 {
        let depth = depth.max(1) as f64;
        let p = match *self {
            Self::PopulationScaled { population_size } => {
                population_size as f64 / (depth * width.max(1) as f64)
            }
            Self::ModuleBudget {
                max_modules_per_layer,
            } => 1.0 / (max_modules_per_layer.max(1) as f64 * depth),
            Self::WidestLayer => 1.0 / (genome.max_layer_size().max(1) as f64 * depth),
        };
        p.clamp(0.0, 1.0)
    }
}

/// Mutate `genome` through the trainer and check the result's shape and
/// per-layer module limit.
pub fn mutate<T: Trainer>(
    trainer: &mut T,
    genome: &PathGenome,
    rate: MutationRate,
    max_modules_per_layer: usize,
) -> Result<PathGenome, SearchError> {
    let (depth, width) = (trainer.depth(), trainer.width());
    let probability = rate.probability(genome, depth, width);
    let mutated = trainer.mutate_path(genome, probability)?;
    mutated.validate(depth, width)?;
    mutated.check_module_limit(max_modules_per_layer)?;
    trace!("mutated {genome} -> {mutated} (p = {probability:.4})");
    Ok(mutated)
}

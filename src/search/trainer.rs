//! The trainer contract: the external service that turns genomes into
//! trained models and fitness values.
//!
//! The search core never trains anything itself. It asks a [`Trainer`] to
//! generate and mutate genomes, to build a [`Model`] per genome, and to keep
//! its module usage bookkeeping.

use std::fmt;

use log::{debug, info};

use super::SearchError;
use crate::schema::{Candidate, FitParams, FitResult, PathGenome, RoundRecord};

/// Trainer call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerOp {
    RandomPath,
    BuildModel,
    Fit,
    MutatePath,
    ResetSession,
}

impl fmt::Display for TrainerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RandomPath => "random_path",
            Self::BuildModel => "build_model_from_path",
            Self::Fit => "fit",
            Self::MutatePath => "mutate_path",
            Self::ResetSession => "reset_backend_session",
        };
        f.write_str(name)
    }
}

/// Failure reported by a trainer. Never retried by the search core.
#[derive(Debug, thiserror::Error)]
#[error("Trainer call `{op}` failed: {message}")]
pub struct TrainerError {
    pub op: TrainerOp,
    pub message: String,
}

impl TrainerError {
    pub fn new(op: TrainerOp, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

/// A trainable model built from one genome.
///
/// The training data is bound by the trainer when the model is built.
pub trait Model {
    /// Train for `params.epochs` epochs and report per-epoch metrics.
    fn fit(&mut self, params: &FitParams) -> Result<FitResult, TrainerError>;
}

/// Builds models from genomes and owns the module usage bookkeeping.
pub trait Trainer {
    type Model: Model;

    /// Number of layers in every genome.
    fn depth(&self) -> usize;

    /// Number of modules available per layer.
    fn width(&self) -> usize;

    /// A random genome with at most `max_modules_per_layer` modules per layer.
    fn random_path(&mut self, max_modules_per_layer: usize) -> Result<PathGenome, TrainerError>;

    /// Materialize a trainable model for `path`.
    fn build_model_from_path(&mut self, path: &PathGenome) -> Result<Self::Model, TrainerError>;

    /// A perturbed copy of `path`; each module changes with `mutation_prob`.
    fn mutate_path(
        &mut self,
        path: &PathGenome,
        mutation_prob: f64,
    ) -> Result<PathGenome, TrainerError>;

    /// Count one training of every module active in `path`.
    fn increment_training_counter(&mut self, path: &PathGenome);

    /// Current module usage table.
    fn training_counter(&self) -> &TrainingCounter;

    /// Report the module usage table.
    fn print_training_counter(&self) {
        info!("Training counter:\n{}", self.training_counter());
    }

    /// Release all backend resources held by earlier models.
    fn reset_backend_session(&mut self) -> Result<(), TrainerError>;
}

/// `depth × width` table of how often each module has been trained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingCounter {
    depth: usize,
    width: usize,
    counts: Vec<u64>,
}

impl TrainingCounter {
    pub fn new(depth: usize, width: usize) -> Self {
        Self {
            depth,
            width,
            counts: vec![0; depth * width],
        }
    }

    /// Count one training of every module in `path`. Out-of-range entries are skipped.
    pub fn increment(&mut self, path: &PathGenome) {
        for (layer, modules) in path.layers().iter().enumerate().take(self.depth) {
            for &module in modules.iter().filter(|&&m| m < self.width) {
                self.counts[layer * self.width + module] += 1;
            }
        }
    }

    /// Trainings of `module` in `layer`.
    pub fn get(&self, layer: usize, module: usize) -> u64 {
        if layer >= self.depth || module >= self.width {
            return 0;
        }
        self.counts[layer * self.width + module]
    }

    /// Counts of one layer, `None` past the last layer.
    pub fn row(&self, layer: usize) -> Option<&[u64]> {
        if layer >= self.depth {
            return None;
        }
        Some(&self.counts[layer * self.width..(layer + 1) * self.width])
    }

    /// Total module trainings.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

impl fmt::Display for TrainingCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for layer in 0..self.depth {
            write!(f, "L{layer:<3}")?;
            for count in self.row(layer).into_iter().flatten() {
                write!(f, "{count:>6}")?;
            }
            if layer + 1 < self.depth {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Build a model, fit it once and release it before returning.
pub(crate) fn evaluate<T: Trainer>(
    trainer: &mut T,
    genome: &PathGenome,
    params: &FitParams,
) -> Result<(f64, FitResult), SearchError> {
    let fit = {
        let mut model = trainer.build_model_from_path(genome)?;
        model.fit(params)?
    };

    let fitness = fit.first_val_acc().ok_or(SearchError::MissingFitness)?;
    if !(0.0..=1.0).contains(&fitness) {
        return Err(SearchError::FitnessOutOfRange(fitness));
    }
    Ok((fitness, fit))
}

/// Evaluate `genomes` in order, one scoped model at a time.
pub(crate) fn evaluate_round<T: Trainer>(
    trainer: &mut T,
    genomes: &[PathGenome],
    params: &FitParams,
    round: usize,
) -> Result<RoundRecord, SearchError> {
    let mut candidates = Vec::with_capacity(genomes.len());
    let mut fits = Vec::with_capacity(genomes.len());
    for genome in genomes {
        let (fitness, fit) = evaluate(trainer, genome, params)?;
        debug!("{:<35} fit: {fitness:.5}", genome.to_string());
        candidates.push(Candidate::new(genome.clone(), fitness));
        fits.push(fit);
    }
    Ok(RoundRecord {
        round,
        candidates,
        fits,
    })
}

/// Ask the trainer for a random genome and check its shape.
pub(crate) fn random_genome<T: Trainer>(
    trainer: &mut T,
    max_modules_per_layer: usize,
) -> Result<PathGenome, SearchError> {
    let genome = trainer.random_path(max_modules_per_layer)?;
    genome.validate(trainer.depth(), trainer.width())?;
    genome.check_module_limit(max_modules_per_layer)?;
    Ok(genome)
}

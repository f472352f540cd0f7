//! Synthetic reference trainer.
//!
//! Stands in for a real module-sharing network: every module carries a
//! hidden quality score and a model's validation accuracy is the mean
//! quality of its active modules plus Gaussian noise. Useful for exercising
//! the search strategies without a training backend.

use log::debug;
use rand::prelude::*;
use rand::seq::index;
use rand_distr::Normal;

use super::trainer::{Model, Trainer, TrainerError, TrainerOp, TrainingCounter};
use crate::schema::{FitParams, FitResult, Layer, PathGenome, SyntheticTrainerConfig};

/// Largest module index shift applied by a single mutation.
const MUTATION_SHIFT: i64 = 2;

/// Accuracy gained per additional training epoch.
const EPOCH_GAIN: f64 = 0.01;

/// Trainer backed by a hidden module quality table.
pub struct SyntheticTrainer {
    config: SyntheticTrainerConfig,
    rng: StdRng,
    quality: Vec<f64>,
    counter: TrainingCounter,
    sessions_reset: usize,
}

impl SyntheticTrainer {
    /// Create a trainer whose quality table and noise derive from `seed`.
    pub fn new(config: SyntheticTrainerConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let quality = (0..config.depth * config.width)
            .map(|_| rng.gen_range(0.2..=1.0))
            .collect();
        let counter = TrainingCounter::new(config.depth, config.width);
        Self {
            config,
            rng,
            quality,
            counter,
            sessions_reset: 0,
        }
    }

    /// Hidden quality of `module` in `layer`, `None` outside the network.
    pub fn quality(&self, layer: usize, module: usize) -> Option<f64> {
        if layer >= self.config.depth || module >= self.config.width {
            return None;
        }
        Some(self.quality[layer * self.config.width + module])
    }

    /// Noise-free accuracy a model built from `path` converges to.
    /// Modules outside the network contribute zero quality.
    pub fn expected_accuracy(&self, path: &PathGenome) -> f64 {
        if path.depth() == 0 {
            return 0.0;
        }
        let total: f64 = path
            .layers()
            .iter()
            .enumerate()
            .map(|(layer, modules)| {
                if modules.is_empty() {
                    0.0
                } else {
                    modules
                        .iter()
                        .map(|&m| self.quality(layer, m).unwrap_or(0.0))
                        .sum::<f64>()
                        / modules.len() as f64
                }
            })
            .sum();
        total / path.depth() as f64
    }

    /// Number of backend resets performed.
    pub fn sessions_reset(&self) -> usize {
        self.sessions_reset
    }
}

impl Trainer for SyntheticTrainer {
    type Model = SyntheticModel;

    fn depth(&self) -> usize {
        self.config.depth
    }

    fn width(&self) -> usize {
        self.config.width
    }

    fn random_path(&mut self, max_modules_per_layer: usize) -> Result<PathGenome, TrainerError> {
        let width = self.config.width;
        if max_modules_per_layer == 0 || width == 0 {
            return Err(TrainerError::new(
                TrainerOp::RandomPath,
                format!("cannot draw up to {max_modules_per_layer} of {width} modules"),
            ));
        }
        let max = max_modules_per_layer.min(width);
        let layers = (0..self.config.depth)
            .map(|_| {
                let count = self.rng.gen_range(1..=max);
                index::sample(&mut self.rng, width, count).into_iter().collect()
            })
            .collect();
        Ok(PathGenome::new(layers))
    }

    fn build_model_from_path(&mut self, path: &PathGenome) -> Result<SyntheticModel, TrainerError> {
        path.validate(self.config.depth, self.config.width)
            .map_err(|e| TrainerError::new(TrainerOp::BuildModel, e.to_string()))?;
        let noise = Normal::new(0.0, self.config.noise_std)
            .map_err(|e| TrainerError::new(TrainerOp::BuildModel, e.to_string()))?;
        Ok(SyntheticModel {
            accuracy: self.expected_accuracy(path),
            noise,
            rng: StdRng::seed_from_u64(self.rng.r#gen()),
        })
    }

    fn mutate_path(
        &mut self,
        path: &PathGenome,
        mutation_prob: f64,
    ) -> Result<PathGenome, TrainerError> {
        if !(0.0..=1.0).contains(&mutation_prob) {
            return Err(TrainerError::new(
                TrainerOp::MutatePath,
                format!("mutation probability {mutation_prob} is outside [0, 1]"),
            ));
        }
        let width = self.config.width as i64;
        let layers = path
            .layers()
            .iter()
            .map(|modules| {
                modules
                    .iter()
                    .map(|&m| {
                        if self.rng.gen_bool(mutation_prob) {
                            let shift = self.rng.gen_range(-MUTATION_SHIFT..=MUTATION_SHIFT);
                            (m as i64 + shift).rem_euclid(width) as usize
                        } else {
                            m
                        }
                    })
                    .collect::<Layer>()
            })
            .collect();
        Ok(PathGenome::new(layers))
    }

    fn increment_training_counter(&mut self, path: &PathGenome) {
        self.counter.increment(path);
    }

    fn training_counter(&self) -> &TrainingCounter {
        &self.counter
    }

    fn reset_backend_session(&mut self) -> Result<(), TrainerError> {
        self.sessions_reset += 1;
        debug!("synthetic backend reset #{}", self.sessions_reset);
        Ok(())
    }
}

/// Model produced by [`SyntheticTrainer`].
pub struct SyntheticModel {
    accuracy: f64,
    noise: Normal<f64>,
    rng: StdRng,
}

impl Model for SyntheticModel {
    fn fit(&mut self, params: &FitParams) -> Result<FitResult, TrainerError> {
        if params.epochs == 0 {
            return Err(TrainerError::new(TrainerOp::Fit, "no epochs requested"));
        }
        let mut result = FitResult::default();
        for epoch in 0..params.epochs {
            let clean = self.accuracy + EPOCH_GAIN * epoch as f64;
            let acc = (clean + self.noise.sample(&mut self.rng)).clamp(0.0, 1.0);
            result.val_acc.push(acc);
            result.loss.push(1.0 - acc);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trainer(noise_std: f64) -> SyntheticTrainer {
        SyntheticTrainer::new(
            SyntheticTrainerConfig {
                depth: 3,
                width: 6,
                noise_std,
            },
            42,
        )
    }

    #[test]
    fn test_random_path_shape() {
        let mut t = trainer(0.0);
        for _ in 0..100 {
            let path = t.random_path(3).unwrap();
            assert!(path.validate(3, 6).is_ok());
            assert!(path.check_module_limit(3).is_ok());
            assert!(path.layers().iter().all(|l| !l.is_empty()));
        }
    }

    #[test]
    fn test_mutation_preserves_shape() {
        let mut t = trainer(0.0);
        let path = t.random_path(3).unwrap();
        let mutated = t.mutate_path(&path, 1.0).unwrap();
        assert!(mutated.validate(3, 6).is_ok());
        assert_eq!(t.mutate_path(&path, 0.0).unwrap(), path);
        assert!(t.mutate_path(&path, 1.5).is_err());
    }

    #[test]
    fn test_noise_free_fit_matches_expectation() {
        let mut t = trainer(0.0);
        let path = PathGenome::from_indices([vec![0, 1], vec![2], vec![5]]);
        let expected = t.expected_accuracy(&path);
        let mut model = t.build_model_from_path(&path).unwrap();
        let fit = model.fit(&FitParams::default()).unwrap();
        assert_eq!(fit.val_acc.len(), 1);
        assert!((fit.val_acc[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_quality_bounds() {
        let t = trainer(0.0);
        let q = t.quality(2, 5).unwrap();
        assert!((0.2..=1.0).contains(&q));
        assert_eq!(t.quality(3, 0), None);
        assert_eq!(t.quality(0, 6), None);
        let outside = PathGenome::from_indices([vec![9], vec![9], vec![9]]);
        assert_eq!(t.expected_accuracy(&outside), 0.0);
    }

    #[test]
    fn test_build_rejects_bad_shape() {
        let mut t = trainer(0.0);
        let err = t
            .build_model_from_path(&PathGenome::from_indices([vec![9]]))
            .err()
            .unwrap();
        assert_eq!(err.op, TrainerOp::BuildModel);
    }

    #[test]
    fn test_counter_and_resets() {
        let mut t = trainer(0.01);
        let path = PathGenome::from_indices([vec![0], vec![1], vec![2]]);
        t.increment_training_counter(&path);
        assert_eq!(t.training_counter().total(), 3);
        t.reset_backend_session().unwrap();
        assert_eq!(t.sessions_reset(), 1);
    }
}

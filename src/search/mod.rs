//! Search module - population-based architecture search over path genomes.
//!
//! # Overview
//!
//! The search system consists of:
//!
//! - **Trainer contract** (`trainer`): the external service that builds,
//!   trains and mutates genomes
//! - **Selection** (`selection`): truncation and roulette survivor selection
//! - **Crossover** (`crossover`): alternating and union recombination
//! - **Mutation** (`mutation`): mutation rate policies delegated to the trainer
//! - **Orchestrators**: pairwise tournament, serial champion/challenger and
//!   generational evolutionary search
//!
//! # Example
//!
//! ```rust,no_run
//! use path_search::schema::{SearchAlgorithm, SearchConfig, TournamentConfig};
//! use path_search::search::{PathSearch, SyntheticTrainer};
//!
//! let config = SearchConfig {
//!     algorithm: SearchAlgorithm::Tournament(TournamentConfig::default()),
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//! let mut trainer = SyntheticTrainer::new(config.trainer.clone(), 42);
//!
//! let result = PathSearch::new(config)
//!     .run_with_callback(&mut trainer, |progress| {
//!         println!("Round {}: {:.3}", progress.round, progress.round_fitness);
//!     })
//!     .expect("search failed");
//! println!("Best path: {} ({:.3})", result.best.genome, result.best.fitness);
//! ```

mod crossover;
mod generational;
mod mutation;
mod rng;
mod selection;
mod serial;
mod synthetic;
mod tournament;
mod trainer;

pub use crossover::{alternating_crossover, alternating_offspring, union_crossover, union_offspring};
pub use generational::GenerationalSearch;
pub use mutation::{MutationRate, mutate};
pub use rng::SearchRng;
pub use selection::{roulette_selection, select_one_index, truncation_selection};
pub use serial::SerialTournamentSearch;
pub use synthetic::{SyntheticModel, SyntheticTrainer};
pub use tournament::TournamentSearch;
pub use trainer::{Model, Trainer, TrainerError, TrainerOp, TrainingCounter};

use crate::schema::{
    ConfigError, SearchAlgorithm, SearchConfig, SearchProgress, SearchResult, ShapeError,
};

/// Error type for search runs.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid genome: {0}")]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Trainer(#[from] TrainerError),

    #[error("Selection kept {actual} genomes, expected {expected}")]
    SurvivorCount { expected: usize, actual: usize },

    #[error("Crossover produced {actual} children, expected {expected}")]
    OffspringCount { expected: usize, actual: usize },

    #[error("Population is not sorted by descending fitness at position {0}")]
    UnsortedPopulation(usize),

    #[error("Invalid fitness {fitness} at position {index}")]
    InvalidFitness { index: usize, fitness: f64 },

    #[error("Fitness {0} is outside [0, 1]")]
    FitnessOutOfRange(f64),

    #[error("Model fit reported no validation accuracy")]
    MissingFitness,

    #[error("Cannot draw parents from an empty population")]
    EmptyPopulation,
}

/// Runs whichever strategy a [`SearchConfig`] selects.
pub struct PathSearch {
    config: SearchConfig,
}

impl PathSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run the configured search (blocking).
    pub fn run<T: Trainer>(&self, trainer: &mut T) -> Result<SearchResult, SearchError> {
        self.run_with_callback(trainer, |_| {})
    }

    /// Run the configured search with a per-round progress callback.
    pub fn run_with_callback<T, F>(
        &self,
        trainer: &mut T,
        callback: F,
    ) -> Result<SearchResult, SearchError>
    where
        T: Trainer,
        F: FnMut(&SearchProgress),
    {
        let rng = SearchRng::from_seed(self.config.random_seed);
        let fit = self.config.fit;

        match &self.config.algorithm {
            SearchAlgorithm::Tournament(config) => {
                TournamentSearch::new(config.clone(), fit, rng).run_with_callback(trainer, callback)
            }
            SearchAlgorithm::SerialTournament(config) => {
                SerialTournamentSearch::new(config.clone(), fit)
                    .run_with_callback(trainer, callback)
            }
            SearchAlgorithm::Generational(config) => {
                GenerationalSearch::new(config.clone(), fit, rng)
                    .run_with_callback(trainer, callback)
            }
        }
    }
}

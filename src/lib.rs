//! Path Search - Evolutionary architecture search over module-sharing networks.
//!
//! A network is a stack of layers, each holding a fixed set of candidate
//! modules. A genome (a *path*) picks which modules are active in every
//! layer. This crate evolves paths with three strategies and leaves model
//! building and training to an external [`search::Trainer`].
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Genome, configuration and result types
//! - `search`: Trainer contract, genetic operators and search orchestrators
//!
//! # Example
//!
//! ```rust,no_run
//! use path_search::{
//!     schema::{GenerationalConfig, SearchAlgorithm, SearchConfig},
//!     search::{PathSearch, SyntheticTrainer},
//! };
//!
//! let config = SearchConfig {
//!     algorithm: SearchAlgorithm::Generational(GenerationalConfig::default()),
//!     random_seed: Some(7),
//!     ..Default::default()
//! };
//! let mut trainer = SyntheticTrainer::new(config.trainer.clone(), 7);
//!
//! let result = PathSearch::new(config).run(&mut trainer).unwrap();
//! println!("Best path {} scored {:.3}", result.best.genome, result.best.fitness);
//! ```

pub mod schema;
pub mod search;

// Re-export commonly used types
pub use schema::{Candidate, PathGenome, SearchAlgorithm, SearchConfig, SearchResult};
pub use search::{PathSearch, SearchError, Trainer};

//! Configuration types for path search runs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration for a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search strategy and its settings.
    pub algorithm: SearchAlgorithm,
    /// Training parameters passed to every model fit.
    #[serde(default)]
    pub fit: FitParams,
    /// Settings for the built-in synthetic trainer (used by the CLI).
    #[serde(default)]
    pub trainer: SyntheticTrainerConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            algorithm: SearchAlgorithm::default(),
            fit: FitParams::default(),
            trainer: SyntheticTrainerConfig::default(),
            random_seed: None,
        }
    }
}

impl SearchConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Validate the configuration against the synthetic trainer's dimensions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trainer.validate()?;
        self.fit.validate()?;
        self.algorithm
            .validate(self.trainer.depth, self.trainer.width)
    }
}

/// Search strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SearchAlgorithm {
    /// Pairwise tournament: losers are overwritten by mutated winners.
    Tournament(TournamentConfig),
    /// Serial champion/challenger.
    SerialTournament(SerialTournamentConfig),
    /// Generational evolutionary algorithm.
    Generational(GenerationalConfig),
}

impl Default for SearchAlgorithm {
    fn default() -> Self {
        Self::Generational(GenerationalConfig::default())
    }
}

impl SearchAlgorithm {
    /// Short strategy name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tournament(_) => "tournament",
            Self::SerialTournament(_) => "serial-tournament",
            Self::Generational(_) => "generational",
        }
    }

    /// Validate the strategy settings for a trainer of the given shape.
    pub fn validate(&self, depth: usize, width: usize) -> Result<(), ConfigError> {
        match self {
            Self::Tournament(config) => config.validate(depth, width),
            Self::SerialTournament(config) => config.validate(depth, width),
            Self::Generational(config) => config.validate(depth, width),
        }
    }
}

/// Which genome a tournament run reports as its result.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum BestPolicy {
    /// Highest fitness of the final season only.
    #[default]
    FinalRound,
    /// Highest fitness seen in any season.
    BestEver,
}

/// Pairwise tournament configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Number of genomes evaluated per season.
    #[serde(default = "default_tournament_population")]
    pub population_size: usize,
    /// Number of seasons.
    #[serde(default = "default_seasons")]
    pub seasons: usize,
    /// Module limit for randomly generated paths.
    #[serde(default = "default_tournament_modules")]
    pub max_modules_per_layer: usize,
    /// Result reporting policy.
    #[serde(default)]
    pub best: BestPolicy,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            population_size: default_tournament_population(),
            seasons: default_seasons(),
            max_modules_per_layer: default_tournament_modules(),
            best: BestPolicy::default(),
        }
    }
}

impl TournamentConfig {
    pub fn validate(&self, depth: usize, width: usize) -> Result<(), ConfigError> {
        check_population(self.population_size)?;
        check_rounds(self.seasons)?;
        check_module_limit(self.max_modules_per_layer, depth, width)
    }
}

fn default_tournament_population() -> usize {
    10
}
fn default_seasons() -> usize {
    5
}
fn default_tournament_modules() -> usize {
    3
}

/// Serial champion/challenger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialTournamentConfig {
    /// Number of champion/challenger rounds.
    #[serde(default = "default_serial_rounds")]
    pub rounds: usize,
    /// Module limit for randomly generated paths.
    #[serde(default = "default_serial_modules")]
    pub max_modules_per_layer: usize,
}

impl Default for SerialTournamentConfig {
    fn default() -> Self {
        Self {
            rounds: default_serial_rounds(),
            max_modules_per_layer: default_serial_modules(),
        }
    }
}

impl SerialTournamentConfig {
    pub fn validate(&self, depth: usize, width: usize) -> Result<(), ConfigError> {
        check_rounds(self.rounds)?;
        check_module_limit(self.max_modules_per_layer, depth, width)
    }
}

fn default_serial_rounds() -> usize {
    20
}
fn default_serial_modules() -> usize {
    3
}

/// How the generational search picks survivors.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Keep the top fraction of the sorted population.
    #[default]
    Truncation,
    /// Keep the fittest plus fitness-proportionate draws.
    Roulette,
}

/// How the generational search regenerates discarded genomes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum CrossoverPolicy {
    /// Layer-wise parent alternation over randomly drawn parent pairs.
    #[default]
    Alternating,
    /// Overlap-preserving, size-averaging combination of neighbouring survivors.
    Union,
}

/// Generational evolutionary algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationalConfig {
    /// Number of genomes per generation. Must be even.
    #[serde(default = "default_generational_population")]
    pub population_size: usize,
    /// Number of generations.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Reset the trainer backend every N generations (0 disables).
    #[serde(default = "default_clear_session_every")]
    pub clear_session_every: usize,
    /// Module limit for randomly generated paths.
    #[serde(default = "default_generational_modules")]
    pub max_modules_per_layer: usize,
    /// Fraction of each generation that survives selection.
    #[serde(default = "default_keep_fraction")]
    pub keep_fraction: f64,
    /// Survivor selection.
    #[serde(default)]
    pub selection: SelectionPolicy,
    /// Offspring generation.
    #[serde(default)]
    pub crossover: CrossoverPolicy,
}

impl Default for GenerationalConfig {
    fn default() -> Self {
        Self {
            population_size: default_generational_population(),
            generations: default_generations(),
            clear_session_every: default_clear_session_every(),
            max_modules_per_layer: default_generational_modules(),
            keep_fraction: default_keep_fraction(),
            selection: SelectionPolicy::default(),
            crossover: CrossoverPolicy::default(),
        }
    }
}

impl GenerationalConfig {
    /// Number of genomes kept by selection each generation.
    pub fn survivors(&self) -> usize {
        (self.keep_fraction * self.population_size as f64).floor() as usize
    }

    pub fn validate(&self, depth: usize, width: usize) -> Result<(), ConfigError> {
        check_population(self.population_size)?;
        if self.population_size % 2 != 0 {
            return Err(ConfigError::OddPopulation(self.population_size));
        }
        check_rounds(self.generations)?;
        check_module_limit(self.max_modules_per_layer, depth, width)?;

        if !(self.keep_fraction > 0.0 && self.keep_fraction < 1.0) {
            return Err(ConfigError::InvalidKeepFraction(self.keep_fraction));
        }
        if self.survivors() == 0 {
            return Err(ConfigError::NoSurvivors {
                population_size: self.population_size,
                keep_fraction: self.keep_fraction,
            });
        }
        Ok(())
    }
}

fn default_generational_population() -> usize {
    10
}
fn default_generations() -> usize {
    10
}
fn default_clear_session_every() -> usize {
    10
}
fn default_generational_modules() -> usize {
    2
}
fn default_keep_fraction() -> f64 {
    0.5
}

/// Parameters for a single bounded training run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FitParams {
    /// Training epochs per evaluation.
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Fraction of the data held out for validation.
    #[serde(default = "default_validation_split")]
    pub validation_split: f64,
    /// Mini-batch size.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            validation_split: default_validation_split(),
            batch_size: default_batch_size(),
        }
    }
}

impl FitParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::InvalidFitParams(
                "epochs must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidFitParams(
                "batch size must be positive".to_string(),
            ));
        }
        if !(self.validation_split > 0.0 && self.validation_split < 1.0) {
            return Err(ConfigError::InvalidFitParams(format!(
                "validation split {} must be in (0, 1)",
                self.validation_split
            )));
        }
        Ok(())
    }
}

fn default_epochs() -> usize {
    1
}
fn default_validation_split() -> f64 {
    0.2
}
fn default_batch_size() -> usize {
    512
}

/// Settings for the synthetic reference trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticTrainerConfig {
    /// Number of layers in the backbone.
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Number of modules per layer.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Standard deviation of the evaluation noise.
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,
}

impl Default for SyntheticTrainerConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            width: default_width(),
            noise_std: default_noise_std(),
        }
    }
}

impl SyntheticTrainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 || self.width == 0 {
            return Err(ConfigError::InvalidDimensions {
                depth: self.depth,
                width: self.width,
            });
        }
        if !(self.noise_std >= 0.0 && self.noise_std.is_finite()) {
            return Err(ConfigError::InvalidNoise(self.noise_std));
        }
        Ok(())
    }
}

fn default_depth() -> usize {
    3
}
fn default_width() -> usize {
    10
}
fn default_noise_std() -> f64 {
    0.02
}

fn check_population(size: usize) -> Result<(), ConfigError> {
    if size < 2 {
        return Err(ConfigError::PopulationTooSmall(size));
    }
    Ok(())
}

fn check_rounds(rounds: usize) -> Result<(), ConfigError> {
    if rounds == 0 {
        return Err(ConfigError::NoRounds);
    }
    Ok(())
}

fn check_module_limit(max: usize, depth: usize, width: usize) -> Result<(), ConfigError> {
    if depth == 0 || width == 0 {
        return Err(ConfigError::InvalidDimensions { depth, width });
    }
    if max == 0 || max > width {
        return Err(ConfigError::InvalidModuleLimit { max, width });
    }
    Ok(())
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),
    #[error("Population size must be even, got {0}")]
    OddPopulation(usize),
    #[error("Number of rounds must be positive")]
    NoRounds,
    #[error("Depth and width must be non-zero (depth {depth}, width {width})")]
    InvalidDimensions { depth: usize, width: usize },
    #[error("Modules per layer must be in 1..={width}, got {max}")]
    InvalidModuleLimit { max: usize, width: usize },
    #[error("Keep fraction must be in (0, 1), got {0}")]
    InvalidKeepFraction(f64),
    #[error("Keep fraction {keep_fraction} leaves no survivors of {population_size}")]
    NoSurvivors {
        population_size: usize,
        keep_fraction: f64,
    },
    #[error("Survivor target {target} is outside 1..={population_size}")]
    InvalidSurvivorTarget {
        target: usize,
        population_size: usize,
    },
    #[error("Invalid fit parameters: {0}")]
    InvalidFitParams(String),
    #[error("Noise standard deviation must be finite and non-negative, got {0}")]
    InvalidNoise(f64),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

//! Path genomes: per-layer selections of active modules.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Active module indices of one layer.
pub type Layer = BTreeSet<usize>;

/// A candidate architecture: one set of active module indices per layer.
///
/// Genomes are immutable values. Operators never edit a genome in place;
/// they build a new one, so population slots never alias each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathGenome {
    layers: Vec<Layer>,
}

impl PathGenome {
    /// Create a genome from its layers.
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    /// Create a genome from per-layer index lists. Duplicates collapse.
    pub fn from_indices<I, L>(layers: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: IntoIterator<Item = usize>,
    {
        Self {
            layers: layers
                .into_iter()
                .map(|layer| layer.into_iter().collect())
                .collect(),
        }
    }

    /// Number of layers.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// All layers in order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// A single layer, if it exists.
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Size of the largest layer (0 for a genome with no modules).
    pub fn max_layer_size(&self) -> usize {
        self.layers.iter().map(Layer::len).max().unwrap_or(0)
    }

    /// Total number of active modules across all layers.
    pub fn module_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    /// Check the depth and module index bounds.
    pub fn validate(&self, depth: usize, width: usize) -> Result<(), ShapeError> {
        if self.layers.len() != depth {
            return Err(ShapeError::DepthMismatch {
                expected: depth,
                actual: self.layers.len(),
            });
        }
        for (layer, modules) in self.layers.iter().enumerate() {
            // Sets are ordered, so the last index is the largest.
            if let Some(&module) = modules.last()
                && module >= width
            {
                return Err(ShapeError::ModuleOutOfRange {
                    layer,
                    module,
                    width,
                });
            }
        }
        Ok(())
    }

    /// Check that no layer holds more than `max_modules_per_layer` modules.
    pub fn check_module_limit(&self, max_modules_per_layer: usize) -> Result<(), ShapeError> {
        match self
            .layers
            .iter()
            .enumerate()
            .find(|(_, modules)| modules.len() > max_modules_per_layer)
        {
            Some((layer, modules)) => Err(ShapeError::TooManyModules {
                layer,
                count: modules.len(),
                max: max_modules_per_layer,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for PathGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[")?;
            for (j, module) in layer.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{module}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}

/// An evaluated genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// The genome that was trained.
    pub genome: PathGenome,
    /// Validation accuracy after the bounded training run.
    pub fitness: f64,
}

impl Candidate {
    pub fn new(genome: PathGenome, fitness: f64) -> Self {
        Self { genome, fitness }
    }
}

/// Genome shape violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("Genome has {actual} layers, expected {expected}")]
    DepthMismatch { expected: usize, actual: usize },
    #[error("Layer {layer} references module {module}, width is {width}")]
    ModuleOutOfRange {
        layer: usize,
        module: usize,
        width: usize,
    },
    #[error("Layer {layer} has {count} modules, limit is {max}")]
    TooManyModules {
        layer: usize,
        count: usize,
        max: usize,
    },
}

//! Crossover operators combining parent genomes into offspring.

use log::trace;

use super::{SearchError, SearchRng};
use crate::schema::{Layer, PathGenome, ShapeError};

/// Layer-wise alternation: even layers from `mother`, odd layers from `father`.
///
/// Each child layer is an exact copy of one parent's layer.
pub fn alternating_crossover(
    father: &PathGenome,
    mother: &PathGenome,
) -> Result<PathGenome, SearchError> {
    check_depths(father, mother)?;
    let layers = father
        .layers()
        .iter()
        .zip(mother.layers())
        .enumerate()
        .map(|(i, (f, m))| if i % 2 == 0 { m.clone() } else { f.clone() })
        .collect();
    Ok(PathGenome::new(layers))
}

/// Produce `count` children by [`alternating_crossover`] over parents drawn
/// independently, with replacement, from `selected`.
pub fn alternating_offspring(
    selected: &[PathGenome],
    count: usize,
    rng: &mut SearchRng,
) -> Result<Vec<PathGenome>, SearchError> {
    let mut children = Vec::with_capacity(count);
    while children.len() < count {
        let father = rng.choose(selected).ok_or(SearchError::EmptyPopulation)?;
        let mother = rng.choose(selected).ok_or(SearchError::EmptyPopulation)?;
        children.push(alternating_crossover(father, mother)?);
    }

    if children.len() != count {
        return Err(SearchError::OffspringCount {
            expected: count,
            actual: children.len(),
        });
    }
    Ok(children)
}

/// Overlap-preserving, size-averaging combination of two genomes.
///
/// Per layer the child keeps every module both parents share, then grows to
/// the mean of the parents' layer sizes (a `.5` mean is rounded up or down
/// by a fair coin) with modules drawn uniformly from the parents' union.
/// The target size never exceeds the union size.
pub fn union_crossover(
    a: &PathGenome,
    b: &PathGenome,
    rng: &mut SearchRng,
) -> Result<PathGenome, SearchError> {
    check_depths(a, b)?;
    let layers = a
        .layers()
        .iter()
        .zip(b.layers())
        .map(|(la, lb)| combine_layer(la, lb, rng))
        .collect();
    Ok(PathGenome::new(layers))
}

fn combine_layer(a: &Layer, b: &Layer, rng: &mut SearchRng) -> Layer {
    let mut layer: Layer = a.intersection(b).copied().collect();
    let union: Vec<usize> = a.union(b).copied().collect();

    let sum = a.len() + b.len();
    let mut target = sum / 2;
    if sum % 2 == 1 && rng.coin() {
        target += 1;
    }
    let target = target.min(union.len());

    while layer.len() < target {
        layer.insert(union[rng.index(union.len())]);
    }
    layer
}

/// Regenerate a population of the same size by [`union_crossover`].
///
/// Genome `i` is paired with `i + 1` for every even `i`, then remaining
/// children pair genome `i` with the genome half a population away
/// (wrapping) until the offspring count matches the input size.
pub fn union_offspring(
    population: &[PathGenome],
    rng: &mut SearchRng,
) -> Result<Vec<PathGenome>, SearchError> {
    let size = population.len();
    let mut children = Vec::with_capacity(size);

    for father in (0..size.saturating_sub(1)).step_by(2) {
        children.push(union_crossover(
            &population[father],
            &population[father + 1],
            rng,
        )?);
    }

    for father in 0..size {
        if children.len() == size {
            break;
        }
        let mother = (father + size / 2) % size;
        trace!("union pairing {father} with {mother}");
        children.push(union_crossover(
            &population[father],
            &population[mother],
            rng,
        )?);
    }

    if children.len() != size {
        return Err(SearchError::OffspringCount {
            expected: size,
            actual: children.len(),
        });
    }
    Ok(children)
}

fn check_depths(a: &PathGenome, b: &PathGenome) -> Result<(), ShapeError> {
    if a.depth() != b.depth() {
        return Err(ShapeError::DepthMismatch {
            expected: a.depth(),
            actual: b.depth(),
        });
    }
    Ok(())
}

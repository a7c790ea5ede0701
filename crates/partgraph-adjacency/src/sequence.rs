//! Randomized topological ordering of a directed adjacency matrix.

use nalgebra::DMatrix;
use rand::Rng;

use crate::artifact::{Artifact, EdgeRule};
use crate::error::IntegrityError;
use crate::store::PartId;

/// Chooses among the parts that are ready to be placed.
pub trait Tiebreak {
    /// Pick one of `ready` (original indices, ascending, never empty) and
    /// return its position in the slice.
    fn choose(&mut self, ready: &[usize]) -> usize;
}

/// Uniformly random choice.
#[derive(Debug, Clone)]
pub struct Uniform<R>(pub R);

impl<R: Rng> Tiebreak for Uniform<R> {
    fn choose(&mut self, ready: &[usize]) -> usize {
        self.0.gen_range(0..ready.len())
    }
}

/// Always the lowest ready index.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lowest;

impl Tiebreak for Lowest {
    fn choose(&mut self, _ready: &[usize]) -> usize {
        0
    }
}

/// Topological order of the graph defined by `directional` under `rule`.
///
/// Repeatedly places a part with no incoming edge among the remaining parts,
/// picked by `tiebreak`, and removes it from the working matrix. A non-square
/// or empty matrix yields `[0]`. A cycle stalls the loop and is reported as
/// [`IntegrityError::Stalled`].
pub fn sequence<T: Tiebreak + ?Sized>(
    directional: &DMatrix<f64>,
    rule: &EdgeRule,
    tiebreak: &mut T,
) -> Result<Vec<usize>, IntegrityError> {
    let (rows, cols) = directional.shape();
    if rows != cols || rows == 0 {
        return Ok(vec![0]);
    }

    let mut working = rule.binarize(directional);
    let mut live: Vec<usize> = (0..rows).collect();
    let mut order = Vec::with_capacity(rows);

    while !live.is_empty() {
        let ready: Vec<usize> = (0..live.len())
            .filter(|&k| working.column(k).sum() == 0.0)
            .collect();
        if ready.is_empty() {
            return Err(IntegrityError::Stalled {
                placed: order.len(),
                remaining: live.len(),
            });
        }

        let ids: Vec<usize> = ready.iter().map(|&k| live[k]).collect();
        let pick = tiebreak.choose(&ids).min(ready.len() - 1);
        let k = ready[pick];

        order.push(live.remove(k));
        working = working.remove_row(k).remove_column(k);
    }
    Ok(order)
}

/// Generation order of an artifact as global part ids.
pub fn sequence_parts<T: Tiebreak + ?Sized>(
    artifact: &Artifact,
    rule: &EdgeRule,
    tiebreak: &mut T,
) -> Result<Vec<PartId>, IntegrityError> {
    let order = sequence(artifact.directional(), rule, tiebreak)?;
    Ok(order
        .into_iter()
        .filter_map(|i| artifact.mapping().part(i))
        .collect())
}

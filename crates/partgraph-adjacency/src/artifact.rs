//! Per-instance graph artifacts: id mapping, distance and directional matrices.

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{DuplicatePart, ShapeMismatch};
use crate::store::PartId;

/// Directional-matrix sentinel meaning "no edge".
pub const NO_EDGE: f64 = 1.0;

/// Bijection between an instance's leaf part ids and matrix indices `0..N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PartId>", into = "Vec<PartId>")]
pub struct IdMapping {
    parts: Vec<PartId>,
    index: HashMap<PartId, usize>,
}

impl IdMapping {
    /// Assign indices in the given order. Fails on a repeated id.
    pub fn new(parts: Vec<PartId>) -> Result<Self, DuplicatePart> {
        let mut index = HashMap::with_capacity(parts.len());
        for (i, &part) in parts.iter().enumerate() {
            if index.insert(part, i).is_some() {
                return Err(DuplicatePart(part));
            }
        }
        Ok(Self { parts, index })
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True if the mapping has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Part id at a matrix index.
    pub fn part(&self, index: usize) -> Option<PartId> {
        self.parts.get(index).copied()
    }

    /// Matrix index of a part id.
    pub fn index_of(&self, part: PartId) -> Option<usize> {
        self.index.get(&part).copied()
    }

    /// Part ids in index order.
    pub fn parts(&self) -> &[PartId] {
        &self.parts
    }
}

impl TryFrom<Vec<PartId>> for IdMapping {
    type Error = DuplicatePart;

    fn try_from(parts: Vec<PartId>) -> Result<Self, Self::Error> {
        Self::new(parts)
    }
}

impl From<IdMapping> for Vec<PartId> {
    fn from(mapping: IdMapping) -> Self {
        mapping.parts
    }
}

/// Which directional entries count as edges.
///
/// An entry `x -> y` is an edge iff it is below [`NO_EDGE`] and, when a
/// threshold is set, at most the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeRule {
    /// Maximum separation still counted as touching. `None` counts every
    /// measured entry.
    pub threshold: Option<f64>,
}

impl EdgeRule {
    /// Every non-sentinel entry is an edge.
    pub fn any() -> Self {
        Self { threshold: None }
    }

    /// Only entries at most `threshold` are edges.
    pub fn within(threshold: f64) -> Self {
        Self {
            threshold: Some(threshold),
        }
    }

    /// Whether a directional entry is an edge.
    pub fn is_edge(&self, value: f64) -> bool {
        value < NO_EDGE && self.threshold.map_or(true, |t| value <= t)
    }

    /// 0/1 adjacency matrix of a directional matrix. The diagonal is never an edge.
    pub fn binarize(&self, directional: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(directional.nrows(), directional.ncols(), |i, j| {
            if i != j && self.is_edge(directional[(i, j)]) {
                1.0
            } else {
                0.0
            }
        })
    }
}

/// Cached graph of one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    mapping: IdMapping,
    distances: DMatrix<f64>,
    directional: DMatrix<f64>,
}

impl Artifact {
    /// Assemble an artifact, checking that both matrices are `N x N` for the mapping's `N`.
    pub fn new(
        mapping: IdMapping,
        distances: DMatrix<f64>,
        directional: DMatrix<f64>,
    ) -> Result<Self, ShapeMismatch> {
        let n = mapping.len();
        for (matrix, m) in [("distance", &distances), ("directional", &directional)] {
            if m.shape() != (n, n) {
                return Err(ShapeMismatch {
                    matrix,
                    rows: m.nrows(),
                    cols: m.ncols(),
                    expected: n,
                });
            }
        }
        Ok(Self {
            mapping,
            distances,
            directional,
        })
    }

    /// Part id mapping.
    pub fn mapping(&self) -> &IdMapping {
        &self.mapping
    }

    /// Symmetric pairwise distances, zero diagonal.
    pub fn distances(&self) -> &DMatrix<f64> {
        &self.distances
    }

    /// Size-directed distances with [`NO_EDGE`] sentinels.
    pub fn directional(&self) -> &DMatrix<f64> {
        &self.directional
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// True if the instance has no parts.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Boolean adjacency under `rule`.
    pub fn adjacency(&self, rule: &EdgeRule) -> DMatrix<bool> {
        let n = self.len();
        DMatrix::from_fn(n, n, |i, j| i != j && rule.is_edge(self.directional[(i, j)]))
    }

    /// Directed edges `(from, to)` as matrix indices, row-major.
    pub fn edges(&self, rule: &EdgeRule) -> Vec<(usize, usize)> {
        let n = self.len();
        (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .filter(|&(i, j)| i != j && rule.is_edge(self.directional[(i, j)]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_part() -> Artifact {
        Artifact::new(
            IdMapping::new(vec![40, 41]).unwrap(),
            DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.0, 0.0]),
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]),
        )
        .unwrap()
    }

    #[test]
    fn test_mapping_is_bijective() {
        let m = IdMapping::new(vec![17, 3, 99]).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.part(1), Some(3));
        assert_eq!(m.index_of(99), Some(2));
        assert_eq!(m.index_of(5), None);
        assert_eq!(IdMapping::new(vec![1, 2, 1]), Err(DuplicatePart(1)));
    }

    #[test]
    fn test_edge_rule_threshold() {
        assert!(EdgeRule::any().is_edge(0.0));
        assert!(EdgeRule::any().is_edge(0.7));
        assert!(!EdgeRule::any().is_edge(NO_EDGE));
        assert!(!EdgeRule::any().is_edge(8.0));
        assert!(EdgeRule::within(0.0).is_edge(0.0));
        assert!(!EdgeRule::within(0.0).is_edge(0.2));
        assert!(EdgeRule::within(0.5).is_edge(0.2));
    }

    #[test]
    fn test_adjacency_and_edges() {
        let a = two_part();
        assert_eq!(a.edges(&EdgeRule::any()), vec![(0, 1)]);
        let adj = a.adjacency(&EdgeRule::any());
        assert!(adj[(0, 1)]);
        assert!(!adj[(1, 0)]);
        assert!(!adj[(0, 0)]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = Artifact::new(
            IdMapping::new(vec![1, 2, 3]).unwrap(),
            DMatrix::zeros(3, 3),
            DMatrix::zeros(2, 3),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ShapeMismatch {
                matrix: "directional",
                rows: 2,
                cols: 3,
                expected: 3,
            }
        );
        assert_eq!(err.to_string(), "directional matrix is 2x3, expected 3x3");

        let err = Artifact::new(
            IdMapping::new(vec![1, 2]).unwrap(),
            DMatrix::zeros(2, 1),
            DMatrix::zeros(2, 2),
        )
        .unwrap_err();
        assert_eq!(err.matrix, "distance");
    }
}

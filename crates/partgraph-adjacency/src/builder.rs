//! Per-instance adjacency graph construction.

use nalgebra::DMatrix;
use partgraph_bbox::{fit_with_method, BoundingBox, FitSettings};
use partgraph_gjk::{distance_with, DistanceError, GjkSettings};
use partgraph_math::Tolerance;
use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, EdgeRule, IdMapping, NO_EDGE};
use crate::error::{GraphBuildError, PipelineError, SettingsError, StoreError};
use crate::sequence::{sequence_parts, Tiebreak};
use crate::store::{ArtifactStore, InstanceId, PartId, PartStore};

/// Distance substituted for a pair whose distance query failed.
pub const FAILURE_DISTANCE: f64 = 10.0;

/// Graph construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjacencySettings {
    /// Distance written for pairs whose distance query fails.
    pub failure_distance: f64,
    /// Largest directional entry still treated as an edge; `None` for any.
    pub edge_threshold: Option<f64>,
    /// Serve cached artifacts instead of rebuilding.
    pub reuse_cached: bool,
    /// Box fitting parameters.
    pub fit: FitSettings,
    /// Distance query parameters.
    pub gjk: GjkSettings,
}

impl Default for AdjacencySettings {
    fn default() -> Self {
        Self {
            failure_distance: FAILURE_DISTANCE,
            edge_threshold: None,
            reuse_cached: true,
            fit: FitSettings::default(),
            gjk: GjkSettings::default(),
        }
    }
}

impl AdjacencySettings {
    /// Validate settings, including the nested fitter and distance settings.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.failure_distance.is_finite() && self.failure_distance >= 0.0) {
            return Err(SettingsError::Invalid(
                "failure_distance must be finite and non-negative".into(),
            ));
        }
        if let Some(t) = self.edge_threshold {
            if !(t.is_finite() && t >= 0.0) {
                return Err(SettingsError::Invalid(
                    "edge_threshold must be finite and non-negative".into(),
                ));
            }
        }
        self.fit.validate()?;
        self.gjk.validate()?;
        Ok(())
    }

    /// Edge rule for the configured threshold.
    pub fn edge_rule(&self) -> EdgeRule {
        EdgeRule {
            threshold: self.edge_threshold,
        }
    }
}

/// A pair whose distance query failed and was substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct PairFailure {
    /// Instance being built.
    pub instance: InstanceId,
    /// Local indices of the pair.
    pub indices: (usize, usize),
    /// Global ids of the pair.
    pub parts: (PartId, PartId),
    /// The distance failure.
    pub error: DistanceError,
}

/// A built or reused artifact with its build diagnostics.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The artifact.
    pub artifact: Artifact,
    /// Pairs substituted with the failure distance (empty when reused).
    pub failures: Vec<PairFailure>,
    /// True if the artifact came from the cache.
    pub reused: bool,
}

/// Builds adjacency artifacts from a part store into an artifact store.
pub struct AdjacencyBuilder<P, A> {
    parts: P,
    artifacts: A,
    settings: AdjacencySettings,
}

impl<P: PartStore, A: ArtifactStore> AdjacencyBuilder<P, A> {
    /// Create a builder. Fails if the settings are invalid.
    pub fn new(parts: P, artifacts: A, settings: AdjacencySettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            parts,
            artifacts,
            settings,
        })
    }

    /// Builder settings.
    pub fn settings(&self) -> &AdjacencySettings {
        &self.settings
    }

    /// The part store.
    pub fn parts(&self) -> &P {
        &self.parts
    }

    /// The artifact store.
    pub fn artifacts(&self) -> &A {
        &self.artifacts
    }

    /// Cached box of a part, fitting and caching it on a miss.
    pub fn bounding_box(&self, instance: InstanceId, part: PartId) -> Result<BoundingBox, GraphBuildError> {
        let cached = match self.artifacts.load_box(part) {
            Ok(cached) => cached,
            Err(StoreError::Corrupt(reason)) => {
                log::warn!("part {part}: cached box unreadable ({reason}), refitting");
                None
            }
            Err(source) => return Err(GraphBuildError::Persist { instance, source }),
        };

        match cached {
            Some(bbox) if bbox.is_consistent(&Tolerance::DEFAULT) => {
                log::debug!("part {part}: box cache hit");
                return Ok(bbox);
            }
            Some(_) => {
                log::warn!("part {part}: cached box corners do not match its frame, refitting");
            }
            None => {}
        }

        log::debug!("part {part}: box cache miss, fitting");
        let mesh = self
            .parts
            .mesh(part)
            .map_err(|source| GraphBuildError::Mesh { instance, part, source })?;
        let (bbox, method) = fit_with_method(&mesh, &self.settings.fit)
            .map_err(|source| GraphBuildError::Geometry { instance, part, source })?;
        log::debug!("part {part}: fit {method:?} box, volume {:.6}", bbox.volume());

        self.artifacts
            .store_box(part, &bbox)
            .map_err(|source| GraphBuildError::Persist { instance, source })?;
        Ok(bbox)
    }

    /// Build and persist the artifact of an instance.
    pub fn build(&self, instance: InstanceId) -> Result<Artifact, GraphBuildError> {
        self.build_detailed(instance).map(|outcome| outcome.artifact)
    }

    /// Build and persist the artifact of an instance, reporting substituted pairs.
    pub fn build_detailed(&self, instance: InstanceId) -> Result<BuildOutcome, GraphBuildError> {
        let leaves = self
            .parts
            .leaf_parts(instance)
            .map_err(|source| GraphBuildError::LeafParts { instance, source })?;
        let mapping = IdMapping::new(leaves).map_err(|source| GraphBuildError::Mapping { instance, source })?;
        let n = mapping.len();

        let mut boxes = Vec::with_capacity(n);
        for &part in mapping.parts() {
            boxes.push(self.bounding_box(instance, part)?);
        }
        let volumes: Vec<f64> = boxes.iter().map(BoundingBox::volume).collect();

        let mut distances = DMatrix::zeros(n, n);
        let mut directional = DMatrix::from_element(n, n, NO_EDGE);
        let mut failures = Vec::new();

        for a in 0..n {
            for b in (a + 1)..n {
                let (part_a, part_b) = (mapping.parts()[a], mapping.parts()[b]);
                let d = match distance_with(boxes[a].corners(), boxes[b].corners(), &self.settings.gjk) {
                    Ok(d) => d,
                    Err(error) if error.is_input() => {
                        return Err(GraphBuildError::CorruptBox {
                            instance,
                            part: part_a,
                            reason: format!("distance to part {part_b} rejected input: {error}"),
                        });
                    }
                    Err(error) => {
                        log::warn!(
                            "instance {instance}: distance between parts {part_a} and {part_b} \
                             (indices {a}, {b}) failed: {error}; using {}",
                            self.settings.failure_distance
                        );
                        failures.push(PairFailure {
                            instance,
                            indices: (a, b),
                            parts: (part_a, part_b),
                            error,
                        });
                        self.settings.failure_distance
                    }
                };

                distances[(a, b)] = d;
                distances[(b, a)] = d;

                // The larger box is the reference for the smaller one
                let (larger, smaller) = if volumes[a] >= volumes[b] { (a, b) } else { (b, a) };
                directional[(larger, smaller)] = d;
                directional[(smaller, larger)] = NO_EDGE;
            }
        }

        let artifact = Artifact::new(mapping, distances, directional)
            .map_err(|source| GraphBuildError::Shape { instance, source })?;
        self.artifacts
            .store_artifact(instance, &artifact)
            .map_err(|source| GraphBuildError::Persist { instance, source })?;
        log::info!(
            "instance {instance}: built graph over {n} parts, {} edges, {} substituted pairs",
            artifact.edges(&self.settings.edge_rule()).len(),
            failures.len()
        );

        Ok(BuildOutcome {
            artifact,
            failures,
            reused: false,
        })
    }

    /// Cached artifact if allowed and present, else a fresh build.
    pub fn load_or_build(&self, instance: InstanceId) -> Result<BuildOutcome, GraphBuildError> {
        if self.settings.reuse_cached {
            match self.artifacts.load_artifact(instance) {
                Ok(Some(artifact)) => {
                    log::debug!("instance {instance}: artifact cache hit");
                    return Ok(BuildOutcome {
                        artifact,
                        failures: Vec::new(),
                        reused: true,
                    });
                }
                Ok(None) => log::debug!("instance {instance}: artifact cache miss"),
                Err(e) => log::warn!("instance {instance}: cached artifact unreadable ({e}), rebuilding"),
            }
        }
        self.build_detailed(instance)
    }

    /// Drop the cached artifact of an instance so the next query rebuilds it.
    pub fn invalidate(&self, instance: InstanceId) -> Result<(), StoreError> {
        self.artifacts.invalidate(instance)
    }

    /// Generation order of an instance as global part ids.
    pub fn sequence<T: Tiebreak + ?Sized>(
        &self,
        instance: InstanceId,
        tiebreak: &mut T,
    ) -> Result<Vec<PartId>, PipelineError> {
        let outcome = self.load_or_build(instance)?;
        Ok(sequence_parts(&outcome.artifact, &self.settings.edge_rule(), tiebreak)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Lowest;
    use crate::store::MemoryStore;
    use partgraph_bbox::Mesh;
    use partgraph_math::{Point3, Vec3};

    fn builder(store: &MemoryStore) -> AdjacencyBuilder<&MemoryStore, &MemoryStore> {
        AdjacencyBuilder::new(store, store, AdjacencySettings::default()).unwrap()
    }

    fn cube(center: Point3, half: f64) -> Mesh {
        Mesh::cuboid(center, Vec3::new(half, half, half))
    }

    #[test]
    fn test_enclosing_pair_points_from_larger_to_smaller() {
        let store = MemoryStore::new();
        // Volume 8 encloses and touches volume 1
        store.insert_part(10, cube(Point3::origin(), 1.0));
        store.insert_part(11, cube(Point3::new(0.5, 0.5, 0.5), 0.5));
        store.insert_instance(1, vec![10, 11]);

        let artifact = builder(&store).build(1).unwrap();
        assert_eq!(artifact.distances(), &DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.0, 0.0]));
        assert_eq!(artifact.directional(), &DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]));
        assert_eq!(artifact.mapping().parts(), &[10, 11]);
        assert_eq!(store.artifact_count(), 1);
        assert_eq!(store.box_count(), 2);
    }

    #[test]
    fn test_smaller_part_listed_first_is_mirrored() {
        let store = MemoryStore::new();
        store.insert_part(1, cube(Point3::new(0.5, 0.5, 0.5), 0.5));
        store.insert_part(2, cube(Point3::origin(), 1.0));
        store.insert_instance(5, vec![1, 2]);

        let artifact = builder(&store).build(5).unwrap();
        assert_eq!(artifact.directional()[(1, 0)], 0.0);
        assert_eq!(artifact.directional()[(0, 1)], NO_EDGE);
    }

    #[test]
    fn test_disjoint_equal_parts() {
        let store = MemoryStore::new();
        store.insert_part(1, cube(Point3::origin(), 1.0));
        store.insert_part(2, cube(Point3::new(10.0, 0.0, 0.0), 1.0));
        store.insert_instance(3, vec![1, 2]);

        let artifact = builder(&store).build(3).unwrap();
        let d = artifact.distances();
        assert!((d[(0, 1)] - 8.0).abs() < 1e-9);
        assert_eq!(d[(0, 1)], d[(1, 0)]);
        assert_eq!(d[(0, 0)], 0.0);
        assert!(artifact.edges(&EdgeRule::any()).is_empty());
    }

    #[test]
    fn test_matrices_are_consistent_for_chain() {
        let store = MemoryStore::new();
        let sizes = [1.0, 0.8, 0.6, 0.4, 0.3];
        let mut x = 0.0;
        let mut parts = Vec::new();
        for (i, &h) in sizes.iter().enumerate() {
            x += h;
            store.insert_part(i as u64, cube(Point3::new(x, 0.0, 0.0), h));
            x += h;
            parts.push(i as u64);
        }
        store.insert_instance(9, parts);

        let artifact = builder(&store).build(9).unwrap();
        let n = artifact.len();
        for i in 0..n {
            assert_eq!(artifact.distances()[(i, i)], 0.0);
            assert_eq!(artifact.directional()[(i, i)], NO_EDGE);
            for j in 0..n {
                assert_eq!(artifact.distances()[(i, j)], artifact.distances()[(j, i)]);
                if i != j {
                    assert!(!(artifact.directional()[(i, j)] < NO_EDGE && artifact.directional()[(j, i)] < NO_EDGE));
                }
            }
        }
        // Neighbours touch; larger precedes smaller
        assert_eq!(artifact.edges(&EdgeRule::within(1e-9)), vec![(0, 1), (1, 2), (2, 3), (3, 4)]);
    }

    #[test]
    fn test_fitter_failure_names_the_part() {
        let store = MemoryStore::new();
        store.insert_part(1, cube(Point3::origin(), 1.0));
        store.insert_part(2, Mesh::default());
        store.insert_instance(4, vec![1, 2]);

        let err = builder(&store).build(4).unwrap_err();
        assert!(matches!(err, GraphBuildError::Geometry { instance: 4, part: 2, .. }));
        assert_eq!(err.part(), Some(2));
        assert_eq!(store.artifact_count(), 0);
    }

    #[test]
    fn test_missing_part_and_instance() {
        let store = MemoryStore::new();
        store.insert_instance(4, vec![1]);
        assert!(matches!(
            builder(&store).build(4),
            Err(GraphBuildError::Mesh { part: 1, .. })
        ));
        assert!(matches!(
            builder(&store).build(8),
            Err(GraphBuildError::LeafParts { instance: 8, .. })
        ));
    }

    #[test]
    fn test_duplicate_leaf_is_mapping_error() {
        let store = MemoryStore::new();
        store.insert_part(1, cube(Point3::origin(), 1.0));
        store.insert_instance(2, vec![1, 1]);
        let err = builder(&store).build(2).unwrap_err();
        assert!(matches!(err, GraphBuildError::Mapping { instance: 2, .. }));
    }

    #[test]
    fn test_non_convergence_is_substituted() {
        let store = MemoryStore::new();
        store.insert_part(1, cube(Point3::origin(), 1.0));
        store.insert_part(2, cube(Point3::new(3.0, 1.5, 0.7), 0.5));
        store.insert_instance(6, vec![1, 2]);

        let mut settings = AdjacencySettings::default();
        settings.gjk.max_iterations = 1;
        let outcome = AdjacencyBuilder::new(&store, &store, settings)
            .unwrap()
            .build_detailed(6)
            .unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].parts, (1, 2));
        assert_eq!(outcome.artifact.distances()[(0, 1)], FAILURE_DISTANCE);
        assert_eq!(outcome.artifact.directional()[(0, 1)], FAILURE_DISTANCE);
        assert_eq!(outcome.artifact.directional()[(1, 0)], NO_EDGE);
    }

    #[test]
    fn test_inconsistent_cached_box_is_refitted() {
        let store = MemoryStore::new();
        store.insert_part(1, cube(Point3::origin(), 1.0));
        store.insert_part(2, cube(Point3::new(3.0, 0.0, 0.0), 1.0));
        store.insert_instance(1, vec![1, 2]);
        let good = partgraph_bbox::fit(&cube(Point3::origin(), 1.0)).unwrap();
        let mut corners = *good.corners();
        corners[0].x += 5.0;
        let bad = BoundingBox::from_parts(corners, good.transform().clone(), *good.half_extents());
        store.store_box(1, &bad).unwrap();

        let b = builder(&store);
        let refit = b.bounding_box(1, 1).unwrap();
        assert!(refit.is_consistent(&Tolerance::DEFAULT));
        assert!(store.load_box(1).unwrap().unwrap().is_consistent(&Tolerance::DEFAULT));

        let artifact = b.build(1).unwrap();
        assert!((artifact.distances()[(0, 1)] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_or_build_reuses_and_invalidates() {
        let store = MemoryStore::new();
        store.insert_part(1, cube(Point3::origin(), 1.0));
        store.insert_part(2, cube(Point3::new(2.0, 0.0, 0.0), 1.0));
        store.insert_instance(1, vec![1, 2]);
        let b = builder(&store);

        assert!(!b.load_or_build(1).unwrap().reused);
        assert!(b.load_or_build(1).unwrap().reused);
        b.invalidate(1).unwrap();
        assert!(!b.load_or_build(1).unwrap().reused);

        let mut settings = AdjacencySettings::default();
        settings.reuse_cached = false;
        let fresh = AdjacencyBuilder::new(&store, &store, settings).unwrap();
        assert!(!fresh.load_or_build(1).unwrap().reused);
    }

    #[test]
    fn test_sequence_translates_to_part_ids() {
        let store = MemoryStore::new();
        store.insert_part(70, cube(Point3::new(0.5, 0.5, 0.5), 0.5));
        store.insert_part(80, cube(Point3::origin(), 1.0));
        store.insert_instance(1, vec![70, 80]);
        let order = builder(&store).sequence(1, &mut Lowest).unwrap();
        assert_eq!(order, vec![80, 70]);
    }

    #[test]
    fn test_single_part_instance() {
        let store = MemoryStore::new();
        store.insert_part(5, cube(Point3::origin(), 1.0));
        store.insert_instance(1, vec![5]);
        let artifact = builder(&store).build(1).unwrap();
        assert_eq!(artifact.distances(), &DMatrix::from_element(1, 1, 0.0));
        assert_eq!(artifact.directional(), &DMatrix::from_element(1, 1, NO_EDGE));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let store = MemoryStore::new();
        let settings = AdjacencySettings {
            edge_threshold: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(
            AdjacencyBuilder::new(&store, &store, settings),
            Err(SettingsError::Invalid(_))
        ));
    }
}

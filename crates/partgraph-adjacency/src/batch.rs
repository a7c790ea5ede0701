//! Parallel graph construction across many instances.

use rayon::prelude::*;

use crate::builder::{AdjacencyBuilder, PairFailure};
use crate::error::GraphBuildError;
use crate::store::{ArtifactStore, InstanceId, PartStore};

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Instances built in this run.
    pub built: Vec<InstanceId>,
    /// Instances served from the cache.
    pub reused: Vec<InstanceId>,
    /// Instances whose build failed, with the reason.
    pub failed: Vec<GraphBuildError>,
    /// Pairs substituted with the failure distance across all built instances.
    pub pair_failures: Vec<PairFailure>,
}

impl BatchReport {
    /// True if every instance produced an artifact.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of instances processed.
    pub fn total(&self) -> usize {
        self.built.len() + self.reused.len() + self.failed.len()
    }
}

/// Build (or reuse) the artifacts of `instances` in parallel.
///
/// A failing instance is logged and recorded; the rest of the batch continues.
/// Report lists keep the input order.
pub fn run_batch<P, A>(builder: &AdjacencyBuilder<P, A>, instances: &[InstanceId]) -> BatchReport
where
    P: PartStore,
    A: ArtifactStore,
{
    let outcomes: Vec<_> = instances
        .par_iter()
        .map(|&instance| (instance, builder.load_or_build(instance)))
        .collect();

    let mut report = BatchReport::default();
    for (instance, outcome) in outcomes {
        match outcome {
            Ok(outcome) if outcome.reused => report.reused.push(instance),
            Ok(outcome) => {
                report.built.push(instance);
                report.pair_failures.extend(outcome.failures);
            }
            Err(e) => {
                log::error!("{e}");
                report.failed.push(e);
            }
        }
    }
    log::info!(
        "batch of {}: {} built, {} reused, {} failed, {} substituted pairs",
        report.total(),
        report.built.len(),
        report.reused.len(),
        report.failed.len(),
        report.pair_failures.len()
    );
    report
}

//! partgraph CLI - part adjacency graphs and generation orders
//!
//! Builds per-instance adjacency artifacts from a dataset manifest, caches
//! them on disk, and samples placement orders from them.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use partgraph_adjacency::{
    run_batch, sequence_parts, AdjacencyBuilder, ArtifactStore, InstanceId, Uniform,
};
use partgraph_store::{DatasetStore, DiskCache};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

mod config;

use config::PipelineConfig;

#[derive(Parser)]
#[command(name = "partgraph")]
#[command(about = "Part adjacency graphs and generation orders for segmented shapes", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit and cache a bounding box for every leaf part
    Fit {
        /// Dataset manifest (JSON)
        #[arg(short, long)]
        manifest: PathBuf,
        /// Cache directory
        #[arg(short, long)]
        cache: PathBuf,
    },
    /// Build adjacency artifacts
    Build {
        /// Dataset manifest (JSON)
        #[arg(short, long)]
        manifest: PathBuf,
        /// Cache directory
        #[arg(short, long)]
        cache: PathBuf,
        /// Instances to build (default: every instance in the manifest)
        #[arg(short, long)]
        instance: Vec<InstanceId>,
        /// Ignore cached artifacts
        #[arg(long)]
        rebuild: bool,
    },
    /// Print generation orders of an instance as part ids
    Sequence {
        /// Dataset manifest (JSON)
        #[arg(short, long)]
        manifest: PathBuf,
        /// Cache directory
        #[arg(short, long)]
        cache: PathBuf,
        /// Instance id
        #[arg(short, long)]
        instance: InstanceId,
        /// Seed for reproducible orders
        #[arg(long)]
        seed: Option<u64>,
        /// Number of orders to print
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Display a cached artifact
    Info {
        /// Cache directory
        #[arg(short, long)]
        cache: PathBuf,
        /// Instance id
        #[arg(short, long)]
        instance: InstanceId,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fit { manifest, cache } => fit_parts(config, &manifest, &cache),
        Commands::Build {
            manifest,
            cache,
            instance,
            rebuild,
        } => build_instances(config, &manifest, &cache, instance, rebuild),
        Commands::Sequence {
            manifest,
            cache,
            instance,
            seed,
            count,
        } => print_sequences(config, &manifest, &cache, instance, seed, count),
        Commands::Info { cache, instance } => show_info(&config, &cache, instance),
    }
}

fn open_builder(
    config: PipelineConfig,
    manifest: &Path,
    cache: &Path,
) -> Result<AdjacencyBuilder<DatasetStore, DiskCache>> {
    let parts = DatasetStore::open(manifest, config.mesh_cache_capacity)
        .with_context(|| format!("opening manifest {}", manifest.display()))?;
    let artifacts =
        DiskCache::open(cache).with_context(|| format!("opening cache {}", cache.display()))?;
    Ok(AdjacencyBuilder::new(parts, artifacts, config.adjacency)?)
}

fn fit_parts(config: PipelineConfig, manifest: &Path, cache: &Path) -> Result<()> {
    let builder = open_builder(config, manifest, cache)?;

    let mut fitted = 0usize;
    let mut failed = 0usize;
    for instance in &builder.parts().manifest().instances {
        for part in &instance.parts {
            match builder.bounding_box(instance.id, part.global_id) {
                Ok(_) => fitted += 1,
                Err(e) => {
                    log::error!("{e}");
                    failed += 1;
                }
            }
        }
    }

    let stats = builder.parts().cache_stats();
    println!("Fitted {fitted} parts, {failed} failed");
    println!(
        "Mesh cache: {} hits, {} misses, {} evictions",
        stats.hits, stats.misses, stats.evictions
    );
    if failed > 0 {
        bail!("{failed} parts could not be fitted");
    }
    Ok(())
}

fn build_instances(
    mut config: PipelineConfig,
    manifest: &Path,
    cache: &Path,
    instances: Vec<InstanceId>,
    rebuild: bool,
) -> Result<()> {
    if rebuild {
        config.adjacency.reuse_cached = false;
    }
    let builder = open_builder(config, manifest, cache)?;
    let instances = if instances.is_empty() {
        builder.parts().manifest().instance_ids()
    } else {
        instances
    };

    let report = run_batch(&builder, &instances);
    println!(
        "Built {}, reused {}, failed {} of {} instances",
        report.built.len(),
        report.reused.len(),
        report.failed.len(),
        report.total()
    );
    for failure in &report.pair_failures {
        println!(
            "  instance {}: parts {} and {} substituted ({})",
            failure.instance, failure.parts.0, failure.parts.1, failure.error
        );
    }
    for error in &report.failed {
        println!("  {error}");
    }
    if !report.is_success() {
        bail!("{} instances failed", report.failed.len());
    }
    Ok(())
}

fn print_sequences(
    config: PipelineConfig,
    manifest: &Path,
    cache: &Path,
    instance: InstanceId,
    seed: Option<u64>,
    count: usize,
) -> Result<()> {
    let builder = open_builder(config, manifest, cache)?;
    let outcome = builder.load_or_build(instance)?;
    let rule = builder.settings().edge_rule();

    let rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut tiebreak = Uniform(rng);
    for _ in 0..count {
        let order = sequence_parts(&outcome.artifact, &rule, &mut tiebreak)?;
        let line: Vec<String> = order.iter().map(|p| p.to_string()).collect();
        println!("{}", line.join(" "));
    }
    Ok(())
}

fn show_info(config: &PipelineConfig, cache: &Path, instance: InstanceId) -> Result<()> {
    let artifacts =
        DiskCache::open(cache).with_context(|| format!("opening cache {}", cache.display()))?;
    let Some(artifact) = artifacts.load_artifact(instance)? else {
        bail!("no artifact for instance {instance} in {}", cache.display());
    };
    let rule = config.adjacency.edge_rule();

    println!("Instance: {instance}");
    println!("Parts: {}", artifact.len());
    for (index, part) in artifact.mapping().parts().iter().enumerate() {
        println!("  {index}: {part}");
    }
    println!("Distances:{}", artifact.distances());
    println!("Directional:{}", artifact.directional());

    let edges = artifact.edges(&rule);
    println!("Edges: {}", edges.len());
    for (from, to) in edges {
        println!(
            "  {} -> {} ({:.6})",
            artifact.mapping().part(from).unwrap_or_default(),
            artifact.mapping().part(to).unwrap_or_default(),
            artifact.directional()[(from, to)]
        );
    }
    Ok(())
}

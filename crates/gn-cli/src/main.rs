//! gnet: hyperparameter optimization and method comparison for genomic
//! prediction.
//!
//! Usage:
//!   gnet optimize <METHOD> --species <S> --trait <T> --markers <CSV> --phenotypes <CSV>
//!   gnet compare [--shelves <DIR>]

mod presets;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gn_data::{load_genotype_data, ShelfDirectory};
use gn_engine::Backend;
use gn_methods::default_registry;
use gn_optimizer::{compare_methods, run_optimization, ComparisonRecord};
use gn_types::PipelineConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::presets::Preset;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log filter, e.g. `debug` or `gn_engine=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cross-validate every grid combination of a method and record the result
    Optimize(OptimizeArgs),
    /// Print the best recorded row of every method as TSV
    Compare {
        /// Directory holding the shelves
        #[arg(long, default_value = "shelves")]
        shelves: PathBuf,
    },
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    /// Method preset to optimize
    #[arg(value_enum)]
    method: Preset,

    #[arg(long)]
    species: String,

    #[arg(long = "trait")]
    trait_name: String,

    /// Marker calls CSV: `marker,<sample ids...>`
    #[arg(long)]
    markers: PathBuf,

    /// Phenotype CSV: `sample,<traits...>`
    #[arg(long)]
    phenotypes: PathBuf,

    /// sequential, pooled or queued
    #[arg(long)]
    backend: Option<String>,

    /// Re-train even if a result is already recorded
    #[arg(long)]
    force: bool,

    /// Print the full result table
    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    folds: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads for the pooled backend
    #[arg(long)]
    threads: Option<usize>,

    /// JSON pipeline configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    shelves: Option<PathBuf>,
}

impl OptimizeArgs {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(backend) = &self.backend {
            config = config.with_backend(backend.as_str());
        }
        if let Some(folds) = self.folds {
            config = config.with_folds(folds);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(threads) = self.threads {
            config = config.with_cpu_cores(threads);
        }
        if let Some(shelves) = &self.shelves {
            config = config.with_shelf_dir(shelves.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn optimize(args: OptimizeArgs) -> Result<()> {
    let config = args.pipeline_config()?;
    let backend_kind: Backend = config.backend.parse()?;

    let data = load_genotype_data(&args.markers, &args.phenotypes).with_context(|| {
        format!(
            "Failed to load {} and {}",
            args.markers.display(),
            args.phenotypes.display()
        )
    })?;
    info!(
        "Loaded {} markers over {} samples",
        data.markers.num_markers(),
        data.markers.num_samples()
    );

    let backend = backend_kind.build(&config, Arc::new(default_registry()))?;
    let request = args
        .method
        .request(&args.species, &args.trait_name, args.force, args.verbose);
    info!(
        "Running {} on the {} backend with {} folds",
        request.method_name,
        backend.name(),
        config.folds
    );
    run_optimization(&request, &data, backend.as_ref(), &config)?;
    Ok(())
}

fn compare(shelves: PathBuf) -> Result<()> {
    let records = compare_methods(&ShelfDirectory::new(&shelves))?;
    println!("{}", ComparisonRecord::TSV_HEADER);
    for record in &records {
        println!("{}", record.to_tsv());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Command::Optimize(args) => optimize(args),
        Command::Compare { shelves } => compare(shelves),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "gnet", "optimize", "wddo", "--species", "maize", "--trait", "yield", "--markers",
            "m.csv", "--phenotypes", "p.csv", "--backend", "sequential", "--folds", "4",
            "--threads", "2", "--shelves", "/tmp/shelves",
        ]);
        let Command::Optimize(args) = cli.command else {
            panic!("expected optimize");
        };
        assert_eq!(args.method, Preset::Wddo);
        let config = args.pipeline_config().unwrap();
        assert_eq!(config.backend, "sequential");
        assert_eq!(config.folds, 4);
        assert_eq!(config.cpu_cores, 2);
        assert_eq!(config.shelf_dir, PathBuf::from("/tmp/shelves"));
        assert_eq!(config.seed, PipelineConfig::default().seed);
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let cli = parse(&[
            "gnet", "optimize", "mlp", "--species", "maize", "--trait", "yield", "--markers",
            "m.csv", "--phenotypes", "p.csv", "--backend", "spark",
        ]);
        let Command::Optimize(args) = cli.command else {
            panic!("expected optimize");
        };
        let err = optimize(args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<gn_types::GnError>(),
            Some(gn_types::GnError::Config(_))
        ));
        assert!(err.to_string().contains("spark"));
    }

    #[test]
    fn compare_defaults_to_shelves_dir() {
        let Command::Compare { shelves } = parse(&["gnet", "compare"]).command else {
            panic!("expected compare");
        };
        assert_eq!(shelves, PathBuf::from("shelves"));
        assert!(Cli::try_parse_from(["gnet", "optimize", "svm"]).is_err());
    }
}

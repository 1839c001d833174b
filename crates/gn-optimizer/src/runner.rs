//! Cached grid optimization of one method on one species/trait pair.

use chrono::Utc;
use gn_data::{shelf_key, ShelfDirectory, Store};
use gn_engine::{run_predictors, ExecutionBackend};
use gn_types::{validation_error, GenotypeData, GnResult, PipelineConfig};
use std::time::Instant;
use tracing::info;

use crate::grid::ParameterGrid;
use crate::result::{GridRow, OptimizationResult, ParameterGridResult};

/// What to optimize and where to record it.
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    /// Registered prediction method, e.g. `mlp`.
    pub method_id: String,
    /// Display name recorded in the master index, e.g. `N`.
    pub method_name: String,
    /// File name of the method shelf, e.g. `optimal_nn.shelf`.
    pub shelf_name: String,
    pub grid: ParameterGrid,
    pub species: String,
    pub trait_name: String,
    /// Re-run even when a result is already recorded.
    pub force: bool,
    /// Print the full result table.
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptimizationOutcome {
    /// A result was already recorded and `force` was off; nothing ran.
    AlreadyCompleted,
    /// The grid ran and its best row was recorded.
    Completed {
        result: OptimizationResult,
        best: GridRow,
    },
}

/// Run the grid unless the shelf already holds a result for this
/// species/trait, then record it in the method shelf and the master index.
pub fn run_optimization(
    request: &OptimizationRequest,
    data: &GenotypeData,
    backend: &dyn ExecutionBackend,
    config: &PipelineConfig,
) -> GnResult<OptimizationOutcome> {
    let shelves = ShelfDirectory::new(&config.shelf_dir);
    let key = shelf_key(&request.species, &request.trait_name);
    let mut method_shelf = shelves.open_method_shelf::<OptimizationResult>(&request.shelf_name)?;

    if method_shelf.contains(&key) && !request.force {
        info!("'{}' already holds '{}'", request.shelf_name, key);
        println!("Training was already completed.");
        println!("Run with the \"--force\" switch to re-train anyway.");
        return Ok(OptimizationOutcome::AlreadyCompleted);
    }
    if request.grid.is_empty() {
        return Err(validation_error!(
            "parameter grid for {} has no combinations",
            request.method_name
        ));
    }
    // A damaged index must fail before the grid is trained.
    let mut index = shelves.open_master_index()?;

    let started = Instant::now();
    let combinations = request.grid.combinations();
    info!(
        "Optimizing {} over {} combinations for {}",
        request.method_name,
        combinations.len(),
        key
    );
    let specs = request.grid.to_specs(&request.method_id);
    let accuracies = run_predictors(data, &request.trait_name, &specs, backend, config)?;
    let table = ParameterGridResult::from_accuracies(combinations, accuracies)?;

    if request.verbose {
        println!("{table}");
    }
    let elapsed_seconds = started.elapsed().as_secs_f64();

    println!("Recording fitting results to shelf '{}'.", request.shelf_name);
    index.put(&request.method_name, request.shelf_name.clone())?;

    let result = OptimizationResult {
        method: request.method_name.clone(),
        species: request.species.clone(),
        trait_name: request.trait_name.clone(),
        folds: config.folds,
        elapsed_seconds,
        table,
        recorded_at: Utc::now(),
    };
    method_shelf.put(&key, result.clone())?;

    let best = result
        .table
        .best_row()
        .cloned()
        .ok_or_else(|| validation_error!("no combination produced a finite accuracy"))?;
    println!("Best Parameters Were:");
    println!("{best}");
    println!("Done.");
    info!(
        "{} on {} finished in {:.1}s, best mean {:.4}",
        request.method_name, key, elapsed_seconds, best.mean
    );

    Ok(OptimizationOutcome::Completed { result, best })
}

//! Best-configuration report across every recorded method.

use gn_data::{split_shelf_key, ShelfDirectory, Store};
use gn_types::GnResult;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::result::OptimizationResult;

/// Best row of one method on one species/trait pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub species: String,
    pub trait_name: String,
    pub method: String,
    pub mean: f64,
    pub sd: f64,
    pub count: usize,
    pub std_err: f64,
    pub hidden: Option<String>,
}

impl ComparisonRecord {
    pub const TSV_HEADER: &'static str = "species\ttrait\tmodel\tmean\tsd\tcount\tstd_err\thidden";

    pub fn to_tsv(&self) -> String {
        format!(
            "{}\t{}\t{}\t{:.6}\t{:.6}\t{}\t{:.6}\t{}",
            self.species,
            self.trait_name,
            self.method,
            self.mean,
            self.sd,
            self.count,
            self.std_err,
            self.hidden.as_deref().unwrap_or("")
        )
    }
}

/// Collect the best row of every recorded run, sorted by species ascending,
/// trait descending, then method.
pub fn compare_methods(shelves: &ShelfDirectory) -> GnResult<Vec<ComparisonRecord>> {
    let index = shelves.open_master_index()?;
    let mut records = Vec::new();

    for method in index.keys() {
        let Some(shelf_name) = index.get(method) else {
            continue;
        };
        let shelf = shelves.open_method_shelf::<OptimizationResult>(&shelf_name)?;
        for key in shelf.keys() {
            let Some((species, trait_name)) = split_shelf_key(key) else {
                warn!("Skipping malformed key '{}' in {}", key, shelf_name);
                continue;
            };
            let Some(result) = shelf.try_get(key)? else {
                continue;
            };
            let Some(best) = result.table.best_row() else {
                continue;
            };
            let count = best.raw_results.len();
            records.push(ComparisonRecord {
                species: species.to_string(),
                trait_name: trait_name.to_string(),
                method: method.to_string(),
                mean: best.mean,
                sd: best.std_dev,
                count,
                std_err: if count > 0 {
                    best.std_dev / (count as f64).sqrt()
                } else {
                    f64::NAN
                },
                hidden: best.parameters.get("hidden").map(|v| v.to_string()),
            });
        }
    }

    records.sort_by(|a, b| {
        a.species
            .cmp(&b.species)
            .then_with(|| b.trait_name.cmp(&a.trait_name))
            .then_with(|| a.method.cmp(&b.method))
    });
    Ok(records)
}

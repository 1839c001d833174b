//! Result tables of a grid optimization.

use chrono::{DateTime, Utc};
use gn_types::{internal_error, AccuracyMatrix, GnResult, ParameterSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean and population standard deviation of `values`.
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Accuracy summary of one hyperparameter combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub parameters: ParameterSet,
    pub mean: f64,
    pub std_dev: f64,
    pub raw_results: Vec<f64>,
}

/// One row per grid combination, in grid order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterGridResult {
    pub rows: Vec<GridRow>,
}

impl ParameterGridResult {
    /// Pair each combination with its row of fold accuracies.
    pub fn from_accuracies(
        combinations: Vec<ParameterSet>,
        accuracies: AccuracyMatrix,
    ) -> GnResult<Self> {
        if combinations.len() != accuracies.len() {
            return Err(internal_error!(
                "{} combinations but {} accuracy rows",
                combinations.len(),
                accuracies.len()
            ));
        }
        let rows = combinations
            .into_iter()
            .zip(accuracies)
            .map(|(parameters, raw_results)| {
                let (mean, std_dev) = mean_and_std(&raw_results);
                GridRow {
                    parameters,
                    mean,
                    std_dev,
                    raw_results,
                }
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first row with the highest mean accuracy. NaN means never win.
    pub fn best_row(&self) -> Option<&GridRow> {
        self.rows.iter().fold(None, |best: Option<&GridRow>, row| match best {
            Some(current) if row.mean.is_nan() || row.mean <= current.mean => Some(current),
            Some(_) => Some(row),
            None if row.mean.is_nan() => None,
            None => Some(row),
        })
    }
}

impl fmt::Display for ParameterGridResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            for (name, _) in row.parameters.iter() {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
        }

        for name in &names {
            write!(f, "{name:>14}")?;
        }
        writeln!(f, "{:>10}{:>10}", "mean", "std_dev")?;
        for row in &self.rows {
            for name in &names {
                match row.parameters.get(name) {
                    Some(value) => write!(f, "{:>14}", value.to_string())?,
                    None => write!(f, "{:>14}", "-")?,
                }
            }
            writeln!(f, "{:>10.4}{:>10.4}", row.mean, row.std_dev)?;
        }
        Ok(())
    }
}

impl fmt::Display for GridRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.parameters.iter() {
            writeln!(f, "{name:<14}{value}")?;
        }
        writeln!(f, "{:<14}{:.6}", "mean", self.mean)?;
        write!(f, "{:<14}{:.6}", "std_dev", self.std_dev)
    }
}

/// What a method shelf stores under `species|trait`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub method: String,
    pub species: String,
    pub trait_name: String,
    pub folds: usize,
    pub elapsed_seconds: f64,
    pub table: ParameterGridResult,
    pub recorded_at: DateTime<Utc>,
}

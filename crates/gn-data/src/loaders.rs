//! CSV readers for marker and phenotype tables.
//!
//! Marker files are markers x samples: the header is `marker,<sample ids>`
//! and each row is a marker id followed by its calls. Phenotype files are
//! samples x traits: the header is `sample,<trait names>`. Empty cells, `NA`
//! and `NaN` are read as missing.

use csv::{ReaderBuilder, StringRecord};
use gn_types::{DataError, GenotypeData, GnResult, MarkerTable, PhenotypeTable};
use ndarray::Array2;
use std::path::Path;
use tracing::{debug, info};

/// Parsed CSV grid: header labels, row labels, values in row-major order.
struct Grid {
    columns: Vec<String>,
    rows: Vec<String>,
    values: Vec<f64>,
}

fn parse_cell(cell: &str, source_name: &str, line: usize) -> GnResult<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    let parse_error = |message: String| DataError::ParseError {
        source_name: source_name.to_string(),
        message,
    };
    let value = cell
        .parse::<f64>()
        .map_err(|e| parse_error(format!("line {line}: '{cell}' is not a number: {e}")))?;
    if !value.is_finite() {
        return Err(parse_error(format!("line {line}: '{cell}' is not a finite number")).into());
    }
    Ok(value)
}

fn read_grid<R: std::io::Read>(reader: R, source_name: &str) -> GnResult<Grid> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let parse_error = |message: String| DataError::ParseError {
        source_name: source_name.to_string(),
        message,
    };

    let headers: StringRecord = rdr
        .headers()
        .map_err(|e| parse_error(format!("failed to read header: {e}")))?
        .clone();
    if headers.len() < 2 {
        return Err(parse_error(
            "header needs an id column and at least one value column".to_string(),
        )
        .into());
    }
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    debug!("{}: {} value columns", source_name, columns.len());

    let mut rows = Vec::new();
    let mut values = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let line = index + 2;
        let record = record.map_err(|e| parse_error(format!("line {line}: {e}")))?;
        if record.len() != headers.len() {
            return Err(parse_error(format!(
                "line {line}: expected {} fields, found {}",
                headers.len(),
                record.len()
            ))
            .into());
        }
        rows.push(record.get(0).unwrap_or_default().to_string());
        for cell in record.iter().skip(1) {
            values.push(parse_cell(cell, source_name, line)?);
        }
    }

    Ok(Grid {
        columns,
        rows,
        values,
    })
}

/// Read a markers x samples table.
pub fn read_markers<R: std::io::Read>(reader: R, source_name: &str) -> GnResult<MarkerTable> {
    let grid = read_grid(reader, source_name)?;
    let calls = Array2::from_shape_vec((grid.rows.len(), grid.columns.len()), grid.values)
        .map_err(|e| DataError::ShapeMismatch {
            message: format!("{source_name}: {e}"),
        })?;
    MarkerTable::new(grid.rows, grid.columns, calls)
}

/// Read a samples x traits table.
pub fn read_phenotypes<R: std::io::Read>(reader: R, source_name: &str) -> GnResult<PhenotypeTable> {
    let grid = read_grid(reader, source_name)?;
    let values = Array2::from_shape_vec((grid.rows.len(), grid.columns.len()), grid.values)
        .map_err(|e| DataError::ShapeMismatch {
            message: format!("{source_name}: {e}"),
        })?;
    PhenotypeTable::new(grid.rows, grid.columns, values)
}

/// Load and align a marker file and a phenotype file.
pub fn load_genotype_data<P: AsRef<Path>, Q: AsRef<Path>>(
    markers_path: P,
    phenotypes_path: Q,
) -> GnResult<GenotypeData> {
    let markers_path = markers_path.as_ref();
    let phenotypes_path = phenotypes_path.as_ref();
    info!(
        "Loading markers from {} and phenotypes from {}",
        markers_path.display(),
        phenotypes_path.display()
    );

    let markers = read_markers(
        std::fs::File::open(markers_path)?,
        &markers_path.display().to_string(),
    )?;
    let phenotypes = read_phenotypes(
        std::fs::File::open(phenotypes_path)?,
        &phenotypes_path.display().to_string(),
    )?;

    info!(
        "Loaded {} markers x {} samples, {} traits",
        markers.num_markers(),
        markers.num_samples(),
        phenotypes.traits.len()
    );
    GenotypeData::new(markers, phenotypes)
}

use gn_types::{internal_error, AccuracyMatrix, GnResult, RawResult};

/// Regroup results that arrived in any order into one row of fold
/// accuracies per predictor, ordered by predictor index.
///
/// The sort is stable and keyed on the predictor index only, so folds keep
/// their arrival order within a row.
pub fn group_accuracies(mut results: Vec<RawResult>, folds: usize) -> GnResult<AccuracyMatrix> {
    if folds == 0 || results.len() % folds != 0 {
        return Err(internal_error!(
            "{} results cannot be grouped into rows of {} folds",
            results.len(),
            folds
        ));
    }

    results.sort_by_key(|result| result.id.predictor_index);
    Ok(results
        .chunks(folds)
        .map(|chunk| chunk.iter().map(|result| result.accuracy).collect())
        .collect())
}

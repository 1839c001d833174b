//! Seeded K-fold partitioning.

use gn_types::{DataError, GnResult};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Split `0..n_samples` into `folds` shuffled partitions and return the
/// `(train, test)` positions for `fold_index`.
///
/// The first `n_samples % folds` partitions get one extra sample. The same
/// `(n_samples, folds, seed)` always produces the same partitions, so every
/// predictor sees identical folds.
pub fn fold_split(
    n_samples: usize,
    folds: usize,
    seed: u64,
    fold_index: usize,
) -> GnResult<(Vec<usize>, Vec<usize>)> {
    if folds < 2 || fold_index >= folds {
        return Err(DataError::DegenerateFold {
            fold_index,
            folds,
            message: "fold index must be below a fold count of at least 2".to_string(),
        }
        .into());
    }
    if n_samples < folds {
        return Err(DataError::DegenerateFold {
            fold_index,
            folds,
            message: format!("only {n_samples} samples for {folds} folds"),
        }
        .into());
    }

    let mut order: Vec<usize> = (0..n_samples).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let base = n_samples / folds;
    let extra = n_samples % folds;
    let start = fold_index * base + fold_index.min(extra);
    let len = base + usize::from(fold_index < extra);

    let test = order[start..start + len].to_vec();
    let train = order[..start]
        .iter()
        .chain(&order[start + len..])
        .copied()
        .collect();
    Ok((train, test))
}

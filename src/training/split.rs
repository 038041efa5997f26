//! Reproducible held-out split

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{CricketError, Result};

/// Rows partitioned into a fitting set and a held-out set
#[derive(Debug, Clone)]
pub struct HeldOutSplit<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
}

/// Number of held-out rows: the fraction of `n`, rounded up
pub fn heldout_size(n: usize, test_fraction: f64) -> usize {
    (n as f64 * test_fraction).ceil() as usize
}

/// Shuffle with a fixed seed and hold out `test_fraction` of the items
pub fn train_test_split<T: Clone>(
    items: &[T],
    test_fraction: f64,
    seed: u64,
) -> Result<HeldOutSplit<T>> {
    let n = items.len();
    let n_test = heldout_size(n, test_fraction);
    if n_test >= n {
        return Err(CricketError::InsufficientData(format!(
            "{} rows leave nothing to train on with test_fraction={}",
            n, test_fraction
        )));
    }

    // Shuffle with seed for reproducibility
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let test = order[..n_test].iter().map(|&i| items[i].clone()).collect();
    let train = order[n_test..].iter().map(|&i| items[i].clone()).collect();

    log::info!("Split {} rows: train={}, held-out={}", n, n - n_test, n_test);

    Ok(HeldOutSplit { train, test })
}

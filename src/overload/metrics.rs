//! Held-out evaluation: seeded train/test split and classification report

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use smartcore::metrics::accuracy;

use crate::summary::round2;

/// Index partition of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and hold out `ceil(n * test_fraction)` indices
///
/// At least one index is always kept for training when `n > 0`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> TrainTestSplit {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let n_test = ((n as f64 * test_fraction).ceil() as usize).min(n.saturating_sub(1));
    let train = indices.split_off(n_test);

    TrainTestSplit {
        train,
        test: indices,
    }
}

/// Accuracy and positive-class precision/recall on held-out samples
///
/// All three come from smartcore's `accuracy` metric. Precision is the
/// accuracy over the records predicted overloaded, recall the accuracy over
/// the records actually overloaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationReport {
    #[serde(with = "rust_decimal::serde::float_option")]
    pub accuracy: Option<Decimal>,

    /// Present only when the overloaded class occurs in truth or predictions
    #[serde(with = "rust_decimal::serde::float_option")]
    pub precision: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub recall: Option<Decimal>,

    pub test_size: usize,
}

/// Agreement between the pairs `keep` selects; an empty selection scores 0
fn agreement(truth: &[u32], predicted: &[u32], keep: impl Fn(u32, u32) -> bool) -> f64 {
    let (t, p): (Vec<u32>, Vec<u32>) = truth
        .iter()
        .zip(predicted)
        .filter(|(&t, &p)| keep(t, p))
        .map(|(&t, &p)| (t, p))
        .unzip();
    if t.is_empty() {
        0.0
    } else {
        accuracy(&t, &p)
    }
}

impl ClassificationReport {
    pub fn evaluate(truth: &[bool], predicted: &[bool]) -> Self {
        let test_size = truth.len().min(predicted.len());
        let truth: Vec<u32> = truth[..test_size].iter().map(|&l| u32::from(l)).collect();
        let predicted: Vec<u32> = predicted[..test_size].iter().map(|&l| u32::from(l)).collect();

        let positive_present = truth.iter().chain(&predicted).any(|&l| l == 1);
        let positive_score = |keep: fn(u32, u32) -> bool| {
            positive_present
                .then(|| round2(agreement(&truth, &predicted, keep)))
                .flatten()
        };

        ClassificationReport {
            accuracy: (test_size > 0)
                .then(|| round2(agreement(&truth, &predicted, |_, _| true)))
                .flatten(),
            precision: positive_score(|_, p| p == 1),
            recall: positive_score(|t, _| t == 1),
            test_size,
        }
    }
}

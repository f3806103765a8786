//! Feature matrix construction
//!
//! Categorical columns are label-encoded: the sorted distinct values of the
//! current batch map to `0..n`. The table is fit fresh for every batch and
//! never stored, so a given category may receive a different code in another
//! run.

use std::collections::BTreeMap;

use super::OverloadSample;

/// Column order of the feature matrix
pub const FEATURE_NAMES: [&str; 7] = [
    "trainingType",
    "intensity",
    "temperature",
    "duration",
    "hrBefore",
    "hrDuring",
    "hrAfter",
];

/// Category label used when a categorical value is missing
pub const MISSING_CATEGORY: &str = "None";

/// Classes per categorical column; a class's index is its code
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodingTable {
    pub columns: BTreeMap<String, Vec<String>>,
}

impl EncodingTable {
    /// Code assigned to a value, if it was part of the batch
    pub fn code(&self, column: &str, value: &str) -> Option<usize> {
        self.columns
            .get(column)?
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
    }
}

/// Dense numeric features, one row per sample
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Rows at the given indices
    pub fn select(&self, indices: &[usize]) -> Vec<Vec<f64>> {
        indices.iter().map(|&i| self.rows[i].clone()).collect()
    }
}

fn fit_classes<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut classes: Vec<String> = values.map(str::to_string).collect();
    classes.sort();
    classes.dedup();
    classes
}

/// Encode a batch of usable samples
pub fn encode(batch: &[OverloadSample]) -> (FeatureMatrix, EncodingTable) {
    let mut table = EncodingTable::default();
    table.columns.insert(
        "trainingType".to_string(),
        fit_classes(batch.iter().map(|s| s.training_type.as_str())),
    );
    table.columns.insert(
        "intensity".to_string(),
        fit_classes(batch.iter().map(|s| s.intensity_label())),
    );

    let rows = batch
        .iter()
        .map(|sample| {
            let type_code = table
                .code("trainingType", &sample.training_type)
                .unwrap_or_default();
            let intensity_code = table
                .code("intensity", sample.intensity_label())
                .unwrap_or_default();

            vec![
                type_code as f64,
                intensity_code as f64,
                sample.temperature,
                sample.duration,
                sample.hr_before,
                sample.hr_during,
                sample.hr_after,
            ]
        })
        .collect();

    (FeatureMatrix { rows }, table)
}

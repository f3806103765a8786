//! Random forest model for the overload label
//!
//! Wraps smartcore's `RandomForestClassifier` (Gini trees, bootstrap samples
//! and √n candidate features per split). The forest is refit for every batch
//! and seeded, so the same batch always yields the same verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{AnalysisError, Result};

/// Forest hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub n_trees: usize,

    /// Maximum tree depth (None grows until leaves are pure)
    pub max_depth: Option<usize>,

    /// Minimum samples a node needs to be split
    pub min_samples_split: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

impl ForestConfig {
    fn parameters(&self, seed: u64) -> Result<RandomForestClassifierParameters> {
        let n_trees = u16::try_from(self.n_trees).map_err(|_| {
            AnalysisError::Configuration(format!("forest.n_trees too large: {}", self.n_trees))
        })?;

        let mut params = RandomForestClassifierParameters::default()
            .with_n_trees(n_trees)
            .with_min_samples_split(self.min_samples_split)
            .with_seed(seed);
        if let Some(depth) = self.max_depth {
            let depth = u16::try_from(depth).map_err(|_| {
                AnalysisError::Configuration(format!("forest.max_depth too large: {}", depth))
            })?;
            params = params.with_max_depth(depth);
        }
        Ok(params)
    }
}

type Forest = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// A fitted overload model
///
/// Trees need two classes to split on. A training split holding only one
/// label fits a constant model that always answers that label.
pub enum OverloadModel {
    Forest(Box<Forest>),
    Constant(bool),
}

impl fmt::Debug for OverloadModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverloadModel::Forest(_) => f.write_str("OverloadModel::Forest"),
            OverloadModel::Constant(label) => write!(f, "OverloadModel::Constant({})", label),
        }
    }
}

impl OverloadModel {
    pub fn fit(x: &[Vec<f64>], y: &[bool], config: &ForestConfig, seed: u64) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(AnalysisError::Model(format!(
                "cannot fit {} rows against {} labels",
                x.len(),
                y.len()
            )));
        }
        if config.n_trees == 0 {
            return Err(AnalysisError::Configuration(
                "forest.n_trees must be at least 1".to_string(),
            ));
        }

        let first = y[0];
        if y.iter().all(|&label| label == first) {
            return Ok(OverloadModel::Constant(first));
        }

        let labels: Vec<u32> = y.iter().map(|&label| u32::from(label)).collect();
        let forest = Forest::fit(
            &DenseMatrix::from_2d_vec(&x.to_vec()),
            &labels,
            config.parameters(seed)?,
        )
        .map_err(|e| AnalysisError::Model(e.to_string()))?;

        Ok(OverloadModel::Forest(Box::new(forest)))
    }

    /// Predict every row in one batch
    pub fn predict_all(&self, rows: &[Vec<f64>]) -> Result<Vec<bool>> {
        match self {
            OverloadModel::Constant(label) => Ok(vec![*label; rows.len()]),
            OverloadModel::Forest(_) if rows.is_empty() => Ok(Vec::new()),
            OverloadModel::Forest(forest) => {
                let predicted = forest
                    .predict(&DenseMatrix::from_2d_vec(&rows.to_vec()))
                    .map_err(|e| AnalysisError::Model(e.to_string()))?;
                Ok(predicted.into_iter().map(|label| label == 1).collect())
            }
        }
    }
}

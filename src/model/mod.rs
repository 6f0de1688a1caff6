use anyhow::{anyhow, Result};
use arrow::array::Float64Array;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod predict;
pub mod train;

pub use predict::{predict, ModelContext, Outcome, Prediction};

/// The binary classifier the pipeline feeds. The screening path only depends
/// on this seam, so tests can plug in fixture models and the algorithm can be
/// swapped without touching the feature code.
pub trait Classifier {
    fn fit(&mut self, features: &RecordBatch, labels: &[f64]) -> Result<()>;

    /// Probability of the positive class per row, each in [0, 1].
    fn predict_probability(&self, features: &RecordBatch) -> Result<Vec<f64>>;
}

/// Materialize an all-Float64 batch as row vectors.
fn batch_rows(batch: &RecordBatch) -> Result<Vec<Vec<f64>>> {
    let columns: Vec<&Float64Array> = batch
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            column.as_any().downcast_ref::<Float64Array>().ok_or_else(|| {
                anyhow!(
                    "feature column `{}` is not Float64",
                    batch.schema().field(idx).name()
                )
            })
        })
        .collect::<Result<_>>()?;

    Ok((0..batch.num_rows())
        .map(|row| columns.iter().map(|column| column.value(row)).collect())
        .collect())
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Serializable logistic-regression stand-in trained by plain gradient
/// descent. Model choice is deliberately out of scope; anything satisfying
/// `Classifier` can replace it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    weights: Vec<f64>,
    bias: f64,
    learning_rate: f64,
    epochs: usize,
}

impl Default for LogisticModel {
    fn default() -> Self {
        Self {
            weights: Vec::new(),
            bias: 0.0,
            learning_rate: 0.05,
            epochs: 400,
        }
    }
}

impl LogisticModel {
    fn probability(&self, row: &[f64]) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        sigmoid(z)
    }
}

impl Classifier for LogisticModel {
    fn fit(&mut self, features: &RecordBatch, labels: &[f64]) -> Result<()> {
        let rows = batch_rows(features)?;
        if rows.is_empty() {
            return Err(anyhow!("cannot fit on an empty feature batch"));
        }
        if rows.len() != labels.len() {
            return Err(anyhow!(
                "{} feature rows but {} labels",
                rows.len(),
                labels.len()
            ));
        }

        let width = rows[0].len();
        self.weights = vec![0.0; width];
        self.bias = 0.0;

        for _ in 0..self.epochs {
            for (row, &label) in rows.iter().zip(labels) {
                let error = self.probability(row) - label;
                for (weight, &x) in self.weights.iter_mut().zip(row) {
                    *weight -= self.learning_rate * error * x;
                }
                self.bias -= self.learning_rate * error;
            }
        }

        debug!(rows = rows.len(), width, "fitted logistic model");
        Ok(())
    }

    fn predict_probability(&self, features: &RecordBatch) -> Result<Vec<f64>> {
        if features.num_columns() != self.weights.len() {
            return Err(anyhow!(
                "feature batch has {} columns but the model was trained on {}",
                features.num_columns(),
                self.weights.len()
            ));
        }
        let rows = batch_rows(features)?;
        Ok(rows.iter().map(|row| self.probability(row)).collect())
    }
}

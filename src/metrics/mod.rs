pub mod classification;
pub mod regression;

pub use classification::ClassificationMetrics;
pub use regression::RegressionMetrics;

use crate::error::{Result, SymbindError};
use serde::{Deserialize, Serialize};

/// Metrics the fitting engine accepts by name, computable locally as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Mae,
    Mse,
    Rmse,
    R2,
    Pearson,
    Accuracy,
    LogLoss,
}

/// A metric, optionally negated (`neg_` prefix) so that a bigger-is-better
/// score can be minimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metric {
    pub kind: MetricKind,
    pub negated: bool,
}

impl Metric {
    pub fn parse(name: &str) -> Result<Self> {
        let (negated, base) = match name.strip_prefix("neg_") {
            Some(base) => (true, base),
            None => (false, name),
        };
        let kind = match base {
            "mae" => MetricKind::Mae,
            "mse" => MetricKind::Mse,
            "rmse" => MetricKind::Rmse,
            "r2" => MetricKind::R2,
            "pearson" => MetricKind::Pearson,
            "accuracy" => MetricKind::Accuracy,
            "logloss" => MetricKind::LogLoss,
            _ => {
                return Err(SymbindError::Metric(format!(
                    "Unknown metric name '{}'. Valid: mae, mse, rmse, r2, pearson, accuracy, logloss (optionally prefixed with neg_)",
                    name
                )))
            }
        };
        Ok(Self { kind, negated })
    }

    pub fn name(&self) -> String {
        let base = match self.kind {
            MetricKind::Mae => "mae",
            MetricKind::Mse => "mse",
            MetricKind::Rmse => "rmse",
            MetricKind::R2 => "r2",
            MetricKind::Pearson => "pearson",
            MetricKind::Accuracy => "accuracy",
            MetricKind::LogLoss => "logloss",
        };
        if self.negated {
            format!("neg_{}", base)
        } else {
            base.to_string()
        }
    }

    pub fn classification(&self) -> bool {
        matches!(self.kind, MetricKind::Accuracy | MetricKind::LogLoss)
    }

    pub fn needs_probabilities(&self) -> bool {
        self.kind == MetricKind::LogLoss
    }

    pub fn bigger_is_better(&self) -> bool {
        let base = matches!(
            self.kind,
            MetricKind::R2 | MetricKind::Pearson | MetricKind::Accuracy
        );
        base != self.negated
    }

    pub fn score(&self, y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        if y_true.len() != y_pred.len() {
            return Err(SymbindError::Metric(format!(
                "mismatched lengths: {} true values, {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(SymbindError::Metric("cannot score an empty sample".to_string()));
        }
        let value = match self.kind {
            MetricKind::Mae => RegressionMetrics::mae(y_true, y_pred),
            MetricKind::Mse => RegressionMetrics::mse(y_true, y_pred),
            MetricKind::Rmse => RegressionMetrics::rmse(y_true, y_pred),
            MetricKind::R2 => RegressionMetrics::r2(y_true, y_pred),
            MetricKind::Pearson => RegressionMetrics::pearson(y_true, y_pred),
            MetricKind::Accuracy => ClassificationMetrics::accuracy(y_true, y_pred),
            MetricKind::LogLoss => ClassificationMetrics::log_loss(y_true, y_pred),
        };
        Ok(if self.negated { -value } else { value })
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

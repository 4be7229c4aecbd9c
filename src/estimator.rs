//! Fit/predict façade over a fitting engine and the local evaluator.

use crate::config::{ConfigSection, Hyperparameters};
use crate::data::{split_frame, Matrix, ProgramCache};
use crate::error::{Result, SymbindError};
use crate::ffi::{Engine, FitRequest};
use crate::marshal::{ForeignMatrix, ForeignSliceMut};
use crate::metrics::ClassificationMetrics;
use crate::program::{DisplayFormat, Program};
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// State kept after a successful fit.
#[derive(Debug, Clone)]
pub struct FittedProgram {
    pub program: Arc<Program>,
    pub feature_names: Vec<String>,
    pub seed: i64,
    pub fitted_at: DateTime<Utc>,
    /// Engine-side model backing [`Estimator::predict_foreign`]; `None` when
    /// restored from an exported model.
    pub engine_model: Option<u64>,
}

/// Serializable snapshot of a fitted estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub program: String,
    pub feature_names: Vec<String>,
    pub hyperparameters: Hyperparameters,
    pub seed: i64,
    pub fitted_at: DateTime<Utc>,
}

impl FittedModel {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

pub struct Estimator<E: Engine> {
    hyperparameters: Hyperparameters,
    engine: Arc<E>,
    cache: ProgramCache,
    fitted: Option<FittedProgram>,
}

fn default_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("X{}", i)).collect()
}

impl<E: Engine> Estimator<E> {
    pub fn new(hyperparameters: Hyperparameters, engine: Arc<E>) -> Self {
        Self {
            hyperparameters,
            engine,
            cache: ProgramCache::default(),
            fitted: None,
        }
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn fitted(&self) -> Option<&FittedProgram> {
        self.fitted.as_ref()
    }

    /// The fitted program.
    pub fn program(&self) -> Result<&Program> {
        self.fitted
            .as_ref()
            .map(|f| f.program.as_ref())
            .ok_or(SymbindError::NotFitted)
    }

    /// Fits a program to sample-major `x` and targets `y`.
    ///
    /// Feature names default to `X0..Xn`. On any error the previously
    /// fitted program, if any, is kept.
    pub fn fit(
        &mut self,
        x: &Matrix,
        y: &[f64],
        feature_names: Option<&[String]>,
    ) -> Result<&Program> {
        self.hyperparameters.validate()?;
        if x.is_empty() {
            return Err(SymbindError::Marshal("cannot fit on an empty dataset".to_string()));
        }
        if y.len() != x.n_rows() {
            return Err(SymbindError::Marshal(format!(
                "{} rows in X but {} targets",
                x.n_rows(),
                y.len()
            )));
        }
        let names = match feature_names {
            Some(names) if names.len() != x.n_cols() => {
                return Err(SymbindError::Marshal(format!(
                    "{} columns in X but {} feature names",
                    x.n_cols(),
                    names.len()
                )));
            }
            Some(names) => names.to_vec(),
            None => default_names(x.n_cols()),
        };

        let seed = self.hyperparameters.resolve_seed();
        let feature_major = x.transpose();
        let request = FitRequest::new(&feature_major, y, &names, &self.hyperparameters, seed)?;

        log::info!(
            "Fitting on {} samples x {} features (seed {})",
            x.n_rows(),
            x.n_cols(),
            seed
        );
        let outcome = self.engine.fit(&request)?;
        let text = outcome.program;

        let program = self
            .cache
            .get_or_try_insert(&cache_key(&text, &names), || {
                Program::parse_with_names(&text, &names)
            })
            .map_err(|e| {
                log::error!("Engine returned a malformed program '{}': {}", text, e);
                e
            })?;
        log::info!("Fitted program: {}", program.display(DisplayFormat::Infix));

        let fitted = self.fitted.insert(FittedProgram {
            program,
            feature_names: names,
            seed,
            fitted_at: Utc::now(),
            engine_model: outcome.model,
        });
        Ok(fitted.program.as_ref())
    }

    /// Fits on a data frame, using every column except `target` as a feature.
    pub fn fit_frame(&mut self, df: &DataFrame, target: &str) -> Result<&Program> {
        let (x, y, names) = split_frame(df, target)?;
        self.fit(&x, &y, Some(&names))
    }

    /// Evaluates the fitted program on every row of `x`.
    pub fn predict(&self, x: &Matrix) -> Result<Vec<f64>> {
        self.program()?.evaluate(x)
    }

    /// Probabilities of class 1 for classification programs.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Vec<f64>> {
        Ok(ClassificationMetrics::sigmoid(&self.predict(x)?))
    }

    /// Predicts through the engine's own predict entry point instead of the
    /// local evaluator.
    ///
    /// The engine predicts with the model of its own latest fit, so this is
    /// refused once the engine has been refit by anyone else, and for
    /// estimators restored with [`Estimator::from_model`].
    pub fn predict_foreign(&self, x: &Matrix, predict_proba: bool) -> Result<Vec<f64>> {
        let fitted = self.fitted.as_ref().ok_or(SymbindError::NotFitted)?;
        if !self.engine.supports_predict() {
            return Err(SymbindError::Library(
                "engine does not support prediction".to_string(),
            ));
        }
        let feature_major = x.transpose();
        let view = ForeignMatrix::from_matrix(&feature_major);
        let mut buffer = vec![0.0; x.n_rows()];
        let mut out = ForeignSliceMut::new(&mut buffer);
        self.engine
            .predict(fitted.engine_model, &view, predict_proba, &mut out)?;
        Ok(buffer)
    }

    /// Scores predictions on `x` against `y` with the evaluation metric.
    pub fn score(&self, x: &Matrix, y: &[f64]) -> Result<f64> {
        let metric = self.hyperparameters.eval()?;
        let raw = self.predict(x)?;
        let predictions = if metric.needs_probabilities() {
            ClassificationMetrics::sigmoid(&raw)
        } else if metric.classification() {
            ClassificationMetrics::labels(&ClassificationMetrics::sigmoid(&raw))
        } else {
            raw
        };
        metric.score(y, &predictions)
    }

    pub fn export_model(&self) -> Result<FittedModel> {
        let fitted = self.fitted.as_ref().ok_or(SymbindError::NotFitted)?;
        Ok(FittedModel {
            program: fitted.program.source().to_string(),
            feature_names: fitted.feature_names.clone(),
            hyperparameters: self.hyperparameters.clone(),
            seed: fitted.seed,
            fitted_at: fitted.fitted_at,
        })
    }

    /// Restores a fitted estimator without calling the engine.
    pub fn from_model(model: FittedModel, engine: Arc<E>) -> Result<Self> {
        let program = Program::parse_with_names(&model.program, &model.feature_names)?;
        let mut estimator = Self::new(model.hyperparameters, engine);
        estimator.fitted = Some(FittedProgram {
            program: Arc::new(program),
            feature_names: model.feature_names,
            seed: model.seed,
            fitted_at: model.fitted_at,
            engine_model: None,
        });
        Ok(estimator)
    }
}

fn cache_key(text: &str, names: &[String]) -> String {
    format!("{}\u{1f}{}", names.join(","), text)
}

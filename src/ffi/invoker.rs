//! The single adapter between a typed fit request and the engine's flat
//! argument list.

use super::abi::{FitFn, FreeStringFn, PredictFn};
use super::library::ForeignEngine;
use crate::config::Hyperparameters;
use crate::data::Matrix;
use crate::error::{Result, SymbindError};
use crate::marshal::{take_foreign_string, ForeignMatrix, ForeignSlice, ForeignSliceMut, ForeignStr, ForeignStrList};
use crate::program::FunctionRegistry;
use std::sync::Arc;

/// What one fit call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    /// Text of the best program.
    pub program: String,
    /// Engine-side model that [`Engine::predict`] runs, for engines that keep
    /// one between calls.
    pub model: Option<u64>,
}

impl FitOutcome {
    /// An outcome with no engine-side model.
    pub fn program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model: None,
        }
    }
}

/// Something that can fit a program and, optionally, predict with it.
pub trait Engine: Send + Sync {
    /// Runs the search and returns the best program.
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitOutcome>;

    /// Whether [`Engine::predict`] is available.
    fn supports_predict(&self) -> bool {
        false
    }

    /// Fills `out` with one prediction per sample of the feature-major `x`,
    /// using the engine-side `model` a previous fit returned.
    fn predict(
        &self,
        _model: Option<u64>,
        _x: &ForeignMatrix<'_>,
        _predict_proba: bool,
        _out: &mut ForeignSliceMut<'_>,
    ) -> Result<()> {
        Err(SymbindError::Library(
            "engine does not support prediction".to_string(),
        ))
    }
}

impl<E: Engine + ?Sized> Engine for &E {
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitOutcome> {
        (**self).fit(request)
    }

    fn supports_predict(&self) -> bool {
        (**self).supports_predict()
    }

    fn predict(
        &self,
        model: Option<u64>,
        x: &ForeignMatrix<'_>,
        predict_proba: bool,
        out: &mut ForeignSliceMut<'_>,
    ) -> Result<()> {
        (**self).predict(model, x, predict_proba, out)
    }
}

impl<E: Engine + ?Sized> Engine for Arc<E> {
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitOutcome> {
        (**self).fit(request)
    }

    fn supports_predict(&self) -> bool {
        (**self).supports_predict()
    }

    fn predict(
        &self,
        model: Option<u64>,
        x: &ForeignMatrix<'_>,
        predict_proba: bool,
        out: &mut ForeignSliceMut<'_>,
    ) -> Result<()> {
        (**self).predict(model, x, predict_proba, out)
    }
}

/// Marshaled inputs of one fit call. Borrows everything it points at.
#[derive(Debug)]
pub struct FitRequest<'a> {
    /// Feature-major: one row per feature, one column per sample.
    pub x: ForeignMatrix<'a>,
    pub y: ForeignSlice<'a>,
    pub names: ForeignStrList<'a>,
    pub hyperparameters: &'a Hyperparameters,
    /// Resolved evaluation metric name.
    pub eval_metric: String,
    /// Function set with canonical names, as the engine parses it.
    pub funcs: String,
    pub seed: i64,
}

impl<'a> FitRequest<'a> {
    /// Validates shapes and builds the request. `x` must already be
    /// feature-major.
    pub fn new(
        x: &'a Matrix,
        y: &'a [f64],
        names: &'a [String],
        hyperparameters: &'a Hyperparameters,
        seed: i64,
    ) -> Result<Self> {
        if x.n_rows() != names.len() {
            return Err(SymbindError::Marshal(format!(
                "{} feature columns but {} feature names",
                x.n_rows(),
                names.len()
            )));
        }
        if x.n_rows() > 0 && x.n_cols() != y.len() {
            return Err(SymbindError::Marshal(format!(
                "{} samples in X but {} targets",
                x.n_cols(),
                y.len()
            )));
        }
        let eval_metric = hyperparameters.eval()?.name();
        let funcs = FunctionRegistry::global().canonical_function_set(&hyperparameters.funcs)?;

        Ok(Self {
            x: ForeignMatrix::from_matrix(x),
            y: ForeignSlice::new(y),
            names: ForeignStrList::new(names),
            hyperparameters,
            eval_metric,
            funcs,
            seed,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.y.len()
    }

    pub fn n_features(&self) -> usize {
        self.x.n_rows()
    }
}

fn int(name: &str, value: usize) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| SymbindError::Marshal(format!("{} = {} does not fit in 64 bits", name, value)))
}

/// Spreads `request` over the engine's positional parameters, calls `fit`
/// and copies the returned text out of foreign memory.
pub fn invoke_fit(
    fit: FitFn,
    free_string: Option<FreeStringFn>,
    request: &FitRequest<'_>,
) -> Result<String> {
    let hp = request.hyperparameters;
    let max_height = int("max_height", hp.max_height)?;
    let min_height = int("min_height", hp.min_height)?;
    let n_generations = int("n_generations", hp.n_generations)?;
    let n_populations = int("n_populations", hp.n_populations)?;
    let n_rounds = int("n_rounds", hp.n_rounds)?;
    let population_size = int("population_size", hp.population_size)?;
    let tuning_n_generations = int("tuning_n_generations", hp.tuning_n_generations)?;

    log::debug!(
        "Calling fit with {} samples, {} features, seed {}",
        request.n_samples(),
        request.n_features(),
        request.seed
    );

    // SAFETY: every view borrows from `request`, which outlives the call;
    // the engine only reads them.
    let raw = unsafe {
        fit(
            request.x.as_raw(),
            request.y,
            request.names.as_raw(),
            hp.const_max,
            hp.const_min,
            ForeignStr::new(&request.eval_metric),
            ForeignStr::new(&request.funcs),
            ForeignStr::new(&hp.loss_metric),
            max_height,
            min_height,
            n_generations,
            n_populations,
            n_rounds,
            hp.p_constant,
            hp.p_full,
            hp.p_hoist_mutation,
            hp.p_point_mutation,
            hp.p_subtree_crossover,
            hp.p_subtree_mutation,
            hp.p_terminal,
            hp.parsimony_coeff,
            hp.point_mutation_rate,
            population_size,
            request.seed,
            tuning_n_generations,
            hp.verbose,
        )
    };

    // SAFETY: `raw` is null or a NUL-terminated string owned by the engine.
    let text = unsafe { take_foreign_string(raw) };
    if let Some(free) = free_string {
        if !raw.is_null() {
            // SAFETY: `raw` came from this engine and was copied above.
            unsafe { free(raw) };
        }
    }

    text?.ok_or_else(|| SymbindError::FitFailed("engine returned no program".to_string()))
}

/// Calls `predict`, checking that `out` holds one slot per sample.
pub fn invoke_predict(
    predict: PredictFn,
    x: &ForeignMatrix<'_>,
    predict_proba: bool,
    out: &mut ForeignSliceMut<'_>,
) -> Result<()> {
    if x.n_rows() > 0 && x.n_cols() != out.len() {
        return Err(SymbindError::Marshal(format!(
            "{} samples in X but output holds {}",
            x.n_cols(),
            out.len()
        )));
    }
    // SAFETY: the engine writes at most `out.len()` values through the view.
    unsafe { predict(x.as_raw(), predict_proba, out.reborrow()) };
    Ok(())
}

impl Engine for ForeignEngine {
    /// The engine keeps only the model of its latest fit, so every call
    /// retires the model returned before it, whether or not it succeeds.
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitOutcome> {
        let mut latest = self.latest_model()?;
        *latest += 1;
        let program = invoke_fit(self.fit, self.free_string, request)?;
        Ok(FitOutcome {
            program,
            model: Some(*latest),
        })
    }

    fn supports_predict(&self) -> bool {
        self.predict.is_some()
    }

    fn predict(
        &self,
        model: Option<u64>,
        x: &ForeignMatrix<'_>,
        predict_proba: bool,
        out: &mut ForeignSliceMut<'_>,
    ) -> Result<()> {
        let predict = self.predict.ok_or_else(|| {
            SymbindError::Library(format!("'{}' does not export Predict", self.origin()))
        })?;
        let model = model.ok_or(SymbindError::NotFitted)?;
        // Held across the call so no fit can swap the model underneath it.
        let latest = self.latest_model()?;
        if *latest != model {
            return Err(SymbindError::Library(format!(
                "'{}' has been refit since model {}; its Predict would run model {}",
                self.origin(),
                model,
                *latest
            )));
        }
        invoke_predict(predict, x, predict_proba, out)
    }
}

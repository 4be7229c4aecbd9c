//! Exact signatures of the engine's exported entry points.
//!
//! Parameter order and widths are part of the binary contract: every integer
//! is 64-bit, every bound/probability a double, strings are `{data, len}`
//! views and arrays `{data, len, cap}` headers. Nothing outside
//! [`super::invoker`] calls these directly.

use crate::marshal::{ForeignSlice, ForeignSliceMut, ForeignStr, RawMatrix, RawStrList};
use std::ffi::c_char;

/// Exported symbol names.
pub const FIT_SYMBOL: &str = "Fit";
pub const PREDICT_SYMBOL: &str = "Predict";
pub const FREE_STRING_SYMBOL: &str = "FreeString";

/// Fits a program. Returns a NUL-terminated program text, or null/empty on
/// failure.
pub type FitFn = unsafe extern "C" fn(
    x: RawMatrix<'_>,
    y: ForeignSlice<'_>,
    x_names: RawStrList<'_>,
    const_max: f64,
    const_min: f64,
    eval_metric: ForeignStr<'_>,
    funcs: ForeignStr<'_>,
    loss_metric: ForeignStr<'_>,
    max_height: i64,
    min_height: i64,
    n_generations: i64,
    n_populations: i64,
    n_rounds: i64,
    p_constant: f64,
    p_full: f64,
    p_hoist_mutation: f64,
    p_point_mutation: f64,
    p_subtree_crossover: f64,
    p_subtree_mutation: f64,
    p_terminal: f64,
    parsimony_coeff: f64,
    point_mutation_rate: f64,
    population_size: i64,
    seed: i64,
    tuning_n_generations: i64,
    verbose: bool,
) -> *mut c_char;

/// Predicts with the engine's last fitted model, writing one value per
/// sample into `y_pred`.
pub type PredictFn =
    unsafe extern "C" fn(x: RawMatrix<'_>, predict_proba: bool, y_pred: ForeignSliceMut<'_>);

/// Releases a string previously returned by [`FitFn`].
pub type FreeStringFn = unsafe extern "C" fn(text: *mut c_char);

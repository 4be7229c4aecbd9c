//! Bindings to a foreign symbolic-regression engine and a safe evaluator
//! for the programs it returns.

pub mod config;
pub mod data;
pub mod error;
pub mod estimator;
pub mod ffi;
pub mod marshal;
pub mod metrics;
pub mod program;

pub use config::{ConfigManager, Hyperparameters};
pub use data::Matrix;
pub use error::{Result, SymbindError};
pub use estimator::{Estimator, FittedModel};
pub use ffi::{Engine, ForeignEngine};
pub use program::{evaluate, DisplayFormat, Program};

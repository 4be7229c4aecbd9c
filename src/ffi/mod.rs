//! Calling into the foreign fitting engine.

pub mod abi;
pub mod invoker;
pub mod library;

pub use abi::{FitFn, FreeStringFn, PredictFn};
pub use invoker::{invoke_fit, invoke_predict, Engine, FitOutcome, FitRequest};
pub use library::{ForeignEngine, NativeLibrary};

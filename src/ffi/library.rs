//! Shared-library loading and the process-wide engine handle.

use super::abi::{FitFn, FreeStringFn, PredictFn, FIT_SYMBOL, FREE_STRING_SYMBOL, PREDICT_SYMBOL};
use crate::error::{Result, SymbindError};
use libloading::Library;
use once_cell::sync::OnceCell;
use std::ffi::CString;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// A loaded native library.
pub struct NativeLibrary {
    library: Library,
    /// Path to the library (for messages)
    path: String,
}

impl NativeLibrary {
    /// Load a native library from a path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // SAFETY: loading runs the library's initializers; the engine
        // library is trusted by whoever configured its path.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            SymbindError::Library(format!("Failed to load library '{}': {}", path.display(), e))
        })?;

        Ok(Self {
            library,
            path: path.display().to_string(),
        })
    }

    /// Resolve a function pointer.
    ///
    /// # Safety
    ///
    /// `F` must match the actual signature of the exported symbol, and the
    /// returned pointer must not be called after this library is dropped.
    pub unsafe fn get_function<F: Copy>(&self, name: &str) -> Result<F> {
        let c_name = CString::new(name)
            .map_err(|_| SymbindError::Library(format!("Invalid function name: {}", name)))?;

        self.library
            .get::<F>(c_name.as_bytes_with_nul())
            .map(|symbol| *symbol)
            .map_err(|e| {
                SymbindError::Library(format!(
                    "Function '{}' not found in '{}': {}",
                    name, self.path, e
                ))
            })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Resolved entry points of a fitting engine.
pub struct ForeignEngine {
    pub(crate) fit: FitFn,
    pub(crate) predict: Option<PredictFn>,
    pub(crate) free_string: Option<FreeStringFn>,
    /// Number of fits issued so far; the engine's current model carries
    /// this number. Zero until the first fit.
    latest_model: Mutex<u64>,
    origin: String,
    // Keeps the symbols above valid; declared last so it drops last.
    _library: Option<NativeLibrary>,
}

static ENGINE: OnceCell<ForeignEngine> = OnceCell::new();

impl ForeignEngine {
    /// Loads the library at `path` and resolves its entry points. `Fit` is
    /// required; `Predict` and `FreeString` are optional.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let library = NativeLibrary::load(path)?;

        // SAFETY: the aliases in `abi` are the engine's exported signatures,
        // and the pointers are stored next to the library that owns them.
        let fit = unsafe { library.get_function::<FitFn>(FIT_SYMBOL)? };
        let predict = unsafe { library.get_function::<PredictFn>(PREDICT_SYMBOL) }.ok();
        let free_string = unsafe { library.get_function::<FreeStringFn>(FREE_STRING_SYMBOL) }.ok();

        if predict.is_none() {
            log::warn!("'{}' does not export {}; only local prediction is available", library.path(), PREDICT_SYMBOL);
        }
        if free_string.is_none() {
            log::warn!("'{}' does not export {}; returned programs are not released", library.path(), FREE_STRING_SYMBOL);
        }
        log::info!("Loaded fitting engine from '{}'", library.path());

        Ok(Self {
            fit,
            predict,
            free_string,
            latest_model: Mutex::new(0),
            origin: library.path().to_string(),
            _library: Some(library),
        })
    }

    /// Builds an engine from entry points that are already linked into the
    /// process.
    pub fn from_symbols(
        fit: FitFn,
        predict: Option<PredictFn>,
        free_string: Option<FreeStringFn>,
    ) -> Self {
        Self {
            fit,
            predict,
            free_string,
            latest_model: Mutex::new(0),
            origin: "<linked>".to_string(),
            _library: None,
        }
    }

    /// Initializes the process-wide engine from `path` on first use.
    ///
    /// Later calls with the same path return the same handle without
    /// reloading; a different path is an error.
    pub fn init(path: impl AsRef<Path>) -> Result<&'static ForeignEngine> {
        let path = path.as_ref();
        let engine = ENGINE.get_or_try_init(|| ForeignEngine::load(path))?;
        let requested = path.display().to_string();
        if engine.origin != requested {
            return Err(SymbindError::Library(format!(
                "engine already initialized from '{}', refusing to load '{}'",
                engine.origin, requested
            )));
        }
        Ok(engine)
    }

    /// Installs an already-built engine as the process-wide handle.
    pub fn install(engine: ForeignEngine) -> Result<&'static ForeignEngine> {
        let origin = engine.origin.clone();
        ENGINE.set(engine).map_err(|_| {
            SymbindError::Library(format!(
                "engine already initialized, refusing to install '{}'",
                origin
            ))
        })?;
        Self::global()
    }

    /// The process-wide engine, once initialized.
    pub fn global() -> Result<&'static ForeignEngine> {
        ENGINE
            .get()
            .ok_or_else(|| SymbindError::Library("engine has not been initialized".to_string()))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub(crate) fn latest_model(&self) -> Result<MutexGuard<'_, u64>> {
        self.latest_model
            .lock()
            .map_err(|_| SymbindError::Library(format!("'{}' model lock poisoned", self.origin)))
    }
}

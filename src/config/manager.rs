use super::{hyperparameters::Hyperparameters, traits::ConfigSection};
use crate::error::SymbindError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix of environment variables overriding hyperparameters,
/// e.g. `SYMBIND_POPULATION_SIZE=200`.
pub const ENV_PREFIX: &str = "SYMBIND";

pub struct ConfigManager {
    config: Arc<RwLock<Hyperparameters>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(Hyperparameters::default())),
        }
    }

    /// Layers defaults, an optional TOML file and `SYMBIND_*` variables.
    pub fn resolve(path: Option<&Path>) -> Result<Hyperparameters, SymbindError> {
        Self::resolve_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    pub(crate) fn resolve_with_env(
        path: Option<&Path>,
        env: Environment,
    ) -> Result<Hyperparameters, SymbindError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        let settings = builder
            .add_source(env.try_parsing(true))
            .build()
            .map_err(|e| SymbindError::Configuration(format!("Failed to read config: {}", e)))?;

        let hyperparameters = settings
            .try_deserialize::<Hyperparameters>()
            .map_err(|e| SymbindError::Configuration(format!("Failed to parse config: {}", e)))?
            .validated()?;
        log::debug!("Resolved hyperparameters: {:?}", hyperparameters);
        Ok(hyperparameters)
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SymbindError> {
        let hyperparameters = Self::resolve(Some(path.as_ref()))?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = hyperparameters;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SymbindError> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| SymbindError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| SymbindError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> Hyperparameters {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Applies `f` and keeps the result only if it validates.
    pub fn update<F>(&self, f: F) -> Result<(), SymbindError>
    where
        F: FnOnce(&mut Hyperparameters),
    {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

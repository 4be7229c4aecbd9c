pub mod hyperparameters;
pub mod manager;
pub mod traits;

pub use hyperparameters::Hyperparameters;
pub use manager::{ConfigManager, ENV_PREFIX};
pub use traits::{ConfigManifest, ConfigSection, FieldManifest};

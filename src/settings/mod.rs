pub mod settings_model;
pub mod settings_repository;

pub use settings_model::{ForexSettings, ForexSettingsUpdate, FxSetting};
pub use settings_repository::{SettingsRepository, SettingsRepositoryTrait};

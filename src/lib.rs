pub mod db;

pub mod errors;
pub mod fx;
pub mod providers;
pub mod schema;
pub mod settings;

pub use errors::{Error, Result};
pub use fx::{ForexService, ForexServiceTrait, RateHistoryRepository, RateRecord};
pub use settings::{ForexSettings, SettingsRepository};

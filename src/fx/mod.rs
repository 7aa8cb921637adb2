pub mod fx_cache;
pub mod fx_model;
pub mod fx_repository;
pub mod fx_service;
pub mod fx_traits;

pub use fx_cache::{RateCache, HISTORICAL_WINDOW_DAYS};
pub use fx_model::RateRecord;
pub use fx_repository::RateHistoryRepository;
pub use fx_service::{ForexService, DEFAULT_VALID_WITHIN_HOURS};
pub use fx_traits::{ForexServiceTrait, RateHistoryRepositoryTrait};

pub mod currency_layer;
pub mod rate_provider;
pub mod strike_iron;

pub use currency_layer::CurrencyLayerClient;
pub use rate_provider::{select_provider, RateProvider, SelectedProvider};
pub use strike_iron::StrikeIronClient;

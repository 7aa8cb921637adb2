use diesel::result::Error as DieselError;
use thiserror::Error;

// Create a type alias for Result using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the foreign exchange module
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),

    #[error("Rate provider operation failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Rate cache error: {0}")]
    Cache(String),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(#[from] diesel::result::ConnectionError),

    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(#[from] r2d2::Error),

    #[error("Database query failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Errors surfaced by the rate providers. Transport and provider-reported
/// errors carry the remote-supplied text verbatim; none are retried.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Api(String),

    #[error("Failed to parse rate value: {0}")]
    Parse(String),

    #[error("no rates returned")]
    NoRates,
}

// Implement From for DieselError to Error directly
impl From<DieselError> for Error {
    fn from(err: DieselError) -> Self {
        Error::Database(DatabaseError::QueryFailed(err))
    }
}

impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Error::Database(DatabaseError::PoolCreationFailed(e))
    }
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

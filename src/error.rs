use thiserror::Error;

/// Why a single raw record was rejected by the normalizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid year for {field}: {value} (expected 1900..=2030)")]
    YearOutOfRange { field: &'static str, value: f64 },

    #[error("Negative value for {field}: {value}")]
    Negative { field: &'static str, value: f64 },
}

/// A computed sector aggregate that failed its own invariants.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Aggregate for sector '{sector}' violates invariants: {}", violations.join("; "))]
pub struct AggregateInvariantError {
    pub sector: String,
    pub violations: Vec<String>,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {message}")]
    Backend { message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    /// The aggregate table is empty; nothing has been aggregated yet.
    #[error("No market data available")]
    NoData,

    #[error("No data for sector '{0}'")]
    UnknownSector(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GroceryError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{file}: missing expected column '{column}'")]
    MissingColumn { file: String, column: String },

    #[error("{file}: row {row}: unparseable timestamp '{value}'")]
    InvalidTimestamp { file: String, row: u64, value: String },

    #[error("{file}: row {row}: invalid value '{value}' in column '{column}'")]
    InvalidField {
        file: String,
        row: u64,
        column: String,
        value: String,
    },

    #[error("No shard files found in '{dir}'")]
    NoShards { dir: String },

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("View '{name}' not found")]
    UnknownView { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GroceryError {
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type GroceryResult<T> = Result<T, GroceryError>;

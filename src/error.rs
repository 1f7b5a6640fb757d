//! Error types for the DFS lineup optimization core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OptimizerError>;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("invalid contest: {0}")]
    InvalidContest(String),

    #[error("invalid player pool: {0}")]
    InvalidPool(String),

    #[error("no feasible lineup found in salary envelope [{floor}, {cap}]")]
    Infeasible { floor: u32, cap: u32 },

    #[error("optimization cancelled before a complete lineup was produced")]
    Cancelled,

    #[error("conflicting configuration: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("cache error: {message}")]
    Cache { message: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("player data provider error: {0}")]
    Provider(String),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for OptimizerError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        OptimizerError::Cache {
            message: err.to_string(),
        }
    }
}

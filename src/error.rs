use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No sheets found in workbook")]
    NoSheets,

    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    /// The loaded data has no rows the pipeline could work on. Kept apart from a
    /// dashboard that ran and simply produced zero charts.
    #[error("No usable data: {0}")]
    NoUsableData(String),

    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

use thiserror::Error;

/// Convenient alias for fallible results returned by the attendance engine
/// and its report writers.
pub type Result<T> = std::result::Result<T, AttendanceError>;

/// Failure cases raised while aggregating attendance or writing reports.
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// An event record could not be interpreted, e.g. it has no usable time.
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    /// Wrapper for IO failures such as reading caches or writing reports.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised by the tab-separated report writer.
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the spreadsheet writer.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}

impl AttendanceError {
    pub fn invalid_record(id: impl Into<String>, reason: impl Into<String>) -> Self {
        AttendanceError::InvalidRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

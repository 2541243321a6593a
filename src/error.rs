// 🚨 Ingestion Errors
// Three categories, each surfaced to the user with the offending resource

use thiserror::Error;

/// Error category, used by front ends to pick a corrective message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    MissingSource,
    MalformedData,
    UnexpectedIngestion,
}

impl ErrorCategory {
    pub fn name(&self) -> &str {
        match self {
            ErrorCategory::MissingSource => "MissingSourceError",
            ErrorCategory::MalformedData => "MalformedDataError",
            ErrorCategory::UnexpectedIngestion => "UnexpectedIngestionError",
        }
    }
}

/// IngestionError - everything that can abort a dataset load
///
/// Raised only while loading. Filtering and aggregation never fail; they
/// degrade to empty sections instead.
#[derive(Error, Debug)]
pub enum IngestionError {
    /// A required file or named sheet is absent
    #[error("required source not found: {identifier}")]
    MissingSource { identifier: String },

    /// A value failed the repair/parse pipeline, or a sheet has the wrong shape
    #[error("malformed data in {identifier}: {detail}")]
    MalformedData { identifier: String, detail: String },

    /// Any other loading failure (I/O, unreadable workbook, invalid geometry)
    #[error("unexpected ingestion failure: {detail}")]
    UnexpectedIngestion { detail: String },
}

impl IngestionError {
    pub fn missing(identifier: impl Into<String>) -> Self {
        IngestionError::MissingSource {
            identifier: identifier.into(),
        }
    }

    pub fn malformed(identifier: impl Into<String>, detail: impl Into<String>) -> Self {
        IngestionError::MalformedData {
            identifier: identifier.into(),
            detail: detail.into(),
        }
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        IngestionError::UnexpectedIngestion {
            detail: detail.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            IngestionError::MissingSource { .. } => ErrorCategory::MissingSource,
            IngestionError::MalformedData { .. } => ErrorCategory::MalformedData,
            IngestionError::UnexpectedIngestion { .. } => ErrorCategory::UnexpectedIngestion,
        }
    }

    /// Corrective message shown in place of the whole view
    pub fn user_message(&self) -> String {
        match self {
            IngestionError::MissingSource { identifier } => format!(
                "Could not find '{}'. Check that every data file and sheet named in the configuration exists.",
                identifier
            ),
            IngestionError::MalformedData { identifier, detail } => format!(
                "The data in '{}' could not be read ({}). Fix the value or the sheet layout and reload.",
                identifier, detail
            ),
            IngestionError::UnexpectedIngestion { detail } => {
                format!("An unexpected error occurred while loading the data: {}", detail)
            }
        }
    }
}

impl From<std::io::Error> for IngestionError {
    fn from(err: std::io::Error) -> Self {
        IngestionError::unexpected(format!("I/O error: {}", err))
    }
}

impl From<csv::Error> for IngestionError {
    fn from(err: csv::Error) -> Self {
        IngestionError::unexpected(format!("CSV error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            IngestionError::missing("cidades.csv").category(),
            ErrorCategory::MissingSource
        );
        assert_eq!(
            IngestionError::malformed("IDH", "not a number").category(),
            ErrorCategory::MalformedData
        );
        assert_eq!(
            IngestionError::unexpected("boom").category(),
            ErrorCategory::UnexpectedIngestion
        );
    }

    #[test]
    fn test_user_message_names_resource() {
        let err = IngestionError::missing("Empresas por segmento");
        assert!(err.user_message().contains("Empresas por segmento"));

        let err = IngestionError::malformed("cidades.csv:IDH (IBGE/2010) row 3", "'abc'");
        let msg = err.user_message();
        assert!(msg.contains("IDH (IBGE/2010)"));
        assert!(msg.contains("'abc'"));
    }

    #[test]
    fn test_io_error_is_unexpected() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: IngestionError = io.into();
        assert_eq!(err.category(), ErrorCategory::UnexpectedIngestion);
        assert_eq!(ErrorCategory::UnexpectedIngestion.name(), "UnexpectedIngestionError");
    }
}

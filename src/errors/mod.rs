use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum TwinError {
    #[error("Store Error: {0}")]
    Store(String),

    #[error("Import Error: {0}")]
    Import(String),

    #[error("Invalid input for {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Template Error: {0}")]
    Template(#[from] tera::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

impl TwinError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::Import(message.into())
    }

    /// Whether the caller supplied bad input, as opposed to a failure on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::Import(_))
    }
}

// Result type alias for convenience
pub type TwinResult<T> = Result<T, TwinError>;

// Logs the failure with the operation name and passes the result through
#[macro_export]
macro_rules! with_context {
    ($result:expr, $operation:expr) => {
        $result.map_err(|e| {
            tracing::error!(
                error = %e,
                operation = $operation,
                source_location = std::file!(),
                "Operation failed"
            );
            e
        })
    };
}

pub fn log_error(operation: &str, err: &TwinError) {
    error!(error = %err, operation, "Request failed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let err = TwinError::invalid("days", "must be between 1 and 365");
        assert_eq!(
            err.to_string(),
            "Invalid input for days: must be between 1 and 365"
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_error_is_server_side() {
        let err = TwinError::Store("lock poisoned".into());
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("lock poisoned"));
    }

    #[test]
    fn test_with_context_passes_error_through() {
        let result: TwinResult<()> = Err(TwinError::import("bad header"));
        let passed = with_context!(result, "import");
        assert!(matches!(passed, Err(TwinError::Import(_))));
    }
}

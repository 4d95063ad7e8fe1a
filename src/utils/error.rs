use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Line {line}: {reason}")]
    ValidationError { line: usize, reason: String },

    #[error("Failed to launch job {job}: {source}")]
    LaunchError {
        job: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Batch run was cancelled")]
    Cancelled,
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BatchError {
    /// 建立單行驗證錯誤
    pub fn invalid_line(line: usize, reason: impl Into<String>) -> Self {
        BatchError::ValidationError {
            line,
            reason: reason.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BatchError::ValidationError { .. } => ErrorSeverity::Low,
            BatchError::LaunchError { .. } | BatchError::Cancelled => ErrorSeverity::Medium,
            BatchError::ConfigValidationError { .. }
            | BatchError::InvalidConfigValueError { .. }
            | BatchError::MissingConfigError { .. } => ErrorSeverity::High,
            BatchError::IoError(_) | BatchError::CsvError(_) | BatchError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BatchError::ValidationError { .. } => "Fix the batch line; the remaining lines still run",
            BatchError::LaunchError { .. } => {
                "Check [tool] program/script in the config and that IMUTANTHOME is set"
            }
            BatchError::Cancelled => "Re-run the batch to process the remaining jobs",
            BatchError::ConfigValidationError { .. }
            | BatchError::InvalidConfigValueError { .. }
            | BatchError::MissingConfigError { .. } => "Review the command line flags and TOML config",
            BatchError::IoError(_) => "Check that the input exists and the output path is writable",
            BatchError::CsvError(_) | BatchError::SerializationError(_) => {
                "Check free disk space and the output path"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_is_low_severity() {
        let err = BatchError::invalid_line(3, "position must be an integer");
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.to_string(), "Line 3: position must be an integer");
    }

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = BatchError::MissingConfigError {
            field: "input".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}

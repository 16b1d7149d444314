//! Error types module
//!
//! All pipeline failures are unified under [`PipelineError`]. The variants follow
//! the pipeline's error taxonomy: caller mistakes (`InvalidRequest`), object
//! store failures (`UpstreamStorage`), poller exhaustion (`ProcessingTimeout`)
//! and derived names that fail the dimension parse (`MalformedDerivedName`,
//! logged and excluded, never returned to a caller of the resolver).

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code equivalent
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INVALID_REQUEST")
    fn error_code(&self) -> &'static str;

    /// Whether the operation may succeed when retried
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upstream storage failure: {0}")]
    UpstreamStorage(String),

    #[error("Processing timeout after {attempts} status checks")]
    ProcessingTimeout { attempts: u32 },

    #[error("Malformed derived name: {0}")]
    MalformedDerivedName(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::InvalidRequest(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, log_level).
fn static_metadata(err: &PipelineError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        PipelineError::InvalidRequest(_) => (400, "INVALID_REQUEST", false, LogLevel::Debug),
        PipelineError::UpstreamStorage(_) => (502, "UPSTREAM_STORAGE_FAILURE", true, LogLevel::Error),
        PipelineError::ProcessingTimeout { .. } => (504, "PROCESSING_TIMEOUT", false, LogLevel::Warn),
        PipelineError::MalformedDerivedName(_) => {
            (500, "MALFORMED_DERIVED_NAME", false, LogLevel::Warn)
        }
        PipelineError::ImageProcessing(_) => (422, "IMAGE_PROCESSING_ERROR", false, LogLevel::Warn),
        PipelineError::Configuration(_) => (500, "CONFIGURATION_ERROR", false, LogLevel::Error),
        PipelineError::Transport(_) => (502, "TRANSPORT_ERROR", true, LogLevel::Warn),
        PipelineError::Cancelled => (499, "CANCELLED", false, LogLevel::Debug),
    }
}

impl ErrorMetadata for PipelineError {
    fn http_status_code(&self) -> u16 {
        static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            PipelineError::InvalidRequest(msg) => msg.clone(),
            PipelineError::UpstreamStorage(_) => "Failed to access object storage".to_string(),
            PipelineError::ProcessingTimeout { .. } => {
                "Processing timeout. Please try again.".to_string()
            }
            PipelineError::MalformedDerivedName(_) | PipelineError::Configuration(_) => {
                "Internal error".to_string()
            }
            PipelineError::ImageProcessing(msg) => format!("Could not process image: {}", msg),
            PipelineError::Transport(msg) => msg.clone(),
            PipelineError::Cancelled => "Operation cancelled".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).3
    }
}

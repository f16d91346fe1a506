//! # Error Handling
//!
//! Error types for the try-on workflow. Every [`TryOnError`] variant carries an
//! [`ErrorContext`] with metadata about when and where it happened, so the
//! orchestrator can log the failure with its context and then show the user a
//! short message.
//!
//! ## Error Kinds
//!
//! - `Configuration`: missing credential or invalid setting, raised before any call
//! - `Analysis`: transport, parse or schema failure in the analysis stage
//! - `Synthesis`: transport failure or empty result in the synthesis stage
//! - `Readiness`: a run requested without the required images
//! - `Capture` / `Camera`: image decoding and device capture failures
//! - `Validation`: inputs the current persona does not accept
//! - `Io`: filesystem failures while loading or saving images
//!
//! Remote stage failures are never retried. The orchestrator records them once
//! and the run ends in the `error` state.
//!
//! ## Usage
//!
//! ```rust
//! use neural_tryon::error::{HasRecoverySuggestion, TryOnError};
//!
//! let error = TryOnError::configuration("API_KEY", "environment variable is not set")
//!     .with_recovery_suggestion("export API_KEY=<key> or add it to .env");
//!
//! assert_eq!(error.category(), "configuration");
//! assert!(error.recovery_suggestion().is_some());
//! ```

use std::{collections::HashMap, time::SystemTime};

use thiserror::Error;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, the workflow continues unchanged
    Info,
    /// Degraded behavior, e.g. camera unavailable
    Warning,
    /// A run or capture failed
    Error,
    /// Nothing can proceed until the user fixes the environment
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Additional metadata as key-value pairs
    pub metadata: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            metadata: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context at a given severity
    pub fn at_severity(severity: ErrorSeverity) -> Self {
        Self {
            severity,
            ..Self::default()
        }
    }

    /// Set the operation that was being performed
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}

/// Base error type for the try-on library
#[derive(Debug, Error)]
pub enum TryOnError {
    #[error("Configuration error in '{field}': {reason}")]
    Configuration {
        field: String,
        reason: String,
        context: ErrorContext,
    },

    #[error("Analysis failed: {message}")]
    Analysis {
        message: String,
        context: ErrorContext,
    },

    #[error("Synthesis failed: {message}")]
    Synthesis {
        message: String,
        context: ErrorContext,
    },

    #[error("Run not ready: {reason}")]
    Readiness {
        reason: String,
        context: ErrorContext,
    },

    #[error("Image capture failed for {role}: {reason}")]
    Capture {
        role: String,
        reason: String,
        context: ErrorContext,
    },

    #[error("Camera error: {reason}")]
    Camera {
        reason: String,
        context: ErrorContext,
    },

    #[error("Validation failed for '{field}': {constraint}")]
    Validation {
        field: String,
        constraint: String,
        context: ErrorContext,
    },

    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
        context: ErrorContext,
    },
}

impl TryOnError {
    /// Create a configuration error. Configuration errors are fatal.
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
            context: ErrorContext::at_severity(ErrorSeverity::Fatal),
        }
    }

    /// Create an analysis-stage error
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis {
            message: message.into(),
            context: ErrorContext::new().with_operation("analyze"),
        }
    }

    /// Create a synthesis-stage error
    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::Synthesis {
            message: message.into(),
            context: ErrorContext::new().with_operation("synthesize"),
        }
    }

    /// Create a readiness violation
    pub fn readiness(reason: impl Into<String>) -> Self {
        Self::Readiness {
            reason: reason.into(),
            context: ErrorContext::at_severity(ErrorSeverity::Warning),
        }
    }

    /// Create an image capture error
    pub fn capture(role: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Capture {
            role: role.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a camera error
    pub fn camera(reason: impl Into<String>) -> Self {
        Self::Camera {
            reason: reason.into(),
            context: ErrorContext::at_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Configuration { context, .. }
            | Self::Analysis { context, .. }
            | Self::Synthesis { context, .. }
            | Self::Readiness { context, .. }
            | Self::Capture { context, .. }
            | Self::Camera { context, .. }
            | Self::Validation { context, .. }
            | Self::Io { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Configuration { context, .. }
            | Self::Analysis { context, .. }
            | Self::Synthesis { context, .. }
            | Self::Readiness { context, .. }
            | Self::Capture { context, .. }
            | Self::Camera { context, .. }
            | Self::Validation { context, .. }
            | Self::Io { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Analysis { .. } => "analysis",
            Self::Synthesis { .. } => "synthesis",
            Self::Readiness { .. } => "readiness",
            Self::Capture { .. } => "capture",
            Self::Camera { .. } => "camera",
            Self::Validation { .. } => "validation",
            Self::Io { .. } => "io",
        }
    }
}

/// Result type alias using our custom error type
pub type TryOnResult<T> = Result<T, TryOnError>;

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for TryOnError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for TryOnError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Check if an error is fatal (nothing can run until it is fixed)
    pub fn is_fatal(error: &TryOnError) -> bool {
        matches!(error, TryOnError::Configuration { .. })
            || error.severity() == ErrorSeverity::Fatal
    }

    /// Check if an error came from one of the two remote stages
    pub fn is_stage_failure(error: &TryOnError) -> bool {
        matches!(
            error,
            TryOnError::Analysis { .. } | TryOnError::Synthesis { .. }
        )
    }
}

impl From<std::io::Error> for TryOnError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

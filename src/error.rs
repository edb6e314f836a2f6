use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "options.connection_string", "model.entity_types[Blog]")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the conflicting value)
    pub details: Option<String>,
    /// Source of the error (e.g., "cosmos_options", "model_builder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for provider configuration and model introspection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration conflict: {message}{}", format_context(.context))]
    ConfigurationConflict {
        message: String,
        context: ErrorContext,
    },

    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Remote error: HTTP {status}: {message}")]
    Remote {
        status: u16,
        message: String,
        retry_after_ms: Option<u32>,
    },

    #[error("Maximum number of retries ({attempts}) exceeded: {source}")]
    RetryLimitExceeded {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML syntax error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a configuration conflict error with structured context
    pub fn conflict_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::ConfigurationConflict {
            message: msg.into(),
            context,
        }
    }

    /// Create an invalid argument error for the named argument
    pub fn invalid_argument(argument: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::InvalidArgument {
            argument: argument.into(),
            message: msg.into(),
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::ConfigurationConflict { context, .. }
            | Error::Configuration { context, .. }
            | Error::Validation { context, .. } => Some(context),
            _ => None,
        }
    }

    /// True for the mutually-exclusive-configuration failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ConfigurationConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_display_includes_context() {
        let err = Error::conflict_with_context(
            "connection string already set",
            ErrorContext::new()
                .with_field_path("options.account_endpoint")
                .with_source("cosmos_options"),
        );
        assert_eq!(
            err.to_string(),
            "Configuration conflict: connection string already set \
             (field: options.account_endpoint, source: cosmos_options)"
        );
        assert!(err.is_conflict());
        assert_eq!(
            err.context().and_then(|c| c.source.as_deref()),
            Some("cosmos_options")
        );
    }

    #[test]
    fn invalid_argument_has_no_context() {
        let err = Error::invalid_argument("connection_mode", "value 7 is not defined");
        assert!(err.context().is_none());
        assert_eq!(
            err.to_string(),
            "Invalid argument 'connection_mode': value 7 is not defined"
        );
    }
}

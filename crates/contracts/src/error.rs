//! Layered error definitions
//!
//! Categorized by source: configuration / lifecycle / frame / listener

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Descriptor could not be turned into a component
    #[error("invalid configuration for component '{component}': {message}")]
    InvalidConfiguration { component: String, message: String },

    // ===== Lifecycle Errors =====
    /// Component initialization failed
    #[error("failed to initialize component '{component}': {message}")]
    InitializationFailure { component: String, message: String },

    /// Component start failed
    #[error("failed to start component '{component}': {message}")]
    StartFailure { component: String, message: String },

    /// Component stop failed
    #[error("failed to stop component '{component}': {message}")]
    StopFailure { component: String, message: String },

    // ===== Frame Errors =====
    /// Frame bytes do not form a valid envelope
    #[error("malformed frame on channel '{channel}': {message}")]
    MalformedFrame { channel: String, message: String },

    /// No handler registered for a completed frame
    #[error("encountered an undefined frame type identifier \"{type_tag}\", output was not parsed")]
    UnknownFrameType { type_tag: String },

    /// A second handler was registered for a type tag
    #[error(
        "duplicate frame type identifier \"{type_tag}\" encountered for handler '{handler}' during initialization, only the first defined handler will be used"
    )]
    DuplicateTypeRegistration { type_tag: String, handler: String },

    // ===== Listener Errors =====
    /// External notification handler panicked
    #[error("exception in consumer handler for {event} notification: {message}")]
    ListenerFailure { event: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid configuration error
    pub fn invalid_configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create initialization failure
    pub fn initialization(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InitializationFailure {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create start failure
    pub fn start(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StartFailure {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create stop failure
    pub fn stop(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StopFailure {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create malformed frame error
    pub fn malformed_frame(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Short, stable name of the error kind (used as a metrics label)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse { .. } => "config_parse",
            Self::ConfigValidation { .. } => "config_validation",
            Self::InvalidConfiguration { .. } => "invalid_configuration",
            Self::InitializationFailure { .. } => "initialization_failure",
            Self::StartFailure { .. } => "start_failure",
            Self::StopFailure { .. } => "stop_failure",
            Self::MalformedFrame { .. } => "malformed_frame",
            Self::UnknownFrameType { .. } => "unknown_frame_type",
            Self::DuplicateTypeRegistration { .. } => "duplicate_type_registration",
            Self::ListenerFailure { .. } => "listener_failure",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

//! Layered error definitions
//!
//! Categorized by source: config / collector / transport / store

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

    // ===== Collector Errors =====
    /// A source failed to produce records
    #[error("collector '{source_name}' failed: {message}")]
    Collector {
        source_name: String,
        message: String,
    },

    // ===== Transport Errors =====
    /// A delivery attempt failed
    #[error("transport '{transport}' error: {message}")]
    Transport { transport: String, message: String },

    /// Transport could not be constructed
    #[error("transport '{transport}' setup error: {message}")]
    TransportSetup { transport: String, message: String },

    // ===== Store Errors =====
    /// Record store read/write error
    #[error("record store error: {message}")]
    Store { message: String },

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

    /// Create collector error
    pub fn collector(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collector {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Create transport setup error
    pub fn transport_setup(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportSetup {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Create record store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

//! Error types for chemhex.
//!
//! Invalid input is rejected at the boundary (sample, geometry and config
//! construction) so the binning and blur loops never fail.

use thiserror::Error;

/// Unified error type for all chemhex operations.
#[derive(Error, Debug)]
pub enum ChemhexError {
    /// Degenerate or non-finite hexagon geometry (zero-width ranges, size <= 0)
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// An entity reached the core without a required coordinate property
    #[error("Missing property '{property}' for entity '{entity_id}'")]
    MissingProperty { entity_id: String, property: String },

    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A sigma key that was never precomputed
    #[error("Unknown sigma '{0}'")]
    UnknownSigma(String),

    /// A query name absent from a source bundle
    #[error("Unknown query '{0}'")]
    UnknownQuery(String),

    /// Malformed line in an input table
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// I/O errors (table reading, output writing)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ChemhexError {
    /// Creates an invalid geometry error.
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        ChemhexError::InvalidGeometry(message.into())
    }

    /// Creates a missing property error.
    pub fn missing_property(entity_id: impl Into<String>, property: impl Into<String>) -> Self {
        ChemhexError::MissingProperty {
            entity_id: entity_id.into(),
            property: property.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        ChemhexError::ConfigError(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ChemhexError::ValidationError(message.into())
    }

    /// Creates a parse error for a 1-based line number.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        ChemhexError::ParseError {
            line,
            message: message.into(),
        }
    }

    /// True for errors caused by the data of a single query (as opposed to
    /// configuration or I/O), which the source builder isolates per query.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ChemhexError::InvalidGeometry(_)
                | ChemhexError::MissingProperty { .. }
                | ChemhexError::ValidationError(_)
        )
    }

    /// Returns a user-friendly error message with actionable guidance.
    pub fn user_message(&self) -> String {
        match self {
            ChemhexError::InvalidGeometry(msg) => {
                format!(
                    "Invalid geometry: {}\n\
                     → All chemicals share the same logP or mass value, or the plot bounds are empty.\n\
                     → Pass explicit bounds (--bounds) or use a fixed aspect scale.",
                    msg
                )
            }
            ChemhexError::MissingProperty {
                entity_id,
                property,
            } => {
                format!(
                    "Entity '{}' has no {} value.\n\
                     → Records without logP or mass must be dropped before binning.",
                    entity_id, property
                )
            }
            ChemhexError::ConfigError(msg) => {
                format!(
                    "Configuration error: {}\n\
                     → Check hex_size, blur max/step and top_k in your configuration file.",
                    msg
                )
            }
            ChemhexError::UnknownSigma(key) => {
                format!(
                    "Unknown sigma '{}'\n\
                     → Sigma values are 0, step, 2*step, ... up to the configured blur maximum.",
                    key
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for chemhex operations.
pub type Result<T> = std::result::Result<T, ChemhexError>;

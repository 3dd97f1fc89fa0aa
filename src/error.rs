//! Typed errors for the SpaceMouse gateway library
//!
//! The mapping engine itself has no failure modes (bad values are clamped),
//! so these errors only surface at the edges: the flat option table, the
//! profile store and the replay device stream.

use thiserror::Error;

/// Errors raised by the gateway library.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Option name not present in the flat option table
    #[error("Unknown option: {name}")]
    UnknownOption { name: String },

    /// Option value could not be interpreted for its option
    #[error("Invalid value '{value}' for option '{name}': expected {expected}")]
    InvalidOptionValue {
        name: String,
        value: String,
        expected: &'static str,
    },

    /// Profile file does not exist in the profile directory
    #[error("Profile not found: {name}")]
    UnknownProfile { name: String },

    /// Profile may not be deleted or renamed
    #[error("Profile '{name}' is protected and cannot be {operation}")]
    ProtectedProfile {
        name: String,
        operation: &'static str,
    },

    /// Profile name would escape the profile directory or is empty
    #[error("Invalid profile name: '{name}'")]
    InvalidProfileName { name: String },

    /// A row of a recorded sample file could not be decoded
    #[error("Invalid sample record at line {line}: {message}")]
    InvalidSampleRecord { line: u64, message: String },
}

impl GatewayError {
    /// Build an `InvalidOptionValue` error
    pub fn invalid_value(
        name: impl Into<String>,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidOptionValue {
            name: name.into(),
            value: value.into(),
            expected,
        }
    }
}

/// Result alias for library operations with typed errors
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GatewayError::UnknownOption {
            name: "warp_key".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown option: warp_key");

        let err = GatewayError::invalid_value("jump_threshold", "high", "a number");
        assert_eq!(
            err.to_string(),
            "Invalid value 'high' for option 'jump_threshold': expected a number"
        );

        let err = GatewayError::ProtectedProfile {
            name: "default".to_string(),
            operation: "deleted",
        };
        assert!(err.to_string().contains("cannot be deleted"));
    }
}

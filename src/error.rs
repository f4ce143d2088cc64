//! # Error Types
//!
//! This module defines error types used throughout the bonprint library.
//!
//! The taxonomy follows what a caller can do about a failure:
//!
//! | Variant | Meaning | Retry? |
//! |---------|---------|--------|
//! | `InvalidInput` | Malformed element or descriptor | No, fix the input |
//! | `NotReady` | Not connected, or another print is in flight | Later |
//! | `TransportFault` | Bond/connect/write failed at the link layer | Caller's choice |
//! | `Unsupported` | Platform lacks a capability | No |

use thiserror::Error;

/// Title used for every print failure reported to the caller.
pub const PRINT_FAILURE_TITLE: &str = "Print failed";

/// Main error type for bonprint operations
#[derive(Debug, Error)]
pub enum BonprintError {
    /// Malformed element descriptor, mismatched array lengths, unknown device
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Print attempted while not connected or while another print is outstanding
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Bond rejected, connect failed, write acknowledgment mismatch, link lost
    #[error("{title}: {description}")]
    TransportFault { title: String, description: String },

    /// The platform lacks a required capability
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BonprintError {
    /// Transport fault with the standard print-failure title.
    pub fn transport(description: impl Into<String>) -> Self {
        Self::TransportFault {
            title: PRINT_FAILURE_TITLE.to_string(),
            description: description.into(),
        }
    }

    /// Short title for the failure callback.
    pub fn title(&self) -> &str {
        match self {
            Self::TransportFault { title, .. } => title,
            _ => PRINT_FAILURE_TITLE,
        }
    }

    /// Human-readable description for the failure callback.
    pub fn description(&self) -> String {
        match self {
            Self::InvalidInput(msg) | Self::NotReady(msg) | Self::Unsupported(msg) => msg.clone(),
            Self::TransportFault { description, .. } => description.clone(),
            Self::Io(e) => e.to_string(),
        }
    }
}

/// Result type for bonprint operations
pub type Result<T> = std::result::Result<T, BonprintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_fault_title() {
        let err = BonprintError::transport("link lost");
        assert_eq!(err.title(), PRINT_FAILURE_TITLE);
        assert_eq!(err.description(), "link lost");
        assert_eq!(err.to_string(), "Print failed: link lost");
    }

    #[test]
    fn test_not_ready_description() {
        let err = BonprintError::NotReady("not connected".into());
        assert_eq!(err.title(), PRINT_FAILURE_TITLE);
        assert_eq!(err.description(), "not connected");
    }
}

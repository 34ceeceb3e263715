//! Error types for keyring operations

use thiserror::Error;

/// Custom error type for keyring operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown keyring type: {0}")]
    UnknownKeyringType(String),

    #[error("{keyring} does not support {operation}")]
    Unsupported {
        /// Wire name of the keyring type
        keyring: String,
        /// Name of the rejected operation
        operation: String,
    },

    #[error("Address not found in keyring: {0}")]
    AddressNotFound(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Mnemonic error: {0}")]
    Mnemonic(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Build the error returned by optional keyring operations a backend lacks
    pub fn unsupported(keyring: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            keyring: keyring.into(),
            operation: operation.into(),
        }
    }
}

/// Result type for keyring operations
pub type Result<T> = std::result::Result<T, Error>;

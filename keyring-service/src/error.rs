//! Error types for the keyring service

use thiserror::Error;

/// Custom error type for service level operations
#[derive(Error, Debug)]
pub enum ServiceError {
    /// An underlying keyring backend rejected the operation
    #[error(transparent)]
    Keyring(#[from] keyring_utils::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The vault could not be decrypted with the supplied password
    #[error("Incorrect password")]
    WrongPassword,

    /// An operation that needs the session password ran while locked
    #[error("password can not be null")]
    Locked,

    /// Persisting was attempted before a password was ever set
    #[error("KeyringService - password is not a string")]
    PasswordNotSet,

    /// Unlock was attempted against storage that never held a vault
    #[error("Cannot unlock without a previous vault")]
    NoVault,

    /// A boot password would clobber an already encrypted vault
    #[error("You're trying to overwrite password on existing keyrings.")]
    PasswordAlreadySet,

    #[error("No keyring found for the requested account.")]
    NoKeyringFound,

    /// The keyring holding the account has no removal support
    #[error("Keyring {0} doesn't support account removal operations")]
    RemovalUnsupported(String),

    /// The account already exists in another keyring
    #[error("Duplicate account {0}")]
    DuplicateAccount(String),

    #[error("Invalid secret recovery phrase")]
    InvalidMnemonic,

    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed vault envelope or cipher failure other than a bad password
    #[error("Encryptor error: {0}")]
    Encryptor(String),
}

/// Result type for service level operations
pub type Result<T> = std::result::Result<T, ServiceError>;

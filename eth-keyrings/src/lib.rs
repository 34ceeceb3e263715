//! Software keyring backends for Ethereum accounts
//!
//! This library implements the keyring contract from `keyring-utils` for the
//! three backends that need no external device: BIP-39 mnemonic keyrings with
//! BIP-44 account discovery, loose private key keyrings, and watch-only
//! address books. Derivation is BIP-32 over secp256k1; signatures cover
//! EIP-155 transactions, EIP-191 personal messages and EIP-712 typed data.

pub mod derivation;
pub mod hd;
pub mod signing;
pub mod simple;
pub mod watch;

// Re-export commonly used types for convenience
pub use derivation::{generate_mnemonic, validate_mnemonic, HdPathType};
pub use hd::HdKeyring;
pub use simple::SimpleKeyring;
pub use watch::WatchKeyring;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

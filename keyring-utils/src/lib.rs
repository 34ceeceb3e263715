//! Keyring type registry, interface contract and display projections
//!
//! This library defines the shared vocabulary of the keyring layer: the
//! registry of backend types, the `Keyring` trait concrete backends satisfy,
//! account and vault payload models, read-side display views, and default
//! alias names for new accounts.

pub mod account;
pub mod address;
pub mod alias;
pub mod display;
pub mod error;
pub mod keyring;
pub mod types;

// Re-export commonly used types for convenience
pub use account::{DerivedAccount, DisplayedAccount, KeyringAccount, KeyringSerializedData};
pub use alias::{generate_alias_name, AliasParams};
pub use display::{DisplayKeyring, DisplayedKeyring};
pub use error::{Error, Result};
pub use keyring::{into_handle, Keyring, KeyringHandle};
pub use types::{KeyringCategory, KeyringType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

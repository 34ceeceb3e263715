//! Password locked keyring orchestration over an encrypted vault
//!
//! This library manages a set of keyring backends behind one session
//! password. Keyrings serialize into a vault encrypted with a key derived
//! from that password, hardware entries are mirrored unencrypted for
//! display while locked, and vaults exported by other installs can be
//! folded in without losing local accounts.

pub mod encryptor;
pub mod error;
pub mod merge;
pub mod registry;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use encryptor::{PasswordEncryptor, VaultEncryptor};
pub use error::{Result, ServiceError};
pub use merge::merge_vaults;
pub use registry::{KeyringBuilder, KeyringRegistry};
pub use service::{AliasCallback, KeyringService, ServiceOptions};
pub use store::{FileStorage, MemoryStorage, PersistStore, StorageAdapter};
pub use types::{KeyringEvent, KeyringState, MemStoreState, UnlockScene};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

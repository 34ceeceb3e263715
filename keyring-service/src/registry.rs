//! Builders for the keyring backends the service can restore

use eth_keyrings::{HdKeyring, SimpleKeyring, WatchKeyring};
use keyring_utils::{Error, Keyring, KeyringType};

use crate::error::Result;

/// Constructor for an empty keyring of one type
pub type KeyringBuilder = Box<dyn Fn() -> Box<dyn Keyring> + Send + Sync>;

/// Maps registry types to backend constructors
///
/// Restoring a vault entry builds an empty keyring for its type and feeds the
/// stored payload through [`Keyring::deserialize`]. Hosts register builders
/// for hardware or connector backends on top of the software set.
pub struct KeyringRegistry {
    builders: Vec<(KeyringType, KeyringBuilder)>,
}

impl KeyringRegistry {
    pub fn new() -> Self {
        Self {
            builders: Vec::new(),
        }
    }

    /// Registry preloaded with the software backends
    pub fn with_software_backends() -> Self {
        let mut registry = Self::new();
        registry.register(KeyringType::HdKeyring, Box::new(|| Box::new(HdKeyring::new())));
        registry.register(
            KeyringType::SimpleKeyring,
            Box::new(|| Box::new(SimpleKeyring::new())),
        );
        registry.register(
            KeyringType::WatchAddressKeyring,
            Box::new(|| Box::new(WatchKeyring::new())),
        );
        registry
    }

    /// Register a builder, replacing any previous one for the same type
    pub fn register(&mut self, kind: KeyringType, builder: KeyringBuilder) {
        if let Some(slot) = self.builders.iter_mut().find(|(k, _)| *k == kind) {
            slot.1 = builder;
        } else {
            self.builders.push((kind, builder));
        }
    }

    pub fn contains(&self, kind: KeyringType) -> bool {
        self.builders.iter().any(|(k, _)| *k == kind)
    }

    /// Construct an empty keyring of the given type
    pub fn build(&self, kind: KeyringType) -> Result<Box<dyn Keyring>> {
        self.builders
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, builder)| builder())
            .ok_or_else(|| Error::UnknownKeyringType(kind.as_str().to_string()).into())
    }

    /// Wire names of every registered type
    pub fn types(&self) -> Vec<String> {
        self.builders
            .iter()
            .map(|(kind, _)| kind.as_str().to_string())
            .collect()
    }
}

impl Default for KeyringRegistry {
    fn default() -> Self {
        Self::new()
    }
}

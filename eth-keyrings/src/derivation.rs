//! BIP-39 / BIP-32 key derivation for Ethereum accounts

use bip39::Mnemonic;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::Sha512;

use keyring_utils::address::to_checksum_address;
use keyring_utils::error::{Error, Result};

/// Derivation path layouts offered for account discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum HdPathType {
    /// BIP-44 standard, one address per change index
    BIP44,
    /// Pre-BIP44 layout used by early clients
    Legacy,
    /// Ledger Live layout, one account per hardened account index
    LedgerLive,
}

impl HdPathType {
    /// Base path addresses are derived under
    pub fn base_path(&self) -> &'static str {
        match self {
            Self::BIP44 => "m/44'/60'/0'/0",
            Self::Legacy => "m/44'/60'/0'",
            Self::LedgerLive => "m/44'/60'/0'/0/0",
        }
    }

    /// Classify a base path back into its layout
    pub fn from_base_path(path: &str) -> Option<Self> {
        match path {
            "m/44'/60'/0'/0" => Some(Self::BIP44),
            "m/44'/60'/0'" => Some(Self::Legacy),
            "m/44'/60'/0'/0/0" => Some(Self::LedgerLive),
            _ => None,
        }
    }
}

/// Full derivation path for one account index under a base path
///
/// Ledger Live enumerates hardened account indexes instead of appending a
/// child index.
pub fn path_for_index(base_path: &str, index: u32) -> String {
    if base_path == HdPathType::LedgerLive.base_path() {
        format!("m/44'/60'/{}'/0/0", index)
    } else {
        format!("{}/{}", base_path, index)
    }
}

/// Generate a fresh 12 word mnemonic phrase
pub fn generate_mnemonic() -> Result<String> {
    let mut entropy = [0u8; 16];
    OsRng.fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| Error::Mnemonic(e.to_string()))?;

    Ok(mnemonic.to_string())
}

/// Validate a mnemonic phrase against the english wordlist and checksum
pub fn validate_mnemonic(phrase: &str) -> bool {
    Mnemonic::parse_normalized(phrase).is_ok()
}

/// Derive a BIP-39 seed from a mnemonic phrase and optional passphrase
pub fn seed_from_mnemonic(phrase: &str, passphrase: &str) -> Result<[u8; 64]> {
    let mnemonic = Mnemonic::parse_normalized(phrase)
        .map_err(|e| Error::Mnemonic(e.to_string()))?;

    Ok(mnemonic.to_seed(passphrase))
}

/// Derive a secp256k1 key pair from a seed and derivation path
pub fn derive_key_pair(seed: &[u8], path: &str) -> Result<(SecretKey, PublicKey)> {
    let path_components = parse_derivation_path(path)?;

    let (mut secret_key, mut chain_code) = derive_master_key(seed)?;
    for component in path_components {
        (secret_key, chain_code) = derive_child_key(secret_key, chain_code, component)?;
    }

    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(&secret_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid secret key: {}", e)))?;
    let public_key = PublicKey::from_secret_key(&secp, &secret_key);

    Ok((secret_key, public_key))
}

/// Derive the secret key for one account index under a base path
pub fn derive_account_key(seed: &[u8], base_path: &str, index: u32) -> Result<(SecretKey, PublicKey)> {
    derive_key_pair(seed, &path_for_index(base_path, index))
}

/// Parse a BIP-32 derivation path
fn parse_derivation_path(path: &str) -> Result<Vec<u32>> {
    if !path.starts_with("m/") {
        return Err(Error::KeyDerivation(format!("Invalid derivation path: {}", path)));
    }

    let components = path.trim_start_matches("m/").split('/');
    let mut result = Vec::new();

    for component in components {
        if component.is_empty() {
            continue;
        }

        let hardened = component.ends_with('\'');
        let index = if hardened {
            let index = component.trim_end_matches('\'').parse::<u32>()
                .map_err(|_| Error::KeyDerivation(format!("Invalid derivation path component: {}", component)))?;
            0x80000000 + index
        } else {
            component.parse::<u32>()
                .map_err(|_| Error::KeyDerivation(format!("Invalid derivation path component: {}", component)))?
        };

        result.push(index);
    }

    Ok(result)
}

/// Derive the master key from a seed
fn derive_master_key(seed: &[u8]) -> Result<([u8; 32], [u8; 32])> {
    let mut hmac = Hmac::<Sha512>::new_from_slice(b"Bitcoin seed")
        .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;

    hmac.update(seed);
    let result = hmac.finalize().into_bytes();

    let mut secret_key = [0u8; 32];
    let mut chain_code = [0u8; 32];

    secret_key.copy_from_slice(&result[0..32]);
    chain_code.copy_from_slice(&result[32..64]);

    Ok((secret_key, chain_code))
}

/// Derive a child key from a parent key
fn derive_child_key(parent_key: [u8; 32], parent_chain_code: [u8; 32], index: u32) -> Result<([u8; 32], [u8; 32])> {
    let secp = Secp256k1::new();
    let parent_secret_key = SecretKey::from_slice(&parent_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid parent key: {}", e)))?;

    let mut data = Vec::with_capacity(37);

    if index >= 0x80000000 {
        // Hardened derivation
        data.push(0);
        data.extend_from_slice(&parent_key);
    } else {
        // Normal derivation
        let parent_public_key = PublicKey::from_secret_key(&secp, &parent_secret_key);
        data.extend_from_slice(&parent_public_key.serialize());
    }

    // Append the index
    data.extend_from_slice(&index.to_be_bytes());

    // Calculate HMAC-SHA512
    let mut hmac = Hmac::<Sha512>::new_from_slice(&parent_chain_code)
        .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;

    hmac.update(&data);
    let result = hmac.finalize().into_bytes();

    let mut child_key = [0u8; 32];
    let mut child_chain_code = [0u8; 32];

    child_key.copy_from_slice(&result[0..32]);
    child_chain_code.copy_from_slice(&result[32..64]);

    // Add the parent key to the child key (mod n)
    let child_secret_key = SecretKey::from_slice(&child_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid child key: {}", e)))?;

    let child_secret_key = child_secret_key.add_tweak(&parent_secret_key.into())
        .map_err(|e| Error::KeyDerivation(format!("Key addition error: {}", e)))?;

    Ok((child_secret_key.secret_bytes(), child_chain_code))
}

/// Get the checksummed Ethereum address for a public key
pub fn public_key_to_address(public_key: &PublicKey) -> Result<String> {
    let uncompressed = public_key.serialize_uncompressed();

    // Skip the first byte (0x04) and hash the rest
    let key_hash = keccak256(&uncompressed[1..]);

    // Take the last 20 bytes of the hash
    let address = &key_hash[12..];

    to_checksum_address(&format!("0x{}", hex::encode(address)))
}

/// Compressed public key as lowercase hex, the identity of an HD keyring
pub fn public_key_to_hex(public_key: &PublicKey) -> String {
    hex::encode(public_key.serialize())
}

/// Calculate the Keccak-256 hash of data
fn keccak256(data: &[u8]) -> [u8; 32] {
    use sha3::{Digest, Keccak256};
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

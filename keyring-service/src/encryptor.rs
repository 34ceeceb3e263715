//! Password based encryption for the serialized vault
//!
//! Keys are stretched from the password with PBKDF2-HMAC-SHA256 and the
//! payload is sealed with AES-256-GCM. The envelope stores the ciphertext,
//! nonce and salt as base64 so it can live inside JSON storage.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{Result, ServiceError};

/// Default PBKDF2 round count for key stretching
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 10_000;

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Symmetric encryption used to seal the vault under the session password
pub trait VaultEncryptor: Send + Sync {
    /// Encrypt `plaintext` under `password` into a self-describing envelope
    fn encrypt(&self, password: &str, plaintext: &[u8]) -> Result<String>;

    /// Decrypt an envelope produced by [`VaultEncryptor::encrypt`]
    fn decrypt(&self, password: &str, payload: &str) -> Result<Vec<u8>>;
}

/// Serialized form of an encrypted vault
#[derive(Debug, Serialize, Deserialize)]
struct VaultEnvelope {
    /// Base64 ciphertext including the GCM tag
    data: String,
    /// Base64 nonce
    iv: String,
    /// Base64 PBKDF2 salt
    salt: String,
}

/// PBKDF2 + AES-256-GCM encryptor
pub struct PasswordEncryptor {
    iterations: u32,
}

impl PasswordEncryptor {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    fn derive_key(&self, password: &str, salt: &[u8]) -> [u8; 32] {
        let mut key = [0u8; 32];
        pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, self.iterations, &mut key);
        key
    }
}

impl Default for PasswordEncryptor {
    fn default() -> Self {
        Self::new(DEFAULT_PBKDF2_ITERATIONS)
    }
}

impl VaultEncryptor for PasswordEncryptor {
    fn encrypt(&self, password: &str, plaintext: &[u8]) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let mut key = self.derive_key(password, &salt);
        let cipher = Aes256Gcm::new(&key.into());
        key.zeroize();

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| ServiceError::Encryptor("encryption failed".to_string()))?;

        let envelope = VaultEnvelope {
            data: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(nonce_bytes),
            salt: STANDARD.encode(salt),
        };
        serde_json::to_string(&envelope).map_err(ServiceError::from)
    }

    fn decrypt(&self, password: &str, payload: &str) -> Result<Vec<u8>> {
        let envelope: VaultEnvelope = serde_json::from_str(payload)
            .map_err(|e| ServiceError::Encryptor(format!("malformed vault payload: {}", e)))?;

        let decode = |field: &str, value: &str| {
            STANDARD
                .decode(value)
                .map_err(|e| ServiceError::Encryptor(format!("invalid base64 in {}: {}", field, e)))
        };
        let ciphertext = decode("data", &envelope.data)?;
        let nonce_bytes = decode("iv", &envelope.iv)?;
        let salt = decode("salt", &envelope.salt)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(ServiceError::Encryptor(format!(
                "invalid nonce length: {}",
                nonce_bytes.len()
            )));
        }

        let mut key = self.derive_key(password, &salt);
        let cipher = Aes256Gcm::new(&key.into());
        key.zeroize();

        // A failed GCM tag check means the key (and so the password) is wrong
        cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| ServiceError::WrongPassword)
    }
}

//! Signing helpers shared by the software keyrings
//!
//! Both the mnemonic and the private key backends hold raw secp256k1
//! secrets. The helpers here wrap one secret into an ethers wallet and
//! produce the three signature kinds the keyring contract requires.

use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::transaction::eip712::{Eip712, TypedData};
use ethers_core::types::{Signature, H256};
use ethers_core::utils::hash_message;
use ethers_signers::LocalWallet;
use secp256k1::SecretKey;

use keyring_utils::error::{Error, Result};

/// Wrap a raw secret key into an ethers wallet
fn wallet_for_key(secret_key: &SecretKey) -> Result<LocalWallet> {
    LocalWallet::from_bytes(&secret_key.secret_bytes())
        .map_err(|e| Error::Signing(format!("Invalid private key: {}", e)))
}

/// Sign a transaction, normalizing `v` with EIP-155 from the transaction's
/// chain id
pub fn sign_transaction(secret_key: &SecretKey, tx: &TypedTransaction) -> Result<Signature> {
    let wallet = wallet_for_key(secret_key)?;

    wallet
        .sign_transaction_sync(tx)
        .map_err(|e| Error::Signing(format!("Failed to sign transaction: {}", e)))
}

/// Sign a personal message under the EIP-191 prefix
pub fn sign_personal_message(secret_key: &SecretKey, message: &[u8]) -> Result<Signature> {
    let wallet = wallet_for_key(secret_key)?;

    wallet
        .sign_hash(hash_message(message))
        .map_err(|e| Error::Signing(format!("Failed to sign message: {}", e)))
}

/// Sign the EIP-712 digest of a typed data payload
pub fn sign_typed_data(secret_key: &SecretKey, typed_data: &TypedData) -> Result<Signature> {
    let wallet = wallet_for_key(secret_key)?;

    let digest = typed_data
        .encode_eip712()
        .map_err(|e| Error::Signing(format!("Failed to encode typed data: {}", e)))?;

    wallet
        .sign_hash(H256::from(digest))
        .map_err(|e| Error::Signing(format!("Failed to sign typed data: {}", e)))
}

/// Hex encode a secret key for export
pub fn export_private_key(secret_key: &SecretKey) -> String {
    hex::encode(secret_key.secret_bytes())
}

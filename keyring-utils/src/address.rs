//! Ethereum address helpers
//!
//! Keyrings store addresses as hex strings. Comparisons are case-insensitive
//! because serialized payloads mix checksummed and lowercase forms.

use crate::error::{Error, Result};

/// Normalize an address to lowercase hex with a 0x prefix
pub fn normalize_address(address: &str) -> String {
    let stripped = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    format!("0x{}", stripped.to_ascii_lowercase())
}

/// Compare two addresses ignoring case and 0x prefix
pub fn is_same_address(a: &str, b: &str) -> bool {
    normalize_address(a) == normalize_address(b)
}

/// Check that an address is a 0x-prefixed 20 byte hex string
pub fn is_valid_address(address: &str) -> bool {
    let stripped = match address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) {
        Some(s) => s,
        None => return false,
    };
    stripped.len() == 40 && stripped.chars().all(|c| c.is_ascii_hexdigit())
}

/// Apply the EIP-55 mixed-case checksum to an address
pub fn to_checksum_address(address: &str) -> Result<String> {
    if !is_valid_address(address) {
        return Err(Error::InvalidAddress(address.to_string()));
    }

    let lower = address[2..].to_ascii_lowercase();
    let hash = keccak256(lower.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    Ok(checksummed)
}

/// Calculate the Keccak-256 hash of data
pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    use sha3::{Digest, Keccak256};
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("0x9858EfFD232B4033E47d90003D41EC34EcaEda94"),
            "0x9858effd232b4033e47d90003d41ec34ecaeda94"
        );
        assert_eq!(
            normalize_address("9858EfFD232B4033E47d90003D41EC34EcaEda94"),
            "0x9858effd232b4033e47d90003d41ec34ecaeda94"
        );
    }

    #[test]
    fn test_is_same_address() {
        assert!(is_same_address(
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94",
            "0x9858effd232b4033e47d90003d41ec34ecaeda94"
        ));
        assert!(!is_same_address(
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94",
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        ));
    }

    #[test]
    fn test_is_valid_address() {
        assert!(is_valid_address("0x9858EfFD232B4033E47d90003D41EC34EcaEda94"));
        assert!(!is_valid_address("9858EfFD232B4033E47d90003D41EC34EcaEda94"));
        assert!(!is_valid_address("0x9858"));
        assert!(!is_valid_address("0xzz58EfFD232B4033E47d90003D41EC34EcaEda94"));
    }

    #[test]
    fn test_checksum_known_vectors() {
        // EIP-55 reference vectors
        assert_eq!(
            to_checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        assert_eq!(
            to_checksum_address("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359").unwrap(),
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
        );
    }

    #[test]
    fn test_checksum_rejects_invalid() {
        assert!(to_checksum_address("0x1234").is_err());
    }
}

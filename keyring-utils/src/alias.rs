//! Default alias names for newly added accounts
//!
//! The generator is total: any combination of type string, brand and counts
//! yields a name, so callers never need a fallback of their own. Inputs are
//! raw strings because brands arrive from connected wallets and may not be
//! registry members.

/// Inputs for one alias name
///
/// `keyring_count` is the ordinal of the keyring among keyrings of its type,
/// `address_count` the ordinal of the account inside the keyring. Both are
/// 0-based; the generated names are 1-based.
#[derive(Debug, Clone, Copy, Default)]
pub struct AliasParams<'a> {
    pub keyring_type: &'a str,
    pub brand_name: Option<&'a str>,
    pub keyring_count: usize,
    pub address_count: usize,
}

/// Friendly label for a registry type string
fn keyring_type_label(keyring_type: &str) -> Option<&'static str> {
    match keyring_type {
        "HD Key Tree" => Some("Seed Phrase"),
        "Simple Key Pair" => Some("Private Key"),
        "Watch Address" => Some("Contact"),
        "Ledger Hardware" => Some("Ledger"),
        "Trezor Hardware" => Some("Trezor"),
        "Onekey Hardware" => Some("OneKey"),
        "QR Hardware Wallet Device" => Some("Keystone"),
        "WalletConnect" => Some("WalletConnect"),
        "Gnosis" => Some("Safe"),
        _ => None,
    }
}

/// Friendly label for a brand, falling back to the raw brand string
fn brand_label(brand: &str) -> &str {
    keyring_type_label(brand).unwrap_or(brand)
}

/// Generate the default alias name for a new account
pub fn generate_alias_name(params: AliasParams<'_>) -> String {
    let AliasParams {
        keyring_type,
        brand_name,
        keyring_count,
        address_count,
    } = params;
    let brand = brand_name.filter(|b| !b.is_empty());

    if keyring_type == "HD Key Tree" {
        return format!("Seed Phrase {} #{}", keyring_count + 1, address_count + 1);
    }
    if keyring_type == "Simple Key Pair" {
        return format!("Private Key {}", keyring_count + 1);
    }
    if keyring_type == "Watch Address" || brand == Some("Watch Address") {
        return format!("Contact {}", address_count + 1);
    }
    if let Some(brand) = brand {
        return format!("{} {}", brand_label(brand), address_count + 1);
    }

    let label = keyring_type_label(keyring_type).unwrap_or(keyring_type);
    format!("{} {}", label, address_count + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_phrase_names() {
        let name = generate_alias_name(AliasParams {
            keyring_type: "HD Key Tree",
            ..Default::default()
        });
        assert_eq!(name, "Seed Phrase 1 #1");

        let name = generate_alias_name(AliasParams {
            keyring_type: "HD Key Tree",
            keyring_count: 1,
            address_count: 4,
            ..Default::default()
        });
        assert_eq!(name, "Seed Phrase 2 #5");
    }

    #[test]
    fn test_private_key_names() {
        let name = generate_alias_name(AliasParams {
            keyring_type: "Simple Key Pair",
            keyring_count: 2,
            ..Default::default()
        });
        assert_eq!(name, "Private Key 3");
    }

    #[test]
    fn test_contact_names() {
        let name = generate_alias_name(AliasParams {
            keyring_type: "Watch Address",
            address_count: 4,
            ..Default::default()
        });
        assert_eq!(name, "Contact 5");

        // watch accounts can also arrive with the type as brand
        let name = generate_alias_name(AliasParams {
            keyring_type: "WalletConnect",
            brand_name: Some("Watch Address"),
            ..Default::default()
        });
        assert_eq!(name, "Contact 1");
    }

    #[test]
    fn test_brand_names() {
        let name = generate_alias_name(AliasParams {
            keyring_type: "Ledger Hardware",
            brand_name: Some("Ledger"),
            ..Default::default()
        });
        assert_eq!(name, "Ledger 1");

        // registry wire strings used as brands get the friendly label
        let name = generate_alias_name(AliasParams {
            keyring_type: "WalletConnect",
            brand_name: Some("QR Hardware Wallet Device"),
            address_count: 1,
            ..Default::default()
        });
        assert_eq!(name, "Keystone 2");

        // unknown brands pass through
        let name = generate_alias_name(AliasParams {
            keyring_type: "WalletConnect",
            brand_name: Some("MetaMask"),
            ..Default::default()
        });
        assert_eq!(name, "MetaMask 1");
    }

    #[test]
    fn test_type_fallback_names() {
        let name = generate_alias_name(AliasParams {
            keyring_type: "Trezor Hardware",
            ..Default::default()
        });
        assert_eq!(name, "Trezor 1");

        let name = generate_alias_name(AliasParams {
            keyring_type: "Gnosis",
            address_count: 2,
            ..Default::default()
        });
        assert_eq!(name, "Safe 3");

        // unknown types stay usable
        let name = generate_alias_name(AliasParams {
            keyring_type: "Paper Wallet",
            ..Default::default()
        });
        assert_eq!(name, "Paper Wallet 1");
    }

    #[test]
    fn test_empty_brand_is_ignored() {
        let name = generate_alias_name(AliasParams {
            keyring_type: "Onekey Hardware",
            brand_name: Some(""),
            ..Default::default()
        });
        assert_eq!(name, "OneKey 1");
    }

    #[test]
    fn test_deterministic() {
        let params = AliasParams {
            keyring_type: "HD Key Tree",
            brand_name: None,
            keyring_count: 7,
            address_count: 11,
        };
        assert_eq!(generate_alias_name(params), generate_alias_name(params));
    }
}

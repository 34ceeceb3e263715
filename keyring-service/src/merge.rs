//! Folding restored vault entries into the live vault
//!
//! Used when importing a backup over an existing install. Entries already in
//! the live vault keep their position and their payload. Mnemonic keyrings
//! pair up by identity key (mnemonic as fallback) and only grow accounts and
//! active indexes. Hardware keyrings pair up by type and take the restored
//! payload, which carries fresher device bookkeeping. Private key entries
//! dedupe on the exact key string. Everything unmatched is appended in
//! restored order, so folding the same backup twice changes nothing.

use std::collections::HashSet;

use keyring_utils::{KeyringSerializedData, KeyringType};
use serde_json::{Map, Value};

/// Merge `incoming` vault entries into `current`
pub fn merge_vaults(
    current: Vec<KeyringSerializedData>,
    incoming: Vec<KeyringSerializedData>,
) -> Vec<KeyringSerializedData> {
    let mut merged = current;
    let mut seen_keys: HashSet<String> = merged
        .iter()
        .filter(|entry| entry.kind == KeyringType::SimpleKeyring.as_str())
        .flat_map(|entry| string_array(Some(&entry.data)))
        .collect();

    for entry in incoming {
        if entry.kind == KeyringType::SimpleKeyring.as_str() {
            let unseen: Vec<String> = string_array(Some(&entry.data))
                .into_iter()
                .filter(|key| !seen_keys.contains(key))
                .collect();
            if unseen.is_empty() {
                continue;
            }
            seen_keys.extend(unseen.iter().cloned());
            merged.push(KeyringSerializedData::new(
                entry.kind,
                Value::Array(unseen.into_iter().map(Value::String).collect()),
            ));
        } else if entry.kind == KeyringType::HdKeyring.as_str() {
            match find_mnemonic_match(&merged, &entry) {
                Some(i) => merge_mnemonic_payload(&mut merged[i].data, &entry.data),
                None => merged.push(entry),
            }
        } else {
            match merged.iter().position(|candidate| candidate.kind == entry.kind) {
                Some(i) => merge_hardware_payload(&mut merged[i].data, &entry.data),
                None => merged.push(entry),
            }
        }
    }
    merged
}

/// Find the mnemonic entry `incoming` refers to, by identity key when both
/// sides carry one, otherwise by the mnemonic itself
fn find_mnemonic_match(
    entries: &[KeyringSerializedData],
    incoming: &KeyringSerializedData,
) -> Option<usize> {
    let incoming_key = non_empty_str(incoming.data.get("publicKey"));
    let incoming_mnemonic = non_empty_str(incoming.data.get("mnemonic"));

    entries.iter().position(|entry| {
        if entry.kind != KeyringType::HdKeyring.as_str() {
            return false;
        }
        let key = non_empty_str(entry.data.get("publicKey"));
        match (key, incoming_key) {
            (Some(a), Some(b)) => a == b,
            _ => match (non_empty_str(entry.data.get("mnemonic")), incoming_mnemonic) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    })
}

fn merge_mnemonic_payload(current: &mut Value, incoming: &Value) {
    let (Some(current_map), Some(incoming_map)) = (current.as_object_mut(), incoming.as_object())
    else {
        return;
    };

    let accounts = union_accounts(
        string_array(current_map.get("accounts")),
        string_array(incoming_map.get("accounts")),
    );
    current_map.insert(
        "accounts".to_string(),
        Value::Array(accounts.into_iter().map(Value::String).collect()),
    );

    // Indexes may arrive either directly or via per-address details
    let mut indexes = u64_array(current_map.get("activeIndexes"));
    let mut index_set: HashSet<u64> = indexes.iter().copied().collect();
    for index in u64_array(incoming_map.get("activeIndexes")) {
        if index_set.insert(index) {
            indexes.push(index);
        }
    }
    if let Some(details) = incoming_map.get("accountDetails").and_then(Value::as_object) {
        for detail in details.values() {
            if let Some(index) = detail.get("index").and_then(Value::as_u64) {
                if index_set.insert(index) {
                    indexes.push(index);
                }
            }
        }
    }
    current_map.insert(
        "activeIndexes".to_string(),
        Value::Array(indexes.into_iter().map(Value::from).collect()),
    );

    if let Some(incoming_details) = incoming_map.get("accountDetails").and_then(Value::as_object) {
        let details = current_map
            .entry("accountDetails")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(details) = details.as_object_mut() {
            for (address, detail) in incoming_details {
                if !details.contains_key(address) {
                    details.insert(address.clone(), detail.clone());
                }
            }
        }
    }
}

fn merge_hardware_payload(current: &mut Value, incoming: &Value) {
    let (Some(current_map), Some(incoming_map)) = (current.as_object_mut(), incoming.as_object())
    else {
        return;
    };

    let accounts = union_accounts(
        string_array(current_map.get("accounts")),
        string_array(incoming_map.get("accounts")),
    );
    for (key, value) in incoming_map {
        if key == "accounts" {
            continue;
        }
        current_map.insert(key.clone(), value.clone());
    }
    current_map.insert(
        "accounts".to_string(),
        Value::Array(accounts.into_iter().map(Value::String).collect()),
    );
}

/// Append addresses from `incoming` that `current` lacks, comparing
/// case-insensitively
fn union_accounts(current: Vec<String>, incoming: Vec<String>) -> Vec<String> {
    let mut accounts = current;
    let mut lower: HashSet<String> = accounts.iter().map(|a| a.to_lowercase()).collect();
    for account in incoming {
        if lower.insert(account.to_lowercase()) {
            accounts.push(account);
        }
    }
    accounts
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn u64_array(value: Option<&Value>) -> Vec<u64> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(kind: &str, data: Value) -> KeyringSerializedData {
        KeyringSerializedData::new(kind, data)
    }

    fn sample_current() -> Vec<KeyringSerializedData> {
        vec![
            entry(
                "HD Key Tree",
                json!({
                    "mnemonic": "purse disorder fatigue stumble original echo swing sense above tornado twin alpha",
                    "activeIndexes": [0],
                    "hdPath": "m/44'/60'/0'/0",
                    "byImport": true,
                    "accounts": ["0x2160C8C2e02616BA53b0B72252a860C1552666F4"],
                    "publicKey": "0x029345f6"
                }),
            ),
            entry(
                "Onekey Hardware",
                json!({
                    "hdPath": "m/44'/60'/0'/0/0",
                    "accounts": [],
                    "paths": {},
                    "unlockedAccount": 0,
                    "accountDetails": {}
                }),
            ),
            entry("Simple Key Pair", json!(["2f59b53f2"])),
        ]
    }

    #[test]
    fn test_matched_mnemonic_entry_keeps_current_payload() {
        let incoming = vec![entry(
            "HD Key Tree",
            json!({
                "mnemonic": "purse disorder fatigue stumble original echo swing sense above tornado twin alpha",
                "accounts": ["0x2160c8c2e02616ba53b0b72252a860c1552666f4"],
                "publicKey": "0x029345f6",
                "accountDetails": {
                    "0x2160c8c2e02616ba53b0b72252a860c1552666f4": { "index": 0 },
                    "0x9353b0b72252a860c1552666f42160c8c2e02616": { "index": 3 }
                }
            }),
        )];
        let merged = merge_vaults(sample_current(), incoming);

        assert_eq!(merged.len(), 3);
        let data = &merged[0].data;
        assert_eq!(data["hdPath"], "m/44'/60'/0'/0");
        assert_eq!(data["byImport"], true);
        // mixed-case duplicate is not re-added
        assert_eq!(
            data["accounts"],
            json!(["0x2160C8C2e02616BA53b0B72252a860C1552666F4"])
        );
        // the detail row for index 3 activates it
        assert_eq!(data["activeIndexes"], json!([0, 3]));
        assert_eq!(
            data["accountDetails"]["0x9353b0b72252a860c1552666f42160c8c2e02616"]["index"],
            3
        );
    }

    #[test]
    fn test_unmatched_entries_append_in_order() {
        let incoming = vec![
            entry(
                "HD Key Tree",
                json!({
                    "mnemonic": "gorilla latin teach hat almost bless dilemma menu extra planet mean one",
                    "accounts": [],
                    "publicKey": "0x03a17c"
                }),
            ),
            entry("Watch Address", json!({ "accounts": ["0xdd1e9789Bb1d0Bd1A367E83Af7f7b6fa0dd11FE0"] })),
        ];
        let merged = merge_vaults(sample_current(), incoming);

        assert_eq!(merged.len(), 5);
        assert_eq!(merged[3].kind, "HD Key Tree");
        assert_eq!(merged[3].data["publicKey"], "0x03a17c");
        assert_eq!(merged[4].kind, "Watch Address");
    }

    #[test]
    fn test_private_key_entries_dedupe_on_exact_string() {
        let incoming = vec![
            entry("Simple Key Pair", json!(["2f59b"])),
            entry("Simple Key Pair", json!(["2f59b53f2"])),
            entry("Simple Key Pair", json!(["5f97ab", "2f59b"])),
        ];
        let merged = merge_vaults(sample_current(), incoming);

        // a key prefix is not a duplicate, only the exact string is
        assert_eq!(merged.len(), 5);
        assert_eq!(merged[3].data, json!(["2f59b"]));
        assert_eq!(merged[4].data, json!(["5f97ab"]));
    }

    #[test]
    fn test_hardware_entry_takes_incoming_payload() {
        let incoming = vec![entry(
            "Onekey Hardware",
            json!({
                "hdPath": "m/44'/60'/0'/0/0",
                "accounts": ["0xaAE813B02e10071D7e55046e1Fe2D6b42FfE1afe"],
                "paths": { "0xaAE813B02e10071D7e55046e1Fe2D6b42FfE1afe": 0 },
                "accountDetails": {
                    "0xaAE813B02e10071D7e55046e1Fe2D6b42FfE1afe": { "hdPathType": "BIP44" }
                }
            }),
        )];
        let merged = merge_vaults(sample_current(), incoming);

        assert_eq!(merged.len(), 3);
        let data = &merged[1].data;
        assert_eq!(
            data["accounts"],
            json!(["0xaAE813B02e10071D7e55046e1Fe2D6b42FfE1afe"])
        );
        assert_eq!(
            data["paths"],
            json!({ "0xaAE813B02e10071D7e55046e1Fe2D6b42FfE1afe": 0 })
        );
        assert_eq!(
            data["accountDetails"]["0xaAE813B02e10071D7e55046e1Fe2D6b42FfE1afe"]["hdPathType"],
            "BIP44"
        );
        // keys the restored payload lacks survive
        assert_eq!(data["unlockedAccount"], 0);
    }

    #[test]
    fn test_mnemonic_fallback_when_identity_key_missing() {
        let current = vec![entry(
            "HD Key Tree",
            json!({
                "mnemonic": "chest venue cruise hub cheap tourist tumble tube era appear square dust",
                "activeIndexes": [],
                "accounts": []
            }),
        )];
        let incoming = vec![entry(
            "HD Key Tree",
            json!({
                "mnemonic": "chest venue cruise hub cheap tourist tumble tube era appear square dust",
                "activeIndexes": [1],
                "accounts": ["0x51ca39B966aa51dbf96a16C0cA6849c0a5C2F0aB"]
            }),
        )];
        let merged = merge_vaults(current, incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].data["activeIndexes"], json!([1]));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let incoming = vec![
            entry(
                "HD Key Tree",
                json!({
                    "mnemonic": "inner cook dilemma menu extra planet mean one gorilla latin teach hat",
                    "activeIndexes": [0, 1],
                    "accounts": ["0xabc1", "0xabc2"],
                    "publicKey": "0x02f00d"
                }),
            ),
            entry("Simple Key Pair", json!(["5da5e1"])),
            entry("Ledger Hardware", json!({ "accounts": ["0xcc01"], "hdPath": "m/44'/60'/0'" })),
        ];
        let once = merge_vaults(sample_current(), incoming.clone());
        let twice = merge_vaults(once.clone(), incoming);
        assert_eq!(once, twice);
    }
}

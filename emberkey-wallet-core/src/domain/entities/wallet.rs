//! Wallet record and related value objects
//!
//! The durable record is the only thing persisted per device. It carries the
//! encrypted mnemonic and public metadata, never a private key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::crypto::password::KdfConfig;
use crate::shared::types::Address;

/// Durable single-slot wallet record, stored as JSON
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedWalletRecord {
    pub address: Address,
    /// base64 of salt ‖ nonce ‖ ciphertext+tag
    pub encrypted_mnemonic: String,
    /// Argon2id work factors the mnemonic was sealed with
    #[serde(default)]
    pub kdf: KdfConfig,
    pub created_at: DateTime<Utc>,
    pub last_access_at: DateTime<Utc>,
}

impl EncryptedWalletRecord {
    pub fn new(address: Address, encrypted_mnemonic: String, kdf: KdfConfig) -> Self {
        let now = Utc::now();
        Self {
            address,
            encrypted_mnemonic,
            kdf,
            created_at: now,
            last_access_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_access_at = Utc::now();
    }

    /// Public part of the record
    pub fn info(&self) -> WalletInfo {
        WalletInfo {
            address: self.address.clone(),
            created_at: self.created_at,
            last_access_at: self.last_access_at,
        }
    }
}

// Debug omits the ciphertext
impl std::fmt::Debug for EncryptedWalletRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedWalletRecord")
            .field("address", &self.address)
            .field("kdf", &self.kdf)
            .field("created_at", &self.created_at)
            .field("last_access_at", &self.last_access_at)
            .finish_non_exhaustive()
    }
}

/// Safe wallet information for display (no sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub address: Address,
    pub created_at: DateTime<Utc>,
    pub last_access_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_layout() {
        let record = EncryptedWalletRecord::new("0xabc".to_string(), "Zm9v".to_string(), KdfConfig::default());
        let json = serde_json::to_value(&record).expect("Failed to serialize record");
        assert_eq!(json["address"], "0xabc");
        assert_eq!(json["encryptedMnemonic"], "Zm9v");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("lastAccessAt").is_some());
        assert_eq!(json["kdf"]["memory_kib"], 65536);

        let back: EncryptedWalletRecord = serde_json::from_value(json).expect("Failed to deserialize record");
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_without_kdf_uses_defaults() {
        let json = serde_json::json!({
            "address": "0xabc",
            "encryptedMnemonic": "Zm9v",
            "createdAt": "2024-01-01T00:00:00Z",
            "lastAccessAt": "2024-01-01T00:00:00Z",
        });
        let record: EncryptedWalletRecord = serde_json::from_value(json).expect("Failed to deserialize record");
        assert_eq!(record.kdf, KdfConfig::default());
    }

    #[test]
    fn test_debug_hides_ciphertext() {
        let record = EncryptedWalletRecord::new("0xabc".to_string(), "SECRETBLOB".to_string(), KdfConfig::default());
        assert!(!format!("{:?}", record).contains("SECRETBLOB"));
    }

    #[test]
    fn test_touch_keeps_created_at() {
        let mut record = EncryptedWalletRecord::new("0xabc".to_string(), "Zm9v".to_string(), KdfConfig::default());
        let created = record.created_at;
        record.touch();
        assert_eq!(record.created_at, created);
        assert!(record.last_access_at >= created);
    }
}

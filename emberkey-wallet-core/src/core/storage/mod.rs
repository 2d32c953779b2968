//! Encrypted wallet storage
//!
//! Keeps exactly one `EncryptedWalletRecord` in a fixed slot of a
//! `PlatformStorage`. The mnemonic is sealed with a password-derived key;
//! key derivation runs on the blocking pool so it never stalls the runtime.

use crate::core::crypto::encryption::{EncryptedData, EncryptionManager};
use crate::core::crypto::keys::{KeyManager, SecureSeedPhrase};
use crate::core::crypto::password::KdfConfig;
use crate::domain::{EncryptedWalletRecord, WalletInfo};
use crate::infrastructure::platform::PlatformStorage;
use crate::shared::constants::WALLET_STORAGE_KEY;
use crate::shared::error::WalletError;
use crate::shared::types::WalletResult;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Single-slot encrypted credential store
#[derive(Clone)]
pub struct EncryptedStore {
    storage: Arc<dyn PlatformStorage>,
    encryption: EncryptionManager,
}

impl EncryptedStore {
    pub fn new(storage: Arc<dyn PlatformStorage>, kdf: KdfConfig) -> Self {
        Self {
            storage,
            encryption: EncryptionManager::new(kdf),
        }
    }

    /// Seal `plaintext` and return the base64 blob
    pub async fn encrypt(&self, plaintext: &[u8], password: &str) -> WalletResult<String> {
        let encryption = self.encryption;
        let plaintext = Zeroizing::new(plaintext.to_vec());
        let password = Zeroizing::new(password.as_bytes().to_vec());
        let sealed = tokio::task::spawn_blocking(move || encryption.seal(&plaintext, &password)).await??;
        Ok(sealed.to_base64())
    }

    /// Open a base64 blob sealed with the current work factors.
    /// Wrong password and corruption both yield `DecryptionFailed`.
    pub async fn decrypt(&self, blob: &str, password: &str) -> WalletResult<Zeroizing<Vec<u8>>> {
        Self::open_blob(self.encryption, blob, password).await
    }

    async fn open_blob(encryption: EncryptionManager, blob: &str, password: &str) -> WalletResult<Zeroizing<Vec<u8>>> {
        let sealed = EncryptedData::from_base64(blob)?;
        let password = Zeroizing::new(password.as_bytes().to_vec());
        tokio::task::spawn_blocking(move || encryption.open(&sealed, &password)).await?
    }

    /// Decrypt the record's mnemonic with the work factors it was sealed under
    async fn open_record(&self, record: &EncryptedWalletRecord, password: &str) -> WalletResult<SecureSeedPhrase> {
        if record.kdf != *self.encryption.kdf() {
            log::debug!("Wallet record sealed with {:?}; opening with its own work factors", record.kdf);
        }
        let plaintext = Self::open_blob(EncryptionManager::new(record.kdf), &record.encrypted_mnemonic, password).await?;
        std::str::from_utf8(&plaintext)
            .map(SecureSeedPhrase::new)
            .map_err(|_| WalletError::DecryptionFailed)
    }

    /// Write a fresh record for `address`, replacing any existing one
    pub async fn store(&self, address: &str, mnemonic: &SecureSeedPhrase, password: &str) -> WalletResult<EncryptedWalletRecord> {
        let encrypted = self.encrypt(mnemonic.as_str().as_bytes(), password).await?;
        let record = EncryptedWalletRecord::new(address.to_string(), encrypted, *self.encryption.kdf());
        self.write(&record)?;
        log::info!("Stored encrypted wallet record for {}", record.address);
        Ok(record)
    }

    /// Decrypt the stored mnemonic and refresh `lastAccessAt`
    pub async fn load(&self, password: &str) -> WalletResult<(EncryptedWalletRecord, SecureSeedPhrase)> {
        let mut record = self.read()?;
        let phrase = self.open_record(&record, password).await?;

        record.touch();
        self.write(&record)?;
        Ok((record, phrase))
    }

    /// Re-seal the record under the current work factors, keeping its original `createdAt`
    pub async fn update(&self, address: &str, mnemonic: &SecureSeedPhrase, password: &str) -> WalletResult<EncryptedWalletRecord> {
        let previous = self.read()?;
        let encrypted = self.encrypt(mnemonic.as_str().as_bytes(), password).await?;
        let mut record = EncryptedWalletRecord::new(address.to_string(), encrypted, *self.encryption.kdf());
        record.created_at = previous.created_at;
        self.write(&record)?;
        log::info!("Updated encrypted wallet record for {}", record.address);
        Ok(record)
    }

    pub fn delete(&self) -> WalletResult<()> {
        self.storage.delete(WALLET_STORAGE_KEY)?;
        log::info!("Deleted encrypted wallet record");
        Ok(())
    }

    pub fn has_wallet(&self) -> WalletResult<bool> {
        self.storage.exists(WALLET_STORAGE_KEY)
    }

    /// Public metadata without a password
    pub fn peek_info(&self) -> WalletResult<Option<WalletInfo>> {
        if !self.has_wallet()? {
            return Ok(None);
        }
        Ok(Some(self.read()?.info()))
    }

    /// Full decrypt plus checksum validation. Never errors.
    ///
    /// A successful decrypt refreshes `lastAccessAt` like `load`.
    pub async fn validate_integrity(&self, password: &str) -> bool {
        let mut record = match self.read() {
            Ok(record) => record,
            Err(_) => return false,
        };
        let phrase = match self.open_record(&record, password).await {
            Ok(phrase) => phrase,
            Err(_) => return false,
        };

        record.touch();
        if let Err(e) = self.write(&record) {
            log::warn!("Failed to refresh wallet access time: {}", e);
        }
        KeyManager::validate_mnemonic(phrase.as_str())
    }

    fn read(&self) -> WalletResult<EncryptedWalletRecord> {
        if !self.storage.exists(WALLET_STORAGE_KEY)? {
            return Err(WalletError::wallet_not_found("No wallet stored on this device"));
        }
        let raw = self.storage.retrieve(WALLET_STORAGE_KEY)?;
        serde_json::from_slice(&raw).map_err(|e| WalletError::storage(format!("Corrupted wallet record: {}", e)))
    }

    fn write(&self, record: &EncryptedWalletRecord) -> WalletResult<()> {
        let raw = serde_json::to_vec(record)?;
        self.storage.store(WALLET_STORAGE_KEY, &raw)
    }
}

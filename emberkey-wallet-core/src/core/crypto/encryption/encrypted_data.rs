use crate::shared::constants::{NONCE_SIZE, SALT_SIZE, TAG_SIZE};
use crate::shared::error::WalletError;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Sealed blob: `salt(16) ‖ nonce(12) ‖ ciphertext+tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    pub salt: [u8; SALT_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    /// AEAD output, tag included
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// A blob too short to hold a tag cannot be authentic, so it fails like a bad tag
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(WalletError::DecryptionFailed);
        }
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        salt.copy_from_slice(&bytes[..SALT_SIZE]);
        nonce.copy_from_slice(&bytes[SALT_SIZE..SALT_SIZE + NONCE_SIZE]);
        Ok(Self {
            salt,
            nonce,
            ciphertext: bytes[SALT_SIZE + NONCE_SIZE..].to_vec(),
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, WalletError> {
        let bytes = STANDARD.decode(encoded.trim()).map_err(|_| WalletError::DecryptionFailed)?;
        Self::from_bytes(&bytes)
    }
}

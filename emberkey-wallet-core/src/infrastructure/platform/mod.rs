//! Platform storage backends
//!
//! `PlatformStorage` is the byte-level persistence seam. The durable wallet
//! record lives in a `FileStorage`; the per-process session record lives in a
//! `MemoryStorage` so that a restart can never resurrect a session.

use crate::shared::constants::STORAGE_DIR_NAME;
use crate::shared::error::WalletError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use zeroize::Zeroize;

/// Platform-specific storage implementation
pub trait PlatformStorage: Send + Sync {
    /// Store data
    fn store(&self, key: &str, data: &[u8]) -> Result<(), WalletError>;

    /// Retrieve data
    fn retrieve(&self, key: &str) -> Result<Vec<u8>, WalletError>;

    /// Delete data; deleting a missing key is not an error
    fn delete(&self, key: &str) -> Result<(), WalletError>;

    /// Check if data exists
    fn exists(&self, key: &str) -> Result<bool, WalletError>;

    /// List all stored keys
    fn list_keys(&self) -> Result<Vec<String>, WalletError>;
}

/// File-backed storage, one file per key under a root directory
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Storage rooted at the OS data directory
    pub fn new() -> Result<Self, WalletError> {
        let base_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("./secure_storage"));
        Self::with_root(base_dir.join(STORAGE_DIR_NAME))
    }

    /// Storage rooted at `root`, created if missing
    pub fn with_root(root: impl Into<PathBuf>) -> Result<Self, WalletError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        log::debug!("File storage rooted at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Filenames are a hash of the key so the directory does not enumerate slots
    fn file_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash = hasher.finalize();
        self.root.join(format!("{}.dat", hex::encode(&hash[..16])))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn read_index(&self) -> Result<Vec<String>, WalletError> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    fn write_index(&self, keys: &[String]) -> Result<(), WalletError> {
        let raw = serde_json::to_vec(keys)?;
        fs::write(self.index_path(), raw)?;
        Ok(())
    }

    #[cfg(unix)]
    fn restrict_permissions(file: &File) -> Result<(), WalletError> {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn restrict_permissions(_file: &File) -> Result<(), WalletError> {
        Ok(())
    }
}

impl PlatformStorage for FileStorage {
    fn store(&self, key: &str, data: &[u8]) -> Result<(), WalletError> {
        let path = self.file_path(key);
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            Self::restrict_permissions(&file)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        let mut keys = self.read_index()?;
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
            self.write_index(&keys)?;
        }
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Vec<u8>, WalletError> {
        let path = self.file_path(key);
        if !path.exists() {
            return Err(WalletError::storage(format!("Key not found: {}", key)));
        }
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        Ok(data)
    }

    fn delete(&self, key: &str) -> Result<(), WalletError> {
        let path = self.file_path(key);
        if path.exists() {
            // Overwrite before unlinking
            let len = fs::metadata(&path)?.len() as usize;
            fs::write(&path, vec![0u8; len])?;
            fs::remove_file(&path)?;
        }
        let mut keys = self.read_index()?;
        let before = keys.len();
        keys.retain(|k| k != key);
        if keys.len() != before {
            self.write_index(&keys)?;
        }
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, WalletError> {
        Ok(self.file_path(key).exists())
    }

    fn list_keys(&self) -> Result<Vec<String>, WalletError> {
        self.read_index()
    }
}

/// In-memory storage scoped to the owning process
#[derive(Default)]
pub struct MemoryStorage {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlatformStorage for MemoryStorage {
    fn store(&self, key: &str, data: &[u8]) -> Result<(), WalletError> {
        if let Some(mut old) = self.entries().insert(key.to_string(), data.to_vec()) {
            old.zeroize();
        }
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Vec<u8>, WalletError> {
        self.entries()
            .get(key)
            .cloned()
            .ok_or_else(|| WalletError::storage(format!("Key not found: {}", key)))
    }

    fn delete(&self, key: &str) -> Result<(), WalletError> {
        if let Some(mut old) = self.entries().remove(key) {
            old.zeroize();
        }
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, WalletError> {
        Ok(self.entries().contains_key(key))
    }

    fn list_keys(&self) -> Result<Vec<String>, WalletError> {
        Ok(self.entries().keys().cloned().collect())
    }
}

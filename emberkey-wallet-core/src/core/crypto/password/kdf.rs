use super::KdfConfig;
use crate::shared::constants::KEY_SIZE;
use crate::shared::error::WalletError;
use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

/// Derive a 32-byte encryption key from `password` and `salt` with Argon2id.
///
/// CPU and memory bound; async callers run it on a blocking thread.
pub fn derive_key(password: &[u8], salt: &[u8], config: &KdfConfig) -> Result<Zeroizing<[u8; KEY_SIZE]>, WalletError> {
    let params = Params::new(config.memory_kib, config.iterations, config.parallelism, Some(KEY_SIZE))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    argon2.hash_password_into(password, salt, &mut *key)?;
    Ok(key)
}

//! Constants for the wallet core
//!
//! This module contains all constants used throughout the wallet core.

// Key material
pub const PRIVATE_KEY_SIZE: usize = 32;
pub const PUBLIC_KEY_SIZE: usize = 65;
pub const ADDRESS_SIZE: usize = 20;
pub const DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

// Encryption blob layout: salt ‖ nonce ‖ ciphertext+tag
pub const KEY_SIZE: usize = 32;
pub const SALT_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

// Argon2id work factors
pub const DEFAULT_KDF_MEMORY_KIB: u32 = 65536;
pub const DEFAULT_KDF_ITERATIONS: u32 = 3;
pub const DEFAULT_KDF_PARALLELISM: u32 = 4;

// Storage
pub const WALLET_STORAGE_KEY: &str = "emberkey_wallet";
pub const SESSION_STORAGE_KEY: &str = "emberkey_session";
pub const STORAGE_DIR_NAME: &str = "emberkey";

// Session (liveness heartbeat policy)
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 10_000;

// Transactions
pub const EIP1559_TX_TYPE: u8 = 0x02;
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;
pub const CONTRACT_CALL_GAS_LIMIT: u64 = 100_000;
pub const GAS_MARGIN_NUMERATOR: u64 = 12;
pub const GAS_MARGIN_DENOMINATOR: u64 = 10;
pub const DEFAULT_GAS_PRICE: u64 = 20_000_000_000; // 20 Gwei
pub const MIN_PRIORITY_FEE: u64 = 1_000_000_000; // 1 Gwei
pub const FEE_HISTORY_BLOCKS: u64 = 4;
pub const FEE_HISTORY_PERCENTILES: [f64; 2] = [25.0, 75.0];
pub const DEFAULT_CONFIRMATION_POLL_MS: u64 = 2_000;
pub const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

// ERC-20 selectors
pub const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
pub const ERC20_BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

// EIP-191
pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

// RPC
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 30_000;

// Configuration
pub const CONFIG_FILE_NAME: &str = "emberkey";
pub const CONFIG_ENV_PREFIX: &str = "EMBERKEY";
pub const DEFAULT_NETWORK_ID: &str = "sepolia";

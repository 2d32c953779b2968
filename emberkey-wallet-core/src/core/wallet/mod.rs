//! Wallet engine façade
//!
//! Composes the key manager, encrypted store, session authority and the
//! per-network transaction stack into the operations a UI or CLI calls.
//!
//! Mutating operations (create, unlock, import, change password, delete,
//! switch network) lock the wallet first, and lock it again if they fail, so
//! no partial state survives a failed operation. Everything that touches the
//! key or the network on the wallet's behalf requires a valid session and
//! fails before any RPC call without one.

use crate::core::crypto::keys::{KeyManager, SecureSeedPhrase};
use crate::core::session::{ActivityEvent, SessionAuthority, SessionState};
use crate::core::storage::EncryptedStore;
use crate::core::transactions::{balance_of_calldata, decode_uint, TransactionEngine};
use crate::domain::{NetworkConfig, WalletInfo};
use crate::infrastructure::config::WalletConfig;
use crate::infrastructure::platform::{MemoryStorage, PlatformStorage};
use crate::infrastructure::rpc::{EthRpc, HttpRpcClient, RpcClient};
use crate::shared::error::{OperationFailure, OperationResult, WalletError};
use crate::shared::types::{
    Address, CreatedWallet, FeeEstimate, MnemonicStrength, SentTransaction, TransactionReceipt, TxOverrides,
    WalletResult,
};
use crate::shared::utils::{parse_ether, parse_units, validate_ethereum_address};
use ethers::types::U256;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use zeroize::Zeroizing;

/// Builds the RPC transport for a network
pub type RpcFactory = Arc<dyn Fn(&NetworkConfig) -> WalletResult<Arc<dyn RpcClient>> + Send + Sync>;

struct NetworkStack {
    network: NetworkConfig,
    transactions: Arc<TransactionEngine>,
}

/// Single-wallet engine
pub struct WalletEngine {
    config: WalletConfig,
    keys: RwLock<KeyManager>,
    store: EncryptedStore,
    session: SessionAuthority,
    stack: StdRwLock<NetworkStack>,
    rpc_factory: RpcFactory,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl WalletEngine {
    /// Engine backed by file storage and HTTP JSON-RPC
    pub fn new(config: WalletConfig) -> WalletResult<Self> {
        let durable: Arc<dyn PlatformStorage> = Arc::new(config.durable_storage()?);
        let ephemeral: Arc<dyn PlatformStorage> = Arc::new(MemoryStorage::new());
        let timeout = config.rpc_timeout();
        let rpc_factory: RpcFactory = Arc::new(move |network: &NetworkConfig| {
            let client: Arc<dyn RpcClient> = Arc::new(HttpRpcClient::new(network.rpc_url.clone(), timeout)?);
            Ok(client)
        });
        Self::with_parts(config, durable, ephemeral, rpc_factory)
    }

    /// `ephemeral` holds the session record and must not outlive the process
    pub fn with_parts(
        config: WalletConfig,
        durable: Arc<dyn PlatformStorage>,
        ephemeral: Arc<dyn PlatformStorage>,
        rpc_factory: RpcFactory,
    ) -> WalletResult<Self> {
        config.validate()?;
        let network = config.default_network()?.clone();
        let stack = build_stack(&config, &rpc_factory, network)?;
        log::info!("Wallet engine ready on {} (chain {})", stack.network.id, stack.network.chain_id);

        Ok(Self {
            keys: RwLock::new(KeyManager::new()),
            store: EncryptedStore::new(durable, config.kdf),
            session: SessionAuthority::new(ephemeral, config.session),
            stack: StdRwLock::new(stack),
            rpc_factory,
            heartbeat: Mutex::new(None),
            config,
        })
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionAuthority {
        &self.session
    }

    /// Currently selected network
    pub fn network(&self) -> NetworkConfig {
        self.stack_read().network.clone()
    }

    pub fn transactions(&self) -> Arc<TransactionEngine> {
        self.stack_read().transactions.clone()
    }

    // Lifecycle

    /// Generate a 12-word wallet, seal it under `password` and unlock it
    pub async fn create_wallet(&self, password: &str) -> OperationResult<CreatedWallet> {
        self.create_wallet_with_strength(password, MnemonicStrength::default()).await
    }

    pub async fn create_wallet_with_strength(
        &self,
        password: &str,
        strength: MnemonicStrength,
    ) -> OperationResult<CreatedWallet> {
        self.lock_wallet().await;
        let result = self.create_inner(password, strength).await;
        self.settle("create_wallet", result).await
    }

    /// Decrypt the stored mnemonic and open a session
    pub async fn unlock_wallet(&self, password: &str) -> OperationResult<Address> {
        self.lock_wallet().await;
        let result = self.unlock_inner(password).await;
        self.settle("unlock_wallet", result).await
    }

    /// Restore from an existing mnemonic
    pub async fn import_wallet(&self, mnemonic: &str, password: &str) -> OperationResult<Address> {
        self.lock_wallet().await;
        let result = self.import_inner(mnemonic, password).await;
        self.settle("import_wallet", result).await
    }

    /// Re-seal the record under `new_password`; the wallet stays unlocked
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> OperationResult<Address> {
        self.lock_wallet().await;
        let result = self.change_password_inner(old_password, new_password).await;
        self.settle("change_password", result).await
    }

    /// Remove the stored wallet after password confirmation
    pub async fn delete_wallet(&self, password: &str) -> OperationResult<()> {
        self.lock_wallet().await;
        let result = self.delete_inner(password).await;
        self.settle("delete_wallet", result).await
    }

    /// Select another configured network. The key is re-derived from the
    /// decrypted mnemonic; on failure the wallet stays locked on the old network.
    pub async fn switch_network(&self, network_id: &str, password: &str) -> OperationResult<NetworkConfig> {
        self.lock_wallet().await;
        let result = self.switch_network_inner(network_id, password).await;
        self.settle("switch_network", result).await
    }

    /// Wipe the key and end the session. The stored record is kept.
    pub async fn logout(&self) {
        self.lock_wallet().await;
        log::info!("Wallet locked");
    }

    // Session

    pub fn has_valid_session(&self) -> bool {
        self.session.has_valid_session()
    }

    /// Session state authenticated and a wallet record present
    pub fn is_fully_authenticated(&self) -> bool {
        self.session.is_fully_authenticated() && self.store.has_wallet().unwrap_or(false)
    }

    pub fn record_activity(&self, event: ActivityEvent) -> bool {
        self.session.record_activity(event)
    }

    /// Feed UI or CLI activity into the session until the sender is dropped
    pub fn drive_activity(&self, events: mpsc::Receiver<ActivityEvent>) -> JoinHandle<()> {
        self.session.drive(events)
    }

    /// Address, createdAt and lastAccessAt without a password
    pub fn wallet_info(&self) -> OperationResult<Option<WalletInfo>> {
        self.store.peek_info().map_err(OperationFailure::from)
    }

    // Transactions

    pub async fn send_eth(&self, to: &str, value: U256, overrides: &TxOverrides) -> OperationResult<SentTransaction> {
        self.send_inner(to, value, overrides).await.map_err(OperationFailure::from)
    }

    /// `amount` in ether, e.g. `"0.25"`
    pub async fn send_eth_decimal(&self, to: &str, amount: &str) -> OperationResult<SentTransaction> {
        let value = parse_ether(amount)?;
        self.send_eth(to, value, &TxOverrides::default()).await
    }

    /// ERC-20 `transfer` of `amount` base units
    pub async fn send_token(
        &self,
        token: &str,
        to: &str,
        amount: U256,
        overrides: &TxOverrides,
    ) -> OperationResult<SentTransaction> {
        self.send_token_inner(token, to, amount, overrides)
            .await
            .map_err(OperationFailure::from)
    }

    pub async fn send_token_decimal(
        &self,
        token: &str,
        to: &str,
        amount: &str,
        decimals: u32,
    ) -> OperationResult<SentTransaction> {
        let amount = parse_units(amount, decimals)?;
        self.send_token(token, to, amount, &TxOverrides::default()).await
    }

    /// Native balance in wei
    pub async fn balance(&self) -> OperationResult<U256> {
        self.balance_inner().await.map_err(OperationFailure::from)
    }

    /// ERC-20 `balanceOf` for the wallet address
    pub async fn token_balance(&self, token: &str) -> OperationResult<U256> {
        self.token_balance_inner(token).await.map_err(OperationFailure::from)
    }

    /// EIP-191 `personal_sign`
    pub async fn sign_message(&self, message: &[u8]) -> OperationResult<String> {
        self.sign_message_inner(message).await.map_err(OperationFailure::from)
    }

    /// Current fee estimate for the selected network
    pub async fn fee_data(&self) -> FeeEstimate {
        self.transactions().fee_oracle().fee_data().await
    }

    /// Does not need a session: a broadcast transaction stays valid regardless
    pub async fn wait_for_confirmation(
        &self,
        hash: &str,
        confirmations: Option<u64>,
        timeout: Option<Duration>,
    ) -> OperationResult<TransactionReceipt> {
        let transactions = self.transactions();
        let policy = *transactions.policy();
        let confirmations = confirmations.unwrap_or(policy.confirmations);
        let timeout = timeout.unwrap_or(Duration::from_millis(policy.confirmation_timeout_ms));
        transactions
            .wait_for_confirmation(hash, confirmations, timeout)
            .await
            .map_err(OperationFailure::from)
    }

    // Reveal

    /// Session plus password re-entry
    pub async fn reveal_mnemonic(&self, password: &str) -> OperationResult<SecureSeedPhrase> {
        self.reveal_mnemonic_inner(password).await.map_err(OperationFailure::from)
    }

    /// Session plus password re-entry; `0x`-prefixed hex
    pub async fn reveal_private_key(&self, password: &str) -> OperationResult<Zeroizing<String>> {
        self.reveal_private_key_inner(password)
            .await
            .map_err(OperationFailure::from)
    }

    async fn create_inner(&self, password: &str, strength: MnemonicStrength) -> WalletResult<CreatedWallet> {
        self.ensure_slot_free()?;
        let (mnemonic, address) = self.keys.write().await.generate(strength)?;
        self.store.store(&address, &mnemonic, password).await?;
        self.open_session(&address)?;
        log::info!("Wallet created: {}", address);
        Ok(CreatedWallet { address, mnemonic })
    }

    async fn unlock_inner(&self, password: &str) -> WalletResult<Address> {
        let (address, _) = self.restore_keys(password).await?;
        self.open_session(&address)?;
        log::info!("Wallet unlocked: {}", address);
        Ok(address)
    }

    async fn import_inner(&self, mnemonic: &str, password: &str) -> WalletResult<Address> {
        self.ensure_slot_free()?;
        let phrase = SecureSeedPhrase::new(&Zeroizing::new(mnemonic.to_lowercase()));
        let address = self.keys.write().await.import_from_mnemonic(phrase.as_str())?;
        self.store.store(&address, &phrase, password).await?;
        self.open_session(&address)?;
        log::info!("Wallet imported: {}", address);
        Ok(address)
    }

    async fn change_password_inner(&self, old_password: &str, new_password: &str) -> WalletResult<Address> {
        let (address, mnemonic) = self.restore_keys(old_password).await?;
        self.store.update(&address, &mnemonic, new_password).await?;
        self.open_session(&address)?;
        log::info!("Password changed for {}", address);
        Ok(address)
    }

    async fn delete_inner(&self, password: &str) -> WalletResult<()> {
        if !self.store.has_wallet()? {
            return Err(WalletError::wallet_not_found("No wallet stored on this device"));
        }
        if !self.store.validate_integrity(password).await {
            return Err(WalletError::DecryptionFailed);
        }
        self.session.clear_all(&self.store)?;
        log::info!("Wallet deleted");
        Ok(())
    }

    async fn switch_network_inner(&self, network_id: &str, password: &str) -> WalletResult<NetworkConfig> {
        let network = self.config.network(network_id)?.clone();
        let stack = build_stack(&self.config, &self.rpc_factory, network.clone())?;
        if self.config.transactions.verify_chain_id {
            stack.transactions.verify_chain().await?;
        }

        let (address, _) = self.restore_keys(password).await?;
        *self.stack.write().unwrap_or_else(PoisonError::into_inner) = stack;
        self.open_session(&address)?;
        log::info!("Switched to {} (chain {})", network.id, network.chain_id);
        Ok(network)
    }

    async fn send_inner(&self, to: &str, value: U256, overrides: &TxOverrides) -> WalletResult<SentTransaction> {
        self.require_session().await?;
        validate_ethereum_address(to)?;

        let transactions = self.transactions();
        let keys = self.keys.read().await;
        let sent = transactions.send(&keys, to, value, Vec::new(), overrides).await?;
        self.session.record_activity(ActivityEvent::Input);
        Ok(sent)
    }

    async fn send_token_inner(
        &self,
        token: &str,
        to: &str,
        amount: U256,
        overrides: &TxOverrides,
    ) -> WalletResult<SentTransaction> {
        self.require_session().await?;
        validate_ethereum_address(token)?;
        validate_ethereum_address(to)?;

        let transactions = self.transactions();
        let keys = self.keys.read().await;
        let sent = transactions.send_token(&keys, token, to, amount, overrides).await?;
        self.session.record_activity(ActivityEvent::Input);
        Ok(sent)
    }

    async fn balance_inner(&self) -> WalletResult<U256> {
        self.require_session().await?;
        let address = self.keys.read().await.address()?.to_string();
        self.transactions().rpc().balance(&address).await
    }

    async fn token_balance_inner(&self, token: &str) -> WalletResult<U256> {
        self.require_session().await?;
        validate_ethereum_address(token)?;
        let address = self.keys.read().await.address()?.to_string();
        let rpc = self.transactions().rpc().clone();
        let output = rpc.call(token, &balance_of_calldata(&address)?).await?;
        decode_uint(&output)
    }

    async fn sign_message_inner(&self, message: &[u8]) -> WalletResult<String> {
        self.require_session().await?;
        let signature = self.keys.read().await.sign_message(message)?;
        self.session.record_activity(ActivityEvent::Input);
        Ok(signature)
    }

    async fn reveal_mnemonic_inner(&self, password: &str) -> WalletResult<SecureSeedPhrase> {
        let address = self.confirm_password(password).await?;
        let (_, mnemonic) = self.store.load(password).await?;
        log::warn!("Mnemonic revealed for {}", address);
        Ok(mnemonic)
    }

    async fn reveal_private_key_inner(&self, password: &str) -> WalletResult<Zeroizing<String>> {
        let address = self.confirm_password(password).await?;
        let key = self.keys.read().await.reveal_private_key()?;
        log::warn!("Private key revealed for {}", address);
        Ok(key)
    }

    /// Valid session, and `password` opens the record of the loaded address
    async fn confirm_password(&self, password: &str) -> WalletResult<Address> {
        self.require_session().await?;
        let address = self.keys.read().await.address()?.to_string();
        let stored = self
            .store
            .peek_info()?
            .ok_or_else(|| WalletError::wallet_not_found("No wallet stored on this device"))?;
        if stored.address != address {
            return Err(WalletError::storage("Stored wallet does not match the unlocked key"));
        }
        if !self.store.validate_integrity(password).await {
            return Err(WalletError::DecryptionFailed);
        }
        Ok(address)
    }

    /// Decrypt the record and load its key, checking the stored address
    async fn restore_keys(&self, password: &str) -> WalletResult<(Address, SecureSeedPhrase)> {
        let (record, mnemonic) = self.store.load(password).await?;
        let address = self.keys.write().await.import_from_mnemonic(mnemonic.as_str())?;
        if address != record.address {
            return Err(WalletError::storage("Stored address does not match the decrypted mnemonic"));
        }
        Ok((address, mnemonic))
    }

    fn ensure_slot_free(&self) -> WalletResult<()> {
        if self.store.has_wallet()? {
            return Err(WalletError::wallet_already_exists(
                "A wallet is already stored on this device; delete it first",
            ));
        }
        Ok(())
    }

    async fn require_session(&self) -> WalletResult<()> {
        if self.session.has_valid_session() {
            return Ok(());
        }
        if self.session.state() == SessionState::Expired {
            log::info!("Session expired; locking wallet");
        }
        self.stop_heartbeat();
        self.keys.write().await.wipe();
        Err(WalletError::NotAuthenticated)
    }

    fn open_session(&self, address: &str) -> WalletResult<()> {
        self.session.create_session(address)?;
        let handle = self.session.spawn_heartbeat();
        if let Some(previous) = self.heartbeat_slot().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn lock_wallet(&self) {
        self.stop_heartbeat();
        self.keys.write().await.wipe();
        self.session.clear_session();
    }

    async fn settle<T>(&self, operation: &str, result: WalletResult<T>) -> OperationResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                log::warn!("{} failed: {}", operation, e);
                self.lock_wallet().await;
                Err(e.into())
            }
        }
    }

    fn stop_heartbeat(&self) {
        if let Some(handle) = self.heartbeat_slot().take() {
            handle.abort();
        }
    }

    fn heartbeat_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stack_read(&self) -> std::sync::RwLockReadGuard<'_, NetworkStack> {
        self.stack.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_stack(config: &WalletConfig, rpc_factory: &RpcFactory, network: NetworkConfig) -> WalletResult<NetworkStack> {
    let client = rpc_factory(&network)?;
    let transactions = TransactionEngine::new(EthRpc::new(client), network.chain_id, config.transactions);
    Ok(NetworkStack {
        network,
        transactions: Arc::new(transactions),
    })
}

impl Drop for WalletEngine {
    fn drop(&mut self) {
        log::info!("WalletEngine dropped - wiping key material");
        self.stop_heartbeat();
        self.keys.get_mut().wipe();
    }
}

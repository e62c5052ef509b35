//! In-memory wallet engine for testing.
//!
//! These implementations are NOT secure for production use. Keys live in
//! plain process memory and "signing" a spend produces random bytes. They
//! exist so the frame controller can be exercised end to end without a
//! real engine.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;

use super::{
    AccountEvent, ContextOptions, CurrencyWallet, EngineFactory, SpendTarget, WalletAccount,
    WalletContext, WalletKeyRecord,
};
use crate::error::{LoginKitError, LoginKitResult};
use crate::ethereum;
use crate::protocol::SpendTransaction;
use crate::sanitize::ETHEREUM_WALLET_TYPE;
use crate::utils::{lock, os_random_bytes};

/// Plugins the memory engine pretends to load.
pub const KNOWN_PLUGINS: &[&str] = &["ethereum", "bitcoin"];

const EVENT_CAPACITY: usize = 64;

fn random_hex(len: usize) -> String {
    hex::encode(os_random_bytes(len))
}

/// Currency code for the wallet types the memory engine can sync.
#[must_use]
pub fn currency_code_for(wallet_type: &str) -> Option<&'static str> {
    match wallet_type {
        ETHEREUM_WALLET_TYPE => Some("ETH"),
        "wallet:bitcoin" => Some("BTC"),
        "wallet:litecoin" => Some("LTC"),
        _ => None,
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Engine factory that always hands out the same shared context.
pub struct MemoryEngine {
    context: Arc<MemoryContext>,
    loaded_plugins: Mutex<Vec<String>>,
}

impl MemoryEngine {
    /// Creates an engine with no local users.
    #[must_use]
    pub fn new() -> Self {
        Self {
            context: Arc::new(MemoryContext::default()),
            loaded_plugins: Mutex::new(Vec::new()),
        }
    }

    /// Adds a local user.
    #[must_use]
    pub fn with_user(self, username: &str, has_pin: bool) -> Self {
        self.context.add_user(username, has_pin);
        self
    }

    /// The shared context, for simulating logins.
    #[must_use]
    pub fn context(&self) -> Arc<MemoryContext> {
        self.context.clone()
    }

    /// Plugins recognized by the last `make_context` call.
    #[must_use]
    pub fn loaded_plugins(&self) -> Vec<String> {
        lock(&self.loaded_plugins).clone()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineFactory for MemoryEngine {
    async fn make_context(&self, options: &ContextOptions) -> LoginKitResult<Arc<dyn WalletContext>> {
        let mut loaded = Vec::new();
        for name in &options.plugin_names {
            if KNOWN_PLUGINS.contains(&name.as_str()) {
                loaded.push(name.clone());
            } else {
                log::warn!("memory engine: ignoring unknown plugin '{name}'");
            }
        }
        *lock(&self.loaded_plugins) = loaded;
        Ok(self.context.clone())
    }
}

// =============================================================================
// Context
// =============================================================================

/// Local user directory plus a CSPRNG.
#[derive(Default)]
pub struct MemoryContext {
    users: Mutex<BTreeMap<String, bool>>,
}

impl MemoryContext {
    /// Registers a local user.
    pub fn add_user(&self, username: &str, has_pin: bool) {
        lock(&self.users).insert(username.to_string(), has_pin);
    }

    /// Logs a local user in.
    ///
    /// # Errors
    /// Returns an engine error if the user is unknown.
    pub fn login(&self, username: &str) -> LoginKitResult<Arc<MemoryAccount>> {
        if !lock(&self.users).contains_key(username) {
            return Err(LoginKitError::engine(format!("no such user: {username}")));
        }
        Ok(Arc::new(MemoryAccount::new(username)))
    }
}

#[async_trait]
impl WalletContext for MemoryContext {
    async fn list_usernames(&self) -> LoginKitResult<Vec<String>> {
        Ok(lock(&self.users).keys().cloned().collect())
    }

    async fn pin_login_enabled(&self, username: &str) -> LoginKitResult<bool> {
        Ok(lock(&self.users).get(username).copied().unwrap_or(false))
    }

    fn random_bytes(&self, len: usize) -> Vec<u8> {
        os_random_bytes(len)
    }
}

// =============================================================================
// Account
// =============================================================================

/// An account whose wallets live in memory.
pub struct MemoryAccount {
    username: String,
    keys: Mutex<Vec<WalletKeyRecord>>,
    wallets: Mutex<BTreeMap<String, Arc<MemoryCurrencyWallet>>>,
    events: broadcast::Sender<AccountEvent>,
    logged_out: AtomicBool,
}

impl MemoryAccount {
    /// Creates an empty account.
    #[must_use]
    pub fn new(username: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            username: username.to_string(),
            keys: Mutex::new(Vec::new()),
            wallets: Mutex::new(BTreeMap::new()),
            events,
            logged_out: AtomicBool::new(false),
        }
    }

    /// Adds a key record without emitting a change event.
    #[must_use]
    pub fn with_wallet(self, record: WalletKeyRecord) -> Self {
        self.insert(record);
        self
    }

    /// Adds a key record and emits [`AccountEvent::KeyListChanged`].
    pub fn add_wallet(&self, record: WalletKeyRecord) {
        self.insert(record);
        self.emit(AccountEvent::KeyListChanged);
    }

    /// Sets a currency wallet balance and emits [`AccountEvent::BalanceChanged`].
    pub fn set_balance(&self, wallet_id: &str, native_amount: &str) {
        if let Some(wallet) = lock(&self.wallets).get(wallet_id) {
            *lock(&wallet.balance) = native_amount.to_string();
        }
        self.emit(AccountEvent::BalanceChanged {
            wallet_id: wallet_id.to_string(),
        });
    }

    /// Whether `logout` has run.
    #[must_use]
    pub fn is_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }

    /// A currency wallet by id.
    #[must_use]
    pub fn currency_wallet(&self, wallet_id: &str) -> Option<Arc<MemoryCurrencyWallet>> {
        lock(&self.wallets).get(wallet_id).cloned()
    }

    fn ensure_active(&self) -> LoginKitResult<()> {
        if self.is_logged_out() {
            return Err(LoginKitError::engine("account is logged out"));
        }
        Ok(())
    }

    fn emit(&self, event: AccountEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn insert(&self, mut record: WalletKeyRecord) {
        let mut keys = lock(&self.keys);
        if record.sort_index == 0 {
            record.sort_index = i64::try_from(keys.len()).unwrap_or(i64::MAX);
        }

        // Ethereum keys double as a synced wallet so spends have something to act on.
        if record.wallet_type == ETHEREUM_WALLET_TYPE {
            let address = record
                .keys
                .get("ethereumKey")
                .and_then(Value::as_str)
                .and_then(|key| ethereum::private_key_to_address(key).ok());
            if let Some(address) = address {
                lock(&self.wallets).insert(
                    record.id.clone(),
                    Arc::new(MemoryCurrencyWallet::new("ETH", &address)),
                );
            }
        }
        keys.push(record);
    }
}

#[async_trait]
impl WalletAccount for MemoryAccount {
    fn username(&self) -> String {
        self.username.clone()
    }

    fn all_keys(&self) -> Vec<WalletKeyRecord> {
        lock(&self.keys).clone()
    }

    async fn create_wallet(&self, wallet_type: &str, keys: Map<String, Value>) -> LoginKitResult<String> {
        self.ensure_active()?;
        let id = random_hex(16);
        self.add_wallet(WalletKeyRecord {
            wallet_type: wallet_type.to_string(),
            id: id.clone(),
            archived: false,
            deleted: false,
            sort_index: 0,
            keys,
            app_ids: Vec::new(),
        });
        Ok(id)
    }

    async fn create_currency_wallet(&self, wallet_type: &str) -> LoginKitResult<String> {
        self.ensure_active()?;
        let code = currency_code_for(wallet_type)
            .ok_or_else(|| LoginKitError::engine(format!("no plugin supports {wallet_type}")))?;
        let id = random_hex(16);
        let key_name = format!("{}Key", code.to_lowercase());
        let keys = match json!({ key_name: random_hex(32) }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        lock(&self.wallets).insert(
            id.clone(),
            Arc::new(MemoryCurrencyWallet::new(
                code,
                &format!("{}:{id}", code.to_lowercase()),
            )),
        );
        self.add_wallet(WalletKeyRecord {
            wallet_type: wallet_type.to_string(),
            id: id.clone(),
            archived: false,
            deleted: false,
            sort_index: 0,
            keys,
            app_ids: Vec::new(),
        });
        Ok(id)
    }

    fn currency_wallets(&self) -> BTreeMap<String, Arc<dyn CurrencyWallet>> {
        lock(&self.wallets)
            .iter()
            .map(|(id, wallet)| (id.clone(), wallet.clone() as Arc<dyn CurrencyWallet>))
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.events.subscribe()
    }

    async fn logout(&self) -> LoginKitResult<()> {
        self.logged_out.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Currency wallet
// =============================================================================

/// A currency wallet with a fixed address and a settable balance.
pub struct MemoryCurrencyWallet {
    currency_code: String,
    address: String,
    balance: Mutex<String>,
    broadcast: Mutex<Vec<SpendTransaction>>,
    history: Mutex<Vec<SpendTransaction>>,
}

impl MemoryCurrencyWallet {
    fn new(currency_code: &str, address: &str) -> Self {
        Self {
            currency_code: currency_code.to_string(),
            address: address.to_string(),
            balance: Mutex::new("0".to_string()),
            broadcast: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Transactions handed to `broadcast_tx`.
    #[must_use]
    pub fn broadcast_log(&self) -> Vec<SpendTransaction> {
        lock(&self.broadcast).clone()
    }

    /// Transactions handed to `save_tx`.
    #[must_use]
    pub fn history(&self) -> Vec<SpendTransaction> {
        lock(&self.history).clone()
    }
}

fn parse_amount(attribute: &str, amount: &str) -> LoginKitResult<u128> {
    amount
        .parse()
        .map_err(|_| LoginKitError::invalid_input(attribute, format!("not a decimal amount: {amount}")))
}

#[async_trait]
impl CurrencyWallet for MemoryCurrencyWallet {
    fn currency_code(&self) -> String {
        self.currency_code.clone()
    }

    async fn receive_address(&self) -> LoginKitResult<String> {
        Ok(self.address.clone())
    }

    fn balance(&self, currency_code: &str) -> String {
        if currency_code == self.currency_code {
            lock(&self.balance).clone()
        } else {
            "0".to_string()
        }
    }

    async fn make_spend(&self, targets: Vec<SpendTarget>) -> LoginKitResult<SpendTransaction> {
        let [target] = <[SpendTarget; 1]>::try_from(targets)
            .map_err(|_| LoginKitError::invalid_input("spendTargets", "exactly one target is supported"))?;
        let amount = parse_amount("amount", &target.native_amount)?;
        let balance = parse_amount("balance", &lock(&self.balance))?;
        if amount > balance {
            return Err(LoginKitError::engine("insufficient funds"));
        }
        Ok(SpendTransaction {
            txid: random_hex(32),
            currency_code: self.currency_code.clone(),
            native_amount: target.native_amount,
            public_address: target.public_address,
            signed_tx: None,
        })
    }

    async fn sign_tx(&self, mut tx: SpendTransaction) -> LoginKitResult<SpendTransaction> {
        tx.signed_tx = Some(random_hex(64));
        Ok(tx)
    }

    async fn broadcast_tx(&self, tx: &SpendTransaction) -> LoginKitResult<()> {
        if tx.signed_tx.is_none() {
            return Err(LoginKitError::engine("cannot broadcast an unsigned transaction"));
        }
        let amount = parse_amount("amount", &tx.native_amount)?;
        let mut balance = lock(&self.balance);
        let remaining = parse_amount("balance", &balance)?.saturating_sub(amount);
        *balance = remaining.to_string();
        drop(balance);
        lock(&self.broadcast).push(tx.clone());
        Ok(())
    }

    async fn save_tx(&self, tx: &SpendTransaction) -> LoginKitResult<()> {
        lock(&self.history).push(tx.clone());
        Ok(())
    }
}

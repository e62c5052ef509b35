//! Wallet engine contract consumed by the frame.
//!
//! The frame never implements cryptography or persistence itself; it drives
//! an engine through these traits. Every platform embeds its own engine; an
//! in-memory one lives in [`memory`] for tests and the demo CLI.
//!
//! - [`EngineFactory`]: Builds a [`WalletContext`] from handshake parameters
//! - [`WalletContext`]: Device-level operations (user directory, randomness)
//! - [`WalletAccount`]: A logged-in account; the capability behind an `AccountId`
//! - [`CurrencyWallet`]: A synced wallet able to receive, spend and report balances

pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::LoginKitResult;
use crate::protocol::SpendTransaction;

/// A raw wallet key record, exactly as the engine stores it.
///
/// Holds private key material. Must go through [`crate::sanitize`] before
/// any part of it is sent to the host.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletKeyRecord {
    /// Wallet type tag.
    #[serde(rename = "type")]
    pub wallet_type: String,
    /// Wallet id.
    pub id: String,
    /// Archived flag.
    #[serde(default)]
    pub archived: bool,
    /// Deleted flag.
    #[serde(default)]
    pub deleted: bool,
    /// Position in the wallet list.
    #[serde(default)]
    pub sort_index: i64,
    /// Raw key bundle.
    #[serde(default)]
    pub keys: Map<String, Value>,
    /// Applications the keys are shared with.
    #[serde(default)]
    pub app_ids: Vec<String>,
}

impl std::fmt::Debug for WalletKeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKeyRecord")
            .field("wallet_type", &self.wallet_type)
            .field("id", &self.id)
            .field("archived", &self.archived)
            .field("deleted", &self.deleted)
            .field("sort_index", &self.sort_index)
            .field("keys", &"<redacted>")
            .field("app_ids", &self.app_ids)
            .finish()
    }
}

/// Change notifications an account emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    /// Wallets were added, removed, or edited.
    KeyListChanged,
    /// A currency wallet's balance moved.
    BalanceChanged {
        /// The wallet whose balance changed.
        wallet_id: String,
    },
}

/// One spend target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendTarget {
    /// Destination address.
    pub public_address: String,
    /// Amount as a decimal string in the wallet's native unit.
    pub native_amount: String,
}

/// Parameters handed to the engine when building a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    /// API key from the handshake.
    pub api_key: String,
    /// App id from the handshake.
    pub app_id: String,
    /// Plugins requested by the host.
    pub plugin_names: Vec<String>,
}

/// Builds engine contexts. One context per accepted connection.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Creates a context, loading the plugins the engine recognizes.
    ///
    /// # Errors
    /// Returns an error if the engine cannot start.
    async fn make_context(&self, options: &ContextOptions) -> LoginKitResult<Arc<dyn WalletContext>>;
}

/// Device-level engine capability.
#[async_trait]
pub trait WalletContext: Send + Sync {
    /// Usernames with local data on this device.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read.
    async fn list_usernames(&self) -> LoginKitResult<Vec<String>>;

    /// Whether PIN login is enabled for `username`.
    ///
    /// # Errors
    /// Returns an error if the user's settings cannot be read.
    async fn pin_login_enabled(&self, username: &str) -> LoginKitResult<bool>;

    /// Bytes from the engine's secure random source.
    fn random_bytes(&self, len: usize) -> Vec<u8>;
}

/// A logged-in account.
#[async_trait]
pub trait WalletAccount: Send + Sync {
    /// The account's username.
    fn username(&self) -> String;

    /// Every wallet key record, including archived and deleted ones.
    fn all_keys(&self) -> Vec<WalletKeyRecord>;

    /// Creates a wallet from raw keys and returns its id.
    ///
    /// # Errors
    /// Returns an error if the engine rejects the wallet.
    async fn create_wallet(&self, wallet_type: &str, keys: Map<String, Value>) -> LoginKitResult<String>;

    /// Creates a currency wallet with engine-generated keys and returns its id.
    ///
    /// # Errors
    /// Returns an error if no plugin handles `wallet_type`.
    async fn create_currency_wallet(&self, wallet_type: &str) -> LoginKitResult<String>;

    /// Synced currency wallets keyed by wallet id.
    fn currency_wallets(&self) -> BTreeMap<String, Arc<dyn CurrencyWallet>>;

    /// Registers for change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AccountEvent>;

    /// Tears the account down.
    ///
    /// # Errors
    /// Returns an error if teardown fails.
    async fn logout(&self) -> LoginKitResult<()>;
}

/// A synced currency wallet.
#[async_trait]
pub trait CurrencyWallet: Send + Sync {
    /// The wallet's native currency code.
    fn currency_code(&self) -> String;

    /// A fresh receive address.
    ///
    /// # Errors
    /// Returns an error if no address can be derived.
    async fn receive_address(&self) -> LoginKitResult<String>;

    /// Balance of `currency_code` as a decimal string.
    fn balance(&self, currency_code: &str) -> String;

    /// Builds an unsigned spend.
    ///
    /// # Errors
    /// Returns an error if the spend is invalid (e.g. insufficient funds).
    async fn make_spend(&self, targets: Vec<SpendTarget>) -> LoginKitResult<SpendTransaction>;

    /// Signs a spend.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    async fn sign_tx(&self, tx: SpendTransaction) -> LoginKitResult<SpendTransaction>;

    /// Broadcasts a signed spend.
    ///
    /// # Errors
    /// Returns an error if the network rejects it.
    async fn broadcast_tx(&self, tx: &SpendTransaction) -> LoginKitResult<()>;

    /// Records a spend in the wallet's history.
    ///
    /// # Errors
    /// Returns an error if it cannot be saved.
    async fn save_tx(&self, tx: &SpendTransaction) -> LoginKitResult<()>;
}

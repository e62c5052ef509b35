//! Value types shared by both sides of the frame boundary.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Identifiers

const ACCOUNT_ID_PREFIX: &str = "account";

/// Opaque handle to a logged-in account.
///
/// Minted only by the frame as `account<n>` with `n` strictly increasing for
/// the lifetime of one controller. The host never holds anything else that
/// refers to the account.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Mints the id for sequence number `n`.
    #[must_use]
    pub fn mint(n: u64) -> Self {
        Self(format!("{ACCOUNT_ID_PREFIX}{n}"))
    }

    /// Wraps an id received over the wire. No validation is done; unknown
    /// ids are rejected by the frame when used.
    #[must_use]
    pub fn from_wire(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The string form sent over the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric suffix, when the id has the minted shape.
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.0.strip_prefix(ACCOUNT_ID_PREFIX)?.parse().ok()
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Users

/// A user known to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// The login name.
    pub username: String,
    /// Whether quick PIN unlock is enabled for this user.
    pub has_pin: bool,
}

/// Users available on this device, keyed by username.
pub type UserInfos = BTreeMap<String, UserInfo>;

// Wallets

/// A wallet record as it may be shown to the host.
///
/// Only produced by [`crate::sanitize`]; `keys` and `app_ids` depend on the
/// session's key-hiding policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    /// Wallet type tag, such as `wallet:ethereum`.
    #[serde(rename = "type")]
    pub wallet_type: String,
    /// Wallet id.
    pub id: String,
    /// Whether the user archived the wallet.
    pub archived: bool,
    /// Whether the user deleted the wallet.
    pub deleted: bool,
    /// Position in the user's wallet list.
    pub sort_index: i64,
    /// Key material the policy allows across the boundary.
    pub keys: Map<String, Value>,
    /// Applications the keys are shared with. Absent when keys are hidden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_ids: Option<Vec<String>>,
}

/// Sanitized wallets keyed by wallet id.
pub type WalletInfos = BTreeMap<String, WalletInfo>;

/// Read-only view of a currency wallet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrencyWalletProxy {
    /// Receive address.
    pub address: String,
    /// Native amounts as decimal strings, keyed by currency code.
    pub balances: BTreeMap<String, String>,
}

/// Currency wallet views keyed by wallet id.
pub type CurrencyWalletProxies = BTreeMap<String, CurrencyWalletProxy>;

// Transactions

/// An unsigned legacy Ethereum transaction.
///
/// Quantities are `0x`-prefixed hex strings; missing quantities are zero.
/// A missing `to` creates a contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumTransaction {
    /// Sender nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Gas price in wei.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// Gas limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    /// Recipient address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Value in wei.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Call data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// EIP-155 chain id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// A transaction produced by `simpleSpend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendTransaction {
    /// Engine transaction id.
    pub txid: String,
    /// Currency of the amount.
    pub currency_code: String,
    /// Amount sent, as a decimal string.
    pub native_amount: String,
    /// Destination address.
    pub public_address: String,
    /// Signed transaction bytes, hex encoded, once signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_tx: Option<String>,
}

//! Handshake and remote-procedure vocabulary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use super::types::{AccountId, EthereumTransaction, UserInfos, WalletInfos};

/// Sent by the host once per session to open the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    /// API key for the wallet engine.
    pub api_key: String,
    /// Application id for the wallet engine.
    pub app_id: String,
    /// Session-wide key redaction flag.
    pub hide_keys: bool,
    /// Currency plugins the frame should load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_names: Option<Vec<String>>,
    /// Vendor name shown on the login screens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    /// Vendor logo shown on the login screens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_image_url: Option<String>,
}

/// Remote procedures the frame can grant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FrameMethod {
    /// Create a wallet from caller-provided keys.
    CreateWallet,
    /// Create a currency wallet.
    CreateCurrencyWallet,
    /// Sign an Ethereum transaction frame-side.
    SignEthereumTransaction,
    /// Deliver a [`super::FrameMessage`].
    FrameDispatch,
    /// Send funds from a currency wallet.
    SimpleSpend,
}

impl FrameMethod {
    /// Every procedure this frame implementation grants.
    pub const ALL: [Self; 5] = [
        Self::CreateWallet,
        Self::CreateCurrencyWallet,
        Self::SignEthereumTransaction,
        Self::FrameDispatch,
        Self::SimpleSpend,
    ];

    /// The procedures a host needs to function at all.
    pub const REQUIRED: [Self; 4] = [
        Self::CreateWallet,
        Self::CreateCurrencyWallet,
        Self::SignEthereumTransaction,
        Self::FrameDispatch,
    ];
}

/// Sent by the frame exactly once in answer to a [`HandshakeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeReply {
    /// Users available on the device.
    pub local_users: UserInfos,
    /// Procedures the host may call.
    pub methods: Vec<FrameMethod>,
}

/// A remote-procedure call, dispatched frame-side by `method`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum FrameRequest {
    /// See [`FrameMethod::CreateWallet`].
    #[serde(rename_all = "camelCase")]
    CreateWallet {
        /// Target account.
        account_id: AccountId,
        /// Wallet type tag.
        #[serde(rename = "type")]
        wallet_type: String,
        /// Raw keys for the new wallet.
        keys: Map<String, Value>,
    },
    /// See [`FrameMethod::CreateCurrencyWallet`].
    #[serde(rename_all = "camelCase")]
    CreateCurrencyWallet {
        /// Target account.
        account_id: AccountId,
        /// Wallet type tag.
        #[serde(rename = "type")]
        wallet_type: String,
    },
    /// See [`FrameMethod::SignEthereumTransaction`].
    #[serde(rename_all = "camelCase")]
    SignEthereumTransaction {
        /// Target account.
        account_id: AccountId,
        /// Wallet holding the key.
        wallet_id: String,
        /// Transaction to sign.
        transaction: EthereumTransaction,
    },
    /// See [`FrameMethod::FrameDispatch`]. The message stays raw until the
    /// frame validates its type.
    FrameDispatch {
        /// The undecoded [`super::FrameMessage`].
        message: Value,
    },
    /// See [`FrameMethod::SimpleSpend`].
    #[serde(rename_all = "camelCase")]
    SimpleSpend {
        /// Source account.
        account_id: AccountId,
        /// Source wallet.
        wallet_id: String,
        /// Destination address.
        address: String,
        /// Amount as a decimal string.
        amount: String,
    },
}

impl FrameRequest {
    /// The dispatch-table key of this call.
    #[must_use]
    pub const fn method(&self) -> FrameMethod {
        match self {
            Self::CreateWallet { .. } => FrameMethod::CreateWallet,
            Self::CreateCurrencyWallet { .. } => FrameMethod::CreateCurrencyWallet,
            Self::SignEthereumTransaction { .. } => FrameMethod::SignEthereumTransaction,
            Self::FrameDispatch { .. } => FrameMethod::FrameDispatch,
            Self::SimpleSpend { .. } => FrameMethod::SimpleSpend,
        }
    }
}

/// Result of `createWallet` and `createCurrencyWallet`.
///
/// `wallet_infos` is the full refreshed mapping for the account; callers
/// replace their cached view with it instead of merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletReply {
    /// Id of the new wallet.
    pub wallet_id: String,
    /// Every wallet of the account, sanitized.
    pub wallet_infos: WalletInfos,
}

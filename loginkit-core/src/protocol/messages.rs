//! Fire-and-forget notifications exchanged after the handshake.
//!
//! Both unions are tagged by `type` with the body under `payload`. Decoding
//! goes through [`ClientMessage::from_value`] / [`FrameMessage::from_value`],
//! which reject unknown tags as [`LoginKitError::ProtocolViolation`] so that
//! host/frame version skew fails loudly instead of being skipped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{AccountId, CurrencyWalletProxies, UserInfos, WalletInfos};
use crate::error::{LoginKitError, LoginKitResult};

// ── Frame -> host ───────────────────────────────────────────

/// Payload of a `login` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    /// Freshly minted handle for the account.
    pub account_id: AccountId,
    /// The account's username.
    pub username: String,
    /// Current local user directory.
    pub local_users: UserInfos,
    /// Sanitized wallet list.
    pub wallet_infos: WalletInfos,
    /// Currency wallet views.
    pub currency_wallets: CurrencyWalletProxies,
}

/// Payload of a `wallet-list-changed` notification. A full refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletListChangedPayload {
    /// The account whose wallets changed.
    pub account_id: AccountId,
    /// Sanitized wallet list.
    pub wallet_infos: WalletInfos,
    /// Currency wallet views.
    pub currency_wallets: CurrencyWalletProxies,
}

/// Notifications sent by the frame to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// The frame's window was closed; the host should hide the surface.
    Close,
    /// Something went wrong inside the frame.
    Error(LoginKitError),
    /// The user logged in.
    Login(LoginPayload),
    /// The user added, removed, or edited their wallet list.
    WalletListChanged(WalletListChangedPayload),
}

const CLIENT_MESSAGE_TYPES: &[&str] = &["close", "error", "login", "wallet-list-changed"];

impl ClientMessage {
    /// Decodes a notification, rejecting unknown types.
    ///
    /// # Errors
    /// [`LoginKitError::ProtocolViolation`] for a missing or unknown `type`,
    /// [`LoginKitError::MalformedMessage`] for an undecodable payload.
    pub fn from_value(value: Value) -> LoginKitResult<Self> {
        decode_tagged(value, "client", CLIENT_MESSAGE_TYPES)
    }

    /// The wire tag of this message.
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Error(_) => "error",
            Self::Login(_) => "login",
            Self::WalletListChanged(_) => "wallet-list-changed",
        }
    }
}

// ── Host -> frame ───────────────────────────────────────────

/// Payload naming one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPayload {
    /// The account handle.
    pub account_id: AccountId,
}

/// Notifications sent by the host to the frame through `frameDispatch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum FrameMessage {
    /// Log the account out.
    Logout(AccountPayload),
    /// Show the login screen.
    OpenLoginWindow,
    /// Show the account management screen.
    OpenManageWindow(AccountPayload),
}

const FRAME_MESSAGE_TYPES: &[&str] = &["logout", "open-login-window", "open-manage-window"];

impl FrameMessage {
    /// Decodes a host message, rejecting unknown types.
    ///
    /// # Errors
    /// Same as [`ClientMessage::from_value`].
    pub fn from_value(value: Value) -> LoginKitResult<Self> {
        decode_tagged(value, "frame", FRAME_MESSAGE_TYPES)
    }

    /// Shorthand for a `logout` message.
    #[must_use]
    pub const fn logout(account_id: AccountId) -> Self {
        Self::Logout(AccountPayload { account_id })
    }

    /// Shorthand for an `open-manage-window` message.
    #[must_use]
    pub const fn open_manage_window(account_id: AccountId) -> Self {
        Self::OpenManageWindow(AccountPayload { account_id })
    }
}

fn decode_tagged<T: DeserializeOwned>(
    value: Value,
    channel: &str,
    known: &[&str],
) -> LoginKitResult<T> {
    let message_type = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();

    if !known.contains(&message_type.as_str()) {
        return Err(LoginKitError::ProtocolViolation {
            channel: channel.to_string(),
            message_type,
        });
    }

    serde_json::from_value(value).map_err(|e| LoginKitError::MalformedMessage {
        reason: format!("{channel} message '{message_type}': {e}"),
    })
}

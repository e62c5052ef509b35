use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::AccountId;

/// Error outputs from `LoginKit`.
///
/// The same value travels across the frame boundary: RPC failures are
/// returned as this type and `error` notifications carry it verbatim, so it
/// is serializable and tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LoginKitError {
    /// A message carried a `type` that this side does not know.
    #[error("protocol_violation: unknown {channel} message type '{message_type}'")]
    ProtocolViolation {
        /// Which vocabulary the message was decoded against.
        channel: String,
        /// The offending type tag (`<missing>` when absent).
        message_type: String,
    },
    /// A message had a known type but its payload could not be decoded.
    #[error("malformed_message: {reason}")]
    MalformedMessage {
        /// Decoder detail.
        reason: String,
    },
    /// The account id is not logged in on the frame.
    #[error("invalid_account_id: {account_id}")]
    InvalidAccountId {
        /// The unknown id.
        account_id: AccountId,
    },
    /// The wallet id does not belong to the account.
    #[error("invalid_wallet_id: {wallet_id}")]
    InvalidWalletId {
        /// The unknown wallet id.
        wallet_id: String,
    },
    /// The frame did not answer the handshake in time.
    #[error("handshake_timeout: no reply within {timeout_ms} ms")]
    HandshakeTimeout {
        /// The configured window.
        timeout_ms: u64,
    },
    /// Signing was requested for a wallet without usable key material.
    #[error("key_not_found: cannot find the requested private key in the account")]
    KeyNotFound,
    /// The remote procedure was not granted during the handshake.
    #[error("method_not_granted: {method}")]
    MethodNotGranted {
        /// The procedure name.
        method: String,
    },
    /// The presented input is not valid for the requested operation.
    #[error("invalid_input: {attribute}: {reason}")]
    InvalidInput {
        /// The offending attribute.
        attribute: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The wallet engine reported a failure.
    #[error("engine_error: {message}")]
    Engine {
        /// Engine detail.
        message: String,
    },
    /// Transaction signing failed.
    #[error("signing_error: {message}")]
    Signing {
        /// Signer detail.
        message: String,
    },
    /// Unexpected error serializing information.
    #[error("serialization_error: {message}")]
    Serialization {
        /// Serializer detail.
        message: String,
    },
    /// The channel to the other side is gone.
    #[error("channel_closed")]
    ChannelClosed,
}

impl LoginKitError {
    /// Builds a [`LoginKitError::Engine`] from anything printable.
    #[must_use]
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Builds an [`LoginKitError::InvalidInput`].
    #[must_use]
    pub fn invalid_input(attribute: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error is a contract violation by the caller.
    ///
    /// Contract errors fail only the call that caused them. Everything else
    /// is a runtime fault that the frame also reports through an `error`
    /// notification.
    #[must_use]
    pub const fn is_contract_error(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation { .. }
                | Self::MalformedMessage { .. }
                | Self::InvalidAccountId { .. }
                | Self::InvalidWalletId { .. }
                | Self::KeyNotFound
                | Self::MethodNotGranted { .. }
                | Self::InvalidInput { .. }
        )
    }
}

impl From<serde_json::Error> for LoginKitError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}

/// Result alias used across the crate.
pub type LoginKitResult<T, E = LoginKitError> = std::result::Result<T, E>;

//! The embedding surface and the message port it carries.
//!
//! Everything crossing the boundary is serialized to JSON text before it is
//! put on a channel, so neither side can smuggle a live reference to the
//! other. One envelope union exists per direction:
//!
//! ```text
//!   host ── HostEnvelope::Connect ────────────▶ frame
//!   host ◀──────── FrameEnvelope::ConnectReply ─ frame
//!   host ── HostEnvelope::Call { id } ────────▶ frame
//!   host ◀────────── FrameEnvelope::Reply { id } ─ frame
//!   host ◀──────────────── FrameEnvelope::Notify ─ frame
//! ```

pub mod in_process;

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{LoginKitError, LoginKitResult};
use crate::protocol::{FrameRequest, HandshakeReply, HandshakeRequest};

pub use in_process::InProcessSurface;

// ── Envelopes ───────────────────────────────────────────────

/// Host -> frame envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HostEnvelope {
    /// Handshake, sent once.
    Connect {
        /// Session parameters.
        request: HandshakeRequest,
    },
    /// A remote-procedure call.
    Call {
        /// Correlation id echoed by the reply.
        id: u64,
        /// The call.
        request: FrameRequest,
    },
}

/// Frame -> host envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FrameEnvelope {
    /// Handshake answer, sent once.
    ConnectReply {
        /// Granted procedures and user directory.
        reply: HandshakeReply,
    },
    /// Outcome of a remote-procedure call.
    Reply {
        /// The call's correlation id.
        id: u64,
        /// Return value or error.
        outcome: Result<Value, LoginKitError>,
    },
    /// A [`crate::protocol::ClientMessage`], still undecoded.
    Notify {
        /// The raw message.
        message: Value,
    },
}

impl FrameEnvelope {
    /// Wire tag, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConnectReply { .. } => "connect-reply",
            Self::Reply { .. } => "reply",
            Self::Notify { .. } => "notify",
        }
    }
}

impl HostEnvelope {
    /// Wire tag, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Call { .. } => "call",
        }
    }
}

// ── Ports ───────────────────────────────────────────────────

/// Sending half of a port. Cheap to clone.
#[derive(Debug)]
pub struct PortSender<T> {
    tx: mpsc::UnboundedSender<String>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for PortSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize> PortSender<T> {
    /// Serializes and sends one envelope.
    ///
    /// # Errors
    /// [`LoginKitError::Serialization`] if encoding fails,
    /// [`LoginKitError::ChannelClosed`] if the other side is gone.
    pub fn send(&self, envelope: &T) -> LoginKitResult<()> {
        self.send_text(serde_json::to_string(envelope)?)
    }

    /// Sends already encoded JSON text unchanged, as when relaying a message
    /// that arrived from another transport.
    ///
    /// # Errors
    /// [`LoginKitError::ChannelClosed`] if the other side is gone.
    pub fn send_text(&self, text: String) -> LoginKitResult<()> {
        self.tx.send(text).map_err(|_| LoginKitError::ChannelClosed)
    }

    /// Whether the receiving side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a port.
#[derive(Debug)]
pub struct PortReceiver<T> {
    rx: mpsc::UnboundedReceiver<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> PortReceiver<T> {
    /// Waits for the next envelope. `None` once the other side hung up.
    ///
    /// An envelope that does not decode yields
    /// `Some(Err(LoginKitError::MalformedMessage))`.
    pub async fn recv(&mut self) -> Option<LoginKitResult<T>> {
        let text = self.recv_text().await?;
        Some(decode_envelope(&text))
    }

    /// Waits for the next envelope without decoding it.
    pub async fn recv_text(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Decodes one envelope's JSON text.
///
/// # Errors
/// [`LoginKitError::MalformedMessage`] if the text is not a valid envelope.
pub fn decode_envelope<T: DeserializeOwned>(text: &str) -> LoginKitResult<T> {
    serde_json::from_str(text).map_err(|e| LoginKitError::MalformedMessage {
        reason: format!("envelope: {e}"),
    })
}

/// The correlation id of an undecodable `call` envelope, if it carries one.
#[must_use]
pub fn undecoded_call_id(text: &str) -> Option<u64> {
    let value: Value = serde_json::from_str(text).ok()?;
    if value.get("kind").and_then(Value::as_str) != Some("call") {
        return None;
    }
    value.get("id").and_then(Value::as_u64)
}

/// One end of a bidirectional port.
#[derive(Debug)]
pub struct Port<Out, In> {
    /// Outgoing half.
    pub sender: PortSender<Out>,
    /// Incoming half.
    pub receiver: PortReceiver<In>,
}

/// The host's end of the port.
pub type HostPort = Port<HostEnvelope, FrameEnvelope>;

/// The frame's end of the port.
pub type FramePort = Port<FrameEnvelope, HostEnvelope>;

/// Creates a connected host/frame port pair.
#[must_use]
pub fn port_pair() -> (HostPort, FramePort) {
    let (to_frame, from_host) = mpsc::unbounded_channel();
    let (to_host, from_frame) = mpsc::unbounded_channel();
    let host = Port {
        sender: PortSender {
            tx: to_frame,
            _marker: PhantomData,
        },
        receiver: PortReceiver {
            rx: from_frame,
            _marker: PhantomData,
        },
    };
    let frame = Port {
        sender: PortSender {
            tx: to_host,
            _marker: PhantomData,
        },
        receiver: PortReceiver {
            rx: from_host,
            _marker: PhantomData,
        },
    };
    (host, frame)
}

// ── Embedding surface ───────────────────────────────────────

/// Something that can host an isolated frame.
///
/// Implementations own whatever actually renders the frame (a webview, an
/// iframe bridge, a child process) and hand the host its end of the port.
pub trait EmbeddingSurface: Send + Sync {
    /// Loads the frame from `assets_path` and returns the host's port.
    ///
    /// # Errors
    /// Returns an error if the frame cannot be created.
    fn attach(&self, assets_path: &str) -> LoginKitResult<HostPort>;

    /// Makes the frame visible.
    fn show(&self);

    /// Hides the frame.
    fn hide(&self);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::{AccountId, ClientMessage};

    #[tokio::test]
    async fn envelopes_cross_as_json() {
        let (host, mut frame) = port_pair();
        host.sender
            .send(&HostEnvelope::Call {
                id: 7,
                request: FrameRequest::FrameDispatch {
                    message: json!({ "type": "open-login-window" }),
                },
            })
            .unwrap();

        let received = frame.receiver.recv().await.unwrap().unwrap();
        assert!(matches!(received, HostEnvelope::Call { id: 7, .. }));
    }

    #[test]
    fn undecodable_calls_keep_their_id() {
        assert_eq!(
            undecoded_call_id(r#"{"kind":"call","id":4,"request":{"method":"nope"}}"#),
            Some(4)
        );
        assert_eq!(undecoded_call_id(r#"{"kind":"connect","id":4}"#), None);
        assert_eq!(undecoded_call_id("not json"), None);
        assert!(matches!(
            decode_envelope::<HostEnvelope>(r#"{"kind":"call","id":4}"#),
            Err(LoginKitError::MalformedMessage { .. })
        ));
    }

    #[tokio::test]
    async fn reply_outcome_carries_errors() {
        let (mut host, frame) = port_pair();
        let error = LoginKitError::InvalidAccountId {
            account_id: AccountId::mint(9),
        };
        frame
            .sender
            .send(&FrameEnvelope::Reply {
                id: 1,
                outcome: Err(error.clone()),
            })
            .unwrap();
        frame
            .sender
            .send(&FrameEnvelope::Notify {
                message: serde_json::to_value(ClientMessage::Close).unwrap(),
            })
            .unwrap();

        match host.receiver.recv().await.unwrap().unwrap() {
            FrameEnvelope::Reply { id, outcome } => {
                assert_eq!(id, 1);
                assert_eq!(outcome, Err(error));
            }
            other => panic!("unexpected envelope {}", other.kind()),
        }
        assert_eq!(host.receiver.recv().await.unwrap().unwrap().kind(), "notify");
    }

    #[tokio::test]
    async fn dropped_peer_is_reported() {
        let (host, frame) = port_pair();
        drop(frame);
        assert!(host.sender.is_closed());
        assert_eq!(
            host.sender
                .send(&HostEnvelope::Connect {
                    request: HandshakeRequest {
                        api_key: String::new(),
                        app_id: String::new(),
                        hide_keys: false,
                        plugin_names: None,
                        vendor_name: None,
                        vendor_image_url: None,
                    }
                })
                .unwrap_err(),
            LoginKitError::ChannelClosed
        );
    }
}

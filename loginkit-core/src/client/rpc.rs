//! Host-side remote-procedure table.
//!
//! Calls are written to the port tagged with a fresh id and parked in a
//! pending map until the notification pump routes the matching reply back.
//!
//! ```text
//!   call() ── pending.insert(id, tx) ── HostEnvelope::Call { id } ──▶ frame
//!   rx.await ◀── pending.remove(id) ◀── FrameEnvelope::Reply { id } ── frame
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{LoginKitError, LoginKitResult};
use crate::protocol::{FrameMethod, FrameRequest};
use crate::transport::{HostEnvelope, PortSender};
use crate::utils::lock;

type Waiter = oneshot::Sender<LoginKitResult<Value>>;

#[derive(Default)]
struct Pending {
    calls: HashMap<u64, Waiter>,
    closed: bool,
}

/// The procedures granted at handshake, callable by method.
pub struct FrameRpc {
    sender: PortSender<HostEnvelope>,
    granted: BTreeSet<FrameMethod>,
    next_id: AtomicU64,
    pending: Mutex<Pending>,
}

impl FrameRpc {
    /// Builds the table from the handshake's granted methods.
    #[must_use]
    pub fn new(sender: PortSender<HostEnvelope>, granted: &[FrameMethod]) -> Self {
        Self {
            sender,
            granted: granted.iter().copied().collect(),
            next_id: AtomicU64::new(0),
            pending: Mutex::new(Pending::default()),
        }
    }

    /// Whether the frame granted `method`.
    #[must_use]
    pub fn is_granted(&self, method: FrameMethod) -> bool {
        self.granted.contains(&method)
    }

    /// Calls a procedure and waits for its raw return value.
    ///
    /// There is no deadline; wrap the future in a timeout if needed.
    ///
    /// # Errors
    /// [`LoginKitError::MethodNotGranted`] for a procedure the frame did not
    /// grant, [`LoginKitError::ChannelClosed`] once the connection is down,
    /// otherwise the frame's error for the call.
    pub async fn call(&self, request: FrameRequest) -> LoginKitResult<Value> {
        let method = request.method();
        if !self.is_granted(method) {
            return Err(LoginKitError::MethodNotGranted {
                method: method.to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = lock(&self.pending);
            if pending.closed {
                return Err(LoginKitError::ChannelClosed);
            }
            pending.calls.insert(id, tx);
        }

        log::debug!("host -> frame: call {id} {method}");
        if let Err(e) = self.sender.send(&HostEnvelope::Call { id, request }) {
            lock(&self.pending).calls.remove(&id);
            return Err(e);
        }
        rx.await.unwrap_or(Err(LoginKitError::ChannelClosed))
    }

    /// Calls a procedure and decodes its return value.
    ///
    /// # Errors
    /// As [`Self::call`], plus [`LoginKitError::MalformedMessage`] if the
    /// reply does not decode as `T`.
    pub async fn call_as<T: DeserializeOwned>(&self, request: FrameRequest) -> LoginKitResult<T> {
        let method = request.method();
        let value = self.call(request).await?;
        serde_json::from_value(value).map_err(|e| LoginKitError::MalformedMessage {
            reason: format!("{method} reply: {e}"),
        })
    }

    /// Hands a reply to its waiting caller.
    pub(crate) fn resolve(&self, id: u64, outcome: LoginKitResult<Value>) {
        let waiter = lock(&self.pending).calls.remove(&id);
        match waiter {
            // The caller may have dropped its future.
            Some(waiter) => {
                let _ = waiter.send(outcome);
            }
            None => log::warn!("reply for unknown call {id}"),
        }
    }

    /// Fails every outstanding and future call with
    /// [`LoginKitError::ChannelClosed`].
    pub(crate) fn close(&self) {
        let calls = {
            let mut pending = lock(&self.pending);
            pending.closed = true;
            std::mem::take(&mut pending.calls)
        };
        for (_, waiter) in calls {
            let _ = waiter.send(Err(LoginKitError::ChannelClosed));
        }
    }

    /// Number of calls awaiting a reply.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        lock(&self.pending).calls.len()
    }
}

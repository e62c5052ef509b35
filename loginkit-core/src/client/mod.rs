//! Host-side connector.
//!
//! [`connect`] attaches an [`EmbeddingSurface`], performs the handshake and
//! returns a [`Client`]. From then on a background pump reads the frame's
//! envelopes: replies go to their waiting callers, notifications go through
//! [`Client::dispatch`] into the mirror. Anything the pump cannot decode ends
//! the connection.

pub mod account;
pub mod options;
pub mod rpc;
pub mod state;

use std::sync::{Arc, Mutex, Weak};

use tokio::task::JoinHandle;

use crate::error::{LoginKitError, LoginKitResult};
use crate::protocol::{
    AccountId, ClientMessage, FrameMessage, FrameMethod, FrameRequest, UserInfos, WalletInfos,
};
use crate::transport::{EmbeddingSurface, FrameEnvelope, HostEnvelope, HostPort, PortReceiver};
use crate::utils::lock;

pub use account::UiAccount;
pub use options::{
    log_error, CloseCallback, ConnectOptions, ErrorCallback, LoginCallback, LoginWindowOptions,
};
pub use rpc::FrameRpc;
pub use state::{AccountState, ClientState, Effect};

struct ClientInner {
    state: Mutex<ClientState>,
    surface: Arc<dyn EmbeddingSurface>,
    rpc: FrameRpc,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(pump) = lock(&self.pump).take() {
            pump.abort();
        }
    }
}

/// A connected host session. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("accounts", &self.accounts())
            .finish_non_exhaustive()
    }
}

/// Attaches the frame and performs the handshake.
///
/// Waits at most `options.frame_timeout` for the reply. On failure nothing
/// is kept: the port is dropped and no pump is started.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
/// - [`LoginKitError::HandshakeTimeout`] if the frame does not answer in time
/// - [`LoginKitError::ChannelClosed`] if the frame hangs up
/// - [`LoginKitError::ProtocolViolation`] if it answers with anything but a
///   handshake reply
/// - [`LoginKitError::MethodNotGranted`] if a required procedure is missing
pub async fn connect(options: ConnectOptions, surface: Arc<dyn EmbeddingSurface>) -> LoginKitResult<Client> {
    let HostPort {
        sender,
        mut receiver,
    } = surface.attach(&options.assets_path)?;

    log::debug!("host -> frame: connect ({})", options.assets_path);
    sender.send(&HostEnvelope::Connect {
        request: options.handshake(),
    })?;

    let reply = match tokio::time::timeout(options.frame_timeout, receiver.recv()).await {
        Err(_) => {
            return Err(LoginKitError::HandshakeTimeout {
                timeout_ms: u64::try_from(options.frame_timeout.as_millis()).unwrap_or(u64::MAX),
            })
        }
        Ok(None) => return Err(LoginKitError::ChannelClosed),
        Ok(Some(Err(e))) => return Err(e),
        Ok(Some(Ok(FrameEnvelope::ConnectReply { reply }))) => reply,
        Ok(Some(Ok(other))) => {
            return Err(LoginKitError::ProtocolViolation {
                channel: "handshake".to_string(),
                message_type: other.kind().to_string(),
            })
        }
    };

    if let Some(missing) = FrameMethod::REQUIRED
        .iter()
        .find(|method| !reply.methods.contains(method))
    {
        return Err(LoginKitError::MethodNotGranted {
            method: missing.to_string(),
        });
    }
    log::debug!("frame granted {} methods", reply.methods.len());

    let inner = Arc::new(ClientInner {
        state: Mutex::new(ClientState::new(
            options.app_id,
            reply.local_users,
            options.on_error,
        )),
        surface,
        rpc: FrameRpc::new(sender, &reply.methods),
        pump: Mutex::new(None),
    });
    let pump = tokio::spawn(pump(Arc::downgrade(&inner), receiver));
    *lock(&inner.pump) = Some(pump);

    Ok(Client { inner })
}

/// Reads frame envelopes until the connection ends.
async fn pump(inner: Weak<ClientInner>, mut receiver: PortReceiver<FrameEnvelope>) {
    while let Some(envelope) = receiver.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let client = Client { inner };

        let result = match envelope {
            Ok(FrameEnvelope::Reply { id, outcome }) => {
                client.inner.rpc.resolve(id, outcome);
                Ok(())
            }
            Ok(FrameEnvelope::Notify { message }) => {
                ClientMessage::from_value(message).map(|message| client.dispatch(message))
            }
            Ok(FrameEnvelope::ConnectReply { .. }) => Err(LoginKitError::ProtocolViolation {
                channel: "handshake".to_string(),
                message_type: "connect-reply".to_string(),
            }),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            log::error!("closing frame connection: {e}");
            client.inner.rpc.close();
            let on_error = lock(&client.inner.state).on_error.clone();
            on_error(&e);
            return;
        }
    }

    log::debug!("frame hung up");
    if let Some(inner) = inner.upgrade() {
        inner.rpc.close();
    }
}

impl Client {
    /// Applies a frame notification to the mirror and runs its callbacks.
    ///
    /// Callbacks run after the mirror is updated and unlocked, so they may
    /// call back into the client.
    pub fn dispatch(&self, message: ClientMessage) {
        log::debug!("frame -> host: {}", message.message_type());
        let effect = lock(&self.inner.state).apply(message);
        match effect {
            Effect::None => {}
            Effect::Close(on_close) => {
                self.inner.surface.hide();
                if let Some(on_close) = on_close {
                    on_close();
                }
            }
            Effect::Error(on_error, error) => on_error(&error),
            Effect::Login(on_login, account_id) => {
                if let Some(on_login) = on_login {
                    on_login(UiAccount::new(self.clone(), account_id));
                }
            }
        }
    }

    /// Decodes and applies a raw notification.
    ///
    /// # Errors
    /// [`LoginKitError::ProtocolViolation`] or
    /// [`LoginKitError::MalformedMessage`]; the mirror is untouched.
    pub fn dispatch_value(&self, message: serde_json::Value) -> LoginKitResult<()> {
        self.dispatch(ClientMessage::from_value(message)?);
        Ok(())
    }

    /// Last delivered user directory.
    #[must_use]
    pub fn local_users(&self) -> UserInfos {
        lock(&self.inner.state).local_users.clone()
    }

    /// The host's application id.
    #[must_use]
    pub fn app_id(&self) -> String {
        lock(&self.inner.state).app_id.clone()
    }

    /// Handles of the accounts in the mirror.
    #[must_use]
    pub fn accounts(&self) -> Vec<AccountId> {
        lock(&self.inner.state).accounts.keys().cloned().collect()
    }

    /// The account handle for `account_id`, if it is in the mirror.
    #[must_use]
    pub fn account(&self, account_id: &AccountId) -> Option<UiAccount> {
        lock(&self.inner.state)
            .accounts
            .contains_key(account_id)
            .then(|| UiAccount::new(self.clone(), account_id.clone()))
    }

    /// A copy of one account's mirror.
    #[must_use]
    pub fn account_state(&self, account_id: &AccountId) -> Option<AccountState> {
        self.with_account(account_id, Clone::clone)
    }

    /// The granted procedures.
    #[must_use]
    pub fn rpc(&self) -> &FrameRpc {
        &self.inner.rpc
    }

    /// Shows the login screen, remembering the window callbacks.
    ///
    /// # Errors
    /// The frame's error, or [`LoginKitError::ChannelClosed`].
    pub async fn open_login_window(&self, options: LoginWindowOptions) -> LoginKitResult<()> {
        self.set_window_callbacks(options.on_login, options.on_close);
        self.show();
        self.frame_dispatch(&FrameMessage::OpenLoginWindow).await
    }

    /// Hides the frame and stops listening to it.
    ///
    /// Outstanding calls fail with [`LoginKitError::ChannelClosed`].
    pub fn dispose(&self) {
        self.inner.surface.hide();
        if let Some(pump) = lock(&self.inner.pump).take() {
            pump.abort();
        }
        self.inner.rpc.close();
    }

    /// Sends a [`FrameMessage`] through the `frameDispatch` procedure.
    ///
    /// # Errors
    /// The frame's error.
    pub async fn frame_dispatch(&self, message: &FrameMessage) -> LoginKitResult<()> {
        self.inner
            .rpc
            .call(FrameRequest::FrameDispatch {
                message: serde_json::to_value(message)?,
            })
            .await
            .map(drop)
    }

    pub(crate) fn with_account<T>(&self, account_id: &AccountId, f: impl FnOnce(&AccountState) -> T) -> Option<T> {
        lock(&self.inner.state).accounts.get(account_id).map(f)
    }

    pub(crate) fn forget_account(&self, account_id: &AccountId) {
        lock(&self.inner.state).accounts.remove(account_id);
    }

    pub(crate) fn replace_wallet_infos(&self, account_id: &AccountId, wallet_infos: WalletInfos) {
        match lock(&self.inner.state).accounts.get_mut(account_id) {
            Some(account) => account.wallet_infos = wallet_infos,
            None => log::warn!("wallet list for unknown account {account_id}"),
        }
    }

    pub(crate) fn set_window_callbacks(&self, on_login: Option<LoginCallback>, on_close: Option<CloseCallback>) {
        let mut state = lock(&self.inner.state);
        state.on_login = on_login;
        state.on_close = on_close;
    }

    pub(crate) fn show(&self) {
        self.inner.surface.show();
    }
}

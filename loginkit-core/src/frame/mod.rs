//! Frame-side controller.
//!
//! The frame owns every live account object. The host only ever holds
//! [`AccountId`]s minted here, and every wallet record it sees has gone
//! through [`crate::sanitize`].
//!
//! A [`FrameController`] is created by [`FrameController::accept`], which
//! answers the host's handshake and then serves remote-procedure calls until
//! the host hangs up. The platform's UI drives it through
//! [`FrameController::handle_login`], [`FrameController::handle_close`] and
//! [`FrameController::handle_error`].

pub mod actions;
pub mod selectors;
pub mod state;
pub mod view;

use std::sync::{Arc, Weak};

use serde_json::{Map, Value};
use tokio::sync::{broadcast, Mutex};
use zeroize::Zeroizing;

use crate::engine::{AccountEvent, EngineFactory, WalletAccount, WalletContext};
use crate::error::{LoginKitError, LoginKitResult};
use crate::ethereum::ETHEREUM_KEY_FIELD;
use crate::protocol::{
    AccountId, ClientMessage, CreateWalletReply, EthereumTransaction, FrameMessage, FrameMethod,
    FrameRequest, HandshakeReply, LoginPayload, SpendTransaction, WalletListChangedPayload,
};
use crate::sanitize::ETHEREUM_WALLET_TYPE;
use crate::transport::{
    decode_envelope, undecoded_call_id, FrameEnvelope, FramePort, HostEnvelope, PortReceiver,
    PortSender,
};

use actions::Followup;
pub use state::{make_frame_state, ClientSink, FrameState, Page};
pub use view::{NullRenderer, View, ViewRenderer};

/// The frame end of one host connection.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct FrameController {
    state: Arc<Mutex<FrameState>>,
    client: ClientSink,
}

impl std::fmt::Debug for FrameController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameController").finish_non_exhaustive()
    }
}

impl FrameController {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Answers the host's handshake and starts serving calls in the background.
    ///
    /// The first envelope must be a handshake. The engine context is built
    /// from its parameters, the empty view is rendered, and the reply grants
    /// every [`FrameMethod`] together with the local user directory.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// [`LoginKitError::ProtocolViolation`] if the first envelope is not a
    /// handshake, [`LoginKitError::ChannelClosed`] if the host hung up, and any
    /// engine error raised while building the context.
    pub async fn accept(
        port: FramePort,
        factory: Arc<dyn EngineFactory>,
        renderer: Arc<dyn ViewRenderer>,
    ) -> LoginKitResult<Self> {
        let FramePort {
            sender,
            mut receiver,
        } = port;

        let request = match receiver.recv().await {
            None => return Err(LoginKitError::ChannelClosed),
            Some(Err(e)) => return Err(e),
            Some(Ok(HostEnvelope::Connect { request })) => request,
            Some(Ok(other)) => {
                return Err(LoginKitError::ProtocolViolation {
                    channel: "handshake".to_string(),
                    message_type: other.kind().to_string(),
                })
            }
        };
        log::debug!(
            "handshake from app '{}' (hide_keys: {})",
            request.app_id,
            request.hide_keys
        );

        let client = ClientSink::new(sender.clone());
        let state = make_frame_state(&request, &*factory, client.clone(), renderer).await?;
        state.update_view();
        let local_users = selectors::get_local_users(&*state.context).await?;

        sender.send(&FrameEnvelope::ConnectReply {
            reply: HandshakeReply {
                local_users,
                methods: FrameMethod::ALL.to_vec(),
            },
        })?;

        let controller = Self {
            state: Arc::new(Mutex::new(state)),
            client,
        };
        tokio::spawn(controller.clone().serve(receiver, sender));
        Ok(controller)
    }

    async fn serve(self, mut receiver: PortReceiver<HostEnvelope>, sender: PortSender<FrameEnvelope>) {
        while let Some(text) = receiver.recv_text().await {
            match decode_envelope(&text) {
                Ok(HostEnvelope::Call { id, request }) => {
                    let controller = self.clone();
                    let sender = sender.clone();
                    tokio::spawn(async move {
                        let outcome = controller.call(request).await;
                        if let Err(e) = sender.send(&FrameEnvelope::Reply { id, outcome }) {
                            log::warn!("dropping reply to call {id}: {e}");
                        }
                    });
                }
                Ok(HostEnvelope::Connect { .. }) => {
                    self.report(LoginKitError::ProtocolViolation {
                        channel: "handshake".to_string(),
                        message_type: "connect".to_string(),
                    });
                }
                Err(e) => match undecoded_call_id(&text) {
                    // The host is waiting on this id.
                    Some(id) => {
                        log::warn!("undecodable call {id}: {e}");
                        if let Err(e) = sender.send(&FrameEnvelope::Reply { id, outcome: Err(e) }) {
                            log::warn!("dropping reply to call {id}: {e}");
                        }
                    }
                    None => self.report(e),
                },
            }
        }
        log::debug!("host hung up");
    }

    /// Sends an `error` notification, logging if even that fails.
    fn report(&self, error: LoginKitError) {
        log::error!("frame error: {error}");
        if let Err(e) = self.client.dispatch(&ClientMessage::Error(error)) {
            log::warn!("could not forward error to host: {e}");
        }
    }

    /// Runtime failures are forwarded as an `error` notification as well as
    /// returned.
    fn forward_runtime_error<T>(&self, result: LoginKitResult<T>) -> LoginKitResult<T> {
        if let Err(e) = &result {
            if !e.is_contract_error() {
                self.report(e.clone());
            }
        }
        result
    }

    /// Runs one remote-procedure call and encodes its return value.
    ///
    /// # Errors
    /// Whatever the procedure returns.
    pub async fn call(&self, request: FrameRequest) -> LoginKitResult<Value> {
        let method = request.method();
        log::debug!("call {method}");
        let result = match request {
            FrameRequest::CreateWallet {
                account_id,
                wallet_type,
                keys,
            } => self
                .create_wallet(&account_id, &wallet_type, keys)
                .await
                .and_then(|reply| Ok(serde_json::to_value(reply)?)),
            FrameRequest::CreateCurrencyWallet {
                account_id,
                wallet_type,
            } => self
                .create_currency_wallet(&account_id, &wallet_type)
                .await
                .and_then(|reply| Ok(serde_json::to_value(reply)?)),
            FrameRequest::SignEthereumTransaction {
                account_id,
                wallet_id,
                transaction,
            } => self
                .sign_ethereum_transaction(&account_id, &wallet_id, &transaction)
                .await
                .map(Value::String),
            FrameRequest::FrameDispatch { message } => {
                self.frame_dispatch(message).await.map(|()| Value::Null)
            }
            FrameRequest::SimpleSpend {
                account_id,
                wallet_id,
                address,
                amount,
            } => self
                .simple_spend(&account_id, &wallet_id, &address, &amount)
                .await
                .and_then(|tx| Ok(serde_json::to_value(tx)?)),
        };
        if let Err(e) = &result {
            log::debug!("call {method} failed: {e}");
        }
        self.forward_runtime_error(result)
    }

    // =========================================================================
    // Remote procedures
    // =========================================================================

    async fn account(&self, account_id: &AccountId) -> LoginKitResult<(Arc<dyn WalletAccount>, bool)> {
        let state = self.state.lock().await;
        Ok((state.account(account_id)?, state.hide_keys))
    }

    /// Creates a wallet from caller-provided keys.
    ///
    /// Returns the new id with the account's full, freshly sanitized wallet
    /// list.
    ///
    /// # Errors
    /// [`LoginKitError::InvalidAccountId`] or an engine error.
    pub async fn create_wallet(
        &self,
        account_id: &AccountId,
        wallet_type: &str,
        keys: Map<String, Value>,
    ) -> LoginKitResult<CreateWalletReply> {
        let (account, hide_keys) = self.account(account_id).await?;
        let wallet_id = account.create_wallet(wallet_type, keys).await?;
        Ok(CreateWalletReply {
            wallet_id,
            wallet_infos: selectors::get_wallet_infos(&*account, hide_keys),
        })
    }

    /// Creates a currency wallet.
    ///
    /// Ethereum wallets get a key drawn from the engine's random source and go
    /// through [`Self::create_wallet`] instead of the engine's currency path.
    ///
    /// # Errors
    /// [`LoginKitError::InvalidAccountId`] or an engine error.
    pub async fn create_currency_wallet(
        &self,
        account_id: &AccountId,
        wallet_type: &str,
    ) -> LoginKitResult<CreateWalletReply> {
        if wallet_type == ETHEREUM_WALLET_TYPE {
            let context = self.context().await;
            let bytes = Zeroizing::new(context.random_bytes(32));
            let mut keys = Map::new();
            keys.insert(
                ETHEREUM_KEY_FIELD.to_string(),
                Value::String(hex::encode(bytes.as_slice())),
            );
            return self.create_wallet(account_id, wallet_type, keys).await;
        }

        let (account, hide_keys) = self.account(account_id).await?;
        let wallet_id = account.create_currency_wallet(wallet_type).await?;
        Ok(CreateWalletReply {
            wallet_id,
            wallet_infos: selectors::get_wallet_infos(&*account, hide_keys),
        })
    }

    /// Signs an Ethereum transaction without the key leaving the frame.
    ///
    /// # Errors
    /// [`LoginKitError::KeyNotFound`] if the account, wallet, or key is
    /// missing; [`LoginKitError::InvalidInput`] for an unusable transaction.
    pub async fn sign_ethereum_transaction(
        &self,
        account_id: &AccountId,
        wallet_id: &str,
        transaction: &EthereumTransaction,
    ) -> LoginKitResult<String> {
        let account = self.state.lock().await.accounts.get(account_id).cloned();
        selectors::sign_ethereum_transaction(account.as_deref(), wallet_id, transaction)
    }

    /// Applies a host message to the navigation state.
    ///
    /// # Errors
    /// [`LoginKitError::ProtocolViolation`] / [`LoginKitError::MalformedMessage`]
    /// for an undecodable message, [`LoginKitError::InvalidAccountId`] for an
    /// unknown account.
    pub async fn frame_dispatch(&self, message: Value) -> LoginKitResult<()> {
        let message = FrameMessage::from_value(message)?;
        let followup = {
            let mut state = self.state.lock().await;
            actions::frame_dispatch(&mut state, message)?
        };
        match followup {
            Followup::None => Ok(()),
            Followup::Logout(account) => account.logout().await,
        }
    }

    /// Sends funds from one of the account's currency wallets.
    ///
    /// # Errors
    /// [`LoginKitError::InvalidAccountId`], [`LoginKitError::InvalidWalletId`],
    /// or an engine error from any spend step.
    pub async fn simple_spend(
        &self,
        account_id: &AccountId,
        wallet_id: &str,
        address: &str,
        amount: &str,
    ) -> LoginKitResult<SpendTransaction> {
        let (account, _) = self.account(account_id).await?;
        let wallet = account
            .currency_wallets()
            .remove(wallet_id)
            .ok_or_else(|| LoginKitError::InvalidWalletId {
                wallet_id: wallet_id.to_string(),
            })?;
        selectors::simple_spend(&*wallet, address, amount).await
    }

    // =========================================================================
    // UI events
    // =========================================================================

    /// The user logged in.
    ///
    /// Mints a fresh [`AccountId`], builds the `login` payload, stores the
    /// account, emits `login` and starts turning the account's change
    /// notifications into wallet-list refreshes.
    ///
    /// Nothing is stored when the login fails.
    ///
    /// # Errors
    /// Engine or channel failures while building or sending the `login`
    /// payload. Runtime failures are also forwarded to the host.
    pub async fn handle_login(&self, account: Arc<dyn WalletAccount>) -> LoginKitResult<AccountId> {
        let result = self.login(account).await;
        self.forward_runtime_error(result)
    }

    async fn login(&self, account: Arc<dyn WalletAccount>) -> LoginKitResult<AccountId> {
        let events = account.subscribe();
        // A failed login still uses up its id.
        let (account_id, context, hide_keys) = {
            let mut state = self.state.lock().await;
            let account_id = state.mint_account_id();
            (account_id, state.context.clone(), state.hide_keys)
        };
        log::debug!("login {account_id}");

        let payload = LoginPayload {
            account_id: account_id.clone(),
            username: account.username(),
            local_users: selectors::get_local_users(&*context).await?,
            wallet_infos: selectors::get_wallet_infos(&*account, hide_keys),
            currency_wallets: selectors::get_currency_wallets(&*account).await?,
        };

        // Stored before `login` goes out so the host's first call finds it.
        self.state
            .lock()
            .await
            .accounts
            .insert(account_id.clone(), account.clone());
        if let Err(e) = self.client.dispatch(&ClientMessage::Login(payload)) {
            self.state.lock().await.accounts.remove(&account_id);
            return Err(e);
        }

        tokio::spawn(watch_account(
            Arc::downgrade(&self.state),
            self.client.clone(),
            account_id.clone(),
            events,
        ));
        Ok(account_id)
    }

    /// The user dismissed the frame.
    ///
    /// # Errors
    /// [`LoginKitError::ChannelClosed`] if the host is gone.
    pub async fn handle_close(&self) -> LoginKitResult<()> {
        actions::handle_close(&mut *self.state.lock().await);
        self.client.dispatch(&ClientMessage::Close)
    }

    /// The login UI hit an error; forwards it to the host.
    pub fn handle_error(&self, error: LoginKitError) {
        self.report(error);
    }

    /// Recomputes and sends the wallet list for `account_id`.
    ///
    /// Returns `false` without sending anything when the account has been
    /// logged out.
    ///
    /// # Errors
    /// Engine or channel failures.
    pub async fn refresh_wallet_list(&self, account_id: &AccountId) -> LoginKitResult<bool> {
        refresh_wallet_list(&self.state, &self.client, account_id).await
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Current page.
    pub async fn page(&self) -> Page {
        self.state.lock().await.page
    }

    /// Handles of the accounts currently logged in.
    pub async fn account_ids(&self) -> Vec<AccountId> {
        self.state.lock().await.accounts.keys().cloned().collect()
    }

    /// Whether the session redacts keys.
    pub async fn hide_keys(&self) -> bool {
        self.state.lock().await.hide_keys
    }

    /// The current view.
    pub async fn view(&self) -> View {
        self.state.lock().await.view()
    }

    async fn context(&self) -> Arc<dyn WalletContext> {
        self.state.lock().await.context.clone()
    }
}

async fn refresh_wallet_list(
    state: &Mutex<FrameState>,
    client: &ClientSink,
    account_id: &AccountId,
) -> LoginKitResult<bool> {
    let (account, hide_keys) = {
        let state = state.lock().await;
        let Some(account) = state.accounts.get(account_id).cloned() else {
            log::warn!("wallet list changed for {account_id}, which is logged out");
            return Ok(false);
        };
        (account, state.hide_keys)
    };

    let wallet_infos = selectors::get_wallet_infos(&*account, hide_keys);
    let currency_wallets = selectors::get_currency_wallets(&*account).await?;
    client.dispatch(&ClientMessage::WalletListChanged(WalletListChangedPayload {
        account_id: account_id.clone(),
        wallet_infos,
        currency_wallets,
    }))?;
    Ok(true)
}

/// Turns account change notifications into wallet-list refreshes until the
/// account is logged out or the session ends.
async fn watch_account(
    state: Weak<Mutex<FrameState>>,
    client: ClientSink,
    account_id: AccountId,
    mut events: broadcast::Receiver<AccountEvent>,
) {
    loop {
        match events.recv().await {
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return,
        }
        let Some(state) = state.upgrade() else {
            return;
        };
        match refresh_wallet_list(&state, &client, &account_id).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(LoginKitError::ChannelClosed) => return,
            Err(e) => {
                log::error!("wallet list refresh for {account_id} failed: {e}");
                if client.dispatch(&ClientMessage::Error(e)).is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::engine::memory::{MemoryAccount, MemoryContext, MemoryEngine};
    use crate::engine::ContextOptions;
    use crate::protocol::HandshakeRequest;
    use crate::transport::{port_pair, HostPort};

    /// Lists users once, for the handshake, and fails afterwards.
    struct FlakyContext {
        inner: MemoryContext,
        listed: AtomicBool,
    }

    #[async_trait]
    impl WalletContext for FlakyContext {
        async fn list_usernames(&self) -> LoginKitResult<Vec<String>> {
            if self.listed.swap(true, Ordering::SeqCst) {
                return Err(LoginKitError::engine("disk"));
            }
            self.inner.list_usernames().await
        }

        async fn pin_login_enabled(&self, username: &str) -> LoginKitResult<bool> {
            self.inner.pin_login_enabled(username).await
        }

        fn random_bytes(&self, len: usize) -> Vec<u8> {
            self.inner.random_bytes(len)
        }
    }

    struct FlakyEngine(Arc<FlakyContext>);

    #[async_trait]
    impl EngineFactory for FlakyEngine {
        async fn make_context(&self, _options: &ContextOptions) -> LoginKitResult<Arc<dyn WalletContext>> {
            Ok(self.0.clone())
        }
    }

    fn handshake(hide_keys: bool) -> HostEnvelope {
        HostEnvelope::Connect {
            request: HandshakeRequest {
                api_key: "key".to_string(),
                app_id: "app".to_string(),
                hide_keys,
                plugin_names: Some(vec!["ethereum".to_string()]),
                vendor_name: Some("Vendor".to_string()),
                vendor_image_url: None,
            },
        }
    }

    async fn connect(hide_keys: bool) -> (FrameController, HostPort, Arc<MemoryEngine>) {
        let engine = Arc::new(MemoryEngine::new().with_user("alice", false));
        let (host, frame) = port_pair();
        host.sender.send(&handshake(hide_keys)).unwrap();
        let controller = FrameController::accept(frame, engine.clone(), Arc::new(NullRenderer))
            .await
            .unwrap();
        (controller, host, engine)
    }

    async fn next_notification(host: &mut HostPort) -> ClientMessage {
        loop {
            match host.receiver.recv().await.unwrap().unwrap() {
                FrameEnvelope::Notify { message } => return ClientMessage::from_value(message).unwrap(),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn handshake_grants_every_method() {
        let (_controller, mut host, engine) = connect(false).await;
        match host.receiver.recv().await.unwrap().unwrap() {
            FrameEnvelope::ConnectReply { reply } => {
                assert_eq!(reply.methods, FrameMethod::ALL.to_vec());
                assert!(reply.local_users.contains_key("alice"));
            }
            other => panic!("unexpected {}", other.kind()),
        }
        assert_eq!(engine.loaded_plugins(), vec!["ethereum".to_string()]);
    }

    #[tokio::test]
    async fn first_envelope_must_be_a_handshake() {
        let (host, frame) = port_pair();
        host.sender
            .send(&HostEnvelope::Call {
                id: 0,
                request: FrameRequest::FrameDispatch {
                    message: json!({ "type": "open-login-window" }),
                },
            })
            .unwrap();
        let err = FrameController::accept(frame, Arc::new(MemoryEngine::new()), Arc::new(NullRenderer))
            .await
            .unwrap_err();
        assert!(matches!(err, LoginKitError::ProtocolViolation { .. }));
    }

    #[tokio::test]
    async fn logins_mint_increasing_ids() {
        let (controller, _host, engine) = connect(false).await;
        let mut ids = Vec::new();
        for _ in 0..3 {
            let account = engine.context().login("alice").unwrap();
            ids.push(controller.handle_login(account).await.unwrap());
        }
        let sequences: Vec<_> = ids.iter().filter_map(AccountId::sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn failed_login_stores_nothing() {
        let context = FlakyContext {
            inner: MemoryContext::default(),
            listed: AtomicBool::new(false),
        };
        context.inner.add_user("alice", false);
        let (mut host, frame) = port_pair();
        host.sender.send(&handshake(false)).unwrap();
        let controller = FrameController::accept(
            frame,
            Arc::new(FlakyEngine(Arc::new(context))),
            Arc::new(NullRenderer),
        )
        .await
        .unwrap();

        let err = controller
            .handle_login(Arc::new(MemoryAccount::new("alice")))
            .await
            .unwrap_err();
        assert_eq!(err, LoginKitError::engine("disk"));
        assert!(controller.account_ids().await.is_empty());
        assert_eq!(
            next_notification(&mut host).await,
            ClientMessage::Error(LoginKitError::engine("disk"))
        );
    }

    #[tokio::test]
    async fn undecodable_call_is_answered() {
        let (_controller, mut host, _engine) = connect(false).await;
        host.sender
            .send_text(r#"{"kind":"call","id":3,"request":{"method":"explode","params":{}}}"#.to_string())
            .unwrap();

        loop {
            match host.receiver.recv().await.unwrap().unwrap() {
                FrameEnvelope::Reply { id, outcome } => {
                    assert_eq!(id, 3);
                    assert!(matches!(outcome, Err(LoginKitError::MalformedMessage { .. })));
                    break;
                }
                FrameEnvelope::ConnectReply { .. } => {}
                FrameEnvelope::Notify { message } => panic!("unexpected notification {message}"),
            }
        }
    }

    #[tokio::test]
    async fn manage_window_for_unknown_account_keeps_page() {
        let (controller, _host, _engine) = connect(false).await;
        controller
            .frame_dispatch(json!({ "type": "open-login-window" }))
            .await
            .unwrap();
        let err = controller
            .frame_dispatch(json!({ "type": "open-manage-window", "payload": { "accountId": "account0" } }))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LoginKitError::InvalidAccountId {
                account_id: AccountId::mint(0)
            }
        );
        assert_eq!(controller.page().await, Page::Login);
    }

    #[tokio::test]
    async fn logout_tears_the_account_down() {
        let (controller, _host, engine) = connect(false).await;
        let account = engine.context().login("alice").unwrap();
        let id = controller.handle_login(account.clone()).await.unwrap();

        controller
            .frame_dispatch(serde_json::to_value(FrameMessage::logout(id.clone())).unwrap())
            .await
            .unwrap();
        assert!(account.is_logged_out());
        assert!(controller.account_ids().await.is_empty());
        assert!(!controller.refresh_wallet_list(&id).await.unwrap());
        assert!(matches!(
            controller.create_wallet(&id, "wallet:bitcoin", Map::new()).await,
            Err(LoginKitError::InvalidAccountId { .. })
        ));
    }

    #[tokio::test]
    async fn engine_change_events_refresh_the_host() {
        let (controller, mut host, engine) = connect(true).await;
        let account = engine.context().login("alice").unwrap();
        let id = controller.handle_login(account.clone()).await.unwrap();
        assert!(matches!(next_notification(&mut host).await, ClientMessage::Login(_)));

        account.create_currency_wallet("wallet:bitcoin").await.unwrap();
        match next_notification(&mut host).await {
            ClientMessage::WalletListChanged(payload) => {
                assert_eq!(payload.account_id, id);
                assert_eq!(payload.wallet_infos.len(), 1);
            }
            other => panic!("unexpected {}", other.message_type()),
        }
    }

    #[tokio::test]
    async fn ethereum_currency_wallets_use_a_random_key() {
        let (controller, _host, engine) = connect(false).await;
        let account = engine.context().login("alice").unwrap();
        let id = controller.handle_login(account.clone()).await.unwrap();

        let reply = controller
            .create_currency_wallet(&id, ETHEREUM_WALLET_TYPE)
            .await
            .unwrap();
        let key = reply.wallet_infos[&reply.wallet_id].keys[ETHEREUM_KEY_FIELD]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(key.len(), 64);
        assert!(account.currency_wallet(&reply.wallet_id).is_some());
    }

    #[tokio::test]
    async fn runtime_errors_are_also_notified() {
        let (controller, mut host, engine) = connect(false).await;
        let account = engine.context().login("alice").unwrap();
        let id = controller.handle_login(account).await.unwrap();
        let _login = next_notification(&mut host).await;

        let err = controller
            .create_currency_wallet(&id, "wallet:dogecoin")
            .await
            .unwrap_err();
        assert!(matches!(err, LoginKitError::Engine { .. }));
        // Typed methods do not notify; the call boundary does.
        let outcome = controller
            .call(FrameRequest::CreateCurrencyWallet {
                account_id: id,
                wallet_type: "wallet:dogecoin".to_string(),
            })
            .await;
        assert!(outcome.is_err());
        assert!(matches!(
            next_notification(&mut host).await,
            ClientMessage::Error(LoginKitError::Engine { .. })
        ));
    }

    #[tokio::test]
    async fn close_resets_page_and_notifies() {
        let (controller, mut host, _engine) = connect(false).await;
        controller
            .frame_dispatch(json!({ "type": "open-login-window" }))
            .await
            .unwrap();
        controller.handle_close().await.unwrap();
        assert_eq!(controller.page().await, Page::Closed);
        assert_eq!(next_notification(&mut host).await, ClientMessage::Close);
    }
}

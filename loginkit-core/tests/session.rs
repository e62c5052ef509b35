use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loginkit_core::client::LoginWindowOptions;
use loginkit_core::engine::memory::MemoryAccount;
use loginkit_core::engine::{AccountEvent, CurrencyWallet, SpendTarget, WalletAccount, WalletKeyRecord};
use loginkit_core::frame::Page;
use loginkit_core::protocol::{
    AccountId, ClientMessage, EthereumTransaction, FrameMessage, FrameMethod, HandshakeReply,
    SpendTransaction, UserInfos,
};
use loginkit_core::transport::{EmbeddingSurface, FrameEnvelope, FramePort, HostEnvelope};
use loginkit_core::{connect, Client, ConnectOptions, LoginKitError, LoginKitResult};
use serde_json::{json, Map, Value};
use tokio::sync::{broadcast, mpsc};

mod common;

use common::{eth_record, wait_until, ManualSurface, Session, ETH_ADDRESS, ETH_KEY};

// ── Handshake ───────────────────────────────────────────────

#[tokio::test]
async fn handshake_grants_core_procedures_and_local_users() {
    let session = Session::start(false).await;

    for method in FrameMethod::REQUIRED {
        assert!(session.client.rpc().is_granted(method), "{method} not granted");
    }
    let users = session.client.local_users();
    assert_eq!(users.keys().collect::<Vec<_>>(), vec!["alice", "bob"]);
    assert!(users["alice"].has_pin);
    assert!(!users["bob"].has_pin);
    assert_eq!(session.engine.loaded_plugins(), vec!["ethereum".to_string()]);
    assert_eq!(session.controller.page().await, Page::Closed);
}

#[tokio::test(start_paused = true)]
async fn silent_frame_fails_the_handshake_after_the_timeout() {
    let (surface, mut ports) = ManualSurface::new();
    let timeout = Duration::from_millis(250);
    let started = tokio::time::Instant::now();

    let connecting = tokio::spawn(connect(
        ConnectOptions::new("key", "app").frame_timeout(timeout),
        surface,
    ));
    // Keep the frame's port open but never answer.
    let _frame = ports.recv().await.unwrap();

    let err = connecting.await.unwrap().unwrap_err();
    assert_eq!(err, LoginKitError::HandshakeTimeout { timeout_ms: 250 });
    assert!(started.elapsed() < timeout + Duration::from_millis(50));
}

#[tokio::test]
async fn frame_that_hangs_up_fails_the_handshake() {
    let (surface, mut ports) = ManualSurface::new();
    let connecting = tokio::spawn(connect(ConnectOptions::new("key", "app"), surface));
    drop(ports.recv().await.unwrap());

    assert_eq!(
        connecting.await.unwrap().unwrap_err(),
        LoginKitError::ChannelClosed
    );
}

#[tokio::test]
async fn reply_missing_a_core_procedure_is_rejected() {
    let (surface, mut ports) = ManualSurface::new();
    let connecting = tokio::spawn(connect(ConnectOptions::new("key", "app"), surface));

    let mut frame = ports.recv().await.unwrap();
    assert!(matches!(
        frame.receiver.recv().await.unwrap().unwrap(),
        HostEnvelope::Connect { .. }
    ));
    frame
        .sender
        .send(&FrameEnvelope::ConnectReply {
            reply: HandshakeReply {
                local_users: UserInfos::new(),
                methods: vec![FrameMethod::FrameDispatch, FrameMethod::CreateWallet],
            },
        })
        .unwrap();

    assert!(matches!(
        connecting.await.unwrap().unwrap_err(),
        LoginKitError::MethodNotGranted { .. }
    ));
}

// ── Login and account ids ───────────────────────────────────

#[tokio::test]
async fn hidden_keys_login_carries_only_the_derived_address() {
    let session = Session::start(true).await;
    let account = Arc::new(MemoryAccount::new("alice").with_wallet(eth_record("eth-1")));
    let ui = session.login(account).await;

    assert_eq!(ui.username().as_deref(), Some("alice"));
    let infos = ui.wallet_infos();
    let info = &infos["eth-1"];
    assert_eq!(Value::Object(info.keys.clone()), json!({ "ethereumAddress": ETH_ADDRESS }));
    assert_eq!(info.app_ids, None);

    let wire = serde_json::to_string(&infos).unwrap();
    assert!(!wire.contains("ethereumKey"));
    assert!(!wire.contains(ETH_KEY.trim_start_matches("0x")));
}

#[tokio::test]
async fn sequential_logins_mint_increasing_ids() {
    let session = Session::start(false).await;
    let mut sequences = Vec::new();
    for _ in 0..5 {
        let account = session.engine.context().login("bob").unwrap();
        let ui = session.login(account).await;
        sequences.push(ui.account_id().sequence().unwrap());
    }
    assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn login_window_callbacks_fire() {
    let session = Session::start(false).await;
    let (logins, mut login_rx) = mpsc::unbounded_channel();
    let (closes, mut close_rx) = mpsc::unbounded_channel();

    session
        .client
        .open_login_window(
            LoginWindowOptions::default()
                .on_login(move |account| {
                    let _ = logins.send(account.account_id().clone());
                })
                .on_close(move || {
                    let _ = closes.send(());
                }),
        )
        .await
        .unwrap();
    assert!(session.surface.is_visible());
    assert_eq!(session.controller.page().await, Page::Login);

    let account = session.engine.context().login("alice").unwrap();
    let id = session.controller.handle_login(account).await.unwrap();
    assert_eq!(login_rx.recv().await.unwrap(), id);

    session.controller.handle_close().await.unwrap();
    close_rx.recv().await.unwrap();
    assert!(!session.surface.is_visible());
    assert_eq!(session.controller.page().await, Page::Closed);
}

// ── Navigation ──────────────────────────────────────────────

#[tokio::test]
async fn manage_window_for_unknown_account_is_rejected() {
    let session = Session::start(false).await;
    let err = session
        .client
        .frame_dispatch(&FrameMessage::open_manage_window(AccountId::mint(0)))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LoginKitError::InvalidAccountId {
            account_id: AccountId::mint(0)
        }
    );
    assert_eq!(session.controller.page().await, Page::Closed);
}

#[tokio::test]
async fn manage_window_renders_the_account() {
    let session = Session::start(false).await;
    let ui = session
        .login(session.engine.context().login("alice").unwrap())
        .await;

    ui.open_manage_window(None).await.unwrap();
    assert_eq!(session.controller.page().await, Page::Account);
    let last = session.renderer.views().pop().unwrap();
    assert_eq!(last.page, Page::Account);
    assert_eq!(last.account_username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn logged_out_account_is_rejected_everywhere() {
    let session = Session::start(false).await;
    let account = session.engine.context().login("alice").unwrap();
    let ui = session.login(account.clone()).await;
    let id = ui.account_id().clone();

    ui.logout().await.unwrap();
    assert!(account.is_logged_out());
    assert!(session.client.account(&id).is_none());
    assert!(ui.username().is_none());

    assert!(matches!(
        ui.create_wallet("wallet:bitcoin", Map::new()).await,
        Err(LoginKitError::InvalidAccountId { .. })
    ));
    assert!(matches!(
        ui.logout().await,
        Err(LoginKitError::InvalidAccountId { .. })
    ));
    assert!(matches!(
        ui.open_manage_window(None).await,
        Err(LoginKitError::InvalidAccountId { .. })
    ));
    assert!(!session.controller.refresh_wallet_list(&id).await.unwrap());
}

// ── Remote procedures ───────────────────────────────────────

#[tokio::test]
async fn sequential_create_wallet_snapshots_grow() {
    let session = Session::start(false).await;
    let ui = session
        .login(session.engine.context().login("alice").unwrap())
        .await;

    let mut sizes = Vec::new();
    for n in 0..3 {
        let mut keys = Map::new();
        keys.insert("seed".to_string(), json!(format!("seed-{n}")));
        let wallet_id = ui.create_wallet("wallet:bitcoin", keys).await.unwrap();
        let infos = ui.wallet_infos();
        assert_eq!(infos[&wallet_id].keys["seed"], json!(format!("seed-{n}")));
        sizes.push(infos.len());
    }
    assert_eq!(sizes, vec![1, 2, 3]);
}

#[tokio::test]
async fn ethereum_currency_wallet_is_created_with_a_hidden_key() {
    let session = Session::start(true).await;
    let ui = session
        .login(session.engine.context().login("alice").unwrap())
        .await;

    let wallet_id = ui.create_currency_wallet("wallet:ethereum").await.unwrap();
    let info = ui.get_first_wallet_info("wallet:ethereum").unwrap();
    assert_eq!(info.id, wallet_id);
    assert_eq!(info.keys.keys().collect::<Vec<_>>(), vec!["ethereumAddress"]);
}

#[tokio::test]
async fn signing_happens_in_the_frame() {
    let session = Session::start(true).await;
    let account = Arc::new(MemoryAccount::new("alice").with_wallet(eth_record("eth-1")));
    let ui = session.login(account).await;
    let transaction = EthereumTransaction {
        nonce: Some("0x0".to_string()),
        gas_price: Some("0x3b9aca00".to_string()),
        gas_limit: Some("0x5208".to_string()),
        to: Some("0x3535353535353535353535353535353535353535".to_string()),
        value: Some("0x1".to_string()),
        data: None,
        chain_id: Some(1),
    };

    let signed = ui
        .sign_ethereum_transaction("eth-1", transaction.clone())
        .await
        .unwrap();
    assert!(signed.starts_with("0xf8"));

    assert_eq!(
        ui.sign_ethereum_transaction("nope", transaction).await,
        Err(LoginKitError::KeyNotFound)
    );
}

#[tokio::test]
async fn simple_spend_moves_funds() {
    let session = Session::start(false).await;
    let account = Arc::new(MemoryAccount::new("alice").with_wallet(eth_record("eth-1")));
    account.set_balance("eth-1", "1000");
    let ui = session.login(account.clone()).await;

    let tx = ui.simple_spend("eth-1", "0xdest", "250").await.unwrap();
    assert_eq!(tx.native_amount, "250");
    assert_eq!(tx.currency_code, "ETH");
    let wallet = account.currency_wallet("eth-1").unwrap();
    assert_eq!(wallet.broadcast_log(), vec![tx.clone()]);
    assert_eq!(wallet.history(), vec![tx]);

    assert_eq!(
        ui.simple_spend("missing", "0xdest", "1").await,
        Err(LoginKitError::InvalidWalletId {
            wallet_id: "missing".to_string()
        })
    );
}

// ── Notifications and errors ────────────────────────────────

#[tokio::test]
async fn engine_changes_reach_the_mirror() {
    let session = Session::start(false).await;
    let account = session.engine.context().login("alice").unwrap();
    let ui = session.login(account.clone()).await;

    account.add_wallet(eth_record("eth-2"));
    wait_until(|| ui.wallet_infos().contains_key("eth-2")).await;
    wait_until(|| ui.currency_wallets().contains_key("eth-2")).await;
    assert_eq!(ui.currency_wallets()["eth-2"].address, ETH_ADDRESS);
}

#[tokio::test]
async fn engine_failures_are_reported_and_returned() {
    let mut session = Session::start(false).await;
    let ui = session
        .login(session.engine.context().login("alice").unwrap())
        .await;

    let err = ui
        .create_currency_wallet("wallet:dogecoin")
        .await
        .unwrap_err();
    assert!(matches!(err, LoginKitError::Engine { .. }));
    assert_eq!(session.errors.recv().await.unwrap(), err);
}

/// A currency wallet whose node is unreachable.
struct OfflineWallet;

#[async_trait]
impl CurrencyWallet for OfflineWallet {
    fn currency_code(&self) -> String {
        "ETH".to_string()
    }

    async fn receive_address(&self) -> LoginKitResult<String> {
        Err(LoginKitError::engine("node unreachable"))
    }

    fn balance(&self, _currency_code: &str) -> String {
        "0".to_string()
    }

    async fn make_spend(&self, _targets: Vec<SpendTarget>) -> LoginKitResult<SpendTransaction> {
        Err(LoginKitError::engine("node unreachable"))
    }

    async fn sign_tx(&self, tx: SpendTransaction) -> LoginKitResult<SpendTransaction> {
        Ok(tx)
    }

    async fn broadcast_tx(&self, _tx: &SpendTransaction) -> LoginKitResult<()> {
        Err(LoginKitError::engine("node unreachable"))
    }

    async fn save_tx(&self, _tx: &SpendTransaction) -> LoginKitResult<()> {
        Ok(())
    }
}

/// A memory account whose currency wallets can be swapped for [`OfflineWallet`]s.
struct FlakyAccount {
    inner: Arc<MemoryAccount>,
    offline: AtomicBool,
}

#[async_trait]
impl WalletAccount for FlakyAccount {
    fn username(&self) -> String {
        self.inner.username()
    }

    fn all_keys(&self) -> Vec<WalletKeyRecord> {
        self.inner.all_keys()
    }

    async fn create_wallet(&self, wallet_type: &str, keys: Map<String, Value>) -> LoginKitResult<String> {
        self.inner.create_wallet(wallet_type, keys).await
    }

    async fn create_currency_wallet(&self, wallet_type: &str) -> LoginKitResult<String> {
        self.inner.create_currency_wallet(wallet_type).await
    }

    fn currency_wallets(&self) -> BTreeMap<String, Arc<dyn CurrencyWallet>> {
        let wallets = self.inner.currency_wallets();
        if !self.offline.load(Ordering::SeqCst) {
            return wallets;
        }
        wallets
            .into_keys()
            .map(|id| (id, Arc::new(OfflineWallet) as Arc<dyn CurrencyWallet>))
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.inner.subscribe()
    }

    async fn logout(&self) -> LoginKitResult<()> {
        self.inner.logout().await
    }
}

#[tokio::test]
async fn failed_refresh_after_an_engine_change_reaches_on_error() {
    let mut session = Session::start(false).await;
    let inner = Arc::new(MemoryAccount::new("alice").with_wallet(eth_record("eth-1")));
    let account = Arc::new(FlakyAccount {
        inner: inner.clone(),
        offline: AtomicBool::new(false),
    });

    let id = session.controller.handle_login(account.clone()).await.unwrap();
    wait_until(|| session.client.account(&id).is_some()).await;

    account.offline.store(true, Ordering::SeqCst);
    inner.add_wallet(eth_record("eth-2"));

    assert_eq!(
        session.errors.recv().await.unwrap(),
        LoginKitError::engine("node unreachable")
    );
    let ui = session.client.account(&id).unwrap();
    assert!(!ui.wallet_infos().contains_key("eth-2"));
}

#[tokio::test]
async fn stale_wallet_list_update_is_ignored() {
    let session = Session::start(false).await;
    session
        .client
        .dispatch_value(json!({
            "type": "wallet-list-changed",
            "payload": { "accountId": "account9", "walletInfos": {}, "currencyWallets": {} }
        }))
        .unwrap();
    assert!(session.client.accounts().is_empty());
}

/// Connects to a frame played by hand, collecting `on_error` reports.
async fn connect_by_hand() -> (Client, FramePort, mpsc::UnboundedReceiver<LoginKitError>) {
    let (surface, mut ports) = ManualSurface::new();
    let (errors, error_rx) = mpsc::unbounded_channel();
    let connecting = tokio::spawn(connect(
        ConnectOptions::new("key", "app").on_error(move |e| {
            let _ = errors.send(e.clone());
        }),
        surface,
    ));

    let mut frame = ports.recv().await.unwrap();
    let _handshake = frame.receiver.recv().await.unwrap().unwrap();
    frame
        .sender
        .send(&FrameEnvelope::ConnectReply {
            reply: HandshakeReply {
                local_users: UserInfos::new(),
                methods: FrameMethod::ALL.to_vec(),
            },
        })
        .unwrap();
    let client = connecting.await.unwrap().unwrap();
    (client, frame, error_rx)
}

#[tokio::test]
async fn unknown_notification_type_ends_the_connection() {
    let (client, frame, mut error_rx) = connect_by_hand().await;

    frame
        .sender
        .send(&FrameEnvelope::Notify {
            message: json!({ "type": "balance-changed", "payload": {} }),
        })
        .unwrap();

    assert_eq!(
        error_rx.recv().await.unwrap(),
        LoginKitError::ProtocolViolation {
            channel: "client".to_string(),
            message_type: "balance-changed".to_string(),
        }
    );
    assert_eq!(
        client.frame_dispatch(&FrameMessage::OpenLoginWindow).await,
        Err(LoginKitError::ChannelClosed)
    );
}

#[tokio::test]
async fn malformed_notification_ends_the_connection() {
    let (client, frame, mut error_rx) = connect_by_hand().await;

    frame
        .sender
        .send(&FrameEnvelope::Notify {
            message: json!({ "type": "login", "payload": {} }),
        })
        .unwrap();

    let err = error_rx.recv().await.unwrap();
    assert!(
        matches!(&err, LoginKitError::MalformedMessage { reason } if reason.contains("login")),
        "{err:?}"
    );
    assert!(client.accounts().is_empty());
    assert_eq!(
        client.frame_dispatch(&FrameMessage::OpenLoginWindow).await,
        Err(LoginKitError::ChannelClosed)
    );
}

#[tokio::test]
async fn frame_error_notification_reaches_on_error() {
    let mut session = Session::start(false).await;
    session
        .controller
        .handle_error(LoginKitError::engine("password check failed"));

    assert_eq!(
        session.errors.recv().await.unwrap(),
        LoginKitError::engine("password check failed")
    );
    // A forwarded error is not fatal.
    assert!(session
        .client
        .frame_dispatch(&FrameMessage::OpenLoginWindow)
        .await
        .is_ok());
}

#[tokio::test]
async fn dispose_fails_later_calls() {
    let session = Session::start(false).await;
    session
        .client
        .open_login_window(LoginWindowOptions::default())
        .await
        .unwrap();
    session.client.dispose();

    assert!(!session.surface.is_visible());
    assert_eq!(
        session
            .client
            .frame_dispatch(&FrameMessage::OpenLoginWindow)
            .await,
        Err(LoginKitError::ChannelClosed)
    );
}

#[tokio::test]
async fn close_notification_can_be_dispatched_directly() {
    let session = Session::start(false).await;
    session.surface.show();
    assert!(session.surface.is_visible());
    session.client.dispatch(ClientMessage::Close);
    assert!(!session.surface.is_visible());
}

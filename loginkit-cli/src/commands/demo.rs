//! A full session: host and frame on one runtime, backed by the in-memory engine.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use eyre::{eyre, OptionExt, WrapErr};
use loginkit_core::client::LoginWindowOptions;
use loginkit_core::engine::memory::{MemoryAccount, MemoryEngine};
use loginkit_core::ethereum::{self, ETHEREUM_ADDRESS_FIELD, ETHEREUM_KEY_FIELD};
use loginkit_core::frame::{View, ViewRenderer};
use loginkit_core::protocol::{EthereumTransaction, SpendTransaction, WalletInfos};
use loginkit_core::sanitize::ETHEREUM_WALLET_TYPE;
use loginkit_core::transport::InProcessSurface;
use loginkit_core::{connect, ConnectOptions, UiAccount};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::input::print_json;

#[derive(Args)]
pub struct DemoArgs {
    /// Local user to log in as.
    #[arg(long, default_value = "demo")]
    pub username: String,

    /// Whether the user has PIN login enabled.
    #[arg(long)]
    pub pin: bool,

    /// Redact wallet keys for this session.
    #[arg(long)]
    pub hide_keys: bool,

    /// Currency plugins to request.
    #[arg(long = "plugin", default_values_t = ["ethereum".to_string()])]
    pub plugins: Vec<String>,

    /// Handshake deadline in milliseconds.
    #[arg(long, default_value_t = 15_000)]
    pub timeout_ms: u64,

    /// Chain id for the sample transaction.
    #[arg(long, default_value_t = 1)]
    pub chain_id: u64,

    /// Fund the new wallet with this many wei and spend half of it.
    #[arg(long)]
    pub fund: Option<u128>,
}

/// Logs every screen the frame would draw.
struct TracingRenderer;

impl ViewRenderer for TracingRenderer {
    fn render(&self, view: &View) {
        tracing::info!(
            page = ?view.page,
            account = view.account_username.as_deref().unwrap_or(""),
            "frame view"
        );
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DemoReport {
    account_id: String,
    wallet_id: String,
    wallet_infos: WalletInfos,
    signed_transaction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    spend: Option<SpendTransaction>,
}

pub async fn run(args: DemoArgs, api_key: String, app_id: String, json: bool) -> eyre::Result<()> {
    let engine = Arc::new(MemoryEngine::new().with_user(&args.username, args.pin));
    let surface = Arc::new(InProcessSurface::new(engine.clone(), Arc::new(TracingRenderer)));

    let options = ConnectOptions::new(api_key, app_id)
        .hide_keys(args.hide_keys)
        .plugin_names(args.plugins.clone())
        .frame_timeout(Duration::from_millis(args.timeout_ms))
        .vendor("LoginKit CLI", None)
        .on_error(|e| tracing::error!(error = %e, "frame reported an error"));
    let client = connect(options, surface.clone()).await?;
    tracing::info!(users = client.local_users().len(), "connected");

    let (logins, mut login_rx) = mpsc::unbounded_channel();
    client
        .open_login_window(LoginWindowOptions::default().on_login(move |account| {
            let _ = logins.send(account);
        }))
        .await?;

    // Stand in for the user typing their password into the frame.
    let controller = surface
        .controller()
        .await
        .wrap_err("frame did not accept the handshake")?;
    let account = Arc::new(MemoryAccount::new(&args.username));
    controller.handle_login(account.clone()).await?;
    let ui = login_rx.recv().await.ok_or_eyre("login callback never fired")?;
    tracing::info!(account_id = %ui.account_id(), "logged in");

    let wallet_id = ui.create_currency_wallet(ETHEREUM_WALLET_TYPE).await?;
    let address = ethereum_address(&ui, &wallet_id)?;
    tracing::info!(%wallet_id, %address, "created ethereum wallet");

    let signed_transaction = ui
        .sign_ethereum_transaction(
            &wallet_id,
            EthereumTransaction {
                nonce: Some("0x0".to_string()),
                gas_price: Some("0x3b9aca00".to_string()),
                gas_limit: Some("0x5208".to_string()),
                to: Some(address.clone()),
                value: Some("0x0".to_string()),
                data: None,
                chain_id: Some(args.chain_id),
            },
        )
        .await?;

    let spend = match args.fund {
        Some(amount) => {
            account.set_balance(&wallet_id, &amount.to_string());
            let tx = ui
                .simple_spend(&wallet_id, &address, &(amount / 2).to_string())
                .await?;
            tracing::info!(txid = %tx.txid, "broadcast spend");
            Some(tx)
        }
        None => None,
    };

    let report = DemoReport {
        account_id: ui.account_id().to_string(),
        wallet_id,
        wallet_infos: ui.wallet_infos(),
        signed_transaction,
        spend,
    };

    ui.logout().await?;
    controller.handle_close().await?;
    client.dispose();

    if json {
        print_json(&report)
    } else {
        println!("account:     {}", report.account_id);
        println!("wallet:      {} ({address})", report.wallet_id);
        println!("signed tx:   {}", report.signed_transaction);
        if let Some(spend) = &report.spend {
            println!("spend:       {} {} -> {}", spend.native_amount, spend.currency_code, spend.txid);
        }
        println!("wallets as the host sees them:");
        print_json(&report.wallet_infos)
    }
}

/// The wallet's address from whatever the session lets the host see.
fn ethereum_address(ui: &UiAccount, wallet_id: &str) -> eyre::Result<String> {
    let infos = ui.wallet_infos();
    let keys = &infos
        .get(wallet_id)
        .ok_or_else(|| eyre!("wallet {wallet_id} missing from the host's wallet list"))?
        .keys;

    if let Some(address) = keys.get(ETHEREUM_ADDRESS_FIELD).and_then(|v| v.as_str()) {
        return Ok(address.to_string());
    }
    let key = keys
        .get(ETHEREUM_KEY_FIELD)
        .and_then(|v| v.as_str())
        .ok_or_eyre("wallet carries neither an address nor a key")?;
    Ok(ethereum::private_key_to_address(key)?)
}

//! The host's mirror of frame state.
//!
//! Only [`ClientState::apply`] writes it, and only with snapshots delivered
//! by the frame. When two snapshots for one account overlap, the one applied
//! last wins.

use std::collections::BTreeMap;

use super::options::{CloseCallback, ErrorCallback, LoginCallback};
use crate::error::LoginKitError;
use crate::protocol::{AccountId, ClientMessage, CurrencyWalletProxies, UserInfos, WalletInfos};

/// What the host knows about one logged-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    /// The account's username.
    pub username: String,
    /// Last delivered wallet list.
    pub wallet_infos: WalletInfos,
    /// Last delivered currency wallet views.
    pub currency_wallets: CurrencyWalletProxies,
}

/// Host-side session state.
pub struct ClientState {
    /// Account mirrors by handle.
    pub accounts: BTreeMap<AccountId, AccountState>,
    /// The host's application id.
    pub app_id: String,
    /// Last delivered user directory.
    pub local_users: UserInfos,
    /// Close callback for the currently open window.
    pub on_close: Option<CloseCallback>,
    /// Error callback.
    pub on_error: ErrorCallback,
    /// Login callback for the currently open window.
    pub on_login: Option<LoginCallback>,
}

/// Callback work produced by [`ClientState::apply`], run after the state
/// lock is released.
pub enum Effect {
    /// Nothing to do.
    None,
    /// Hide the surface, then call the close callback if any.
    Close(Option<CloseCallback>),
    /// Report an error.
    Error(ErrorCallback, LoginKitError),
    /// An account logged in.
    Login(Option<LoginCallback>, AccountId),
}

impl ClientState {
    /// Fresh state after a handshake.
    #[must_use]
    pub fn new(app_id: String, local_users: UserInfos, on_error: ErrorCallback) -> Self {
        Self {
            accounts: BTreeMap::new(),
            app_id,
            local_users,
            on_close: None,
            on_error,
            on_login: None,
        }
    }

    /// Applies a frame notification.
    pub fn apply(&mut self, message: ClientMessage) -> Effect {
        match message {
            ClientMessage::Close => Effect::Close(self.on_close.clone()),
            ClientMessage::Error(error) => Effect::Error(self.on_error.clone(), error),
            ClientMessage::Login(payload) => {
                self.accounts.insert(
                    payload.account_id.clone(),
                    AccountState {
                        username: payload.username,
                        wallet_infos: payload.wallet_infos,
                        currency_wallets: payload.currency_wallets,
                    },
                );
                self.local_users = payload.local_users;
                Effect::Login(self.on_login.clone(), payload.account_id)
            }
            ClientMessage::WalletListChanged(payload) => {
                match self.accounts.get_mut(&payload.account_id) {
                    Some(account) => {
                        account.wallet_infos = payload.wallet_infos;
                        account.currency_wallets = payload.currency_wallets;
                    }
                    None => log::warn!("wallet list for unknown account {}", payload.account_id),
                }
                Effect::None
            }
        }
    }
}

//! The host's handle to one logged-in account.

use serde_json::{Map, Value};

use super::options::CloseCallback;
use super::Client;
use crate::error::LoginKitResult;
use crate::protocol::{
    AccountId, CreateWalletReply, CurrencyWalletProxies, EthereumTransaction, FrameMessage,
    FrameRequest, SpendTransaction, WalletInfo, WalletInfos,
};

/// A logged-in account as seen from the host.
///
/// Holds only the [`AccountId`]; every read goes to the client's mirror and
/// every action is a call into the frame. Once the account logs out the
/// getters return empty values and the frame rejects further calls.
#[derive(Clone)]
pub struct UiAccount {
    client: Client,
    account_id: AccountId,
}

impl std::fmt::Debug for UiAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiAccount")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl UiAccount {
    pub(super) const fn new(client: Client, account_id: AccountId) -> Self {
        Self { client, account_id }
    }

    /// The capability handle.
    #[must_use]
    pub const fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// The host's application id.
    #[must_use]
    pub fn app_id(&self) -> String {
        self.client.app_id()
    }

    /// The account's username, while logged in.
    #[must_use]
    pub fn username(&self) -> Option<String> {
        self.client
            .with_account(&self.account_id, |account| account.username.clone())
    }

    /// Last delivered wallet list.
    #[must_use]
    pub fn wallet_infos(&self) -> WalletInfos {
        self.client
            .with_account(&self.account_id, |account| account.wallet_infos.clone())
            .unwrap_or_default()
    }

    /// Last delivered currency wallet views.
    #[must_use]
    pub fn currency_wallets(&self) -> CurrencyWalletProxies {
        self.client
            .with_account(&self.account_id, |account| account.currency_wallets.clone())
            .unwrap_or_default()
    }

    /// The first non-deleted wallet of `wallet_type`, by sort index.
    #[must_use]
    pub fn get_first_wallet_info(&self, wallet_type: &str) -> Option<WalletInfo> {
        self.wallet_infos()
            .into_values()
            .filter(|info| info.wallet_type == wallet_type && !info.deleted)
            .min_by_key(|info| info.sort_index)
    }

    /// Forgets the account and asks the frame to log it out.
    ///
    /// # Errors
    /// The frame's error, such as
    /// [`crate::error::LoginKitError::InvalidAccountId`] on a second logout.
    pub async fn logout(&self) -> LoginKitResult<()> {
        self.client.forget_account(&self.account_id);
        self.client
            .frame_dispatch(&FrameMessage::logout(self.account_id.clone()))
            .await
    }

    /// Shows the account management screen.
    ///
    /// # Errors
    /// The frame's error, such as an unknown account.
    pub async fn open_manage_window(&self, on_close: Option<CloseCallback>) -> LoginKitResult<()> {
        self.client.set_window_callbacks(None, on_close);
        self.client.show();
        self.client
            .frame_dispatch(&FrameMessage::open_manage_window(self.account_id.clone()))
            .await
    }

    /// Creates a wallet from keys and returns its id.
    ///
    /// The cached wallet list is replaced by the snapshot in the reply.
    ///
    /// # Errors
    /// The frame's error.
    pub async fn create_wallet(&self, wallet_type: &str, keys: Map<String, Value>) -> LoginKitResult<String> {
        let reply: CreateWalletReply = self
            .client
            .rpc()
            .call_as(FrameRequest::CreateWallet {
                account_id: self.account_id.clone(),
                wallet_type: wallet_type.to_string(),
                keys,
            })
            .await?;
        Ok(self.store_reply(reply))
    }

    /// Creates a currency wallet and returns its id.
    ///
    /// # Errors
    /// The frame's error.
    pub async fn create_currency_wallet(&self, wallet_type: &str) -> LoginKitResult<String> {
        let reply: CreateWalletReply = self
            .client
            .rpc()
            .call_as(FrameRequest::CreateCurrencyWallet {
                account_id: self.account_id.clone(),
                wallet_type: wallet_type.to_string(),
            })
            .await?;
        Ok(self.store_reply(reply))
    }

    /// Has the frame sign an Ethereum transaction; returns the signed hex.
    ///
    /// # Errors
    /// [`crate::error::LoginKitError::KeyNotFound`] if the wallet has no key.
    pub async fn sign_ethereum_transaction(
        &self,
        wallet_id: &str,
        transaction: EthereumTransaction,
    ) -> LoginKitResult<String> {
        self.client
            .rpc()
            .call_as(FrameRequest::SignEthereumTransaction {
                account_id: self.account_id.clone(),
                wallet_id: wallet_id.to_string(),
                transaction,
            })
            .await
    }

    /// Sends `amount` from a currency wallet to `address`.
    ///
    /// # Errors
    /// The frame's error.
    pub async fn simple_spend(&self, wallet_id: &str, address: &str, amount: &str) -> LoginKitResult<SpendTransaction> {
        self.client
            .rpc()
            .call_as(FrameRequest::SimpleSpend {
                account_id: self.account_id.clone(),
                wallet_id: wallet_id.to_string(),
                address: address.to_string(),
                amount: amount.to_string(),
            })
            .await
    }

    fn store_reply(&self, reply: CreateWalletReply) -> String {
        let CreateWalletReply {
            wallet_id,
            wallet_infos,
        } = reply;
        self.client.replace_wallet_infos(&self.account_id, wallet_infos);
        wallet_id
    }
}

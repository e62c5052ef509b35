//! Read-side helpers that turn engine objects into wire snapshots.

use crate::engine::{CurrencyWallet, SpendTarget, WalletAccount, WalletContext};
use crate::error::{LoginKitError, LoginKitResult};
use crate::ethereum::{self, ETHEREUM_KEY_FIELD};
use crate::protocol::{
    CurrencyWalletProxies, CurrencyWalletProxy, EthereumTransaction, SpendTransaction, UserInfo,
    UserInfos, WalletInfos,
};
use crate::sanitize::sanitize_wallet_infos;

/// Builds the table of users available on this device.
///
/// # Errors
/// Propagates engine failures.
pub async fn get_local_users(context: &dyn WalletContext) -> LoginKitResult<UserInfos> {
    let mut out = UserInfos::new();
    for username in context.list_usernames().await? {
        let has_pin = context.pin_login_enabled(&username).await?;
        out.insert(username.clone(), UserInfo { username, has_pin });
    }
    Ok(out)
}

/// The account's wallets, sanitized under `hide_keys`.
#[must_use]
pub fn get_wallet_infos(account: &dyn WalletAccount, hide_keys: bool) -> WalletInfos {
    sanitize_wallet_infos(&account.all_keys(), hide_keys)
}

/// Address and balance views of the account's synced wallets.
///
/// # Errors
/// Propagates engine failures deriving receive addresses.
pub async fn get_currency_wallets(account: &dyn WalletAccount) -> LoginKitResult<CurrencyWalletProxies> {
    let mut out = CurrencyWalletProxies::new();
    for (wallet_id, wallet) in account.currency_wallets() {
        let address = wallet.receive_address().await?;
        let code = wallet.currency_code();
        let balance = wallet.balance(&code);
        let mut proxy = CurrencyWalletProxy {
            address,
            ..CurrencyWalletProxy::default()
        };
        proxy.balances.insert(code, balance);
        out.insert(wallet_id, proxy);
    }
    Ok(out)
}

/// Signs an Ethereum transaction with one of the account's keys.
///
/// The private key is read from the key record and never returned.
///
/// # Errors
/// [`LoginKitError::KeyNotFound`] when the account, the wallet, or its
/// `ethereumKey` is absent; signing errors from [`ethereum::sign_transaction`].
pub fn sign_ethereum_transaction(
    account: Option<&dyn WalletAccount>,
    wallet_id: &str,
    transaction: &EthereumTransaction,
) -> LoginKitResult<String> {
    let record = account
        .and_then(|account| account.all_keys().into_iter().find(|info| info.id == wallet_id))
        .ok_or(LoginKitError::KeyNotFound)?;
    let key = record
        .keys
        .get(ETHEREUM_KEY_FIELD)
        .and_then(serde_json::Value::as_str)
        .ok_or(LoginKitError::KeyNotFound)?;

    log::debug!("signing ethereum transaction for wallet {wallet_id}");
    ethereum::sign_transaction(key, transaction)
}

/// Sends `amount` from `wallet` to `address`: make, sign, broadcast, save.
///
/// # Errors
/// Propagates engine failures from any step.
pub async fn simple_spend(
    wallet: &dyn CurrencyWallet,
    address: &str,
    amount: &str,
) -> LoginKitResult<SpendTransaction> {
    let tx = wallet
        .make_spend(vec![SpendTarget {
            public_address: address.to_string(),
            native_amount: amount.to_string(),
        }])
        .await?;
    let tx = wallet.sign_tx(tx).await?;
    log::debug!("broadcasting {} {} to {address}", tx.native_amount, tx.currency_code);
    wallet.broadcast_tx(&tx).await?;
    wallet.save_tx(&tx).await?;
    Ok(tx)
}

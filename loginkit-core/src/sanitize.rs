//! The key-hiding policy.
//!
//! Every wallet record that crosses to the host passes through
//! [`sanitize_wallet_info`]: login payloads, wallet-list refreshes and the
//! replies of `createWallet` / `createCurrencyWallet`. The function is pure, so
//! the same `(record, hide_keys)` always yields the same output.

use serde_json::{Map, Value};

use crate::engine::WalletKeyRecord;
use crate::ethereum::{self, ETHEREUM_ADDRESS_FIELD, ETHEREUM_KEY_FIELD};
use crate::protocol::{WalletInfo, WalletInfos};

/// Wallet type tag for Ethereum key records.
pub const ETHEREUM_WALLET_TYPE: &str = "wallet:ethereum";

/// Produces the host-visible view of one wallet.
///
/// - `hide_keys == false`: keys and app ids are copied verbatim.
/// - `hide_keys == true`, Ethereum: keys become `{ethereumAddress}` derived
///   from `ethereumKey`, or empty when the key is missing or invalid.
/// - `hide_keys == true`, anything else: keys are empty.
///
/// App ids are dropped whenever keys are hidden.
#[must_use]
pub fn sanitize_wallet_info(record: &WalletKeyRecord, hide_keys: bool) -> WalletInfo {
    let (keys, app_ids) = if hide_keys {
        (hidden_keys(record), None)
    } else {
        (record.keys.clone(), Some(record.app_ids.clone()))
    };

    WalletInfo {
        wallet_type: record.wallet_type.clone(),
        id: record.id.clone(),
        archived: record.archived,
        deleted: record.deleted,
        sort_index: record.sort_index,
        keys,
        app_ids,
    }
}

/// Sanitizes a whole account, keyed by wallet id.
#[must_use]
pub fn sanitize_wallet_infos(records: &[WalletKeyRecord], hide_keys: bool) -> WalletInfos {
    records
        .iter()
        .map(|record| (record.id.clone(), sanitize_wallet_info(record, hide_keys)))
        .collect()
}

fn hidden_keys(record: &WalletKeyRecord) -> Map<String, Value> {
    let mut keys = Map::new();
    if record.wallet_type != ETHEREUM_WALLET_TYPE {
        return keys;
    }

    let address = record
        .keys
        .get(ETHEREUM_KEY_FIELD)
        .and_then(Value::as_str)
        .map(ethereum::private_key_to_address);
    match address {
        Some(Ok(address)) => {
            keys.insert(ETHEREUM_ADDRESS_FIELD.to_string(), Value::String(address));
        }
        Some(Err(e)) => log::warn!("wallet {}: unusable ethereum key hidden entirely: {e}", record.id),
        None => {}
    }
    keys
}

//! Ethereum key handling done frame-side.
//!
//! Private keys arrive as hex strings from the wallet engine's key records and
//! are decoded into zeroizing buffers; only addresses and signed transactions
//! leave this module.

use std::str::FromStr;

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, Bytes, TxKind, U256};
use zeroize::Zeroizing;

use crate::error::{LoginKitError, LoginKitResult};
use crate::protocol::EthereumTransaction;

/// Key record field holding the raw private key.
pub const ETHEREUM_KEY_FIELD: &str = "ethereumKey";

/// Key field exposed in place of the private key when keys are hidden.
pub const ETHEREUM_ADDRESS_FIELD: &str = "ethereumAddress";

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

fn signer_from_hex(private_key: &str) -> LoginKitResult<PrivateKeySigner> {
    let bytes = Zeroizing::new(
        hex::decode(strip_hex_prefix(private_key.trim()))
            .map_err(|_| LoginKitError::invalid_input(ETHEREUM_KEY_FIELD, "not hex"))?,
    );
    if bytes.len() != 32 {
        return Err(LoginKitError::invalid_input(
            ETHEREUM_KEY_FIELD,
            format!("expected 32 bytes, got {}", bytes.len()),
        ));
    }
    PrivateKeySigner::from_slice(&bytes)
        .map_err(|_| LoginKitError::invalid_input(ETHEREUM_KEY_FIELD, "not a valid secp256k1 scalar"))
}

/// Derives the EIP-55 checksummed address for a hex private key.
///
/// # Errors
/// [`LoginKitError::InvalidInput`] if the key is not 32 hex bytes or not a
/// valid secp256k1 scalar.
pub fn private_key_to_address(private_key: &str) -> LoginKitResult<String> {
    Ok(signer_from_hex(private_key)?.address().to_checksum(None))
}

fn parse_quantity<T: Default>(
    attribute: &str,
    value: Option<&str>,
    parse: fn(&str, u32) -> Result<T, String>,
) -> LoginKitResult<T> {
    let Some(value) = value else {
        return Ok(T::default());
    };
    let digits = strip_hex_prefix(value.trim());
    if digits.is_empty() {
        return Ok(T::default());
    }
    parse(digits, 16).map_err(|e| LoginKitError::invalid_input(attribute, e))
}

fn parse_u64(digits: &str, radix: u32) -> Result<u64, String> {
    u64::from_str_radix(digits, radix).map_err(|e| e.to_string())
}

fn parse_u128(digits: &str, radix: u32) -> Result<u128, String> {
    u128::from_str_radix(digits, radix).map_err(|e| e.to_string())
}

fn parse_u256(digits: &str, radix: u32) -> Result<U256, String> {
    U256::from_str_radix(digits, u64::from(radix)).map_err(|e| e.to_string())
}

/// Converts the wire transaction into an unsigned legacy transaction.
///
/// # Errors
/// [`LoginKitError::InvalidInput`] naming the first field that does not parse.
pub fn to_legacy(transaction: &EthereumTransaction) -> LoginKitResult<TxLegacy> {
    let to = match transaction.to.as_deref().map(str::trim) {
        None | Some("") => TxKind::Create,
        Some(to) => TxKind::Call(
            Address::from_str(to).map_err(|e| LoginKitError::invalid_input("to", e.to_string()))?,
        ),
    };
    let input = match transaction.data.as_deref() {
        None => Bytes::new(),
        Some(data) => Bytes::from(
            hex::decode(strip_hex_prefix(data.trim()))
                .map_err(|e| LoginKitError::invalid_input("data", e.to_string()))?,
        ),
    };

    Ok(TxLegacy {
        chain_id: transaction.chain_id,
        nonce: parse_quantity("nonce", transaction.nonce.as_deref(), parse_u64)?,
        gas_price: parse_quantity("gasPrice", transaction.gas_price.as_deref(), parse_u128)?,
        gas_limit: parse_quantity("gasLimit", transaction.gas_limit.as_deref(), parse_u64)?,
        to,
        value: parse_quantity("value", transaction.value.as_deref(), parse_u256)?,
        input,
    })
}

/// Signs `transaction` with a hex private key.
///
/// Returns the RLP-serialized signed transaction as `0x`-prefixed hex. With a
/// `chainId` the signature carries EIP-155 replay protection.
///
/// # Errors
/// [`LoginKitError::InvalidInput`] for an unusable key or transaction field,
/// [`LoginKitError::Signing`] if the signer fails.
pub fn sign_transaction(private_key: &str, transaction: &EthereumTransaction) -> LoginKitResult<String> {
    let signer = signer_from_hex(private_key)?;
    let mut tx = to_legacy(transaction)?;
    let signature = signer
        .sign_transaction_sync(&mut tx)
        .map_err(|e| LoginKitError::Signing {
            message: e.to_string(),
        })?;
    let envelope = TxEnvelope::from(tx.into_signed(signature));
    Ok(format!("0x{}", hex::encode(envelope.encoded_2718())))
}

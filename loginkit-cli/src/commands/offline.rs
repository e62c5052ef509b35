//! Commands that run without a frame session.

use std::path::PathBuf;

use clap::Args;
use loginkit_core::engine::WalletKeyRecord;
use loginkit_core::ethereum;
use loginkit_core::protocol::EthereumTransaction;
use loginkit_core::sanitize::sanitize_wallet_infos;

use crate::input::{print_json, read_json};

#[derive(Args)]
pub struct SanitizeArgs {
    /// Redact keys the way a `hideKeys` session does.
    #[arg(long)]
    pub hide_keys: bool,

    /// JSON array of wallet key records; stdin when omitted.
    pub input: Option<PathBuf>,
}

#[derive(Args)]
pub struct SignArgs {
    /// Hex private key of the sender.
    #[arg(long, env = "LOGINKIT_ETH_KEY", hide_env_values = true)]
    pub key: String,

    /// JSON transaction; stdin when omitted.
    pub input: Option<PathBuf>,
}

#[derive(Args)]
pub struct AddressArgs {
    /// Hex private key.
    #[arg(long, env = "LOGINKIT_ETH_KEY", hide_env_values = true)]
    pub key: String,
}

pub fn sanitize(args: &SanitizeArgs) -> eyre::Result<()> {
    let records: Vec<WalletKeyRecord> = read_json(args.input.as_deref())?;
    tracing::debug!(count = records.len(), hide_keys = args.hide_keys, "sanitizing records");
    print_json(&sanitize_wallet_infos(&records, args.hide_keys))
}

pub fn sign(args: &SignArgs) -> eyre::Result<()> {
    let transaction: EthereumTransaction = read_json(args.input.as_deref())?;
    let signed = ethereum::sign_transaction(&args.key, &transaction)?;
    println!("{signed}");
    Ok(())
}

pub fn address(args: &AddressArgs) -> eyre::Result<()> {
    println!("{}", ethereum::private_key_to_address(&args.key)?);
    Ok(())
}

//! Developer CLI for `LoginKit`.

mod commands;
mod input;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::demo::DemoArgs;
use commands::offline::{AddressArgs, SanitizeArgs, SignArgs};

#[derive(Parser)]
#[command(name = "loginkit", version, about = "Drive a LoginKit session from the terminal")]
struct Cli {
    /// API key handed to the wallet engine.
    #[arg(long, env = "LOGINKIT_API_KEY", default_value = "demo-api-key", global = true)]
    api_key: String,

    /// Application id handed to the wallet engine.
    #[arg(long, env = "LOGINKIT_APP_ID", default_value = "co.edge.loginkit-cli", global = true)]
    app_id: String,

    /// Emit JSON output only.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full host/frame session against the in-memory engine.
    Demo(DemoArgs),
    /// Run wallet key records through the key-hiding sanitizer.
    Sanitize(SanitizeArgs),
    /// Sign a legacy Ethereum transaction.
    Sign(SignArgs),
    /// Print the checksummed address for a private key.
    Address(AddressArgs),
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    // `log` records from loginkit-core are bridged into tracing by the fmt
    // subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,loginkit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Demo(args) => commands::demo::run(args, cli.api_key, cli.app_id, cli.json).await,
        Command::Sanitize(args) => commands::offline::sanitize(&args),
        Command::Sign(args) => commands::offline::sign(&args),
        Command::Address(args) => commands::offline::address(&args),
    }
}

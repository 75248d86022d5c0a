use std::path::PathBuf;

use alloy::eips::eip2930::AccessList;
use alloy::primitives::U256;
use clap::{Parser, Subcommand};

use eth_wallet::blockchain::transaction::{CheckLevel, TransactionBase};
use eth_wallet::blockchain::types::FeeLevel;
use eth_wallet::blockchain::wallet::private_key_from_env;
use eth_wallet::blockchain::Wallet;
use eth_wallet::config::validation::validate_config;
use eth_wallet::config::{load_config, ConfigError, WalletConfig};
use eth_wallet::observability::logging::init_logging;
use eth_wallet::rpc::{builder, parse_quantity};

#[derive(Parser)]
#[command(name = "eth-wallet")]
#[command(about = "Build, price, sign and submit EIP-1559 transactions", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured RPC endpoint.
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Override the configured chain id.
    #[arg(long, global = true)]
    chain_id: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an account, optionally from a BIP-39 phrase
    NewAccount {
        #[arg(long, default_value = "default")]
        name: String,
        #[arg(long)]
        seed: Option<String>,
    },
    /// Query the balance of an address
    Balance { address: String },
    /// Sign a message with the key in WALLET_PRIVATE_KEY
    SignMessage { message: String },
    /// Recover the signer of a message
    Recover { message: String, signature: String },
    /// Decode a signed transaction
    Decode { encoded: String },
    /// Build, price, sign and submit a transaction from WALLET_PRIVATE_KEY
    Transfer {
        /// Destination; omit for contract creation
        #[arg(long)]
        to: Option<String>,
        /// Amount in wei (decimal or 0x-hex)
        #[arg(long, default_value = "0")]
        value: String,
        /// Call data as hex
        #[arg(long)]
        data: Option<String>,
        #[arg(long, default_value = "medium")]
        fee_level: FeeLevel,
        /// Print the signed encoding without submitting
        #[arg(long)]
        dry_run: bool,
        /// Seconds to wait for a receipt after submitting
        #[arg(long)]
        wait: Option<u64>,
    },
    /// Drop a pending transaction (development nodes)
    Drop { hash: String },
}

fn resolve_config(cli: &Cli) -> Result<WalletConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WalletConfig::default(),
    };
    if let Some(url) = &cli.rpc_url {
        config.network.rpc_url = url.clone();
    }
    if let Some(chain_id) = cli.chain_id {
        config.network.chain_id = chain_id;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_logging(&config.observability.log_level);

    tracing::debug!(
        rpc_url = %config.network.rpc_url,
        chain_id = config.network.chain_id,
        "Configuration loaded"
    );

    let wallet = Wallet::from_config(config.network.clone())?;

    match cli.command {
        Commands::NewAccount { name, seed } => {
            let account = wallet.create_account(&name, seed.as_deref())?;
            println!("address:     {}", account.address());
            println!("private key: {}", account.private_key());
        }
        Commands::Balance { address } => {
            let request = builder::eth_get_balance(&address, "latest")?;
            let result = wallet.client().call(&request).await?;
            let balance = parse_quantity(&result).ok_or("node returned an invalid balance")?;
            println!("{}", balance);
        }
        Commands::SignMessage { message } => {
            let key = private_key_from_env()?;
            println!("{}", wallet.sign(message.as_bytes(), &key)?);
        }
        Commands::Recover { message, signature } => {
            println!("{}", wallet.ec_recover(message.as_bytes(), &signature)?);
        }
        Commands::Decode { encoded } => {
            let tx = TransactionBase::decode_hex(&encoded, CheckLevel::Everything)?;
            println!("{}", tx);
        }
        Commands::Transfer {
            to,
            value,
            data,
            fee_level,
            dry_run,
            wait,
        } => {
            let value: U256 = value.parse().map_err(|e| format!("invalid value '{}': {}", value, e))?;
            let key = private_key_from_env()?;
            let signer = eth_wallet::blockchain::crypto::parse_private_key(&key)?;
            let from = signer.address().to_checksum(None);

            let account = wallet.get_account(&from, "cli", &key, None).await?;
            let skeleton = wallet.build_transaction(
                &from,
                account.nonce(),
                to.as_deref(),
                data.as_deref(),
                value,
                AccessList::default(),
            )?;
            let mut tx = wallet.estimate_transaction(&skeleton, fee_level).await?;
            let signed = wallet.sign_transaction(&mut tx, &key)?;

            if dry_run {
                println!("{}", tx);
                println!("{}", signed);
                return Ok(());
            }

            let outcome = wallet.send_transaction(&signed).await?;
            println!("{}", outcome.result);

            if let (Some(secs), Some(hash)) = (wait, outcome.result.as_str()) {
                let status = wallet.wait_for_confirmation(hash, secs).await?;
                println!("{:?}", status);
            }
        }
        Commands::Drop { hash } => {
            let outcome = wallet.drop_transaction(&hash).await?;
            println!("{}", outcome.result);
        }
    }

    Ok(())
}

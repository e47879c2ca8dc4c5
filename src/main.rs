use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::read_keypair_file;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use url::Url;

use collateral_withdraw::bridge::{BridgeChannel, BridgeWallet, CallbackOutcome, QueueDispatcher};
use collateral_withdraw::eip712::{collateral_withdraw_digest, coordinator_withdraw_digest, TypedDigest, WithdrawMessage};
use collateral_withdraw::utils::config::{BridgeConfig, WithdrawalConfig};
use collateral_withdraw::utils::logging::{init_tracing, LogFormat};
use collateral_withdraw::wallet::{KeypairWallet, WalletSigner};
use collateral_withdraw::{BridgeResult, SignatureSubmission, WithdrawParams, WithdrawRequest, WithdrawalOrchestrator};

#[derive(Parser)]
#[command(name = "collateral-withdraw", version, about = "Collateral withdrawals through a deep-linked wallet")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the admin and coordinator digests for explicit inputs
    Digest {
        #[arg(long)]
        collateral: Pubkey,
        #[arg(long)]
        coordinator: Pubkey,
        #[arg(long)]
        sender: Pubkey,
        #[arg(long)]
        receiver: Pubkey,
        #[arg(long)]
        asset: Pubkey,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        expires_at: u64,
        #[arg(long, default_value_t = 0)]
        nonce: u32,
        /// Coordinator domain salt (32 bytes hex)
        #[arg(long, value_parser = parse_salt)]
        coordinator_salt: [u8; 32],
        /// Admin domain salt (32 bytes hex)
        #[arg(long, value_parser = parse_salt)]
        admin_salt: [u8; 32],
        /// Also derive the admin signature record under this program
        #[arg(long)]
        program_id: Option<Pubkey>,
    },
    /// Connect a wallet; callback URLs are read from stdin
    Connect,
    /// Run a withdrawal
    Withdraw {
        /// Asset mint address
        #[arg(long)]
        token: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        recipient: String,
        /// Backend chain id, defaults to WITHDRAW_CHAIN_ID
        #[arg(long)]
        chain_id: Option<u64>,
        /// Sign with a local keypair file instead of a bridged wallet
        #[arg(long)]
        keypair: Option<PathBuf>,
    },
}

fn parse_salt(value: &str) -> Result<[u8; 32], String> {
    let bytes = hex::decode(value.trim_start_matches("0x")).map_err(|e| e.to_string())?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("salt must be 32 bytes, got {}", b.len()))
}

fn digest_json(digest: &TypedDigest) -> serde_json::Value {
    json!({
        "domainHash": hex::encode(digest.domain_hash),
        "structHash": hex::encode(digest.struct_hash),
        "finalHash": hex::encode(digest.final_hash),
    })
}

/// Prints outbound wallet links and feeds pasted callback URLs to the channel
struct CallbackPump {
    printer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl CallbackPump {
    fn start(channel: Arc<BridgeChannel>, mut uris: UnboundedReceiver<Url>) -> Self {
        let printer = tokio::spawn(async move {
            while let Some(uri) = uris.recv().await {
                println!("Open in wallet:\n{}\nPaste the callback URL:", uri);
            }
        });

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match channel.handle_callback(line) {
                    Ok(CallbackOutcome::Delivered(_)) => {}
                    Ok(CallbackOutcome::Unclaimed(kind)) => {
                        eprintln!("No {} request is waiting for this callback", kind)
                    }
                    Err(e) => eprintln!("Callback rejected: {}", e),
                }
            }
        });

        Self { printer, reader }
    }

    /// Await `operation` unless stdin closes first
    async fn drive<T>(&mut self, operation: impl Future<Output = BridgeResult<T>>) -> Result<T> {
        tokio::select! {
            result = operation => Ok(result?),
            _ = &mut self.reader => bail!("Input closed before the wallet responded"),
        }
    }
}

impl Drop for CallbackPump {
    fn drop(&mut self) {
        self.printer.abort();
        self.reader.abort();
    }
}

fn open_bridge() -> Result<(Arc<BridgeChannel>, CallbackPump)> {
    let config = BridgeConfig::from_env()?;
    let (dispatcher, uris) = QueueDispatcher::new();
    let channel = Arc::new(BridgeChannel::new(config, Arc::new(dispatcher))?);
    let pump = CallbackPump::start(channel.clone(), uris);
    Ok((channel, pump))
}

#[allow(clippy::too_many_arguments)]
fn run_digest(
    collateral: Pubkey,
    coordinator: Pubkey,
    sender: Pubkey,
    receiver: Pubkey,
    asset: Pubkey,
    amount: u64,
    expires_at: u64,
    nonce: u32,
    coordinator_salt: [u8; 32],
    admin_salt: [u8; 32],
    program_id: Option<Pubkey>,
) -> Result<()> {
    let request = WithdrawRequest {
        amount_of_asset: amount,
        signature_expiration_time: expires_at,
        coordinator_signature_salt: coordinator_salt,
    };
    let message = WithdrawMessage::new(collateral, sender, receiver, asset, &request, nonce);

    let admin = collateral_withdraw_digest(&message, admin_salt)?;
    let coordinator_digest = coordinator_withdraw_digest(&message, coordinator, coordinator_salt)?;

    let mut output = json!({
        "collateral": digest_json(&admin),
        "coordinator": digest_json(&coordinator_digest),
    });
    if let Some(program_id) = program_id {
        let record = SignatureSubmission::compute_address(&program_id, &message)?;
        output["adminRecord"] = json!(record.to_string());
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_connect() -> Result<()> {
    let (channel, mut pump) = open_bridge()?;
    let wallet = pump.drive(BridgeWallet::connect(channel)).await?;
    println!("Connected wallet: {}", wallet.pubkey());
    Ok(())
}

async fn run_withdraw(
    token: String,
    amount: String,
    recipient: String,
    chain_id: Option<u64>,
    keypair: Option<PathBuf>,
) -> Result<()> {
    let config = WithdrawalConfig::from_env().context("Invalid withdrawal configuration")?;
    let params = WithdrawParams {
        token,
        amount,
        recipient_address: recipient,
        chain_id: chain_id.unwrap_or(config.backend_chain_id),
    };
    let orchestrator = WithdrawalOrchestrator::from_config(config)?;

    let report = match keypair {
        Some(path) => {
            let keypair = read_keypair_file(&path)
                .map_err(|e| anyhow!("Failed to read keypair {}: {}", path.display(), e))?;
            let wallet = KeypairWallet::new(keypair);
            orchestrator.withdraw(&wallet, &params).await?
        }
        None => {
            let (channel, mut pump) = open_bridge()?;
            let wallet = pump.drive(BridgeWallet::connect(channel)).await?;
            println!("Connected wallet: {}", wallet.pubkey());
            pump.drive(orchestrator.withdraw(&wallet, &params)).await?
        }
    };

    println!("Admin record: {}", report.admin_record);
    match report.registration {
        Some(signature) => println!("Admin signature registered: {}", signature),
        None => println!("Admin signature already on record"),
    }
    println!("Withdrawal confirmed: {}", report.signature);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(LogFormat::from_env());
    let cli = Cli::parse();

    match cli.command {
        Command::Digest {
            collateral,
            coordinator,
            sender,
            receiver,
            asset,
            amount,
            expires_at,
            nonce,
            coordinator_salt,
            admin_salt,
            program_id,
        } => run_digest(
            collateral,
            coordinator,
            sender,
            receiver,
            asset,
            amount,
            expires_at,
            nonce,
            coordinator_salt,
            admin_salt,
            program_id,
        ),
        Command::Connect => run_connect().await,
        Command::Withdraw {
            token,
            amount,
            recipient,
            chain_id,
            keypair,
        } => run_withdraw(token, amount, recipient, chain_id, keypair).await,
    }
}

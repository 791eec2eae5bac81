// Copyright (c) 2024 The Botho Foundation

//! NFT Bridge CLI
//!
//! Bridges ONFT tokens between EVM networks over LayerZero.

use clap::{Args as ClapArgs, Parser, Subcommand};
use lz_nft_bridge::{AutoApprove, BridgeExecutor, LocalWallet, SigningPrompt, TerminalPrompt};
use lz_nft_bridge_core::{BridgeConfig, ExecutionStatus, Network};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// NFT Bridge - move ONFT tokens between EVM networks
#[derive(Parser, Debug)]
#[command(name = "nft-bridge")]
#[command(about = "LayerZero ONFT bridge client")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "bridge.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List supported networks and their endpoint ids
    Networks,

    /// List bridgeable tokens
    Tokens {
        /// Only tokens listed on this network
        #[arg(long)]
        network: Option<Network>,
    },

    /// Quote the fee for a bridge without sending anything
    Quote(TransferArgs),

    /// Bridge a token
    Bridge {
        #[command(flatten)]
        transfer: TransferArgs,

        /// Sign without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(ClapArgs, Debug)]
struct TransferArgs {
    /// Token name from the catalog
    #[arg(long)]
    token: String,

    /// Source network
    #[arg(long)]
    from: Network,

    /// Destination network
    #[arg(long)]
    to: String,

    /// Token id to bridge
    #[arg(long)]
    token_id: String,

    /// Gas limit for lzReceive on the destination (0 lets the contract decide)
    #[arg(long)]
    gas_limit: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config_path = args.config.to_string_lossy();
    let config = if args.config.exists() {
        info!("Loading configuration from {}", config_path);
        BridgeConfig::from_file(&config_path)?
    } else {
        info!("Using default configuration");
        BridgeConfig::default()
    };

    match args.command {
        Command::Networks => {
            let registry = config.registry();
            for network in Network::ALL {
                match registry.resolve_endpoint(network) {
                    Ok(eid) => println!("{:<18} {}", network, eid),
                    Err(_) => println!("{:<18} unsupported", network),
                }
            }
        }
        Command::Tokens { network } => {
            let catalog = config.catalog()?;
            for token in catalog.tokens() {
                let listings = catalog.listings_for(token);
                if let Some(network) = network {
                    if !listings.iter().any(|listing| listing.network == network) {
                        continue;
                    }
                }
                println!("{}", token);
                for listing in listings {
                    println!("  {:<18} {}", listing.network, listing.address);
                }
            }
        }
        Command::Quote(transfer) => {
            let executor = prepare(&config, &transfer, Arc::new(AutoApprove)).await?;
            let (prepared, quote) = executor.preview().await?;
            println!("source contract: {}", prepared.route.source_contract);
            println!("destination eid: {}", prepared.route.dst_eid);
            println!("options:         {}", prepared.message.options);
            println!("native fee:      {} wei", quote.native_fee);
            println!("lz token fee:    {}", quote.lz_token_fee);
        }
        Command::Bridge { transfer, yes } => {
            let prompt: Arc<dyn SigningPrompt> = if yes {
                Arc::new(AutoApprove)
            } else {
                Arc::new(TerminalPrompt)
            };
            let executor = prepare(&config, &transfer, prompt).await?;

            let mut status_rx = executor.subscribe();
            let watcher = tokio::spawn(async move {
                while status_rx.changed().await.is_ok() {
                    let status = status_rx.borrow_and_update().clone();
                    if status != ExecutionStatus::Idle {
                        info!("Bridge status: {}", status);
                    }
                }
            });

            let result = executor.bridge().await;
            watcher.abort();

            for entry in executor.history() {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            }
            let execution = result?;
            info!("Bridge complete: {}", execution.status);
        }
    }

    Ok(())
}

/// Build an executor, fill in the transfer and connect the local wallet.
async fn prepare(
    config: &BridgeConfig,
    transfer: &TransferArgs,
    prompt: Arc<dyn SigningPrompt>,
) -> Result<BridgeExecutor, Box<dyn std::error::Error>> {
    let executor = BridgeExecutor::new(config)?;

    executor.select_source(transfer.from);
    executor.select_token(Some(transfer.token.as_str()));
    executor.select_destination_by_name(&transfer.to)?;
    executor.set_token_id(&transfer.token_id);
    if let Some(gas_limit) = &transfer.gas_limit {
        executor.set_gas_limit(gas_limit);
    }

    let wallet = LocalWallet::from_config(config, prompt)?;
    let account = executor.connect(Arc::new(wallet)).await?;
    info!("Bridging as {}", account);

    Ok(executor)
}

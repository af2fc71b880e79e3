use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use raffle_client::config::{
    DEFAULT_CONFIRMATIONS, DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_READ_RETRIES,
    DEFAULT_READ_RETRY_DELAY_MS, DEFAULT_RECEIPT_POLL_MS,
};
use raffle_client::notify::{ChannelNotifier, Notification, Severity};
use raffle_client::rpc::HttpRpc;
use raffle_client::view::{header, select_panel};
use raffle_client::wallet::{NodeWallet, WalletProvider};
use raffle_client::{
    Address, Amount, ChainId, ClientConfig, ContractTable, LifecycleController, Resolver,
    Synchronizer, ViewState, WalletContext,
};
use std::future::pending;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Builder;

mod utils;
use utils::*;

#[derive(Clone, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, env, default_value = "http://localhost:8545")]
    pub rpc_url: String,

    #[arg(short, long, env = "RAFFLE_ACCOUNT", value_parser = parse_address, help = "Node account to use; defaults to the first one")]
    pub account: Option<Address>,

    #[arg(long, env = "RAFFLE_CONTRACT_TABLE", help = "Contract table replacing the embedded one")]
    pub contract_table: Option<PathBuf>,

    #[arg(long, env = "RAFFLE_CONFIRMATIONS", default_value_t = DEFAULT_CONFIRMATIONS)]
    pub confirmations: u64,

    #[arg(long, env = "RAFFLE_CONFIRMATION_TIMEOUT_SECS", default_value_t = DEFAULT_CONFIRMATION_TIMEOUT_SECS)]
    pub confirmation_timeout_secs: u64,

    #[arg(long, env = "RAFFLE_RECEIPT_POLL_MS", default_value_t = DEFAULT_RECEIPT_POLL_MS)]
    pub receipt_poll_ms: u64,

    #[arg(long, env = "RAFFLE_READ_RETRIES", default_value_t = DEFAULT_READ_RETRIES)]
    pub read_retries: u32,

    #[arg(long, env = "RAFFLE_READ_RETRY_DELAY_MS", default_value_t = DEFAULT_READ_RETRY_DELAY_MS)]
    pub read_retry_delay_ms: u64,

    #[arg(long, env = "RAFFLE_REFRESH_SECS", help = "Periodic re-sync in watch mode, 0 disables")]
    pub refresh_secs: Option<u64>,

    #[arg(long, env = "RAFFLE_WALLET_POLL_MS", default_value_t = 2_000)]
    pub wallet_poll_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            confirmations: self.confirmations.max(1),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_ms),
            read_retries: self.read_retries,
            read_retry_delay: Duration::from_millis(self.read_retry_delay_ms),
            refresh_interval: self
                .refresh_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    pub fn load_table(&self) -> Result<ContractTable> {
        Ok(match &self.contract_table {
            Some(path) => ContractTable::from_path(path)?,
            None => ContractTable::embedded()?,
        })
    }
}

#[derive(clap::Subcommand, Clone)]
pub enum Commands {
    /// Print the raffle panel for the node's current account and chain
    Status {},
    /// Enter the raffle and wait for confirmation
    Enter {
        #[arg(long, value_parser = parse_ether, help = "Payment in ETH; defaults to the displayed entry fee")]
        value: Option<Amount>,
    },
    /// Follow account, network and raffle changes until Ctrl-C; type `enter` to enter
    Watch {},
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn print_view(ctx: &WalletContext, state: &ViewState, supported: &[ChainId], entering: bool) {
    println!("{}", header(ctx));
    println!("{}", select_panel(state, supported, entering).render(unix_now()));
}

fn print_notification(n: &Notification) {
    println!("[{}] {}: {}", n.severity, n.title, n.message);
}

fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(false)
        .try_init();

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let cli = Cli::parse();
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let table = Arc::new(cli.load_table()?);
    let supported = table.supported_chains();
    let config = cli.client_config();

    let rpc = HttpRpc::new(cli.rpc_url.clone())?;
    let wallet = NodeWallet::new(rpc.clone(), cli.account);
    let sync = Synchronizer::new(rpc, Resolver::new(table), config.clone());

    match cli.command {
        Commands::Status {} => {
            let ctx = wallet.connect().await?;
            sync.sync(&ctx).await;
            print_view(&ctx, &sync.view(), &supported, false);
        }
        Commands::Enter { value } => {
            info!("Enter...");

            let ctx = wallet.connect().await?;
            sync.sync(&ctx).await;

            let (notifier, mut notifications) = ChannelNotifier::new();
            let controller = LifecycleController::new(&sync, &wallet, &notifier, config);
            let entry = controller.enter_raffle(value);
            tokio::pin!(entry);
            let result = loop {
                tokio::select! {
                    result = &mut entry => break result,
                    Some(n) = notifications.recv() => {
                        print_notification(&n);
                        // Submitted: show the pending panel while confirmation runs.
                        if n.severity == Severity::Info {
                            let entering = controller.in_flight();
                            print_view(&wallet.context(), &sync.view(), &supported, entering);
                        }
                    }
                }
            };
            while let Ok(n) = notifications.try_recv() {
                print_notification(&n);
            }

            print_view(&wallet.context(), &sync.view(), &supported, controller.in_flight());
            let handle = result?;
            info!("Entry {} finished as {:?}", handle.tx_id, handle.status);
        }
        Commands::Watch {} => {
            info!("Watch...");

            if let Err(err) = wallet.connect().await {
                warn!("Node unreachable at {}: {}", cli.rpc_url, err);
            }

            let poll = Duration::from_millis(cli.wallet_poll_ms);
            let poll_wallet = async {
                loop {
                    tokio::time::sleep(poll).await;
                    if let Err(err) = wallet.refresh().await {
                        warn!("Wallet refresh failed: {}", err);
                        wallet.disconnect();
                    }
                }
            };

            let (notifier, mut notifications) = ChannelNotifier::new();
            let controller = LifecycleController::new(&sync, &wallet, &notifier, config);

            let mut views = sync.subscribe();
            let mut in_flight = controller.subscribe_in_flight();
            let render = async {
                loop {
                    tokio::select! {
                        changed = views.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        changed = in_flight.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        Some(n) = notifications.recv() => {
                            print_notification(&n);
                            continue;
                        }
                    }
                    let state = views.borrow_and_update().clone();
                    let entering = *in_flight.borrow_and_update();
                    print_view(&wallet.context(), &state, &supported, entering);
                }
            };

            let commands = async {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => match line.trim() {
                            "enter" | "e" => {
                                if let Err(err) = controller.enter_raffle(None).await {
                                    warn!("Entry failed: {}", err);
                                }
                            }
                            "" => {}
                            other => warn!("Unknown command '{}', expected 'enter'", other),
                        },
                        Ok(None) => break,
                        Err(err) => {
                            warn!("Reading commands failed: {}", err);
                            break;
                        }
                    }
                }
                // No more commands; keep following the chain.
                pending::<()>().await
            };

            tokio::select! {
                _ = sync.run(&wallet) => {}
                _ = poll_wallet => {}
                _ = render => {}
                _ = commands => {}
                _ = tokio::signal::ctrl_c() => info!("Shutting down"),
            }
        }
    }

    Ok(())
}

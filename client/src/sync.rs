//! Keeps the displayed raffle state consistent with the chain.
//!
//! Every trigger (wallet change, periodic refresh, confirmed entry) runs one sync
//! cycle. A cycle captures a generation number when it starts and only publishes if
//! no newer cycle has started since, so a slow read can never overwrite the result
//! of a later account or network switch. Results are published as a whole
//! [`ViewState`] through a `watch` channel; readers never see a half-updated view.

use std::future::pending;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::config::ClientConfig;
use crate::contract::RaffleReader;
use crate::error::ReadError;
use crate::resolver::{Resolution, ResolvedContract, Resolver};
use crate::rpc::ChainRpc;
use crate::types::{Address, ChainId, RaffleSnapshot, WalletContext};
use crate::wallet::WalletProvider;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadyView {
    pub account: Address,
    pub contract: ResolvedContract,
    /// Only ever produced for `account` on `contract`.
    pub snapshot: Option<Arc<RaffleSnapshot>>,
    pub loading: bool,
    /// Last failed cycle, cleared by the next successful one.
    pub read_error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewState {
    Disconnected,
    NetworkUnsupported { chain_id: ChainId },
    Ready(ReadyView),
}

impl ViewState {
    pub fn snapshot(&self) -> Option<Arc<RaffleSnapshot>> {
        match self {
            ViewState::Ready(view) => view.snapshot.clone(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum SyncOutcome {
    Disconnected,
    Unsupported(ChainId),
    Published,
    ReadFailed(ReadError),
    /// A newer cycle started before this one finished; its result was dropped.
    Superseded,
}

pub struct Synchronizer<R: ChainRpc> {
    rpc: R,
    resolver: Resolver,
    config: ClientConfig,
    generation: AtomicU64,
    last_context: Mutex<WalletContext>,
    state: watch::Sender<ViewState>,
}

impl<R: ChainRpc> Synchronizer<R> {
    pub fn new(rpc: R, resolver: Resolver, config: ClientConfig) -> Self {
        let (state, _) = watch::channel(ViewState::Disconnected);
        Self {
            rpc,
            resolver,
            config,
            generation: AtomicU64::new(0),
            last_context: Mutex::new(WalletContext::disconnected()),
            state,
        }
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn view(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Number of cycles started so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Runs one cycle for `ctx`.
    pub async fn sync(&self, ctx: &WalletContext) -> SyncOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_context.lock().unwrap_or_else(|e| e.into_inner()) = ctx.clone();

        let (account, contract) = match self.resolver.resolve_context(ctx) {
            Resolution::Disconnected => {
                self.state.send_replace(ViewState::Disconnected);
                return SyncOutcome::Disconnected;
            }
            Resolution::Unsupported(chain_id) => {
                info!("Chain {} has no raffle deployment", chain_id);
                self.state
                    .send_replace(ViewState::NetworkUnsupported { chain_id });
                return SyncOutcome::Unsupported(chain_id);
            }
            Resolution::Resolved { account, contract } => (account, contract),
        };

        self.state.send_modify(|state| match state {
            ViewState::Ready(view) if view.account == account && view.contract == contract => {
                view.loading = true;
            }
            _ => {
                *state = ViewState::Ready(ReadyView {
                    account,
                    contract: contract.clone(),
                    snapshot: None,
                    loading: true,
                    read_error: None,
                })
            }
        });

        let result = self.read_with_retry(&contract, generation).await;

        let mut published = false;
        let outcome = match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.state.send_if_modified(|state| {
                    if !self.is_current(generation) {
                        return false;
                    }
                    if let ViewState::Ready(view) = state {
                        view.snapshot = Some(snapshot.clone());
                        view.loading = false;
                        view.read_error = None;
                        published = true;
                    }
                    published
                });
                SyncOutcome::Published
            }
            Err(err) => {
                self.state.send_if_modified(|state| {
                    if !self.is_current(generation) {
                        return false;
                    }
                    // Previous snapshot stays on screen.
                    if let ViewState::Ready(view) = state {
                        view.loading = false;
                        view.read_error = Some(err.to_string());
                        published = true;
                    }
                    published
                });
                if published {
                    warn!("Raffle read failed, keeping previous snapshot: {}", err);
                }
                SyncOutcome::ReadFailed(err)
            }
        };

        if !published {
            debug!("Sync cycle {} superseded, dropping result", generation);
            return SyncOutcome::Superseded;
        }
        if let SyncOutcome::Published = outcome {
            info!(
                "Raffle state synced for {} on chain {} (cycle {})",
                account, contract.chain_id, generation
            );
        }
        outcome
    }

    /// Re-runs a cycle against the most recent wallet context.
    pub async fn refresh(&self) -> SyncOutcome {
        let ctx = self
            .last_context
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        self.sync(&ctx).await
    }

    async fn read_with_retry(
        &self,
        contract: &ResolvedContract,
        generation: u64,
    ) -> Result<RaffleSnapshot, ReadError> {
        let reader = RaffleReader::new(&self.rpc, Some(contract))?;
        let mut attempt = 0u32;
        loop {
            match reader.snapshot().await {
                Ok(snapshot) => return Ok(snapshot),
                Err(err) if attempt < self.config.read_retries && self.is_current(generation) => {
                    attempt += 1;
                    warn!(
                        "Raffle read failed ({}), retry {}/{} in {:?}",
                        err, attempt, self.config.read_retries, self.config.read_retry_delay
                    );
                    sleep(self.config.read_retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Syncs on every wallet change (and on the refresh interval, if configured)
    /// until the wallet's channel closes. A change that arrives mid-cycle cancels
    /// that cycle.
    pub async fn run<W: WalletProvider>(&self, wallet: &W) {
        let mut rx = wallet.subscribe();
        loop {
            let ctx = rx.borrow_and_update().clone();
            tokio::select! {
                _ = self.sync(&ctx) => {}
                changed = rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    debug!("Wallet context changed mid-sync, restarting cycle");
                    continue;
                }
            }

            let refresh = async {
                match self.config.refresh_interval {
                    Some(every) => sleep(every).await,
                    None => pending::<()>().await,
                }
            };
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = refresh => {}
            }
        }
    }
}

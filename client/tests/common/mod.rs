#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::Selector;
use raffle_client::abi;
use raffle_client::config::{ClientConfig, ContractTable};
use raffle_client::notify::{Notification, NotificationSink, Severity};
use raffle_client::resolver::Resolver;
use raffle_client::rpc::{ChainRpc, TransactionRequest, TxReceipt};
use raffle_client::sync::{Synchronizer, ViewState};
use raffle_client::wallet::WalletProvider;
use raffle_client::{Address, Amount, RpcError, TxHash, WalletContext};
use tokio::sync::{watch, RwLock, RwLockWriteGuard};

pub const LOCAL_CHAIN: u64 = 31337;
pub const ONE_HUNDREDTH: u128 = 10_000_000_000_000_000;

pub fn alice() -> Address {
    "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
}

pub fn bob() -> Address {
    "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap()
}

pub fn table() -> Arc<ContractTable> {
    Arc::new(ContractTable::embedded().unwrap())
}

pub fn raffle_address() -> Address {
    table().address(LOCAL_CHAIN).unwrap()
}

/// Mutable on-chain raffle plus knobs for failure injection.
pub struct ChainState {
    pub entry_fee: u128,
    pub player_count: u64,
    pub balance: u128,
    pub recent_winner: Option<Address>,
    pub interval: u64,
    pub last_timestamp: u64,
    pub block_number: u64,
    /// Method names whose `eth_call` fails.
    pub failing: HashSet<&'static str>,
    /// Every send is answered with this rpc error instead of a hash.
    pub send_error: Option<(i64, String)>,
    pub mine_on_send: bool,
    pub revert_on_mine: bool,
    pub receipts: HashMap<TxHash, TxReceipt>,
    pub sent: Vec<TransactionRequest>,
    pub calls: Vec<&'static str>,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            entry_fee: ONE_HUNDREDTH,
            player_count: 5,
            balance: 5 * ONE_HUNDREDTH,
            recent_winner: None,
            interval: 30,
            last_timestamp: 1_700_000_000,
            block_number: 100,
            failing: HashSet::new(),
            send_error: None,
            mine_on_send: true,
            revert_on_mine: false,
            receipts: HashMap::new(),
            sent: Vec::new(),
            calls: Vec::new(),
        }
    }
}

/// In-memory chain that is both the rpc endpoint and the wallet.
pub struct FakeChain {
    pub state: Mutex<ChainState>,
    context: watch::Sender<WalletContext>,
    read_gate: RwLock<()>,
}

impl FakeChain {
    pub fn new(ctx: WalletContext) -> Arc<Self> {
        let (context, _) = watch::channel(ctx);
        Arc::new(Self {
            state: Mutex::new(ChainState::default()),
            context,
            read_gate: RwLock::new(()),
        })
    }

    pub fn connected() -> Arc<Self> {
        Self::new(WalletContext::connected(alice(), LOCAL_CHAIN))
    }

    pub fn set_context(&self, ctx: WalletContext) {
        self.context.send_replace(ctx);
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut ChainState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    /// Blocks every read until the returned guard is dropped.
    pub async fn hold_reads(&self) -> RwLockWriteGuard<'_, ()> {
        self.read_gate.write().await
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.with_state(|s| s.calls.iter().filter(|m| **m == method).count())
    }

    fn method_for(data: &[u8]) -> Option<&'static str> {
        abi::function_name(Selector::from_slice(data.get(..4)?))
    }
}

impl ChainRpc for FakeChain {
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        drop(self.read_gate.read().await);

        let method = Self::method_for(&data)
            .ok_or_else(|| RpcError::InvalidResponse("unknown selector".into()))?;
        let mut state = self.state.lock().unwrap();
        state.calls.push(method);
        if to != raffle_address() {
            return Ok(Vec::new());
        }
        if state.failing.contains(method) {
            return Err(RpcError::Rpc {
                code: -32000,
                message: format!("{method} unavailable"),
            });
        }
        let word = |value: u128| Amount::from(value).to_be_bytes::<32>().to_vec();
        Ok(match method {
            "getEntryFee" => word(state.entry_fee),
            "getPlayerCount" => word(state.player_count as u128),
            "getRecentWinner" => {
                let winner = state.recent_winner.unwrap_or(Address::ZERO);
                winner.into_word().to_vec()
            }
            "getInterval" => word(state.interval as u128),
            _ => word(state.last_timestamp as u128),
        })
    }

    async fn balance(&self, address: Address) -> Result<Amount, RpcError> {
        drop(self.read_gate.read().await);
        let state = self.state.lock().unwrap();
        if state.failing.contains("getBalance") {
            return Err(RpcError::InvalidResponse("balance unavailable".into()));
        }
        Ok(if address == raffle_address() {
            Amount::from(state.balance)
        } else {
            Amount::ZERO
        })
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        let mut state = self.state.lock().unwrap();
        // The chain keeps producing blocks between polls.
        state.block_number += 1;
        Ok(state.block_number)
    }

    async fn transaction_receipt(&self, tx: TxHash) -> Result<Option<TxReceipt>, RpcError> {
        Ok(self.state.lock().unwrap().receipts.get(&tx).copied())
    }
}

impl WalletProvider for FakeChain {
    fn context(&self) -> WalletContext {
        self.context.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<WalletContext> {
        self.context.subscribe()
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
        Ok(self.context.borrow().account.into_iter().collect())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, RpcError> {
        let mut state = self.state.lock().unwrap();
        if let Some((code, message)) = state.send_error.clone() {
            return Err(RpcError::Rpc { code, message });
        }
        if tx.value < Amount::from(state.entry_fee) {
            return Err(RpcError::Rpc {
                code: 3,
                message: "execution reverted: Raffle__NotEnoughETHEntered".into(),
            });
        }

        let tx_hash = TxHash::left_padding_from(&(state.sent.len() as u64 + 1).to_be_bytes());
        state.sent.push(tx.clone());

        if state.mine_on_send {
            state.block_number += 1;
            let success = !state.revert_on_mine;
            if success {
                state.player_count += 1;
                state.balance += tx.value.to::<u128>();
            }
            let receipt = TxReceipt {
                tx_hash,
                block_number: state.block_number,
                success,
            };
            state.receipts.insert(tx_hash, receipt);
        }
        Ok(tx_hash)
    }
}

/// Keeps every notification for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn count(&self, severity: Severity) -> usize {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.received.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.received.lock().unwrap().push(notification);
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        confirmations: 1,
        confirmation_timeout: Duration::from_secs(5),
        receipt_poll_interval: Duration::from_millis(100),
        read_retries: 0,
        read_retry_delay: Duration::from_millis(10),
        refresh_interval: None,
    }
}

pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

pub fn synchronizer(chain: &Arc<FakeChain>, config: ClientConfig) -> Synchronizer<Arc<FakeChain>> {
    init_logger();
    Synchronizer::new(chain.clone(), Resolver::new(table()), config)
}

/// Waits (bounded) until the published view satisfies `pred`.
pub async fn wait_for_view(
    rx: &mut watch::Receiver<ViewState>,
    pred: impl FnMut(&ViewState) -> bool,
) -> ViewState {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("view did not reach expected state")
        .expect("synchronizer dropped")
        .clone()
}

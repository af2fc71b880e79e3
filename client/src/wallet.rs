//! Wallet provider seam and a node-managed-account implementation

use std::future::Future;

use log::{info, warn};
use tokio::sync::watch;

use crate::error::RpcError;
use crate::rpc::{HttpRpc, TransactionRequest};
use crate::types::{Address, TxHash, WalletContext};

/// Everything the synchronizer and the write façade need from a wallet.
pub trait WalletProvider: Send + Sync {
    fn context(&self) -> WalletContext;

    /// Receives every context change the wallet publishes.
    fn subscribe(&self) -> watch::Receiver<WalletContext>;

    fn request_accounts(&self) -> impl Future<Output = Result<Vec<Address>, RpcError>> + Send;

    /// Signs and broadcasts; resolves once the node accepted the transaction.
    fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<TxHash, RpcError>> + Send;
}

/// Uses accounts unlocked on the node itself (anvil, hardhat, geth --dev).
pub struct NodeWallet {
    rpc: HttpRpc,
    preferred: Option<Address>,
    context: watch::Sender<WalletContext>,
}

impl NodeWallet {
    pub fn new(rpc: HttpRpc, preferred: Option<Address>) -> Self {
        let (context, _) = watch::channel(WalletContext::disconnected());
        Self {
            rpc,
            preferred,
            context,
        }
    }

    pub async fn connect(&self) -> Result<WalletContext, RpcError> {
        let ctx = self.read_context().await?;
        match ctx.account {
            Some(account) => info!(
                "Connected with {} on {}",
                account,
                ctx.chain_id.unwrap_or_default()
            ),
            None => warn!("Node at {} exposes no usable account", self.rpc.url()),
        }
        self.publish(ctx.clone());
        Ok(ctx)
    }

    /// Re-reads accounts and chain id; subscribers only wake on a change.
    pub async fn refresh(&self) -> Result<bool, RpcError> {
        let ctx = self.read_context().await?;
        Ok(self.publish(ctx))
    }

    pub fn disconnect(&self) {
        self.publish(WalletContext::disconnected());
    }

    fn publish(&self, ctx: WalletContext) -> bool {
        self.context.send_if_modified(|current| {
            if *current == ctx {
                return false;
            }
            *current = ctx;
            true
        })
    }

    async fn read_context(&self) -> Result<WalletContext, RpcError> {
        let accounts = self.rpc.accounts().await?;
        let chain_id = self.rpc.chain_id().await?;
        let account = match self.preferred {
            Some(preferred) => accounts.iter().copied().find(|a| *a == preferred),
            None => accounts.first().copied(),
        };
        Ok(match account {
            Some(account) => WalletContext::connected(account, chain_id),
            None => WalletContext {
                account: None,
                chain_id: Some(chain_id),
                connected: false,
            },
        })
    }
}

impl WalletProvider for NodeWallet {
    fn context(&self) -> WalletContext {
        self.context.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<WalletContext> {
        self.context.subscribe()
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.rpc.accounts().await
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, RpcError> {
        self.rpc.send_transaction(&tx).await
    }
}

use std::sync::{Arc, Mutex};

use crate::config::ContractTable;
use crate::types::{Address, ChainId, WalletContext};

/// The deployment selected for one network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedContract {
    pub chain_id: ChainId,
    pub address: Address,
}

/// Outcome of resolving a wallet context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Disconnected,
    Unsupported(ChainId),
    Resolved {
        account: Address,
        contract: ResolvedContract,
    },
}

/// Maps chain ids to deployments. Remembers the last lookup only.
pub struct Resolver {
    table: Arc<ContractTable>,
    last: Mutex<Option<(ChainId, Option<ResolvedContract>)>>,
}

impl Resolver {
    pub fn new(table: Arc<ContractTable>) -> Self {
        Self {
            table,
            last: Mutex::new(None),
        }
    }

    pub fn table(&self) -> &ContractTable {
        &self.table
    }

    pub fn resolve(&self, chain_id: ChainId) -> Option<ResolvedContract> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((cached_id, cached)) = last.as_ref() {
            if *cached_id == chain_id {
                return cached.clone();
            }
        }

        let resolved = self
            .table
            .address(chain_id)
            .map(|address| ResolvedContract { chain_id, address });
        *last = Some((chain_id, resolved.clone()));
        resolved
    }

    pub fn resolve_context(&self, ctx: &WalletContext) -> Resolution {
        let (account, chain_id) = match (ctx.connected, ctx.account, ctx.chain_id) {
            (true, Some(account), Some(chain_id)) => (account, chain_id),
            _ => return Resolution::Disconnected,
        };

        match self.resolve(chain_id) {
            Some(contract) => Resolution::Resolved { account, contract },
            None => Resolution::Unsupported(chain_id),
        }
    }
}

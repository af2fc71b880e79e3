use alloy_sol_types::SolCall;
use log::debug;

use crate::abi::{self, IRaffle};
use crate::error::ReadError;
use crate::resolver::ResolvedContract;
use crate::rpc::ChainRpc;
use crate::types::{Address, Amount, RaffleSnapshot};

/// Read-only view of one resolved raffle deployment.
pub struct RaffleReader<'a, R: ChainRpc> {
    rpc: &'a R,
    contract: &'a ResolvedContract,
}

impl<'a, R: ChainRpc> RaffleReader<'a, R> {
    pub fn new(rpc: &'a R, contract: Option<&'a ResolvedContract>) -> Result<Self, ReadError> {
        let contract = contract.ok_or(ReadError::Unresolved)?;
        Ok(Self { rpc, contract })
    }

    async fn call<C: SolCall>(
        &self,
        method: &'static str,
        call: C,
    ) -> Result<C::Return, ReadError> {
        debug!("{} -> {}", method, self.contract.address);
        let data = self
            .rpc
            .call(self.contract.address, call.abi_encode())
            .await
            .map_err(|source| ReadError::Call { method, source })?;
        C::abi_decode_returns(&data, true).map_err(|e| ReadError::Decode {
            method,
            reason: e.to_string(),
        })
    }

    pub async fn entry_fee(&self) -> Result<Amount, ReadError> {
        Ok(self
            .call("getEntryFee", IRaffle::getEntryFeeCall {})
            .await?
            ._0)
    }

    pub async fn player_count(&self) -> Result<u64, ReadError> {
        const METHOD: &str = "getPlayerCount";
        let count = self.call(METHOD, IRaffle::getPlayerCountCall {}).await?._0;
        abi::to_u64(count).map_err(|reason| ReadError::Decode {
            method: METHOD,
            reason,
        })
    }

    /// `None` until the first draw has picked a winner.
    pub async fn recent_winner(&self) -> Result<Option<Address>, ReadError> {
        let winner = self
            .call("getRecentWinner", IRaffle::getRecentWinnerCall {})
            .await?
            ._0;
        Ok(abi::winner(winner))
    }

    pub async fn interval(&self) -> Result<u64, ReadError> {
        const METHOD: &str = "getInterval";
        let interval = self.call(METHOD, IRaffle::getIntervalCall {}).await?._0;
        abi::to_u64(interval).map_err(|reason| ReadError::Decode {
            method: METHOD,
            reason,
        })
    }

    pub async fn last_draw_timestamp(&self) -> Result<u64, ReadError> {
        const METHOD: &str = "getLastTimeStamp";
        let timestamp = self.call(METHOD, IRaffle::getLastTimeStampCall {}).await?._0;
        abi::to_u64(timestamp).map_err(|reason| ReadError::Decode {
            method: METHOD,
            reason,
        })
    }

    /// Native balance held by the contract, i.e. the prize pool.
    pub async fn contract_balance(&self) -> Result<Amount, ReadError> {
        self.rpc
            .balance(self.contract.address)
            .await
            .map_err(|source| ReadError::Call {
                method: "getBalance",
                source,
            })
    }

    /// Issues all six reads concurrently; any failure fails the whole snapshot.
    pub async fn snapshot(&self) -> Result<RaffleSnapshot, ReadError> {
        let (entry_fee, player_count, contract_balance, recent_winner, interval, last_draw_timestamp) =
            tokio::try_join!(
                self.entry_fee(),
                self.player_count(),
                self.contract_balance(),
                self.recent_winner(),
                self.interval(),
                self.last_draw_timestamp(),
            )?;

        Ok(RaffleSnapshot {
            entry_fee,
            player_count,
            contract_balance,
            recent_winner,
            interval,
            last_draw_timestamp,
        })
    }
}

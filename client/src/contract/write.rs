use alloy_sol_types::SolCall;
use log::info;

use crate::abi::IRaffle;
use crate::error::WriteError;
use crate::resolver::ResolvedContract;
use crate::rpc::TransactionRequest;
use crate::types::{Address, Amount, TransactionHandle, WalletContext};
use crate::wallet::WalletProvider;

/// Signs raffle transactions from an account the caller has already checked.
pub struct TxSender<'a, W: WalletProvider> {
    pub wallet: &'a W,
    pub contract: &'a ResolvedContract,
    pub from: Address,
}

impl<'a, W: WalletProvider> TxSender<'a, W> {
    /// Fails when `ctx` has no connected account or no deployment is resolved.
    pub fn new(
        wallet: &'a W,
        ctx: &WalletContext,
        contract: Option<&'a ResolvedContract>,
    ) -> Result<Self, WriteError> {
        let from = match (ctx.connected, ctx.account) {
            (true, Some(account)) => account,
            _ => return Err(WriteError::NotConnected),
        };
        let contract = contract.ok_or(WriteError::Unresolved)?;
        Ok(Self {
            wallet,
            contract,
            from,
        })
    }

    pub async fn send(&self, data: Vec<u8>, value: Amount) -> Result<TransactionHandle, WriteError> {
        let tx = TransactionRequest {
            from: self.from,
            to: self.contract.address,
            value,
            data,
        };
        let tx_id = self.wallet.send_transaction(tx).await?;
        Ok(TransactionHandle::submitted(tx_id))
    }
}

/// Pays `payment` into the raffle. Underpayment is left for the contract to reject.
///
/// Every call submits an independent entry.
pub async fn send_enter_raffle<W: WalletProvider>(
    tx_sender: &TxSender<'_, W>,
    payment: Amount,
) -> Result<TransactionHandle, WriteError> {
    let data = IRaffle::enterRaffleCall {}.abi_encode();
    let handle = tx_sender.send(data, payment).await?;
    info!(
        "enterRaffle broadcast: tx={} from={} value={}",
        handle.tx_id,
        tx_sender.from, payment
    );
    Ok(handle)
}

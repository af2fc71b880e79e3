//! Drives a raffle entry from broadcast to confirmation, then hands control back
//! to the synchronizer.

use std::sync::Mutex;

use log::{info, warn};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use crate::config::ClientConfig;
use crate::contract::{send_enter_raffle, TxSender};
use crate::error::{LifecycleError, WriteError};
use crate::notify::{Notification, NotificationSink, Severity};
use crate::resolver::Resolution;
use crate::rpc::{ChainRpc, TxReceipt};
use crate::sync::{Synchronizer, ViewState};
use crate::types::{Amount, TransactionHandle, TxHash, TxStatus};
use crate::wallet::WalletProvider;

pub const ENTERED_MESSAGE: &str = "You have entered the raffle";

/// Polls for the receipt until it is `confirmations` blocks deep or `confirmation_timeout`
/// elapses. Transient RPC failures while polling are logged and retried.
pub async fn wait_for_confirmation<R: ChainRpc>(
    rpc: &R,
    tx: TxHash,
    config: &ClientConfig,
) -> Result<TxReceipt, LifecycleError> {
    let confirmations = config.confirmations.max(1);
    let poll = async {
        loop {
            match rpc.transaction_receipt(tx).await {
                Ok(Some(receipt)) if !receipt.success => {
                    return Err(LifecycleError::Reverted { tx });
                }
                Ok(Some(receipt)) if confirmations == 1 => return Ok(receipt),
                Ok(Some(receipt)) => match rpc.block_number().await {
                    Ok(head) if head.saturating_sub(receipt.block_number) + 1 >= confirmations => {
                        return Ok(receipt);
                    }
                    Ok(_) => {}
                    Err(err) => warn!("Block number poll failed: {}", err),
                },
                Ok(None) => {}
                Err(err) => warn!("Receipt poll for {} failed: {}", tx, err),
            }
            sleep(config.receipt_poll_interval).await;
        }
    };

    match timeout(config.confirmation_timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(LifecycleError::ConfirmationTimeout {
            tx,
            waited: config.confirmation_timeout,
        }),
    }
}

/// Ends the entry attempt however it ends: forgets the handle, releases the flag.
struct InFlightGuard<'a> {
    in_flight: &'a watch::Sender<bool>,
    current: &'a Mutex<Option<TransactionHandle>>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.in_flight.send_replace(false);
    }
}

pub struct LifecycleController<'a, R: ChainRpc, W: WalletProvider, N: NotificationSink> {
    sync: &'a Synchronizer<R>,
    wallet: &'a W,
    notifier: &'a N,
    config: ClientConfig,
    in_flight: watch::Sender<bool>,
    current: Mutex<Option<TransactionHandle>>,
}

impl<'a, R: ChainRpc, W: WalletProvider, N: NotificationSink> LifecycleController<'a, R, W, N> {
    pub fn new(
        sync: &'a Synchronizer<R>,
        wallet: &'a W,
        notifier: &'a N,
        config: ClientConfig,
    ) -> Self {
        let (in_flight, _) = watch::channel(false);
        Self {
            sync,
            wallet,
            notifier,
            config,
            in_flight,
            current: Mutex::new(None),
        }
    }

    pub fn in_flight(&self) -> bool {
        *self.in_flight.borrow()
    }

    /// The view disables the enter action while this reads `true`.
    pub fn subscribe_in_flight(&self) -> watch::Receiver<bool> {
        self.in_flight.subscribe()
    }

    fn acquire(&self) -> Option<InFlightGuard<'_>> {
        let acquired = self.in_flight.send_if_modified(|busy| {
            if *busy {
                return false;
            }
            *busy = true;
            true
        });
        acquired.then(|| InFlightGuard {
            in_flight: &self.in_flight,
            current: &self.current,
        })
    }

    /// The entry being tracked, if any. Discarded once the follow-up sync completes.
    pub fn current_transaction(&self) -> Option<TransactionHandle> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn track(&self, handle: TransactionHandle) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    fn report(&self, err: LifecycleError) -> LifecycleError {
        // The entry may still land after the wait gives up.
        let severity = match err {
            LifecycleError::ConfirmationTimeout { .. } => Severity::Warning,
            _ => Severity::Error,
        };
        self.notifier.notify(Notification::tx(err.to_string(), severity));
        err
    }

    /// Enters the raffle, paying `payment` or, if `None`, the displayed entry fee.
    ///
    /// Returns the handle once confirmed and the synchronizer has refreshed.
    pub async fn enter_raffle(
        &self,
        payment: Option<Amount>,
    ) -> Result<TransactionHandle, LifecycleError> {
        let Some(_guard) = self.acquire() else {
            return Err(LifecycleError::Busy);
        };

        let (view, payment) = match self.sync.view() {
            ViewState::Ready(view) => {
                let fee = view.snapshot.as_ref().map(|s| s.entry_fee);
                match payment.or(fee) {
                    Some(payment) => (view, payment),
                    None => return Err(self.report(WriteError::UnknownEntryFee.into())),
                }
            }
            ViewState::NetworkUnsupported { .. } => {
                return Err(self.report(WriteError::Unresolved.into()))
            }
            ViewState::Disconnected => return Err(self.report(WriteError::NotConnected.into())),
        };

        // The fee and contract come from the last sync; the signer must still match it.
        let ctx = self.wallet.context();
        match self.sync.resolver().resolve_context(&ctx) {
            Resolution::Resolved { account, contract }
                if account == view.account && contract == view.contract => {}
            Resolution::Disconnected => return Err(self.report(WriteError::NotConnected.into())),
            Resolution::Unsupported(_) => return Err(self.report(WriteError::Unresolved.into())),
            Resolution::Resolved { .. } => {
                warn!(
                    "Wallet moved away from {} on chain {}, refusing to enter",
                    view.account, view.contract.chain_id
                );
                return Err(self.report(WriteError::StaleView.into()));
            }
        }

        let tx_sender = TxSender::new(self.wallet, &ctx, Some(&view.contract))
            .map_err(|e| self.report(e.into()))?;
        let mut handle = send_enter_raffle(&tx_sender, payment)
            .await
            .map_err(|e| self.report(e.into()))?;

        self.track(handle);
        self.notifier.notify(Notification::tx(
            format!("Transaction submitted: {}", handle.tx_id),
            Severity::Info,
        ));

        match wait_for_confirmation(self.sync.rpc(), handle.tx_id, &self.config).await {
            Ok(receipt) => {
                handle.status = TxStatus::Confirmed;
                self.track(handle);
                info!(
                    "Entry {} confirmed in block {}",
                    receipt.tx_hash, receipt.block_number
                );
                self.notifier
                    .notify(Notification::tx(ENTERED_MESSAGE, Severity::Success));
                self.sync.refresh().await;
                Ok(handle)
            }
            Err(err) => {
                if let LifecycleError::Reverted { .. } = err {
                    handle.status = TxStatus::Failed;
                    self.track(handle);
                }
                warn!("Entry {} did not confirm: {}", handle.tx_id, err);
                Err(self.report(err))
            }
        }
    }
}

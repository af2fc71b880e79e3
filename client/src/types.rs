//! Core value types shared by the resolver, façades and synchronizer

pub use alloy_primitives::Address;

/// Numeric chain identifier (EIP-155).
pub type ChainId = u64;

/// Native-currency amount in wei.
pub type Amount = alloy_primitives::U256;

/// 32-byte transaction hash.
pub type TxHash = alloy_primitives::B256;

/// Every displayed raffle field, read together in one sync cycle.
///
/// A snapshot is never patched in place: the synchronizer swaps the whole value
/// when a cycle succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaffleSnapshot {
    pub entry_fee: Amount,
    pub player_count: u64,
    pub contract_balance: Amount,
    pub recent_winner: Option<Address>,
    /// Seconds between draws.
    pub interval: u64,
    /// Unix seconds of the last draw.
    pub last_draw_timestamp: u64,
}

impl RaffleSnapshot {
    /// Unix seconds at which the next draw becomes possible.
    pub fn next_draw_time(&self) -> u64 {
        self.last_draw_timestamp.saturating_add(self.interval)
    }
}

/// What the wallet currently exposes. Owned by the wallet provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletContext {
    pub account: Option<Address>,
    pub chain_id: Option<ChainId>,
    pub connected: bool,
}

impl WalletContext {
    pub fn connected(account: Address, chain_id: ChainId) -> Self {
        Self {
            account: Some(account),
            chain_id: Some(chain_id),
            connected: true,
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    Submitted,
    Confirmed,
    Failed,
}

/// An entry transaction accepted for broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionHandle {
    pub tx_id: TxHash,
    pub status: TxStatus,
}

impl TransactionHandle {
    pub fn submitted(tx_id: TxHash) -> Self {
        Self {
            tx_id,
            status: TxStatus::Submitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_draw_time_saturates() {
        let snapshot = RaffleSnapshot {
            entry_fee: Amount::from(10u64),
            player_count: 0,
            contract_balance: Amount::ZERO,
            recent_winner: None,
            interval: 30,
            last_draw_timestamp: 1_700_000_000,
        };
        assert_eq!(snapshot.next_draw_time(), 1_700_000_030);

        let far = RaffleSnapshot {
            interval: u64::MAX,
            ..snapshot
        };
        assert_eq!(far.next_draw_time(), u64::MAX);
    }

    #[test]
    fn test_wallet_context_constructors() {
        let account: Address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap();
        let ctx = WalletContext::connected(account, 31337);
        assert!(ctx.connected);
        assert_eq!(ctx.account, Some(account));
        assert_eq!(WalletContext::disconnected(), WalletContext::default());
    }
}

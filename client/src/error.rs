use std::time::Duration;

use alloy_primitives::Selector;
use thiserror::Error;

use crate::types::{ChainId, TxHash};

/// JSON-RPC error code a wallet returns when the user declines a request (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("raffle contract is not resolved for the current network")]
    Unresolved,

    #[error("{method} call failed: {source}")]
    Call {
        method: &'static str,
        #[source]
        source: RpcError,
    },

    #[error("{method} returned undecodable data: {reason}")]
    Decode { method: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("wallet is not connected")]
    NotConnected,

    #[error("raffle contract is not resolved for the current network")]
    Unresolved,

    #[error("entry fee is not known yet; pass an explicit payment")]
    UnknownEntryFee,

    #[error("wallet switched account or network since the raffle was last synced")]
    StaleView,

    #[error("transaction rejected by user")]
    UserRejected,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("network error: {0}")]
    Network(#[source] RpcError),
}

impl From<RpcError> for WriteError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Rpc { code, .. } if code == USER_REJECTED_CODE => WriteError::UserRejected,
            RpcError::Rpc { code, message } => {
                let lowered = message.to_lowercase();
                if lowered.contains("insufficient funds") {
                    WriteError::InsufficientFunds(message)
                } else if lowered.contains("revert") {
                    WriteError::Reverted(message)
                } else {
                    WriteError::Network(RpcError::Rpc { code, message })
                }
            }
            other => WriteError::Network(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("an entry transaction is already in flight")]
    Busy,

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("transaction {tx} not confirmed within {waited:?}")]
    ConfirmationTimeout { tx: TxHash, waited: Duration },

    #[error("transaction {tx} reverted on-chain")]
    Reverted { tx: TxHash },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read contract table: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed contract table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid chain id '{0}'")]
    InvalidChainId(String),

    #[error("no contract address listed for chain {0}")]
    EmptyAddressList(ChainId),

    #[error("abi is missing function '{0}'")]
    MissingFunction(&'static str),

    #[error("invalid selector for '{name}': {reason}")]
    InvalidSelector { name: String, reason: String },

    #[error("selector for '{name}' is {found}, expected {expected}")]
    SelectorMismatch {
        name: &'static str,
        expected: Selector,
        found: Selector,
    },
}

//! The raffle contract interface.
//!
//! Every getter takes no arguments and returns a single static word. Call data and
//! return decoding come from the `sol!` interface; the contract table only has to
//! agree with it.

use alloy_primitives::{Selector, U256};
use alloy_sol_types::{sol, SolCall};

use crate::types::Address;

sol! {
    interface IRaffle {
        function enterRaffle() external payable;
        function getEntryFee() external view returns (uint256);
        function getPlayerCount() external view returns (uint256);
        function getRecentWinner() external view returns (address);
        function getInterval() external view returns (uint256);
        function getLastTimeStamp() external view returns (uint256);
    }
}

/// Function name and selector for every raffle function this client calls.
pub const RAFFLE_FUNCTIONS: [(&str, [u8; 4]); 6] = [
    ("enterRaffle", IRaffle::enterRaffleCall::SELECTOR),
    ("getEntryFee", IRaffle::getEntryFeeCall::SELECTOR),
    ("getPlayerCount", IRaffle::getPlayerCountCall::SELECTOR),
    ("getRecentWinner", IRaffle::getRecentWinnerCall::SELECTOR),
    ("getInterval", IRaffle::getIntervalCall::SELECTOR),
    ("getLastTimeStamp", IRaffle::getLastTimeStampCall::SELECTOR),
];

/// Name of the function behind `selector`, if it is one of ours.
pub fn function_name(selector: Selector) -> Option<&'static str> {
    RAFFLE_FUNCTIONS
        .iter()
        .find(|(_, s)| *s == selector.0)
        .map(|(name, _)| *name)
}

pub fn to_u64(value: U256) -> Result<u64, String> {
    u64::try_from(value).map_err(|_| format!("value {value} does not fit in 64 bits"))
}

/// The zero address means no winner has been drawn yet.
pub fn winner(address: Address) -> Option<Address> {
    (!address.is_zero()).then_some(address)
}

use raffle_client::format::{parse_units, NATIVE_DECIMALS};
use raffle_client::{Address, Amount};
use std::str::FromStr;

pub fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_str(s).map_err(|e| format!("invalid address: {e}"))
}

/// Decimal ETH, e.g. `0.01`, into wei.
pub fn parse_ether(s: &str) -> Result<Amount, String> {
    parse_units(s, NATIVE_DECIMALS).map_err(|e| format!("invalid ETH amount: {e}"))
}

//! Contract table loading and runtime parameters

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use alloy_primitives::Selector;
use log::info;
use serde::Deserialize;

use crate::abi::RAFFLE_FUNCTIONS;
use crate::error::ConfigError;
use crate::types::{Address, ChainId};
use crate::utils::{env_parse, env_secs_opt};

/// Table shipped with the client; override with an external file.
pub const DEFAULT_CONTRACT_TABLE: &str = include_str!("../constants/contract_table.json");

pub const DEFAULT_CONFIRMATIONS: u64 = 1;
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;
pub const DEFAULT_READ_RETRIES: u32 = 0;
pub const DEFAULT_READ_RETRY_DELAY_MS: u64 = 500;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContractTable {
    contract_addresses: HashMap<String, Vec<Address>>,
    abi: HashMap<String, String>,
}

/// Chain id to deployment address. Every deployment shares the `IRaffle` interface.
#[derive(Clone, Debug)]
pub struct ContractTable {
    addresses: BTreeMap<ChainId, Address>,
}

impl ContractTable {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawContractTable = serde_json::from_str(json)?;

        let mut addresses = BTreeMap::new();
        for (chain, list) in raw.contract_addresses {
            let chain_id: ChainId = chain
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidChainId(chain.clone()))?;
            // The first listed deployment is the live one.
            let address = list
                .first()
                .copied()
                .ok_or(ConfigError::EmptyAddressList(chain_id))?;
            addresses.insert(chain_id, address);
        }

        // The table must describe the interface this client was built against.
        for (name, expected) in RAFFLE_FUNCTIONS {
            let hex = raw.abi.get(name).ok_or(ConfigError::MissingFunction(name))?;
            let found: Selector = hex.parse().map_err(|e| ConfigError::InvalidSelector {
                name: name.to_string(),
                reason: format!("{e}"),
            })?;
            if found != Selector::from(expected) {
                return Err(ConfigError::SelectorMismatch {
                    name,
                    expected: Selector::from(expected),
                    found,
                });
            }
        }

        Ok(Self { addresses })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading contract table from {:?}", path);
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_json(DEFAULT_CONTRACT_TABLE)
    }

    pub fn address(&self, chain_id: ChainId) -> Option<Address> {
        self.addresses.get(&chain_id).copied()
    }

    /// Chain ids with a deployment, ascending.
    pub fn supported_chains(&self) -> Vec<ChainId> {
        self.addresses.keys().copied().collect()
    }
}

/// Tunables for sync retries and the confirmation wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub confirmations: u64,
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub read_retries: u32,
    pub read_retry_delay: Duration,
    pub refresh_interval: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            confirmations: DEFAULT_CONFIRMATIONS,
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            receipt_poll_interval: Duration::from_millis(DEFAULT_RECEIPT_POLL_MS),
            read_retries: DEFAULT_READ_RETRIES,
            read_retry_delay: Duration::from_millis(DEFAULT_READ_RETRY_DELAY_MS),
            refresh_interval: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            confirmations: env_parse("RAFFLE_CONFIRMATIONS", DEFAULT_CONFIRMATIONS).max(1),
            confirmation_timeout: Duration::from_secs(env_parse(
                "RAFFLE_CONFIRMATION_TIMEOUT_SECS",
                DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            )),
            receipt_poll_interval: Duration::from_millis(env_parse(
                "RAFFLE_RECEIPT_POLL_MS",
                DEFAULT_RECEIPT_POLL_MS,
            )),
            read_retries: env_parse("RAFFLE_READ_RETRIES", DEFAULT_READ_RETRIES),
            read_retry_delay: Duration::from_millis(env_parse(
                "RAFFLE_READ_RETRY_DELAY_MS",
                DEFAULT_READ_RETRY_DELAY_MS,
            )),
            refresh_interval: env_secs_opt("RAFFLE_REFRESH_SECS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_table_parses() {
        let table = ContractTable::embedded().unwrap();
        assert_eq!(table.supported_chains(), vec![31337, 11155111]);
        assert_eq!(
            table.address(31337).unwrap(),
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
                .parse::<Address>()
                .unwrap()
        );
        assert!(table.address(1).is_none());
    }

    #[test]
    fn test_first_address_wins() {
        let table = ContractTable::from_json(
            r#"{
                "contractAddresses": {"5": [
                    "0x0000000000000000000000000000000000000001",
                    "0x0000000000000000000000000000000000000002"
                ]},
                "abi": {
                    "enterRaffle": "0x2cfcc539", "getEntryFee": "0xe586a4f0",
                    "getPlayerCount": "0xc2e52206", "getRecentWinner": "0x473f1ddc",
                    "getInterval": "0x91ad27b4", "getLastTimeStamp": "0xc1c244e8",
                    "performUpkeep": "0x4585e33b"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(table.address(5).unwrap(), Address::with_last_byte(1));
    }

    #[test]
    fn test_malformed_tables() {
        let abi = r#""abi": {
            "enterRaffle": "0x2cfcc539", "getEntryFee": "0xe586a4f0",
            "getPlayerCount": "0xc2e52206", "getRecentWinner": "0x473f1ddc",
            "getInterval": "0x91ad27b4", "getLastTimeStamp": "0xc1c244e8"
        }"#;

        let empty = format!(r#"{{"contractAddresses": {{"5": []}}, {abi}}}"#);
        assert!(matches!(
            ContractTable::from_json(&empty),
            Err(ConfigError::EmptyAddressList(5))
        ));

        let bad_chain = format!(r#"{{"contractAddresses": {{"sepolia": []}}, {abi}}}"#);
        assert!(matches!(
            ContractTable::from_json(&bad_chain),
            Err(ConfigError::InvalidChainId(_))
        ));

        let missing = r#"{"contractAddresses": {}, "abi": {"enterRaffle": "0x2cfcc539"}}"#;
        assert!(matches!(
            ContractTable::from_json(missing),
            Err(ConfigError::MissingFunction("getEntryFee"))
        ));

        let wrong_selector = abi.replace("0x91ad27b4", "0x91ad27b5");
        let wrong_selector = format!(r#"{{"contractAddresses": {{}}, {wrong_selector}}}"#);
        assert!(matches!(
            ContractTable::from_json(&wrong_selector),
            Err(ConfigError::SelectorMismatch {
                name: "getInterval",
                ..
            })
        ));

        let short_selector = abi.replace("0x91ad27b4", "0x91ad27");
        let short_selector = format!(r#"{{"contractAddresses": {{}}, {short_selector}}}"#);
        assert!(matches!(
            ContractTable::from_json(&short_selector),
            Err(ConfigError::InvalidSelector { .. })
        ));

        let bad_address = format!(r#"{{"contractAddresses": {{"5": ["0x12"]}}, {abi}}}"#);
        assert!(matches!(
            ContractTable::from_json(&bad_address),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    #[serial_test::serial]
    fn test_client_config_from_env() {
        std::env::set_var("RAFFLE_CONFIRMATIONS", "3");
        std::env::set_var("RAFFLE_CONFIRMATION_TIMEOUT_SECS", "45");
        std::env::set_var("RAFFLE_READ_RETRIES", "2");
        std::env::remove_var("RAFFLE_REFRESH_SECS");

        let config = ClientConfig::from_env();
        assert_eq!(config.confirmations, 3);
        assert_eq!(config.confirmation_timeout, Duration::from_secs(45));
        assert_eq!(config.read_retries, 2);
        assert_eq!(
            config.receipt_poll_interval,
            Duration::from_millis(DEFAULT_RECEIPT_POLL_MS)
        );
        assert_eq!(config.refresh_interval, None);

        std::env::set_var("RAFFLE_CONFIRMATIONS", "0");
        assert_eq!(ClientConfig::from_env().confirmations, 1);

        std::env::remove_var("RAFFLE_CONFIRMATIONS");
        std::env::remove_var("RAFFLE_CONFIRMATION_TIMEOUT_SECS");
        std::env::remove_var("RAFFLE_READ_RETRIES");
    }
}

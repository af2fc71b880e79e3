pub mod abi;
pub mod config;
pub mod contract;
pub mod error;
pub mod format;
pub mod lifecycle;
pub mod notify;
pub mod resolver;
pub mod rpc;
pub mod sync;
pub mod types;
pub mod utils;
pub mod view;
pub mod wallet;

pub use config::{ClientConfig, ContractTable};
pub use error::{ConfigError, LifecycleError, ReadError, RpcError, WriteError};
pub use lifecycle::LifecycleController;
pub use resolver::{Resolution, ResolvedContract, Resolver};
pub use sync::{ReadyView, SyncOutcome, Synchronizer, ViewState};
pub use types::*;

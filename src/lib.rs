//! Bridge Harness Library
//!
//! This crate deploys gateway contract fixtures on an in-process local chain and
//! drives lock-and-mint / burn-and-release transfers through a bridging SDK backed
//! by a mock verification network and a mock UTXO chain.

pub mod abi;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod crypto;
pub mod error;
pub mod fixtures;
pub mod flow;
pub mod network;
pub mod sdk;

// Re-export commonly used types
pub use chain::{ContractEvent, LocalChain, Log, Signer, TxReceipt};
pub use config::{ChainDeployment, Config, FeeConfig, HarnessConfig, LocalChainConfig};
pub use crypto::MintAuthority;
pub use error::{ChainError, SdkError};
pub use fixtures::{deploy_gateway_sol, DeployParams, DeployedContracts, GatewayFixture};
pub use flow::{process_deposit, process_transaction, Completion};
pub use network::{AssetSpec, NetworkConfig};
pub use sdk::{Bridge, FeeSchedule, MockChain, MockProvider};

//! Contract Bindings Module
//!
//! Typed handles over contracts deployed on the [`LocalChain`](crate::chain::LocalChain).
//! Each binding is a signer plus an address. `deploy` creates a fresh
//! contract from the signer, `attach` binds to an existing address, and
//! method calls are sent as transactions from the bound signer.

mod bridges;
mod gateways;
mod infrastructure;
mod registry;
mod token;

pub use bridges::{Adapter, BasicBridge, BridgeExample};
pub use gateways::{LockGateway, MintGateway};
pub use infrastructure::{Implementation, ProxyBeacon, SignatureVerifier, TransferWithLog};
pub use registry::GatewayRegistry;
pub use token::Erc20;

pub use crate::chain::state::{GatewayEntry, ImplementationKind, RegistryInit};

use anyhow::Result;
use ethereum_types::Address;

use crate::chain::state::Contract;
use crate::chain::{Signer, TxReceipt};

/// Deploys `contract` from `signer`, returning its address and receipt.
pub(crate) async fn deploy_contract(signer: &Signer, contract: Contract) -> Result<(Address, TxReceipt)> {
    signer.send(None, move |tx| Ok(tx.deploy(contract))).await
}

//! Bridging SDK Module
//!
//! Client-side orchestration of cross-chain transfers against the mock
//! verification network:
//! - [`LockAndMint`]: UTXO chain deposit minted on an EVM chain
//! - [`Gateway`]: lock/burn on one EVM chain, mint/release on another

pub mod events;
pub mod evm;
pub mod fees;
pub mod gateway;
pub mod lock_and_mint;
pub mod mock_chain;
pub mod mock_provider;

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;

pub use events::EventEmitter;
pub use evm::{AssetRole, ContractCall, EvmChain, EvmEndpoint, EvmParam, EvmTarget, ParamValue};
pub use fees::FeeSchedule;
pub use gateway::{
    Gateway, GatewayParams, GatewayTransaction, InputTx, OutputTx, RenVmTx, Route, SetupStep,
    SourceTx, ERROR_EVENT, TRANSACTION_EVENT,
};
pub use lock_and_mint::{DepositHandle, DepositStatus, LockAndMint, LockAndMintParams, DEPOSIT_EVENT};
pub use mock_chain::{MockChain, Utxo};
pub use mock_provider::{MockProvider, RequestKind, SignedTransfer, TransferRequest};

use crate::error::SdkError;

/// Default polling interval of deposit and transaction watchers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A chain known to the SDK.
#[derive(Debug, Clone)]
pub enum ChainHandle {
    Utxo(MockChain),
    Evm(EvmChain),
}

impl ChainHandle {
    pub fn name(&self) -> &str {
        match self {
            ChainHandle::Utxo(chain) => chain.chain(),
            ChainHandle::Evm(chain) => chain.name(),
        }
    }
}

impl From<MockChain> for ChainHandle {
    fn from(chain: MockChain) -> Self {
        ChainHandle::Utxo(chain)
    }
}

impl From<EvmChain> for ChainHandle {
    fn from(chain: EvmChain) -> Self {
        ChainHandle::Evm(chain)
    }
}

/// Entry point of the SDK: a provider plus the chains transfers may use.
#[derive(Debug, Clone)]
pub struct Bridge {
    provider: MockProvider,
    chains: BTreeMap<String, ChainHandle>,
    poll_interval: Duration,
}

impl Bridge {
    pub fn new(provider: MockProvider) -> Self {
        Self {
            provider,
            chains: BTreeMap::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Registers a chain under its selector. Re-registering replaces it.
    pub fn with_chain(mut self, chain: impl Into<ChainHandle>) -> Self {
        let chain = chain.into();
        self.chains.insert(chain.name().to_string(), chain);
        self
    }

    pub fn provider(&self) -> &MockProvider {
        &self.provider
    }

    pub fn chain(&self, name: &str) -> Option<&ChainHandle> {
        self.chains.get(name)
    }

    fn require_chain(&self, name: &str) -> Result<()> {
        if !self.chains.contains_key(name) {
            return Err(SdkError::UnknownChain(name.to_string()).into());
        }
        Ok(())
    }

    /// Starts a lock-and-mint transfer from a UTXO chain.
    ///
    /// # Returns
    ///
    /// * `Ok(LockAndMint)` - Transfer with its deposit address; deposits are watched in the background
    /// * `Err(anyhow::Error)` - Unknown source chain, or the asset cannot be minted on the destination
    pub async fn lock_and_mint(&self, params: LockAndMintParams) -> Result<LockAndMint> {
        self.require_chain(params.from.chain())?;
        params.from.asset_decimals(&params.asset)?;

        let gateway = match params.to.chain.asset_role(&params.asset).await? {
            AssetRole::Mint(entry) => entry,
            AssetRole::Lock(_) => {
                return Err(SdkError::UnsupportedRoute(format!(
                    "{} is locked on {}, it cannot be minted there",
                    params.asset,
                    params.to.chain.name()
                ))
                .into())
            }
        };

        LockAndMint::start(params, self.provider.clone(), gateway, self.poll_interval)
    }

    /// Starts a transfer between two EVM chains.
    pub async fn gateway(&self, params: GatewayParams) -> Result<Gateway> {
        self.require_chain(params.from.chain.name())?;
        self.require_chain(params.to.chain.name())?;
        Gateway::start(params, self.provider.clone(), self.poll_interval).await
    }
}

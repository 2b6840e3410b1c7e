//! Mock verification network.
//!
//! Stands in for the network of nodes that watches source chains and signs
//! mint/release approvals. The mock trusts the request it is given: it only
//! checks chain registration and fees, then signs the signature hash the
//! destination gateway will recompute.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::Result;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::fees::FeeSchedule;
use crate::config::Config;
use crate::crypto::{self, MintAuthority};
use crate::error::SdkError;

/// What the destination gateway does with an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Mint a RenAsset (fees apply)
    Mint,
    /// Release locked tokens (no fees modelled)
    Release,
}

/// A cross-chain transfer awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub kind: RequestKind,
    pub asset: String,
    pub from_chain: String,
    pub to_chain: String,
    /// Payload hash of the destination call
    pub p_hash: H256,
    /// Amount observed on the source chain
    pub amount: U256,
    /// Account that will call the destination gateway
    pub to: Address,
    /// Identifies the source deposit or transaction
    pub n_hash: H256,
}

impl TransferRequest {
    /// Selector string, e.g. "BTC/toEthereum".
    pub fn selector(&self) -> String {
        format!("{}/to{}", self.asset, self.to_chain)
    }
}

/// Signed approval returned for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransfer {
    /// Amount the gateway will mint or release
    pub amount: U256,
    pub n_hash: H256,
    pub sig_hash: H256,
    /// 65-byte `r || s || v`
    pub signature: Vec<u8>,
}

#[derive(Debug, Default)]
struct ProviderState {
    chains: BTreeSet<String>,
    responses: HashMap<(RequestKind, String, H256), SignedTransfer>,
}

/// Handle to the mock verification network. Clones share registrations and
/// stored responses.
#[derive(Debug, Clone)]
pub struct MockProvider {
    authority: MintAuthority,
    fees: FeeSchedule,
    state: Arc<RwLock<ProviderState>>,
}

impl MockProvider {
    /// Provider with a fresh random mint authority and default fees.
    pub fn new() -> Result<Self> {
        Ok(Self::with_authority(MintAuthority::random()?, FeeSchedule::default()))
    }

    pub fn with_authority(authority: MintAuthority, fees: FeeSchedule) -> Self {
        Self {
            authority,
            fees,
            state: Arc::new(RwLock::new(ProviderState::default())),
        }
    }

    /// Provider using the configured fee schedule and the mint authority key
    /// from the configured environment variable.
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = config.harness.get_mint_authority_key()?;
        let authority = MintAuthority::from_hex(&key)?;
        Ok(Self::with_authority(authority, config.fees.into()))
    }

    /// Address gateways must be initialised with.
    pub fn mint_authority(&self) -> Address {
        self.authority.address()
    }

    pub fn fees(&self) -> FeeSchedule {
        self.fees
    }

    pub async fn register_chain(&self, chain: &str) {
        let added = self.state.write().await.chains.insert(chain.to_string());
        if added {
            info!("Mock provider: registered chain {}", chain);
        }
    }

    pub async fn is_registered(&self, chain: &str) -> bool {
        self.state.read().await.chains.contains(chain)
    }

    /// Signs `request`, or returns the stored approval if it was already signed.
    ///
    /// # Returns
    ///
    /// * `Ok(SignedTransfer)` - Approval for the destination gateway
    /// * `Err(anyhow::Error)` - Source chain unknown, or the amount does not cover fees
    pub async fn submit(&self, request: &TransferRequest) -> Result<SignedTransfer> {
        let key = (request.kind, request.selector(), request.n_hash);
        let mut state = self.state.write().await;
        if let Some(existing) = state.responses.get(&key) {
            debug!("Mock provider: returning stored response for {:#x}", request.n_hash);
            return Ok(existing.clone());
        }

        if !state.chains.contains(&request.from_chain) {
            return Err(SdkError::UnknownChain(request.from_chain.clone()).into());
        }

        let amount = match request.kind {
            RequestKind::Mint => self.fees.estimate_output(request.amount),
            RequestKind::Release => request.amount,
        };
        if amount.is_zero() {
            return Err(SdkError::Rejected(format!(
                "amount {} does not cover fees for {}",
                request.amount,
                request.selector()
            ))
            .into());
        }

        let selector_hash = crypto::selector_hash(&request.asset, &request.to_chain);
        let sig_hash = crypto::signature_hash(
            &request.p_hash,
            amount,
            &selector_hash,
            &request.to,
            &request.n_hash,
        );
        let signature = self.authority.sign(&sig_hash)?;
        let response = SignedTransfer {
            amount,
            n_hash: request.n_hash,
            sig_hash,
            signature,
        };
        state.responses.insert(key, response.clone());

        info!(
            "Mock provider: signed {:?} {} of {} (input {})",
            request.kind,
            request.selector(),
            amount,
            request.amount
        );
        Ok(response)
    }
}

//! EVM chain binding for the SDK.
//!
//! An [`EvmChain`] is a deployed gateway environment ([`NetworkConfig`]) plus
//! the signer that sends transactions on it. Transfers start from or end at
//! an [`EvmEndpoint`]: either the signer's own account or a contract call.

use std::time::Duration;

use anyhow::Result;
use ethereum_types::{Address, H256, U256};
use tracing::debug;

use super::mock_provider::{RequestKind, SignedTransfer};
use crate::abi::Token;
use crate::chain::{Signer, TxReceipt};
use crate::contracts::{GatewayEntry, GatewayRegistry, LockGateway, MintGateway};
use crate::crypto;
use crate::error::SdkError;
use crate::network::NetworkConfig;

// ============================================================================
// CONTRACT CALL PARAMETERS
// ============================================================================

/// Value of a contract call parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    String(String),
    Bytes(Vec<u8>),
    Bytes32(H256),
    Address(Address),
    Uint256(U256),
    /// Replaced by the destination account's 20 address bytes
    EvmToAddressBytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmParam {
    pub name: String,
    pub value: ParamValue,
}

impl EvmParam {
    pub fn new(name: &str, value: ParamValue) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }

    pub fn string(name: &str, value: &str) -> Self {
        Self::new(name, ParamValue::String(value.to_string()))
    }

    pub fn bytes(name: &str, value: impl Into<Vec<u8>>) -> Self {
        Self::new(name, ParamValue::Bytes(value.into()))
    }

    pub fn uint256(name: &str, value: U256) -> Self {
        Self::new(name, ParamValue::Uint256(value))
    }

    pub fn to_address_bytes(name: &str) -> Self {
        Self::new(name, ParamValue::EvmToAddressBytes)
    }
}

/// A contract method call used as a transfer source or destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub method: String,
    /// Append `amount`, `nHash` and `signature` when used as a destination
    pub with_ren_params: bool,
    pub params: Vec<EvmParam>,
}

impl ContractCall {
    pub fn new(to: Address, method: &str) -> Self {
        Self {
            to,
            method: method.to_string(),
            with_ren_params: false,
            params: Vec::new(),
        }
    }

    pub fn with_ren_params(mut self) -> Self {
        self.with_ren_params = true;
        self
    }

    pub fn param(mut self, param: EvmParam) -> Self {
        self.params.push(param);
        self
    }

    /// ABI values of the call, substituting the destination placeholder.
    pub fn resolve(&self, to_address: Address) -> Vec<Token> {
        self.params
            .iter()
            .map(|param| match &param.value {
                ParamValue::String(s) => Token::String(s.clone()),
                ParamValue::Bytes(b) => Token::Bytes(b.clone()),
                ParamValue::Bytes32(h) => Token::FixedBytes(*h),
                ParamValue::Address(a) => Token::Address(*a),
                ParamValue::Uint256(v) => Token::Uint(*v),
                ParamValue::EvmToAddressBytes => Token::Bytes(to_address.as_bytes().to_vec()),
            })
            .collect()
    }
}

// ============================================================================
// CHAINS AND ENDPOINTS
// ============================================================================

/// How an asset exists on a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRole {
    /// Native token held by a lock gateway
    Lock(GatewayEntry),
    /// RenAsset minted by a mint gateway
    Mint(GatewayEntry),
}

impl AssetRole {
    pub fn entry(&self) -> GatewayEntry {
        match self {
            AssetRole::Lock(entry) | AssetRole::Mint(entry) => *entry,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvmChain {
    network: NetworkConfig,
    signer: Signer,
}

impl EvmChain {
    pub fn new(network: NetworkConfig, signer: Signer) -> Self {
        Self { network, signer }
    }

    /// Chain selector from the network config.
    pub fn name(&self) -> &str {
        &self.network.selector
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// The signer's own account, as a destination.
    pub fn account(&self) -> EvmEndpoint {
        EvmEndpoint {
            chain: self.clone(),
            target: EvmTarget::Account { amount: None },
        }
    }

    /// The signer's own account, as a source sending `amount`.
    pub fn account_with_amount(&self, amount: U256) -> EvmEndpoint {
        EvmEndpoint {
            chain: self.clone(),
            target: EvmTarget::Account {
                amount: Some(amount),
            },
        }
    }

    pub fn contract(&self, call: ContractCall) -> EvmEndpoint {
        EvmEndpoint {
            chain: self.clone(),
            target: EvmTarget::Contract(call),
        }
    }

    pub fn registry(&self) -> Result<GatewayRegistry> {
        Ok(GatewayRegistry::attach(
            &self.signer,
            self.network.gateway_registry()?,
        ))
    }

    /// Looks up whether `asset` is locked or minted on this chain.
    pub async fn asset_role(&self, asset: &str) -> Result<AssetRole> {
        let registry = self.network.gateway_registry()?;
        let chain = self.signer.chain();
        if let Some(entry) = chain
            .view(|s| s.lock_gateway_by_symbol(&registry, asset))
            .await?
        {
            return Ok(AssetRole::Lock(entry));
        }
        if let Some(entry) = chain
            .view(|s| s.mint_gateway_by_symbol(&registry, asset))
            .await?
        {
            return Ok(AssetRole::Mint(entry));
        }
        Err(SdkError::UnsupportedAsset {
            asset: asset.to_string(),
            chain: self.name().to_string(),
        }
        .into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvmTarget {
    Account { amount: Option<U256> },
    Contract(ContractCall),
}

/// One side of a transfer on an EVM chain.
#[derive(Debug, Clone)]
pub struct EvmEndpoint {
    pub chain: EvmChain,
    pub target: EvmTarget,
}

impl EvmEndpoint {
    /// Account that calls the destination gateway and is bound into the
    /// signature: the contract for contract calls, the signer otherwise.
    pub fn recipient(&self) -> Address {
        match &self.target {
            EvmTarget::Account { .. } => self.chain.signer.address(),
            EvmTarget::Contract(call) => call.to,
        }
    }

    /// Payload hash the destination gateway is called with.
    pub fn payload_hash(&self) -> Result<H256> {
        match &self.target {
            EvmTarget::Account { .. } => Ok(crypto::payload_hash(&[])),
            EvmTarget::Contract(call) if call.with_ren_params => {
                Ok(crypto::payload_hash(&call.resolve(self.chain.signer.address())))
            }
            EvmTarget::Contract(call) => Err(SdkError::UnsupportedRoute(format!(
                "destination call `{}` must take ren params",
                call.method
            ))
            .into()),
        }
    }

    /// Submits the destination transaction for an approved transfer.
    pub async fn submit_output(
        &self,
        kind: RequestKind,
        gateway: Address,
        p_hash: H256,
        signed: &SignedTransfer,
    ) -> Result<TxReceipt> {
        let signer = &self.chain.signer;
        match (&self.target, kind) {
            (EvmTarget::Account { .. }, RequestKind::Mint) => {
                MintGateway::attach(signer, gateway)
                    .mint(p_hash, signed.amount, signed.n_hash, &signed.signature)
                    .await
            }
            (EvmTarget::Account { .. }, RequestKind::Release) => {
                LockGateway::attach(signer, gateway)
                    .release(p_hash, signed.amount, signed.n_hash, &signed.signature)
                    .await
            }
            (EvmTarget::Contract(call), _) => {
                let mut args = call.resolve(signer.address());
                args.push(Token::Uint(signed.amount));
                args.push(Token::FixedBytes(signed.n_hash));
                args.push(Token::Bytes(signed.signature.clone()));
                let (_, receipt) = signer.call(call.to, &call.method, args).await?;
                Ok(receipt)
            }
        }
    }
}

/// Polls until `tx_hash` has at least `confirmations` confirmations.
pub(crate) async fn wait_for_confirmations(
    signer: &Signer,
    tx_hash: &H256,
    confirmations: u64,
    poll_interval: Duration,
) -> Result<u64> {
    loop {
        let current = signer.chain().confirmations(tx_hash).await?;
        if current >= confirmations {
            return Ok(current);
        }
        debug!(
            "Waiting for {:#x}: {}/{} confirmations",
            tx_hash, current, confirmations
        );
        tokio::time::sleep(poll_interval).await;
    }
}

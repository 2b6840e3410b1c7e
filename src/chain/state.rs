//! Contract storage of the local chain.
//!
//! Every deployed contract is one [`Contract`] variant holding its storage.
//! The typed accessors below return a revert-style [`ChainError`] when the
//! address holds nothing or holds a different kind of contract, matching what
//! a call into the wrong ABI would do on a real node.

use std::collections::{BTreeMap, HashMap, HashSet};

use ethereum_types::{Address, H256, U256};

use super::TxReceipt;
use crate::error::ChainError;

/// Which upgradeable implementation a template contract stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplementationKind {
    RenAsset,
    MintGateway,
    LockGateway,
}

#[derive(Debug, Clone, Default)]
pub struct SignatureVerifierState {
    pub initialized: bool,
    pub chain_name: String,
    pub mint_authority: Address,
    pub admin: Address,
}

#[derive(Debug, Clone)]
pub struct ProxyBeaconState {
    pub implementation: Address,
    pub owner: Address,
    pub proxy_deployer: Address,
}

/// Addresses and parameters a registry is initialised with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryInit {
    pub chain_id: u64,
    pub signature_verifier: Address,
    pub transfer_contract: Address,
    pub ren_asset_beacon: Address,
    pub mint_gateway_beacon: Address,
    pub lock_gateway_beacon: Address,
    pub owner: Address,
    pub signers: Vec<Address>,
}

/// Gateway and the token it manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayEntry {
    pub gateway: Address,
    pub token: Address,
}

#[derive(Debug, Clone, Default)]
pub struct GatewayRegistryState {
    pub init: Option<RegistryInit>,
    pub mint_gateways: BTreeMap<String, GatewayEntry>,
    pub lock_gateways: BTreeMap<String, GatewayEntry>,
}

/// ERC-20 storage shared by RenAsset proxies and test tokens.
#[derive(Debug, Clone)]
pub struct TokenState {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub balances: HashMap<Address, U256>,
    pub allowances: HashMap<(Address, Address), U256>,
    /// Account allowed to mint and burn (the mint gateway for RenAssets)
    pub owner: Option<Address>,
    /// Beacon the proxy was deployed through, if any
    pub beacon: Option<Address>,
    pub version: Option<String>,
}

impl TokenState {
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct MintGatewayState {
    pub asset: String,
    pub token: Address,
    pub signature_verifier: Address,
    pub selector_hash: H256,
    pub beacon: Address,
    pub version: String,
    pub burn_nonce: u64,
    pub spent: HashSet<H256>,
}

#[derive(Debug, Clone)]
pub struct LockGatewayState {
    pub asset: String,
    pub token: Address,
    pub signature_verifier: Address,
    pub selector_hash: H256,
    pub beacon: Address,
    pub version: String,
    pub lock_nonce: u64,
    pub spent: HashSet<H256>,
}

/// A deployed contract and its storage.
#[derive(Debug, Clone)]
pub enum Contract {
    SignatureVerifier(SignatureVerifierState),
    TransferWithLog,
    Implementation(ImplementationKind),
    ProxyBeacon(ProxyBeaconState),
    GatewayRegistry(GatewayRegistryState),
    Token(TokenState),
    MintGateway(MintGatewayState),
    LockGateway(LockGatewayState),
    BasicBridge { registry: Address },
    BridgeExample { registry: Address },
    Adapter { registry: Address },
}

impl Contract {
    /// Contract name as it would appear in an artifact.
    pub fn kind(&self) -> &'static str {
        match self {
            Contract::SignatureVerifier(_) => "RenVMSignatureVerifierV1",
            Contract::TransferWithLog => "TransferWithLog",
            Contract::Implementation(ImplementationKind::RenAsset) => "RenAssetV2",
            Contract::Implementation(ImplementationKind::MintGateway) => "MintGatewayV3",
            Contract::Implementation(ImplementationKind::LockGateway) => "LockGatewayV3",
            Contract::ProxyBeacon(_) => "ProxyBeacon",
            Contract::GatewayRegistry(_) => "GatewayRegistryV2",
            Contract::Token(_) => "ERC20",
            Contract::MintGateway(_) => "MintGatewayProxy",
            Contract::LockGateway(_) => "LockGatewayProxy",
            Contract::BasicBridge { .. } => "BasicBridge",
            Contract::BridgeExample { .. } => "BridgeExample",
            Contract::Adapter { .. } => "Adapter",
        }
    }
}

/// Whole-chain state. Cloned per transaction so a revert can be discarded.
#[derive(Debug, Clone, Default)]
pub struct ChainState {
    pub(crate) block_number: u64,
    pub(crate) nonces: HashMap<Address, u64>,
    pub(crate) contracts: HashMap<Address, Contract>,
    pub(crate) created: u64,
    pub(crate) log_count: u64,
    pub(crate) receipts: HashMap<H256, TxReceipt>,
}

fn wrong_kind(address: &Address, expected: &str) -> ChainError {
    ChainError::revert(format!(
        "call to {:#x} failed: not a {} contract",
        address, expected
    ))
}

impl ChainState {
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn contract(&self, address: &Address) -> Result<&Contract, ChainError> {
        self.contracts
            .get(address)
            .ok_or(ChainError::NoContract(*address))
    }

    pub(crate) fn contract_mut(&mut self, address: &Address) -> Result<&mut Contract, ChainError> {
        self.contracts
            .get_mut(address)
            .ok_or(ChainError::NoContract(*address))
    }

    pub fn is_contract(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    pub fn verifier(&self, address: &Address) -> Result<&SignatureVerifierState, ChainError> {
        match self.contract(address)? {
            Contract::SignatureVerifier(s) => Ok(s),
            _ => Err(wrong_kind(address, "RenVMSignatureVerifier")),
        }
    }

    pub(crate) fn verifier_mut(
        &mut self,
        address: &Address,
    ) -> Result<&mut SignatureVerifierState, ChainError> {
        match self.contract_mut(address)? {
            Contract::SignatureVerifier(s) => Ok(s),
            _ => Err(wrong_kind(address, "RenVMSignatureVerifier")),
        }
    }

    pub fn beacon(&self, address: &Address) -> Result<&ProxyBeaconState, ChainError> {
        match self.contract(address)? {
            Contract::ProxyBeacon(s) => Ok(s),
            _ => Err(wrong_kind(address, "ProxyBeacon")),
        }
    }

    pub(crate) fn beacon_mut(&mut self, address: &Address) -> Result<&mut ProxyBeaconState, ChainError> {
        match self.contract_mut(address)? {
            Contract::ProxyBeacon(s) => Ok(s),
            _ => Err(wrong_kind(address, "ProxyBeacon")),
        }
    }

    pub fn registry(&self, address: &Address) -> Result<&GatewayRegistryState, ChainError> {
        match self.contract(address)? {
            Contract::GatewayRegistry(s) => Ok(s),
            _ => Err(wrong_kind(address, "GatewayRegistry")),
        }
    }

    pub(crate) fn registry_mut(
        &mut self,
        address: &Address,
    ) -> Result<&mut GatewayRegistryState, ChainError> {
        match self.contract_mut(address)? {
            Contract::GatewayRegistry(s) => Ok(s),
            _ => Err(wrong_kind(address, "GatewayRegistry")),
        }
    }

    pub fn token(&self, address: &Address) -> Result<&TokenState, ChainError> {
        match self.contract(address)? {
            Contract::Token(s) => Ok(s),
            _ => Err(wrong_kind(address, "ERC20")),
        }
    }

    pub(crate) fn token_mut(&mut self, address: &Address) -> Result<&mut TokenState, ChainError> {
        match self.contract_mut(address)? {
            Contract::Token(s) => Ok(s),
            _ => Err(wrong_kind(address, "ERC20")),
        }
    }

    pub fn mint_gateway(&self, address: &Address) -> Result<&MintGatewayState, ChainError> {
        match self.contract(address)? {
            Contract::MintGateway(s) => Ok(s),
            _ => Err(wrong_kind(address, "MintGateway")),
        }
    }

    pub(crate) fn mint_gateway_mut(
        &mut self,
        address: &Address,
    ) -> Result<&mut MintGatewayState, ChainError> {
        match self.contract_mut(address)? {
            Contract::MintGateway(s) => Ok(s),
            _ => Err(wrong_kind(address, "MintGateway")),
        }
    }

    pub fn lock_gateway(&self, address: &Address) -> Result<&LockGatewayState, ChainError> {
        match self.contract(address)? {
            Contract::LockGateway(s) => Ok(s),
            _ => Err(wrong_kind(address, "LockGateway")),
        }
    }

    pub(crate) fn lock_gateway_mut(
        &mut self,
        address: &Address,
    ) -> Result<&mut LockGatewayState, ChainError> {
        match self.contract_mut(address)? {
            Contract::LockGateway(s) => Ok(s),
            _ => Err(wrong_kind(address, "LockGateway")),
        }
    }

    /// Registry address an example/adapter contract was constructed with.
    pub fn wired_registry(&self, address: &Address) -> Result<Address, ChainError> {
        match self.contract(address)? {
            Contract::BasicBridge { registry }
            | Contract::BridgeExample { registry }
            | Contract::Adapter { registry } => Ok(*registry),
            _ => Err(wrong_kind(address, "bridge")),
        }
    }

    /// Initialisation record of a registry; reverts if not yet initialised.
    pub fn registry_init(&self, registry: &Address) -> Result<&RegistryInit, ChainError> {
        self.registry(registry)?
            .init
            .as_ref()
            .ok_or_else(|| ChainError::revert("GatewayRegistry: not initialized"))
    }

    pub fn mint_gateway_by_symbol(
        &self,
        registry: &Address,
        symbol: &str,
    ) -> Result<Option<GatewayEntry>, ChainError> {
        Ok(self.registry(registry)?.mint_gateways.get(symbol).copied())
    }

    pub fn lock_gateway_by_symbol(
        &self,
        registry: &Address,
        symbol: &str,
    ) -> Result<Option<GatewayEntry>, ChainError> {
        Ok(self.registry(registry)?.lock_gateways.get(symbol).copied())
    }

    /// Checks `signature` over `hash` against a verifier's mint authority.
    pub fn is_valid_signature(
        &self,
        verifier: &Address,
        hash: &H256,
        signature: &[u8],
    ) -> Result<bool, ChainError> {
        let state = self.verifier(verifier)?;
        if !state.initialized {
            return Err(ChainError::revert("RenVMSignatureVerifier: not initialized"));
        }
        Ok(crate::crypto::recover_signer(hash, signature)
            .map(|signer| signer == state.mint_authority)
            .unwrap_or(false))
    }

    /// Token balance of `account`.
    pub fn balance_of(&self, token: &Address, account: &Address) -> Result<U256, ChainError> {
        Ok(self.token(token)?.balance_of(account))
    }
}

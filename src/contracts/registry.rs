//! `GatewayRegistry` binding.

use anyhow::Result;
use ethereum_types::Address;

use super::deploy_contract;
use crate::chain::state::{Contract, GatewayEntry, GatewayRegistryState, RegistryInit};
use crate::chain::{Signer, TxReceipt};

/// Registry of mint and lock gateways, keyed by asset symbol.
#[derive(Debug, Clone)]
pub struct GatewayRegistry {
    signer: Signer,
    address: Address,
}

impl GatewayRegistry {
    /// Deploys an uninitialised registry.
    pub async fn deploy(signer: &Signer) -> Result<Self> {
        let contract = Contract::GatewayRegistry(GatewayRegistryState::default());
        let (address, _) = deploy_contract(signer, contract).await?;
        Ok(Self::attach(signer, address))
    }

    pub fn attach(signer: &Signer, address: Address) -> Self {
        Self {
            signer: signer.clone(),
            address,
        }
    }

    /// Same registry, sending from another account.
    pub fn connect(&self, signer: &Signer) -> Self {
        Self::attach(signer, self.address)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// One-time initialiser wiring in the verifier, helper and beacons.
    pub async fn initialize(&self, init: RegistryInit) -> Result<TxReceipt> {
        let registry = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(registry), move |tx| tx.registry_initialize(registry, init))
            .await?;
        Ok(receipt)
    }

    /// Signer-only: deploys a RenAsset and its MintGateway for `symbol`.
    ///
    /// # Returns
    ///
    /// * `Ok(GatewayEntry)` - Addresses of the new gateway and token
    /// * `Err(anyhow::Error)` - Caller is not a signer, or the symbol already exists
    pub async fn deploy_mint_gateway_and_ren_asset(
        &self,
        symbol: &str,
        token_name: &str,
        token_symbol: &str,
        decimals: u8,
        version: &str,
    ) -> Result<GatewayEntry> {
        let registry = self.address;
        let (entry, _) = self
            .signer
            .send(Some(registry), |tx| {
                let caller = tx.sender();
                tx.registry_deploy_mint_gateway_and_ren_asset(
                    registry,
                    caller,
                    symbol,
                    token_name,
                    token_symbol,
                    decimals,
                    version,
                )
            })
            .await?;
        Ok(entry)
    }

    /// Signer-only: deploys a LockGateway for an existing token.
    pub async fn deploy_lock_gateway(
        &self,
        symbol: &str,
        token: Address,
        version: &str,
    ) -> Result<GatewayEntry> {
        let registry = self.address;
        let (entry, _) = self
            .signer
            .send(Some(registry), |tx| {
                let caller = tx.sender();
                tx.registry_deploy_lock_gateway(registry, caller, symbol, token, version)
            })
            .await?;
        Ok(entry)
    }

    pub async fn get_mint_gateway_by_symbol(&self, symbol: &str) -> Result<Option<Address>> {
        let entry = self.mint_entry(symbol).await?;
        Ok(entry.map(|e| e.gateway))
    }

    pub async fn get_ren_asset_by_symbol(&self, symbol: &str) -> Result<Option<Address>> {
        let entry = self.mint_entry(symbol).await?;
        Ok(entry.map(|e| e.token))
    }

    pub async fn get_lock_gateway_by_symbol(&self, symbol: &str) -> Result<Option<Address>> {
        let entry = self.lock_entry(symbol).await?;
        Ok(entry.map(|e| e.gateway))
    }

    pub async fn get_lock_asset_by_symbol(&self, symbol: &str) -> Result<Option<Address>> {
        let entry = self.lock_entry(symbol).await?;
        Ok(entry.map(|e| e.token))
    }

    pub async fn get_mint_gateway_symbols(&self) -> Result<Vec<String>> {
        self.signer
            .chain()
            .view(|s| Ok(s.registry(&self.address)?.mint_gateways.keys().cloned().collect()))
            .await
    }

    pub async fn get_lock_gateway_symbols(&self) -> Result<Vec<String>> {
        self.signer
            .chain()
            .view(|s| Ok(s.registry(&self.address)?.lock_gateways.keys().cloned().collect()))
            .await
    }

    /// Initialisation record (chain id, verifier, helper, beacons, signers).
    pub async fn config(&self) -> Result<RegistryInit> {
        self.signer
            .chain()
            .view(|s| Ok(s.registry_init(&self.address)?.clone()))
            .await
    }

    async fn mint_entry(&self, symbol: &str) -> Result<Option<GatewayEntry>> {
        self.signer
            .chain()
            .view(|s| s.mint_gateway_by_symbol(&self.address, symbol))
            .await
    }

    async fn lock_entry(&self, symbol: &str) -> Result<Option<GatewayEntry>> {
        self.signer
            .chain()
            .view(|s| s.lock_gateway_by_symbol(&self.address, symbol))
            .await
    }
}

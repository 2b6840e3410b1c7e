//! Bindings for the contracts that sit in front of the gateways:
//! `BasicBridge`, `BridgeExample` and the BTC `Adapter`.

use anyhow::Result;
use ethereum_types::{Address, H256, U256};

use super::deploy_contract;
use crate::chain::state::Contract;
use crate::chain::{Signer, TxReceipt};
use crate::error::ChainError;

/// Balance of the RenAsset for `symbol` held by `holder`, resolved through
/// the registry the holder was wired to.
async fn ren_asset_balance(signer: &Signer, holder: Address, symbol: &str) -> Result<U256> {
    signer
        .chain()
        .view(|s| {
            let registry = s.wired_registry(&holder)?;
            let entry = s.mint_gateway_by_symbol(&registry, symbol)?.ok_or_else(|| {
                ChainError::revert(format!("GatewayRegistry: unknown symbol {}", symbol))
            })?;
            s.balance_of(&entry.token, &holder)
        })
        .await
}

/// Example bridge recorded in `NetworkConfig` as `"BasicBridge"`.
#[derive(Debug, Clone)]
pub struct BasicBridge {
    signer: Signer,
    address: Address,
}

impl BasicBridge {
    pub async fn deploy(signer: &Signer, registry: Address) -> Result<Self> {
        let (address, _) = deploy_contract(signer, Contract::BasicBridge { registry }).await?;
        Ok(Self::attach(signer, address))
    }

    pub fn attach(signer: &Signer, address: Address) -> Self {
        Self {
            signer: signer.clone(),
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn registry(&self) -> Result<Address> {
        self.signer
            .chain()
            .view(|s| s.wired_registry(&self.address))
            .await
    }

    /// Mints `symbol` through its gateway and forwards it to `recipient`.
    pub async fn mint(
        &self,
        symbol: &str,
        recipient: Address,
        amount: U256,
        n_hash: H256,
        signature: &[u8],
    ) -> Result<TxReceipt> {
        let bridge = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(bridge), |tx| {
                tx.basic_bridge_mint(bridge, symbol.to_string(), recipient, amount, n_hash, signature)
            })
            .await?;
        Ok(receipt)
    }

    /// Pulls the caller's tokens (needs a prior `approve`) and burns them.
    pub async fn burn(&self, symbol: &str, to: &str, amount: U256) -> Result<TxReceipt> {
        let bridge = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(bridge), |tx| {
                let caller = tx.sender();
                tx.basic_bridge_burn(bridge, caller, symbol.to_string(), to.to_string(), amount)
            })
            .await?;
        Ok(receipt)
    }
}

/// Contract that receives minted assets with an arbitrary message and can
/// burn them back out.
#[derive(Debug, Clone)]
pub struct BridgeExample {
    signer: Signer,
    address: Address,
}

impl BridgeExample {
    pub async fn deploy(signer: &Signer, registry: Address) -> Result<Self> {
        let (address, _) = deploy_contract(signer, Contract::BridgeExample { registry }).await?;
        Ok(Self::attach(signer, address))
    }

    pub fn attach(signer: &Signer, address: Address) -> Self {
        Self {
            signer: signer.clone(),
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Balance of `asset` held by the contract.
    pub async fn balance(&self, asset: &str) -> Result<U256> {
        ren_asset_balance(&self.signer, self.address, asset).await
    }

    pub async fn deposit(
        &self,
        asset: &str,
        msg: Vec<u8>,
        amount: U256,
        n_hash: H256,
        signature: &[u8],
    ) -> Result<TxReceipt> {
        let bridge = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(bridge), move |tx| {
                tx.bridge_example_deposit(bridge, asset.to_string(), msg, amount, n_hash, signature)
            })
            .await?;
        Ok(receipt)
    }

    /// Burns `amount` of the contract's own balance towards `to`.
    pub async fn withdraw(&self, asset: &str, to: Vec<u8>, amount: U256) -> Result<TxReceipt> {
        let bridge = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(bridge), move |tx| {
                tx.bridge_example_withdraw(bridge, asset.to_string(), to, amount)
            })
            .await?;
        Ok(receipt)
    }
}

/// BTC adapter: receives minted BTC together with a message.
#[derive(Debug, Clone)]
pub struct Adapter {
    signer: Signer,
    address: Address,
}

impl Adapter {
    pub async fn deploy(signer: &Signer, registry: Address) -> Result<Self> {
        let (address, _) = deploy_contract(signer, Contract::Adapter { registry }).await?;
        Ok(Self::attach(signer, address))
    }

    pub fn attach(signer: &Signer, address: Address) -> Self {
        Self {
            signer: signer.clone(),
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// BTC balance of the adapter.
    pub async fn balance(&self) -> Result<U256> {
        ren_asset_balance(&self.signer, self.address, "BTC").await
    }

    pub async fn deposit(
        &self,
        msg: Vec<u8>,
        amount: U256,
        n_hash: H256,
        signature: &[u8],
    ) -> Result<TxReceipt> {
        let adapter = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(adapter), move |tx| {
                tx.adapter_deposit(adapter, msg, amount, n_hash, signature)
            })
            .await?;
        Ok(receipt)
    }
}

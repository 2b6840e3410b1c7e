//! Mint and lock gateway bindings.

use anyhow::Result;
use ethereum_types::{Address, H256, U256};

use crate::chain::{Signer, TxReceipt};

/// Mints a RenAsset against mint authority signatures and burns it back.
#[derive(Debug, Clone)]
pub struct MintGateway {
    signer: Signer,
    address: Address,
}

impl MintGateway {
    pub fn attach(signer: &Signer, address: Address) -> Self {
        Self {
            signer: signer.clone(),
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn token(&self) -> Result<Address> {
        self.signer
            .chain()
            .view(|s| Ok(s.mint_gateway(&self.address)?.token))
            .await
    }

    pub async fn selector_hash(&self) -> Result<H256> {
        self.signer
            .chain()
            .view(|s| Ok(s.mint_gateway(&self.address)?.selector_hash))
            .await
    }

    /// Mints `amount` to the calling account.
    pub async fn mint(
        &self,
        p_hash: H256,
        amount: U256,
        n_hash: H256,
        signature: &[u8],
    ) -> Result<TxReceipt> {
        let gateway = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(gateway), |tx| {
                let caller = tx.sender();
                tx.gateway_mint(gateway, caller, p_hash, amount, n_hash, signature)
            })
            .await?;
        Ok(receipt)
    }

    /// Burns the caller's tokens towards `to` (raw recipient bytes on the other chain).
    pub async fn burn(&self, to: Vec<u8>, amount: U256) -> Result<TxReceipt> {
        let gateway = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(gateway), move |tx| {
                let caller = tx.sender();
                tx.gateway_burn(gateway, caller, to, amount)
            })
            .await?;
        Ok(receipt)
    }
}

/// Locks a native token and releases it against mint authority signatures.
#[derive(Debug, Clone)]
pub struct LockGateway {
    signer: Signer,
    address: Address,
}

impl LockGateway {
    pub fn attach(signer: &Signer, address: Address) -> Self {
        Self {
            signer: signer.clone(),
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn token(&self) -> Result<Address> {
        self.signer
            .chain()
            .view(|s| Ok(s.lock_gateway(&self.address)?.token))
            .await
    }

    /// Pulls `amount` from the caller (needs a prior `approve`).
    pub async fn lock(
        &self,
        recipient_address: &str,
        recipient_chain: &str,
        recipient_payload: Vec<u8>,
        amount: U256,
    ) -> Result<TxReceipt> {
        let gateway = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(gateway), move |tx| {
                let caller = tx.sender();
                tx.gateway_lock(
                    gateway,
                    caller,
                    recipient_address.to_string(),
                    recipient_chain.to_string(),
                    recipient_payload,
                    amount,
                )
            })
            .await?;
        Ok(receipt)
    }

    pub async fn release(
        &self,
        p_hash: H256,
        amount: U256,
        n_hash: H256,
        signature: &[u8],
    ) -> Result<TxReceipt> {
        let gateway = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(gateway), |tx| {
                let caller = tx.sender();
                tx.gateway_release(gateway, caller, p_hash, amount, n_hash, signature)
            })
            .await?;
        Ok(receipt)
    }
}

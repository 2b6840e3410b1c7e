//! ERC-20 binding, used for RenAsset proxies and test tokens alike.

use std::collections::HashMap;

use anyhow::Result;
use ethereum_types::{Address, U256};

use super::deploy_contract;
use crate::chain::state::{Contract, TokenState};
use crate::chain::{Signer, TxReceipt};

#[derive(Debug, Clone)]
pub struct Erc20 {
    signer: Signer,
    address: Address,
}

impl Erc20 {
    /// Deploys a fixed-supply `TestToken` with the whole supply held by `holder`.
    pub async fn deploy_test_token(
        signer: &Signer,
        name: &str,
        symbol: &str,
        decimals: u8,
        total_supply: U256,
        holder: Address,
    ) -> Result<Self> {
        let mut balances = HashMap::new();
        balances.insert(holder, total_supply);
        let contract = Contract::Token(TokenState {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            total_supply,
            balances,
            allowances: HashMap::new(),
            owner: None,
            beacon: None,
            version: None,
        });
        let (address, _) = deploy_contract(signer, contract).await?;
        Ok(Self::attach(signer, address))
    }

    pub fn attach(signer: &Signer, address: Address) -> Self {
        Self {
            signer: signer.clone(),
            address,
        }
    }

    pub fn connect(&self, signer: &Signer) -> Self {
        Self::attach(signer, self.address)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        self.signer
            .chain()
            .view(|s| s.balance_of(&self.address, &account))
            .await
    }

    pub async fn total_supply(&self) -> Result<U256> {
        self.signer
            .chain()
            .view(|s| Ok(s.token(&self.address)?.total_supply))
            .await
    }

    pub async fn decimals(&self) -> Result<u8> {
        self.signer
            .chain()
            .view(|s| Ok(s.token(&self.address)?.decimals))
            .await
    }

    pub async fn symbol(&self) -> Result<String> {
        self.signer
            .chain()
            .view(|s| Ok(s.token(&self.address)?.symbol.clone()))
            .await
    }

    /// Mint/burn authority (the owning gateway for RenAssets).
    pub async fn owner(&self) -> Result<Option<Address>> {
        self.signer
            .chain()
            .view(|s| Ok(s.token(&self.address)?.owner))
            .await
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        self.signer
            .chain()
            .view(|s| Ok(s.token(&self.address)?.allowance(&owner, &spender)))
            .await
    }

    pub async fn transfer(&self, to: Address, amount: U256) -> Result<TxReceipt> {
        let token = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(token), |tx| {
                let from = tx.sender();
                tx.token_transfer(token, from, to, amount)
            })
            .await?;
        Ok(receipt)
    }

    pub async fn approve(&self, spender: Address, amount: U256) -> Result<TxReceipt> {
        let token = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(token), |tx| {
                let owner = tx.sender();
                tx.token_approve(token, owner, spender, amount)
            })
            .await?;
        Ok(receipt)
    }
}

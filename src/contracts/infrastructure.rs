//! Bindings for the gateway infrastructure contracts: signature verifier,
//! transfer-with-log helper, implementation templates and proxy beacons.

use anyhow::Result;
use ethereum_types::{Address, H256};

use super::deploy_contract;
use crate::chain::state::{Contract, ImplementationKind, ProxyBeaconState, SignatureVerifierState};
use crate::chain::{Signer, TxReceipt};

/// `RenVMSignatureVerifier`: checks mint authority signatures for gateways.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    signer: Signer,
    address: Address,
}

impl SignatureVerifier {
    /// Deploys an uninitialised verifier.
    pub async fn deploy(signer: &Signer) -> Result<Self> {
        let contract = Contract::SignatureVerifier(SignatureVerifierState::default());
        let (address, _) = deploy_contract(signer, contract).await?;
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

    /// One-time initialiser.
    ///
    /// # Arguments
    ///
    /// * `chain_name` - Selector of the chain the verifier lives on (used in selector hashes)
    /// * `mint_authority` - Address whose signatures are accepted
    /// * `admin` - Account allowed to rotate the mint authority
    pub async fn initialize(
        &self,
        chain_name: &str,
        mint_authority: Address,
        admin: Address,
    ) -> Result<TxReceipt> {
        let verifier = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(verifier), |tx| {
                tx.verifier_initialize(verifier, chain_name, mint_authority, admin)
            })
            .await?;
        Ok(receipt)
    }

    pub async fn update_mint_authority(&self, mint_authority: Address) -> Result<TxReceipt> {
        let verifier = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(verifier), |tx| {
                let caller = tx.sender();
                tx.verifier_update_mint_authority(verifier, caller, mint_authority)
            })
            .await?;
        Ok(receipt)
    }

    pub async fn mint_authority(&self) -> Result<Address> {
        self.signer
            .chain()
            .view(|s| Ok(s.verifier(&self.address)?.mint_authority))
            .await
    }

    pub async fn chain_name(&self) -> Result<String> {
        self.signer
            .chain()
            .view(|s| Ok(s.verifier(&self.address)?.chain_name.clone()))
            .await
    }

    pub async fn is_valid_signature(&self, hash: &H256, signature: &[u8]) -> Result<bool> {
        self.signer
            .chain()
            .view(|s| s.is_valid_signature(&self.address, hash, signature))
            .await
    }
}

/// `TransferWithLog`: stateless helper registered in the registry.
#[derive(Debug, Clone)]
pub struct TransferWithLog {
    address: Address,
}

impl TransferWithLog {
    pub async fn deploy(signer: &Signer) -> Result<Self> {
        let (address, _) = deploy_contract(signer, Contract::TransferWithLog).await?;
        Ok(Self { address })
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

/// Logic template behind a beacon (RenAsset, MintGateway or LockGateway).
#[derive(Debug, Clone)]
pub struct Implementation {
    kind: ImplementationKind,
    address: Address,
}

impl Implementation {
    pub async fn deploy(signer: &Signer, kind: ImplementationKind) -> Result<Self> {
        let (address, _) = deploy_contract(signer, Contract::Implementation(kind)).await?;
        Ok(Self { kind, address })
    }

    pub fn kind(&self) -> ImplementationKind {
        self.kind
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

/// `ProxyBeacon`: points proxies at an implementation and gates who may
/// deploy new proxies.
#[derive(Debug, Clone)]
pub struct ProxyBeacon {
    signer: Signer,
    address: Address,
}

impl ProxyBeacon {
    /// Deploys a beacon owned by `signer`.
    pub async fn deploy(
        signer: &Signer,
        implementation: Address,
        proxy_deployer: Address,
    ) -> Result<Self> {
        let contract = Contract::ProxyBeacon(ProxyBeaconState {
            implementation,
            owner: signer.address(),
            proxy_deployer,
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

    pub fn address(&self) -> Address {
        self.address
    }

    /// Owner-only: changes the account allowed to deploy proxies.
    pub async fn update_proxy_deployer(&self, proxy_deployer: Address) -> Result<TxReceipt> {
        let beacon = self.address;
        let (_, receipt) = self
            .signer
            .send(Some(beacon), |tx| {
                let caller = tx.sender();
                tx.beacon_update_proxy_deployer(beacon, caller, proxy_deployer)
            })
            .await?;
        Ok(receipt)
    }

    pub async fn proxy_deployer(&self) -> Result<Address> {
        self.signer
            .chain()
            .view(|s| Ok(s.beacon(&self.address)?.proxy_deployer))
            .await
    }

    pub async fn implementation(&self) -> Result<Address> {
        self.signer
            .chain()
            .view(|s| Ok(s.beacon(&self.address)?.implementation))
            .await
    }

    pub async fn owner(&self) -> Result<Address> {
        self.signer
            .chain()
            .view(|s| Ok(s.beacon(&self.address)?.owner))
            .await
    }
}

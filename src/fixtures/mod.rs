//! Gateway Fixture Deployment Module
//!
//! Deploys a complete, fresh gateway environment on the local chain:
//! verifier, transfer helper, implementation templates, beacons, registry,
//! example bridge and one gateway per asset. Each step consumes addresses
//! produced by the steps before it. The first failing step aborts the whole
//! deployment; nothing is retried or rolled back.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use ethereum_types::Address;
use tracing::info;

use crate::chain::{LocalChain, Signer};
use crate::config::Config;
use crate::contracts::{
    BasicBridge, Erc20, GatewayEntry, GatewayRegistry, Implementation, ImplementationKind,
    ProxyBeacon, RegistryInit, SignatureVerifier, TransferWithLog,
};
use crate::network::{AssetSpec, NetworkConfig};

/// Version string passed to the registry for every gateway.
pub const GATEWAY_VERSION: &str = "1";

// ============================================================================
// DEPLOYMENT INPUT
// ============================================================================

/// What to deploy for one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployParams {
    /// Chain selector (e.g. "Ethereum"); also the verifier's chain name
    pub chain: String,
    /// Chain id handed to the registry
    pub chain_id: u64,
    /// Address whose signatures gateways accept
    pub mint_authority: Address,
    /// Assets that get a RenAsset and a MintGateway
    pub mint_assets: Vec<AssetSpec>,
    /// Assets that get a TestToken and a LockGateway
    pub lock_assets: Vec<AssetSpec>,
}

impl DeployParams {
    pub fn new(chain: &str, chain_id: u64, mint_authority: Address) -> Self {
        Self {
            chain: chain.to_string(),
            chain_id,
            mint_authority,
            mint_assets: Vec::new(),
            lock_assets: Vec::new(),
        }
    }

    pub fn with_mint_asset(mut self, asset: AssetSpec) -> Self {
        self.mint_assets.push(asset);
        self
    }

    pub fn with_lock_asset(mut self, asset: AssetSpec) -> Self {
        self.lock_assets.push(asset);
        self
    }
}

// ============================================================================
// DEPLOYED FIXTURE
// ============================================================================

/// Every contract of one deployed gateway environment.
#[derive(Debug, Clone)]
pub struct DeployedContracts {
    pub signature_verifier: SignatureVerifier,
    pub transfer_with_log: TransferWithLog,
    pub ren_asset_implementation: Implementation,
    pub mint_gateway_implementation: Implementation,
    pub lock_gateway_implementation: Implementation,
    pub ren_asset_beacon: ProxyBeacon,
    pub mint_gateway_beacon: ProxyBeacon,
    pub lock_gateway_beacon: ProxyBeacon,
    pub gateway_registry: GatewayRegistry,
    pub basic_bridge: BasicBridge,
    /// Symbol -> mint gateway and RenAsset
    pub mint_gateways: BTreeMap<String, GatewayEntry>,
    /// Symbol -> lock gateway and TestToken
    pub lock_gateways: BTreeMap<String, GatewayEntry>,
}

impl DeployedContracts {
    /// Every address in the fixture, for isolation checks.
    pub fn all_addresses(&self) -> Vec<Address> {
        let mut addresses = vec![
            self.signature_verifier.address(),
            self.transfer_with_log.address(),
            self.ren_asset_implementation.address(),
            self.mint_gateway_implementation.address(),
            self.lock_gateway_implementation.address(),
            self.ren_asset_beacon.address(),
            self.mint_gateway_beacon.address(),
            self.lock_gateway_beacon.address(),
            self.gateway_registry.address(),
            self.basic_bridge.address(),
        ];
        for entry in self.mint_gateways.values().chain(self.lock_gateways.values()) {
            addresses.push(entry.gateway);
            addresses.push(entry.token);
        }
        addresses
    }
}

/// A deployed gateway environment and the network config describing it.
#[derive(Debug, Clone)]
pub struct GatewayFixture {
    pub network: NetworkConfig,
    pub contracts: DeployedContracts,
}

impl GatewayFixture {
    /// Deploys a fresh gateway environment from `deployer`.
    ///
    /// # Arguments
    ///
    /// * `deployer` - Account that deploys, owns and administers everything
    /// * `params` - Chain name, chain id, mint authority and assets
    ///
    /// # Returns
    ///
    /// * `Ok(GatewayFixture)` - All deployed contracts plus the `NetworkConfig`
    /// * `Err(anyhow::Error)` - The first deployment step that failed
    pub async fn deploy(deployer: &Signer, params: &DeployParams) -> Result<Self> {
        let chain = params.chain.as_str();
        info!("Deploying gateway contracts for {} (chain id {})", chain, params.chain_id);

        // 1. Signature verifier
        let signature_verifier = SignatureVerifier::deploy(deployer)
            .await
            .context("Failed to deploy signature verifier")?;
        signature_verifier
            .initialize(chain, params.mint_authority, deployer.address())
            .await
            .context("Failed to initialize signature verifier")?;
        info!(
            "  RenVMSignatureVerifier: {:#x} (mint authority {:#x})",
            signature_verifier.address(),
            params.mint_authority
        );

        // 2. Transfer helper
        let transfer_with_log = TransferWithLog::deploy(deployer)
            .await
            .context("Failed to deploy TransferWithLog")?;

        // 3. Implementation templates
        let ren_asset_implementation = Implementation::deploy(deployer, ImplementationKind::RenAsset)
            .await
            .context("Failed to deploy RenAsset implementation")?;
        let mint_gateway_implementation =
            Implementation::deploy(deployer, ImplementationKind::MintGateway)
                .await
                .context("Failed to deploy MintGateway implementation")?;
        let lock_gateway_implementation =
            Implementation::deploy(deployer, ImplementationKind::LockGateway)
                .await
                .context("Failed to deploy LockGateway implementation")?;

        // 4. Beacons, with the deployer as initial proxy deployer
        let ren_asset_beacon =
            ProxyBeacon::deploy(deployer, ren_asset_implementation.address(), deployer.address())
                .await
                .context("Failed to deploy RenAsset beacon")?;
        let mint_gateway_beacon =
            ProxyBeacon::deploy(deployer, mint_gateway_implementation.address(), deployer.address())
                .await
                .context("Failed to deploy MintGateway beacon")?;
        let lock_gateway_beacon =
            ProxyBeacon::deploy(deployer, lock_gateway_implementation.address(), deployer.address())
                .await
                .context("Failed to deploy LockGateway beacon")?;

        // 5. Registry
        let gateway_registry = GatewayRegistry::deploy(deployer)
            .await
            .context("Failed to deploy gateway registry")?;
        gateway_registry
            .initialize(RegistryInit {
                chain_id: params.chain_id,
                signature_verifier: signature_verifier.address(),
                transfer_contract: transfer_with_log.address(),
                ren_asset_beacon: ren_asset_beacon.address(),
                mint_gateway_beacon: mint_gateway_beacon.address(),
                lock_gateway_beacon: lock_gateway_beacon.address(),
                owner: deployer.address(),
                signers: vec![deployer.address()],
            })
            .await
            .context("Failed to initialize gateway registry")?;
        info!("  GatewayRegistry: {:#x}", gateway_registry.address());

        // 6. Hand proxy deployment over to the registry
        for beacon in [&ren_asset_beacon, &mint_gateway_beacon, &lock_gateway_beacon] {
            beacon
                .update_proxy_deployer(gateway_registry.address())
                .await
                .with_context(|| {
                    format!("Failed to update proxy deployer of beacon {:#x}", beacon.address())
                })?;
        }

        // 7. Example bridge
        let basic_bridge = BasicBridge::deploy(deployer, gateway_registry.address())
            .await
            .context("Failed to deploy BasicBridge")?;
        info!("  BasicBridge: {:#x}", basic_bridge.address());

        // 8. Mint assets
        let mut mint_gateways = BTreeMap::new();
        for asset in &params.mint_assets {
            let entry = gateway_registry
                .deploy_mint_gateway_and_ren_asset(
                    &asset.symbol,
                    &asset.symbol,
                    &asset.symbol,
                    asset.decimals,
                    GATEWAY_VERSION,
                )
                .await
                .with_context(|| format!("Failed to deploy mint gateway for {}", asset.symbol))?;
            info!(
                "  MintGateway {}: {:#x} (RenAsset {:#x})",
                asset.symbol, entry.gateway, entry.token
            );
            mint_gateways.insert(asset.symbol.clone(), entry);
        }

        // 9. Lock assets
        let mut lock_gateways = BTreeMap::new();
        for asset in &params.lock_assets {
            let total_supply = asset.total_supply.ok_or_else(|| {
                anyhow::anyhow!("Lock asset {} has no total supply", asset.symbol)
            })?;
            let token = Erc20::deploy_test_token(
                deployer,
                &asset.symbol,
                &asset.symbol,
                asset.decimals,
                total_supply,
                deployer.address(),
            )
            .await
            .with_context(|| format!("Failed to deploy test token {}", asset.symbol))?;
            let entry = gateway_registry
                .deploy_lock_gateway(&asset.symbol, token.address(), GATEWAY_VERSION)
                .await
                .with_context(|| format!("Failed to deploy lock gateway for {}", asset.symbol))?;
            info!(
                "  LockGateway {}: {:#x} (token {:#x})",
                asset.symbol, entry.gateway, entry.token
            );
            lock_gateways.insert(asset.symbol.clone(), entry);
        }

        // 10. Network config
        let network_id = deployer.get_network().await.unwrap_or(0);
        let network = NetworkConfig::local(
            chain,
            network_id,
            deployer.chain().rpc_url(),
            gateway_registry.address(),
            basic_bridge.address(),
        );

        Ok(Self {
            network,
            contracts: DeployedContracts {
                signature_verifier,
                transfer_with_log,
                ren_asset_implementation,
                mint_gateway_implementation,
                lock_gateway_implementation,
                ren_asset_beacon,
                mint_gateway_beacon,
                lock_gateway_beacon,
                gateway_registry,
                basic_bridge,
                mint_gateways,
                lock_gateways,
            },
        })
    }
}

/// Deploys a gateway environment and returns only its `NetworkConfig`.
pub async fn deploy_gateway_sol(deployer: &Signer, params: &DeployParams) -> Result<NetworkConfig> {
    Ok(GatewayFixture::deploy(deployer, params).await?.network)
}

/// Deploys every chain listed in `config.chains` from the first signer.
pub async fn deploy_from_config(
    chain: &LocalChain,
    config: &Config,
    mint_authority: Address,
) -> Result<Vec<GatewayFixture>> {
    let deployer = chain.signer(0)?;
    let mut fixtures = Vec::with_capacity(config.chains.len());
    for deployment in &config.chains {
        let params = DeployParams {
            chain: deployment.name.clone(),
            chain_id: deployment.chain_id,
            mint_authority,
            mint_assets: deployment.mint_assets.clone(),
            lock_assets: deployment.lock_assets.clone(),
        };
        fixtures.push(GatewayFixture::deploy(&deployer, &params).await?);
    }
    Ok(fixtures)
}

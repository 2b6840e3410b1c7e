//! Shared test helpers for integration tests
//!
//! This module provides helper functions used by the integration tests.
//!
//! The module is organized into several categories:
//! - **Constants**: Fixed keys, chain ids, seeds and amounts
//! - **Builders**: Local chain, mock provider and deployment parameters
//! - **Environments**: Fully deployed chains wired into an SDK bridge

use ethereum_types::U256;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bridge_harness::chain::{LocalChain, Signer};
use bridge_harness::config::Config;
use bridge_harness::crypto::MintAuthority;
use bridge_harness::fixtures::{DeployParams, GatewayFixture};
use bridge_harness::network::AssetSpec;
use bridge_harness::sdk::{Bridge, EvmChain, FeeSchedule, MockChain, MockProvider};

// ============================================================================
// CONSTANTS
// ============================================================================

// --------------------------------- KEYS ---------------------------------

/// Dummy mint authority private key (hex, 32 bytes)
pub const DUMMY_MINT_AUTHORITY_KEY: &str =
    "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// Second dummy key, for signatures that must not verify
pub const DUMMY_OTHER_AUTHORITY_KEY: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000002";

// -------------------------------- CHAINS --------------------------------

pub const ETHEREUM: &str = "Ethereum";
pub const POLYGON: &str = "Polygon";
pub const BITCOIN: &str = "Bitcoin";

/// Registry chain id of the Ethereum fixture
pub const DUMMY_ETHEREUM_CHAIN_ID: u64 = 1;

/// Registry chain id of the Polygon fixture
pub const DUMMY_POLYGON_CHAIN_ID: u64 = 2;

// ------------------------------- AMOUNTS --------------------------------

/// Seed for reproducible "random" transfer amounts
pub const DUMMY_SEED: u64 = 0x5eed;

/// 0.003 BTC in sats
pub const DUMMY_BTC_AMOUNT_SATS: u64 = 300_000;

/// Fixed fee of the mock verification network, in the asset's smallest unit
pub const DUMMY_FIXED_FEE: u64 = 1000;

/// Proportional fee of the mock verification network, in bips
pub const DUMMY_PERCENT_FEE_BIPS: u64 = 15;

/// Whole DAI minted to the deployer on the Ethereum fixture
pub const DUMMY_DAI_SUPPLY: u64 = 1000;

// ============================================================================
// BUILDERS
// ============================================================================

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// Fresh local chain with the default 20 accounts and network id 31337.
pub fn build_test_chain() -> LocalChain {
    LocalChain::new(&Config::default().local_chain)
}

/// Mock provider with the dummy mint authority and default fees.
pub fn build_test_provider() -> MockProvider {
    let authority = MintAuthority::from_hex(DUMMY_MINT_AUTHORITY_KEY).unwrap();
    MockProvider::with_authority(authority, FeeSchedule::default())
}

/// `amount` whole tokens with `decimals` decimals.
pub fn whole(amount: u64, decimals: usize) -> U256 {
    U256::from(amount) * U256::exp10(decimals)
}

/// Seeded RNG so amounts are reproducible across runs.
pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(DUMMY_SEED)
}

/// Random BTC amount in sats, well above the fixed fee.
pub fn random_sats(rng: &mut StdRng) -> u64 {
    rng.gen_range(10_000..100_000_000)
}

/// Expected output after the fixed and proportional fee:
/// `ceil((a - f) * (10000 - p) / 10000)`.
pub fn expected_after_fees(amount: u64) -> U256 {
    let after_fixed = U256::from(amount.saturating_sub(DUMMY_FIXED_FEE));
    let scaled = after_fixed * U256::from(10_000 - DUMMY_PERCENT_FEE_BIPS);
    (scaled + U256::from(9_999u64)) / U256::from(10_000u64)
}

/// Ethereum: BTC and ZEC minted, DAI locked with a supply of 1000 DAI.
pub fn ethereum_params(provider: &MockProvider) -> DeployParams {
    DeployParams::new(ETHEREUM, DUMMY_ETHEREUM_CHAIN_ID, provider.mint_authority())
        .with_mint_asset(AssetSpec::mint("BTC", 8))
        .with_mint_asset(AssetSpec::mint("ZEC", 8))
        .with_lock_asset(AssetSpec::lock("DAI", 18, whole(DUMMY_DAI_SUPPLY, 18)))
}

/// Polygon: BTC, ZEC and DAI all minted.
pub fn polygon_params(provider: &MockProvider) -> DeployParams {
    DeployParams::new(POLYGON, DUMMY_POLYGON_CHAIN_ID, provider.mint_authority())
        .with_mint_asset(AssetSpec::mint("BTC", 8))
        .with_mint_asset(AssetSpec::mint("ZEC", 8))
        .with_mint_asset(AssetSpec::mint("DAI", 18))
}

// ============================================================================
// ENVIRONMENTS
// ============================================================================

/// Chain, provider, deployer and user shared by every environment.
pub struct TestEnv {
    pub chain: LocalChain,
    pub provider: MockProvider,
    pub deployer: Signer,
    pub user: Signer,
}

impl TestEnv {
    pub fn new() -> Self {
        init_tracing();
        let chain = build_test_chain();
        let deployer = chain.signer(0).unwrap();
        let user = chain.signer(1).unwrap();
        Self {
            chain,
            provider: build_test_provider(),
            deployer,
            user,
        }
    }

    /// Deploys `params` from the deployer.
    pub async fn deploy(&self, params: &DeployParams) -> GatewayFixture {
        GatewayFixture::deploy(&self.deployer, params).await.unwrap()
    }

    /// SDK binding of a deployed fixture, signing as the user.
    pub fn evm_chain(&self, fixture: &GatewayFixture) -> EvmChain {
        EvmChain::new(fixture.network.clone(), self.user.clone())
    }
}

/// Mock Bitcoin chain registered with both the bridge and the provider.
pub async fn bitcoin_bridge(env: &TestEnv) -> (Bridge, MockChain) {
    let bitcoin = MockChain::default();
    env.provider.register_chain(bitcoin.chain()).await;
    let bridge = Bridge::new(env.provider.clone()).with_chain(bitcoin.clone());
    (bridge, bitcoin)
}

/// Registers EVM chains with the provider and returns a bridge knowing them.
pub async fn evm_bridge(env: &TestEnv, chains: &[&EvmChain]) -> Bridge {
    let mut bridge = Bridge::new(env.provider.clone());
    for chain in chains {
        env.provider.register_chain(chain.name()).await;
        bridge = bridge.with_chain((*chain).clone());
    }
    bridge
}

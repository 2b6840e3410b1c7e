//! Integration tests for lock-and-mint into the Adapter contract
//!
//! A mock Bitcoin deposit is minted on the Ethereum fixture through the
//! Adapter's `deposit` method and the credited balance is checked against the
//! fee-adjusted amount.

use ethereum_types::U256;

use bridge_harness::contracts::Adapter;
use bridge_harness::flow::process_deposit;
use bridge_harness::fixtures::{DeployParams, GatewayFixture};
use bridge_harness::network::AssetSpec;
use bridge_harness::sdk::{ContractCall, EvmParam, LockAndMintParams};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    bitcoin_bridge, expected_after_fees, random_sats, seeded_rng, TestEnv,
    DUMMY_BTC_AMOUNT_SATS, DUMMY_ETHEREUM_CHAIN_ID, ETHEREUM,
};

/// Ethereum fixture with BTC and ZEC, plus an Adapter wired to its registry.
async fn deploy_adapter(env: &TestEnv) -> (GatewayFixture, Adapter) {
    let params = DeployParams::new(ETHEREUM, DUMMY_ETHEREUM_CHAIN_ID, env.provider.mint_authority())
        .with_mint_asset(AssetSpec::mint("BTC", 8))
        .with_mint_asset(AssetSpec::mint("ZEC", 8));
    let fixture = env.deploy(&params).await;
    let adapter = Adapter::deploy(&env.deployer, fixture.contracts.gateway_registry.address())
        .await
        .unwrap();
    (fixture, adapter)
}

/// Mints `sats` into the adapter and returns its balance delta.
async fn mint_into_adapter(env: &TestEnv, sats: u64) -> U256 {
    let (fixture, adapter) = deploy_adapter(env).await;
    let (bridge, bitcoin) = bitcoin_bridge(env).await;
    let ethereum = env.evm_chain(&fixture);

    let btc_amount = sats as f64 / 1e8;
    let call = ContractCall::new(adapter.address(), "deposit")
        .with_ren_params()
        .param(EvmParam::bytes(
            "_msg",
            format!("Depositing {} BTC", btc_amount).into_bytes(),
        ));
    let mint = bridge
        .lock_and_mint(LockAndMintParams::new("BTC", bitcoin.clone(), ethereum.contract(call)))
        .await
        .unwrap();

    bitcoin.add_utxo(mint.gateway_address(), sats).await;

    let balance_before = adapter.balance().await.unwrap();
    process_deposit(&mint).await.unwrap();
    let balance_after = adapter.balance().await.unwrap();

    balance_after - balance_before
}

/// 1. Test: Random Deposit Mint
/// Verifies that a random BTC deposit credits the adapter with the amount net of fees.
/// Why: The adapter balance is the end-to-end signal that signing, payload hashing
/// and the gateway mint all agree.
#[tokio::test]
async fn test_adapter_mints_random_deposit() {
    let env = TestEnv::new();
    let sats = random_sats(&mut seeded_rng());

    let delta = mint_into_adapter(&env, sats).await;

    assert_eq!(delta, expected_after_fees(sats));
}

/// 2. Test: Fixed Deposit Mint
/// Verifies that 0.003 BTC (300000 sats) credits exactly 298552 sats.
/// Why: A literal expectation pins the rounding of the proportional fee.
#[tokio::test]
async fn test_adapter_mints_fixed_deposit() {
    let env = TestEnv::new();

    let delta = mint_into_adapter(&env, DUMMY_BTC_AMOUNT_SATS).await;

    assert_eq!(delta, U256::from(298_552u64));
    assert_eq!(delta, expected_after_fees(DUMMY_BTC_AMOUNT_SATS));
}

/// 3. Test: Deposit Address Depends On Recipient
/// Verifies that two adapters get distinct deposit addresses.
/// Why: The gateway hash binds the destination; sharing an address would let one
/// deposit be minted to either contract.
#[tokio::test]
async fn test_deposit_address_is_bound_to_destination() {
    let env = TestEnv::new();
    let (fixture, adapter) = deploy_adapter(&env).await;
    let other = Adapter::deploy(&env.deployer, fixture.contracts.gateway_registry.address())
        .await
        .unwrap();
    let (bridge, bitcoin) = bitcoin_bridge(&env).await;
    let ethereum = env.evm_chain(&fixture);

    let call = |to| {
        ContractCall::new(to, "deposit")
            .with_ren_params()
            .param(EvmParam::bytes("_msg", b"hello".to_vec()))
    };
    let first = bridge
        .lock_and_mint(LockAndMintParams::new(
            "BTC",
            bitcoin.clone(),
            ethereum.contract(call(adapter.address())),
        ))
        .await
        .unwrap();
    let second = bridge
        .lock_and_mint(LockAndMintParams::new(
            "BTC",
            bitcoin.clone(),
            ethereum.contract(call(other.address())),
        ))
        .await
        .unwrap();

    assert_ne!(first.gateway_address(), second.gateway_address());
}

/// 4. Test: Deposit Below Fixed Fee
/// Verifies that a deposit not covering the fixed fee rejects the driver and mints nothing.
/// Why: The driver must surface the verification network's rejection instead of hanging.
#[tokio::test]
async fn test_deposit_below_fixed_fee_is_rejected() {
    let env = TestEnv::new();
    let (fixture, adapter) = deploy_adapter(&env).await;
    let (bridge, bitcoin) = bitcoin_bridge(&env).await;
    let ethereum = env.evm_chain(&fixture);

    let call = ContractCall::new(adapter.address(), "deposit")
        .with_ren_params()
        .param(EvmParam::bytes("_msg", b"dust".to_vec()));
    let mint = bridge
        .lock_and_mint(LockAndMintParams::new("BTC", bitcoin.clone(), ethereum.contract(call)))
        .await
        .unwrap();
    bitcoin.add_utxo(mint.gateway_address(), 999).await;

    let err = process_deposit(&mint).await.unwrap_err();
    assert!(err.to_string().contains("does not cover fees"));
    assert_eq!(adapter.balance().await.unwrap(), U256::zero());
}

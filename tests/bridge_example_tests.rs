//! Integration tests for EVM to EVM transfers through BridgeExample
//!
//! DAI is locked on the Ethereum fixture and minted into the Polygon
//! BridgeExample contract (deposit), then burned by that contract and released
//! to the user on Ethereum (withdraw).

use ethereum_types::U256;

use bridge_harness::contracts::{BridgeExample, Erc20};
use bridge_harness::fixtures::GatewayFixture;
use bridge_harness::flow::process_transaction;
use bridge_harness::sdk::{Bridge, ContractCall, EvmChain, EvmParam, GatewayParams, Route};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{ethereum_params, evm_bridge, polygon_params, random_sats, seeded_rng, TestEnv};

const ASSET: &str = "DAI";

/// Both fixtures, a BridgeExample per chain, the user's chain bindings and the
/// Ethereum DAI token.
struct BridgeExampleEnv {
    env: TestEnv,
    polygon_bridge_example: BridgeExample,
    ethereum: EvmChain,
    polygon: EvmChain,
    bridge: Bridge,
    dai: Erc20,
}

async fn setup() -> BridgeExampleEnv {
    let env = TestEnv::new();
    let ethereum_fixture: GatewayFixture = env.deploy(&ethereum_params(&env.provider)).await;
    let polygon_fixture = env.deploy(&polygon_params(&env.provider)).await;

    let dai_address = ethereum_fixture
        .contracts
        .gateway_registry
        .get_lock_asset_by_symbol(ASSET)
        .await
        .unwrap()
        .unwrap();
    let dai = Erc20::attach(&env.deployer, dai_address);

    BridgeExample::deploy(&env.deployer, ethereum_fixture.contracts.gateway_registry.address())
        .await
        .unwrap();
    let polygon_bridge_example =
        BridgeExample::deploy(&env.deployer, polygon_fixture.contracts.gateway_registry.address())
            .await
            .unwrap();

    let ethereum = env.evm_chain(&ethereum_fixture);
    let polygon = env.evm_chain(&polygon_fixture);
    let bridge = evm_bridge(&env, &[&ethereum, &polygon]).await;

    BridgeExampleEnv {
        env,
        polygon_bridge_example,
        ethereum,
        polygon,
        bridge,
        dai,
    }
}

/// Locks `amount` DAI on Ethereum into the Polygon BridgeExample.
/// Returns the bridge's balance delta and the quoted output.
async fn deposit(ctx: &BridgeExampleEnv, amount: U256) -> (U256, U256) {
    ctx.dai.transfer(ctx.env.user.address(), amount).await.unwrap();

    let call = ContractCall::new(ctx.polygon_bridge_example.address(), "deposit")
        .with_ren_params()
        .param(EvmParam::string("asset", ASSET))
        .param(EvmParam::bytes(
            "msg",
            format!("Depositing {} {}", amount, ASSET).into_bytes(),
        ));
    let gateway = ctx
        .bridge
        .gateway(GatewayParams::new(
            ASSET,
            ctx.ethereum.account_with_amount(amount),
            ctx.polygon.contract(call),
        ))
        .await
        .unwrap();
    assert_eq!(gateway.route(), Route::LockAndMint);

    for step in gateway.in_setup() {
        step.submit().await.unwrap();
        step.wait().await.unwrap();
    }

    let balance_before = ctx.polygon_bridge_example.balance(ASSET).await.unwrap();

    gateway.in_tx().submit().await.unwrap();
    gateway.in_tx().wait(1).await.unwrap();

    process_transaction(&gateway).await.unwrap();

    let balance_after = ctx.polygon_bridge_example.balance(ASSET).await.unwrap();
    (
        balance_after - balance_before,
        gateway.fees().estimate_output(amount),
    )
}

/// Burns the Polygon BridgeExample's whole DAI balance back to the user on
/// Ethereum. Returns (amount burned, bridge balance decrease, user increase).
async fn withdraw(ctx: &BridgeExampleEnv) -> (U256, U256, U256) {
    let amount = ctx.polygon_bridge_example.balance(ASSET).await.unwrap();

    let call = ContractCall::new(ctx.polygon_bridge_example.address(), "withdraw")
        .param(EvmParam::string("asset", ASSET))
        .param(EvmParam::bytes(
            "msg",
            format!("Withdrawing {} {}", amount, ASSET).into_bytes(),
        ))
        .param(EvmParam::to_address_bytes("to"))
        .param(EvmParam::uint256("amount", amount));
    let gateway = ctx
        .bridge
        .gateway(GatewayParams::new(
            ASSET,
            ctx.polygon.contract(call),
            ctx.ethereum.account(),
        ))
        .await
        .unwrap();
    assert_eq!(gateway.route(), Route::BurnAndRelease);
    assert!(gateway.in_setup().is_empty());

    let bridge_before = ctx.polygon_bridge_example.balance(ASSET).await.unwrap();
    let user_before = ctx.dai.balance_of(ctx.env.user.address()).await.unwrap();

    gateway.in_tx().submit().await.unwrap();
    gateway.in_tx().wait(1).await.unwrap();

    process_transaction(&gateway).await.unwrap();

    let bridge_after = ctx.polygon_bridge_example.balance(ASSET).await.unwrap();
    let user_after = ctx.dai.balance_of(ctx.env.user.address()).await.unwrap();
    (amount, bridge_before - bridge_after, user_after - user_before)
}

/// 1. Test: DAI Deposit
/// Verifies that locking DAI on Ethereum credits the Polygon BridgeExample with the
/// fee-adjusted amount quoted by the gateway.
/// Why: This is the lock-and-mint route end to end: approval, lock log detection,
/// signing and the contract call with ren params.
#[tokio::test]
async fn test_bridge_example_deposit() {
    let ctx = setup().await;
    let amount = U256::from(random_sats(&mut seeded_rng()));

    let (delta, expected) = deposit(&ctx, amount).await;

    assert_eq!(delta, expected);
    assert!(delta < amount);
}

/// 2. Test: DAI Withdraw
/// Verifies that burning the bridge's DAI on Polygon releases the burned amount to
/// the user on Ethereum.
/// Why: Exercises the burn-and-release route and the destination address
/// placeholder in the source call.
#[tokio::test]
async fn test_bridge_example_withdraw() {
    let ctx = setup().await;
    deposit(&ctx, U256::from(random_sats(&mut seeded_rng()))).await;

    let (amount, bridge_decrease, user_increase) = withdraw(&ctx).await;

    assert!(!amount.is_zero());
    assert_eq!(bridge_decrease, amount);
    assert_eq!(user_increase, amount);
    assert_eq!(ctx.polygon_bridge_example.balance(ASSET).await.unwrap(), U256::zero());
}

/// 3. Test: Withdraw Release Fee
/// Verifies that the released amount is the fee-adjusted burn amount.
/// Why: The mock verification network does not charge release fees yet, so the
/// user receives the full burned amount and this expectation fails.
#[tokio::test]
#[ignore = "mock provider does not model release fees"]
async fn test_bridge_example_withdraw_release_fee() {
    let ctx = setup().await;
    deposit(&ctx, U256::from(random_sats(&mut seeded_rng()))).await;
    let quoted = ctx.env.provider.fees();

    let (amount, _, user_increase) = withdraw(&ctx).await;

    assert_eq!(user_increase, quoted.estimate_output(amount));
}

/// 4. Test: Source Transaction Detection
/// Verifies that the detected transaction carries the locked amount and source hash.
/// Why: The nonce hash and the signed amount are both derived from the source log.
#[tokio::test]
async fn test_detected_transaction_matches_source_log() {
    let ctx = setup().await;
    let amount = U256::from(123_456u64);
    ctx.dai.transfer(ctx.env.user.address(), amount).await.unwrap();

    let gateway = ctx
        .bridge
        .gateway(GatewayParams::new(
            ASSET,
            ctx.ethereum.account_with_amount(amount),
            ctx.polygon.account(),
        ))
        .await
        .unwrap();
    for step in gateway.in_setup() {
        step.submit().await.unwrap();
        step.wait().await.unwrap();
    }
    let receipt = gateway.in_tx().submit().await.unwrap();

    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    gateway
        .on("transaction", move |tx| {
            let sender = sender.clone();
            async move {
                let _ = sender.send((tx.in_tx.tx_hash(), tx.in_tx.amount()));
            }
        })
        .await;

    let (tx_hash, detected_amount) = receiver.recv().await.unwrap();
    assert_eq!(tx_hash, receipt.tx_hash);
    assert_eq!(detected_amount, amount);
}

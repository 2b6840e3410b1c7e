//! Integration tests for the bridging SDK
//!
//! These tests cover route detection, request validation and the ordering
//! guarantees of deposit and transaction stages.

use std::time::Duration;

use ethereum_types::{H256, U256};
use tokio::sync::mpsc;

use bridge_harness::error::SdkError;
use bridge_harness::fixtures::DeployParams;
use bridge_harness::network::AssetSpec;
use bridge_harness::sdk::{
    Bridge, ContractCall, DepositHandle, DepositStatus, EvmParam, GatewayParams,
    GatewayTransaction, LockAndMintParams, MockChain, Route,
};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    bitcoin_bridge, ethereum_params, evm_bridge, polygon_params, TestEnv, DUMMY_BTC_AMOUNT_SATS,
    ETHEREUM,
};

/// Downcasts an SDK failure, panicking with the full chain otherwise.
fn sdk_error(err: anyhow::Error) -> SdkError {
    match err.downcast_ref::<SdkError>() {
        Some(e) => e.clone(),
        None => panic!("expected SdkError, got {:#}", err),
    }
}

/// Receives the first "deposit" of a lock-and-mint to the user's Ethereum account.
async fn first_deposit(env: &TestEnv, sats: u64) -> DepositHandle {
    let fixture = env.deploy(&ethereum_params(&env.provider)).await;
    let ethereum = env.evm_chain(&fixture);
    let (bridge, bitcoin) = bitcoin_bridge(env).await;
    let mint = bridge
        .lock_and_mint(LockAndMintParams::new("BTC", bitcoin.clone(), ethereum.account()))
        .await
        .unwrap();
    bitcoin.add_utxo(mint.gateway_address(), sats).await;

    let (sender, mut receiver) = mpsc::unbounded_channel();
    mint.on("deposit", move |deposit| {
        let sender = sender.clone();
        async move {
            let _ = sender.send(deposit);
        }
    })
    .await;
    receiver.recv().await.unwrap()
}

/// 1. Test: Unknown Source Chain
/// Verifies that lock-and-mint from a chain the bridge does not know fails.
/// Why: Chains must be registered before transfers can use them.
#[tokio::test]
async fn test_lock_and_mint_from_unknown_chain() {
    let env = TestEnv::new();
    let fixture = env.deploy(&ethereum_params(&env.provider)).await;
    let bridge = Bridge::new(env.provider.clone());

    let err = bridge
        .lock_and_mint(LockAndMintParams::new(
            "BTC",
            MockChain::default(),
            env.evm_chain(&fixture).account(),
        ))
        .await
        .err()
        .unwrap();

    assert_eq!(sdk_error(err), SdkError::UnknownChain("Bitcoin".to_string()));
}

/// 2. Test: Unsupported Assets
/// Verifies that assets the source chain does not carry, or the destination has no
/// gateway for, are rejected.
/// Why: Failing early beats a deposit address nobody can mint from.
#[tokio::test]
async fn test_lock_and_mint_unsupported_assets() {
    let env = TestEnv::new();
    let fixture = env.deploy(&ethereum_params(&env.provider)).await;
    let ethereum = env.evm_chain(&fixture);
    let litecoin = MockChain::new("Litecoin", "LTC", 8);
    let bridge = Bridge::new(env.provider.clone())
        .with_chain(MockChain::default())
        .with_chain(litecoin.clone());

    let err = bridge
        .lock_and_mint(LockAndMintParams::new("ZEC", MockChain::default(), ethereum.account()))
        .await
        .err()
        .unwrap();
    assert!(matches!(sdk_error(err), SdkError::UnsupportedAsset { ref asset, ref chain }
        if asset == "ZEC" && chain == "Bitcoin"));

    let err = bridge
        .lock_and_mint(LockAndMintParams::new("LTC", litecoin, ethereum.account()))
        .await
        .err()
        .unwrap();
    assert!(matches!(sdk_error(err), SdkError::UnsupportedAsset { ref asset, ref chain }
        if asset == "LTC" && chain == ETHEREUM));
}

/// 3. Test: Destination Call Without Ren Params
/// Verifies that a destination contract call must accept amount, nHash and signature.
/// Why: Without them the minted amount cannot be delivered to the contract.
#[tokio::test]
async fn test_destination_call_requires_ren_params() {
    let env = TestEnv::new();
    let fixture = env.deploy(&ethereum_params(&env.provider)).await;
    let ethereum = env.evm_chain(&fixture);
    let (bridge, bitcoin) = bitcoin_bridge(&env).await;

    let call = ContractCall::new(fixture.contracts.basic_bridge.address(), "mint")
        .param(EvmParam::string("symbol", "BTC"));
    let err = bridge
        .lock_and_mint(LockAndMintParams::new("BTC", bitcoin, ethereum.contract(call)))
        .await
        .err()
        .unwrap();

    assert!(matches!(sdk_error(err), SdkError::UnsupportedRoute(_)));
}

/// 4. Test: Route Detection
/// Verifies that routes follow how the asset exists on each side.
/// Why: The route decides between lock, burn, mint and release calls.
#[tokio::test]
async fn test_gateway_route_detection() {
    let env = TestEnv::new();
    let ethereum = env.evm_chain(&env.deploy(&ethereum_params(&env.provider)).await);
    let polygon = env.evm_chain(&env.deploy(&polygon_params(&env.provider)).await);
    let fantom = env.evm_chain(
        &env.deploy(
            &DeployParams::new("Fantom", 250, env.provider.mint_authority())
                .with_lock_asset(AssetSpec::lock("DAI", 18, U256::from(1_000u64))),
        )
        .await,
    );
    let bridge = evm_bridge(&env, &[&ethereum, &polygon, &fantom]).await;
    let amount = U256::from(1_000_000u64);

    let lock_and_mint = bridge
        .gateway(GatewayParams::new(
            "DAI",
            ethereum.account_with_amount(amount),
            polygon.account(),
        ))
        .await
        .unwrap();
    assert_eq!(lock_and_mint.route(), Route::LockAndMint);
    assert_eq!(lock_and_mint.in_setup().len(), 1);
    assert_eq!(lock_and_mint.in_setup()[0].name(), "approval");

    let burn_and_release = bridge
        .gateway(GatewayParams::new(
            "DAI",
            polygon.account_with_amount(amount),
            ethereum.account(),
        ))
        .await
        .unwrap();
    assert_eq!(burn_and_release.route(), Route::BurnAndRelease);
    assert!(burn_and_release.in_setup().is_empty());

    let burn_and_mint = bridge
        .gateway(GatewayParams::new(
            "BTC",
            ethereum.account_with_amount(amount),
            polygon.account(),
        ))
        .await
        .unwrap();
    assert_eq!(burn_and_mint.route(), Route::BurnAndMint);

    let err = bridge
        .gateway(GatewayParams::new(
            "DAI",
            ethereum.account_with_amount(amount),
            fantom.account(),
        ))
        .await
        .err()
        .unwrap();
    assert!(matches!(sdk_error(err), SdkError::UnsupportedRoute(_)));

    let err = bridge
        .gateway(GatewayParams::new("DAI", ethereum.account(), polygon.account()))
        .await
        .err()
        .unwrap();
    assert!(matches!(sdk_error(err), SdkError::UnsupportedRoute(_)));
}

/// 5. Test: Gateway With Unknown Chain
/// Verifies that both ends of a gateway must be registered with the bridge.
/// Why: Same registration rule as lock-and-mint.
#[tokio::test]
async fn test_gateway_requires_registered_chains() {
    let env = TestEnv::new();
    let ethereum = env.evm_chain(&env.deploy(&ethereum_params(&env.provider)).await);
    let polygon = env.evm_chain(&env.deploy(&polygon_params(&env.provider)).await);
    let bridge = Bridge::new(env.provider.clone()).with_chain(ethereum.clone());

    let err = bridge
        .gateway(GatewayParams::new(
            "BTC",
            ethereum.account_with_amount(U256::from(10_000u64)),
            polygon.account(),
        ))
        .await
        .err()
        .unwrap();

    assert_eq!(sdk_error(err), SdkError::UnknownChain("Polygon".to_string()));
}

/// 6. Test: Deposit Stage Order
/// Verifies that deposit stages fail when called early and that minting twice fails.
/// Why: Out-of-order calls must error instead of silently waiting.
#[tokio::test]
async fn test_deposit_stages_enforce_order() {
    let env = TestEnv::new();
    let deposit = first_deposit(&env, DUMMY_BTC_AMOUNT_SATS).await;
    assert_eq!(deposit.status().await, DepositStatus::Detected);
    assert_eq!(deposit.utxo().amount, DUMMY_BTC_AMOUNT_SATS);

    let err = deposit.signed().await.unwrap_err();
    assert!(matches!(sdk_error(err), SdkError::StageOutOfOrder { stage: "signed", .. }));
    let err = deposit.mint().await.unwrap_err();
    assert!(matches!(sdk_error(err), SdkError::StageOutOfOrder { stage: "mint", .. }));

    deposit.confirmed().await.unwrap();
    assert_eq!(deposit.status().await, DepositStatus::Confirmed);
    let signed = deposit.signed().await.unwrap();
    assert_eq!(signed.n_hash, deposit.n_hash());
    assert_eq!(deposit.status().await, DepositStatus::Signed);
    assert_eq!(deposit.signed().await.unwrap(), signed);

    let receipt = deposit.mint().await.unwrap();
    assert_eq!(receipt.from, env.user.address());
    assert_eq!(deposit.status().await, DepositStatus::Minted);

    let err = deposit.mint().await.unwrap_err();
    assert_eq!(sdk_error(err), SdkError::AlreadyProcessed("mint"));
}

/// 7. Test: Transaction Stage Order
/// Verifies the ordering checks of the source, verification and output stages.
/// Why: Each stage consumes the result of the one before it.
#[tokio::test]
async fn test_transaction_stages_enforce_order() {
    let env = TestEnv::new();
    let ethereum_fixture = env.deploy(&ethereum_params(&env.provider)).await;
    let ethereum = env.evm_chain(&ethereum_fixture);
    let polygon = env.evm_chain(&env.deploy(&polygon_params(&env.provider)).await);
    let bridge = evm_bridge(&env, &[&ethereum, &polygon]).await;
    let amount = U256::from(500_000u64);
    let dai = ethereum_fixture.contracts.lock_gateways["DAI"];
    bridge_harness::contracts::Erc20::attach(&env.deployer, dai.token)
        .transfer(env.user.address(), amount)
        .await
        .unwrap();

    let gateway = bridge
        .gateway(GatewayParams::new(
            "DAI",
            ethereum.account_with_amount(amount),
            polygon.account(),
        ))
        .await
        .unwrap();

    let err = gateway.in_tx().wait(1).await.unwrap_err();
    assert_eq!(sdk_error(err), SdkError::NotSubmitted);
    let err = gateway.in_setup()[0].wait().await.unwrap_err();
    assert_eq!(sdk_error(err), SdkError::NotSubmitted);

    // Locking before the approval reverts and leaves nothing submitted
    assert!(gateway.in_tx().submit().await.is_err());
    assert_eq!(gateway.in_tx().tx_hash().await, None);

    gateway.in_setup()[0].submit().await.unwrap();
    gateway.in_setup()[0].wait().await.unwrap();
    gateway.in_tx().submit().await.unwrap();
    let err = gateway.in_tx().submit().await.unwrap_err();
    assert_eq!(sdk_error(err), SdkError::AlreadyProcessed("in.submit"));

    let (sender, mut receiver) = mpsc::unbounded_channel();
    gateway
        .on("transaction", move |tx: GatewayTransaction| {
            let sender = sender.clone();
            async move {
                let _ = sender.send(tx);
            }
        })
        .await;
    let tx = receiver.recv().await.unwrap();
    assert_eq!(tx.in_tx.amount(), amount);

    let err = tx.renvm.submit().await.unwrap_err();
    assert!(matches!(sdk_error(err), SdkError::StageOutOfOrder { stage: "renvm.submit", .. }));
    let err = tx.renvm.wait().await.unwrap_err();
    assert!(matches!(sdk_error(err), SdkError::StageOutOfOrder { stage: "renvm.wait", .. }));
    let err = tx.out.submit().await.unwrap_err();
    assert!(matches!(sdk_error(err), SdkError::StageOutOfOrder { stage: "out.submit", .. }));
    let err = tx.out.wait(0).await.unwrap_err();
    assert!(matches!(sdk_error(err), SdkError::StageOutOfOrder { stage: "out.wait", .. }));

    tx.in_tx.wait(0).await.unwrap();
    let signed = tx.renvm.submit().await.unwrap();
    assert_eq!(tx.renvm.wait().await.unwrap(), signed);
    assert_eq!(signed.amount, gateway.fees().estimate_output(amount));
    assert!(tx.out.has_submit().await);
    tx.out.submit().await.unwrap();
    assert!(!tx.out.has_submit().await);
    tx.out.wait(0).await.unwrap();

    let err = tx.out.submit().await.unwrap_err();
    assert_eq!(sdk_error(err), SdkError::AlreadyProcessed("out.submit"));
}

/// 8. Test: Watcher Stops With Handle
/// Verifies that dropping a lock-and-mint handle stops deposit notifications.
/// Why: Watcher tasks must not outlive the transfer they serve.
#[tokio::test]
async fn test_dropped_transfer_stops_watching() {
    let env = TestEnv::new();
    let fixture = env.deploy(&ethereum_params(&env.provider)).await;
    let (bridge, bitcoin) = bitcoin_bridge(&env).await;
    let mint = bridge
        .lock_and_mint(LockAndMintParams::new(
            "BTC",
            bitcoin.clone(),
            env.evm_chain(&fixture).account(),
        ))
        .await
        .unwrap();
    let address = mint.gateway_address().to_string();

    let (sender, mut receiver) = mpsc::unbounded_channel::<DepositHandle>();
    mint.on("deposit", move |deposit| {
        let sender = sender.clone();
        async move {
            let _ = sender.send(deposit);
        }
    })
    .await;
    drop(mint);
    tokio::time::sleep(Duration::from_millis(50)).await;

    bitcoin.add_utxo(&address, DUMMY_BTC_AMOUNT_SATS).await;
    let received = tokio::time::timeout(Duration::from_millis(200), receiver.recv()).await;

    // Either the listener is gone (channel closed) or nothing arrives in time
    assert!(!matches!(received, Ok(Some(_))));
}

/// 9. Test: Nonce Changes Deposit Address
/// Verifies that a lock-and-mint with a different nonce gets a different deposit
/// address and that both still mint.
/// Why: The nonce feeds the gateway hash and each deposit's nonce hash.
#[tokio::test]
async fn test_nonce_changes_deposit_address() {
    let env = TestEnv::new();
    let fixture = env.deploy(&ethereum_params(&env.provider)).await;
    let ethereum = env.evm_chain(&fixture);
    let (bridge, bitcoin) = bitcoin_bridge(&env).await;
    let bridge = bridge.with_poll_interval(Duration::from_millis(1));

    let default_nonce = bridge
        .lock_and_mint(LockAndMintParams::new("BTC", bitcoin.clone(), ethereum.account()))
        .await
        .unwrap();
    let custom_nonce = bridge
        .lock_and_mint(
            LockAndMintParams::new("BTC", bitcoin.clone(), ethereum.account())
                .with_nonce(H256::repeat_byte(7)),
        )
        .await
        .unwrap();
    assert_ne!(default_nonce.gateway_address(), custom_nonce.gateway_address());

    for mint in [&default_nonce, &custom_nonce] {
        bitcoin.add_utxo(mint.gateway_address(), DUMMY_BTC_AMOUNT_SATS).await;
        bridge_harness::flow::process_deposit(mint).await.unwrap();
    }
}

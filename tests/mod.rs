//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    bitcoin_bridge, build_test_chain, build_test_provider, ethereum_params, evm_bridge,
    expected_after_fees, init_tracing, polygon_params, random_sats, seeded_rng, whole, TestEnv,
    BITCOIN, DUMMY_BTC_AMOUNT_SATS, DUMMY_DAI_SUPPLY, DUMMY_ETHEREUM_CHAIN_ID, DUMMY_FIXED_FEE,
    DUMMY_MINT_AUTHORITY_KEY, DUMMY_OTHER_AUTHORITY_KEY, DUMMY_PERCENT_FEE_BIPS,
    DUMMY_POLYGON_CHAIN_ID, DUMMY_SEED, ETHEREUM, POLYGON,
};

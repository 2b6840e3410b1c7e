//! Bridge Harness
//!
//! Deploys a fresh gateway environment for every chain listed in the
//! configuration file onto an in-process local chain and prints the resulting
//! network configs as JSON.
//!
//! ## Overview
//!
//! The harness:
//! 1. Loads the mint authority key and fee schedule of the mock verification network
//! 2. Starts a local chain with deterministic signer accounts
//! 3. Deploys verifier, beacons, registry, bridge and gateways per configured chain
//!
//! The chain only lives for the duration of the process. The output is meant
//! for inspection and for wiring SDK clients in tests.

use anyhow::Result;
use tracing::info;

use bridge_harness::chain::LocalChain;
use bridge_harness::config::Config;
use bridge_harness::fixtures::deploy_from_config;
use bridge_harness::sdk::MockProvider;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file
/// 3. Deploys every configured chain
/// 4. Prints the network configs
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting Bridge Harness");

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Bridge Harness");
        println!();
        println!("Usage: bridge-harness [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  BRIDGE_HARNESS_CONFIG_PATH          Path to config file (overridden by --config)");
        println!("  BRIDGE_HARNESS_MINT_AUTHORITY_KEY   Mint authority key (hex), name set in config");
        return Ok(());
    }

    let mut config_path = None;

    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }

    if let Some(path) = config_path {
        std::env::set_var("BRIDGE_HARNESS_CONFIG_PATH", &path);
        info!("Using custom config: {}", path);
    }

    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let provider = MockProvider::from_config(&config)?;
    info!("Mint authority: {:#x}", provider.mint_authority());

    let chain = LocalChain::new(&config.local_chain);
    let fixtures = deploy_from_config(&chain, &config, provider.mint_authority()).await?;
    info!(
        "Deployed {} gateway environment(s) up to block {}",
        fixtures.len(),
        chain.block_number().await
    );

    let networks: Vec<_> = fixtures.iter().map(|fixture| &fixture.network).collect();
    println!("{}", serde_json::to_string_pretty(&networks)?);

    Ok(())
}

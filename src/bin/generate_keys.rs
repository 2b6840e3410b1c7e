//! Mint Authority Key Generation Utility
//!
//! This binary generates a new secp256k1 key for the mock verification network.
//!
//! ## Usage
//!
//! ```bash
//! # Generate a new key
//! cargo run --bin generate_keys
//!
//! # Export it under the variable named in config/bridge-harness.toml
//! export BRIDGE_HARNESS_MINT_AUTHORITY_KEY=<private key>
//! ```
//!
//! ## Output
//!
//! - Private key (hex encoded) - signs mint and release approvals
//! - Mint authority address - the address gateways are initialised with

use anyhow::Result;
use bridge_harness::crypto::MintAuthority;

fn main() -> Result<()> {
    let authority = MintAuthority::random()?;

    println!("Generated Mint Authority Key:");
    println!("Private Key (hex): {}", authority.to_hex());
    println!("Mint Authority Address: {:#x}", authority.address());
    println!();
    println!("Export the private key under the variable named by harness.mint_authority_key_env.");

    Ok(())
}

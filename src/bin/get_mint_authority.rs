//! Get Mint Authority Address
//!
//! This binary reads the harness configuration, loads the mint authority key from
//! the configured environment variable and prints the derived Ethereum address.
//! This is the address every deployed signature verifier is initialised with.

use anyhow::Result;
use bridge_harness::config::Config;
use bridge_harness::crypto::MintAuthority;

fn main() -> Result<()> {
    let config = Config::load()?;

    let key = config.harness.get_mint_authority_key()?;
    let authority = MintAuthority::from_hex(&key)?;

    println!("{:#x}", authority.address());

    Ok(())
}

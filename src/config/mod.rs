//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the bridge harness.
//! Configuration includes the local chain endpoint, the mint authority key location,
//! the verification network fee schedule, and the gateway environments to deploy.

use serde::{Deserialize, Serialize};

use crate::network::AssetSpec;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all harness settings.
///
/// This structure holds configuration for:
/// - Harness behaviour (key location, polling, confirmations)
/// - The local test chain
/// - The mock verification network fee schedule
/// - Gateway environments to deploy (one per chain selector)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Harness settings (key env var, polling interval)
    pub harness: HarnessConfig,
    /// Local single-node chain settings
    pub local_chain: LocalChainConfig,
    /// Fees charged by the mock verification network
    #[serde(default)]
    pub fees: FeeConfig,
    /// Gateway environments deployed by the `bridge-harness` binary
    #[serde(default)]
    pub chains: Vec<ChainDeployment>,
}

/// Harness settings.
///
/// The mint authority key is loaded from an environment variable at runtime.
/// The config file contains the environment variable name, not the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Environment variable name containing the secp256k1 mint authority key (hex)
    /// Default: "BRIDGE_HARNESS_MINT_AUTHORITY_KEY"
    #[serde(default = "default_mint_authority_key_env")]
    pub mint_authority_key_env: String,
    /// Polling interval of SDK deposit/transaction watchers in milliseconds
    pub poll_interval_ms: u64,
}

fn default_mint_authority_key_env() -> String {
    "BRIDGE_HARNESS_MINT_AUTHORITY_KEY".to_string()
}

impl HarnessConfig {
    /// Loads the mint authority key from the environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The private key (hex encoded)
    /// * `Err(anyhow::Error)` - Failed to load from environment
    pub fn get_mint_authority_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.mint_authority_key_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with your secp256k1 mint authority key (hex encoded).",
                self.mint_authority_key_env
            )
        })
    }

    /// Polling interval as a `Duration`.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

/// Local test chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalChainConfig {
    /// RPC endpoint URL advertised in generated network configs
    pub rpc_url: String,
    /// Network id reported by the chain (None simulates a provider without one)
    #[serde(default)]
    pub network_id: Option<u64>,
    /// Number of funded signer accounts
    #[serde(default = "default_accounts")]
    pub accounts: usize,
}

fn default_accounts() -> usize {
    20
}

/// Fee schedule of the mock verification network.
///
/// The fixed fee is taken first, then the proportional fee (in basis points)
/// from what remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fixed fee in the asset's smallest unit
    pub fixed_fee: u64,
    /// Proportional fee in basis points (1/100th of a percent)
    pub percent_fee_bips: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fixed_fee: 1000,
            percent_fee_bips: 15,
        }
    }
}

/// One gateway environment to deploy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainDeployment {
    /// Chain selector (e.g. "Ethereum")
    pub name: String,
    /// Chain id passed to the gateway registry
    pub chain_id: u64,
    /// Assets minted on deposit
    #[serde(default)]
    pub mint_assets: Vec<AssetSpec>,
    /// Assets locked on deposit (each needs a total supply)
    #[serde(default)]
    pub lock_assets: Vec<AssetSpec>,
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// This function ensures that:
    /// - The local chain RPC URL parses
    /// - The proportional fee does not exceed 10000 bips
    /// - Chain selectors and registry chain IDs are unique
    /// - Every lock asset carries a total supply
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - The first problem found
    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.local_chain.rpc_url).map_err(|e| {
            anyhow::anyhow!(
                "Configuration error: invalid local chain rpc_url '{}': {}",
                self.local_chain.rpc_url,
                e
            )
        })?;

        if self.fees.percent_fee_bips > 10_000 {
            return Err(anyhow::anyhow!(
                "Configuration error: percent_fee_bips {} exceeds 10000",
                self.fees.percent_fee_bips
            ));
        }

        if self.local_chain.accounts < 2 {
            return Err(anyhow::anyhow!(
                "Configuration error: at least 2 local accounts are required (deployer and user), got {}",
                self.local_chain.accounts
            ));
        }

        for (i, chain) in self.chains.iter().enumerate() {
            for other in &self.chains[i + 1..] {
                if chain.name == other.name {
                    return Err(anyhow::anyhow!(
                        "Configuration error: chain '{}' is configured twice. Each chain must have a unique name.",
                        chain.name
                    ));
                }
                if chain.chain_id == other.chain_id {
                    return Err(anyhow::anyhow!(
                        "Configuration error: chains '{}' and '{}' have the same chain ID {}. Each chain must have a unique chain ID.",
                        chain.name,
                        other.name,
                        chain.chain_id
                    ));
                }
            }

            for asset in &chain.lock_assets {
                if asset.total_supply.is_none() {
                    return Err(anyhow::anyhow!(
                        "Configuration error: lock asset '{}' on '{}' has no total_supply",
                        asset.symbol,
                        chain.name
                    ));
                }
            }
        }

        Ok(())
    }

    /// Loads configuration from the TOML file.
    ///
    /// This function:
    /// 1. Checks if config/bridge-harness.toml (or BRIDGE_HARNESS_CONFIG_PATH) exists
    /// 2. If it exists, loads and parses the configuration
    /// 3. Validates the configuration
    /// 4. If it doesn't exist, returns an error asking user to copy template
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - Failed to load configuration, file doesn't exist, or validation failed
    pub fn load() -> anyhow::Result<Self> {
        // Check for custom config path via environment variable (for tests)
        let config_path = std::env::var("BRIDGE_HARNESS_CONFIG_PATH")
            .unwrap_or_else(|_| "config/bridge-harness.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            // Configuration file doesn't exist - user needs to copy template
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/bridge-harness.template.toml config/bridge-harness.toml\n\
                Then edit config/bridge-harness.toml with your actual values.",
                config_path
            ))
        }
    }

    /// Creates a default configuration for in-process test runs.
    ///
    /// Mirrors a Hardhat node: 20 accounts, network id 31337, RPC on
    /// localhost:8545. No gateway environments are listed.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self {
            harness: HarnessConfig {
                mint_authority_key_env: default_mint_authority_key_env(),
                poll_interval_ms: 10,
            },
            local_chain: LocalChainConfig {
                rpc_url: "http://localhost:8545".to_string(),
                network_id: Some(31337),
                accounts: default_accounts(),
            },
            fees: FeeConfig::default(),
            chains: Vec::new(),
        }
    }
}

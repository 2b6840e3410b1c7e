//! Network configuration records produced by fixture deployment.
//!
//! A [`NetworkConfig`] describes one deployed gateway environment: the chain
//! selector the SDK routes on, chain parameters for wallets, and the addresses
//! of the contracts the SDK looks up by role name.

use std::collections::BTreeMap;

use anyhow::Result;
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Role name of the gateway registry in [`NetworkConfig::addresses`].
pub const GATEWAY_REGISTRY: &str = "GatewayRegistry";

/// Role name of the example bridge contract in [`NetworkConfig::addresses`].
pub const BASIC_BRIDGE: &str = "BasicBridge";

/// Native currency metadata of an EVM chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeAsset {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeAsset {
    pub fn ether() -> Self {
        Self {
            name: "Ether".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }
}

/// Wallet-facing chain parameters (EIP-3085 shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    /// Hex encoded chain id with 0x prefix
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeAsset,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

/// Deployed chain environment consumed by the SDK chain bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Symbolic chain selector (e.g. "Ethereum", "Polygon")
    pub selector: String,
    pub native_asset: NativeAsset,
    /// Average block time in seconds
    pub average_confirmation_time: u64,
    pub network: ChainParams,
    /// Contract role name -> deployed address
    pub addresses: BTreeMap<String, Address>,
}

impl NetworkConfig {
    /// Builds the config for a gateway environment on the local test chain.
    pub fn local(
        name: &str,
        network_id: u64,
        rpc_url: &str,
        gateway_registry: Address,
        basic_bridge: Address,
    ) -> Self {
        let mut addresses = BTreeMap::new();
        addresses.insert(GATEWAY_REGISTRY.to_string(), gateway_registry);
        addresses.insert(BASIC_BRIDGE.to_string(), basic_bridge);

        Self {
            selector: name.to_string(),
            native_asset: NativeAsset::ether(),
            average_confirmation_time: 1,
            network: ChainParams {
                chain_id: format!("0x{:x}", network_id),
                chain_name: name.to_string(),
                native_currency: NativeAsset::ether(),
                rpc_urls: vec![rpc_url.to_string()],
                block_explorer_urls: vec![String::new()],
            },
            addresses,
        }
    }

    /// Looks up a contract address by role name.
    pub fn address(&self, role: &str) -> Result<Address> {
        self.addresses.get(role).copied().ok_or_else(|| {
            anyhow::anyhow!("Network '{}' has no '{}' address", self.selector, role)
        })
    }

    pub fn gateway_registry(&self) -> Result<Address> {
        self.address(GATEWAY_REGISTRY)
    }

    pub fn basic_bridge(&self) -> Result<Address> {
        self.address(BASIC_BRIDGE)
    }

    /// Numeric network id parsed back from the hex chain id.
    pub fn network_id(&self) -> Result<u64> {
        let hex_id = self
            .network
            .chain_id
            .strip_prefix("0x")
            .unwrap_or(&self.network.chain_id);
        u64::from_str_radix(hex_id, 16)
            .map_err(|e| anyhow::anyhow!("Invalid chain id '{}': {}", self.network.chain_id, e))
    }
}

/// Asset to deploy a gateway for.
///
/// Lock assets need a `total_supply`, minted to the deployer when the test
/// token is created. Mint assets leave it empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub symbol: String,
    pub decimals: u8,
    #[serde(default, with = "decimal_u256")]
    pub total_supply: Option<U256>,
}

impl AssetSpec {
    pub fn mint(symbol: &str, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            total_supply: None,
        }
    }

    pub fn lock(symbol: &str, decimals: u8, total_supply: U256) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            total_supply: Some(total_supply),
        }
    }
}

/// Serde helper storing a `U256` as a decimal string ("1000000000000000000000").
mod decimal_u256 {
    use ethereum_types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| U256::from_dec_str(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_network_chain_id_is_hex() {
        let config = NetworkConfig::local(
            "Ethereum",
            31337,
            "http://localhost:8545",
            Address::repeat_byte(1),
            Address::repeat_byte(2),
        );
        assert_eq!(config.network.chain_id, "0x7a69");
        assert_eq!(config.network_id().unwrap(), 31337);
        assert_eq!(config.gateway_registry().unwrap(), Address::repeat_byte(1));
        assert_eq!(config.basic_bridge().unwrap(), Address::repeat_byte(2));
    }

    #[test]
    fn test_missing_role_is_an_error() {
        let mut config = NetworkConfig::local(
            "Polygon",
            0,
            "http://localhost:8545",
            Address::zero(),
            Address::zero(),
        );
        config.addresses.remove(BASIC_BRIDGE);
        assert!(config.basic_bridge().is_err());
    }

    #[test]
    fn test_network_config_json_uses_camel_case() {
        let config = NetworkConfig::local(
            "Ethereum",
            1,
            "http://localhost:8545",
            Address::zero(),
            Address::zero(),
        );
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("nativeAsset").is_some());
        assert!(json["network"].get("rpcUrls").is_some());
        assert_eq!(json["network"]["chainId"], "0x1");
    }

    #[test]
    fn test_asset_spec_total_supply_decimal_string() {
        let spec: AssetSpec = toml::from_str(
            r#"
            symbol = "DAI"
            decimals = 18
            total_supply = "1000000000000000000000"
            "#,
        )
        .unwrap();
        assert_eq!(
            spec.total_supply,
            Some(U256::exp10(18) * U256::from(1000u64))
        );

        let mint: AssetSpec = toml::from_str("symbol = \"BTC\"\ndecimals = 8").unwrap();
        assert_eq!(mint.total_supply, None);
    }
}

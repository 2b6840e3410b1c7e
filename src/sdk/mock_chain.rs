//! Mock UTXO chain (Bitcoin-like) with synthetic deposits.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use ethereum_types::{Address, H256};
use rand::Rng;
use tokio::sync::RwLock;
use tracing::info;

use crate::crypto::keccak256;
use crate::error::SdkError;

/// P2SH version byte of Bitcoin testnet addresses.
const P2SH_TESTNET_VERSION: u8 = 0xc4;

/// Unspent output sent to a deposit address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub txid: H256,
    pub tx_index: u64,
    /// Amount in the asset's smallest unit (sats)
    pub amount: u64,
}

/// A UTXO chain whose deposits are injected by the test.
///
/// Clones share the same UTXO set. Every UTXO is confirmed as soon as it is
/// added.
#[derive(Debug, Clone)]
pub struct MockChain {
    chain: String,
    asset: String,
    decimals: u8,
    utxos: Arc<RwLock<HashMap<String, Vec<Utxo>>>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new("Bitcoin", "BTC", 8)
    }
}

impl MockChain {
    pub fn new(chain: &str, asset: &str, decimals: u8) -> Self {
        Self {
            chain: chain.to_string(),
            asset: asset.to_string(),
            decimals,
            utxos: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Chain selector, e.g. "Bitcoin".
    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Default (and only) asset of the chain.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn asset_decimals(&self, asset: &str) -> Result<u8> {
        if asset != self.asset {
            return Err(SdkError::UnsupportedAsset {
                asset: asset.to_string(),
                chain: self.chain.clone(),
            }
            .into());
        }
        Ok(self.decimals)
    }

    /// Base58check deposit address derived from a gateway hash and the mint
    /// authority.
    pub fn gateway_address(&self, g_hash: &H256, mint_authority: &Address) -> String {
        let mut preimage = Vec::with_capacity(52);
        preimage.extend_from_slice(g_hash.as_bytes());
        preimage.extend_from_slice(mint_authority.as_bytes());
        let script_hash = keccak256(&preimage);

        let mut payload = Vec::with_capacity(25);
        payload.push(P2SH_TESTNET_VERSION);
        payload.extend_from_slice(&script_hash.as_bytes()[12..]);
        let checksum = keccak256(keccak256(&payload));
        payload.extend_from_slice(&checksum.as_bytes()[..4]);
        bs58::encode(payload).into_string()
    }

    /// Injects a confirmed UTXO of `amount` sats at `address`.
    pub async fn add_utxo(&self, address: &str, amount: u64) -> Utxo {
        let txid = H256::from(rand::thread_rng().gen::<[u8; 32]>());
        let utxo = Utxo {
            txid,
            tx_index: 0,
            amount,
        };
        self.utxos
            .write()
            .await
            .entry(address.to_string())
            .or_default()
            .push(utxo.clone());
        info!(
            "{}: added UTXO {:#x}:0 of {} to {}",
            self.chain, txid, amount, address
        );
        utxo
    }

    /// UTXOs at `address`, oldest first.
    pub async fn utxos(&self, address: &str) -> Vec<Utxo> {
        self.utxos
            .read()
            .await
            .get(address)
            .cloned()
            .unwrap_or_default()
    }
}

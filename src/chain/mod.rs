//! Local Test Chain Module
//!
//! An in-process, single-node EVM-style chain. It automines: every successful
//! transaction produces one block and one receipt. Transactions run on a copy
//! of the state and are committed only when they succeed, so a revert leaves
//! the chain untouched.

pub mod execution;
pub mod state;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::abi::{self, Token};
use crate::config::LocalChainConfig;
use crate::crypto::keccak256;
use crate::error::ChainError;

pub use execution::Tx;
pub use state::ChainState;

// ============================================================================
// RECEIPTS AND LOGS
// ============================================================================

/// Decoded contract event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    Approval {
        owner: Address,
        spender: Address,
        value: U256,
    },
    LogMintAuthorityUpdated {
        mint_authority: Address,
    },
    ProxyDeployerUpdated {
        proxy_deployer: Address,
    },
    ProxyDeployed {
        proxy: Address,
    },
    LogMintGatewayCreated {
        symbol: String,
        token: Address,
        gateway: Address,
    },
    LogLockGatewayCreated {
        symbol: String,
        token: Address,
        gateway: Address,
    },
    LogMint {
        to: Address,
        amount: U256,
        sig_hash: H256,
        n_hash: H256,
    },
    LogBurn {
        to: Vec<u8>,
        amount: U256,
        burn_nonce: u64,
    },
    LogLockToChain {
        recipient_address: String,
        recipient_chain: String,
        recipient_payload: Vec<u8>,
        amount: U256,
        lock_nonce: u64,
    },
    LogRelease {
        recipient: Address,
        amount: U256,
        sig_hash: H256,
        n_hash: H256,
    },
}

/// Event emitted by `address` in a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub tx_hash: H256,
    pub block_number: u64,
    pub log_index: u64,
    pub event: ContractEvent,
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: H256,
    pub block_number: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub contract_address: Option<Address>,
    pub logs: Vec<Log>,
    /// Unix seconds the block was mined at
    pub timestamp: u64,
}

// ============================================================================
// LOCAL CHAIN
// ============================================================================

/// Handle to a local chain. Clones share the same state.
#[derive(Clone)]
pub struct LocalChain {
    state: Arc<RwLock<ChainState>>,
    accounts: Arc<Vec<Address>>,
    network_id: Option<u64>,
    rpc_url: String,
}

impl std::fmt::Debug for LocalChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalChain")
            .field("network_id", &self.network_id)
            .field("rpc_url", &self.rpc_url)
            .field("accounts", &self.accounts.len())
            .finish_non_exhaustive()
    }
}

impl LocalChain {
    /// Starts a fresh chain at block 0 with deterministic signer accounts.
    pub fn new(config: &LocalChainConfig) -> Self {
        let accounts = (0..config.accounts)
            .map(|i| {
                let hash = keccak256(format!("bridge-harness account {}", i));
                Address::from_slice(&hash.as_bytes()[12..])
            })
            .collect();

        Self {
            state: Arc::new(RwLock::new(ChainState::default())),
            accounts: Arc::new(accounts),
            network_id: config.network_id,
            rpc_url: config.rpc_url.clone(),
        }
    }

    /// All signer accounts, in index order.
    pub fn signers(&self) -> Vec<Signer> {
        self.accounts
            .iter()
            .map(|address| Signer {
                address: *address,
                chain: self.clone(),
            })
            .collect()
    }

    pub fn signer(&self, index: usize) -> Result<Signer> {
        let address = self
            .accounts
            .get(index)
            .copied()
            .ok_or(ChainError::UnknownSigner(index))?;
        Ok(Signer {
            address,
            chain: self.clone(),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Network id the node reports (`eth_chainId`), if any.
    pub async fn get_network(&self) -> Option<u64> {
        self.network_id
    }

    pub async fn block_number(&self) -> u64 {
        self.state.read().await.block_number
    }

    /// Mines one empty block.
    pub async fn mine(&self) -> u64 {
        let mut state = self.state.write().await;
        state.block_number += 1;
        state.block_number
    }

    /// Runs `f` as a transaction from `from` and mines it on success.
    ///
    /// # Returns
    ///
    /// * `Ok((T, TxReceipt))` - The call's return value and the mined receipt
    /// * `Err(anyhow::Error)` - The call reverted; no state was changed
    pub async fn transact<T, F>(&self, from: Address, to: Option<Address>, f: F) -> Result<(T, TxReceipt)>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T, ChainError>,
    {
        let mut guard = self.state.write().await;
        let mut draft = guard.clone();

        let (value, events, deployed) = {
            let mut tx = Tx::new(&mut draft, from);
            let value = f(&mut tx)?;
            let (events, deployed) = tx.into_parts();
            (value, events, deployed)
        };

        let nonce = draft.nonces.entry(from).or_insert(0);
        let tx_nonce = *nonce;
        *nonce += 1;
        draft.block_number += 1;

        let tx_hash = keccak256(abi::encode(&[
            Token::Address(from),
            Token::Uint(U256::from(tx_nonce)),
        ]));
        let block_number = draft.block_number;
        let mut logs = Vec::with_capacity(events.len());
        for (address, event) in events {
            logs.push(Log {
                address,
                tx_hash,
                block_number,
                log_index: draft.log_count,
                event,
            });
            draft.log_count += 1;
        }

        let receipt = TxReceipt {
            tx_hash,
            block_number,
            from,
            to,
            contract_address: deployed,
            logs,
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        };
        draft.receipts.insert(tx_hash, receipt.clone());
        *guard = draft;

        debug!(
            "Mined tx {:#x} in block {} ({} logs)",
            tx_hash,
            block_number,
            receipt.logs.len()
        );
        Ok((value, receipt))
    }

    /// Read-only access to the current state.
    pub async fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ChainState) -> Result<T, ChainError>,
    {
        let state = self.state.read().await;
        Ok(f(&state)?)
    }

    pub async fn receipt(&self, tx_hash: &H256) -> Result<TxReceipt> {
        let state = self.state.read().await;
        let receipt = state
            .receipts
            .get(tx_hash)
            .cloned()
            .ok_or(ChainError::UnknownTransaction(*tx_hash))?;
        Ok(receipt)
    }

    /// Number of blocks on top of (and including) the transaction's block.
    pub async fn confirmations(&self, tx_hash: &H256) -> Result<u64> {
        let state = self.state.read().await;
        let receipt = state
            .receipts
            .get(tx_hash)
            .ok_or(ChainError::UnknownTransaction(*tx_hash))?;
        Ok(state.block_number - receipt.block_number + 1)
    }

    /// Logs emitted by `address` in blocks `>= from_block`, in order.
    pub async fn logs(&self, address: &Address, from_block: u64) -> Vec<Log> {
        let state = self.state.read().await;
        let mut logs: Vec<Log> = state
            .receipts
            .values()
            .filter(|r| r.block_number >= from_block)
            .flat_map(|r| r.logs.iter())
            .filter(|log| log.address == *address)
            .cloned()
            .collect();
        logs.sort_by_key(|log| log.log_index);
        logs
    }

    /// Contract kinds by address, for diagnostics.
    pub async fn deployed_contracts(&self) -> BTreeMap<Address, &'static str> {
        let state = self.state.read().await;
        state
            .contracts
            .iter()
            .map(|(address, contract)| (*address, contract.kind()))
            .collect()
    }
}

// ============================================================================
// SIGNERS
// ============================================================================

/// Externally owned account bound to a chain.
#[derive(Clone)]
pub struct Signer {
    address: Address,
    chain: LocalChain,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signer({:#x})", self.address)
    }
}

impl Signer {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain(&self) -> &LocalChain {
        &self.chain
    }

    pub async fn get_network(&self) -> Option<u64> {
        self.chain.get_network().await
    }

    /// Sends a transaction to `to` (or a deployment when `to` is `None`).
    pub async fn send<T, F>(&self, to: Option<Address>, f: F) -> Result<(T, TxReceipt)>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T, ChainError>,
    {
        self.chain.transact(self.address, to, f).await
    }

    /// Calls a contract method by name with ABI values.
    pub async fn call(
        &self,
        to: Address,
        method: &str,
        args: Vec<Token>,
    ) -> Result<(Vec<Token>, TxReceipt)> {
        self.send(Some(to), |tx| tx.call(to, method, args)).await
    }
}

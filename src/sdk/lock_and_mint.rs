//! Lock-and-mint from a UTXO chain to an EVM chain.
//!
//! The transfer derives a deposit address on the UTXO chain. A watcher task
//! polls that address and emits a "deposit" notification with a
//! [`DepositHandle`] for every new UTXO. Each deposit then moves through
//! `confirmed -> signed -> mint`; calling a stage early fails with
//! [`SdkError::StageOutOfOrder`].

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Result;
use ethereum_types::{H256, U256};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::events::EventEmitter;
use super::evm::EvmEndpoint;
use super::fees::FeeSchedule;
use super::mock_chain::{MockChain, Utxo};
use super::mock_provider::{MockProvider, RequestKind, SignedTransfer, TransferRequest};
use crate::chain::TxReceipt;
use crate::contracts::GatewayEntry;
use crate::crypto;
use crate::error::SdkError;

/// Name of the notification carrying new deposits.
pub const DEPOSIT_EVENT: &str = "deposit";

/// Input of [`Bridge::lock_and_mint`](super::Bridge::lock_and_mint).
#[derive(Debug, Clone)]
pub struct LockAndMintParams {
    pub asset: String,
    pub from: MockChain,
    pub to: EvmEndpoint,
    /// Gateway nonce; distinct nonces give distinct deposit addresses
    pub nonce: H256,
}

impl LockAndMintParams {
    pub fn new(asset: &str, from: MockChain, to: EvmEndpoint) -> Self {
        Self {
            asset: asset.to_string(),
            from,
            to,
            nonce: H256::zero(),
        }
    }

    pub fn with_nonce(mut self, nonce: H256) -> Self {
        self.nonce = nonce;
        self
    }
}

/// Everything a deposit needs to be signed and minted.
#[derive(Debug)]
struct MintContext {
    asset: String,
    from: MockChain,
    to: EvmEndpoint,
    provider: MockProvider,
    gateway: GatewayEntry,
    p_hash: H256,
    nonce: H256,
    gateway_address: String,
}

/// An in-progress lock-and-mint transfer.
pub struct LockAndMint {
    context: Arc<MintContext>,
    emitter: EventEmitter<DepositHandle>,
    // Watcher runs while this is alive
    _alive: Arc<()>,
}

impl LockAndMint {
    pub(crate) fn start(
        params: LockAndMintParams,
        provider: MockProvider,
        gateway: GatewayEntry,
        poll_interval: Duration,
    ) -> Result<Self> {
        let p_hash = params.to.payload_hash()?;
        let s_hash = crypto::selector_hash(&params.asset, params.to.chain.name());
        let g_hash = crypto::gateway_hash(&p_hash, &s_hash, &params.to.recipient(), &params.nonce);
        let gateway_address = params
            .from
            .gateway_address(&g_hash, &provider.mint_authority());

        info!(
            "Lock and mint {} from {} to {}: deposit address {}",
            params.asset,
            params.from.chain(),
            params.to.chain.name(),
            gateway_address
        );

        let context = Arc::new(MintContext {
            asset: params.asset,
            from: params.from,
            to: params.to,
            provider,
            gateway,
            p_hash,
            nonce: params.nonce,
            gateway_address,
        });
        let emitter = EventEmitter::new();
        let alive = Arc::new(());
        tokio::spawn(watch_deposits(
            Arc::clone(&context),
            emitter.clone(),
            Arc::downgrade(&alive),
            poll_interval,
        ));

        Ok(Self {
            context,
            emitter,
            _alive: alive,
        })
    }

    /// Address on the UTXO chain to send the deposit to.
    pub fn gateway_address(&self) -> &str {
        &self.context.gateway_address
    }

    pub fn fees(&self) -> FeeSchedule {
        self.context.provider.fees()
    }

    /// Subscribes to `event` ("deposit").
    pub async fn on<F, Fut>(&self, event: &str, listener: F)
    where
        F: Fn(DepositHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.emitter.on(event, listener).await;
    }
}

async fn watch_deposits(
    context: Arc<MintContext>,
    emitter: EventEmitter<DepositHandle>,
    alive: Weak<()>,
    poll_interval: Duration,
) {
    let mut seen = HashSet::new();
    while alive.upgrade().is_some() {
        for utxo in context.from.utxos(&context.gateway_address).await {
            if seen.insert((utxo.txid, utxo.tx_index)) {
                info!(
                    "Detected {} deposit {:#x}:{} of {}",
                    context.asset, utxo.txid, utxo.tx_index, utxo.amount
                );
                let deposit = DepositHandle::new(Arc::clone(&context), utxo);
                emitter.emit(DEPOSIT_EVENT, deposit).await;
            }
        }
        tokio::time::sleep(poll_interval).await;
    }
    debug!("Deposit watcher for {} stopped", context.gateway_address);
}

// ============================================================================
// DEPOSITS
// ============================================================================

/// Lifecycle position of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DepositStatus {
    Detected,
    Confirmed,
    Signed,
    Minted,
}

#[derive(Debug)]
struct DepositProgress {
    status: DepositStatus,
    signed: Option<SignedTransfer>,
    minted: Option<TxReceipt>,
}

/// One UTXO sent to the deposit address.
#[derive(Debug, Clone)]
pub struct DepositHandle {
    context: Arc<MintContext>,
    utxo: Utxo,
    n_hash: H256,
    progress: Arc<RwLock<DepositProgress>>,
}

impl DepositHandle {
    fn new(context: Arc<MintContext>, utxo: Utxo) -> Self {
        let n_hash = crypto::nonce_hash(&context.nonce, &utxo.txid, utxo.tx_index);
        Self {
            context,
            utxo,
            n_hash,
            progress: Arc::new(RwLock::new(DepositProgress {
                status: DepositStatus::Detected,
                signed: None,
                minted: None,
            })),
        }
    }

    pub fn utxo(&self) -> &Utxo {
        &self.utxo
    }

    pub fn n_hash(&self) -> H256 {
        self.n_hash
    }

    pub async fn status(&self) -> DepositStatus {
        self.progress.read().await.status
    }

    /// Waits for the UTXO to confirm. Mock UTXOs confirm immediately.
    pub async fn confirmed(&self) -> Result<()> {
        let mut progress = self.progress.write().await;
        if progress.status == DepositStatus::Detected {
            progress.status = DepositStatus::Confirmed;
            info!("Deposit {:#x} confirmed", self.utxo.txid);
        }
        Ok(())
    }

    /// Requests the mint authority's signature.
    pub async fn signed(&self) -> Result<SignedTransfer> {
        let mut progress = self.progress.write().await;
        if progress.status < DepositStatus::Confirmed {
            return Err(SdkError::StageOutOfOrder {
                stage: "signed",
                requires: "confirmed",
            }
            .into());
        }
        if let Some(signed) = &progress.signed {
            return Ok(signed.clone());
        }

        let request = TransferRequest {
            kind: RequestKind::Mint,
            asset: self.context.asset.clone(),
            from_chain: self.context.from.chain().to_string(),
            to_chain: self.context.to.chain.name().to_string(),
            p_hash: self.context.p_hash,
            amount: U256::from(self.utxo.amount),
            to: self.context.to.recipient(),
            n_hash: self.n_hash,
        };
        let signed = self.context.provider.submit(&request).await?;
        progress.signed = Some(signed.clone());
        progress.status = DepositStatus::Signed;
        Ok(signed)
    }

    /// Submits the mint on the destination chain.
    pub async fn mint(&self) -> Result<TxReceipt> {
        let mut progress = self.progress.write().await;
        if progress.minted.is_some() {
            return Err(SdkError::AlreadyProcessed("mint").into());
        }
        let signed = progress.signed.clone().ok_or(SdkError::StageOutOfOrder {
            stage: "mint",
            requires: "signed",
        })?;

        let receipt = self
            .context
            .to
            .submit_output(
                RequestKind::Mint,
                self.context.gateway.gateway,
                self.context.p_hash,
                &signed,
            )
            .await?;
        info!(
            "Minted {} {} on {} in {:#x}",
            signed.amount,
            self.context.asset,
            self.context.to.chain.name(),
            receipt.tx_hash
        );
        progress.minted = Some(receipt.clone());
        progress.status = DepositStatus::Minted;
        Ok(receipt)
    }
}

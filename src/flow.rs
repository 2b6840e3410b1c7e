//! Deposit-Flow Driver
//!
//! Turns the SDK's push notifications into one awaited result. A listener is
//! registered for "deposit" (lock-and-mint) or "transaction" (gateway), runs
//! the transfer's stages strictly in order for the emitted item, and settles
//! a single-shot [`Completion`]. The first settlement wins; anything after it
//! is ignored.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info};

use crate::error::SdkError;
use crate::sdk::{DepositHandle, Gateway, GatewayTransaction, LockAndMint, DEPOSIT_EVENT, TRANSACTION_EVENT};

// ============================================================================
// COMPLETION SIGNAL
// ============================================================================

/// Sending half of a one-shot result, shareable between listener invocations.
#[derive(Clone)]
pub struct Completion {
    sender: Arc<Mutex<Option<oneshot::Sender<Result<()>>>>>,
}

impl Completion {
    /// Creates the signal and the receiver to await it on.
    pub fn new() -> (Self, oneshot::Receiver<Result<()>>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                sender: Arc::new(Mutex::new(Some(sender))),
            },
            receiver,
        )
    }

    /// Settles with success. Returns false if already settled.
    pub async fn resolve(&self) -> bool {
        self.settle(Ok(())).await
    }

    /// Settles with `error`. Returns false if already settled.
    pub async fn reject(&self, error: anyhow::Error) -> bool {
        self.settle(Err(error)).await
    }

    pub async fn is_settled(&self) -> bool {
        self.sender.lock().await.is_none()
    }

    async fn settle(&self, result: Result<()>) -> bool {
        match self.sender.lock().await.take() {
            // The receiver may be gone; settling still counts
            Some(sender) => {
                let _ = sender.send(result);
                true
            }
            None => false,
        }
    }
}

/// Runs `stages` for an emitted item unless the signal is already settled,
/// then settles it with the outcome.
async fn settle_with<Fut>(completion: Completion, stages: Fut, log_failure: bool)
where
    Fut: Future<Output = Result<()>>,
{
    // Only skips emissions arriving after settlement. Emissions that arrive
    // before it all run their stages; the first to finish settles.
    if completion.is_settled().await {
        return;
    }
    match stages.await {
        Ok(()) => {
            completion.resolve().await;
        }
        Err(e) => {
            if log_failure {
                error!("Transfer failed: {:#}", e);
            }
            completion.reject(e).await;
        }
    }
}

async fn await_completion(receiver: oneshot::Receiver<Result<()>>) -> Result<()> {
    receiver
        .await
        .map_err(|_| anyhow::anyhow!("Transfer listener dropped without settling"))?
}

// ============================================================================
// SINGLE-CHAIN (LOCK AND MINT)
// ============================================================================

/// `confirmed -> signed -> mint` for one deposit.
pub async fn run_deposit(deposit: &DepositHandle) -> Result<()> {
    deposit.confirmed().await?;
    deposit.signed().await?;
    deposit.mint().await?;
    info!("Deposit {:#x} processed", deposit.utxo().txid);
    Ok(())
}

/// Waits for the first deposit of `lock_and_mint` and processes it.
///
/// # Returns
///
/// * `Ok(())` - Every stage of the first deposit succeeded
/// * `Err(anyhow::Error)` - The error of the first failing stage
pub async fn process_deposit(lock_and_mint: &LockAndMint) -> Result<()> {
    let (completion, receiver) = Completion::new();
    lock_and_mint
        .on(DEPOSIT_EVENT, move |deposit: DepositHandle| {
            let completion = completion.clone();
            async move {
                settle_with(completion, async { run_deposit(&deposit).await }, false).await;
            }
        })
        .await;
    await_completion(receiver).await
}

// ============================================================================
// TWO-CHAIN (GATEWAY)
// ============================================================================

/// `in.wait(0) -> renvm.submit -> renvm.wait -> out.submit? -> out.wait(0)`
/// for one detected transaction.
pub async fn run_transaction(tx: &GatewayTransaction) -> Result<()> {
    tx.in_tx.wait(0).await?;

    tx.renvm.submit().await?;
    tx.renvm.wait().await?;

    if tx.out.has_submit().await {
        tx.out.submit().await?;
    }
    tx.out.wait(0).await?;
    info!("Transaction {:#x} processed", tx.in_tx.tx_hash());
    Ok(())
}

/// Waits for the first "transaction" of `gateway` and processes it. Stage
/// failures are logged before the error is returned.
///
/// A source transaction the SDK cannot detect a transfer in rejects with
/// that detection error.
pub async fn process_transaction(gateway: &Gateway) -> Result<()> {
    let (completion, receiver) = Completion::new();
    let on_transaction = completion.clone();
    gateway
        .on(TRANSACTION_EVENT, move |tx: GatewayTransaction| {
            let completion = on_transaction.clone();
            async move {
                settle_with(completion, async { run_transaction(&tx).await }, true).await;
            }
        })
        .await;
    gateway
        .on_error(move |e: SdkError| {
            let completion = completion.clone();
            async move {
                settle_with(completion, async move { Err(e.into()) }, true).await;
            }
        })
        .await;
    await_completion(receiver).await
}

//! EVM to EVM transfers.
//!
//! A [`Gateway`] moves an asset between two gateway environments along one
//! of three routes, picked from how the asset exists on each side:
//!
//! | source        | destination     | route              |
//! |---------------|-----------------|--------------------|
//! | lock gateway  | mint gateway    | lock and mint      |
//! | mint gateway  | lock gateway    | burn and release   |
//! | mint gateway  | mint gateway    | burn and mint      |
//!
//! The user runs the `in_setup` steps (token approval for lock sources) and
//! submits the source transaction with `in_tx`. A watcher task picks up the
//! mined source log and emits a "transaction" notification carrying a
//! [`GatewayTransaction`], whose stages run `in_tx.wait -> renvm.submit ->
//! renvm.wait -> out.submit -> out.wait`.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Result;
use ethereum_types::{Address, H256, U256};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::events::EventEmitter;
use super::evm::{wait_for_confirmations, AssetRole, EvmEndpoint, EvmTarget};
use super::fees::FeeSchedule;
use super::mock_provider::{MockProvider, RequestKind, SignedTransfer, TransferRequest};
use crate::chain::{ContractEvent, TxReceipt};
use crate::contracts::{Erc20, LockGateway, MintGateway};
use crate::crypto;
use crate::error::SdkError;

/// Name of the notification carrying detected source transactions.
pub const TRANSACTION_EVENT: &str = "transaction";

/// Name of the notification raised when a submitted source transaction
/// cannot be turned into a transfer.
pub const ERROR_EVENT: &str = "error";

/// Input of [`Bridge::gateway`](super::Bridge::gateway).
#[derive(Debug, Clone)]
pub struct GatewayParams {
    pub asset: String,
    pub from: EvmEndpoint,
    pub to: EvmEndpoint,
}

impl GatewayParams {
    pub fn new(asset: &str, from: EvmEndpoint, to: EvmEndpoint) -> Self {
        Self {
            asset: asset.to_string(),
            from,
            to,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    LockAndMint,
    BurnAndRelease,
    BurnAndMint,
}

impl Route {
    fn between(source: &AssetRole, destination: &AssetRole) -> Result<Self> {
        match (source, destination) {
            (AssetRole::Lock(_), AssetRole::Mint(_)) => Ok(Route::LockAndMint),
            (AssetRole::Mint(_), AssetRole::Lock(_)) => Ok(Route::BurnAndRelease),
            (AssetRole::Mint(_), AssetRole::Mint(_)) => Ok(Route::BurnAndMint),
            (AssetRole::Lock(_), AssetRole::Lock(_)) => Err(SdkError::UnsupportedRoute(
                "asset is locked on both chains".to_string(),
            )
            .into()),
        }
    }

    fn request_kind(&self) -> RequestKind {
        match self {
            Route::BurnAndRelease => RequestKind::Release,
            Route::LockAndMint | Route::BurnAndMint => RequestKind::Mint,
        }
    }
}

#[derive(Debug)]
struct TransferContext {
    asset: String,
    route: Route,
    from: EvmEndpoint,
    to: EvmEndpoint,
    source: AssetRole,
    destination: AssetRole,
    provider: MockProvider,
    p_hash: H256,
    poll_interval: Duration,
}

/// An in-progress EVM to EVM transfer.
pub struct Gateway {
    context: Arc<TransferContext>,
    emitter: EventEmitter<GatewayTransaction>,
    errors: EventEmitter<SdkError>,
    in_setup: Vec<SetupStep>,
    in_tx: InputTx,
    _alive: Arc<()>,
}

impl Gateway {
    pub(crate) async fn start(
        params: GatewayParams,
        provider: MockProvider,
        poll_interval: Duration,
    ) -> Result<Self> {
        let source = params.from.chain.asset_role(&params.asset).await?;
        let destination = params.to.chain.asset_role(&params.asset).await?;
        let route = Route::between(&source, &destination)?;
        let p_hash = params.to.payload_hash()?;

        if let EvmTarget::Account { amount: None } = params.from.target {
            return Err(SdkError::UnsupportedRoute(
                "source account needs an amount".to_string(),
            )
            .into());
        }

        info!(
            "Gateway {} from {} to {} ({:?})",
            params.asset,
            params.from.chain.name(),
            params.to.chain.name(),
            route
        );

        let context = Arc::new(TransferContext {
            asset: params.asset,
            route,
            from: params.from,
            to: params.to,
            source,
            destination,
            provider,
            p_hash,
            poll_interval,
        });

        let mut in_setup = Vec::new();
        if let (AssetRole::Lock(entry), EvmTarget::Account { amount: Some(amount) }) =
            (&context.source, &context.from.target)
        {
            in_setup.push(SetupStep {
                name: "approval".to_string(),
                context: Arc::clone(&context),
                token: entry.token,
                spender: entry.gateway,
                amount: *amount,
                receipt: Arc::new(RwLock::new(None)),
            });
        }

        let in_tx = InputTx {
            context: Arc::clone(&context),
            submitted: Arc::new(RwLock::new(None)),
        };
        let emitter = EventEmitter::new();
        let errors = EventEmitter::new();
        let alive = Arc::new(());
        tokio::spawn(watch_source(
            in_tx.clone(),
            emitter.clone(),
            errors.clone(),
            Arc::downgrade(&alive),
        ));

        Ok(Self {
            context,
            emitter,
            errors,
            in_setup,
            in_tx,
            _alive: alive,
        })
    }

    pub fn route(&self) -> Route {
        self.context.route
    }

    /// Steps to run before submitting the source transaction.
    pub fn in_setup(&self) -> &[SetupStep] {
        &self.in_setup
    }

    /// The source transaction.
    pub fn in_tx(&self) -> &InputTx {
        &self.in_tx
    }

    /// Fee schedule quoted by the verification network. The mock provider
    /// only applies it to mints; releases pay out the full burned amount.
    pub fn fees(&self) -> FeeSchedule {
        self.context.provider.fees()
    }

    /// Subscribes to `event` ("transaction").
    pub async fn on<F, Fut>(&self, event: &str, listener: F)
    where
        F: Fn(GatewayTransaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.emitter.on(event, listener).await;
    }

    /// Subscribes to detection failures of the submitted source transaction.
    /// At most one is raised, in place of the "transaction" notification.
    pub async fn on_error<F, Fut>(&self, listener: F)
    where
        F: Fn(SdkError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.errors.on(ERROR_EVENT, listener).await;
    }
}

async fn watch_source(
    in_tx: InputTx,
    emitter: EventEmitter<GatewayTransaction>,
    errors: EventEmitter<SdkError>,
    alive: Weak<()>,
) {
    let poll_interval = in_tx.context.poll_interval;
    while alive.upgrade().is_some() {
        let submitted = *in_tx.submitted.read().await;
        if let Some(tx_hash) = submitted {
            match GatewayTransaction::from_source(&in_tx.context, tx_hash).await {
                Ok(transaction) => {
                    info!("Detected source transaction {:#x}", tx_hash);
                    emitter.emit(TRANSACTION_EVENT, transaction).await;
                }
                Err(e) => {
                    warn!("Source transaction {:#x} unusable: {}", tx_hash, e);
                    errors.emit(ERROR_EVENT, e).await;
                }
            }
            return;
        }
        tokio::time::sleep(poll_interval).await;
    }
    debug!("Source watcher stopped before submission");
}

// ============================================================================
// SOURCE SIDE
// ============================================================================

/// Pre-submission step (ERC-20 approval of the lock gateway).
#[derive(Debug, Clone)]
pub struct SetupStep {
    name: String,
    context: Arc<TransferContext>,
    token: Address,
    spender: Address,
    amount: U256,
    receipt: Arc<RwLock<Option<TxReceipt>>>,
}

impl SetupStep {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn submit(&self) -> Result<TxReceipt> {
        let mut receipt = self.receipt.write().await;
        if receipt.is_some() {
            return Err(SdkError::AlreadyProcessed("in_setup.submit").into());
        }
        let token = Erc20::attach(self.context.from.chain.signer(), self.token);
        let mined = token.approve(self.spender, self.amount).await?;
        info!(
            "Approved {:#x} to spend {} of {:#x}",
            self.spender, self.amount, self.token
        );
        *receipt = Some(mined.clone());
        Ok(mined)
    }

    pub async fn wait(&self) -> Result<()> {
        let tx_hash = self
            .receipt
            .read()
            .await
            .as_ref()
            .map(|r| r.tx_hash)
            .ok_or(SdkError::NotSubmitted)?;
        wait_for_confirmations(
            self.context.from.chain.signer(),
            &tx_hash,
            1,
            self.context.poll_interval,
        )
        .await?;
        Ok(())
    }
}

/// Source transaction of a gateway transfer, before it is detected.
#[derive(Debug, Clone)]
pub struct InputTx {
    context: Arc<TransferContext>,
    submitted: Arc<RwLock<Option<H256>>>,
}

impl InputTx {
    /// Sends the lock, burn, or source contract call.
    pub async fn submit(&self) -> Result<TxReceipt> {
        let mut submitted = self.submitted.write().await;
        if submitted.is_some() {
            return Err(SdkError::AlreadyProcessed("in.submit").into());
        }

        let context = &self.context;
        let signer = context.from.chain.signer();
        let recipient = context.to.recipient();
        let receipt = match (&context.from.target, &context.source) {
            (EvmTarget::Account { amount: Some(amount) }, AssetRole::Lock(entry)) => {
                LockGateway::attach(signer, entry.gateway)
                    .lock(
                        &format!("{:#x}", recipient),
                        context.to.chain.name(),
                        Vec::new(),
                        *amount,
                    )
                    .await?
            }
            (EvmTarget::Account { amount: Some(amount) }, AssetRole::Mint(entry)) => {
                MintGateway::attach(signer, entry.gateway)
                    .burn(recipient.as_bytes().to_vec(), *amount)
                    .await?
            }
            (EvmTarget::Account { amount: None }, _) => {
                return Err(SdkError::UnsupportedRoute(
                    "source account needs an amount".to_string(),
                )
                .into())
            }
            (EvmTarget::Contract(call), _) => {
                let args = call.resolve(recipient);
                let (_, receipt) = signer.call(call.to, &call.method, args).await?;
                receipt
            }
        };

        info!(
            "Submitted {} source transaction {:#x} on {}",
            context.asset,
            receipt.tx_hash,
            context.from.chain.name()
        );
        *submitted = Some(receipt.tx_hash);
        Ok(receipt)
    }

    /// Waits for `confirmations` confirmations of the submitted transaction.
    pub async fn wait(&self, confirmations: u64) -> Result<()> {
        let tx_hash = self.tx_hash().await.ok_or(SdkError::NotSubmitted)?;
        wait_for_confirmations(
            self.context.from.chain.signer(),
            &tx_hash,
            confirmations,
            self.context.poll_interval,
        )
        .await?;
        Ok(())
    }

    pub async fn tx_hash(&self) -> Option<H256> {
        *self.submitted.read().await
    }
}

// ============================================================================
// DETECTED TRANSACTION
// ============================================================================

#[derive(Debug, Default)]
struct TransferProgress {
    confirmed: bool,
    signed: Option<SignedTransfer>,
    out: Option<TxReceipt>,
}

/// Source log data the approval is built from.
#[derive(Debug)]
struct SourceDetails {
    tx_hash: H256,
    amount: U256,
    n_hash: H256,
}

/// A detected transfer, yielded by the "transaction" notification.
#[derive(Debug, Clone)]
pub struct GatewayTransaction {
    pub in_tx: SourceTx,
    pub renvm: RenVmTx,
    pub out: OutputTx,
}

impl GatewayTransaction {
    async fn from_source(
        context: &Arc<TransferContext>,
        tx_hash: H256,
    ) -> std::result::Result<Self, SdkError> {
        let receipt = context
            .from
            .chain
            .signer()
            .chain()
            .receipt(&tx_hash)
            .await
            .map_err(|_| SdkError::MissingLog(tx_hash))?;
        let source_gateway = context.source.entry().gateway;

        let (nonce, amount, log_index) = receipt
            .logs
            .iter()
            .filter(|log| log.address == source_gateway)
            .find_map(|log| match &log.event {
                ContractEvent::LogLockToChain {
                    amount, lock_nonce, ..
                } => Some((*lock_nonce, *amount, log.log_index)),
                ContractEvent::LogBurn {
                    amount, burn_nonce, ..
                } => Some((*burn_nonce, *amount, log.log_index)),
                _ => None,
            })
            .ok_or(SdkError::MissingLog(tx_hash))?;

        let n_hash = crypto::nonce_hash(&H256::from_low_u64_be(nonce), &tx_hash, log_index);
        let details = Arc::new(SourceDetails {
            tx_hash,
            amount,
            n_hash,
        });
        let progress = Arc::new(RwLock::new(TransferProgress::default()));

        Ok(Self {
            in_tx: SourceTx {
                context: Arc::clone(context),
                details: Arc::clone(&details),
                progress: Arc::clone(&progress),
            },
            renvm: RenVmTx {
                context: Arc::clone(context),
                details,
                progress: Arc::clone(&progress),
            },
            out: OutputTx {
                context: Arc::clone(context),
                progress,
            },
        })
    }
}

/// Source side of a detected transfer.
#[derive(Debug, Clone)]
pub struct SourceTx {
    context: Arc<TransferContext>,
    details: Arc<SourceDetails>,
    progress: Arc<RwLock<TransferProgress>>,
}

impl SourceTx {
    pub fn tx_hash(&self) -> H256 {
        self.details.tx_hash
    }

    /// Amount locked or burned.
    pub fn amount(&self) -> U256 {
        self.details.amount
    }

    pub fn n_hash(&self) -> H256 {
        self.details.n_hash
    }

    pub async fn wait(&self, confirmations: u64) -> Result<()> {
        wait_for_confirmations(
            self.context.from.chain.signer(),
            &self.details.tx_hash,
            confirmations,
            self.context.poll_interval,
        )
        .await?;
        self.progress.write().await.confirmed = true;
        Ok(())
    }
}

/// Verification network side of a detected transfer.
#[derive(Debug, Clone)]
pub struct RenVmTx {
    context: Arc<TransferContext>,
    details: Arc<SourceDetails>,
    progress: Arc<RwLock<TransferProgress>>,
}

impl RenVmTx {
    /// Submits the transfer to the verification network for signing.
    pub async fn submit(&self) -> Result<SignedTransfer> {
        let mut progress = self.progress.write().await;
        if !progress.confirmed {
            return Err(SdkError::StageOutOfOrder {
                stage: "renvm.submit",
                requires: "in.wait",
            }
            .into());
        }

        let context = &self.context;
        let request = TransferRequest {
            kind: context.route.request_kind(),
            asset: context.asset.clone(),
            from_chain: context.from.chain.name().to_string(),
            to_chain: context.to.chain.name().to_string(),
            p_hash: context.p_hash,
            amount: self.details.amount,
            to: context.to.recipient(),
            n_hash: self.details.n_hash,
        };
        let signed = context.provider.submit(&request).await?;
        progress.signed = Some(signed.clone());
        Ok(signed)
    }

    /// Returns the signed approval once available.
    pub async fn wait(&self) -> Result<SignedTransfer> {
        let progress = self.progress.read().await;
        let signed = progress.signed.clone().ok_or(SdkError::StageOutOfOrder {
            stage: "renvm.wait",
            requires: "renvm.submit",
        })?;
        Ok(signed)
    }
}

/// Destination side of a detected transfer.
#[derive(Debug, Clone)]
pub struct OutputTx {
    context: Arc<TransferContext>,
    progress: Arc<RwLock<TransferProgress>>,
}

impl OutputTx {
    /// Whether a destination transaction still has to be submitted.
    pub async fn has_submit(&self) -> bool {
        self.progress.read().await.out.is_none()
    }

    /// Submits the mint or release on the destination chain.
    pub async fn submit(&self) -> Result<TxReceipt> {
        let mut progress = self.progress.write().await;
        if progress.out.is_some() {
            return Err(SdkError::AlreadyProcessed("out.submit").into());
        }
        let signed = progress.signed.clone().ok_or(SdkError::StageOutOfOrder {
            stage: "out.submit",
            requires: "renvm.wait",
        })?;

        let context = &self.context;
        let receipt = context
            .to
            .submit_output(
                context.route.request_kind(),
                context.destination.entry().gateway,
                context.p_hash,
                &signed,
            )
            .await?;
        info!(
            "Submitted {} {} on {} in {:#x}",
            signed.amount,
            context.asset,
            context.to.chain.name(),
            receipt.tx_hash
        );
        progress.out = Some(receipt.clone());
        Ok(receipt)
    }

    pub async fn wait(&self, confirmations: u64) -> Result<TxReceipt> {
        let receipt = self
            .progress
            .read()
            .await
            .out
            .clone()
            .ok_or(SdkError::StageOutOfOrder {
                stage: "out.wait",
                requires: "out.submit",
            })?;
        wait_for_confirmations(
            self.context.to.chain.signer(),
            &receipt.tx_hash,
            confirmations,
            self.context.poll_interval,
        )
        .await?;
        Ok(receipt)
    }
}

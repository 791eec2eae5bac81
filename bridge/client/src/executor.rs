// Copyright (c) 2024 The Botho Foundation

//! Bridge executor - drives one bridge execution at a time through
//! build, quote, sign, submit and confirm.

use alloy::primitives::{Address, B256};
use lz_nft_bridge_core::{
    BridgeConfig, BridgeError, BridgeExecution, BridgeForm, BridgeRequest, ExecutionId,
    ExecutionStatus, HistoryEntry, HistoryStatus, Network, PreparedBridge, Quote, TokenCatalog,
};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::builder::{BuiltRequest, RequestBuilder};
use crate::contract::Inclusion;
use crate::quoter::FeeQuoter;
use crate::wallet::{SigningRequest, WalletProvider, WalletSession};

struct ExecutorState {
    form: BridgeForm,
    current: Option<BridgeExecution>,
    history: Vec<HistoryEntry>,
    /// Execution whose transaction is being broadcast. Outlives a reset of
    /// that execution; no new execution starts while it is set.
    broadcasting: Option<ExecutionId>,
}

/// Clears `broadcasting` when the broadcast call returns or is dropped.
struct BroadcastClaim<'a> {
    state: &'a Mutex<ExecutorState>,
}

impl Drop for BroadcastClaim<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .broadcasting = None;
    }
}

struct Started {
    id: ExecutionId,
    session: WalletSession,
    request: Result<BridgeRequest, BridgeError>,
}

/// Owns the bridge form, the wallet session and the single execution slot.
///
/// Results of external calls are applied only if the execution that issued
/// them is still current; any input edit resets the slot.
pub struct BridgeExecutor {
    builder: RequestBuilder,
    quoter: FeeQuoter,
    receipt_timeout: Duration,
    session: RwLock<Option<WalletSession>>,
    state: Mutex<ExecutorState>,
    status_tx: watch::Sender<ExecutionStatus>,
}

impl BridgeExecutor {
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let settings = &config.bridge;
        let builder = RequestBuilder::new(
            config.registry(),
            config.catalog()?,
            settings.metadata_uri.clone(),
            settings.quote_timeout(),
        );
        let form = BridgeForm::new(
            settings.default_source,
            Some(settings.default_destination),
            u128::from(settings.default_gas_limit),
        );
        let (status_tx, _) = watch::channel(ExecutionStatus::Idle);

        Ok(Self {
            builder,
            quoter: FeeQuoter::new(settings.quote_timeout()),
            receipt_timeout: settings.receipt_timeout(),
            session: RwLock::new(None),
            state: Mutex::new(ExecutorState {
                form,
                current: None,
                history: Vec::new(),
                broadcasting: None,
            }),
            status_tx,
        })
    }

    // === Observation ===

    /// Watch the status of the execution slot.
    pub fn subscribe(&self) -> watch::Receiver<ExecutionStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> ExecutionStatus {
        self.state()
            .current
            .as_ref()
            .map(|execution| execution.status.clone())
            .unwrap_or(ExecutionStatus::Idle)
    }

    pub fn current(&self) -> Option<BridgeExecution> {
        self.state().current.clone()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state().history.clone()
    }

    pub fn form(&self) -> BridgeForm {
        self.state().form.clone()
    }

    pub fn catalog(&self) -> &TokenCatalog {
        self.builder.catalog()
    }

    pub fn account(&self) -> Option<Address> {
        self.session().map(|session| session.account())
    }

    // === Wallet ===

    pub async fn connect(&self, provider: Arc<dyn WalletProvider>) -> Result<Address, BridgeError> {
        let session = WalletSession::connect(provider).await?;
        let account = session.account();
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
        self.reset();
        Ok(account)
    }

    pub fn disconnect(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("Wallet disconnected");
        self.reset();
    }

    // === Inputs ===

    pub fn select_source(&self, network: Network) -> bool {
        self.edit(|form, catalog| form.select_source(catalog, network))
    }

    pub fn select_destination(&self, network: Network) -> bool {
        self.edit(|form, _| form.select_destination(network))
    }

    /// Select a destination by name; unknown names are rejected.
    pub fn select_destination_by_name(&self, name: &str) -> Result<bool, BridgeError> {
        Ok(self.select_destination(name.parse()?))
    }

    pub fn select_source_by_name(&self, name: &str) -> Result<bool, BridgeError> {
        Ok(self.select_source(name.parse()?))
    }

    pub fn select_token(&self, token: Option<&str>) -> bool {
        self.edit(|form, catalog| form.select_token(catalog, token))
    }

    pub fn set_token_id(&self, token_id: &str) -> bool {
        self.edit(|form, _| form.set_token_id(token_id))
    }

    pub fn set_gas_limit(&self, gas_limit: &str) -> bool {
        self.edit(|form, _| form.set_gas_limit(gas_limit))
    }

    /// Return the slot to `Idle`, discarding any in-flight execution.
    pub fn reset(&self) {
        let mut state = self.state();
        self.reset_locked(&mut state);
    }

    pub fn can_bridge(&self) -> bool {
        let connected = self.session().is_some();
        self.state().form.can_bridge(connected)
    }

    // === Flow ===

    /// Build and quote the current inputs without touching the execution
    /// slot.
    pub async fn preview(&self) -> Result<(PreparedBridge, Quote), BridgeError> {
        let session = self.session().ok_or(BridgeError::NotConnected)?;
        let request = self.state().form.to_request(session.account())?;
        let built = self.builder.build(&session, request).await?;
        let quote = self
            .quoter
            .quote(
                built.contract.as_ref(),
                built.prepared.route.dst_eid,
                &built.prepared.message,
            )
            .await?;
        Ok((built.prepared, quote))
    }

    /// Run one bridge execution to a terminal state.
    ///
    /// Rejected without changing state when disconnected, when the inputs
    /// are incomplete, or while another execution is in flight or still
    /// broadcasting. A terminal execution in the slot is replaced (retry).
    pub async fn bridge(&self) -> Result<BridgeExecution, BridgeError> {
        let Started {
            id,
            session,
            request,
        } = self.begin()?;
        let request = match request {
            Ok(request) => request,
            Err(e) => return Err(self.fail(id, e)),
        };
        self.update(id, |execution| {
            execution.request = Some(request.clone());
            true
        })?;

        // Building
        let built = match self
            .guarded(id, self.builder.build(&session, request))
            .await?
        {
            Ok(built) => built,
            Err(e) => return Err(self.fail(id, e)),
        };
        let route = built.prepared.route;
        self.update(id, |execution| {
            execution.route = Some(route);
            execution.advance(ExecutionStatus::Quoting)
        })?;

        // Quoting
        let quoting =
            self.quoter
                .quote(built.contract.as_ref(), route.dst_eid, &built.prepared.message);
        let quote = match self.guarded(id, quoting).await? {
            Ok(quote) => quote,
            Err(e) => return Err(self.fail(id, e)),
        };
        self.update(id, |execution| {
            execution.quote = Some(quote.clone());
            execution.advance(ExecutionStatus::AwaitingSignature)
        })?;

        // AwaitingSignature
        let tx_hash = match self.submit(id, &session, &built, &quote).await {
            Ok(tx_hash) => tx_hash,
            Err(BridgeError::Discarded(id)) => return Err(BridgeError::Discarded(id)),
            Err(e) => return Err(self.fail(id, e)),
        };
        if let Err(e) = self.update(id, |execution| {
            execution.advance(ExecutionStatus::Submitted { tx_hash })
        }) {
            warn!(execution = %id, tx_hash = %tx_hash, "Transaction sent for an execution that was reset");
            self.annotate_history(id, tx_hash);
            return Err(e);
        }

        // Submitted; waits out a reset and settles the history entry instead.
        let inclusion =
            tokio::time::timeout(self.receipt_timeout, built.contract.wait_for_inclusion(tx_hash))
                .await;
        if self.ensure_current(id).is_err() {
            self.settle_history(id, tx_hash, &inclusion);
            return Err(BridgeError::Discarded(id));
        }
        match inclusion {
            Ok(Ok(inclusion)) if inclusion.success => {
                info!(
                    execution = %id,
                    tx_hash = %tx_hash,
                    block = ?inclusion.block_number,
                    "Bridge transaction confirmed"
                );
                self.update(id, |execution| {
                    execution.advance(ExecutionStatus::Confirmed { tx_hash })
                })
            }
            Ok(Ok(_)) => Err(self.fail(id, BridgeError::ExecutionReverted { tx_hash })),
            Ok(Err(e)) => Err(self.fail(
                id,
                BridgeError::SubmissionError {
                    reason: e.to_string(),
                    tx_hash: Some(tx_hash),
                },
            )),
            Err(_) => Err(self.fail(
                id,
                BridgeError::SubmissionError {
                    reason: format!("no receipt within {:?}", self.receipt_timeout),
                    tx_hash: Some(tx_hash),
                },
            )),
        }
    }

    /// Ask for approval, then broadcast with the quoted fee attached.
    ///
    /// The approval prompt is dropped if the execution is reset. After
    /// approval the quote and the execution are checked again, so nothing
    /// is broadcast for a request that was edited while the signer was
    /// prompting.
    async fn submit(
        &self,
        id: ExecutionId,
        session: &WalletSession,
        built: &BuiltRequest,
        quote: &Quote,
    ) -> Result<B256, BridgeError> {
        let prepared = &built.prepared;
        let signing = SigningRequest {
            network: prepared.request.source,
            contract: prepared.route.source_contract,
            from: session.account(),
            dst_eid: prepared.route.dst_eid,
            token_id: prepared.request.token_id,
            native_fee: quote.native_fee,
        };

        info!(
            execution = %id,
            dst_eid = prepared.route.dst_eid,
            token_id = %prepared.request.token_id,
            native_fee = %quote.native_fee,
            "Requesting bridge signature"
        );
        if !self.guarded(id, session.provider().approve(&signing)).await? {
            info!(execution = %id, "Bridge signature declined");
            return Err(BridgeError::UserRejected);
        }

        let _claim = self.claim_broadcast(id, prepared, quote)?;
        built
            .contract
            .bridge(
                prepared.route.dst_eid,
                prepared.request.token_id,
                prepared.message.options.clone(),
                quote.native_fee,
            )
            .await
    }

    /// Check, under one lock, that the quote covers the message and the
    /// execution is current and unedited, then mark it as broadcasting.
    fn claim_broadcast(
        &self,
        id: ExecutionId,
        prepared: &PreparedBridge,
        quote: &Quote,
    ) -> Result<BroadcastClaim<'_>, BridgeError> {
        quote.ensure_covers(prepared.route.dst_eid, &prepared.message)?;

        let mut state = self.state();
        let revision = state.form.revision();
        match &state.current {
            Some(execution) if execution.id == id && execution.form_revision == revision => {}
            _ => {
                debug!(execution = %id, "Execution reset during signing; not broadcasting");
                return Err(BridgeError::Discarded(id));
            }
        }
        state.broadcasting = Some(id);

        Ok(BroadcastClaim { state: &self.state })
    }

    /// Await `fut` unless the execution is reset first, in which case the
    /// future is dropped and `Discarded` returned.
    async fn guarded<T>(
        &self,
        id: ExecutionId,
        fut: impl Future<Output = T>,
    ) -> Result<T, BridgeError> {
        let mut status_rx = self.subscribe();
        let reset = async {
            loop {
                if self.ensure_current(id).is_err() {
                    return;
                }
                if status_rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            output = fut => Ok(output),
            _ = reset => {
                debug!(execution = %id, "Execution reset while waiting; dropping call");
                Err(BridgeError::Discarded(id))
            }
        }
    }

    fn begin(&self) -> Result<Started, BridgeError> {
        let session = self.session().ok_or(BridgeError::NotConnected)?;
        let mut state = self.state();

        if let Some(current) = &state.current {
            if current.status.is_in_flight() {
                debug!(execution = %current.id, status = %current.status, "Bridge already in flight");
                return Err(BridgeError::ExecutionInFlight(current.id));
            }
        }
        if let Some(broadcasting) = state.broadcasting {
            debug!(execution = %broadcasting, "Previous bridge transaction still broadcasting");
            return Err(BridgeError::ExecutionInFlight(broadcasting));
        }
        if !state.form.can_bridge(true) {
            return Err(BridgeError::InvalidInput(
                "select a token and enter a token id".to_string(),
            ));
        }

        // Retry from a terminal state starts over from Idle.
        self.reset_locked(&mut state);

        let execution = BridgeExecution::start(state.form.revision());
        let id = execution.id;
        let request = state.form.to_request(session.account());
        info!(execution = %id, revision = execution.form_revision, "Starting bridge execution");

        state.current = Some(execution);
        self.status_tx.send_replace(ExecutionStatus::Building);
        Ok(Started {
            id,
            session,
            request,
        })
    }

    /// Apply `f` to the execution if it is still current.
    fn update(
        &self,
        id: ExecutionId,
        f: impl FnOnce(&mut BridgeExecution) -> bool,
    ) -> Result<BridgeExecution, BridgeError> {
        let mut state = self.state();
        let execution = match state.current.as_mut() {
            Some(execution) if execution.id == id => execution,
            _ => {
                debug!(execution = %id, "Discarding result of reset execution");
                return Err(BridgeError::Discarded(id));
            }
        };

        let previous = execution.status.clone();
        let advanced = f(execution);
        let snapshot = execution.clone();
        if !advanced {
            error!(execution = %id, from = %previous, "Illegal execution transition");
        } else if snapshot.status != previous {
            debug!(execution = %id, from = %previous, to = %snapshot.status, "Execution advanced");
        }

        if advanced && snapshot.status.is_terminal() {
            if let Some(entry) = snapshot.history_entry() {
                state.history.push(entry);
            }
        }
        self.status_tx.send_replace(snapshot.status.clone());
        Ok(snapshot)
    }

    /// Mark the execution failed. Returns the error to surface.
    fn fail(&self, id: ExecutionId, error: BridgeError) -> BridgeError {
        warn!(execution = %id, error = %error, phase = ?error.phase(), "Bridge execution failed");
        match self.update(id, |execution| execution.fail(&error)) {
            Ok(_) => error,
            Err(discarded) => discarded,
        }
    }

    fn ensure_current(&self, id: ExecutionId) -> Result<(), BridgeError> {
        match &self.state().current {
            Some(execution) if execution.id == id => Ok(()),
            _ => Err(BridgeError::Discarded(id)),
        }
    }

    fn annotate_history(&self, id: ExecutionId, tx_hash: B256) {
        let mut state = self.state();
        if let Some(entry) = state.history.iter_mut().find(|entry| entry.id == id) {
            entry.tx_hash = Some(tx_hash);
        }
    }

    /// Record the inclusion outcome of a transaction whose execution was
    /// reset while waiting. A lookup error or timeout leaves it pending.
    fn settle_history(
        &self,
        id: ExecutionId,
        tx_hash: B256,
        inclusion: &Result<Result<Inclusion, BridgeError>, tokio::time::error::Elapsed>,
    ) {
        let status = match inclusion {
            Ok(Ok(inclusion)) if inclusion.success => HistoryStatus::Completed,
            Ok(Ok(_)) => HistoryStatus::Failed,
            _ => {
                warn!(execution = %id, tx_hash = %tx_hash, "Outcome of reset execution unknown");
                return;
            }
        };

        let mut state = self.state();
        if let Some(entry) = state.history.iter_mut().find(|entry| entry.id == id) {
            if entry.resolve(status) {
                info!(execution = %id, tx_hash = %tx_hash, status = %status, "Settled reset execution");
            }
        }
    }

    fn edit(&self, f: impl FnOnce(&mut BridgeForm, &TokenCatalog) -> bool) -> bool {
        let mut state = self.state();
        let changed = f(&mut state.form, self.builder.catalog());
        if changed {
            self.reset_locked(&mut state);
        }
        changed
    }

    /// Clear the slot. An execution whose transaction was (or is being)
    /// sent goes to history as pending; one that never sent anything leaves
    /// no trace.
    fn reset_locked(&self, state: &mut ExecutorState) {
        if let Some(execution) = state.current.take() {
            if execution.status.is_in_flight() {
                info!(execution = %execution.id, status = %execution.status, "Resetting in-flight execution");
                let sent = execution.tx_hash().is_some() || state.broadcasting == Some(execution.id);
                if sent {
                    if let Some(entry) = execution.history_entry() {
                        state.history.push(entry);
                    }
                }
            }
        }
        self.status_tx.send_replace(ExecutionStatus::Idle);
    }

    fn state(&self) -> MutexGuard<'_, ExecutorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self) -> Option<WalletSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

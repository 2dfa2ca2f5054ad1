//! Search & rank engine
//!
//! [`SearchEngine`] is the single writer of all search state: the session,
//! the live collection, the active filter and weights. It is driven by
//! [`SearchEngine::process_next`], which waits on three inputs:
//! - batches from the session's ingestion task
//! - state changes from the download manager's own channel
//! - the filter debounce deadline
//!
//! The event bus is outbound only: the engine publishes lifecycle events on it
//! and never reads it back.
//!
//! Consumer calls (start, cancel, set filter/weight, enqueue) take `&mut self`
//! and run synchronously; only ingestion is asynchronous.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wkmp_common::events::{EventBus, WkmpEvent};

use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::filter::{FilterDebouncer, Predicate};
use crate::ingest::{spawn_ingest, CandidateSource, IngestEvent, IngestHandle, IngestMessage, StreamEnd};
use crate::models::{
    FilterState, FilterUpdate, Preset, RankingContext, RecordId, ResultRecord, SearchSession,
    SearchState, TrackStatus, WeightComponent, WeightVector,
};
use crate::query_tokens::{query_for_filter_change, tokens_from_query};
use crate::scoring::{
    BitrateRangeCondition, ConditionEvaluator, FeatureScorer, PreferredFormatCondition, ScoringEngine,
};
use crate::services::{DownloadManager, DownloadRequest, TrackStateUpdate};
use crate::view::ResultView;

/// Boost for records inside the requested bitrate range
const BITRATE_RANGE_BOOST: f64 = 0.5;

/// Boost for records in an explicitly allowed format
const PREFERRED_FORMAT_BOOST: f64 = 0.25;

pub struct SearchEngine {
    config: SearchConfig,
    scoring: ScoringEngine,
    source: Arc<dyn CandidateSource>,
    downloads: Arc<dyn DownloadManager>,
    event_bus: Arc<EventBus>,
    /// `None` once the manager's state channel has closed
    state_rx: Option<broadcast::Receiver<TrackStateUpdate>>,

    ingest_tx: mpsc::UnboundedSender<IngestMessage>,
    ingest_rx: mpsc::UnboundedReceiver<IngestMessage>,
    ingest: Option<IngestHandle>,

    session: SearchSession,
    view: ResultView,
    context: RankingContext,
    weights: WeightVector,
    filter: FilterState,
    debouncer: FilterDebouncer,
    /// Conditions supplied with the current search
    extra_conditions: Vec<Arc<dyn ConditionEvaluator>>,
    /// Active conditions: derived from the filter plus `extra_conditions`
    conditions: Vec<Arc<dyn ConditionEvaluator>>,
    presets: Vec<Preset>,
    /// Free-text field as the user sees it
    query_text: String,
}

impl SearchEngine {
    pub fn new(
        config: SearchConfig,
        source: Arc<dyn CandidateSource>,
        downloads: Arc<dyn DownloadManager>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();
        let state_rx = Some(downloads.subscribe_states());
        let filter = config.filter.clone();
        let conditions = derived_conditions(&filter);

        Self {
            scoring: ScoringEngine::default(),
            source,
            downloads,
            state_rx,
            event_bus,
            ingest_tx,
            ingest_rx,
            ingest: None,
            session: SearchSession::new("", "", false),
            view: ResultView::new(Predicate::compile(&filter)),
            context: RankingContext::default(),
            weights: config.weights,
            debouncer: FilterDebouncer::new(config.filter_debounce()),
            presets: config.presets(),
            extra_conditions: Vec::new(),
            conditions,
            filter,
            query_text: String::new(),
            config,
        }
    }

    /// Replace the feature scorer
    pub fn with_scorer(mut self, scorer: Arc<dyn FeatureScorer>) -> Self {
        self.scoring = ScoringEngine::new(scorer);
        self
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Start a search, cancelling any search in flight
    pub fn start_search(
        &mut self,
        query: &str,
        min_bitrate: u32,
        max_bitrate: u32,
        album_mode: bool,
    ) -> SearchResult<Uuid> {
        self.start_search_with_conditions(query, min_bitrate, max_bitrate, album_mode, Vec::new())
    }

    /// Start a search with additional preferred conditions for this search only
    pub fn start_search_with_conditions(
        &mut self,
        query: &str,
        min_bitrate: u32,
        max_bitrate: u32,
        album_mode: bool,
        conditions: Vec<Arc<dyn ConditionEvaluator>>,
    ) -> SearchResult<Uuid> {
        let mut base = self.filter.clone();
        base.min_bitrate = min_bitrate;
        base.max_bitrate = max_bitrate;
        base.validate()?;

        if self.session.is_searching() {
            info!(session_id = %self.session.session_id, "Cancelling previous search");
            self.cancel_search();
        }
        if let Some(previous) = self.ingest.take() {
            previous.cancel();
        }

        // Forward token sync only; the reverse mapping is never invoked here
        let extraction = tokens_from_query(query, &base);
        self.query_text = query.to_string();
        self.debouncer.cancel();
        self.filter = extraction.filter;
        self.extra_conditions = conditions;
        self.conditions = self.active_conditions();
        self.context = RankingContext::parse(&extraction.effective_query, album_mode);

        self.view.clear();
        self.view.set_predicate(Predicate::compile(&self.filter));

        let mut session = SearchSession::new(query, extraction.effective_query.clone(), album_mode);
        session.transition_to(SearchState::Searching)?;
        self.session = session;
        let session_id = self.session.session_id;

        info!(
            %session_id,
            query,
            effective_query = %extraction.effective_query,
            tokens = ?extraction.recognized,
            album_mode,
            "Search started"
        );
        self.event_bus.emit_lossy(WkmpEvent::SearchStarted {
            session_id,
            query: query.to_string(),
            effective_query: extraction.effective_query.clone(),
            timestamp: Utc::now(),
        });

        let stream = self.source.search(&extraction.effective_query, album_mode);
        self.ingest = Some(spawn_ingest(
            session_id,
            stream,
            Arc::clone(&self.downloads),
            self.config.batching.flush_interval(),
            self.config.batching.max_batch_size,
            self.ingest_tx.clone(),
        ));

        Ok(session_id)
    }

    /// Stop the running search. Records already shown stay visible.
    pub fn cancel_search(&mut self) {
        if !self.session.is_searching() {
            return;
        }
        if let Some(handle) = &self.ingest {
            handle.cancel();
        }
        if self.session.transition_to(SearchState::Cancelled).is_ok() {
            info!(session_id = %self.session.session_id, found = self.session.found, "Search cancelled");
            self.emit_ended();
        }
    }

    /// Discard all results and return to `Idle`
    pub fn clear_results(&mut self) {
        self.cancel_search();
        if let Some(handle) = self.ingest.take() {
            handle.cancel();
        }
        self.view.clear();
        // New session id, so leftovers of the old ingestion task are stale
        self.session = SearchSession::new("", "", false);
        debug!("Results cleared");
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Wait for and handle one input: an ingestion message, a track state
    /// change or the filter debounce deadline.
    pub async fn process_next(&mut self) {
        let deadline = self.debouncer.deadline();
        tokio::select! {
            Some(message) = self.ingest_rx.recv() => self.handle_ingest(message),
            update = next_state_update(&mut self.state_rx), if self.state_rx.is_some() => match update {
                Ok(update) => self.handle_state_update(update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Download state channel lagged, track states may be stale");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!("Download state channel closed");
                    self.state_rx = None;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                self.flush_pending_filter();
            }
        }
    }

    /// Process inputs until ingestion has finished and no filter edit is pending
    pub async fn run_until_idle(&mut self) {
        while self.ingest.is_some() || self.debouncer.deadline().is_some() {
            self.process_next().await;
        }
        self.drain();
    }

    /// Handle every input that is already queued, without waiting
    pub fn drain(&mut self) {
        while let Ok(message) = self.ingest_rx.try_recv() {
            self.handle_ingest(message);
        }
        while let Some(rx) = self.state_rx.as_mut() {
            match rx.try_recv() {
                Ok(update) => self.handle_state_update(update),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Download state channel lagged, track states may be stale");
                }
                Err(broadcast::error::TryRecvError::Closed) => self.state_rx = None,
                Err(broadcast::error::TryRecvError::Empty) => break,
            }
        }
    }

    fn handle_ingest(&mut self, message: IngestMessage) {
        if message.session_id != self.session.session_id {
            debug!(session_id = %message.session_id, "Dropping output of a replaced session");
            return;
        }

        match message.event {
            IngestEvent::Batch(batch) => {
                let (scoring, context, weights, conditions) =
                    (&self.scoring, &self.context, &self.weights, &self.conditions);
                let added = self.view.extend(batch, |record| {
                    scoring.score_into(record, context, weights, conditions)
                });
                self.session.found += added;
                if self.session.found > 0 {
                    self.view.recompute_percentiles();
                }
                debug!(
                    session_id = %self.session.session_id,
                    added,
                    found = self.session.found,
                    hidden = self.view.hidden_count(),
                    "Batch merged"
                );
                self.emit_progress();
            }
            IngestEvent::Finished(end) => {
                self.ingest = None;
                if !self.session.is_searching() {
                    // Already cancelled from this side
                    return;
                }
                let result = match end {
                    StreamEnd::Exhausted => self.session.complete(),
                    StreamEnd::Cancelled => self.session.transition_to(SearchState::Cancelled),
                    StreamEnd::Failed(message) => self.session.fail(message),
                };
                if let Err(e) = result {
                    warn!(error = %e, "Session did not accept stream end");
                    return;
                }
                if self.session.found > 0 {
                    self.view.recompute_percentiles();
                }
                info!(
                    session_id = %self.session.session_id,
                    state = ?self.session.state,
                    found = self.session.found,
                    visible = self.view.visible_len(),
                    "Search ended"
                );
                self.emit_ended();
            }
        }
    }

    fn handle_state_update(&mut self, update: TrackStateUpdate) {
        let status = TrackStatus::from_notification(update.state);
        let changed = self.view.set_status_for_hash(&update.source_hash, status);
        if changed > 0 {
            debug!(source_hash = %update.source_hash, ?status, changed, "Track status updated");
        }
    }

    // ------------------------------------------------------------------
    // Weights, presets, filters
    // ------------------------------------------------------------------

    /// Change one weight and rescore everything in place
    pub fn set_weight(&mut self, component: WeightComponent, value: f64) -> SearchResult<()> {
        let mut weights = self.weights;
        weights.set(component, value)?;
        self.weights = weights;
        debug!(component = component.as_str(), value, "Weight changed");
        self.rescore();
        Ok(())
    }

    /// Replace the whole weight vector
    pub fn set_weights(&mut self, weights: WeightVector) -> SearchResult<()> {
        weights.validate()?;
        self.weights = weights;
        self.rescore();
        Ok(())
    }

    /// Apply a named preset: weights and filter fields in one step
    pub fn apply_preset(&mut self, name: &str) -> SearchResult<()> {
        let preset = self
            .presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| SearchError::UnknownPreset(name.to_string()))?;
        preset.weights.validate()?;
        let filter = preset.apply_filter(&self.filter)?;
        let weights = preset.weights;
        info!(preset = %preset.name, "Applying preset");

        self.weights = weights;
        self.debouncer.cancel();
        self.commit_filter(filter);
        Ok(())
    }

    /// Edit one filter field. The query text follows immediately; the view
    /// follows once the debounce window elapses.
    pub fn set_filter(&mut self, update: FilterUpdate) -> SearchResult<()> {
        let next = self.filter.apply(&update).map_err(|e| {
            warn!(?update, error = %e, "Rejected filter edit");
            e
        })?;
        self.query_text = query_for_filter_change(&self.query_text, &self.filter, &next);
        self.filter = next.clone();
        self.debouncer.schedule(next, Instant::now());
        Ok(())
    }

    /// Compile a pending filter edit now instead of waiting for the window
    pub fn flush_pending_filter(&mut self) -> bool {
        match self.debouncer.flush() {
            Some(filter) => {
                self.commit_filter(filter);
                true
            }
            None => false,
        }
    }

    fn commit_filter(&mut self, filter: FilterState) {
        self.filter = filter;
        self.conditions = self.active_conditions();
        self.view.set_predicate(Predicate::compile(&self.filter));
        debug!(
            min_bitrate = self.filter.min_bitrate,
            floor = self.view.predicate().floor(),
            formats = ?self.filter.allowed_formats,
            guard = self.filter.reliability_guard,
            visible = self.view.visible_len(),
            hidden = self.view.hidden_count(),
            "Filter applied"
        );
        self.rescore();
    }

    /// Full O(n) rescore; never touches ingestion
    fn rescore(&mut self) {
        let (scoring, context, weights, conditions) =
            (&self.scoring, &self.context, &self.weights, &self.conditions);
        self.view
            .rescore(|record| scoring.score_into(record, context, weights, conditions));
        self.view.recompute_percentiles();
        debug!(records = self.view.len(), "Rescored live collection");
        self.emit_progress();
    }

    fn active_conditions(&self) -> Vec<Arc<dyn ConditionEvaluator>> {
        let mut conditions = derived_conditions(&self.filter);
        conditions.extend(self.extra_conditions.iter().cloned());
        conditions
    }

    /// A peer reported a new upload queue depth for one result. Only that
    /// record is rescored and moved; the reliability guard may hide or show it.
    pub fn update_queue_depth(&mut self, id: RecordId, queue_depth: u32) -> SearchResult<()> {
        let (scoring, context, weights, conditions) =
            (&self.scoring, &self.context, &self.weights, &self.conditions);
        let found = self.view.update_record(id, |record| {
            record.queue_depth = queue_depth;
            scoring.score_into(record, context, weights, conditions);
        });
        if !found {
            return Err(SearchError::UnknownRecord(id));
        }
        self.view.recompute_percentiles();
        debug!(record = %id, queue_depth, visible = self.view.visible_len(), "Queue depth updated");
        self.emit_progress();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Downloads
    // ------------------------------------------------------------------

    /// Hand one record to the download manager and mark it `Pending`
    pub fn enqueue_download(&mut self, id: RecordId) -> SearchResult<()> {
        let record = self.view.get(id).ok_or(SearchError::UnknownRecord(id))?;
        let request = DownloadRequest {
            source_hash: record.source_hash.clone(),
            peer_id: record.peer_id.clone(),
            filename: record.filename.clone(),
            file_size: record.file_size,
        };
        let hash = request.source_hash.clone();
        self.downloads.enqueue(request).map_err(SearchError::Download)?;
        self.view.set_status_for_hash(&hash, TrackStatus::Pending);
        info!(record = %id, source_hash = %hash, "Download enqueued");
        Ok(())
    }

    /// Enqueue a selection; unknown ids and refused requests are skipped.
    /// Returns the number enqueued.
    pub fn enqueue_selection(&mut self, ids: &[RecordId]) -> usize {
        let mut enqueued = 0;
        for &id in ids {
            match self.enqueue_download(id) {
                Ok(()) => enqueued += 1,
                Err(e) => warn!(record = %id, error = %e, "Skipping selected record"),
            }
        }
        enqueued
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    /// Visible results, best first
    pub fn results(&self) -> impl Iterator<Item = &ResultRecord> + '_ {
        self.view.visible()
    }

    /// Owned snapshot of the visible results
    pub fn visible_records(&self) -> Vec<ResultRecord> {
        self.view.visible().cloned().collect()
    }

    /// Every record in arrival order, visible or not
    pub fn all_records(&self) -> &[ResultRecord] {
        self.view.all()
    }

    pub fn record(&self, id: RecordId) -> Option<&ResultRecord> {
        self.view.get(id)
    }

    pub fn hidden_count(&self) -> usize {
        self.view.hidden_count()
    }

    pub fn visible_count(&self) -> usize {
        self.view.visible_len()
    }

    /// Records in the live collection, visible or not
    pub fn found(&self) -> usize {
        self.view.len()
    }

    pub fn is_searching(&self) -> bool {
        self.session.is_searching()
    }

    pub fn state(&self) -> SearchState {
        self.session.state
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn has_pending_filter(&self) -> bool {
        self.debouncer.pending().is_some()
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn status_text(&self) -> String {
        status_text(&self.session, self.view.visible_len(), self.view.hidden_count())
    }

    fn emit_progress(&self) {
        if self.session.state == SearchState::Idle {
            return;
        }
        self.event_bus.emit_lossy(WkmpEvent::SearchProgress {
            session_id: self.session.session_id,
            found: self.session.found,
            visible: self.view.visible_len(),
            hidden: self.view.hidden_count(),
            status_text: self.status_text(),
            timestamp: Utc::now(),
        });
    }

    fn emit_ended(&self) {
        if let Some(reason) = self.session.state.end_reason() {
            self.event_bus.emit_lossy(WkmpEvent::SearchEnded {
                session_id: self.session.session_id,
                reason,
                found: self.session.found,
                message: self.session.error.clone(),
                timestamp: Utc::now(),
            });
        }
    }
}

async fn next_state_update(
    rx: &mut Option<broadcast::Receiver<TrackStateUpdate>>,
) -> Result<TrackStateUpdate, broadcast::error::RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Conditions implied by the filter: the bitrate range and, when formats are
/// restricted, a preference for those formats
fn derived_conditions(filter: &FilterState) -> Vec<Arc<dyn ConditionEvaluator>> {
    let mut conditions: Vec<Arc<dyn ConditionEvaluator>> = vec![Arc::new(BitrateRangeCondition {
        min: filter.min_bitrate,
        max: filter.max_bitrate,
        boost: BITRATE_RANGE_BOOST,
    })];
    if !filter.allowed_formats.is_empty() {
        conditions.push(Arc::new(PreferredFormatCondition::new(
            &filter.allowed_formats,
            PREFERRED_FORMAT_BOOST,
        )));
    }
    conditions
}

/// User-facing status line
pub fn status_text(session: &SearchSession, visible: usize, hidden: usize) -> String {
    match session.state {
        SearchState::Idle => String::new(),
        SearchState::Searching => format!("Searching... {} found", session.found),
        SearchState::Completed if hidden > 0 => format!("{} results ({} hidden)", visible, hidden),
        SearchState::Completed => format!("{} results", visible),
        SearchState::NoResults => "No results found".to_string(),
        SearchState::Cancelled => format!("Search cancelled: {} results", session.found),
        SearchState::Failed => format!(
            "Search failed: {}",
            session.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

//! Request orchestration: drives each turn against the analysis service and
//! reconciles the response into the conversation and analytics stores.
//!
//! Both stores live behind one mutex that is never held across the network
//! await. The single-flight flag is what serialises turns; the mutex only
//! keeps reads from the rendering side consistent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use domain::{
    AnalysisRequest, AnalysisResponse, AnalysisTransport, AnalyticsStore, ConversationStore,
    Message, SyncError,
};
use shared::telemetry::Telemetry;
use shared::utils::truncate_for_log;
use tracing::{debug, warn};

use crate::session_view::{SessionView, TurnPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Whitespace-only input is never sent.
    Blank,
    /// A request is already in flight.
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptUpdate {
    /// Server history replaced the transcript.
    Merged(usize),
    /// Bootstrap seed replaced the transcript.
    Seeded(usize),
    /// Single reply appended as an assistant message.
    Appended,
    /// Nothing usable came back; transcript left as it was.
    Retained,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    pub transcript: TranscriptUpdate,
    pub analytics_replaced: bool,
    pub url: Option<String>,
    /// Non-fatal problems that were logged and skipped.
    pub warnings: Vec<SyncError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Reconciled(ReconcileReport),
    /// Carries the text now shown inline.
    Failed(String),
    Ignored(IgnoreReason),
}

impl TurnOutcome {
    pub fn is_reconciled(&self) -> bool {
        matches!(self, TurnOutcome::Reconciled(_))
    }
}

#[derive(Debug, Default)]
struct SessionState {
    conversation: ConversationStore,
    analytics: AnalyticsStore,
    current_url: Option<String>,
    phase: TurnPhase,
    error: Option<String>,
    /// Transcript length while the tail is a user message the server never
    /// confirmed (the turn came back with nothing to merge).
    unconfirmed_tail: Option<usize>,
}

impl SessionState {
    fn transition(&mut self, to: TurnPhase) {
        debug!(from = ?self.phase, to = ?to, "turn phase");
        self.phase = to;
    }

    /// Append the next user turn, replacing an unconfirmed one still on the
    /// tail so two user messages never sit next to each other.
    fn append_turn(&mut self, content: &str) -> Optimistic {
        let displaced = match self.unconfirmed_tail.take() {
            Some(len) if len == self.conversation.len() => self.conversation.rollback_last(),
            _ => None,
        };
        if let Some(message) = &displaced {
            debug!(content = %truncate_for_log(&message.content, 60), "replacing unconfirmed message");
        }
        Optimistic {
            id: self.conversation.append_optimistic(content),
            displaced,
        }
    }

    /// Undo `append_turn`: drop the new message and put back what it replaced.
    fn undo_turn(&mut self, optimistic: Optimistic) {
        if !rollback_optimistic(&mut self.conversation, optimistic.id) {
            return;
        }
        if let Some(message) = optimistic.displaced {
            self.unconfirmed_tail = Some(self.conversation.append_optimistic(message.content));
        }
    }
}

/// The user message sent with the turn in flight.
#[derive(Debug)]
struct Optimistic {
    id: usize,
    displaced: Option<Message>,
}

/// Holds the single-flight flag for one turn.
///
/// Dropping it before `complete` means the turn future was abandoned mid
/// flight: the optimistic message is rolled back and the phase returns to
/// idle.
struct FlightGuard<'a> {
    in_flight: &'a AtomicBool,
    state: &'a Mutex<SessionState>,
    optimistic: Option<Optimistic>,
    completed: bool,
}

impl FlightGuard<'_> {
    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            warn!("turn abandoned before the response arrived");
            if let Some(optimistic) = self.optimistic.take() {
                state.undo_turn(optimistic);
            }
            state.transition(TurnPhase::Idle);
        }
        self.in_flight.store(false, Ordering::Release);
    }
}

fn rollback_optimistic(conversation: &mut ConversationStore, id: usize) -> bool {
    if conversation.len() != id {
        warn!(
            expected_len = id,
            actual_len = conversation.len(),
            "optimistic message is no longer the tail; skipping rollback"
        );
        return false;
    }
    if let Some(removed) = conversation.rollback_last() {
        debug!(content = %truncate_for_log(&removed.content, 60), "rolled back optimistic message");
    }
    true
}

/// The request orchestrator. Sole writer of the conversation and analytics
/// stores.
pub struct AnalysisService<T> {
    transport: T,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
}

impl<T: AnalysisTransport> AnalysisService<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(SessionState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Ask the service for its greeting. Sent with an empty transcript, empty
    /// analytics and the bootstrap sentinel. Nothing is appended locally, so a
    /// failure only surfaces the error.
    pub async fn bootstrap(&self) -> TurnOutcome {
        let Some(mut flight) = self.begin_flight() else {
            return TurnOutcome::Ignored(IgnoreReason::Busy);
        };
        {
            let mut state = self.lock_state();
            state.error = None;
            state.transition(TurnPhase::Sending);
        }

        let timer = Telemetry::start("bootstrap");
        let result = self.transport.send(AnalysisRequest::bootstrap()).await;

        let mut state = self.lock_state();
        let outcome = match result.and_then(validate) {
            Ok(response) => {
                timer.finish(true);
                reconcile(&mut state, response, true)
            }
            Err(err) => {
                timer.finish(false);
                fail(&mut state, err, None)
            }
        };
        state.transition(TurnPhase::Idle);
        flight.complete();
        outcome
    }

    /// Submit one user turn.
    ///
    /// The trimmed text is appended optimistically, the full transcript and
    /// current analytics go out with it, and the response is reconciled. On
    /// failure the optimistic message is rolled back.
    pub async fn submit(&self, text: &str) -> TurnOutcome {
        let content = text.trim();
        if content.is_empty() {
            return TurnOutcome::Ignored(IgnoreReason::Blank);
        }
        let Some(mut flight) = self.begin_flight() else {
            debug!("submission ignored while a request is in flight");
            return TurnOutcome::Ignored(IgnoreReason::Busy);
        };

        let request = {
            let mut state = self.lock_state();
            state.error = None;
            flight.optimistic = Some(state.append_turn(content));
            state.transition(TurnPhase::Sending);
            AnalysisRequest {
                history: state.conversation.messages().to_vec(),
                analytics: state.analytics.request_payload(),
                message: content.to_string(),
            }
        };

        let timer = Telemetry::start("turn");
        let result = self.transport.send(request).await;

        let mut state = self.lock_state();
        let outcome = match result.and_then(validate) {
            Ok(response) => {
                timer.finish(true);
                reconcile(&mut state, response, false)
            }
            Err(err) => {
                timer.finish(false);
                fail(&mut state, err, flight.optimistic.take())
            }
        };
        state.transition(TurnPhase::Idle);
        flight.complete();
        outcome
    }

    /// Clear transcript, analytics, URL and error. Refused while busy.
    pub fn reset(&self) -> bool {
        let Some(mut flight) = self.begin_flight() else {
            return false;
        };
        let mut state = self.lock_state();
        *state = SessionState::default();
        debug!("session reset");
        flight.complete();
        true
    }

    pub fn dismiss_error(&self) {
        self.lock_state().error = None;
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Read-only copy of everything the rendering layer needs.
    pub fn view(&self) -> SessionView {
        let state = self.lock_state();
        SessionView {
            transcript: state.conversation.messages().to_vec(),
            analytics: state.analytics.snapshot().cloned(),
            reliability: state.analytics.reliability_verdict(),
            readability_percent: state.analytics.readability_display_percent(),
            current_url: state.current_url.clone(),
            phase: state.phase,
            busy: self.is_busy(),
            error: state.error.clone(),
        }
    }

    fn begin_flight(&self) -> Option<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                in_flight: &self.in_flight,
                state: &self.state,
                optimistic: None,
                completed: false,
            })
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A response with neither `response` nor `chat_history` fails the turn.
fn validate(response: AnalysisResponse) -> Result<AnalysisResponse, SyncError> {
    if response.response.is_none() && response.chat_history.is_none() {
        return Err(SyncError::MalformedResponse(
            "body has neither `response` nor `chat_history`".to_string(),
        ));
    }
    Ok(response)
}

fn fail(state: &mut SessionState, err: SyncError, optimistic: Option<Optimistic>) -> TurnOutcome {
    state.transition(TurnPhase::Failed);
    warn!(error = %err, "turn failed");
    if let Some(optimistic) = optimistic {
        state.undo_turn(optimistic);
    }
    let message = err.user_message();
    state.error = Some(message.clone());
    TurnOutcome::Failed(message)
}

fn reconcile(state: &mut SessionState, response: AnalysisResponse, bootstrap: bool) -> TurnOutcome {
    state.transition(TurnPhase::Reconciling);
    let mut warnings = Vec::new();

    let transcript = if bootstrap {
        seed_transcript(&mut state.conversation, &response, &mut warnings)
    } else {
        merge_transcript(&mut state.conversation, &response, &mut warnings)
    };
    let unconfirmed = !bootstrap && transcript == TranscriptUpdate::Retained;
    state.unconfirmed_tail = unconfirmed.then_some(state.conversation.len());

    // Independent of the transcript step: a bad payload is logged and the
    // previous snapshot stays.
    let analytics_replaced = match state.analytics.replace(response.analytics.as_ref()) {
        Ok(replaced) => replaced,
        Err(err) => {
            warn!(error = %err, "analytics not applied");
            warnings.push(err);
            false
        }
    };

    if let Some(url) = &response.url {
        state.current_url = Some(url.clone());
    }

    debug!(?transcript, analytics_replaced, "turn reconciled");
    TurnOutcome::Reconciled(ReconcileReport {
        transcript,
        analytics_replaced,
        url: response.url,
        warnings,
    })
}

fn merge_transcript(
    conversation: &mut ConversationStore,
    response: &AnalysisResponse,
    warnings: &mut Vec<SyncError>,
) -> TranscriptUpdate {
    if let Some(history) = response.history() {
        match history.and_then(|h| conversation.merge_server_history(h)) {
            Ok(len) => return TranscriptUpdate::Merged(len),
            Err(err) => {
                warn!(error = %err, "server history not merged; keeping local transcript");
                warnings.push(err);
            }
        }
    }
    match &response.response {
        Some(reply) => {
            conversation.append_reply(reply.clone());
            TranscriptUpdate::Appended
        }
        None => TranscriptUpdate::Retained,
    }
}

fn seed_transcript(
    conversation: &mut ConversationStore,
    response: &AnalysisResponse,
    warnings: &mut Vec<SyncError>,
) -> TranscriptUpdate {
    match response.bootstrap_seed() {
        Some(seed) => TranscriptUpdate::Seeded(conversation.set_bootstrap_history(seed)),
        None => {
            let err = SyncError::DegenerateMerge(
                "greeting carried no assistant message".to_string(),
            );
            warn!(error = %err, "bootstrap transcript left empty");
            warnings.push(err);
            TranscriptUpdate::Retained
        }
    }
}

//! Lifecycle of the single outstanding chat turn.
//!
//! The controller is a synchronous state machine. An async driver (see
//! [`crate::runtime`]) reports transport progress through the `on_*`
//! callbacks, tagging each with the [`TurnId`] handed out by
//! [`TurnController::begin_turn`]. Callbacks for any turn other than the
//! active one are ignored.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chat_api::{
    decode_record, CancellationSignal, ChatApiError, ChatSubmission, EventKind, LineBuffer,
    StreamEvent, SubmissionContext,
};

use crate::session::SessionIdentity;
use crate::transcript::Transcript;

pub type TurnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Sending,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl TurnPhase {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Sending | Self::Streaming)
    }
}

/// Cooperative cancellation handle for one turn.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    signal: CancellationSignal,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self {
            signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raises the signal. Returns `true` only for the call that raised it.
    pub fn cancel(&self) -> bool {
        !self.signal.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.load(Ordering::Acquire)
    }

    pub fn signal(&self) -> CancellationSignal {
        Arc::clone(&self.signal)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TurnState {
    pub pending: bool,
    pub active_cancel: Option<CancelHandle>,
    pub guardrail_notice: Option<String>,
    pub session: SessionIdentity,
}

/// Everything the transport needs to run a freshly started turn.
#[derive(Debug, Clone)]
pub struct TurnTicket {
    pub turn_id: TurnId,
    pub submission: ChatSubmission,
    pub cancel: CancellationSignal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSnapshot {
    pub turn_id: Option<TurnId>,
    pub phase: TurnPhase,
    pub pending: bool,
    pub guardrail_notice: Option<String>,
    pub last_error: Option<String>,
}

/// What one chunk (or the final flush) did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkReport {
    pub records: usize,
    pub decode_failures: usize,
    pub transcript_changed: bool,
    pub notice_changed: bool,
}

impl ChunkReport {
    pub fn changed(&self) -> bool {
        self.transcript_changed || self.notice_changed
    }
}

#[derive(Debug)]
pub struct TurnController {
    transcript: Transcript,
    state: TurnState,
    phase: TurnPhase,
    active_turn: Option<TurnId>,
    next_turn_id: TurnId,
    buffer: LineBuffer,
    last_error: Option<String>,
    context: SubmissionContext,
}

impl TurnController {
    pub fn new(context: SubmissionContext) -> Self {
        Self::with_session(context, SessionIdentity::new())
    }

    pub fn with_session(context: SubmissionContext, session: SessionIdentity) -> Self {
        Self {
            transcript: Transcript::new(),
            state: TurnState {
                session,
                ..TurnState::default()
            },
            phase: TurnPhase::Idle,
            active_turn: None,
            next_turn_id: 0,
            buffer: LineBuffer::default(),
            last_error: None,
            context,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn pending(&self) -> bool {
        self.state.pending
    }

    pub fn guardrail_notice(&self) -> Option<&str> {
        self.state.guardrail_notice.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn active_turn(&self) -> Option<TurnId> {
        self.active_turn.filter(|_| self.phase.is_active())
    }

    pub fn context(&self) -> &SubmissionContext {
        &self.context
    }

    pub fn session_id(&mut self) -> &str {
        self.state.session.session_id()
    }

    pub fn snapshot(&self) -> TurnSnapshot {
        TurnSnapshot {
            turn_id: self.active_turn,
            phase: self.phase,
            pending: self.state.pending,
            guardrail_notice: self.state.guardrail_notice.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Starts a turn for `text`, superseding any turn still in flight.
    ///
    /// Blank input starts nothing. Otherwise the text is stored and sent as
    /// typed, and the user message is in the transcript before this returns.
    pub fn begin_turn(&mut self, text: &str) -> Option<TurnTicket> {
        if text.trim().is_empty() {
            return None;
        }

        self.supersede_active();

        self.next_turn_id += 1;
        let turn_id = self.next_turn_id;
        let handle = CancelHandle::new();
        let cancel = handle.signal();

        self.transcript.push_user(text);
        self.buffer.clear();
        self.last_error = None;
        self.state.guardrail_notice = None;
        self.state.pending = true;
        self.state.active_cancel = Some(handle);
        self.active_turn = Some(turn_id);
        self.phase = TurnPhase::Sending;
        tracing::debug!(turn_id, phase = ?self.phase, "turn started");

        let session_id = self.session_id().to_owned();
        let submission = ChatSubmission::new(session_id, text, self.context.clone());
        Some(TurnTicket {
            turn_id,
            submission,
            cancel,
        })
    }

    pub fn on_stream_opened(&mut self, turn_id: TurnId) -> bool {
        if !self.accepts(turn_id) {
            return false;
        }

        self.phase = TurnPhase::Streaming;
        tracing::debug!(turn_id, phase = ?self.phase, "turn streaming");
        true
    }

    /// Feeds one text chunk through the buffer, decoder and merge engine.
    pub fn on_chunk(&mut self, turn_id: TurnId, chunk: &str) -> ChunkReport {
        let mut report = ChunkReport::default();
        if !self.accepts(turn_id) {
            return report;
        }

        self.phase = TurnPhase::Streaming;
        for record in self.buffer.feed(chunk) {
            self.apply_record(turn_id, &record, &mut report);
        }
        report
    }

    /// Flushes any undelimited remainder and completes the turn.
    pub fn on_stream_end(&mut self, turn_id: TurnId) -> ChunkReport {
        let mut report = ChunkReport::default();
        if !self.accepts(turn_id) {
            return report;
        }

        if let Some(record) = self.buffer.finish() {
            self.apply_record(turn_id, &record, &mut report);
        }

        if self.transcript.seal_active().is_updated() {
            report.transcript_changed = true;
        }
        self.finish(TurnPhase::Completed);
        tracing::debug!(turn_id, phase = ?self.phase, "turn completed");
        report
    }

    /// Ends the turn on a transport failure. Cancellation is routed to
    /// [`Self::on_cancelled`] and never recorded as an error.
    pub fn on_transport_error(&mut self, turn_id: TurnId, error: &ChatApiError) -> bool {
        if error.is_cancelled() {
            return self.on_cancelled(turn_id);
        }
        if !self.accepts(turn_id) {
            return false;
        }

        tracing::warn!(turn_id, error = %error, "chat turn failed");
        self.last_error = Some(error.to_string());
        self.finish(TurnPhase::Failed);
        true
    }

    pub fn on_cancelled(&mut self, turn_id: TurnId) -> bool {
        if self.active_turn != Some(turn_id) || !self.phase.is_active() {
            return false;
        }

        if let Some(handle) = &self.state.active_cancel {
            handle.cancel();
        }
        self.finish(TurnPhase::Cancelled);
        tracing::debug!(turn_id, phase = ?self.phase, "turn cancelled");
        true
    }

    /// Explicit stop requested by the user.
    pub fn cancel_active(&mut self) -> Option<TurnId> {
        let turn_id = self.active_turn()?;
        self.on_cancelled(turn_id);
        Some(turn_id)
    }

    fn supersede_active(&mut self) {
        if let Some(handle) = self.state.active_cancel.take() {
            handle.cancel();
        }

        if let Some(turn_id) = self.active_turn() {
            self.finish(TurnPhase::Cancelled);
            tracing::debug!(turn_id, "turn superseded");
        }
    }

    fn accepts(&self, turn_id: TurnId) -> bool {
        self.active_turn == Some(turn_id)
            && self.phase.is_active()
            && !self
                .state
                .active_cancel
                .as_ref()
                .is_some_and(CancelHandle::is_cancelled)
    }

    fn finish(&mut self, phase: TurnPhase) {
        self.phase = phase;
        self.state.pending = false;
        self.state.active_cancel = None;
        self.buffer.clear();
    }

    fn apply_record(&mut self, turn_id: TurnId, record: &str, report: &mut ChunkReport) {
        report.records += 1;
        match decode_record(record) {
            Ok(event) => self.apply_event(turn_id, &event, report),
            Err(error) => {
                report.decode_failures += 1;
                tracing::warn!(turn_id, record_len = record.len(), reason = %error, "skipping stream record");
            }
        }
    }

    fn apply_event(&mut self, turn_id: TurnId, event: &StreamEvent, report: &mut ChunkReport) {
        if let Some(notice) = event.guardrail_notice() {
            if self.state.guardrail_notice.as_deref() != Some(notice) {
                tracing::info!(turn_id, action = notice, "guardrail notice");
                self.state.guardrail_notice = Some(notice.to_owned());
                report.notice_changed = true;
            }
        }

        if event.kind == EventKind::Guardrail {
            return;
        }

        if self.transcript.apply_event(event).is_updated() {
            report.transcript_changed = true;
        }

        if event.kind == EventKind::Final {
            self.state.pending = false;
        }
    }
}

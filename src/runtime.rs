use std::sync::{Arc, Mutex, MutexGuard};

use chat_api::{await_or_cancel, ChatApiError};
use futures_util::StreamExt;

use crate::turn::{ChunkReport, TurnController, TurnId, TurnPhase, TurnSnapshot, TurnTicket};
use crate::transport::ChatTransport;

/// How a submitted turn ended, from the submitter's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input; no turn was started.
    Ignored,
    Completed { turn_id: TurnId },
    Cancelled { turn_id: TurnId },
    Failed { turn_id: TurnId, error: String },
}

/// Drives turns against a transport, one chunk at a time.
///
/// The controller lock is only held between suspension points, so a chunk is
/// applied atomically with respect to anyone reading the controller.
#[derive(Clone)]
pub struct ChatRuntime {
    controller: Arc<Mutex<TurnController>>,
    transport: Arc<dyn ChatTransport>,
}

impl ChatRuntime {
    pub fn new(controller: TurnController, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            transport,
        }
    }

    pub fn with_controller<R>(&self, read: impl FnOnce(&TurnController) -> R) -> R {
        read(&lock_unpoisoned(&self.controller))
    }

    pub fn snapshot(&self) -> TurnSnapshot {
        lock_unpoisoned(&self.controller).snapshot()
    }

    /// Cancels the active turn, if any. Its driver resolves as cancelled.
    pub fn cancel(&self) -> Option<TurnId> {
        lock_unpoisoned(&self.controller).cancel_active()
    }

    pub async fn submit(&self, text: &str) -> TurnOutcome {
        self.submit_observed(text, |_, _| {}).await
    }

    /// Runs one turn to its end, calling `observe` after every chunk that
    /// changed the transcript or the guardrail notice.
    pub async fn submit_observed<F>(&self, text: &str, mut observe: F) -> TurnOutcome
    where
        F: FnMut(&TurnController, &ChunkReport) + Send,
    {
        let Some(ticket) = lock_unpoisoned(&self.controller).begin_turn(text) else {
            return TurnOutcome::Ignored;
        };
        let TurnTicket {
            turn_id,
            submission,
            cancel,
        } = ticket;

        let mut chunks = match self.transport.open(submission, Arc::clone(&cancel)).await {
            Ok(chunks) => chunks,
            Err(error) => return self.fail(turn_id, &error),
        };

        if !lock_unpoisoned(&self.controller).on_stream_opened(turn_id) {
            return self.settle(turn_id);
        }

        loop {
            let next = match await_or_cancel(chunks.next(), Some(&cancel)).await {
                Ok(next) => next,
                Err(error) => return self.fail(turn_id, &error),
            };

            let mut controller = lock_unpoisoned(&self.controller);
            match next {
                Some(Ok(chunk)) => {
                    let report = controller.on_chunk(turn_id, &chunk);
                    if report.changed() {
                        observe(&controller, &report);
                    }
                    if controller.active_turn() != Some(turn_id) {
                        drop(controller);
                        return self.settle(turn_id);
                    }
                }
                Some(Err(error)) => {
                    drop(controller);
                    return self.fail(turn_id, &error);
                }
                None => {
                    let report = controller.on_stream_end(turn_id);
                    if report.changed() {
                        observe(&controller, &report);
                    }
                    drop(controller);
                    return self.settle(turn_id);
                }
            }
        }
    }

    fn fail(&self, turn_id: TurnId, error: &ChatApiError) -> TurnOutcome {
        lock_unpoisoned(&self.controller).on_transport_error(turn_id, error);
        self.settle(turn_id)
    }

    fn settle(&self, turn_id: TurnId) -> TurnOutcome {
        let controller = lock_unpoisoned(&self.controller);
        let snapshot = controller.snapshot();
        if snapshot.turn_id != Some(turn_id) {
            return TurnOutcome::Cancelled { turn_id };
        }

        match snapshot.phase {
            TurnPhase::Completed => TurnOutcome::Completed { turn_id },
            TurnPhase::Failed => TurnOutcome::Failed {
                turn_id,
                error: snapshot.last_error.unwrap_or_default(),
            },
            _ => TurnOutcome::Cancelled { turn_id },
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

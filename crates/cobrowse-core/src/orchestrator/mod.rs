//! Conversation driver: user turn -> model -> actions -> follow-up, until the model stops acting.

mod backend;

pub use backend::{BackendError, ChatBackend};

use crate::chat::{ChatRequest, ToolResultsRequest, APOLOGY};
use crate::conversation::ConversationState;
use crate::executor::ActionRegistry;
use crate::page::{page_content_snapshot, PageDocument};
use crate::shared::{ActionOutcome, Turn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const FOLLOW_UP_SUCCESS_ACK: &str = "Done! The action was completed successfully.";
pub const FOLLOW_UP_FAILURE_ACK: &str = "I encountered an issue. Please try again.";
pub const FOLLOW_UP_CAP_NOTE: &str =
    "I've paused here to avoid repeating actions. Let me know if you'd like me to keep going.";

/// Where the current cycle is. Submissions are accepted only in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingModel,
    ExecutingActions,
    AwaitingFollowUp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("message cannot be empty")]
    Empty,
    #[error("a previous message is still being handled")]
    Busy,
}

/// What one user turn produced.
#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    /// Assistant turns appended during this cycle, in order.
    pub replies: Vec<String>,
    /// One entry per executed batch.
    pub batches: Vec<Vec<ActionOutcome>>,
    pub follow_up_rounds: u32,
    /// True when the loop stopped because the follow-up cap was reached.
    pub capped: bool,
}

/// Drives one session. Conversation state lives here, is only touched between awaited steps,
/// and is dropped with the orchestrator.
pub struct Orchestrator {
    backend: Arc<dyn ChatBackend>,
    actions: Arc<ActionRegistry>,
    page: Arc<dyn PageDocument>,
    conversation: Mutex<ConversationState>,
    phase: Mutex<Phase>,
    in_flight: AtomicBool,
    max_follow_up_rounds: u32,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn ChatBackend>, actions: Arc<ActionRegistry>, page: Arc<dyn PageDocument>) -> Self {
        Self {
            backend,
            actions,
            page,
            conversation: Mutex::new(ConversationState::new()),
            phase: Mutex::new(Phase::Idle),
            in_flight: AtomicBool::new(false),
            max_follow_up_rounds: 5,
        }
    }

    /// Opens the session with the widget's greeting turn.
    pub fn with_greeting(self, greeting: impl Into<String>) -> Self {
        *self.conversation() = ConversationState::with_greeting(greeting);
        self
    }

    /// Caps follow-up rounds per user turn (at least one).
    pub fn with_max_follow_up_rounds(mut self, rounds: u32) -> Self {
        self.max_follow_up_rounds = rounds.max(1);
        self
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.conversation().turns().to_vec()
    }

    /// Handles one user message through the whole request/execute/follow-up cycle.
    /// Rejects blank messages and submissions made while a cycle is in flight.
    pub async fn submit(&self, text: &str) -> Result<TurnReport, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::Empty);
        }
        let _cycle = CycleGuard::enter(self)?;
        let mut report = TurnReport::default();

        let page_content = page_content_snapshot(self.page.as_ref());
        let history = {
            let mut conversation = self.conversation();
            let history = conversation.turns().to_vec();
            conversation.push(Turn::user(text));
            history
        };

        self.set_phase(Phase::AwaitingModel);
        let request = ChatRequest {
            message: text.to_string(),
            conversation_history: history,
            page_content: Some(page_content),
            section_id: None,
        };
        let mut pending = match self.backend.send_message(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(target: "cobrowse::orchestrator", error = %e, "chat request failed");
                self.reply(&mut report, APOLOGY);
                return Ok(report);
            }
        };
        self.reply(&mut report, &pending.message);

        while pending.wants_actions() {
            if report.follow_up_rounds >= self.max_follow_up_rounds {
                tracing::warn!(
                    target: "cobrowse::orchestrator",
                    rounds = report.follow_up_rounds,
                    "follow-up cap reached; dropping further action requests"
                );
                report.capped = true;
                self.reply(&mut report, FOLLOW_UP_CAP_NOTE);
                break;
            }

            self.set_phase(Phase::ExecutingActions);
            let outcomes = self.actions.execute_batch(&pending.tool_calls).await;
            let all_succeeded = outcomes.iter().all(|o| o.success);
            report.batches.push(outcomes.clone());
            report.follow_up_rounds += 1;

            self.set_phase(Phase::AwaitingFollowUp);
            let request = ToolResultsRequest {
                tool_results: outcomes,
                conversation_history: self.turns(),
            };
            pending = match self.backend.send_tool_results(&request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        target: "cobrowse::orchestrator",
                        error = %e,
                        all_succeeded,
                        "follow-up narration failed"
                    );
                    let ack = if all_succeeded { FOLLOW_UP_SUCCESS_ACK } else { FOLLOW_UP_FAILURE_ACK };
                    self.reply(&mut report, ack);
                    break;
                }
            };
            self.reply(&mut report, &pending.message);
        }

        Ok(report)
    }

    fn reply(&self, report: &mut TurnReport, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.conversation().push(Turn::assistant(text));
        report.replies.push(text.to_string());
    }

    fn conversation(&self) -> MutexGuard<'_, ConversationState> {
        self.conversation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }
}

/// Marks a cycle as in flight; returns the orchestrator to `Idle` when dropped.
struct CycleGuard<'a> {
    orchestrator: &'a Orchestrator,
}

impl<'a> CycleGuard<'a> {
    fn enter(orchestrator: &'a Orchestrator) -> Result<Self, SubmitError> {
        orchestrator
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SubmitError::Busy)?;
        Ok(Self { orchestrator })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.set_phase(Phase::Idle);
        self.orchestrator.in_flight.store(false, Ordering::Release);
    }
}

//! ConversationSession — chat history, the follow-up question sequence,
//! and single-flight backend calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::message::{ChatMessage, MessageId, Sender};
use super::prompts;
use crate::blocks::Block;
use crate::client::{ChatRequest, CoachBackend, FollowupAnswers, PlanRequest};
use crate::config::CoachConfig;
use crate::error::{SessionError, TransportError};
use crate::onboarding::ChatSeed;

/// Broadcast capacity for appended messages.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Where the conversation is in the follow-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    /// Greeting shown; follow-up question 1 not asked yet. Input here is
    /// taken as the answer to question 1.
    Greeting,
    CollectingQ1,
    CollectingQ2,
    CollectingQ3,
    FreeChat,
}

impl ConversationStage {
    /// Whether input in this stage is a follow-up answer rather than chat.
    pub fn is_collecting(&self) -> bool {
        !matches!(self, Self::FreeChat)
    }

    /// Whether input in this stage triggers a backend call.
    pub fn issues_call(&self) -> bool {
        matches!(self, Self::CollectingQ3 | Self::FreeChat)
    }

    /// 1-based follow-up question this stage is waiting on, if any.
    pub fn question_number(&self) -> Option<usize> {
        match self {
            Self::Greeting | Self::CollectingQ1 => Some(1),
            Self::CollectingQ2 => Some(2),
            Self::CollectingQ3 => Some(3),
            Self::FreeChat => None,
        }
    }
}

impl std::fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::CollectingQ1 => "collecting_q1",
            Self::CollectingQ2 => "collecting_q2",
            Self::CollectingQ3 => "collecting_q3",
            Self::FreeChat => "free_chat",
        };
        write!(f, "{s}")
    }
}

/// Stage plus the orthogonal in-flight flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub stage: ConversationStage,
    pub sending: bool,
}

/// What a successful `submit` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A follow-up answer was recorded and the next question asked.
    Answered { next: ConversationStage },
    /// The backend call succeeded and its reply was appended.
    Replied { message_id: MessageId },
    /// The backend call failed; an error message was appended.
    Failed { message_id: MessageId, error: String },
}

/// Marks a backend call in flight. Clearing happens on drop, so every exit
/// path of the call (including a dropped future) releases the session.
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

enum Call {
    Plan(PlanRequest),
    Chat(ChatRequest),
}

struct SessionInner {
    stage: ConversationStage,
    followup: FollowupAnswers,
    history: Vec<ChatMessage>,
    next_id: u64,
    plan_session_id: Option<String>,
}

/// A coaching conversation. Share it as `Arc<ConversationSession>`.
pub struct ConversationSession {
    seed: ChatSeed,
    backend: Arc<dyn CoachBackend>,
    user_name: String,
    device_id: Option<String>,
    followup_delay: Duration,
    inner: RwLock<SessionInner>,
    sending: AtomicBool,
    tx: broadcast::Sender<ChatMessage>,
}

impl ConversationSession {
    /// Open a session seeded with the greeting and the onboarding summary.
    pub fn new(seed: ChatSeed, backend: Arc<dyn CoachBackend>, config: &CoachConfig) -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        let mut inner = SessionInner {
            stage: ConversationStage::Greeting,
            followup: FollowupAnswers::default(),
            history: Vec::new(),
            next_id: 1,
            plan_session_id: None,
        };

        Self::push(
            &mut inner,
            &tx,
            Sender::Bot,
            vec![Block::markdown("welcome-1", prompts::GREETING)],
        );
        Self::push(
            &mut inner,
            &tx,
            Sender::Bot,
            vec![Block::markdown("welcome-2", prompts::INTRO)],
        );
        Self::push(
            &mut inner,
            &tx,
            Sender::Bot,
            vec![
                Block::markdown("summary", prompts::onboarding_summary(&seed)),
                Block::markdown("guide", prompts::GUIDE),
            ],
        );

        Self {
            seed,
            backend,
            user_name: config.user_name.clone(),
            device_id: config.device_id.clone(),
            followup_delay: config.followup_delay,
            inner: RwLock::new(inner),
            sending: AtomicBool::new(false),
            tx,
        }
    }

    /// Subscribe to every message appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatMessage> {
        self.tx.subscribe()
    }

    /// Snapshot of the full history.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.inner.read().await.history.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            stage: self.inner.read().await.stage,
            sending: self.sending.load(Ordering::Acquire),
        }
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    pub async fn followup_answers(&self) -> FollowupAnswers {
        self.inner.read().await.followup.clone()
    }

    /// Session id returned by plan-init, once it succeeded.
    pub async fn plan_session_id(&self) -> Option<String> {
        self.inner.read().await.plan_session_id.clone()
    }

    /// Ask follow-up question 1. No-op (returns false) once past the
    /// greeting, so a late timer cannot ask it twice.
    pub async fn ask_first_question(&self) -> bool {
        let mut inner = self.inner.write().await;
        if inner.stage != ConversationStage::Greeting {
            return false;
        }
        self.ask(&mut inner, 1);
        inner.stage = ConversationStage::CollectingQ1;
        true
    }

    /// Ask follow-up question 1 after the configured delay.
    pub fn spawn_first_question(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(session.followup_delay).await;
            session.ask_first_question().await;
        })
    }

    /// Handle one user input.
    ///
    /// The input is appended as a user message, then either recorded as a
    /// follow-up answer or sent to the backend. Rejected with
    /// [`SessionError::Busy`] (and not appended) while a call is in flight.
    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let (call, guard) = {
            let mut inner = self.inner.write().await;
            if self.sending.load(Ordering::Acquire) {
                debug!("Input rejected while a request is in flight");
                return Err(SessionError::Busy);
            }

            let stage = inner.stage;
            let guard = if stage.issues_call() {
                Some(InFlight::acquire(&self.sending).ok_or(SessionError::Busy)?)
            } else {
                None
            };

            let user_id = Self::peek_id(&inner);
            Self::push(
                &mut inner,
                &self.tx,
                Sender::User,
                vec![Block::markdown(format!("user-{user_id}"), text)],
            );

            match stage {
                ConversationStage::Greeting | ConversationStage::CollectingQ1 => {
                    inner.followup.q1 = text.to_string();
                    return Ok(self.next_question(&mut inner, ConversationStage::CollectingQ2, 2));
                }
                ConversationStage::CollectingQ2 => {
                    inner.followup.q2 = text.to_string();
                    return Ok(self.next_question(&mut inner, ConversationStage::CollectingQ3, 3));
                }
                ConversationStage::CollectingQ3 => {
                    inner.followup.q3 = text.to_string();
                    inner.stage = ConversationStage::FreeChat;
                    info!("Follow-up answers complete, requesting plan");
                    let request = PlanRequest {
                        user_name: self.user_name.clone(),
                        basic_info: self.seed.basic_info.clone(),
                        lifestyle: self.seed.lifestyle.clone(),
                        followup: inner.followup.clone(),
                        device_id: self.device_id.clone(),
                    };
                    (Call::Plan(request), guard)
                }
                ConversationStage::FreeChat => (
                    Call::Chat(ChatRequest {
                        message: text.to_string(),
                        device_id: self.device_id.clone(),
                    }),
                    guard,
                ),
            }
        };

        let outcome = self.dispatch(call).await;
        drop(guard);
        Ok(outcome)
    }

    /// Run a backend call and append its result. Failures become one
    /// error message; nothing is retried.
    async fn dispatch(&self, call: Call) -> SubmitOutcome {
        let result: Result<(Vec<Block>, Option<String>), TransportError> = match call {
            Call::Plan(request) => self.backend.init_plan(request).await.map(|resp| {
                info!(status = %resp.status, "Plan response received");
                (
                    vec![Block::markdown("plan", resp.message)],
                    resp.session_id,
                )
            }),
            Call::Chat(request) => self
                .backend
                .chat(request)
                .await
                .map(|reply| (reply.content.blocks, None)),
        };

        let mut inner = self.inner.write().await;
        let id = Self::peek_id(&inner);
        match result {
            Ok((blocks, session_id)) => {
                if session_id.is_some() {
                    inner.plan_session_id = session_id;
                }
                let blocks = if blocks.is_empty() {
                    vec![Block::markdown(format!("bot-fallback-{id}"), prompts::EMPTY_REPLY)]
                } else {
                    blocks
                };
                let message_id = Self::push(&mut inner, &self.tx, Sender::Bot, blocks);
                SubmitOutcome::Replied { message_id }
            }
            Err(e) => {
                warn!(error = %e, "Backend call failed");
                let message_id = Self::push(
                    &mut inner,
                    &self.tx,
                    Sender::Bot,
                    vec![Block::markdown(format!("bot-error-{id}"), prompts::SERVER_ERROR)],
                );
                SubmitOutcome::Failed {
                    message_id,
                    error: e.to_string(),
                }
            }
        }
    }

    fn next_question(
        &self,
        inner: &mut SessionInner,
        next: ConversationStage,
        step: usize,
    ) -> SubmitOutcome {
        inner.stage = next;
        self.ask(inner, step);
        debug!(stage = %next, "Follow-up answer recorded");
        SubmitOutcome::Answered { next }
    }

    fn ask(&self, inner: &mut SessionInner, step: usize) {
        let id = Self::peek_id(inner);
        Self::push(
            inner,
            &self.tx,
            Sender::Bot,
            vec![Block::markdown(format!("q{step}-{id}"), prompts::followup_question(step))],
        );
    }

    fn peek_id(inner: &SessionInner) -> MessageId {
        MessageId(inner.next_id)
    }

    fn push(
        inner: &mut SessionInner,
        tx: &broadcast::Sender<ChatMessage>,
        sender: Sender,
        blocks: Vec<Block>,
    ) -> MessageId {
        let id = MessageId(inner.next_id);
        inner.next_id += 1;
        let message = ChatMessage::new(id, sender, blocks);
        debug!(message_id = %id, sender = %sender, "Message appended");
        inner.history.push(message.clone());
        // ok if nobody is listening
        let _ = tx.send(message);
        id
    }
}

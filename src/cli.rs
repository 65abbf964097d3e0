//! Terminal front-end — onboarding prompts and chat over stdin/stdout.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt, stream};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::blocks::BlockRenderer;
use crate::client::CoachBackend;
use crate::config::CoachConfig;
use crate::error::{FlowError, SessionError};
use crate::onboarding::{
    BasicInfo, BasicInfoField, ChatSeed, GENDER_OPTIONS, OnboardingFlow, SurveyStep,
};
use crate::session::{ChatMessage, ConversationSession, Sender, prompts};
use crate::survey::Question;

/// Input line that ends the program.
pub const QUIT_COMMAND: &str = "/quit";

const WELCOME: &str = "🥗 AI 다이어트 코치에 오신 것을 환영해요!\n몇 가지 정보를 알려주시면 맞춤형 플랜을 만들어드릴게요.";

pub type LineStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Non-empty trimmed stdin lines, ending at EOF.
pub fn stdin_lines() -> LineStream {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (line, rx))
    }))
}

/// Result of feeding one line to the onboarding console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleStep {
    /// Show this prompt and wait for the next line.
    Prompt(String),
    /// The line was rejected; show the message, then the prompt again.
    Retry { error: String, prompt: String },
    /// Onboarding finished.
    Done(ChatSeed),
}

/// Line-at-a-time driver for [`OnboardingFlow`]: basic info fields first,
/// then each survey question.
pub struct OnboardingConsole {
    flow: OnboardingFlow,
    draft: BasicInfo,
    field: usize,
}

impl Default for OnboardingConsole {
    fn default() -> Self {
        Self::new(OnboardingFlow::new())
    }
}

impl OnboardingConsole {
    pub fn new(flow: OnboardingFlow) -> Self {
        Self {
            flow,
            draft: BasicInfo::default(),
            field: 0,
        }
    }

    /// Leave the welcome screen. Returns the first prompt.
    pub fn begin(&mut self) -> Result<String, FlowError> {
        self.flow.start()?;
        Ok(field_prompt(BasicInfoField::ALL[0]))
    }

    pub fn flow(&self) -> &OnboardingFlow {
        &self.flow
    }

    pub fn feed(&mut self, line: &str) -> ConsoleStep {
        match BasicInfoField::ALL.get(self.field).copied() {
            Some(field) => self.feed_basic_info(field, line),
            None => self.feed_survey(line),
        }
    }

    fn feed_basic_info(&mut self, field: BasicInfoField, line: &str) -> ConsoleStep {
        let value = if field == BasicInfoField::Gender {
            resolve_gender(line)
        } else {
            line.trim().to_string()
        };
        self.draft.set(field, value);
        if let Err(e) = self.draft.validate_field(field) {
            return ConsoleStep::Retry {
                error: e.to_string(),
                prompt: field_prompt(field),
            };
        }

        self.field += 1;
        if let Some(next) = BasicInfoField::ALL.get(self.field) {
            return ConsoleStep::Prompt(field_prompt(*next));
        }

        match self.flow.submit_basic_info(self.draft.clone()) {
            Ok(question) => ConsoleStep::Prompt(question_prompt(&question)),
            Err(e) => {
                // Start the form over; the flow is still on basic info.
                self.field = 0;
                ConsoleStep::Retry {
                    error: e.to_string(),
                    prompt: field_prompt(BasicInfoField::ALL[0]),
                }
            }
        }
    }

    fn feed_survey(&mut self, line: &str) -> ConsoleStep {
        let Some(question) = self.flow.current_question().cloned() else {
            return ConsoleStep::Retry {
                error: format!("Onboarding is already at {}", self.flow.stage()),
                prompt: String::new(),
            };
        };
        match self.flow.answer_survey(question.resolve_input(line)) {
            Ok(SurveyStep::Next(next)) => ConsoleStep::Prompt(question_prompt(&next)),
            Ok(SurveyStep::Finished(seed)) => ConsoleStep::Done(seed),
            Err(e) => ConsoleStep::Retry {
                error: e.to_string(),
                prompt: question_prompt(&question),
            },
        }
    }
}

fn resolve_gender(line: &str) -> String {
    let line = line.trim();
    line.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| GENDER_OPTIONS.get(i))
        .map_or_else(|| line.to_string(), |g| g.to_string())
}

fn field_prompt(field: BasicInfoField) -> String {
    if field == BasicInfoField::Gender {
        format!("{}? ({})", field.label(), numbered(&GENDER_OPTIONS))
    } else {
        format!("{}? (예: {})", field.label(), field.placeholder())
    }
}

fn question_prompt(question: &Question) -> String {
    match question {
        Question::Choice {
            prompt, options, ..
        } => {
            let options: Vec<&str> = options.iter().map(String::as_str).collect();
            format!("{prompt}\n{}", numbered(&options))
        }
        Question::Text { prompt, .. } => prompt.clone(),
    }
}

fn numbered(options: &[&str]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(i, o)| format!("{}) {o}", i + 1))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Text printed for a chat message.
pub fn format_message(renderer: &BlockRenderer, message: &ChatMessage) -> String {
    let body = renderer.render_text(&message.blocks);
    match message.sender {
        Sender::Bot => format!("🤖 {}", body.replace('\n', "\n   ")),
        Sender::User => format!("🙂 {body}"),
    }
}

/// What happened to one chat input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Recorded as a follow-up answer.
    Answered,
    /// A backend call was started in the background.
    Sent,
    /// Dropped because a backend call is still in flight.
    Busy,
    /// Empty input.
    Ignored,
}

/// Feeds chat input to a session from a single task.
///
/// Follow-up answers are submitted and awaited in input order. Lines that
/// trigger a backend call run on a background task, one at a time; input
/// arriving while it is outstanding is reported as busy.
pub struct ChatDriver {
    session: Arc<ConversationSession>,
    pending: Option<JoinHandle<()>>,
}

impl ChatDriver {
    pub fn new(session: Arc<ConversationSession>) -> Self {
        Self {
            session,
            pending: None,
        }
    }

    pub fn session(&self) -> &Arc<ConversationSession> {
        &self.session
    }

    /// Whether a backend call started by this driver has not settled yet.
    pub fn call_in_flight(&self) -> bool {
        self.session.is_sending() || self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub async fn handle_line(&mut self, line: &str) -> LineOutcome {
        if self.call_in_flight() {
            return LineOutcome::Busy;
        }

        let stage = self.session.status().await.stage;
        if stage.issues_call() {
            let session = Arc::clone(&self.session);
            let line = line.to_string();
            self.pending = Some(tokio::spawn(async move {
                if let Err(e) = session.submit(&line).await {
                    debug!(error = %e, "Chat input not submitted");
                }
            }));
            return LineOutcome::Sent;
        }

        match self.session.submit(line).await {
            Ok(_) => LineOutcome::Answered,
            Err(SessionError::Busy) => LineOutcome::Busy,
            Err(SessionError::EmptyInput) => LineOutcome::Ignored,
        }
    }

    /// Wait for an outstanding backend call to settle.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.pending.take() {
            if let Err(e) = handle.await {
                error!("Chat task failed: {}", e);
            }
        }
    }
}

/// Run onboarding and chat against `input` until it ends or `/quit`.
pub async fn run(
    mut input: LineStream,
    config: CoachConfig,
    backend: Arc<dyn CoachBackend>,
    renderer: BlockRenderer,
) -> crate::error::Result<()> {
    let mut console = OnboardingConsole::default();
    println!("{WELCOME}\n");
    println!("{}", console.begin()?);

    let seed = loop {
        let Some(line) = input.next().await else {
            return Ok(());
        };
        if line == QUIT_COMMAND {
            return Ok(());
        }
        match console.feed(&line) {
            ConsoleStep::Prompt(prompt) => println!("\n{prompt}"),
            ConsoleStep::Retry { error, prompt } => {
                eprintln!("❌ {error}");
                if !prompt.is_empty() {
                    println!("{prompt}");
                }
            }
            ConsoleStep::Done(seed) => break seed,
        }
    };

    let session = Arc::new(ConversationSession::new(seed, backend, &config));
    chat(input, session, renderer).await;
    Ok(())
}

async fn chat(mut input: LineStream, session: Arc<ConversationSession>, renderer: BlockRenderer) {
    let mut rx = session.subscribe();
    println!("\n== {} ==\n{}\n", prompts::CHAT_TITLE, prompts::DISCLAIMER);
    for message in session.history().await {
        println!("{}\n", format_message(&renderer, &message));
    }

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let printer = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(message) => print_message(&renderer, &session, &message).await,
                        Err(RecvError::Lagged(n)) => debug!(skipped = n, "Printer lagged"),
                        Err(RecvError::Closed) => break,
                    },
                    _ = &mut stop_rx => {
                        while let Ok(message) = rx.try_recv() {
                            print_message(&renderer, &session, &message).await;
                        }
                        break;
                    }
                }
            }
        })
    };
    let _first_question = session.spawn_first_question();

    let mut driver = ChatDriver::new(Arc::clone(&session));
    while let Some(line) = input.next().await {
        if line == QUIT_COMMAND {
            break;
        }
        match driver.handle_line(&line).await {
            LineOutcome::Sent => eprintln!("⏳ {}", prompts::SENDING),
            LineOutcome::Busy => eprintln!("⏳ {} 답변을 기다려 주세요.", prompts::SENDING),
            LineOutcome::Answered | LineOutcome::Ignored => {}
        }
    }

    // Let an outstanding call land and be printed before exiting.
    driver.settle().await;
    let _ = stop_tx.send(());
    if let Err(e) = printer.await {
        error!("Printer task failed: {}", e);
    }
}

async fn print_message(renderer: &BlockRenderer, session: &ConversationSession, message: &ChatMessage) {
    // The terminal already shows what the user typed.
    if message.sender == Sender::User {
        return;
    }
    println!("\n{}\n", format_message(renderer, message));
    let stage = session.status().await.stage;
    eprintln!("✏️  {}", prompts::input_hint(stage));
}

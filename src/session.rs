//! Client-side conversation state for one open assistant dialog.
//!
//! A session owns the transcript and enforces at most one in-flight analysis
//! request. Submitting is split into [`ConversationSession::begin_submit`] and
//! [`ConversationSession::complete`] so the network call can happen without
//! holding the session; [`SessionHandle`] wires the two phases together for
//! callers that share a session across tasks.

use crate::orchestrator::{
    AnalysisFailure, AnalysisOrchestrator, AnalysisRequest, AnalysisResponse, FALLBACK_RESPONSE,
};
use crate::schema::Company;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type AnalysisOutcome = std::result::Result<AnalysisResponse, AnalysisFailure>;

/// Anything that can carry an analysis request to the orchestrator.
///
/// Transport failures (connection refused, timeouts, unreadable bodies) are
/// reported as an [`AnalysisFailure`] just like server-side failures.
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisOutcome;
}

#[async_trait]
impl AnalysisTransport for AnalysisOrchestrator {
    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        self.respond(request).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }
}

/// Notices surfaced next to the transcript, never inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advisory {
    /// The answer was produced without any balance sheet data.
    LimitedData,
    /// The request failed and a fallback message was shown.
    Error,
}

impl Advisory {
    pub fn title(&self) -> &'static str {
        match self {
            Advisory::LimitedData => "Limited Data",
            Advisory::Error => "Error",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Advisory::LimitedData => {
                "No balance sheet data found for analysis. Upload some data for better insights."
            }
            Advisory::Error => "Failed to get AI response. Please try again.",
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Advisory::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Closed,
    Idle,
    Pending,
}

/// Ticket for a request that has been accepted by [`ConversationSession::begin_submit`].
#[derive(Debug)]
pub struct PendingSubmit {
    epoch: u64,
    request: AnalysisRequest,
}

impl PendingSubmit {
    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }
}

pub fn greeting_for(company: Option<&Company>) -> String {
    let subject = company
        .map(|c| format!("{}'s", c.name))
        .unwrap_or_else(|| "your company's".to_string());
    format!(
        "Hello! I'm your AI financial analyst. Ask me anything about {} balance sheets, performance, or financial metrics.",
        subject
    )
}

#[derive(Debug, Clone)]
pub struct ConversationSession {
    user_id: String,
    state: SessionState,
    epoch: u64,
    company: Option<Company>,
    transcript: Vec<ChatMessage>,
    advisories: Vec<Advisory>,
    last_message_id: u64,
}

impl ConversationSession {
    /// A closed session for the authenticated user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: SessionState::Closed,
            epoch: 0,
            company: None,
            transcript: Vec::new(),
            advisories: Vec::new(),
            last_message_id: 0,
        }
    }

    /// Starts a fresh conversation seeded with a single greeting.
    pub fn open(&mut self, company: Option<Company>) {
        self.reset();
        self.state = SessionState::Idle;
        let greeting = greeting_for(company.as_ref());
        self.company = company;
        self.push(Author::Assistant, greeting);
    }

    /// Discards the conversation. A response still in flight will be ignored.
    pub fn close(&mut self) {
        self.reset();
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == SessionState::Pending
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn selected_company(&self) -> Option<&Company> {
        self.company.as_ref()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn take_advisories(&mut self) -> Vec<Advisory> {
        std::mem::take(&mut self.advisories)
    }

    /// Accepts `text` for analysis: appends the user message and marks the
    /// session pending. Returns `None` (and changes nothing) for blank text,
    /// a closed session or while another request is in flight.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingSubmit> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.state != SessionState::Idle {
            debug!("Ignoring submit while session is {:?}", self.state);
            return None;
        }

        self.push(Author::User, text.to_string());
        self.state = SessionState::Pending;

        Some(PendingSubmit {
            epoch: self.epoch,
            request: AnalysisRequest::new(text, self.user_id.clone())
                .with_company(self.company.as_ref().map(|c| c.id.clone())),
        })
    }

    /// Applies the outcome of a request started by `begin_submit` and returns
    /// the session to idle. Outcomes for a session that has since been closed
    /// or reopened are dropped; returns whether the outcome was applied.
    pub fn complete(&mut self, pending: PendingSubmit, outcome: AnalysisOutcome) -> bool {
        if pending.epoch != self.epoch || self.state != SessionState::Pending {
            debug!("Discarding response for a closed session");
            return false;
        }

        match outcome {
            Ok(answer) => {
                self.push(Author::Assistant, answer.response);
                if !answer.data_available {
                    self.advisories.push(Advisory::LimitedData);
                }
            }
            Err(failure) => {
                let text = if failure.response.trim().is_empty() {
                    FALLBACK_RESPONSE.to_string()
                } else {
                    failure.response
                };
                self.push(Author::Assistant, text);
                self.advisories.push(Advisory::Error);
            }
        }

        self.state = SessionState::Idle;
        true
    }

    /// Submits `text` through `transport` and waits for the answer.
    /// Returns `false` if the submit was ignored.
    pub async fn submit(&mut self, transport: &dyn AnalysisTransport, text: &str) -> bool {
        let Some(pending) = self.begin_submit(text) else {
            return false;
        };
        let outcome = transport.analyze(pending.request()).await;
        self.complete(pending, outcome);
        true
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.state = SessionState::Closed;
        self.company = None;
        self.transcript.clear();
        self.advisories.clear();
    }

    fn push(&mut self, author: Author, content: String) {
        let now = Utc::now();
        let id = (now.timestamp_millis().max(0) as u64).max(self.last_message_id + 1);
        self.last_message_id = id;
        self.transcript.push(ChatMessage {
            id: MessageId(id),
            author,
            content,
            created_at: now,
        });
    }
}

/// Point-in-time copy of a session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub company: Option<Company>,
    pub transcript: Vec<ChatMessage>,
}

/// Shared handle to a session, safe to use from several tasks at once.
///
/// The session lock is only held while changing state, never across the
/// network call, so `close` stays responsive while a request is pending.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<ConversationSession>>,
    transport: Arc<dyn AnalysisTransport>,
}

impl SessionHandle {
    pub fn new(user_id: impl Into<String>, transport: Arc<dyn AnalysisTransport>) -> Self {
        Self {
            session: Arc::new(Mutex::new(ConversationSession::new(user_id))),
            transport,
        }
    }

    pub fn open(&self, company: Option<Company>) {
        self.session.lock().open(company);
    }

    pub fn close(&self) {
        self.session.lock().close();
    }

    pub fn is_pending(&self) -> bool {
        self.session.lock().is_pending()
    }

    pub fn take_advisories(&self) -> Vec<Advisory> {
        self.session.lock().take_advisories()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock();
        SessionSnapshot {
            state: session.state(),
            company: session.selected_company().cloned(),
            transcript: session.transcript().to_vec(),
        }
    }

    /// Returns `false` without side effects if the submit was ignored.
    pub async fn submit(&self, text: &str) -> bool {
        let Some(pending) = self.session.lock().begin_submit(text) else {
            return false;
        };

        let mut in_flight = InFlight {
            session: &self.session,
            pending: Some(pending),
        };
        let outcome = match in_flight.pending.as_ref() {
            Some(pending) => self.transport.analyze(pending.request()).await,
            None => return false,
        };
        in_flight.finish(outcome);
        true
    }
}

/// Completes the pending request even if the submitting future is dropped,
/// so the session can never stay pending forever.
struct InFlight<'a> {
    session: &'a Mutex<ConversationSession>,
    pending: Option<PendingSubmit>,
}

impl InFlight<'_> {
    fn finish(&mut self, outcome: AnalysisOutcome) {
        if let Some(pending) = self.pending.take() {
            self.session.lock().complete(pending, outcome);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.finish(Err(AnalysisFailure {
            error: "Request cancelled".to_string(),
            response: FALLBACK_RESPONSE.to_string(),
        }));
    }
}

//! Streaming explanation sessions: one explain or diff-explain request
//! from dispatch through the final structured result.
//!
//! Fragments and the final `Explanation` travel on separate channels so a
//! consumer can render incremental text without caring about completion,
//! and await the result without draining text. A `watch` feed mirrors the
//! whole lifecycle for passive observers.

use crate::config::{ApiConfig, Credentials};
use crate::error::{CoachError, NO_CODE, NO_DIFF_CODE};
use crate::explain::{parse_markdown_explanation, Explanation, KeywordTable};
use crate::llm::client::{ChatRequest, ChatTransport, StreamUpdate};
use crate::mask::{mask_sensitive_data, truncate_code};
use crate::prompt::{
    build_code_prompt, build_diff_prompt, ExplainLevel, ExplainTone, CODE_REVIEW_SYSTEM,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Fragment channel capacity; the producer backpressures past this.
const FRAGMENT_CHANNEL_CAPACITY: usize = 100;

/// Observable lifecycle of the controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    /// Text accumulated so far, republished on every fragment.
    Streaming { text: String },
    /// Full text plus the extracted explanation.
    Completed {
        text: String,
        explanation: Explanation,
    },
    /// Partial text retained for display plus a user-facing message.
    Failed { text: String, message: String },
}

/// An explain request for a single code buffer.
#[derive(Debug, Clone)]
pub struct ExplainRequest {
    pub code: String,
    pub language: String,
    pub level: ExplainLevel,
    pub tone: ExplainTone,
}

/// An explain request for a before/after pair.
#[derive(Debug, Clone)]
pub struct ExplainDiffRequest {
    pub before: String,
    pub after: String,
    pub language: String,
    pub level: ExplainLevel,
    pub tone: ExplainTone,
}

/// Channels for one session. `fragments` closes when streaming ends;
/// `result` resolves exactly once, or errors if the session was
/// superseded by a newer request.
#[derive(Debug)]
pub struct SessionHandle {
    pub session_id: u64,
    pub fragments: mpsc::Receiver<String>,
    pub result: oneshot::Receiver<Result<Explanation, CoachError>>,
}

/// Dispatches explanation requests and owns the session state machine.
/// Starting a new request supersedes any in-flight session: late output
/// of the old session is dropped, never mixed into the new one.
pub struct SessionController {
    transport: Arc<dyn ChatTransport>,
    credentials: Credentials,
    config: ApiConfig,
    keywords: KeywordTable,
    epoch: Arc<AtomicU64>,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        credentials: Credentials,
        config: ApiConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            transport,
            credentials,
            config,
            keywords: KeywordTable::default(),
            epoch: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    /// Replace the extraction keyword table.
    pub fn with_keywords(mut self, keywords: KeywordTable) -> Self {
        self.keywords = keywords;
        self
    }

    /// Observe state transitions without consuming the session channels.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Start a streaming explanation of one code buffer. Input validation
    /// and the credential check happen before any network activity.
    pub fn explain(&self, request: ExplainRequest) -> Result<SessionHandle, CoachError> {
        if request.code.trim().is_empty() {
            return Err(CoachError::validation(NO_CODE));
        }

        let code = truncate_code(&mask_sensitive_data(&request.code));
        let prompt = build_code_prompt(&code, &request.language, request.level, request.tone);
        self.start_session(prompt)
    }

    /// Start a streaming explanation of the change between two buffers.
    pub fn explain_diff(&self, request: ExplainDiffRequest) -> Result<SessionHandle, CoachError> {
        if request.before.trim().is_empty() || request.after.trim().is_empty() {
            return Err(CoachError::validation(NO_DIFF_CODE));
        }

        let before = truncate_code(&mask_sensitive_data(&request.before));
        let after = truncate_code(&mask_sensitive_data(&request.after));
        let prompt =
            build_diff_prompt(&before, &after, &request.language, request.level, request.tone);
        self.start_session(prompt)
    }

    fn start_session(&self, prompt: String) -> Result<SessionHandle, CoachError> {
        let Some(api_key) = self.credentials.api_key() else {
            return Err(CoachError::MissingCredential);
        };

        // Bumping the epoch supersedes any in-flight session before the
        // state reset below, so late output cannot land in the new session.
        let session_id = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(SessionState::Streaming {
            text: String::new(),
        });

        let (fragment_tx, fragment_rx) = mpsc::channel(FRAGMENT_CHANNEL_CAPACITY);
        let (result_tx, result_rx) = oneshot::channel();

        let transport = Arc::clone(&self.transport);
        let request = ChatRequest::streaming(&self.config, CODE_REVIEW_SYSTEM, &prompt);
        let keywords = self.keywords.clone();
        let epoch = Arc::clone(&self.epoch);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            // Every publish checks the epoch under the watch lock, so a
            // superseded session can never overwrite a newer session's
            // state no matter how the tasks interleave.
            let publish = |next: SessionState| {
                state.send_if_modified(|current| {
                    if epoch.load(Ordering::SeqCst) != session_id {
                        return false;
                    }
                    *current = next;
                    true
                })
            };

            let mut updates = match transport.open_stream(&api_key, &request).await {
                Ok(updates) => updates,
                Err(err) => {
                    if publish(SessionState::Failed {
                        text: String::new(),
                        message: err.to_string(),
                    }) {
                        let _ = result_tx.send(Err(err));
                    }
                    return;
                }
            };

            let mut text = String::new();
            loop {
                match updates.recv().await {
                    Some(StreamUpdate::Content(delta)) => {
                        text.push_str(&delta);
                        if !publish(SessionState::Streaming { text: text.clone() }) {
                            return;
                        }
                        let _ = fragment_tx.send(delta).await;
                    }
                    Some(StreamUpdate::Error(err)) => {
                        if publish(SessionState::Failed {
                            text,
                            message: err.to_string(),
                        }) {
                            let _ = result_tx.send(Err(err));
                        }
                        return;
                    }
                    Some(StreamUpdate::Done) | None => break,
                }
            }

            let explanation = parse_markdown_explanation(&text, &keywords);
            if publish(SessionState::Completed {
                text,
                explanation: explanation.clone(),
            }) {
                let _ = result_tx.send(Ok(explanation));
            }
        });

        Ok(SessionHandle {
            session_id,
            fragments: fragment_rx,
            result: result_rx,
        })
    }
}

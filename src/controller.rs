//! Query lifecycle state machine
//!
//! A query moves `Idle -> Pending -> <terminal outcome>`. Exactly one network
//! call is made per accepted submission, and every way the call can settle
//! (body, transport failure, abandonment) leaves the controller out of
//! `Pending`.
//!
//! The host can either drive the whole lifecycle with [`QueryController::submit`],
//! or split it around its own task spawning with [`QueryController::begin`] and
//! [`QueryController::settle`], the way the terminal UI does.

use anyhow::Result;
use serde_json::Value;

use crate::api::{ChatTransport, QueryParams, QueryRequest};
use crate::citations::{self, Hit};
use crate::constants::{NO_CONTEXT_FALLBACK, UNEXPECTED_RESPONSE_MESSAGE};

/// Display state of the current query
#[derive(Debug, Clone, Default, PartialEq)]
pub enum QueryState {
    #[default]
    Idle,
    Pending {
        query: String,
    },
    AnsweredOk {
        answer: String,
        hits: Vec<Hit>,
    },
    AnsweredNoContext {
        answer: String,
        hits: Vec<Hit>,
        /// Backend's abstain reason, if it sent one
        reason: Option<String>,
    },
    Blocked {
        reason: String,
    },
    TransportError {
        message: String,
    },
    UnexpectedResponse,
}

impl QueryState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// True for the five settled outcomes
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Idle | Self::Pending { .. })
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::AnsweredOk { answer, .. } | Self::AnsweredNoContext { answer, .. } => {
                Some(answer)
            }
            _ => None,
        }
    }

    /// Citations to render; empty for every non-answer state
    pub fn hits(&self) -> &[Hit] {
        match self {
            Self::AnsweredOk { hits, .. } | Self::AnsweredNoContext { hits, .. } => hits,
            _ => &[],
        }
    }

    /// User-facing error line, if this state is a failure
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Blocked { reason } => Some(format!("Blocked: {reason}")),
            Self::TransportError { message } => Some(message.clone()),
            Self::UnexpectedResponse => Some(UNEXPECTED_RESPONSE_MESSAGE.to_string()),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending { .. } => "pending",
            Self::AnsweredOk { .. } => "ok",
            Self::AnsweredNoContext { .. } => "no_context",
            Self::Blocked { .. } => "blocked",
            Self::TransportError { .. } => "transport_error",
            Self::UnexpectedResponse => "unexpected_response",
        }
    }
}

/// Identifies one accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A request the host must send, tagged with the token to settle it under
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub token: RequestToken,
    pub request: QueryRequest,
}

/// Map a parsed response body to its terminal state.
///
/// Priority: `blocked`, then `no_context`, then `ok`; anything else
/// (including a missing or non-string `status`) is `UnexpectedResponse`.
pub fn interpret(body: &Value) -> QueryState {
    let text = |key: &str| body.get(key).and_then(Value::as_str);

    match text("status") {
        Some("blocked") => QueryState::Blocked {
            reason: text("reason").unwrap_or_default().to_string(),
        },
        Some("no_context") => QueryState::AnsweredNoContext {
            answer: text("answer")
                .filter(|a| !a.is_empty())
                .unwrap_or(NO_CONTEXT_FALLBACK)
                .to_string(),
            hits: citations::normalize(body.get("hits")),
            reason: text("reason").map(str::to_string),
        },
        Some("ok") => QueryState::AnsweredOk {
            answer: text("answer").unwrap_or_default().to_string(),
            hits: citations::normalize(body.get("hits")),
        },
        _ => QueryState::UnexpectedResponse,
    }
}

/// Owns the lifecycle state; the only writer of it.
#[derive(Debug, Default)]
pub struct QueryController {
    state: QueryState,
    next_id: u64,
    current: Option<RequestToken>,
}

impl QueryController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_pending()
    }

    /// Accept a submission and enter `Pending`.
    ///
    /// Returns `None` without touching the state when the trimmed input is
    /// empty or a query is already in flight. Otherwise the previous outcome is
    /// discarded and the caller must send the returned request exactly once.
    pub fn begin(&mut self, raw_input: &str, params: &QueryParams) -> Option<Dispatch> {
        if raw_input.trim().is_empty() {
            tracing::debug!("Ignoring submit: empty query");
            return None;
        }
        if self.is_busy() {
            tracing::debug!("Ignoring submit: query already in flight");
            return None;
        }

        self.next_id += 1;
        let token = RequestToken(self.next_id);
        self.current = Some(token);
        self.state = QueryState::Pending {
            query: raw_input.to_string(),
        };

        let request = QueryRequest::build(raw_input, params);
        tracing::info!(
            request_id = token.id(),
            k = ?request.k,
            rerank = request.rerank,
            temperature = ?request.temperature,
            "Dispatching query"
        );

        Some(Dispatch { token, request })
    }

    /// Apply the result of a dispatched request.
    ///
    /// Returns `false` (and leaves the state alone) when the token is no
    /// longer current, e.g. after [`abandon`](Self::abandon).
    pub fn settle(&mut self, token: RequestToken, result: Result<Value>) -> bool {
        if self.current != Some(token) || !self.is_busy() {
            tracing::warn!(request_id = token.id(), "Discarding stale response");
            return false;
        }
        self.current = None;

        self.state = match result {
            Ok(body) => interpret(&body),
            Err(e) => {
                tracing::warn!(request_id = token.id(), "Chat request failed: {e:#}");
                QueryState::TransportError {
                    message: format!("{e:#}"),
                }
            }
        };

        tracing::info!(
            request_id = token.id(),
            outcome = self.state.kind(),
            hits = self.state.hits().len(),
            "Query settled"
        );
        true
    }

    /// Drop the in-flight request, if any; its response will be discarded.
    pub fn abandon(&mut self) {
        if let Some(token) = self.current.take() {
            tracing::info!(request_id = token.id(), "Abandoning in-flight query");
        }
        if self.is_busy() {
            self.state = QueryState::Idle;
        }
    }

    /// Run one full lifecycle against `transport` and return the resulting state.
    ///
    /// Guarded submissions return the unchanged state without a network call.
    pub async fn submit<T>(
        &mut self,
        transport: &T,
        raw_input: &str,
        params: &QueryParams,
    ) -> &QueryState
    where
        T: ChatTransport + ?Sized,
    {
        if let Some(dispatch) = self.begin(raw_input, params) {
            let mut flight = InFlight {
                controller: &mut *self,
                token: dispatch.token,
                settled: false,
            };
            let result = transport.chat(&dispatch.request).await;
            flight.controller.settle(flight.token, result);
            flight.settled = true;
        }
        &self.state
    }
}

/// Abandons the request if the owning `submit` future is dropped mid-flight
struct InFlight<'a> {
    controller: &'a mut QueryController,
    token: RequestToken,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled && self.controller.current == Some(self.token) {
            self.controller.abandon();
        }
    }
}

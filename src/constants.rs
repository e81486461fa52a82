//! Protocol and UI constants for the DocuChat client
//!
//! Centralizes magic numbers and fixed strings for maintainability and testability.

use std::time::Duration;

// ============================================================================
// Endpoint Constants
// ============================================================================

/// Base URL used when `DOCUCHAT_API_BASE` is not set
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Path of the question answering endpoint, relative to the base URL
pub const CHAT_PATH: &str = "/chat";

/// Path of the liveness endpoint, relative to the base URL
pub const HEALTH_PATH: &str = "/health";

// ============================================================================
// Request Constants
// ============================================================================

/// Candidate pool size handed to the reranker (fixed, not user-tunable)
pub const TOP_M: u32 = 40;

/// Generation budget per answer (fixed, not user-tunable)
pub const MAX_TOKENS: u32 = 512;

// ============================================================================
// Outcome Messages
// ============================================================================

/// Answer shown when the server finds no supporting context and sends no answer
pub const NO_CONTEXT_FALLBACK: &str =
    "I don't have enough information in the provided documents.";

/// Generic message for bodies outside the known response contract
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected response from server.";

// ============================================================================
// Form Defaults & Hints
// ============================================================================

/// Default retrieval breadth
pub const DEFAULT_K: u32 = 6;

/// Lower bound the form's step keys respect for k
pub const MIN_K: u32 = 1;

/// Upper bound the form's step keys respect for k
pub const MAX_K: u32 = 12;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Step size for temperature adjustment
pub const TEMPERATURE_STEP: f64 = 0.1;

/// Reranking is on unless configured otherwise
pub const DEFAULT_RERANK: bool = true;

// ============================================================================
// Timing Constants
// ============================================================================

/// Default transport timeout for chat requests (generation can be slow)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Timeout for health checks to keep the UI responsive
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default interval between health checks
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 5;

/// Terminal event polling interval
pub const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Display Constants
// ============================================================================

/// Maximum characters for source paths in the citation list
pub const SOURCE_PATH_MAX_CHARS: usize = 48;

/// Maximum characters for the error line before truncation
pub const ERROR_TRUNCATE_CHARS: usize = 120;

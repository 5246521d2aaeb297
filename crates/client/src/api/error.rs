//! Error taxonomy for the ordering API.
//!
//! Every network-layer failure is funneled through [`classify`] exactly
//! once, at the gateway boundary. The resulting [`Classification`] is the
//! single source of truth consulted both by the retry engine (to decide
//! whether to retry) and by UI error presentation (to decide wording).

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to the ordering API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The attempt exceeded its timeout budget and was cancelled.
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure without an HTTP response.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Status {
        /// HTTP status of the response.
        status: StatusCode,
        /// Human-readable message selected per the status rules.
        message: String,
        /// Parsed response body (JSON object, or the raw text as a JSON
        /// string when the response did not declare JSON).
        payload: Option<Value>,
    },

    /// A 2xx response declared JSON but the body failed to parse.
    #[error("invalid JSON in response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request path could not be resolved against the base origin.
    #[error("invalid request path: {0}")]
    Path(#[from] url::ParseError),
}

impl ApiError {
    /// Build a status error whose message is selected by the
    /// classification table, with the server payload attached.
    #[must_use]
    pub fn from_status(status: StatusCode, payload: Option<Value>) -> Self {
        let message = classify_status(status, payload.as_ref()).user_message;
        Self::Status {
            status,
            message,
            payload,
        }
    }

    /// HTTP status of the failure, if one was reachable.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server-supplied `error`/`message` payload field, if present.
    #[must_use]
    pub fn server_message(&self) -> Option<String> {
        match self {
            Self::Status { payload, .. } => payload_message(payload.as_ref()),
            _ => None,
        }
    }

    /// Classify this failure. See [`classify`].
    #[must_use]
    pub fn classification(&self) -> Classification {
        classify(self)
    }

    /// Whether this failure is eligible for automatic re-attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.classification().retryable
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Failure categories driving retry eligibility and user-facing wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Connection,
    Cors,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimit,
    ServerError,
    ValidationError,
    Unknown,
}

impl ErrorKind {
    /// Stable string tag for logs and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Cors => "cors",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::ValidationError => "validation_error",
            Self::Unknown => "unknown",
        }
    }
}

/// Result of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Failure category.
    pub kind: ErrorKind,
    /// Message suitable for direct display to the user.
    pub user_message: String,
    /// Whether the failure is likely transient.
    pub retryable: bool,
}

impl Classification {
    fn new(kind: ErrorKind, user_message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            user_message: user_message.into(),
            retryable,
        }
    }
}

/// Map a raw failure to its classification. Pure; no side effects.
///
/// First match wins: timeout, then transport-level failures (a
/// cross-origin rejection also surfaces without a status, so the text
/// marker is checked before the generic connection bucket), then the
/// status-keyed rows.
#[must_use]
pub fn classify(error: &ApiError) -> Classification {
    match error {
        ApiError::Timeout => Classification::new(
            ErrorKind::Timeout,
            "A requisição demorou demais. Tente novamente.",
            true,
        ),
        ApiError::Transport(e) => {
            if e.is_timeout() {
                Classification::new(
                    ErrorKind::Timeout,
                    "A requisição demorou demais. Tente novamente.",
                    true,
                )
            } else if is_cors_text(&e.to_string()) {
                Classification::new(
                    ErrorKind::Cors,
                    "Requisição bloqueada pela política de origem.",
                    false,
                )
            } else {
                Classification::new(
                    ErrorKind::Connection,
                    "Falha de conexão com o servidor. Verifique sua internet.",
                    true,
                )
            }
        }
        ApiError::Status {
            status, payload, ..
        } => classify_status(*status, payload.as_ref()),
        ApiError::Decode(_) | ApiError::Path(_) => Classification::new(
            ErrorKind::Unknown,
            "Ocorreu um erro inesperado. Tente novamente.",
            false,
        ),
    }
}

fn classify_status(status: StatusCode, payload: Option<&Value>) -> Classification {
    match status.as_u16() {
        401 => Classification::new(
            ErrorKind::Unauthorized,
            "Sessão expirada. Faça login novamente.",
            false,
        ),
        403 => Classification::new(ErrorKind::Forbidden, "Acesso negado.", false),
        404 => Classification::new(
            ErrorKind::NotFound,
            payload_message(payload).unwrap_or_else(|| "Recurso não encontrado.".to_string()),
            false,
        ),
        429 => Classification::new(
            ErrorKind::RateLimit,
            "Muitas requisições. Aguarde um instante e tente novamente.",
            true,
        ),
        500..=599 => Classification::new(
            ErrorKind::ServerError,
            "Erro no servidor. Tente novamente em instantes.",
            true,
        ),
        400 | 422 => Classification::new(
            ErrorKind::ValidationError,
            payload_message(payload)
                .unwrap_or_else(|| "Dados inválidos. Verifique as informações enviadas.".to_string()),
            false,
        ),
        _ => Classification::new(
            ErrorKind::Unknown,
            "Ocorreu um erro inesperado. Tente novamente.",
            false,
        ),
    }
}

// =============================================================================
// Named Predicates
// =============================================================================

/// Extract the server-supplied message from an error payload.
///
/// The backend reports failures as `{"error": "..."}` or
/// `{"message": "..."}`; `error` takes priority when both are present.
#[must_use]
pub fn payload_message(payload: Option<&Value>) -> Option<String> {
    let payload = payload?;
    ["error", "message"]
        .iter()
        .find_map(|field| payload.get(field))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Whether `path` is one of the login endpoints, where a 401/403 is the
/// authentication outcome itself and must not purge an existing session.
#[must_use]
pub fn is_login_path(path: &str) -> bool {
    path.contains("/auth/login") || path.contains("/auth/verify-2fa")
}

/// Whether this failure means the stored guest cart no longer exists
/// server-side. Keyed on status 404 plus a message marker; this is the
/// trigger for the one-shot cart-recreation recovery in the cart service.
#[must_use]
pub fn is_guest_cart_gone(error: &ApiError) -> bool {
    if error.status() != Some(StatusCode::NOT_FOUND) {
        return false;
    }
    let message = error
        .server_message()
        .unwrap_or_default()
        .to_lowercase();
    message.contains("guest cart") || message.contains("carrinho")
}

/// Message markers for insufficient-stock failures.
///
/// The backend does not always use a distinct status code for this
/// condition; this substring heuristic stands in until it returns a
/// machine-readable error code.
const STOCK_MARKERS: &[&str] = &[
    "insuficiente",
    "estoque",
    "esgotado",
    "insufficient",
    "stock",
];

/// Whether this failure is an insufficient-stock rejection.
///
/// Applies one uniform rule: statuses 400, 422 and 500 consult the
/// server message for a stock marker; other statuses never match.
#[must_use]
pub fn is_stock_error(status: StatusCode, message: &str) -> bool {
    if !matches!(status.as_u16(), 400 | 422 | 500) {
        return false;
    }
    let message = message.to_lowercase();
    STOCK_MARKERS.iter().any(|marker| message.contains(marker))
}

fn is_cors_text(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("cors") || text.contains("cross-origin") || text.contains("blocked")
}

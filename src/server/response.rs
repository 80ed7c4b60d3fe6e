// ---------------------------------------------------------------------------
// Response envelopes and API errors
// ---------------------------------------------------------------------------

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::dns::DnsError;
use crate::lookup::LookupError;
use crate::scanner::ScanError;
use crate::tools::{CommandError, ExecutionOutcome, RejectionReason};

/// `{ error: false, data, status: "success" }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub error: bool,
    pub data: T,
    pub status: &'static str,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            error: false,
            data,
            status: "success",
        })
    }
}

/// Payload of a finished scan
#[derive(Debug, Serialize)]
pub struct ScanPayload {
    pub host: String,
    pub open_ports: Vec<u16>,
    pub total_scanned: usize,
}

/// Result of a command that ran to completion
///
/// `status` reflects the exit code, not whether the request was served.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub error: bool,
    pub output: String,
    pub error_output: String,
    pub exit_code: i32,
    pub truncated: bool,
    pub status: &'static str,
}

impl From<ExecutionOutcome> for CommandResponse {
    fn from(outcome: ExecutionOutcome) -> Self {
        let status = if outcome.success() { "success" } else { "error" };
        Self {
            error: false,
            truncated: outcome.stdout_truncated || outcome.stderr_truncated,
            exit_code: outcome.exit_code,
            output: outcome.stdout,
            error_output: outcome.stderr,
            status,
        }
    }
}

/// Allowlist entry as listed by `/api/commands`
#[derive(Debug, Serialize)]
pub struct CommandEntry {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: bool,
    pub message: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_output: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// 403 Forbidden; command not allowed
    Forbidden(String),
    /// 404 Not Found
    NotFound(String),
    /// 408 Request Timeout; carries the partial output
    Timeout {
        message: String,
        output: String,
        error_output: String,
    },
    /// 500 Internal Server Error
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, output, error_output) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None, None),
            ApiError::Timeout {
                message,
                output,
                error_output,
            } => (
                StatusCode::REQUEST_TIMEOUT,
                message,
                Some(output),
                Some(error_output),
            ),
            ApiError::Internal(msg) => {
                tracing::error!(details = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg, None, None)
            }
        };

        (
            status,
            Json(ApiErrorBody {
                error: true,
                message,
                status: "error",
                output,
                error_output,
            }),
        )
            .into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            ApiError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            ApiError::NotFound(msg) => write!(f, "not found: {msg}"),
            ApiError::Timeout { message, .. } => write!(f, "timeout: {message}"),
            ApiError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::InvalidInput(_) => ApiError::BadRequest(e.to_string()),
            ScanError::Cancelled { .. } => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::Rejected(RejectionReason::Empty) => {
                ApiError::BadRequest("Command is required".to_string())
            }
            CommandError::Rejected(reason) => ApiError::Forbidden(reason.to_string()),
            CommandError::Timeout(ref outcome) => {
                let message = e.to_string();
                let ExecutionOutcome { stdout, stderr, .. } = *outcome.clone();
                ApiError::Timeout {
                    message,
                    output: stdout,
                    error_output: stderr,
                }
            }
            CommandError::Failure { .. } => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::InvalidInput(_) => ApiError::BadRequest(e.to_string()),
            LookupError::Request(_) | LookupError::Status(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DnsError> for ApiError {
    fn from(e: DnsError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

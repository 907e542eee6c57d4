use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorCode {
    MissingApiToken,
    Forbidden,
    HttpTimeout,
    RateLimited,
    InvalidResponse,
    InvalidRequest,
    ServiceUnavailable,
    Unknown,
}

impl BackendErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendErrorCode::MissingApiToken => "MISSING_API_TOKEN",
            BackendErrorCode::Forbidden => "FORBIDDEN",
            BackendErrorCode::HttpTimeout => "HTTP_TIMEOUT",
            BackendErrorCode::RateLimited => "RATE_LIMITED",
            BackendErrorCode::InvalidResponse => "INVALID_RESPONSE",
            BackendErrorCode::InvalidRequest => "INVALID_REQUEST",
            BackendErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            BackendErrorCode::Unknown => "UNKNOWN_BACKEND_ERROR",
        }
    }
}

impl fmt::Display for BackendErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("记录未找到")]
    NotFound,

    #[error("记录冲突: {message}")]
    Conflict { message: String },

    #[error("验证失败: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        details: Option<JsonValue>,
    },

    #[error("{message}")]
    Backend {
        code: BackendErrorCode,
        message: String,
        correlation_id: Option<String>,
        details: Option<JsonValue>,
    },

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            source: None,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            source: None,
            details: Some(details),
        }
    }

    pub fn backend(code: BackendErrorCode, message: impl Into<String>) -> Self {
        Self::backend_with_details(code, message, None, None)
    }

    pub fn backend_with_details(
        code: BackendErrorCode,
        message: impl Into<String>,
        correlation_id: Option<&str>,
        details: Option<JsonValue>,
    ) -> Self {
        let message = message.into();
        let correlation = correlation_id.map(|value| value.to_string());
        match (&correlation, &details) {
            (Some(id), Some(payload)) => {
                warn!(
                    target: "app::backend::error",
                    code = %code,
                    correlation_id = %id,
                    details = %payload,
                    %message
                );
            }
            (Some(id), None) => {
                warn!(
                    target: "app::backend::error",
                    code = %code,
                    correlation_id = %id,
                    %message
                );
            }
            (None, Some(payload)) => {
                warn!(target: "app::backend::error", code = %code, details = %payload, %message);
            }
            (None, None) => {
                warn!(target: "app::backend::error", code = %code, %message);
            }
        }

        AppError::Backend {
            code,
            message,
            correlation_id: correlation,
            details,
        }
    }

    pub fn backend_code(&self) -> Option<BackendErrorCode> {
        match self {
            AppError::Backend { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn backend_correlation_id(&self) -> Option<&str> {
        match self {
            AppError::Backend { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }

    pub fn backend_details(&self) -> Option<&JsonValue> {
        match self {
            AppError::Backend { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::conflict", %message, "conflict error");
        AppError::Conflict { message }
    }

    pub fn not_found() -> Self {
        warn!(target: "app::backend", "resource not found");
        AppError::NotFound
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }
}

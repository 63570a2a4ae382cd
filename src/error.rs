//! Feed engine errors
//!
//! Missing or malformed item data never becomes an error: scoring degrades
//! those fields to a zero contribution. What does surface here is bad
//! configuration, bad paging input, unknown viewers, and failing or slow
//! stores. Store errors pass through the pipeline unchanged and are mapped to
//! HTTP only at the API edge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::borrow::Cow;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {message}")]
    Config {
        message: Cow<'static, str>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("environment variable {var} is required")]
    MissingEnvVar { var: &'static str },

    #[error("{key}: {message}")]
    InvalidConfig {
        key: &'static str,
        message: Cow<'static, str>,
    },

    #[error("feed database: {message}")]
    Database {
        message: Cow<'static, str>,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("no feed database connection available")]
    PoolExhausted,

    #[error("{entity_type} {id} not found")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A content or viewer store failed; `store` names which one
    #[error("{store} store unavailable: {message}")]
    Store {
        store: &'static str,
        message: Cow<'static, str>,
    },

    #[error("{message}")]
    BadRequest { message: Cow<'static, str> },

    #[error("internal error")]
    Internal {
        #[source]
        source: Option<BoxError>,
    },

    /// Fetching candidates and viewer took longer than the configured budget
    #[error("feed sources did not answer within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl Error {
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn store(store: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::Store {
            store,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn internal(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal {
            source: Some(Box::new(source)),
        }
    }

    /// Transient storage trouble: worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Database { .. }
                | Error::PoolExhausted
                | Error::Store { .. }
                | Error::Timeout { .. }
        )
    }

    /// Failures on our side, as opposed to caller mistakes or slow sources
    pub fn is_error_level(&self) -> bool {
        matches!(
            self,
            Error::Database { .. } | Error::Store { .. } | Error::Internal { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::PoolExhausted | Error::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Config { .. }
            | Error::MissingEnvVar { .. }
            | Error::InvalidConfig { .. }
            | Error::Database { .. }
            | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, also used as the failure metric label
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } | Error::MissingEnvVar { .. } | Error::InvalidConfig { .. } => {
                "CONFIG_ERROR"
            }
            Error::Database { .. } | Error::PoolExhausted => "DATABASE_ERROR",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Store { .. } => "STORE_UNAVAILABLE",
            Error::BadRequest { .. } => "BAD_REQUEST",
            Error::Timeout { .. } => "TIMEOUT",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

/// `{"error": {"code": .., "message": ..}}`
#[derive(Debug, Serialize)]
struct Envelope {
    error: Detail,
}

#[derive(Debug, Serialize)]
struct Detail {
    code: &'static str,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_error_level() {
            tracing::error!(code, error = ?self, "feed request failed");
        } else {
            tracing::debug!(code, "feed request rejected: {}", self);
        }

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let body = Envelope {
            error: Detail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::not_found("row", "unknown"),
            sqlx::Error::PoolTimedOut => Error::PoolExhausted,
            sqlx::Error::Database(ref db) => Error::Database {
                message: db.message().to_string().into(),
                source: Some(err),
            },
            other => Error::Database {
                message: other.to_string().into(),
                source: Some(other),
            },
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: Error) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_store_trouble_is_retryable() {
        assert!(Error::PoolExhausted.is_retryable());
        assert!(Error::store("content", "connection reset").is_retryable());
        assert!(Error::Timeout { timeout_ms: 500 }.is_retryable());
        assert!(!Error::not_found("viewer", "v1").is_retryable());
        assert!(!Error::bad_request("page must be >= 1").is_retryable());
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::not_found("viewer", "123"), StatusCode::NOT_FOUND),
            (Error::bad_request("invalid"), StatusCode::BAD_REQUEST),
            (Error::Timeout { timeout_ms: 100 }, StatusCode::GATEWAY_TIMEOUT),
            (Error::store("viewer", "down"), StatusCode::SERVICE_UNAVAILABLE),
            (Error::MissingEnvVar { var: "DB_URL" }, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err);
        }
    }

    #[test]
    fn test_sqlx_mapping() {
        let missing: Error = sqlx::Error::RowNotFound.into();
        assert_eq!(missing.error_code(), "NOT_FOUND");

        let exhausted: Error = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(exhausted, Error::PoolExhausted));
    }

    #[tokio::test]
    async fn test_client_errors_keep_their_message() {
        let (status, body) = render(Error::not_found("viewer", "ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "viewer ghost not found");
    }

    #[tokio::test]
    async fn test_internal_details_are_masked() {
        let err = Error::Database {
            message: "password authentication failed for user \"feed\"".into(),
            source: None,
        };
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert_eq!(body["error"]["message"], "internal error");
    }
}

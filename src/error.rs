use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaScope {
    User,
    Global,
}

impl fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaScope::User => write!(f, "personal"),
            QuotaScope::Global => write!(f, "site-wide"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Daily {0} limit reached, resets at midnight UTC")]
    QuotaExceeded(QuotaScope),

    #[error("Invalid vibe: {0}")]
    ValidationFailed(String),

    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    UpstreamUnavailable(u16),

    #[error("Upstream rejected the server's API key")]
    UpstreamAuthFailed,

    #[error("Upstream account balance exhausted")]
    UpstreamBalanceExhausted,

    #[error("Upstream sent unparseable data, try again")]
    MalformedUpstreamPayload,

    #[error("Upstream returned an empty tracklist")]
    EmptyResult,

    #[error("Server is missing its upstream API key")]
    MisconfiguredServer,

    #[error("Unknown cover token")]
    TokenNotFound,

    #[error("Cover token expired")]
    TokenExpired,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match self {
            AppError::QuotaExceeded(QuotaScope::Global) => {
                (StatusCode::TOO_MANY_REQUESTS, "global_limit")
            }
            AppError::QuotaExceeded(QuotaScope::User) => {
                (StatusCode::TOO_MANY_REQUESTS, "user_limit")
            }
            AppError::ValidationFailed { .. } => (StatusCode::BAD_REQUEST, "validation"),
            AppError::MisconfiguredServer => {
                (StatusCode::INTERNAL_SERVER_ERROR, "server_misconfigured")
            }
            AppError::TokenNotFound => (StatusCode::NOT_FOUND, "token_not_found"),
            AppError::TokenExpired => (StatusCode::GONE, "token_expired"),
            AppError::UpstreamUnreachable { .. }
            | AppError::UpstreamUnavailable { .. }
            | AppError::UpstreamAuthFailed
            | AppError::UpstreamBalanceExhausted
            | AppError::MalformedUpstreamPayload
            | AppError::EmptyResult => (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error"),
        };

        (
            status,
            Json(json!({ "error": self.to_string(), "kind": kind })),
        )
            .into_response()
    }
}

//! API handlers and shared request/response helpers.
//!
//! Bodies are JSON:API documents. Every error leaves as a JSON:API error
//! document carrying the status and a human readable title.

pub mod accounts;
pub mod current;
pub mod health;
pub mod types;

use crate::{
    accounts::{AccountError, AccountService},
    sparql::{Backend, Iri},
};
use axum::{
    body::Bytes,
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{error, warn};
use types::{ErrorDocument, ErrorObject, ACCOUNTS_TYPE};

pub const JSON_API: &str = "application/vnd.api+json";
pub const SESSION_HEADER: &str = "mu-session-id";
pub const REWRITE_URL_HEADER: &str = "x-rewrite-url";

/// Shared account service handed to every handler.
pub type Service = Arc<AccountService<Backend>>;

#[derive(Debug, thiserror::Error)]
#[error("{title}")]
pub struct ApiError {
    status: StatusCode,
    title: String,
}

impl ApiError {
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
        }
    }

    pub fn bad_request(title: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, title)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(reason) => Self::bad_request(reason),
            AccountError::NotFound(reason) => Self::new(StatusCode::NOT_FOUND, reason),
            AccountError::Authentication(reason) => Self::new(StatusCode::UNAUTHORIZED, reason),
            AccountError::CredentialsUnavailable(account) => {
                warn!("Credentials unavailable for {}", account);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Credentials are being updated, try again later",
                )
            }
            AccountError::FieldsUnavailable(account) => {
                warn!("Account fields unavailable for {}", account);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Account is being updated, try again later",
                )
            }
            AccountError::Store(err) => {
                error!("Graph store error: {}", err);
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Graph store unavailable")
            }
            AccountError::Codec(err) => {
                error!("Failed to decode account data: {}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AccountError::Hash(err) => {
                error!("Password hashing failed: {}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let document = ErrorDocument {
            errors: vec![ErrorObject {
                status: self.status.as_u16().to_string(),
                title: self.title,
            }],
        };
        (
            self.status,
            [(CONTENT_TYPE, HeaderValue::from_static(JSON_API))],
            Json(document),
        )
            .into_response()
    }
}

/// Empty success response.
pub(crate) fn no_content() -> Response {
    (
        StatusCode::NO_CONTENT,
        [(CONTENT_TYPE, HeaderValue::from_static(JSON_API))],
    )
        .into_response()
}

/// Check the content type and decode a JSON:API body.
pub(crate) fn parse_document<T: DeserializeOwned>(headers: &HeaderMap, body: &Bytes) -> Result<T, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with(JSON_API) {
        return Err(ApiError::bad_request(format!(
            "Content-Type must be {JSON_API}"
        )));
    }
    serde_json::from_slice(body).map_err(|err| ApiError::bad_request(format!("Invalid request body: {err}")))
}

pub(crate) fn require_accounts_type(kind: &str) -> Result<(), ApiError> {
    if kind == ACCOUNTS_TYPE {
        Ok(())
    } else {
        Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("Incorrect type. Type must be {ACCOUNTS_TYPE}, instead of {kind}."),
        ))
    }
}

/// Session IRI from the session header, if present.
pub(crate) fn session_header(headers: &HeaderMap) -> Result<Option<Iri>, ApiError> {
    let Some(value) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::bad_request("Session header is not valid text"))?;
    Iri::new(value)
        .map(Some)
        .map_err(|_| ApiError::bad_request("Session header is not a valid IRI"))
}

pub(crate) fn rewrite_url_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REWRITE_URL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

pub(crate) fn secret(value: Option<String>) -> SecretString {
    SecretString::from(value.unwrap_or_default())
}

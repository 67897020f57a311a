//! Operations on the account bound to the caller's session.

use super::{
    no_content, parse_document, require_accounts_type, secret, session_header,
    types::{ChangePasswordDocument, ErrorDocument},
    ApiError, Service,
};
use crate::{accounts::PasswordChange, sparql::Iri};
use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use tracing::instrument;

fn caller_session(headers: &HeaderMap) -> Result<Iri, ApiError> {
    session_header(headers)?.ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Session header is missing"))
}

#[utoipa::path(
    delete,
    path = "/accounts/current",
    responses(
        (status = 204, description = "Own account deactivated"),
        (status = 401, description = "No account bound to the session", body = ErrorDocument),
        (status = 503, description = "Graph store unavailable", body = ErrorDocument)
    ),
    tag = "accounts"
)]
#[instrument(skip_all)]
pub async fn deactivate_current(service: Extension<Service>, headers: HeaderMap) -> Result<Response, ApiError> {
    let session = caller_session(&headers)?;
    service.deactivate_own(&session).await?;
    Ok(no_content())
}

#[utoipa::path(
    patch,
    path = "/accounts/current/changePassword",
    request_body(content = ChangePasswordDocument, content_type = "application/vnd.api+json"),
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Blank or unconfirmed new password", body = ErrorDocument),
        (status = 401, description = "Unknown session or wrong old password", body = ErrorDocument),
        (status = 503, description = "Credentials or graph store unavailable", body = ErrorDocument)
    ),
    tag = "accounts"
)]
#[instrument(skip_all)]
pub async fn change_password(
    service: Extension<Service>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let document: ChangePasswordDocument = parse_document(&headers, &body)?;
    require_accounts_type(&document.data.kind)?;
    let session = caller_session(&headers)?;

    let attributes = document.data.attributes;
    service
        .change_own_password(
            &session,
            PasswordChange {
                old_password: secret(attributes.old_password),
                new_password: secret(attributes.new_password),
                new_password_confirmation: secret(attributes.new_password_confirmation),
            },
        )
        .await?;
    Ok(no_content())
}

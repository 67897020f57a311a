use super::{
    no_content, parse_document, require_accounts_type, rewrite_url_header, secret, session_header,
    types::{
        AccountAttributes, AccountDocument, AccountResource, ErrorDocument, Links, RegisterDocument,
        UpdateDocument, ACCOUNTS_TYPE,
    },
    ApiError, Service, JSON_API,
};
use crate::accounts::{AccountChanges, Registration};
use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use secrecy::SecretString;
use tracing::{debug, instrument};

#[utoipa::path(
    post,
    path = "/accounts",
    request_body(content = RegisterDocument, content_type = "application/vnd.api+json"),
    responses(
        (status = 201, description = "Account registered", body = AccountDocument, content_type = "application/vnd.api+json"),
        (status = 400, description = "Invalid registration or missing headers", body = ErrorDocument),
        (status = 403, description = "Client supplied an id", body = ErrorDocument),
        (status = 409, description = "Wrong resource type", body = ErrorDocument),
        (status = 503, description = "Graph store unavailable", body = ErrorDocument)
    ),
    tag = "accounts"
)]
#[instrument(skip_all)]
pub async fn register(
    service: Extension<Service>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let document: RegisterDocument = parse_document(&headers, &body)?;
    let data = document.data;

    if data.id.is_some() {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "Id paramater is not allowed"));
    }
    let session = session_header(&headers)?.ok_or_else(|| ApiError::bad_request("Session header is missing"))?;
    let rewrite_url =
        rewrite_url_header(&headers).ok_or_else(|| ApiError::bad_request("X-Rewrite-URL header is missing"))?;
    require_accounts_type(&data.kind)?;

    let attributes = data.attributes;
    let registered = service
        .register(Registration {
            name: attributes.name.unwrap_or_default(),
            nickname: attributes.nickname.unwrap_or_default(),
            password: secret(attributes.password),
            password_confirmation: secret(attributes.password_confirmation),
            session: Some(session),
        })
        .await?;
    debug!("Session bound on registration: {}", registered.session_bound);

    let document = AccountDocument {
        links: Links {
            self_link: format!("{}/{}", rewrite_url.trim_end_matches('/'), registered.id),
        },
        data: AccountResource {
            kind: ACCOUNTS_TYPE.to_string(),
            id: registered.id,
            attributes: AccountAttributes {
                name: registered.name,
                nickname: registered.nickname,
            },
        },
    };

    Ok((
        StatusCode::CREATED,
        [(CONTENT_TYPE, HeaderValue::from_static(JSON_API))],
        Json(document),
    )
        .into_response())
}

#[utoipa::path(
    delete,
    path = "/accounts/{id}",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 204, description = "Account deactivated"),
        (status = 404, description = "No account with this id", body = ErrorDocument),
        (status = 503, description = "Graph store unavailable", body = ErrorDocument)
    ),
    tag = "accounts"
)]
#[instrument(skip(service))]
pub async fn deactivate(service: Extension<Service>, Path(id): Path<String>) -> Result<Response, ApiError> {
    service.deactivate(&id).await?;
    Ok(no_content())
}

#[utoipa::path(
    patch,
    path = "/accounts/{id}",
    params(("id" = String, Path, description = "Account id")),
    request_body(content = UpdateDocument, content_type = "application/vnd.api+json"),
    responses(
        (status = 204, description = "Account updated"),
        (status = 400, description = "Invalid change", body = ErrorDocument),
        (status = 404, description = "No active account with this id", body = ErrorDocument),
        (status = 409, description = "Wrong resource type or id", body = ErrorDocument),
        (status = 503, description = "Graph store unavailable", body = ErrorDocument)
    ),
    tag = "accounts"
)]
#[instrument(skip(service, headers, body))]
pub async fn update(
    service: Extension<Service>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let document: UpdateDocument = parse_document(&headers, &body)?;
    let data = document.data;
    require_accounts_type(&data.kind)?;
    if data.id.as_deref() != Some(id.as_str()) {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "Incorrect id. Id does not match the request URL.",
        ));
    }

    let attributes = data.attributes;
    service
        .update(
            &id,
            AccountChanges {
                nickname: attributes.nickname,
                password: attributes.password.map(SecretString::from),
                password_confirmation: attributes.password_confirmation.map(SecretString::from),
                name: attributes.name,
            },
        )
        .await?;
    Ok(no_content())
}

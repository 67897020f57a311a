use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    response::Response,
    Router,
};
use registrar::{
    accounts::{AccountService, AccountsConfig, CredentialHasher},
    api,
    sparql::{Backend, MemoryStore},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const JSON_API: &str = "application/vnd.api+json";
const SESSION: &str = "http://mu.semte.ch/sessions/2a7c1f2e";
const REWRITE_URL: &str = "http://localhost/accounts";

fn app() -> Result<Router> {
    let hasher = CredentialHasher::new(SecretString::from("integration-secret")).with_cost(1024, 1, 1)?;
    let config = AccountsConfig::default().with_auto_login(true);
    let service = AccountService::new(Backend::Memory(MemoryStore::new()), hasher, config);
    Ok(api::router(Arc::new(service)))
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Result<Request<Body>> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, JSON_API)
        .header("mu-session-id", SESSION)
        .header("x-rewrite-url", REWRITE_URL);
    let body = body.map_or_else(Body::empty, |value| Body::from(value.to_string()));
    Ok(builder.body(body)?)
}

async fn json_body(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn error_title(response: Response) -> Result<String> {
    let body = json_body(response).await?;
    Ok(body["errors"][0]["title"].as_str().unwrap_or_default().to_string())
}

fn registration(nickname: &str, password: &str) -> Value {
    json!({
        "data": {
            "type": "accounts",
            "attributes": {
                "name": "John Doe",
                "nickname": nickname,
                "password": password,
                "password-confirmation": password
            }
        }
    })
}

async fn register(app: &Router, nickname: &str, password: &str) -> Result<Response> {
    let request = request(Method::POST, "/accounts", Some(registration(nickname, password)))?;
    Ok(app.clone().oneshot(request).await?)
}

#[tokio::test]
async fn register_returns_created_document() -> Result<()> {
    let app = app()?;

    let response = register(&app, " JohnDoe ", "secret").await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some(JSON_API)
    );
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    assert!(!id.is_empty());
    assert_eq!(body["data"]["type"], "accounts");
    assert_eq!(body["data"]["attributes"]["nickname"], "johndoe");
    assert_eq!(body["data"]["attributes"]["name"], "John Doe");
    assert_eq!(body["links"]["self"], format!("{REWRITE_URL}/{id}"));
    Ok(())
}

#[tokio::test]
async fn register_rejects_malformed_requests() -> Result<()> {
    let app = app()?;

    let mut with_id = registration("jane", "secret");
    with_id["data"]["id"] = json!("chosen-by-client");
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/accounts", Some(with_id))?)
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut wrong_type = registration("jane", "secret");
    wrong_type["data"]["type"] = json!("users");
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/accounts", Some(wrong_type))?)
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let plain_json = Request::builder()
        .method(Method::POST)
        .uri("/accounts")
        .header(CONTENT_TYPE, "application/json")
        .header("mu-session-id", SESSION)
        .header("x-rewrite-url", REWRITE_URL)
        .body(Body::from(registration("jane", "secret").to_string()))?;
    let response = app.clone().oneshot(plain_json).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let no_rewrite = Request::builder()
        .method(Method::POST)
        .uri("/accounts")
        .header(CONTENT_TYPE, JSON_API)
        .header("mu-session-id", SESSION)
        .body(Body::from(registration("jane", "secret").to_string()))?;
    let response = app.clone().oneshot(no_rewrite).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_title(response).await?, "X-Rewrite-URL header is missing");
    Ok(())
}

#[tokio::test]
async fn duplicate_nickname_is_a_bad_request() -> Result<()> {
    let app = app()?;

    assert_eq!(register(&app, "johndoe", "secret").await?.status(), StatusCode::CREATED);

    let response = register(&app, "JOHNDOE", "other").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_title(response).await?, "Nickname already exists");
    Ok(())
}

#[tokio::test]
async fn update_requires_matching_id() -> Result<()> {
    let app = app()?;
    let body = json_body(register(&app, "johndoe", "secret").await?).await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let mismatch = json!({
        "data": { "type": "accounts", "id": "someone-else", "attributes": { "nickname": "jd" } }
    });
    let response = app
        .clone()
        .oneshot(request(Method::PATCH, &format!("/accounts/{id}"), Some(mismatch))?)
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        error_title(response).await?,
        "Incorrect id. Id does not match the request URL."
    );

    let rename = json!({
        "data": { "type": "accounts", "id": id, "attributes": { "nickname": "jd" } }
    });
    let response = app
        .clone()
        .oneshot(request(Method::PATCH, &format!("/accounts/{id}"), Some(rename))?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The old nickname is free again.
    assert_eq!(register(&app, "johndoe", "secret").await?.status(), StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn deactivate_by_id() -> Result<()> {
    let app = app()?;
    let body = json_body(register(&app, "johndoe", "secret").await?).await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, &format!("/accounts/{id}"), None)?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, "/accounts/does-not-exist", None)?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn change_password_of_current_account() -> Result<()> {
    let app = app()?;
    assert_eq!(register(&app, "johndoe", "secret").await?.status(), StatusCode::CREATED);

    let change = |old: &str| {
        json!({
            "data": {
                "type": "accounts",
                "attributes": {
                    "old-password": old,
                    "new-password": "n3w",
                    "new-password-confirmation": "n3w"
                }
            }
        })
    };

    let response = app
        .clone()
        .oneshot(request(
            Method::PATCH,
            "/accounts/current/changePassword",
            Some(change("secret")),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request(
            Method::PATCH,
            "/accounts/current/changePassword",
            Some(change("secret")),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_title(response).await?, "incorrect old password");
    Ok(())
}

#[tokio::test]
async fn deactivate_current_account() -> Result<()> {
    let app = app()?;
    assert_eq!(register(&app, "johndoe", "secret").await?.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, "/accounts/current", None)?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let anonymous = Request::builder()
        .method(Method::DELETE)
        .uri("/accounts/current")
        .body(Body::empty())?;
    let response = app.clone().oneshot(anonymous).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn health_reports_store() -> Result<()> {
    let app = app()?;

    let head = Request::builder()
        .method(Method::HEAD)
        .uri("/health")
        .body(Body::empty())?;
    let response = app.clone().oneshot(head).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));

    let body = json_body(response).await?;
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["store"], "ok");
    Ok(())
}

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use poll_admin::{
    AppConfig, AppState, InMemoryRepository, SessionResolver,
    identity::{AUTHENTICATED_AUDIENCE, Claims, JwtIdentityProvider, UserMetadata},
    session::SessionCookies,
};
use serde_json::Value;
use std::{sync::Arc, time::SystemTime};
use tower::util::ServiceExt;
use uuid::Uuid;

// --- Fixtures ---

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
pub const ADMIN_ID: Uuid = Uuid::from_u128(456);
pub const STUDENT_ID: Uuid = Uuid::from_u128(123);

fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Mints an access token signed with `secret`. `exp_offset` may be negative
/// to produce an already expired token.
pub fn create_token_with(secret: &str, user_id: Uuid, role: Option<&str>, exp_offset: i64) -> String {
    let now = now();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now as i64 + exp_offset) as usize,
        aud: AUTHENTICATED_AUDIENCE.to_string(),
        email: Some(format!("user_{}@example.com", user_id.simple())),
        user_metadata: UserMetadata {
            role: role.map(str::to_string),
        },
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

pub fn create_token(user_id: Uuid, role: Option<&str>) -> String {
    create_token_with(TEST_JWT_SECRET, user_id, role, 3600)
}

pub fn admin_cookie() -> String {
    format!("sb-access-token={}", create_token(ADMIN_ID, Some("admin")))
}

pub fn student_cookie() -> String {
    format!("sb-access-token={}", create_token(STUDENT_ID, Some("student")))
}

/// Sessions are verified locally against the test secret; polls live in `repo`.
pub fn create_test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        repo,
        sessions: SessionResolver::new(
            Arc::new(JwtIdentityProvider::new(TEST_JWT_SECRET)),
            SessionCookies::default(),
        ),
        config: AppConfig::default(),
    }
}

// --- Request helpers ---

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect()
    }
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let raw = axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec();
    let body = if raw.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&raw).unwrap_or(Value::Null)
    };

    TestResponse {
        status: parts.status,
        headers: parts.headers,
        body,
        raw,
    }
}

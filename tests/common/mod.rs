#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use http_body_util::BodyExt;
use serde_json::Value;
use taskhub::router::init_router;
use taskhub::state::AppState;
use taskhub_auth::memory::MemoryStores;
use taskhub_config::{CorsConfig, JwtConfig, SessionConfig};
use taskhub_core::Role;
use taskhub_models::RegisterRequest;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "testpass123";

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub role: Role,
}

pub struct TestSession {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-key-at-least-32-characters-long".to_string(),
        issuer: "task-management-api".to_string(),
        audience: "task-management-frontend".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        leeway: 0,
    }
}

pub fn generate_unique_email() -> String {
    format!("test_{}@example.com", Uuid::new_v4())
}

pub fn generate_unique_username() -> String {
    format!("user_{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// The full router over in-memory stores.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub stores: MemoryStores,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_session_config(SessionConfig::default())
    }

    pub fn with_session_config(session_config: SessionConfig) -> Self {
        let jwt_config = test_jwt_config();
        let stores = MemoryStores::new(&jwt_config, &session_config);
        let sessions = stores.session_manager(&jwt_config, session_config);
        let state = AppState::new(
            sessions,
            CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
        );

        Self {
            router: init_router(state.clone()),
            state,
            stores,
        }
    }

    /// Creates a user directly through the session manager.
    pub async fn create_user(&self, role: Role, is_verified: bool) -> TestUser {
        let request = RegisterRequest {
            username: generate_unique_username(),
            email: generate_unique_email(),
            password: TEST_PASSWORD.to_string(),
            first_name: FirstName().fake(),
            last_name: LastName().fake(),
            role: None,
        };
        let user = self
            .state
            .sessions
            .register(&request, role, is_verified)
            .await
            .unwrap();

        TestUser {
            id: user.id,
            email: user.email,
            password: TEST_PASSWORD.to_string(),
            role,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, body }
    }

    pub async fn login(&self, user: &TestUser) -> TestSession {
        let response = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({
                    "email": user.email,
                    "password": user.password,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);

        TestSession {
            access_token: response.body["tokens"]["access_token"]
                .as_str()
                .unwrap()
                .to_string(),
            refresh_token: response.body["tokens"]["refresh_token"]
                .as_str()
                .unwrap()
                .to_string(),
        }
    }
}

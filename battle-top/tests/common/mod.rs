//! Shared harness: an in-memory server driven through `tower::ServiceExt`

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use battle_core::FeatureFlags;
use battle_top::{create_router, AppState, Config, Database};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const INIT_KEY: &str = "test-init-key";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// Server with every feature switched on
pub fn app() -> TestApp {
    let mut config = Config::default();
    config.features = FeatureFlags::all_enabled();
    app_with(config)
}

pub fn app_with(mut config: Config) -> TestApp {
    config.auth.dev_mode = true;
    config.auth.init_key = Some(INIT_KEY.to_string());
    let db = Database::open_in_memory().unwrap();
    let state = AppState::new(config, db).unwrap();
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Register and log in; returns (user id, token)
    pub async fn signup(&self, name: &str) -> (String, String) {
        let email = format!("{}@example.com", name);
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "name": name,
                    "email": email,
                    "password": "hunter22",
                    "securityQuestion": "pet",
                    "securityAnswer": "Rex",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = self
            .post("/api/auth/login", None, json!({ "email": email, "password": "hunter22" }))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        let token = body["data"]["token"].as_str().unwrap().to_string();
        (id, token)
    }

    /// Create a two-item draft; returns its id
    pub async fn draft(&self, token: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                "/api/rankings",
                Some(token),
                json!({
                    "title": title,
                    "description": "Best of the best",
                    "items": [
                        { "name": "First", "justification": "Clearly the strongest" },
                        { "name": "Second", "imageUrl": "" }
                    ],
                    "tags": ["ai", "llm"]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create ranking failed: {}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn recharge(&self, token: &str, amount: f64) -> Value {
        let (status, body) = self.post("/api/wallet", Some(token), json!({ "amount": amount })).await;
        assert_eq!(status, StatusCode::OK, "recharge failed: {}", body);
        body
    }
}

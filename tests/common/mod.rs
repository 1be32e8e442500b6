//! Shared helpers for router tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use studydrop_server::ai::AiService;
use studydrop_server::db::{create_memory_pool, Role, UserRepository};
use studydrop_server::storage::MemoryStore;
use studydrop_server::{router, AppState, Config};

pub const BOUNDARY: &str = "studydrop-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: MemoryStore,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let pool = create_memory_pool().await.unwrap();
        let store = MemoryStore::new();
        let state = AppState::new(config, pool, Arc::new(store.clone()), AiService::disabled());

        Self {
            router: router(state.clone()),
            state,
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Register a user and return (token, user id)
    pub async fn register(&self, name: &str) -> (String, String) {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                json!({
                    "email": format!("{}@example.edu", name),
                    "username": name,
                    "password": "correct-horse",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Register a user and promote them to admin
    pub async fn register_admin(&self, name: &str) -> (String, String) {
        let (token, id) = self.register(name).await;
        UserRepository::new(self.state.db())
            .set_role(&id, Role::Admin)
            .await
            .unwrap();
        (token, id)
    }

    pub async fn create_class(&self, token: &str, code: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/classes",
                Some(token),
                json!({ "code": code, "name": format!("{} lecture", code) }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create class failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// POST a multipart upload
    pub async fn upload(
        &self,
        token: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
        fields: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/uploads")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(file_name, content_type, data, fields)))
            .unwrap();
        self.send(request).await
    }
}

pub fn multipart_body(file_name: &str, content_type: &str, data: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, file_name, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    body
}

/// Minimal bytes that look like a PDF
pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\ntrailer << /Root 1 0 R >>\n%%EOF\n".to_vec()
}

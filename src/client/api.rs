//! Typed HTTP client for the StudyDrop API

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cache::{CacheStats, ResponseCache, DEFAULT_TTL};
use crate::db::{Class, Comment, CreateClass, Notification, UpdateUpload, Upload, User};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadLink {
    pub upload_id: String,
    pub file_name: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Optional metadata sent alongside a file
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

/// Upload search parameters
#[derive(Debug, Clone, Default)]
pub struct UploadQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

#[derive(Deserialize)]
struct UnreadCount {
    count: i64,
}

/// Build `?a=1&b=2` from the present pairs
pub(crate) fn query_string(pairs: &[(&str, Option<String>)]) -> String {
    let parts: Vec<String> = pairs
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| format!("{}={}", key, urlencoding::encode(v)))
        })
        .collect();

    if parts.is_empty() {
        String::new()
    } else {
        format!("?{}", parts.join("&"))
    }
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    token: RwLock<Option<String>>,
    cache: ResponseCache,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_cache_ttl(base_url, DEFAULT_TTL)
    }

    pub fn with_cache_ttl(base_url: &str, ttl: Duration) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            cache: ResponseCache::new(ttl),
        })
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
        // Cached responses belong to the previous identity
        self.cache.clear();
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn execute(&self, request: RequestBuilder) -> ClientResult<String> {
        let request = match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Request failed").to_string());

        tracing::debug!(status = status.as_u16(), "API request failed: {}", message);

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// GET, served from the cache when fresh
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        if let Some(body) = self.cache.get(path) {
            return Ok(serde_json::from_str(&body)?);
        }

        let body = self.execute(self.http.get(self.url(path))).await?;
        let value = serde_json::from_str(&body)?;
        self.cache.insert(path, body);
        Ok(value)
    }

    /// Run a write, clearing the cache on both sides of the request
    async fn mutate(&self, request: RequestBuilder) -> ClientResult<String> {
        self.cache.clear();
        let result = self.execute(request).await;
        self.cache.clear();
        result
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        let body = self.mutate(self.http.post(self.url(path)).json(body)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        let body = self.mutate(self.http.put(self.url(path)).json(body)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// PUT with no request or response body
    pub async fn put_empty(&self, path: &str) -> ClientResult<()> {
        self.mutate(self.http.put(self.url(path))).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.mutate(self.http.delete(self.url(path))).await?;
        Ok(())
    }

    pub async fn register(&self, email: &str, username: &str, password: &str) -> ClientResult<AuthResponse> {
        let auth: AuthResponse = self
            .post(
                "/auth/register",
                &Credentials {
                    email,
                    password,
                    username: Some(username),
                },
            )
            .await?;
        self.set_token(Some(auth.token.clone()));
        Ok(auth)
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        let auth: AuthResponse = self
            .post(
                "/auth/login",
                &Credentials {
                    email,
                    password,
                    username: None,
                },
            )
            .await?;
        self.set_token(Some(auth.token.clone()));
        Ok(auth)
    }

    pub fn logout(&self) {
        self.set_token(None);
    }

    pub async fn me(&self) -> ClientResult<User> {
        self.get("/auth/me").await
    }

    pub async fn classes(&self, q: Option<&str>) -> ClientResult<Vec<Class>> {
        let query = query_string(&[("q", q.map(str::to_string))]);
        self.get(&format!("/classes{}", query)).await
    }

    pub async fn create_class(&self, class: &CreateClass) -> ClientResult<Class> {
        self.post("/classes", class).await
    }

    pub async fn join_class(&self, class_id: &str) -> ClientResult<Class> {
        self.post(&format!("/classes/{}/join", class_id), &()).await
    }

    pub async fn class_uploads(&self, class_id: &str) -> ClientResult<Vec<Upload>> {
        self.get(&format!("/classes/{}/uploads", class_id)).await
    }

    pub async fn search_uploads(&self, query: &UploadQuery) -> ClientResult<Vec<Upload>> {
        let query = query_string(&[
            ("q", query.q.clone()),
            ("category", query.category.clone()),
            ("tag", query.tag.clone()),
            ("limit", query.limit.map(|l| l.to_string())),
        ]);
        self.get(&format!("/uploads{}", query)).await
    }

    pub async fn upload(&self, id: &str) -> ClientResult<Upload> {
        self.get(&format!("/uploads/{}", id)).await
    }

    /// Multipart upload of a file into a class
    pub async fn upload_file(
        &self,
        class_id: &str,
        file_name: &str,
        mime_type: &str,
        data: Vec<u8>,
        metadata: &UploadMetadata,
    ) -> ClientResult<Upload> {
        let part = multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(mime_type)?;

        let mut form = multipart::Form::new()
            .text("class_id", class_id.to_string())
            .part("file", part);
        if let Some(title) = &metadata.title {
            form = form.text("title", title.clone());
        }
        if let Some(summary) = &metadata.summary {
            form = form.text("summary", summary.clone());
        }
        if let Some(category) = &metadata.category {
            form = form.text("category", category.clone());
        }
        if !metadata.tags.is_empty() {
            form = form.text("tags", serde_json::to_string(&metadata.tags)?);
        }

        let body = self
            .mutate(self.http.post(self.url("/uploads")).multipart(form))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn update_upload(&self, id: &str, update: &UpdateUpload) -> ClientResult<Upload> {
        self.put(&format!("/uploads/{}", id), update).await
    }

    pub async fn delete_upload(&self, id: &str) -> ClientResult<()> {
        self.delete(&format!("/uploads/{}", id)).await
    }

    pub async fn comments(&self, upload_id: &str) -> ClientResult<Vec<Comment>> {
        self.get(&format!("/comments/upload/{}", upload_id)).await
    }

    pub async fn add_comment(&self, upload_id: &str, body: &str) -> ClientResult<Comment> {
        self.post(
            &format!("/comments/upload/{}", upload_id),
            &serde_json::json!({ "body": body }),
        )
        .await
    }

    pub async fn notifications(&self) -> ClientResult<Vec<Notification>> {
        self.get("/notifications").await
    }

    pub async fn unread_count(&self) -> ClientResult<i64> {
        let count: UnreadCount = self.get("/notifications/unread-count").await?;
        Ok(count.count)
    }

    pub async fn mark_all_read(&self) -> ClientResult<()> {
        self.put_empty("/notifications/read-all").await
    }

    pub async fn record_download(&self, upload_id: &str) -> ClientResult<DownloadLink> {
        self.post(&format!("/downloads/{}", upload_id), &()).await
    }
}

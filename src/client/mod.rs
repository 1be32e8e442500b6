//! API client with a short-lived response cache

mod api;
mod cache;

pub use api::{
    ApiClient, AuthResponse, ClientError, ClientResult, DownloadLink, UploadMetadata, UploadQuery,
};
pub use cache::{CacheStats, ResponseCache, DEFAULT_TTL};

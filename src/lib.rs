//! StudyDrop Server
//!
//! Class study-material sharing: students join classes, upload PDFs and
//! images, and get AI-suggested titles, categories and tags. The crate also
//! carries the virtualized document viewer core and a typed API client.
//!
//! # Modules
//!
//! - `routes`: REST API under `/api`
//! - `db`: SQLite repositories
//! - `storage`: S3 and in-memory object stores
//! - `ai`: Gemini provider with deterministic fallbacks
//! - `viewer`: page virtualization state machine and render driver
//! - `client`: reqwest API client with a GET response cache

pub mod ai;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;
pub mod viewer;

pub use config::{Config, ConfigError};
pub use error::{AppError, Result};
pub use routes::router;
pub use state::AppState;

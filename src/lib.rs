//! # GitHub API client
//!
//! An async client for GitHub's REST API with:
//! - Verb dispatch (`get`, `post`, `put`, `delete`, `patch`) over one connection pool
//! - Basic and token authentication
//! - Endpoints described as data (name, aliases, verb, path template)
//! - Lazy, restartable Link-header pagination
//! - Rate limit tracking and retries with exponential backoff
//! - Structured `tracing` events and request metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use github_api::{GitHubClient, Params};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GitHubClient::builder().token("ghp_xxxxxxxxxxxx").build()?;
//!
//!     let events = client
//!         .events()
//!         .repository(Some("rails"), Some("rails"), Params::new().with("per_page", 10))
//!         .await?;
//!
//!     events.for_each(|event| println!("{}", event["type"]));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// Requests, responses and the HTTP client
pub mod client;
pub mod request;
pub mod response;

// Pagination handling
pub mod pagination;

// Endpoint tables and API services
pub mod endpoint;
pub mod services;

// Retry and rate limiting
pub mod resilience;

// Observability
pub mod observability;

// Re-exports for convenience
pub use auth::{basic_auth, token_auth, AuthMethod};
pub use client::{GitHubClient, GitHubClientBuilder};
pub use config::{GitHubConfig, GitHubConfigBuilder};
pub use endpoint::{Endpoint, PathArgs};
pub use errors::{GitHubError, GitHubErrorKind, GitHubResult};
pub use pagination::{PaginationLinks, PaginationParams, Paginator};
pub use request::{Params, Request, RequestOptions, Verb};
pub use response::ApiResponse;
pub use types::*;

//! Mood - client library for the Mood social network
//!
//! Session handling, the API client, and the screen controllers behind the
//! Mood clients. Front ends supply a [`screens::Presenter`] and drive the
//! controllers through [`service::MoodService`].

pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod routes;
pub mod screens;
pub mod service;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use api::ApiClient;
pub use auth::{AuthStore, LoginPayload, Session};
pub use config::Config;
pub use credentials::{CredentialConfig, CredentialManager, CredentialVault, StorageBackend};
pub use error::{MoodError, RequestError, Result};
pub use routes::{Route, RouteTree};
pub use service::MoodService;
pub use session::SessionManager;
pub use types::{ImageAttachment, SignInResponse, UserId, UserProfile};

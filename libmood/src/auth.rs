//! Auth state store
//!
//! Single source of truth for session status. Observers hold a
//! [`SessionReceiver`] and see every transition as soon as it is made.
//!
//! The store only tracks state. Attaching the bearer header and persisting
//! credentials belong to [`crate::session::SessionManager`], which performs
//! them together with `login`/`logout`.
//!
//! # Example
//!
//! ```
//! use libmood::auth::{AuthStore, LoginPayload};
//! use libmood::types::UserProfile;
//!
//! let store = AuthStore::new();
//! let mut observer = store.subscribe();
//!
//! store.login(LoginPayload {
//!     user: UserProfile::new(1),
//!     token: "T".to_string(),
//! });
//! assert!(observer.borrow_and_update().is_authenticated());
//! ```

use tokio::sync::watch;

use crate::types::UserProfile;

pub type SessionReceiver = watch::Receiver<Session>;

/// Process-wide authentication status
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Session {
    #[default]
    Unauthenticated,
    Authenticated { user: UserProfile, token: String },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            Session::Authenticated { user, .. } => Some(user),
            Session::Unauthenticated => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Session::Authenticated { token, .. } => Some(token),
            Session::Unauthenticated => None,
        }
    }
}

/// Argument of [`AuthStore::login`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoginPayload {
    pub user: UserProfile,
    pub token: String,
}

/// Observable session state with two transitions
pub struct AuthStore {
    sender: watch::Sender<Session>,
}

impl AuthStore {
    /// Starts unauthenticated
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Session::Unauthenticated);
        Self { sender }
    }

    /// Enter (or stay in) the authenticated state
    ///
    /// Logging in while already authenticated replaces the user and token.
    pub fn login(&self, payload: LoginPayload) {
        let previous = self.sender.send_replace(Session::Authenticated {
            user: payload.user,
            token: payload.token,
        });
        if previous.is_authenticated() {
            tracing::info!("Session user replaced");
        } else {
            tracing::info!("Session authenticated");
        }
    }

    /// Return to the unauthenticated state
    ///
    /// No-op (and no notification) when already unauthenticated.
    pub fn logout(&self) {
        let changed = self.sender.send_if_modified(|session| {
            if session.is_authenticated() {
                *session = Session::Unauthenticated;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!("Session cleared");
        }
    }

    /// Observe transitions; the receiver starts at the current value
    pub fn subscribe(&self) -> SessionReceiver {
        self.sender.subscribe()
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> Session {
        self.sender.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.sender.borrow().is_authenticated()
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

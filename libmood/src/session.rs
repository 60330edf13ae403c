//! Session manager
//!
//! Owns the three pieces of session state: the API client's bearer header,
//! the [`AuthStore`], and the remembered-session [`CredentialVault`]. Every
//! transition goes through here so that the header and the auth state always
//! change together:
//!
//! - authenticated ⇔ the client sends `Authorization: Bearer <token>` for the
//!   session's token
//! - unauthenticated ⇔ the client sends no `Authorization` header
//!
//! Screen controllers receive a `&SessionManager` rather than reaching for
//! global state.

use std::sync::{Arc, Mutex, PoisonError};

use crate::api::ApiClient;
use crate::auth::{AuthStore, LoginPayload, Session, SessionReceiver};
use crate::credentials::{CredentialRecord, CredentialVault};
use crate::error::Result;
use crate::types::SignInResponse;

pub struct SessionManager {
    api: Arc<ApiClient>,
    auth: AuthStore,
    vault: CredentialVault,
    commit: Mutex<()>,
}

impl SessionManager {
    pub fn new(api: Arc<ApiClient>, vault: CredentialVault) -> Self {
        Self {
            api,
            auth: AuthStore::new(),
            vault,
            commit: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn api_handle(&self) -> Arc<ApiClient> {
        Arc::clone(&self.api)
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn session(&self) -> Session {
        self.auth.snapshot()
    }

    pub fn subscribe(&self) -> SessionReceiver {
        self.auth.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// Commit a successful sign-in
    ///
    /// With `remember`, the credential record is written first; if that
    /// fails, nothing in memory changes and the error is returned. Without
    /// it, storage is never touched.
    pub fn sign_in(&self, response: SignInResponse, remember: bool) -> Result<()> {
        if remember {
            self.vault.save(&CredentialRecord {
                token: response.token.clone(),
                user: response.user.clone(),
            })?;
        }

        self.commit_login(LoginPayload {
            user: response.user,
            token: response.token,
        });
        Ok(())
    }

    /// Log in from the remembered record, if there is a complete one
    ///
    /// Returns whether a session was restored. Storage failures are logged
    /// and leave the session unauthenticated.
    pub fn restore(&self) -> bool {
        let record = match self.vault.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("No remembered session");
                return false;
            }
            Err(e) => {
                tracing::warn!("Could not read remembered session: {}", e);
                return false;
            }
        };

        tracing::info!("Restoring remembered session for user {}", record.user.id);
        self.commit_login(LoginPayload {
            user: record.user,
            token: record.token,
        });
        true
    }

    /// Clear the header and the auth state; the remembered record is kept
    pub fn logout(&self) {
        let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        self.api.clear_auth_header();
        self.auth.logout();
    }

    /// Log out and delete the remembered record
    pub fn logout_and_forget(&self) -> Result<()> {
        self.logout();
        self.vault.forget()
    }

    /// Delete the remembered record without touching the live session
    pub fn forget_credentials(&self) -> Result<()> {
        self.vault.forget()
    }

    /// Whether the header and the auth state agree
    pub fn is_consistent(&self) -> bool {
        let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        let header = self.api.auth_header();
        match self.auth.snapshot() {
            Session::Authenticated { token, .. } => {
                header.as_deref() == Some(format!("Bearer {}", token).as_str())
            }
            Session::Unauthenticated => header.is_none(),
        }
    }

    fn commit_login(&self, payload: LoginPayload) {
        let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        self.api.set_auth_header(&payload.token);
        self.auth.login(payload);
    }
}

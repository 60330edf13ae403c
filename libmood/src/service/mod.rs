//! Service facade for Mood
//!
//! `MoodService` wires the pieces a front end needs: configuration, the API
//! client, the session manager, and one controller per screen. A front end
//! builds one service, calls [`MoodService::restore_session`], and then
//! drives the controllers with its own [`crate::screens::Presenter`].
//!
//! # Example
//!
//! ```no_run
//! use libmood::service::MoodService;
//! use libmood::screens::{RecordingPresenter, SignInForm};
//!
//! # async fn example() -> libmood::Result<()> {
//! let service = MoodService::new()?;
//! service.restore_session();
//!
//! let presenter = RecordingPresenter::new();
//! service
//!     .sign_in()
//!     .submit(service.session(), &presenter, SignInForm::new("a@b.com", "longenough"))
//!     .await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::api::http::HttpTransport;
use crate::api::{ApiClient, Transport};
use crate::auth::SessionReceiver;
use crate::credentials::{CredentialManager, CredentialStore, CredentialVault};
use crate::routes::RouteTree;
use crate::screens::{PostController, SearchController, SignInController};
use crate::session::SessionManager;
use crate::{Config, Result};

pub struct MoodService {
    config: Arc<Config>,
    session: SessionManager,
    sign_in: SignInController,
    post: PostController,
    search: SearchController,
}

impl MoodService {
    /// Create a service from the default configuration location
    ///
    /// A missing config file is not an error; defaults are used.
    pub fn new() -> Result<Self> {
        let config = Config::load_or_default()?;
        Self::from_config(config)
    }

    /// Create a service over the real HTTP transport and credential backends
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP client cannot be built
    /// - No credential backend is available
    pub fn from_config(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(config.api.timeout_secs.map(Duration::from_secs))?;

        let mut credential_config = config.credential_config();
        credential_config.load_master_password_from_env();
        let store = CredentialManager::new(credential_config)?;

        Ok(Self::with_parts(config, Arc::new(transport), Box::new(store)))
    }

    /// Assemble a service from explicit parts
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        store: Box<dyn CredentialStore>,
    ) -> Self {
        tracing::debug!(
            "Mood service: api={} transport={} credentials={}",
            config.api.base_url,
            transport.name(),
            store.backend_name()
        );

        let api = Arc::new(ApiClient::new(&config.api.base_url, transport));
        let session = SessionManager::new(api, CredentialVault::new(store));

        Self {
            config: Arc::new(config),
            session,
            sign_in: SignInController::new(),
            post: PostController::new(),
            search: SearchController::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn sign_in(&self) -> &SignInController {
        &self.sign_in
    }

    pub fn post(&self) -> &PostController {
        &self.post
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    /// Auto-login from remembered credentials
    pub fn restore_session(&self) -> bool {
        self.session.restore()
    }

    /// Route tree for the current session
    pub fn route_tree(&self) -> RouteTree {
        RouteTree::for_session(&self.session.session())
    }

    pub fn subscribe(&self) -> SessionReceiver {
        self.session.subscribe()
    }
}

//! User search screen controller

use std::sync::{Mutex, PoisonError};

use super::{InFlight, Mounted, Notification, Presenter, Submission};
use crate::error::MoodError;
use crate::routes::Route;
use crate::session::SessionManager;
use crate::types::{UserId, UserProfile};

pub const SEARCH_PATH: &str = "/user/search";

const ERROR_TITLE: &str = "Error";
const ERROR_MESSAGE: &str = "Could not complete the search.";

pub struct SearchController {
    query: Mutex<String>,
    results: Mutex<Vec<UserProfile>>,
    loading: InFlight,
    mounted: Mounted,
}

impl SearchController {
    pub fn new() -> Self {
        Self {
            query: Mutex::new(String::new()),
            results: Mutex::new(Vec::new()),
            loading: InFlight::new(),
            mounted: Mounted::new(),
        }
    }

    pub fn query(&self) -> String {
        self.query
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_query(&self, query: impl Into<String>) {
        *self.query.lock().unwrap_or_else(PoisonError::into_inner) = query.into();
    }

    pub fn results(&self) -> Vec<UserProfile> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_active()
    }

    pub fn unmount(&self) {
        self.mounted.unmount();
    }

    /// Search users by the current query
    ///
    /// The query is lower-cased before sending. A successful response
    /// replaces the result list outright; a failure keeps the previous list
    /// and shows a generic error. Either way the query field is reset and
    /// the keyboard dismissed.
    pub async fn submit(
        &self,
        session: &SessionManager,
        presenter: &dyn Presenter,
    ) -> Submission<Vec<UserProfile>> {
        let Some(_loading) = self.loading.try_acquire() else {
            return Submission::Busy;
        };

        let query = self.query().to_lowercase();
        tracing::debug!("Searching users for '{}'", query);
        let result = session
            .api()
            .get_json_with_query::<Vec<UserProfile>>(SEARCH_PATH, &[("query", query.as_str())])
            .await;

        if !self.mounted.get() {
            return Submission::Discarded;
        }

        let outcome = match result {
            Ok(users) => {
                tracing::debug!("Search returned {} users", users.len());
                *self.results.lock().unwrap_or_else(PoisonError::into_inner) = users.clone();
                Submission::Completed(users)
            }
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                presenter.notify(Notification::error(ERROR_TITLE, ERROR_MESSAGE));
                Submission::Failed(MoodError::Request(e))
            }
        };

        self.set_query(String::new());
        presenter.dismiss_keyboard();
        outcome
    }

    /// Open a result's profile screen
    pub fn open_result(&self, presenter: &dyn Presenter, id: UserId) {
        presenter.navigate(Route::UserScreen { id });
    }
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new()
    }
}

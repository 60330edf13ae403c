//! Screen controllers
//!
//! Each controller owns the per-screen logic of one form: validate, call the
//! API, update the session, then tell the [`Presenter`] what to show. The
//! presenter is whatever front end is driving the controller (the CLI prints
//! notifications to stderr; tests record them).
//!
//! Controllers share two behaviours:
//!
//! - an [`InFlight`] flag: a second `submit` while one is running returns
//!   [`Submission::Busy`] without issuing a request, and the flag is released
//!   on every exit path by the guard's `Drop`
//! - a mounted flag: after `unmount()`, the eventual result of a running
//!   request is discarded (no session change, no notification, no navigation)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::MoodError;
use crate::routes::Route;

pub mod post;
pub mod search;
pub mod sign_in;

pub use post::{PostController, PostForm, MAX_POST_LENGTH};
pub use search::SearchController;
pub use sign_in::{SignInController, SignInForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A transient message for the user (toast)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(title: &str, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.to_string(),
            message: message.into(),
        }
    }

    pub fn error(title: &str, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// Front-end side effects a controller can request
pub trait Presenter: Send + Sync {
    fn notify(&self, notification: Notification);

    fn navigate(&self, route: Route);

    fn dismiss_keyboard(&self) {}
}

/// Outcome of a controller `submit`
#[derive(Debug)]
pub enum Submission<T> {
    Completed(T),
    Failed(MoodError),
    /// Another submission from the same controller is still running
    Busy,
    /// The controller was unmounted before the request finished
    Discarded,
}

impl<T> Submission<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Submission::Completed(_))
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Submission::Busy)
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Submission::Discarded)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Submission::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&MoodError> {
        match self {
            Submission::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Collapse into a `Result`; `Busy` and `Discarded` yield `None`
    pub fn into_result(self) -> Option<Result<T, MoodError>> {
        match self {
            Submission::Completed(value) => Some(Ok(value)),
            Submission::Failed(e) => Some(Err(e)),
            Submission::Busy | Submission::Discarded => None,
        }
    }
}

/// Loading flag of one control
#[derive(Debug, Default)]
pub struct InFlight {
    active: AtomicBool,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag, or `None` when it is already set
    pub fn try_acquire(&self) -> Option<InFlightGuard<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { flag: self })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Clears the [`InFlight`] flag when dropped
#[must_use = "the flag is released as soon as the guard is dropped"]
pub struct InFlightGuard<'a> {
    flag: &'a InFlight,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.active.store(false, Ordering::Release);
    }
}

/// Mounted/unmounted lifecycle of a screen
#[derive(Debug)]
pub(crate) struct Mounted(AtomicBool);

impl Mounted {
    pub(crate) fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    pub(crate) fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn unmount(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Presenter that records every call, for tests and headless use
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    notifications: Mutex<Vec<Notification>>,
    routes: Mutex<Vec<Route>>,
    keyboard_dismissals: Mutex<usize>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_notification(&self) -> Option<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn keyboard_dismissals(&self) -> usize {
        *self
            .keyboard_dismissals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Nothing was shown, navigated or dismissed
    pub fn is_untouched(&self) -> bool {
        self.notifications().is_empty() && self.routes().is_empty() && self.keyboard_dismissals() == 0
    }
}

impl Presenter for RecordingPresenter {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }

    fn navigate(&self, route: Route) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }

    fn dismiss_keyboard(&self) {
        *self
            .keyboard_dismissals
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
    }
}

//! Terminal front end for the screen controllers

use std::sync::atomic::{AtomicBool, Ordering};

use libmood::screens::{Notification, NotificationKind, Presenter};
use libmood::Route;

/// Prints notifications to stderr
///
/// Navigation has no terminal counterpart and is only logged.
#[derive(Default)]
pub struct TerminalPresenter {
    reported_error: AtomicBool,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an error notification has already been shown
    pub fn reported_error(&self) -> bool {
        self.reported_error.load(Ordering::Acquire)
    }
}

impl Presenter for TerminalPresenter {
    fn notify(&self, notification: Notification) {
        if notification.kind == NotificationKind::Error {
            self.reported_error.store(true, Ordering::Release);
        }
        eprintln!("{}: {}", notification.title, notification.message);
    }

    fn navigate(&self, route: Route) {
        tracing::debug!("Navigate to {}", route);
    }
}

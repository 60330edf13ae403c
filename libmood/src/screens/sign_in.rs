//! Sign-in screen controller

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{InFlight, Mounted, Notification, Presenter, Submission};
use crate::error::{MoodError, ValidationError};
use crate::session::SessionManager;
use crate::types::{SignInResponse, UserProfile};

pub const SIGN_IN_PATH: &str = "/user/signin";
pub const MIN_PASSWORD_LENGTH: usize = 8;
const ERROR_TITLE: &str = "Error - Sign in";

/// Values entered on the sign-in form
#[derive(Debug)]
pub struct SignInForm {
    pub email: String,
    pub password: SecretString,
}

impl SignInForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Field-level checks run before any request is made
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();

        let email = self.email.trim();
        if email.is_empty() {
            errors.push("email", "email is a required field");
        } else if !is_well_formed_email(email) {
            errors.push("email", "email must be a valid email");
        }

        let password = self.password.expose_secret();
        if password.is_empty() {
            errors.push("password", "password is a required field");
        } else if password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.push(
                "password",
                format!("password must be at least {} characters", MIN_PASSWORD_LENGTH),
            );
        }

        errors.into_result()
    }
}

#[derive(Serialize)]
struct SignInBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// One `@`, a non-empty local part, a dotted domain, no whitespace
fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

pub struct SignInController {
    remember: AtomicBool,
    loading: InFlight,
    mounted: Mounted,
}

impl SignInController {
    pub fn new() -> Self {
        Self {
            remember: AtomicBool::new(false),
            loading: InFlight::new(),
            mounted: Mounted::new(),
        }
    }

    pub fn remember(&self) -> bool {
        self.remember.load(Ordering::Acquire)
    }

    pub fn set_remember(&self, remember: bool) {
        self.remember.store(remember, Ordering::Release);
    }

    pub fn toggle_remember(&self) -> bool {
        !self.remember.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_active()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn unmount(&self) {
        self.mounted.unmount();
    }

    /// Validate, call `POST /user/signin`, and commit the session
    ///
    /// Validation failures come back as `Failed(Validation)` without a
    /// notification; the form shows them next to the fields. Request
    /// failures leave the session untouched and show the server's message.
    pub async fn submit(
        &self,
        session: &SessionManager,
        presenter: &dyn Presenter,
        form: SignInForm,
    ) -> Submission<UserProfile> {
        if let Err(e) = form.validate() {
            tracing::debug!("Sign-in form rejected: {}", e);
            return Submission::Failed(MoodError::Validation(e));
        }

        let Some(_loading) = self.loading.try_acquire() else {
            tracing::debug!("Sign-in already in flight");
            return Submission::Busy;
        };

        let body = SignInBody {
            email: form.email.trim(),
            password: form.password.expose_secret(),
        };
        let result = session
            .api()
            .post_json::<_, SignInResponse>(SIGN_IN_PATH, &body)
            .await;

        if !self.mounted.get() {
            tracing::debug!("Sign-in screen unmounted, discarding result");
            return Submission::Discarded;
        }

        let failure = match result {
            Ok(response) => {
                let user = response.user.clone();
                match session.sign_in(response, self.remember()) {
                    Ok(()) => return Submission::Completed(user),
                    Err(e) => e,
                }
            }
            Err(e) => MoodError::Request(e),
        };

        tracing::warn!("Sign-in failed: {}", failure);
        presenter.notify(Notification::error(ERROR_TITLE, failure.user_message()));
        Submission::Failed(failure)
    }
}

impl Default for SignInController {
    fn default() -> Self {
        Self::new()
    }
}

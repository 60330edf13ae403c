//! Post-creation screen controller

use std::collections::BTreeMap;

use super::{InFlight, Mounted, Notification, Presenter, Submission};
use crate::api::MultipartForm;
use crate::error::{MoodError, ValidationError};
use crate::routes::Route;
use crate::session::SessionManager;
use crate::types::ImageAttachment;

pub const CREATE_POST_PATH: &str = "/post/create";
pub const MAX_POST_LENGTH: usize = 280;

const IMAGE_PART: &str = "image";
const IMAGE_FILE_NAME: &str = "image.jpeg";
const CONTENT_PART: &str = "content";

/// Values entered on the post form
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub content: Option<String>,
    pub image: Option<ImageAttachment>,
}

impl PostForm {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        if let Some(content) = &self.content {
            if content.chars().count() > MAX_POST_LENGTH {
                errors.push(
                    CONTENT_PART,
                    format!("content must be at most {} characters", MAX_POST_LENGTH),
                );
            }
        }
        errors.into_result()
    }

    /// Multipart body: `image` first when attached, then `content`
    pub fn to_multipart(&self) -> MultipartForm {
        let mut form = MultipartForm::new();
        if let Some(image) = &self.image {
            form = form.file(
                IMAGE_PART,
                IMAGE_FILE_NAME,
                image.mime_type.as_str(),
                image.bytes.clone(),
            );
        }
        form.text(CONTENT_PART, self.content.clone().unwrap_or_default())
    }
}

pub struct PostController {
    loading: InFlight,
    mounted: Mounted,
}

impl PostController {
    pub fn new() -> Self {
        Self {
            loading: InFlight::new(),
            mounted: Mounted::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_active()
    }

    pub fn unmount(&self) {
        self.mounted.unmount();
    }

    /// Upload a new post via `POST /post/create`
    ///
    /// On success the keyboard is dismissed, a success notification shown,
    /// and the home feed asked to reload.
    pub async fn submit(
        &self,
        session: &SessionManager,
        presenter: &dyn Presenter,
        form: PostForm,
    ) -> Submission<()> {
        if let Err(e) = form.validate() {
            return Submission::Failed(MoodError::Validation(e));
        }

        let Some(_loading) = self.loading.try_acquire() else {
            return Submission::Busy;
        };

        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());

        tracing::debug!(
            "Creating post (image: {}, {} chars)",
            form.image.is_some(),
            form.content.as_deref().map_or(0, |c| c.chars().count())
        );
        let result = session
            .api()
            .post_multipart(CREATE_POST_PATH, form.to_multipart(), Some(headers))
            .await;

        if !self.mounted.get() {
            return Submission::Discarded;
        }

        match result {
            Ok(_) => {
                tracing::info!("Post created");
                presenter.dismiss_keyboard();
                presenter.notify(Notification::success(
                    "Success",
                    "Your post was created successfully!",
                ));
                presenter.navigate(Route::Home { should_load: true });
                Submission::Completed(())
            }
            Err(e) => {
                tracing::warn!("Post creation failed: {}", e);
                presenter.notify(Notification::error("An error occurred!", e.user_message()));
                Submission::Failed(MoodError::Request(e))
            }
        }
    }
}

impl Default for PostController {
    fn default() -> Self {
        Self::new()
    }
}

//! Integration tests for post creation

use std::sync::Arc;
use std::time::Duration;

use libmood::api::mock::MockTransport;
use libmood::api::{FormPart, RequestBody};
use libmood::credentials::MemoryStore;
use libmood::error::MoodError;
use libmood::screens::{NotificationKind, PostForm, RecordingPresenter, MAX_POST_LENGTH};
use libmood::types::{ImageAttachment, SignInResponse, UserProfile};
use libmood::{Config, MoodService, Route};
use serde_json::json;
use tempfile::TempDir;

fn setup(transport: &MockTransport) -> MoodService {
    let service = MoodService::with_parts(
        Config::default_config(),
        Arc::new(transport.clone()),
        Box::new(MemoryStore::new()),
    );
    service
        .session()
        .sign_in(
            SignInResponse {
                token: "T".to_string(),
                user: UserProfile::new(1),
            },
            false,
        )
        .unwrap();
    service
}

fn multipart_of(body: &RequestBody) -> &libmood::api::MultipartForm {
    match body {
        RequestBody::Multipart(form) => form,
        other => panic!("Expected multipart body, got {:?}", other),
    }
}

#[tokio::test]
async fn test_text_only_post() {
    let transport = MockTransport::new().reply_json(200, json!({"id": 10}));
    let service = setup(&transport);
    let presenter = RecordingPresenter::new();

    let outcome = service
        .post()
        .submit(service.session(), &presenter, PostForm::text("hello mood"))
        .await;
    assert!(outcome.is_completed());

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.url.path(), "/post/create");
    assert_eq!(sent.header("Accept"), Some("application/json"));
    assert_eq!(sent.header("Authorization"), Some("Bearer T"));

    let form = multipart_of(&sent.body);
    assert_eq!(form.part_names(), vec!["content"]);
    assert_eq!(
        form.part("content"),
        Some(&FormPart::Text {
            name: "content".to_string(),
            value: "hello mood".to_string(),
        })
    );
}

#[tokio::test]
async fn test_post_with_image() {
    let transport = MockTransport::new().reply_raw(201, Vec::new());
    let service = setup(&transport);
    let presenter = RecordingPresenter::new();

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sunset.jpg");
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00]).unwrap();
    let image = ImageAttachment::from_path(&path).await.unwrap();

    let outcome = service
        .post()
        .submit(
            service.session(),
            &presenter,
            PostForm::text("look").with_image(image),
        )
        .await;
    assert!(outcome.is_completed());

    let sent = transport.last_request().unwrap();
    let form = multipart_of(&sent.body);
    assert_eq!(form.part_names(), vec!["image", "content"]);
    match form.part("image") {
        Some(FormPart::File {
            file_name,
            mime_type,
            bytes,
            ..
        }) => {
            assert_eq!(file_name, "image.jpeg");
            assert_eq!(mime_type, "image/jpeg");
            assert_eq!(bytes.len(), 5);
        }
        other => panic!("Expected image part, got {:?}", other),
    }
}

#[tokio::test]
async fn test_success_notifies_and_reloads_home() {
    let transport = MockTransport::new().reply_json(200, json!({}));
    let service = setup(&transport);
    let presenter = RecordingPresenter::new();

    service
        .post()
        .submit(service.session(), &presenter, PostForm::text("hi"))
        .await;

    let notification = presenter.last_notification().unwrap();
    assert_eq!(notification.kind, NotificationKind::Success);
    assert_eq!(notification.title, "Success");
    assert_eq!(notification.message, "Your post was created successfully!");
    assert_eq!(presenter.keyboard_dismissals(), 1);
    assert_eq!(presenter.routes(), vec![Route::Home { should_load: true }]);
    assert!(!service.post().is_loading());
}

#[tokio::test]
async fn test_failure_shows_server_message() {
    let transport = MockTransport::new().reply_json(400, json!({"message": "Image too large"}));
    let service = setup(&transport);
    let presenter = RecordingPresenter::new();

    let outcome = service
        .post()
        .submit(service.session(), &presenter, PostForm::text("hi"))
        .await;

    assert!(matches!(outcome.error(), Some(MoodError::Request(_))));
    let notification = presenter.last_notification().unwrap();
    assert_eq!(notification.kind, NotificationKind::Error);
    assert_eq!(notification.title, "An error occurred!");
    assert_eq!(notification.message, "Image too large");
    assert!(presenter.routes().is_empty());
    assert!(!service.post().is_loading());
}

#[tokio::test]
async fn test_network_failure_clears_loading() {
    let transport = MockTransport::new().reply_network_error("offline");
    let service = setup(&transport);
    let presenter = RecordingPresenter::new();

    service
        .post()
        .submit(service.session(), &presenter, PostForm::text("hi"))
        .await;

    assert!(!service.post().is_loading());
    assert_eq!(
        presenter.last_notification().unwrap().message,
        libmood::error::GENERIC_ERROR_MESSAGE
    );
}

#[tokio::test]
async fn test_overlong_content_is_rejected_locally() {
    let transport = MockTransport::new();
    let service = setup(&transport);
    let presenter = RecordingPresenter::new();

    let outcome = service
        .post()
        .submit(
            service.session(),
            &presenter,
            PostForm::text("a".repeat(MAX_POST_LENGTH + 1)),
        )
        .await;

    assert!(matches!(outcome.error(), Some(MoodError::Validation(_))));
    assert_eq!(transport.request_count(), 0);
    assert!(presenter.is_untouched());
}

#[tokio::test]
async fn test_duplicate_post_is_busy() {
    let transport = MockTransport::new()
        .with_delay(Duration::from_millis(40))
        .reply_json(200, json!({}));
    let service = setup(&transport);
    let presenter = RecordingPresenter::new();
    let controller = service.post();

    let (first, second) = tokio::join!(
        controller.submit(service.session(), &presenter, PostForm::text("one")),
        controller.submit(service.session(), &presenter, PostForm::text("one")),
    );

    assert!(first.is_completed());
    assert!(second.is_busy());
    assert_eq!(transport.request_count(), 1);
    assert!(!controller.is_loading());
}

#[tokio::test]
async fn test_unmounted_post_screen_stays_silent() {
    let transport = MockTransport::new()
        .with_delay(Duration::from_millis(40))
        .reply_json(200, json!({}));
    let service = setup(&transport);
    let presenter = RecordingPresenter::new();
    let controller = service.post();

    let (outcome, _) = tokio::join!(
        controller.submit(service.session(), &presenter, PostForm::text("bye")),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.unmount();
        }
    );

    assert!(outcome.is_discarded());
    assert!(presenter.is_untouched());
    assert!(!controller.is_loading());
}

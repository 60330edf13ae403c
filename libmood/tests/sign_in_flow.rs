//! Integration tests for the sign-in flow
//!
//! Drives `SignInController` against a scripted transport and checks the
//! session, header, storage, and notifications after each outcome.

use std::sync::Arc;
use std::time::Duration;

use libmood::api::mock::MockTransport;
use libmood::api::RequestBody;
use libmood::credentials::{CredentialStore, MemoryStore, TOKEN_KEY, USER_KEY};
use libmood::error::{MoodError, GENERIC_ERROR_MESSAGE};
use libmood::screens::{NotificationKind, RecordingPresenter, SignInForm, Submission};
use libmood::{Config, MoodService, UserId};
use serde_json::json;

fn setup(transport: &MockTransport, store: &MemoryStore) -> MoodService {
    MoodService::with_parts(
        Config::default_config(),
        Arc::new(transport.clone()),
        Box::new(store.clone()),
    )
}

fn valid_form() -> SignInForm {
    SignInForm::new("a@b.com", "longenough")
}

fn success_reply() -> serde_json::Value {
    json!({"token": "T", "user": {"id": 1}})
}

/// Either fully signed in with the header set, or fully signed out
fn assert_not_mixed(service: &MoodService) {
    let session = service.session();
    assert!(session.is_consistent(), "session and header disagree");
    if session.is_authenticated() {
        assert!(session.api().auth_header().is_some());
    } else {
        assert_eq!(session.api().auth_header(), None);
    }
}

#[tokio::test]
async fn test_sign_in_accepts_any_user_shape() {
    let transport = MockTransport::new().reply_json(
        200,
        json!({
            "token": "T",
            "user": {
                "id": 18446744073709551615u64,
                "avatar_url": "a.png",
                "avatarUrl": "b.png",
                "followers": 3
            }
        }),
    );
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    let presenter = RecordingPresenter::new();

    let outcome = service
        .sign_in()
        .submit(service.session(), &presenter, valid_form())
        .await;

    let user = outcome.completed().expect("sign-in should complete");
    assert_eq!(user.id.to_string(), "18446744073709551615");
    assert_eq!(user.avatar_url.as_deref(), Some("a.png"));
    assert_eq!(user.extra.get("avatarUrl"), Some(&json!("b.png")));
    assert!(service.session().is_authenticated());
    assert!(presenter.notifications().is_empty());
    assert_not_mixed(&service);
}

#[tokio::test]
async fn test_sign_in_with_fractional_user_id() {
    let transport =
        MockTransport::new().reply_json(200, json!({"token": "T", "user": {"id": 1.5}}));
    let store = MemoryStore::new();
    let service = setup(&transport, &store);

    let outcome = service
        .sign_in()
        .submit(service.session(), &RecordingPresenter::new(), valid_form())
        .await;

    assert!(outcome.completed().is_some());
    assert_eq!(service.session().session().token(), Some("T"));
}

#[tokio::test]
async fn test_successful_sign_in() {
    let transport = MockTransport::new().reply_json(200, success_reply());
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    let presenter = RecordingPresenter::new();

    let outcome = service
        .sign_in()
        .submit(service.session(), &presenter, valid_form())
        .await;

    let user = outcome.completed().expect("sign-in should complete");
    assert_eq!(user.id, UserId::from(1));

    assert_eq!(
        service.session().api().auth_header().as_deref(),
        Some("Bearer T")
    );
    assert!(service.session().is_authenticated());
    assert_eq!(service.session().session().token(), Some("T"));
    assert!(!service.sign_in().is_loading());
    assert!(presenter.notifications().is_empty());
    assert_not_mixed(&service);

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.method, reqwest::Method::POST);
    assert_eq!(sent.url.path(), "/user/signin");
    assert_eq!(
        sent.body,
        RequestBody::Json(json!({"email": "a@b.com", "password": "longenough"}))
    );
}

#[tokio::test]
async fn test_rejected_credentials_show_server_message() {
    let transport = MockTransport::new().reply_json(401, json!({"message": "bad credentials"}));
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    let presenter = RecordingPresenter::new();

    let outcome = service
        .sign_in()
        .submit(service.session(), &presenter, valid_form())
        .await;

    match outcome.error() {
        Some(MoodError::Request(e)) => assert_eq!(e.status(), Some(401)),
        other => panic!("Expected request error, got {:?}", other),
    }

    let notification = presenter.last_notification().unwrap();
    assert_eq!(notification.kind, NotificationKind::Error);
    assert_eq!(notification.title, "Error - Sign in");
    assert_eq!(notification.message, "bad credentials");

    assert!(!service.session().is_authenticated());
    assert_eq!(service.session().api().auth_header(), None);
    assert!(!service.sign_in().is_loading());
    assert_eq!(store.write_count(), 0);
    assert_not_mixed(&service);
}

#[tokio::test]
async fn test_network_failure_degrades_to_generic_message() {
    let transport = MockTransport::new().reply_network_error("connection refused");
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    let presenter = RecordingPresenter::new();

    let outcome = service
        .sign_in()
        .submit(service.session(), &presenter, valid_form())
        .await;

    assert!(outcome.error().is_some());
    assert_eq!(
        presenter.last_notification().unwrap().message,
        GENERIC_ERROR_MESSAGE
    );
    assert!(!service.sign_in().is_loading());
    assert_not_mixed(&service);
}

#[tokio::test]
async fn test_server_error_without_message_is_generic() {
    let transport = MockTransport::new().reply_raw(500, b"Internal Server Error".to_vec());
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    let presenter = RecordingPresenter::new();

    service
        .sign_in()
        .submit(service.session(), &presenter, valid_form())
        .await;

    assert_eq!(
        presenter.last_notification().unwrap().message,
        GENERIC_ERROR_MESSAGE
    );
    assert_not_mixed(&service);
}

#[tokio::test]
async fn test_remember_me_persists_record() {
    let transport = MockTransport::new().reply_json(200, success_reply());
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    service.sign_in().set_remember(true);

    service
        .sign_in()
        .submit(service.session(), &RecordingPresenter::new(), valid_form())
        .await;

    assert_eq!(store.retrieve(TOKEN_KEY).unwrap(), "T");
    let user: serde_json::Value = serde_json::from_str(&store.retrieve(USER_KEY).unwrap()).unwrap();
    assert_eq!(user, json!({"id": 1}));
}

#[tokio::test]
async fn test_without_remember_me_storage_is_never_written() {
    let transport = MockTransport::new()
        .reply_json(200, success_reply())
        .reply_json(401, json!({"message": "bad credentials"}));
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    let presenter = RecordingPresenter::new();

    service
        .sign_in()
        .submit(service.session(), &presenter, valid_form())
        .await;
    service
        .sign_in()
        .submit(service.session(), &presenter, valid_form())
        .await;

    assert_eq!(store.write_count(), 0);
    assert!(store.entries().is_empty());
}

#[tokio::test]
async fn test_invalid_form_sends_nothing() {
    let transport = MockTransport::new();
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    let presenter = RecordingPresenter::new();

    let outcome = service
        .sign_in()
        .submit(
            service.session(),
            &presenter,
            SignInForm::new("a@b.com", "short"),
        )
        .await;

    match outcome.error() {
        Some(MoodError::Validation(errors)) => {
            assert!(errors.message_for("password").is_some());
            assert!(errors.message_for("email").is_none());
        }
        other => panic!("Expected validation error, got {:?}", other),
    }
    assert_eq!(transport.request_count(), 0);
    assert!(presenter.is_untouched());
    assert!(!service.sign_in().is_loading());
}

#[tokio::test]
async fn test_duplicate_submission_is_rejected_while_in_flight() {
    let transport = MockTransport::new()
        .with_delay(Duration::from_millis(50))
        .reply_json(200, success_reply())
        .reply_json(200, success_reply());
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    let presenter = RecordingPresenter::new();
    let controller = service.sign_in();

    let (first, second) = tokio::join!(
        controller.submit(service.session(), &presenter, valid_form()),
        controller.submit(service.session(), &presenter, valid_form()),
    );

    assert!(first.is_completed());
    assert!(second.is_busy());
    assert_eq!(transport.request_count(), 1);
    assert!(!controller.is_loading());

    // Released: a later submission goes through
    let third = controller
        .submit(service.session(), &presenter, valid_form())
        .await;
    assert!(third.is_completed());
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_loading_flag_is_set_while_request_runs() {
    let transport = MockTransport::new()
        .with_delay(Duration::from_millis(50))
        .reply_json(200, success_reply());
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    let presenter = RecordingPresenter::new();
    let controller = service.sign_in();

    let (outcome, seen_loading) = tokio::join!(
        controller.submit(service.session(), &presenter, valid_form()),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.is_loading()
        }
    );

    assert!(seen_loading);
    assert!(outcome.is_completed());
    assert!(!controller.is_loading());
}

#[tokio::test]
async fn test_unmounted_screen_discards_result() {
    let transport = MockTransport::new()
        .with_delay(Duration::from_millis(50))
        .reply_json(200, success_reply());
    let store = MemoryStore::new();
    let service = setup(&transport, &store);
    let presenter = RecordingPresenter::new();
    let controller = service.sign_in();
    controller.set_remember(true);

    let (outcome, _) = tokio::join!(
        controller.submit(service.session(), &presenter, valid_form()),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.unmount();
        }
    );

    assert!(outcome.is_discarded());
    assert_eq!(transport.request_count(), 1);
    assert!(!service.session().is_authenticated());
    assert_eq!(store.write_count(), 0);
    assert!(presenter.is_untouched());
    assert!(!controller.is_loading());
    assert_not_mixed(&service);
}

#[tokio::test]
async fn test_sign_in_settles_consistently_for_every_outcome() {
    let replies = vec![
        MockTransport::new().reply_json(200, success_reply()),
        MockTransport::new().reply_json(401, json!({"message": "bad credentials"})),
        MockTransport::new().reply_json(422, json!({"errors": []})),
        MockTransport::new().reply_json(200, json!({"unexpected": true})),
        MockTransport::new().reply_network_error("timeout"),
    ];

    for transport in replies {
        let store = MemoryStore::new();
        let service = setup(&transport, &store);
        service
            .sign_in()
            .submit(service.session(), &RecordingPresenter::new(), valid_form())
            .await;

        assert_not_mixed(&service);
        assert!(!service.sign_in().is_loading());
    }
}

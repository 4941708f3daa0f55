use std::sync::Arc;

use firekit::auth::{Auth, AuthError, InMemoryAuthBackend, UserInfo};
use futures::StreamExt;

fn auth() -> (Auth, InMemoryAuthBackend) {
    let backend = InMemoryAuthBackend::new();
    (Auth::new(Arc::new(backend.clone())), backend)
}

#[tokio::test]
async fn email_password_lifecycle() {
    let (auth, backend) = auth();

    let uid = auth.register("grace@example.com", "hopper1").await.unwrap();
    assert_eq!(auth.current_user().unwrap().uid(), uid);

    auth.logout().await.unwrap();
    assert!(auth.current_user().is_none());

    let err = auth.login("grace@example.com", "wrong-pass").await.unwrap_err();
    assert_eq!(err.code(), "auth/wrong-password");
    assert!(auth.current_user().is_none());

    assert_eq!(auth.login("grace@example.com", "hopper1").await.unwrap(), uid);

    auth.send_reset_password_email("grace@example.com").await.unwrap();
    assert_eq!(backend.sent_password_resets(), ["grace@example.com".to_string()]);
}

#[tokio::test]
async fn registration_errors_surface_backend_codes() {
    let (auth, _) = auth();
    auth.register("grace@example.com", "hopper1").await.unwrap();

    let duplicate = auth.register("grace@example.com", "hopper2").await.unwrap_err();
    assert_eq!(duplicate.code(), "auth/email-already-in-use");

    let weak = auth.register("ada@example.com", "abc").await.unwrap_err();
    assert_eq!(weak.code(), "auth/weak-password");

    let reset = auth.send_reset_password_email("nobody@example.com").await.unwrap_err();
    assert_eq!(reset.code(), "auth/user-not-found");
}

#[tokio::test]
async fn cancelled_google_redirect_is_an_error() {
    let (auth, backend) = auth();
    let err = auth.sign_in_with_google().await.unwrap_err();
    assert_eq!(err, AuthError::RedirectCancelled);
    assert_eq!(err.code(), "auth/redirect-cancelled-by-user");
    assert!(backend.pending_redirect().is_none());
    assert!(auth.current_user().is_none());
}

#[tokio::test]
async fn google_redirect_reuses_federated_account() {
    let (auth, backend) = auth();
    let info = UserInfo {
        uid: "g-42".into(),
        email: Some("grace@gmail.com".into()),
        ..Default::default()
    };

    backend.stage_redirect_user(info.clone());
    let first = auth.sign_in_with_google().await.unwrap();
    auth.logout().await.unwrap();

    backend.stage_redirect_user(info);
    let second = auth.sign_in_with_google().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(auth.current_user().unwrap().email(), Some("grace@gmail.com"));
}

#[tokio::test]
async fn mobile_google_sign_in_requires_token() {
    let (auth, _) = auth();
    let uid = auth.mobile_sign_in_with_google("native-token").await.unwrap();
    assert_eq!(auth.current_user().unwrap().provider_id(), "google.com");
    assert_eq!(auth.mobile_sign_in_with_google("native-token").await.unwrap(), uid);

    let err = auth.mobile_sign_in_with_google("").await.unwrap_err();
    assert_eq!(err.code(), "auth/invalid-credential");
}

#[tokio::test]
async fn auth_state_stream_tracks_session() {
    let (auth, _) = auth();
    let mut states = auth.on_auth_state_changed();
    assert!(states.next().await.unwrap().unwrap().is_none());

    let uid = auth.register("grace@example.com", "hopper1").await.unwrap();
    assert_eq!(states.next().await.unwrap().unwrap().unwrap().uid(), uid);

    assert!(auth.delete_auth_user().await.unwrap());
    assert!(states.next().await.unwrap().unwrap().is_none());

    states.restart();
    assert!(states.next().await.unwrap().unwrap().is_none());
    assert_eq!(states.open_count(), 2);
}

use std::sync::Arc;

use firekit::app::{AppError, AppRegistry, FirebaseApp, FirebaseOptions, DEFAULT_APP_NAME};
use firekit::auth::InMemoryAuthBackend;
use firekit::firestore::InMemoryDocumentStore;
use serde_json::json;

const WEB_CONFIG: &str = r#"{
    "apiKey": "AIza-test",
    "authDomain": "registry-tests.firebaseapp.com",
    "projectId": "registry-tests",
    "storageBucket": "registry-tests.appspot.com",
    "messagingSenderId": "1234",
    "appId": "1:1234:web:abcd"
}"#;

#[tokio::test]
async fn first_registration_wins() {
    let registry = AppRegistry::new();
    let options = FirebaseOptions::from_json(WEB_CONFIG).unwrap();

    let first = FirebaseApp::builder(options.clone()).build().unwrap();
    let second = FirebaseApp::builder(options).name("second").build().unwrap();

    assert!(registry.init_database(first.clone()));
    assert!(!registry.init_database(second));

    let resolved = registry.get_app(None).unwrap();
    assert!(resolved.ptr_eq(&first));
    assert_eq!(resolved.name(), DEFAULT_APP_NAME);
    assert_eq!(resolved.options().project_id.as_deref(), Some("registry-tests"));
    assert!(matches!(
        registry.get_app(Some("second")),
        Err(AppError::NoApp { .. })
    ));
}

#[tokio::test]
async fn registered_app_hands_out_shared_clients() {
    let store = InMemoryDocumentStore::new();
    let backend = InMemoryAuthBackend::new();
    let app = FirebaseApp::builder(FirebaseOptions::from_json(WEB_CONFIG).unwrap())
        .document_store(Arc::new(store.clone()))
        .auth_backend(Arc::new(backend.clone()))
        .build()
        .unwrap();

    let registry = AppRegistry::new();
    assert!(registry.init_database(app));

    let handle = registry.clone();
    let app = handle.get_app(None).unwrap();
    let uid = app.auth().register("lin@example.com", "secret1").await.unwrap();
    assert_eq!(app.auth().current_user().unwrap().uid(), uid);

    let id = app
        .firestore()
        .add_doc("profiles", json!({ "uid": uid }).as_object().cloned().unwrap())
        .await
        .unwrap();
    assert_eq!(store.document_count("profiles"), 1);
    let profile = registry
        .get_app(None)
        .unwrap()
        .firestore()
        .get_doc("profiles", &id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.get("uid"), Some(&json!(uid)));
}

#[test]
fn registries_are_independent() {
    let a = AppRegistry::new();
    let b = AppRegistry::new();
    let options = FirebaseOptions {
        project_id: Some("p".into()),
        ..Default::default()
    };
    assert!(a.init_database(FirebaseApp::builder(options).build().unwrap()));
    assert!(b.apps().is_empty());
    assert_eq!(b.get_app(None).unwrap_err().code(), "app/no-app");

    a.delete_app(DEFAULT_APP_NAME).unwrap();
    assert!(a.apps().is_empty());
}

#[test]
fn options_without_project_are_rejected() {
    let options = FirebaseOptions::from_json(r#"{ "apiKey": "k", "projectId": "  " }"#).unwrap();
    let err = FirebaseApp::builder(options).build().unwrap_err();
    assert_eq!(err, AppError::MissingProjectId);
}

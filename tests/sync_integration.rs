// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity synchronization tests (require both the Firestore and the
//! Firebase Auth emulators).

use bananacare_api::models::User;
use bananacare_api::services::firebase_auth::NewUserAttrs;
use bananacare_api::services::sync::ProfileUpdate;

mod common;

fn unique_email() -> String {
    format!("{}@example.com", uuid::Uuid::new_v4())
}

#[tokio::test]
async fn test_sync_twice_creates_exactly_one_user_and_account() {
    require_both_emulators!();
    let db = common::test_db().await;
    let (_app, state) = common::create_test_app_with_db(db.clone());

    let created = state
        .firebase
        .create_user(&NewUserAttrs {
            email: unique_email(),
            display_name: Some("Fresh User".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let first = state.sync.sync_user(&created.uid).await.unwrap();
    assert!(first.created);
    assert_eq!(first.user.firebase_uid.as_deref(), Some(created.uid.as_str()));

    let second = state.sync.sync_user(&created.uid).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.user.id, first.user.id);

    let accounts = db.get_accounts_for_user(&first.user.id).await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].provider, "firebase");
    assert_eq!(accounts[0].provider_account_id, created.uid);
}

#[tokio::test]
async fn test_sync_links_existing_password_user_without_account_row() {
    require_both_emulators!();
    let db = common::test_db().await;
    let (_app, state) = common::create_test_app_with_db(db.clone());

    let email = unique_email();

    // Password signup happened before any Firebase authentication
    let local_id = uuid::Uuid::new_v4().to_string();
    db.create_user(&User {
        id: local_id.clone(),
        firebase_uid: None,
        email: email.clone(),
        name: "Password User".to_string(),
        image: None,
        email_verified: None,
        password: Some("argon2-hash".to_string()),
        created_at: "2025-01-01T00:00:00Z".to_string(),
        updated_at: "2025-01-01T00:00:00Z".to_string(),
    })
    .await
    .unwrap();

    let created = state
        .firebase
        .create_user(&NewUserAttrs {
            email: email.clone(),
            display_name: Some("Linked Name".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let outcome = state.sync.sync_user(&created.uid).await.unwrap();

    // Linked in place: same row, no duplicate, and no account row on this path
    assert!(!outcome.created);
    assert_eq!(outcome.user.id, local_id);
    assert_eq!(outcome.user.firebase_uid.as_deref(), Some(created.uid.as_str()));
    assert_eq!(outcome.user.name, "Linked Name");
    assert_eq!(outcome.user.password.as_deref(), Some("argon2-hash"));

    let accounts = db.get_accounts_for_user(&local_id).await.unwrap();
    assert!(accounts.is_empty());
}

#[tokio::test]
async fn test_sync_unknown_uid_writes_nothing() {
    require_both_emulators!();
    let db = common::test_db().await;
    let (_app, state) = common::create_test_app_with_db(db.clone());

    let missing_uid = uuid::Uuid::new_v4().to_string();
    let err = state.sync.sync_user(&missing_uid).await.unwrap_err();

    assert!(err.is_not_found());
    assert!(db
        .find_user_by_firebase_uid(&missing_uid)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_profile_update_without_local_row_mutates_provider_and_fails() {
    require_both_emulators!();
    let db = common::test_db().await;
    let (_app, state) = common::create_test_app_with_db(db.clone());

    // Provider user exists, local row does not
    let created = state
        .firebase
        .create_user(&NewUserAttrs {
            email: unique_email(),
            display_name: Some("Before".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let err = state
        .sync
        .update_profile(
            &created.uid,
            ProfileUpdate {
                name: Some("After".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(err.is_not_found());

    // The provider was already mutated: the systems are now inconsistent,
    // which is this API's documented behavior.
    let foreign = state.firebase.get_user_by_uid(&created.uid).await.unwrap();
    assert_eq!(foreign.display_name.as_deref(), Some("After"));
    assert!(db
        .find_user_by_firebase_uid(&created.uid)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_profile_update_writes_both_systems() {
    require_both_emulators!();
    let db = common::test_db().await;
    let (_app, state) = common::create_test_app_with_db(db.clone());

    let created = state
        .firebase
        .create_user(&NewUserAttrs {
            email: unique_email(),
            display_name: Some("Before".to_string()),
            email_verified: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();

    let synced = state.sync.sync_user(&created.uid).await.unwrap();
    assert!(synced.user.email_verified.is_some());

    let (firebase_user, user) = state
        .sync
        .update_profile(
            &created.uid,
            ProfileUpdate {
                name: Some("After".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(firebase_user.display_name.as_deref(), Some("After"));
    assert_eq!(user.name, "After");
    assert_eq!(user.id, synced.user.id);

    // The update clears local verification unless the request explicitly
    // sets emailVerified=true.
    assert_eq!(user.email_verified, None);
}

//! SQLite user store against a file-backed database

mod common;

use chrono::Utc;
use tempfile::TempDir;

use common::*;
use faculty_core::types::{NewIdentity, UpdateUserRequest};
use faculty_core::{CredentialStore, Error, Role, SqliteUserStore, UserFilter, UserStore};

async fn create_test_store() -> (SqliteUserStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("faculty.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());

    let store = SqliteUserStore::new(&url).await.unwrap();
    (store, temp_dir)
}

fn new_user(username: &str, email: &str, role: Role) -> NewIdentity {
    NewIdentity {
        username: username.to_string(),
        password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c29tZXNhbHQ$aGFzaA".to_string(),
        email: email.to_string(),
        phone: Some("0901234567".to_string()),
        full_name: format!("{} full name", username),
        role,
        active: true,
    }
}

#[tokio::test]
async fn test_create_and_find_user() {
    let (store, _dir) = create_test_store().await;

    let created = store
        .create_user(new_user("tbm.pham", "tbm.pham@faculty.test", Role::SubjectHead))
        .await
        .unwrap();
    assert!(created.id > 0);
    assert!(created.active);
    assert_eq!(created.role, Role::SubjectHead);
    assert!(created.role_description.is_some());

    let found = store.find_by_username("tbm.pham").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.email, "tbm.pham@faculty.test");
    assert_eq!(found.phone.as_deref(), Some("0901234567"));

    let by_id = store.get_user(created.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, "tbm.pham");

    assert!(store.find_by_username("nobody").await.unwrap().is_none());
    assert!(store.get_user(created.id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_username_and_email() {
    let (store, _dir) = create_test_store().await;
    store
        .create_user(new_user("gv01", "gv01@faculty.test", Role::Lecturer))
        .await
        .unwrap();

    let err = store
        .create_user(new_user("gv01", "other@faculty.test", Role::Lecturer))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserAlreadyExists(_)));

    let err = store
        .create_user(new_user("gv02", "gv01@faculty.test", Role::Lecturer))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserAlreadyExists(_)));
}

#[tokio::test]
async fn test_record_login_and_toggle_active() {
    let (store, _dir) = create_test_store().await;
    let user = store
        .create_user(new_user("sv01", "sv01@faculty.test", Role::Student))
        .await
        .unwrap();
    assert!(user.last_login.is_none());

    let at = Utc::now();
    store.record_login(user.id, at).await.unwrap();
    let reloaded = store.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.last_login.map(|t| t.timestamp()), Some(at.timestamp()));

    let disabled = store.set_active(user.id, false).await.unwrap();
    assert!(!disabled.active);
    let reloaded = store.find_by_username("sv01").await.unwrap().unwrap();
    assert!(!reloaded.active);

    let err = store.set_active(user.id + 100, false).await.unwrap_err();
    assert!(matches!(err, Error::UserNotFound(_)));
}

#[tokio::test]
async fn test_list_users_with_filter() {
    let (store, _dir) = create_test_store().await;
    store
        .create_user(new_user("admin", "admin@faculty.test", Role::Admin))
        .await
        .unwrap();
    let lecturer = store
        .create_user(new_user("gv01", "gv01@faculty.test", Role::Lecturer))
        .await
        .unwrap();
    store
        .create_user(new_user("gv02", "gv02@faculty.test", Role::Lecturer))
        .await
        .unwrap();
    store.set_active(lecturer.id, false).await.unwrap();

    assert_eq!(store.list_users(UserFilter::default()).await.unwrap().len(), 3);

    let lecturers = store
        .list_users(UserFilter {
            active: None,
            role: Some(Role::Lecturer),
        })
        .await
        .unwrap();
    assert_eq!(lecturers.len(), 2);

    let active_lecturers = store
        .list_users(UserFilter {
            active: Some(true),
            role: Some(Role::Lecturer),
        })
        .await
        .unwrap();
    assert_eq!(active_lecturers.len(), 1);
    assert_eq!(active_lecturers[0].username, "gv02");
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", temp_dir.path().join("faculty.db").display());

    {
        let store = SqliteUserStore::new(&url).await.unwrap();
        store
            .create_user(new_user("pk01", "pk01@faculty.test", Role::DeputyHead))
            .await
            .unwrap();
        store.pool().close().await;
    }

    let store = SqliteUserStore::new(&url).await.unwrap();
    let user = store.find_by_username("pk01").await.unwrap().unwrap();
    assert_eq!(user.role, Role::DeputyHead);
}

#[tokio::test]
async fn test_login_flow_over_sqlite() {
    let (store, _dir) = create_test_store().await;
    let store = std::sync::Arc::new(store);
    seed_user(store.as_ref(), "gvu01", "GiaoVu#2024", Role::AcademicAffairs).await;

    let state = faculty_core::ApiState::new(store.clone(), &test_config()).unwrap();
    let response = state.auth_service.login("gvu01", "GiaoVu#2024").await.unwrap();
    assert_eq!(response.role_name, "GIAO_VU");

    let stored = store.find_by_username("gvu01").await.unwrap().unwrap();
    assert!(stored.last_login.is_some());
}

#[tokio::test]
async fn test_update_user_partial_fields() {
    let (store, _dir) = create_test_store().await;
    let user = store
        .create_user(new_user("tk01", "tk01@faculty.test", Role::DepartmentHead))
        .await
        .unwrap();
    store
        .create_user(new_user("gv01", "gv01@faculty.test", Role::Lecturer))
        .await
        .unwrap();

    let updated = store
        .update_user(
            user.id,
            UpdateUserRequest {
                full_name: Some("Le Thi E".to_string()),
                role_name: Some(Role::Lecturer),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.full_name, "Le Thi E");
    assert_eq!(updated.role, Role::Lecturer);
    assert_eq!(updated.email, "tk01@faculty.test");
    assert_eq!(updated.phone.as_deref(), Some("0901234567"));
    assert!(updated.active);

    let err = store
        .update_user(
            user.id,
            UpdateUserRequest {
                email: Some("gv01@faculty.test".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserAlreadyExists(email) if email == "gv01@faculty.test"));

    let err = store
        .update_user(user.id + 100, UpdateUserRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserNotFound(_)));
}

#[tokio::test]
async fn test_delete_user_is_soft() {
    let (store, _dir) = create_test_store().await;
    let user = store
        .create_user(new_user("sv02", "sv02@faculty.test", Role::Student))
        .await
        .unwrap();

    store.delete_user(user.id).await.unwrap();

    let kept = store.get_user(user.id).await.unwrap().unwrap();
    assert!(!kept.active);
    assert_eq!(store.list_users(UserFilter::default()).await.unwrap().len(), 1);

    let err = store.delete_user(user.id + 100).await.unwrap_err();
    assert!(matches!(err, Error::UserNotFound(_)));
}

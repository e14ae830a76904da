//! In-memory user store

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{CredentialStore, UserStore};
use crate::types::{Identity, NewIdentity, UpdateUserRequest, UserFilter};
use crate::{Error, Result};

/// Map-backed store, keyed by username
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<DashMap<String, Identity>>,
    /// email -> owning username, the uniqueness index for emails
    emails: Arc<DashMap<String, String>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `email` for `username`. Returns `true` if the claim is new.
    fn reserve_email(&self, email: &str, username: &str) -> Result<bool> {
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(owner) if owner.get() == username => Ok(false),
            Entry::Occupied(_) => Err(Error::UserAlreadyExists(email.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(username.to_string());
                Ok(true)
            }
        }
    }

    fn find_by_id(&self, user_id: i64) -> Option<Identity> {
        self.users
            .iter()
            .find(|entry| entry.id == user_id)
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl CredentialStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }

    async fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<()> {
        let mut entry = self
            .users
            .iter_mut()
            .find(|entry| entry.id == user_id)
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;
        entry.last_login = Some(at);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewIdentity) -> Result<Identity> {
        let claimed = self.reserve_email(&user.email, &user.username)?;

        let created = match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let identity = Identity {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                    username: user.username.clone(),
                    password_hash: user.password_hash,
                    email: user.email.clone(),
                    phone: user.phone,
                    full_name: user.full_name,
                    avatar_url: None,
                    role: user.role,
                    role_description: Some(user.role.default_description().to_string()),
                    active: user.active,
                    last_login: None,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(identity.clone());
                Some(identity)
            }
        };

        match created {
            Some(identity) => Ok(identity),
            None => {
                if claimed {
                    self.emails.remove(&user.email);
                }
                Err(Error::UserAlreadyExists(user.username))
            }
        }
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<Identity>> {
        Ok(self.find_by_id(user_id))
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<Identity>> {
        let mut users: Vec<Identity> = self
            .users
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by_key(|user| user.id);
        Ok(users)
    }

    async fn set_active(&self, user_id: i64, active: bool) -> Result<Identity> {
        let mut entry = self
            .users
            .iter_mut()
            .find(|entry| entry.id == user_id)
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;
        entry.active = active;
        entry.updated_at = Utc::now();
        Ok(entry.value().clone())
    }

    async fn update_user(&self, user_id: i64, update: UpdateUserRequest) -> Result<Identity> {
        let current = self
            .find_by_id(user_id)
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        let new_email = update
            .email
            .as_deref()
            .filter(|email| *email != current.email);
        if let Some(email) = new_email {
            self.reserve_email(email, &current.username)?;
        }

        let updated = {
            let mut entry = self
                .users
                .get_mut(&current.username)
                .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;
            update.apply_to(&mut entry);
            entry.updated_at = Utc::now();
            entry.value().clone()
        };

        if new_email.is_some() {
            self.emails.remove(&current.email);
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn new_user(username: &str, role: Role) -> NewIdentity {
        NewIdentity {
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            email: format!("{}@faculty.test", username),
            phone: None,
            full_name: username.to_uppercase(),
            role,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = MemoryUserStore::new();
        let created = store.create_user(new_user("alice", Role::Lecturer)).await.unwrap();

        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, Role::Lecturer);
        assert!(store.find_by_username("bob").await.unwrap().is_none());
        assert_eq!(store.get_user(created.id).await.unwrap().unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("alice", Role::Lecturer)).await.unwrap();

        let mut duplicate = new_user("alice", Role::Student);
        duplicate.email = "other@faculty.test".to_string();
        match store.create_user(duplicate).await {
            Err(Error::UserAlreadyExists(name)) => assert_eq!(name, "alice"),
            other => panic!("Expected UserAlreadyExists, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("alice", Role::Lecturer)).await.unwrap();

        let mut same_email = new_user("bob", Role::Student);
        same_email.email = "alice@faculty.test".to_string();
        assert!(matches!(store.create_user(same_email).await, Err(Error::UserAlreadyExists(_))));

        // a failed username claim does not leave its email reserved
        let mut duplicate = new_user("alice", Role::Student);
        duplicate.email = "fresh@faculty.test".to_string();
        assert!(store.create_user(duplicate).await.is_err());
        let mut reuse = new_user("dave", Role::Student);
        reuse.email = "fresh@faculty.test".to_string();
        assert!(store.create_user(reuse).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_share_one_email() {
        let store = MemoryUserStore::new();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let mut user = new_user(&format!("user{}", i), Role::Student);
                    user.email = "shared@faculty.test".to_string();
                    store.create_user(user).await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.list_users(UserFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_user_moves_email() {
        let store = MemoryUserStore::new();
        let alice = store.create_user(new_user("alice", Role::Lecturer)).await.unwrap();
        store.create_user(new_user("bob", Role::Student)).await.unwrap();

        let taken = UpdateUserRequest {
            email: Some("bob@faculty.test".to_string()),
            ..Default::default()
        };
        assert!(matches!(store.update_user(alice.id, taken).await, Err(Error::UserAlreadyExists(_))));

        let update = UpdateUserRequest {
            email: Some("alice.new@faculty.test".to_string()),
            role_name: Some(Role::SubjectHead),
            ..Default::default()
        };
        let updated = store.update_user(alice.id, update).await.unwrap();
        assert_eq!(updated.email, "alice.new@faculty.test");
        assert_eq!(updated.role, Role::SubjectHead);

        // old address is free again
        let mut carol = new_user("carol", Role::Student);
        carol.email = "alice@faculty.test".to_string();
        assert!(store.create_user(carol).await.is_ok());

        assert!(matches!(
            store.update_user(999, UpdateUserRequest::default()).await,
            Err(Error::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_soft() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("erin", Role::Student)).await.unwrap();

        store.delete_user(user.id).await.unwrap();
        let kept = store.get_user(user.id).await.unwrap().unwrap();
        assert!(!kept.active);
        assert!(matches!(store.delete_user(999).await, Err(Error::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_record_login_and_toggle() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("carol", Role::Student)).await.unwrap();

        let at = Utc::now();
        store.record_login(user.id, at).await.unwrap();
        assert_eq!(store.find_by_username("carol").await.unwrap().unwrap().last_login, Some(at));

        let updated = store.set_active(user.id, false).await.unwrap();
        assert!(!updated.active);
        assert!(matches!(store.set_active(999, true).await, Err(Error::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("a", Role::Admin)).await.unwrap();
        let b = store.create_user(new_user("b", Role::Student)).await.unwrap();
        store.create_user(new_user("c", Role::Student)).await.unwrap();
        store.set_active(b.id, false).await.unwrap();

        let all = store.list_users(UserFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c"]);

        let students = store
            .list_users(UserFilter { role: Some(Role::Student), active: Some(true) })
            .await
            .unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].username, "c");
    }
}

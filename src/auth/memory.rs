use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User};
use crate::error::{AppError, AppResult};

/// In-process `UserStore` with the same uniqueness rules as the Postgres indexes.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<User>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `change` to the first matching record while holding the lock.
    fn update_where(
        &self,
        matches: impl Fn(&User) -> bool,
        change: impl FnOnce(&mut User),
    ) -> Option<User> {
        let mut users = self.lock();
        let slot = users.iter_mut().find(|u| matches(u))?;
        change(slot);
        slot.updated_at = OffsetDateTime::now_utc();
        Some(slot.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new: NewUser) -> AppResult<User> {
        let mut users = self.lock();
        let active = users.iter().filter(|u| !u.is_deleted);
        for existing in active {
            if existing.email == new.email {
                return Err(AppError::Conflict("email"));
            }
            if existing.phone_number == new.phone_number {
                return Err(AppError::Conflict("phoneNumber"));
            }
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            phone_number: new.phone_number,
            role: new.role,
            password_hash: new.password_hash,
            one_time_code: Some(new.one_time_code),
            is_email_verified: false,
            is_reset_password: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.lock().iter().find(|u| u.id == id).cloned())
    }

    async fn find_active_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .lock()
            .iter()
            .find(|u| !u.is_deleted && u.email == email)
            .cloned())
    }

    async fn set_code(&self, email: &str, code: i32) -> AppResult<Option<User>> {
        Ok(self.update_where(
            |u| !u.is_deleted && u.email == email,
            |u| u.one_time_code = Some(code),
        ))
    }

    async fn consume_verification_code(
        &self,
        email: &str,
        code: i32,
    ) -> AppResult<Option<User>> {
        Ok(self.update_where(
            |u| !u.is_deleted && u.email == email && u.one_time_code == Some(code),
            |u| {
                u.is_email_verified = true;
                u.one_time_code = None;
            },
        ))
    }

    async fn consume_reset_code(
        &self,
        email: &str,
        code: i32,
        password_hash: &str,
    ) -> AppResult<Option<User>> {
        Ok(self.update_where(
            |u| !u.is_deleted && u.email == email && u.one_time_code == Some(code),
            |u| {
                u.password_hash = password_hash.to_string();
                u.is_reset_password = true;
                u.one_time_code = None;
            },
        ))
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.update_where(|u| u.id == id, |u| u.is_deleted = true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::UserRole;

    fn new_user(email: &str, phone: &str) -> NewUser {
        NewUser {
            name: "Ann".into(),
            email: email.into(),
            phone_number: phone.into(),
            role: UserRole::User,
            password_hash: "hash".into(),
            one_time_code: 123456,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email_and_phone() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@x.com", "1111111111")).await.unwrap();

        let err = store.insert(new_user("a@x.com", "2222222222")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict("email")));

        let err = store.insert(new_user("b@x.com", "1111111111")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict("phoneNumber")));
    }

    #[tokio::test]
    async fn deleted_users_release_their_email() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a@x.com", "1111111111")).await.unwrap();
        store.soft_delete(user.id).await.unwrap();

        assert!(store.find_active_by_email("a@x.com").await.unwrap().is_none());
        assert!(store.find_by_id(user.id).await.unwrap().is_some());
        assert!(store.insert(new_user("a@x.com", "1111111111")).await.is_ok());
    }

    #[tokio::test]
    async fn codes_are_consumed_only_with_matching_email() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@x.com", "1111111111")).await.unwrap();
        store.insert(new_user("b@x.com", "2222222222")).await.unwrap();

        assert!(store
            .consume_reset_code("a@x.com", 654321, "new")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .consume_reset_code("c@x.com", 123456, "new")
            .await
            .unwrap()
            .is_none());

        let user = store
            .consume_reset_code("a@x.com", 123456, "new")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.password_hash, "new");
        assert_eq!(user.one_time_code, None);
        assert!(store
            .consume_reset_code("a@x.com", 123456, "again")
            .await
            .unwrap()
            .is_none());

        let other = store.find_active_by_email("b@x.com").await.unwrap().unwrap();
        assert_eq!(other.password_hash, "hash");
        assert_eq!(other.one_time_code, Some(123456));
    }

    #[tokio::test]
    async fn soft_delete_touches_only_the_flag() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a@x.com", "1111111111")).await.unwrap();
        store.consume_verification_code("a@x.com", 123456).await.unwrap();

        let deleted = store.soft_delete(user.id).await.unwrap().unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.is_email_verified);
        assert!(store.set_code("a@x.com", 222222).await.unwrap().is_none());
        assert!(store.soft_delete(Uuid::new_v4()).await.unwrap().is_none());
    }
}

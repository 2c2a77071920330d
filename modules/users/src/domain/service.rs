use std::sync::Arc;

use crate::contract::model::{NewUser, User, UserPatch};
use crate::domain::error::DomainError;
use crate::domain::repo::{UniqueViolation, UsersRepository};
use tracing::{debug, info, instrument, warn};

/// Domain service with business rules for user management.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn UsersRepository>,
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(repo: Arc<dyn UsersRepository>) -> Self {
        Self { repo }
    }

    /// Ensure storage is ready. Called once before serving.
    #[instrument(name = "users.service.initialize", skip(self))]
    pub async fn initialize(&self) -> Result<(), DomainError> {
        self.repo
            .initialize()
            .await
            .map_err(|e| DomainError::database(format!("{e:#}")))?;
        info!("Users storage initialized");
        Ok(())
    }

    #[instrument(name = "users.service.list_users", skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        debug!("Listing all users");
        let users = self.repo.list_all().await.map_err(database)?;
        debug!("Successfully listed {} users", users.len());
        Ok(users)
    }

    #[instrument(name = "users.service.get_user", skip(self), fields(user_id = id))]
    pub async fn get_user(&self, id: i64) -> Result<User, DomainError> {
        debug!("Getting user by id");
        let user = self
            .repo
            .find_by_id(id)
            .await
            .map_err(database)?
            .ok_or_else(|| DomainError::user_not_found(id))?;
        debug!("Successfully retrieved user");
        Ok(user)
    }

    #[instrument(
        name = "users.service.create_user",
        skip_all,
        fields(username = %new_user.username)
    )]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");

        if new_user.username.is_empty() || new_user.email.is_empty() {
            return Err(DomainError::missing_fields());
        }

        // Check uniqueness
        if self
            .repo
            .find_by_username_or_email(&new_user.username, &new_user.email)
            .await
            .map_err(database)?
            .is_some()
        {
            return Err(DomainError::already_exists());
        }

        let user = self.repo.insert(new_user).await.map_err(write_error)?;

        info!("Successfully created user with id={}", user.id);
        Ok(user)
    }

    #[instrument(name = "users.service.update_user", skip(self, patch), fields(user_id = id))]
    pub async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User, DomainError> {
        info!("Updating user");

        let current = self.get_user(id).await?;
        self.update_loaded(current, patch).await
    }

    /// Apply a patch to a user that was already loaded by the caller.
    #[instrument(name = "users.service.update_loaded", skip_all, fields(user_id = current.id))]
    pub async fn update_loaded(&self, current: User, patch: UserPatch) -> Result<User, DomainError> {
        let username = patch.username.unwrap_or_else(|| current.username.clone());
        let email = patch.email.unwrap_or_else(|| current.email.clone());

        // Uniqueness for changed fields only
        if username != current.username
            && self
                .repo
                .find_by_username(&username)
                .await
                .map_err(database)?
                .is_some()
        {
            return Err(DomainError::already_exists());
        }
        if email != current.email
            && self
                .repo
                .find_by_email(&email)
                .await
                .map_err(database)?
                .is_some()
        {
            return Err(DomainError::already_exists());
        }

        let updated = self
            .repo
            .update(&current, username, email)
            .await
            .map_err(write_error)?;

        info!("Successfully updated user");
        Ok(updated)
    }

    #[instrument(name = "users.service.delete_user", skip(self), fields(user_id = id))]
    pub async fn delete_user(&self, id: i64) -> Result<(), DomainError> {
        info!("Deleting user");

        let user = self.get_user(id).await?;
        self.repo.delete(&user).await.map_err(database)?;

        info!("Successfully deleted user");
        Ok(())
    }

    /// Delete every user. Fails with `NoUsers` when the table is already empty.
    #[instrument(name = "users.service.delete_all_users", skip(self))]
    pub async fn delete_all_users(&self) -> Result<u64, DomainError> {
        info!("Deleting all users");

        let users = self.repo.list_all().await.map_err(database)?;
        if users.is_empty() {
            return Err(DomainError::no_users());
        }

        let deleted = self.repo.delete_all(&users).await.map_err(database)?;

        info!("Successfully deleted {} users", deleted);
        Ok(deleted)
    }
}

fn database(e: anyhow::Error) -> DomainError {
    DomainError::database(format!("{e:#}"))
}

/// A unique-constraint hit means a concurrent writer won the race
/// between the uniqueness check and the write.
fn write_error(e: anyhow::Error) -> DomainError {
    if e.is::<UniqueViolation>() {
        warn!("Unique constraint rejected write after uniqueness check passed");
        return DomainError::already_exists();
    }
    database(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory repository keeping rows in insertion order.
    #[derive(Default)]
    struct MemRepo {
        rows: Mutex<Vec<User>>,
        reject_insert_as_duplicate: bool,
    }

    impl MemRepo {
        fn with_users(users: &[(&str, &str)]) -> Self {
            let rows = users
                .iter()
                .enumerate()
                .map(|(i, (username, email))| User {
                    id: i as i64 + 1,
                    username: username.to_string(),
                    email: email.to_string(),
                })
                .collect();
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        fn snapshot(&self) -> Vec<User> {
            self.rows.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UsersRepository for MemRepo {
        async fn initialize(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn list_all(&self) -> anyhow::Result<Vec<User>> {
            Ok(self.snapshot())
        }

        async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
            Ok(self.snapshot().into_iter().find(|u| u.id == id))
        }

        async fn find_by_username_or_email(
            &self,
            username: &str,
            email: &str,
        ) -> anyhow::Result<Option<User>> {
            Ok(self
                .snapshot()
                .into_iter()
                .find(|u| u.username == username || u.email == email))
        }

        async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
            Ok(self.snapshot().into_iter().find(|u| u.username == username))
        }

        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            Ok(self.snapshot().into_iter().find(|u| u.email == email))
        }

        async fn insert(&self, new_user: NewUser) -> anyhow::Result<User> {
            if self.reject_insert_as_duplicate {
                return Err(anyhow::Error::new(UniqueViolation).context("insert failed"));
            }
            let mut rows = self.rows.lock().unwrap();
            let id = rows.iter().map(|u| u.id).max().unwrap_or(0) + 1;
            let user = User {
                id,
                username: new_user.username,
                email: new_user.email,
            };
            rows.push(user.clone());
            Ok(user)
        }

        async fn update(
            &self,
            user: &User,
            username: String,
            email: String,
        ) -> anyhow::Result<User> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.iter_mut().find(|u| u.id == user.id).unwrap();
            row.username = username;
            row.email = email;
            Ok(row.clone())
        }

        async fn delete(&self, user: &User) -> anyhow::Result<()> {
            self.rows.lock().unwrap().retain(|u| u.id != user.id);
            Ok(())
        }

        async fn delete_all(&self, users: &[User]) -> anyhow::Result<u64> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|u| !users.iter().any(|d| d.id == u.id));
            Ok((before - rows.len()) as u64)
        }
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn create_rejects_empty_fields() {
        let svc = Service::new(Arc::new(MemRepo::default()));

        let err = svc.create_user(new_user("", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::MissingFields));

        let err = svc.create_user(new_user("alice", "")).await.unwrap_err();
        assert!(matches!(err, DomainError::MissingFields));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email_with_new_username() {
        let svc = Service::new(Arc::new(MemRepo::with_users(&[("alice", "a@x.com")])));

        let err = svc.create_user(new_user("bob", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists));
    }

    #[tokio::test]
    async fn storage_unique_violation_maps_to_conflict() {
        let repo = MemRepo {
            reject_insert_as_duplicate: true,
            ..Default::default()
        };
        let svc = Service::new(Arc::new(repo));

        let err = svc.create_user(new_user("alice", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists));
    }

    #[tokio::test]
    async fn update_keeps_omitted_fields() {
        let repo = Arc::new(MemRepo::with_users(&[("alice", "a@x.com")]));
        let svc = Service::new(repo.clone());

        let patch = UserPatch {
            username: None,
            email: Some("new@x.com".to_string()),
        };
        let updated = svc.update_user(1, patch).await.unwrap();
        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "new@x.com");
        assert_eq!(repo.snapshot()[0], updated);
    }

    #[tokio::test]
    async fn update_to_own_values_is_not_a_conflict() {
        let svc = Service::new(Arc::new(MemRepo::with_users(&[("alice", "a@x.com")])));

        let patch = UserPatch {
            username: Some("alice".to_string()),
            email: Some("a@x.com".to_string()),
        };
        let updated = svc.update_user(1, patch).await.unwrap();
        assert_eq!(updated.username, "alice");
    }

    #[tokio::test]
    async fn update_conflicting_email_leaves_rows_untouched() {
        let repo = Arc::new(MemRepo::with_users(&[
            ("alice", "a@x.com"),
            ("bob", "b@x.com"),
        ]));
        let svc = Service::new(repo.clone());
        let before = repo.snapshot();

        let patch = UserPatch {
            username: None,
            email: Some("a@x.com".to_string()),
        };
        let err = svc.update_user(2, patch).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists));
        assert_eq!(repo.snapshot(), before);
    }

    #[tokio::test]
    async fn update_unknown_user_is_not_found() {
        let svc = Service::new(Arc::new(MemRepo::default()));

        let err = svc.update_user(7, UserPatch::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::UserNotFound { id: 7 }));
    }

    #[tokio::test]
    async fn delete_all_on_empty_table_fails() {
        let svc = Service::new(Arc::new(MemRepo::default()));

        let err = svc.delete_all_users().await.unwrap_err();
        assert!(matches!(err, DomainError::NoUsers));
    }

    #[tokio::test]
    async fn delete_all_reports_removed_rows() {
        let repo = Arc::new(MemRepo::with_users(&[
            ("alice", "a@x.com"),
            ("bob", "b@x.com"),
        ]));
        let svc = Service::new(repo.clone());

        assert_eq!(svc.delete_all_users().await.unwrap(), 2);
        assert!(repo.snapshot().is_empty());
    }
}

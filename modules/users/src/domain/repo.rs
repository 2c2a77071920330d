use crate::contract::model::{NewUser, User};
use async_trait::async_trait;
use thiserror::Error;

/// Returned (inside `anyhow::Error`) by writes that storage rejected
/// because of a unique column.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unique constraint violated")]
pub struct UniqueViolation;

/// Port for the domain layer: persistence operations the domain needs.
/// Object-safe and async-friendly via `async_trait`.
///
/// Every mutating call is committed by the time it returns.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Ensure the schema exists. Safe to call more than once.
    async fn initialize(&self) -> anyhow::Result<()>;
    /// All rows in natural storage order.
    async fn list_all(&self) -> anyhow::Result<Vec<User>>;
    /// Load a user by id.
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    /// Any row matching either the username or the email.
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> anyhow::Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Insert a new row; storage assigns the id.
    async fn insert(&self, new_user: NewUser) -> anyhow::Result<User>;
    /// Replace both mutable fields of an existing row.
    async fn update(&self, user: &User, username: String, email: String) -> anyhow::Result<User>;
    async fn delete(&self, user: &User) -> anyhow::Result<()>;
    /// Delete all given rows at once. Returns the number of rows removed.
    async fn delete_all(&self, users: &[User]) -> anyhow::Result<u64>;
}

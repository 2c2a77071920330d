//! SeaORM-backed repository implementation for the domain port.
//!
//! Single-statement calls run on the pooled `DatabaseConnection` in
//! autocommit mode, so each write is durable once the call returns.
//! `delete_all` spans several statements and runs them in one transaction.

use anyhow::Context;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

use crate::contract::model::{NewUser, User};
use crate::domain::repo::{UniqueViolation, UsersRepository};
use crate::infra::storage::entity::{ActiveModel as UserAM, Column, Entity as UserEntity};
use crate::infra::storage::migrations::Migrator;

/// Ids per `DELETE ... WHERE id IN (...)`, kept well under SQLite's
/// bound-parameter limit.
const DELETE_CHUNK: usize = 500;

/// SeaORM repository impl.
/// Holds a connection pool handle; cloning it is cheap.
#[derive(Clone)]
pub struct SeaOrmUsersRepository {
    conn: DatabaseConnection,
}

impl SeaOrmUsersRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn find_one(&self, cond: Condition, what: &'static str) -> anyhow::Result<Option<User>> {
        let found = UserEntity::find()
            .filter(cond)
            .one(&self.conn)
            .await
            .context(what)?;
        Ok(found.map(Into::into))
    }
}

#[async_trait::async_trait]
impl UsersRepository for SeaOrmUsersRepository {
    async fn initialize(&self) -> anyhow::Result<()> {
        Migrator::up(&self.conn, None)
            .await
            .context("schema initialization failed")
    }

    async fn list_all(&self) -> anyhow::Result<Vec<User>> {
        let rows = UserEntity::find()
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .context("list_all failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let found = UserEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_by_id failed")?;
        Ok(found.map(Into::into))
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> anyhow::Result<Option<User>> {
        let cond = Condition::any()
            .add(Column::Username.eq(username))
            .add(Column::Email.eq(email));
        self.find_one(cond, "find_by_username_or_email failed").await
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let cond = Condition::all().add(Column::Username.eq(username));
        self.find_one(cond, "find_by_username failed").await
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let cond = Condition::all().add(Column::Email.eq(email));
        self.find_one(cond, "find_by_email failed").await
    }

    async fn insert(&self, new_user: NewUser) -> anyhow::Result<User> {
        let m = UserAM {
            username: Set(new_user.username),
            email: Set(new_user.email),
            ..Default::default()
        };
        let created = m
            .insert(&self.conn)
            .await
            .map_err(|e| write_failure(e, "insert failed"))?;
        Ok(created.into())
    }

    async fn update(&self, user: &User, username: String, email: String) -> anyhow::Result<User> {
        let m = UserAM {
            id: Set(user.id),
            username: Set(username),
            email: Set(email),
        };
        let updated = m
            .update(&self.conn)
            .await
            .map_err(|e| write_failure(e, "update failed"))?;
        Ok(updated.into())
    }

    async fn delete(&self, user: &User) -> anyhow::Result<()> {
        UserEntity::delete_by_id(user.id)
            .exec(&self.conn)
            .await
            .context("delete failed")?;
        Ok(())
    }

    async fn delete_all(&self, users: &[User]) -> anyhow::Result<u64> {
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        let txn = self.conn.begin().await.context("delete_all failed")?;
        let mut removed = 0;
        for chunk in ids.chunks(DELETE_CHUNK) {
            let res = UserEntity::delete_many()
                .filter(Column::Id.is_in(chunk.iter().copied()))
                .exec(&txn)
                .await
                .context("delete_all failed")?;
            removed += res.rows_affected;
        }
        txn.commit().await.context("delete_all commit failed")?;
        Ok(removed)
    }
}

fn write_failure(err: DbErr, what: &'static str) -> anyhow::Error {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return anyhow::Error::new(UniqueViolation).context(format!("{what}: {err}"));
    }
    anyhow::Error::new(err).context(what)
}

//! PostgreSQL-backed `UserRepository`.
//!
//! Emails are unique through `users_email_key`; a concurrent signup that
//! loses the race surfaces as [`UserPersistenceError::DuplicateEmail`].

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{DisplayName, EmailAddress, UserAccount, UserAccountDraft, UserId};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation_constraint,
};
use super::diesel_helpers::{count_for_db, count_from_db};
use super::models::{NewUserRow, UserRow, UserUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the user repository port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    map_basic_pool_error(error, UserPersistenceError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> UserPersistenceError {
    map_basic_diesel_error(
        error,
        UserPersistenceError::query,
        UserPersistenceError::connection,
    )
}

fn map_insert_error(error: diesel::result::Error, email: &EmailAddress) -> UserPersistenceError {
    if unique_violation_constraint(&error).is_some() {
        return UserPersistenceError::duplicate_email(email.to_string());
    }
    map_diesel_error(error)
}

fn row_to_account(row: UserRow) -> Result<UserAccount, UserPersistenceError> {
    let email = EmailAddress::new(&row.email)
        .map_err(|err| UserPersistenceError::query(format!("stored email is invalid: {err}")))?;
    let display_name = row
        .display_name
        .as_deref()
        .map(DisplayName::new)
        .transpose()
        .map_err(|err| {
            UserPersistenceError::query(format!("stored display name is invalid: {err}"))
        })?;

    Ok(UserAccount::from(UserAccountDraft {
        id: UserId::from_uuid(row.id),
        email,
        password_hash: row.password_hash,
        display_name,
        email_verified: row.email_verified,
        login_attempts: count_from_db(row.login_attempts),
        lockout_until: row.lockout_until,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(&self, account: &UserAccount) -> Result<(), UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewUserRow {
            id: *account.id().as_uuid(),
            email: account.email().as_ref(),
            password_hash: account.password_hash(),
            display_name: account.display_name().map(AsRef::as_ref),
            email_verified: account.is_email_verified(),
            login_attempts: count_for_db(account.login_attempts()),
            lockout_until: account.lockout_until(),
            created_at: account.created_at(),
            updated_at: account.updated_at(),
        };

        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| map_insert_error(err, account.email()))?;
        Ok(())
    }

    async fn update(&self, account: &UserAccount) -> Result<(), UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = UserUpdate {
            password_hash: account.password_hash(),
            display_name: account.display_name().map(AsRef::as_ref),
            email_verified: account.is_email_verified(),
            login_attempts: count_for_db(account.login_attempts()),
            lockout_until: account.lockout_until(),
            updated_at: account.updated_at(),
        };

        let updated = diesel::update(users::table.filter(users::id.eq(account.id().as_uuid())))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(UserPersistenceError::query(format!(
                "user {} does not exist",
                account.id()
            )));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_account)
            .transpose()
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserAccount>, UserPersistenceError> {
        let email: &str = email.as_ref();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_account)
            .transpose()
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<Uuid> = users::table
            .select(users::id)
            .order(users::created_at.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }
}

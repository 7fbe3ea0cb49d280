//! PostgreSQL-backed `OtpRepository`.
//!
//! Each `(user_id, purpose)` pair owns one row; `save` upserts the whole
//! record so clearing a passcode writes NULLs rather than deleting the row
//! and losing its cooldown. `redeem` locks the row with `SELECT ... FOR
//! UPDATE`, so concurrent guesses for one user and purpose serialise and each
//! miss is counted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{OtpPersistenceError, OtpRepository};
use crate::domain::{
    OtpAcceptance, OtpCode, OtpPurpose, OtpRecord, OtpRecordDraft, OtpRedemption, OtpVerdict,
    UserId,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::diesel_helpers::{count_for_db, count_from_db};
use super::models::OtpRow;
use super::pool::{DbPool, PoolError};
use super::schema::{otp_codes, users};

/// Diesel-backed implementation of the passcode repository port.
#[derive(Clone)]
pub struct DieselOtpRepository {
    pool: DbPool,
}

impl DieselOtpRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> OtpPersistenceError {
    map_basic_pool_error(error, OtpPersistenceError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> OtpPersistenceError {
    map_basic_diesel_error(
        error,
        OtpPersistenceError::query,
        OtpPersistenceError::connection,
    )
}

/// Failures inside a redemption transaction.
#[derive(Debug, thiserror::Error)]
enum RedeemTxError {
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
    #[error(transparent)]
    Record(OtpPersistenceError),
    #[error("account {0} no longer exists")]
    MissingAccount(UserId),
}

fn map_tx_error(error: RedeemTxError) -> OtpPersistenceError {
    match error {
        RedeemTxError::Diesel(err) => map_diesel_error(err),
        RedeemTxError::Record(err) => err,
        other @ RedeemTxError::MissingAccount(_) => OtpPersistenceError::query(other.to_string()),
    }
}

fn record_to_row(record: &OtpRecord) -> OtpRow {
    OtpRow {
        user_id: *record.user_id().as_uuid(),
        purpose: record.purpose().as_str().to_owned(),
        code: record.code().map(|code| code.as_str().to_owned()),
        expires_at: record.expires_at(),
        attempts: count_for_db(record.attempts()),
        last_requested_at: record.last_requested_at(),
        cooldown_until: record.cooldown_until(),
    }
}

fn row_to_record(row: OtpRow) -> Result<OtpRecord, OtpPersistenceError> {
    let purpose = OtpPurpose::from_storage(&row.purpose).ok_or_else(|| {
        OtpPersistenceError::query(format!("unknown passcode purpose: {}", row.purpose))
    })?;
    let code = row
        .code
        .as_deref()
        .map(OtpCode::parse)
        .transpose()
        .map_err(|err| OtpPersistenceError::query(format!("stored passcode is invalid: {err}")))?;

    Ok(OtpRecord::from(OtpRecordDraft {
        user_id: UserId::from_uuid(row.user_id),
        purpose,
        code,
        expires_at: row.expires_at,
        attempts: count_from_db(row.attempts),
        last_requested_at: row.last_requested_at,
        cooldown_until: row.cooldown_until,
    }))
}

#[async_trait]
impl OtpRepository for DieselOtpRepository {
    async fn find(
        &self,
        user_id: &UserId,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpRecord>, OtpPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        otp_codes::table
            .filter(otp_codes::user_id.eq(user_id.as_uuid()))
            .filter(otp_codes::purpose.eq(purpose.as_str()))
            .select(OtpRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_record)
            .transpose()
    }

    async fn save(&self, record: &OtpRecord) -> Result<(), OtpPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        upsert(&mut conn, &record_to_row(record))
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn redeem(
        &self,
        redemption: &OtpRedemption,
    ) -> Result<OtpVerdict, OtpPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let redemption = redemption.clone();

        conn.transaction(|conn| {
            async move {
                let stored = otp_codes::table
                    .filter(otp_codes::user_id.eq(redemption.user_id.as_uuid()))
                    .filter(otp_codes::purpose.eq(redemption.purpose.as_str()))
                    .select(OtpRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .map(row_to_record)
                    .transpose()
                    .map_err(RedeemTxError::Record)?;

                let (changed, verdict) = redemption.apply(stored);
                if let Some(record) = changed {
                    upsert(conn, &record_to_row(&record)).await?;
                }
                if verdict.is_ok() {
                    accept(conn, &redemption.user_id, &redemption.acceptance, redemption.now)
                        .await?;
                }
                Ok(verdict)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_tx_error)
    }
}

async fn upsert(
    conn: &mut AsyncPgConnection,
    row: &OtpRow,
) -> Result<usize, diesel::result::Error> {
    diesel::insert_into(otp_codes::table)
        .values(row)
        .on_conflict((otp_codes::user_id, otp_codes::purpose))
        .do_update()
        .set((
            otp_codes::code.eq(excluded(otp_codes::code)),
            otp_codes::expires_at.eq(excluded(otp_codes::expires_at)),
            otp_codes::attempts.eq(excluded(otp_codes::attempts)),
            otp_codes::last_requested_at.eq(excluded(otp_codes::last_requested_at)),
            otp_codes::cooldown_until.eq(excluded(otp_codes::cooldown_until)),
        ))
        .execute(conn)
        .await
}

/// Apply what a matching code unlocks to the owning account.
async fn accept(
    conn: &mut AsyncPgConnection,
    user_id: &UserId,
    acceptance: &OtpAcceptance,
    now: DateTime<Utc>,
) -> Result<(), RedeemTxError> {
    let account = users::table.find(*user_id.as_uuid());
    let updated = match acceptance {
        OtpAcceptance::Keep => return Ok(()),
        OtpAcceptance::VerifyEmail => {
            diesel::update(account)
                .set((users::email_verified.eq(true), users::updated_at.eq(now)))
                .execute(conn)
                .await?
        }
        OtpAcceptance::ResetPassword { password_hash } => {
            diesel::update(account)
                .set((
                    users::password_hash.eq(password_hash.as_str()),
                    users::login_attempts.eq(0),
                    users::lockout_until.eq(None::<DateTime<Utc>>),
                    users::updated_at.eq(now),
                ))
                .execute(conn)
                .await?
        }
    };
    if updated == 0 {
        return Err(RedeemTxError::MissingAccount(*user_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rstest::rstest;

    use super::*;
    use crate::domain::OtpPolicy;

    #[rstest]
    fn issued_record_survives_the_row_mapping() {
        let now = Utc::now();
        let mut record = OtpRecord::empty(UserId::random(), OtpPurpose::PasswordReset);
        record.issue(
            OtpCode::parse("4821").expect("code"),
            &OtpPolicy::default(),
            now,
        );

        let restored = row_to_record(record_to_row(&record)).expect("round trip");

        assert_eq!(restored, record);
        assert_eq!(restored.expires_at(), Some(now + Duration::minutes(10)));
    }

    #[rstest]
    fn unknown_purpose_is_a_query_error() {
        let mut row = record_to_row(&OtpRecord::empty(
            UserId::random(),
            OtpPurpose::EmailVerification,
        ));
        row.purpose = "login".to_owned();

        let err = row_to_record(row).expect_err("unknown purpose");

        assert!(err.to_string().contains("unknown passcode purpose"));
    }

    #[rstest]
    fn malformed_stored_code_is_rejected() {
        let mut row = record_to_row(&OtpRecord::empty(
            UserId::random(),
            OtpPurpose::EmailVerification,
        ));
        row.code = Some("12ab".to_owned());

        assert!(matches!(
            row_to_record(row),
            Err(OtpPersistenceError::Query { .. })
        ));
    }
}

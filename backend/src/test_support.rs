//! In-memory port doubles for integration tests.
//!
//! Compiled for unit tests and behind the `test-support` feature. The
//! doubles honour the same contracts as the Diesel adapters (unique emails,
//! one like or flag per user, verified-only feed candidates) so service and
//! HTTP flows can be exercised end to end without PostgreSQL.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{
    AlertPersistenceError, AlertRepository, ImageStore, ImageStoreError,
    NotificationPersistenceError, NotificationRepository, OtpDelivery, OtpDeliveryError,
    OtpMailer, OtpPersistenceError, OtpRepository, UserPersistenceError, UserRepository,
};
use crate::domain::{
    Alert, AlertId, AlertRecord, DisplayName, EmailAddress, FeedEntry, FeedFilter, FlagOutcome, ImageUpload,
    LikeToggle, ModerationStatus, Notification, NotificationId, NotificationListKey,
    OtpAcceptance, OtpCode, OtpPurpose, OtpRecord, OtpRedemption, OtpVerdict, UserAccount,
    UserId,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex poisoned"),
    }
}

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0, "clock") += TimeDelta::seconds(seconds);
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0, "clock")
    }
}

/// User store keyed by id with a unique email constraint.
#[derive(Default)]
pub struct InMemoryUserRepository {
    accounts: Mutex<HashMap<UserId, UserAccount>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, account: &UserAccount) -> Result<(), UserPersistenceError> {
        let mut accounts = lock(&self.accounts, "users");
        if accounts
            .values()
            .any(|existing| existing.email() == account.email())
        {
            return Err(UserPersistenceError::duplicate_email(
                account.email().to_string(),
            ));
        }
        accounts.insert(account.id(), account.clone());
        Ok(())
    }

    async fn update(&self, account: &UserAccount) -> Result<(), UserPersistenceError> {
        let mut accounts = lock(&self.accounts, "users");
        match accounts.get_mut(&account.id()) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(UserPersistenceError::query("account does not exist")),
        }
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, UserPersistenceError> {
        Ok(lock(&self.accounts, "users").get(id).cloned())
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserAccount>, UserPersistenceError> {
        Ok(lock(&self.accounts, "users")
            .values()
            .find(|account| account.email() == email)
            .cloned())
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, UserPersistenceError> {
        Ok(lock(&self.accounts, "users").keys().copied().collect())
    }
}

/// Passcode store keyed by user and purpose.
///
/// Shares the user store so redemptions update the account under the same
/// locks as the passcode record.
pub struct InMemoryOtpRepository {
    records: Mutex<HashMap<(UserId, OtpPurpose), OtpRecord>>,
    users: Arc<InMemoryUserRepository>,
}

impl InMemoryOtpRepository {
    pub fn new(users: Arc<InMemoryUserRepository>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            users,
        }
    }
}

#[async_trait]
impl OtpRepository for InMemoryOtpRepository {
    async fn find(
        &self,
        user_id: &UserId,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpRecord>, OtpPersistenceError> {
        Ok(lock(&self.records, "otps").get(&(*user_id, purpose)).cloned())
    }

    async fn save(&self, record: &OtpRecord) -> Result<(), OtpPersistenceError> {
        lock(&self.records, "otps").insert((record.user_id(), record.purpose()), record.clone());
        Ok(())
    }

    async fn redeem(
        &self,
        redemption: &OtpRedemption,
    ) -> Result<OtpVerdict, OtpPersistenceError> {
        let key = (redemption.user_id, redemption.purpose);
        let mut records = lock(&self.records, "otps");
        let mut accounts = lock(&self.users.accounts, "users");

        let (changed, verdict) = redemption.apply(records.get(&key).cloned());
        if verdict.is_ok() && redemption.acceptance != OtpAcceptance::Keep {
            let account = accounts
                .get_mut(&redemption.user_id)
                .ok_or_else(|| OtpPersistenceError::query("account does not exist"))?;
            match &redemption.acceptance {
                OtpAcceptance::VerifyEmail => account.mark_email_verified(redemption.now),
                OtpAcceptance::ResetPassword { password_hash } => {
                    account.change_password_hash(password_hash.clone(), redemption.now);
                }
                OtpAcceptance::Keep => {}
            }
        }
        if let Some(record) = changed {
            records.insert(key, record);
        }
        Ok(verdict)
    }
}

#[derive(Default)]
struct AlertTables {
    alerts: HashMap<AlertId, Alert>,
    likes: HashSet<(AlertId, UserId)>,
    flags: HashSet<(AlertId, UserId)>,
    owner_names: HashMap<UserId, DisplayName>,
}

/// Alert store with membership sets mirroring the `alert_likes` and
/// `alert_flags` tables.
#[derive(Default)]
pub struct InMemoryAlertRepository {
    tables: Mutex<AlertTables>,
}

impl InMemoryAlertRepository {
    /// Register the display name joined onto the owner's alerts.
    pub fn set_owner_name(&self, owner: UserId, name: DisplayName) {
        lock(&self.tables, "alerts").owner_names.insert(owner, name);
    }

    /// Insert an alert with the given moderation status, bypassing posting.
    pub fn seed(&self, alert: Alert) {
        lock(&self.tables, "alerts").alerts.insert(alert.id(), alert);
    }
}

fn with_counters(
    alert: &Alert,
    status: ModerationStatus,
    like_count: u32,
    flag_count: u32,
    share_count: u32,
) -> Alert {
    Alert::from(AlertRecord {
        id: alert.id(),
        owner: alert.owner(),
        category: alert.category(),
        other_description: alert.other_description().map(str::to_owned),
        location: alert.location().to_owned(),
        point: alert.point(),
        description: alert.description().to_owned(),
        images: alert.images().to_vec(),
        status,
        like_count,
        flag_count,
        share_count,
        created_at: alert.created_at(),
    })
}

fn members(set: &HashSet<(AlertId, UserId)>, alert_id: &AlertId) -> u32 {
    let count = set.iter().filter(|(id, _)| id == alert_id).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

impl AlertTables {
    fn entry(&self, alert: &Alert) -> FeedEntry {
        FeedEntry {
            alert: alert.clone(),
            owner_name: self.owner_names.get(&alert.owner()).cloned(),
        }
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn insert(&self, alert: &Alert) -> Result<(), AlertPersistenceError> {
        lock(&self.tables, "alerts")
            .alerts
            .insert(alert.id(), alert.clone());
        Ok(())
    }

    async fn find_entry(&self, id: &AlertId) -> Result<Option<FeedEntry>, AlertPersistenceError> {
        let tables = lock(&self.tables, "alerts");
        Ok(tables.alerts.get(id).map(|alert| tables.entry(alert)))
    }

    async fn list_feed_candidates(
        &self,
        filter: &FeedFilter,
    ) -> Result<Vec<FeedEntry>, AlertPersistenceError> {
        let tables = lock(&self.tables, "alerts");
        let entries: Vec<FeedEntry> = tables
            .alerts
            .values()
            .filter(|alert| alert.status() == ModerationStatus::Verified && filter.matches(alert))
            .map(|alert| tables.entry(alert))
            .collect();
        Ok(match filter.seek {
            Some(seek) => seek.apply(entries),
            None => entries,
        })
    }

    async fn toggle_like(
        &self,
        alert_id: &AlertId,
        user_id: &UserId,
    ) -> Result<Option<LikeToggle>, AlertPersistenceError> {
        let mut tables = lock(&self.tables, "alerts");
        let Some(alert) = tables.alerts.get(alert_id).cloned() else {
            return Ok(None);
        };
        let key = (*alert_id, *user_id);
        let liked = if tables.likes.remove(&key) {
            false
        } else {
            tables.likes.insert(key);
            true
        };
        let like_count = members(&tables.likes, alert_id);
        let updated = with_counters(
            &alert,
            alert.status(),
            like_count,
            alert.flag_count(),
            alert.share_count(),
        );
        tables.alerts.insert(*alert_id, updated);
        Ok(Some(LikeToggle { liked, like_count }))
    }

    async fn add_flag(
        &self,
        alert_id: &AlertId,
        user_id: &UserId,
    ) -> Result<Option<FlagOutcome>, AlertPersistenceError> {
        let mut tables = lock(&self.tables, "alerts");
        let Some(alert) = tables.alerts.get(alert_id).cloned() else {
            return Ok(None);
        };
        let newly_flagged = tables.flags.insert((*alert_id, *user_id));
        let flag_count = members(&tables.flags, alert_id);
        let status = if newly_flagged {
            alert.status().after_flag(flag_count)
        } else {
            alert.status()
        };
        let updated = with_counters(
            &alert,
            status,
            alert.like_count(),
            flag_count,
            alert.share_count(),
        );
        tables.alerts.insert(*alert_id, updated);
        Ok(Some(FlagOutcome {
            newly_flagged,
            flag_count,
            status,
        }))
    }

    async fn increment_share(
        &self,
        alert_id: &AlertId,
    ) -> Result<Option<u32>, AlertPersistenceError> {
        let mut tables = lock(&self.tables, "alerts");
        let Some(alert) = tables.alerts.get(alert_id).cloned() else {
            return Ok(None);
        };
        let share_count = alert.share_count().saturating_add(1);
        let updated = with_counters(
            &alert,
            alert.status(),
            alert.like_count(),
            alert.flag_count(),
            share_count,
        );
        tables.alerts.insert(*alert_id, updated);
        Ok(Some(share_count))
    }
}

/// Notification store ordered by `(created_at DESC, id DESC)`.
#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: Mutex<HashMap<NotificationId, Notification>>,
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert(
        &self,
        notification: &Notification,
    ) -> Result<(), NotificationPersistenceError> {
        lock(&self.notifications, "notifications").insert(notification.id(), notification.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, NotificationPersistenceError> {
        Ok(lock(&self.notifications, "notifications").get(id).cloned())
    }

    async fn list_for_recipient(
        &self,
        recipient: &UserId,
        after: Option<NotificationListKey>,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationPersistenceError> {
        let guard = lock(&self.notifications, "notifications");
        let mut owned: Vec<Notification> = guard
            .values()
            .filter(|notification| notification.recipient() == *recipient)
            .filter(|notification| after.is_none_or(|key| key.precedes(&notification.list_key())))
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            let (a, b) = (a.list_key(), b.list_key());
            (b.created_at, b.id).cmp(&(a.created_at, a.id))
        });
        owned.truncate(limit);
        Ok(owned)
    }

    async fn update(
        &self,
        notification: &Notification,
    ) -> Result<(), NotificationPersistenceError> {
        lock(&self.notifications, "notifications").insert(notification.id(), notification.clone());
        Ok(())
    }

    async fn delete(&self, id: &NotificationId) -> Result<bool, NotificationPersistenceError> {
        Ok(lock(&self.notifications, "notifications")
            .remove(id)
            .is_some())
    }
}

/// Image store that keeps uploads in memory and hands out stable paths.
#[derive(Default)]
pub struct InMemoryImageStore {
    stored: Mutex<(usize, HashMap<String, ImageUpload>)>,
}

impl InMemoryImageStore {
    pub fn stored_count(&self) -> usize {
        lock(&self.stored, "images").1.len()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn store(&self, upload: &ImageUpload) -> Result<String, ImageStoreError> {
        let mut guard = lock(&self.stored, "images");
        let (issued, stored) = &mut *guard;
        *issued += 1;
        let path = format!("/uploads/image-{issued}.{}", upload.kind().extension());
        stored.insert(path.clone(), upload.clone());
        Ok(path)
    }

    async fn remove(&self, public_path: &str) -> Result<(), ImageStoreError> {
        match lock(&self.stored, "images").1.remove(public_path) {
            Some(_) => Ok(()),
            None => Err(ImageStoreError::remove(format!("unknown image {public_path}"))),
        }
    }
}

/// Mailer that records every delivery instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    deliveries: Mutex<Vec<OtpDelivery>>,
}

impl RecordingMailer {
    /// Most recent code sent to `email` for `purpose`.
    pub fn last_code(&self, email: &EmailAddress, purpose: OtpPurpose) -> Option<OtpCode> {
        lock(&self.deliveries, "mailer")
            .iter()
            .rev()
            .find(|delivery| &delivery.to == email && delivery.purpose == purpose)
            .map(|delivery| delivery.code.clone())
    }

    pub fn sent_count(&self) -> usize {
        lock(&self.deliveries, "mailer").len()
    }
}

#[async_trait]
impl OtpMailer for RecordingMailer {
    async fn send(&self, delivery: &OtpDelivery) -> Result<(), OtpDeliveryError> {
        lock(&self.deliveries, "mailer").push(delivery.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;
    use crate::domain::{OtpPolicy, OtpRejection};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0)
            .single()
            .expect("timestamp")
    }

    fn issued(user_id: UserId) -> OtpRecord {
        let mut record = OtpRecord::empty(user_id, OtpPurpose::EmailVerification);
        record.issue(
            OtpCode::parse("123456").expect("code"),
            &OtpPolicy::default(),
            now(),
        );
        record
    }

    fn redemption(user_id: UserId, candidate: &str) -> OtpRedemption {
        OtpRedemption {
            user_id,
            purpose: OtpPurpose::EmailVerification,
            candidate: OtpCode::parse(candidate).expect("code"),
            policy: OtpPolicy::default(),
            now: now(),
            acceptance: OtpAcceptance::VerifyEmail,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn failed_account_update_keeps_the_code() {
        let users = Arc::new(InMemoryUserRepository::default());
        let otps = InMemoryOtpRepository::new(users);
        let orphan = UserId::random();
        otps.save(&issued(orphan)).await.expect("save");

        let err = otps
            .redeem(&redemption(orphan, "123456"))
            .await
            .expect_err("account missing");

        assert!(matches!(err, OtpPersistenceError::Query { .. }));
        let stored = otps
            .find(&orphan, OtpPurpose::EmailVerification)
            .await
            .expect("find")
            .expect("record kept");
        assert!(stored.code().is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn accepted_code_verifies_and_clears_together() {
        let users = Arc::new(InMemoryUserRepository::default());
        let account = UserAccount::register(
            EmailAddress::new("ada@example.com").expect("email"),
            "hash".to_owned(),
            None,
            now(),
        );
        users.create(&account).await.expect("create");
        let otps = InMemoryOtpRepository::new(users.clone());
        otps.save(&issued(account.id())).await.expect("save");

        let verdict = otps
            .redeem(&redemption(account.id(), "123456"))
            .await
            .expect("redeem");
        let replay = otps
            .redeem(&redemption(account.id(), "123456"))
            .await
            .expect("redeem");

        assert_eq!(verdict, Ok(3));
        assert_eq!(replay, Err(OtpRejection::NoOtp));
        let stored = users
            .find_by_id(&account.id())
            .await
            .expect("find")
            .expect("account");
        assert!(stored.is_email_verified());
    }
}

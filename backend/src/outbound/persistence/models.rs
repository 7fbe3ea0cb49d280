//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer; repositories convert them
//! to and from domain aggregates.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{alert_flags, alert_likes, alerts, notifications, otp_codes, users};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub login_attempts: i32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub display_name: Option<&'a str>,
    pub email_verified: bool,
    pub login_attempts: i32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable account state. `lockout_until` is written as NULL when cleared.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserUpdate<'a> {
    pub password_hash: &'a str,
    pub display_name: Option<&'a str>,
    pub email_verified: bool,
    pub login_attempts: i32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// One-time passcodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = otp_codes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OtpRow {
    pub user_id: Uuid,
    pub purpose: String,
    pub code: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_requested_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Alerts and engagement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = alerts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AlertRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub incident_type: String,
    pub other_description: Option<String>,
    pub location: String,
    pub longitude: f64,
    pub latitude: f64,
    pub description: String,
    pub images: Vec<String>,
    pub status: String,
    pub like_count: i32,
    pub flag_count: i32,
    pub share_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = alerts)]
pub(crate) struct NewAlertRow<'a> {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub incident_type: &'a str,
    pub other_description: Option<&'a str>,
    pub location: &'a str,
    pub longitude: f64,
    pub latitude: f64,
    pub description: &'a str,
    pub images: &'a [String],
    pub status: &'a str,
    pub like_count: i32,
    pub flag_count: i32,
    pub share_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = alert_likes)]
pub(crate) struct NewAlertLikeRow {
    pub alert_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = alert_flags)]
pub(crate) struct NewAlertFlagRow {
    pub alert_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NotificationRow {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub category: String,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub alert_id: Option<Uuid>,
    pub show_less: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, AsChangeset)]
#[diesel(table_name = notifications)]
pub(crate) struct NotificationUpdate {
    pub is_read: bool,
    pub show_less: bool,
}

//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered accounts. `email` is stored lower-cased and unique.
    users (id) {
        id -> Uuid,
        email -> Varchar,
        password_hash -> Text,
        display_name -> Nullable<Varchar>,
        email_verified -> Bool,
        login_attempts -> Int4,
        lockout_until -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// One passcode slot per user and purpose.
    otp_codes (user_id, purpose) {
        user_id -> Uuid,
        /// `email_verification` or `password_reset`.
        purpose -> Varchar,
        code -> Nullable<Varchar>,
        expires_at -> Nullable<Timestamptz>,
        attempts -> Int4,
        last_requested_at -> Nullable<Timestamptz>,
        cooldown_until -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Incident reports with denormalised engagement counters.
    alerts (id) {
        id -> Uuid,
        owner_id -> Uuid,
        incident_type -> Varchar,
        other_description -> Nullable<Text>,
        location -> Varchar,
        longitude -> Float8,
        latitude -> Float8,
        description -> Text,
        images -> Array<Text>,
        /// `pending`, `verified` or `rejected`.
        status -> Varchar,
        like_count -> Int4,
        flag_count -> Int4,
        share_count -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    alert_likes (alert_id, user_id) {
        alert_id -> Uuid,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    alert_flags (alert_id, user_id) {
        alert_id -> Uuid,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        recipient_id -> Uuid,
        /// Display label such as `Scam Alert`.
        category -> Varchar,
        title -> Varchar,
        body -> Text,
        is_read -> Bool,
        alert_id -> Nullable<Uuid>,
        show_less -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(alerts -> users (owner_id));
diesel::joinable!(otp_codes -> users (user_id));
diesel::joinable!(notifications -> users (recipient_id));
diesel::joinable!(alert_likes -> alerts (alert_id));
diesel::joinable!(alert_flags -> alerts (alert_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    otp_codes,
    alerts,
    alert_likes,
    alert_flags,
    notifications,
);

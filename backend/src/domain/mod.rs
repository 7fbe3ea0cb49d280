//! Domain primitives, aggregates and services.
//!
//! Purpose: define strongly typed entities used by the HTTP and persistence
//! layers, plus the services that implement the driving ports. Nothing in
//! this module depends on actix, Diesel or any other adapter crate.
//!
//! Public surface:
//! - `Error` / `ErrorCode`: transport-agnostic error payload.
//! - Accounts: `UserAccount`, `EmailAddress`, credentials and the
//!   `OtpRecord` state machine.
//! - Alerts: `Alert`, `GeoPoint`, moderation rules and the feed engine.
//! - Notifications: `Notification` and its categories.

pub mod account_service;
pub mod alert;
pub mod alert_service;
pub mod auth;
pub mod engagement_service;
pub mod error;
pub mod feed;
pub mod notification;
pub mod notification_service;
pub mod otp;
pub mod ports;
mod time;
pub mod trace_id;
pub mod user;

pub use self::account_service::{AccountCollaborators, AccountService};
pub use self::alert::{
    Alert, AlertDraft, AlertId, AlertRecord, AlertSubmission, AlertValidationError, BoundingBox,
    DESCRIPTION_MIN, FLAG_REVIEW_THRESHOLD, FlagOutcome, GeoPoint, GeoPointError, ImageKind,
    ImageUpload, IncidentCategory, LikeToggle, MAX_IMAGE_BYTES, MAX_IMAGES, ModerationStatus,
};
pub use self::alert_service::{AlertService, alert_validation_error};
pub use self::auth::{
    AuthSession, AuthenticatedUser, CredentialsValidationError, LoginCredentials, NewPassword,
    PASSWORD_MIN, SignupDetails,
};
pub use self::engagement_service::EngagementService;
pub use self::error::{Error, ErrorCode, ErrorValidationError, RETRY_AFTER_DETAIL};
pub use self::feed::{
    FeedCursorKey, FeedEntry, FeedFilter, FeedItem, FeedPlan, FeedQuery, FeedQueryError, FeedSeek,
    FeedSort, NEARBY_DEFAULT_RADIUS_KM, SortKey, TimeWindow,
};
pub use self::notification::{
    Notification, NotificationCategory, NotificationContent, NotificationId,
    NotificationListKey, NotificationRecord, NotificationValidationError,
};
pub use self::notification_service::NotificationService;
pub use self::otp::{
    OtpAcceptance, OtpCode, OtpCodeError, OtpPolicy, OtpPolicyError, OtpPurpose, OtpRecord,
    OtpRecordDraft, OtpRedemption, OtpRejection, OtpStatus, OtpVerdict, OtpVerification,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{
    DisplayName, EmailAddress, FailedLogin, LoginLockoutPolicy, UserAccount, UserAccountDraft,
    UserId, UserValidationError,
};

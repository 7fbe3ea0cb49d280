//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repositories, hashing, tokens, mail, image storage) are
//! implemented by outbound adapters. Driving ports are implemented by the
//! domain services and called by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod account_command;
mod alert_command;
mod alert_feed_query;
mod alert_repository;
mod engagement_command;
mod image_store;
mod notification_command;
mod notification_repository;
mod otp_mailer;
mod otp_repository;
mod password_hasher;
mod token_service;
mod user_repository;

pub use account_command::AccountCommand;
#[cfg(test)]
pub use account_command::MockAccountCommand;
pub use alert_command::AlertCommand;
#[cfg(test)]
pub use alert_command::MockAlertCommand;
pub use alert_feed_query::AlertFeedQuery;
#[cfg(test)]
pub use alert_feed_query::MockAlertFeedQuery;
#[cfg(test)]
pub use alert_repository::MockAlertRepository;
pub use alert_repository::{AlertPersistenceError, AlertRepository, FixtureAlertRepository};
pub use engagement_command::EngagementCommand;
#[cfg(test)]
pub use engagement_command::MockEngagementCommand;
#[cfg(test)]
pub use image_store::MockImageStore;
pub use image_store::{ImageStore, ImageStoreError};
#[cfg(test)]
pub use notification_command::MockNotificationCommand;
pub use notification_command::NotificationCommand;
#[cfg(test)]
pub use notification_repository::MockNotificationRepository;
pub use notification_repository::{
    FixtureNotificationRepository, NotificationPersistenceError, NotificationRepository,
};
#[cfg(test)]
pub use otp_mailer::MockOtpMailer;
pub use otp_mailer::{OtpDelivery, OtpDeliveryError, OtpMailer};
#[cfg(test)]
pub use otp_repository::MockOtpRepository;
pub use otp_repository::{FixtureOtpRepository, OtpPersistenceError, OtpRepository};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
#[cfg(test)]
pub use token_service::MockTokenService;
pub use token_service::{TokenError, TokenService};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{FixtureUserRepository, UserPersistenceError, UserRepository};

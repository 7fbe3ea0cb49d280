//! PostgreSQL persistence adapters built on Diesel and `diesel-async`.
//!
//! Repositories translate between row structs and domain aggregates and hold
//! no business rules. Row structs (`models.rs`) and table definitions
//! (`schema.rs`) stay private to this module; every failure leaves as the
//! port's own error type.
//!
//! ```ignore
//! use alertline::outbound::persistence::{DbPool, DieselUserRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/alertline")).await?;
//! let users = DieselUserRepository::new(pool);
//! ```

mod diesel_alert_repository;
mod diesel_basic_error_mapping;
mod diesel_helpers;
mod diesel_notification_repository;
mod diesel_otp_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_alert_repository::DieselAlertRepository;
pub use diesel_notification_repository::DieselNotificationRepository;
pub use diesel_otp_repository::DieselOtpRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};

//! Port for credential hashing.

use super::define_port_error;

define_port_error! {
    /// Failures raised by password hashing adapters.
    pub enum PasswordHashError {
        /// The hash could not be produced.
        Hash { message: String } => "password hashing failed: {message}",
        /// The stored hash is not in a recognised format.
        MalformedHash { message: String } => "stored password hash is malformed: {message}",
    }
}

/// One-way credential hashing.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing string.
    fn hash(&self, password: &str) -> Result<String, PasswordHashError>;

    /// Check a plaintext password against a stored hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordHashError>;
}

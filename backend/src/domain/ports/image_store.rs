//! Port for storing uploaded alert images.

use async_trait::async_trait;

use crate::domain::ImageUpload;

use super::define_port_error;

define_port_error! {
    /// Failures raised by image storage adapters.
    pub enum ImageStoreError {
        /// The image could not be written.
        Write { message: String } => "image could not be stored: {message}",
        /// A stored image could not be removed.
        Remove { message: String } => "image could not be removed: {message}",
    }
}

/// Blob store for alert images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the image under a generated name and return its public path.
    async fn store(&self, upload: &ImageUpload) -> Result<String, ImageStoreError>;

    /// Delete an image previously returned by [`ImageStore::store`].
    async fn remove(&self, public_path: &str) -> Result<(), ImageStoreError>;
}

//! Blob storage adapters for uploaded alert images.

mod local_image_store;

pub use local_image_store::{LocalImageStore, PUBLIC_UPLOADS_PREFIX};

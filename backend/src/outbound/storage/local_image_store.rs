//! Filesystem implementation of the [`ImageStore`] port.
//!
//! Images are written through a `cap_std` directory handle, so a generated
//! name can never escape the uploads directory. Each file is staged under a
//! hidden temporary name and renamed into place once fully written.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ImageUpload;
use crate::domain::ports::{ImageStore, ImageStoreError};

/// URL prefix under which stored images are served.
pub const PUBLIC_UPLOADS_PREFIX: &str = "/uploads";

/// Stores images in a local directory served at [`PUBLIC_UPLOADS_PREFIX`].
#[derive(Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    dir: Arc<Dir>,
}

impl LocalImageStore {
    /// Open `root`, creating it first when missing.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the directory cannot be created
    /// or opened.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        Dir::create_ambient_dir_all(&root, ambient_authority())?;
        let dir = Dir::open_ambient_dir(&root, ambient_authority())?;
        Ok(Self {
            root,
            dir: Arc::new(dir),
        })
    }

    /// Directory the images live in, for static file serving.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn write_staged(dir: &Dir, name: &str, bytes: &[u8]) -> io::Result<()> {
    let staged = format!(".{name}.part");
    if let Err(err) = dir.write(&staged, bytes) {
        let _ = dir.remove_file(&staged);
        return Err(err);
    }
    dir.rename(&staged, dir, name)
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, upload: &ImageUpload) -> Result<String, ImageStoreError> {
        let name = format!("{}.{}", Uuid::new_v4().simple(), upload.kind().extension());
        let dir = Arc::clone(&self.dir);
        let bytes = upload.bytes().to_vec();
        let file_name = name.clone();

        tokio::task::spawn_blocking(move || write_staged(&dir, &file_name, &bytes))
            .await
            .map_err(|err| ImageStoreError::write(format!("upload task failed: {err}")))?
            .map_err(|err| ImageStoreError::write(format!("{name}: {err}")))?;

        debug!(file = %name, size = upload.bytes().len(), "stored alert image");
        Ok(format!("{PUBLIC_UPLOADS_PREFIX}/{name}"))
    }

    async fn remove(&self, public_path: &str) -> Result<(), ImageStoreError> {
        let name = public_path
            .strip_prefix(PUBLIC_UPLOADS_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .ok_or_else(|| ImageStoreError::remove(format!("not an upload path: {public_path}")))?
            .to_owned();
        let dir = Arc::clone(&self.dir);
        let file_name = name.clone();

        tokio::task::spawn_blocking(move || dir.remove_file(&file_name))
            .await
            .map_err(|err| ImageStoreError::remove(format!("removal task failed: {err}")))?
            .map_err(|err| ImageStoreError::remove(format!("{name}: {err}")))?;
        debug!(file = %name, "removed alert image");
        Ok(())
    }
}

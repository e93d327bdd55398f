//! Attachment creator that writes into a directory.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::downloader::AttachmentCreator;
use super::filename::{attachment_filename, candidate_path};
use super::store::{AttachmentStore, Destination, LocalFileStore};
use crate::media_type::MediaType;

/// Upper bound on `_<n>` suffixes tried before giving up on a filename.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Writes each attachment to a new file under one directory.
///
/// The filename comes from the last URL path segment (or `attachment` plus an
/// extension guessed from the media type). A taken name gets a numeric
/// suffix. Files are never overwritten.
#[derive(Debug, Clone)]
pub struct DirectoryAttachmentCreator {
    store: Arc<dyn AttachmentStore>,
    dir: PathBuf,
    auto_extension: bool,
}

impl DirectoryAttachmentCreator {
    /// Writes to `dir` on the local filesystem, creating it on first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_store(Arc::new(LocalFileStore::new()), dir)
    }

    /// Writes to `dir` inside an arbitrary store.
    #[must_use]
    pub fn with_store(store: Arc<dyn AttachmentStore>, dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            dir: dir.into(),
            auto_extension: true,
        }
    }

    /// Whether downloaded files are sniffed and renamed. Defaults to `true`.
    #[must_use]
    pub fn with_auto_extension(mut self, enabled: bool) -> Self {
        self.auto_extension = enabled;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl AttachmentCreator for DirectoryAttachmentCreator {
    async fn create_destination(
        &self,
        url: &Url,
        media_type: Option<&MediaType>,
    ) -> io::Result<Destination> {
        self.store.ensure_dir(&self.dir).await?;
        let filename = attachment_filename(url, media_type);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = candidate_path(&self.dir, &filename, attempt);
            match Destination::create(Arc::clone(&self.store), path).await {
                Ok(destination) => {
                    debug!(url = %url, path = %destination.path().display(), "created attachment destination");
                    return Ok(destination);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "no free name for {filename} in {} after {MAX_NAME_ATTEMPTS} attempts",
                self.dir.display()
            ),
        ))
    }

    fn auto_assign_extension(&self, _url: &Url, _media_type: Option<&MediaType>) -> bool {
        self.auto_extension
    }
}

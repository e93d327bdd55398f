//! Downloaded file attachments.
//!
//! Non-HTML content is streamed into a [`Destination`] handed out by the
//! caller's [`AttachmentCreator`]. When the creator asks for it, the written
//! file is re-opened, its first bytes are matched against known file
//! signatures and the file is renamed to carry the detected extension.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use content_resolver::attachment::DirectoryAttachmentCreator;
//! use content_resolver::{ContentResolver, ResolverOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = ContentResolver::new(
//!     ResolverOptions::builder()
//!         .attachment_creator(Arc::new(DirectoryAttachmentCreator::new("./downloads")))
//!         .build(),
//! );
//! let page = resolver.resolve("https://example.com/paper").await?;
//! if let Some(attachment) = page.attachment() {
//!     println!("saved to {}", attachment.path().display());
//! }
//! # Ok(())
//! # }
//! ```

mod creator;
mod downloader;
mod filename;
mod sniff;
pub mod store;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::media_type::MediaType;

pub use creator::DirectoryAttachmentCreator;
pub use downloader::{
    AttachmentCreator, ContentDownloader, DownloadFailure, FileDownloader, download_file,
};
pub use sniff::{SNIFF_HEADER_LEN, SniffedType, sniff};
pub use store::{AttachmentStore, Destination, LocalFileStore, MemoryStore};

/// A downloaded, stored byte stream with an independently sniffed file type.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(rename = "type")]
    media_type: Option<MediaType>,
    #[serde(rename = "url")]
    target_url: Url,
    #[serde(skip)]
    store: Arc<dyn AttachmentStore>,
    dest_path: PathBuf,
    file_type: Option<SniffedType>,
    valid: bool,
}

impl Attachment {
    pub(crate) fn new(
        target_url: Url,
        media_type: Option<MediaType>,
        store: Arc<dyn AttachmentStore>,
        dest_path: PathBuf,
    ) -> Self {
        Self {
            media_type,
            target_url,
            store,
            dest_path,
            file_type: None,
            valid: false,
        }
    }

    /// The URL the attachment was downloaded from.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.target_url
    }

    /// Media type as declared by the server.
    #[must_use]
    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    /// Where the attachment is stored, after any extension rename.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dest_path
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn AttachmentStore> {
        &self.store
    }

    /// Type detected from the file signature, if sniffing ran and matched.
    #[must_use]
    pub fn file_type(&self) -> Option<&SniffedType> {
        self.file_type.as_ref()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Removes the stored file.
    ///
    /// # Errors
    ///
    /// Propagates the store's removal error.
    pub async fn delete(&self) -> io::Result<()> {
        self.store.remove(&self.dest_path).await
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("url", &self.target_url.as_str())
            .field("media_type", &self.media_type.as_ref().map(MediaType::media_type))
            .field("path", &self.dest_path)
            .field("file_type", &self.file_type)
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}

//! Streaming attachment download with post-write type sniffing.

use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::filename::path_with_extension;
use super::sniff::{read_header, sniff};
use super::store::{Destination, StoreWriter};
use super::Attachment;
use crate::error::ResourceError;
use crate::issue::{DiscardWarnings, Issue, IssueCode, WarningSink};
use crate::media_type::MediaType;

/// Policy that decides where attachments are written.
#[async_trait]
pub trait AttachmentCreator: Send + Sync {
    /// Produces a fresh writable destination for content fetched from `url`.
    async fn create_destination(
        &self,
        url: &Url,
        media_type: Option<&MediaType>,
    ) -> io::Result<Destination>;

    /// Whether the written file should be sniffed and renamed to its detected extension.
    fn auto_assign_extension(&self, url: &Url, media_type: Option<&MediaType>) -> bool;
}

/// Policy that turns a non-HTML response into an [`Attachment`].
///
/// Uses `async_trait` so the resolver can hold it as `Arc<dyn ContentDownloader>`.
#[async_trait]
pub trait ContentDownloader: Send + Sync {
    /// Downloads the body of `response`, fetched from `url`.
    async fn download_content(
        &self,
        url: &Url,
        response: reqwest::Response,
        media_type: Option<&MediaType>,
    ) -> Result<Attachment, DownloadFailure>;
}

/// A failed download, with whatever attachment existed when it failed.
///
/// `attachment` is `None` when the failure happened before a destination was
/// created; otherwise it points at the (invalid, possibly partial) stored file,
/// which is left in place for the caller to inspect or delete.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct DownloadFailure {
    pub attachment: Option<Attachment>,
    #[source]
    pub error: ResourceError,
}

impl From<ResourceError> for DownloadFailure {
    fn from(error: ResourceError) -> Self {
        Self {
            attachment: None,
            error,
        }
    }
}

/// Downloads the body of `response` through `creator`.
///
/// 1. `url` and `response` must be present.
/// 2. `creator` supplies the destination.
/// 3. The body is streamed chunk by chunk into it, then the destination is closed.
/// 4. If `creator` asks for it, the file is re-opened, its first
///    [`SNIFF_HEADER_LEN`](super::SNIFF_HEADER_LEN) bytes are sniffed and the
///    file is renamed to the detected extension.
///
/// Sniffing problems never fail the download; they are reported to `warnings`
/// and the attachment keeps its original path.
///
/// # Errors
///
/// Returns a [`DownloadFailure`] when `url` or `response` is missing, the
/// destination cannot be created, or copying the body fails.
#[instrument(skip_all)]
pub async fn download_file(
    creator: &dyn AttachmentCreator,
    warnings: &dyn WarningSink,
    url: Option<&Url>,
    response: Option<reqwest::Response>,
    media_type: Option<&MediaType>,
) -> Result<Attachment, DownloadFailure> {
    let Some(url) = url else {
        return Err(ResourceError::TargetUrlIsNil {
            operation: "download_file",
        }
        .into());
    };
    let Some(response) = response else {
        return Err(ResourceError::NilResponse {
            operation: "download_file",
            url: url.to_string(),
        }
        .into());
    };

    let destination = creator
        .create_destination(url, media_type)
        .await
        .map_err(|e| ResourceError::create_destination(url.as_str(), e))?;
    let (store, path, writer) = destination.into_parts();
    debug!(url = %url, path = %path.display(), "streaming attachment");

    let mut attachment = Attachment::new(url.clone(), media_type.cloned(), store, path);
    let bytes = match stream_to_destination(writer, response, url, &attachment.dest_path).await {
        Ok(bytes) => bytes,
        Err(error) => {
            return Err(DownloadFailure {
                attachment: Some(attachment),
                error,
            });
        }
    };

    if creator.auto_assign_extension(url, media_type) {
        assign_sniffed_extension(&mut attachment, warnings).await;
    }

    attachment.valid = true;
    info!(
        url = %url,
        path = %attachment.dest_path.display(),
        bytes,
        file_type = attachment.file_type.as_ref().map(|t| t.mime_type.as_str()),
        "attachment downloaded"
    );
    Ok(attachment)
}

/// Streams the response body into `writer`, returning bytes written.
///
/// Both ends are dropped (closed) before returning, on every path. When the
/// body fails mid-stream, whatever was received is still flushed so the
/// partial file holds it.
async fn stream_to_destination(
    writer: StoreWriter,
    response: reqwest::Response,
    url: &Url,
    path: &Path,
) -> Result<u64, ResourceError> {
    let mut writer = BufWriter::new(writer);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(e) => {
                if let Err(flush_error) = writer.shutdown().await {
                    debug!(error = %flush_error, "unable to flush partial attachment");
                }
                debug!(path = %path.display(), bytes_written, "body ended early");
                return Err(ResourceError::copy(url.as_str(), path, e));
            }
        };
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ResourceError::copy(url.as_str(), path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .shutdown()
        .await
        .map_err(|e| ResourceError::copy(url.as_str(), path, e))?;

    Ok(bytes_written)
}

async fn assign_sniffed_extension(attachment: &mut Attachment, warnings: &dyn WarningSink) {
    let context = attachment.target_url.to_string();

    let header = match read_header(attachment.store.as_ref(), &attachment.dest_path).await {
        Ok(header) => header,
        Err(e) => {
            let error = ResourceError::inspect_file_type(&attachment.dest_path, e);
            warn!(error = %error, "unable to re-open attachment for sniffing");
            warnings.on_warning(&Issue::new(context, error.code(), error.to_string()));
            return;
        }
    };

    let Some(sniffed) = sniff(&header) else {
        debug!(path = %attachment.dest_path.display(), "no known file signature");
        warnings.on_warning(&Issue::new(
            context,
            IssueCode::UnableToInspectFileType,
            format!(
                "no known file signature in {}",
                attachment.dest_path.display()
            ),
        ));
        return;
    };

    let new_path = path_with_extension(&attachment.dest_path, &sniffed.extension);
    if new_path != attachment.dest_path {
        match attachment.store.rename(&attachment.dest_path, &new_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(target_path = %new_path.display(), "sniffed name already taken");
                warnings.on_warning(&Issue::new(
                    context,
                    IssueCode::UnableToInspectFileType,
                    format!(
                        "not renaming {} to {}: target already exists",
                        attachment.dest_path.display(),
                        new_path.display()
                    ),
                ));
                attachment.file_type = Some(sniffed);
                return;
            }
            Err(e) => {
                let error = ResourceError::inspect_file_type(&attachment.dest_path, e);
                warn!(error = %error, "unable to rename attachment to sniffed extension");
                warnings.on_warning(&Issue::new(context, error.code(), error.to_string()));
                attachment.file_type = Some(sniffed);
                return;
            }
        }
        debug!(
            from = %attachment.dest_path.display(),
            to = %new_path.display(),
            "renamed attachment to sniffed extension"
        );
        attachment.dest_path = new_path;
    }
    attachment.file_type = Some(sniffed);
}

/// [`ContentDownloader`] that writes through an [`AttachmentCreator`].
#[derive(Clone)]
pub struct FileDownloader {
    creator: Arc<dyn AttachmentCreator>,
    warnings: Arc<dyn WarningSink>,
}

impl FileDownloader {
    /// Creates a downloader that discards sniffing warnings.
    #[must_use]
    pub fn new(creator: Arc<dyn AttachmentCreator>) -> Self {
        Self {
            creator,
            warnings: Arc::new(DiscardWarnings),
        }
    }

    /// Sends sniffing warnings to `warnings`.
    #[must_use]
    pub fn with_warning_sink(mut self, warnings: Arc<dyn WarningSink>) -> Self {
        self.warnings = warnings;
        self
    }
}

#[async_trait]
impl ContentDownloader for FileDownloader {
    async fn download_content(
        &self,
        url: &Url,
        response: reqwest::Response,
        media_type: Option<&MediaType>,
    ) -> Result<Attachment, DownloadFailure> {
        download_file(
            self.creator.as_ref(),
            self.warnings.as_ref(),
            Some(url),
            Some(response),
            media_type,
        )
        .await
    }
}

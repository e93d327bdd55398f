//! Signature-based file type detection.

use std::io;
use std::path::Path;

use serde::Serialize;
use tokio::io::AsyncReadExt;

use super::store::AttachmentStore;

/// Bytes of file header needed for signature matching.
pub const SNIFF_HEADER_LEN: usize = 261;

/// File type detected from the leading bytes of a stored attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SniffedType {
    /// MIME type of the matched signature, e.g. `application/pdf`.
    pub mime_type: String,
    /// Canonical extension without a dot, e.g. `pdf`.
    pub extension: String,
}

/// Matches `header` against known file signatures.
#[must_use]
pub fn sniff(header: &[u8]) -> Option<SniffedType> {
    infer::get(header).map(|kind| SniffedType {
        mime_type: kind.mime_type().to_string(),
        extension: kind.extension().to_string(),
    })
}

/// Opens `path` in `store`, reads at most [`SNIFF_HEADER_LEN`] bytes and closes it again.
pub(crate) async fn read_header(store: &dyn AttachmentStore, path: &Path) -> io::Result<Vec<u8>> {
    let reader = store.open(path).await?;
    let mut header = Vec::with_capacity(SNIFF_HEADER_LEN);
    reader
        .take(SNIFF_HEADER_LEN as u64)
        .read_to_end(&mut header)
        .await?;
    Ok(header)
}

//! Content Resolver Library
//!
//! Resolves a single URL into classified content: the resource is fetched
//! over HTTP, its media type determined, and then either its HTML is parsed
//! for a meta-refresh redirect and meta tags, or its body is streamed to
//! storage and the true file type sniffed from its byte signature.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`resolver`] - The resolution pipeline, its policies and the resulting [`Page`]
//! - [`media_type`] - `Content-Type` header classification
//! - [`metadata`] - Meta-refresh and meta tag extraction from HTML
//! - [`attachment`] - Streaming downloads, storage backends and type sniffing
//! - [`issue`] / [`error`] - Stable issue codes and the library error type

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attachment;
pub mod error;
pub mod issue;
pub mod media_type;
pub mod metadata;
pub mod resolver;
#[cfg(test)]
pub mod test_support;
pub mod user_agent;

// Re-export commonly used types
pub use attachment::{
    Attachment, AttachmentCreator, AttachmentStore, ContentDownloader, DirectoryAttachmentCreator,
    DownloadFailure, FileDownloader, LocalFileStore, MemoryStore, SniffedType,
};
pub use error::ResourceError;
pub use issue::{DiscardWarnings, Issue, IssueCode, LogWarnings, Severity, WarningSink};
pub use media_type::{MediaType, TEXT_HTML};
pub use metadata::HtmlMetadata;
pub use resolver::{
    ContentResolver, DownloadErrorPolicy, HttpClientProvider, MetadataPolicy, Page,
    RedirectPolicy, RequestPreparer, ResolveOverrides, ResolverOptions,
};
pub use user_agent::default_user_agent;

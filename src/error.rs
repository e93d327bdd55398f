//! Error types for content resolution.
//!
//! Every variant carries the context (URL or storage path) needed to log or
//! display it without re-deriving anything, and maps onto a stable
//! [`IssueCode`] through [`ResourceError::code`].

use std::path::PathBuf;

use thiserror::Error;

use crate::issue::{Issue, IssueCode, Severity};

/// Boxed cause for failures that may originate in either the network or the store.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving a URL into content.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The caller supplied an empty URL.
    #[error("target URL is blank")]
    TargetUrlIsBlank,

    /// A component that needs a target URL was given none.
    #[error("target URL is nil in {operation}")]
    TargetUrlIsNil {
        /// The operation that was missing its URL.
        operation: &'static str,
    },

    /// A component that needs an HTTP response was given none.
    #[error("HTTP response is nil in {operation} for {url}")]
    NilResponse {
        /// The operation that was missing its response.
        operation: &'static str,
        /// The URL the response was expected for.
        url: String,
    },

    /// The URL text could not be turned into a request.
    #[error("unable to create HTTP request for {url}: {source}")]
    InvalidUrl {
        /// The URL text as supplied.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// The prepared request could not be built (e.g. an invalid header was added).
    #[error("unable to create HTTP request for {url}: {source}")]
    Request {
        /// The URL being fetched.
        url: String,
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client provider could not produce a client.
    #[error("unable to create HTTP client: {reason}")]
    HttpClient {
        /// What went wrong.
        reason: String,
    },

    /// The GET request could not be executed (DNS, connection, TLS, etc.)
    #[error("unable to execute HTTP GET request for {url}: {source}")]
    Transport {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded the client timeout.
    #[error("timeout executing HTTP GET request for {url}")]
    Timeout {
        /// The URL being fetched.
        url: String,
    },

    /// The final response status was not 200.
    #[error("invalid HTTP response status code {status} for {url}")]
    HttpStatus {
        /// The URL being fetched.
        url: String,
        /// The HTTP status code that was returned.
        status: u16,
    },

    /// The response body could not be read for HTML parsing.
    #[error("unable to parse HTTP body of {url}: {source}")]
    BodyParse {
        /// The URL whose body failed.
        url: String,
        /// The underlying read error.
        #[source]
        source: reqwest::Error,
    },

    /// The Content-Type header is not a valid media type.
    #[error("unable to classify media type {content_type:?} of {url}: {reason}")]
    MediaType {
        /// The URL whose header failed, or empty when classified standalone.
        url: String,
        /// The raw header value.
        content_type: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The attachment creation policy could not produce a destination.
    #[error("unable to create attachment destination for {url}: {source}")]
    CreateDestination {
        /// The URL being downloaded.
        url: String,
        /// The underlying creation error.
        #[source]
        source: std::io::Error,
    },

    /// Streaming the body into the destination failed.
    #[error("copy error during file download of {url} into {path}: {source}")]
    Copy {
        /// The URL being downloaded.
        url: String,
        /// The destination path.
        path: PathBuf,
        /// Network read or destination write error.
        #[source]
        source: BoxError,
    },

    /// Meta tags were requested from content that is not HTML.
    #[error("meta tags not available in non-HTML content at {url}")]
    MetaTagsNotAvailableInNonHtmlContent {
        /// The page URL.
        url: String,
    },

    /// Meta tags were requested from HTML that was never parsed.
    #[error("meta tags not available in unparsed HTML at {url} (error or policy didn't request parsing)")]
    MetaTagsNotAvailableInUnparsedHtml {
        /// The page URL.
        url: String,
    },

    /// The downloaded file could not be re-opened for type inspection.
    #[error("unable to inspect file type of {path}: {source}")]
    InspectFileType {
        /// The stored attachment path.
        path: PathBuf,
        /// The underlying store error.
        #[source]
        source: std::io::Error,
    },
}

impl ResourceError {
    /// Creates a transport error, promoting reqwest timeouts to [`ResourceError::Timeout`].
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Transport {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a request error for a request that failed to build.
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    /// Creates a body parse error.
    pub fn body_parse(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::BodyParse {
            url: url.into(),
            source,
        }
    }

    /// Creates a media type classification error.
    pub fn media_type(
        url: impl Into<String>,
        content_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MediaType {
            url: url.into(),
            content_type: content_type.into(),
            reason: reason.into(),
        }
    }

    /// Creates a destination creation error.
    pub fn create_destination(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::CreateDestination {
            url: url.into(),
            source,
        }
    }

    /// Creates a copy error.
    pub fn copy(url: impl Into<String>, path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Copy {
            url: url.into(),
            path: path.into(),
            source: source.into(),
        }
    }

    /// Creates a file type inspection error.
    pub fn inspect_file_type(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::InspectFileType {
            path: path.into(),
            source,
        }
    }

    /// Stable code for this error.
    #[must_use]
    pub fn code(&self) -> IssueCode {
        match self {
            Self::TargetUrlIsBlank => IssueCode::TargetUrlIsBlank,
            Self::TargetUrlIsNil { .. } => IssueCode::TargetUrlIsNil,
            Self::NilResponse { .. } => IssueCode::NilResponse,
            Self::InvalidUrl { .. } | Self::Request { .. } | Self::HttpClient { .. } => {
                IssueCode::UnableToCreateHttpRequest
            }
            Self::Transport { .. } | Self::Timeout { .. } => {
                IssueCode::UnableToExecuteHttpGetRequest
            }
            Self::HttpStatus { status, .. } => IssueCode::InvalidHttpRespStatusCode(*status),
            Self::BodyParse { .. } => IssueCode::UnableToParseHttpBody,
            Self::MediaType { .. } => IssueCode::UnableToClassifyMediaType,
            Self::CreateDestination { .. } => IssueCode::UnableToCreateDestination,
            Self::Copy { .. } => IssueCode::CopyErrorDuringFileDownload,
            Self::MetaTagsNotAvailableInNonHtmlContent { .. } => {
                IssueCode::MetaTagsNotAvailableInNonHtmlContent
            }
            Self::MetaTagsNotAvailableInUnparsedHtml { .. } => {
                IssueCode::MetaTagsNotAvailableInUnparsedHtml
            }
            Self::InspectFileType { .. } => IssueCode::UnableToInspectFileType,
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.code().severity()
    }

    /// The URL or path the error is about; empty when there is none.
    #[must_use]
    pub fn context(&self) -> String {
        match self {
            Self::TargetUrlIsBlank | Self::TargetUrlIsNil { .. } | Self::HttpClient { .. } => {
                String::new()
            }
            Self::NilResponse { url, .. }
            | Self::InvalidUrl { url, .. }
            | Self::Request { url, .. }
            | Self::Transport { url, .. }
            | Self::Timeout { url }
            | Self::HttpStatus { url, .. }
            | Self::BodyParse { url, .. }
            | Self::MediaType { url, .. }
            | Self::CreateDestination { url, .. }
            | Self::Copy { url, .. }
            | Self::MetaTagsNotAvailableInNonHtmlContent { url }
            | Self::MetaTagsNotAvailableInUnparsedHtml { url } => url.clone(),
            Self::InspectFileType { path, .. } => path.display().to_string(),
        }
    }

    /// HTTP status carried by [`ResourceError::HttpStatus`].
    #[must_use]
    pub fn http_status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured record of this error.
    #[must_use]
    pub fn to_issue(&self) -> Issue {
        Issue::new(self.context(), self.code(), self.to_string())
    }
}

// No From<reqwest::Error> / From<std::io::Error>: callers must supply the
// URL or path, so they go through the constructor helpers above.

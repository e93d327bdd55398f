//! Caller-supplied policies that steer a resolution.
//!
//! Each policy is a small trait so callers can plug in anything from a plain
//! `bool` or closure to a stateful object. Closures implement every policy
//! whose signature they match.

use reqwest::{Client, RequestBuilder};
use url::Url;

use crate::error::ResourceError;
use crate::media_type::MediaType;

/// Supplies the HTTP client used for a resolution.
pub trait HttpClientProvider: Send + Sync {
    /// Returns a client ready to send the GET request.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::HttpClient`] when no client can be built.
    fn http_client(&self) -> Result<Client, ResourceError>;
}

impl HttpClientProvider for Client {
    fn http_client(&self) -> Result<Client, ResourceError> {
        Ok(self.clone())
    }
}

/// Adjusts the GET request before it is sent (headers, auth, query).
pub trait RequestPreparer: Send + Sync {
    fn prepare(&self, url: &Url, request: RequestBuilder) -> RequestBuilder;
}

impl<F> RequestPreparer for F
where
    F: Fn(&Url, RequestBuilder) -> RequestBuilder + Send + Sync,
{
    fn prepare(&self, url: &Url, request: RequestBuilder) -> RequestBuilder {
        self(url, request)
    }
}

/// Whether HTML at `url` should be scanned for a meta-refresh redirect.
pub trait RedirectPolicy: Send + Sync {
    fn detect_redirects(&self, url: &Url) -> bool;
}

impl RedirectPolicy for bool {
    fn detect_redirects(&self, _url: &Url) -> bool {
        *self
    }
}

impl<F> RedirectPolicy for F
where
    F: Fn(&Url) -> bool + Send + Sync,
{
    fn detect_redirects(&self, url: &Url) -> bool {
        self(url)
    }
}

/// Whether HTML at `url` should have its meta tags collected.
pub trait MetadataPolicy: Send + Sync {
    fn parse_metadata(&self, url: &Url) -> bool;
}

impl MetadataPolicy for bool {
    fn parse_metadata(&self, _url: &Url) -> bool {
        *self
    }
}

impl<F> MetadataPolicy for F
where
    F: Fn(&Url) -> bool + Send + Sync,
{
    fn parse_metadata(&self, url: &Url) -> bool {
        self(url)
    }
}

/// Whether a failed attachment download aborts the resolution.
///
/// When this returns `false` the failure is reported as a warning and the
/// page is returned without an attachment.
pub trait DownloadErrorPolicy: Send + Sync {
    /// `media_type` is the declared type of the content that failed to download.
    fn stop_on_download_error(
        &self,
        url: &Url,
        media_type: Option<&MediaType>,
        error: &ResourceError,
    ) -> bool;
}

impl DownloadErrorPolicy for bool {
    fn stop_on_download_error(
        &self,
        _url: &Url,
        _media_type: Option<&MediaType>,
        _error: &ResourceError,
    ) -> bool {
        *self
    }
}

impl<F> DownloadErrorPolicy for F
where
    F: Fn(&Url, Option<&MediaType>, &ResourceError) -> bool + Send + Sync,
{
    fn stop_on_download_error(
        &self,
        url: &Url,
        media_type: Option<&MediaType>,
        error: &ResourceError,
    ) -> bool {
        self(url, media_type, error)
    }
}

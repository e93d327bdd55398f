//! URL resolution pipeline.
//!
//! [`ContentResolver`] fetches one URL, classifies the response and hands it
//! to exactly one of two paths:
//!
//! - HTML, when redirect detection or metadata parsing is enabled: the body is
//!   parsed for a meta-refresh target and meta tags.
//! - Anything else, when an attachment creator or downloader is configured:
//!   the body is streamed to storage and its file type sniffed.
//!
//! Otherwise the page is returned with only its URL and media type. There is
//! no retry anywhere in the pipeline.
//!
//! # Example
//!
//! ```no_run
//! use content_resolver::ContentResolver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = ContentResolver::default();
//! let page = resolver.resolve("https://example.com/article").await?;
//! if let Some(target) = page.html_redirect() {
//!     println!("meta refresh to {target}");
//! }
//! println!("og:title = {:?}", page.meta_tag("og:title")?);
//! # Ok(())
//! # }
//! ```

mod http_client;
mod options;
mod page;
mod policy;

pub use http_client::{DEFAULT_TIMEOUT_SECS, DefaultHttpClientProvider, build_http_client};
pub use options::{ResolveOverrides, ResolverOptions, ResolverOptionsBuilder};
pub use page::Page;
pub use policy::{
    DownloadErrorPolicy, HttpClientProvider, MetadataPolicy, RedirectPolicy, RequestPreparer,
};

use std::fmt;
use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::attachment::{ContentDownloader, FileDownloader};
use crate::error::ResourceError;
use crate::issue::{Issue, IssueCode, WarningSink};
use crate::media_type::MediaType;
use crate::metadata;

/// Resolves URLs into [`Page`]s under a fixed set of policies.
///
/// Cheap to clone and safe to share across tasks; every call opens its own
/// request and destination.
#[derive(Clone)]
pub struct ContentResolver {
    http_client: Arc<dyn HttpClientProvider>,
    request_preparer: Option<Arc<dyn RequestPreparer>>,
    redirect_policy: Arc<dyn RedirectPolicy>,
    metadata_policy: Arc<dyn MetadataPolicy>,
    downloader: Option<Arc<dyn ContentDownloader>>,
    download_error_policy: Arc<dyn DownloadErrorPolicy>,
    warning_sink: Arc<dyn WarningSink>,
}

impl Default for ContentResolver {
    fn default() -> Self {
        Self::new(ResolverOptions::default())
    }
}

impl fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentResolver")
            .field("request_preparer", &self.request_preparer.is_some())
            .field("downloads_attachments", &self.downloader.is_some())
            .finish_non_exhaustive()
    }
}

impl ContentResolver {
    /// Binds `options`, filling in the default HTTP client and downloader.
    #[must_use]
    pub fn new(options: ResolverOptions) -> Self {
        let http_client = options.http_client.unwrap_or_else(|| {
            Arc::new(DefaultHttpClientProvider::new(
                options.user_agent,
                options.timeout,
            ))
        });

        let downloader = options.content_downloader.or_else(|| {
            options.attachment_creator.map(|creator| {
                Arc::new(
                    FileDownloader::new(creator)
                        .with_warning_sink(Arc::clone(&options.warning_sink)),
                ) as Arc<dyn ContentDownloader>
            })
        });

        Self {
            http_client,
            request_preparer: options.request_preparer,
            redirect_policy: options.redirect_policy,
            metadata_policy: options.metadata_policy,
            downloader,
            download_error_policy: options.download_error_policy,
            warning_sink: options.warning_sink,
        }
    }

    /// Fetches `url_text` and turns the response into a [`Page`].
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] when the URL is blank or invalid, the
    /// request fails or returns a status other than 200, the `Content-Type`
    /// cannot be classified, the HTML body cannot be read, or a download
    /// fails and the download-error policy says to stop.
    pub async fn resolve(&self, url_text: &str) -> Result<Page, ResourceError> {
        self.resolve_with(url_text, &ResolveOverrides::default())
            .await
    }

    /// Like [`resolve`](Self::resolve), with some policies replaced for this call.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    #[instrument(skip(self, overrides), fields(url = %url_text))]
    pub async fn resolve_with(
        &self,
        url_text: &str,
        overrides: &ResolveOverrides,
    ) -> Result<Page, ResourceError> {
        if url_text.is_empty() {
            return Err(ResourceError::TargetUrlIsBlank);
        }
        let url = Url::parse(url_text).map_err(|e| ResourceError::invalid_url(url_text, e))?;

        let client = self.http_client.http_client()?;
        let mut request = client.get(url.clone());
        if let Some(preparer) = &self.request_preparer {
            request = preparer.prepare(&url, request);
        }
        let request = request
            .build()
            .map_err(|e| ResourceError::request(url.as_str(), e))?;

        debug!(url = %url, "sending GET request");
        let response = client
            .execute(request)
            .await
            .map_err(|e| ResourceError::transport(url.as_str(), e))?;

        let final_url = response.url().clone();
        let status = response.status();
        if status != StatusCode::OK {
            debug!(url = %final_url, status = status.as_u16(), "unexpected response status");
            return Err(ResourceError::http_status(
                final_url.as_str(),
                status.as_u16(),
            ));
        }

        let media_type = match response.headers().get(CONTENT_TYPE) {
            Some(value) => {
                let content_type = value.to_str().map_err(|_| {
                    ResourceError::media_type(
                        final_url.as_str(),
                        String::from_utf8_lossy(value.as_bytes()),
                        "header value is not visible ASCII",
                    )
                })?;
                Some(MediaType::classify(&final_url, content_type)?)
            }
            None => None,
        };
        debug!(
            url = %final_url,
            redirected = final_url != url,
            media_type = media_type.as_ref().map(MediaType::media_type),
            "response classified"
        );

        let mut page = Page::new(final_url, media_type);
        let redirect_policy = overrides
            .redirect_policy
            .as_deref()
            .unwrap_or(self.redirect_policy.as_ref());
        let metadata_policy = overrides
            .metadata_policy
            .as_deref()
            .unwrap_or(self.metadata_policy.as_ref());

        if page.is_html()
            && (redirect_policy.detect_redirects(page.url())
                || metadata_policy.parse_metadata(page.url()))
        {
            let metadata = metadata::extract_from_response(page.url(), response).await?;
            debug!(
                url = %page.url(),
                redirect = metadata.redirect.as_deref(),
                meta_tags = metadata.meta_tags.len(),
                "HTML metadata extracted"
            );
            page.apply_metadata(metadata);
        } else if let Some(downloader) = &self.downloader {
            let url = page.url().clone();
            match downloader
                .download_content(&url, response, page.media_type())
                .await
            {
                Ok(attachment) => page.set_attachment(attachment),
                Err(failure) => {
                    if self
                        .download_error_policy
                        .stop_on_download_error(&url, page.media_type(), &failure.error)
                    {
                        return Err(failure.error);
                    }
                    warn!(url = %url, error = %failure.error, "download failed; continuing without attachment");
                    self.warning_sink.on_warning(&Issue::new(
                        url.as_str(),
                        IssueCode::DownloadFailed,
                        format!("{} [{}]", failure.error, failure.error.code()),
                    ));
                }
            }
        }

        page.mark_valid();
        info!(
            url = %page.url(),
            html_parsed = page.html_parsed(),
            attachment = page.attachment().is_some(),
            "resolved"
        );
        Ok(page)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::attachment::{DirectoryAttachmentCreator, MemoryStore};
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use crate::test_support::truncated_body::serve_truncated_body_or_skip;

    const ARTICLE: &str = r#"<!DOCTYPE html><html><head>
        <meta http-equiv="refresh" content="2;url=https://example.com/x">
        <meta property="og:title" content="Hello">
        </head><body><p>text</p></body></html>"#;

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
    }

    #[tokio::test]
    async fn test_blank_url_is_rejected_before_io() {
        let error = ContentResolver::default().resolve("").await.unwrap_err();
        assert_eq!(error.code(), IssueCode::TargetUrlIsBlank);
    }

    #[tokio::test]
    async fn test_unparseable_url_is_request_creation_error() {
        let error = ContentResolver::default()
            .resolve("not a url")
            .await
            .unwrap_err();
        assert_eq!(error.code(), IssueCode::UnableToCreateHttpRequest);
        assert_eq!(error.context(), "not a url");
    }

    #[tokio::test]
    async fn test_html_with_default_policies_is_parsed() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(html(ARTICLE))
            .mount(&mock_server)
            .await;

        let page = ContentResolver::default()
            .resolve(&format!("{}/article", mock_server.uri()))
            .await
            .unwrap();

        assert!(page.is_valid());
        assert!(page.html_parsed());
        assert_eq!(page.html_redirect(), Some("https://example.com/x"));
        assert_eq!(page.meta_tag("og:title").unwrap(), Some("Hello"));
        assert_eq!(page.media_type().unwrap().param("charset"), Some("utf-8"));
        assert!(page.attachment().is_none());
    }

    #[tokio::test]
    async fn test_policies_off_skips_parsing() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(html(ARTICLE))
            .mount(&mock_server)
            .await;

        let resolver = ContentResolver::new(
            ResolverOptions::builder()
                .redirect_policy(false)
                .metadata_policy(false)
                .build(),
        );
        let page = resolver.resolve(&mock_server.uri()).await.unwrap();

        assert!(page.is_valid());
        assert!(page.is_html());
        assert!(!page.html_parsed());
        assert_eq!(
            page.meta_tags().unwrap_err().code(),
            IssueCode::MetaTagsNotAvailableInUnparsedHtml
        );
    }

    #[tokio::test]
    async fn test_overrides_replace_policies_for_one_call() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(html(ARTICLE))
            .mount(&mock_server)
            .await;

        let resolver = ContentResolver::new(
            ResolverOptions::builder()
                .redirect_policy(false)
                .metadata_policy(false)
                .build(),
        );
        let overrides = ResolveOverrides::new().metadata_policy(|_url: &Url| true);
        let page = resolver
            .resolve_with(&mock_server.uri(), &overrides)
            .await
            .unwrap();

        assert!(page.html_parsed());
        assert_eq!(page.meta_tag("og:title").unwrap(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_non_200_status_is_reported_with_code() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let error = ContentResolver::default()
            .resolve(&format!("{}/missing", mock_server.uri()))
            .await
            .unwrap_err();

        assert_eq!(error.http_status_code(), Some(404));
        assert_eq!(error.code().to_string(), "RESOURCE_E-0300-HTTP-404");
    }

    #[tokio::test]
    async fn test_bad_content_type_is_classification_error() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("Content-Type", "text/html; charset"),
            )
            .mount(&mock_server)
            .await;

        let error = ContentResolver::default()
            .resolve(&mock_server.uri())
            .await
            .unwrap_err();
        assert_eq!(error.code(), IssueCode::UnableToClassifyMediaType);
    }

    #[tokio::test]
    async fn test_request_preparer_and_user_agent_are_applied() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(header("user-agent", "probe/1.0"))
            .and(header("x-api-key", "secret"))
            .respond_with(html("<html><head></head></html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let resolver = ContentResolver::new(
            ResolverOptions::builder()
                .user_agent("probe/1.0")
                .request_preparer(|_url: &Url, request: reqwest::RequestBuilder| {
                    request.header("X-Api-Key", "secret")
                })
                .build(),
        );
        let page = resolver.resolve(&mock_server.uri()).await.unwrap();
        assert!(page.is_valid());
    }

    #[tokio::test]
    async fn test_non_html_without_downloader_is_plain_page() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
            )
            .mount(&mock_server)
            .await;

        let page = ContentResolver::default()
            .resolve(&mock_server.uri())
            .await
            .unwrap();
        assert!(page.is_valid());
        assert!(!page.html_parsed());
        assert!(page.attachment().is_none());
        assert_eq!(page.media_type().unwrap().media_type(), "application/pdf");
    }

    #[tokio::test]
    async fn test_pdf_downloaded_into_memory_store() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/papers/42"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"%PDF-1.4\n1 0 obj\n".to_vec(), "application/pdf"),
            )
            .mount(&mock_server)
            .await;

        let store = MemoryStore::new();
        let creator = DirectoryAttachmentCreator::with_store(Arc::new(store.clone()), "dl");
        let resolver = ContentResolver::new(
            ResolverOptions::builder()
                .attachment_creator(Arc::new(creator))
                .build(),
        );
        let page = resolver
            .resolve(&format!("{}/papers/42", mock_server.uri()))
            .await
            .unwrap();

        let attachment = page.attachment().unwrap();
        assert!(attachment.is_valid());
        assert_eq!(attachment.path(), std::path::Path::new("dl/42.pdf"));
        assert_eq!(attachment.file_type().unwrap().mime_type, "application/pdf");
        assert_eq!(store.read(attachment.path()).unwrap(), b"%PDF-1.4\n1 0 obj\n");
    }

    #[derive(Debug)]
    struct AlwaysFails;

    #[async_trait::async_trait]
    impl crate::attachment::AttachmentCreator for AlwaysFails {
        async fn create_destination(
            &self,
            _url: &Url,
            _media_type: Option<&MediaType>,
        ) -> std::io::Result<crate::attachment::Destination> {
            Err(std::io::Error::other("disk full"))
        }

        fn auto_assign_extension(&self, _url: &Url, _media_type: Option<&MediaType>) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_download_error_becomes_warning_by_default() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"zip".to_vec(), "application/zip"))
            .mount(&mock_server)
            .await;

        let seen: Arc<Mutex<Vec<Issue>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let resolver = ContentResolver::new(
            ResolverOptions::builder()
                .attachment_creator(Arc::new(AlwaysFails))
                .warning_sink(Arc::new(move |issue: &Issue| {
                    sink_seen.lock().unwrap().push(issue.clone());
                }))
                .build(),
        );
        let page = resolver.resolve(&mock_server.uri()).await.unwrap();

        assert!(page.is_valid());
        assert!(page.attachment().is_none());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].code(), IssueCode::DownloadFailed);
        assert!(seen[0].message().contains("RESOURCE_E-0600"));
    }

    #[tokio::test]
    async fn test_download_error_policy_can_stop() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"zip".to_vec(), "application/zip"))
            .mount(&mock_server)
            .await;

        let resolver = ContentResolver::new(
            ResolverOptions::builder()
                .attachment_creator(Arc::new(AlwaysFails))
                .download_error_policy(true)
                .build(),
        );
        let error = resolver.resolve(&mock_server.uri()).await.unwrap_err();
        assert_eq!(error.code(), IssueCode::UnableToCreateDestination);
    }

    #[tokio::test]
    async fn test_download_error_policy_decides_by_media_type() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/paper"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF".to_vec(), "application/pdf"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bundle"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"zip".to_vec(), "application/zip"))
            .mount(&mock_server)
            .await;

        let resolver = ContentResolver::new(
            ResolverOptions::builder()
                .attachment_creator(Arc::new(AlwaysFails))
                .download_error_policy(
                    |_url: &Url, media_type: Option<&MediaType>, _error: &ResourceError| {
                        media_type.is_some_and(|t| t.media_type() == "application/pdf")
                    },
                )
                .build(),
        );

        let error = resolver
            .resolve(&format!("{}/paper", mock_server.uri()))
            .await
            .unwrap_err();
        assert_eq!(error.code(), IssueCode::UnableToCreateDestination);

        let page = resolver
            .resolve(&format!("{}/bundle", mock_server.uri()))
            .await
            .unwrap();
        assert!(page.is_valid());
        assert!(page.attachment().is_none());
    }

    #[tokio::test]
    async fn test_truncated_html_body_is_parse_error() {
        let Some(target) = serve_truncated_body_or_skip(
            "text/html",
            4096,
            b"<html><head><meta name=\"a\" content=\"b\">",
        )
        .await
        else {
            return;
        };

        let error = ContentResolver::default().resolve(&target).await.unwrap_err();
        assert_eq!(error.code(), IssueCode::UnableToParseHttpBody);
        assert_eq!(error.code().to_string(), "RESOURCE_E-0400");
    }
}

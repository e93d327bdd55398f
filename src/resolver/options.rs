//! Resolver options and per-call overrides.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::http_client::DEFAULT_TIMEOUT_SECS;
use super::policy::{
    DownloadErrorPolicy, HttpClientProvider, MetadataPolicy, RedirectPolicy, RequestPreparer,
};
use crate::attachment::{AttachmentCreator, ContentDownloader};
use crate::issue::{DiscardWarnings, WarningSink};
use crate::user_agent::default_user_agent;

/// Everything a [`ContentResolver`](super::ContentResolver) needs besides the URL.
///
/// Every field has a default; start from [`ResolverOptions::builder`] or
/// [`ResolverOptions::default`].
#[derive(Clone)]
pub struct ResolverOptions {
    pub(crate) http_client: Option<Arc<dyn HttpClientProvider>>,
    pub(crate) user_agent: String,
    pub(crate) timeout: Duration,
    pub(crate) request_preparer: Option<Arc<dyn RequestPreparer>>,
    pub(crate) redirect_policy: Arc<dyn RedirectPolicy>,
    pub(crate) metadata_policy: Arc<dyn MetadataPolicy>,
    pub(crate) attachment_creator: Option<Arc<dyn AttachmentCreator>>,
    pub(crate) content_downloader: Option<Arc<dyn ContentDownloader>>,
    pub(crate) download_error_policy: Arc<dyn DownloadErrorPolicy>,
    pub(crate) warning_sink: Arc<dyn WarningSink>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            http_client: None,
            user_agent: default_user_agent(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            request_preparer: None,
            redirect_policy: Arc::new(true),
            metadata_policy: Arc::new(true),
            attachment_creator: None,
            content_downloader: None,
            download_error_policy: Arc::new(false),
            warning_sink: Arc::new(DiscardWarnings),
        }
    }
}

impl ResolverOptions {
    #[must_use]
    pub fn builder() -> ResolverOptionsBuilder {
        ResolverOptionsBuilder::default()
    }

    /// User-Agent for the default HTTP client.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Overall request timeout for the default HTTP client.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether non-HTML content will be downloaded.
    #[must_use]
    pub fn downloads_attachments(&self) -> bool {
        self.content_downloader.is_some() || self.attachment_creator.is_some()
    }
}

impl fmt::Debug for ResolverOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverOptions")
            .field("custom_http_client", &self.http_client.is_some())
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("request_preparer", &self.request_preparer.is_some())
            .field("downloads_attachments", &self.downloads_attachments())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ResolverOptions`].
#[derive(Debug, Default)]
pub struct ResolverOptionsBuilder {
    options: ResolverOptions,
}

impl ResolverOptionsBuilder {
    /// Uses `provider` instead of the default reqwest client.
    ///
    /// `user_agent` and `timeout` only apply to the default client.
    #[must_use]
    pub fn http_client(mut self, provider: Arc<dyn HttpClientProvider>) -> Self {
        self.options.http_client = Some(provider);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    #[must_use]
    pub fn request_preparer(mut self, preparer: impl RequestPreparer + 'static) -> Self {
        self.options.request_preparer = Some(Arc::new(preparer));
        self
    }

    #[must_use]
    pub fn redirect_policy(mut self, policy: impl RedirectPolicy + 'static) -> Self {
        self.options.redirect_policy = Arc::new(policy);
        self
    }

    #[must_use]
    pub fn metadata_policy(mut self, policy: impl MetadataPolicy + 'static) -> Self {
        self.options.metadata_policy = Arc::new(policy);
        self
    }

    /// Enables attachment downloads through `creator`.
    #[must_use]
    pub fn attachment_creator(mut self, creator: Arc<dyn AttachmentCreator>) -> Self {
        self.options.attachment_creator = Some(creator);
        self
    }

    /// Replaces the default [`FileDownloader`](crate::attachment::FileDownloader).
    #[must_use]
    pub fn content_downloader(mut self, downloader: Arc<dyn ContentDownloader>) -> Self {
        self.options.content_downloader = Some(downloader);
        self
    }

    #[must_use]
    pub fn download_error_policy(mut self, policy: impl DownloadErrorPolicy + 'static) -> Self {
        self.options.download_error_policy = Arc::new(policy);
        self
    }

    #[must_use]
    pub fn warning_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.options.warning_sink = sink;
        self
    }

    #[must_use]
    pub fn build(self) -> ResolverOptions {
        self.options
    }
}

/// Policies replaced for a single [`resolve_with`](super::ContentResolver::resolve_with) call.
#[derive(Clone, Default)]
pub struct ResolveOverrides {
    pub(crate) redirect_policy: Option<Arc<dyn RedirectPolicy>>,
    pub(crate) metadata_policy: Option<Arc<dyn MetadataPolicy>>,
}

impl ResolveOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn redirect_policy(mut self, policy: impl RedirectPolicy + 'static) -> Self {
        self.redirect_policy = Some(Arc::new(policy));
        self
    }

    #[must_use]
    pub fn metadata_policy(mut self, policy: impl MetadataPolicy + 'static) -> Self {
        self.metadata_policy = Some(Arc::new(policy));
        self
    }
}

impl fmt::Debug for ResolveOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOverrides")
            .field("redirect_policy", &self.redirect_policy.is_some())
            .field("metadata_policy", &self.metadata_policy.is_some())
            .finish()
    }
}

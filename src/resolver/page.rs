//! The resolved content of one URL.

use std::collections::BTreeMap;

use serde::Serialize;
use url::Url;

use crate::attachment::Attachment;
use crate::error::ResourceError;
use crate::media_type::MediaType;
use crate::metadata::HtmlMetadata;

/// What resolving one URL produced.
///
/// Either the HTML was parsed (redirect and meta tags may be set, no
/// attachment) or at most an attachment was downloaded. Pages are built by
/// [`ContentResolver`](super::ContentResolver) and never change afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(rename = "url")]
    target_url: Url,
    #[serde(rename = "type")]
    media_type: Option<MediaType>,
    html_parsed: bool,
    is_html_redirect: bool,
    #[serde(rename = "metaRefreshURL", skip_serializing_if = "String::is_empty")]
    meta_refresh_url_text: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    meta_tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment: Option<Attachment>,
    #[serde(rename = "isValid")]
    valid: bool,
}

impl Page {
    pub(crate) fn new(target_url: Url, media_type: Option<MediaType>) -> Self {
        Self {
            target_url,
            media_type,
            html_parsed: false,
            is_html_redirect: false,
            meta_refresh_url_text: String::new(),
            meta_tags: BTreeMap::new(),
            attachment: None,
            valid: false,
        }
    }

    pub(crate) fn apply_metadata(&mut self, metadata: HtmlMetadata) {
        self.html_parsed = true;
        if let Some(redirect) = metadata.redirect {
            self.is_html_redirect = true;
            self.meta_refresh_url_text = redirect;
        }
        self.meta_tags = metadata.meta_tags;
    }

    pub(crate) fn set_attachment(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }

    pub(crate) fn mark_valid(&mut self) {
        self.valid = true;
    }

    /// Final URL after transport-level redirects.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.target_url
    }

    #[must_use]
    pub fn target_url_text(&self) -> &str {
        self.target_url.as_str()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Declared media type; `None` when the server sent no `Content-Type`.
    #[must_use]
    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    #[must_use]
    pub fn is_html(&self) -> bool {
        self.media_type.as_ref().is_some_and(MediaType::is_html)
    }

    /// Whether the body was parsed for redirects and meta tags.
    #[must_use]
    pub fn html_parsed(&self) -> bool {
        self.html_parsed
    }

    /// `(true, target)` when a meta-refresh directive was found, else `(false, "")`.
    #[must_use]
    pub fn redirect(&self) -> (bool, &str) {
        (self.is_html_redirect, &self.meta_refresh_url_text)
    }

    /// Meta-refresh target text, verbatim.
    #[must_use]
    pub fn html_redirect(&self) -> Option<&str> {
        self.is_html_redirect
            .then_some(self.meta_refresh_url_text.as_str())
    }

    /// All collected meta tags.
    ///
    /// # Errors
    ///
    /// Returns a warning-class error when the page is not HTML or its HTML was
    /// not parsed.
    pub fn meta_tags(&self) -> Result<&BTreeMap<String, String>, ResourceError> {
        if !self.is_html() {
            return Err(ResourceError::MetaTagsNotAvailableInNonHtmlContent {
                url: self.target_url.to_string(),
            });
        }
        if !self.html_parsed {
            return Err(ResourceError::MetaTagsNotAvailableInUnparsedHtml {
                url: self.target_url.to_string(),
            });
        }
        Ok(&self.meta_tags)
    }

    /// One meta tag by its `property`/`name`; `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Same as [`Page::meta_tags`].
    pub fn meta_tag(&self, key: &str) -> Result<Option<&str>, ResourceError> {
        Ok(self.meta_tags()?.get(key).map(String::as_str))
    }

    #[must_use]
    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    #[must_use]
    pub fn into_attachment(self) -> Option<Attachment> {
        self.attachment
    }
}

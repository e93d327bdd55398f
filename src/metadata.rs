//! HTML meta tag and meta-refresh extraction.
//!
//! Walks a parsed document once, in document order, collecting:
//! - the target of a `<meta http-equiv="refresh" content="delay;url=...">`
//!   directive (kept verbatim, never decoded or resolved), and
//! - every `<meta property|name="..." content="...">` pair.
//!
//! Only `<meta>` elements seen after the first `<head>` element count. The
//! in-head flag is never cleared once set, so a `<meta>` that the parser
//! placed in `<body>` still counts when a `<head>` came before it.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};
use tracing::{debug, trace};
use url::Url;

use crate::error::ResourceError;

/// Matches the `content` attribute of a meta-refresh tag, e.g. `2;url=https://example.com`.
#[allow(clippy::expect_used)]
static META_REFRESH_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d*)\s*;\s*url=(.*)$").expect("meta refresh regex is valid") // Static pattern, safe to panic
});

/// What a single traversal of an HTML document found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlMetadata {
    /// Target text of the last matching meta-refresh directive.
    pub redirect: Option<String>,
    /// `property`/`name` to `content`, last writer wins, ordered by key.
    pub meta_tags: BTreeMap<String, String>,
}

impl HtmlMetadata {
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.redirect.is_some()
    }
}

/// Reads the body of an HTML response and extracts its metadata.
///
/// The body is consumed exactly once and released before returning, whether
/// or not reading it succeeded.
///
/// # Errors
///
/// Returns [`ResourceError::BodyParse`] if the body cannot be read or decoded.
pub async fn extract_from_response(
    url: &Url,
    response: reqwest::Response,
) -> Result<HtmlMetadata, ResourceError> {
    let body = response
        .text()
        .await
        .map_err(|e| ResourceError::body_parse(url.as_str(), e))?;
    debug!(url = %url, bytes = body.len(), "parsing HTML body");
    Ok(extract_from_str(&body))
}

/// Parses `html` and extracts its metadata.
#[must_use]
pub fn extract_from_str(html: &str) -> HtmlMetadata {
    let document = Html::parse_document(html);
    extract_metadata(&document)
}

/// Extracts metadata from an already parsed document.
#[must_use]
pub fn extract_metadata(document: &Html) -> HtmlMetadata {
    let mut metadata = HtmlMetadata::default();
    let mut in_head = false;

    for node in document.tree.root().descendants() {
        let Node::Element(element) = node.value() else {
            continue;
        };
        let name = element.name();
        if name.eq_ignore_ascii_case("head") {
            in_head = true;
        }
        if in_head && name.eq_ignore_ascii_case("meta") {
            let attrs: Vec<(&str, &str)> = element.attrs().collect();
            scan_meta_attrs(&attrs, &mut metadata);
        }
    }

    metadata
}

fn content_attr<'a>(attrs: &[(&str, &'a str)]) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content"))
        .map(|(_, value)| *value)
}

fn scan_meta_attrs(attrs: &[(&str, &str)], metadata: &mut HtmlMetadata) {
    for (key, value) in attrs {
        if key.eq_ignore_ascii_case("http-equiv") && value.trim().eq_ignore_ascii_case("refresh") {
            if let Some(content) = content_attr(attrs)
                && let Some(captures) = META_REFRESH_CONTENT.captures(content.trim())
                && let Some(target) = captures.get(2)
            {
                trace!(target = target.as_str(), "meta refresh directive found");
                metadata.redirect = Some(target.as_str().to_string());
            }
        }

        if key.eq_ignore_ascii_case("property") || key.eq_ignore_ascii_case("name") {
            if let Some(content) = content_attr(attrs) {
                metadata
                    .meta_tags
                    .insert((*value).to_string(), content.to_string());
            }
        }
    }
}

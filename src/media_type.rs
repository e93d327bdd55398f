//! Content-Type classification.
//!
//! Parses a raw `Content-Type` header value into a [`MediaType`]: the raw
//! string, the lower-cased `type/subtype`, and the parameters exactly as the
//! server sent them (key case preserved).

use std::collections::BTreeMap;

use serde::Serialize;
use url::Url;

use crate::error::ResourceError;

/// Media type of HTML documents.
pub const TEXT_HTML: &str = "text/html";

/// Parameters that followed the media type, keyed verbatim.
pub type MediaTypeParams = BTreeMap<String, String>;

/// Structured decomposition of an HTTP `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaType {
    content_type: String,
    media_type: String,
    media_type_params: MediaTypeParams,
}

impl MediaType {
    /// Parses a raw header value.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MediaType`] (with empty URL context) when the
    /// value does not follow the MIME media-type grammar.
    pub fn parse(content_type: &str) -> Result<Self, ResourceError> {
        Self::parse_with_context("", content_type)
    }

    /// Parses the `Content-Type` of a response fetched from `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MediaType`] naming `url` on failure.
    pub fn classify(url: &Url, content_type: &str) -> Result<Self, ResourceError> {
        Self::parse_with_context(url.as_str(), content_type)
    }

    fn parse_with_context(context: &str, content_type: &str) -> Result<Self, ResourceError> {
        let (media_type, media_type_params) = parse_media_type(content_type)
            .map_err(|reason| ResourceError::media_type(context, content_type, reason))?;
        Ok(Self {
            content_type: content_type.to_string(),
            media_type,
            media_type_params,
        })
    }

    /// The raw header value.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The lower-cased `type/subtype`.
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    #[must_use]
    pub fn params(&self) -> &MediaTypeParams {
        &self.media_type_params
    }

    /// Looks up a parameter by its exact key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.media_type_params.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_html(&self) -> bool {
        self.media_type == TEXT_HTML
    }
}

fn is_tspecial(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '='
    )
}

fn is_token_char(c: char) -> bool {
    c.is_ascii() && !c.is_ascii_control() && c != ' ' && !is_tspecial(c)
}

/// Splits a leading token off `s`, returning `(token, rest)`.
fn consume_token(s: &str) -> (&str, &str) {
    let end = s.find(|c| !is_token_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// Splits a leading token or quoted-string value off `s`.
fn consume_value(s: &str) -> Result<(String, &str), String> {
    let Some(quoted) = s.strip_prefix('"') else {
        let (token, rest) = consume_token(s);
        if token.is_empty() {
            return Err("parameter value is empty".to_string());
        }
        return Ok((token.to_string(), rest));
    };

    let mut value = String::new();
    let mut chars = quoted.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &quoted[idx + 1..])),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            '\r' | '\n' => return Err("line break inside quoted parameter value".to_string()),
            other => value.push(other),
        }
    }
    Err("unterminated quoted parameter value".to_string())
}

fn parse_media_type(raw: &str) -> Result<(String, MediaTypeParams), String> {
    let (head, mut rest) = match raw.find(';') {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    };
    let head = head.trim();

    let (major, after_major) = consume_token(head);
    if major.is_empty() {
        return Err("media type is empty or missing its type".to_string());
    }
    let Some(after_slash) = after_major.strip_prefix('/') else {
        return Err(format!("media type {head:?} is missing '/'"));
    };
    let (minor, trailing) = consume_token(after_slash);
    if minor.is_empty() {
        return Err(format!("media type {head:?} is missing its subtype"));
    }
    if !trailing.is_empty() {
        return Err(format!("unexpected content after media type: {trailing:?}"));
    }
    let media_type = format!("{major}/{minor}").to_ascii_lowercase();

    let mut params = MediaTypeParams::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let Some(after_semicolon) = rest.strip_prefix(';') else {
            return Err(format!("expected ';' before {rest:?}"));
        };
        let after_semicolon = after_semicolon.trim_start();
        if after_semicolon.is_empty() {
            // a trailing ';' is tolerated
            break;
        }

        let (key, after_key) = consume_token(after_semicolon);
        if key.is_empty() {
            return Err(format!("invalid parameter near {after_semicolon:?}"));
        }
        let Some(after_eq) = after_key.trim_start().strip_prefix('=') else {
            return Err(format!("parameter {key:?} has no value"));
        };
        let (value, after_value) = consume_value(after_eq.trim_start())?;
        if params.insert(key.to_string(), value).is_some() {
            return Err(format!("duplicate parameter name {key:?}"));
        }
        rest = after_value;
    }

    Ok((media_type, params))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::issue::IssueCode;

    #[test]
    fn test_parse_plain_media_type() {
        let parsed = MediaType::parse("application/pdf").unwrap();
        assert_eq!(parsed.content_type(), "application/pdf");
        assert_eq!(parsed.media_type(), "application/pdf");
        assert!(parsed.params().is_empty());
        assert!(!parsed.is_html());
    }

    #[test]
    fn test_parse_html_with_charset() {
        let parsed = MediaType::parse("text/html; charset=utf-8").unwrap();
        assert!(parsed.is_html());
        assert_eq!(parsed.param("charset"), Some("utf-8"));
        assert_eq!(parsed.content_type(), "text/html; charset=utf-8");
    }

    #[test]
    fn test_media_type_is_lowercased() {
        let parsed = MediaType::parse("Text/HTML").unwrap();
        assert_eq!(parsed.media_type(), "text/html");
        assert!(parsed.is_html());
        assert_eq!(parsed.content_type(), "Text/HTML");
    }

    #[test]
    fn test_param_keys_preserved_verbatim() {
        let parsed = MediaType::parse("text/plain; CharSet=ISO-8859-1; Format=Flowed").unwrap();
        assert_eq!(parsed.param("CharSet"), Some("ISO-8859-1"));
        assert_eq!(parsed.param("Format"), Some("Flowed"));
        assert_eq!(parsed.param("charset"), None);
    }

    #[test]
    fn test_quoted_parameter_value() {
        let parsed =
            MediaType::parse(r#"multipart/form-data; boundary="a b\"c;d""#).unwrap();
        assert_eq!(parsed.param("boundary"), Some(r#"a b"c;d"#));
    }

    #[test]
    fn test_trailing_semicolon_tolerated() {
        let parsed = MediaType::parse("text/html;").unwrap();
        assert_eq!(parsed.media_type(), "text/html");
    }

    #[test]
    fn test_missing_subtype_is_error() {
        let err = MediaType::parse("text/").unwrap_err();
        assert_eq!(err.code(), IssueCode::UnableToClassifyMediaType);
    }

    #[test]
    fn test_missing_slash_is_error() {
        assert!(MediaType::parse("html").is_err());
    }

    #[test]
    fn test_empty_is_error() {
        assert!(MediaType::parse("").is_err());
        assert!(MediaType::parse("   ").is_err());
    }

    #[test]
    fn test_duplicate_parameter_is_error() {
        assert!(MediaType::parse("text/html; charset=utf-8; charset=latin1").is_err());
    }

    #[test]
    fn test_parameter_without_value_is_error() {
        assert!(MediaType::parse("text/html; charset").is_err());
        assert!(MediaType::parse("text/html; charset=").is_err());
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        assert!(MediaType::parse(r#"text/html; charset="utf-8"#).is_err());
    }

    #[test]
    fn test_classify_carries_url_context() {
        let url = Url::parse("https://example.com/page").unwrap();
        let err = MediaType::classify(&url, "not a type").unwrap_err();
        assert_eq!(err.context(), "https://example.com/page");
    }

    #[test]
    fn test_classification_is_idempotent() {
        let raw = "text/html; charset=UTF-8; q=\"0.9\"";
        assert_eq!(MediaType::parse(raw).unwrap(), MediaType::parse(raw).unwrap());
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let parsed = MediaType::parse("text/html; charset=utf-8").unwrap();
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["mediaType"], "text/html");
        assert_eq!(json["mediaTypeParams"]["charset"], "utf-8");
    }
}

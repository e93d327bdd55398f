//! Structured issue vocabulary shared by every resolution step.
//!
//! An [`Issue`] is the plain record form of a problem: where it happened
//! (usually the offending URL), a stable [`IssueCode`], a human message and a
//! [`Severity`]. Fatal problems travel as [`ResourceError`](crate::ResourceError)
//! and convert into an `Issue` for display; advisory problems are delivered
//! as `Issue` values to the configured [`WarningSink`](crate::WarningSink).

use std::fmt;

use serde::Serialize;
use tracing::warn;

/// Whether an issue aborts the current resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fatal to the current resolution.
    Error,
    /// Advisory; a (possibly partial) result is still produced.
    Warning,
}

/// Closed set of stable issue codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    TargetUrlIsBlank,
    TargetUrlIsNil,
    NilResponse,
    UnableToCreateHttpRequest,
    UnableToExecuteHttpGetRequest,
    /// Carries the HTTP status that was actually returned.
    InvalidHttpRespStatusCode(u16),
    UnableToParseHttpBody,
    UnableToClassifyMediaType,
    UnableToCreateDestination,
    CopyErrorDuringFileDownload,
    MetaTagsNotAvailableInNonHtmlContent,
    MetaTagsNotAvailableInUnparsedHtml,
    UnableToInspectFileType,
    DownloadFailed,
}

impl IssueCode {
    /// Base code text, without the HTTP status suffix.
    #[must_use]
    pub fn base_code(self) -> &'static str {
        match self {
            Self::TargetUrlIsBlank => "RESOURCE_E-0050",
            Self::TargetUrlIsNil => "RESOURCE_E-0051",
            Self::NilResponse => "RESOURCE_E-0052",
            Self::UnableToCreateHttpRequest => "RESOURCE_E-0100",
            Self::UnableToExecuteHttpGetRequest => "RESOURCE_E-0200",
            Self::InvalidHttpRespStatusCode(_) => "RESOURCE_E-0300",
            Self::UnableToParseHttpBody => "RESOURCE_E-0400",
            Self::UnableToClassifyMediaType => "RESOURCE_E-0500",
            Self::UnableToCreateDestination => "RESOURCE_E-0600",
            Self::CopyErrorDuringFileDownload => "RESOURCE_E-0700",
            Self::MetaTagsNotAvailableInNonHtmlContent => "RESOURCE_W-0100",
            Self::MetaTagsNotAvailableInUnparsedHtml => "RESOURCE_W-0101",
            Self::UnableToInspectFileType => "RESOURCE_S-0200",
            Self::DownloadFailed => "RESOURCE_W-0300",
        }
    }

    /// Severity implied by the code.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::MetaTagsNotAvailableInNonHtmlContent
            | Self::MetaTagsNotAvailableInUnparsedHtml
            | Self::UnableToInspectFileType
            | Self::DownloadFailed => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHttpRespStatusCode(status) => {
                write!(f, "{}-HTTP-{status}", self.base_code())
            }
            other => f.write_str(other.base_code()),
        }
    }
}

impl Serialize for IssueCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A structured problem identification with context information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    context: String,
    code: IssueCode,
    message: String,
    severity: Severity,
}

impl Issue {
    /// Creates an issue whose severity is derived from its code.
    pub fn new(context: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            code,
            message: message.into(),
            severity: code.severity(),
        }
    }

    /// Where the issue happened, typically the URL being resolved.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    #[must_use]
    pub fn code(&self) -> IssueCode {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.code, self.message, self.context)
    }
}

/// Receives advisory issues raised while resolving.
pub trait WarningSink: Send + Sync {
    fn on_warning(&self, issue: &Issue);
}

impl<F> WarningSink for F
where
    F: Fn(&Issue) + Send + Sync,
{
    fn on_warning(&self, issue: &Issue) {
        self(issue);
    }
}

/// Drops every warning. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardWarnings;

impl WarningSink for DiscardWarnings {
    fn on_warning(&self, _issue: &Issue) {}
}

/// Forwards warnings to `tracing` at WARN level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogWarnings;

impl WarningSink for LogWarnings {
    fn on_warning(&self, issue: &Issue) {
        warn!(
            code = %issue.code(),
            context = issue.context(),
            "{}",
            issue.message()
        );
    }
}

//! Default User-Agent string for resolver HTTP clients.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/lectio/resource";

/// Default User-Agent sent with every resolve request unless overridden.
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("content-resolver/{version} (+{PROJECT_UA_URL})")
}

//! Default HTTP client construction for resolutions.
//!
//! Centralizes networking defaults (timeout, user-agent, compression, proxy
//! compatibility) for the client used when the caller supplies none.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::{debug, warn};

use super::policy::HttpClientProvider;
use crate::error::ResourceError;

/// Default overall request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Builds one reqwest client on first use and shares it afterwards.
#[derive(Debug)]
pub struct DefaultHttpClientProvider {
    user_agent: String,
    timeout: Duration,
    client: OnceLock<Client>,
}

impl DefaultHttpClientProvider {
    #[must_use]
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
            client: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HttpClientProvider for DefaultHttpClientProvider {
    fn http_client(&self) -> Result<Client, ResourceError> {
        if let Some(client) = self.client.get() {
            return Ok(client.clone());
        }
        let built = build_http_client(&self.user_agent, self.timeout)?;
        Ok(self.client.get_or_init(|| built).clone())
    }
}

/// Builds a client with the given user-agent and overall timeout.
///
/// # Errors
///
/// Returns [`ResourceError::HttpClient`] when client construction fails.
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, ResourceError> {
    match try_build_client(user_agent, timeout, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings; retry with env proxies only.
            warn!("HTTP client hit system proxy panic; using env-proxy fallback builder");
            match try_build_client(user_agent, timeout, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(ResourceError::HttpClient {
                    reason: "client construction panicked".to_string(),
                }),
                Err(BuildClientFailure::Build(error)) => Err(ResourceError::HttpClient {
                    reason: error.to_string(),
                }),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(ResourceError::HttpClient {
            reason: error.to_string(),
        }),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    user_agent: &str,
    timeout: Duration,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let user_agent = user_agent.to_string();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(user_agent, timeout);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(user_agent: String, timeout: Duration) -> ClientBuilder {
    debug!(user_agent = %user_agent, timeout_secs = timeout.as_secs(), "building HTTP client");
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
        .timeout(timeout)
        .user_agent(user_agent)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    for (scheme, names) in [
        ("https", ["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        ("http", ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
    ] {
        let Some(proxy) = first_env_value(&names) else {
            continue;
        };
        let resolved = if scheme == "https" {
            Proxy::https(&proxy)
        } else {
            Proxy::http(&proxy)
        };
        if let Ok(resolved) = resolved {
            builder = builder.proxy(resolved);
        }
    }
    builder
}

fn first_env_value(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

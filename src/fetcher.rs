use lazy_static::lazy_static;
use regex::Regex;
use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;

use crate::error::{Result, ViewerError};

/// Timeout of a single workbook download.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

lazy_static! {
    static ref TLS_FAILURE: Regex =
        Regex::new(r"(?i)certificate|tls|ssl|handshake|unknownissuer").unwrap();
}

/// Source of raw workbook bytes.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Downloads workbooks over HTTP(S).
///
/// Certificates are verified. When verification fails on an `https://` URL
/// the download is retried once over plain `http://`.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ViewerError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(HttpFetcher { client })
    }

    async fn get_bytes(&self, url: &str) -> std::result::Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        match self.get_bytes(url).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if is_tls_failure(&err) => match insecure_fallback_url(url) {
                Some(fallback) => {
                    log::warn!(
                        "TLS verification failed for {}, retrying over {}",
                        url,
                        fallback
                    );
                    self.get_bytes(&fallback)
                        .await
                        .map_err(|e| fetch_error(&fallback, &e))
                }
                None => Err(fetch_error(url, &err)),
            },
            Err(err) => Err(fetch_error(url, &err)),
        }
    }
}

fn fetch_error(url: &str, err: &reqwest::Error) -> ViewerError {
    ViewerError::Fetch {
        url: url.to_string(),
        reason: error_chain(err),
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Whether a request failed because the TLS handshake or certificate check failed.
pub fn is_tls_failure(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_status() {
        return false;
    }
    // The top-level message embeds the URL, so only the causes are inspected.
    let mut source = err.source();
    while let Some(cause) = source {
        if TLS_FAILURE.is_match(&cause.to_string()) {
            return true;
        }
        source = cause.source();
    }
    false
}

/// The `http://` twin of an `https://` URL; `None` for any other scheme.
pub fn insecure_fallback_url(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    if url[..scheme_end].eq_ignore_ascii_case("https") {
        Some(format!("http{}", &url[scheme_end..]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_only_for_https() {
        assert_eq!(
            insecure_fallback_url("https://example.com/data/book.xlsx").as_deref(),
            Some("http://example.com/data/book.xlsx")
        );
        assert_eq!(
            insecure_fallback_url("HTTPS://example.com/a").as_deref(),
            Some("http://example.com/a")
        );
        assert_eq!(insecure_fallback_url("http://example.com/a"), None);
        assert_eq!(insecure_fallback_url("example.com/a"), None);
    }
}

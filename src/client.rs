//! HTTP submission of encoded payloads.
//!
//! See [`SubmissionClient`] for details.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use url::Url;

/// Content type announced for every payload.
pub const CONTENT_TYPE_PROMETHEUS: &str = "application/vnd.sumologic.prometheus";

/// Header carrying the source category.
pub const HEADER_CATEGORY: &str = "X-Sumo-Category";
/// Header carrying the source name.
pub const HEADER_NAME: &str = "X-Sumo-Name";
/// Header carrying the source host.
pub const HEADER_HOST: &str = "X-Sumo-Host";
/// Header carrying the client name.
pub const HEADER_CLIENT: &str = "X-Sumo-Client";

/// Static metadata sent along with every payload.
///
/// Empty values are not sent at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceHeaders {
    /// Value of `X-Sumo-Category`.
    pub category: String,
    /// Value of `X-Sumo-Name`.
    pub name: String,
    /// Value of `X-Sumo-Host`.
    pub host: String,
    /// Value of `X-Sumo-Client`.
    pub client: String,
}

impl SourceHeaders {
    fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (HEADER_CATEGORY, self.category.as_str()),
            (HEADER_NAME, self.name.as_str()),
            (HEADER_HOST, self.host.as_str()),
            (HEADER_CLIENT, self.client.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }
}

/// Invalid bridge or client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No target URL was given.
    #[error("empty target url")]
    EmptyUrl,
    /// The target URL could not be parsed.
    #[error("invalid target url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The target URL is not an `http` or `https` URL.
    #[error("unsupported url scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),
    /// The HTTP transport could not be built.
    #[error("building http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// A failed submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The request did not complete: connection failure, timeout, ...
    #[error("sending request: {0}")]
    Transport(#[from] reqwest::Error),
    /// The endpoint answered with a status outside of `[200, 300)`.
    #[error("non-2xx response code: {0}")]
    Status(StatusCode),
}

/// Posts payloads to a single endpoint.
///
/// Redirects are never followed, a `3xx` answer counts as a failure. Every
/// call to [`SubmissionClient::submit`] makes exactly one attempt.
#[derive(Debug, Clone)]
pub struct SubmissionClient {
    url: Url,
    headers: SourceHeaders,
    http: reqwest::Client,
}

impl SubmissionClient {
    /// Create a client for `url` whose requests are bounded by `timeout`.
    pub fn new(url: &str, timeout: Duration, headers: SourceHeaders) -> Result<Self, ConfigError> {
        if url.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        let url = Url::parse(url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_owned()));
        }

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(ConfigError::Client)?;

        Ok(Self { url, headers, http })
    }

    /// The target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Post `payload`.
    pub async fn submit(&self, payload: Vec<u8>) -> Result<(), SubmitError> {
        let mut request = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_PROMETHEUS);
        for (name, value) in self.headers.iter() {
            request = request.header(name, value);
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        drop(response);

        tracing::debug!(%status, url = %self.url, "payload submitted");

        if status.is_success() {
            Ok(())
        } else {
            Err(SubmitError::Status(status))
        }
    }
}

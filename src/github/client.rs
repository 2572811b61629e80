// GitHub HTTP client.
// Sends identifying headers, applies the upstream timeout, and maps failures to not-found.

use std::time::Duration;

use reqwest::{
    Client, RequestBuilder, Response, Url,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};

use crate::config::Config;
use crate::error::{Error, Result};

const GITHUB_API_VERSION: &str = "2022-11-28";
const CLIENT_USER_AGENT: &str = concat!("mdcache/", env!("CARGO_PKG_VERSION"));

/// Client for the raw-content host and the REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    raw_base: Url,
    api_base: Url,
}

impl GitHubClient {
    /// Create a client against explicit endpoint bases.
    pub fn new(
        raw_base: &str,
        api_base: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::Config(format!("invalid GitHub token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            raw_base: parse_base(raw_base)?,
            api_base: parse_base(api_base)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.raw_base,
            &config.api_base,
            config.github_token.as_deref(),
            config.upstream_timeout,
        )
    }

    /// URL on the raw-content host built from path segments.
    pub fn raw_url<'a, I>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        join_segments(&self.raw_base, segments)
    }

    /// URL on the REST API built from path segments.
    pub fn api_url<'a, I>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        join_segments(&self.api_base, segments)
    }

    /// GET a raw-content URL.
    pub async fn get_raw(&self, url: Url) -> Result<Response> {
        self.send(self.client.get(url.clone()), &url).await
    }

    /// GET a REST API URL with query parameters.
    pub async fn get_api<T: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        params: &T,
    ) -> Result<Response> {
        let request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .query(params);
        self.send(request, &url).await
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response> {
        let response = match request.send().await {
            Ok(response) => response,
            // A timed out attempt counts as absent; cached entries stay intact
            Err(e) if e.is_timeout() => {
                tracing::warn!(%url, "upstream request timed out");
                return Err(Error::NotFound(url.to_string()));
            }
            Err(e) => return Err(Error::Upstream(e)),
        };

        check_response(response)
    }
}

/// Any non-success status means the upstream resource is unavailable.
fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::debug!(url = %response.url(), %status, "upstream returned non-success");
        Err(Error::NotFound(format!("{} ({})", response.url(), status)))
    }
}

fn parse_base(base: &str) -> Result<Url> {
    let url = Url::parse(base)
        .map_err(|e| Error::Config(format!("invalid base URL {}: {}", base, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("{} cannot be a base URL", base)));
    }
    Ok(url)
}

fn join_segments<'a, I>(base: &Url, segments: I) -> Result<Url>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::Other(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

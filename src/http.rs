//! HTTP transfer seam used by the download path.
//!
//! Downloads go through this trait rather than calling reqwest directly, so
//! the per-product pipeline can be exercised against in-memory fakes.
//!
//! Redirects are followed by hand. The archive bounces downloads through an
//! auth host on a different origin, and a client-level redirect policy drops
//! the Authorization header on a cross-origin hop, so each hop re-applies
//! the operator's credentials before the request is sent.

use anyhow::{anyhow, bail, Result};
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use log::debug;
use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{Method, StatusCode};
use url::Url;

pub type ByteStream = BoxStream<'static, Result<Bytes>>;

const MAX_REDIRECTS: usize = 10;

pub trait HttpOps {
    /// Size of the remote object in bytes, when the server reports one.
    async fn content_length(self: &Self, url: &Url) -> Result<Option<u64>>;

    /// Stream the object body starting at `start_byte` (for resuming a
    /// partial transfer; 0 fetches the whole object). Redirects are followed.
    async fn get_from(self: &Self, url: &Url, start_byte: u64) -> Result<ByteStream>;
}

/// reqwest-backed implementation, optionally carrying archive credentials.
pub struct HttpClient {
    client: reqwest::Client,
    credentials: Option<(String, String)>,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_credentials(username: &str, password: &str) -> Self {
        Self::build(Some((username.to_string(), password.to_string())))
    }

    fn build(credentials: Option<(String, String)>) -> Self {
        // Redirects are handled in send() so credentials survive each hop.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Client with static configuration should always build");
        Self {
            client,
            credentials,
        }
    }

    fn apply_auth(self: &Self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some((user, pass)) => req.basic_auth(user, Some(pass)),
            None => req,
        }
    }

    async fn send(
        self: &Self,
        method: Method,
        url: &Url,
        range: Option<String>,
    ) -> Result<reqwest::Response> {
        let mut url = url.clone();
        for _ in 0..MAX_REDIRECTS {
            let mut req = self.client.request(method.clone(), url.clone());
            if let Some(range) = &range {
                req = req.header(RANGE, range.clone());
            }
            let response = self.apply_auth(req).send().await?;

            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .ok_or_else(|| anyhow!("redirect without Location header from {}", url))?
                    .to_str()?;
                url = url.join(location)?;
                debug!("Following redirect to {}", url);
                continue;
            }
            return Ok(response.error_for_status()?);
        }
        bail!("too many redirects fetching {}", url)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpOps for HttpClient {
    async fn content_length(self: &Self, url: &Url) -> Result<Option<u64>> {
        if let Ok(response) = self.send(Method::HEAD, url, None).await {
            if let Some(len) = header_content_length(&response) {
                if len > 0 {
                    return Ok(Some(len));
                }
            }
        }

        // Some endpoints answer HEAD without a length or reject it outright;
        // probe with a one-byte ranged GET instead.
        let response = self
            .send(Method::GET, url, Some("bytes=0-0".to_string()))
            .await?;
        if response.status() == StatusCode::PARTIAL_CONTENT {
            return Ok(content_range_total(response.headers().get(CONTENT_RANGE)));
        }
        Ok(header_content_length(&response))
    }

    async fn get_from(self: &Self, url: &Url, start_byte: u64) -> Result<ByteStream> {
        let range = (start_byte > 0).then(|| format!("bytes={}-", start_byte));
        let response = self.send(Method::GET, url, range).await?;
        Ok(response
            .bytes_stream()
            .map_err(anyhow::Error::from)
            .boxed())
    }
}

fn header_content_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Total from a `Content-Range: bytes 0-0/12345` header; `*` means unknown.
fn content_range_total(header: Option<&HeaderValue>) -> Option<u64> {
    header?.to_str().ok()?.rsplit('/').next()?.parse().ok()
}

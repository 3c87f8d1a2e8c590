use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::{OptionsRequest, OptionsResponse, OptionsTransport, SearchRequest};

/// JSON-over-HTTP transport. Non-2xx statuses are errors.
pub struct HttpTransport {
    client: Client,
    base: Option<Url>,
}

impl HttpTransport {
    pub fn new(base_url: Option<&str>, timeout: Option<Duration>) -> Result<Self> {
        let base = base_url
            .map(|b| Url::parse(b).with_context(|| format!("invalid base url {}", b)))
            .transpose()?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("building http client")?;
        Ok(Self { client, base })
    }

    /// Absolute endpoints pass through; relative ones need a base.
    pub fn resolve(&self, endpoint: &str) -> Result<Url> {
        match Url::parse(endpoint) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .base
                    .as_ref()
                    .ok_or_else(|| anyhow!("relative endpoint {} without base url", endpoint))?;
                Ok(base.join(endpoint)?)
            }
            Err(e) => Err(anyhow!("invalid endpoint {}: {}", endpoint, e)),
        }
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.resolve(endpoint)?;
        let resp = self.client.post(url.clone()).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned status {}", url, status.as_u16()));
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("decoding response from {}", url))
    }
}

#[async_trait::async_trait]
impl OptionsTransport for HttpTransport {
    async fn fetch_options(&self, endpoint: &str, req: &OptionsRequest) -> Result<OptionsResponse> {
        self.post_json(endpoint, req).await
    }

    async fn search_options(&self, endpoint: &str, req: &SearchRequest) -> Result<Vec<String>> {
        self.post_json(endpoint, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_against_base() {
        let t = HttpTransport::new(Some("http://localhost:5000/dashboard/"), None).unwrap();
        assert_eq!(
            t.resolve("/options/meterid").unwrap().as_str(),
            "http://localhost:5000/options/meterid"
        );
        assert_eq!(
            t.resolve("filters/options").unwrap().as_str(),
            "http://localhost:5000/dashboard/filters/options"
        );
    }

    #[test]
    fn test_resolve_absolute_passthrough() {
        let t = HttpTransport::new(None, None).unwrap();
        assert_eq!(
            t.resolve("https://example.org/filters/options").unwrap().as_str(),
            "https://example.org/filters/options"
        );
        assert!(t.resolve("/filters/options").is_err());
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        assert!(HttpTransport::new(Some("not a url"), None).is_err());
    }
}

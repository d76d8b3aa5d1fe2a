//! Client for an external server-side rendering endpoint.

use http::StatusCode;
use http::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::SsrConfig;

#[derive(Error, Debug)]
pub enum SsrError {
    #[error("SSR request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("SSR invalid response status code: {0}")]
    Status(StatusCode),
}

/// Rendered page returned by the SSR endpoint.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SsrResponse {
    #[serde(default)]
    pub head: Vec<String>,
    #[serde(default)]
    pub body: String,
}

impl SsrResponse {
    /// Head fragments joined into one block of markup.
    pub fn head_markup(&self) -> String {
        self.head.join("\n")
    }
}

#[derive(Clone, Debug)]
pub struct SsrClient {
    client: reqwest::Client,
    url: Url,
}

impl SsrClient {
    pub fn new(url: Url) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: Url, client: reqwest::Client) -> Self {
        SsrClient {
            client,
            url: render_url(url),
        }
    }

    pub fn from_config(config: &SsrConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self::with_client(config.url.clone(), builder.build()?))
    }

    /// Full URL of the render endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Posts the marshaled page and decodes the rendered markup.
    pub async fn render(&self, page_json: Vec<u8>) -> Result<SsrResponse, SsrError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(page_json)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= StatusCode::BAD_REQUEST.as_u16() {
            return Err(SsrError::Status(status));
        }

        Ok(response.json::<SsrResponse>().await?)
    }
}

/// Points `url` at the render endpoint, whether or not it already names it.
fn render_url(mut url: Url) -> Url {
    let path = url.path().replace("/render", "");
    url.set_path(&format!("{}/render", path.trim_end_matches('/')));
    url
}

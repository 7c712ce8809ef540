use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ClientError;

/// Shared HTTP transport: one connection pool, one cookie jar, one base URL.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    base_url: String,
}

impl Transport {
    /// Build a transport rooted at `base_url` (e.g. `http://host:3000/api`).
    /// Cookies set by the backend are sent back on later requests.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "backend request");
        self.http.request(method, url)
    }
}

/// A decoded response body together with its status and headers.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: T,
}

impl<T> Reply<T> {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
}

/// Turn a raw response into a [`Reply`], mapping 401 and other failures.
pub async fn decode<T: DeserializeOwned>(response: Response) -> Result<Reply<T>, ClientError> {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
            .ok()
            .and_then(|envelope| envelope.message);

        tracing::debug!(%status, ?message, "backend request failed");

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized { message });
        }
        return Err(ClientError::Status {
            status,
            message: message.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            }),
        });
    }

    // An empty 2xx body decodes as JSON `null`.
    let body = if bytes.is_empty() {
        serde_json::from_value(serde_json::Value::Null)?
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok(Reply {
        status,
        headers,
        body,
    })
}

//! Cover image generation against an OpenAI-compatible images endpoint.

use async_trait::async_trait;
use bookshelf_kernel::settings::ImageSettings;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// What a cover is generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverPrompt {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
}

impl CoverPrompt {
    pub fn render(&self) -> String {
        let category = self.category.as_deref().unwrap_or("general");
        format!(
            "Title: {}\nDescription: {}\nCreate a single book cover that suits the {} category, \
             based on the content above.\nUse a clean hardcover style with no empty space.",
            self.title, self.description, category
        )
    }
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one cover and return its URL.
    async fn generate(&self, prompt: &CoverPrompt, api_key: &str) -> Result<String, ClientError>;
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: String,
    size: &'a str,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct ServiceError {
    #[serde(default)]
    message: Option<String>,
}

/// Calls the image service directly with the user's own credential.
#[derive(Debug, Clone)]
pub struct OpenAiImages {
    http: Client,
    settings: ImageSettings,
}

impl OpenAiImages {
    pub fn new(http: Client, settings: ImageSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImages {
    async fn generate(&self, prompt: &CoverPrompt, api_key: &str) -> Result<String, ClientError> {
        let request = GenerationRequest {
            model: &self.settings.model,
            prompt: prompt.render(),
            size: &self.settings.size,
        };

        tracing::info!(
            endpoint = %self.settings.endpoint,
            model = %self.settings.model,
            "requesting cover image"
        );

        let response = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body: GenerationResponse = serde_json::from_slice(&response.bytes().await?)?;

        if let Some(error) = body.error {
            let message = error
                .message
                .unwrap_or_else(|| format!("image service returned {status}"));
            tracing::warn!(%status, %message, "cover generation rejected");
            return Err(ClientError::ImageService(message));
        }

        body.data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .ok_or_else(|| ClientError::ImageService("response carried no image url".to_string()))
    }
}

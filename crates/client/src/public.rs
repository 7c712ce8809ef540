use reqwest::Method;

use crate::error::ClientError;
use crate::models::{ApiResponse, BookPage};
use crate::transport::{decode, Reply, Transport};

/// Client for routes that need no credentials. Never sends a token.
#[derive(Debug, Clone)]
pub struct PublicClient {
    transport: Transport,
}

impl PublicClient {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// `GET /books/search?title&page&size`. Pages are 1-based.
    pub async fn search(&self, title: &str, page: u32, size: u32) -> Result<BookPage, ClientError> {
        let response = self
            .transport
            .request(Method::GET, "/books/search")
            .query(&[
                ("title", title.to_string()),
                ("page", page.to_string()),
                ("size", size.to_string()),
            ])
            .send()
            .await?;
        let reply: Reply<ApiResponse<BookPage>> = decode(response).await?;
        Ok(reply.body.data.unwrap_or_default())
    }

    /// `GET /books?page&size`. Pages are 1-based.
    pub async fn list_books(&self, page: u32, size: u32) -> Result<BookPage, ClientError> {
        let response = self
            .transport
            .request(Method::GET, "/books")
            .query(&[("page", page), ("size", size)])
            .send()
            .await?;
        let reply: Reply<ApiResponse<BookPage>> = decode(response).await?;
        Ok(reply.body.data.unwrap_or_default())
    }
}

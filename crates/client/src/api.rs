//! Authenticated client for the `/auth`, `/categories` and `/books` routes.

use std::sync::Arc;

use bookshelf_session::{bearer_token, SessionStore};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;
use crate::models::{
    ApiResponse, BookDetail, BookRef, BookSubmission, Category, Credentials,
    DeleteAccountRequest, DeleteBookResponse, LoginOutcome, LoginResponse, SignupRequest,
    UpdateUserRequest, UserInfo, UserProfile,
};
use crate::transport::{decode, Reply, Transport};
use crate::API_KEY_HEADER;

/// Attaches the session's bearer token to every request.
///
/// A 401 from any call clears the session before the error is returned, so
/// the caller sees the user as logged out.
#[derive(Clone)]
pub struct ApiClient {
    transport: Transport,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(transport: Transport, session: Arc<dyn SessionStore>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Reply<T>, ClientError> {
        let builder = match self.session.token() {
            Ok(Some(token)) => builder.bearer_auth(token),
            Ok(None) => builder,
            Err(err) => {
                tracing::warn!(error = %err, "session unreadable; sending without token");
                builder
            }
        };

        let result = decode(builder.send().await?).await;

        if let Err(ClientError::Unauthorized { .. }) = &result {
            tracing::info!("backend rejected credentials; clearing session");
            if let Err(err) = self.session.clear() {
                tracing::warn!(error = %err, "failed to clear session");
            }
        }

        result
    }

    /// `POST /auth/login`. The access token is taken from the
    /// `authorization` response header, minus its `Bearer ` prefix.
    pub async fn login(&self, id: &str, pw: &str) -> Result<LoginOutcome, ClientError> {
        let credentials = Credentials {
            id: id.to_string(),
            pw: pw.to_string(),
        };
        let reply: Reply<LoginResponse> = self
            .send(
                self.transport
                    .request(Method::POST, "/auth/login")
                    .json(&credentials),
            )
            .await?;

        let access_token = reply
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        Ok(LoginOutcome {
            result: reply.body,
            access_token,
        })
    }

    pub async fn logout(&self) -> Result<Value, ClientError> {
        let reply = self
            .send(self.transport.request(Method::POST, "/auth/logout"))
            .await?;
        Ok(reply.body)
    }

    /// `POST /auth/signup`, forwarding the optional image credential as
    /// the `API-KEY` header.
    pub async fn signup(
        &self,
        request: &SignupRequest,
        api_key: Option<&str>,
    ) -> Result<ApiResponse<Value>, ClientError> {
        let mut builder = self
            .transport
            .request(Method::POST, "/auth/signup")
            .json(request);
        if let Some(key) = api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        Ok(self.send(builder).await?.body)
    }

    pub async fn delete_account(&self, pw: &str) -> Result<ApiResponse<Value>, ClientError> {
        let body = DeleteAccountRequest { pw: pw.to_string() };
        let reply = self
            .send(
                self.transport
                    .request(Method::POST, "/auth/delete")
                    .json(&body),
            )
            .await?;
        Ok(reply.body)
    }

    pub async fn user_info(&self) -> Result<Reply<UserInfo>, ClientError> {
        self.send(self.transport.request(Method::GET, "/auth/user-info"))
            .await
    }

    /// User info with the `api-key` header folded in.
    pub async fn user_profile(&self) -> Result<UserProfile, ClientError> {
        let reply = self.user_info().await?;
        let api_key = reply
            .header(API_KEY_HEADER)
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        Ok(UserProfile {
            id: reply.body.id,
            name: reply.body.name,
            api_key,
        })
    }

    /// `PATCH /auth/update`.
    pub async fn update_user(
        &self,
        request: &UpdateUserRequest,
        api_key: Option<&str>,
    ) -> Result<ApiResponse<Value>, ClientError> {
        let mut builder = self
            .transport
            .request(Method::PATCH, "/auth/update")
            .json(request);
        if let Some(key) = api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        Ok(self.send(builder).await?.body)
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        let reply: Reply<ApiResponse<Vec<Category>>> = self
            .send(self.transport.request(Method::GET, "/categories"))
            .await?;
        Ok(reply.body.data.unwrap_or_default())
    }

    pub async fn create_book(
        &self,
        submission: &BookSubmission,
    ) -> Result<Reply<ApiResponse<BookRef>>, ClientError> {
        self.send(
            self.transport
                .request(Method::POST, "/books/create")
                .json(submission),
        )
        .await
    }

    pub async fn book_detail(&self, book_id: i64) -> Result<ApiResponse<BookDetail>, ClientError> {
        let path = format!("/books/detail/{book_id}");
        let reply = self.send(self.transport.request(Method::GET, &path)).await?;
        Ok(reply.body)
    }

    pub async fn update_book(
        &self,
        book_id: i64,
        submission: &BookSubmission,
    ) -> Result<Reply<ApiResponse<BookRef>>, ClientError> {
        let path = format!("/books/update/{book_id}");
        self.send(self.transport.request(Method::PUT, &path).json(submission))
            .await
    }

    pub async fn delete_book(
        &self,
        book_id: i64,
    ) -> Result<ApiResponse<DeleteBookResponse>, ClientError> {
        let path = format!("/books/delete/{book_id}");
        let reply = self
            .send(self.transport.request(Method::DELETE, &path))
            .await?;
        Ok(reply.body)
    }
}

use serde::{Deserialize, Serialize};

/// Standard backend envelope: `{ status, message, data }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .filter(|message| !message.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub id: String,
    pub pw: String,
}

/// Body of a login response. The token itself travels in the
/// `authorization` header.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl LoginResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub result: LoginResponse,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub id: String,
    pub pw: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteAccountRequest {
    pub pw: String,
}

/// Fields left `None` are not changed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pw: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.pw.is_none()
    }
}

/// Flat body of `/auth/user-info`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub id: String,
    pub name: String,
}

/// User info plus the credential from the `api-key` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub category_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    pub book_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    pub category_id: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    pub owner_user: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookItem {
    pub book_id: i64,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One page of a listing or a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub books: Vec<BookItem>,
}

/// Body for both `/books/create` and `/books/update/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSubmission {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub image_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRef {
    pub book_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBookResponse {
    pub book_id: i64,
    pub deleted: u32,
}

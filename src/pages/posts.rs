//! Book post pages: create, edit, view and delete, plus cover generation.

use bookshelf_client::models::{BookDetail, BookSubmission, Category};
use bookshelf_client::{ClientError, CoverPrompt};
use bookshelf_events::Toast;

use super::{describe, Outcome, PageCtx, View, LOGIN_REQUIRED};

/// Unvalidated form state of a post being written or edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: Option<Category>,
    pub image_url: Option<String>,
}

impl PostDraft {
    /// Title, description, content and category are all filled in.
    pub fn has_text_fields(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.description.trim().is_empty()
            && !self.content.trim().is_empty()
            && self.category.is_some()
    }

    /// The body to publish, or `None` while anything (the image included)
    /// is missing.
    pub fn submission(&self) -> Option<BookSubmission> {
        if !self.has_text_fields() {
            return None;
        }
        let category = self.category.as_ref()?;
        let image_url = self.image_url.as_deref().filter(|url| !url.is_empty())?;
        Some(BookSubmission {
            title: self.title.clone(),
            description: self.description.clone(),
            content: self.content.clone(),
            category_id: category.category_id,
            category_name: Some(category.name.clone()),
            image_url: image_url.to_string(),
        })
    }

    fn cover_prompt(&self) -> CoverPrompt {
        CoverPrompt {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.as_ref().map(|category| category.name.clone()),
        }
    }
}

/// A draft together with the category choices and the cover trigger state.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub draft: PostDraft,
    categories: Vec<Category>,
    generating: bool,
}

impl PostForm {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            draft: PostDraft::default(),
            categories,
            generating: false,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Select a category by id. Unknown ids clear the selection.
    pub fn select_category(&mut self, category_id: i64) -> bool {
        self.draft.category = self
            .categories
            .iter()
            .find(|category| category.category_id == category_id)
            .cloned();
        self.draft.category.is_some()
    }

    /// Whether a cover request is in flight. The trigger is disabled while
    /// it is.
    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Claim the cover trigger. Returns the prompt to send, or `None` (with
    /// a toast) when fields are missing or a request is already in flight.
    pub fn begin_cover(&mut self, ctx: &PageCtx) -> Option<CoverPrompt> {
        if self.generating {
            ctx.toast(Toast::warning("A cover is already being generated."));
            return None;
        }
        if !self.draft.has_text_fields() {
            ctx.toast(Toast::warning(
                "Fill in the title, description, content and category first.",
            ));
            return None;
        }
        self.generating = true;
        self.draft.image_url = None;
        Some(self.draft.cover_prompt())
    }

    /// Release the cover trigger with the generation result. A failure
    /// leaves the draft without an image.
    pub fn finish_cover(&mut self, ctx: &PageCtx, result: Result<String, ClientError>) {
        self.generating = false;
        match result {
            Ok(url) => {
                self.draft.image_url = Some(url);
                ctx.toast(Toast::success("Cover image generated!"));
            }
            Err(err) => {
                tracing::warn!(error = %err, "cover generation failed");
                ctx.toast(Toast::danger(describe(&err, "Cover image generation failed.")));
            }
        }
    }

    /// Generate a cover with the user's own image service credential.
    /// Returns whether the draft now has an image.
    pub async fn generate_cover(&mut self, ctx: &PageCtx) -> bool {
        let Some(prompt) = self.begin_cover(ctx) else {
            return false;
        };

        let api_key = match ctx.api.user_profile().await {
            Ok(profile) => profile.api_key,
            Err(err) => {
                self.finish_cover(ctx, Err(err));
                return false;
            }
        };
        let Some(api_key) = api_key else {
            self.generating = false;
            ctx.toast(Toast::warning(
                "No API key is registered. Add one on your profile.",
            ));
            return false;
        };

        let result = ctx.images.generate(&prompt, &api_key).await;
        self.finish_cover(ctx, result);
        self.draft.image_url.is_some()
    }
}

/// A loaded post plus whether the current user owns it.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub detail: BookDetail,
    pub is_owner: bool,
}

async fn load_categories(ctx: &PageCtx) -> Vec<Category> {
    match ctx.api.categories().await {
        Ok(categories) => categories,
        Err(err) => {
            tracing::warn!(error = %err, "failed to load categories");
            ctx.toast(Toast::danger("Could not load categories."));
            Vec::new()
        }
    }
}

/// Id of the logged-in user, or an empty string when it cannot be fetched.
async fn current_user_id(ctx: &PageCtx) -> String {
    match ctx.api.user_info().await {
        Ok(reply) => reply.body.id,
        Err(err) => {
            tracing::debug!(error = %err, "no current user");
            String::new()
        }
    }
}

async fn fetch_detail(ctx: &PageCtx, book_id: i64) -> Option<BookDetail> {
    match ctx.api.book_detail(book_id).await {
        Ok(response) if response.is_success() => match response.data {
            Some(detail) => Some(detail),
            None => {
                ctx.toast(Toast::danger("This book does not exist."));
                None
            }
        },
        Ok(response) => {
            ctx.toast(Toast::danger(response.message_or("This book does not exist.")));
            None
        }
        Err(err) => {
            tracing::warn!(book_id, error = %err, "failed to load book detail");
            ctx.toast(Toast::danger(describe(&err, "Could not load this book.")));
            None
        }
    }
}

pub async fn open_new(ctx: &PageCtx) -> Outcome<PostForm> {
    if !ctx.require_login() {
        return Outcome::navigate(View::Home);
    }
    Outcome::show(PostForm::new(load_categories(ctx).await))
}

pub async fn open_edit(ctx: &PageCtx, book_id: i64) -> Outcome<PostForm> {
    if !ctx.require_login() {
        return Outcome::navigate(View::Home);
    }

    let mut form = PostForm::new(load_categories(ctx).await);
    let Some(detail) = fetch_detail(ctx, book_id).await else {
        return Outcome::navigate(View::Home);
    };

    form.draft.title = detail.title;
    form.draft.description = detail.description;
    form.draft.content = detail.content;
    form.draft.image_url = detail.image_url.filter(|url| !url.is_empty());
    form.select_category(detail.category_id);
    Outcome::show(form)
}

fn complete_submission(ctx: &PageCtx, form: &PostForm) -> Option<BookSubmission> {
    let submission = form.draft.submission();
    if submission.is_none() {
        ctx.toast(Toast::warning(
            "Fill in every field and generate a cover image first.",
        ));
    }
    submission
}

pub async fn submit_new(ctx: &PageCtx, form: &PostForm) -> View {
    if !ctx.require_login() {
        return View::Home;
    }
    let Some(submission) = complete_submission(ctx, form) else {
        return View::Stay;
    };
    if !ctx
        .confirm
        .confirm("New post", "Publish this post with the current content?")
    {
        return View::Stay;
    }

    match ctx.api.create_book(&submission).await {
        Ok(reply) if reply.status.is_success() => {
            tracing::info!(
                book_id = reply.body.data.as_ref().map(|book| book.book_id),
                "book created"
            );
            ctx.toast(Toast::success("Your post has been published!"));
            View::Home
        }
        Ok(reply) => {
            ctx.toast(Toast::danger(reply.body.message_or("Publishing failed.")));
            View::Stay
        }
        Err(err) if err.is_unauthorized() => {
            ctx.toast(Toast::danger(LOGIN_REQUIRED));
            View::Login
        }
        Err(err) => {
            tracing::warn!(error = %err, "book creation failed");
            ctx.toast(Toast::danger(describe(&err, "Publishing failed.")));
            View::Stay
        }
    }
}

pub async fn submit_edit(ctx: &PageCtx, book_id: i64, form: &PostForm) -> View {
    if !ctx.require_login() {
        return View::Home;
    }
    let Some(submission) = complete_submission(ctx, form) else {
        return View::Stay;
    };
    if !ctx
        .confirm
        .confirm("Edit post", "Save your changes to this post?")
    {
        return View::Stay;
    }

    match ctx.api.update_book(book_id, &submission).await {
        Ok(reply) if reply.status.is_success() => {
            ctx.toast(Toast::success("Your post has been updated!"));
            View::PostView(book_id)
        }
        Ok(reply) => {
            ctx.toast(Toast::danger(reply.body.message_or("Update failed.")));
            View::Stay
        }
        Err(err) if err.is_unauthorized() => {
            ctx.toast(Toast::danger(LOGIN_REQUIRED));
            View::Login
        }
        Err(err) => {
            tracing::warn!(book_id, error = %err, "book update failed");
            ctx.toast(Toast::danger(describe(&err, "Update failed.")));
            View::Stay
        }
    }
}

pub async fn view(ctx: &PageCtx, book_id: i64) -> Outcome<PostPage> {
    let Some(detail) = fetch_detail(ctx, book_id).await else {
        return Outcome::navigate(View::Home);
    };
    let is_owner = current_user_id(ctx).await == detail.owner_user;
    Outcome::show(PostPage { detail, is_owner })
}

pub async fn delete(ctx: &PageCtx, book_id: i64) -> View {
    let Some(detail) = fetch_detail(ctx, book_id).await else {
        return View::Home;
    };
    if current_user_id(ctx).await != detail.owner_user {
        ctx.toast(Toast::danger("You can only delete books you posted."));
        return View::PostView(book_id);
    }
    if !ctx
        .confirm
        .confirm("Delete post", "Delete this post? This cannot be undone.")
    {
        return View::PostView(book_id);
    }

    match ctx.api.delete_book(book_id).await {
        Ok(response) if response.is_success() => {
            ctx.toast(Toast::success("Deleted."));
            View::Home
        }
        Ok(response) => {
            ctx.toast(Toast::danger(response.message_or("Deletion failed.")));
            View::PostView(book_id)
        }
        Err(err) => {
            tracing::warn!(book_id, error = %err, "book deletion failed");
            ctx.toast(Toast::danger(describe(&err, "Deletion failed.")));
            View::PostView(book_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<Category> {
        vec![
            Category {
                category_id: 1,
                name: "Fantasy".into(),
            },
            Category {
                category_id: 2,
                name: "History".into(),
            },
        ]
    }

    fn filled() -> PostForm {
        let mut form = PostForm::new(categories());
        form.draft.title = "Dune".into();
        form.draft.description = "Desert planet".into();
        form.draft.content = "Spice".into();
        form.select_category(2);
        form
    }

    #[test]
    fn select_category_by_id() {
        let mut form = PostForm::new(categories());
        assert!(form.select_category(1));
        assert_eq!(form.draft.category.as_ref().unwrap().name, "Fantasy");
        assert!(!form.select_category(9));
        assert!(form.draft.category.is_none());
    }

    #[test]
    fn submission_requires_an_image() {
        let mut form = filled();
        assert!(form.draft.has_text_fields());
        assert!(form.draft.submission().is_none());

        form.draft.image_url = Some(String::new());
        assert!(form.draft.submission().is_none());

        form.draft.image_url = Some("https://img/cover.png".into());
        let submission = form.draft.submission().unwrap();
        assert_eq!(submission.category_id, 2);
        assert_eq!(submission.category_name.as_deref(), Some("History"));
        assert_eq!(submission.image_url, "https://img/cover.png");
    }

    #[test]
    fn blank_text_fields_are_missing() {
        let mut form = filled();
        form.draft.content = "   ".into();
        assert!(!form.draft.has_text_fields());
    }

    #[test]
    fn cover_prompt_uses_category_name() {
        let prompt = filled().draft.cover_prompt();
        assert_eq!(prompt.title, "Dune");
        assert_eq!(prompt.category.as_deref(), Some("History"));
    }
}

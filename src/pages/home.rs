//! Home page: the book listing.

use bookshelf_client::models::BookPage;
use bookshelf_events::Toast;

use super::{describe, Outcome, PageCtx};

/// List page `page` (1-based) of all books.
pub async fn home(ctx: &PageCtx, page: u32) -> Outcome<BookPage> {
    let page = page.max(1);
    match ctx.public.list_books(page, ctx.list_page_size).await {
        Ok(books) => Outcome::show(books),
        Err(err) => {
            tracing::warn!(page, error = %err, "failed to list books");
            ctx.toast(Toast::danger(describe(&err, "Could not load books.")));
            Outcome::show(BookPage::default())
        }
    }
}

//! Keyword search over book titles.

use bookshelf_client::models::BookPage;
use bookshelf_events::Toast;

use super::{describe, non_blank, Outcome, PageCtx, View};

/// Search for `keyword` and return page `page` (1-based) of the results.
/// A blank keyword goes back home without touching the backend.
pub async fn search(ctx: &PageCtx, keyword: &str, page: u32) -> Outcome<BookPage> {
    let Some(keyword) = non_blank(keyword) else {
        ctx.toast(Toast::warning("Enter a search keyword."));
        return Outcome::navigate(View::Home);
    };
    let page = page.max(1);

    match ctx.public.search(keyword, page, ctx.search_page_size).await {
        Ok(results) => {
            tracing::debug!(keyword, page, total = results.total_items, "search complete");
            Outcome::show(results)
        }
        Err(err) => {
            tracing::warn!(keyword, page, error = %err, "search failed");
            ctx.toast(Toast::danger(describe(&err, "Search failed.")));
            Outcome::show(BookPage::default())
        }
    }
}

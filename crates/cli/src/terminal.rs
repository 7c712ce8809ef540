//! Terminal rendering of toasts, prompts and page data.

use std::io::{self, BufRead, Write};

use bookshelf_app::{Confirm, View};
use bookshelf_client::models::{BookDetail, BookPage, Category, UserProfile};
use bookshelf_events::{Toast, ToastRenderer};

/// Prints each toast on its own line. Clearing is a no-op on a terminal.
#[derive(Debug, Default)]
pub struct TerminalToasts;

impl ToastRenderer for TerminalToasts {
    fn show(&mut self, toast: &Toast) {
        println!("{toast}");
    }

    fn clear(&mut self) {}
}

/// Asks on stdin unless `--yes` was given.
#[derive(Debug)]
pub struct StdinConfirm {
    assume_yes: bool,
}

impl StdinConfirm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&self, title: &str, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{title}: {message} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read confirmation");
                false
            }
        }
    }
}

pub fn print_books(page: &BookPage) {
    if page.books.is_empty() {
        println!("No books found.");
        return;
    }
    for book in &page.books {
        println!(
            "#{:<6} {} [{}]",
            book.book_id,
            book.title,
            book.category.as_deref().unwrap_or("uncategorized")
        );
    }
    println!(
        "page {} of {} ({} books)",
        page.page,
        page.total_pages.max(1),
        page.total_items
    );
}

pub fn print_detail(detail: &BookDetail, is_owner: bool) {
    println!("{}", detail.title);
    println!("by {}", detail.owner_user);
    if let Some(created_at) = &detail.created_at {
        println!("posted {created_at}");
    }
    if let Some(updated_at) = &detail.updated_at {
        println!("updated {updated_at}");
    }
    if let Some(image_url) = &detail.image_url {
        println!("cover {image_url}");
    }
    println!();
    println!("{}", detail.description);
    println!();
    println!("{}", detail.content);
    if is_owner {
        println!();
        println!(
            "You posted this book: `bookshelf post edit {0}` or `bookshelf post delete {0}`.",
            detail.book_id
        );
    }
}

pub fn print_profile(profile: &UserProfile) {
    println!("id      {}", profile.id);
    println!("name    {}", profile.name);
    println!(
        "api key {}",
        if profile.api_key.is_some() { "registered" } else { "none" }
    );
}

pub fn print_categories(categories: &[Category]) {
    println!("categories:");
    for category in categories {
        println!("  {:<4} {}", category.category_id, category.name);
    }
}

/// Tell the user where the page would navigate next.
pub fn print_next(view: View) {
    let hint = match view {
        View::Home => "bookshelf home".to_string(),
        View::Login => "bookshelf login --id <ID> --pw <PW>".to_string(),
        View::Profile => "bookshelf profile".to_string(),
        View::PostView(id) => format!("bookshelf post view {id}"),
        View::PostEdit(id) => format!("bookshelf post edit {id}"),
        View::Stay => return,
    };
    eprintln!("next: {hint}");
}

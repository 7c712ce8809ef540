mod terminal;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bookshelf_app::pages::{auth, home, posts, profile, search};
use bookshelf_app::{PageCtx, View};
use bookshelf_client::{ApiClient, OpenAiImages, PublicClient, Transport};
use bookshelf_events::{PendingToastStore, ToastChannel};
use bookshelf_kernel::settings::Settings;
use bookshelf_session::FileSessionStore;
use clap::{Args, Parser, Subcommand};

use terminal::{StdinConfirm, TerminalToasts};

#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(about = "Book catalogue client and request proxy")]
struct Cli {
    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the request proxy server
    Serve,
    /// List all books
    Home {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Log in and store the session token
    Login {
        #[arg(long)]
        id: String,
        #[arg(long)]
        pw: String,
    },
    /// Log out and forget the session token
    Logout,
    /// Create an account
    Signup {
        #[arg(long)]
        id: String,
        #[arg(long)]
        pw: String,
        #[arg(long)]
        pw_confirm: String,
        #[arg(long)]
        name: String,
        /// Image service credential used for cover generation
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Delete the current account
    Unregister {
        #[arg(long)]
        pw: String,
    },
    /// Show the profile, or update it when any field is given
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        pw: Option<String>,
        #[arg(long)]
        pw_confirm: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Create, edit, view or delete a book post
    #[command(subcommand)]
    Post(PostCommand),
    /// Search books by title
    Search {
        keyword: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Subcommand)]
enum PostCommand {
    /// Publish a new post
    New(DraftArgs),
    /// Edit an existing post
    Edit {
        id: i64,
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Show a post
    View { id: i64 },
    /// Delete a post you own
    Delete { id: i64 },
}

#[derive(Args)]
struct DraftArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    content: Option<String>,
    /// Category id
    #[arg(long)]
    category: Option<i64>,
    /// Generate a cover with your registered API key
    #[arg(long)]
    generate_cover: bool,
    /// Use an existing cover image
    #[arg(long, conflicts_with = "generate_cover")]
    image_url: Option<String>,
}

impl DraftArgs {
    fn apply(&self, form: &mut posts::PostForm) {
        if let Some(title) = &self.title {
            form.draft.title = title.clone();
        }
        if let Some(description) = &self.description {
            form.draft.description = description.clone();
        }
        if let Some(content) = &self.content {
            form.draft.content = content.clone();
        }
        if let Some(category) = self.category {
            if !form.select_category(category) {
                tracing::warn!(category, "unknown category id");
            }
        }
        if let Some(image_url) = &self.image_url {
            form.draft.image_url = Some(image_url.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load Bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => bookshelf_app::server::run(&settings).await,
        command => run_page(&settings, command, cli.yes).await,
    }
}

fn page_ctx(
    settings: &Settings,
    channel: Arc<ToastChannel>,
    assume_yes: bool,
) -> anyhow::Result<PageCtx> {
    let state_dir = &settings.client.state_dir;
    let session = Arc::new(FileSessionStore::new(state_dir));
    let transport =
        Transport::new(&settings.client.base_url).context("failed to build HTTP client")?;

    Ok(PageCtx {
        api: ApiClient::new(transport.clone(), session.clone()),
        public: PublicClient::new(transport),
        session,
        notifier: channel,
        pending: PendingToastStore::new(state_dir),
        confirm: Arc::new(StdinConfirm::new(assume_yes)),
        images: Arc::new(OpenAiImages::new(
            reqwest::Client::new(),
            settings.images.clone(),
        )),
        search_page_size: settings.client.search_page_size,
        list_page_size: settings.client.list_page_size,
    })
}

/// Run one page. Each invocation is a full navigation: the pending toast of
/// the previous one is replayed first.
async fn run_page(settings: &Settings, command: Command, assume_yes: bool) -> anyhow::Result<()> {
    let channel = Arc::new(ToastChannel::new());
    let display = channel
        .display(
            TerminalToasts,
            Duration::from_millis(settings.ui.toast_duration_ms),
        )
        .context("toast display already taken")?;
    let display = tokio::spawn(display.run());

    let ctx = page_ctx(settings, channel.clone(), assume_yes)?;
    ctx.enter();
    let view = dispatch(&ctx, command).await;

    // The display finishes once every publisher is gone.
    drop(ctx);
    drop(channel);
    display.await.context("toast display task failed")?;

    terminal::print_next(view);
    Ok(())
}

async fn dispatch(ctx: &PageCtx, command: Command) -> View {
    match command {
        Command::Serve => View::Stay,
        Command::Home { page } => {
            let outcome = home::home(ctx, page).await;
            if let Some(books) = &outcome.data {
                terminal::print_books(books);
            }
            outcome.view
        }
        Command::Login { id, pw } => auth::login(ctx, &id, &pw).await,
        Command::Logout => auth::logout(ctx).await,
        Command::Signup {
            id,
            pw,
            pw_confirm,
            name,
            api_key,
        } => {
            let form = auth::SignupForm {
                id,
                pw,
                pw_confirm,
                name,
                api_key,
            };
            auth::signup(ctx, &form).await
        }
        Command::Unregister { pw } => auth::unregister(ctx, &pw).await,
        Command::Profile {
            name,
            pw,
            pw_confirm,
            api_key,
        } => {
            if name.is_none() && pw.is_none() && pw_confirm.is_none() && api_key.is_none() {
                let outcome = profile::load(ctx).await;
                if let Some(user) = &outcome.data {
                    terminal::print_profile(user);
                }
                return outcome.view;
            }
            let update = profile::ProfileUpdate {
                name,
                pw,
                pw_confirm,
                api_key,
            };
            profile::update(ctx, &update).await
        }
        Command::Post(post) => dispatch_post(ctx, post).await,
        Command::Search { keyword, page } => {
            let outcome = search::search(ctx, &keyword, page).await;
            if let Some(results) = &outcome.data {
                terminal::print_books(results);
            }
            outcome.view
        }
    }
}

async fn dispatch_post(ctx: &PageCtx, command: PostCommand) -> View {
    match command {
        PostCommand::New(args) => {
            let outcome = posts::open_new(ctx).await;
            let Some(mut form) = outcome.data else {
                return outcome.view;
            };
            args.apply(&mut form);
            if form.draft.category.is_none() {
                terminal::print_categories(form.categories());
            }
            if args.generate_cover {
                form.generate_cover(ctx).await;
            }
            posts::submit_new(ctx, &form).await
        }
        PostCommand::Edit { id, draft } => {
            let outcome = posts::open_edit(ctx, id).await;
            let Some(mut form) = outcome.data else {
                return outcome.view;
            };
            draft.apply(&mut form);
            if draft.generate_cover {
                form.generate_cover(ctx).await;
            }
            posts::submit_edit(ctx, id, &form).await
        }
        PostCommand::View { id } => {
            let outcome = posts::view(ctx, id).await;
            if let Some(page) = &outcome.data {
                terminal::print_detail(&page.detail, page.is_owner);
            }
            outcome.view
        }
        PostCommand::Delete { id } => posts::delete(ctx, id).await,
    }
}

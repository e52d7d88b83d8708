//! Headless command-line front end for the Murmur feed.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use murmur_client::{
    init_tracing, ClientConfig, Draft, FeedStatus, LikeOutcome, LoadOutcome, MurmurApp,
    SharedItem,
};
use murmur_shared::constants::APP_NAME;
use murmur_shared::{FileSessionStore, Item, SessionStore, UserId};

#[derive(Parser, Debug)]
#[command(name = "murmur", version, about = "Read and write the Murmur feed")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a bearer credential
    Login { token: String },
    /// Forget the stored credential
    Logout,
    /// Show who the stored credential belongs to
    Whoami,
    /// Print the newest posts
    Feed {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Toggle the like on a post
    Like {
        id: String,
        /// How many pages to search for the post
        #[arg(long, default_value_t = 5)]
        pages: usize,
    },
    /// Print a user's posts (yours when no user is given)
    Profile { user: Option<String> },
    /// Publish a post
    Post {
        content: String,
        #[arg(long)]
        media: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    info!("Starting {} client v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    let store: Arc<dyn SessionStore> = match &config.session_path {
        Some(path) => Arc::new(FileSessionStore::open_at(path)),
        None => Arc::new(FileSessionStore::new().context("No place to keep the session")?),
    };
    let app = MurmurApp::new(config, store)?;

    match cli.command {
        Command::Login { token } => match app.login(&token)? {
            Some(identity) => println!("Logged in as {}", identity.subject_id),
            None => bail!("Credential stored but it does not carry a usable identity"),
        },
        Command::Logout => {
            app.logout()?;
            println!("Logged out");
        }
        Command::Whoami => match app.session.current_identity() {
            Some(identity) => match identity.expires_at {
                Some(exp) => println!("{} (expires {})", identity.subject_id, exp.to_rfc3339()),
                None => println!("{}", identity.subject_id),
            },
            None => println!("Not logged in"),
        },
        Command::Feed { pages } => {
            load_pages(&app, pages).await?;
            for item in app.feed.items() {
                print_item(&item.snapshot());
            }
        }
        Command::Like { id, pages } => {
            let item = find_item(&app, &id, pages).await?;
            match app.likes.toggle_like(&item).await {
                LikeOutcome::Confirmed(state) => {
                    let verb = if state.liked { "Liked" } else { "Unliked" };
                    println!("{verb} {id} ({} likes)", state.count);
                }
                LikeOutcome::RolledBack { error, .. } => bail!("Like failed: {error}"),
            }
        }
        Command::Profile { user } => {
            let profile = match user {
                Some(user) => app.open_profile(UserId::new(user)),
                None => match app.open_own_profile() {
                    Some(profile) => profile,
                    None => bail!("Not logged in: name a user or log in first"),
                },
            };
            profile.load().await;
            let snapshot = profile.snapshot();
            if let Some(error) = snapshot.error {
                return Err(error).context("Loading the profile failed");
            }
            let whose = if snapshot.own { " (you)" } else { "" };
            println!("{}{}: {} posts", snapshot.user, whose, snapshot.items.len());
            for item in &snapshot.items {
                print_item(item);
            }
        }
        Command::Post { content, media } => {
            let mut draft = Draft::new(content);
            if let Some(media) = media {
                draft = draft.with_media(media);
            }
            let item = app.composer.publish(draft).await?;
            println!("Published {}", item.id());
        }
    }

    Ok(())
}

/// Load up to `pages` pages, stopping early once the feed is exhausted.
async fn load_pages(app: &MurmurApp, pages: usize) -> anyhow::Result<()> {
    for _ in 0..pages {
        match app.feed.load_more().await {
            LoadOutcome::Failed(e) => return Err(e).context("Loading the feed failed"),
            LoadOutcome::Exhausted => break,
            _ => {}
        }
        if app.feed.status() == FeedStatus::Exhausted {
            break;
        }
    }
    info!(items = app.feed.items().len(), "Feed loaded");
    Ok(())
}

async fn find_item(app: &MurmurApp, id: &str, pages: usize) -> anyhow::Result<SharedItem> {
    for _ in 0..pages {
        if let Ok(item) = app.item(id) {
            return Ok(item);
        }
        match app.feed.load_more().await {
            LoadOutcome::Failed(e) => return Err(e).context("Loading the feed failed"),
            LoadOutcome::Exhausted => break,
            _ => {}
        }
    }
    Ok(app.item(id)?)
}

fn print_item(item: &Item) {
    let liked = if item.liked_by_current_user { "*" } else { " " };
    println!(
        "{} {} @{} {}",
        item.created_at.format("%Y-%m-%d %H:%M"),
        item.id,
        item.author_name,
        item.content
    );
    println!(
        "  {liked} {} likes  {} replies{}",
        item.like_count,
        item.reply_count,
        item.media_ref
            .as_deref()
            .map(|m| format!("  [{m}]"))
            .unwrap_or_default()
    );
}

//! `goweli`: manage the book list from a terminal, or run the HTTP API.

mod commands;
mod prompt;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use goweli_app::modules::books::models::SearchField;
use goweli_kernel::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "goweli", version, about = "Personal book tracker")]
struct Cli {
    /// Database URL, overriding configuration (e.g. sqlite::memory:)
    #[arg(long, global = true, value_name = "URL")]
    database: Option<String>,

    /// Show info-level logs on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve,

    /// List books
    List {
        /// Only books marked as read
        #[arg(long, conflicts_with = "unread")]
        read: bool,

        /// Only books not yet read
        #[arg(long)]
        unread: bool,
    },

    /// Show one book
    Show { id: i64 },

    /// Add a book, picking a cover from OpenLibrary
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        author: String,

        #[arg(long)]
        isbn: Option<String>,

        #[arg(long)]
        synopsis: Option<String>,

        /// Mark as already read
        #[arg(long)]
        read: bool,

        /// Use this cover instead of searching
        #[arg(long, value_name = "URL", conflicts_with = "no_cover")]
        cover_url: Option<String>,

        /// Skip the cover search
        #[arg(long)]
        no_cover: bool,

        /// Take the first real cover without asking
        #[arg(long)]
        accept_first: bool,
    },

    /// Change fields of a book
    Edit {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        author: Option<String>,

        /// Empty string clears the ISBN
        #[arg(long)]
        isbn: Option<String>,

        #[arg(long)]
        synopsis: Option<String>,

        #[arg(long, value_name = "URL")]
        cover_url: Option<String>,

        #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
        read: Option<bool>,
    },

    /// Flip the read flag
    ToggleRead { id: i64 },

    /// Delete a book
    Delete { id: i64 },

    /// Case-insensitive substring search
    Search {
        text: String,

        /// Column to search
        #[arg(long, value_enum, default_value_t = SearchBy::Title)]
        by: SearchBy,
    },

    /// List cover candidates for a title
    Covers { title: String },

    /// Write every book as JSON
    Export {
        /// Output file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Add books from an export file
    Import { file: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SearchBy {
    Title,
    Author,
    Isbn,
}

impl From<SearchBy> for SearchField {
    fn from(by: SearchBy) -> Self {
        match by {
            SearchBy::Title => SearchField::Title,
            SearchBy::Author => SearchField::Author,
            SearchBy::Isbn => SearchField::Isbn,
        }
    }
}

fn settings_for(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::load().context("failed to load Goweli settings")?;
    if let Some(url) = &cli.database {
        settings.database.url = url.clone();
    }
    if !cli.verbose && !matches!(cli.command, Command::Serve) {
        settings.telemetry.filter = "warn".to_string();
    }
    Ok(settings)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = settings_for(&cli)?;
    goweli_telemetry::init(&settings.telemetry)?;

    let app = goweli_app::App::bootstrap(settings).await?;
    commands::dispatch(app, cli.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::{CollisionPolicy, LibraryConfig, get_storage_root};
use crate::error::ValidationError;
use crate::ingest::ProgressEvent;
use crate::library::ConversationLibrary;
use crate::models::{MatchLocation, SearchOptions, SearchScope};
use crate::utils::{epoch_to_datetime, sanitize_terminal_text};

#[derive(Parser)]
#[command(name = "chatvault")]
#[command(version = "0.1.0")]
#[command(about = "Import, browse and search chat-export archives", long_about = None)]
pub struct Cli {
    /// Storage root (defaults to $CHATVAULT_HOME, then the platform data directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Overwrite conversation files that already exist in the set
    #[arg(long, global = true)]
    pub overwrite: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a chat-export zip archive as a conversation-set
    Ingest {
        archive: PathBuf,
        /// Set name (defaults to the archive file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List imported conversation-sets
    Sets,
    /// List conversations in a set, most recently active first
    List { set: String },
    /// Print one conversation
    Show {
        set: String,
        conversation: String,
        /// Print sanitized HTML bodies instead of plain text
        #[arg(long)]
        html: bool,
    },
    /// Search conversations in a set
    Search {
        set: String,
        query: String,
        /// Where to match: title, content or all
        #[arg(long, default_value_t = SearchScope::All)]
        scope: SearchScope,
        /// Only conversations active on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = &cli.command else {
        println!("Use --help for usage information");
        return Ok(());
    };

    let library = open_library(&cli)?;
    match command {
        Commands::Ingest { archive, name } => ingest(&library, archive, name.as_deref())?,
        Commands::Sets => show_sets(&library)?,
        Commands::List { set } => list_conversations(&library, set)?,
        Commands::Show { set, conversation, html } => show_conversation(&library, set, conversation, *html)?,
        Commands::Search { set, query, scope, since, limit } => {
            let options = SearchOptions { scope: *scope, since: *since, limit: *limit };
            search(&library, set, query, &options)?;
        }
    }

    Ok(())
}

fn open_library(cli: &Cli) -> Result<ConversationLibrary> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => get_storage_root()?,
    };
    let policy = if cli.overwrite { CollisionPolicy::Overwrite } else { CollisionPolicy::Skip };
    tracing::debug!(root = %root.display(), ?policy, "opening library");

    Ok(ConversationLibrary::new(LibraryConfig::new(root).with_collision_policy(policy)))
}

fn ingest(library: &ConversationLibrary, archive: &Path, name: Option<&str>) -> Result<()> {
    let size = fs::metadata(archive)
        .with_context(|| format!("Failed to read archive: {}", archive.display()))?
        .len();
    let limit = library.config().limits.max_archive_bytes;
    if size > limit {
        bail!("{}", ValidationError::Oversize { size, limit }.user_message());
    }

    let bytes =
        fs::read(archive).with_context(|| format!("Failed to read archive: {}", archive.display()))?;
    let set_name = match name {
        Some(name) => name.to_string(),
        None => archive
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let progress = |event: ProgressEvent| {
        eprintln!("[{:>3}%] {}", event.percentage, event.message);
    };

    let report = match library.ingest_archive(&bytes, &set_name, &progress) {
        Ok(report) => report,
        Err(e) => bail!("{}", e.user_message()),
    };

    println!("Imported into set: {}", report.set_id);
    println!("  Conversations written: {}", report.split.processed);
    println!("  Skipped (already present): {}", report.split.skipped);
    println!("  Unreadable records: {}", report.split.errors);
    println!("  Media files: {}", report.media_files);
    println!("  Asset index: {:?}", report.asset_index_source);

    Ok(())
}

fn show_sets(library: &ConversationLibrary) -> Result<()> {
    let sets = library.list_sets()?;
    if sets.is_empty() {
        println!("No conversation-sets imported yet");
        return Ok(());
    }
    for set in sets {
        println!("{}", set);
    }
    Ok(())
}

fn list_conversations(library: &ConversationLibrary, set: &str) -> Result<()> {
    let summaries = library.list_conversations(set)?;

    println!("{} conversations", summaries.len());
    for summary in summaries {
        let when = summary
            .recency()
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "----------------".to_string());
        println!(
            "{}  {}  {} ({} messages)",
            when,
            sanitize_terminal_text(&summary.id, false),
            sanitize_terminal_text(&summary.title, false),
            summary.message_count
        );
    }
    Ok(())
}

fn show_conversation(library: &ConversationLibrary, set: &str, conversation: &str, html: bool) -> Result<()> {
    let transcript = library.get_conversation(set, conversation)?;

    println!("{}", sanitize_terminal_text(&transcript.title, false));
    println!("{}", "=".repeat(transcript.title.chars().count().clamp(3, 80)));

    for message in &transcript.messages {
        println!();
        let when = message
            .create_time
            .and_then(epoch_to_datetime)
            .map(|at| format!(" [{}]", at.format("%Y-%m-%d %H:%M:%S")))
            .unwrap_or_default();
        println!("{}{}:", sanitize_terminal_text(&message.author_label, false), when);

        let body = if html { &message.html } else { &message.text };
        println!("{}", sanitize_terminal_text(body, true));
    }
    Ok(())
}

fn search(library: &ConversationLibrary, set: &str, query: &str, options: &SearchOptions) -> Result<()> {
    let results = library.search_conversations(set, query, options)?;

    println!("{} results", results.len());
    for result in results {
        let score = result.relevance_score.map(|s| format!("[{}] ", s)).unwrap_or_default();
        println!(
            "{}{}  {}",
            score,
            sanitize_terminal_text(&result.summary.id, false),
            sanitize_terminal_text(&result.summary.title, false)
        );
        for found in &result.matches {
            let location = match &found.location {
                MatchLocation::Title => "title".to_string(),
                MatchLocation::Message { role, .. } => role.clone(),
            };
            println!(
                "    {} ({}x): {}",
                sanitize_terminal_text(&location, false),
                found.hits,
                sanitize_terminal_text(&found.snippet, false)
            );
        }
    }
    Ok(())
}

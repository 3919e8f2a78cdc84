use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use oracle_deck::card::{Deck, DrawError, ReadingMode};
use oracle_deck::reading::http::{BackendError, HttpBackend};
use oracle_deck::reading::sanitize::unescape_html;
use oracle_deck::reading::storage::{FileStorage, StorageError};
use oracle_deck::reading::{JournalStore, Reading, ReadingAssembler};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("backend setup failed: {0}")]
    Backend(#[from] BackendError),
    #[error("journal storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("draw failed: {0}")]
    Draw(#[from] DrawError),
    #[error("reading task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "oracle", about = "Draw oracle card readings from the terminal")]
struct Cli {
    #[arg(long, env = "ORACLE_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "ORACLE_JOURNAL_DIR", default_value = ".oracle")]
    journal_dir: PathBuf,

    #[arg(long, default_value_t = false, help = "Print readings as JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    /// Shuffle the deck, draw, and record a reading.
    Draw {
        #[arg(long, default_value = "single")]
        mode: ReadingMode,
    },
    Journal(JournalCommand),
    /// List the cards in the deck.
    Deck,
}

#[derive(Args, Debug)]
struct JournalCommand {
    #[command(subcommand)]
    command: JournalSubcommand,
}

#[derive(Subcommand, Debug)]
enum JournalSubcommand {
    List,
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::WARN)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Draw { mode } => run_draw(&cli.base_url, open_journal(&cli.journal_dir)?, mode, cli.json).await,
        Command::Journal(journal) => {
            let store = open_journal(&cli.journal_dir)?;
            match journal.command {
                JournalSubcommand::List => run_journal_list(&store, cli.json),
                JournalSubcommand::Clear => {
                    store.clear();
                    println!("journal cleared");
                    Ok(())
                }
            }
        }
        Command::Deck => {
            for card in Deck::standard().cards() {
                println!("{:>3}  {:<14} {}", card.id, card.name, card.description);
            }
            Ok(())
        }
    }
}

fn open_journal(dir: &Path) -> Result<JournalStore, CliError> {
    let storage = FileStorage::open(dir)?;
    Ok(JournalStore::new(Arc::new(storage)))
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let status = reqwest::get(url).await?.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_draw(base_url: &str, journal: JournalStore, mode: ReadingMode, json: bool) -> Result<(), CliError> {
    let mut deck = Deck::standard();
    let draw = deck.draw(mode, &mut rand::rng())?;

    let backend = Arc::new(HttpBackend::new(base_url)?);
    let assembler = ReadingAssembler::new(backend, Arc::new(journal));
    let reading = assembler.spawn(draw).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reading)?);
    } else {
        print_reading(&reading, false);
        match &reading.image_url {
            Some(url) => println!("image: generated ({} bytes, not saved to the journal)", url.len()),
            None if mode == ReadingMode::Single => println!("image: unavailable"),
            None => {}
        }
    }
    Ok(())
}

fn run_journal_list(journal: &JournalStore, json: bool) -> Result<(), CliError> {
    let readings = journal.load();
    if json {
        println!("{}", serde_json::to_string_pretty(&readings)?);
        return Ok(());
    }
    if readings.is_empty() {
        println!("journal is empty");
    }
    for reading in &readings {
        print_reading(reading, true);
        println!();
    }
    Ok(())
}

fn print_reading(reading: &Reading, stored: bool) {
    for line in reading_lines(reading, stored) {
        println!("{line}");
    }
}

/// Display lines for a reading. Journal entries are stored HTML-escaped and
/// are unescaped here; freshly generated readings are shown as they are.
fn reading_lines(reading: &Reading, stored: bool) -> Vec<String> {
    let plain = |text: &str| if stored { unescape_html(text) } else { text.to_string() };
    let positions: &[&str] = match reading.mode {
        ReadingMode::Single => &["card"],
        ReadingMode::Three => &["past", "present", "future"],
    };
    let mut lines = vec![format!("{}  ({} card, {})", reading.timestamp, reading.mode, reading.id)];
    for (i, card) in reading.cards.iter().enumerate() {
        let label = positions.get(i).copied().unwrap_or("card");
        let text = reading.message_for(i).unwrap_or_default();
        let fallback = if matches!(reading.messages.get(i), Some(Some(_))) { "" } else { " (card message)" };
        lines.push(format!("  {label:<8} {}{fallback}", plain(&card.name)));
        lines.push(format!("           {}", plain(text)));
    }
    lines
}

//! Knards CLI
//!
//! Command-line interface over the knards card store: plan revision
//! sessions, inspect tag statistics, grade reviews and reorder series.

use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use knards_core::{
    CardFilter, CardId, Grade, NewCard, NewPartial, OwnerId, PartialType, RenumberRequest,
    RevisionConfig, RevisionPlanner, SeriesId, Storage, StorageError, TagId, TagInclusion,
    DEFAULT_PAGE_SIZE,
};
use tracing_subscriber::EnvFilter;

/// Knards - flashcard revision CLI
#[derive(Parser)]
#[command(name = "knards")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the knards flashcard revision engine")]
#[command(long_about = "Plans revision sessions over a knards card store.\n\nDue cards are ordered by urgency, shuffled within equal urgency, and series are always studied as one block.")]
struct Cli {
    /// Database file (defaults to $KNARDS_DB_PATH, then the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Card selection shared by the read commands
#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Only cards of this series
    #[arg(long)]
    series: Option<i64>,
    /// Tag ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    tags: Vec<i64>,
    /// Require every listed tag instead of any of them
    #[arg(long)]
    all_tags: bool,
    /// Case-insensitive search in card titles
    #[arg(long)]
    search: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> CardFilter {
        let inclusion = if self.all_tags {
            TagInclusion::All
        } else {
            TagInclusion::Any
        };
        let mut filter =
            CardFilter::new().with_tags(self.tags.iter().copied().map(TagId), inclusion);
        if let Some(series) = self.series {
            filter = filter.in_series(SeriesId(series));
        }
        if let Some(text) = &self.search {
            filter = filter.with_fulltext(text.clone());
        }
        filter
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the study order and statistics as JSON
    Revise {
        /// Owner name
        #[arg(long)]
        owner: String,
        #[command(flatten)]
        filter: FilterArgs,
        /// Fixed shuffle seed for a reproducible order
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List cards, newest first
    List {
        /// Owner name
        #[arg(long)]
        owner: String,
        #[command(flatten)]
        filter: FilterArgs,
        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Cards per page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },

    /// Show card totals and due counts per tag
    Stats {
        /// Owner name
        #[arg(long)]
        owner: String,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Give every card of a series a new position
    Reorder {
        /// Series id
        #[arg(long)]
        series: i64,
        /// New positions as CARD:POSITION pairs, one per card of the series
        #[arg(required = true)]
        positions: Vec<String>,
    },

    /// Finish an interrupted reorder
    Recover {
        /// Series id
        #[arg(long)]
        series: i64,
    },

    /// Grade a self-review (up, down, down_to_third, reset)
    Review {
        /// Owner name
        #[arg(long)]
        owner: String,
        /// Card id
        card: i64,
        /// Grade
        grade: Grade,
    },

    /// Print a card with its partials
    Show {
        /// Card id
        card: i64,
    },

    /// Create owners, series, tags, cards and card partials
    Add {
        #[command(subcommand)]
        what: AddCommand,
    },
}

#[derive(Subcommand)]
enum AddCommand {
    /// Add an owner
    Owner { name: String },
    /// Add a series (empty series of the owner are removed)
    Series {
        #[arg(long)]
        owner: String,
        name: String,
    },
    /// Add a tag
    Tag { name: String },
    /// Add a card
    Card {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        title: Option<String>,
        /// Append to this series
        #[arg(long)]
        series: Option<i64>,
        /// Tag ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<i64>,
    },
    /// Append a text or code block to a card
    Partial {
        /// Card id
        card: i64,
        #[arg(long = "type", default_value = "text")]
        partial_type: PartialType,
        content: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let storage = Storage::new(cli.db).context("Failed to open card store")?;

    match cli.command {
        Commands::Revise { owner, filter, seed } => run_revise(&storage, &owner, &filter, seed),
        Commands::List {
            owner,
            filter,
            page,
            page_size,
        } => run_list(&storage, &owner, &filter, page, page_size),
        Commands::Stats { owner, filter } => run_stats(&storage, &owner, &filter),
        Commands::Reorder { series, positions } => run_reorder(&storage, series, &positions),
        Commands::Recover { series } => run_recover(&storage, series),
        Commands::Review { owner, card, grade } => run_review(&storage, &owner, card, grade),
        Commands::Show { card } => run_show(&storage, card),
        Commands::Add { what } => run_add(&storage, what),
    }
}

fn resolve_owner(storage: &Storage, name: &str) -> anyhow::Result<OwnerId> {
    storage
        .owner_by_name(name)?
        .map(|owner| owner.id)
        .ok_or_else(|| anyhow!("Unknown owner '{}'", name))
}

/// Parse a `CARD:POSITION` pair
fn parse_position(pair: &str) -> anyhow::Result<(CardId, i64)> {
    let (card, position) = pair
        .split_once(':')
        .ok_or_else(|| anyhow!("Expected CARD:POSITION, got '{}'", pair))?;
    let card: i64 = card
        .trim()
        .parse()
        .with_context(|| format!("Invalid card id in '{}'", pair))?;
    let position: i64 = position
        .trim()
        .parse()
        .with_context(|| format!("Invalid position in '{}'", pair))?;
    Ok((CardId(card), position))
}

fn run_revise(
    storage: &Storage,
    owner: &str,
    filter: &FilterArgs,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let owner = resolve_owner(storage, owner)?;
    let planner = RevisionPlanner::with_config(RevisionConfig { seed });
    let result = storage.cardset_and_statistics(owner, &filter.to_filter(), &planner, Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_list(
    storage: &Storage,
    owner: &str,
    filter: &FilterArgs,
    page: usize,
    page_size: usize,
) -> anyhow::Result<()> {
    let owner = resolve_owner(storage, owner)?;
    let listing = storage.list_cards(owner, &filter.to_filter(), page, page_size)?;

    if listing.results.is_empty() {
        println!("{}", "No cards found.".dimmed());
    }
    for card in &listing.results {
        let title = match &card.title {
            Some(title) => title.normal(),
            None => "(untitled)".dimmed(),
        };
        let placement = match card.series {
            Some(series) => format!("series {} #{}", series, card.n_in_series),
            None => "standalone".to_string(),
        };
        println!(
            "{:>6}  {}  {}  {}",
            card.id.to_string().cyan(),
            title,
            placement.dimmed(),
            card.created_at.format("%Y-%m-%d")
        );
    }

    println!();
    println!(
        "{} cards, page {}{}{}",
        listing.count,
        page.max(1),
        listing
            .previous
            .map(|p| format!(", previous {}", p))
            .unwrap_or_default(),
        listing.next.map(|p| format!(", next {}", p)).unwrap_or_default()
    );
    Ok(())
}

fn run_stats(storage: &Storage, owner: &str, filter: &FilterArgs) -> anyhow::Result<()> {
    let owner = resolve_owner(storage, owner)?;
    let result = storage.cardset_and_statistics(
        owner,
        &filter.to_filter(),
        &RevisionPlanner::new(),
        Utc::now(),
    )?;

    println!("{}", "=== Revision Statistics ===".cyan().bold());
    println!();
    println!("{}: {}", "Total Cards".white().bold(), result.cards_total);
    println!("{}: {}", "Due Now".white().bold(), result.cardset.len());

    if result.cards_total_by_tags.is_empty() {
        return Ok(());
    }

    println!();
    println!("{}", "=== By Tags ===".yellow().bold());
    for (key, stats) in &result.cards_total_by_tags {
        let label = if key.is_empty() {
            "(untagged)".dimmed()
        } else {
            key.normal()
        };
        let due = if stats.to_revise > 0 {
            stats.to_revise.to_string().yellow().bold()
        } else {
            stats.to_revise.to_string().green()
        };
        println!("  {:<30} {:>5} total  {} due", label, stats.total, due);
    }
    Ok(())
}

fn run_reorder(storage: &Storage, series: i64, positions: &[String]) -> anyhow::Result<()> {
    let series = SeriesId(series);
    let changes = positions
        .iter()
        .map(|pair| parse_position(pair))
        .collect::<anyhow::Result<Vec<_>>>()?;

    match storage.reorder_series(series, &RenumberRequest::new(changes)) {
        Ok(()) => {}
        Err(StorageError::Renumber(e)) if e.is_retryable() => {
            return Err(anyhow::Error::new(e).context(format!(
                "Reorder of series {} was rolled back; retry the same request",
                series
            )));
        }
        Err(e) => return Err(e.into()),
    }

    println!("{} series {}", "Reordered".green().bold(), series);
    for (card, position) in storage.series_positions(series)? {
        println!("  {:>3}  card {}", position, card);
    }
    Ok(())
}

fn run_recover(storage: &Storage, series: i64) -> anyhow::Result<()> {
    let series = SeriesId(series);
    let moved = storage.recover_series(series)?;
    if moved == 0 {
        println!("Series {} is already settled", series);
    } else {
        println!("{} {} cards of series {}", "Recovered".green().bold(), moved, series);
    }
    Ok(())
}

fn run_review(storage: &Storage, owner: &str, card: i64, grade: Grade) -> anyhow::Result<()> {
    let owner = resolve_owner(storage, owner)?;
    let card = CardId(card);
    let before = storage.score(card, owner)?.map_or(0, |s| s.score);
    let after = storage.review(card, owner, grade, Utc::now())?;
    println!(
        "Card {}: score {} -> {}",
        card,
        before,
        after.score.to_string().bold()
    );
    Ok(())
}

fn run_show(storage: &Storage, card: i64) -> anyhow::Result<()> {
    let card = storage
        .get_card(CardId(card))?
        .ok_or_else(|| anyhow!("Unknown card {}", card))?;

    let title = card.title.as_deref().unwrap_or("(untitled)");
    println!("{} {}", format!("#{}", card.id).cyan(), title.bold());
    if let Some(series) = card.series {
        println!("{}", format!("series {} #{}", series, card.n_in_series).dimmed());
    }
    println!();

    for partial in storage.partials(card.id)? {
        match partial.partial_type {
            PartialType::Text => println!("{}", partial.content),
            PartialType::Code => {
                for line in partial.content.lines() {
                    println!("    {}", line.yellow());
                }
            }
        }
        println!();
    }
    Ok(())
}

fn run_add(storage: &Storage, what: AddCommand) -> anyhow::Result<()> {
    match what {
        AddCommand::Owner { name } => {
            let owner = storage.create_owner(&name)?;
            println!("Owner {} ({})", owner.id, owner.name);
        }
        AddCommand::Series { owner, name } => {
            let owner = resolve_owner(storage, &owner)?;
            let series = storage.create_series(owner, &name)?;
            println!("Series {} ({})", series.id, series.name);
        }
        AddCommand::Tag { name } => {
            let tag = storage.create_tag(&name)?;
            println!("Tag {} ({})", tag.id, tag.name);
        }
        AddCommand::Card {
            owner,
            title,
            series,
            tags,
        } => {
            let owner = resolve_owner(storage, &owner)?;
            let card = storage.create_card(
                owner,
                NewCard {
                    title,
                    series: series.map(SeriesId),
                    tags: tags.into_iter().map(TagId).collect(),
                },
            )?;
            println!("Card {} at position {}", card.id, card.n_in_series);
        }
        AddCommand::Partial {
            card,
            partial_type,
            content,
        } => {
            let partial = storage.add_partial(
                CardId(card),
                NewPartial {
                    partial_type,
                    content,
                },
            )?;
            println!(
                "Partial {} ({}) at position {} of card {}",
                partial.id, partial.partial_type, partial.position, partial.card
            );
        }
    }
    Ok(())
}

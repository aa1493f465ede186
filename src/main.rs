use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use newsdeck::aggregate::{
    fetch_categories, ArticleAggregator, DisplayedCategory, Pager, QueryCache,
};
use newsdeck::api::{nyt, Article, Clients, HeadlinesQuery, PopularPeriod};
use newsdeck::config::Config;
use newsdeck::preferences::Preferences;
use newsdeck::search::{search, DateRange, SearchFilter};
use newsdeck::util::{display_width, strip_control_chars, time_ago, truncate_to_width};

const TITLE_WIDTH: usize = 96;

/// Get the config directory path (~/.config/newsdeck/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newsdeck"))
}

#[derive(Parser, Debug)]
#[command(
    name = "newsdeck",
    version,
    about = "Terminal news aggregator for Event Registry, NewsAPI.org and the NYT"
)]
struct Args {
    /// Config file (default: ~/.config/newsdeck/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Articles for your followed sources, categories and authors
    Feed {
        /// Page to start from
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Number of consecutive pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Follow an extra source URI for this run
        #[arg(long = "source", value_name = "URI")]
        sources: Vec<String>,

        /// Follow an extra category URI for this run
        #[arg(long = "category", value_name = "URI")]
        categories: Vec<String>,

        /// Follow an extra author URI for this run
        #[arg(long = "author", value_name = "URI")]
        authors: Vec<String>,
    },

    /// List categories, optionally with a preview of their articles
    Categories {
        /// Show at most this many categories
        #[arg(long)]
        size: Option<usize>,

        /// Fetch preview articles for each category
        #[arg(long)]
        articles: bool,
    },

    /// Search articles
    Search {
        /// Keyword to search for
        query: Option<String>,

        #[arg(long, value_name = "URI")]
        category: Option<String>,

        #[arg(long, value_name = "URI")]
        source: Option<String>,

        /// any, 24h, week or month
        #[arg(long, default_value = "any")]
        since: DateRange,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Top headlines from NewsAPI.org
    Headlines {
        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Comma-separated source ids
        #[arg(long)]
        sources: Option<String>,

        #[arg(long)]
        query: Option<String>,

        #[arg(long)]
        page_size: Option<u32>,

        #[arg(long)]
        page: Option<u32>,
    },

    /// Most viewed New York Times articles
    Popular {
        /// 1, 7 or 30 days
        #[arg(long, default_value = "1")]
        period: PopularPeriod,

        /// Show every result instead of the front-page highlights
        #[arg(long)]
        all: bool,
    },

    /// One-shot suggestion lookup
    Suggest {
        #[arg(value_enum)]
        kind: SuggestKind,

        prefix: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SuggestKind {
    Sources,
    Authors,
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with listing output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.apply_env();

    let clients = Clients::from_config(&config).context("Failed to set up API clients")?;
    let stale_time = Duration::from_secs(config.cache_stale_hours.saturating_mul(60 * 60));
    let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
    let now = Utc::now();

    match args.command {
        Command::Feed {
            page,
            pages,
            sources,
            categories,
            authors,
        } => {
            let prefs = Preferences::from_config(&config.preferences)
                .with_overrides(&sources, &categories, &authors);
            if prefs.is_empty() {
                eprintln!("No preferences configured.");
                eprintln!();
                eprintln!("Add sources, categories or authors under [preferences] in");
                eprintln!("  {}", config_path.display());
                eprintln!("or pass --source/--category/--author.");
                std::process::exit(1);
            }

            let aggregator = ArticleAggregator::new(
                Arc::new(clients.event_registry),
                Arc::new(QueryCache::new(capacity, stale_time)),
            )
            .with_page_size(config.page_size)
            .with_max_concurrent(config.max_concurrent_queries);

            let mut pager = Pager::starting_at(page);
            for i in 0..pages.max(1) {
                if i > 0 {
                    pager.next();
                }
                run_feed_page(&aggregator, &prefs, pager.page(), now).await;
            }
        }

        Command::Categories { size, articles } => {
            let cache = QueryCache::new(capacity, stale_time);
            let list = fetch_categories(&clients.event_registry, &cache, size)
                .await
                .context("Failed to fetch categories")?;

            if !articles {
                for category in &list {
                    println!("{}", listing_line(&category.label, &category.uri, 28));
                }
                return Ok(());
            }

            let displayed: Vec<DisplayedCategory> = list.iter().map(Into::into).collect();
            let aggregator = ArticleAggregator::new(
                Arc::new(clients.event_registry),
                Arc::new(QueryCache::new(capacity, stale_time)),
            )
            .with_max_concurrent(config.max_concurrent_queries);
            let view = aggregator.fetch_by_categories(&displayed).await;
            for section in &view.sections {
                println!("== {} ==", clean(&section.label));
                for article in &section.results {
                    print_article(article, now);
                }
                println!();
            }
            if view.has_error {
                eprintln!("Warning: some categories failed to load");
            }
        }

        Command::Search {
            query,
            category,
            source,
            since,
            page,
        } => {
            let mut filter = SearchFilter::new();
            filter.set_keyword(query);
            filter.set_category(category);
            filter.set_source(source);
            filter.set_date_range(since);
            filter.set_page(page);

            let results = search(&clients.event_registry, &filter)
                .await
                .context("Search failed")?;
            println!(
                "{} results, page {} ({})",
                results.total_results,
                results.page,
                since.label()
            );
            for article in &results.articles {
                print_article(article, now);
            }
            if results.has_more {
                println!("More results: --page {}", results.page + 1);
            }
        }

        Command::Headlines {
            country,
            category,
            sources,
            query,
            page_size,
            page,
        } => {
            let request = HeadlinesQuery {
                country,
                category,
                sources,
                q: query,
                page_size,
                page,
            };
            let response = clients
                .news_org
                .top_headlines(&request)
                .await
                .context("Failed to fetch top headlines")?;
            for headline in &response.articles {
                let when = headline
                    .published_at
                    .map(|t| time_ago(t, now))
                    .unwrap_or_default();
                println!("{}", display_title(&headline.title));
                println!("{}", detail_line(&headline.source.name, &when, &headline.url));
            }
        }

        Command::Popular { period, all } => {
            let response = clients
                .nyt
                .most_viewed(period)
                .await
                .context("Failed to fetch most popular articles")?;
            let shown = if all {
                &response.results[..]
            } else {
                nyt::highlights(&response)
            };
            for article in shown {
                println!("{}", display_title(&article.title));
                println!(
                    "{}",
                    detail_line(&article.section, &article.published_date, &article.url)
                );
                if let Some(photo) = article.photos().first() {
                    println!("    image: {}", clean(photo));
                }
            }
        }

        Command::Suggest { kind, prefix } => {
            let prefix = prefix.as_deref();
            let client = &clients.event_registry;
            let rows: Vec<(String, String)> = match kind {
                SuggestKind::Sources => client
                    .suggest_sources(prefix)
                    .await
                    .context("Failed to fetch source suggestions")?
                    .into_iter()
                    .map(|s| (s.title, s.uri))
                    .collect(),
                SuggestKind::Authors => client
                    .suggest_authors(prefix)
                    .await
                    .context("Failed to fetch author suggestions")?
                    .into_iter()
                    .map(|a| (a.name, a.uri))
                    .collect(),
                SuggestKind::Categories => client
                    .suggest_categories()
                    .await
                    .context("Failed to fetch category suggestions")?
                    .into_iter()
                    .map(|c| (c.label, c.uri))
                    .collect(),
            };
            for (label, uri) in rows {
                println!("{}", listing_line(&label, &uri, 40));
            }
        }
    }

    Ok(())
}

/// Fetch one feed page, reporting progress as each query settles.
async fn run_feed_page(
    aggregator: &ArticleAggregator,
    prefs: &Preferences,
    page: u32,
    now: DateTime<Utc>,
) {
    let mut fan_out = aggregator.spawn_preferred(prefs, page);
    let total = fan_out.query_count();

    loop {
        let view = fan_out.view();
        if !view.is_loading {
            break;
        }
        eprint!(
            "\rLoading page {page}: {} articles so far from {total} queries",
            view.articles.len()
        );
        if !fan_out.changed().await {
            break;
        }
    }
    eprint!("\r\x1b[K");

    let view = fan_out.settled().await;
    println!("== Page {page} ({} articles) ==", view.articles.len());
    for article in &view.articles {
        print_article(article, now);
    }
    if view.has_error {
        eprintln!(
            "Warning: {} of {} queries failed on page {page}",
            view.errors.len(),
            view.query_count
        );
        for error in &view.errors {
            tracing::warn!(error = %error, "Feed query failed");
        }
    }
}

fn clean(s: &str) -> String {
    strip_control_chars(s).into_owned()
}

fn display_title(title: &str) -> String {
    truncate_to_width(&strip_control_chars(title), TITLE_WIDTH).into_owned()
}

fn print_article(article: &Article, now: DateTime<Utc>) {
    let when = article
        .date_time
        .map(|t| time_ago(t, now))
        .unwrap_or_default();
    println!("{}", display_title(&article.title));
    println!("{}", detail_line(&article.source.title, &when, &article.url));
}

/// Second line of a listing entry. Every part comes from an API response.
fn detail_line(origin: &str, when: &str, url: &str) -> String {
    format!("    {} · {}  {}", clean(origin), clean(when), clean(url))
}

/// `label` padded to `width` columns, then `uri`.
fn listing_line(label: &str, uri: &str, width: usize) -> String {
    let label = display_title(label);
    let pad = width.saturating_sub(display_width(&label));
    format!("{label}{} {}", " ".repeat(pad), clean(uri))
}

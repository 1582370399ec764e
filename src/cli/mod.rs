//! CLI commands implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::ai::AiClient;
use crate::browser::BrowserPool;
use crate::config::ReviewWebConfig;
use crate::review::{
    AiAnalyzer, MemoryReviewStore, ReviewInput, ReviewOptions, ReviewService, WebPageSource,
};
use crate::scrape::{ScrapeOptions, Scraper};

#[derive(Parser)]
#[command(name = "reviewweb")]
#[command(about = "URL review and analysis engine")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full AI review of a URL
    Review {
        /// URL to review
        url: String,
        /// User id to attach to the review record
        #[arg(long, default_value = "cli")]
        user: String,
        /// Extra instructions folded into the page analysis
        #[arg(short, long)]
        instructions: Option<String>,
        /// Skip image extraction and analysis
        #[arg(long)]
        skip_images: bool,
        /// Skip link extraction and analysis
        #[arg(long)]
        skip_links: bool,
        /// Maximum images to extract and analyze
        #[arg(long)]
        max_images: Option<usize>,
        /// Maximum links to extract and analyze
        #[arg(long)]
        max_links: Option<usize>,
        /// Fail the review on the first image analysis error
        #[arg(long)]
        strict_images: bool,
        /// Fail the review on the first link analysis error
        #[arg(long)]
        strict_links: bool,
    },

    /// Fetch page HTML through the fallback ladder
    Scrape {
        /// URL to fetch
        url: String,
        /// CSS selector to extract instead of the full page
        #[arg(short, long)]
        selector: Option<String>,
        /// Match every element for the selector, not just the first
        #[arg(short, long)]
        all: bool,
    },

    /// List image URLs found on a page
    Images {
        /// URL to inspect
        url: String,
    },

    /// Capture a full-page PNG screenshot
    Screenshot {
        /// URL to capture
        url: String,
        /// Output file
        #[arg(short, long, default_value = "screenshot.png")]
        output: PathBuf,
    },

    /// List outbound links found on a page
    Links {
        /// URL to inspect
        url: String,
        /// Maximum links to return
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Extract head metadata (title, description, Open Graph tags)
    Metadata {
        /// URL to inspect
        url: String,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ReviewWebConfig::load_or_default(cli.config.as_deref())?;

    let pool = Arc::new(BrowserPool::new(config.browser.clone()));
    let scraper = Arc::new(Scraper::new(config.scrape.clone(), Arc::clone(&pool)));

    let result = match cli.command {
        Commands::Review {
            url,
            user,
            instructions,
            skip_images,
            skip_links,
            max_images,
            max_links,
            strict_images,
            strict_links,
        } => {
            let defaults = config.review.options();
            let options = ReviewOptions {
                skip_image_extraction: skip_images,
                skip_link_extraction: skip_links,
                max_extracted_images: max_images.unwrap_or(defaults.max_extracted_images),
                max_extracted_links: max_links.unwrap_or(defaults.max_extracted_links),
                continue_on_image_analysis_error: !strict_images,
                continue_on_link_analysis_error: !strict_links,
            };
            let input = ReviewInput {
                url,
                user_id: user,
                instructions,
            };
            cmd_review(&config, Arc::clone(&scraper), input, options).await
        }
        Commands::Scrape { url, selector, all } => {
            cmd_scrape(&scraper, &url, selector, all).await
        }
        Commands::Images { url } => cmd_images(&scraper, &url).await,
        Commands::Screenshot { url, output } => cmd_screenshot(&scraper, &url, &output).await,
        Commands::Links { url, limit } => cmd_links(&scraper, &url, limit).await,
        Commands::Metadata { url } => cmd_metadata(&scraper, &url).await,
    };

    drop(scraper);
    shutdown_pool(pool).await;

    result
}

async fn cmd_review(
    config: &ReviewWebConfig,
    scraper: Arc<Scraper>,
    input: ReviewInput,
    options: ReviewOptions,
) -> anyhow::Result<()> {
    let backend = Arc::new(AiClient::new(config.ai.clone()));
    let analyzer = Arc::new(AiAnalyzer::new(backend, config.ai.clone()));
    let store = Arc::new(MemoryReviewStore::new());
    let service = ReviewService::new(Arc::new(WebPageSource::new(scraper)), analyzer, store);

    let record = service.start_review(input, options).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn cmd_scrape(
    scraper: &Scraper,
    url: &str,
    selector: Option<String>,
    all: bool,
) -> anyhow::Result<()> {
    let options = ScrapeOptions {
        selector,
        select_all: all,
        ..Default::default()
    };
    let html = scraper.get_html_with_fallbacks(url, &options).await?;
    println!("{html}");
    Ok(())
}

async fn cmd_images(scraper: &Scraper, url: &str) -> anyhow::Result<()> {
    let images = scraper.get_all_images(url).await?;
    println!("{}", serde_json::to_string_pretty(&images)?);
    Ok(())
}

async fn cmd_screenshot(scraper: &Scraper, url: &str, output: &PathBuf) -> anyhow::Result<()> {
    let png = scraper.screenshot(url).await?;
    std::fs::write(output, &png)?;
    println!("Saved {} bytes to {}", png.len(), output.display());
    Ok(())
}

async fn cmd_links(scraper: &Scraper, url: &str, limit: usize) -> anyhow::Result<()> {
    let links = scraper.scrape_links(url, limit).await?;
    println!("{}", serde_json::to_string_pretty(&links)?);
    Ok(())
}

async fn cmd_metadata(scraper: &Scraper, url: &str) -> anyhow::Result<()> {
    let metadata = scraper.scrape_metadata(url).await?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

/// Close pooled browsers if we hold the last reference to the pool.
async fn shutdown_pool(pool: Arc<BrowserPool>) {
    match Arc::try_unwrap(pool) {
        Ok(mut pool) => pool.shutdown().await,
        Err(_) => warn!("Browser pool still referenced at shutdown; skipping close"),
    }
}

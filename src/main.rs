//! Imovel-Harvest main entry point
//!
//! This is the command-line interface for the listing crawl pipeline.

use anyhow::{bail, Context};
use clap::Parser;
use imovel_harvest::config::{load_config_with_hash, Config};
use imovel_harvest::crawler::{Coordinator, CrawlMode};
use imovel_harvest::output::{load_statistics, print_statistics};
use imovel_harvest::storage::open_storage;
use imovel_harvest::{Listing, StepStatus};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Imovel-Harvest: a staged property listing crawler
///
/// Discovers listings through paginated search or bulk coordinate queries,
/// enriches them from their detail pages, deduplicates by content hash and
/// exports the enriched records.
#[derive(Parser, Debug)]
#[command(name = "imovel-harvest")]
#[command(version)]
#[command(about = "A staged property listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Pipeline mode to run
    #[arg(long, value_enum, default_value_t = CrawlMode::FullCrawl)]
    mode: CrawlMode,

    /// Listing identifier for --mode test-listing
    #[arg(long)]
    listing_id: Option<String>,

    /// Override the configured search city
    #[arg(long)]
    city: Option<String>,

    /// Override the configured search page budget
    #[arg(long)]
    max_pages: Option<u32>,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(city) = cli.city {
        config.search.city = city;
    }

    if cli.stats {
        return handle_stats(&config);
    }

    let coordinator = Coordinator::new(config)?;
    match cli.mode {
        CrawlMode::TestSearch => handle_test_search(&coordinator).await,
        CrawlMode::TestListing => {
            let Some(listing_id) = cli.listing_id.as_deref() else {
                bail!("--mode test-listing requires --listing-id");
            };
            handle_test_listing(&coordinator, listing_id).await
        }
        mode => handle_pipeline(&coordinator, mode, cli.max_pages).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("imovel_harvest=info,warn"),
            1 => EnvFilter::new("imovel_harvest=debug,info"),
            2 => EnvFilter::new("imovel_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --stats: prints listing counts and the latest run
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

async fn handle_pipeline(
    coordinator: &Coordinator,
    mode: CrawlMode,
    max_pages: Option<u32>,
) -> anyhow::Result<()> {
    let criteria = coordinator.config().search.criteria();
    tracing::info!(
        "Starting {} for {} ({})",
        mode,
        criteria.city,
        criteria.location_slug()
    );

    let run = coordinator.run(mode, max_pages).await?;

    println!(
        "Run #{} {}: processed={} created={} failed={}",
        run.id, run.status, run.items_processed, run.items_created, run.items_failed
    );

    if run.status == StepStatus::Failed {
        bail!(
            "run #{} failed: {}",
            run.id,
            run.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

async fn handle_test_search(coordinator: &Coordinator) -> anyhow::Result<()> {
    let criteria = coordinator.config().search.criteria();
    let (listings, total) = coordinator.test_search(&criteria).await?;

    println!("=== Test Search: {} ===\n", criteria.location_slug());
    println!("Reported total: {}", total);
    println!("Listings on first page: {}\n", listings.len());
    for listing in &listings {
        print_listing_line(listing);
    }

    Ok(())
}

async fn handle_test_listing(coordinator: &Coordinator, listing_id: &str) -> anyhow::Result<()> {
    let Some(listing) = coordinator.test_listing(listing_id).await? else {
        bail!("could not fetch detail page for listing {}", listing_id);
    };

    println!("=== Test Listing: {} ===\n", listing.source_id);
    print_listing_line(&listing);
    println!(
        "  Address: {}, {} - {}",
        listing.address.street, listing.address.number, listing.address.neighborhood
    );
    println!(
        "  Condo fee: {:.2}  IPTU: {:.2}",
        listing.price.condo_fee, listing.price.iptu
    );
    if let Some(coordinates) = listing.coordinates {
        println!(
            "  Coordinates: {}, {}",
            coordinates.latitude, coordinates.longitude
        );
    }
    println!(
        "  Floor: {:?} of {:?}, built {:?}",
        listing.floor_number, listing.total_floors, listing.year_built
    );
    println!(
        "  Furnished: {}  Pets: {:?}",
        listing.furnished.to_db_string(),
        listing.pet_friendly.as_bool()
    );
    println!(
        "  Building amenities: {}",
        listing.building_amenities.join(", ")
    );
    println!("  Unit amenities: {}", listing.unit_amenities.join(", "));
    println!("  Photos: {}", listing.images.len());
    if let Some(hash) = &listing.content_hash {
        println!("  Content hash: {}", hash);
    }

    Ok(())
}

fn print_listing_line(listing: &Listing) {
    println!(
        "  {} | {} | R$ {:.0} | {} m² | {} bed | {}",
        listing.source_id,
        listing.property_type.to_db_string(),
        listing.price.sale_price,
        listing.area_m2,
        listing.bedrooms,
        listing.source_url
    );
}

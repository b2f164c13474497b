use anyhow::Result;
use clap::{Parser, Subcommand};
use odds_aggregator::data::{load_events_from_cache, save_events_to_cache};
use odds_aggregator::odds::american_to_probability;
use odds_aggregator::{build_aggregator, Event, OddsData, OddsResponse};
use std::path::Path;

#[derive(Parser)]
#[command(name = "odds-aggregator", about = "Multi-source sports odds comparison")]
struct Cli {
    /// Load events from the cache file instead of calling providers
    #[arg(long, global = true)]
    use_cache: bool,

    /// Save fetched events to the cache file
    #[arg(long, global = true)]
    save_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and display odds for every supported sport
    All,
    /// Fetch and display odds for one sport (afl, nrl, nba, nfl, soccer)
    Sport { key: String },
    /// List the reference bookmakers across all sources
    Bookmakers,
    /// Call each data source independently and report its health
    TestSources,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let aggregator = build_aggregator();

    match cli.command {
        Command::All => {
            let cache_file = "cache/odds_cache.json";
            if cli.use_cache && Path::new(cache_file).exists() {
                println!("Loading odds from cache file: {}\n", cache_file);
                let events = load_events_from_cache(cache_file)?;
                print_events(&events);
                return Ok(());
            }

            let response = aggregator.get_all_odds().await;
            print_response(&response);

            if cli.save_cache {
                std::fs::create_dir_all("cache")?;
                save_events_to_cache(&response.data, cache_file)?;
                println!("Saved odds to cache file: {}", cache_file);
            }
        }
        Command::Sport { key } => {
            let cache_file = format!("cache/odds_{}_cache.json", key.to_lowercase());
            if cli.use_cache && Path::new(&cache_file).exists() {
                println!("Loading odds from cache file: {}\n", cache_file);
                let events = load_events_from_cache(&cache_file)?;
                print_events(&events);
                return Ok(());
            }

            let response = aggregator.get_odds_by_sport(&key).await?;
            print_response(&response);

            if cli.save_cache {
                std::fs::create_dir_all("cache")?;
                save_events_to_cache(&response.data, &cache_file)?;
                println!("Saved odds to cache file: {}", cache_file);
            }
        }
        Command::Bookmakers => {
            println!("Reference bookmakers:\n");
            for bookmaker in aggregator.get_all_bookmakers() {
                println!("  {} {} ({})", bookmaker.logo, bookmaker.name, bookmaker.id);
            }
        }
        Command::TestSources => {
            println!("Testing data sources...\n");
            for result in aggregator.test_sources().await {
                if result.success {
                    println!("  OK   {} ({} events)", result.name, result.event_count);
                } else {
                    println!(
                        "  FAIL {} ({})",
                        result.name,
                        result.error.unwrap_or_default()
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_response(response: &OddsResponse) {
    if response.sources.is_empty() {
        println!("Sources: none\n");
    } else {
        println!("Sources: {}\n", response.sources.join(", "));
    }

    if let Some(error) = &response.error {
        println!("Warning: {}\n", error);
    }

    print_events(&response.data);

    println!(
        "Last updated: {}",
        response.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Next update:  {}",
        response.next_update.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(remaining) = response.rate_limit_remaining {
        println!("API requests remaining: {}", remaining);
    }
    println!();
}

fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("No events found.\n");
        return;
    }

    for (i, event) in events.iter().enumerate() {
        println!(
            "{}. [{}] {} vs {} ({})",
            i + 1,
            event.sport,
            event.home_team,
            event.away_team,
            event.event_time.format("%Y-%m-%d %H:%M UTC")
        );
        for market in &event.markets {
            println!("   {}", market.name);
            for outcome in &market.outcomes {
                let prices: Vec<String> = outcome.odds.iter().map(format_price).collect();
                println!("     {:<30} {}", outcome.name, prices.join("  "));
            }
        }
        println!();
    }
}

/// Render one bookmaker price, flagging the best available with `*`.
fn format_price(odd: &OddsData) -> String {
    let marker = if odd.is_best { "*" } else { "" };
    format!(
        "{} {:+}{} ({:.1}%)",
        odd.bookmaker,
        odd.odds,
        marker,
        american_to_probability(odd.odds) * 100.0
    )
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line client for NYC restaurant inspection queries.
//!
//! Searches and details lookups run through the same query service as the
//! HTTP server: live data when a warehouse or remote backend is
//! configured, the built-in dataset (with a warning) otherwise.

mod display;

use clap::{Parser, Subcommand};
use restaurant_finder_query::{QueryConfig, QueryService};
use restaurant_finder_query_models::{DetailsQuery, DistinctValues, Filter, RawFilter};

#[derive(Parser)]
#[command(
    name = "restaurant_finder",
    about = "Search NYC restaurant inspection results"
)]
struct Cli {
    /// Base URL of a remote query backend (overrides `NYC_RESTAURANTS_AGENT_URL`)
    #[arg(long, global = true)]
    agent_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search restaurants by borough, cuisine and minimum grade
    Search {
        /// Borough (e.g., "Manhattan", "staten island")
        #[arg(short, long)]
        borough: Option<String>,
        /// Cuisine substring (e.g., "pizza")
        #[arg(short, long)]
        cuisine: Option<String>,
        /// Minimum grade: A, B or C
        #[arg(short = 'g', long)]
        min_grade: Option<String>,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<i64>,
        /// Print the raw JSON response instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show every inspection of a restaurant
    Details {
        /// Restaurant name, or part of it
        name: String,
        /// Borough to narrow the lookup
        #[arg(short, long)]
        borough: Option<String>,
        /// Print the raw JSON response instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List every borough in the data
    Boroughs {
        /// Print the raw JSON response instead of a list
        #[arg(long)]
        json: bool,
    },
    /// List every cuisine in the data
    Cuisines {
        /// Print the raw JSON response instead of a list
        #[arg(long)]
        json: bool,
    },
    /// Check whether live data is reachable or sample data is in use
    Health {
        /// Print the raw JSON status instead of a report
        #[arg(long)]
        json: bool,
    },
    /// Start the HTTP API server
    Serve {
        /// Address to bind (default: `BIND_ADDR` or 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (default: `PORT` or 8080)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = QueryConfig::load()?;
    if let Some(url) = cli.agent_url {
        log::debug!("Remote backend set on the command line: {url}");
        config.agent_url = Some(url);
    }
    let service = QueryService::from_config(&config)?;

    match cli.command {
        Commands::Search {
            borough,
            cuisine,
            min_grade,
            limit,
            json,
        } => {
            let raw = RawFilter {
                borough,
                cuisine,
                min_grade,
                limit: limit.map(serde_json::Value::from),
            };
            let filter = Filter::from_raw(&raw, service.bounds())?;
            log::debug!("Search filter: {filter:?}");
            let envelope = service.execute(&filter).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            } else {
                if envelope.is_mock() {
                    eprintln!("{}", display::MOCK_WARNING);
                }
                print!("{}", display::search_table(&envelope));
            }
        }
        Commands::Details {
            name,
            borough,
            json,
        } => {
            let query = DetailsQuery::from_raw(&name, borough.as_deref())?;
            let details = service.details(&query).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&details)?);
            } else {
                if details.mock_data {
                    eprintln!("{}", display::MOCK_WARNING);
                }
                print!("{}", display::details_table(&details));
            }
        }
        Commands::Boroughs { json } => {
            print_values(&service.distinct_boroughs().await, json)?;
        }
        Commands::Cuisines { json } => {
            print_values(&service.distinct_cuisines().await, json)?;
        }
        Commands::Health { json } => {
            let status = service.health().await;
            log::debug!("Health: {status:?}");

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", display::health_report(&status));
            }
        }
        Commands::Serve { bind, port } => {
            let (env_bind, env_port) = restaurant_finder_server::bind_from_env();
            let bind = bind.unwrap_or(env_bind);
            let port = port.unwrap_or(env_port);

            // actix-web needs its own system runtime; run it off the tokio
            // worker threads.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new()
                    .block_on(restaurant_finder_server::serve(service, &bind, port))
            })
            .await??;
        }
    }

    Ok(())
}

fn print_values(values: &DistinctValues, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(values)?);
    } else {
        if values.mock_data {
            eprintln!("{}", display::MOCK_WARNING);
        }
        print!("{}", display::value_list(values));
    }
    Ok(())
}

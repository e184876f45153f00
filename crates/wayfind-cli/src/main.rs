mod args;
mod directions;
mod nearby;
mod source;
mod submit;
mod watch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::args::{AmenityArgs, CriteriaArgs, LocationArgs};

#[derive(Debug, Parser)]
#[command(name = "wayfind")]
#[command(about = "Find nearby public facilities from a live feed")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List facilities matching the given filters, nearest first when a
    /// location is supplied
    Nearby {
        /// Snapshot JSON file; defaults to one fetch of the configured feed
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[command(flatten)]
        location: LocationArgs,
        #[command(flatten)]
        criteria: CriteriaArgs,
        /// Print the view as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print navigation links from a location to one facility
    Directions {
        /// Snapshot JSON file; defaults to one fetch of the configured feed
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Facility id (the feed key); push-style keys may start with `-`
        #[arg(long, allow_hyphen_values = true)]
        id: String,
        #[command(flatten)]
        location: LocationArgs,
        /// Browser user agent used to pick the preferred map provider
        #[arg(long)]
        user_agent: Option<String>,
        /// Treat the caller as an installed web app
        #[arg(long)]
        standalone: bool,
    },
    /// Follow the configured feed and print each recomputed view until Ctrl-C
    Watch {
        #[command(flatten)]
        location: LocationArgs,
        #[command(flatten)]
        criteria: CriteriaArgs,
    },
    /// Submit one new facility to the configured feed
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(
            long,
            requires = "lng",
            required_unless_present = "address",
            allow_negative_numbers = true
        )]
        lat: Option<f64>,
        #[arg(
            long,
            requires = "lat",
            required_unless_present = "address",
            allow_negative_numbers = true
        )]
        lng: Option<f64>,
        /// Street address; looked up with the geocoder when --lat/--lng are
        /// not given
        #[arg(long)]
        address: Option<String>,
        /// Initial star rating, 1 to 5
        #[arg(long, default_value_t = 5)]
        rating: u8,
        #[arg(long, default_value = wayfind_feed::DEFAULT_HOURS)]
        hours: String,
        #[command(flatten)]
        amenities: AmenityArgs,
    },
    /// Submit every facility in a JSON array file to the configured feed
    Import {
        /// JSON array of submissions
        #[arg(long)]
        file: PathBuf,
        /// Maximum concurrent submissions
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = wayfind_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Nearby {
            snapshot,
            location,
            criteria,
            json,
        }) => {
            nearby::run_nearby(&config, snapshot.as_deref(), &location, &criteria, json).await?;
        }
        Some(Commands::Directions {
            snapshot,
            id,
            location,
            user_agent,
            standalone,
        }) => {
            directions::run_directions(
                &config,
                snapshot.as_deref(),
                &id,
                &location,
                user_agent.as_deref(),
                standalone,
            )
            .await?;
        }
        Some(Commands::Watch { location, criteria }) => {
            watch::run_watch(&config, &location, &criteria).await?;
        }
        Some(Commands::Add {
            name,
            description,
            lat,
            lng,
            address,
            rating,
            hours,
            amenities,
        }) => {
            let submission = submit::Submission {
                name,
                description,
                lat,
                lng,
                address,
                rating,
                hours_of_operation: hours,
                amenities: amenities.into(),
            };
            submit::run_add(&config, submission).await?;
        }
        Some(Commands::Import { file, concurrency }) => {
            submit::run_import(&config, &file, concurrency).await?;
        }
        None => println!("wayfind: run `wayfind --help` for available commands"),
    }

    Ok(())
}

//! Timeclock CLI
//!
//! Command-line client for the attendance service.
//!
//! # Commands
//!
//! - `login` - Exchange an authorization code for a session
//! - `logout` - Sign out and clear the local cache
//! - `status` - Show session and clock status
//! - `clock` - Clock in or out, whichever is next
//! - `records` - List cached clock records
//! - `hours` - Show hours worked on a date
//! - `verify` - Check the stored token with the server
//! - `profile` - Show the user profile
//! - `timesheet` - Show or export a timesheet

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use timeclock_client::{
    AppContext, ClientConfig, FixedLocation, LocationProvider, NoLocation, ReqwestClient,
    DEFAULT_BASE_URL,
};
use timeclock_protocol::{ExportFormat, Location};
use timeclock_storage::FileStore;
use tracing_subscriber::EnvFilter;

/// Attendance tracking from the command line.
#[derive(Parser)]
#[command(name = "timeclock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backend endpoint
    #[arg(global = true, long, env = "TIMECLOCK_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Directory holding the session and record cache
    #[arg(global = true, long, env = "TIMECLOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "10")]
    timeout_secs: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with an identity-provider authorization code
    Login {
        /// Authorization code
        #[arg(short, long)]
        code: String,
    },

    /// Sign out and clear the local cache
    Logout,

    /// Show session and clock status
    Status,

    /// Clock in or out, whichever is next
    Clock {
        /// Latitude of the current position
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude of the current position
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Position accuracy in meters
        #[arg(long, default_value = "0")]
        accuracy: f64,
    },

    /// List clock records
    Records {
        /// Fetch records from the server first
        #[arg(short, long)]
        refresh: bool,

        /// Maximum number of records to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show hours worked on a date
    Hours {
        /// Calendar date (YYYY-MM-DD), today if omitted
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Check the stored token with the server
    Verify,

    /// Show the user profile
    Profile,

    /// Show or export a timesheet
    Timesheet {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        /// Export in this format (csv, xlsx, pdf, json) instead of showing the summary
        #[arg(short, long)]
        export: Option<ExportFormat>,

        /// Write the export to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("timeclock CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .ok_or("Could not determine a data directory, pass --data-dir")?
            .join("timeclock"),
    };
    let store = Arc::new(FileStore::open(&data_dir)?);
    let config = ClientConfig::new(cli.api_url).with_timeout(Duration::from_secs(cli.timeout_secs));
    let http = Arc::new(ReqwestClient::new(&config)?);

    let locator: Arc<dyn LocationProvider> = match &cli.command {
        Commands::Clock {
            lat: Some(latitude),
            lon: Some(longitude),
            accuracy,
        } => Arc::new(FixedLocation(Location {
            latitude: *latitude,
            longitude: *longitude,
            accuracy: *accuracy,
        })),
        _ => Arc::new(NoLocation),
    };

    let ctx = AppContext::builder(config, http, store)
        .location_provider(locator)
        .navigator(Arc::new(commands::LoginPrompt))
        .build();
    ctx.restore()?;

    match cli.command {
        Commands::Login { code } => commands::login::run(&ctx, &code).await?,
        Commands::Logout => commands::login::logout(&ctx)?,
        Commands::Status => commands::status::run(&ctx).await?,
        Commands::Clock { .. } => commands::clock::run(&ctx).await?,
        Commands::Records {
            refresh,
            limit,
            format,
        } => commands::records::run(&ctx, refresh, limit, &format).await?,
        Commands::Hours { date } => commands::hours::run(&ctx, date.as_deref())?,
        Commands::Verify => commands::verify::run(&ctx).await?,
        Commands::Profile => commands::profile::run(&ctx).await?,
        Commands::Timesheet {
            from,
            to,
            export,
            output,
        } => commands::timesheet::run(&ctx, &from, &to, export, output.as_deref()).await?,
        Commands::Version => {}
    }

    Ok(())
}

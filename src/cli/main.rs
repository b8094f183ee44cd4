//! Command line front end.
//!
//! `match` merges a sponsored dataset into a stream of map features;
//! `locate` resolves points to the names of the settlements they fall in.

mod locate;
mod matching;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use poi_locality::Config;

#[derive(Parser, Debug)]
#[command(name = "poi-locality")]
#[command(about = "Match sponsored POIs against map features and resolve localities")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge a sponsored dataset into map features
    Match {
        /// Tab-separated sponsored dataset
        #[arg(short, long)]
        dataset: PathBuf,

        /// Dataset record format
        #[arg(long, value_enum, default_value = "booking")]
        kind: DatasetKind,

        /// Map features as JSON lines
        #[arg(short, long)]
        features: PathBuf,

        /// Address reference as JSON lines, used to enrich objects
        #[arg(long)]
        addresses: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve `lat,lon` lines to locality names
    Locate {
        /// World settlements as JSON lines of map features
        #[arg(short, long)]
        localities: PathBuf,

        /// Query file (stdin when omitted)
        #[arg(short, long)]
        queries: Option<PathBuf>,

        /// Preferred name language, overrides the config
        #[arg(long)]
        lang: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DatasetKind {
    Booking,
    Opentable,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    match args.command {
        Command::Match {
            dataset,
            kind,
            features,
            addresses,
            output,
        } => {
            let paths = matching::MatchPaths {
                dataset,
                features,
                addresses,
                output,
            };
            match kind {
                DatasetKind::Booking => {
                    matching::run::<poi_locality::sponsored::BookingHotel>(&paths, &config.matching)
                }
                DatasetKind::Opentable => {
                    matching::run::<poi_locality::sponsored::OpentableRestaurant>(&paths, &config.matching)
                }
            }
        }
        Command::Locate {
            localities,
            queries,
            lang,
        } => {
            let mut locality_config = config.locality;
            if let Some(lang) = lang {
                locality_config.language = lang;
            }
            locate::run(&localities, queries.as_deref(), &locality_config)
        }
    }
}

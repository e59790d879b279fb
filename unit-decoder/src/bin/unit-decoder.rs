//! Command-line access to a unit catalog.
//!
//! Run with: cargo run --bin unit-decoder -- --db units.sqlite seed
//!           cargo run --bin unit-decoder -- --db units.sqlite search toolah

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unit_decoder::{NewUnit, SearchFilter, UnitDecoderApi, UnitStore};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database
    #[arg(long, env = "UNIT_DECODER_DB", default_value = "unit-decoder.sqlite")]
    db: PathBuf,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load units as verified, from the bundled catalog or a CSV file
    Seed {
        /// CSV with the bundled catalog's header
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Ranked search over verified units
    Search {
        query: String,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        region: Option<String>,

        #[arg(short, long)]
        era: Option<String>,
    },

    /// Autocomplete suggestions for a partial name
    Suggest {
        query: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Convert a value between two units by id
    Convert {
        from: i64,
        to: i64,
        value: f64,
    },

    /// Show one verified unit with its aliases
    Show { id: i64 },

    /// List verified units in a category
    Browse { category: String },
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

fn load_units(csv: Option<PathBuf>) -> Result<Vec<NewUnit>> {
    let rows = match csv {
        Some(path) => {
            let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
            seed_data::parse_units(file).with_context(|| format!("parsing {}", path.display()))?
        }
        None => seed_data::seed_units().to_vec(),
    };
    Ok(rows.iter().map(NewUnit::from).collect())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let store = UnitStore::open(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;

    match args.command {
        Command::Seed { csv } => {
            let units = load_units(csv)?;
            let report = store.seed(units).context("seeding units")?;
            print_json(&report, args.pretty)?;
        }
        Command::Search { query, category, region, era } => {
            let filter = SearchFilter { category, region, era };
            print_json(&store.search_filtered(&query, &filter), args.pretty)?;
        }
        Command::Suggest { query, limit } => {
            print_json(&store.suggestions(&query, limit), args.pretty)?;
        }
        Command::Convert { from, to, value } => {
            let conversion = store.convert(from, to, value)?;
            print_json(&conversion, args.pretty)?;
        }
        Command::Show { id } => match store.unit(id)? {
            Some(detail) => print_json(&detail, args.pretty)?,
            None => bail!("no verified unit with id {}", id),
        },
        Command::Browse { category } => {
            print_json(&store.units_by_category(&category)?, args.pretty)?;
        }
    }

    Ok(())
}

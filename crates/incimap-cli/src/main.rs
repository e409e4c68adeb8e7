use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use incimap_engine::{
    Dataset, FilterConfig, FilterEngine, FilterResult, FilterSet, Record, aggregate,
    definitions_from_json,
};

#[derive(Parser)]
#[command(name = "incimap")]
#[command(about = "Filter and aggregate incident record datasets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Filtering options shared by every subcommand.
#[derive(Args)]
struct FilterArgs {
    /// Path to a dataset JSON file ({settings, deaths})
    #[arg(short, long)]
    dataset: PathBuf,

    /// Filter criteria as field=value (can be specified multiple times)
    #[arg(short, long = "filter", value_name = "FIELD=VALUE")]
    filters: Vec<String>,

    /// Enable the expr:(...) expression path for filter values
    #[arg(long)]
    expressions: bool,

    /// Minimum search token length
    #[arg(long, default_value_t = 3)]
    min_search_length: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a dataset and print the matching records as JSON
    Filter {
        #[command(flatten)]
        args: FilterArgs,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Compute per-criterion counts over the (optionally filtered) dataset
    Aggregate {
        #[command(flatten)]
        args: FilterArgs,

        /// Path to a definitions JSON file (field -> definition config)
        #[arg(long)]
        definitions: PathBuf,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Export the filtered records as CSV
    Export {
        #[command(flatten)]
        args: FilterArgs,

        /// Output CSV path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print search suggestions gathered during a filter pass
    Suggest {
        #[command(flatten)]
        args: FilterArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Filter { args, pretty } => cmd_filter(args, pretty),
        Commands::Aggregate {
            args,
            definitions,
            pretty,
        } => cmd_aggregate(args, definitions, pretty),
        Commands::Export { args, output } => cmd_export(args, output),
        Commands::Suggest { args } => cmd_suggest(args),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_filter(args: FilterArgs, pretty: bool) {
    let (result, _) = run_filter(&args);
    print_json(&result, pretty);
    if result.errored {
        process::exit(2);
    }
}

fn cmd_aggregate(args: FilterArgs, definitions_path: PathBuf, pretty: bool) {
    let definitions_text = read_file(&definitions_path);
    let definitions = match definitions_from_json(&definitions_text) {
        Ok(defs) => defs,
        Err(e) => {
            eprintln!("Error parsing {}: {e}", definitions_path.display());
            process::exit(1);
        }
    };

    let (result, _) = run_filter(&args);
    if result.errored {
        report_expression_error(&result);
    }

    let counts = aggregate(&result.records, &definitions);
    print_json(&counts, pretty);
}

fn cmd_export(args: FilterArgs, output: Option<PathBuf>) {
    let (result, _) = run_filter(&args);
    if result.errored {
        report_expression_error(&result);
    }

    let written = match output {
        Some(path) => csv::Writer::from_path(&path)
            .and_then(|mut w| write_csv(&mut w, &result.records))
            .map_err(|e| format!("{}: {e}", path.display())),
        None => {
            let mut w = csv::Writer::from_writer(std::io::stdout());
            write_csv(&mut w, &result.records).map_err(|e| e.to_string())
        }
    };

    if let Err(e) = written {
        eprintln!("Error writing CSV: {e}");
        process::exit(1);
    }
}

fn cmd_suggest(args: FilterArgs) {
    let (result, engine) = run_filter(&args);
    if result.errored {
        report_expression_error(&result);
    }
    for suggestion in engine.suggestions() {
        println!("{suggestion}");
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run_filter(args: &FilterArgs) -> (FilterResult, FilterEngine) {
    let text = read_file(&args.dataset);
    let dataset = match Dataset::from_json(&text) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("Error parsing {}: {e}", args.dataset.display());
            process::exit(1);
        }
    };

    let filters = parse_filters(&args.filters);
    let mut engine = FilterEngine::new(FilterConfig {
        min_search_length: args.min_search_length,
        expression_mode: args.expressions,
    });
    let result = engine.filter(&dataset.deaths, &filters);
    (result, engine)
}

fn parse_filters(pairs: &[String]) -> FilterSet {
    let mut filters = FilterSet::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((field, value)) => filters.set(field.trim(), value),
            None => {
                eprintln!("Invalid filter '{pair}': expected FIELD=VALUE");
                process::exit(1);
            }
        }
    }
    filters
}

fn read_file(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn report_expression_error(result: &FilterResult) {
    let message = result.error.as_deref().unwrap_or("unknown expression error");
    eprintln!("Search expression error: {message}");
    process::exit(2);
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match out {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing output: {e}");
            process::exit(1);
        }
    }
}

const CSV_HEADER: [&str; 12] = [
    "year", "month", "day", "house", "cause", "county", "origin", "location", "section", "count",
    "lat", "lon",
];

fn write_csv<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    records: &[Record],
) -> csv::Result<()> {
    writer.write_record(CSV_HEADER)?;
    for record in records {
        let origin = record.field("origin").unwrap_or_default();
        let (lat, lon) = record
            .gps
            .map(|gps| (gps.lat.to_string(), gps.lon.to_string()))
            .unwrap_or_default();
        writer.write_record([
            record.year.clone().unwrap_or_default(),
            record.month.clone().unwrap_or_default(),
            record.day.clone().unwrap_or_default(),
            record.house.clone().unwrap_or_default(),
            record.cause.clone().unwrap_or_default(),
            record.county.clone().unwrap_or_default(),
            origin,
            record.location.clone().unwrap_or_default(),
            record.section.clone().unwrap_or_default(),
            record.count.to_string(),
            lat,
            lon,
        ])?;
    }
    writer.flush()?;
    Ok(())
}

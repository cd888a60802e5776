//! Sift command-line front end
//!
//! Parses filter expressions, evaluates them against NDJSON records and
//! renders query option objects as query strings.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sift_core::config::{ParserConfig, SiftConfig};
use sift_core::SiftResult;
use sift_queries::{Predicate, QueryOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Filter predicates and query options")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a filter expression and print its canonical form
    Parse {
        /// Filter expression, e.g. "age gt 5 and startswith(name, 'jo')"
        filter: String,
    },
    /// Print the NDJSON records that satisfy a filter
    Test {
        filter: String,
        /// Read records from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        /// Treat unresolvable property paths as satisfied
        #[arg(long)]
        allow_missing: bool,
    },
    /// Render a JSON options object as a query string
    Options {
        /// e.g. '{"$top": 5, "$filter": "a eq 1"}'
        json: String,
        /// Percent-encode option values
        #[arg(long)]
        encoded: bool,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config()?;
    debug!(?config, "Loaded configuration");

    match cli.command {
        Command::Parse { filter } => {
            let predicate = parse_filter(&filter, &config.parser)
                .with_context(|| format!("could not parse filter '{}'", filter))?;
            println!("{}", predicate);
        }
        Command::Test {
            filter,
            file,
            allow_missing,
        } => {
            let predicate = parse_filter(&filter, &config.parser)
                .with_context(|| format!("could not parse filter '{}'", filter))?;

            let reader: Box<dyn BufRead> = match &file {
                Some(path) => Box::new(BufReader::new(
                    File::open(path).with_context(|| format!("could not open {}", path.display()))?,
                )),
                None => Box::new(BufReader::new(io::stdin())),
            };

            let mut evaluation = config.evaluation.clone();
            if allow_missing {
                evaluation.fail_on_missing_association = false;
            }

            let stdout = io::stdout();
            let mut out = stdout.lock();
            let (mut seen, mut matched) = (0usize, 0usize);
            for (index, line) in reader.lines().enumerate() {
                let line = line.context("could not read input")?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: Value = serde_json::from_str(&line)
                    .with_context(|| format!("line {} is not valid JSON", index + 1))?;
                seen += 1;
                if predicate.test_with_config(&record, &evaluation) {
                    matched += 1;
                    writeln!(out, "{}", line)?;
                }
            }
            info!(seen, matched, filter = %predicate, "Filtered records");
        }
        Command::Options { json, encoded } => {
            let object: Value = serde_json::from_str(&json).context("options are not valid JSON")?;
            if !object.is_object() {
                anyhow::bail!("options must be a JSON object");
            }
            let options = QueryOptions::from_object(&object);
            debug!(count = options.len(), "Built query options");
            if encoded {
                println!("{}", options.to_query_string_encoded());
            } else {
                println!("{}", options.to_query_string());
            }
        }
    }

    Ok(())
}

fn load_config() -> SiftResult<SiftConfig> {
    Ok(SiftConfig::from_env()?)
}

fn parse_filter(text: &str, config: &ParserConfig) -> SiftResult<Predicate> {
    Ok(Predicate::try_parse_with(text, config)?)
}

/// Initialize tracing subscriber; logs go to stderr so stdout stays parseable
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,sift_cli=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true),
        )
        .init();
}

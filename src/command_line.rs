use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::{
    config::Config,
    dynamodb::{KeyAttribute, MovieStore, TableSummary},
    loader::MovieRecords,
    movie::{Movie, MovieKey},
    provision::ensure_table,
    writer::{load_movies, LoadSummary},
};

pub const USAGE: &str = "\
Usage: dynamodb-movie-loader [COMMAND]

Commands:
  load [FILE]        Create the table if needed and load movies from FILE
                     (default: $MOVIES_DATA_FILE or moviedata.json)
  provision          Create the table if needed and wait until it is active
  get YEAR TITLE     Print the info payload stored for one movie
  help               Print this message

With no command, `load` is run.";

/// A parsed command-line invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load { file: Option<PathBuf> },
    Provision,
    Get { key: MovieKey },
}

/// What a command produced, for `main` to turn into an exit status.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Loaded(LoadSummary),
    Provisioned(TableSummary),
    Found(Option<Movie>),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Loaded(summary) => summary.is_clean(),
            Outcome::Found(movie) => movie.is_some(),
            Outcome::Provisioned(_) => true,
        }
    }
}

/// Parses the arguments that follow the program name.
///
/// Returns `None` when help was asked for.
pub fn parse_args<I>(args: I) -> Result<Option<Command>>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let command = match args.next().as_deref() {
        None | Some("load") => Command::Load {
            file: args.next().map(PathBuf::from),
        },
        Some("provision") => Command::Provision,
        Some("get") => {
            let year = args
                .next()
                .ok_or_else(|| anyhow!("`get` needs a YEAR and a TITLE"))?;
            let year = year
                .parse::<i64>()
                .with_context(|| format!("YEAR must be an integer, got `{year}`"))?;
            let title = args
                .next()
                .ok_or_else(|| anyhow!("`get` needs a YEAR and a TITLE"))?;
            Command::Get {
                key: MovieKey::new(year, title),
            }
        }
        Some("help") | Some("-h") | Some("--help") => return Ok(None),
        Some(other) => bail!("unknown command `{other}`\n\n{USAGE}"),
    };

    if let Some(extra) = args.next() {
        bail!("unexpected argument `{extra}`\n\n{USAGE}");
    }
    Ok(Some(command))
}

/// Runs one command against `store` using the table described by `config`.
pub async fn run<S>(command: Command, store: &S, config: &Config) -> Result<Outcome>
where
    S: MovieStore + ?Sized,
{
    let table = config.table();

    match command {
        Command::Provision => {
            let summary = ensure_table(store, &table, &config.wait).await?;
            print_table(&summary);
            Ok(Outcome::Provisioned(summary))
        }
        Command::Load { file } => {
            let file = file.unwrap_or_else(|| config.data_file.clone());
            // Fail on an unreadable file before touching the table.
            let records = MovieRecords::open(&file)?;
            info!("Reading movies from {}", file.display());

            let summary = ensure_table(store, &table, &config.wait).await?;
            print_table(&summary);

            let summary = load_movies(store, table.name(), records, config.on_error).await?;
            println!(
                "Loaded {} movies into '{}' ({} failed{})",
                summary.written,
                table.name(),
                summary.failures.len(),
                if summary.stopped_early {
                    ", stopped at first failure"
                } else {
                    ""
                }
            );
            for failure in &summary.failures {
                match &failure.key {
                    Some(key) => println!("  record {} ({}): {}", failure.index, key, failure.reason),
                    None => println!("  record {}: {}", failure.index, failure.reason),
                }
            }
            Ok(Outcome::Loaded(summary))
        }
        Command::Get { key } => {
            let Some(item) = store.get_item(table.name(), key.to_item()).await? else {
                warn!("No movie stored for {key}");
                return Ok(Outcome::Found(None));
            };
            let movie = Movie::from_item(&item)
                .ok_or_else(|| anyhow!("stored item for {key} has no movie key"))?
                .context("stored info payload is not valid JSON")?;
            match &movie.info {
                Some(info) => println!("{}", serde_json::to_string_pretty(info)?),
                None => println!("{} has no info", movie.key),
            }
            Ok(Outcome::Found(Some(movie)))
        }
    }
}

fn print_table(summary: &TableSummary) {
    info!(
        table = %summary.name,
        status = ?summary.status,
        partition_key = %display_key(summary.partition_key.as_ref()),
        sort_key = %display_key(summary.sort_key.as_ref()),
        item_count = ?summary.item_count,
        "Table description"
    );
}

fn display_key(key: Option<&KeyAttribute>) -> String {
    key.map_or_else(|| "-".to_string(), KeyAttribute::to_string)
}

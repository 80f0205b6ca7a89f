use std::str::FromStr;
use tracing::{error, info, warn};

use crate::{
    dynamodb::{MovieStore, StoreError},
    loader::RecordError,
    movie::{Movie, MovieKey},
};

/// What the load does after a record fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Report the failure and move on to the next record.
    #[default]
    Continue,
    /// End the load at the first failure.
    Stop,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "stop" => Ok(FailurePolicy::Stop),
            other => Err(format!("expected `continue` or `stop`, got `{other}`")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("cannot encode info payload: {0}")]
    Encode(#[from] serde_dynamo::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The store became unreachable part way through a load.
///
/// `summary` holds what was done before the failure, with `stopped_early` set.
#[derive(Debug, thiserror::Error)]
#[error("load aborted after {} movies were written", .summary.written)]
pub struct LoadAborted {
    pub summary: LoadSummary,
    #[source]
    pub source: StoreError,
}

/// One record that did not make it into the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub index: usize,
    pub key: Option<MovieKey>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub written: usize,
    pub failures: Vec<RecordFailure>,
    pub stopped_early: bool,
}

impl LoadSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.stopped_early
    }
}

/// Upserts one movie into `table_name`.
pub async fn write_movie<S>(store: &S, table_name: &str, movie: &Movie) -> Result<(), WriteError>
where
    S: MovieStore + ?Sized,
{
    let item = movie.to_item()?;
    store.put_item(table_name, item).await?;
    info!("PutItem succeeded: {}", movie.key);
    Ok(())
}

/// Writes every record to `table_name`, one at a time, in input order.
///
/// Per-record problems are collected in the summary according to `policy`.
/// Malformed input ends the load under either policy, since nothing after
/// it can be read. A client-side store failure ends the load with
/// [`LoadAborted`], which carries the progress made so far.
pub async fn load_movies<S, I>(
    store: &S,
    table_name: &str,
    records: I,
    policy: FailurePolicy,
) -> Result<LoadSummary, LoadAborted>
where
    S: MovieStore + ?Sized,
    I: IntoIterator<Item = Result<Movie, RecordError>>,
{
    let mut summary = LoadSummary::default();

    for (index, record) in records.into_iter().enumerate() {
        let (failure, fatal) = match record {
            Ok(movie) => match write_movie(store, table_name, &movie).await {
                Ok(()) => {
                    summary.written += 1;
                    continue;
                }
                Err(WriteError::Store(source)) if source.is_client() => {
                    summary.stopped_early = true;
                    error!(
                        written = summary.written,
                        "Unable to add movie: {}; aborting load", movie.key
                    );
                    return Err(LoadAborted { summary, source });
                }
                Err(err) => {
                    error!("Unable to add movie: {}: {}", movie.key, err);
                    let failure = RecordFailure {
                        index,
                        key: Some(movie.key),
                        reason: err.to_string(),
                    };
                    (failure, false)
                }
            },
            Err(err) => {
                warn!("Skipping {}", err);
                let index = err.index();
                let (reason, fatal) = match err {
                    RecordError::Invalid { reason, .. } => (reason.to_string(), false),
                    RecordError::Malformed { message, .. } => {
                        (format!("malformed input: {message}"), true)
                    }
                };
                let failure = RecordFailure {
                    index,
                    key: None,
                    reason,
                };
                (failure, fatal)
            }
        };

        summary.failures.push(failure);
        if fatal || policy == FailurePolicy::Stop {
            summary.stopped_early = true;
            break;
        }
    }

    info!(
        written = summary.written,
        failed = summary.failures.len(),
        stopped_early = summary.stopped_early,
        "Load finished"
    );
    Ok(summary)
}

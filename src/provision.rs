use std::time::Duration;
use tracing::{info, warn};

use crate::{
    dynamodb::{CreateOutcome, KeyAttribute, MovieStore, StoreError, Table, TableStatus, TableSummary},
    utils::poll_with_backoff,
};

/// How long and how often to poll while a table becomes active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("table request failed")]
    Store(#[from] StoreError),
    #[error("table '{table}' exists with key schema {found}, expected {expected}")]
    SchemaMismatch {
        table: String,
        expected: String,
        found: String,
    },
    #[error("table '{table}' is {status:?} and cannot accept writes")]
    Unusable { table: String, status: TableStatus },
    #[error("table '{table}' did not become active within {waited:?}")]
    Timeout { table: String, waited: Duration },
}

/// Makes sure `table` exists with the requested key schema and is `ACTIVE`.
///
/// Creates the table when it is missing and never modifies one that is
/// already there. Blocks, polling `DescribeTable`, until the table is ready
/// or `wait.timeout` elapses.
pub async fn ensure_table<S>(
    store: &S,
    table: &Table,
    wait: &WaitOptions,
) -> Result<TableSummary, ProvisionError>
where
    S: MovieStore + ?Sized,
{
    match store.describe_table(table.name()).await? {
        Some(summary) => {
            check_keys(&summary, table)?;
            if summary.status == TableStatus::Active {
                info!("Table '{}' is already active", table.name());
                return Ok(summary);
            }
            info!("Table '{}' exists with status {:?}", table.name(), summary.status);
        }
        None => {
            info!("Attempting to create table '{}'; please wait...", table.name());
            if store.create_table(table).await? == CreateOutcome::AlreadyExists {
                warn!("Table '{}' was created concurrently", table.name());
            }
        }
    }

    let ready = poll_with_backoff(
        || check_status(store, table),
        wait.initial_delay,
        wait.max_delay,
        wait.timeout,
    )
    .await?;

    ready.ok_or_else(|| ProvisionError::Timeout {
        table: table.name().to_string(),
        waited: wait.timeout,
    })
}

async fn check_status<S>(store: &S, table: &Table) -> Result<Option<TableSummary>, ProvisionError>
where
    S: MovieStore + ?Sized,
{
    let Some(summary) = store.describe_table(table.name()).await? else {
        // Not visible yet right after creation.
        return Ok(None);
    };
    check_keys(&summary, table)?;
    match &summary.status {
        TableStatus::Active => {}
        TableStatus::Creating | TableStatus::Updating => return Ok(None),
        status => {
            return Err(ProvisionError::Unusable {
                table: table.name().to_string(),
                status: status.clone(),
            })
        }
    }
    Ok(Some(summary))
}

fn check_keys(summary: &TableSummary, table: &Table) -> Result<(), ProvisionError> {
    if summary.matches_keys(table) {
        return Ok(());
    }
    Err(ProvisionError::SchemaMismatch {
        table: table.name().to_string(),
        expected: key_schema(Some(table.partition_key()), table.sort_key()),
        found: key_schema(summary.partition_key.as_ref(), summary.sort_key.as_ref()),
    })
}

/// Renders a key schema as `(year: N, title: S)`; an unknown partition key is `?`.
fn key_schema(partition: Option<&KeyAttribute>, sort: Option<&KeyAttribute>) -> String {
    let partition = partition.map_or_else(|| "?".to_string(), KeyAttribute::to_string);
    match sort {
        Some(sort) => format!("({partition}, {sort})"),
        None => format!("({partition})"),
    }
}

//! Scenario tests for provisioning and loading.
//!
//! Most tests run against `MemoryStore`, an in-process `MovieStore` that
//! mimics the parts of DynamoDB this program relies on: tables go through
//! `CREATING` before `ACTIVE`, creating an existing table is reported as
//! such, and `PutItem` replaces any item with the same key.
//!
//! # Live tests
//!
//! Tests marked `#[ignore]` talk to a real DynamoDB. Set the following in
//! your `.env` file:
//!
//! ```text
//! AWS_ACCESS_KEY_ID=your_access_key
//! AWS_SECRET_ACCESS_KEY=your_secret_key
//! AWS_REGION=your_preferred_region
//! ```
//!
//! For DynamoDB Local, dummy credentials work together with:
//!
//! ```text
//! AWS_ENDPOINT_URL=http://localhost:8000
//! ```
//!
//! and run them with `cargo test -- --ignored`. They may incur AWS charges
//! against a real account.

use async_trait::async_trait;
use serde_json::json;
use std::{
    collections::{HashMap, HashSet},
    io::BufReader,
    sync::Mutex,
    time::Duration,
};
use tracing::{info, instrument};

use crate::{
    command_line::{self, Command, Outcome},
    config::Config,
    dynamodb::{
        CreateOutcome, DynamoDb, ErrorType, Item, KeyAttribute, MovieStore, StoreError, Table,
        TableStatus, TableSummary,
    },
    loader::MovieRecords,
    movie::{movies_table, Movie, MovieKey, TITLE_ATTRIBUTE, YEAR_ATTRIBUTE},
    provision::{ensure_table, ProvisionError, WaitOptions},
    writer::{load_movies, write_movie, FailurePolicy},
};

const TEST_TABLE_NAME: &str = "test-movies";

struct MemoryTable {
    table: Table,
    status: TableStatus,
    polls_until_active: usize,
    items: HashMap<MovieKey, Item>,
}

#[derive(Default)]
struct MemoryStore {
    tables: Mutex<HashMap<String, MemoryTable>>,
    create_calls: Mutex<usize>,
    creating_polls: usize,
    stuck_creating: bool,
    rejected_titles: HashSet<String>,
    unreachable: bool,
    unreachable_after_puts: Option<usize>,
    puts: Mutex<usize>,
}

impl MemoryStore {
    fn new() -> Self {
        Self::default()
    }

    /// Tables report `CREATING` for this many describes before turning `ACTIVE`.
    fn with_creating_polls(mut self, polls: usize) -> Self {
        self.creating_polls = polls;
        self
    }

    fn stuck_creating(mut self) -> Self {
        self.stuck_creating = true;
        self
    }

    fn rejecting(mut self, title: &str) -> Self {
        self.rejected_titles.insert(title.to_string());
        self
    }

    fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Accepts this many `PutItem` calls, then behaves as if the network went away.
    fn unreachable_after_puts(mut self, puts: usize) -> Self {
        self.unreachable_after_puts = Some(puts);
        self
    }

    fn with_table(self, table: Table, status: TableStatus) -> Self {
        self.tables.lock().unwrap().insert(
            table.name().to_string(),
            MemoryTable {
                table,
                status,
                polls_until_active: 0,
                items: HashMap::new(),
            },
        );
        self
    }

    fn create_calls(&self) -> usize {
        *self.create_calls.lock().unwrap()
    }

    fn item_count(&self, table_name: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(table_name)
            .map_or(0, |t| t.items.len())
    }

    fn stored_table(&self, table_name: &str) -> Option<Table> {
        self.tables
            .lock()
            .unwrap()
            .get(table_name)
            .map(|t| t.table.clone())
    }

    fn key_of(item: &Item) -> MovieKey {
        MovieKey::new(
            item.get_number(YEAR_ATTRIBUTE).unwrap(),
            item.get_string(TITLE_ATTRIBUTE).unwrap().as_str(),
        )
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.unreachable {
            return Err(StoreError::Client {
                message: "dispatch failure: connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(table_name: &str) -> StoreError {
        StoreError::Service {
            message: format!("Requested resource not found: Table: {table_name} not found"),
            status_code: 400,
            code: "ResourceNotFoundException".to_string(),
            error_type: ErrorType::Client,
            request_id: Some("MEMORY".to_string()),
        }
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn describe_table(&self, table_name: &str) -> Result<Option<TableSummary>, StoreError> {
        self.check_reachable()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(entry) = tables.get_mut(table_name) else {
            return Ok(None);
        };

        if entry.status == TableStatus::Creating && !self.stuck_creating {
            if entry.polls_until_active == 0 {
                entry.status = TableStatus::Active;
            } else {
                entry.polls_until_active -= 1;
            }
        }

        Ok(Some(TableSummary {
            name: table_name.to_string(),
            status: entry.status.clone(),
            partition_key: Some(entry.table.partition_key().clone()),
            sort_key: entry.table.sort_key().cloned(),
            item_count: Some(entry.items.len() as i64),
        }))
    }

    async fn create_table(&self, table: &Table) -> Result<CreateOutcome, StoreError> {
        self.check_reachable()?;
        *self.create_calls.lock().unwrap() += 1;
        let mut tables = self.tables.lock().unwrap();
        if tables.contains_key(table.name()) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        tables.insert(
            table.name().to_string(),
            MemoryTable {
                table: table.clone(),
                status: TableStatus::Creating,
                polls_until_active: self.creating_polls,
                items: HashMap::new(),
            },
        );
        Ok(CreateOutcome::Created)
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), StoreError> {
        self.check_reachable()?;
        {
            let mut puts = self.puts.lock().unwrap();
            if self.unreachable_after_puts.is_some_and(|limit| *puts >= limit) {
                return Err(StoreError::Client {
                    message: "dispatch failure: connection reset".to_string(),
                });
            }
            *puts += 1;
        }
        let key = Self::key_of(&item);
        if self.rejected_titles.contains(&key.title) {
            return Err(StoreError::Service {
                message: "The level of configured provisioned throughput for the table was exceeded"
                    .to_string(),
                status_code: 400,
                code: "ProvisionedThroughputExceededException".to_string(),
                error_type: ErrorType::Client,
                request_id: Some("MEMORY".to_string()),
            });
        }
        let mut tables = self.tables.lock().unwrap();
        let entry = tables
            .get_mut(table_name)
            .ok_or_else(|| Self::not_found(table_name))?;
        entry.items.insert(key, item);
        Ok(())
    }

    async fn get_item(&self, table_name: &str, key: Item) -> Result<Option<Item>, StoreError> {
        self.check_reachable()?;
        let tables = self.tables.lock().unwrap();
        let entry = tables
            .get(table_name)
            .ok_or_else(|| Self::not_found(table_name))?;
        Ok(entry.items.get(&Self::key_of(&key)).cloned())
    }
}

fn quick_wait() -> WaitOptions {
    WaitOptions {
        timeout: Duration::from_secs(5),
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

fn test_config() -> Config {
    let mut config = Config::from_lookup(|_| None).unwrap();
    config.table_name = TEST_TABLE_NAME.to_string();
    config.wait = quick_wait();
    config
}

fn records(input: &str) -> MovieRecords<BufReader<&[u8]>> {
    MovieRecords::from_reader(input.as_bytes()).unwrap()
}

async fn ready_store() -> MemoryStore {
    let store = MemoryStore::new();
    ensure_table(&store, &movies_table(TEST_TABLE_NAME), &quick_wait())
        .await
        .unwrap();
    store
}

async fn lookup(store: &MemoryStore, key: MovieKey) -> Option<Movie> {
    store
        .get_item(TEST_TABLE_NAME, key.to_item())
        .await
        .unwrap()
        .map(|item| Movie::from_item(&item).unwrap().unwrap())
}

// --- Provisioning ---

#[tokio::test]
async fn provision_creates_and_waits_until_active() {
    let store = MemoryStore::new().with_creating_polls(3);
    let table = movies_table(TEST_TABLE_NAME);

    let summary = ensure_table(&store, &table, &quick_wait()).await.unwrap();

    assert_eq!(summary.status, TableStatus::Active);
    assert_eq!(summary.partition_key, Some(KeyAttribute::number("year")));
    assert_eq!(summary.sort_key, Some(KeyAttribute::string("title")));
    assert_eq!(store.create_calls(), 1);
}

#[tokio::test]
async fn provision_twice_is_idempotent() {
    let store = MemoryStore::new();
    let table = movies_table(TEST_TABLE_NAME);

    let first = ensure_table(&store, &table, &quick_wait()).await.unwrap();
    let second = ensure_table(&store, &table, &quick_wait()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.create_calls(), 1);
    assert_eq!(store.stored_table(TEST_TABLE_NAME), Some(table));
}

#[tokio::test]
async fn provision_leaves_mismatched_table_alone() {
    let other = Table::new(
        TEST_TABLE_NAME,
        KeyAttribute::string("category"),
        Some(KeyAttribute::string("product_name")),
    );
    let store = MemoryStore::new().with_table(other.clone(), TableStatus::Active);

    let err = ensure_table(&store, &movies_table(TEST_TABLE_NAME), &quick_wait())
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::SchemaMismatch { .. }));
    assert_eq!(store.create_calls(), 0);
    assert_eq!(store.stored_table(TEST_TABLE_NAME), Some(other));
}

#[tokio::test]
async fn provision_rejects_table_with_other_key_types() {
    let other = Table::new(
        TEST_TABLE_NAME,
        KeyAttribute::string("year"),
        Some(KeyAttribute::number("title")),
    );
    let store = MemoryStore::new().with_table(other.clone(), TableStatus::Active);

    let err = ensure_table(&store, &movies_table(TEST_TABLE_NAME), &quick_wait())
        .await
        .unwrap_err();

    match err {
        ProvisionError::SchemaMismatch { expected, found, .. } => {
            assert_eq!(expected, "(year: N, title: S)");
            assert_eq!(found, "(year: S, title: N)");
        }
        other => panic!("expected a schema mismatch, got {other:?}"),
    }
    assert_eq!(store.create_calls(), 0);
    assert_eq!(store.stored_table(TEST_TABLE_NAME), Some(other));
}

#[tokio::test]
async fn provision_times_out_with_tiny_capped_delay() {
    let store = MemoryStore::new().stuck_creating();
    let wait = WaitOptions {
        timeout: Duration::from_millis(300),
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
    };

    let err = ensure_table(&store, &movies_table(TEST_TABLE_NAME), &wait)
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Timeout { .. }));
}

#[tokio::test]
async fn provision_times_out() {
    let store = MemoryStore::new().stuck_creating();
    let wait = WaitOptions {
        timeout: Duration::from_millis(20),
        ..quick_wait()
    };

    let err = ensure_table(&store, &movies_table(TEST_TABLE_NAME), &wait)
        .await
        .unwrap_err();

    match err {
        ProvisionError::Timeout { table, waited } => {
            assert_eq!(table, TEST_TABLE_NAME);
            assert_eq!(waited, Duration::from_millis(20));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn provision_rejects_deleting_table() {
    let store =
        MemoryStore::new().with_table(movies_table(TEST_TABLE_NAME), TableStatus::Deleting);

    let err = ensure_table(&store, &movies_table(TEST_TABLE_NAME), &quick_wait())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::Unusable {
            status: TableStatus::Deleting,
            ..
        }
    ));
}

#[tokio::test]
async fn provision_surfaces_client_errors() {
    let store = MemoryStore::new().unreachable();

    let err = ensure_table(&store, &movies_table(TEST_TABLE_NAME), &quick_wait())
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Store(StoreError::Client { .. })));
}

// --- Loading ---

#[tokio::test]
async fn single_record_round_trips() {
    let store = ready_store().await;
    let input = r#"[{"year":1989,"title":"Bill & Ted's Excellent Adventure","info":{"rating":"****"}}]"#;

    let summary = load_movies(&store, TEST_TABLE_NAME, records(input), FailurePolicy::Continue)
        .await
        .unwrap();

    assert_eq!(summary.written, 1);
    assert!(summary.is_clean());
    let movie = lookup(&store, MovieKey::new(1989, "Bill & Ted's Excellent Adventure"))
        .await
        .unwrap();
    assert_eq!(movie.info, Some(json!({ "rating": "****" })));
}

#[tokio::test]
async fn info_payload_deep_equals_source() {
    let store = ready_store().await;
    let info = json!({
        "directors": ["Alice Smith", "Bob Jones"],
        "release_date": "2013-01-18T00:00:00Z",
        "rating": "6.2",
        "genres": ["Comedy", "Drama"],
        "image_url": "http://ia.media-imdb.com/images/N/O9ERWAU7FS797AJ7LU8HN09AMUP908RLlo5JF90EWR7LJKQ7@@._V1_SX400_.jpg",
        "plot": "A rock band plays their music at high volumes, annoying the neighbors.",
        "rank": 11,
        "running_time_secs": 5215,
        "actors": ["David Matthewman", "Ann Thomas", "Jonathan G. Neff"],
        "awards": { "won": false, "nominations": [] }
    });
    let input = json!([{ "year": 2013, "title": "Turn It Down, Or Else!", "info": info }]);

    load_movies(
        &store,
        TEST_TABLE_NAME,
        records(&input.to_string()),
        FailurePolicy::Continue,
    )
    .await
    .unwrap();

    let movie = lookup(&store, MovieKey::new(2013, "Turn It Down, Or Else!"))
        .await
        .unwrap();
    assert_eq!(movie.info, Some(info));
}

#[tokio::test]
async fn later_duplicate_wins() {
    let store = ready_store().await;
    let input = r#"[
        {"year": 1980, "title": "Airplane", "info": {"rating": "***"}},
        {"year": 1980, "title": "Airplane", "info": {"rating": "*****"}}
    ]"#;

    let summary = load_movies(&store, TEST_TABLE_NAME, records(input), FailurePolicy::Continue)
        .await
        .unwrap();

    assert_eq!(summary.written, 2);
    assert_eq!(store.item_count(TEST_TABLE_NAME), 1);
    let movie = lookup(&store, MovieKey::new(1980, "Airplane")).await.unwrap();
    assert_eq!(movie.info, Some(json!({ "rating": "*****" })));
}

#[tokio::test]
async fn n_records_make_n_items() {
    let store = ready_store().await;
    let input = serde_json::Value::Array(
        (0..25)
            .map(|i| json!({ "year": 1990 + i % 5, "title": format!("Movie {i}"), "info": { "rank": i } }))
            .collect(),
    );

    let summary = load_movies(
        &store,
        TEST_TABLE_NAME,
        records(&input.to_string()),
        FailurePolicy::Continue,
    )
    .await
    .unwrap();

    assert_eq!(summary.written, 25);
    assert_eq!(store.item_count(TEST_TABLE_NAME), 25);
}

const WITH_BAD_RECORD: &str = r#"[
    {"year": 2013, "title": "Rush", "info": {}},
    {"year": 2013, "info": {"plot": "no title"}},
    {"year": 1980, "title": "Airplane", "info": {}}
]"#;

#[tokio::test]
async fn invalid_record_is_reported_and_skipped() {
    let store = ready_store().await;

    let summary = load_movies(
        &store,
        TEST_TABLE_NAME,
        records(WITH_BAD_RECORD),
        FailurePolicy::Continue,
    )
    .await
    .unwrap();

    assert_eq!(summary.written, 2);
    assert!(!summary.stopped_early);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].index, 1);
    assert_eq!(summary.failures[0].key, None);
    assert!(lookup(&store, MovieKey::new(1980, "Airplane")).await.is_some());
}

#[tokio::test]
async fn stop_policy_halts_at_invalid_record() {
    let store = ready_store().await;

    let summary = load_movies(&store, TEST_TABLE_NAME, records(WITH_BAD_RECORD), FailurePolicy::Stop)
        .await
        .unwrap();

    assert_eq!(summary.written, 1);
    assert!(summary.stopped_early);
    assert_eq!(store.item_count(TEST_TABLE_NAME), 1);
    assert!(lookup(&store, MovieKey::new(1980, "Airplane")).await.is_none());
}

#[tokio::test]
async fn rejected_write_respects_policy() {
    let input = r#"[
        {"year": 2013, "title": "Rush"},
        {"year": 2013, "title": "Prisoners"},
        {"year": 2013, "title": "Gravity"}
    ]"#;

    let store = ready_store().await.rejecting("Prisoners");
    let summary = load_movies(&store, TEST_TABLE_NAME, records(input), FailurePolicy::Continue)
        .await
        .unwrap();
    assert_eq!(summary.written, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].key, Some(MovieKey::new(2013, "Prisoners")));
    assert!(summary.failures[0]
        .reason
        .contains("ProvisionedThroughputExceededException"));

    let store = ready_store().await.rejecting("Prisoners");
    let summary = load_movies(&store, TEST_TABLE_NAME, records(input), FailurePolicy::Stop)
        .await
        .unwrap();
    assert_eq!(summary.written, 1);
    assert!(summary.stopped_early);
}

#[tokio::test]
async fn client_error_aborts_load() {
    let store = MemoryStore::new().unreachable();
    let input = r#"[{"year": 2013, "title": "Rush"}, {"year": 2013, "title": "Gravity"}]"#;

    let err = load_movies(&store, TEST_TABLE_NAME, records(input), FailurePolicy::Continue)
        .await
        .unwrap_err();

    assert!(err.source.is_client());
    assert_eq!(err.summary.written, 0);
}

#[tokio::test]
async fn aborted_load_keeps_progress() {
    let store = ready_store().await.unreachable_after_puts(1);
    let input = r#"[
        {"year": 2013, "title": "Rush"},
        {"year": 2013, "title": "Gravity"},
        {"year": 2013, "title": "Prisoners"}
    ]"#;

    let err = load_movies(&store, TEST_TABLE_NAME, records(input), FailurePolicy::Continue)
        .await
        .unwrap_err();

    assert_eq!(err.summary.written, 1);
    assert!(err.summary.stopped_early);
    assert!(err.source.is_client());
    assert_eq!(err.to_string(), "load aborted after 1 movies were written");
    assert_eq!(store.item_count(TEST_TABLE_NAME), 1);
}

#[tokio::test]
async fn truncated_input_keeps_earlier_records() {
    let store = ready_store().await;
    let input = r#"[{"year": 2013, "title": "Rush"}, {"year": "#;

    let summary = load_movies(&store, TEST_TABLE_NAME, records(input), FailurePolicy::Continue)
        .await
        .unwrap();

    assert_eq!(summary.written, 1);
    assert!(summary.stopped_early);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].index, 1);
    assert!(summary.failures[0].reason.starts_with("malformed input"));
    assert!(lookup(&store, MovieKey::new(2013, "Rush")).await.is_some());
}

#[tokio::test]
async fn write_movie_upserts_one_item() {
    let store = ready_store().await;
    let movie = Movie {
        key: MovieKey::new(1980, "Airplane"),
        info: Some(json!({ "rating": "*****", "fans": ["James", "Billy Bob"] })),
    };

    write_movie(&store, TEST_TABLE_NAME, &movie).await.unwrap();

    assert_eq!(lookup(&store, movie.key.clone()).await, Some(movie));
}

// --- Commands ---

#[tokio::test]
async fn load_command_provisions_then_loads() {
    let store = MemoryStore::new().with_creating_polls(2);
    let path = std::env::temp_dir().join(format!("movies-command-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"[{"year":1989,"title":"Bill & Ted's Excellent Adventure","info":{"rating":"****"}}]"#,
    )
    .unwrap();

    let outcome = command_line::run(
        Command::Load {
            file: Some(path.clone()),
        },
        &store,
        &test_config(),
    )
    .await;
    std::fs::remove_file(&path).unwrap();

    let outcome = outcome.unwrap();
    assert!(outcome.is_success());
    assert!(matches!(outcome, Outcome::Loaded(ref s) if s.written == 1));
    assert_eq!(store.create_calls(), 1);
}

#[tokio::test]
async fn load_command_checks_file_before_provisioning() {
    let store = MemoryStore::new();
    let missing = std::env::temp_dir().join("movies-command-missing.json");

    let result = command_line::run(Command::Load { file: Some(missing) }, &store, &test_config()).await;

    assert!(result.is_err());
    assert_eq!(store.create_calls(), 0);
}

#[tokio::test]
async fn get_command_finds_loaded_movie() {
    let store = ready_store().await;
    let input = r#"[{"year": 1980, "title": "Airplane", "info": {"rating": "*****"}}]"#;
    load_movies(&store, TEST_TABLE_NAME, records(input), FailurePolicy::Continue)
        .await
        .unwrap();

    let found = command_line::run(
        Command::Get {
            key: MovieKey::new(1980, "Airplane"),
        },
        &store,
        &test_config(),
    )
    .await
    .unwrap();
    assert!(found.is_success());

    let missing = command_line::run(
        Command::Get {
            key: MovieKey::new(1981, "Airplane"),
        },
        &store,
        &test_config(),
    )
    .await
    .unwrap();
    assert_eq!(missing, Outcome::Found(None));
    assert!(!missing.is_success());
}

#[tokio::test]
async fn provision_command_reports_active_table() {
    let store = MemoryStore::new();

    let outcome = command_line::run(Command::Provision, &store, &test_config())
        .await
        .unwrap();

    match outcome {
        Outcome::Provisioned(summary) => assert_eq!(summary.status, TableStatus::Active),
        other => panic!("expected a table summary, got {other:?}"),
    }
}

// --- Live DynamoDB ---

#[tokio::test]
#[ignore = "requires DynamoDB credentials or DynamoDB Local"]
#[instrument]
async fn live_provision_and_load() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    info!("Loading SDK config from env");
    let mut config = Config::from_env()?;
    config.table_name = TEST_TABLE_NAME.to_string();
    let ddb = DynamoDb::new(&config.load_sdk_config().await);
    ddb.check_auth().await?;

    info!("Setting up test table");
    let table = config.table();
    ensure_table(&ddb, &table, &config.wait).await?;
    ensure_table(&ddb, &table, &config.wait).await?;

    info!("Loading records");
    let input = r#"[
        {"year": 1989, "title": "Bill & Ted's Excellent Adventure", "info": {"rating": "****"}},
        {"year": 1980, "title": "Airplane", "info": {"rating": "*****", "fans": ["James", "Billy Bob"]}}
    ]"#;
    let summary = load_movies(&ddb, table.name(), records(input), FailurePolicy::Continue).await?;
    assert_eq!(summary.written, 2);

    let item = ddb
        .get_item(table.name(), MovieKey::new(1989, "Bill & Ted's Excellent Adventure").to_item())
        .await?
        .expect("item was just written");
    let movie = Movie::from_item(&item).expect("key attributes present")?;
    assert_eq!(movie.info, Some(json!({ "rating": "****" })));

    Ok(())
}

use async_trait::async_trait;

use crate::dynamodb::{Item, StoreError, Table, TableSummary};

/// Result of asking the store to create a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// The operations the provisioner and loader need from a key-value store.
///
/// `DynamoDb` implements this over the AWS SDK. Anything else that speaks
/// the same four operations can stand in for it.
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Describes a table, or returns `None` if it does not exist.
    async fn describe_table(&self, table_name: &str) -> Result<Option<TableSummary>, StoreError>;

    /// Issues a create request for `table`. A table that already exists is not an error.
    async fn create_table(&self, table: &Table) -> Result<CreateOutcome, StoreError>;

    /// Inserts or replaces one item.
    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), StoreError>;

    /// Fetches the item addressed by `key`.
    async fn get_item(&self, table_name: &str, key: Item) -> Result<Option<Item>, StoreError>;
}

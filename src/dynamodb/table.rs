use aws_sdk_dynamodb::types::{KeyType, TableDescription};

use crate::dynamodb::{Capacity, FieldType, KeyAttribute};

/// DynamoDB table configuration.
///
/// This struct represents a specific DynamoDB table and its key attributes.
/// Each DynamoDB table is a collection of items (rows) with a primary key.
///
/// # Table Structure
///
/// - **Table Name**: A unique identifier for the table within your AWS account and region.
/// - **Primary Key**: Consists of a partition key and an optional sort key.
///   - **Partition Key**: Determines the partition where the item is stored.
///   - **Sort Key**: Optional. Used to sort items with the same partition key.
/// - **Capacity**: Provisioned read/write units or on-demand billing.
///
/// # Example
///
/// ```ignore
/// let table = Table::new("Movies", KeyAttribute::number("year"), Some(KeyAttribute::string("title")))
///     .with_capacity(Capacity::Provisioned { read: 5, write: 5 });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    partition_key: KeyAttribute,
    sort_key: Option<KeyAttribute>,
    capacity: Capacity,
}

impl Table {
    /// Creates a new `Table` with the default provisioned capacity.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the DynamoDB table.
    /// * `partition_key` - The partition (hash) key attribute.
    /// * `sort_key` - The sort (range) key attribute, if any.
    pub fn new(
        name: impl Into<String>,
        partition_key: KeyAttribute,
        sort_key: Option<KeyAttribute>,
    ) -> Self {
        Self {
            name: name.into(),
            partition_key,
            sort_key,
            capacity: Capacity::default(),
        }
    }

    /// Sets the capacity mode and returns the modified `Table`.
    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Returns the name of the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the partition key of the table.
    pub fn partition_key(&self) -> &KeyAttribute {
        &self.partition_key
    }

    /// Returns the sort key of the table, if any.
    pub fn sort_key(&self) -> Option<&KeyAttribute> {
        self.sort_key.as_ref()
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }
}

/// Lifecycle status of a table as reported by `DescribeTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    Other(String),
}

impl From<&aws_sdk_dynamodb::types::TableStatus> for TableStatus {
    fn from(status: &aws_sdk_dynamodb::types::TableStatus) -> Self {
        use aws_sdk_dynamodb::types::TableStatus as Sdk;
        match status {
            Sdk::Creating => TableStatus::Creating,
            Sdk::Active => TableStatus::Active,
            Sdk::Updating => TableStatus::Updating,
            Sdk::Deleting => TableStatus::Deleting,
            other => TableStatus::Other(other.as_str().to_string()),
        }
    }
}

/// The part of a table description this program cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub name: String,
    pub status: TableStatus,
    pub partition_key: Option<KeyAttribute>,
    pub sort_key: Option<KeyAttribute>,
    pub item_count: Option<i64>,
}

impl TableSummary {
    /// Whether the described key schema has the same attribute names and
    /// scalar types as `table`.
    pub fn matches_keys(&self, table: &Table) -> bool {
        self.partition_key.as_ref() == Some(table.partition_key())
            && self.sort_key.as_ref() == table.sort_key()
    }
}

impl From<&TableDescription> for TableSummary {
    fn from(description: &TableDescription) -> Self {
        // A key whose type is missing from the attribute definitions is left
        // out, which makes it fail `matches_keys`.
        let key = |key_type: KeyType| {
            let name = description
                .key_schema()
                .iter()
                .find(|element| *element.key_type() == key_type)?
                .attribute_name();
            let field_type = description
                .attribute_definitions()
                .iter()
                .find(|definition| definition.attribute_name() == name)
                .and_then(|definition| FieldType::from_scalar_type(definition.attribute_type()))?;
            Some(KeyAttribute::new(name, field_type))
        };

        Self {
            name: description.table_name().unwrap_or_default().to_string(),
            status: description
                .table_status()
                .map(TableStatus::from)
                .unwrap_or_else(|| TableStatus::Other("UNKNOWN".to_string())),
            partition_key: key(KeyType::Hash),
            sort_key: key(KeyType::Range),
            item_count: description.item_count(),
        }
    }
}

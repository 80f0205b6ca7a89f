use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError,
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ProvisionedThroughput},
    Client,
};
use tracing::{debug, error, info};

use crate::dynamodb::{
    Capacity, CreateOutcome, Item, KeyAttribute, MovieStore, StoreError, Table, TableSummary,
};

/// DynamoDB client wrapper for high-level operations.
///
/// This struct owns the single SDK client of the process. It is built once
/// in `main` and handed by reference to the provisioner, the loader and the
/// lookup command.
///
/// # Operations
///
/// - **Describe / Create**: table provisioning
/// - **Put**: upsert an item by its primary key
/// - **Get**: retrieve an item by its primary key
///
/// # Error Handling
///
/// Every method returns [`StoreError`], which separates requests DynamoDB
/// rejected from requests that never reached it.
#[derive(Debug, Clone)]
pub struct DynamoDb {
    client: Client,
}

impl DynamoDb {
    /// Creates a new `DynamoDb` instance.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    /// Verifies that credentials resolve and are accepted by listing at most one table.
    pub async fn check_auth(&self) -> Result<(), StoreError> {
        self.client
            .list_tables()
            .limit(1)
            .send()
            .await
            .map_err(|e| {
                let err = StoreError::from(e);
                error!("Authentication failed: {}", err);
                err
            })?;
        info!("Authentication successful");
        Ok(())
    }

    fn attribute_definition(key: &KeyAttribute) -> Result<AttributeDefinition, StoreError> {
        Ok(AttributeDefinition::builder()
            .attribute_name(key.name())
            .attribute_type(key.field_type().scalar_type())
            .build()?)
    }

    fn key_schema_element(key: &KeyAttribute, key_type: KeyType) -> Result<KeySchemaElement, StoreError> {
        Ok(KeySchemaElement::builder()
            .attribute_name(key.name())
            .key_type(key_type)
            .build()?)
    }
}

#[async_trait]
impl MovieStore for DynamoDb {
    async fn describe_table(&self, table_name: &str) -> Result<Option<TableSummary>, StoreError> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(output) => Ok(output.table().map(TableSummary::from)),
            Err(SdkError::ServiceError(context))
                if context.err().is_resource_not_found_exception() =>
            {
                debug!("Table '{table_name}' not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_table(&self, table: &Table) -> Result<CreateOutcome, StoreError> {
        let mut attribute_definitions = vec![Self::attribute_definition(table.partition_key())?];
        let mut key_schema = vec![Self::key_schema_element(
            table.partition_key(),
            KeyType::Hash,
        )?];

        if let Some(sort_key) = table.sort_key() {
            attribute_definitions.push(Self::attribute_definition(sort_key)?);
            key_schema.push(Self::key_schema_element(sort_key, KeyType::Range)?);
        }

        let mut request = self
            .client
            .create_table()
            .table_name(table.name())
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema));

        request = match table.capacity() {
            Capacity::Provisioned { read, write } => request
                .billing_mode(BillingMode::Provisioned)
                .provisioned_throughput(
                    ProvisionedThroughput::builder()
                        .read_capacity_units(read)
                        .write_capacity_units(write)
                        .build()?,
                ),
            Capacity::OnDemand => request.billing_mode(BillingMode::PayPerRequest),
        };

        match request.send().await {
            Ok(_) => {
                info!("Create request accepted for table '{}'", table.name());
                Ok(CreateOutcome::Created)
            }
            Err(SdkError::ServiceError(context)) if context.err().is_resource_in_use_exception() => {
                info!("Table '{}' already exists", table.name());
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(table_name)
            .set_item(Some(item.into_attributes()))
            .send()
            .await?;

        debug!("Item added to '{table_name}'");
        Ok(())
    }

    async fn get_item(&self, table_name: &str, key: Item) -> Result<Option<Item>, StoreError> {
        let response = self
            .client
            .get_item()
            .table_name(table_name)
            .set_key(Some(key.into_attributes()))
            .send()
            .await?;

        Ok(response.item.map(Item::from))
    }
}

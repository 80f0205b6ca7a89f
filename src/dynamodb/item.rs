use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

/// Represents a DynamoDB item with various attribute types.
///
/// In DynamoDB, an item is a collection of attributes, each with a name and a value.
/// Items are similar to rows or records in other database systems.
///
/// # Primary Key
///
/// - Every item in a table is uniquely identified by its primary key.
/// - The primary key can be simple (partition key only) or composite (partition key and sort key).
///
/// # Item Size Limit
///
/// - The maximum item size in DynamoDB is 400 KB, including both attribute names and values.
///
/// # Example
///
/// ```ignore
/// let item = Item::new()
///     .set_number("year", 1989)
///     .set_string("title", "Bill & Ted's Excellent Adventure")
///     .set_json("info", &serde_json::json!({ "rating": "****" }))?;
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) attributes: HashMap<String, AttributeValue>,
}

impl Item {
    /// Creates a new empty `Item`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a string attribute.
    pub fn set_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), AttributeValue::S(value.into()));
        self
    }

    /// Sets a number attribute.
    ///
    /// DynamoDB sends numbers over the wire as strings, so any integer is
    /// stored exactly.
    pub fn set_number(mut self, key: impl Into<String>, value: impl Into<i64>) -> Self {
        self.attributes
            .insert(key.into(), AttributeValue::N(value.into().to_string()));
        self
    }

    /// Sets a document attribute from an arbitrary JSON value.
    ///
    /// Objects become maps, arrays become lists, and scalars map to their
    /// native DynamoDB types.
    pub fn set_json(
        mut self,
        key: impl Into<String>,
        value: &serde_json::Value,
    ) -> Result<Self, serde_dynamo::Error> {
        let attribute: AttributeValue = serde_dynamo::to_attribute_value(value)?;
        self.attributes.insert(key.into(), attribute);
        Ok(self)
    }

    /// Gets the value of an attribute as a string.
    ///
    /// Returns `None` if the attribute doesn't exist or is not a string.
    pub fn get_string(&self, key: &str) -> Option<&String> {
        self.attributes.get(key).and_then(|av| av.as_s().ok())
    }

    /// Gets the value of an attribute as an integer.
    ///
    /// Returns `None` if the attribute doesn't exist, is not a number, or is not integral.
    pub fn get_number(&self, key: &str) -> Option<i64> {
        self.attributes
            .get(key)
            .and_then(|av| av.as_n().ok())
            .and_then(|n| n.parse().ok())
    }

    /// Decodes a document attribute back into JSON.
    pub fn get_json(&self, key: &str) -> Option<Result<serde_json::Value, serde_dynamo::Error>> {
        self.attributes
            .get(key)
            .cloned()
            .map(serde_dynamo::from_attribute_value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn into_attributes(self) -> HashMap<String, AttributeValue> {
        self.attributes
    }
}

impl From<HashMap<String, AttributeValue>> for Item {
    fn from(attributes: HashMap<String, AttributeValue>) -> Self {
        Self { attributes }
    }
}

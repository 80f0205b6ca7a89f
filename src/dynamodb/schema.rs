use aws_sdk_dynamodb::types::ScalarAttributeType;
use std::fmt;

/// Represents the type of a key attribute in a DynamoDB table.
///
/// DynamoDB only allows scalar types for key attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Represents a string field.
    String,
    /// Represents a number field.
    Number,
    /// Represents a binary field.
    Binary,
}

impl FieldType {
    pub(crate) fn scalar_type(self) -> ScalarAttributeType {
        match self {
            FieldType::String => ScalarAttributeType::S,
            FieldType::Number => ScalarAttributeType::N,
            FieldType::Binary => ScalarAttributeType::B,
        }
    }

    pub(crate) fn from_scalar_type(scalar: &ScalarAttributeType) -> Option<Self> {
        match scalar {
            ScalarAttributeType::S => Some(FieldType::String),
            ScalarAttributeType::N => Some(FieldType::Number),
            ScalarAttributeType::B => Some(FieldType::Binary),
            _ => None,
        }
    }
}

/// A named key attribute together with its scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    name: String,
    field_type: FieldType,
}

impl KeyAttribute {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// Shorthand for a string-typed key attribute.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Shorthand for a number-typed key attribute.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

impl fmt::Display for KeyAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self.field_type {
            FieldType::String => "S",
            FieldType::Number => "N",
            FieldType::Binary => "B",
        };
        write!(f, "{}: {}", self.name, code)
    }
}

/// How the table pays for reads and writes.
///
/// - **Provisioned**: a fixed number of read and write capacity units.
/// - **On-Demand**: DynamoDB scales with the workload and bills per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Provisioned { read: i64, write: i64 },
    OnDemand,
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Provisioned { read: 5, write: 5 }
    }
}

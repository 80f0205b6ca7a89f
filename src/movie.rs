use serde_json::Value;
use std::fmt;

use crate::dynamodb::{Item, KeyAttribute, Table};

pub const YEAR_ATTRIBUTE: &str = "year";
pub const TITLE_ATTRIBUTE: &str = "title";
pub const INFO_ATTRIBUTE: &str = "info";

/// The movies table: partition key `year` (number), sort key `title` (string).
pub fn movies_table(name: impl Into<String>) -> Table {
    Table::new(
        name,
        KeyAttribute::number(YEAR_ATTRIBUTE),
        Some(KeyAttribute::string(TITLE_ATTRIBUTE)),
    )
}

/// Composite primary key of a movie item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MovieKey {
    pub year: i64,
    pub title: String,
}

impl MovieKey {
    pub fn new(year: i64, title: impl Into<String>) -> Self {
        Self {
            year,
            title: title.into(),
        }
    }

    /// The key attributes alone, as used by `GetItem`.
    pub fn to_item(&self) -> Item {
        Item::new()
            .set_number(YEAR_ATTRIBUTE, self.year)
            .set_string(TITLE_ATTRIBUTE, self.title.as_str())
    }
}

impl fmt::Display for MovieKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.year, self.title)
    }
}

/// Why a JSON element could not be turned into a movie.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRecord {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// One movie record: the key plus an opaque `info` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub key: MovieKey,
    pub info: Option<Value>,
}

impl Movie {
    /// Extracts `year` and `title` from a JSON object and keeps `info` as-is.
    pub fn from_json(value: Value) -> Result<Self, InvalidRecord> {
        let Value::Object(mut fields) = value else {
            return Err(InvalidRecord::NotAnObject);
        };

        let year = match fields.get(YEAR_ATTRIBUTE) {
            None => return Err(InvalidRecord::MissingField(YEAR_ATTRIBUTE)),
            Some(year) => year.as_i64().ok_or(InvalidRecord::WrongType {
                field: YEAR_ATTRIBUTE,
                expected: "an integer",
            })?,
        };

        let title = match fields.remove(TITLE_ATTRIBUTE) {
            None => return Err(InvalidRecord::MissingField(TITLE_ATTRIBUTE)),
            Some(Value::String(title)) => title,
            Some(_) => {
                return Err(InvalidRecord::WrongType {
                    field: TITLE_ATTRIBUTE,
                    expected: "a string",
                })
            }
        };

        Ok(Self {
            key: MovieKey { year, title },
            info: fields.remove(INFO_ATTRIBUTE),
        })
    }

    pub fn to_item(&self) -> Result<Item, serde_dynamo::Error> {
        let item = self.key.to_item();
        match &self.info {
            Some(info) => item.set_json(INFO_ATTRIBUTE, info),
            None => Ok(item),
        }
    }

    /// Decodes a stored item. Returns `None` when the key attributes are missing.
    ///
    /// DynamoDB numbers carry no integer/float distinction, so numbers inside
    /// `info` come back in their shortest form: `8.0` is read as `8` while
    /// `6.2` stays `6.2`. The numeric value is unchanged.
    pub fn from_item(item: &Item) -> Option<Result<Self, serde_dynamo::Error>> {
        let key = MovieKey {
            year: item.get_number(YEAR_ATTRIBUTE)?,
            title: item.get_string(TITLE_ATTRIBUTE)?.clone(),
        };
        Some(
            item.get_json(INFO_ATTRIBUTE)
                .transpose()
                .map(|info| Self { key, info }),
        )
    }
}

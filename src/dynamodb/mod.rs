//! # DynamoDB Module
//!
//! This module provides a high-level interface for interacting with Amazon DynamoDB.
//!
//! ## Components
//!
//! - `DynamoDb`: A client wrapper for performing DynamoDB operations.
//! - `MovieStore`: The store operations the rest of the program depends on.
//! - `Item`: Represents a DynamoDB item with various attribute types.
//! - `KeyAttribute` / `FieldType` / `Capacity`: Key schema and throughput settings.
//! - `Table`: Represents a DynamoDB table configuration.
//! - `StoreError`: Service-side rejections versus client-side failures.
//!
//! ## Usage
//!
//! The SDK configuration is built from the program's `Config`, which
//! recognises a credential profile, a region and an endpoint override:
//!
//! - `AWS_PROFILE`: The named profile to take credentials from.
//! - `AWS_REGION`: The AWS region where your DynamoDB tables are located.
//! - `AWS_ENDPOINT_URL`: For using a custom endpoint (e.g., DynamoDB Local).
//!
//! Anything left unset falls through to the SDK's default provider chain.

mod client;
mod error;
mod item;
mod schema;
mod store;
mod table;

pub use client::DynamoDb;
pub use error::{ErrorType, StoreError};
pub use item::Item;
pub use schema::{Capacity, FieldType, KeyAttribute};
pub use store::{CreateOutcome, MovieStore};
pub use table::{Table, TableStatus, TableSummary};

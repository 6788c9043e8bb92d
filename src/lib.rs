#![deny(missing_docs)]
#![deny(warnings)]

//! # DynamoDB Movies
//!
//! A movie-catalog client for Amazon DynamoDB covering table lifecycle, item CRUD,
//! batched operations, and PartiQL statements.
//!
//! ## Overview
//!
//! This library manages a movie catalog stored in a single DynamoDB table and:
//! - Marshals movie records to and from the attribute-value wire format with `serde`
//! - Supports single-item CRUD, queries by release year, projected scans, and table lifecycle
//! - Chunks batch operations to the service's 25-item limit, preserving input order
//! - Expresses the same catalog operations as PartiQL statements, single and batched
//!
//! ## Quick Example
//!
//! ```no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_movies::{movie, table};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Client::from_conf(aws_sdk_dynamodb::config::Config::builder().build());
//! let movies = table::MovieTable {
//!     table_name: "doc-example-table-movies".to_string(),
//! };
//! movies.create(&client).await?;
//!
//! // One batch write call per 25 movies, truncated to the configured cap.
//! let catalog = (2010..2040)
//!     .map(|year| movie::Movie {
//!         info: movie::Info::default(),
//!         title: format!("The Big New Movie {year}"),
//!         year,
//!     })
//!     .collect();
//! movies.add_movies(&client, catalog, Some(30)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@batch`] - Chunking and request construction for batch operations
//! - [`mod@error`] - The crate error type
//! - [`mod@movie`] - The movie record and its key types
//! - [`mod@partiql`] - Catalog operations as PartiQL statements
//! - [`mod@table`] - Catalog operations on the native DynamoDB API

/// Batch chunking and request construction shared by batched operations.
pub mod batch;

/// Errors returned by catalog operations.
pub mod error;

/// The movie record, its key, and related projections.
pub mod movie;

/// Movie operations expressed as PartiQL statements.
///
/// This module provides operations for:
/// - Inserting, getting, updating, and deleting single movies
/// - Listing the whole catalog with a projected `SELECT`
/// - Batch inserts, reads, updates, and deletes in service-sized chunks
pub mod partiql;

/// Movie operations backed by the native DynamoDB API.
///
/// This module provides operations for:
/// - Creating, inspecting, and deleting the catalog table
/// - Putting, getting, updating, and deleting single movies
/// - Querying by release year and scanning year ranges
/// - Batch writing movies in service-sized chunks
pub mod table;

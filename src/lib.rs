//! # IMF Data Client Library
//!
//! Client for the IMF SDMX JSON statistical data service. Every dataset has
//! its own dimensions and codelists, which are discovered before a query is
//! built. Responses are irregularly shaped JSON, and errors often arrive as
//! HTML bodies with status 200.
//!
//! ## Quick Start
//!
//! ```no_run
//! use imf_data_client::{DatasetQuery, ImfClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ImfClient::new();
//!
//! let query = DatasetQuery::new("PCPS")
//!     .filter("freq", ["A"])
//!     .filter("ref_area", ["W00"])
//!     .filter("indicator", ["PGOLD"])
//!     .start_year("2015")
//!     .end_year("2020");
//!
//! let response = client.dataset(&query).await?;
//! if let Some(table) = response.data.table() {
//!     for record in table {
//!         println!("{:?} {:?}", record.text("time_period"), record.decimal("obs_value"));
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`transport`] - rate-limited, retrying, optionally caching HTTP transport
//! - [`dimensions`] - dataset structure and codelist resolution
//! - [`query`] - filter validation and compact-data URL building
//! - [`normalize`] - flattening of compact-data series into records
//! - [`metadata`] - descriptive header of a query
//! - [`client`] - public calls composing the pipeline
//!
//! ## Configuration
//!
//! [`ClientConfig`] carries the application name sent as `User-Agent`, the
//! minimum idle gap between requests, the retry budget and cache settings.
//! [`ClientConfig::global`] is a read-only process-wide default built from
//! `IMF_*` environment variables.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Public client calls
pub mod client;

/// Client settings
pub mod config;

/// Dimension resolution
pub mod dimensions;

/// Endpoint URLs
pub mod endpoints;

/// Crate-level errors
pub mod error;

/// Metadata extraction
pub mod metadata;

/// Observability metrics
pub mod metrics;

/// Response normalization
pub mod normalize;

/// Object-or-array coercion
pub mod one_or_many;

/// Query building
pub mod query;

/// HTTP transport
pub mod transport;

pub use client::{DatasetData, DatasetInfo, DatasetQuery, DatasetResponse, ImfClient};
pub use config::{AppName, CacheConfig, ClientConfig, ConfigError};
pub use dimensions::{CodeEntry, Codelist, Dimension, DimensionSchema, ParameterDef, ResolveError};
pub use endpoints::{Endpoints, IMF_BASE_URL};
pub use error::{ImfError, ImfResult};
pub use metadata::{MetadataError, MetadataHeader};
pub use normalize::{FlatRecord, NormalizeError, RecordSet, Scalar};
pub use one_or_many::OneOrMany;
pub use query::{BuiltQuery, FilterSet, QueryError, QueryWarning, Year, YearRange};
pub use transport::{HttpBackend, RawResponse, Transport, TransportError, TransportResponse};

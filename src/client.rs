//! Public data-retrieval calls
//!
//! [`ImfClient`] runs the pipeline for one logical query strictly in
//! sequence: validate input, resolve dimensions, build the URL, fetch,
//! normalize, and optionally attach metadata. Input validation always
//! happens before the first request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::dimensions::{validate_dataset_id, DimensionResolver, DimensionSchema, ParameterDef};
use crate::error::{ImfError, ImfResult};
use crate::metadata::{extract_metadata, MetadataHeader};
use crate::metrics::QueryMetrics;
use crate::normalize::{extract_series, normalize, RecordSet};
use crate::one_or_many::OneOrMany;
use crate::query::{build_query, BuiltQuery, FilterSet, QueryWarning, YearRange};
use crate::transport::Transport;

/// One entry of the dataset catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Dataset id
    pub dataset_id: String,
    /// Dataset name
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(rename = "Structure")]
    structure: CatalogStructure,
}

#[derive(Debug, Deserialize)]
struct CatalogStructure {
    #[serde(rename = "Dataflows")]
    dataflows: DataflowsNode,
}

#[derive(Debug, Deserialize)]
struct DataflowsNode {
    #[serde(rename = "Dataflow", default)]
    dataflow: OneOrMany<DataflowNode>,
}

#[derive(Debug, Deserialize)]
struct DataflowNode {
    #[serde(rename = "KeyFamilyRef")]
    key_family_ref: KeyFamilyRef,
    #[serde(rename = "Name")]
    name: NameNode,
}

#[derive(Debug, Deserialize)]
struct KeyFamilyRef {
    #[serde(rename = "KeyFamilyID")]
    key_family_id: String,
}

#[derive(Debug, Deserialize)]
struct NameNode {
    #[serde(rename = "#text")]
    text: String,
}

/// Parse a dataflow catalog document
pub fn parse_catalog(json: Value) -> ImfResult<Vec<DatasetInfo>> {
    let doc: CatalogDocument =
        serde_json::from_value(json).map_err(|e| ImfError::Catalog(e.to_string()))?;
    Ok(doc
        .structure
        .dataflows
        .dataflow
        .into_list()
        .into_iter()
        .map(|flow| DatasetInfo {
            dataset_id: flow.key_family_ref.key_family_id,
            description: flow.name.text,
        })
        .collect())
}

/// A dataset request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetQuery {
    /// Dataset id
    pub dataset_id: String,
    /// Requested codes per dimension
    pub filters: FilterSet,
    /// Four-digit start year
    pub start_year: Option<String>,
    /// Four-digit end year
    pub end_year: Option<String>,
    /// Return the raw `Series` payload instead of records
    pub return_raw: bool,
    /// Attach the metadata header
    pub include_metadata: bool,
}

impl DatasetQuery {
    /// Query for a whole dataset
    pub fn new(dataset_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            ..Self::default()
        }
    }

    /// Filter a dimension on the given codes
    pub fn filter<I, S>(mut self, dimension: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.insert(dimension, codes);
        self
    }

    /// Set the start year
    pub fn start_year(mut self, year: impl Into<String>) -> Self {
        self.start_year = Some(year.into());
        self
    }

    /// Set the end year
    pub fn end_year(mut self, year: impl Into<String>) -> Self {
        self.end_year = Some(year.into());
        self
    }

    /// Return the raw payload
    pub fn raw(mut self, return_raw: bool) -> Self {
        self.return_raw = return_raw;
        self
    }

    /// Attach the metadata header
    pub fn with_metadata(mut self, include_metadata: bool) -> Self {
        self.include_metadata = include_metadata;
        self
    }
}

/// Dataset payload
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetData {
    /// Flattened records
    Table(RecordSet),
    /// `CompactData.DataSet.Series` as received
    Raw(Value),
}

impl DatasetData {
    /// Records, if the payload was flattened
    pub fn table(&self) -> Option<&RecordSet> {
        match self {
            Self::Table(set) => Some(set),
            Self::Raw(_) => None,
        }
    }

    /// Raw payload, if flattening was skipped
    pub fn raw(&self) -> Option<&Value> {
        match self {
            Self::Raw(value) => Some(value),
            Self::Table(_) => None,
        }
    }
}

/// Result of a dataset request
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetResponse {
    /// Data
    pub data: DatasetData,
    /// Metadata header, when requested
    pub metadata: Option<MetadataHeader>,
    /// Compact-data URL that was fetched
    pub url: String,
    /// Non-fatal findings from query building
    pub warnings: Vec<QueryWarning>,
}

/// Client for the IMF SDMX JSON service
#[derive(Debug, Clone)]
pub struct ImfClient {
    transport: Transport,
}

impl Default for ImfClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ImfClient {
    /// Client on the process-wide configuration, HTTP client and rate limiter
    pub fn new() -> Self {
        Self::with_config(ClientConfig::global().clone())
    }

    /// Client on explicit settings, sharing the process-wide rate limiter
    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_transport(Transport::shared(config))
    }

    /// Client on a prepared transport
    pub fn with_transport(transport: Transport) -> Self {
        Self { transport }
    }

    /// Underlying transport
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn resolver(&self) -> DimensionResolver<'_> {
        DimensionResolver::new(&self.transport)
    }

    /// List the datasets the service offers
    pub async fn list_datasets(&self) -> ImfResult<Vec<DatasetInfo>> {
        let url = self.transport.endpoints().dataflow();
        let response = self.transport.fetch(&url).await?;
        let datasets = parse_catalog(response.json)?;
        info!(count = datasets.len(), "Fetched dataset catalog");
        Ok(datasets)
    }

    /// Dimensions of a dataset with the codes each accepts
    pub async fn parameters(&self, dataset_id: &str) -> ImfResult<DimensionSchema> {
        Ok(self.resolver().resolve_dimensions(dataset_id, true).await?)
    }

    /// Parameter names and codelist descriptions, without fetching codes
    pub async fn parameter_defs(&self, dataset_id: &str, inputs_only: bool) -> ImfResult<Vec<ParameterDef>> {
        Ok(self.resolver().resolve_structure(dataset_id, inputs_only).await?)
    }

    /// Validate filters and build the compact-data URL
    pub async fn build_query(&self, dataset_id: &str, filters: &FilterSet, years: &YearRange) -> ImfResult<BuiltQuery> {
        validate_dataset_id(dataset_id)?;
        let schema = self.parameters(dataset_id).await?;
        Ok(build_query(self.transport.endpoints(), &schema, filters, years)?)
    }

    /// Fetch a dataset as records or as its raw payload
    pub async fn dataset(&self, query: &DatasetQuery) -> ImfResult<DatasetResponse> {
        let metrics = QueryMetrics::start(query.dataset_id.clone());
        let result = self.run_dataset(query).await;
        match &result {
            Ok(response) => {
                let records = response.data.table().map_or(0, RecordSet::len);
                metrics.record_success(records);
            }
            Err(e) => metrics.record_failure(&e.to_string()),
        }
        result
    }

    async fn run_dataset(&self, query: &DatasetQuery) -> ImfResult<DatasetResponse> {
        validate_dataset_id(&query.dataset_id)?;
        let years = YearRange::parse(query.start_year.as_deref(), query.end_year.as_deref())?;

        let built = self.build_query(&query.dataset_id, &query.filters, &years).await?;
        info!(dataset_id = %query.dataset_id, url = %built.url, "Requesting dataset");

        let response = self.transport.fetch(&built.url).await?;
        let series = extract_series(&response.json)?;

        let data = if query.return_raw {
            DatasetData::Raw(series.clone())
        } else {
            let table = normalize(series)?;
            debug!(
                dataset_id = %query.dataset_id,
                records = table.len(),
                columns = table.columns.len(),
                "Normalized dataset"
            );
            DatasetData::Table(table)
        };

        let metadata = if query.include_metadata {
            Some(extract_metadata(&self.transport, &built.url).await?)
        } else {
            None
        };

        Ok(DatasetResponse {
            data,
            metadata,
            url: built.url,
            warnings: built.warnings,
        })
    }

    /// Metadata header for a compact-data URL
    pub async fn metadata(&self, data_url: &str) -> ImfResult<MetadataHeader> {
        Ok(extract_metadata(&self.transport, data_url).await?)
    }
}

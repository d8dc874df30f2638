//! Parameter validation and compact-data URL building
//!
//! Filters are reconciled against a resolved [`DimensionSchema`]:
//! unknown dimension names fail hard, unknown codes within a known dimension
//! are dropped with a warning, and every unfiltered dimension becomes an empty
//! (wildcard) segment. Segments follow schema order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

use crate::dimensions::DimensionSchema;
use crate::endpoints::Endpoints;

/// Query validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Filter names a dimension the dataset does not have
    #[error("unknown dimension '{dimension}' for dataset '{dataset_id}'; valid dimensions are: {valid}")]
    UnknownDimension {
        dataset_id: String,
        dimension: String,
        valid: String,
    },

    /// Year is not four digits
    #[error("invalid {field} '{value}': expected a four-digit year")]
    InvalidYear { field: &'static str, value: String },
}

/// Result type for query building
pub type QueryResult<T> = Result<T, QueryError>;

/// Non-fatal findings while building a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryWarning {
    /// Codes not in the dimension's codelist were discarded
    DroppedCodes {
        /// Dimension the codes were requested for
        dimension: String,
        /// Discarded codes, sorted
        codes: Vec<String>,
    },
    /// No filters were supplied, so the whole dataset is requested
    WholeDataset {
        /// Dataset requested
        dataset_id: String,
    },
}

impl fmt::Display for QueryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DroppedCodes { dimension, codes } => write!(
                f,
                "discarded invalid codes for '{}': {}",
                dimension,
                codes.join(", ")
            ),
            Self::WholeDataset { dataset_id } => write!(
                f,
                "no filters supplied; requesting the entire '{dataset_id}' dataset, which may be very large"
            ),
        }
    }
}

/// Requested codes per dimension
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSet {
    /// Empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add codes for a dimension
    pub fn with<I, S>(mut self, dimension: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(dimension, codes);
        self
    }

    /// Add codes for a dimension in place
    pub fn insert<I, S>(&mut self, dimension: impl Into<String>, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters
            .entry(dimension.into())
            .or_default()
            .extend(codes.into_iter().map(Into::into));
    }

    /// Dimensions named by the filters
    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Codes requested for a dimension
    pub fn codes(&self, dimension: &str) -> Option<&BTreeSet<String>> {
        self.filters.get(dimension)
    }

    /// Whether no codes are requested at all
    pub fn is_empty(&self) -> bool {
        self.filters.values().all(BTreeSet::is_empty)
    }
}

/// A validated four-digit year
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Year(String);

impl Year {
    /// Parse a year, `field` naming it in the error
    pub fn parse(field: &'static str, value: &str) -> QueryResult<Self> {
        let trimmed = value.trim();
        if trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(QueryError::InvalidYear {
                field,
                value: value.to_string(),
            })
        }
    }

    /// Year as written in the query string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional start and end year
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearRange {
    /// `startPeriod`
    pub start: Option<Year>,
    /// `endPeriod`
    pub end: Option<Year>,
}

impl YearRange {
    /// Validate raw start and end years
    pub fn parse(start: Option<&str>, end: Option<&str>) -> QueryResult<Self> {
        Ok(Self {
            start: start.map(|s| Year::parse("start_year", s)).transpose()?,
            end: end.map(|e| Year::parse("end_year", e)).transpose()?,
        })
    }

    /// Query string without the leading `?`, empty when no bound is set
    pub fn query_string(&self) -> String {
        let mut params = Vec::new();
        if let Some(start) = &self.start {
            params.push(format!("startPeriod={start}"));
        }
        if let Some(end) = &self.end {
            params.push(format!("endPeriod={end}"));
        }
        params.join("&")
    }
}

/// A compact-data request ready to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    /// Full request URL
    pub url: String,
    /// Dot-separated dimension path
    pub path: String,
    /// Non-fatal findings
    pub warnings: Vec<QueryWarning>,
}

/// Build a compact-data URL from a schema, filters and a year range
pub fn build_query(
    endpoints: &Endpoints,
    schema: &DimensionSchema,
    filters: &FilterSet,
    years: &YearRange,
) -> QueryResult<BuiltQuery> {
    for dimension in filters.dimensions() {
        if !schema.has_dimension(dimension) {
            return Err(QueryError::UnknownDimension {
                dataset_id: schema.dataset_id().to_string(),
                dimension: dimension.to_string(),
                valid: schema.names().collect::<Vec<_>>().join(", "),
            });
        }
    }

    let mut warnings = Vec::new();
    if filters.is_empty() {
        warn!(
            dataset_id = %schema.dataset_id(),
            "No filters supplied; requesting the entire dataset"
        );
        warnings.push(QueryWarning::WholeDataset {
            dataset_id: schema.dataset_id().to_string(),
        });
    }

    let mut segments = Vec::with_capacity(schema.len());
    for dimension in schema.dimensions() {
        let Some(requested) = filters.codes(&dimension.name) else {
            segments.push(String::new());
            continue;
        };

        let dropped: Vec<String> = requested
            .iter()
            .filter(|code| !dimension.codes.contains(code))
            .cloned()
            .collect();
        if !dropped.is_empty() {
            warn!(
                dimension = %dimension.name,
                codes = %dropped.join(", "),
                "Discarding invalid codes"
            );
            warnings.push(QueryWarning::DroppedCodes {
                dimension: dimension.name.clone(),
                codes: dropped,
            });
        }

        let retained: Vec<&str> = dimension
            .codes
            .codes()
            .filter(|code| requested.contains(*code))
            .collect();
        if retained.is_empty() && !requested.is_empty() {
            warn!(
                dimension = %dimension.name,
                "No valid codes left; dimension is unfiltered"
            );
        }
        segments.push(retained.join("+"));
    }

    let path = segments.join(".");
    let mut url = endpoints.compact_data(schema.dataset_id(), &path);
    let query_string = years.query_string();
    if !query_string.is_empty() {
        url.push('?');
        url.push_str(&query_string);
    }

    Ok(BuiltQuery {
        url,
        path,
        warnings,
    })
}

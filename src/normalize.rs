//! Response Normalizer
//!
//! Flattens compact-data series into uniform records. Series and their
//! observations may each arrive as a single object or as an array; both are
//! coerced through [`OneOrMany`] before processing. Every record carries the
//! series' scalar attributes followed by one observation's fields, with names
//! lower-cased and the `@` marker stripped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::one_or_many::OneOrMany;

/// Normalization errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The query matched no series
    #[error("no data found for this query; relax the filters or the year range and try again")]
    EmptyResult,

    /// A series attribute or observation field is not a scalar
    #[error("internal consistency failure: field '{field}' holds a nested value")]
    NestedAttribute { field: String },

    /// Payload is not shaped like compact data
    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

/// Result type for normalization
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// A scalar field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Absent in this record
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(serde_json::Number),
    /// Text
    Text(String),
}

impl Scalar {
    /// Textual form, `None` for `Null`
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }

    fn from_value(field: &str, value: Value) -> NormalizeResult<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => Ok(Self::Number(n)),
            Value::String(s) => Ok(Self::Text(s)),
            Value::Array(_) | Value::Object(_) => Err(NormalizeError::NestedAttribute {
                field: field.to_string(),
            }),
        }
    }
}

/// One series attribute set joined with one observation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRecord {
    fields: BTreeMap<String, Scalar>,
}

impl FlatRecord {
    /// Value of a field
    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.fields.get(field)
    }

    /// Text of a field, `None` when absent or null
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(Scalar::as_text)
    }

    /// Parse a numeric field such as `obs_value`
    pub fn decimal(&self, field: &str) -> Option<Decimal> {
        let text = self.text(field)?;
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
    }

    /// Field names
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Records from one query sharing one column set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Column names in first-seen order
    pub columns: Vec<String>,
    /// Records, each holding every column
    pub records: Vec<FlatRecord>,
}

impl RecordSet {
    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records
    pub fn iter(&self) -> std::slice::Iter<'_, FlatRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a FlatRecord;
    type IntoIter = std::slice::Iter<'a, FlatRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Deserialize)]
struct SeriesNode {
    #[serde(rename = "Obs", default)]
    obs: Option<OneOrMany<Map<String, Value>>>,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

/// Lower-case a field name and strip its `@` marker
pub fn normalize_field_name(name: &str) -> String {
    name.trim_start_matches('@').to_lowercase()
}

/// Locate `CompactData.DataSet.Series` in a compact-data response
///
/// A missing, null or empty `Series` is an empty result.
pub fn extract_series(payload: &Value) -> NormalizeResult<&Value> {
    let Some(series) = payload.pointer("/CompactData/DataSet/Series") else {
        return Err(NormalizeError::EmptyResult);
    };
    match series {
        Value::Null => Err(NormalizeError::EmptyResult),
        Value::Array(items) if items.is_empty() => Err(NormalizeError::EmptyResult),
        Value::Object(map) if map.is_empty() => Err(NormalizeError::EmptyResult),
        Value::Array(_) | Value::Object(_) => Ok(series),
        other => Err(NormalizeError::Shape(format!(
            "Series must be an object or an array, got {other}"
        ))),
    }
}

fn push_column(columns: &mut Vec<String>, name: &str) {
    if !columns.iter().any(|c| c == name) {
        columns.push(name.to_string());
    }
}

/// Flatten a `Series` node into records
pub fn normalize(raw_series: &Value) -> NormalizeResult<RecordSet> {
    let series: OneOrMany<SeriesNode> = serde_json::from_value(raw_series.clone())
        .map_err(|e| NormalizeError::Shape(e.to_string()))?;

    let mut columns = Vec::new();
    let mut records = Vec::new();

    for node in series.into_list() {
        let mut base = BTreeMap::new();
        for (key, value) in node.attributes {
            let name = normalize_field_name(&key);
            let scalar = Scalar::from_value(&key, value)?;
            push_column(&mut columns, &name);
            base.insert(name, scalar);
        }

        let observations = node.obs.map(OneOrMany::into_list).unwrap_or_default();
        for obs in observations {
            let mut fields = base.clone();
            for (key, value) in obs {
                let name = normalize_field_name(&key);
                let scalar = Scalar::from_value(&key, value)?;
                push_column(&mut columns, &name);
                fields.insert(name, scalar);
            }
            records.push(FlatRecord { fields });
        }
    }

    for record in &mut records {
        for column in &columns {
            record
                .fields
                .entry(column.clone())
                .or_insert(Scalar::Null);
        }
    }

    Ok(RecordSet { columns, records })
}

/// Locate and flatten the series of a compact-data response
pub fn normalize_response(payload: &Value) -> NormalizeResult<RecordSet> {
    normalize(extract_series(payload)?)
}

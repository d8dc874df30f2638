//! Dimension Resolver
//!
//! Turns a dataset id into the ordered list of query dimensions and the codes
//! each one accepts. The structure document declares dimensions (with the id
//! of their codelist) and codelists (with a human-readable name) separately;
//! the two are joined by codelist id.
//!
//! `inputs_only = true` keeps one row per dimension (left join).
//! `inputs_only = false` also surfaces codelists no dimension references,
//! as rows without a parameter name (outer join).
//!
//! The `freq` dimension is never fetched: its codes are always
//! [`Codelist::freq`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::one_or_many::OneOrMany;
use crate::transport::{Transport, TransportError};

/// Name of the frequency dimension
pub const FREQ_DIMENSION: &str = "freq";

/// Dimension resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Dataset id is not a single identifier
    #[error("invalid dataset id '{0}': expected a single identifier without whitespace, '/', '?', '.' or '+'")]
    InvalidDatasetId(String),

    /// The service did not recognize the dataset
    #[error("unknown dataset '{dataset_id}': {source}. Check the id against the dataset catalog (list_datasets)")]
    UnknownDataset {
        dataset_id: String,
        #[source]
        source: TransportError,
    },

    /// Structure or codelist document did not have the expected shape
    #[error("malformed structure document for '{id}': {message}")]
    MalformedStructure { id: String, message: String },

    /// Transport failure unrelated to the dataset id
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for resolution
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Check that a dataset id is a single identifier
pub fn validate_dataset_id(dataset_id: &str) -> ResolveResult<()> {
    let forbidden = |c: char| c.is_whitespace() || matches!(c, '/' | '?' | '.' | '+' | '&' | '#');
    if dataset_id.is_empty() || dataset_id.chars().any(forbidden) {
        return Err(ResolveError::InvalidDatasetId(dataset_id.to_string()));
    }
    Ok(())
}

/// One code of a codelist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    /// Code used in query URLs
    pub input_code: String,
    /// Human-readable description
    pub description: String,
}

impl CodeEntry {
    /// Create a code entry
    pub fn new(input_code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            input_code: input_code.into(),
            description: description.into(),
        }
    }
}

/// Ordered codes accepted by one dimension, unique by input code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codelist {
    entries: Vec<CodeEntry>,
}

impl Codelist {
    /// Build a codelist, keeping the first entry for a repeated code
    pub fn new(entries: impl IntoIterator<Item = CodeEntry>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for entry in entries {
            if seen.insert(entry.input_code.clone()) {
                unique.push(entry);
            } else {
                warn!(code = %entry.input_code, "Duplicate code in codelist, keeping first");
            }
        }
        Self { entries: unique }
    }

    /// Fixed frequency codelist
    pub fn freq() -> Self {
        Self::new([
            CodeEntry::new("A", "Annual"),
            CodeEntry::new("M", "Monthly"),
            CodeEntry::new("Q", "Quarterly"),
        ])
    }

    /// Entries in service order
    pub fn entries(&self) -> &[CodeEntry] {
        &self.entries
    }

    /// Input codes in service order
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.input_code.as_str())
    }

    /// Whether `code` is a member
    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|e| e.input_code == code)
    }

    /// Description of `code`
    pub fn description(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.input_code == code)
            .map(|e| e.description.as_str())
    }

    /// Number of codes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no codes
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One row of the dimension/codelist join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Lower-cased dimension name; `None` for codelists no dimension uses
    pub parameter: Option<String>,
    /// Codelist id
    pub codelist_id: String,
    /// Codelist name; `None` when the codelist is undeclared or unnamed
    pub description: Option<String>,
    /// Whether the structure declares the codelist at all
    #[serde(default)]
    pub declared: bool,
}

impl ParameterDef {
    /// Whether this row is a query dimension
    pub fn is_input(&self) -> bool {
        self.parameter.is_some()
    }
}

/// A query dimension with its codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Lower-cased dimension name
    pub name: String,
    /// Codelist id
    pub codelist_id: String,
    /// Codelist name
    pub description: Option<String>,
    /// Accepted codes
    pub codes: Codelist,
}

/// Ordered dimensions of a dataset
///
/// Dimension order is the order of segments in a compact-data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSchema {
    dataset_id: String,
    dimensions: Vec<Dimension>,
    rows: Vec<ParameterDef>,
}

impl DimensionSchema {
    /// Assemble a schema from resolved dimensions and the join rows they came from
    pub fn new(dataset_id: impl Into<String>, dimensions: Vec<Dimension>, rows: Vec<ParameterDef>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            dimensions,
            rows,
        }
    }

    /// Dataset this schema belongs to
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Dimensions in URL order
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Join rows, including non-input codelists for an outer join
    pub fn rows(&self) -> &[ParameterDef] {
        &self.rows
    }

    /// Dimension names in URL order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.name.as_str())
    }

    /// Whether the dataset exposes a dimension
    pub fn has_dimension(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look up a dimension by name
    pub fn get(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Number of dimensions
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Whether the schema has no dimensions
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct StructureDocument {
    #[serde(rename = "Structure")]
    structure: StructureBody,
}

#[derive(Debug, Deserialize)]
struct StructureBody {
    #[serde(rename = "CodeLists", default)]
    code_lists: Option<CodeListsNode>,
    #[serde(rename = "KeyFamilies", default)]
    key_families: Option<KeyFamiliesNode>,
}

#[derive(Debug, Deserialize)]
struct CodeListsNode {
    #[serde(rename = "CodeList", default)]
    code_list: OneOrMany<CodeListNode>,
}

#[derive(Debug, Deserialize)]
struct CodeListNode {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "Name", default)]
    name: Option<TextNode>,
    #[serde(rename = "Code", default)]
    codes: OneOrMany<CodeNode>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "#text")]
    text: String,
}

#[derive(Debug, Deserialize)]
struct CodeNode {
    #[serde(rename = "@value")]
    value: String,
    #[serde(rename = "Description", default)]
    description: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct KeyFamiliesNode {
    #[serde(rename = "KeyFamily")]
    key_family: KeyFamilyNode,
}

#[derive(Debug, Deserialize)]
struct KeyFamilyNode {
    #[serde(rename = "Components")]
    components: ComponentsNode,
}

#[derive(Debug, Deserialize)]
struct ComponentsNode {
    #[serde(rename = "Dimension", default)]
    dimensions: OneOrMany<DimensionNode>,
}

#[derive(Debug, Deserialize)]
struct DimensionNode {
    #[serde(rename = "@conceptRef")]
    concept_ref: String,
    #[serde(rename = "@codelist")]
    codelist: String,
}

fn parse_structure(id: &str, json: Value) -> ResolveResult<StructureBody> {
    serde_json::from_value::<StructureDocument>(json)
        .map(|doc| doc.structure)
        .map_err(|e| ResolveError::MalformedStructure {
            id: id.to_string(),
            message: e.to_string(),
        })
}

/// Join dimensions to codelists declared in a structure document
pub fn join_structure(dataset_id: &str, json: Value, inputs_only: bool) -> ResolveResult<Vec<ParameterDef>> {
    let body = parse_structure(dataset_id, json)?;

    let key_families = body.key_families.ok_or_else(|| ResolveError::MalformedStructure {
        id: dataset_id.to_string(),
        message: "missing KeyFamilies".to_string(),
    })?;
    let codelists: Vec<(String, Option<String>)> = body
        .code_lists
        .map(|node| node.code_list.into_list())
        .unwrap_or_default()
        .into_iter()
        .map(|cl| (cl.id, cl.name.map(|n| n.text)))
        .collect();

    let mut rows: Vec<ParameterDef> = key_families
        .key_family
        .components
        .dimensions
        .into_list()
        .into_iter()
        .map(|dim| {
            let declared = codelists.iter().find(|(id, _)| *id == dim.codelist);
            ParameterDef {
                parameter: Some(dim.concept_ref.to_lowercase()),
                description: declared.and_then(|(_, name)| name.clone()),
                declared: declared.is_some(),
                codelist_id: dim.codelist,
            }
        })
        .collect();

    if !inputs_only {
        let referenced: HashSet<String> = rows.iter().map(|r| r.codelist_id.clone()).collect();
        rows.extend(
            codelists
                .into_iter()
                .filter(|(id, _)| !referenced.contains(id))
                .map(|(id, name)| ParameterDef {
                    parameter: None,
                    codelist_id: id,
                    description: name,
                    declared: true,
                }),
        );
    }

    Ok(rows)
}

/// Parse the codes of a codelist document
pub fn parse_codelist(codelist_id: &str, json: Value) -> ResolveResult<Codelist> {
    let body = parse_structure(codelist_id, json)?;
    let node = body
        .code_lists
        .and_then(|node| node.code_list.into_list().into_iter().next())
        .ok_or_else(|| ResolveError::MalformedStructure {
            id: codelist_id.to_string(),
            message: "missing CodeLists.CodeList".to_string(),
        })?;

    Ok(Codelist::new(node.codes.into_list().into_iter().map(|code| {
        CodeEntry {
            input_code: code.value,
            description: code.description.map(|d| d.text).unwrap_or_default(),
        }
    })))
}

/// Resolves dataset structure through a [`Transport`]
#[derive(Debug, Clone, Copy)]
pub struct DimensionResolver<'a> {
    transport: &'a Transport,
}

impl<'a> DimensionResolver<'a> {
    /// Create a resolver
    pub fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// Fetch the structure document and join dimensions to codelists
    ///
    /// Only one request is made; codelist contents are not fetched.
    pub async fn resolve_structure(&self, dataset_id: &str, inputs_only: bool) -> ResolveResult<Vec<ParameterDef>> {
        validate_dataset_id(dataset_id)?;

        let url = self.transport.endpoints().data_structure(dataset_id);
        let response = self.transport.fetch(&url).await.map_err(|e| match e {
            TransportError::ApiError { .. } | TransportError::MissingParameter { .. } => {
                ResolveError::UnknownDataset {
                    dataset_id: dataset_id.to_string(),
                    source: e,
                }
            }
            other => ResolveError::Transport(other),
        })?;

        let rows = join_structure(dataset_id, response.json, inputs_only)?;
        debug!(
            dataset_id = %dataset_id,
            inputs_only,
            rows = rows.len(),
            "Resolved dataset structure"
        );
        Ok(rows)
    }

    /// Resolve the dimension schema, fetching each dimension's codelist
    pub async fn resolve_dimensions(&self, dataset_id: &str, inputs_only: bool) -> ResolveResult<DimensionSchema> {
        let rows = self.resolve_structure(dataset_id, inputs_only).await?;

        let mut dimensions = Vec::new();
        for row in rows.iter() {
            let Some(name) = row.parameter.as_ref() else {
                continue;
            };

            let codes = if name == FREQ_DIMENSION {
                Codelist::freq()
            } else if !row.declared {
                debug!(
                    dataset_id = %dataset_id,
                    dimension = %name,
                    codelist_id = %row.codelist_id,
                    "Dimension has no declared codelist"
                );
                Codelist::default()
            } else {
                self.fetch_codelist(&row.codelist_id).await?
            };

            dimensions.push(Dimension {
                name: name.clone(),
                codelist_id: row.codelist_id.clone(),
                description: row.description.clone(),
                codes,
            });
        }

        info!(
            dataset_id = %dataset_id,
            dimensions = dimensions.len(),
            "Resolved dimensions"
        );
        Ok(DimensionSchema::new(dataset_id, dimensions, rows))
    }

    /// Fetch one codelist
    pub async fn fetch_codelist(&self, codelist_id: &str) -> ResolveResult<Codelist> {
        let url = self.transport.endpoints().codelist(codelist_id);
        let response = self.transport.fetch(&url).await?;
        parse_codelist(codelist_id, response.json)
    }
}

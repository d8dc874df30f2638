//! Metadata Extractor
//!
//! The service mirrors every compact-data query under a `GenericMetadata`
//! path. The header of that document carries a fixed set of descriptive
//! fields; all of them must be present.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::transport::{Transport, TransportError};

/// Metadata extraction errors
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// No data URL supplied
    #[error("must supply a data URL to derive metadata from")]
    MissingUrl,

    /// Header field absent from the metadata document
    #[error("metadata field '{field}' missing at '{pointer}'")]
    MissingField {
        field: &'static str,
        pointer: &'static str,
    },

    /// Transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for metadata extraction
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Descriptive header of a dataset query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataHeader {
    /// XML schema namespace
    #[serde(rename = "XMLschema")]
    pub xml_schema: String,
    /// Schema location message
    pub message: String,
    /// Language of the sender name
    pub language: String,
    /// When the document was prepared
    pub timestamp: String,
    /// Data custodian
    pub custodian: String,
    /// Custodian URL
    pub custodian_url: String,
    /// Custodian telephone
    pub custodian_telephone: String,
}

const FIELD_POINTERS: [(&str, &str); 7] = [
    ("XMLschema", "/GenericMetadata/@xmlns:xsd"),
    ("message", "/GenericMetadata/@xsi:schemaLocation"),
    ("language", "/GenericMetadata/Header/Sender/Name/@xml:lang"),
    ("timestamp", "/GenericMetadata/Header/Prepared"),
    ("custodian", "/GenericMetadata/Header/Sender/Name/#text"),
    ("custodian_url", "/GenericMetadata/Header/Sender/Contact/URI"),
    ("custodian_telephone", "/GenericMetadata/Header/Sender/Contact/Telephone"),
];

fn field_text(doc: &Value, field: &'static str, pointer: &'static str) -> MetadataResult<String> {
    match doc.pointer(pointer) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(MetadataError::MissingField { field, pointer }),
    }
}

/// Project the header fields from a metadata document
pub fn parse_metadata(doc: &Value) -> MetadataResult<MetadataHeader> {
    let [xml_schema, message, language, timestamp, custodian, custodian_url, custodian_telephone] =
        FIELD_POINTERS;
    Ok(MetadataHeader {
        xml_schema: field_text(doc, xml_schema.0, xml_schema.1)?,
        message: field_text(doc, message.0, message.1)?,
        language: field_text(doc, language.0, language.1)?,
        timestamp: field_text(doc, timestamp.0, timestamp.1)?,
        custodian: field_text(doc, custodian.0, custodian.1)?,
        custodian_url: field_text(doc, custodian_url.0, custodian_url.1)?,
        custodian_telephone: field_text(doc, custodian_telephone.0, custodian_telephone.1)?,
    })
}

/// Fetch and parse the metadata mirroring `data_url`
pub async fn extract_metadata(transport: &Transport, data_url: &str) -> MetadataResult<MetadataHeader> {
    if data_url.trim().is_empty() {
        return Err(MetadataError::MissingUrl);
    }

    let url = transport.endpoints().metadata_from_data_url(data_url);
    debug!(url = %url, "Fetching metadata");
    let response = transport.fetch(&url).await?;
    parse_metadata(&response.json)
}

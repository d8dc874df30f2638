//! IMF SDMX JSON endpoint layout
//!
//! The service exposes four endpoint families under one base URL plus a
//! metadata family that mirrors the compact-data paths:
//!
//! - `Dataflow` - catalog of datasets
//! - `DataStructure/{dataset}` - dimensions and codelist ids of a dataset
//! - `CodeList/{codelist}` - codes of one codelist
//! - `CompactData/{dataset}/{dims}` - observations
//! - `GenericMetadata/{dataset}/{dims}` - descriptive header for a compact-data query

/// Production base URL
pub const IMF_BASE_URL: &str = "http://dataservices.imf.org/REST/SDMX_JSON.svc";

/// Path segments of each endpoint family
#[derive(Debug, Clone)]
pub struct EndpointPaths {
    /// Dataset catalog
    pub dataflow: &'static str,
    /// Data structure lookup by dataset id
    pub data_structure: &'static str,
    /// Codelist lookup by codelist id
    pub codelist: &'static str,
    /// Compact data lookup by dataset id and dimension path
    pub compact_data: &'static str,
    /// Metadata lookup mirroring compact data
    pub generic_metadata: &'static str,
}

/// Endpoint paths of the SDMX JSON service
pub const SDMX_JSON_PATHS: EndpointPaths = EndpointPaths {
    dataflow: "Dataflow",
    data_structure: "DataStructure",
    codelist: "CodeList",
    compact_data: "CompactData",
    generic_metadata: "GenericMetadata",
};

/// URL factory bound to a base URL
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
    paths: &'static EndpointPaths,
}

impl Endpoints {
    /// Create endpoints rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            paths: &SDMX_JSON_PATHS,
        }
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Dataset catalog URL
    pub fn dataflow(&self) -> String {
        format!("{}/{}", self.base_url, self.paths.dataflow)
    }

    /// Structure URL for a dataset
    pub fn data_structure(&self, dataset_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.paths.data_structure, dataset_id)
    }

    /// Codelist URL
    pub fn codelist(&self, codelist_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.paths.codelist, codelist_id)
    }

    /// Compact data URL for a dataset and a dot-separated dimension path
    pub fn compact_data(&self, dataset_id: &str, dimension_path: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url, self.paths.compact_data, dataset_id, dimension_path
        )
    }

    /// Endpoint family a URL belongs to, used as a metrics label
    pub fn family_of(&self, url: &str) -> &'static str {
        let families = [
            self.paths.dataflow,
            self.paths.data_structure,
            self.paths.codelist,
            self.paths.compact_data,
            self.paths.generic_metadata,
        ];
        families
            .into_iter()
            .find(|family| url.contains(&format!("/{family}")))
            .unwrap_or("other")
    }

    /// Derive the metadata URL from a compact data URL
    pub fn metadata_from_data_url(&self, data_url: &str) -> String {
        data_url.replacen(self.paths.compact_data, self.paths.generic_metadata, 1)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(IMF_BASE_URL)
    }
}

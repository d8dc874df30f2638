//! Integration tests for metadata extraction

use imf_data_client::{ImfError, MetadataError};

use crate::support::{self, url, MockBackend};

#[tokio::test]
async fn test_metadata_url_derived_from_data_url() {
    let backend = MockBackend::new();
    backend.json(
        url("GenericMetadata/PCPS/A..?startPeriod=2020"),
        support::generic_metadata(),
    );
    let client = support::client(&backend);

    let header = client
        .metadata(&url("CompactData/PCPS/A..?startPeriod=2020"))
        .await
        .unwrap();

    assert_eq!(header.xml_schema, "http://www.w3.org/2001/XMLSchema");
    assert_eq!(
        header.message,
        "http://www.SDMX.org/resources/SDMXML/schemas/v2_0/message"
    );
    assert_eq!(header.language, "en");
    assert_eq!(header.custodian_url, "http://www.imf.org");
    assert_eq!(backend.calls(), vec![url("GenericMetadata/PCPS/A..?startPeriod=2020")]);
}

#[tokio::test]
async fn test_missing_url_fails_before_network() {
    let backend = MockBackend::new();
    let client = support::client(&backend);

    let err = client.metadata("").await.unwrap_err();
    assert!(matches!(err, ImfError::Metadata(MetadataError::MissingUrl)));
    assert!(err.is_invalid_input());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_missing_header_field_is_hard_failure() {
    let backend = MockBackend::new();
    let mut doc = support::generic_metadata();
    doc["GenericMetadata"]["Header"]
        .as_object_mut()
        .unwrap()
        .remove("Prepared");
    backend.json(url("GenericMetadata/PCPS/A.."), doc);
    let client = support::client(&backend);

    let err = client.metadata(&url("CompactData/PCPS/A..")).await.unwrap_err();
    assert!(matches!(
        err,
        ImfError::Metadata(MetadataError::MissingField {
            field: "timestamp",
            ..
        })
    ));
}

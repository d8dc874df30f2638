//! Integration tests for the full dataset pipeline

use imf_data_client::{DatasetQuery, ImfError, NormalizeError, QueryWarning};

use crate::support::{self, url, MockBackend};

const GOLD_COAL_URL: &str = "CompactData/PCPS/A.W00.PGOLD+PCOAL.?startPeriod=2018&endPeriod=2020";

fn gold_and_coal() -> DatasetQuery {
    DatasetQuery::new("PCPS")
        .filter("freq", ["A"])
        .filter("ref_area", ["W00"])
        .filter("indicator", ["PCOAL", "PGOLD"])
        .start_year("2018")
        .end_year("2020")
}

#[tokio::test]
async fn test_records_equal_series_times_observations() {
    let backend = MockBackend::new();
    support::script_pcps_structure(&backend);
    backend.json(url(GOLD_COAL_URL), support::compact_data_two_series());
    let client = support::client(&backend);

    let response = client.dataset(&gold_and_coal()).await.unwrap();

    assert_eq!(response.url, url(GOLD_COAL_URL));
    assert!(response.warnings.is_empty());
    assert!(response.metadata.is_none());

    let table = response.data.table().unwrap();
    assert_eq!(table.len(), 3 + 2);
    assert_eq!(
        table.columns,
        vec![
            "freq",
            "ref_area",
            "indicator",
            "unit_measure",
            "unit_mult",
            "time_format",
            "time_period",
            "obs_value"
        ]
    );

    let coal: Vec<_> = table
        .iter()
        .filter(|r| r.text("indicator").as_deref() == Some("PCOAL"))
        .collect();
    assert_eq!(coal.len(), 2);
    assert!(coal.iter().all(|r| r.text("ref_area").as_deref() == Some("W00")));
    assert_eq!(coal[1].text("time_period").as_deref(), Some("2020"));
}

#[tokio::test]
async fn test_single_observation_object_is_one_record() {
    let backend = MockBackend::new();
    support::script_pcps_structure(&backend);
    backend.json(url("CompactData/PCPS/A.US.PGOLD."), support::compact_data_single_obs());
    let client = support::client(&backend);

    let query = DatasetQuery::new("PCPS")
        .filter("freq", ["A"])
        .filter("ref_area", ["US"])
        .filter("indicator", ["PGOLD"]);
    let response = client.dataset(&query).await.unwrap();

    let table = response.data.table().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.records[0].text("obs_value").as_deref(), Some("1770.25"));
}

#[tokio::test]
async fn test_invalid_codes_are_dropped() {
    let backend = MockBackend::new();
    support::script_pcps_structure(&backend);
    backend.json(url("CompactData/PCPS/A.US.PGOLD."), support::compact_data_single_obs());
    let client = support::client(&backend);

    let query = DatasetQuery::new("PCPS")
        .filter("freq", ["A"])
        .filter("ref_area", ["US", "ATLANTIS"])
        .filter("indicator", ["PGOLD", "PUNOBTAINIUM"]);
    let response = client.dataset(&query).await.unwrap();

    assert_eq!(response.url, url("CompactData/PCPS/A.US.PGOLD."));
    assert_eq!(
        response.warnings,
        vec![
            QueryWarning::DroppedCodes {
                dimension: "ref_area".to_string(),
                codes: vec!["ATLANTIS".to_string()],
            },
            QueryWarning::DroppedCodes {
                dimension: "indicator".to_string(),
                codes: vec!["PUNOBTAINIUM".to_string()],
            },
        ]
    );
}

#[tokio::test]
async fn test_unsatisfiable_filters_are_empty_result() {
    let backend = MockBackend::new();
    support::script_pcps_structure(&backend);
    backend.json(url("CompactData/PCPS/Q.US.PCOAL."), support::compact_data_empty());
    let client = support::client(&backend);

    let query = DatasetQuery::new("PCPS")
        .filter("freq", ["Q"])
        .filter("ref_area", ["US"])
        .filter("indicator", ["PCOAL"]);
    let err = client.dataset(&query).await.unwrap_err();

    assert!(matches!(err, ImfError::Normalize(NormalizeError::EmptyResult)));
    assert!(err.is_empty_result());
    assert!(err.to_string().contains("relax the filters"));
}

#[tokio::test]
async fn test_raw_payload_skips_flattening() {
    let backend = MockBackend::new();
    support::script_pcps_structure(&backend);
    backend.json(url(GOLD_COAL_URL), support::compact_data_two_series());
    let client = support::client(&backend);

    let response = client.dataset(&gold_and_coal().raw(true)).await.unwrap();

    let raw = response.data.raw().unwrap();
    assert_eq!(raw.as_array().map(Vec::len), Some(2));
    assert!(response.data.table().is_none());
}

#[tokio::test]
async fn test_metadata_attached_on_request() {
    let backend = MockBackend::new();
    support::script_pcps_structure(&backend);
    backend.json(url(GOLD_COAL_URL), support::compact_data_two_series());
    backend.json(
        url("GenericMetadata/PCPS/A.W00.PGOLD+PCOAL.?startPeriod=2018&endPeriod=2020"),
        support::generic_metadata(),
    );
    let client = support::client(&backend);

    let response = client.dataset(&gold_and_coal().with_metadata(true)).await.unwrap();

    let metadata = response.metadata.unwrap();
    assert_eq!(metadata.custodian, "IMF");
    assert_eq!(metadata.timestamp, "2024-03-01T10:00:00");
}

#[tokio::test]
async fn test_whole_dataset_request_is_warned() {
    let backend = MockBackend::new();
    support::script_pcps_structure(&backend);
    backend.json(url("CompactData/PCPS/..."), support::compact_data_two_series());
    let client = support::client(&backend);

    let response = client.dataset(&DatasetQuery::new("PCPS")).await.unwrap();

    assert_eq!(
        response.warnings,
        vec![QueryWarning::WholeDataset {
            dataset_id: "PCPS".to_string()
        }]
    );
    assert_eq!(response.data.table().map(|t| t.len()), Some(5));
}

#[tokio::test]
async fn test_normalization_is_deterministic_across_fetches() {
    let backend = MockBackend::new();
    support::script_pcps_structure(&backend);
    backend.json(url(GOLD_COAL_URL), support::compact_data_two_series());
    let client = support::client(&backend);

    let first = client.dataset(&gold_and_coal()).await.unwrap();
    let second = client.dataset(&gold_and_coal()).await.unwrap();
    assert_eq!(first.data, second.data);
}

//! Contract tests against the live IMF SDMX JSON service
//!
//! These hit the network and are ignored by default:
//! `cargo test -- --ignored contract`

use imf_data_client::{DatasetQuery, ImfClient};

#[tokio::test]
#[ignore]
async fn test_live_catalog_contains_pcps() {
    let client = ImfClient::new();
    let datasets = client.list_datasets().await.unwrap();
    assert!(datasets.iter().any(|d| d.dataset_id == "PCPS"));
}

#[tokio::test]
#[ignore]
async fn test_live_pcps_freq_dimension() {
    let client = ImfClient::new();
    let schema = client.parameters("PCPS").await.unwrap();
    assert!(schema.has_dimension("freq"));
    assert!(schema.has_dimension("ref_area"));
}

#[tokio::test]
#[ignore]
async fn test_live_gold_prices() {
    let client = ImfClient::new();
    let query = DatasetQuery::new("PCPS")
        .filter("freq", ["A"])
        .filter("ref_area", ["W00"])
        .filter("indicator", ["PGOLD"])
        .start_year("2018")
        .end_year("2020");
    let response = client.dataset(&query).await.unwrap();
    let table = response.data.table().unwrap();
    assert!(!table.is_empty());
    assert!(table.iter().all(|r| r.decimal("obs_value").is_some()));
}

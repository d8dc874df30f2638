//! Invalid caller input must be rejected before any request is made

use imf_data_client::{DatasetQuery, FilterSet, ImfError, QueryError, ResolveError, YearRange};

use crate::support::{self, MockBackend};

#[tokio::test]
async fn test_malformed_start_year_makes_no_calls() {
    for bad in ["abcd", "202", "20201"] {
        let backend = MockBackend::new();
        support::script_pcps_structure(&backend);
        let client = support::client(&backend);

        let query = DatasetQuery::new("PCPS").filter("freq", ["A"]).start_year(bad);
        let err = client.dataset(&query).await.unwrap_err();

        assert!(
            matches!(err, ImfError::Query(QueryError::InvalidYear { field: "start_year", .. })),
            "{bad}: {err}"
        );
        assert!(err.is_invalid_input());
        assert_eq!(backend.call_count(), 0, "{bad} reached the network");
    }
}

#[tokio::test]
async fn test_malformed_end_year_makes_no_calls() {
    let backend = MockBackend::new();
    let client = support::client(&backend);

    let query = DatasetQuery::new("PCPS").start_year("2015").end_year("15");
    let err = client.dataset(&query).await.unwrap_err();

    assert!(matches!(err, ImfError::Query(QueryError::InvalidYear { field: "end_year", .. })));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_dataset_id_makes_no_calls() {
    let backend = MockBackend::new();
    let client = support::client(&backend);

    for bad in ["", "PCPS IFS", "PCPS/extra", "A.B"] {
        let err = client.dataset(&DatasetQuery::new(bad)).await.unwrap_err();
        assert!(matches!(err, ImfError::Resolve(ResolveError::InvalidDatasetId(_))));
        assert!(err.is_invalid_input());

        let err = client.parameter_defs(bad, true).await.unwrap_err();
        assert!(err.is_invalid_input());
    }
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_dimension_fails_before_data_fetch() {
    let backend = MockBackend::new();
    support::script_pcps_structure(&backend);
    let client = support::client(&backend);

    let query = DatasetQuery::new("PCPS").filter("sector", ["S13"]);
    let err = client.dataset(&query).await.unwrap_err();

    match &err {
        ImfError::Query(QueryError::UnknownDimension { dimension, .. }) => {
            assert_eq!(dimension, "sector")
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(backend.calls().iter().all(|u| !u.contains("CompactData")));
}

#[tokio::test]
async fn test_build_query_reports_dropped_codes() {
    let backend = MockBackend::new();
    support::script_pcps_structure(&backend);
    let client = support::client(&backend);

    let filters = FilterSet::new().with("indicator", ["PGOLD", "PXXX"]);
    let years = YearRange::parse(Some("2019"), None).unwrap();
    let built = client.build_query("PCPS", &filters, &years).await.unwrap();

    assert!(built.url.ends_with("CompactData/PCPS/..PGOLD.?startPeriod=2019"));
    assert_eq!(built.warnings.len(), 1);
    assert!(built.warnings[0].to_string().contains("PXXX"));
}

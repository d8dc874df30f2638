//! Unit tests for filter sets and year ranges

use imf_data_client::{FilterSet, QueryError, Year, YearRange};

#[test]
fn test_filter_set_merges_codes() {
    let mut filters = FilterSet::new().with("ref_area", ["US"]);
    filters.insert("ref_area", ["JP", "US"]);

    let codes: Vec<_> = filters.codes("ref_area").unwrap().iter().cloned().collect();
    assert_eq!(codes, vec!["JP", "US"]);
    assert!(!filters.is_empty());
}

#[test]
fn test_filter_set_without_codes_is_empty() {
    let filters = FilterSet::new().with("ref_area", Vec::<String>::new());
    assert!(filters.is_empty());
}

#[test]
fn test_year_parsing() {
    assert_eq!(Year::parse("start_year", "2020").unwrap().as_str(), "2020");
    assert_eq!(Year::parse("start_year", " 1999 ").unwrap().as_str(), "1999");
    assert!(matches!(
        Year::parse("start_year", "abcd"),
        Err(QueryError::InvalidYear { .. })
    ));
}

#[test]
fn test_empty_range_has_no_query_string() {
    assert_eq!(YearRange::default().query_string(), "");
    assert_eq!(
        YearRange::parse(Some("2000"), None).unwrap().query_string(),
        "startPeriod=2000"
    );
}

use super::*;

#[test]
fn test_empty_file_is_default() {
    let config = Config::parse("").unwrap();
    assert!(config.output.pretty);
    assert_eq!(config.matching.ranking.detail_top_n, 15);
    assert_eq!(config.matching.registry.page_size, 1000);
}

#[test]
fn test_sections_read_at_top_level() {
    let config = Config::parse(
        r#"
        [search]
        concurrency = 8
        deadline_secs = 20

        [ranking.categories]
        high = 85
        good = 65
        possible = 40

        [output]
        pretty = false
        "#,
    )
    .unwrap();
    assert_eq!(config.matching.search.concurrency, 8);
    assert_eq!(config.matching.ranking.categories.high, 85);
    assert!(!config.output.pretty);
}

#[test]
fn test_invalid_thresholds_rejected() {
    let err = Config::parse(
        r#"
        [ranking.categories]
        high = 40
        good = 60
        possible = 45
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("category thresholds"));
}

#[test]
fn test_missing_explicit_path_is_an_error() {
    assert!(Config::load_from("/nonexistent/trialmatch.toml").is_err());
}

use review_lint_engine::capability::{detect, MarkerTable, ToolCategory};

#[test]
fn apidoc_only_repository() {
    let repo = tempfile::tempdir().unwrap();
    std::fs::write(repo.path().join("apidoc.json"), r#"{"name":"api"}"#).unwrap();
    std::fs::write(repo.path().join("README.md"), "# api\n").unwrap();

    let caps = detect(repo.path(), &MarkerTable::standard());
    let enabled: Vec<_> = caps.enabled().collect();
    assert_eq!(enabled, vec![ToolCategory::Php, ToolCategory::ApiDoc]);
    assert_eq!(
        caps.auxiliary_path(ToolCategory::ApiDoc),
        Some(repo.path().join("apidoc.json").as_path())
    );
}

#[test]
fn custom_marker_table() {
    let repo = tempfile::tempdir().unwrap();
    std::fs::write(repo.path().join(".golangci.yaml"), "").unwrap();
    let table = MarkerTable::new().marker(ToolCategory::Go, &[".golangci.yml", ".golangci.yaml"]);
    let caps = detect(repo.path(), &table);
    assert!(caps.is_enabled(ToolCategory::Go));
    assert!(!caps.is_enabled(ToolCategory::Php));
}

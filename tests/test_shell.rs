use review_lint_engine::shell::{BindingContext, CommandResolver, LookupChain, ParseError, VarSource};

#[test]
fn builtin_bindings_expand_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("my-project");
    std::fs::create_dir(&repo).unwrap();
    let ctx = BindingContext::new(&repo, "lint", "refs/pull/7/head");
    let words = CommandResolver::new(&ctx)
        .parse("echo $PWD $PROJECT_NAME $CI_CHECK_TYPE $CI_CHECK_REF")
        .unwrap();
    assert_eq!(
        words,
        vec![
            "echo".to_string(),
            repo.to_string_lossy().into_owned(),
            "my-project".to_string(),
            "lint".to_string(),
            "refs/pull/7/head".to_string(),
        ]
    );
}

#[test]
fn bindings_shadow_the_environment() {
    let chain = LookupChain::new(vec![
        VarSource::Bindings(vec![("HOME", "/bound".to_string())]),
        VarSource::ProcessEnv,
    ]);
    let resolver = CommandResolver::with_lookup("/tmp", chain);
    assert_eq!(resolver.parse("ls ${HOME}/x").unwrap(), vec!["ls", "/bound/x"]);
}

#[test]
fn expansion_never_splits_words() {
    let chain = LookupChain::new(vec![VarSource::Bindings(vec![("ARGS", "a b  c".to_string())])]);
    let resolver = CommandResolver::with_lookup("/tmp", chain);
    assert_eq!(resolver.parse("tool $ARGS").unwrap(), vec!["tool", "a b  c"]);
    assert_eq!(resolver.parse("tool $UNSET end").unwrap(), vec!["tool", "end"]);
    assert_eq!(resolver.parse("tool \"$UNSET\" end").unwrap(), vec!["tool", "", "end"]);
}

#[test]
fn quoting_rules() {
    let resolver = CommandResolver::with_lookup("/tmp", LookupChain::new(Vec::new()));
    assert_eq!(
        resolver.parse(r#"phpcs --standard='PSR 2' "--report=$x" a\ b"#).unwrap(),
        vec!["phpcs", "--standard=PSR 2", "--report=", "a b"]
    );
    assert!(resolver.parse("").unwrap().is_empty());
    assert!(matches!(resolver.parse("a 'b").unwrap_err(), ParseError::UnterminatedSingleQuote));
    assert!(matches!(resolver.parse("a \"b").unwrap_err(), ParseError::UnterminatedDoubleQuote));
    assert!(matches!(resolver.parse("a ${B").unwrap_err(), ParseError::UnterminatedBrace));
}

#[cfg(unix)]
#[test]
fn backticks_run_in_working_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "").unwrap();
    let ctx = BindingContext::new(dir.path(), "lint", "");
    let resolver = CommandResolver::new(&ctx);
    assert_eq!(resolver.parse("cat `ls *.txt`").unwrap(), vec!["cat", "marker.txt"]);
    assert_eq!(resolver.parse("x-$(printf ok)").unwrap(), vec!["x-ok"]);

    let err = resolver.parse("run `echo boom >&2; exit 4`").unwrap_err();
    match err {
        ParseError::SubcommandFailed { stderr, .. } => assert_eq!(stderr.trim(), "boom"),
        other => panic!("unexpected error: {other:?}"),
    }
}

use review_lint_engine::diff::{
    head_file, match_any, parse_file_diff, parse_file_mode, parse_multi_file_diff, trimmed_new_name, DiffError,
    HunkLine,
};

const PATCH: &str = "\
diff --git a/src/main.go b/src/main.go
index 13fe0dc..2332010 100644
--- a/src/main.go
+++ b/src/main.go
@@ -1,3 +1,5 @@ package main
 package main
-import \"fmt\"
+import (
+\t\"fmt\"
+)
 func main() {}
diff --git a/old.txt b/old.txt
deleted file mode 100644
index 2332010..0000000
--- a/old.txt
+++ /dev/null
@@ -1 +0,0 @@
-gone
diff --git \"a/docs/\\344\\275\\240.md\" \"b/docs/\\344\\275\\240.md\"
new file mode 100755
index 0000000..b54741c
--- /dev/null
+++ \"b/docs/\\344\\275\\240.md\"
@@ -0,0 +1 @@
+hello
\\ No newline at end of file
";

#[test]
fn multi_file_diff_entries() {
    let parsed = parse_multi_file_diff(PATCH).unwrap();
    assert_eq!(parsed.files.len(), 3);

    let go = &parsed.files[0];
    assert_eq!(trimmed_new_name(go), ("src/main.go".to_string(), true));
    assert_eq!(go.hunks.len(), 1);
    assert_eq!(go.hunks[0].section, "package main");
    assert_eq!(go.hunks[0].added_line_numbers(), vec![2, 3, 4]);
    assert!(matches!(go.hunks[0].lines[1], HunkLine::Removed(ref s) if s == "import \"fmt\""));
    assert_eq!(parse_file_mode(&go.extended), Ok(0o644));

    let deleted = &parsed.files[1];
    assert!(deleted.is_deleted());
    assert_eq!(trimmed_new_name(deleted), ("/dev/null".to_string(), false));

    let added = &parsed.files[2];
    assert_eq!(trimmed_new_name(added), ("docs/你.md".to_string(), true));
    assert_eq!(parse_file_mode(&added.extended), Ok(0o755));
}

#[test]
fn single_file_diff() {
    let entry = parse_file_diff("--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n").unwrap().unwrap();
    assert_eq!(entry.new_name, "b/x");
    assert!(parse_file_diff("").unwrap().is_none());
}

#[test]
fn short_hunk_is_an_error() {
    let err = parse_multi_file_diff("--- a/x\n+++ b/x\n@@ -1,3 +1,3 @@\n a\n").unwrap_err();
    assert!(matches!(err, DiffError::TruncatedHunk { .. }), "{err:?}");
}

#[test]
fn file_mode_examples() {
    assert_eq!(parse_file_mode(&["index 13fe0dc..2332010 100644"]), Ok(0o644));
    assert_eq!(parse_file_mode(&["new file mode 100755", "index 0000000..b54741c"]), Ok(0o755));
}

#[test]
fn head_file_reads_only_what_it_needs() {
    let dir = tempfile::tempdir().unwrap();
    let three = dir.path().join("three.txt");
    std::fs::write(&three, "a\nb\nc\n").unwrap();
    assert_eq!(head_file(&three, 1).unwrap(), vec!["a"]);

    let two = dir.path().join("two.txt");
    std::fs::write(&two, "a\r\nb").unwrap();
    assert_eq!(head_file(&two, 3).unwrap(), vec!["a", "b"]);

    assert!(head_file(dir.path().join("missing"), 1).is_err());
}

#[test]
#[should_panic(expected = "line count must be positive")]
fn head_file_zero_is_a_contract_violation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f");
    std::fs::write(&path, "x\n").unwrap();
    let _ = head_file(&path, 0);
}

#[test]
fn glob_star_rules() {
    assert!(!match_any(&["sdk/*"], "sdk/v2/x"));
    assert!(match_any(&["sdk/**"], "sdk/v2/x"));
}

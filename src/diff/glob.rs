use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Compiled exclusion patterns.
///
/// `*` never crosses a `/`; `**` as a whole path component does.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    set: GlobSet,
    len: usize,
}

impl PathMatcher {
    /// Invalid patterns are logged and skipped.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut len = 0;
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            match GlobBuilder::new(pattern).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                    len += 1;
                }
                Err(e) => tracing::warn!(%pattern, error = %e, "skipping invalid glob pattern"),
            }
        }
        let set = builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "glob set failed to build; matching nothing");
            GlobSet::empty()
        });
        Self { set, len }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_match(&self, path: impl AsRef<Path>) -> bool {
        self.set.is_match(path)
    }
}

/// True when `path` matches at least one of `patterns`.
pub fn match_any<S: AsRef<str>>(patterns: &[S], path: &str) -> bool {
    PathMatcher::new(patterns).is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_star_crosses_separators() {
        assert!(match_any(&["sdk/**"], "sdk/v2/x"));
        assert!(!match_any(&["sdk/*"], "sdk/v2/x"));
        assert!(match_any(&["sdk/*"], "sdk/x"));
    }

    #[test]
    fn any_pattern_suffices() {
        let patterns = ["testdata/**", "sdk/**", "*.pb.go"];
        assert!(match_any(&patterns, "testdata/a/b.json"));
        assert!(match_any(&patterns, "api.pb.go"));
        assert!(!match_any(&patterns, "pkg/api.pb.go"));
        assert!(match_any(&["**/*.pb.go"], "pkg/api.pb.go"));
        assert!(!match_any(&patterns, "src/main.go"));
    }

    #[test]
    fn property_double_star_vs_single_star() {
        let prefixes = ["sdk", "a/b", "vendor/github.com"];
        let tails = ["x", "v2/x", "deep/er/file.txt"];
        for p in prefixes {
            for tail in tails {
                let path = format!("{p}/{tail}");
                assert!(match_any(&[format!("{p}/**")], &path), "{p}/** vs {path}");
                if tail.contains('/') {
                    assert!(!match_any(&[format!("{p}/*")], &path), "{p}/* vs {path}");
                }
            }
        }
    }

    #[test]
    fn invalid_patterns_are_skipped() {
        let matcher = PathMatcher::new(&["a/[", "", "docs/**"]);
        assert!(!matcher.is_empty());
        assert!(matcher.is_match("docs/readme.md"));
        assert!(!PathMatcher::new::<&str>(&[]).is_match("anything"));
    }
}

//! Arguments for apidoc taken from the project's `apidoc.json`
use serde::Deserialize;
use std::path::Path;

pub const APIDOC_CONFIG: &str = "apidoc.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiDocOptions {
    #[serde(default, rename = "file-filters")]
    pub file_filters: String,
    #[serde(default, rename = "exclude-filters")]
    pub exclude_filters: String,
    #[serde(default)]
    pub input: String,
}

impl ApiDocOptions {
    /// Read `apidoc.json` under `repo_root`. A missing or malformed file is
    /// logged and treated as "no extra options".
    pub fn load(repo_root: &Path) -> Self {
        let path = repo_root.join(APIDOC_CONFIG);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read apidoc config");
                return Self::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "cannot parse apidoc config");
            Self::default()
        })
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (flag, value) in [("-f", &self.file_filters), ("-e", &self.exclude_filters), ("-i", &self.input)] {
            if !value.is_empty() {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }
        args
    }
}

use crate::adapters::Tool;
use crate::diff::PathMatcher;
use crate::finding::Severity;
use crate::process::DEFAULT_TIMEOUT;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".lint-engine.json";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Command template per tool; see [`crate::shell`] for the syntax.
    pub templates: BTreeMap<Tool, String>,
    pub timeout: Duration,
    /// Changed files matching any of these are not linted.
    pub ignore_patterns: Vec<String>,
    /// Findings at or above this severity fail the check.
    pub fail_threshold: Severity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            templates: Tool::ALL
                .into_iter()
                .map(|tool| (tool, tool.default_template().to_string()))
                .collect(),
            timeout: DEFAULT_TIMEOUT,
            ignore_patterns: Vec::new(),
            fail_threshold: Severity::Error,
        }
    }
}

impl EngineConfig {
    /// Template for `tool`; empty when explicitly configured away.
    pub fn template(&self, tool: Tool) -> &str {
        self.templates.get(&tool).map(String::as_str).unwrap_or_default()
    }

    pub fn ignore_matcher(&self) -> PathMatcher {
        PathMatcher::new(&self.ignore_patterns)
    }
}

fn parse_severity(text: &str) -> Option<Severity> {
    match text.trim().to_ascii_lowercase().as_str() {
        "off" | "0" => Some(Severity::Off),
        "warning" | "1" => Some(Severity::Warning),
        "error" | "2" => Some(Severity::Error),
        _ => None,
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Defaults, then the JSON file named by `LINT_ENGINE_CONFIG` (or
/// `.lint-engine.json` in the working directory), then env overrides.
pub fn load_config() -> EngineConfig {
    let path = std::env::var("LINT_ENGINE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE));
    load_config_from(&path)
}

/// Like [`load_config`] with an explicit config file.
pub fn load_config_from(path: &Path) -> EngineConfig {
    let mut cfg = EngineConfig::default();

    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(json) => apply_json(&mut cfg, &json),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file"),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file; using defaults")
        }
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "cannot read config file"),
    }

    if let Ok(val) = std::env::var("LINT_ENGINE_TIMEOUT_SECS") {
        match val.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => cfg.timeout = Duration::from_secs(secs),
            _ => tracing::warn!(value = %val, "ignoring invalid LINT_ENGINE_TIMEOUT_SECS"),
        }
    }

    if let Ok(val) = std::env::var("LINT_ENGINE_IGNORE_GLOBS") {
        let list = split_list(&val);
        if !list.is_empty() {
            cfg.ignore_patterns = list;
        }
    }

    cfg
}

fn apply_json(cfg: &mut EngineConfig, json: &serde_json::Value) {
    if let Some(templates) = json.get("templates").and_then(|v| v.as_object()) {
        for (name, value) in templates {
            let tool = serde_json::from_value::<Tool>(serde_json::Value::String(name.clone()));
            match (tool, value.as_str()) {
                (Ok(tool), Some(template)) => {
                    cfg.templates.insert(tool, template.to_string());
                }
                (Err(_), _) => tracing::warn!(%name, "unknown tool in config"),
                (_, None) => tracing::warn!(%name, "tool template must be a string"),
            }
        }
    }

    if let Some(secs) = json.get("timeout_secs").and_then(|v| v.as_u64()) {
        if secs > 0 {
            cfg.timeout = Duration::from_secs(secs);
        }
    }

    if let Some(list) = json.get("ignore_patterns").and_then(|v| v.as_array()) {
        cfg.ignore_patterns = list.iter().filter_map(|it| it.as_str()).map(str::to_string).collect();
    }

    let threshold = json.get("fail_threshold").and_then(|v| match v {
        serde_json::Value::String(s) => parse_severity(s),
        serde_json::Value::Number(n) => parse_severity(&n.to_string()),
        _ => None,
    });
    if let Some(severity) = threshold {
        cfg.fail_threshold = severity;
    }
}

//! Shared finding model produced by every tool adapter
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity of a single finding. Serialized as its integer value (0, 1, 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum Severity {
    #[default]
    Off = 0,
    Warning = 1,
    Error = 2,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Off => "off",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl From<Severity> for u8 {
    fn from(s: Severity) -> Self {
        s as u8
    }
}

/// Out-of-range values from tools collapse to `Off` so they stay counted.
impl From<u8> for Severity {
    fn from(v: u8) -> Self {
        match v {
            1 => Severity::Warning,
            2 => Severity::Error,
            _ => Severity::Off,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalized lint or format result.
///
/// The JSON shape matches what ESLint and PHPLint print with `-f json`, so
/// their messages deserialize into this type directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rule_id: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    /// Repository-relative file, set only by project-scoped tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Finding {
    pub fn new(rule_id: impl Into<String>, severity: Severity, line: u32, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            line,
            column: 0,
            message: message.into(),
            source_code: None,
            path: None,
        }
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = column;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_code = Some(source.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

// ESLint reports parse failures with `"ruleId": null`; the report decoder
// names those after the tool.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Case-insensitive mapping from a tool's severity vocabulary to [`Severity`].
///
/// Tables are built once and handed to adapters; lookups never mutate them.
#[derive(Debug, Clone)]
pub struct SeverityTable {
    levels: HashMap<String, Severity>,
}

impl SeverityTable {
    /// A table with no names; every lookup yields `Off` until extended.
    pub fn new() -> Self {
        Self { levels: HashMap::new() }
    }

    /// The `off` / `warning` / `error` vocabulary shared by most tools.
    pub fn standard() -> Self {
        let mut levels = HashMap::new();
        levels.insert("off".to_string(), Severity::Off);
        levels.insert("warning".to_string(), Severity::Warning);
        levels.insert("error".to_string(), Severity::Error);
        Self { levels }
    }

    pub fn with(mut self, name: &str, severity: Severity) -> Self {
        self.levels.insert(name.to_ascii_lowercase(), severity);
        self
    }

    /// Unknown names map to `Off` rather than being dropped.
    pub fn lookup(&self, name: &str) -> Severity {
        self.levels
            .get(&name.trim().to_ascii_lowercase())
            .copied()
            .unwrap_or(Severity::Off)
    }
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_off_warning_error() {
        assert!(Severity::Off < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(u8::from(Severity::Error), 2);
    }

    #[test]
    fn lookup_is_case_insensitive_and_defaults_off() {
        let table = SeverityTable::standard();
        assert_eq!(table.lookup("ERROR"), Severity::Error);
        assert_eq!(table.lookup("Warning"), Severity::Warning);
        assert_eq!(table.lookup("convention"), Severity::Off);
        assert_eq!(table.lookup(""), Severity::Off);
    }

    #[test]
    fn extended_table_keeps_standard_entries() {
        let table = SeverityTable::standard().with("Fatal", Severity::Error);
        assert_eq!(table.lookup("fatal"), Severity::Error);
        assert_eq!(table.lookup("error"), Severity::Error);
    }

    #[test]
    fn finding_deserializes_eslint_message() {
        let json = r#"{"ruleId":"no-unused-vars","severity":2,"line":3,"column":7,
            "message":"'x' is defined but never used.","nodeType":"Identifier"}"#;
        let f: Finding = serde_json::from_str(json).unwrap();
        assert_eq!(f.rule_id, "no-unused-vars");
        assert_eq!(f.severity, Severity::Error);
        assert_eq!((f.line, f.column), (3, 7));
        assert!(f.source_code.is_none());
    }

    #[test]
    fn finding_accepts_null_rule_id() {
        let json = r#"{"ruleId":null,"fatal":true,"severity":2,"line":1,"column":1,"message":"Parsing error"}"#;
        let f: Finding = serde_json::from_str(json).unwrap();
        assert!(f.rule_id.is_empty());
        assert_eq!(f.severity, Severity::Error);
    }

    #[test]
    fn finding_serializes_camel_case_without_empty_optionals() {
        let f = Finding::new("cpplint", Severity::Warning, 4, "msg");
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["ruleId"], "cpplint");
        assert_eq!(v["severity"], 1);
        assert!(v.get("sourceCode").is_none());
        assert!(v.get("path").is_none());
    }
}

//! Decoders for the native reports of structured tools
use super::relativize;
use crate::finding::{Finding, Severity, SeverityTable};
use crate::process::ProcessOutput;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// `[{filePath, messages: [Finding]}]`, printed by ESLint and PHPLint.
    Eslint,
    /// `[{ruleName, ruleSeverity, failure, startPosition}]` with 0-based positions.
    Tslint,
    /// `{file: [{line, column, severity, reason, linter}]}`
    ScssLint,
    /// golangci-lint's code-climate array; findings carry a path.
    CodeClimate,
    /// vfile JSON report that remark writes to stderr.
    Remark,
    /// `<oclint><violations><violation .../>` on stdout.
    OclintXml,
    /// Android lint's `<issues>` XML, written to a file under the repository.
    AndroidXml { report_path: &'static str },
    /// Only the exit status matters.
    ExitStatus,
}

impl ReportFormat {
    /// The text this format decodes: stdout, or the report file on disk.
    pub fn source_text(&self, output: &ProcessOutput, working_dir: &Path) -> Result<String, (PathBuf, io::Error)> {
        match self {
            ReportFormat::AndroidXml { report_path } => {
                let path = working_dir.join(report_path);
                std::fs::read_to_string(&path).map_err(|e| (path, e))
            }
            ReportFormat::ExitStatus => Ok(String::new()),
            _ => Ok(output.stdout_lossy()),
        }
    }

    /// Rule id given to findings whose report names no rule.
    pub fn default_rule(&self) -> &'static str {
        match self {
            ReportFormat::Eslint => "eslint",
            ReportFormat::Tslint => "tslint",
            ReportFormat::ScssLint => "scss-lint",
            ReportFormat::CodeClimate => "golangci-lint",
            ReportFormat::Remark => "remark",
            ReportFormat::OclintXml => "oclint",
            ReportFormat::AndroidXml { .. } => "android-lint",
            ReportFormat::ExitStatus => "exit-status",
        }
    }

    /// Decode `text`. The error is a human-readable reason.
    pub fn parse(&self, text: &str, working_dir: &Path, severities: &SeverityTable) -> Result<Vec<Finding>, String> {
        self.parse_with_default(text, working_dir, severities, self.default_rule())
    }

    /// Like [`parse`](Self::parse), naming unnamed findings `default_rule`.
    pub fn parse_with_default(
        &self,
        text: &str,
        working_dir: &Path,
        severities: &SeverityTable,
        default_rule: &str,
    ) -> Result<Vec<Finding>, String> {
        let mut findings = self.decode(text, working_dir, severities)?;
        for finding in findings.iter_mut().filter(|f| f.rule_id.trim().is_empty()) {
            finding.rule_id = default_rule.to_string();
        }
        Ok(findings)
    }

    fn decode(&self, text: &str, working_dir: &Path, severities: &SeverityTable) -> Result<Vec<Finding>, String> {
        match self {
            ReportFormat::Eslint => parse_eslint(text),
            ReportFormat::Tslint => parse_tslint(text, severities),
            ReportFormat::ScssLint => parse_scss_lint(text, severities),
            ReportFormat::CodeClimate => parse_code_climate(text, working_dir, severities),
            ReportFormat::Remark => parse_remark(text),
            ReportFormat::OclintXml => parse_oclint(text, severities),
            ReportFormat::AndroidXml { .. } => parse_android(text, working_dir, severities),
            ReportFormat::ExitStatus => Ok(Vec::new()),
        }
    }
}

#[derive(Deserialize)]
struct EslintResult {
    #[serde(default)]
    messages: Vec<Finding>,
}

fn parse_eslint(text: &str) -> Result<Vec<Finding>, String> {
    let results: Vec<EslintResult> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    Ok(results.into_iter().next().map(|r| r.messages).unwrap_or_default())
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct TslintFailure {
    rule_name: String,
    rule_severity: String,
    failure: String,
    start_position: TslintPosition,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TslintPosition {
    line: u32,
    character: u32,
}

fn parse_tslint(text: &str, severities: &SeverityTable) -> Result<Vec<Finding>, String> {
    let failures: Vec<TslintFailure> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    Ok(failures
        .into_iter()
        .map(|f| {
            Finding::new(
                f.rule_name,
                severities.lookup(&f.rule_severity),
                f.start_position.line + 1,
                f.failure,
            )
            .with_column(f.start_position.character + 1)
        })
        .collect())
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ScssLint {
    line: u32,
    column: u32,
    severity: String,
    reason: String,
    linter: String,
}

fn parse_scss_lint(text: &str, severities: &SeverityTable) -> Result<Vec<Finding>, String> {
    let by_file: BTreeMap<String, Vec<ScssLint>> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    Ok(by_file
        .into_values()
        .flatten()
        .map(|l| Finding::new(l.linter, severities.lookup(&l.severity), l.line, l.reason).with_column(l.column))
        .collect())
}

#[derive(Deserialize)]
struct CodeClimate {
    #[serde(default)]
    description: String,
    #[serde(default)]
    check_name: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    location: CodeClimateLocation,
}

#[derive(Deserialize)]
struct CodeClimateLocation {
    path: String,
    #[serde(default)]
    lines: CodeClimateLines,
}

#[derive(Deserialize, Default)]
struct CodeClimateLines {
    #[serde(default)]
    begin: u32,
}

fn parse_code_climate(text: &str, root: &Path, severities: &SeverityTable) -> Result<Vec<Finding>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let issues: Vec<CodeClimate> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    Ok(issues
        .into_iter()
        .map(|issue| {
            // Older golangci-lint releases omit severity; every issue fails the check there.
            let severity = issue
                .severity
                .as_deref()
                .map_or(Severity::Error, |s| severities.lookup(s));
            Finding::new(issue.check_name.unwrap_or_default(), severity, issue.location.lines.begin, issue.description)
                .with_path(relativize(&issue.location.path, root))
        })
        .collect())
}

#[derive(Deserialize)]
struct RemarkFile {
    #[serde(default)]
    messages: Vec<RemarkMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemarkMessage {
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    rule_id: Option<String>,
}

fn parse_remark(text: &str) -> Result<Vec<Finding>, String> {
    let files: Vec<RemarkFile> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let Some(first) = files.into_iter().next() else {
        return Ok(Vec::new());
    };
    Ok(first
        .messages
        .into_iter()
        .map(|m| {
            Finding::new(m.rule_id.unwrap_or_default(), Severity::Off, m.line.unwrap_or(0), m.reason).with_column(m.column.unwrap_or(0))
        })
        .collect())
}

fn attr_u32(node: roxmltree::Node<'_, '_>, name: &str) -> u32 {
    node.attribute(name).and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

fn parse_oclint(text: &str, severities: &SeverityTable) -> Result<Vec<Finding>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc = roxmltree::Document::parse(text).map_err(|e| e.to_string())?;
    let root = doc.root_element();
    if !root.has_tag_name("oclint") {
        return Err(format!("unexpected root element <{}>", root.tag_name().name()));
    }

    let findings = root
        .children()
        .filter(|n| n.has_tag_name("violations"))
        .flat_map(|v| v.children().filter(|n| n.has_tag_name("violation")))
        .map(|v| {
            let severity = v.attribute("priority").map_or(Severity::Off, |p| severities.lookup(p));
            Finding::new(
                v.attribute("rule").unwrap_or_default(),
                severity,
                attr_u32(v, "startline"),
                v.attribute("message").unwrap_or_default(),
            )
            .with_column(attr_u32(v, "startcolumn"))
        })
        .collect();
    Ok(findings)
}

fn parse_android(text: &str, root_dir: &Path, severities: &SeverityTable) -> Result<Vec<Finding>, String> {
    let doc = roxmltree::Document::parse(text).map_err(|e| e.to_string())?;
    let root = doc.root_element();
    if !root.has_tag_name("issues") {
        return Err(format!("unexpected root element <{}>", root.tag_name().name()));
    }

    let findings = root
        .children()
        .filter(|n| n.has_tag_name("issue"))
        .map(|issue| {
            let location = issue.children().find(|n| n.has_tag_name("location"));
            let mut finding = Finding::new(
                issue.attribute("id").unwrap_or_default(),
                severities.lookup(issue.attribute("severity").unwrap_or_default()),
                location.map_or(0, |l| attr_u32(l, "line")),
                issue.attribute("message").unwrap_or_default(),
            )
            .with_column(location.map_or(0, |l| attr_u32(l, "column")));
            if let Some(file) = location.and_then(|l| l.attribute("file")) {
                finding = finding.with_path(relativize(file, root_dir));
            }
            finding
        })
        .collect();
    Ok(findings)
}

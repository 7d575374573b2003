//! Tool adapters: run one external analyzer and normalize what it reports
//!
//! Every tool is described by data (a [`ToolAdapter`]) rather than by its own
//! type. The adapter knows which fixed arguments to append to the configured
//! command, which exit statuses mean "findings present", and which of three
//! output strategies turns the captured output into [`Finding`]s.
pub mod apidoc;
pub mod scrape;
pub mod structured;

pub use scrape::LineScraper;
pub use structured::ReportFormat;

use crate::annotate;
use crate::capability::ToolCategory;
use crate::finding::{Finding, Severity, SeverityTable};
use crate::process::{self, ExitPolicy, ProcessError, ProcessOutput};
use crate::shell::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// External tools the engine knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Cpplint,
    Oclint,
    ClangFormat,
    Phplint,
    Eslint,
    Tslint,
    ScssLint,
    Goreturns,
    GolangciLint,
    Remark,
    Apidoc,
    AndroidLint,
}

impl Tool {
    pub const ALL: [Tool; 12] = [
        Tool::Cpplint,
        Tool::Oclint,
        Tool::ClangFormat,
        Tool::Phplint,
        Tool::Eslint,
        Tool::Tslint,
        Tool::ScssLint,
        Tool::Goreturns,
        Tool::GolangciLint,
        Tool::Remark,
        Tool::Apidoc,
        Tool::AndroidLint,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Cpplint => "cpplint",
            Tool::Oclint => "oclint",
            Tool::ClangFormat => "clang-format",
            Tool::Phplint => "phplint",
            Tool::Eslint => "eslint",
            Tool::Tslint => "tslint",
            Tool::ScssLint => "scss-lint",
            Tool::Goreturns => "goreturns",
            Tool::GolangciLint => "golangci-lint",
            Tool::Remark => "remark",
            Tool::Apidoc => "apidoc",
            Tool::AndroidLint => "android-lint",
        }
    }

    /// Command template used when the configuration names none.
    pub fn default_template(&self) -> &'static str {
        match self {
            Tool::AndroidLint => "./gradlew lint",
            other => other.name(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One invocation per changed file.
    File,
    /// One invocation for the whole repository.
    Project,
}

/// Fixed arguments appended after the resolved command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgStyle {
    /// `<args...> <file>` for file-scoped tools, `<args...>` otherwise.
    Trailing(&'static [&'static str]),
    /// `[-c <config>] -f json <file>`
    Eslint,
    /// `-i <file> -- -report-type xml`
    Oclint,
    /// `-f/-e/-i` taken from `apidoc.json`.
    ApiDoc,
}

/// How captured output becomes findings.
#[derive(Debug, Clone)]
pub enum OutputStrategy {
    /// Decode the tool's native JSON or XML report.
    Structured(ReportFormat),
    /// Match each line of a stream against an anchored pattern.
    RegexScraped(LineScraper),
    /// Diff stdout against the file on disk. `report` optionally decodes a
    /// second, structured report from stderr.
    FormatDiff {
        rule_id: &'static str,
        report: Option<ReportFormat>,
    },
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{tool}: no usable command configured")]
    Config { tool: Tool },

    #[error("{tool}: invalid command template: {source}")]
    Template {
        tool: Tool,
        #[source]
        source: ParseError,
    },

    #[error("{tool}: {source}")]
    Process {
        tool: Tool,
        #[source]
        source: ProcessError,
    },

    #[error("{tool}: cannot decode report: {reason}")]
    Report { tool: Tool, reason: String },

    #[error("{tool}: {}: {source}", .path.display())]
    Io {
        tool: Tool,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AdapterError {
    pub fn tool(&self) -> Tool {
        match self {
            AdapterError::Config { tool }
            | AdapterError::Template { tool, .. }
            | AdapterError::Process { tool, .. }
            | AdapterError::Report { tool, .. }
            | AdapterError::Io { tool, .. } => *tool,
        }
    }

    /// Captured standard error of a failed run, for the operator report.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            AdapterError::Process { source, .. } => source.stderr(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AdapterError::Process { source: ProcessError::Timeout { .. }, .. })
    }
}

/// Everything about one invocation that is not the command itself.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Repository-relative file for file-scoped tools.
    pub target: Option<&'a str>,
    pub working_dir: &'a Path,
    pub timeout: Option<Duration>,
    pub cancel: &'a CancellationToken,
}

#[derive(Debug, Clone)]
pub struct ToolAdapter {
    pub tool: Tool,
    pub category: ToolCategory,
    pub scope: Scope,
    pub args: ArgStyle,
    pub strategy: OutputStrategy,
    pub exit_policy: ExitPolicy,
    pub severities: SeverityTable,
    /// Marker file found by capability detection (the ESLint config).
    pub auxiliary: Option<PathBuf>,
}

impl ToolAdapter {
    pub fn new(tool: Tool, category: ToolCategory, scope: Scope, args: ArgStyle, strategy: OutputStrategy) -> Self {
        Self {
            tool,
            category,
            scope,
            args,
            strategy,
            exit_policy: ExitPolicy::SuccessOnly,
            severities: SeverityTable::standard(),
            auxiliary: None,
        }
    }

    pub fn tolerate(mut self, codes: &'static [i32]) -> Self {
        self.exit_policy = ExitPolicy::Tolerate(codes);
        self
    }

    pub fn with_severities(mut self, table: SeverityTable) -> Self {
        self.severities = table;
        self
    }

    pub fn with_auxiliary(mut self, path: Option<PathBuf>) -> Self {
        self.auxiliary = path;
        self
    }

    /// Full argv: the resolved command followed by this tool's arguments.
    pub fn build_argv(&self, mut command: Vec<String>, inv: &Invocation<'_>) -> Result<Vec<String>, AdapterError> {
        if command.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(AdapterError::Config { tool: self.tool });
        }
        let target = match (self.scope, inv.target) {
            (Scope::File, Some(file)) => Some(file),
            (Scope::File, None) => return Err(AdapterError::Config { tool: self.tool }),
            (Scope::Project, _) => None,
        };

        match self.args {
            ArgStyle::Trailing(args) => {
                command.extend(args.iter().map(|a| a.to_string()));
                command.extend(target.map(str::to_string));
            }
            ArgStyle::Eslint => {
                if let Some(config) = &self.auxiliary {
                    command.push("-c".to_string());
                    command.push(config.to_string_lossy().into_owned());
                }
                command.extend(["-f", "json"].map(String::from));
                command.extend(target.map(str::to_string));
            }
            ArgStyle::Oclint => {
                command.push("-i".to_string());
                command.extend(target.map(str::to_string));
                command.extend(["--", "-report-type", "xml"].map(String::from));
            }
            ArgStyle::ApiDoc => {
                command.extend(apidoc::ApiDocOptions::load(inv.working_dir).to_args());
            }
        }
        Ok(command)
    }

    /// Run the tool once and normalize its output.
    pub async fn invoke(&self, command: Vec<String>, inv: Invocation<'_>) -> Result<Vec<Finding>, AdapterError> {
        let argv = self.build_argv(command, &inv)?;
        let output = process::run(&argv, inv.working_dir, inv.timeout, inv.cancel)
            .await
            .and_then(|out| out.check(self.exit_policy))
            .map_err(|source| AdapterError::Process { tool: self.tool, source })?;

        tracing::debug!(
            tool = %self.tool,
            code = ?output.code,
            stdout = %output.stdout_lossy(),
            stderr = %output.stderr_lossy(),
            "tool finished"
        );

        self.normalize(&output, inv)
    }

    /// Apply the output strategy to an already captured run.
    pub fn normalize(&self, output: &ProcessOutput, inv: Invocation<'_>) -> Result<Vec<Finding>, AdapterError> {
        match &self.strategy {
            OutputStrategy::Structured(format) => {
                let text = format.source_text(output, inv.working_dir).map_err(|e| self.io_error(e))?;
                format
                    .parse_with_default(&text, inv.working_dir, &self.severities, self.tool.name())
                    .map_err(|reason| AdapterError::Report { tool: self.tool, reason })
            }
            OutputStrategy::RegexScraped(scraper) => Ok(scraper.scrape(output)),
            OutputStrategy::FormatDiff { rule_id, report } => {
                let mut findings = self.format_diff(output, inv, rule_id)?;
                if let Some(format) = report {
                    let text = output.stderr_lossy();
                    if !text.trim().is_empty() {
                        let extra = format
                            .parse_with_default(&text, inv.working_dir, &self.severities, self.tool.name())
                            .map_err(|reason| AdapterError::Report { tool: self.tool, reason })?;
                        findings.extend(extra);
                    }
                }
                Ok(findings)
            }
        }
    }

    fn format_diff(&self, output: &ProcessOutput, inv: Invocation<'_>, rule_id: &str) -> Result<Vec<Finding>, AdapterError> {
        let Some(target) = inv.target else {
            return Err(AdapterError::Config { tool: self.tool });
        };
        // A tolerated failure status with nothing on stdout means the tool
        // produced no rewrite, not that the file should be empty.
        if output.stdout.is_empty() && output.code != Some(0) {
            return Ok(Vec::new());
        }
        let path = inv.working_dir.join(target);
        annotate::synthesize_file(&path, &output.stdout_lossy(), rule_id).map_err(|source| AdapterError::Io {
            tool: self.tool,
            path,
            source,
        })
    }

    fn io_error(&self, (path, source): (PathBuf, std::io::Error)) -> AdapterError {
        AdapterError::Io {
            tool: self.tool,
            path,
            source,
        }
    }
}

/// The adapters the engine knows, one entry per (tool, category) pair.
#[derive(Debug, Clone)]
pub struct AdapterSet {
    adapters: Vec<ToolAdapter>,
}

impl AdapterSet {
    pub fn new(adapters: Vec<ToolAdapter>) -> Self {
        Self { adapters }
    }

    pub fn standard() -> Self {
        let code_climate = SeverityTable::new()
            .with("blocker", Severity::Error)
            .with("critical", Severity::Error)
            .with("major", Severity::Error)
            .with("minor", Severity::Warning)
            .with("info", Severity::Off);
        let oclint_priority = SeverityTable::new()
            .with("1", Severity::Error)
            .with("2", Severity::Warning)
            .with("3", Severity::Off);
        let android = SeverityTable::standard()
            .with("fatal", Severity::Error)
            .with("information", Severity::Off)
            .with("ignore", Severity::Off);

        let eslint = |category| {
            ToolAdapter::new(
                Tool::Eslint,
                category,
                Scope::File,
                ArgStyle::Eslint,
                OutputStrategy::Structured(ReportFormat::Eslint),
            )
            .tolerate(&[1])
        };

        Self::new(vec![
            ToolAdapter::new(
                Tool::Cpplint,
                ToolCategory::Cpp,
                Scope::File,
                ArgStyle::Trailing(&["--quiet"]),
                OutputStrategy::RegexScraped(LineScraper::cpplint()),
            )
            .tolerate(&[1]),
            ToolAdapter::new(
                Tool::Oclint,
                ToolCategory::ObjectiveC,
                Scope::File,
                ArgStyle::Oclint,
                OutputStrategy::Structured(ReportFormat::OclintXml),
            )
            .tolerate(&[1, 2, 3, 4, 5, 6])
            .with_severities(oclint_priority),
            ToolAdapter::new(
                Tool::ClangFormat,
                ToolCategory::ClangFormat,
                Scope::File,
                ArgStyle::Trailing(&[]),
                OutputStrategy::FormatDiff {
                    rule_id: "clanglint",
                    report: None,
                },
            ),
            ToolAdapter::new(
                Tool::Phplint,
                ToolCategory::Php,
                Scope::File,
                ArgStyle::Trailing(&["-f", "json"]),
                OutputStrategy::Structured(ReportFormat::Eslint),
            ),
            eslint(ToolCategory::JavaScript),
            eslint(ToolCategory::EcmaScript),
            ToolAdapter::new(
                Tool::Tslint,
                ToolCategory::TypeScript,
                Scope::File,
                ArgStyle::Trailing(&["--format", "json"]),
                OutputStrategy::Structured(ReportFormat::Tslint),
            )
            .tolerate(&[2]),
            ToolAdapter::new(
                Tool::ScssLint,
                ToolCategory::Scss,
                Scope::File,
                ArgStyle::Trailing(&["--format=JSON"]),
                OutputStrategy::Structured(ReportFormat::ScssLint),
            )
            .tolerate(&[1, 2]),
            ToolAdapter::new(
                Tool::Goreturns,
                ToolCategory::Go,
                Scope::File,
                ArgStyle::Trailing(&[]),
                OutputStrategy::FormatDiff {
                    rule_id: "goreturns",
                    report: None,
                },
            ),
            ToolAdapter::new(
                Tool::GolangciLint,
                ToolCategory::Go,
                Scope::Project,
                ArgStyle::Trailing(&["run", "--out-format", "code-climate"]),
                OutputStrategy::Structured(ReportFormat::CodeClimate),
            )
            .tolerate(&[1])
            .with_severities(code_climate),
            ToolAdapter::new(
                Tool::Remark,
                ToolCategory::Markdown,
                Scope::File,
                ArgStyle::Trailing(&["--quiet", "--report", "json"]),
                OutputStrategy::FormatDiff {
                    rule_id: "remark",
                    report: Some(ReportFormat::Remark),
                },
            )
            .tolerate(&[1]),
            ToolAdapter::new(
                Tool::Apidoc,
                ToolCategory::ApiDoc,
                Scope::Project,
                ArgStyle::ApiDoc,
                OutputStrategy::Structured(ReportFormat::ExitStatus),
            ),
            ToolAdapter::new(
                Tool::AndroidLint,
                ToolCategory::Android,
                Scope::Project,
                ArgStyle::Trailing(&[]),
                OutputStrategy::Structured(ReportFormat::AndroidXml {
                    report_path: "app/build/reports/lint-results.xml",
                }),
            )
            .with_severities(android),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolAdapter> {
        self.adapters.iter()
    }

    pub fn for_category(&self, category: ToolCategory) -> impl Iterator<Item = &ToolAdapter> {
        self.adapters.iter().filter(move |a| a.category == category)
    }
}

impl Default for AdapterSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Make a tool-reported path repository-relative with `/` separators.
pub(crate) fn relativize(path: &str, root: &Path) -> String {
    let normalized = path.replace('\\', "/");
    let candidate = Path::new(&normalized);
    if candidate.is_absolute() {
        let roots = [Some(root.to_path_buf()), root.canonicalize().ok()];
        for base in roots.into_iter().flatten() {
            if let Ok(rel) = candidate.strip_prefix(&base) {
                return rel.to_string_lossy().replace('\\', "/");
            }
        }
        if let Ok(real) = candidate.canonicalize() {
            if let Ok(base) = root.canonicalize() {
                if let Ok(rel) = real.strip_prefix(base) {
                    return rel.to_string_lossy().replace('\\', "/");
                }
            }
        }
    }
    normalized.strip_prefix("./").unwrap_or(&normalized).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv<'a>(target: Option<&'a str>, dir: &'a Path, cancel: &'a CancellationToken) -> Invocation<'a> {
        Invocation {
            target,
            working_dir: dir,
            timeout: None,
            cancel,
        }
    }

    fn adapter(tool: Tool, category: ToolCategory) -> ToolAdapter {
        AdapterSet::standard()
            .iter()
            .find(|a| a.tool == tool && a.category == category)
            .cloned()
            .unwrap()
    }

    #[test]
    fn argv_per_tool() {
        let cancel = CancellationToken::new();
        let dir = Path::new("/repo");
        let cmd = |s: &str| s.split(' ').map(String::from).collect::<Vec<_>>();

        let cpplint = adapter(Tool::Cpplint, ToolCategory::Cpp);
        assert_eq!(
            cpplint.build_argv(cmd("cpplint"), &inv(Some("a.cc"), dir, &cancel)).unwrap(),
            cmd("cpplint --quiet a.cc")
        );

        let oclint = adapter(Tool::Oclint, ToolCategory::ObjectiveC);
        assert_eq!(
            oclint.build_argv(cmd("oclint"), &inv(Some("a.m"), dir, &cancel)).unwrap(),
            cmd("oclint -i a.m -- -report-type xml")
        );

        let golangci = adapter(Tool::GolangciLint, ToolCategory::Go);
        assert_eq!(
            golangci.build_argv(cmd("golangci-lint"), &inv(Some("x.go"), dir, &cancel)).unwrap(),
            cmd("golangci-lint run --out-format code-climate")
        );
    }

    #[test]
    fn eslint_passes_config_when_known() {
        let cancel = CancellationToken::new();
        let dir = Path::new("/repo");
        let plain = adapter(Tool::Eslint, ToolCategory::JavaScript);
        assert_eq!(
            plain.build_argv(vec!["eslint".into()], &inv(Some("a.js"), dir, &cancel)).unwrap(),
            vec!["eslint", "-f", "json", "a.js"]
        );
        let configured = plain.with_auxiliary(Some(PathBuf::from("/repo/.eslintrc.js")));
        assert_eq!(
            configured.build_argv(vec!["eslint".into()], &inv(Some("a.js"), dir, &cancel)).unwrap(),
            vec!["eslint", "-c", "/repo/.eslintrc.js", "-f", "json", "a.js"]
        );
    }

    #[test]
    fn empty_command_is_config_error() {
        let cancel = CancellationToken::new();
        let php = adapter(Tool::Phplint, ToolCategory::Php);
        let err = php.build_argv(Vec::new(), &inv(Some("a.php"), Path::new("."), &cancel)).unwrap_err();
        assert!(matches!(err, AdapterError::Config { tool: Tool::Phplint }));

        let err = php.build_argv(vec!["phplint".into()], &inv(None, Path::new("."), &cancel)).unwrap_err();
        assert!(matches!(err, AdapterError::Config { .. }));
    }

    #[test]
    fn standard_set_covers_every_category() {
        let set = AdapterSet::standard();
        for category in ToolCategory::ALL {
            assert!(set.for_category(category).next().is_some(), "{category} has no adapter");
        }
        let go: Vec<_> = set.for_category(ToolCategory::Go).map(|a| (a.tool, a.scope)).collect();
        assert_eq!(go, vec![(Tool::Goreturns, Scope::File), (Tool::GolangciLint, Scope::Project)]);
    }

    #[test]
    fn relativize_paths() {
        let root = Path::new("/work/repo");
        assert_eq!(relativize("/work/repo/app/src/Main.java", root), "app/src/Main.java");
        assert_eq!(relativize("pkg\\api\\x.go", root), "pkg/api/x.go");
        assert_eq!(relativize("./cmd/main.go", root), "cmd/main.go");
        assert_eq!(relativize("/elsewhere/x.go", root), "/elsewhere/x.go");
    }

    #[test]
    fn tool_names_round_trip_through_config_keys() {
        for tool in Tool::ALL {
            let key = serde_json::to_value(tool).unwrap();
            let back: Tool = serde_json::from_value(key).unwrap();
            assert_eq!(back, tool);
        }
        assert_eq!(serde_json::to_value(Tool::GolangciLint).unwrap(), "golangci_lint");
    }
}

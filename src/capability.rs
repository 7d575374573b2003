//! Per-repository detection of which tool categories apply
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// External tool families the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Cpp,
    ObjectiveC,
    ClangFormat,
    Go,
    Php,
    TypeScript,
    Scss,
    JavaScript,
    EcmaScript,
    Markdown,
    ApiDoc,
    Android,
}

const CPP_EXTENSIONS: &[&str] = &["c", "cc", "h", "hpp", "c++", "h++", "cu", "cpp", "hxx", "cxx", "cuh"];
const OBJC_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "h", "m", "mm"];

impl ToolCategory {
    pub const ALL: [ToolCategory; 12] = [
        ToolCategory::Cpp,
        ToolCategory::ObjectiveC,
        ToolCategory::ClangFormat,
        ToolCategory::Go,
        ToolCategory::Php,
        ToolCategory::TypeScript,
        ToolCategory::Scss,
        ToolCategory::JavaScript,
        ToolCategory::EcmaScript,
        ToolCategory::Markdown,
        ToolCategory::ApiDoc,
        ToolCategory::Android,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolCategory::Cpp => "cpp",
            ToolCategory::ObjectiveC => "objective_c",
            ToolCategory::ClangFormat => "clang_format",
            ToolCategory::Go => "go",
            ToolCategory::Php => "php",
            ToolCategory::TypeScript => "type_script",
            ToolCategory::Scss => "scss",
            ToolCategory::JavaScript => "java_script",
            ToolCategory::EcmaScript => "ecma_script",
            ToolCategory::Markdown => "markdown",
            ToolCategory::ApiDoc => "api_doc",
            ToolCategory::Android => "android",
        }
    }

    /// Whether a changed file with this path belongs to the category.
    /// Project-wide categories (`ApiDoc`, `Android`) match no single file.
    pub fn matches_file(&self, path: &str) -> bool {
        let Some(ext) = extension(path) else {
            return false;
        };
        match self {
            ToolCategory::Cpp => CPP_EXTENSIONS.contains(&ext.as_str()),
            ToolCategory::ObjectiveC => OBJC_EXTENSIONS.contains(&ext.as_str()),
            ToolCategory::ClangFormat => {
                CPP_EXTENSIONS.contains(&ext.as_str()) || OBJC_EXTENSIONS.contains(&ext.as_str())
            }
            ToolCategory::Go => ext == "go",
            ToolCategory::Php => ext == "php",
            ToolCategory::TypeScript => matches!(ext.as_str(), "ts" | "tsx"),
            ToolCategory::Scss => ext == "scss",
            ToolCategory::JavaScript => matches!(ext.as_str(), "js" | "jsx"),
            ToolCategory::EcmaScript => matches!(ext.as_str(), "es" | "esx"),
            ToolCategory::Markdown => matches!(ext.as_str(), "md" | "markdown"),
            ToolCategory::ApiDoc | ToolCategory::Android => false,
        }
    }

    /// Categories that apply to `path`, in [`ToolCategory::ALL`] order.
    pub fn for_file(path: &str) -> Vec<ToolCategory> {
        Self::ALL.into_iter().filter(|c| c.matches_file(path)).collect()
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn extension(path: &str) -> Option<String> {
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub enabled: bool,
    /// The marker file that enabled the category, when tools need it
    /// (e.g. the ESLint configuration passed with `-c`).
    pub auxiliary_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct MarkerRule {
    category: ToolCategory,
    markers: Vec<&'static str>,
    default_on: bool,
}

/// Marker files per category. The first existing marker wins.
#[derive(Debug, Clone)]
pub struct MarkerTable {
    rules: Vec<MarkerRule>,
}

impl MarkerTable {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn standard() -> Self {
        Self::new()
            .marker(ToolCategory::Go, &[".golangci.yml"])
            .marker(ToolCategory::Cpp, &["CPPLINT.cfg"])
            .marker(ToolCategory::ObjectiveC, &[".oclint"])
            .marker(ToolCategory::ClangFormat, &[".clang-format"])
            .marker(ToolCategory::Markdown, &[".remarkrc", ".remarkrc.js"])
            .marker(ToolCategory::TypeScript, &["tslint.json"])
            .marker(ToolCategory::Scss, &[".scss-lint.yml"])
            .marker(ToolCategory::EcmaScript, &[".eslintrc", ".eslintrc.js"])
            .marker(ToolCategory::JavaScript, &[".eslintrc.js", ".eslintrc"])
            .marker(ToolCategory::ApiDoc, &["apidoc.json"])
            .marker(ToolCategory::Android, &["build.gradle"])
            .always_on(ToolCategory::Php)
    }

    pub fn marker(mut self, category: ToolCategory, markers: &[&'static str]) -> Self {
        self.rules.push(MarkerRule {
            category,
            markers: markers.to_vec(),
            default_on: false,
        });
        self
    }

    pub fn always_on(mut self, category: ToolCategory) -> Self {
        self.rules.push(MarkerRule {
            category,
            markers: Vec::new(),
            default_on: true,
        });
        self
    }
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Which categories are enabled for one repository snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    entries: BTreeMap<ToolCategory, Capability>,
}

impl CapabilitySet {
    pub fn get(&self, category: ToolCategory) -> Capability {
        self.entries.get(&category).cloned().unwrap_or_default()
    }

    pub fn is_enabled(&self, category: ToolCategory) -> bool {
        self.entries.get(&category).is_some_and(|c| c.enabled)
    }

    pub fn auxiliary_path(&self, category: ToolCategory) -> Option<&Path> {
        self.entries.get(&category)?.auxiliary_path.as_deref()
    }

    pub fn enabled(&self) -> impl Iterator<Item = ToolCategory> + '_ {
        self.entries
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(category, _)| *category)
    }
}

/// Check the repository root for marker files. Anything that cannot be
/// stat'ed counts as absent. Nothing is cached between calls.
pub fn detect(repo_root: impl AsRef<Path>, table: &MarkerTable) -> CapabilitySet {
    let root = repo_root.as_ref();
    let mut entries: BTreeMap<ToolCategory, Capability> =
        ToolCategory::ALL.into_iter().map(|c| (c, Capability::default())).collect();

    for rule in &table.rules {
        let found = rule
            .markers
            .iter()
            .map(|m| root.join(m))
            .find(|p| std::fs::metadata(p).is_ok());
        let capability = Capability {
            enabled: rule.default_on || found.is_some(),
            auxiliary_path: found,
        };
        tracing::debug!(category = %rule.category, enabled = capability.enabled, "capability detected");
        entries.insert(rule.category, capability);
    }

    CapabilitySet { entries }
}

//! Per-check fan-out: one task per (file × tool) pair plus one per
//! project-scoped tool, each reported on its own
use crate::adapters::{AdapterError, AdapterSet, Invocation, Scope, Tool, ToolAdapter};
use crate::capability::{self, CapabilitySet, MarkerTable, ToolCategory};
use crate::config::EngineConfig;
use crate::diff::{parse_multi_file_diff, trimmed_new_name, ParsedDiff};
use crate::error::EngineError;
use crate::finding::{Finding, Severity};
use crate::shell::{BindingContext, CommandResolver, ParseError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Outcome of one adapter invocation.
#[derive(Debug)]
pub struct ToolRun {
    pub tool: Tool,
    pub category: ToolCategory,
    /// Repository-relative file for file-scoped tools.
    pub file: Option<String>,
    pub outcome: Result<Vec<Finding>, AdapterError>,
}

impl ToolRun {
    pub fn findings(&self) -> &[Finding] {
        self.outcome.as_deref().unwrap_or_default()
    }

    pub fn failed(&self) -> bool {
        self.outcome.is_err()
    }
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub capabilities: CapabilitySet,
    /// Files considered after dropping deletions and ignored paths.
    pub files: Vec<String>,
    pub runs: Vec<ToolRun>,
}

impl CheckReport {
    pub fn by_category(&self) -> BTreeMap<ToolCategory, Vec<&ToolRun>> {
        let mut grouped: BTreeMap<ToolCategory, Vec<&ToolRun>> = BTreeMap::new();
        for run in &self.runs {
            grouped.entry(run.category).or_default().push(run);
        }
        grouped
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.runs.iter().flat_map(|r| r.findings()).map(|f| f.severity).max()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ToolRun> {
        self.runs.iter().filter(|r| r.failed())
    }
}

pub struct Engine {
    config: Arc<EngineConfig>,
    markers: MarkerTable,
    adapters: Arc<AdapterSet>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
            markers: MarkerTable::standard(),
            adapters: Arc::new(AdapterSet::standard()),
        }
    }

    pub fn with_markers(mut self, markers: MarkerTable) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_adapters(mut self, adapters: AdapterSet) -> Self {
        self.adapters = Arc::new(adapters);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lint the files touched by `diff_text` in the checkout at
    /// `ctx.working_dir`. Only a malformed diff fails the whole call; tool
    /// failures are recorded per run.
    pub async fn run(
        &self,
        diff_text: &str,
        ctx: &BindingContext,
        cancel: &CancellationToken,
    ) -> Result<CheckReport, EngineError> {
        let started = Instant::now();
        let parsed = parse_multi_file_diff(diff_text)?;
        let files = self.changed_files(&parsed);
        let capabilities = capability::detect(&ctx.working_dir, &self.markers);

        let mut set = JoinSet::new();
        let mut scheduled = 0usize;
        for category in capabilities.enabled() {
            let targets: Vec<&String> = files.iter().filter(|f| category.matches_file(f)).collect();
            let file_routed = has_file_routing(category);

            for adapter in self.adapters.for_category(category) {
                let adapter = Arc::new(
                    adapter
                        .clone()
                        .with_auxiliary(capabilities.auxiliary_path(category).map(|p| p.to_path_buf())),
                );
                match adapter.scope {
                    Scope::File => {
                        for file in &targets {
                            self.spawn_run(&mut set, &adapter, Some((*file).clone()), ctx, cancel);
                            scheduled += 1;
                        }
                    }
                    // Project tools only run when the change concerns them.
                    Scope::Project if !file_routed || !targets.is_empty() => {
                        self.spawn_run(&mut set, &adapter, None, ctx, cancel);
                        scheduled += 1;
                    }
                    Scope::Project => {}
                }
            }
        }
        tracing::info!(files = files.len(), runs = scheduled, "dispatched tool runs");

        let mut runs = Vec::with_capacity(scheduled);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(run) => runs.push(run),
                Err(e) => tracing::error!(error = %e, "tool task did not complete"),
            }
        }
        runs.sort_by(|a, b| (a.category, a.tool, &a.file).cmp(&(b.category, b.tool, &b.file)));

        tracing::info!(
            runs = runs.len(),
            failed = runs.iter().filter(|r| r.failed()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "check finished"
        );
        Ok(CheckReport {
            capabilities,
            files,
            runs,
        })
    }

    /// New-side names of changed files, without deletions and ignored paths.
    pub fn changed_files(&self, parsed: &ParsedDiff) -> Vec<String> {
        let ignore = self.config.ignore_matcher();
        let mut seen = BTreeSet::new();
        let mut files = Vec::new();
        for entry in &parsed.files {
            if entry.is_deleted() {
                continue;
            }
            let (name, ok) = trimmed_new_name(entry);
            if !ok {
                tracing::debug!(%name, "no new-side path; skipping");
                continue;
            }
            if ignore.is_match(&name) {
                tracing::debug!(%name, "ignored by pattern");
                continue;
            }
            if seen.insert(name.clone()) {
                files.push(name);
            }
        }
        files
    }

    fn spawn_run(
        &self,
        set: &mut JoinSet<ToolRun>,
        adapter: &Arc<ToolAdapter>,
        file: Option<String>,
        ctx: &BindingContext,
        cancel: &CancellationToken,
    ) {
        let adapter = Arc::clone(adapter);
        let template = self.config.template(adapter.tool).to_string();
        let timeout = self.config.timeout;
        let resolver = CommandResolver::new(ctx);
        let cancel = cancel.clone();

        set.spawn(async move {
            let outcome = invoke_one(&adapter, resolver, template, file.as_deref(), timeout, &cancel).await;
            match &outcome {
                Ok(findings) => {
                    tracing::debug!(tool = %adapter.tool, file = ?file, findings = findings.len(), "tool run complete")
                }
                Err(e) => tracing::error!(
                    tool = %adapter.tool,
                    file = ?file,
                    error = %e,
                    stderr = e.stderr().unwrap_or_default(),
                    "tool run failed"
                ),
            }
            ToolRun {
                tool: adapter.tool,
                category: adapter.category,
                file,
                outcome,
            }
        });
    }
}

fn has_file_routing(category: ToolCategory) -> bool {
    !matches!(category, ToolCategory::ApiDoc | ToolCategory::Android)
}

async fn invoke_one(
    adapter: &ToolAdapter,
    resolver: CommandResolver,
    template: String,
    file: Option<&str>,
    timeout: std::time::Duration,
    cancel: &CancellationToken,
) -> Result<Vec<Finding>, AdapterError> {
    let tool = adapter.tool;
    // Backtick subcommands block, so resolution happens off the runtime threads.
    let (resolver, resolved) = tokio::task::spawn_blocking(move || {
        let resolved = resolver.parse(&template);
        (resolver, resolved)
    })
    .await
    .map_err(|e| resolution_interrupted(tool, e))?;
    let command = resolved.map_err(|source| AdapterError::Template { tool, source })?;

    let invocation = Invocation {
        target: file,
        working_dir: resolver.working_dir(),
        timeout: Some(timeout),
        cancel,
    };
    adapter.invoke(command, invocation).await
}

fn resolution_interrupted(tool: Tool, err: JoinError) -> AdapterError {
    AdapterError::Template {
        tool,
        source: ParseError::Interrupted(err.to_string()),
    }
}

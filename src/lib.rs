//! Normalization engine for code-review lint runs.
//!
//! Given a unified diff and a checked-out repository, the engine decides
//! which external analyzers apply, runs them on the touched files and turns
//! their heterogeneous output into one [`Finding`] model that a reporting
//! layer can render as review annotations.

/// Shared finding model and severity tables
pub mod finding;

/// Command template resolution
pub mod shell;

/// Unified-diff parsing and path utilities
pub mod diff;

/// Findings from formatter rewrites
pub mod annotate;

/// Marker-file capability detection
pub mod capability;

/// Subprocess execution with timeout and cancellation
pub mod process;

/// Per-tool invocation and output normalization
pub mod adapters;

/// Engine configuration loading
pub mod config;

/// Concurrent per-check fan-out
pub mod engine;

/// Check-run payload shaping
pub mod report;

pub mod error;

pub use adapters::{AdapterError, AdapterSet, Tool, ToolAdapter};
pub use capability::{detect, CapabilitySet, MarkerTable, ToolCategory};
pub use config::{load_config, EngineConfig};
pub use engine::{CheckReport, Engine, ToolRun};
pub use error::EngineError;
pub use finding::{Finding, Severity, SeverityTable};
pub use shell::{BindingContext, CommandResolver};

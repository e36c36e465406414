//! Analyzer dispatch table
//!
//! An analyzer is an opaque function from an HTML document to a list of
//! accessibility issues. The crawl never looks inside an analyzer; it only
//! owns an explicit [`AnalyzerTable`] that maps analyzer names to
//! implementations and runs them over each fetched page.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// A single finding reported by an analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Stable machine-readable code, e.g. `missing-alt`
    pub code: String,

    /// Human-readable description
    pub message: String,

    /// Snippet or selector locating the problem
    #[serde(default)]
    pub context: String,

    /// Name of the analyzer that produced this issue
    ///
    /// Filled in by the dispatch table, so analyzers may leave it empty.
    #[serde(default)]
    pub analyzer: String,
}

impl Issue {
    /// Creates an issue with no analyzer tag
    pub fn new(code: impl Into<String>, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: context.into(),
            analyzer: String::new(),
        }
    }
}

/// Something that inspects a page and reports issues
///
/// Implementations must be pure with respect to the crawl: they receive the
/// document text and return findings, nothing else.
pub trait Analyzer: Send + Sync {
    /// Unique name used for registration and exclusion
    fn name(&self) -> &str;

    /// One-line description shown in reports
    fn description(&self) -> &str {
        ""
    }

    fn analyze(&self, html: &str) -> Vec<Issue>;
}

/// Adapts a closure into an [`Analyzer`]
pub struct FnAnalyzer<F> {
    name: String,
    description: String,
    func: F,
}

impl<F> FnAnalyzer<F>
where
    F: Fn(&str) -> Vec<Issue> + Send + Sync,
{
    pub fn new(name: impl Into<String>, description: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            func,
        }
    }
}

impl<F> Analyzer for FnAnalyzer<F>
where
    F: Fn(&str) -> Vec<Issue> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn analyze(&self, html: &str) -> Vec<Issue> {
        (self.func)(html)
    }
}

/// Errors raised while composing an [`AnalyzerTable`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("Analyzer name must not be empty")]
    EmptyName,

    #[error("Analyzer already registered: {0}")]
    Duplicate(String),
}

/// Explicit name → analyzer mapping handed to a crawl
///
/// Analyzers run in name order so the issue list for a page is stable
/// across runs.
#[derive(Clone, Default)]
pub struct AnalyzerTable {
    analyzers: BTreeMap<String, Arc<dyn Analyzer>>,
}

impl AnalyzerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an analyzer to the table
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::EmptyName`] or [`AnalyzerError::Duplicate`]
    /// when the analyzer's name cannot be used as a key.
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) -> Result<(), AnalyzerError> {
        let name = analyzer.name().trim().to_string();
        if name.is_empty() {
            return Err(AnalyzerError::EmptyName);
        }
        if self.analyzers.contains_key(&name) {
            return Err(AnalyzerError::Duplicate(name));
        }
        self.analyzers.insert(name, analyzer);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, analyzer: Arc<dyn Analyzer>) -> Result<Self, AnalyzerError> {
        self.register(analyzer)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Names and descriptions of all registered analyzers
    pub fn describe(&self) -> Vec<(&str, &str)> {
        self.analyzers
            .iter()
            .map(|(name, a)| (name.as_str(), a.description()))
            .collect()
    }

    /// Runs every non-excluded analyzer over `html`
    ///
    /// Each returned issue carries the name of the analyzer that produced
    /// it. If any analyzer panics, the page gets no issues at all and a
    /// warning is logged.
    pub fn analyze(&self, html: &str, exclude: &HashSet<String>) -> Vec<Issue> {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut issues = Vec::new();
            for (name, analyzer) in &self.analyzers {
                if exclude.contains(name) {
                    continue;
                }
                issues.extend(analyzer.analyze(html).into_iter().map(|mut issue| {
                    issue.analyzer = name.clone();
                    issue
                }));
            }
            issues
        }));

        match outcome {
            Ok(issues) => issues,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!("Analyzer panicked, discarding page issues: {}", reason);
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for AnalyzerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerTable")
            .field("analyzers", &self.analyzers.keys().collect::<Vec<_>>())
            .finish()
    }
}

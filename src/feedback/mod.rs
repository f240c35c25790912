//! Structured Feedback Module
//!
//! Machine-readable results of a `ternc check` run:
//! - diagnostic reports with stable error codes and locations
//! - check statistics

use serde::{Deserialize, Serialize};

use crate::utils::{Error, FileId};

// ==================== Diagnostic Report ====================

/// One diagnostic of a check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Error code (e.g., "E0301")
    pub code: String,

    pub severity: Severity,

    /// Headline of the message
    pub message: String,

    pub location: Option<Location>,

    /// Notice lines following the headline
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    /// Analyzer bug or unimplemented case
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl DiagnosticReport {
    /// Build a report from a compiler error
    ///
    /// `paths` maps file ids to paths; parse errors point at files that never
    /// made it into the forest, so the driver passes its own list.
    pub fn from_error(error: &Error, paths: &[String]) -> Self {
        let text = error.to_string();
        let mut lines = text.lines().map(str::to_string);
        let message = lines.next().unwrap_or_default();
        let notices = lines.collect();

        let location = error.span().map(|span| Location {
            file: file_path(paths, span.file_id),
            line: span.line,
            column: span.column,
        });

        Self {
            code: error_code(error).to_string(),
            severity: if error.is_internal() {
                Severity::Internal
            } else {
                Severity::Error
            },
            message,
            location,
            notices,
        }
    }

    /// `path:line:col: message`, notices, then the offending line and a caret
    pub fn render(&self, source: Option<&str>) -> String {
        let mut out = match &self.location {
            Some(loc) => format!("{}:{}:{}: {}", loc.file, loc.line, loc.column, self.message),
            None => format!("error: {}", self.message),
        };
        for notice in &self.notices {
            out.push('\n');
            out.push_str(notice);
        }
        if let (Some(loc), Some(source)) = (&self.location, source) {
            if let Some(line) = source.lines().nth(loc.line.saturating_sub(1) as usize) {
                let pad = " ".repeat(loc.column.saturating_sub(1) as usize);
                out.push_str(&format!("\n{}\n{}^", line, pad));
            }
        }
        out
    }
}

fn file_path(paths: &[String], id: FileId) -> String {
    paths.get(id).cloned().unwrap_or_else(|| "<unknown>".to_string())
}

/// Stable code per diagnostic kind
fn error_code(error: &Error) -> &'static str {
    match error {
        // parse
        Error::UnexpectedToken { .. } => "E0101",
        Error::ExpectedIdent { .. } => "E0102",
        Error::ExpectedExpr { .. } => "E0103",
        Error::UnknownAnnotation { .. } => "E0104",
        Error::IntegerOutOfRange { .. } => "E0105",
        // declarations
        Error::Conflict { .. } => "E0201",
        Error::MissingImplementation { .. } => "E0202",
        Error::ExternWithBody { .. } => "E0203",
        Error::MissingDefaultValue { .. } => "E0204",
        // imports
        Error::MeaninglessImport { .. } => "E0301",
        Error::NoSuchPackage { .. } => "E0302",
        Error::DeclarationNotFound { .. } => "E0303",
        Error::PrivateStruct { .. } => "E0304",
        Error::ProtectedStruct { .. } => "E0305",
        Error::NoVisibleOverloads { .. } => "E0306",
        // resolution
        Error::UnresolvedCall { .. } => "E0401",
        Error::ArgumentCount { .. } => "E0402",
        Error::AmbiguousCall { .. } => "E0403",
        Error::UndefinedVariable { .. } => "E0404",
        Error::UninitializedAccess { .. } => "E0405",
        Error::UnusedVariable { .. } => "E0406",
        Error::ArgumentModification { .. } => "E0407",
        // types
        Error::InitTypeMismatch { .. } => "E0501",
        Error::AssignTypeMismatch { .. } => "E0502",
        Error::ArithmeticOperands { .. } | Error::ArithmeticOperand { .. } => "E0503",
        Error::ComparisonOperands { .. } => "E0504",
        Error::BooleanOperands { .. } | Error::NotOperand { .. } => "E0505",
        Error::IfCondition { .. } => "E0506",
        Error::IncompleteReturn { .. } => "E0507",
        Error::ReturnTypeMismatch { .. } => "E0508",
        Error::UnknownReturnType { .. } => "E0509",
        Error::UnknownVariableType { .. } => "E0510",
        Error::CannotDeduce { .. } => "E0512",
        Error::ArgumentTypeMismatch { .. } => "E0513",
        Error::Io(_) => "E9001",
        Error::Internal(_) => "E9999",
    }
}

// ==================== Check Feedback ====================

/// Complete result of one check run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckFeedback {
    pub success: bool,

    pub files: Vec<String>,

    pub diagnostics: Vec<DiagnosticReport>,

    pub stats: CheckStats,

    /// Qualified names of `@entrypoint` functions
    pub entrypoints: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckStats {
    /// Parse time in milliseconds
    pub parse_time_ms: u64,

    /// Semantic analysis time
    pub semantic_time_ms: u64,

    pub total_time_ms: u64,

    pub function_count: usize,

    pub type_count: usize,

    /// Lines of code
    pub loc: usize,
}

impl CheckFeedback {
    pub fn success(files: Vec<String>, stats: CheckStats, entrypoints: Vec<String>) -> Self {
        Self {
            success: true,
            files,
            diagnostics: vec![],
            stats,
            entrypoints,
        }
    }

    pub fn failure(files: Vec<String>, errors: Vec<DiagnosticReport>, stats: CheckStats) -> Self {
        Self {
            success: false,
            files,
            diagnostics: errors,
            stats,
            entrypoints: vec![],
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

use log::warn;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    UndefinedReference,
    TypeConflict,
    UnknownItem,
    UnknownSetting,
    UnknownOption,
    UnknownPlace,
    UnknownFunction,
    HelperArity,
    PlaceDepth,
    DynamicCount,
    MissingSettingMax,
    UnresolvedDefault,
    UnresolvedQualifier,
}

/// An authoring problem found in a rule. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Qualified name of the offending rule.
    pub rule: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Sink that batches diagnostics across the whole corpus.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, kind: DiagnosticKind, rule: &str, message: String) {
        self.entries.push(Diagnostic {
            kind,
            severity: Severity::Error,
            rule: rule.to_string(),
            message,
        });
    }

    /// Records a soft warning and logs it immediately.
    pub fn warn(&mut self, kind: DiagnosticKind, rule: &str, message: String) {
        warn!("{message}");
        self.entries.push(Diagnostic {
            kind,
            severity: Severity::Warning,
            rule: rule.to_string(),
            message,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Error messages, in the order they were found.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors().map(|d| d.message.clone()).collect()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

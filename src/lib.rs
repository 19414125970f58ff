// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

pub mod ast;
pub mod builtins;
pub mod catalog;
pub mod codegen;
pub mod compiler;
pub mod context;
pub mod corpus;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod flags;
pub mod helpers;
pub mod items;
mod lexer;
pub mod parser;
pub mod place;
pub mod settings;
pub mod traversal;

pub use catalog::Catalog;
pub use compiler::{Compilation, CompileOptions, Compiler, RuleOutput};
pub use corpus::{Corpus, RuleDef};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::InternalError;
pub use eval::AbstractValue;

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::lexer::*;
}

type Rc<T> = std::rc::Rc<T>;

#[cfg(test)]
mod tests;

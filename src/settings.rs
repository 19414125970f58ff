// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::catalog::Catalog;
use crate::corpus::{Corpus, RuleDef};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::traversal::traverse_body;

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use log::debug;
use serde::Serialize;

/// A value a setting is compared against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SettingOption {
    Literal(String),
    /// Used for its truthiness or compared against a computed value.
    Dynamic,
}

impl fmt::Display for SettingOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingOption::Literal(s) => f.write_str(s),
            SettingOption::Dynamic => f.write_str("*"),
        }
    }
}

/// Observed options for every referenced setting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingUsage {
    observed: BTreeMap<String, BTreeSet<SettingOption>>,
}

impl SettingUsage {
    pub fn options(&self, setting: &str) -> Option<&BTreeSet<SettingOption>> {
        self.observed.get(setting)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<SettingOption>)> {
        self.observed.iter()
    }

    fn record(&mut self, setting: &str, option: SettingOption) {
        self.observed
            .entry(setting.to_string())
            .or_default()
            .insert(option);
    }
}

fn option_text(lit: &Literal) -> String {
    match lit {
        Literal::Bool(b) => b.to_string(),
        Literal::Int(n) => n.to_string(),
        Literal::Float(v) => v.to_string(),
        Literal::Str(s) | Literal::Place(s) => s.clone(),
    }
}

fn literal_of(e: &Expr) -> Option<Literal> {
    match e {
        Expr::Int(n) => Some(Literal::Int(*n)),
        Expr::Float(v) => Some(Literal::Float(*v)),
        Expr::Str(s) => Some(Literal::Str(s.clone())),
        Expr::True => Some(Literal::Bool(true)),
        Expr::False => Some(Literal::Bool(false)),
        _ => None,
    }
}

/// Checks that every referenced setting exists and that every literal it is
/// compared against is one of its declared options.
pub struct SettingValidator<'a> {
    catalog: &'a Catalog,
    corpus: &'a Corpus,
}

impl<'a> SettingValidator<'a> {
    pub fn new(catalog: &'a Catalog, corpus: &'a Corpus) -> Self {
        Self { catalog, corpus }
    }

    pub fn run(&self, usage: &mut SettingUsage, diagnostics: &mut Diagnostics) -> Result<()> {
        for rule in self.corpus.rules() {
            self.check_rule(rule, usage, diagnostics)?;
        }
        debug!("{} settings referenced", usage.observed.len());
        Ok(())
    }

    fn check_rule(
        &self,
        rule: &RuleDef,
        usage: &mut SettingUsage,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let mut seen: Vec<(String, SettingOption)> = vec![];
        let mut add = |s: &str, option: SettingOption| seen.push((s.to_string(), option));

        traverse_body(&rule.body, &mut |e| {
            match e.as_ref() {
                // Direct comparisons of a setting with a literal claim the
                // setting node; nothing else below them needs visiting.
                Expr::NumCompare { lhs, rhs, .. } => {
                    match (lhs.as_ref(), rhs.as_ref()) {
                        (Expr::Setting(s), other) | (other, Expr::Setting(s)) => {
                            if let Some(lit) = literal_of(other) {
                                add(s, SettingOption::Literal(option_text(&lit)));
                                return Ok(false);
                            }
                        }
                        _ => (),
                    }
                }
                Expr::StrCompare { lhs, rhs, .. } => {
                    if let Expr::Setting(s) = lhs.as_ref() {
                        add(s, SettingOption::Literal(option_text(rhs)));
                        return Ok(false);
                    }
                }
                Expr::PerSettingSwitch { setting, cases, .. } => {
                    for (lit, _) in cases {
                        add(setting, SettingOption::Literal(option_text(lit)));
                    }
                }
                Expr::Setting(s) | Expr::SettingFlag { name: s, .. } => {
                    add(s, SettingOption::Dynamic)
                }
                Expr::RefEq {
                    rhs: RefRhs::Setting(s),
                    ..
                } => add(s, SettingOption::Dynamic),
                Expr::ItemAtLeast {
                    threshold: Threshold::Setting(s),
                    ..
                } => add(s, SettingOption::Dynamic),
                _ => (),
            }
            Ok(true)
        })?;

        let mut unknown = BTreeSet::new();
        for (setting, option) in seen {
            let Some(decl) = self.catalog.settings.get(&setting) else {
                if unknown.insert(setting.clone()) {
                    diagnostics.error(
                        DiagnosticKind::UnknownSetting,
                        &rule.name,
                        format!("Unknown setting {setting} in {}", rule.name),
                    );
                }
                continue;
            };
            if let (SettingOption::Literal(value), Some(options)) = (&option, &decl.options) {
                if !options.iter().any(|o| o == value) {
                    diagnostics.error(
                        DiagnosticKind::UnknownOption,
                        &rule.name,
                        format!(
                            "Setting {setting} has no option {value:?} (in {}); expected one of {}",
                            rule.name,
                            options.join(", ")
                        ),
                    );
                }
            }
            usage.record(&setting, option);
        }
        Ok(())
    }
}

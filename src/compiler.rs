// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::catalog::Catalog;
use crate::codegen::{AccessorTable, Backend, DebugWriter, RustWriter};
use crate::context::{ContextResolver, ContextTable};
use crate::corpus::{Corpus, RuleDef};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::eval::{AbstractValue, Evaluator, StaticTable};
use crate::flags::{self, FlagLayout};
use crate::helpers::{HelperTypes, HelperUnifier};
use crate::items::{ItemCensus, ItemCounter};
use crate::place::{self, PlaceKind};
use crate::settings::{SettingUsage, SettingValidator};
use crate::traversal::{check_shape, traverse_body};

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Emit executable code for every rule.
    pub executable: bool,
    /// Emit the debug rendering of every rule.
    pub debug: bool,
    /// Replace rules that can never hold at their spot with `false`.
    pub prune: bool,
    pub accessors: AccessorTable,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            executable: true,
            debug: true,
            prune: true,
            accessors: AccessorTable::default(),
        }
    }
}

impl CompileOptions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleOutput {
    pub code: Option<String>,
    pub debug: Option<String>,
    /// Reachability at the rule's spot, when it has one.
    pub reachability: Option<AbstractValue>,
    pub pruned: bool,
}

/// Everything a compile run produces.
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    pub contexts: ContextTable,
    pub items: ItemCensus,
    pub settings: SettingUsage,
    pub helpers: HelperTypes,
    pub layout: FlagLayout,
    pub rules: BTreeMap<String, RuleOutput>,
    pub diagnostics: Diagnostics,
}

impl Compilation {
    pub fn errors(&self) -> Vec<String> {
        self.diagnostics.error_messages()
    }

    pub fn layout_json(&self) -> Result<String> {
        self.layout.to_json()
    }
}

pub struct Compiler<'a> {
    catalog: &'a Catalog,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs every pass over `corpus`. Authoring problems land in the
    /// returned diagnostics; only internal defects are returned as errors.
    pub fn compile(&self, corpus: &Corpus) -> Result<Compilation> {
        info!("compiling {} rules", corpus.len());
        for rule in corpus.rules() {
            check_shape(rule)?;
        }

        let mut out = Compilation::default();
        let diagnostics = &mut out.diagnostics;

        self.check_place_literals(corpus, diagnostics)?;

        out.contexts = ContextTable::from_catalog(self.catalog, diagnostics);
        ContextResolver::new(self.catalog, corpus).run(&mut out.contexts, diagnostics)?;
        debug!("{} context variables", out.contexts.len());

        ItemCounter::new(self.catalog, corpus).run(&mut out.items, diagnostics)?;
        SettingValidator::new(self.catalog, corpus).run(&mut out.settings, diagnostics)?;
        HelperUnifier::new(self.catalog, corpus, &out.contexts)
            .run(&mut out.helpers, diagnostics)?;

        let entries = flags::flag_entries(&out.contexts, self.catalog, &out.items);
        out.layout = flags::pack(&entries);
        debug!(
            "packed {} flags into {} groups",
            out.layout.len(),
            out.layout.groups.len()
        );

        let statics = StaticTable::from_catalog(self.catalog);
        let mut evaluator = Evaluator::new(self.catalog, corpus, &out.contexts, &statics);
        let mut rules = BTreeMap::new();
        for rule in corpus.rules() {
            let mut output = RuleOutput::default();
            if let Some(spot) = &rule.spot {
                let v = evaluator.evaluate(rule, spot)?;
                output.pruned = self.options.prune && v.is_false();
                output.reachability = Some(v);
            }
            if self.options.executable {
                output.code = Some(if output.pruned {
                    "false".to_string()
                } else {
                    self.emit(corpus, &out.contexts, rule)?
                });
            }
            if self.options.debug {
                output.debug = Some(DebugWriter::new().body(&rule.body)?);
            }
            rules.insert(rule.name.clone(), output);
        }
        out.rules = rules;
        out.diagnostics.extend(evaluator.into_diagnostics());

        info!(
            "compiled {} rules with {} errors",
            out.rules.len(),
            out.diagnostics.errors().count()
        );
        Ok(out)
    }

    fn emit(&self, corpus: &Corpus, contexts: &ContextTable, rule: &RuleDef) -> Result<String> {
        RustWriter::new(
            self.catalog,
            corpus,
            contexts,
            &self.options.accessors,
            rule,
        )
        .body(&rule.body)
    }

    /// Place literals must name places of the catalog's tree, and a rule's
    /// own spot must be a well-formed spot path.
    fn check_place_literals(&self, corpus: &Corpus, diagnostics: &mut Diagnostics) -> Result<()> {
        for rule in corpus.rules() {
            if let Some(spot) = &rule.spot {
                if let Err(e) = place::check_spot_path(spot) {
                    diagnostics.error(
                        DiagnosticKind::UnknownPlace,
                        &rule.name,
                        format!("Rule {} is attached to an invalid spot: {e}", rule.name),
                    );
                }
            }
            if !self.catalog.has_places() {
                continue;
            }

            let mut paths = BTreeSet::new();
            traverse_body(&rule.body, &mut |e| {
                match e.as_ref() {
                    Expr::Place(p) => {
                        paths.insert(p.clone());
                    }
                    Expr::StrCompare {
                        rhs: Literal::Place(p),
                        ..
                    } => {
                        paths.insert(p.clone());
                    }
                    Expr::RefInSet {
                        set: SetLit::Places(list),
                        ..
                    } => paths.extend(list.iter().cloned()),
                    Expr::PlaceMembership {
                        place: PlaceArg::Literal(p),
                        ..
                    } => {
                        paths.insert(p.clone());
                    }
                    Expr::RefEq { refr, .. } => {
                        if let Some(Qualifier::Place(p)) = &refr.at {
                            paths.insert(p.clone());
                        }
                    }
                    Expr::Ref(r) => {
                        if let Some(Qualifier::Place(p)) = &r.at {
                            paths.insert(p.clone());
                        }
                    }
                    _ => (),
                }
                Ok(true)
            })?;

            for p in paths {
                if self.catalog.location_kind(&p).is_none() {
                    let shape = match PlaceKind::of(&p) {
                        Some(kind) => kind.to_string().to_lowercase(),
                        None => "path".to_string(),
                    };
                    diagnostics.error(
                        DiagnosticKind::UnknownPlace,
                        &rule.name,
                        format!("Unknown {shape} '{p}' in {}", rule.name),
                    );
                }
            }
        }
        Ok(())
    }
}

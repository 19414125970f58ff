// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Helper parameter typing.
//!
//! Parameters without a declared type take the shape of the first call
//! site that supplies them. Rules are visited in sorted order, so the same
//! corpus always yields the same types and the same conflicts.

use crate::ast::*;
use crate::catalog::{Catalog, SettingType};
use crate::context::{resolve_ref, ContextKind, ContextTable};
use crate::corpus::{ArgType, Callee, Corpus, HelperSig, RuleDef};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::place::{self, PlaceKind};
use crate::traversal::{for_each_action, traverse_body};

use std::collections::BTreeMap;

use anyhow::Result;
use log::debug;
use serde::Serialize;

/// Where a parameter's type was fixed.
pub const DECLARED_SITE: &str = "its declaration";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamType {
    pub ty: ArgType,
    /// Rule whose call first fixed the type.
    pub site: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HelperTypes {
    params: BTreeMap<String, Vec<Option<ParamType>>>,
}

impl HelperTypes {
    pub fn param(&self, helper: &str, index: usize) -> Option<&ParamType> {
        self.params.get(helper)?.get(index)?.as_ref()
    }

    pub fn signature(&self, helper: &str) -> Option<&[Option<ParamType>]> {
        self.params.get(helper).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Option<ParamType>>)> {
        self.params.iter()
    }
}

struct CallSite {
    func: String,
    args: Vec<Ref<Expr>>,
}

/// Every call made by a rule body, in order of appearance.
fn collect_calls(rule: &RuleDef) -> Result<Vec<CallSite>> {
    let mut calls = vec![];
    if let RuleBody::Action(a) = &rule.body {
        for_each_action(a, &mut |node| {
            if let Action::HelperCall { func, args } = node.as_ref() {
                calls.push(CallSite {
                    func: func.clone(),
                    args: args.clone(),
                });
            }
            Ok(())
        })?;
    }
    traverse_body(&rule.body, &mut |e| {
        match e.as_ref() {
            Expr::Invoke { func, args, .. } | Expr::Call { func, args } => calls.push(CallSite {
                func: func.clone(),
                args: args.clone(),
            }),
            _ => (),
        }
        Ok(true)
    })?;
    Ok(calls)
}

pub struct HelperUnifier<'a> {
    catalog: &'a Catalog,
    corpus: &'a Corpus,
    contexts: &'a ContextTable,
}

impl<'a> HelperUnifier<'a> {
    pub fn new(catalog: &'a Catalog, corpus: &'a Corpus, contexts: &'a ContextTable) -> Self {
        Self {
            catalog,
            corpus,
            contexts,
        }
    }

    pub fn run(&self, types: &mut HelperTypes, diagnostics: &mut Diagnostics) -> Result<()> {
        for sig in self.corpus.helpers() {
            let declared = sig
                .params
                .iter()
                .map(|p| {
                    p.ty.map(|ty| ParamType {
                        ty,
                        site: DECLARED_SITE.to_string(),
                    })
                })
                .collect();
            types.params.insert(sig.name.clone(), declared);
        }

        for rule in self.corpus.rules() {
            for call in collect_calls(rule)? {
                self.check_call(rule, &call, types, diagnostics);
            }
        }
        debug!("unified parameters of {} helpers", types.params.len());
        Ok(())
    }

    fn check_call(
        &self,
        rule: &RuleDef,
        call: &CallSite,
        types: &mut HelperTypes,
        diagnostics: &mut Diagnostics,
    ) {
        let sig = match self.corpus.resolve_call(&call.func) {
            Callee::Helper(sig) => sig,
            Callee::Builtin(builtin) => {
                if builtin.arity != call.args.len() {
                    diagnostics.error(
                        DiagnosticKind::HelperArity,
                        &rule.name,
                        format!(
                            "Builtin ${} takes {} argument(s) but {} passes {}",
                            call.func,
                            builtin.arity,
                            rule.name,
                            call.args.len()
                        ),
                    );
                }
                return;
            }
            Callee::Rule(_) => return,
            Callee::Unknown => {
                diagnostics.error(
                    DiagnosticKind::UnknownFunction,
                    &rule.name,
                    format!("Unrecognized function ${} in {}", call.func, rule.name),
                );
                return;
            }
        };

        // Arity first; a miscounted call is not type checked.
        if sig.params.len() != call.args.len() {
            diagnostics.error(
                DiagnosticKind::HelperArity,
                &rule.name,
                format!(
                    "Helper ${} takes {} argument(s) but {} passes {}",
                    sig.name,
                    sig.params.len(),
                    rule.name,
                    call.args.len()
                ),
            );
            return;
        }

        for (index, arg) in call.args.iter().enumerate() {
            let Some(shape) = self.arg_type(rule, arg, types) else {
                continue;
            };
            self.unify_param(rule, sig, index, arg, shape, types, diagnostics);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn unify_param(
        &self,
        rule: &RuleDef,
        sig: &HelperSig,
        index: usize,
        arg: &Ref<Expr>,
        shape: ArgType,
        types: &mut HelperTypes,
        diagnostics: &mut Diagnostics,
    ) {
        let param = &sig.params[index].name;

        if let Expr::Place(path) = arg.as_ref() {
            if shape == ArgType::Place(PlaceKind::Leaf) {
                diagnostics.error(
                    DiagnosticKind::PlaceDepth,
                    &rule.name,
                    format!(
                        "Helper ${} parameter {index} (^{param}) takes a Region, Area or Spot but {} passes '{path}' with {} separators",
                        sig.name,
                        rule.name,
                        place::separators(path)
                    ),
                );
                return;
            }
        }

        let Some(slots) = types.params.get_mut(&sig.name) else {
            return;
        };
        let Some(slot) = slots.get_mut(index) else {
            return;
        };
        match slot {
            None => {
                *slot = Some(ParamType {
                    ty: shape,
                    site: rule.name.clone(),
                })
            }
            Some(existing) if existing.ty == shape => (),
            Some(existing) => {
                let (kind, message) = match (existing.ty, shape, arg.as_ref()) {
                    (ArgType::Place(want), ArgType::Place(got), Expr::Place(path)) => (
                        DiagnosticKind::PlaceDepth,
                        format!(
                            "Helper ${} parameter {index} (^{param}) is a {want} (from {}) but {} passes {got} '{path}' with {} separators",
                            sig.name,
                            existing.site,
                            rule.name,
                            place::separators(path)
                        ),
                    ),
                    _ => (
                        DiagnosticKind::TypeConflict,
                        format!(
                            "Helper ${} parameter {index} (^{param}) is {} at {} but {} at {}",
                            sig.name, existing.ty, existing.site, shape, rule.name
                        ),
                    ),
                };
                diagnostics.error(kind, &rule.name, message);
            }
        }
    }

    /// Shape of a call argument, when it can be determined.
    fn arg_type(&self, rule: &RuleDef, arg: &Ref<Expr>, types: &HelperTypes) -> Option<ArgType> {
        Some(match arg.as_ref() {
            Expr::HasItem(_) | Expr::HasLiteralItem(_) => ArgType::Item,
            Expr::Items(_) => ArgType::Items,
            Expr::Str(_) => ArgType::Str,
            Expr::Int(_) | Expr::Const(_) | Expr::BinOp { .. } => ArgType::Int,
            Expr::Float(_) => ArgType::Float,
            Expr::Place(path) => ArgType::Place(PlaceKind::of(path)?),
            Expr::Paren(inner) => return self.arg_type(rule, inner, types),
            Expr::Ref(r) if r.at.is_none() => return self.ref_type(rule, r, types),
            Expr::Ref(_) => return None,
            Expr::Setting(s) => match self.catalog.settings.get(s)?.ty {
                SettingType::Bool => ArgType::Bool,
                SettingType::Int => ArgType::Int,
                SettingType::Float => ArgType::Float,
                SettingType::Enum | SettingType::Str => ArgType::Str,
            },
            Expr::Call { func, .. } => match self.corpus.resolve_call(func) {
                Callee::Builtin(b) => return b.returns,
                _ => return None,
            },
            Expr::IfThenElse { .. } | Expr::Ternary { .. } => return None,
            Expr::PerItemSwitch { .. } | Expr::PerSettingSwitch { .. } => return None,
            Expr::Or { .. }
            | Expr::And { .. }
            | Expr::Not(_)
            | Expr::True
            | Expr::False
            | Expr::Invoke { .. }
            | Expr::NumCompare { .. }
            | Expr::StrCompare { .. }
            | Expr::FlagMatch { .. }
            | Expr::RefEq { .. }
            | Expr::SettingFlag { .. }
            | Expr::ArgFlag { .. }
            | Expr::ItemAtLeast { .. }
            | Expr::HasArgItem(_)
            | Expr::RefInSet { .. }
            | Expr::PlaceMembership { .. } => ArgType::Bool,
        })
    }

    fn ref_type(&self, rule: &RuleDef, r: &RefName, types: &HelperTypes) -> Option<ArgType> {
        // A helper forwarding its own parameter passes that parameter's type.
        if let Some(sig) = self.corpus.helper_of(rule) {
            if let Some(index) = sig.param_index(&r.name) {
                return types.param(&sig.name, index).map(|p| p.ty);
            }
        }
        let path = resolve_ref(self.catalog, rule, &r.name)?;
        if let Some(kind) = self.contexts.kind(&path) {
            return Some(match kind {
                ContextKind::Bool => ArgType::Bool,
                ContextKind::Int => ArgType::Int,
                ContextKind::Float => ArgType::Float,
                ContextKind::Enum(_) => ArgType::Str,
                ContextKind::Place(k) => ArgType::Place(*k),
            });
        }
        match self.catalog.data.get(&path)? {
            serde_json::Value::Bool(_) => Some(ArgType::Bool),
            serde_json::Value::Number(n) if n.is_i64() => Some(ArgType::Int),
            serde_json::Value::Number(_) => Some(ArgType::Float),
            serde_json::Value::String(s) => Some(match PlaceKind::of(s) {
                Some(kind) if s.contains('>') => ArgType::Place(kind),
                _ => ArgType::Str,
            }),
            _ => None,
        }
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Three-valued reachability.
//!
//! A rule is evaluated at a spot using only static per-spot data. Items,
//! settings and live context are always Uncertain, so a `False` result
//! means the rule can never hold there.

mod statics;
mod value;

pub use statics::StaticTable;
pub use value::{AbstractValue, Scalar};

use value::Agreement;

use crate::ast::*;
use crate::catalog::Catalog;
use crate::context::{resolve_ref, ContextKind, ContextTable};
use crate::corpus::{Callee, Corpus, RuleDef};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::InternalError;
use crate::place::{self, PlaceKind};

use std::collections::BTreeMap;

use anyhow::{bail, Result};

/// Deepest helper expansion before evaluation is abandoned.
pub const MAX_HELPER_DEPTH: usize = 64;

/// Result type the surrounding expression expects; drives `$default`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expect {
    Bool,
    Int,
    Float,
    Place,
    Enum(Option<String>),
    Unknown,
}

struct Frame<'a> {
    rule: &'a RuleDef,
    spot: &'a str,
    bindings: BTreeMap<String, AbstractValue>,
    depth: usize,
}

pub struct Evaluator<'a> {
    catalog: &'a Catalog,
    corpus: &'a Corpus,
    contexts: &'a ContextTable,
    statics: &'a StaticTable,
    diagnostics: Diagnostics,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        catalog: &'a Catalog,
        corpus: &'a Corpus,
        contexts: &'a ContextTable,
        statics: &'a StaticTable,
    ) -> Self {
        Self {
            catalog,
            corpus,
            contexts,
            statics,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Evaluates `rule` at `spot`. Action bodies have no truth value and
    /// are Uncertain.
    pub fn evaluate(&mut self, rule: &RuleDef, spot: &str) -> Result<AbstractValue> {
        let frame = Frame {
            rule,
            spot,
            bindings: BTreeMap::new(),
            depth: 0,
        };
        match &rule.body {
            RuleBody::Expr(e) => self.eval(&frame, e, &Expect::Bool),
            RuleBody::Action(_) => Ok(AbstractValue::Uncertain),
        }
    }

    /// Evaluates a free-standing expression as part of `rule`.
    pub fn evaluate_expr(&mut self, rule: &RuleDef, spot: &str, expr: &Expr) -> Result<AbstractValue> {
        let frame = Frame {
            rule,
            spot,
            bindings: BTreeMap::new(),
            depth: 0,
        };
        self.eval(&frame, expr, &Expect::Bool)
    }

    /// Warnings raised while evaluating.
    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn test(&mut self, f: &Frame, e: &Expr) -> Result<AbstractValue> {
        Ok(self.eval(f, e, &Expect::Bool)?.truth())
    }

    fn eval(&mut self, f: &Frame, e: &Expr, expect: &Expect) -> Result<AbstractValue> {
        use AbstractValue::*;

        Ok(match e {
            Expr::Or { lhs, rhs } => {
                let l = self.test(f, lhs)?;
                if l == True {
                    True
                } else {
                    l.or(&self.test(f, rhs)?)
                }
            }
            Expr::And { lhs, rhs } => {
                let l = self.test(f, lhs)?;
                if l == False {
                    False
                } else {
                    l.and(&self.test(f, rhs)?)
                }
            }
            Expr::Not(e) => self.test(f, e)?.not(),
            Expr::True => True,
            Expr::False => False,
            Expr::Paren(e) => self.eval(f, e, expect)?,

            Expr::Invoke {
                func,
                args,
                negated,
            } => {
                let v = self.call(f, func, args, expect)?;
                if *negated {
                    v.not()
                } else {
                    v
                }
            }
            Expr::IfThenElse {
                conds,
                branches,
                otherwise,
            } => {
                let conds: Vec<&Expr> = conds.iter().map(|c| c.as_ref()).collect();
                let branches: Vec<&Expr> = branches.iter().map(|b| b.as_ref()).collect();
                self.chain(f, &conds, &branches, otherwise.as_deref(), expect)?
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => self.chain(f, &[cond.as_ref()], &[then.as_ref()], Some(otherwise.as_ref()), expect)?,

            Expr::NumCompare { lhs, op, rhs } => {
                let l = self.eval(f, lhs, &Expect::Int)?;
                let r = self.eval(f, rhs, &Expect::Int)?;
                l.compare(*op, &r)
            }
            Expr::StrCompare { lhs, op, rhs } => {
                let expect = match rhs {
                    Literal::Place(_) => Expect::Place,
                    _ => Expect::Enum(None),
                };
                let l = self.eval(f, lhs, &expect)?;
                l.compare(*op, &AbstractValue::from_literal(rhs))
            }
            Expr::FlagMatch { value, mask } => match self.eval(f, value, &Expect::Int)? {
                Concrete(Scalar::Int(v)) => AbstractValue::from_bool(v & mask == *mask),
                _ => Uncertain,
            },
            Expr::RefEq { refr, op, rhs } => {
                let l = self.lookup(f, refr)?;
                let r = match rhs {
                    RefRhs::Item(_) | RefRhs::Setting(_) => Uncertain,
                    RefRhs::Ref(other) => self.lookup(f, other)?,
                    RefRhs::Invoke(call) => {
                        let expect = self.expect_for(f, refr);
                        self.eval(f, call, &expect)?
                    }
                };
                l.compare(*op, &r)
            }
            Expr::ArgFlag { refr, negated } => {
                let v = self.lookup(f, refr)?.truth();
                if *negated {
                    v.not()
                } else {
                    v
                }
            }
            Expr::SettingFlag { .. }
            | Expr::ItemAtLeast { .. }
            | Expr::HasItem(_)
            | Expr::HasLiteralItem(_)
            | Expr::HasArgItem(_)
            | Expr::Setting(_)
            | Expr::Items(_) => Uncertain,

            Expr::RefInSet { refr, set } => match (self.lookup(f, refr)?, set) {
                (Concrete(Scalar::Str(s)), SetLit::Strs(members)) => {
                    AbstractValue::from_bool(members.contains(&s))
                }
                (Concrete(Scalar::Place(p)), SetLit::Places(members)) => {
                    AbstractValue::from_bool(members.contains(&p))
                }
                _ => Uncertain,
            },
            Expr::PlaceMembership {
                place: arg,
                negated,
            } => {
                let target = match arg {
                    PlaceArg::Literal(p) => Some(p.clone()),
                    PlaceArg::Ref(r) => match self.lookup(f, r)? {
                        Concrete(Scalar::Place(p)) => Some(p),
                        _ => None,
                    },
                };
                let v = match target {
                    Some(p) => AbstractValue::from_bool(place::contains(&p, f.spot)),
                    None => Uncertain,
                };
                if *negated {
                    v.not()
                } else {
                    v
                }
            }
            Expr::PerItemSwitch { cases, default, .. } => {
                let mut agreement = Agreement::default();
                for (_, body) in cases {
                    agreement.add(self.eval(f, body, expect)?);
                }
                agreement.add(self.eval(f, default, expect)?);
                agreement.finish()
            }
            Expr::PerSettingSwitch { cases, default, .. } => {
                let mut agreement = Agreement::default();
                for (_, body) in cases {
                    agreement.add(self.eval(f, body, expect)?);
                }
                agreement.add(self.eval(f, default, expect)?);
                agreement.finish()
            }

            Expr::Int(n) => Concrete(Scalar::Int(*n)),
            Expr::Float(v) => Concrete(Scalar::Float(*v)),
            Expr::Str(s) => Concrete(Scalar::Str(s.clone())),
            Expr::Place(p) => Concrete(Scalar::Place(p.clone())),
            Expr::Ref(r) => self.lookup(f, r)?,
            Expr::Const(name) => self
                .catalog
                .consts
                .get(name)
                .map_or(Uncertain, AbstractValue::from_json),
            Expr::BinOp { lhs, op, rhs } => {
                let l = self.eval(f, lhs, &Expect::Int)?;
                let r = self.eval(f, rhs, &Expect::Int)?;
                l.arith(*op, &r)
            }
            Expr::Call { func, args } => self.call(f, func, args, expect)?,
        })
    }

    /// Folds a conditional chain. Branches under an Uncertain condition are
    /// all evaluated and must agree for the chain to be certain.
    fn chain(
        &mut self,
        f: &Frame,
        conds: &[&Expr],
        branches: &[&Expr],
        otherwise: Option<&Expr>,
        expect: &Expect,
    ) -> Result<AbstractValue> {
        let mut agreement = Agreement::default();
        let mut open = false;
        for (cond, branch) in conds.iter().zip(branches.iter()) {
            match self.test(f, cond)? {
                AbstractValue::False => continue,
                AbstractValue::True => {
                    let v = self.eval(f, branch, expect)?;
                    if !open {
                        return Ok(v);
                    }
                    agreement.add(v);
                    return Ok(agreement.finish());
                }
                _ => {
                    open = true;
                    agreement.add(self.eval(f, branch, expect)?);
                }
            }
        }
        let v = match otherwise {
            Some(e) => self.eval(f, e, expect)?,
            None => self.default_for(f, expect),
        };
        if !open {
            return Ok(v);
        }
        agreement.add(v);
        Ok(agreement.finish())
    }

    fn lookup(&mut self, f: &Frame, refr: &RefName) -> Result<AbstractValue> {
        if refr.at.is_none() {
            if let Some(v) = f.bindings.get(&refr.name) {
                return Ok(v.clone());
            }
        }
        let Some(path) = resolve_ref(self.catalog, f.rule, &refr.name) else {
            return Ok(AbstractValue::Uncertain);
        };
        let at = match &refr.at {
            None => return Ok(self.statics.lookup(f.spot, &path)),
            Some(Qualifier::Place(p)) => Some(p.clone()),
            Some(Qualifier::Ref(q)) => match self.lookup(f, &RefName::new(q.as_str()))? {
                AbstractValue::Concrete(Scalar::Place(p)) if !p.is_empty() => Some(p),
                _ => None,
            },
        };
        match at {
            Some(p) => Ok(self.statics.lookup(&p, &path)),
            None => {
                self.diagnostics.warn(
                    DiagnosticKind::UnresolvedQualifier,
                    &f.rule.name,
                    format!(
                        "Qualifier of {refr} in {} does not resolve at {}; treated as uncertain",
                        f.rule.name, f.spot
                    ),
                );
                Ok(AbstractValue::Uncertain)
            }
        }
    }

    fn expect_for(&self, f: &Frame, refr: &RefName) -> Expect {
        let Some(path) = resolve_ref(self.catalog, f.rule, &refr.name) else {
            return Expect::Unknown;
        };
        match self.contexts.get(&path) {
            Some(info) => match &info.kind {
                Some(ContextKind::Bool) => Expect::Bool,
                Some(ContextKind::Int) => Expect::Int,
                Some(ContextKind::Float) => Expect::Float,
                Some(ContextKind::Place(_)) => Expect::Place,
                Some(ContextKind::Enum(_)) => Expect::Enum(match &info.default {
                    Some(Literal::Str(s)) => Some(s.clone()),
                    _ => None,
                }),
                None => Expect::Unknown,
            },
            None => Expect::Unknown,
        }
    }

    fn default_for(&mut self, f: &Frame, expect: &Expect) -> AbstractValue {
        match expect {
            Expect::Bool => AbstractValue::False,
            Expect::Int => AbstractValue::Concrete(Scalar::Int(0)),
            Expect::Float => AbstractValue::Concrete(Scalar::Float(0.0)),
            Expect::Place => AbstractValue::Concrete(Scalar::Place(String::new())),
            Expect::Enum(Some(d)) => AbstractValue::Concrete(Scalar::Str(d.clone())),
            Expect::Enum(None) | Expect::Unknown => {
                self.diagnostics.warn(
                    DiagnosticKind::UnresolvedDefault,
                    &f.rule.name,
                    format!("No known default for $default in {}", f.rule.name),
                );
                AbstractValue::Uncertain
            }
        }
    }

    fn call(
        &mut self,
        f: &Frame,
        func: &str,
        args: &[Ref<Expr>],
        expect: &Expect,
    ) -> Result<AbstractValue> {
        let corpus = self.corpus;
        match corpus.resolve_call(func) {
            Callee::Builtin(b) => self.builtin(f, b.name, args, expect),
            Callee::Helper(sig) => {
                if f.depth >= MAX_HELPER_DEPTH {
                    bail!(InternalError::HelperRecursion {
                        rule: f.rule.name.clone(),
                        helper: sig.name.clone(),
                        limit: MAX_HELPER_DEPTH,
                    });
                }
                let Some(body_rule) = corpus.rule(&sig.rule_name()) else {
                    return Ok(AbstractValue::Uncertain);
                };
                let mut bindings = BTreeMap::new();
                for (param, arg) in sig.params.iter().zip(args.iter()) {
                    let v = self.eval(f, arg, &Expect::Unknown)?;
                    bindings.insert(param.name.clone(), v);
                }
                let frame = Frame {
                    rule: body_rule,
                    spot: f.spot,
                    bindings,
                    depth: f.depth + 1,
                };
                match &body_rule.body {
                    RuleBody::Expr(e) => self.eval(&frame, e, expect),
                    RuleBody::Action(_) => Ok(AbstractValue::Uncertain),
                }
            }
            // Other rules are never expanded.
            Callee::Rule(_) | Callee::Unknown => Ok(AbstractValue::Uncertain),
        }
    }

    fn builtin(
        &mut self,
        f: &Frame,
        name: &str,
        args: &[Ref<Expr>],
        expect: &Expect,
    ) -> Result<AbstractValue> {
        let mut values = vec![];
        for a in args {
            values.push(self.eval(f, a, &Expect::Unknown)?);
        }
        Ok(match (name, values.as_slice()) {
            ("default", _) => self.default_for(f, expect),
            ("get_region" | "get_area", [AbstractValue::Concrete(Scalar::Place(p))]) => {
                let kind = if name == "get_region" {
                    PlaceKind::Region
                } else {
                    PlaceKind::Area
                };
                place::ancestor(p, kind).map_or(AbstractValue::Uncertain, |a| {
                    AbstractValue::Concrete(Scalar::Place(a))
                })
            }
            ("max", [a, b]) | ("min", [a, b]) => match (a, b) {
                (
                    AbstractValue::Concrete(Scalar::Int(x)),
                    AbstractValue::Concrete(Scalar::Int(y)),
                ) => AbstractValue::Concrete(Scalar::Int(if name == "max" {
                    *x.max(y)
                } else {
                    *x.min(y)
                })),
                _ => AbstractValue::Uncertain,
            },
            _ => AbstractValue::Uncertain,
        })
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Context resolution: every `^name` reference is mapped to a fully
//! qualified context variable, and each variable's kind, bounds, default
//! and setters are inferred from how the corpus uses it.

use crate::ast::*;
use crate::catalog::Catalog;
use crate::corpus::{Corpus, RuleDef};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::place::PlaceKind;
use crate::traversal::{for_each_action, traverse_body};

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextKind {
    Bool,
    Int,
    Float,
    /// Closed set of string values, with the generated enum's name.
    Enum(String),
    Place(PlaceKind),
}

impl ContextKind {
    fn from_decl(ty: &str, var: &str) -> Option<ContextKind> {
        Some(match ty {
            "bool" => ContextKind::Bool,
            "int" => ContextKind::Int,
            "float" => ContextKind::Float,
            "enum" => ContextKind::Enum(enum_name(var)),
            "region" => ContextKind::Place(PlaceKind::Region),
            "area" => ContextKind::Place(PlaceKind::Area),
            "spot" => ContextKind::Place(PlaceKind::Spot),
            _ => return None,
        })
    }

    fn of_literal(lit: &Literal, var: &str) -> Option<ContextKind> {
        Some(match lit {
            Literal::Bool(_) => ContextKind::Bool,
            Literal::Int(_) => ContextKind::Int,
            Literal::Float(_) => ContextKind::Float,
            Literal::Str(_) => ContextKind::Enum(enum_name(var)),
            Literal::Place(p) => ContextKind::Place(PlaceKind::of(p)?),
        })
    }

    /// Whether a variable of this kind can hold a value observed as `other`.
    fn accepts(&self, other: &ContextKind) -> bool {
        self == other || matches!((self, other), (ContextKind::Float, ContextKind::Int))
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKind::Bool => f.write_str("bool"),
            ContextKind::Int => f.write_str("int"),
            ContextKind::Float => f.write_str("float"),
            ContextKind::Enum(name) => write!(f, "enum {name}"),
            ContextKind::Place(kind) => write!(f, "{kind}"),
        }
    }
}

/// `flags.last_mode` -> `FlagsLastMode`
pub fn enum_name(var: &str) -> String {
    var.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// What a variable is assigned from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetterKey {
    Value(String),
    Var(String),
}

#[derive(Debug, Clone)]
pub struct ContextInfo {
    pub name: String,
    pub kind: Option<ContextKind>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Declared default, or else the first literal any rule assigns.
    pub default: Option<Literal>,
    /// Default as declared in the catalog.
    pub declared_default: Option<Literal>,
    /// Every value an enum variable is assigned.
    pub values: BTreeSet<String>,
    /// Assigned value or source variable, to the rules that assign it.
    pub setters: BTreeMap<SetterKey, Vec<String>>,
    pub declared: bool,
}

impl ContextInfo {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: None,
            min: None,
            max: None,
            default: None,
            declared_default: None,
            values: BTreeSet::new(),
            setters: BTreeMap::new(),
            declared: false,
        }
    }

    /// Target-language representation type.
    pub fn repr(&self) -> String {
        match &self.kind {
            Some(ContextKind::Bool) => "bool".to_string(),
            Some(ContextKind::Float) => "f32".to_string(),
            Some(ContextKind::Enum(name)) => format!("enums::{name}"),
            Some(ContextKind::Place(kind)) => kind.id_type().to_string(),
            Some(ContextKind::Int) | None => match self.max {
                Some(max) => int_repr(self.min.unwrap_or(0), max).to_string(),
                None => "i32".to_string(),
            },
        }
    }

    fn widen(&mut self, n: i64) {
        self.min = Some(self.min.map_or(n, |m| m.min(n)));
        self.max = Some(self.max.map_or(n, |m| m.max(n)));
    }

    fn add_setter(&mut self, key: SetterKey, rule: &str) {
        let rules = self.setters.entry(key).or_default();
        if !rules.iter().any(|r| r == rule) {
            rules.push(rule.to_string());
        }
    }
}

/// Narrowest integer type holding `min..=max`.
fn int_repr(min: i64, max: i64) -> &'static str {
    if min >= 0 {
        match max {
            m if m <= i64::from(u8::MAX) => "u8",
            m if m <= i64::from(u16::MAX) => "u16",
            m if m <= i64::from(u32::MAX) => "u32",
            _ => "i64",
        }
    } else if min >= i64::from(i8::MIN) && max <= i64::from(i8::MAX) {
        "i8"
    } else if min >= i64::from(i16::MIN) && max <= i64::from(i16::MAX) {
        "i16"
    } else if min >= i64::from(i32::MIN) && max <= i64::from(i32::MAX) {
        "i32"
    } else {
        "i64"
    }
}

pub(crate) fn literal_from_json(value: &Value) -> Option<Literal> {
    match value {
        Value::Bool(b) => Some(Literal::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Literal::Int(i)),
            None => n.as_f64().map(Literal::Float),
        },
        Value::String(s) if s.contains('>') => Some(Literal::Place(s.clone())),
        Value::String(s) => Some(Literal::Str(s.clone())),
        _ => None,
    }
}

/// Resolves `^name` as seen from `rule`: rule-local aliases first, then
/// declared context, then static data.
pub fn resolve_ref(catalog: &Catalog, rule: &RuleDef, name: &str) -> Option<String> {
    if let Some(path) = rule.locals.get(name) {
        return Some(path.clone());
    }
    if catalog.context.contains_key(name) || catalog.data.contains_key(name) {
        return Some(name.to_string());
    }
    None
}

/// Context variables in declaration order; undeclared variables follow in
/// the order they were first referenced.
#[derive(Debug, Clone, Default)]
pub struct ContextTable {
    vars: IndexMap<String, ContextInfo>,
}

impl ContextTable {
    /// Seeds the table from the catalog's declarations.
    pub fn from_catalog(catalog: &Catalog, diagnostics: &mut Diagnostics) -> Self {
        let mut table = Self::default();
        for (name, decl) in &catalog.context {
            let mut info = ContextInfo::new(name);
            info.declared = true;
            info.min = decl.min;
            info.max = decl.max;
            info.declared_default = decl.default.as_ref().and_then(literal_from_json);
            info.default = info.declared_default.clone();
            info.kind = match &decl.ty {
                Some(ty) => {
                    let kind = ContextKind::from_decl(ty, name);
                    if kind.is_none() {
                        diagnostics.warn(
                            DiagnosticKind::TypeConflict,
                            name,
                            format!("Context variable {name} declares unknown type {ty}"),
                        );
                    }
                    kind
                }
                None => info
                    .default
                    .as_ref()
                    .and_then(|d| ContextKind::of_literal(d, name)),
            };
            // A declared place type makes even a bare region name a place.
            let place_default = match (&info.kind, &info.default) {
                (Some(ContextKind::Place(_)), Some(Literal::Str(s))) => {
                    Some(Literal::Place(s.clone()))
                }
                _ => None,
            };
            if place_default.is_some() {
                info.declared_default = place_default.clone();
                info.default = place_default;
            }
            if let (Some(ContextKind::Enum(_)), Some(Literal::Str(s))) = (&info.kind, &info.default)
            {
                info.values.insert(s.clone());
            }
            table.vars.insert(name.clone(), info);
        }
        table
    }

    pub fn get(&self, name: &str) -> Option<&ContextInfo> {
        self.vars.get(name)
    }

    pub fn kind(&self, name: &str) -> Option<&ContextKind> {
        self.vars.get(name).and_then(|v| v.kind.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContextInfo> {
        self.vars.values()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    fn entry(&mut self, name: &str) -> &mut ContextInfo {
        self.vars
            .entry(name.to_string())
            .or_insert_with(|| ContextInfo::new(name))
    }

    fn observe(&mut self, var: &str, kind: ContextKind, rule: &str, diagnostics: &mut Diagnostics) {
        let info = self.entry(var);
        match &info.kind {
            None => info.kind = Some(kind),
            Some(existing) if existing.accepts(&kind) => (),
            Some(existing) => diagnostics.error(
                DiagnosticKind::TypeConflict,
                rule,
                format!("Type conflict for ^{var} in {rule}: declared or inferred {existing}, used as {kind}"),
            ),
        }
    }
}

/// Walks the corpus and fills a [`ContextTable`].
pub struct ContextResolver<'a> {
    catalog: &'a Catalog,
    corpus: &'a Corpus,
}

impl<'a> ContextResolver<'a> {
    pub fn new(catalog: &'a Catalog, corpus: &'a Corpus) -> Self {
        Self { catalog, corpus }
    }

    pub fn run(&self, table: &mut ContextTable, diagnostics: &mut Diagnostics) -> Result<()> {
        for rule in self.corpus.rules() {
            debug!("resolving context references in {}", rule.name);
            self.check_references(rule, table, diagnostics)?;
            self.observe_exprs(rule, table, diagnostics)?;
            if let RuleBody::Action(a) = &rule.body {
                for_each_action(a, &mut |node| {
                    self.observe_action(rule, node, table, diagnostics);
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    fn resolve(&self, rule: &RuleDef, name: &str) -> Option<String> {
        resolve_ref(self.catalog, rule, name)
    }

    /// Reports each unresolved reference once per rule. Helper bodies may
    /// mention their own parameters and anything else freely.
    fn check_references(
        &self,
        rule: &RuleDef,
        table: &mut ContextTable,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let mut names: Vec<String> = vec![];
        traverse_body(&rule.body, &mut |e| {
            collect_ref_names(e, &mut names);
            Ok(true)
        })?;
        if let RuleBody::Action(a) = &rule.body {
            for_each_action(a, &mut |node| {
                match node.as_ref() {
                    Action::Set { refr, .. } | Action::Alter { refr, .. } => {
                        names.extend(refr.names().map(str::to_string));
                    }
                    Action::Swap { first, second } => {
                        names.extend(first.names().map(str::to_string));
                        names.extend(second.names().map(str::to_string));
                    }
                    _ => (),
                }
                Ok(())
            })?;
        }

        let helper = self.corpus.helper_of(rule);
        let mut reported = BTreeSet::new();
        for name in names {
            if helper.is_some_and(|h| h.param_index(&name).is_some()) {
                continue;
            }
            match self.resolve(rule, &name) {
                Some(path) if self.catalog.is_static(&path) => (),
                Some(path) => {
                    table.entry(&path);
                }
                None if rule.is_helper() => (),
                None => {
                    if reported.insert(name.clone()) {
                        diagnostics.error(
                            DiagnosticKind::UndefinedReference,
                            &rule.name,
                            format!("Undefined ctx property ^{name} in non-helper {}", rule.name),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolves `refr` to a context path unless it is a helper formal.
    fn target(&self, rule: &RuleDef, refr: &RefName) -> Option<String> {
        if refr.at.is_some() {
            // Qualified lookups read static data at another place.
            return None;
        }
        if let Some(h) = self.corpus.helper_of(rule) {
            if h.param_index(&refr.name).is_some() {
                return None;
            }
        }
        self.resolve(rule, &refr.name)
            .filter(|path| !self.catalog.is_static(path))
    }

    fn observe_exprs(
        &self,
        rule: &RuleDef,
        table: &mut ContextTable,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        traverse_body(&rule.body, &mut |e| {
            match e.as_ref() {
                Expr::NumCompare { lhs, rhs, .. } => {
                    for (side, other) in [(lhs, rhs), (rhs, lhs)] {
                        if let Expr::Ref(r) = side.as_ref() {
                            if let Some(var) = self.target(rule, r) {
                                let kind = match other.as_ref() {
                                    Expr::Int(_) => Some(ContextKind::Int),
                                    Expr::Float(_) => Some(ContextKind::Float),
                                    _ => None,
                                };
                                if let Some(kind) = kind {
                                    table.observe(&var, kind, &rule.name, diagnostics);
                                }
                            }
                        }
                    }
                }
                Expr::StrCompare { lhs, rhs, .. } => {
                    if let Expr::Ref(r) = lhs.as_ref() {
                        if let Some(var) = self.target(rule, r) {
                            if let Some(kind) = ContextKind::of_literal(rhs, &var) {
                                table.observe(&var, kind, &rule.name, diagnostics);
                            }
                        }
                    }
                }
                Expr::FlagMatch { value, .. } => {
                    if let Expr::Ref(r) = value.as_ref() {
                        if let Some(var) = self.target(rule, r) {
                            table.observe(&var, ContextKind::Int, &rule.name, diagnostics);
                        }
                    }
                }
                Expr::RefInSet { refr, set } => {
                    if let Some(var) = self.target(rule, refr) {
                        let kind = match set {
                            SetLit::Items(_) => None,
                            SetLit::Strs(_) => Some(ContextKind::Enum(enum_name(&var))),
                            SetLit::Places(places) => places
                                .first()
                                .and_then(|p| PlaceKind::of(p))
                                .map(ContextKind::Place),
                        };
                        if let Some(kind) = kind {
                            table.observe(&var, kind, &rule.name, diagnostics);
                        }
                    }
                }
                _ => (),
            }
            Ok(true)
        })
    }

    fn observe_action(
        &self,
        rule: &RuleDef,
        action: &Ref<Action>,
        table: &mut ContextTable,
        diagnostics: &mut Diagnostics,
    ) {
        match action.as_ref() {
            Action::Set { refr, value } => {
                let Some(var) = self.target(rule, refr) else {
                    return;
                };
                let literal = match value.as_ref() {
                    Expr::True => Some(Literal::Bool(true)),
                    Expr::False => Some(Literal::Bool(false)),
                    Expr::Int(n) => Some(Literal::Int(*n)),
                    Expr::Float(v) => Some(Literal::Float(*v)),
                    Expr::Str(s) => Some(Literal::Str(s.clone())),
                    Expr::Place(p) => Some(Literal::Place(p.clone())),
                    _ => None,
                };
                match (literal, value.as_ref()) {
                    (Some(lit), _) => {
                        if let Some(kind) = ContextKind::of_literal(&lit, &var) {
                            table.observe(&var, kind, &rule.name, diagnostics);
                        }
                        let info = table.entry(&var);
                        match &lit {
                            Literal::Int(n) => info.widen(*n),
                            Literal::Str(s) => {
                                info.values.insert(s.clone());
                            }
                            _ => (),
                        }
                        if info.default.is_none() {
                            info.default = Some(lit.clone());
                        }
                        let key = match &lit {
                            Literal::Str(s) | Literal::Place(s) => s.clone(),
                            other => other.to_string(),
                        };
                        info.add_setter(SetterKey::Value(key), &rule.name);
                    }
                    (None, Expr::Ref(src)) => {
                        if let Some(source) = self.target(rule, src) {
                            self.unify_vars(&var, &source, rule, table, diagnostics);
                            table
                                .entry(&var)
                                .add_setter(SetterKey::Var(source), &rule.name);
                        }
                    }
                    _ => (),
                }
            }
            Action::Alter { refr, delta, .. } => {
                if let Some(var) = self.target(rule, refr) {
                    let kind = match delta.as_ref() {
                        Expr::Float(_) => ContextKind::Float,
                        _ => ContextKind::Int,
                    };
                    table.observe(&var, kind, &rule.name, diagnostics);
                }
            }
            Action::Swap { first, second } => {
                if let (Some(a), Some(b)) = (self.target(rule, first), self.target(rule, second)) {
                    self.unify_vars(&a, &b, rule, table, diagnostics);
                    table.entry(&a).add_setter(SetterKey::Var(b.clone()), &rule.name);
                    table.entry(&b).add_setter(SetterKey::Var(a), &rule.name);
                }
            }
            Action::CondAction { .. } | Action::HelperCall { .. } | Action::Sequence(_) => (),
        }
    }

    /// Variables assigned from one another must agree on kind.
    fn unify_vars(
        &self,
        a: &str,
        b: &str,
        rule: &RuleDef,
        table: &mut ContextTable,
        diagnostics: &mut Diagnostics,
    ) {
        match (table.kind(a).cloned(), table.kind(b).cloned()) {
            (Some(ContextKind::Enum(_)), Some(ContextKind::Enum(_))) => (),
            (Some(ka), Some(kb)) => {
                if !ka.accepts(&kb) {
                    diagnostics.error(
                        DiagnosticKind::TypeConflict,
                        &rule.name,
                        format!("Type conflict in {}: ^{a} is {ka} but ^{b} is {kb}", rule.name),
                    );
                }
            }
            (Some(ka), None) => table.entry(b).kind = Some(ka),
            (None, Some(kb)) => table.entry(a).kind = Some(kb),
            (None, None) => (),
        }
    }
}

/// Every `^name` mentioned directly by `e` (not its children).
pub fn collect_ref_names(e: &Expr, names: &mut Vec<String>) {
    let mut add = |r: &RefName| names.extend(r.names().map(str::to_string));
    match e {
        Expr::Ref(r) | Expr::ArgFlag { refr: r, .. } | Expr::HasArgItem(r) => add(r),
        Expr::RefInSet { refr, .. } => add(refr),
        Expr::RefEq { refr, rhs, .. } => {
            add(refr);
            if let RefRhs::Ref(r) = rhs {
                add(r);
            }
        }
        Expr::PlaceMembership {
            place: PlaceArg::Ref(r),
            ..
        } => add(r),
        Expr::ItemAtLeast {
            threshold: Threshold::Ref(r),
            ..
        } => add(r),
        _ => (),
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::builtins::{Builtin, BUILTINS};
use crate::parser;
use crate::place::PlaceKind;

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const HELPER_NAMESPACE: &str = "helpers";
pub const OBJECTIVE_NAMESPACE: &str = "objectives";

/// Argument shape of a helper call, also the inferred type of a helper
/// parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgType {
    Bool,
    Int,
    Float,
    Str,
    Item,
    Items,
    Place(PlaceKind),
}

impl ArgType {
    pub fn place_kind(&self) -> Option<PlaceKind> {
        match self {
            ArgType::Place(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl FromStr for ArgType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "Bool" | "bool" => ArgType::Bool,
            "Int" | "int" => ArgType::Int,
            "Float" | "float" => ArgType::Float,
            "Str" | "str" | "String" => ArgType::Str,
            "Item" => ArgType::Item,
            "Items" => ArgType::Items,
            "Region" | "RegionId" => ArgType::Place(PlaceKind::Region),
            "Area" | "AreaId" => ArgType::Place(PlaceKind::Area),
            "Spot" | "SpotId" => ArgType::Place(PlaceKind::Spot),
            "Location" | "Action" => ArgType::Place(PlaceKind::Leaf),
            _ => bail!("unknown argument type `{s}`"),
        })
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Bool => f.write_str("Bool"),
            ArgType::Int => f.write_str("Int"),
            ArgType::Float => f.write_str("Float"),
            ArgType::Str => f.write_str("Str"),
            ArgType::Item => f.write_str("Item"),
            ArgType::Items => f.write_str("Items"),
            ArgType::Place(kind) => kind.fmt(f),
        }
    }
}

/// Formal parameter of a helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Option<ArgType>,
}

/// Signature of a user-defined helper. Its body is the rule named
/// `helpers:<name>` in the corpus.
#[derive(Debug, Clone)]
pub struct HelperSig {
    pub name: String,
    pub params: Vec<Param>,
}

impl HelperSig {
    pub fn rule_name(&self) -> String {
        format!("{HELPER_NAMESPACE}:{}", self.name)
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    Helper,
    Objective,
    Rule,
}

/// A single rule of the corpus, keyed by its fully qualified name.
#[derive(Debug, Clone)]
pub struct RuleDef {
    pub name: String,
    pub body: RuleBody,
    /// Short reference name to fully qualified context variable.
    pub locals: BTreeMap<String, String>,
    /// Spot this rule is attached to, if any.
    pub spot: Option<String>,
}

impl RuleDef {
    pub fn new(name: impl Into<String>, body: RuleBody) -> Self {
        Self {
            name: name.into(),
            body,
            locals: BTreeMap::new(),
            spot: None,
        }
    }

    /// Parses a requirement expression.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        Ok(Self::new(name, RuleBody::Expr(parser::parse_rule(name, text)?)))
    }

    /// Parses an action body.
    pub fn parse_actions(name: &str, text: &str) -> Result<Self> {
        Ok(Self::new(
            name,
            RuleBody::Action(parser::parse_actions(name, text)?),
        ))
    }

    pub fn with_local(mut self, short: &str, path: &str) -> Self {
        self.locals.insert(short.to_string(), path.to_string());
        self
    }

    pub fn at_spot(mut self, spot: &str) -> Self {
        self.spot = Some(spot.to_string());
        self
    }

    pub fn namespace(&self) -> &str {
        match self.name.split_once(':') {
            Some((ns, _)) => ns,
            None => "",
        }
    }

    pub fn category(&self) -> RuleCategory {
        match self.namespace() {
            HELPER_NAMESPACE => RuleCategory::Helper,
            OBJECTIVE_NAMESPACE => RuleCategory::Objective,
            _ => RuleCategory::Rule,
        }
    }

    pub fn is_helper(&self) -> bool {
        self.category() == RuleCategory::Helper
    }

    /// Name within the namespace.
    pub fn short_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, name)) => name,
            None => &self.name,
        }
    }
}

/// What a `$name(...)` call refers to.
pub enum Callee<'a> {
    Helper(&'a HelperSig),
    Builtin(&'static Builtin),
    Rule(&'a RuleDef),
    Unknown,
}

/// All rules and helpers to compile. Iteration is always sorted by qualified
/// name so every order-sensitive pass is reproducible.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    rules: BTreeMap<String, RuleDef>,
    helpers: BTreeMap<String, HelperSig>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: RuleDef) -> Result<()> {
        if self.rules.contains_key(&rule.name) {
            bail!("duplicate rule {}", rule.name);
        }
        self.rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    /// Adds a helper from its signature (`$name(^a, ^b: Spot)`) and body.
    pub fn add_helper(&mut self, signature: &str, body: RuleBody) -> Result<()> {
        let (name, params) = parser::parse_signature(signature)?;
        let sig = HelperSig { name, params };
        if self.helpers.contains_key(&sig.name) {
            bail!("duplicate helper ${}", sig.name);
        }
        self.add_rule(RuleDef::new(sig.rule_name(), body))?;
        self.helpers.insert(sig.name.clone(), sig);
        Ok(())
    }

    pub fn parse_helper(&mut self, signature: &str, text: &str) -> Result<()> {
        let body = RuleBody::Expr(parser::parse_rule(signature, text)?);
        self.add_helper(signature, body)
    }

    pub fn parse_action_helper(&mut self, signature: &str, text: &str) -> Result<()> {
        let body = RuleBody::Action(parser::parse_actions(signature, text)?);
        self.add_helper(signature, body)
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleDef> {
        self.rules.values()
    }

    pub fn rule(&self, name: &str) -> Option<&RuleDef> {
        self.rules.get(name)
    }

    pub fn helpers(&self) -> impl Iterator<Item = &HelperSig> {
        self.helpers.values()
    }

    pub fn helper(&self, name: &str) -> Option<&HelperSig> {
        self.helpers.get(name)
    }

    /// Signature of the helper whose body is `rule`, if any.
    pub fn helper_of(&self, rule: &RuleDef) -> Option<&HelperSig> {
        if rule.is_helper() {
            self.helpers.get(rule.short_name())
        } else {
            None
        }
    }

    /// Resolves a call target: helpers shadow builtins, and a non-helper
    /// rule is callable by its short name.
    pub fn resolve_call(&self, func: &str) -> Callee<'_> {
        if let Some(sig) = self.helpers.get(func) {
            return Callee::Helper(sig);
        }
        if let Some(builtin) = BUILTINS.get(func) {
            return Callee::Builtin(builtin);
        }
        match self
            .rules
            .values()
            .find(|r| !r.is_helper() && r.short_name() == func)
        {
            Some(rule) => Callee::Rule(rule),
            None => Callee::Unknown,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

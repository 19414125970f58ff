// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Tree-walking emitters. Every backend implements one method per node
//! kind; [`Backend::expr`] and [`Backend::action`] dispatch exhaustively, so
//! a node kind without a rendering does not compile.

mod debug;
mod rust;

pub use debug::DebugWriter;
pub use rust::RustWriter;

use crate::ast::*;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Identifier-safe form of a context path or name.
pub fn ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Caller-supplied accessors for context variables, by qualified path.
/// Unlisted variables use `ctx.<path>()` and `ctx.set_<path>(v)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessorTable {
    pub getters: BTreeMap<String, String>,
    pub setters: BTreeMap<String, String>,
}

impl AccessorTable {
    pub fn getter(&self, path: &str) -> String {
        match self.getters.get(path) {
            Some(g) => g.clone(),
            None => format!("ctx.{}()", ident(path)),
        }
    }

    pub fn setter(&self, path: &str, value: &str) -> String {
        match self.setters.get(path) {
            Some(s) => format!("{s}({value})"),
            None => format!("ctx.set_{}({value})", ident(path)),
        }
    }
}

pub trait Backend {
    fn name(&self) -> &'static str;

    fn or(&mut self, lhs: &Expr, rhs: &Expr) -> Result<String>;
    fn and(&mut self, lhs: &Expr, rhs: &Expr) -> Result<String>;
    fn not(&mut self, e: &Expr) -> Result<String>;
    fn truth(&mut self, value: bool) -> Result<String>;
    fn paren(&mut self, e: &Expr) -> Result<String>;

    fn invoke(&mut self, func: &str, args: &[Ref<Expr>], negated: bool) -> Result<String>;
    fn if_then_else(
        &mut self,
        conds: &[Ref<Expr>],
        branches: &[Ref<Expr>],
        otherwise: Option<&Expr>,
    ) -> Result<String>;
    fn ternary(&mut self, cond: &Expr, then: &Expr, otherwise: &Expr) -> Result<String>;
    fn num_compare(&mut self, lhs: &Expr, op: CmpOp, rhs: &Expr) -> Result<String>;
    fn str_compare(&mut self, lhs: &Expr, op: CmpOp, rhs: &Literal) -> Result<String>;
    fn flag_match(&mut self, value: &Expr, mask: i64) -> Result<String>;
    fn ref_eq(&mut self, refr: &RefName, op: CmpOp, rhs: &RefRhs) -> Result<String>;
    fn setting_flag(&mut self, name: &str, negated: bool) -> Result<String>;
    fn arg_flag(&mut self, refr: &RefName, negated: bool) -> Result<String>;
    fn item_at_least(&mut self, item: &str, threshold: &Threshold) -> Result<String>;
    fn has_item(&mut self, item: &str) -> Result<String>;
    fn has_literal_item(&mut self, text: &str) -> Result<String>;
    fn has_arg_item(&mut self, refr: &RefName) -> Result<String>;
    fn ref_in_set(&mut self, refr: &RefName, set: &SetLit) -> Result<String>;
    fn place_membership(&mut self, place: &PlaceArg, negated: bool) -> Result<String>;
    fn per_item_switch(
        &mut self,
        item: &str,
        cases: &[(i64, Ref<Expr>)],
        default: &Expr,
    ) -> Result<String>;
    fn per_setting_switch(
        &mut self,
        setting: &str,
        cases: &[(Literal, Ref<Expr>)],
        default: &Expr,
    ) -> Result<String>;

    fn int(&mut self, value: i64) -> Result<String>;
    fn float(&mut self, value: f64) -> Result<String>;
    fn string(&mut self, value: &str) -> Result<String>;
    fn place(&mut self, path: &str) -> Result<String>;
    fn reference(&mut self, refr: &RefName) -> Result<String>;
    fn setting(&mut self, name: &str) -> Result<String>;
    fn constant(&mut self, name: &str) -> Result<String>;
    fn bin_op(&mut self, lhs: &Expr, op: ArithOp, rhs: &Expr) -> Result<String>;
    fn call(&mut self, func: &str, args: &[Ref<Expr>]) -> Result<String>;
    fn items(&mut self, items: &[String]) -> Result<String>;

    fn set(&mut self, refr: &RefName, value: &Expr) -> Result<String>;
    fn alter(&mut self, refr: &RefName, op: ArithOp, delta: &Expr) -> Result<String>;
    fn swap(&mut self, first: &RefName, second: &RefName) -> Result<String>;
    fn cond_action(
        &mut self,
        conds: &[Ref<Expr>],
        branches: &[Ref<Action>],
        otherwise: Option<&Action>,
    ) -> Result<String>;
    fn helper_call(&mut self, func: &str, args: &[Ref<Expr>]) -> Result<String>;
    fn sequence(&mut self, actions: &[Ref<Action>]) -> Result<String>;

    fn args(&mut self, args: &[Ref<Expr>]) -> Result<Vec<String>> {
        args.iter().map(|a| self.expr(a)).collect()
    }

    fn body(&mut self, body: &RuleBody) -> Result<String> {
        match body {
            RuleBody::Expr(e) => self.expr(e),
            RuleBody::Action(a) => self.action(a),
        }
    }

    fn expr(&mut self, e: &Expr) -> Result<String> {
        match e {
            Expr::Or { lhs, rhs } => self.or(lhs, rhs),
            Expr::And { lhs, rhs } => self.and(lhs, rhs),
            Expr::Not(e) => self.not(e),
            Expr::True => self.truth(true),
            Expr::False => self.truth(false),
            Expr::Paren(e) => self.paren(e),
            Expr::Invoke {
                func,
                args,
                negated,
            } => self.invoke(func, args, *negated),
            Expr::IfThenElse {
                conds,
                branches,
                otherwise,
            } => self.if_then_else(conds, branches, otherwise.as_deref()),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => self.ternary(cond, then, otherwise),
            Expr::NumCompare { lhs, op, rhs } => self.num_compare(lhs, *op, rhs),
            Expr::StrCompare { lhs, op, rhs } => self.str_compare(lhs, *op, rhs),
            Expr::FlagMatch { value, mask } => self.flag_match(value, *mask),
            Expr::RefEq { refr, op, rhs } => self.ref_eq(refr, *op, rhs),
            Expr::SettingFlag { name, negated } => self.setting_flag(name, *negated),
            Expr::ArgFlag { refr, negated } => self.arg_flag(refr, *negated),
            Expr::ItemAtLeast { item, threshold } => self.item_at_least(item, threshold),
            Expr::HasItem(item) => self.has_item(item),
            Expr::HasLiteralItem(text) => self.has_literal_item(text),
            Expr::HasArgItem(refr) => self.has_arg_item(refr),
            Expr::RefInSet { refr, set } => self.ref_in_set(refr, set),
            Expr::PlaceMembership { place, negated } => self.place_membership(place, *negated),
            Expr::PerItemSwitch {
                item,
                cases,
                default,
            } => self.per_item_switch(item, cases, default),
            Expr::PerSettingSwitch {
                setting,
                cases,
                default,
            } => self.per_setting_switch(setting, cases, default),
            Expr::Int(v) => self.int(*v),
            Expr::Float(v) => self.float(*v),
            Expr::Str(s) => self.string(s),
            Expr::Place(p) => self.place(p),
            Expr::Ref(r) => self.reference(r),
            Expr::Setting(s) => self.setting(s),
            Expr::Const(c) => self.constant(c),
            Expr::BinOp { lhs, op, rhs } => self.bin_op(lhs, *op, rhs),
            Expr::Call { func, args } => self.call(func, args),
            Expr::Items(items) => self.items(items),
        }
    }

    fn action(&mut self, a: &Action) -> Result<String> {
        match a {
            Action::Set { refr, value } => self.set(refr, value),
            Action::Alter { refr, op, delta } => self.alter(refr, *op, delta),
            Action::Swap { first, second } => self.swap(first, second),
            Action::CondAction {
                conds,
                branches,
                otherwise,
            } => self.cond_action(conds, branches, otherwise.as_deref()),
            Action::HelperCall { func, args } => self.helper_call(func, args),
            Action::Sequence(list) => self.sequence(list),
        }
    }
}

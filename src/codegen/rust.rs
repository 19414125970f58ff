// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::catalog::{Catalog, SettingType};
use crate::codegen::{ident, AccessorTable, Backend};
use crate::context::{enum_name, resolve_ref, ContextKind, ContextTable};
use crate::corpus::{Callee, Corpus, RuleDef};
use crate::error::InternalError;
use crate::place::{self, PlaceKind};

use anyhow::Result;

/// Emits Rust expressions and statements against a `ctx` (player state)
/// and `world` (settings) pair.
pub struct RustWriter<'a> {
    catalog: &'a Catalog,
    corpus: &'a Corpus,
    contexts: &'a ContextTable,
    accessors: &'a AccessorTable,
    rule: &'a RuleDef,
}

impl<'a> RustWriter<'a> {
    pub fn new(
        catalog: &'a Catalog,
        corpus: &'a Corpus,
        contexts: &'a ContextTable,
        accessors: &'a AccessorTable,
        rule: &'a RuleDef,
    ) -> Self {
        Self {
            catalog,
            corpus,
            contexts,
            accessors,
            rule,
        }
    }

    fn is_param(&self, name: &str) -> bool {
        self.corpus
            .helper_of(self.rule)
            .is_some_and(|h| h.param_index(name).is_some())
    }

    fn path(&self, name: &str) -> String {
        resolve_ref(self.catalog, self.rule, name).unwrap_or_else(|| name.to_string())
    }

    fn get(&self, name: &str) -> String {
        if self.is_param(name) {
            return name.to_string();
        }
        let path = self.path(name);
        if self.catalog.is_static(&path) {
            format!("data::{}({})", ident(&path), self.accessors.getter("position"))
        } else {
            self.accessors.getter(&path)
        }
    }

    fn put(&self, refr: &RefName, value: &str) -> String {
        if self.is_param(&refr.name) {
            format!("{} = {value}", refr.name)
        } else {
            self.accessors.setter(&self.path(&refr.name), value)
        }
    }

    fn enum_of(&self, refr: &RefName) -> Option<String> {
        match self.contexts.kind(&self.path(&refr.name))? {
            ContextKind::Enum(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// Enum type of a setting declared as `enum`.
    fn setting_enum(&self, setting: &str) -> Option<String> {
        match self.catalog.settings.get(setting)?.ty {
            SettingType::Enum => Some(enum_name(setting)),
            _ => None,
        }
    }

    fn place_id(path: &str) -> String {
        let kind = PlaceKind::of(path).unwrap_or(PlaceKind::Leaf);
        format!("{}::{}", kind.id_type(), place::identifier(path))
    }

    fn item_id(item: &str) -> String {
        format!("Item::{}", ident(item))
    }

    /// String literal, or an enum variant when compared with an enum.
    fn text(enum_type: Option<&str>, value: &str) -> String {
        match enum_type {
            Some(ty) => format!("enums::{ty}::{}", enum_name(value)),
            None => format!("{value:?}"),
        }
    }

    fn literal(&self, lit: &Literal, enum_type: Option<&str>) -> String {
        match lit {
            Literal::Bool(b) => b.to_string(),
            Literal::Int(n) => n.to_string(),
            Literal::Float(v) => format!("{v:?}"),
            Literal::Str(s) => Self::text(enum_type, s),
            Literal::Place(p) => Self::place_id(p),
        }
    }

    fn call_form(&mut self, func: &str, args: &[Ref<Expr>]) -> Result<String> {
        let args = self.args(args)?;
        let corpus = self.corpus;
        Ok(match corpus.resolve_call(func) {
            Callee::Builtin(b) if b.threads_ctx => {
                format!("{}(ctx, {})", b.target, args.join(", "))
            }
            Callee::Builtin(b) => format!("{}({})", b.target, args.join(", ")),
            Callee::Rule(r) => format!("rule__{}(ctx, world)", ident(r.short_name())),
            Callee::Helper(_) | Callee::Unknown => {
                let mut all = vec!["ctx".to_string(), "world".to_string()];
                all.extend(args);
                format!("helper__{}({})", ident(func), all.join(", "))
            }
        })
    }

    fn negation(negated: bool) -> &'static str {
        if negated {
            "!"
        } else {
            ""
        }
    }

    fn unrenderable(&self, node: &'static str, detail: String) -> anyhow::Error {
        InternalError::Unrenderable {
            backend: "rust",
            node,
            rule: self.rule.name.clone(),
            detail,
        }
        .into()
    }
}

impl Backend for RustWriter<'_> {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn or(&mut self, lhs: &Expr, rhs: &Expr) -> Result<String> {
        Ok(format!("({} || {})", self.expr(lhs)?, self.expr(rhs)?))
    }

    fn and(&mut self, lhs: &Expr, rhs: &Expr) -> Result<String> {
        Ok(format!("({} && {})", self.expr(lhs)?, self.expr(rhs)?))
    }

    fn not(&mut self, e: &Expr) -> Result<String> {
        Ok(format!("!({})", self.expr(e)?))
    }

    fn truth(&mut self, value: bool) -> Result<String> {
        Ok(value.to_string())
    }

    fn paren(&mut self, e: &Expr) -> Result<String> {
        Ok(format!("({})", self.expr(e)?))
    }

    fn invoke(&mut self, func: &str, args: &[Ref<Expr>], negated: bool) -> Result<String> {
        Ok(format!(
            "{}{}",
            Self::negation(negated),
            self.call_form(func, args)?
        ))
    }

    fn if_then_else(
        &mut self,
        conds: &[Ref<Expr>],
        branches: &[Ref<Expr>],
        otherwise: Option<&Expr>,
    ) -> Result<String> {
        let mut arms = vec![];
        for (c, b) in conds.iter().zip(branches.iter()) {
            arms.push(format!("if {} {{ {} }}", self.expr(c)?, self.expr(b)?));
        }
        let otherwise = match otherwise {
            Some(e) => self.expr(e)?,
            None => "Default::default()".to_string(),
        };
        Ok(format!("{} else {{ {otherwise} }}", arms.join(" else ")))
    }

    fn ternary(&mut self, cond: &Expr, then: &Expr, otherwise: &Expr) -> Result<String> {
        Ok(format!(
            "if {} {{ {} }} else {{ {} }}",
            self.expr(cond)?,
            self.expr(then)?,
            self.expr(otherwise)?
        ))
    }

    fn num_compare(&mut self, lhs: &Expr, op: CmpOp, rhs: &Expr) -> Result<String> {
        Ok(format!(
            "{} {} {}",
            self.expr(lhs)?,
            op.as_str(),
            self.expr(rhs)?
        ))
    }

    fn str_compare(&mut self, lhs: &Expr, op: CmpOp, rhs: &Literal) -> Result<String> {
        let enum_type = match lhs {
            Expr::Ref(r) => self.enum_of(r),
            Expr::Setting(s) => self.setting_enum(s),
            _ => None,
        };
        Ok(format!(
            "{} {} {}",
            self.expr(lhs)?,
            op.as_str(),
            self.literal(rhs, enum_type.as_deref())
        ))
    }

    fn flag_match(&mut self, value: &Expr, mask: i64) -> Result<String> {
        Ok(format!("({} & {mask}) == {mask}", self.expr(value)?))
    }

    fn ref_eq(&mut self, refr: &RefName, op: CmpOp, rhs: &RefRhs) -> Result<String> {
        let rhs = match rhs {
            RefRhs::Item(item) => Self::item_id(item),
            RefRhs::Setting(s) => self.setting(s)?,
            RefRhs::Ref(r) => self.reference(r)?,
            RefRhs::Invoke(e) => self.expr(e)?,
        };
        Ok(format!("{} {} {rhs}", self.reference(refr)?, op.as_str()))
    }

    fn setting_flag(&mut self, name: &str, negated: bool) -> Result<String> {
        Ok(format!("{}world.{}", Self::negation(negated), ident(name)))
    }

    fn arg_flag(&mut self, refr: &RefName, negated: bool) -> Result<String> {
        Ok(format!("{}{}", Self::negation(negated), self.reference(refr)?))
    }

    fn item_at_least(&mut self, item: &str, threshold: &Threshold) -> Result<String> {
        let n = match threshold {
            Threshold::Int(n) => n.to_string(),
            Threshold::Setting(s) => self.setting(s)?,
            Threshold::Ref(r) => self.reference(r)?,
        };
        Ok(format!("ctx.count({}) >= {n}", Self::item_id(item)))
    }

    fn has_item(&mut self, item: &str) -> Result<String> {
        Ok(format!("ctx.has({})", Self::item_id(item)))
    }

    fn has_literal_item(&mut self, text: &str) -> Result<String> {
        Ok(format!("ctx.has({})", Self::item_id(text)))
    }

    fn has_arg_item(&mut self, refr: &RefName) -> Result<String> {
        Ok(format!("ctx.has({})", self.reference(refr)?))
    }

    fn ref_in_set(&mut self, refr: &RefName, set: &SetLit) -> Result<String> {
        let enum_type = self.enum_of(refr);
        let members: Vec<String> = match set {
            SetLit::Items(items) => items.iter().map(|i| Self::item_id(i)).collect(),
            SetLit::Strs(strs) => strs
                .iter()
                .map(|s| Self::text(enum_type.as_deref(), s))
                .collect(),
            SetLit::Places(places) => places.iter().map(|p| Self::place_id(p)).collect(),
        };
        Ok(format!(
            "matches!({}, {})",
            self.reference(refr)?,
            members.join(" | ")
        ))
    }

    fn place_membership(&mut self, place: &PlaceArg, negated: bool) -> Result<String> {
        let target = match place {
            PlaceArg::Ref(r) => self.reference(r)?,
            PlaceArg::Literal(p) => Self::place_id(p),
        };
        Ok(format!("{}ctx.within({target})", Self::negation(negated)))
    }

    fn per_item_switch(
        &mut self,
        item: &str,
        cases: &[(i64, Ref<Expr>)],
        default: &Expr,
    ) -> Result<String> {
        let mut arms = vec![];
        for (n, e) in cases {
            arms.push(format!("{n} => {},", self.expr(e)?));
        }
        arms.push(format!("_ => {},", self.expr(default)?));
        Ok(format!(
            "match ctx.count({}) {{ {} }}",
            Self::item_id(item),
            arms.join(" ")
        ))
    }

    fn per_setting_switch(
        &mut self,
        setting: &str,
        cases: &[(Literal, Ref<Expr>)],
        default: &Expr,
    ) -> Result<String> {
        let enum_type = self.setting_enum(setting);
        let mut scrutinee = self.setting(setting)?;
        if enum_type.is_none() && cases.iter().any(|(l, _)| matches!(l, Literal::Str(_))) {
            scrutinee.push_str(".as_str()");
        }
        let mut arms = vec![];
        for (lit, e) in cases {
            if let Literal::Float(v) = lit {
                return Err(self.unrenderable(
                    "PerSettingSwitch",
                    format!("float case {v:?} of {setting} is not a match pattern"),
                ));
            }
            arms.push(format!(
                "{} => {},",
                self.literal(lit, enum_type.as_deref()),
                self.expr(e)?
            ));
        }
        arms.push(format!("_ => {},", self.expr(default)?));
        Ok(format!("match {scrutinee} {{ {} }}", arms.join(" ")))
    }

    fn int(&mut self, value: i64) -> Result<String> {
        Ok(value.to_string())
    }

    fn float(&mut self, value: f64) -> Result<String> {
        Ok(format!("{value:?}"))
    }

    fn string(&mut self, value: &str) -> Result<String> {
        Ok(format!("{value:?}"))
    }

    fn place(&mut self, path: &str) -> Result<String> {
        Ok(Self::place_id(path))
    }

    fn reference(&mut self, refr: &RefName) -> Result<String> {
        match &refr.at {
            None => Ok(self.get(&refr.name)),
            Some(q) => {
                let at = match q {
                    Qualifier::Place(p) => Self::place_id(p),
                    Qualifier::Ref(r) => self.get(r),
                };
                Ok(format!("data::{}({at})", ident(&self.path(&refr.name))))
            }
        }
    }

    fn setting(&mut self, name: &str) -> Result<String> {
        Ok(format!("world.{}", ident(name)))
    }

    fn constant(&mut self, name: &str) -> Result<String> {
        Ok(name.to_string())
    }

    fn bin_op(&mut self, lhs: &Expr, op: ArithOp, rhs: &Expr) -> Result<String> {
        Ok(format!(
            "({} {} {})",
            self.expr(lhs)?,
            op.as_str(),
            self.expr(rhs)?
        ))
    }

    fn call(&mut self, func: &str, args: &[Ref<Expr>]) -> Result<String> {
        self.call_form(func, args)
    }

    fn items(&mut self, items: &[String]) -> Result<String> {
        let ids: Vec<String> = items.iter().map(|i| Self::item_id(i)).collect();
        Ok(format!("&[{}]", ids.join(", ")))
    }

    fn set(&mut self, refr: &RefName, value: &Expr) -> Result<String> {
        if refr.at.is_some() {
            return Err(self.unrenderable("Set", format!("{refr} is read-only data")));
        }
        let value = match value {
            Expr::Str(s) => Self::text(self.enum_of(refr).as_deref(), s),
            other => self.expr(other)?,
        };
        Ok(format!("{};", self.put(refr, &value)))
    }

    fn alter(&mut self, refr: &RefName, op: ArithOp, delta: &Expr) -> Result<String> {
        let current = self.reference(refr)?;
        let value = format!("{current} {} {}", op.as_str(), self.expr(delta)?);
        Ok(format!("{};", self.put(refr, &value)))
    }

    fn swap(&mut self, first: &RefName, second: &RefName) -> Result<String> {
        let a = self.reference(first)?;
        let b = self.reference(second)?;
        Ok(format!(
            "{{ let tmp = {a}; {}; {}; }}",
            self.put(first, &b),
            self.put(second, "tmp")
        ))
    }

    fn cond_action(
        &mut self,
        conds: &[Ref<Expr>],
        branches: &[Ref<Action>],
        otherwise: Option<&Action>,
    ) -> Result<String> {
        let mut arms = vec![];
        for (c, b) in conds.iter().zip(branches.iter()) {
            arms.push(format!("if {} {{ {} }}", self.expr(c)?, self.action(b)?));
        }
        let mut out = arms.join(" else ");
        if let Some(a) = otherwise {
            out.push_str(&format!(" else {{ {} }}", self.action(a)?));
        }
        Ok(out)
    }

    fn helper_call(&mut self, func: &str, args: &[Ref<Expr>]) -> Result<String> {
        Ok(format!("{};", self.call_form(func, args)?))
    }

    fn sequence(&mut self, actions: &[Ref<Action>]) -> Result<String> {
        let mut parts = vec![];
        for a in actions {
            parts.push(self.action(a)?);
        }
        Ok(parts.join(" "))
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::codegen::Backend;

use anyhow::Result;

/// Fully parenthesized reconstruction of a tree. Two trees are
/// structurally equal iff their renderings are equal.
#[derive(Debug, Default)]
pub struct DebugWriter;

impl DebugWriter {
    pub fn new() -> Self {
        Self
    }

    /// Renders a requirement expression.
    pub fn render(e: &Expr) -> Result<String> {
        DebugWriter.expr(e)
    }

    fn negation(negated: bool) -> &'static str {
        if negated {
            "!"
        } else {
            ""
        }
    }

    fn threshold(t: &Threshold) -> String {
        match t {
            Threshold::Int(n) => n.to_string(),
            Threshold::Setting(s) => format!("Setting:{s}"),
            Threshold::Ref(r) => r.to_string(),
        }
    }
}

impl Backend for DebugWriter {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn or(&mut self, lhs: &Expr, rhs: &Expr) -> Result<String> {
        Ok(format!("OR[ {} , {} ]", self.expr(lhs)?, self.expr(rhs)?))
    }

    fn and(&mut self, lhs: &Expr, rhs: &Expr) -> Result<String> {
        Ok(format!("AND[ {} , {} ]", self.expr(lhs)?, self.expr(rhs)?))
    }

    fn not(&mut self, e: &Expr) -> Result<String> {
        Ok(format!("NOT[ {} ]", self.expr(e)?))
    }

    fn truth(&mut self, value: bool) -> Result<String> {
        Ok(if value { "TRUE" } else { "FALSE" }.to_string())
    }

    fn paren(&mut self, e: &Expr) -> Result<String> {
        Ok(format!("( {} )", self.expr(e)?))
    }

    fn invoke(&mut self, func: &str, args: &[Ref<Expr>], negated: bool) -> Result<String> {
        Ok(format!(
            "{}Func:{func}({})",
            Self::negation(negated),
            self.args(args)?.join(", ")
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
            arms.push(format!("IF({})THEN{{{}}}", self.expr(c)?, self.expr(b)?));
        }
        let mut out = arms.join("ELSE ");
        if let Some(e) = otherwise {
            out.push_str(&format!("ELSE{{{}}}", self.expr(e)?));
        }
        Ok(out)
    }

    fn ternary(&mut self, cond: &Expr, then: &Expr, otherwise: &Expr) -> Result<String> {
        Ok(format!(
            "TERN({} ? {} : {})",
            self.expr(cond)?,
            self.expr(then)?,
            self.expr(otherwise)?
        ))
    }

    fn num_compare(&mut self, lhs: &Expr, op: CmpOp, rhs: &Expr) -> Result<String> {
        Ok(format!(
            "NUM[ {} {} {} ]",
            self.expr(lhs)?,
            op.as_str(),
            self.expr(rhs)?
        ))
    }

    fn str_compare(&mut self, lhs: &Expr, op: CmpOp, rhs: &Literal) -> Result<String> {
        Ok(format!("STR[ {} {} {rhs} ]", self.expr(lhs)?, op.as_str()))
    }

    fn flag_match(&mut self, value: &Expr, mask: i64) -> Result<String> {
        Ok(format!("FLAG[ {} & {mask} ]", self.expr(value)?))
    }

    fn ref_eq(&mut self, refr: &RefName, op: CmpOp, rhs: &RefRhs) -> Result<String> {
        let rhs = match rhs {
            RefRhs::Item(item) => format!("Item:{item}"),
            RefRhs::Setting(s) => format!("Setting:{s}"),
            RefRhs::Ref(r) => r.to_string(),
            RefRhs::Invoke(e) => self.expr(e)?,
        };
        Ok(format!("REFEQ[ {refr} {} {rhs} ]", op.as_str()))
    }

    fn setting_flag(&mut self, name: &str, negated: bool) -> Result<String> {
        Ok(format!("{}Flag:{name}", Self::negation(negated)))
    }

    fn arg_flag(&mut self, refr: &RefName, negated: bool) -> Result<String> {
        Ok(format!("{}Arg:{refr}", Self::negation(negated)))
    }

    fn item_at_least(&mut self, item: &str, threshold: &Threshold) -> Result<String> {
        Ok(format!("Item:{item}{{{}}}", Self::threshold(threshold)))
    }

    fn has_item(&mut self, item: &str) -> Result<String> {
        Ok(format!("Item:{item}"))
    }

    fn has_literal_item(&mut self, text: &str) -> Result<String> {
        Ok(format!("Item:{text:?}"))
    }

    fn has_arg_item(&mut self, refr: &RefName) -> Result<String> {
        Ok(format!("ItemArg:{refr}"))
    }

    fn ref_in_set(&mut self, refr: &RefName, set: &SetLit) -> Result<String> {
        let members: Vec<String> = match set {
            SetLit::Items(items) => items.clone(),
            SetLit::Strs(strs) => strs.iter().map(|s| format!("{s:?}")).collect(),
            SetLit::Places(places) => places.iter().map(|p| format!("'{p}'")).collect(),
        };
        Ok(format!("IN[ {refr} ; {} ]", members.join(", ")))
    }

    fn place_membership(&mut self, place: &PlaceArg, negated: bool) -> Result<String> {
        let target = match place {
            PlaceArg::Ref(r) => r.to_string(),
            PlaceArg::Literal(p) => format!("'{p}'"),
        };
        Ok(format!("{}WITHIN[ {target} ]", Self::negation(negated)))
    }

    fn per_item_switch(
        &mut self,
        item: &str,
        cases: &[(i64, Ref<Expr>)],
        default: &Expr,
    ) -> Result<String> {
        let mut arms = vec![];
        for (n, e) in cases {
            arms.push(format!("{n} => {}", self.expr(e)?));
        }
        arms.push(format!("_ => {}", self.expr(default)?));
        Ok(format!("PER Item:{item}{{ {} }}", arms.join(" ; ")))
    }

    fn per_setting_switch(
        &mut self,
        setting: &str,
        cases: &[(Literal, Ref<Expr>)],
        default: &Expr,
    ) -> Result<String> {
        let mut arms = vec![];
        for (lit, e) in cases {
            arms.push(format!("{lit} => {}", self.expr(e)?));
        }
        arms.push(format!("_ => {}", self.expr(default)?));
        Ok(format!("PER Setting:{setting}{{ {} }}", arms.join(" ; ")))
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
        Ok(format!("'{path}'"))
    }

    fn reference(&mut self, refr: &RefName) -> Result<String> {
        Ok(refr.to_string())
    }

    fn setting(&mut self, name: &str) -> Result<String> {
        Ok(format!("Setting:{name}"))
    }

    fn constant(&mut self, name: &str) -> Result<String> {
        Ok(format!("Const:{name}"))
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
        Ok(format!("Call:{func}({})", self.args(args)?.join(", ")))
    }

    fn items(&mut self, items: &[String]) -> Result<String> {
        Ok(format!("[{}]", items.join(", ")))
    }

    fn set(&mut self, refr: &RefName, value: &Expr) -> Result<String> {
        Ok(format!("SET[ {refr} = {} ]", self.expr(value)?))
    }

    fn alter(&mut self, refr: &RefName, op: ArithOp, delta: &Expr) -> Result<String> {
        Ok(format!(
            "ALTER[ {refr} {}= {} ]",
            op.as_str(),
            self.expr(delta)?
        ))
    }

    fn swap(&mut self, first: &RefName, second: &RefName) -> Result<String> {
        Ok(format!("SWAP[ {first} , {second} ]"))
    }

    fn cond_action(
        &mut self,
        conds: &[Ref<Expr>],
        branches: &[Ref<Action>],
        otherwise: Option<&Action>,
    ) -> Result<String> {
        let mut arms = vec![];
        for (c, b) in conds.iter().zip(branches.iter()) {
            arms.push(format!("IF({})THEN{{{}}}", self.expr(c)?, self.action(b)?));
        }
        let mut out = arms.join("ELSE ");
        if let Some(a) = otherwise {
            out.push_str(&format!("ELSE{{{}}}", self.action(a)?));
        }
        Ok(out)
    }

    fn helper_call(&mut self, func: &str, args: &[Ref<Expr>]) -> Result<String> {
        Ok(format!("CALL:{func}({})", self.args(args)?.join(", ")))
    }

    fn sequence(&mut self, actions: &[Ref<Action>]) -> Result<String> {
        let mut parts = vec![];
        for a in actions {
            parts.push(self.action(a)?);
        }
        Ok(format!("SEQ[ {} ]", parts.join(" ; ")))
    }
}

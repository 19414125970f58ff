// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::corpus::RuleDef;
use crate::error::InternalError;

use anyhow::Result;

/// Pre-order walk over an expression tree. Children of a node are skipped
/// when `f` returns `false`.
pub fn traverse(expr: &Ref<Expr>, f: &mut dyn FnMut(&Ref<Expr>) -> Result<bool>) -> Result<()> {
    if !f(expr)? {
        return Ok(());
    }

    match expr.as_ref() {
        Expr::True
        | Expr::False
        | Expr::SettingFlag { .. }
        | Expr::ArgFlag { .. }
        | Expr::ItemAtLeast { .. }
        | Expr::HasItem(_)
        | Expr::HasLiteralItem(_)
        | Expr::HasArgItem(_)
        | Expr::RefInSet { .. }
        | Expr::PlaceMembership { .. }
        | Expr::Int(_)
        | Expr::Float(_)
        | Expr::Str(_)
        | Expr::Place(_)
        | Expr::Ref(_)
        | Expr::Setting(_)
        | Expr::Const(_)
        | Expr::Items(_) => (),

        Expr::Or { lhs, rhs }
        | Expr::And { lhs, rhs }
        | Expr::NumCompare { lhs, rhs, .. }
        | Expr::BinOp { lhs, rhs, .. } => {
            traverse(lhs, f)?;
            traverse(rhs, f)?;
        }

        Expr::Not(e) | Expr::Paren(e) => traverse(e, f)?,
        Expr::StrCompare { lhs, .. } => traverse(lhs, f)?,
        Expr::FlagMatch { value, .. } => traverse(value, f)?,

        Expr::Invoke { args, .. } | Expr::Call { args, .. } => {
            for a in args {
                traverse(a, f)?;
            }
        }

        Expr::IfThenElse {
            conds,
            branches,
            otherwise,
        } => {
            for (c, b) in conds.iter().zip(branches.iter()) {
                traverse(c, f)?;
                traverse(b, f)?;
            }
            if let Some(e) = otherwise {
                traverse(e, f)?;
            }
        }

        Expr::Ternary {
            cond,
            then,
            otherwise,
        } => {
            traverse(cond, f)?;
            traverse(then, f)?;
            traverse(otherwise, f)?;
        }

        Expr::RefEq { rhs, .. } => {
            if let RefRhs::Invoke(e) = rhs {
                traverse(e, f)?;
            }
        }

        Expr::PerItemSwitch { cases, default, .. } => {
            for (_, e) in cases {
                traverse(e, f)?;
            }
            traverse(default, f)?;
        }
        Expr::PerSettingSwitch { cases, default, .. } => {
            for (_, e) in cases {
                traverse(e, f)?;
            }
            traverse(default, f)?;
        }
    }
    Ok(())
}

/// Pre-order walk over action nodes only.
pub fn for_each_action(
    action: &Ref<Action>,
    f: &mut dyn FnMut(&Ref<Action>) -> Result<()>,
) -> Result<()> {
    f(action)?;
    match action.as_ref() {
        Action::Set { .. } | Action::Alter { .. } | Action::Swap { .. } => (),
        Action::HelperCall { .. } => (),
        Action::CondAction {
            branches,
            otherwise,
            ..
        } => {
            for b in branches {
                for_each_action(b, f)?;
            }
            if let Some(o) = otherwise {
                for_each_action(o, f)?;
            }
        }
        Action::Sequence(list) => {
            for a in list {
                for_each_action(a, f)?;
            }
        }
    }
    Ok(())
}

/// Expressions directly held by an action node.
pub fn action_exprs(action: &Action) -> Vec<&Ref<Expr>> {
    match action {
        Action::Set { value, .. } => vec![value],
        Action::Alter { delta, .. } => vec![delta],
        Action::Swap { .. } | Action::Sequence(_) => vec![],
        Action::CondAction { conds, .. } => conds.iter().collect(),
        Action::HelperCall { args, .. } => args.iter().collect(),
    }
}

/// Walks every expression of a rule body, including those inside actions.
pub fn traverse_body(body: &RuleBody, f: &mut dyn FnMut(&Ref<Expr>) -> Result<bool>) -> Result<()> {
    match body {
        RuleBody::Expr(e) => traverse(e, f),
        RuleBody::Action(a) => {
            let mut roots = vec![];
            for_each_action(a, &mut |node| {
                roots.extend(action_exprs(node).into_iter().cloned());
                Ok(())
            })?;
            for e in &roots {
                traverse(e, f)?;
            }
            Ok(())
        }
    }
}

fn shape_error(rule: &RuleDef, node: &'static str, detail: String) -> anyhow::Error {
    InternalError::ShapeMismatch {
        rule: rule.name.clone(),
        node,
        detail,
    }
    .into()
}

/// Checks the structural contract every later pass relies on: conditional
/// chains pair each condition with a branch, and names are non-empty.
pub fn check_shape(rule: &RuleDef) -> Result<()> {
    let mut check_expr = |e: &Ref<Expr>| -> Result<bool> {
        match e.as_ref() {
            Expr::IfThenElse {
                conds, branches, ..
            } if conds.is_empty() || conds.len() != branches.len() => Err(shape_error(
                rule,
                e.kind(),
                format!("{} conditions for {} branches", conds.len(), branches.len()),
            )),
            Expr::Invoke { func, .. } | Expr::Call { func, .. } if func.is_empty() => {
                Err(shape_error(rule, e.kind(), "empty function name".to_string()))
            }
            Expr::Ref(r) | Expr::ArgFlag { refr: r, .. } | Expr::HasArgItem(r)
                if r.name.is_empty() =>
            {
                Err(shape_error(rule, e.kind(), "empty reference".to_string()))
            }
            Expr::PerItemSwitch { cases, .. } if cases.is_empty() => {
                Err(shape_error(rule, e.kind(), "no cases".to_string()))
            }
            Expr::PerSettingSwitch { cases, .. } if cases.is_empty() => {
                Err(shape_error(rule, e.kind(), "no cases".to_string()))
            }
            _ => Ok(true),
        }
    };

    if let RuleBody::Action(a) = &rule.body {
        for_each_action(a, &mut |node| match node.as_ref() {
            Action::CondAction {
                conds, branches, ..
            } if conds.is_empty() || conds.len() != branches.len() => Err(shape_error(
                rule,
                node.kind(),
                format!("{} conditions for {} branches", conds.len(), branches.len()),
            )),
            Action::Sequence(list) if list.is_empty() => {
                Err(shape_error(rule, node.kind(), "empty sequence".to_string()))
            }
            _ => Ok(()),
        })?;
    }
    traverse_body(&rule.body, &mut check_expr)
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::corpus::{ArgType, Param};
use crate::lexer::*;

use core::str::FromStr;

use anyhow::{bail, Result};

/// Whether the expression being parsed is consumed as a truth value or as a
/// plain value (argument, operand, assignment).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Pos {
    Bool,
    Value,
}

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
}

const KEYWORDS: [&str; 9] = [
    "TRUE", "FALSE", "NOT", "IF", "ELSE", "PER", "IN", "WITHIN", "SWAP",
];

fn is_const_name(name: &str) -> bool {
    name.len() >= 2
        && name.starts_with(|c: char| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn is_item_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
}

/// Coerce a value-shaped node into the predicate it denotes in boolean
/// position.
fn as_bool(e: Ref<Expr>) -> Ref<Expr> {
    match e.as_ref() {
        Expr::Ref(refr) => Ref::new(Expr::ArgFlag {
            refr: refr.clone(),
            negated: false,
        }),
        Expr::Setting(name) => Ref::new(Expr::SettingFlag {
            name: name.clone(),
            negated: false,
        }),
        Expr::Call { func, args } => Ref::new(Expr::Invoke {
            func: func.clone(),
            args: args.clone(),
            negated: false,
        }),
        Expr::Str(text) => Ref::new(Expr::HasLiteralItem(text.clone())),
        Expr::Paren(inner) => Ref::new(Expr::Paren(as_bool(inner.clone()))),
        Expr::Ternary {
            cond,
            then,
            otherwise,
        } => Ref::new(Expr::Ternary {
            cond: cond.clone(),
            then: as_bool(then.clone()),
            otherwise: as_bool(otherwise.clone()),
        }),
        Expr::IfThenElse {
            conds,
            branches,
            otherwise,
        } => Ref::new(Expr::IfThenElse {
            conds: conds.clone(),
            branches: branches.iter().cloned().map(as_bool).collect(),
            otherwise: otherwise.clone().map(as_bool),
        }),
        Expr::PerItemSwitch {
            item,
            cases,
            default,
        } => Ref::new(Expr::PerItemSwitch {
            item: item.clone(),
            cases: cases
                .iter()
                .map(|(n, body)| (*n, as_bool(body.clone())))
                .collect(),
            default: as_bool(default.clone()),
        }),
        Expr::PerSettingSwitch {
            setting,
            cases,
            default,
        } => Ref::new(Expr::PerSettingSwitch {
            setting: setting.clone(),
            cases: cases
                .iter()
                .map(|(v, body)| (v.clone(), as_bool(body.clone())))
                .collect(),
            default: as_bool(default.clone()),
        }),
        _ => e,
    }
}

fn negate(e: Ref<Expr>) -> Ref<Expr> {
    match e.as_ref() {
        Expr::Ref(refr) => Ref::new(Expr::ArgFlag {
            refr: refr.clone(),
            negated: true,
        }),
        Expr::Setting(name) => Ref::new(Expr::SettingFlag {
            name: name.clone(),
            negated: true,
        }),
        Expr::Call { func, args } => Ref::new(Expr::Invoke {
            func: func.clone(),
            args: args.clone(),
            negated: true,
        }),
        Expr::PlaceMembership {
            place,
            negated: false,
        } => Ref::new(Expr::PlaceMembership {
            place: place.clone(),
            negated: true,
        }),
        _ => Ref::new(Expr::Not(as_bool(e))),
    }
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String | TokenKind::Place => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn peek_token(&self) -> Result<Token> {
        self.lexer.clone().next_token()
    }

    fn error(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.tok.1.line, self.tok.1.col, msg)
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            Err(self.error(&format!("expecting `{text}` {context}")))
        }
    }

    fn expect_eof(&mut self) -> Result<()> {
        match self.tok.0 {
            TokenKind::Eof => Ok(()),
            _ => Err(self.error("unexpected trailing input")),
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        match self.tok.0 {
            TokenKind::Ident if KEYWORDS.contains(&self.token_text()) => {
                Err(self.error(&format!("unexpected keyword `{}`", self.token_text())))
            }
            TokenKind::Ident => {
                let name = self.token_text().to_string();
                self.next_token()?;
                Ok(name)
            }
            _ => Err(self.error("expecting identifier")),
        }
    }

    fn parse_int(&mut self) -> Result<i64> {
        if self.tok.0 != TokenKind::Number {
            return Err(self.error("expecting integer"));
        }
        match i64::from_str(self.token_text()) {
            Ok(v) => {
                self.next_token()?;
                Ok(v)
            }
            Err(_) => Err(self.error("expecting integer")),
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        let span = self.tok.1.clone();
        let v = match serde_json::from_str::<String>(format!("\"{}\"", span.text()).as_str()) {
            Ok(v) => v,
            Err(e) => bail!(span.error(format!("invalid string literal. {e}").as_str())),
        };
        self.next_token()?;
        Ok(v)
    }

    fn parse_place(&mut self) -> Result<String> {
        let text = self.tok.1.text().to_string();
        self.next_token()?;
        Ok(text)
    }

    fn parse_number(&mut self) -> Result<Expr> {
        let span = self.tok.1.clone();
        let node = if let Ok(v) = i64::from_str(span.text()) {
            Expr::Int(v)
        } else if let Ok(v) = f64::from_str(span.text()) {
            Expr::Float(v)
        } else {
            bail!(span.error("could not parse number"));
        };
        self.next_token()?;
        Ok(node)
    }

    /// `^name`, `^name@^other`, `^name@'Place'`
    fn parse_ref(&mut self) -> Result<RefName> {
        self.expect("^", "before reference name")?;
        let name = self.parse_ident()?;
        let at = if self.token_text() == "@" {
            self.next_token()?;
            match self.tok.0 {
                TokenKind::Place => Some(Qualifier::Place(self.parse_place()?)),
                _ => {
                    self.expect("^", "or place literal after `@`")?;
                    Some(Qualifier::Ref(self.parse_ident()?))
                }
            }
        } else {
            None
        };
        Ok(RefName { name, at })
    }

    fn parse_args(&mut self) -> Result<Vec<Ref<Expr>>> {
        let mut args = vec![];
        self.expect("(", "to start argument list")?;
        while self.token_text() != ")" {
            args.push(self.parse_expr(Pos::Value)?);
            match self.token_text() {
                "," => self.next_token()?,
                ")" => (),
                _ => return Err(self.error("expecting `,` or `)` in argument list")),
            }
        }
        self.next_token()?;
        Ok(args)
    }

    fn parse_item_list(&mut self) -> Result<Vec<String>> {
        let mut items = vec![];
        self.expect("[", "to start item list")?;
        while self.token_text() != "]" {
            let name = self.parse_ident()?;
            if !is_item_name(&name) {
                bail!(self.error(&format!("`{name}` is not an item name")));
            }
            items.push(name);
            match self.token_text() {
                "," => self.next_token()?,
                "]" => (),
                _ => return Err(self.error("expecting `,` or `]` in list")),
            }
        }
        self.next_token()?;
        Ok(items)
    }

    fn parse_set(&mut self) -> Result<SetLit> {
        let mut items = vec![];
        let mut strs = vec![];
        let mut places = vec![];
        self.expect("[", "to start set")?;
        while self.token_text() != "]" {
            match self.tok.0 {
                TokenKind::String => strs.push(self.parse_string()?),
                TokenKind::Place => places.push(self.parse_place()?),
                TokenKind::Ident => items.push(self.parse_ident()?),
                _ => return Err(self.error("expecting item, string or place in set")),
            }
            match self.token_text() {
                "," => self.next_token()?,
                "]" => (),
                _ => return Err(self.error("expecting `,` or `]` in set")),
            }
        }
        self.next_token()?;
        match (items.is_empty(), strs.is_empty(), places.is_empty()) {
            (_, true, true) => Ok(SetLit::Items(items)),
            (true, false, true) => Ok(SetLit::Strs(strs)),
            (true, true, false) => Ok(SetLit::Places(places)),
            _ => Err(self.error("set mixes items, strings and places")),
        }
    }

    fn parse_threshold(&mut self) -> Result<Threshold> {
        match self.tok.0 {
            TokenKind::Number => Ok(Threshold::Int(self.parse_int()?)),
            TokenKind::Symbol if self.token_text() == "^" => Ok(Threshold::Ref(self.parse_ref()?)),
            TokenKind::Ident => {
                let name = self.parse_ident()?;
                if is_item_name(&name) {
                    bail!(self.error(&format!("`{name}` is not a setting name")));
                }
                Ok(Threshold::Setting(name))
            }
            _ => Err(self.error("expecting count, setting or reference")),
        }
    }

    fn parse_if(&mut self) -> Result<Expr> {
        let mut conds = vec![];
        let mut branches = vec![];
        let mut otherwise = None;
        self.expect("IF", "")?;
        loop {
            self.expect("(", "after IF")?;
            conds.push(self.parse_expr(Pos::Bool)?);
            self.expect(")", "after condition")?;
            self.expect("{", "to start branch")?;
            branches.push(self.parse_expr(Pos::Value)?);
            self.expect("}", "to end branch")?;

            if self.token_text() != "ELSE" {
                break;
            }
            self.next_token()?;
            if self.token_text() == "IF" {
                self.next_token()?;
                continue;
            }
            self.expect("{", "to start ELSE branch")?;
            otherwise = Some(self.parse_expr(Pos::Value)?);
            self.expect("}", "to end ELSE branch")?;
            break;
        }
        Ok(Expr::IfThenElse {
            conds,
            branches,
            otherwise,
        })
    }

    fn parse_setting_case(&mut self) -> Result<Literal> {
        match self.tok.0 {
            TokenKind::Number => match self.parse_number()? {
                Expr::Int(v) => Ok(Literal::Int(v)),
                Expr::Float(v) => Ok(Literal::Float(v)),
                _ => Err(self.error("expecting number")),
            },
            TokenKind::String => Ok(Literal::Str(self.parse_string()?)),
            TokenKind::Place => Ok(Literal::Place(self.parse_place()?)),
            TokenKind::Ident if self.token_text() == "TRUE" => {
                self.next_token()?;
                Ok(Literal::Bool(true))
            }
            TokenKind::Ident if self.token_text() == "FALSE" => {
                self.next_token()?;
                Ok(Literal::Bool(false))
            }
            _ => Err(self.error("expecting literal case value")),
        }
    }

    fn parse_per(&mut self) -> Result<Expr> {
        self.expect("PER", "")?;
        let subject = self.parse_ident()?;
        let per_item = is_item_name(&subject);
        let mut item_cases = vec![];
        let mut setting_cases = vec![];
        let mut default = None;

        self.expect("{", "to start PER cases")?;
        while self.token_text() != "}" {
            if self.token_text() == "_" {
                self.next_token()?;
                self.expect("=>", "after `_`")?;
                default = Some(self.parse_expr(Pos::Value)?);
            } else if per_item {
                let n = self.parse_int()?;
                self.expect("=>", "after case")?;
                item_cases.push((n, self.parse_expr(Pos::Value)?));
            } else {
                let v = self.parse_setting_case()?;
                self.expect("=>", "after case")?;
                setting_cases.push((v, self.parse_expr(Pos::Value)?));
            }
            match self.token_text() {
                "," => self.next_token()?,
                "}" => (),
                _ => return Err(self.error("expecting `,` or `}` in PER cases")),
            }
        }
        let Some(default) = default else {
            return Err(self.error("PER requires a `_` case"));
        };
        self.next_token()?;

        Ok(if per_item {
            Expr::PerItemSwitch {
                item: subject,
                cases: item_cases,
                default,
            }
        } else {
            Expr::PerSettingSwitch {
                setting: subject,
                cases: setting_cases,
                default,
            }
        })
    }

    fn parse_ident_atom(&mut self) -> Result<Expr> {
        let next = self.peek_token()?;
        match self.token_text() {
            "TRUE" => {
                self.next_token()?;
                Ok(Expr::True)
            }
            "FALSE" => {
                self.next_token()?;
                Ok(Expr::False)
            }
            "IF" => self.parse_if(),
            "PER" => self.parse_per(),
            "WITHIN" => {
                self.next_token()?;
                let place = match self.tok.0 {
                    TokenKind::Place => PlaceArg::Literal(self.parse_place()?),
                    _ => PlaceArg::Ref(self.parse_ref()?),
                };
                Ok(Expr::PlaceMembership {
                    place,
                    negated: false,
                })
            }
            "Count" if next.1.text() == "(" => {
                self.next_token()?;
                self.expect("(", "after Count")?;
                let item = self.parse_ident()?;
                self.expect(")", "after item")?;
                self.expect(">=", "after Count(..)")?;
                let threshold = self.parse_threshold()?;
                Ok(Expr::ItemAtLeast { item, threshold })
            }
            "Has" if next.1.text() == "(" => {
                self.next_token()?;
                self.expect("(", "after Has")?;
                let refr = self.parse_ref()?;
                self.expect(")", "after reference")?;
                Ok(Expr::HasArgItem(refr))
            }
            _ => {
                let name = self.parse_ident()?;
                if is_const_name(&name) {
                    Ok(Expr::Const(name))
                } else if is_item_name(&name) {
                    if self.token_text() == "{" {
                        self.next_token()?;
                        let threshold = self.parse_threshold()?;
                        self.expect("}", "after count")?;
                        Ok(Expr::ItemAtLeast {
                            item: name,
                            threshold,
                        })
                    } else {
                        Ok(Expr::HasItem(name))
                    }
                } else {
                    Ok(Expr::Setting(name))
                }
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Ref<Expr>> {
        let node = match self.tok.0 {
            TokenKind::Number => self.parse_number()?,
            TokenKind::String => Expr::Str(self.parse_string()?),
            TokenKind::Place => Expr::Place(self.parse_place()?),
            TokenKind::Ident => self.parse_ident_atom()?,
            TokenKind::Symbol => match self.token_text() {
                "(" => {
                    self.next_token()?;
                    let inner = self.parse_expr(Pos::Value)?;
                    self.expect(")", "to close parenthesis")?;
                    Expr::Paren(inner)
                }
                "^" => Expr::Ref(self.parse_ref()?),
                "$" => {
                    self.next_token()?;
                    let func = self.parse_ident()?;
                    let args = if self.token_text() == "(" {
                        self.parse_args()?
                    } else {
                        vec![]
                    };
                    Expr::Call { func, args }
                }
                "[" => Expr::Items(self.parse_item_list()?),
                _ => return Err(self.error("expecting expression")),
            },
            TokenKind::Eof => return Err(self.error("expecting expression")),
        };
        Ok(Ref::new(node))
    }

    fn parse_term(&mut self) -> Result<Ref<Expr>> {
        let mut lhs = self.parse_atom()?;
        loop {
            let op = match self.token_text() {
                "*" => ArithOp::Mul,
                "/" => ArithOp::Div,
                _ => return Ok(lhs),
            };
            self.next_token()?;
            let rhs = self.parse_atom()?;
            lhs = Ref::new(Expr::BinOp { lhs, op, rhs });
        }
    }

    fn parse_arith(&mut self) -> Result<Ref<Expr>> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.token_text() {
                "+" => ArithOp::Add,
                "-" => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.next_token()?;
            let rhs = self.parse_term()?;
            lhs = Ref::new(Expr::BinOp { lhs, op, rhs });
        }
    }

    fn parse_compare(&mut self) -> Result<Ref<Expr>> {
        let lhs = self.parse_arith()?;
        let op = match self.token_text() {
            "==" => CmpOp::Eq,
            "!=" => CmpOp::Ne,
            "<" => CmpOp::Lt,
            "<=" => CmpOp::Le,
            ">" => CmpOp::Gt,
            ">=" => CmpOp::Ge,
            "&" => {
                self.next_token()?;
                let mask = self.parse_int()?;
                return Ok(Ref::new(Expr::FlagMatch { value: lhs, mask }));
            }
            "IN" => {
                let Expr::Ref(refr) = lhs.as_ref() else {
                    return Err(self.error("IN requires a reference on the left"));
                };
                let refr = refr.clone();
                self.next_token()?;
                let set = self.parse_set()?;
                return Ok(Ref::new(Expr::RefInSet { refr, set }));
            }
            _ => return Ok(lhs),
        };
        self.next_token()?;
        let rhs = self.parse_arith()?;
        let equality = matches!(op, CmpOp::Eq | CmpOp::Ne);

        let node = match (lhs.as_ref(), rhs.as_ref()) {
            (_, Expr::Str(s)) if equality => Expr::StrCompare {
                lhs: lhs.clone(),
                op,
                rhs: Literal::Str(s.clone()),
            },
            (_, Expr::Place(p)) if equality => Expr::StrCompare {
                lhs: lhs.clone(),
                op,
                rhs: Literal::Place(p.clone()),
            },
            (Expr::Ref(refr), Expr::HasItem(item)) if equality => Expr::RefEq {
                refr: refr.clone(),
                op,
                rhs: RefRhs::Item(item.clone()),
            },
            (Expr::Ref(refr), Expr::Setting(setting)) if equality => Expr::RefEq {
                refr: refr.clone(),
                op,
                rhs: RefRhs::Setting(setting.clone()),
            },
            (Expr::Ref(refr), Expr::Ref(other)) if equality => Expr::RefEq {
                refr: refr.clone(),
                op,
                rhs: RefRhs::Ref(other.clone()),
            },
            (Expr::Ref(refr), Expr::Call { .. }) if equality => Expr::RefEq {
                refr: refr.clone(),
                op,
                rhs: RefRhs::Invoke(as_bool(rhs.clone())),
            },
            _ => Expr::NumCompare {
                lhs: lhs.clone(),
                op,
                rhs: rhs.clone(),
            },
        };
        Ok(Ref::new(node))
    }

    fn parse_unary(&mut self) -> Result<Ref<Expr>> {
        if matches!(self.token_text(), "NOT" | "!") {
            self.next_token()?;
            let operand = self.parse_unary()?;
            return Ok(negate(operand));
        }
        self.parse_compare()
    }

    fn parse_and(&mut self) -> Result<Ref<Expr>> {
        let mut lhs = self.parse_unary()?;
        while self.token_text() == "&&" {
            self.next_token()?;
            let rhs = self.parse_unary()?;
            lhs = Ref::new(Expr::And {
                lhs: as_bool(lhs),
                rhs: as_bool(rhs),
            });
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Ref<Expr>> {
        let mut lhs = self.parse_and()?;
        while self.token_text() == "||" {
            self.next_token()?;
            let rhs = self.parse_and()?;
            lhs = Ref::new(Expr::Or {
                lhs: as_bool(lhs),
                rhs: as_bool(rhs),
            });
        }
        Ok(lhs)
    }

    fn parse_expr(&mut self, pos: Pos) -> Result<Ref<Expr>> {
        let lhs = self.parse_or()?;
        if self.token_text() == "?" {
            self.next_token()?;
            let then = self.parse_expr(pos)?;
            self.expect(":", "in ternary expression")?;
            let otherwise = self.parse_expr(pos)?;
            return Ok(Ref::new(Expr::Ternary {
                cond: as_bool(lhs),
                then,
                otherwise,
            }));
        }
        Ok(match pos {
            Pos::Bool => as_bool(lhs),
            Pos::Value => lhs,
        })
    }

    /// Parses a complete requirement expression.
    pub fn parse_rule(&mut self) -> Result<Ref<Expr>> {
        let expr = self.parse_expr(Pos::Bool)?;
        self.expect_eof()?;
        Ok(expr)
    }

    fn parse_action(&mut self) -> Result<Ref<Action>> {
        let action = match self.token_text() {
            "^" => {
                let refr = self.parse_ref()?;
                let op = match self.token_text() {
                    "=" => None,
                    "+=" => Some(ArithOp::Add),
                    "-=" => Some(ArithOp::Sub),
                    "*=" => Some(ArithOp::Mul),
                    "/=" => Some(ArithOp::Div),
                    _ => return Err(self.error("expecting assignment operator")),
                };
                self.next_token()?;
                let value = self.parse_expr(Pos::Value)?;
                match op {
                    None => Action::Set { refr, value },
                    Some(op) => Action::Alter {
                        refr,
                        op,
                        delta: value,
                    },
                }
            }
            "SWAP" => {
                self.next_token()?;
                self.expect("(", "after SWAP")?;
                let first = self.parse_ref()?;
                self.expect(",", "between SWAP operands")?;
                let second = self.parse_ref()?;
                self.expect(")", "after SWAP operands")?;
                Action::Swap { first, second }
            }
            "IF" => {
                let mut conds = vec![];
                let mut branches = vec![];
                let mut otherwise = None;
                self.next_token()?;
                loop {
                    self.expect("(", "after IF")?;
                    conds.push(self.parse_expr(Pos::Bool)?);
                    self.expect(")", "after condition")?;
                    self.expect("{", "to start branch")?;
                    branches.push(self.parse_action_block()?);
                    self.expect("}", "to end branch")?;

                    if self.token_text() != "ELSE" {
                        break;
                    }
                    self.next_token()?;
                    if self.token_text() == "IF" {
                        self.next_token()?;
                        continue;
                    }
                    self.expect("{", "to start ELSE branch")?;
                    otherwise = Some(self.parse_action_block()?);
                    self.expect("}", "to end ELSE branch")?;
                    break;
                }
                Action::CondAction {
                    conds,
                    branches,
                    otherwise,
                }
            }
            "$" => {
                self.next_token()?;
                let func = self.parse_ident()?;
                let args = if self.token_text() == "(" {
                    self.parse_args()?
                } else {
                    vec![]
                };
                Action::HelperCall { func, args }
            }
            _ => return Err(self.error("expecting action")),
        };
        Ok(Ref::new(action))
    }

    fn parse_action_block(&mut self) -> Result<Ref<Action>> {
        let mut actions = vec![];
        while !matches!(self.tok.0, TokenKind::Eof) && self.token_text() != "}" {
            actions.push(self.parse_action()?);
            if self.token_text() == ";" {
                self.next_token()?;
            } else {
                break;
            }
        }
        match actions.len() {
            0 => Err(self.error("expecting action")),
            1 => Ok(actions.remove(0)),
            _ => Ok(Ref::new(Action::Sequence(actions))),
        }
    }

    /// Parses a complete action body.
    pub fn parse_actions(&mut self) -> Result<Ref<Action>> {
        let actions = self.parse_action_block()?;
        self.expect_eof()?;
        Ok(actions)
    }

    /// Parses a helper signature: `$name`, `$name(^a, ^b: Spot)`.
    pub fn parse_signature(&mut self) -> Result<(String, Vec<Param>)> {
        self.expect("$", "before helper name")?;
        let name = self.parse_ident()?;
        let mut params = vec![];
        if self.token_text() == "(" {
            self.next_token()?;
            while self.token_text() != ")" {
                self.expect("^", "before parameter name")?;
                let pname = self.parse_ident()?;
                let ty = if self.token_text() == ":" {
                    self.next_token()?;
                    let span = self.tok.1.clone();
                    let tname = self.parse_ident()?;
                    match ArgType::from_str(&tname) {
                        Ok(t) => Some(t),
                        Err(_) => bail!(span.error(&format!("unknown parameter type `{tname}`"))),
                    }
                } else {
                    None
                };
                params.push(Param { name: pname, ty });
                match self.token_text() {
                    "," => self.next_token()?,
                    ")" => (),
                    _ => return Err(self.error("expecting `,` or `)` in parameter list")),
                }
            }
            self.next_token()?;
        }
        self.expect_eof()?;
        Ok((name, params))
    }
}

pub fn parse_rule(name: &str, text: &str) -> Result<Ref<Expr>> {
    let source = Source::from_contents(name.to_string(), text.to_string())?;
    let mut parser = Parser::new(&source)?;
    parser.parse_rule()
}

pub fn parse_actions(name: &str, text: &str) -> Result<Ref<Action>> {
    let source = Source::from_contents(name.to_string(), text.to_string())?;
    let mut parser = Parser::new(&source)?;
    parser.parse_actions()
}

pub fn parse_signature(text: &str) -> Result<(String, Vec<Param>)> {
    let source = Source::from_contents("<signature>".to_string(), text.to_string())?;
    let mut parser = Parser::new(&source)?;
    parser.parse_signature()
}

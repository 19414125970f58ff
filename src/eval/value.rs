// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{ArithOp, CmpOp, Literal};

use core::fmt;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
    /// A place path; the empty path is the "none" place.
    Place(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(v) => write!(f, "{v:?}"),
            Scalar::Str(s) => write!(f, "{s:?}"),
            Scalar::Place(p) => write!(f, "'{p}'"),
        }
    }
}

/// Result of evaluating a rule using only static data.
#[derive(Debug, Clone, PartialEq)]
pub enum AbstractValue {
    True,
    False,
    Uncertain,
    Concrete(Scalar),
}

use AbstractValue::*;

impl AbstractValue {
    pub fn from_bool(b: bool) -> Self {
        if b {
            True
        } else {
            False
        }
    }

    pub fn from_literal(lit: &Literal) -> Self {
        match lit {
            Literal::Bool(b) => Self::from_bool(*b),
            Literal::Int(n) => Concrete(Scalar::Int(*n)),
            Literal::Float(v) => Concrete(Scalar::Float(*v)),
            Literal::Str(s) => Concrete(Scalar::Str(s.clone())),
            Literal::Place(p) => Concrete(Scalar::Place(p.clone())),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Self::from_bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Concrete(Scalar::Int(i)),
                None => n.as_f64().map_or(Uncertain, |v| Concrete(Scalar::Float(v))),
            },
            Value::String(s) if s.contains('>') => Concrete(Scalar::Place(s.clone())),
            Value::String(s) => Concrete(Scalar::Str(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => Uncertain,
        }
    }

    /// Collapses a concrete value to its truthiness.
    pub fn truth(&self) -> Self {
        match self {
            True | False | Uncertain => self.clone(),
            Concrete(Scalar::Int(n)) => Self::from_bool(*n != 0),
            Concrete(Scalar::Float(v)) => Self::from_bool(*v != 0.0),
            Concrete(Scalar::Str(s)) | Concrete(Scalar::Place(s)) => Self::from_bool(!s.is_empty()),
        }
    }

    /// Kleene conjunction. `True` is its identity: the other operand is
    /// returned as is, concrete values included.
    pub fn and(&self, other: &Self) -> Self {
        match (self.truth(), other.truth()) {
            _ if *other == True => self.clone(),
            _ if *self == True => other.clone(),
            (False, _) | (_, False) => False,
            (True, True) => True,
            _ => Uncertain,
        }
    }

    /// Kleene disjunction, with `False` as its identity.
    pub fn or(&self, other: &Self) -> Self {
        match (self.truth(), other.truth()) {
            _ if *other == False => self.clone(),
            _ if *self == False => other.clone(),
            (True, _) | (_, True) => True,
            (False, False) => False,
            _ => Uncertain,
        }
    }

    /// Negation works on truthiness, so a concrete operand comes back as
    /// `True` or `False`.
    pub fn not(&self) -> Self {
        match self.truth() {
            True => False,
            False => True,
            _ => Uncertain,
        }
    }

    pub fn is_false(&self) -> bool {
        self.truth() == False
    }

    pub fn is_uncertain(&self) -> bool {
        *self == Uncertain
    }

    fn number(&self) -> Option<f64> {
        match self {
            Concrete(Scalar::Int(n)) => Some(*n as f64),
            Concrete(Scalar::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// Compares two values; anything not comparable is Uncertain.
    pub fn compare(&self, op: CmpOp, other: &Self) -> Self {
        match (self, other) {
            (Concrete(Scalar::Int(a)), Concrete(Scalar::Int(b))) => Self::from_bool(op.compare(a, b)),
            // Place names held as plain text compare by their text.
            (
                Concrete(Scalar::Str(a) | Scalar::Place(a)),
                Concrete(Scalar::Str(b) | Scalar::Place(b)),
            ) => {
                match op {
                    CmpOp::Eq | CmpOp::Ne => Self::from_bool(op.compare(a, b)),
                    _ => Uncertain,
                }
            }
            (True | False, True | False) => match op {
                CmpOp::Eq => Self::from_bool(self == other),
                CmpOp::Ne => Self::from_bool(self != other),
                _ => Uncertain,
            },
            _ => match (self.number(), other.number()) {
                (Some(a), Some(b)) => Self::from_bool(op.compare(&a, &b)),
                _ => Uncertain,
            },
        }
    }

    pub fn arith(&self, op: ArithOp, other: &Self) -> Self {
        match (self, other) {
            (Concrete(Scalar::Int(a)), Concrete(Scalar::Int(b))) => {
                let r = match op {
                    ArithOp::Add => a.checked_add(*b),
                    ArithOp::Sub => a.checked_sub(*b),
                    ArithOp::Mul => a.checked_mul(*b),
                    ArithOp::Div => a.checked_div(*b),
                };
                r.map_or(Uncertain, |n| Concrete(Scalar::Int(n)))
            }
            _ => match (self.number(), other.number()) {
                (Some(a), Some(b)) => Concrete(Scalar::Float(match op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mul => a * b,
                    ArithOp::Div => a / b,
                })),
                _ => Uncertain,
            },
        }
    }
}

impl fmt::Display for AbstractValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            True => f.write_str("True"),
            False => f.write_str("False"),
            Uncertain => f.write_str("Uncertain"),
            Concrete(s) => s.fmt(f),
        }
    }
}

/// Folds the results of every branch that might be taken.
#[derive(Debug, Default)]
pub(crate) struct Agreement {
    value: Option<AbstractValue>,
    split: bool,
}

impl Agreement {
    pub(crate) fn add(&mut self, v: AbstractValue) {
        match &self.value {
            _ if v.is_uncertain() => self.split = true,
            None => self.value = Some(v),
            Some(prev) if *prev == v => (),
            Some(_) => self.split = true,
        }
    }

    pub(crate) fn finish(self) -> AbstractValue {
        match self.value {
            Some(v) if !self.split => v,
            _ => Uncertain,
        }
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Rc;

use core::{cmp, fmt, ops::Deref};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ge => ">=",
            CmpOp::Gt => ">",
            CmpOp::Ne => "!=",
        }
    }

    pub fn compare<T: PartialOrd>(&self, lhs: &T, rhs: &T) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Shared, immutable handle to a tree node. Equality and ordering are by
/// identity; structural equality is defined by the debug rendering.
pub struct NodeRef<T> {
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.r).eq(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> cmp::Ord for NodeRef<T> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        Rc::as_ptr(&self.r).cmp(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::PartialOrd for NodeRef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

/// Literal scalar as written in rule text or in catalog data.
#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Place(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(true) => f.write_str("TRUE"),
            Literal::Bool(false) => f.write_str("FALSE"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Place(p) => write!(f, "'{p}'"),
        }
    }
}

/// Qualifier of a `^name@...` lookup: the place whose data is read.
#[derive(Debug, PartialEq, Clone)]
pub enum Qualifier {
    Ref(String),
    Place(String),
}

/// A `^name` reference, possibly qualified with `@`.
#[derive(Debug, PartialEq, Clone)]
pub struct RefName {
    pub name: String,
    pub at: Option<Qualifier>,
}

impl RefName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            at: None,
        }
    }

    /// Names of every `^ref` mentioned, including the qualifier.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let qualifier = match &self.at {
            Some(Qualifier::Ref(q)) => Some(q.as_str()),
            _ => None,
        };
        core::iter::once(self.name.as_str()).chain(qualifier)
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "^{}", self.name)?;
        match &self.at {
            Some(Qualifier::Ref(q)) => write!(f, "@^{q}"),
            Some(Qualifier::Place(p)) => write!(f, "@'{p}'"),
            None => Ok(()),
        }
    }
}

/// Right-hand side of a reference equality test.
#[derive(Debug, Clone)]
pub enum RefRhs {
    Item(String),
    Setting(String),
    Ref(RefName),
    Invoke(Ref<Expr>),
}

/// Quantity in an `Item{n}` count test.
#[derive(Debug, PartialEq, Clone)]
pub enum Threshold {
    Int(i64),
    Setting(String),
    /// Counting by a dynamic reference. Parsed but never resolved.
    Ref(RefName),
}

/// Members of an `IN [...]` set.
#[derive(Debug, PartialEq, Clone)]
pub enum SetLit {
    Items(Vec<String>),
    Strs(Vec<String>),
    Places(Vec<String>),
}

#[derive(Debug, PartialEq, Clone)]
pub enum PlaceArg {
    Ref(RefName),
    Literal(String),
}

/// Rule expression tree.
///
/// A single closed enum covers the boolean connectives, the predicates and
/// the numeric/string value expressions. Every pass matches on it
/// exhaustively.
#[derive(Debug)]
pub enum Expr {
    // Boolean structure.
    Or {
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },
    And {
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },
    Not(Ref<Expr>),
    True,
    False,
    Paren(Ref<Expr>),

    // Predicates.
    Invoke {
        func: String,
        args: Vec<Ref<Expr>>,
        negated: bool,
    },
    IfThenElse {
        conds: Vec<Ref<Expr>>,
        branches: Vec<Ref<Expr>>,
        otherwise: Option<Ref<Expr>>,
    },
    Ternary {
        cond: Ref<Expr>,
        then: Ref<Expr>,
        otherwise: Ref<Expr>,
    },
    NumCompare {
        lhs: Ref<Expr>,
        op: CmpOp,
        rhs: Ref<Expr>,
    },
    StrCompare {
        lhs: Ref<Expr>,
        op: CmpOp,
        rhs: Literal,
    },
    FlagMatch {
        value: Ref<Expr>,
        mask: i64,
    },
    RefEq {
        refr: RefName,
        op: CmpOp,
        rhs: RefRhs,
    },
    SettingFlag {
        name: String,
        negated: bool,
    },
    ArgFlag {
        refr: RefName,
        negated: bool,
    },
    ItemAtLeast {
        item: String,
        threshold: Threshold,
    },
    HasItem(String),
    HasLiteralItem(String),
    HasArgItem(RefName),
    RefInSet {
        refr: RefName,
        set: SetLit,
    },
    PlaceMembership {
        place: PlaceArg,
        negated: bool,
    },
    PerItemSwitch {
        item: String,
        cases: Vec<(i64, Ref<Expr>)>,
        default: Ref<Expr>,
    },
    PerSettingSwitch {
        setting: String,
        cases: Vec<(Literal, Ref<Expr>)>,
        default: Ref<Expr>,
    },

    // Values.
    Int(i64),
    Float(f64),
    Str(String),
    Place(String),
    Ref(RefName),
    Setting(String),
    Const(String),
    BinOp {
        lhs: Ref<Expr>,
        op: ArithOp,
        rhs: Ref<Expr>,
    },
    Call {
        func: String,
        args: Vec<Ref<Expr>>,
    },
    Items(Vec<String>),
}

impl Expr {
    /// Short name of the node kind, used in fatal errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Or { .. } => "Or",
            Expr::And { .. } => "And",
            Expr::Not(_) => "Not",
            Expr::True => "True",
            Expr::False => "False",
            Expr::Paren(_) => "Paren",
            Expr::Invoke { .. } => "Invoke",
            Expr::IfThenElse { .. } => "IfThenElse",
            Expr::Ternary { .. } => "Ternary",
            Expr::NumCompare { .. } => "NumCompare",
            Expr::StrCompare { .. } => "StrCompare",
            Expr::FlagMatch { .. } => "FlagMatch",
            Expr::RefEq { .. } => "RefEq",
            Expr::SettingFlag { .. } => "SettingFlag",
            Expr::ArgFlag { .. } => "ArgFlag",
            Expr::ItemAtLeast { .. } => "ItemAtLeast",
            Expr::HasItem(_) => "HasItem",
            Expr::HasLiteralItem(_) => "HasLiteralItem",
            Expr::HasArgItem(_) => "HasArgItem",
            Expr::RefInSet { .. } => "RefInSet",
            Expr::PlaceMembership { .. } => "PlaceMembership",
            Expr::PerItemSwitch { .. } => "PerItemSwitch",
            Expr::PerSettingSwitch { .. } => "PerSettingSwitch",
            Expr::Int(_) => "Int",
            Expr::Float(_) => "Float",
            Expr::Str(_) => "Str",
            Expr::Place(_) => "Place",
            Expr::Ref(_) => "Ref",
            Expr::Setting(_) => "Setting",
            Expr::Const(_) => "Const",
            Expr::BinOp { .. } => "BinOp",
            Expr::Call { .. } => "Call",
            Expr::Items(_) => "Items",
        }
    }
}

/// Statements of an action ("do") body.
#[derive(Debug)]
pub enum Action {
    Set {
        refr: RefName,
        value: Ref<Expr>,
    },
    Alter {
        refr: RefName,
        op: ArithOp,
        delta: Ref<Expr>,
    },
    Swap {
        first: RefName,
        second: RefName,
    },
    CondAction {
        conds: Vec<Ref<Expr>>,
        branches: Vec<Ref<Action>>,
        otherwise: Option<Ref<Action>>,
    },
    HelperCall {
        func: String,
        args: Vec<Ref<Expr>>,
    },
    Sequence(Vec<Ref<Action>>),
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Set { .. } => "Set",
            Action::Alter { .. } => "Alter",
            Action::Swap { .. } => "Swap",
            Action::CondAction { .. } => "CondAction",
            Action::HelperCall { .. } => "HelperCall",
            Action::Sequence(_) => "Sequence",
        }
    }
}

/// Body of a rule: a requirement expression or an action list.
#[derive(Debug, Clone)]
pub enum RuleBody {
    Expr(Ref<Expr>),
    Action(Ref<Action>),
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::corpus::ArgType;
use crate::place::PlaceKind;

use std::collections::BTreeMap;

use lazy_static::lazy_static;

/// A symbolic builtin and the target call it is substituted with.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    /// Target-language callee.
    pub target: &'static str,
    /// Whether the evaluation context is passed as the first argument.
    pub threads_ctx: bool,
    /// Static result type, when known.
    pub returns: Option<ArgType>,
}

fn register(m: &mut BTreeMap<&'static str, Builtin>, builtin: Builtin) {
    m.insert(builtin.name, builtin);
}

#[rustfmt::skip]
lazy_static! {
    pub static ref BUILTINS: BTreeMap<&'static str, Builtin> = {
	let mut m = BTreeMap::new();

	register(&mut m, Builtin { name: "max", arity: 2, target: "std::cmp::max", threads_ctx: false, returns: Some(ArgType::Int) });
	register(&mut m, Builtin { name: "min", arity: 2, target: "std::cmp::min", threads_ctx: false, returns: Some(ArgType::Int) });
	register(&mut m, Builtin { name: "default", arity: 0, target: "Default::default", threads_ctx: false, returns: None });
	register(&mut m, Builtin { name: "get_region", arity: 1, target: "get_region", threads_ctx: false, returns: Some(ArgType::Place(PlaceKind::Region)) });
	register(&mut m, Builtin { name: "get_area", arity: 1, target: "get_area", threads_ctx: false, returns: Some(ArgType::Place(PlaceKind::Area)) });
	register(&mut m, Builtin { name: "visited", arity: 1, target: "visited", threads_ctx: true, returns: Some(ArgType::Bool) });

	m
    };
}

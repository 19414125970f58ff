// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::context::ContextTable;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::eval::{AbstractValue, Evaluator, Scalar, StaticTable, MAX_HELPER_DEPTH};
use crate::tests::common::{corpus, world};
use crate::*;

use anyhow::{bail, Result};

use AbstractValue::{False, True, Uncertain};

const DOOR: &str = "Cave > Entry > Door";
const LEDGE: &str = "Cave > Entry > Ledge";
const EDGE: &str = "Cave > Pool > Edge";
const FOUNTAIN: &str = "Town > Square > Fountain";

/// Evaluates every `(rule, spot, expected)` triple against the test world.
fn check(corpus: &Corpus, cases: &[(&str, &str, AbstractValue)]) -> Result<Diagnostics> {
    let catalog = world()?;
    let mut diagnostics = Diagnostics::new();
    let contexts = ContextTable::from_catalog(&catalog, &mut diagnostics);
    let statics = StaticTable::from_catalog(&catalog);
    let mut evaluator = Evaluator::new(&catalog, corpus, &contexts, &statics);
    for (name, spot, expected) in cases {
        let Some(rule) = corpus.rule(name) else {
            bail!("no rule {name}");
        };
        let actual = evaluator.evaluate(rule, spot)?;
        assert_eq!(&actual, expected, "{name} at {spot}");
    }
    Ok(evaluator.into_diagnostics())
}

#[test]
fn kleene_laws() {
    let all = [True, False, Uncertain];
    for a in &all {
        assert_eq!(a.not().not(), *a);
        assert_eq!(a.and(&False), False);
        assert_eq!(a.or(&True), True);
        assert_eq!(a.and(&True), *a);
        assert_eq!(a.or(&False), *a);
        for b in &all {
            assert_eq!(a.and(b), b.and(a));
            assert_eq!(a.or(b), b.or(a));
            assert_eq!(a.and(b).not(), a.not().or(&b.not()));
            assert_eq!(a.or(b).not(), a.not().and(&b.not()));
        }
    }
    assert_eq!(Uncertain.and(&Uncertain), Uncertain);
    assert_eq!(Uncertain.not(), Uncertain);
}

#[test]
fn concrete_values() {
    let zero = AbstractValue::Concrete(Scalar::Int(0));
    let three = AbstractValue::Concrete(Scalar::Int(3));
    assert_eq!(zero.truth(), False);
    assert_eq!(three.truth(), True);
    assert_eq!(three.compare(ast::CmpOp::Gt, &zero), True);
    assert_eq!(three.compare(ast::CmpOp::Gt, &Uncertain), Uncertain);
    assert_eq!(
        three.arith(ast::ArithOp::Sub, &three),
        AbstractValue::Concrete(Scalar::Int(0))
    );
    assert_eq!(
        three.arith(ast::ArithOp::Div, &zero),
        Uncertain,
        "division by zero is not a value"
    );
    assert_eq!(Uncertain.to_string(), "Uncertain");
    assert_eq!(three.to_string(), "3");

    // Identities keep concrete operands.
    for a in [&zero, &three] {
        assert_eq!(a.and(&True), *a);
        assert_eq!(True.and(a), *a);
        assert_eq!(a.or(&False), *a);
        assert_eq!(False.or(a), *a);
        assert_eq!(a.and(&False), False);
        assert_eq!(a.or(&True), True);
    }
    assert_eq!(zero.and(&three), False);
    assert_eq!(three.and(&three), True);
    assert_eq!(zero.or(&zero), False);
    assert_eq!(zero.not(), True);
}

#[test]
fn static_data() -> Result<()> {
    let corpus = corpus(&[
        ("rules:wet", "^water"),
        ("rules:deep", "^depth >= 2"),
        ("rules:sword_wet", "Sword && ^water"),
        ("rules:sword_or_wet", "Sword || ^water"),
        ("rules:dry", "NOT ^water"),
    ])?;
    check(
        &corpus,
        &[
            ("rules:wet", DOOR, True),
            ("rules:wet", LEDGE, False),
            ("rules:wet", EDGE, True),
            ("rules:deep", DOOR, True),
            ("rules:deep", EDGE, False),
            ("rules:sword_wet", LEDGE, False),
            ("rules:sword_wet", DOOR, Uncertain),
            ("rules:sword_or_wet", DOOR, True),
            ("rules:sword_or_wet", LEDGE, Uncertain),
            ("rules:dry", FOUNTAIN, True),
        ],
    )?;
    Ok(())
}

#[test]
fn region_valued_data() -> Result<()> {
    let corpus = corpus(&[
        ("rules:home_cave", "^home == 'Cave'"),
        ("rules:at_home", "WITHIN ^home"),
        ("rules:not_town", "^home != \"Town\""),
    ])?;
    check(
        &corpus,
        &[
            ("rules:home_cave", DOOR, True),
            ("rules:home_cave", LEDGE, False),
            ("rules:at_home", DOOR, True),
            ("rules:at_home", LEDGE, False),
            ("rules:at_home", FOUNTAIN, True),
            ("rules:not_town", DOOR, True),
            ("rules:not_town", FOUNTAIN, False),
        ],
    )?;
    Ok(())
}

#[test]
fn runtime_state_is_uncertain() -> Result<()> {
    let corpus = corpus(&[
        ("rules:item", "Sword"),
        ("rules:count", "Bomb{3}"),
        ("rules:setting", "hard_mode"),
        ("rules:ctx", "^energy > 10"),
    ])?;
    check(
        &corpus,
        &[
            ("rules:item", DOOR, Uncertain),
            ("rules:count", DOOR, Uncertain),
            ("rules:setting", DOOR, Uncertain),
            ("rules:ctx", DOOR, Uncertain),
        ],
    )?;
    Ok(())
}

#[test]
fn per_item_switch_agreement() -> Result<()> {
    let corpus = corpus(&[
        ("rules:split", "PER Bomb { 1 => ^water, 2 => TRUE, _ => FALSE }"),
        ("rules:agree", "PER Bomb { 1 => ^water, _ => ^water }"),
    ])?;
    check(
        &corpus,
        &[
            ("rules:split", LEDGE, Uncertain),
            ("rules:split", DOOR, Uncertain),
            ("rules:agree", LEDGE, False),
            ("rules:agree", DOOR, True),
        ],
    )?;
    Ok(())
}

#[test]
fn conditional_chains() -> Result<()> {
    let corpus = corpus(&[
        ("rules:known", "IF (^water) { Sword } ELSE { FALSE }"),
        ("rules:open", "IF (Sword) { ^water } ELSE { ^depth > 1 }"),
        ("rules:no_else", "IF (^water) { TRUE }"),
        ("rules:tern", "^water ? TRUE : Sword"),
    ])?;
    check(
        &corpus,
        &[
            ("rules:known", LEDGE, False),
            ("rules:known", DOOR, Uncertain),
            ("rules:open", LEDGE, False),
            ("rules:open", DOOR, True),
            ("rules:open", EDGE, Uncertain),
            ("rules:no_else", LEDGE, False),
            ("rules:tern", DOOR, True),
            ("rules:tern", LEDGE, Uncertain),
        ],
    )?;
    Ok(())
}

#[test]
fn places() -> Result<()> {
    let corpus = corpus(&[
        ("rules:in_entry", "WITHIN 'Cave > Entry'"),
        ("rules:not_cave", "NOT WITHIN 'Cave'"),
        ("rules:region", "$get_region('Cave > Entry > Door') == 'Cave'"),
        ("rules:remote", "^water@'Cave > Pool > Edge'"),
    ])?;
    check(
        &corpus,
        &[
            ("rules:in_entry", DOOR, True),
            ("rules:in_entry", EDGE, False),
            ("rules:not_cave", FOUNTAIN, True),
            ("rules:not_cave", LEDGE, False),
            ("rules:region", FOUNTAIN, True),
            ("rules:remote", LEDGE, True),
        ],
    )?;
    Ok(())
}

#[test]
fn helpers_expand_with_bindings() -> Result<()> {
    let mut corpus = corpus(&[
        ("rules:deep", "$deep(2)"),
        ("rules:deeper", "$deep(5)"),
        ("rules:bigger", "$max(^depth, 1) >= 3"),
    ])?;
    corpus.parse_helper("$deep(^n)", "^depth >= ^n")?;
    check(
        &corpus,
        &[
            ("rules:deep", DOOR, True),
            ("rules:deep", LEDGE, False),
            ("rules:deeper", DOOR, False),
            ("rules:bigger", DOOR, True),
            ("rules:bigger", LEDGE, False),
        ],
    )?;
    Ok(())
}

#[test]
fn calls_to_rules_are_uncertain() -> Result<()> {
    let corpus = corpus(&[("rules:a", "FALSE"), ("rules:b", "$a"), ("rules:c", "$nope")])?;
    check(
        &corpus,
        &[("rules:b", DOOR, Uncertain), ("rules:c", DOOR, Uncertain)],
    )?;
    Ok(())
}

#[test]
fn recursion_is_bounded() -> Result<()> {
    let mut corpus = corpus(&[("rules:spin", "$spin_helper")])?;
    corpus.parse_helper("$spin_helper", "$spin_helper")?;

    let catalog = world()?;
    let mut diagnostics = Diagnostics::new();
    let contexts = ContextTable::from_catalog(&catalog, &mut diagnostics);
    let statics = StaticTable::from_catalog(&catalog);
    let mut evaluator = Evaluator::new(&catalog, &corpus, &contexts, &statics);
    let Some(rule) = corpus.rule("rules:spin") else {
        bail!("missing rule");
    };
    let err = evaluator.evaluate(rule, DOOR).unwrap_err();
    match err.downcast_ref::<InternalError>() {
        Some(InternalError::HelperRecursion { helper, limit, .. }) => {
            assert_eq!(helper, "spin_helper");
            assert_eq!(*limit, MAX_HELPER_DEPTH);
        }
        _ => bail!("unexpected error {err}"),
    }
    Ok(())
}

#[test]
fn unresolved_lookups_warn() -> Result<()> {
    let corpus = corpus(&[
        ("rules:default", "$default == \"x\""),
        ("rules:qualified", "^water@^save"),
    ])?;
    let diagnostics = check(
        &corpus,
        &[
            ("rules:default", DOOR, Uncertain),
            ("rules:qualified", DOOR, Uncertain),
        ],
    )?;
    let kinds: Vec<DiagnosticKind> = diagnostics.warnings().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        [
            DiagnosticKind::UnresolvedDefault,
            DiagnosticKind::UnresolvedQualifier
        ]
    );
    assert!(!diagnostics.has_errors());
    Ok(())
}

#[test]
fn overrides_fall_back_to_defaults() {
    let mut statics = StaticTable::default();
    statics.set_default("depth", AbstractValue::Concrete(Scalar::Int(1)));
    statics.set(DOOR, "depth", AbstractValue::Concrete(Scalar::Int(4)));
    assert!(statics.is_static("depth"));
    assert!(!statics.is_static("energy"));
    assert_eq!(statics.lookup(DOOR, "depth"), AbstractValue::Concrete(Scalar::Int(4)));
    assert_eq!(statics.lookup(LEDGE, "depth"), AbstractValue::Concrete(Scalar::Int(1)));
    assert_eq!(statics.lookup(LEDGE, "energy"), Uncertain);
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::codegen::{AccessorTable, Backend, DebugWriter, RustWriter};
use crate::ast::Expr;
use crate::context::ContextTable;
use crate::parser::parse_rule;
use crate::tests::common::world;
use crate::*;

use anyhow::{bail, Result};

fn debug(text: &str) -> Result<String> {
    let tree = parse_rule("case", text)?;
    DebugWriter::render(&tree)
}

fn rust_with(corpus: &Corpus, name: &str, accessors: &AccessorTable) -> Result<String> {
    let catalog = world()?;
    let contexts = ContextTable::from_catalog(&catalog, &mut Diagnostics::new());
    let Some(rule) = corpus.rule(name) else {
        bail!("no rule {name}");
    };
    RustWriter::new(&catalog, corpus, &contexts, accessors, rule).body(&rule.body)
}

fn rust(text: &str) -> Result<String> {
    let mut corpus = Corpus::new();
    corpus.add_rule(RuleDef::parse("rules:case", text)?)?;
    rust_with(&corpus, "rules:case", &AccessorTable::default())
}

#[test]
fn debug_rendering_is_structural() -> Result<()> {
    let same = [
        ["Sword && Key", "Sword&&Key", "Sword  &&\n   Key"],
        ["Count(Bomb) >= 3", "Bomb{3}", "Bomb{ 3 }"],
        ["NOT ^x", "!^x", "! ^x"],
        ["$f(1, 'A > B')", "$f(1,'A > B')", "$f( 1 , 'A > B' )"],
    ];
    for group in same {
        let first = debug(group[0])?;
        for text in &group[1..] {
            assert_eq!(debug(text)?, first, "{text:?} vs {:?}", group[0]);
        }
    }

    let different = [
        ("Sword && Key", "(Sword && Key)"),
        ("Sword && Key", "Key && Sword"),
        ("Bomb{3}", "Bomb{4}"),
        ("^x == 1", "^x == 1.0"),
        ("^x", "^x@^y"),
        ("hard_mode", "HARD_MODE"),
    ];
    for (a, b) in different {
        assert_ne!(debug(a)?, debug(b)?, "{a:?} vs {b:?}");
    }
    Ok(())
}

#[test]
fn debug_forms() -> Result<()> {
    for (text, want) in [
        (
            "^has_sword && Count(Bomb) >= 3",
            "AND[ Arg:^has_sword , Item:Bomb{3} ]",
        ),
        ("^unbound || TRUE", "OR[ Arg:^unbound , TRUE ]"),
        ("NOT hard_mode", "!Flag:hard_mode"),
        ("NOT (Sword)", "NOT[ ( Item:Sword ) ]"),
        (
            "^mode IN [\"walk\", \"swim\"]",
            "IN[ ^mode ; \"walk\", \"swim\" ]",
        ),
        ("^x@'Cave > Entry' > 2", "NUM[ ^x@'Cave > Entry' > 2 ]"),
        ("^energy & 6", "FLAG[ ^energy & 6 ]"),
        ("^item == Sword", "REFEQ[ ^item == Item:Sword ]"),
        (
            "PER Bomb { 1 => Sword, _ => FALSE }",
            "PER Item:Bomb{ 1 => Item:Sword ; _ => FALSE }",
        ),
        (
            "IF (^a) { TRUE } ELSE IF (^b) { FALSE } ELSE { Key }",
            "IF(Arg:^a)THEN{TRUE}ELSE IF(Arg:^b)THEN{FALSE}ELSE{Item:Key}",
        ),
        ("NOT WITHIN 'Town'", "!WITHIN[ 'Town' ]"),
        (
            "$max(MAX_ENERGY - 1, ^e) > 2.5",
            "NUM[ Call:max((Const:MAX_ENERGY - 1), ^e) > 2.5 ]",
        ),
    ] {
        assert_eq!(debug(text)?, want, "{text}");
    }
    Ok(())
}

#[test]
fn setting_value_and_flag_differ() -> Result<()> {
    let value = Expr::Setting("hard_mode".to_string());
    let flag = Expr::SettingFlag {
        name: "hard_mode".to_string(),
        negated: false,
    };
    assert_eq!(DebugWriter::render(&value)?, "Setting:hard_mode");
    assert_eq!(DebugWriter::render(&flag)?, "Flag:hard_mode");
    Ok(())
}

#[test]
fn debug_actions() -> Result<()> {
    let rule = RuleDef::parse_actions(
        "rules:act",
        "^energy += 5; SWAP(^a, ^b); IF (Sword) { $drop(Sword) } ELSE { ^mode = \"walk\" }",
    )?;
    assert_eq!(
        DebugWriter::new().body(&rule.body)?,
        "SEQ[ ALTER[ ^energy += 5 ] ; SWAP[ ^a , ^b ] ; IF(Item:Sword)THEN{CALL:drop(Item:Sword)}ELSE{SET[ ^mode = \"walk\" ]} ]"
    );
    Ok(())
}

#[test]
fn rust_expressions() -> Result<()> {
    for (text, want) in [
        (
            "Sword && Bomb{3}",
            "(ctx.has(Item::Sword) && ctx.count(Item::Bomb) >= 3)",
        ),
        ("hard_mode || NOT keysanity", "(world.hard_mode || !world.keysanity)"),
        ("^mode == \"swim\"", "ctx.mode() == enums::Mode::Swim"),
        ("^water", "data::water(ctx.position())"),
        ("^energy & 4", "(ctx.energy() & 4) == 4"),
        (
            "^save IN ['Cave > Entry > Door', 'Town > Square > Fountain']",
            "matches!(ctx.save(), SpotId::Cave__Entry__Door | SpotId::Town__Square__Fountain)",
        ),
        ("WITHIN 'Cave > Entry'", "ctx.within(AreaId::Cave__Entry)"),
        (
            "PER Bomb { 1 => TRUE, _ => FALSE }",
            "match ctx.count(Item::Bomb) { 1 => true, _ => false, }",
        ),
        (
            "PER logic { \"casual\" => TRUE, _ => Sword }",
            "match world.logic { enums::Logic::Casual => true, _ => ctx.has(Item::Sword), }",
        ),
        (
            "$visited('Cave > Entry > Door > Open')",
            "visited(ctx, LocationId::Cave__Entry__Door__Open)",
        ),
        (
            "IF (^water) { Sword } ELSE IF (hard_mode) { Key } ELSE { FALSE }",
            "if data::water(ctx.position()) { ctx.has(Item::Sword) } else if world.hard_mode { ctx.has(Item::Key) } else { false }",
        ),
        ("^energy >= MAX_ENERGY", "ctx.energy() >= MAX_ENERGY"),
        (
            "^depth@'Cave > Pool > Edge' > 1",
            "data::depth(SpotId::Cave__Pool__Edge) > 1",
        ),
    ] {
        assert_eq!(rust(text)?, want, "{text}");
    }
    Ok(())
}

#[test]
fn enum_settings_agree() -> Result<()> {
    assert_eq!(
        rust("logic == \"glitched\"")?,
        "world.logic == enums::Logic::Glitched"
    );
    assert_eq!(
        rust("PER logic { \"glitched\" => TRUE, _ => FALSE }")?,
        "match world.logic { enums::Logic::Glitched => true, _ => false, }"
    );
    // Only settings declared as enums become variants.
    assert_eq!(rust("hard_mode == \"x\"")?, "world.hard_mode == \"x\"");
    Ok(())
}

#[test]
fn rust_calls() -> Result<()> {
    let mut corpus = Corpus::new();
    corpus.add_rule(RuleDef::parse("rules:a", "$deep(2) && $b")?)?;
    corpus.add_rule(RuleDef::parse("rules:b", "Key")?)?;
    corpus.parse_helper("$deep(^n)", "^depth >= ^n")?;
    let accessors = AccessorTable::default();

    assert_eq!(
        rust_with(&corpus, "rules:a", &accessors)?,
        "(helper__deep(ctx, world, 2) && rule__b(ctx, world))"
    );
    assert_eq!(
        rust_with(&corpus, "helpers:deep", &accessors)?,
        "data::depth(ctx.position()) >= n"
    );
    Ok(())
}

#[test]
fn rust_actions() -> Result<()> {
    let mut corpus = Corpus::new();
    corpus.add_rule(RuleDef::parse_actions(
        "rules:act",
        "^energy += 5; ^mode = \"swim\"; $drop(Sword)",
    )?)?;
    corpus.add_rule(
        RuleDef::parse_actions("rules:swap", "SWAP(^s, ^energy)")?.with_local("s", "flags.sword"),
    )?;

    let accessors = AccessorTable::default();
    assert_eq!(
        rust_with(&corpus, "rules:act", &accessors)?,
        "ctx.set_energy(ctx.energy() + 5); ctx.set_mode(enums::Mode::Swim); helper__drop(ctx, world, ctx.has(Item::Sword));"
    );
    assert_eq!(
        rust_with(&corpus, "rules:swap", &accessors)?,
        "{ let tmp = ctx.flags_sword(); ctx.set_flags_sword(ctx.energy()); ctx.set_energy(tmp); }"
    );

    let mut custom = AccessorTable::default();
    custom
        .getters
        .insert("energy".to_string(), "ctx.energy_level()".to_string());
    custom
        .setters
        .insert("energy".to_string(), "ctx.store_energy".to_string());
    assert_eq!(
        rust_with(&corpus, "rules:act", &custom)?,
        "ctx.store_energy(ctx.energy_level() + 5); ctx.set_mode(enums::Mode::Swim); helper__drop(ctx, world, ctx.has(Item::Sword));"
    );
    Ok(())
}

#[test]
fn unrenderable_nodes() -> Result<()> {
    let float_case = rust("PER bomb_count { 1.5 => TRUE, _ => FALSE }").unwrap_err();
    assert!(matches!(
        float_case.downcast_ref::<InternalError>(),
        Some(InternalError::Unrenderable {
            node: "PerSettingSwitch",
            ..
        })
    ));

    let mut corpus = Corpus::new();
    corpus.add_rule(RuleDef::parse_actions(
        "rules:ro",
        "^water@'Cave > Pool > Edge' = TRUE",
    )?)?;
    let err = rust_with(&corpus, "rules:ro", &AccessorTable::default()).unwrap_err();
    assert!(err.to_string().contains("read-only"), "{err}");
    Ok(())
}

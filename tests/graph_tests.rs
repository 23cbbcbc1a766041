// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! End-to-end checks of the authoring and compile API

use serde_json::json;
use std::collections::BTreeMap;

use pipegraph::channel::{condition, decode_all, extract_recursive, Channel};
use pipegraph::pipeline::{
    compile, AuthoringContext, GroupSpec, LoopSpec, OneOf, Pipeline, PipelineOutput, TaskSpec,
    Topology,
};
use pipegraph::ErrorKind;

fn out(task: &str, ty: &str) -> Channel {
    Channel::create("out", ty, Some(task), None).unwrap()
}

/// Root with a flip task and one condition group per (group, task, type)
fn branches(layout: &[(&str, &str, &str)]) -> AuthoringContext {
    let mut ctx = AuthoringContext::new();
    ctx.begin_pipeline("Root").unwrap();
    ctx.add_task(TaskSpec::new("flip", "flip-coin").output("out", "String"))
        .unwrap();
    let coin = out("flip", "String");
    for (group, task, ty) in layout {
        let spec = GroupSpec::Condition(condition::eq(&coin, *group).unwrap());
        ctx.scoped(Some(*group), spec, |ctx| {
            ctx.add_task(TaskSpec::new(*task, "return").output("out", *ty))
        })
        .unwrap();
    }
    ctx
}

#[test]
fn round_trip_through_placeholder() {
    let channels = [
        Channel::create("x", "String", None, None).unwrap(),
        Channel::create("model", "Model", Some("train"), None).unwrap(),
        Channel::create("n", "Integer", Some("count"), None).unwrap(),
    ];
    for channel in channels {
        assert_eq!(decode_all(channel.encode()).unwrap(), vec![channel]);
    }
}

#[test]
fn decode_and_extract_deduplicate() {
    let a = out("t1", "String");
    let b = out("t2", "String");
    let text = format!("{a} and {b} and {a} again");
    assert_eq!(decode_all(&text).unwrap(), vec![a.clone(), b.clone()]);

    let mut args = BTreeMap::new();
    args.insert("first", json!(text));
    args.insert("nested", json!({"inner": [a.encode(), a.encode()]}));
    assert_eq!(extract_recursive(&args).unwrap(), vec![a, b]);
}

#[test]
fn extraction_is_idempotent_on_channels() {
    let channels = vec![out("t1", "String"), out("t2", "Integer")];
    let extracted = extract_recursive(&channels).unwrap();
    assert_eq!(extract_recursive(&extracted).unwrap(), channels);
}

#[test]
fn naming_grammar() {
    for good in ["a-b_c 1", "Task1"] {
        assert!(Channel::create(good, "String", None, None).is_ok(), "{good}");
    }
    for bad in ["1task", "task!", ""] {
        let err = Channel::create(bad, "String", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName, "{bad}");
    }
}

#[test]
fn variant_dispatch() {
    assert!(matches!(
        Channel::create("x", "String", None, None).unwrap(),
        Channel::Parameter(_)
    ));
    assert!(matches!(
        Channel::create("y", "Model", None, None).unwrap(),
        Channel::Artifact(_)
    ));
    let err = Channel::create("y", "Model", None, Some(json!("weights"))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn one_of_valid_case() {
    let mut ctx = branches(&[("c1", "t1", "String"), ("c2", "t2", "String")]);
    let id = ctx.one_of(vec![out("t1", "String"), out("t2", "String")]).unwrap();
    ctx.set_output("result", PipelineOutput::OneOf(id)).unwrap();
    let pipeline = ctx.finish().unwrap();

    let compiled = compile(&pipeline).unwrap();
    assert_eq!(compiled.one_ofs()[0].branch_tasks(), vec!["t1", "t2"]);
}

#[test]
fn one_of_same_condition_rejected() {
    let mut ctx = branches(&[]);
    let coin = out("flip", "String");
    ctx.scoped(
        Some("c1"),
        GroupSpec::Condition(condition::eq(&coin, "heads").unwrap()),
        |ctx| {
            ctx.add_task(TaskSpec::new("t1", "return").output("out", "String"))?;
            ctx.add_task(TaskSpec::new("t2", "return").output("out", "String"))
        },
    )
    .unwrap();
    ctx.one_of(vec![out("t1", "String"), out("t2", "String")])
        .unwrap();
    let pipeline = ctx.finish().unwrap();

    let err = compile(&pipeline).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NonExclusiveBranches);
}

#[test]
fn one_of_loop_rejected() {
    let mut ctx = branches(&[("c2", "t2", "String")]);
    let coin = out("flip", "String");
    ctx.scoped(
        Some("c1"),
        GroupSpec::Condition(condition::ne(&coin, "c2").unwrap()),
        |ctx| {
            ctx.scoped(
                None,
                GroupSpec::ParallelFor(LoopSpec::over_values(vec![json!(1), json!(2)])),
                |ctx| ctx.add_task(TaskSpec::new("t1", "return").output("out", "String")),
            )
        },
    )
    .unwrap();
    ctx.one_of(vec![out("t1", "String"), out("t2", "String")])
        .unwrap();
    let pipeline = ctx.finish().unwrap();

    let err = compile(&pipeline).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoopNotAllowed);
}

#[test]
fn one_of_type_mismatch_before_topology() {
    // neither task exists; the type check still fires first
    let err = OneOf::new(vec![out("t1", "String"), out("t2", "Integer")]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);

    let mut ctx = branches(&[("c1", "t1", "String"), ("c2", "t2", "Integer")]);
    let err = ctx
        .one_of(vec![out("t1", "String"), out("t2", "Integer")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn one_of_types_come_from_declared_outputs() {
    let mut ctx = branches(&[("c1", "t1", "Integer"), ("c2", "t2", "String")]);
    // both references claim String; t1 really produces an Integer
    ctx.one_of(vec![out("t1", "String"), out("t2", "String")])
        .unwrap();
    let pipeline = ctx.finish().unwrap();

    let err = compile(&pipeline).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn topology_parent_groups() {
    let pipeline: Pipeline = branches(&[("c1", "t1", "String")]).finish().unwrap();
    let topology = Topology::resolve(&pipeline);
    assert_eq!(topology.parent_groups_of("t1").unwrap(), &["c1", "Root"]);
    assert_eq!(topology.parent_groups_of("flip").unwrap(), &["Root"]);
}

#[test]
fn authoring_errors_are_typed() {
    let mut ctx = AuthoringContext::new();
    assert_eq!(
        ctx.exit_group().unwrap_err().kind(),
        ErrorKind::NoActiveScope
    );
    ctx.begin_pipeline("Root").unwrap();
    ctx.enter_group(None, GroupSpec::ParallelFor(LoopSpec::over_values(vec![])))
        .unwrap();
    assert_eq!(ctx.finish().unwrap_err().kind(), ErrorKind::UnclosedGroup);
}

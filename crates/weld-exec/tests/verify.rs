use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use weld_dag::Plan;
use weld_exec::Verifier;
use weld_model::{CurrentState, Document, Settings, Step, StepKind};
use weld_plugin::PluginContext;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn step(id: &str, kind: StepKind, deps: &[&str], payload: serde_json::Value) -> Step {
    Step {
        id: id.to_string(),
        kind,
        name: None,
        depends_on: deps.iter().map(|s| s.to_string()).collect(),
        enabled: true,
        verify_timeout_seconds: None,
        payload,
    }
}

fn doc(steps: Vec<Step>) -> Document {
    Document {
        version: "1.0.0".into(),
        name: "t".into(),
        description: None,
        settings: Settings::default(),
        steps,
        validations: None,
    }
}

#[test]
fn converged_document_reports_satisfied() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("a.src"), "hi").unwrap();
    std::fs::write(tmp.path().join("a.dest"), "hi").unwrap();

    let d = doc(vec![step("copy_a", StepKind::Copy, &[], json!({"src": "a.src", "dest": "a.dest"}))]);
    let plan = Plan::build(&d).unwrap();
    let registry = weld_plugins::registry();
    let ctx = PluginContext::new(tmp.path(), false);

    let outcome = Verifier::new(&registry)
        .verify(&d, &plan, &ctx, &CancellationToken::new(), DEFAULT_TIMEOUT)
        .unwrap();
    assert!(outcome.error.is_none());
    assert!(outcome.summary.is_converged());
}

#[test]
fn drifted_step_blocks_its_dependents() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("a.src"), "new").unwrap();
    std::fs::write(tmp.path().join("a.dest"), "old").unwrap();

    let d = doc(vec![
        step("copy_a", StepKind::Copy, &[], json!({"src": "a.src", "dest": "a.dest"})),
        step("copy_b", StepKind::Copy, &["copy_a"], json!({"src": "a.dest", "dest": "b.dest"})),
    ]);
    let plan = Plan::build(&d).unwrap();
    let registry = weld_plugins::registry();
    let ctx = PluginContext::new(tmp.path(), false);

    let outcome = Verifier::new(&registry)
        .verify(&d, &plan, &ctx, &CancellationToken::new(), DEFAULT_TIMEOUT)
        .unwrap();
    assert!(!outcome.summary.is_converged());

    let dependent = outcome.summary.results.iter().find(|r| r.step_id == "copy_b").unwrap();
    assert_eq!(dependent.status, CurrentState::Blocked);
    assert!(dependent.message.contains("dependencies not satisfied"));
    assert!(dependent.message.contains("copy_a (drifted)"));
}

#[test]
fn missing_plugin_is_blocked_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let d = doc(vec![step("pkg", StepKind::Package, &[], json!({"name": "curl"}))]);
    let plan = Plan::build(&d).unwrap();
    let registry = weld_plugin::Registry::new();
    let ctx = PluginContext::new(tmp.path(), false);

    let outcome = Verifier::new(&registry)
        .verify(&d, &plan, &ctx, &CancellationToken::new(), DEFAULT_TIMEOUT)
        .unwrap();
    assert!(outcome.error.is_none());
    assert_eq!(outcome.summary.results[0].status, CurrentState::Blocked);
}

#[test]
fn unsatisfied_dependency_enumerates_status_in_message() {
    let tmp = TempDir::new().unwrap();

    let d = doc(vec![
        step("provision", StepKind::Copy, &[], json!({"src": "missing.src", "dest": "out"})),
        step("deploy", StepKind::Copy, &["provision"], json!({"src": "out", "dest": "out2"})),
    ]);
    let plan = Plan::build(&d).unwrap();
    let registry = weld_plugins::registry();
    let ctx = PluginContext::new(tmp.path(), false);

    let outcome = Verifier::new(&registry)
        .verify(&d, &plan, &ctx, &CancellationToken::new(), DEFAULT_TIMEOUT)
        .unwrap();

    let provision = outcome.summary.results.iter().find(|r| r.step_id == "provision").unwrap();
    assert_eq!(provision.status, CurrentState::Missing);

    let deploy = outcome.summary.results.iter().find(|r| r.step_id == "deploy").unwrap();
    assert_eq!(deploy.status, CurrentState::Blocked);
    assert!(deploy.message.contains("dependencies not satisfied"));
    assert!(deploy.message.contains("provision (missing)"));
    assert_eq!(outcome.summary.missing, 1);
    assert_eq!(outcome.summary.blocked, 1);
}

#[test]
fn pre_cancelled_token_aborts_before_any_step_runs() {
    let tmp = TempDir::new().unwrap();
    let d = doc(vec![step("copy_a", StepKind::Copy, &[], json!({"src": "a.src", "dest": "a.dest"}))]);
    let plan = Plan::build(&d).unwrap();
    let registry = weld_plugins::registry();
    let ctx = PluginContext::new(tmp.path(), false);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = Verifier::new(&registry).verify(&d, &plan, &ctx, &cancel, DEFAULT_TIMEOUT).unwrap();
    assert!(outcome.error.is_some());
    assert!(outcome.summary.results.is_empty());
}

#[test]
fn invalid_payload_during_evaluate_is_fatal() {
    let tmp = TempDir::new().unwrap();
    // `template` requires `source`/`destination`; an empty payload fails to
    // decode inside `evaluate`, which is a validation-class error.
    let d = doc(vec![step("tpl", StepKind::Template, &[], json!({}))]);
    let plan = Plan::build(&d).unwrap();
    let registry = weld_plugins::registry();
    let ctx = PluginContext::new(tmp.path(), false);

    let outcome = Verifier::new(&registry)
        .verify(&d, &plan, &ctx, &CancellationToken::new(), DEFAULT_TIMEOUT)
        .unwrap();
    assert!(outcome.error.is_some());
}

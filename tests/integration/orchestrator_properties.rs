//! Behavioral properties of the orchestrator across repeated runs

use crate::integration::test_utils::{reasons, serial, Fixture, ScriptedGenerator};
use kiln::cleaner::Cleaner;
use kiln::context::RawMetadata;
use kiln::generator::{Generator, RenderError};
use kiln::grouping::GroupingPolicy;
use kiln::orchestrator::{
    CancellationToken, InvocationOptions, InvocationRequest, Orchestrator, UnitState,
};
use kiln::staleness::InvocationReason;
use kiln::store::ContextStore;
use kiln::{GroupKey, InvocationContext};
use serde_json::json;
use std::fs;
use std::sync::Arc;

fn metadata(flavor: &str) -> RawMetadata {
    RawMetadata::new()
        .with("flavor", json!(flavor))
        .with("context", json!({"name": "kiln"}))
}

#[test]
fn test_idempotence() {
    let fx = Fixture::new();
    let inputs = vec![fx.write_input("a.tmpl", "A"), fx.write_input("b.tmpl", "B")];
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));

    let first = fx.run(&generator, &inputs, metadata("x"), serial());
    assert!(first.is_success());
    assert_eq!(first.generated(), 2);
    assert_eq!(generator.calls(), 2);

    let second = fx.run(&generator, &inputs, metadata("x"), serial());
    assert!(second.is_success());
    assert_eq!(second.up_to_date(), 2);
    assert_eq!(
        reasons(&second),
        vec![Some(InvocationReason::UpToDate), Some(InvocationReason::UpToDate)]
    );
    assert_eq!(generator.calls(), 2);
}

#[test]
fn test_change_sensitivity_only_touches_changed_item() {
    let fx = Fixture::new();
    let inputs = vec![
        fx.write_input("a.tmpl", "A"),
        fx.write_input("b.tmpl", "B"),
        fx.write_input("c.tmpl", "C"),
    ];
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));
    fx.run(&generator, &inputs, metadata("x"), serial());

    fx.write_input("b.tmpl", "B changed");
    let report = fx.run(&generator, &inputs, metadata("x"), serial());
    assert_eq!(
        reasons(&report),
        vec![
            Some(InvocationReason::UpToDate),
            Some(InvocationReason::InputChanged),
            Some(InvocationReason::UpToDate),
        ]
    );
    assert_eq!(generator.calls(), 4);
    let body = fs::read_to_string(fx.output("b.tmpl")).unwrap();
    assert!(body.starts_with("B changed|"));
}

#[test]
fn test_force_regenerates_everything() {
    let fx = Fixture::new();
    let inputs = vec![fx.write_input("a.tmpl", "A"), fx.write_input("b.tmpl", "B")];
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));
    fx.run(&generator, &inputs, metadata("x"), serial());

    let forced = fx.run(
        &generator,
        &inputs,
        metadata("x"),
        InvocationOptions {
            force: true,
            ..serial()
        },
    );
    assert_eq!(
        reasons(&forced),
        vec![Some(InvocationReason::Forced), Some(InvocationReason::Forced)]
    );
    assert_eq!(forced.generated(), 2);
    assert_eq!(generator.calls(), 4);
}

#[test]
fn test_clean_restores_virgin_state() {
    let fx = Fixture::new();
    let inputs = vec![fx.write_input("a.tmpl", "A"), fx.write_input("b.tmpl", "B")];
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));
    fx.run(&generator, &inputs, metadata("x"), serial());
    assert_eq!(fx.store.len(), 2);

    let store: Arc<dyn ContextStore> = fx.store.clone();
    let cleaned = Cleaner::new(store).clean(&[fx.out_root()]).unwrap();
    assert_eq!(cleaned.removed_entries.len(), 2);
    assert!(fx.store.is_empty());
    assert!(!fx.output("a.tmpl").exists());

    let rerun = fx.run(&generator, &inputs, metadata("x"), serial());
    assert_eq!(
        reasons(&rerun),
        vec![Some(InvocationReason::NewOutput), Some(InvocationReason::NewOutput)]
    );
    assert_eq!(fx.store.len(), 2);
}

#[test]
fn test_per_item_failure_isolation() {
    let fx = Fixture::new();
    let inputs = vec![fx.write_input("a.tmpl", "A"), fx.write_input("b.tmpl", "B")];
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));
    generator.fail_on("b.tmpl");

    let first = fx.run(&generator, &inputs, metadata("x"), serial());
    assert!(!first.is_success());
    assert_eq!(first.exit_code(), 1);
    assert_eq!(first.outcomes[0].state, UnitState::Succeeded);
    assert_eq!(first.outcomes[1].state, UnitState::Failed);
    assert!(first.outcomes[1]
        .error
        .as_ref()
        .map(|e| e.is_render_failure())
        .unwrap_or(false));
    assert!(fx.output("a.tmpl").exists());
    assert!(!fx.output("b.tmpl").exists());
    assert_eq!(fx.store.len(), 1);

    generator.stop_failing("b.tmpl");
    let second = fx.run(&generator, &inputs, metadata("x"), serial());
    assert!(second.is_success());
    assert_eq!(
        reasons(&second),
        vec![Some(InvocationReason::UpToDate), Some(InvocationReason::NewOutput)]
    );
    // Only B was re-invoked
    assert_eq!(generator.calls(), 3);
}

#[test]
fn test_atomic_all_or_nothing() {
    let fx = Fixture::new();
    let inputs = vec![fx.write_input("a.tmpl", "A"), fx.write_input("b.tmpl", "B")];
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::Atomic));
    generator.fail_on("b.tmpl");

    let failed = fx.run(&generator, &inputs, metadata("x"), serial());
    assert_eq!(failed.outcomes.len(), 1);
    assert_eq!(failed.outcomes[0].state, UnitState::Failed);
    assert!(!fx.output("a.tmpl").exists());
    assert!(!fx.output("b.tmpl").exists());
    assert!(fx.store.is_empty());

    generator.stop_failing("b.tmpl");
    let ok = fx.run(&generator, &inputs, metadata("x"), serial());
    assert!(ok.is_success());
    assert_eq!(ok.outcomes[0].outputs.len(), 2);
    assert!(fx.output("a.tmpl").exists());
    assert!(fx.output("b.tmpl").exists());
    assert_eq!(fx.store.len(), 1);
}

#[test]
fn test_atomic_input_order_is_significant() {
    let fx = Fixture::new();
    let a = fx.write_input("a.tmpl", "A");
    let b = fx.write_input("b.tmpl", "B");
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::Atomic));
    fx.run(&generator, &[a.clone(), b.clone()], metadata("x"), serial());

    // Reversed inputs also reverse outputs, so this is a different group
    let reversed = fx.run(&generator, &[b, a], metadata("x"), serial());
    assert_eq!(reasons(&reversed), vec![Some(InvocationReason::NewOutput)]);
}

#[test]
fn test_metadata_only_change() {
    let fx = Fixture::new();
    let inputs = vec![fx.write_input("a.tmpl", "A")];
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));
    fx.run(&generator, &inputs, metadata("vanilla"), serial());

    let changed = fx.run(&generator, &inputs, metadata("chocolate"), serial());
    assert_eq!(reasons(&changed), vec![Some(InvocationReason::MetadataChanged)]);
    assert_eq!(generator.calls(), 2);
}

#[test]
fn test_float_metadata_stays_up_to_date() {
    let fx = Fixture::new();
    let inputs = vec![fx.write_input("a.tmpl", "A")];
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));
    let scaled = || RawMetadata::new().with("scale", json!(1.0715660391465826e-75));

    let first = fx.run(&generator, &inputs, scaled(), serial());
    assert_eq!(reasons(&first), vec![Some(InvocationReason::NewOutput)]);
    for _ in 0..2 {
        let again = fx.run(&generator, &inputs, scaled(), serial());
        assert_eq!(reasons(&again), vec![Some(InvocationReason::UpToDate)]);
    }
    assert_eq!(generator.calls(), 1);
}

#[cfg(unix)]
#[test]
fn test_non_utf8_input_name_generates_and_stays_fresh() {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    let fx = Fixture::new();
    let name = OsString::from_vec(b"bad\xffname.tmpl".to_vec());
    let input = fx.root().join("templates").join(&name);
    fs::create_dir_all(input.parent().unwrap()).unwrap();
    fs::write(&input, "A").unwrap();
    let inputs = vec![input];
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));

    let first = fx.run(&generator, &inputs, metadata("x"), serial());
    assert_eq!(first.outcomes[0].state, UnitState::Succeeded, "{:?}", first.outcomes[0].error);
    let output = fx.out_root().join(OsString::from_vec(b"bad\xffname".to_vec()));
    assert!(output.exists());

    let second = fx.run(&generator, &inputs, metadata("x"), serial());
    assert_eq!(reasons(&second), vec![Some(InvocationReason::UpToDate)]);
    assert_eq!(generator.calls(), 1);
}

#[test]
fn test_metadata_change_excluded_by_comparator() {
    let fx = Fixture::new();
    let inputs = vec![fx.write_input("a.tmpl", "A")];
    let generator =
        Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem).ignoring_keys(&["flavor"]));
    fx.run(&generator, &inputs, metadata("vanilla"), serial());

    let report = fx.run(&generator, &inputs, metadata("chocolate"), serial());
    assert_eq!(reasons(&report), vec![Some(InvocationReason::UpToDate)]);
    assert_eq!(generator.calls(), 1);
}

#[test]
fn test_missing_input_fails_only_its_unit() {
    let fx = Fixture::new();
    let a = fx.write_input("a.tmpl", "A");
    let missing = fx.root().join("templates").join("missing.tmpl");
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));

    let report = fx.run(&generator, &[a, missing], metadata("x"), serial());
    assert_eq!(report.outcomes[0].state, UnitState::Succeeded);
    assert_eq!(report.outcomes[1].state, UnitState::Failed);
    assert_eq!(
        report.outcomes[1].error.as_ref().map(|e| e.kind()),
        Some("input-unreadable")
    );
    assert_eq!(generator.calls(), 1);
}

#[test]
fn test_corrupt_entry_reads_as_new_output() {
    let fx = Fixture::new();
    let inputs = vec![fx.write_input("a.tmpl", "A")];
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));
    let first = fx.run(&generator, &inputs, metadata("x"), serial());
    let key: GroupKey = first.outcomes[0].group_key.clone();

    fx.store.insert_raw(&key, b"\x00garbage");
    let report = fx.run(&generator, &inputs, metadata("x"), serial());
    assert!(report.is_success());
    assert_eq!(reasons(&report), vec![Some(InvocationReason::NewOutput)]);
    assert!(fx.store.load(&key).unwrap().is_some());
}

#[test]
fn test_parallel_run_matches_serial_outcomes() {
    let fx = Fixture::new();
    let inputs: Vec<_> = (0..16)
        .map(|i| fx.write_input(&format!("f{:02}.tmpl", i), &format!("body {}", i)))
        .collect();
    let generator = Arc::new(ScriptedGenerator::new(GroupingPolicy::PerItem));
    generator.fail_on("f07.tmpl");

    let report = fx.run(
        &generator,
        &inputs,
        metadata("x"),
        InvocationOptions {
            parallel: true,
            max_threads: 4,
            ..InvocationOptions::default()
        },
    );
    assert_eq!(report.generated(), 15);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.outcomes[7].state, UnitState::Failed);
    assert_eq!(fx.store.len(), 15);
}

/// Cancels the shared token during its first render.
struct CancellingGenerator {
    token: CancellationToken,
}

impl Generator for CancellingGenerator {
    fn name(&self) -> &str {
        "cancelling"
    }

    fn grouping_policy(&self) -> GroupingPolicy {
        GroupingPolicy::PerItem
    }

    fn render(&self, context: &InvocationContext) -> Result<Vec<Vec<u8>>, RenderError> {
        self.token.cancel();
        Ok(context.outputs().iter().map(|_| b"done".to_vec()).collect())
    }
}

#[test]
fn test_cancellation_lets_in_flight_unit_finish() {
    let fx = Fixture::new();
    let inputs = vec![
        fx.write_input("a.tmpl", "A"),
        fx.write_input("b.tmpl", "B"),
        fx.write_input("c.tmpl", "C"),
    ];
    let token = CancellationToken::new();
    let generator = Arc::new(CancellingGenerator {
        token: token.clone(),
    });
    let store: Arc<dyn ContextStore> = fx.store.clone();

    let report = Orchestrator::new(generator, store)
        .with_options(serial())
        .with_cancellation(token)
        .run(&InvocationRequest {
            inputs,
            naming: fx.naming(),
            metadata: RawMetadata::new(),
        })
        .unwrap();
    assert_eq!(report.outcomes[0].state, UnitState::Succeeded);
    assert_eq!(report.cancelled(), 2);
    assert!(!report.is_success());
    assert_eq!(fx.store.len(), 1);
}

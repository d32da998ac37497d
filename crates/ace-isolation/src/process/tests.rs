//! Tests that spawn real children through `/bin/sh`.

use std::thread;

use rstest::rstest;
use serde_json::{Value, json};

use super::*;

fn shell(script: &str) -> ProcessIsolator {
    ProcessIsolator::new(WorkerCommand::new("/bin/sh").arg("-c").arg(script))
}

const ECHO_WORKER: &str =
    r#"read line; printf '{"outcome":"completed","value":%s}\n' "$line""#;

#[test]
fn returns_completed_value() {
    let isolator = shell(r#"read line; echo '{"outcome":"completed","value":42}'"#);
    let value: u64 = isolator.isolate(&json!({})).expect("isolate");
    assert_eq!(value, 42);
}

#[test]
fn child_receives_serialised_work() {
    let work = json!({"node": "fw.example.net", "parameters": {"message": "Hello!"}});
    let echoed: Value = shell(ECHO_WORKER).isolate(&work).expect("isolate");
    assert_eq!(echoed, work);
}

#[test]
fn stderr_noise_does_not_disturb_outcome() {
    let isolator = shell(
        r#"read line; i=0; while [ $i -lt 2000 ]; do echo "debug line $i" >&2; i=$((i+1)); done; echo '{"outcome":"completed","value":"ok"}'"#,
    );
    let value: String = isolator.isolate(&json!(null)).expect("isolate");
    assert_eq!(value, "ok");
}

#[test]
fn reported_fault_becomes_typed_error() {
    let isolator =
        shell(r#"read line; echo '{"outcome":"faulted","class":"panic","message":"driver exploded"}'"#);
    let error = isolator
        .isolate::<_, Value>(&json!({}))
        .expect_err("fault");
    assert!(
        matches!(&error, IsolationError::Faulted { class, message } if class == "panic" && message == "driver exploded"),
        "{error:?}"
    );
}

#[rstest]
#[case::exit_code("read line; exit 3", IsolationError::AbnormalExit { code: 3 })]
#[case::killed("kill -9 $$", IsolationError::Signalled { signal: 9 })]
#[case::segfault_style("read line; kill -11 $$", IsolationError::Signalled { signal: 11 })]
fn abnormal_termination_is_contained(#[case] script: &str, #[case] expected: IsolationError) {
    let error = shell(script)
        .isolate::<_, Value>(&json!({"large": "x".repeat(256 * 1024)}))
        .expect_err("abnormal termination");
    assert_eq!(error.to_string(), expected.to_string());
    assert!(error.is_abnormal_termination());
}

#[test]
fn silent_child_reports_no_output() {
    let error = shell("read line; exit 0")
        .isolate::<_, Value>(&json!({}))
        .expect_err("no output");
    assert!(matches!(error, IsolationError::NoOutput), "{error:?}");
}

#[test]
fn garbage_output_is_rejected() {
    let error = shell("read line; echo nonsense")
        .isolate::<_, Value>(&json!({}))
        .expect_err("invalid output");
    assert!(matches!(error, IsolationError::InvalidOutput { .. }), "{error:?}");
}

#[test]
fn missing_program_fails_to_spawn() {
    let isolator = ProcessIsolator::new(WorkerCommand::new("/nonexistent/ace-worker"));
    let error = isolator
        .isolate::<_, Value>(&json!({}))
        .expect_err("spawn failure");
    assert!(matches!(error, IsolationError::Spawn { .. }), "{error:?}");
}

#[test]
fn environment_is_passed_to_child() {
    let isolator = ProcessIsolator::new(
        WorkerCommand::new("/bin/sh")
            .arg("-c")
            .arg(r#"read line; printf '{"outcome":"completed","value":"%s"}\n' "$ACE_MARKER""#)
            .env("ACE_MARKER", "isolated"),
    );
    let value: String = isolator.isolate(&json!({})).expect("isolate");
    assert_eq!(value, "isolated");
}

#[test]
fn concurrent_calls_use_independent_children() {
    let isolator = shell(ECHO_WORKER);
    let handles: Vec<_> = (0..4)
        .map(|index| {
            let worker = isolator.clone();
            thread::spawn(move || worker.isolate::<_, Value>(&json!({ "index": index })))
        })
        .collect();

    for (index, handle) in handles.into_iter().enumerate() {
        let value = handle.join().expect("join").expect("isolate");
        assert_eq!(value, json!({ "index": index }));
    }
}

//! Tests for the request pipeline flows.

use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;

use super::*;
use crate::tests::support::{CertnameCompiler, StubSource, UnreachableSource, staged_pipeline};

struct Harness {
    _dir: TempDir,
    compiler: CertnameCompiler,
    pipeline: Pipeline,
}

#[fixture]
fn harness() -> Harness {
    let dir = TempDir::new().expect("temp dir");
    let compiler = CertnameCompiler::default();
    let pipeline = staged_pipeline(&dir, compiler.clone(), StubSource);
    Harness {
        _dir: dir,
        compiler,
        pipeline,
    }
}

fn body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).expect("body serialises")
}

fn task_request(task: &str) -> Value {
    json!({
        "target": {
            "remote-transport": "panos",
            "host": "fw.example.net",
            "user": "admin",
            "password": "secret",
        },
        "task": {
            "name": task,
            "metadata": {},
            "files": [{
                "filename": "echo.sh",
                "sha256": "ec9ce4f0d6e4f6b2f1e7d52b6e3ac0f3b4a2f2d3b0f4c7e1d9a8b7c6d5e4f3a2",
                "uri": {"path": "/tasks/sample/echo.sh", "params": {"environment": "production"}},
            }],
        },
        "parameters": {"message": "Hello!"},
    })
}

fn catalog_request(certname: &str) -> Value {
    json!({
        "target": {
            "remote-transport": "panos",
            "host": "fw.example.net",
            "user": "admin",
            "password": "secret",
        },
        "compiler": {
            "certname": certname,
            "environment": "production",
            "transaction_uuid": "2d931510-d99f-494a-8c67-87feb05e1594",
            "job_id": "1",
        },
    })
}

fn error_kind(reply: &Reply) -> Option<&str> {
    reply.json()?.pointer("/_error/kind")?.as_str()
}

#[rstest]
#[case(b"{".as_slice())]
#[case(b"not json".as_slice())]
#[case(b"".as_slice())]
#[case(b"{\"target\":}".as_slice())]
fn unparsable_bodies_are_request_exceptions(harness: Harness, #[case] raw: &[u8]) {
    for reply in [
        harness.pipeline.run_task(raw),
        harness.pipeline.execute_catalog(raw),
    ] {
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(error_kind(&reply), Some("request_exception"));
        let details = reply.json().and_then(|json| json.pointer("/_error/details"));
        let details = details.expect("details present");
        assert!(details.get("line").is_some());
        assert!(details.get("class").is_some());
        assert!(details.get("stack_trace").is_none());
    }
}

#[rstest]
#[case(json!({}))]
#[case(json!([]))]
#[case(json!({"target": {"host": "fw.example.net"}}))]
#[case(json!({"target": "fw.example.net", "task": {"name": "sample::echo"}}))]
fn invalid_task_bodies_are_schema_errors(harness: Harness, #[case] request: Value) {
    let reply = harness.pipeline.run_task(&body(&request));
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&reply), Some("schema-error"));
    let details = reply
        .json()
        .and_then(|json| json.pointer("/_error/details"))
        .and_then(Value::as_array)
        .expect("violations listed");
    assert!(!details.is_empty());
}

#[rstest]
#[case(json!({}))]
#[case(json!({"target": {"remote-transport": "panos"}}))]
#[case(json!({"target": {"remote-transport": "panos"}, "compiler": {"certname": "fw"}}))]
fn invalid_catalog_bodies_are_schema_errors(harness: Harness, #[case] request: Value) {
    let reply = harness.pipeline.execute_catalog(&body(&request));
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&reply), Some("schema-error"));
    assert!(harness.compiler.seen().is_empty());
}

#[test]
fn task_violations_are_listed_in_schema_order() {
    let violations = validate_run_task(&json!({
        "target": {"host": 7},
        "task": {"files": [{"filename": "echo.sh"}]},
        "parameters": [],
    }))
    .expect_err("body is invalid");
    assert_eq!(
        violations.violations(),
        [
            "The property '#/target' did not contain a required property of 'remote-transport'",
            "The property '#/target/host' of type integer did not match the following type: string",
            "The property '#/task' did not contain a required property of 'name'",
            "The property '#/task/files/0' did not contain a required property of 'sha256'",
            "The property '#/parameters' of type array did not match the following type: object",
        ]
    );
}

#[test]
fn catalog_violations_name_every_missing_compiler_field() {
    let violations = validate_execute_catalog(&json!({
        "target": {"remote-transport": "panos"},
        "compiler": {"certname": "fw.example.net", "job_id": 1},
    }))
    .expect_err("body is invalid");
    assert_eq!(
        violations.violations(),
        [
            "The property '#/compiler' did not contain a required property of 'environment'",
            "The property '#/compiler' did not contain a required property of 'transaction_uuid'",
            "The property '#/compiler/job_id' of type integer did not match the following type: string",
        ]
    );
}

#[rstest]
fn echo_task_returns_the_executor_result(harness: Harness) {
    let reply = harness.pipeline.run_task(&body(&task_request("sample::echo")));
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        Some(&json!({
            "node": "fw.example.net",
            "status": "success",
            "result": {"output": "Hello!"},
        }))
    );
}

#[rstest]
fn task_name_falls_back_to_the_target_name(harness: Harness) {
    let mut request = task_request("sample::echo");
    let target = request
        .get_mut("target")
        .and_then(Value::as_object_mut)
        .expect("target object");
    target.remove("host");
    target.insert("name".to_owned(), json!("fw-by-name"));

    let reply = harness.pipeline.run_task(&body(&request));
    assert_eq!(
        reply.json().and_then(|json| json.get("node")),
        Some(&json!("fw-by-name"))
    );
}

#[rstest]
fn remote_task_failures_are_scrubbed_and_still_200(harness: Harness) {
    let reply = harness.pipeline.run_task(&body(&task_request("sample::fail")));
    assert_eq!(reply.status, StatusCode::OK);
    let payload = reply.json().expect("json body");
    assert_eq!(payload.get("status"), Some(&json!("failure")));
    assert_eq!(
        payload.pointer("/result/_error/details"),
        Some(&json!({"exitcode": 1}))
    );
    assert_eq!(
        payload.pointer("/result/_error/msg"),
        Some(&json!("The task failed with exit code 1"))
    );
}

#[rstest]
fn executor_errors_become_failure_results(harness: Harness) {
    let reply = harness.pipeline.run_task(&body(&task_request("sample::lost")));
    assert_eq!(reply.status, StatusCode::OK);
    let payload = reply.json().expect("json body");
    assert_eq!(payload.get("node"), Some(&json!("fw.example.net")));
    assert_eq!(payload.get("status"), Some(&json!("failure")));
    assert_eq!(
        payload.pointer("/result/_error/kind"),
        Some(&json!("execution_failed"))
    );
}

#[rstest]
fn successful_catalog_runs_reply_with_an_empty_object(harness: Harness) {
    let reply = harness
        .pipeline
        .execute_catalog(&body(&catalog_request("fw.example.net")));
    assert_eq!(reply, Reply::ok(json!({})));
}

#[rstest]
#[case("fail.example.net", "compile_failed", "catalog compile failed")]
#[case("credentials.example.net", "target_spec", "target specification invalid")]
#[case("reports.example.net", "reporting_failed", "report submission failed")]
fn catalog_failures_use_canned_envelopes(
    harness: Harness,
    #[case] certname: &str,
    #[case] kind: &str,
    #[case] msg: &str,
) {
    let reply = harness.pipeline.execute_catalog(&body(&catalog_request(certname)));
    assert_eq!(
        reply,
        Reply::ok(json!({
            "_error": {"msg": msg, "kind": kind, "details": "upstream api errors go here"},
        }))
    );
}

#[rstest]
fn compiler_runs_against_a_private_snapshot_with_trusted_facts(harness: Harness) {
    let reply = harness
        .pipeline
        .execute_catalog(&body(&catalog_request("fw.example.net")));
    assert_eq!(reply.status, StatusCode::OK);

    let seen = harness.compiler.seen();
    let [settings] = seen.as_slice() else {
        panic!("expected one compile, got {}", seen.len());
    };
    assert_eq!(settings.environment, "production");
    assert_eq!(settings.job_id, "1");
    assert_eq!(settings.trusted_facts.hostname, "fw");
    assert_eq!(settings.trusted_facts.domain.as_deref(), Some("example.net"));
    assert_eq!(
        settings.server_uri.as_deref(),
        Some("https://puppet.example.net:8140")
    );
    assert!(settings.libdir.ends_with("plugins"));
    assert!(
        settings
            .libdir
            .join(crate::tests::support::STAGED_FILE)
            .is_file()
    );
}

#[rstest]
fn unresolvable_targets_still_compile(harness: Harness) {
    let mut request = catalog_request("fw.example.net");
    request
        .get_mut("target")
        .and_then(Value::as_object_mut)
        .expect("target object")
        .insert("uri".to_owned(), json!("£$ %^%£$@ ^£@£"));

    let reply = harness.pipeline.execute_catalog(&body(&request));
    assert_eq!(reply, Reply::ok(json!({})));
    assert_eq!(harness.compiler.seen().len(), 1);
}

#[test]
fn sync_faults_are_reported_as_compile_failures() {
    let dir = TempDir::new().expect("temp dir");
    let compiler = CertnameCompiler::default();
    let pipeline = staged_pipeline(&dir, compiler.clone(), UnreachableSource);

    let reply = pipeline.execute_catalog(&body(&catalog_request("fw.example.net")));
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(error_kind(&reply), Some("compile_failed"));
    assert!(compiler.seen().is_empty());
}

#[rstest]
fn check_and_liveness_replies(harness: Harness) {
    assert_eq!(harness.pipeline.check().body, ReplyBody::Text("OK"));
    assert_eq!(harness.pipeline.liveness().status, StatusCode::OK);
}

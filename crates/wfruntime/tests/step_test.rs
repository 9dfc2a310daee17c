mod common;

use common::{approval_step, failing_step, init_tracing, recording_step, ExecutionLog};
use std::sync::Arc;
use wfruntime::{
    Context, Data, FlowError, Layout, Runnable, State, Status, Step, StepError, Value,
};

#[test]
fn test_step_runs_handler_once() {
    init_tracing();
    let log = ExecutionLog::default();
    let mut step = recording_step("a", &log);
    assert!(step.is_waiting());

    let mut ctx = Context::new();
    let mut data = Data::new();
    step.run(&mut ctx, &mut data).unwrap();

    assert!(step.is_completed());
    assert_eq!(log.entries(), vec!["a"]);
    assert_eq!(data.get("a"), Some(&Value::Bool(true)));

    let state = step.state().snapshot();
    assert_eq!(state.completed_steps(), ["a".to_string()]);
    assert_eq!(state.current_step_id(), "a");
    assert_eq!(state.data().get("a"), Some(&Value::Bool(true)));
}

#[test]
fn test_step_rerun_starts_fresh() {
    let log = ExecutionLog::default();
    let mut step = recording_step("a", &log);
    let mut data = Data::new();

    step.run(&mut Context::new(), &mut data).unwrap();
    step.run(&mut Context::new(), &mut data).unwrap();

    assert_eq!(log.count("a"), 2);
    assert_eq!(step.state().completed_steps().len(), 1);
}

#[test]
fn test_step_failure_returns_handler_error() {
    let log = ExecutionLog::default();
    let mut step = failing_step("boom", &log);
    let mut data = Data::new();

    let err = step.run(&mut Context::new(), &mut data).unwrap_err();

    assert_eq!(
        err.as_step_error(),
        Some(&StepError::ExecutionFailed("boom exploded".to_string()))
    );
    assert!(step.is_failed());
    assert_eq!(data.get("boom"), Some(&Value::from("partial")));
    assert!(step.state().completed_steps().is_empty());
}

#[test]
fn test_step_without_handler_fails() {
    let mut step = Step::new().with_id("empty");
    let err = step.run(&mut Context::new(), &mut Data::new()).unwrap_err();
    assert!(matches!(err, FlowError::MissingHandler(id) if id == "empty"));
    assert!(step.is_failed());
}

#[test]
fn test_step_pause_and_resume_require_matching_status() {
    let log = ExecutionLog::default();
    let mut step = recording_step("a", &log);

    assert!(matches!(step.pause(), Err(FlowError::NotRunning)));
    assert!(step.is_waiting());

    let err = step.resume(&mut Context::new(), &mut Data::new()).unwrap_err();
    assert!(matches!(err, FlowError::NotPaused));
    assert!(log.entries().is_empty());

    step.run(&mut Context::new(), &mut Data::new()).unwrap();
    assert!(matches!(step.pause(), Err(FlowError::NotRunning)));
    assert!(step.is_completed());
}

#[test]
fn test_step_resume_overlays_caller_data_on_saved_data() {
    let seen = Arc::new(std::sync::Mutex::new(Data::new()));
    let captured = seen.clone();
    let mut step = Step::new().with_id("s").with_handler(move |_ctx, data| {
        *captured.lock().unwrap() = data.clone();
        Ok(())
    });

    let mut saved = State::started();
    let mut saved_data = Data::new();
    saved_data.insert("shared".to_string(), Value::from("saved"));
    saved_data.insert("only_saved".to_string(), Value::from(1));
    saved.set_data(saved_data);
    saved.set_status(Status::Paused);
    step.set_state(saved);

    let mut data = Data::new();
    data.insert("shared".to_string(), Value::from("caller"));
    data.insert("only_caller".to_string(), Value::from(2));
    step.resume(&mut Context::new(), &mut data).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.get("shared"), Some(&Value::from("caller")));
    assert_eq!(seen.get("only_saved"), Some(&Value::from(1)));
    assert_eq!(seen.get("only_caller"), Some(&Value::from(2)));
    assert_eq!(data.len(), 3);
    assert!(step.is_completed());
}

#[test]
fn test_step_paused_by_handler_resumes_from_checkpoint() {
    init_tracing();
    let log = ExecutionLog::default();
    let mut step = approval_step("approve", "self", &log);
    let mut ctx = Context::new().with_handle("self", step.state().clone());

    let mut data = Data::new();
    data.insert("request".to_string(), Value::from("vacation"));
    step.run(&mut ctx, &mut data).unwrap();

    assert!(step.is_paused());
    assert!(step.state().completed_steps().is_empty());
    let checkpoint = step.checkpoint().unwrap();

    // a new process: fresh step, restored state, only the new input supplied
    let mut restored = approval_step("approve", "self", &log);
    restored.restore(&checkpoint).unwrap();
    assert!(restored.is_paused());

    let mut ctx = Context::new().with_handle("self", restored.state().clone());
    let mut data = Data::new();
    data.insert("approved".to_string(), Value::from(true));
    restored.resume(&mut ctx, &mut data).unwrap();

    assert!(restored.is_completed());
    assert_eq!(data.get("request"), Some(&Value::from("vacation")));
    assert_eq!(data.get("approve"), Some(&Value::Bool(true)));
    assert_eq!(restored.state().completed_steps(), vec!["approve"]);
    assert_eq!(log.count("approve"), 2);
}

#[test]
fn test_step_view_exposes_state() {
    let log = ExecutionLog::default();
    let mut step = recording_step("a", &log);
    step.run(&mut Context::new(), &mut Data::new()).unwrap();

    let view = step.view();
    assert_eq!(view.id, "a");
    assert_eq!(view.name, "A");
    assert_eq!(view.layout, Layout::Single);
    assert_eq!(view.state.status, Status::Complete);
    assert_eq!(view.state.completed_steps, vec!["a"]);
}

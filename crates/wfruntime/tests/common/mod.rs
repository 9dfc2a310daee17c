#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};
use tracing_subscriber::{fmt, EnvFilter};
use wfruntime::{Step, StepError, Value};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Output is captured per test and only shown for failures unless the tests
/// run with `--nocapture`. Enable levels with e.g. `RUST_LOG=debug`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Ids of the steps that ran, in the order they ran.
#[derive(Clone, Default)]
pub struct ExecutionLog(Arc<Mutex<Vec<String>>>);

impl ExecutionLog {
    pub fn record(&self, id: &str) {
        self.0.lock().unwrap().push(id.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, id: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == id).count()
    }
}

/// A step that records itself and sets `data[id] = true`.
pub fn recording_step(id: &str, log: &ExecutionLog) -> Step {
    let log = log.clone();
    let key = id.to_string();
    Step::new()
        .with_id(id)
        .with_name(id.to_uppercase())
        .with_handler(move |_ctx, data| {
            log.record(&key);
            data.insert(key.clone(), Value::from(true));
            Ok(())
        })
}

/// A step that records itself, writes `data[id] = "partial"` and fails.
pub fn failing_step(id: &str, log: &ExecutionLog) -> Step {
    let log = log.clone();
    let key = id.to_string();
    Step::new()
        .with_id(id)
        .with_handler(move |_ctx, data| {
            log.record(&key);
            data.insert(key.clone(), Value::from("partial"));
            Err(StepError::failed(format!("{key} exploded")))
        })
}

/// A step that pauses the workflow registered in the context under
/// `workflow_key` until `data["approved"]` is true.
pub fn approval_step(id: &str, workflow_key: &'static str, log: &ExecutionLog) -> Step {
    let log = log.clone();
    let key = id.to_string();
    Step::new()
        .with_id(id)
        .with_handler(move |ctx, data| {
            log.record(&key);
            let approved = data
                .get("approved")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !approved {
                let workflow = ctx
                    .handle(workflow_key)
                    .ok_or_else(|| StepError::failed("workflow missing from context"))?;
                workflow
                    .pause()
                    .map_err(|e| StepError::failed(e.to_string()))?;
                return Ok(());
            }
            data.insert(key.clone(), Value::from(true));
            Ok(())
        })
}

use crate::{StateHandle, Value};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Carrier passed alongside the data bag to every handler.
///
/// The engine threads it through untouched. Handlers use it to observe
/// cancellation, read caller-supplied values, and reach the state of an
/// enclosing workflow (for example to pause it while waiting on a human).
#[derive(Clone, Default)]
pub struct Context {
    /// Cancellation token for cooperative shutdown
    pub cancellation: CancellationToken,

    values: HashMap<String, Value>,
    handles: HashMap<String, StateHandle>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Register the state of a runnable so handlers can find it under `key`.
    pub fn with_handle(mut self, key: impl Into<String>, handle: StateHandle) -> Self {
        self.handles.insert(key.into(), handle);
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn handle(&self, key: &str) -> Option<&StateHandle> {
        self.handles.get(key)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

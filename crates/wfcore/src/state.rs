use crate::{Data, FlowError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Execution status of a runnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Never started.
    #[default]
    #[serde(rename = "")]
    Waiting,
    Running,
    Paused,
    Complete,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Waiting => "",
            Status::Running => "running",
            Status::Paused => "paused",
            Status::Complete => "complete",
            Status::Failed => "failed",
        }
    }

    /// Whether the transition table allows moving from `self` to `next`.
    ///
    /// `Complete` and `Failed` are terminal.
    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Waiting, Status::Running)
                | (Status::Running, Status::Paused)
                | (Status::Running, Status::Complete)
                | (Status::Running, Status::Failed)
                | (Status::Paused, Status::Running)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Complete | Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Waiting => f.write_str("waiting"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Checkpoint record of one runnable: status, data snapshot and progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub status: Status,
    pub data: Data,
    pub current_step_id: String,
    pub completed_steps: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            status: Status::Waiting,
            data: Data::new(),
            current_step_id: String::new(),
            completed_steps: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

impl State {
    /// A fresh state in `Waiting`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh state for a run that is starting now.
    pub fn started() -> Self {
        Self {
            status: Status::Running,
            ..Self::default()
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Apply a status transition.
    ///
    /// Transitions outside the table are ignored and leave the status as it
    /// was; the return value tells whether the change was accepted.
    pub fn set_status(&mut self, status: Status) -> bool {
        if !self.status.can_transition_to(status) {
            tracing::debug!(from = %self.status, to = %status, "rejected status transition");
            return false;
        }
        self.status = status;
        self.touch();
        true
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn set_data(&mut self, data: Data) {
        self.data = data;
        self.touch();
    }

    pub fn current_step_id(&self) -> &str {
        &self.current_step_id
    }

    pub fn set_current_step_id(&mut self, id: impl Into<String>) {
        self.current_step_id = id.into();
        self.touch();
    }

    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    pub fn add_completed_step(&mut self, id: impl Into<String>) {
        self.completed_steps.push(id.into());
        self.touch();
    }

    pub fn is_step_completed(&self, id: &str) -> bool {
        self.completed_steps.iter().any(|done| done == id)
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn set_last_updated(&mut self, at: DateTime<Utc>) {
        self.last_updated = at;
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(FlowError::from)
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// Shared handle to a runnable's state.
///
/// The owning runnable and any handler that was given the handle through the
/// run context see the same record, which is how a handler pauses the
/// workflow that is currently executing it.
#[derive(Debug, Clone, Default)]
pub struct StateHandle {
    inner: Arc<RwLock<State>>,
}

impl StateHandle {
    pub fn new(state: State) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> State {
        self.read().clone()
    }

    /// Replace the record wholesale.
    pub fn replace(&self, state: State) {
        *self.write() = state;
    }

    pub fn status(&self) -> Status {
        self.read().status
    }

    pub fn set_status(&self, status: Status) -> bool {
        self.write().set_status(status)
    }

    pub fn data(&self) -> Data {
        self.read().data.clone()
    }

    pub fn set_data(&self, data: Data) {
        self.write().set_data(data);
    }

    pub fn current_step_id(&self) -> String {
        self.read().current_step_id.clone()
    }

    pub fn set_current_step_id(&self, id: impl Into<String>) {
        self.write().set_current_step_id(id);
    }

    pub fn completed_steps(&self) -> Vec<String> {
        self.read().completed_steps.clone()
    }

    pub fn add_completed_step(&self, id: impl Into<String>) {
        self.write().add_completed_step(id);
    }

    pub fn is_step_completed(&self, id: &str) -> bool {
        self.read().is_step_completed(id)
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.read().last_updated
    }

    pub fn set_last_updated(&self, at: DateTime<Utc>) {
        self.write().set_last_updated(at);
    }

    /// Suspend a running workflow. Fails with [`FlowError::NotRunning`]
    /// otherwise and leaves the state untouched.
    pub fn pause(&self) -> Result<()> {
        let mut state = self.write();
        if state.status != Status::Running {
            return Err(FlowError::NotRunning);
        }
        state.set_status(Status::Paused);
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        self.read().to_json()
    }

    /// Parse `bytes` and, only if that succeeds, replace the record.
    pub fn load_json(&self, bytes: &[u8]) -> Result<()> {
        let restored = State::from_json(bytes)?;
        self.replace(restored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Status; 5] = [
        Status::Waiting,
        Status::Running,
        Status::Paused,
        Status::Complete,
        Status::Failed,
    ];

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for terminal in [Status::Complete, Status::Failed] {
            for next in ALL {
                let mut state = State::new();
                state.status = terminal;
                assert!(!state.set_status(next), "{terminal} -> {next} should be rejected");
                assert_eq!(state.status(), terminal);
            }
        }
    }

    #[test]
    fn transition_table() {
        let allowed = [
            (Status::Waiting, Status::Running),
            (Status::Running, Status::Paused),
            (Status::Running, Status::Complete),
            (Status::Running, Status::Failed),
            (Status::Paused, Status::Running),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn waiting_serializes_as_empty_string() {
        let json = serde_json::to_string(&Status::Waiting).unwrap();
        assert_eq!(json, "\"\"");
        let back: Status = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(back, Status::Paused);
    }
}

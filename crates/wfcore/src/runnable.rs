use crate::{Context, Data, Result, State, StateHandle, Status};
use serde::{Deserialize, Serialize};

/// Core trait implemented by steps, pipelines and DAGs.
///
/// `run` walks whatever the runnable contains, threading the context and the
/// data bag through. Progress is recorded in the runnable's [`State`], which
/// is enough to pick up again with `resume`, even on a new instance whose
/// state was restored from a checkpoint.
pub trait Runnable: Send {
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Display name, not required to be unique
    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    fn kind(&self) -> RunnableKind;

    /// Execute, or continue a paused execution.
    fn run(&mut self, ctx: &mut Context, data: &mut Data) -> Result<()>;

    /// Continue from the saved state. Fails unless paused.
    fn resume(&mut self, ctx: &mut Context, data: &mut Data) -> Result<()>;

    fn state(&self) -> &StateHandle;

    /// Read-only projection consumed by renderers.
    fn view(&self) -> RunnableView;

    /// Suspend execution. Fails unless running.
    fn pause(&mut self) -> Result<()> {
        self.state().pause()
    }

    /// Replace the state record. Handles already given out keep observing
    /// the same record.
    fn set_state(&mut self, state: State) {
        self.state().replace(state);
    }

    fn status(&self) -> Status {
        self.state().status()
    }

    fn is_running(&self) -> bool {
        self.status() == Status::Running
    }

    fn is_paused(&self) -> bool {
        self.status() == Status::Paused
    }

    fn is_completed(&self) -> bool {
        self.status() == Status::Complete
    }

    fn is_failed(&self) -> bool {
        self.status() == Status::Failed
    }

    fn is_waiting(&self) -> bool {
        self.status() == Status::Waiting
    }

    /// Serialize the current state.
    fn checkpoint(&self) -> Result<Vec<u8>> {
        self.state().to_json()
    }

    /// Load a checkpoint produced by [`Runnable::checkpoint`]. On error the
    /// current state is left as it was.
    fn restore(&mut self, bytes: &[u8]) -> Result<()> {
        self.state().load_json(bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnableKind {
    Step,
    Pipeline,
    Dag,
}

/// What a renderer may know about a runnable: its children, how they are
/// connected, and where execution stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnableView {
    pub id: String,
    pub name: String,
    pub kind: RunnableKind,
    pub layout: Layout,
    pub state: StateView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Layout {
    /// A step has no children.
    Single,
    /// Children in execution order.
    Sequence { nodes: Vec<NodeView> },
    /// Children in insertion order plus dependency edges.
    Graph {
        nodes: Vec<NodeView>,
        edges: Vec<EdgeView>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub name: String,
    pub kind: RunnableKind,
    pub status: Status,
}

impl NodeView {
    pub fn of(runnable: &dyn Runnable) -> Self {
        Self {
            id: runnable.id().to_string(),
            name: runnable.name().to_string(),
            kind: runnable.kind(),
            status: runnable.status(),
        }
    }
}

/// `dependent` runs after `dependency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeView {
    pub dependency: String,
    pub dependent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateView {
    pub status: Status,
    pub current_step_id: String,
    pub completed_steps: Vec<String>,
}

impl From<&State> for StateView {
    fn from(state: &State) -> Self {
        Self {
            status: state.status,
            current_step_id: state.current_step_id.clone(),
            completed_steps: state.completed_steps.clone(),
        }
    }
}

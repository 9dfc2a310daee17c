use crate::executor::{ensure_paused, merge_saved_data, resume_index, run_children};
use wfcore::{
    new_id, Context, Data, Layout, NodeView, Result, Runnable, RunnableKind, RunnableView, State,
    StateHandle, Status,
};

/// Runnables executed one after another in insertion order.
pub struct Pipeline {
    id: String,
    name: String,
    nodes: Vec<Box<dyn Runnable>>,
    state: StateHandle,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            name: String::new(),
            nodes: Vec::new(),
            state: StateHandle::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_runnables<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Runnable>>,
    {
        self.runnable_add(nodes);
        self
    }

    pub fn boxed(self) -> Box<dyn Runnable> {
        Box::new(self)
    }

    /// Append runnables; they run after everything already present.
    pub fn runnable_add<I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = Box<dyn Runnable>>,
    {
        self.nodes.extend(nodes);
    }

    /// Remove the first runnable with this id. Returns whether one was found.
    pub fn runnable_remove(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        match self.nodes.iter().position(|n| n.id() == id) {
            Some(pos) => {
                self.nodes.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Runnables in execution order.
    pub fn runnable_list(&self) -> Vec<&dyn Runnable> {
        self.nodes.iter().map(|n| n.as_ref()).collect()
    }

    pub fn runnable(&self, id: &str) -> Option<&dyn Runnable> {
        self.nodes.iter().find(|n| n.id() == id).map(|n| n.as_ref())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn resume_from_state(&mut self, ctx: &mut Context, data: &mut Data) -> Result<()> {
        merge_saved_data(&self.state, data);

        let start = resume_index(&self.state, self.nodes.iter().map(|n| n.id()));
        tracing::info!("Resuming pipeline {} at position {}", self.id, start);

        self.state.set_status(Status::Running);
        run_children(
            &self.id,
            &self.state,
            self.nodes.iter_mut().collect(),
            start,
            ctx,
            data,
        )
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Runnable for Pipeline {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn kind(&self) -> RunnableKind {
        RunnableKind::Pipeline
    }

    fn run(&mut self, ctx: &mut Context, data: &mut Data) -> Result<()> {
        if self.state.status() == Status::Paused {
            return self.resume_from_state(ctx, data);
        }

        tracing::info!("Starting pipeline {} ({} steps)", self.id, self.nodes.len());
        self.state.replace(State::started());
        self.state.set_data(data.clone());

        run_children(
            &self.id,
            &self.state,
            self.nodes.iter_mut().collect(),
            0,
            ctx,
            data,
        )
    }

    fn resume(&mut self, ctx: &mut Context, data: &mut Data) -> Result<()> {
        ensure_paused(&self.state)?;
        self.resume_from_state(ctx, data)
    }

    fn state(&self) -> &StateHandle {
        &self.state
    }

    fn view(&self) -> RunnableView {
        RunnableView {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: RunnableKind::Pipeline,
            layout: Layout::Sequence {
                nodes: self.nodes.iter().map(|n| NodeView::of(n.as_ref())).collect(),
            },
            state: (&self.state.snapshot()).into(),
        }
    }
}

use crate::executor::{ensure_paused, merge_saved_data};
use std::fmt;
use std::sync::Arc;
use wfcore::{
    new_id, Context, Data, FlowError, Layout, Result, Runnable, RunnableKind, RunnableView,
    State, StateHandle, StepError, Status,
};

/// Function implementing a step's work.
///
/// It may read and write any key of the data bag; mutations stay visible to
/// the steps that follow, even when the handler fails.
pub type StepHandler =
    Arc<dyn Fn(&mut Context, &mut Data) -> std::result::Result<(), StepError> + Send + Sync>;

/// Atomic unit of work wrapping a handler.
pub struct Step {
    id: String,
    name: String,
    handler: Option<StepHandler>,
    state: StateHandle,
}

impl Step {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            name: String::new(),
            handler: None,
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

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Context, &mut Data) -> std::result::Result<(), StepError>
            + Send
            + Sync
            + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn handler(&self) -> Option<&StepHandler> {
        self.handler.as_ref()
    }

    pub fn set_handler(&mut self, handler: StepHandler) {
        self.handler = Some(handler);
    }

    pub fn boxed(self) -> Box<dyn Runnable> {
        Box::new(self)
    }

    fn resume_from_state(&mut self, ctx: &mut Context, data: &mut Data) -> Result<()> {
        merge_saved_data(&self.state, data);
        self.state.set_status(Status::Running);
        tracing::info!("Resuming step {}", self.id);
        self.invoke(ctx, data)
    }

    fn invoke(&mut self, ctx: &mut Context, data: &mut Data) -> Result<()> {
        let Some(handler) = self.handler.clone() else {
            self.state.set_status(Status::Failed);
            return Err(FlowError::MissingHandler(self.id.clone()));
        };

        if let Err(e) = handler(ctx, data) {
            tracing::warn!("Step {} failed: {}", self.id, e);
            self.state.set_status(Status::Failed);
            return Err(e.into());
        }

        // the handler paused this step; keep its output for the resume
        if self.state.status() == Status::Paused {
            self.state.set_data(data.clone());
            return Ok(());
        }

        self.state.add_completed_step(self.id.as_str());
        self.state.set_data(data.clone());
        self.state.set_status(Status::Complete);
        Ok(())
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_handler", &self.handler.is_some())
            .field("status", &self.state.status())
            .finish()
    }
}

impl Runnable for Step {
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
        RunnableKind::Step
    }

    fn run(&mut self, ctx: &mut Context, data: &mut Data) -> Result<()> {
        if self.state.status() == Status::Paused {
            return self.resume_from_state(ctx, data);
        }

        self.state.replace(State::started());
        self.state.set_data(data.clone());
        self.state.set_current_step_id(self.id.as_str());
        tracing::debug!("Running step {}", self.id);

        self.invoke(ctx, data)
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
            kind: RunnableKind::Step,
            layout: Layout::Single,
            state: (&self.state.snapshot()).into(),
        }
    }
}

use crate::executor::{ensure_paused, merge_saved_data, resume_index, run_children};
use crate::graph::{topological_sort, DependencyGraph};
use std::collections::HashMap;
use std::sync::Arc;
use wfcore::{
    Context, Data, EdgeView, IdGenerator, Layout, NodeView, Result, Runnable, RunnableKind,
    RunnableView, State, StateHandle, Status, UuidGenerator,
};

/// Runnables executed in an order derived from declared dependencies.
///
/// The order is recomputed from the current nodes and edges on every run and
/// resume, so nodes and dependencies may be edited between runs. Independent
/// branches still run one at a time.
pub struct Dag {
    id: String,
    name: String,

    /// Node ids in insertion order
    sequence: Vec<String>,

    runnables: HashMap<String, Box<dyn Runnable>>,

    /// dependent id -> dependency ids
    dependencies: HashMap<String, Vec<String>>,

    state: StateHandle,
    ids: Arc<dyn IdGenerator>,
}

impl Dag {
    pub fn new() -> Self {
        let ids: Arc<dyn IdGenerator> = Arc::new(UuidGenerator);
        Self {
            id: ids.generate(),
            name: "New DAG".to_string(),
            sequence: Vec::new(),
            runnables: HashMap::new(),
            dependencies: HashMap::new(),
            state: StateHandle::default(),
            ids,
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

    /// Use a different source for the ids assigned to added nodes.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_runnables<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Runnable>>,
    {
        self.runnable_add(nodes);
        self
    }

    /// Declare that `dependent` runs after each of `dependencies`.
    ///
    /// Ignored when `dependent` is empty or no non-empty dependency is given.
    pub fn with_dependency<I, S>(mut self, dependent: &str, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let deps: Vec<String> = dependencies
            .into_iter()
            .map(Into::into)
            .filter(|id| !id.is_empty())
            .collect();
        if dependent.is_empty() || deps.is_empty() {
            return self;
        }
        self.dependency_add(dependent, deps);
        self
    }

    pub fn boxed(self) -> Box<dyn Runnable> {
        Box::new(self)
    }

    /// Add nodes and return the ids they were stored under.
    ///
    /// A node without an id gets a fresh one; so does a node whose id is
    /// already taken. Generated ids are drawn until one is free, so an
    /// existing node is never replaced.
    pub fn runnable_add<I>(&mut self, nodes: I) -> Vec<String>
    where
        I: IntoIterator<Item = Box<dyn Runnable>>,
    {
        let mut added = Vec::new();
        for mut node in nodes {
            if node.id().is_empty() {
                node.set_id(self.unused_id());
            } else if self.runnables.contains_key(node.id()) {
                let renamed = self.unused_id();
                tracing::warn!(
                    "Duplicate runnable id {} in DAG {}, renamed to {}",
                    node.id(),
                    self.id,
                    renamed
                );
                node.set_id(renamed);
            }

            let id = node.id().to_string();
            self.sequence.push(id.clone());
            self.runnables.insert(id.clone(), node);
            added.push(id);
        }
        added
    }

    fn unused_id(&self) -> String {
        let mut id = self.ids.generate();
        while id.is_empty() || self.runnables.contains_key(&id) {
            id = self.ids.generate();
        }
        id
    }

    /// Remove a node together with every dependency edge naming it.
    /// Returns whether the node was present.
    pub fn runnable_remove(&mut self, id: &str) -> bool {
        if id.is_empty() || self.runnables.remove(id).is_none() {
            return false;
        }

        self.sequence.retain(|seq_id| seq_id != id);
        self.dependencies.remove(id);
        for deps in self.dependencies.values_mut() {
            deps.retain(|dep| dep != id);
        }

        true
    }

    /// All nodes, in insertion order. This is not the execution order.
    pub fn runnable_list(&self) -> Vec<&dyn Runnable> {
        self.sequence
            .iter()
            .filter_map(|id| self.runnables.get(id))
            .map(|n| n.as_ref())
            .collect()
    }

    pub fn runnable(&self, id: &str) -> Option<&dyn Runnable> {
        self.runnables.get(id).map(|n| n.as_ref())
    }

    pub fn len(&self) -> usize {
        self.runnables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runnables.is_empty()
    }

    /// Append edges; adding the same edge twice keeps both entries.
    pub fn dependency_add<I, S>(&mut self, dependent: &str, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .entry(dependent.to_string())
            .or_default()
            .extend(dependencies.into_iter().map(Into::into));
    }

    /// Direct dependencies of `id` that are still part of the DAG.
    pub fn dependency_list(&self, id: &str) -> Vec<&dyn Runnable> {
        self.dependencies
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|dep| self.runnables.get(dep))
            .map(|n| n.as_ref())
            .collect()
    }

    /// Dependency graph of the current nodes and edges.
    pub fn graph(&self) -> DependencyGraph {
        let nodes = self
            .sequence
            .iter()
            .filter_map(|id| self.runnables.get_key_value(id))
            .map(|(id, node)| (id.as_str(), node.name()));
        DependencyGraph::build(nodes, &self.dependencies)
    }

    /// Ids in the order a run would execute them.
    pub fn execution_order(&self) -> Result<Vec<String>> {
        let order = topological_sort(&self.graph())?;
        Ok(order.into_iter().map(|node| node.id).collect())
    }

    /// Compute the order, marking the DAG failed if that is impossible.
    fn prepare_order(&self) -> Result<Vec<String>> {
        self.execution_order().inspect_err(|e| {
            tracing::error!("DAG {} cannot be ordered: {}", self.id, e);
            self.state.set_status(Status::Failed);
        })
    }

    fn execute(
        &mut self,
        order: &[String],
        start: usize,
        ctx: &mut Context,
        data: &mut Data,
    ) -> Result<()> {
        let mut by_id: HashMap<&str, &mut Box<dyn Runnable>> = self
            .runnables
            .iter_mut()
            .map(|(id, node)| (id.as_str(), node))
            .collect();
        let children = order
            .iter()
            .filter_map(|id| by_id.remove(id.as_str()))
            .collect();

        run_children(&self.id, &self.state, children, start, ctx, data)
    }

    fn resume_from_state(&mut self, ctx: &mut Context, data: &mut Data) -> Result<()> {
        merge_saved_data(&self.state, data);
        self.state.set_status(Status::Running);

        let order = self.prepare_order()?;
        let start = resume_index(&self.state, order.iter().map(String::as_str));
        tracing::info!("Resuming DAG {} at position {}", self.id, start);

        self.execute(&order, start, ctx, data)
    }

    fn edges(&self) -> Vec<EdgeView> {
        let mut edges = Vec::new();
        for dependent in &self.sequence {
            let Some(deps) = self.dependencies.get(dependent) else {
                continue;
            };
            for dep in deps.iter().filter(|dep| self.runnables.contains_key(*dep)) {
                edges.push(EdgeView {
                    dependency: dep.clone(),
                    dependent: dependent.clone(),
                });
            }
        }
        edges
    }
}

impl Default for Dag {
    fn default() -> Self {
        Self::new()
    }
}

impl Runnable for Dag {
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
        RunnableKind::Dag
    }

    fn run(&mut self, ctx: &mut Context, data: &mut Data) -> Result<()> {
        if self.state.status() == Status::Paused {
            return self.resume_from_state(ctx, data);
        }

        tracing::info!("Starting DAG {} ({} nodes)", self.id, self.runnables.len());
        self.state.replace(State::started());
        self.state.set_data(data.clone());

        let order = self.prepare_order()?;
        tracing::debug!("DAG {} execution order: {:?}", self.id, order);

        self.execute(&order, 0, ctx, data)
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
            kind: RunnableKind::Dag,
            layout: Layout::Graph {
                nodes: self
                    .runnable_list()
                    .into_iter()
                    .map(NodeView::of)
                    .collect(),
                edges: self.edges(),
            },
            state: (&self.state.snapshot()).into(),
        }
    }
}

//! Workflow execution runtime
//!
//! This crate provides the runnables that do the work: [`Step`] wraps a
//! handler, [`Pipeline`] runs children in insertion order and [`Dag`] runs
//! them in dependency order. All three share the same run, pause and resume
//! protocol, checkpointing progress in their `wfcore::State`.

mod dag;
mod executor;
pub mod graph;
mod pipeline;
mod step;

pub use dag::Dag;
pub use graph::{topological_sort, DependencyGraph, GraphNode};
pub use pipeline::Pipeline;
pub use step::{Step, StepHandler};

pub use wfcore::{
    Context, Data, EdgeView, FlowError, IdGenerator, Layout, NodeView, Result, Runnable,
    RunnableKind, RunnableView, State, StateHandle, StateView, Status, StepError, UuidGenerator,
    Value,
};

//! Core abstractions for the workflow engine
//!
//! This crate provides the fundamental types and traits the runtime builds
//! on: the data bag, the checkpointed execution state, the run context and
//! the `Runnable` trait. It performs no execution itself.

mod context;
mod error;
mod id;
mod runnable;
mod state;
mod value;

pub use context::Context;
pub use error::{FlowError, StepError};
pub use id::{new_id, IdGenerator, UuidGenerator};
pub use runnable::{
    EdgeView, Layout, NodeView, Runnable, RunnableKind, RunnableView, StateView,
};
pub use state::{State, StateHandle, Status};
pub use value::{require, require_bool, require_f64, require_str, Data, Value};

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, FlowError>;

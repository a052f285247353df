//! A single-user to-do list: an in-memory task store, JSON/CSV persistence
//! and a terminal front end.

pub mod app;
pub mod cli;
pub mod error;
pub mod persistence;
pub mod store;
pub mod task;
pub mod ui;

pub use error::{PersistenceError, ValidationError};
pub use store::{SelectionOutcome, TaskStore};
pub use task::{Priority, Task, TaskId};

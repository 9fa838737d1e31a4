//! Core data types of the state machine.
//!
//! This module contains the pieces that carry no locking or hook logic:
//! - The `Identifier` bound for states, events and context keys
//! - Tagged context values
//! - Context declarations, updates and the store itself
//! - Optional debug name tables

mod context;
mod ids;
mod names;
mod value;

pub(crate) use context::{ContextStore, StoreError};
pub use context::{ContextDecl, ContextUpdate};
pub use ids::Identifier;
pub use names::{NameTable, Names};
pub use value::ContextValue;

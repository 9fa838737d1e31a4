//! Construction of machines.
//!
//! [`MachineBuilder`] collects the definition fluently and checks it as a
//! whole before the machine exists. Every inconsistency is reported in one
//! [`BuildError::InvalidDefinition`] rather than one at a time.
//! [`identifiers!`](crate::identifiers) declares enums for states, events
//! and context keys.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::{BuildError, DefinitionError};
pub use machine::MachineBuilder;

//! Latch: a thread-safe finite state machine engine
//!
//! A machine moves one entity through a fixed set of states in response to
//! a fixed set of events. Transitions can be guarded, can run entry and
//! exit hooks, and can update typed auxiliary data (the context). Every
//! committed transition is published on a bounded notification channel.
//!
//! # Core Concepts
//!
//! - **States, events, context keys**: closed sets fixed at construction
//! - **Transitions**: guard, entry/exit hooks and a context updater
//! - **Context**: keyed values; protected keys change only through
//!   transitions
//! - **Notifications**: ordered [`StateChange`] records, ending with a
//!   terminal record after [`Machine::stop`]
//! - **Errors**: misuse returns [`MachineError`]; runtime failures are
//!   routed to error hooks as [`RoutedError`]
//!
//! # Example
//!
//! ```rust
//! use latch::builder::MachineBuilder;
//! use latch::core::{ContextDecl, ContextUpdate, ContextValue};
//! use latch::engine::{StateNode, Transition};
//! use latch::identifiers;
//!
//! identifiers! {
//!     enum Mode { Inactive, Active }
//! }
//! identifiers! {
//!     enum Signal { Activate, Deactivate, Increment }
//! }
//! identifiers! {
//!     enum Key { Counter, IsReady }
//! }
//!
//! let machine = MachineBuilder::new("counter")
//!     .initial(Mode::Inactive)
//!     .context(ContextDecl::protected(Key::Counter, 0))
//!     .context(ContextDecl::mutable(Key::IsReady, false))
//!     .events(Signal::ALL.iter().copied())
//!     .state(
//!         Mode::Inactive,
//!         StateNode::new().on(
//!             Signal::Activate,
//!             Transition::to(Mode::Active).guard(|scope, _, _| {
//!                 scope.get(&Key::IsReady).ok().and_then(ContextValue::as_bool).unwrap_or(false)
//!             }),
//!         ),
//!     )
//!     .state(
//!         Mode::Active,
//!         StateNode::new()
//!             .on(Signal::Deactivate, Transition::to(Mode::Inactive))
//!             .on(
//!                 Signal::Increment,
//!                 Transition::to(Mode::Active).update(|scope, _, _, _| {
//!                     let count = scope.get(&Key::Counter)?.as_int().unwrap_or(0);
//!                     Ok(ContextUpdate::single(Key::Counter, count + 1))
//!                 }),
//!             ),
//!     )
//!     .on_error(|_, _, _, _| {})
//!     .build()
//!     .unwrap();
//!
//! machine.set(&Key::IsReady, true).unwrap();
//! assert_eq!(machine.send_event(Signal::Activate), Ok(true));
//! assert_eq!(machine.send_event(Signal::Increment), Ok(true));
//! assert_eq!(machine.get(&Key::Counter).unwrap().as_int(), Some(1));
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod engine;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use config::{MachineConfig, NotifyPolicy};
pub use crate::core::{ContextDecl, ContextUpdate, ContextValue, Identifier, NameTable};
pub use engine::{
    ErrorKind, Machine, MachineError, RoutedError, StateChange, StateNode, Subscription,
    Transition, TransitionEvent,
};

//! The transition engine and the machine façade around it.
//!
//! # Key Concepts
//!
//! - **Transitions**: target state plus optional guard, entry, exit and
//!   context-update hooks, attached to one event within one state
//! - **State nodes**: the transitions of one state, plus its error and
//!   success hooks
//! - **Machine**: owns the registry, context and current state behind one
//!   lock and publishes every committed transition
//! - **Notifications**: a bounded, ordered stream of [`StateChange`]
//!   records ending with a terminal record after `stop`

mod error;
mod hooks;
mod machine;
mod notify;
mod transition;

pub use error::{BoxError, ErrorKind, MachineError, RoutedError};
pub use hooks::{
    ContextUpdater, ErrorHook, Guard, HookScope, SuccessHook, TransitionEvent, TransitionHook,
    UpdateResult,
};
pub use machine::Machine;
pub use notify::{StateChange, Subscription};
pub use transition::{StateNode, Transition};

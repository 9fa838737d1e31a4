//! Errors raised while constructing a machine.

use thiserror::Error;

/// Errors that can occur when building a machine.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Machine-level error hook not specified. Call .on_error(hook) before .build()")]
    MissingErrorHook,

    #[error("Invalid machine definition: {}", join(.0))]
    InvalidDefinition(Vec<DefinitionError>),
}

fn join(errors: &[DefinitionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One problem found in a machine definition.
///
/// Identifiers are rendered with `Debug`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("machine id is empty")]
    EmptyId,

    #[error("notification channel capacity must be at least 1")]
    ZeroCapacity,

    #[error("event {event} registered more than once")]
    DuplicateEvent { event: String },

    #[error("context key {key} declared more than once")]
    DuplicateContextKey { key: String },

    #[error("state {state} defined more than once")]
    DuplicateState { state: String },

    #[error("state {state} has more than one transition for event {event}")]
    DuplicateTransition { state: String, event: String },

    #[error("initial state {state} is not in the state registry")]
    UnknownInitialState { state: String },

    #[error("state {state} has a transition for unregistered event {event}")]
    UnregisteredTransitionEvent { state: String, event: String },

    #[error("state {state} transitions on {event} to unknown state {target}")]
    UnknownTargetState {
        state: String,
        event: String,
        target: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_definition_lists_every_problem() {
        let err = BuildError::InvalidDefinition(vec![
            DefinitionError::EmptyId,
            DefinitionError::DuplicateEvent {
                event: "Activate".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid machine definition: machine id is empty; event Activate registered more than once"
        );
    }
}

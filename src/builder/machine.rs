//! Builder for constructing machines.

use crate::builder::error::{BuildError, DefinitionError};
use crate::config::{MachineConfig, NotifyPolicy};
use crate::core::{ContextDecl, Identifier};
use crate::engine::{ErrorHook, Machine, RoutedError, StateNode};
use std::collections::HashSet;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<DefinitionError>>;

fn ensure(ok: bool, error: impl FnOnce() -> DefinitionError) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(error())
    }
}

/// One failing check per repeated item.
fn unique<'a, T: Identifier>(
    items: impl IntoIterator<Item = &'a T>,
    error: impl Fn(&T) -> DefinitionError,
) -> Vec<Check> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| !seen.insert(*item))
        .map(|item| Validation::fail(error(item)))
        .collect()
}

/// Builder for constructing machines with a fluent API.
///
/// # Example
///
/// ```rust
/// use latch::builder::MachineBuilder;
/// use latch::core::ContextDecl;
/// use latch::engine::{StateNode, Transition};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Door { Open, Closed }
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Push { Open, Close }
///
/// let door = MachineBuilder::<Door, Push, &str>::new("door")
///     .initial(Door::Closed)
///     .context(ContextDecl::mutable("locked", false))
///     .events([Push::Open, Push::Close])
///     .state(Door::Closed, StateNode::new().on(Push::Open, Transition::to(Door::Open)))
///     .state(Door::Open, StateNode::new().on(Push::Close, Transition::to(Door::Closed)))
///     .on_error(|machine, state, _, error| {
///         eprintln!("[{}] {:?}: {}", machine.id(), state, error);
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(door.send_event(Push::Open), Ok(true));
/// assert_eq!(door.current_state(), Door::Open);
/// ```
pub struct MachineBuilder<S: Identifier, E: Identifier, K: Identifier> {
    config: MachineConfig,
    initial: Option<S>,
    context: Vec<ContextDecl<K>>,
    events: Vec<E>,
    states: Vec<(S, StateNode<S, E, K>)>,
    error_hook: Option<Arc<dyn ErrorHook<S, E, K>>>,
}

impl<S: Identifier, E: Identifier, K: Identifier> MachineBuilder<S, E, K> {
    /// Create a builder with default settings and the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_config(MachineConfig::new(id))
    }

    /// Create a builder from a full configuration.
    pub fn with_config(config: MachineConfig) -> Self {
        Self {
            config,
            initial: None,
            context: Vec::new(),
            events: Vec::new(),
            states: Vec::new(),
            error_hook: None,
        }
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    pub fn notify_policy(mut self, policy: NotifyPolicy) -> Self {
        self.config.notify_policy = policy;
        self
    }

    /// Route guard rejections and unmatched events to the error hook.
    pub fn report_rejections(mut self, report: bool) -> Self {
        self.config.report_rejections = report;
        self
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Declare a context key.
    pub fn context(mut self, decl: ContextDecl<K>) -> Self {
        self.context.push(decl);
        self
    }

    pub fn contexts(mut self, decls: impl IntoIterator<Item = ContextDecl<K>>) -> Self {
        self.context.extend(decls);
        self
    }

    /// Register a legal event.
    pub fn event(mut self, event: E) -> Self {
        self.events.push(event);
        self
    }

    pub fn events(mut self, events: impl IntoIterator<Item = E>) -> Self {
        self.events.extend(events);
        self
    }

    /// Add a state to the registry.
    pub fn state(mut self, state: S, node: StateNode<S, E, K>) -> Self {
        self.states.push((state, node));
        self
    }

    /// Set the machine-level error hook (required).
    pub fn on_error<F>(self, hook: F) -> Self
    where
        F: Fn(&Machine<S, E, K>, &S, &S, &RoutedError) + Send + Sync + 'static,
    {
        self.on_error_with(hook)
    }

    pub fn on_error_with(mut self, hook: impl ErrorHook<S, E, K> + 'static) -> Self {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    /// Check the definition, accumulating every problem found.
    fn validate(&self, initial: &S) -> Result<(), BuildError> {
        let mut checks: Vec<Check> = vec![
            ensure(!self.config.id.is_empty(), || DefinitionError::EmptyId),
            ensure(self.config.channel_capacity > 0, || {
                DefinitionError::ZeroCapacity
            }),
        ];

        checks.extend(unique(&self.events, |e| DefinitionError::DuplicateEvent {
            event: format!("{e:?}"),
        }));
        checks.extend(unique(self.context.iter().map(|decl| &decl.key), |k| {
            DefinitionError::DuplicateContextKey {
                key: format!("{k:?}"),
            }
        }));
        checks.extend(unique(self.states.iter().map(|(state, _)| state), |s| {
            DefinitionError::DuplicateState {
                state: format!("{s:?}"),
            }
        }));

        let events: HashSet<&E> = self.events.iter().collect();
        let states: HashSet<&S> = self.states.iter().map(|(state, _)| state).collect();

        checks.push(ensure(states.contains(initial), || {
            DefinitionError::UnknownInitialState {
                state: format!("{initial:?}"),
            }
        }));

        for (state, node) in &self.states {
            for event in &node.duplicates {
                checks.push(Validation::fail(DefinitionError::DuplicateTransition {
                    state: format!("{state:?}"),
                    event: format!("{event:?}"),
                }));
            }
            for (event, transition) in &node.transitions {
                checks.push(ensure(events.contains(event), || {
                    DefinitionError::UnregisteredTransitionEvent {
                        state: format!("{state:?}"),
                        event: format!("{event:?}"),
                    }
                }));
                checks.push(ensure(states.contains(&transition.target), || {
                    DefinitionError::UnknownTargetState {
                        state: format!("{state:?}"),
                        event: format!("{event:?}"),
                        target: format!("{:?}", transition.target),
                    }
                }));
            }
        }

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(BuildError::InvalidDefinition(
                errors.iter().cloned().collect(),
            )),
        }
    }

    /// Build the machine.
    /// Returns an error if required fields are missing or the definition is
    /// inconsistent.
    pub fn build(self) -> Result<Machine<S, E, K>, BuildError> {
        let initial = self.initial.clone().ok_or(BuildError::MissingInitialState)?;
        let error_hook = self.error_hook.clone().ok_or(BuildError::MissingErrorHook)?;

        self.validate(&initial)?;

        Ok(Machine::from_parts(
            self.config,
            initial,
            self.context,
            self.events,
            self.states,
            error_hook,
        ))
    }
}

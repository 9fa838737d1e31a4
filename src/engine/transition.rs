//! Transitions and the state nodes that hold them.

use super::hooks::{
    ContextUpdater, ErrorHook, Guard, HookScope, SuccessHook, TransitionEvent, TransitionHook,
    UpdateResult,
};
use super::error::RoutedError;
use super::machine::Machine;
use crate::core::Identifier;
use std::collections::HashMap;
use std::sync::Arc;

/// What happens when an event arrives in a state: the target state plus
/// optional guard, entry, exit and context-update hooks.
///
/// A transition whose target is its own source state is a self-transition.
/// Entry and exit hooks do not fire for it; the context updater does.
///
/// # Example
///
/// ```rust
/// use latch::core::{ContextUpdate, ContextValue};
/// use latch::engine::Transition;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Light { Off, On }
///
/// let switch_on: Transition<Light, &str, &str> = Transition::to(Light::On)
///     .guard(|scope, _, _| {
///         scope.get(&"powered").ok().and_then(ContextValue::as_bool).unwrap_or(false)
///     })
///     .update(|_, _, _, _| Ok(ContextUpdate::single("switched", true)));
///
/// assert_eq!(switch_on.target(), &Light::On);
/// assert!(switch_on.has_guard());
/// ```
pub struct Transition<S: Identifier, E: Identifier, K: Identifier> {
    pub(crate) target: S,
    pub(crate) guard: Option<Arc<dyn Guard<S, E, K>>>,
    pub(crate) entry: Option<Arc<dyn TransitionHook<S, E, K>>>,
    pub(crate) exit: Option<Arc<dyn TransitionHook<S, E, K>>>,
    pub(crate) update: Option<Arc<dyn ContextUpdater<S, E, K>>>,
}

impl<S: Identifier, E: Identifier, K: Identifier> Transition<S, E, K> {
    /// Transition to `target` with no hooks.
    pub fn to(target: S) -> Self {
        Self {
            target,
            guard: None,
            entry: None,
            exit: None,
            update: None,
        }
    }

    pub fn target(&self) -> &S {
        &self.target
    }

    pub fn has_guard(&self) -> bool {
        self.guard.is_some()
    }

    pub fn guard<F>(self, predicate: F) -> Self
    where
        F: Fn(&HookScope<'_, S, E, K>, &S, &S) -> bool + Send + Sync + 'static,
    {
        self.guard_with(predicate)
    }

    pub fn guard_with(mut self, guard: impl Guard<S, E, K> + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Hook run when entering the target state.
    pub fn entry<F>(self, hook: F) -> Self
    where
        F: Fn(&mut HookScope<'_, S, E, K>, &S, &S, TransitionEvent) + Send + Sync + 'static,
    {
        self.entry_with(hook)
    }

    pub fn entry_with(mut self, hook: impl TransitionHook<S, E, K> + 'static) -> Self {
        self.entry = Some(Arc::new(hook));
        self
    }

    /// Hook run when leaving the source state, before the entry hook.
    pub fn exit<F>(self, hook: F) -> Self
    where
        F: Fn(&mut HookScope<'_, S, E, K>, &S, &S, TransitionEvent) + Send + Sync + 'static,
    {
        self.exit_with(hook)
    }

    pub fn exit_with(mut self, hook: impl TransitionHook<S, E, K> + 'static) -> Self {
        self.exit = Some(Arc::new(hook));
        self
    }

    pub fn update<F>(self, updater: F) -> Self
    where
        F: Fn(&HookScope<'_, S, E, K>, &S, &S, &E) -> UpdateResult<K> + Send + Sync + 'static,
    {
        self.update_with(updater)
    }

    pub fn update_with(mut self, updater: impl ContextUpdater<S, E, K> + 'static) -> Self {
        self.update = Some(Arc::new(updater));
        self
    }
}

impl<S: Identifier, E: Identifier, K: Identifier> Clone for Transition<S, E, K> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            guard: self.guard.clone(),
            entry: self.entry.clone(),
            exit: self.exit.clone(),
            update: self.update.clone(),
        }
    }
}

/// One state of the machine: its outgoing transitions and optional
/// error and success hooks.
pub struct StateNode<S: Identifier, E: Identifier, K: Identifier> {
    pub(crate) transitions: HashMap<E, Transition<S, E, K>>,
    /// Events in the order they were first registered.
    order: Vec<E>,
    /// Events registered more than once on this node.
    pub(crate) duplicates: Vec<E>,
    pub(crate) on_error: Option<Arc<dyn ErrorHook<S, E, K>>>,
    pub(crate) on_success: Option<Arc<dyn SuccessHook<S, E, K>>>,
}

impl<S: Identifier, E: Identifier, K: Identifier> Default for StateNode<S, E, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Identifier, E: Identifier, K: Identifier> StateNode<S, E, K> {
    pub fn new() -> Self {
        Self {
            transitions: HashMap::new(),
            order: Vec::new(),
            duplicates: Vec::new(),
            on_error: None,
            on_success: None,
        }
    }

    /// React to `event` with `transition`.
    pub fn on(mut self, event: E, transition: Transition<S, E, K>) -> Self {
        if self.transitions.contains_key(&event) {
            self.duplicates.push(event.clone());
        } else {
            self.order.push(event.clone());
        }
        self.transitions.insert(event, transition);
        self
    }

    pub fn on_error<F>(self, hook: F) -> Self
    where
        F: Fn(&Machine<S, E, K>, &S, &S, &RoutedError) + Send + Sync + 'static,
    {
        self.on_error_with(hook)
    }

    pub fn on_error_with(mut self, hook: impl ErrorHook<S, E, K> + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn on_success<F>(self, hook: F) -> Self
    where
        F: Fn(&Machine<S, E, K>, &S, &S, TransitionEvent) + Send + Sync + 'static,
    {
        self.on_success_with(hook)
    }

    pub fn on_success_with(mut self, hook: impl SuccessHook<S, E, K> + 'static) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    pub fn transition(&self, event: &E) -> Option<&Transition<S, E, K>> {
        self.transitions.get(event)
    }

    /// Events with a transition, in registration order.
    pub fn events(&self) -> impl Iterator<Item = &E> {
        self.order.iter()
    }

    /// Transitions in registration order.
    pub(crate) fn ordered(&self) -> impl Iterator<Item = &Transition<S, E, K>> {
        self.order
            .iter()
            .filter_map(|event| self.transitions.get(event))
    }

    pub fn has_error_hook(&self) -> bool {
        self.on_error.is_some()
    }

    pub fn has_success_hook(&self) -> bool {
        self.on_success.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContextUpdate;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum TestState {
        Idle,
        Busy,
    }

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum TestEvent {
        Start,
        Stop,
    }

    type Node = StateNode<TestState, TestEvent, &'static str>;

    #[test]
    fn node_looks_up_transitions_by_event() {
        let node: Node = StateNode::new()
            .on(TestEvent::Start, Transition::to(TestState::Busy))
            .on(TestEvent::Stop, Transition::to(TestState::Idle));

        assert_eq!(
            node.transition(&TestEvent::Start).map(Transition::target),
            Some(&TestState::Busy)
        );
        assert_eq!(
            node.events().copied().collect::<Vec<_>>(),
            vec![TestEvent::Start, TestEvent::Stop]
        );
        assert!(node.duplicates.is_empty());
    }

    #[test]
    fn node_records_duplicate_events() {
        let node: Node = StateNode::new()
            .on(TestEvent::Start, Transition::to(TestState::Busy))
            .on(TestEvent::Start, Transition::to(TestState::Idle));

        assert_eq!(node.duplicates, vec![TestEvent::Start]);
        assert_eq!(node.events().count(), 1);
        assert_eq!(
            node.transition(&TestEvent::Start).map(Transition::target),
            Some(&TestState::Idle)
        );
    }

    #[test]
    fn builder_methods_attach_hooks() {
        let transition: Transition<TestState, TestEvent, &'static str> =
            Transition::to(TestState::Busy)
                .guard(|_, _, _| true)
                .entry(|_, _, _, _| {})
                .exit(|_, _, _, _| {})
                .update(|_, _, _, _| Ok(ContextUpdate::new()));

        assert!(transition.has_guard());
        assert!(transition.entry.is_some());
        assert!(transition.exit.is_some());
        assert!(transition.update.is_some());

        let copy = transition.clone();
        assert_eq!(copy.target(), &TestState::Busy);
    }

    #[test]
    fn node_hooks_are_optional() {
        let node: Node = StateNode::new();
        assert!(!node.has_error_hook());
        assert!(!node.has_success_hook());

        let node = node
            .on_error(|_, _, _, _| {})
            .on_success(|_, _, _, _| {});
        assert!(node.has_error_hook());
        assert!(node.has_success_hook());
    }
}

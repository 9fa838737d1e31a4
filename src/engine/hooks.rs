//! Hook capabilities attached to transitions and state nodes.
//!
//! Each hook role is a trait with a single method. Closures with the
//! matching signature implement the trait automatically; named types can
//! implement it directly.
//!
//! Guards, entry/exit hooks and context updaters run while the machine's
//! lock is held. They see the machine through a [`HookScope`], which
//! exposes the context but not the machine itself, so they cannot send
//! events back into it. Error and success hooks run after the lock is
//! released and receive the [`Machine`].

use super::error::{MachineError, RoutedError};
use super::machine::Machine;
use crate::core::{ContextStore, ContextUpdate, ContextValue, Identifier, Names, StoreError};
use std::error::Error as StdError;

/// Which lifecycle point a hook was invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEvent {
    Entry,
    Exit,
    Success,
}

/// A hook's window onto the machine while a transition is in flight.
pub struct HookScope<'a, S: Identifier, E: Identifier, K: Identifier> {
    machine_id: &'a str,
    names: &'a Names<S, E, K>,
    context: &'a mut ContextStore<K>,
}

impl<'a, S: Identifier, E: Identifier, K: Identifier> HookScope<'a, S, E, K> {
    pub(crate) fn new(
        machine_id: &'a str,
        names: &'a Names<S, E, K>,
        context: &'a mut ContextStore<K>,
    ) -> Self {
        Self {
            machine_id,
            names,
            context,
        }
    }

    pub fn machine_id(&self) -> &str {
        self.machine_id
    }

    /// Current value of a declared key.
    pub fn get(&self, key: &K) -> Result<&ContextValue, MachineError> {
        self.context
            .get(key)
            .ok_or_else(|| misuse(self.machine_id, self.names, StoreError::Undeclared(key.clone())))
    }

    /// Overwrite a mutable key. Protected keys are refused here too; they
    /// change only through the transition's context updater.
    pub fn set(&mut self, key: &K, value: impl Into<ContextValue>) -> Result<(), MachineError> {
        self.context
            .set(key, value.into())
            .map_err(|err| misuse(self.machine_id, self.names, err))
    }

    pub fn state_name(&self, state: &S) -> String {
        self.names.state(state)
    }

    pub fn event_name(&self, event: &E) -> String {
        self.names.event(event)
    }

    pub fn context_key_name(&self, key: &K) -> String {
        self.names.key(key)
    }
}

/// Turn a refused store access into a programmer error and log it.
pub(crate) fn misuse<S: Identifier, E: Identifier, K: Identifier>(
    machine_id: &str,
    names: &Names<S, E, K>,
    err: StoreError<K>,
) -> MachineError {
    let err = match err {
        StoreError::Undeclared(key) => MachineError::UnknownContextKey {
            machine: machine_id.to_string(),
            key: names.key(&key),
        },
        StoreError::Protected(key) => MachineError::ProtectedContextKey {
            machine: machine_id.to_string(),
            key: names.key(&key),
        },
    };
    tracing::error!(machine = %machine_id, error = %err, "context misuse");
    err
}

/// Decides whether a transition may commit.
pub trait Guard<S: Identifier, E: Identifier, K: Identifier>: Send + Sync {
    fn check(&self, scope: &HookScope<'_, S, E, K>, current: &S, next: &S) -> bool;
}

impl<S, E, K, F> Guard<S, E, K> for F
where
    S: Identifier,
    E: Identifier,
    K: Identifier,
    F: Fn(&HookScope<'_, S, E, K>, &S, &S) -> bool + Send + Sync,
{
    fn check(&self, scope: &HookScope<'_, S, E, K>, current: &S, next: &S) -> bool {
        self(scope, current, next)
    }
}

/// Entry or exit hook. Only runs when the transition changes state.
pub trait TransitionHook<S: Identifier, E: Identifier, K: Identifier>: Send + Sync {
    fn run(
        &self,
        scope: &mut HookScope<'_, S, E, K>,
        current: &S,
        next: &S,
        event: TransitionEvent,
    );
}

impl<S, E, K, F> TransitionHook<S, E, K> for F
where
    S: Identifier,
    E: Identifier,
    K: Identifier,
    F: Fn(&mut HookScope<'_, S, E, K>, &S, &S, TransitionEvent) + Send + Sync,
{
    fn run(
        &self,
        scope: &mut HookScope<'_, S, E, K>,
        current: &S,
        next: &S,
        event: TransitionEvent,
    ) {
        self(scope, current, next, event)
    }
}

/// Result of a context updater.
pub type UpdateResult<K> = Result<ContextUpdate<K>, Box<dyn StdError + Send + Sync>>;

/// Computes context writes for a transition. The only writer of protected
/// keys.
pub trait ContextUpdater<S: Identifier, E: Identifier, K: Identifier>: Send + Sync {
    fn update(&self, scope: &HookScope<'_, S, E, K>, current: &S, next: &S, cause: &E)
        -> UpdateResult<K>;
}

impl<S, E, K, F> ContextUpdater<S, E, K> for F
where
    S: Identifier,
    E: Identifier,
    K: Identifier,
    F: Fn(&HookScope<'_, S, E, K>, &S, &S, &E) -> UpdateResult<K> + Send + Sync,
{
    fn update(
        &self,
        scope: &HookScope<'_, S, E, K>,
        current: &S,
        next: &S,
        cause: &E,
    ) -> UpdateResult<K> {
        self(scope, current, next, cause)
    }
}

/// Receives routed errors, per state or machine-wide.
pub trait ErrorHook<S: Identifier, E: Identifier, K: Identifier>: Send + Sync {
    fn on_error(&self, machine: &Machine<S, E, K>, current: &S, next: &S, error: &RoutedError);
}

impl<S, E, K, F> ErrorHook<S, E, K> for F
where
    S: Identifier,
    E: Identifier,
    K: Identifier,
    F: Fn(&Machine<S, E, K>, &S, &S, &RoutedError) + Send + Sync,
{
    fn on_error(&self, machine: &Machine<S, E, K>, current: &S, next: &S, error: &RoutedError) {
        self(machine, current, next, error)
    }
}

/// Invoked by `Machine::success` for the current state.
pub trait SuccessHook<S: Identifier, E: Identifier, K: Identifier>: Send + Sync {
    fn on_success(&self, machine: &Machine<S, E, K>, current: &S, next: &S, event: TransitionEvent);
}

impl<S, E, K, F> SuccessHook<S, E, K> for F
where
    S: Identifier,
    E: Identifier,
    K: Identifier,
    F: Fn(&Machine<S, E, K>, &S, &S, TransitionEvent) + Send + Sync,
{
    fn on_success(&self, machine: &Machine<S, E, K>, current: &S, next: &S, event: TransitionEvent) {
        self(machine, current, next, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContextDecl;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum Key {
        Ready,
        Count,
        Missing,
    }

    type Scope<'a> = HookScope<'a, u8, u8, Key>;

    fn store() -> ContextStore<Key> {
        ContextStore::from_decls(vec![
            ContextDecl::mutable(Key::Ready, false),
            ContextDecl::protected(Key::Count, 0),
        ])
    }

    #[test]
    fn scope_reads_and_writes_mutable_keys() {
        let names = Names::default();
        let mut store = store();
        let mut scope: Scope<'_> = HookScope::new("m", &names, &mut store);

        scope.set(&Key::Ready, true).unwrap();
        assert_eq!(scope.get(&Key::Ready).unwrap().as_bool(), Some(true));
        assert_eq!(scope.machine_id(), "m");
    }

    #[test]
    fn scope_refuses_protected_and_undeclared_keys() {
        let names = Names::default();
        let mut store = store();
        let mut scope: Scope<'_> = HookScope::new("m", &names, &mut store);

        assert!(matches!(
            scope.set(&Key::Count, 3),
            Err(MachineError::ProtectedContextKey { .. })
        ));
        assert!(matches!(
            scope.get(&Key::Missing),
            Err(MachineError::UnknownContextKey { .. })
        ));
        assert_eq!(scope.get(&Key::Count).unwrap().as_int(), Some(0));
    }

    #[test]
    fn closures_are_guards() {
        let names = Names::default();
        let mut store = store();
        let scope: Scope<'_> = HookScope::new("m", &names, &mut store);

        let ready = |scope: &Scope<'_>, _: &u8, _: &u8| {
            scope
                .get(&Key::Ready)
                .ok()
                .and_then(ContextValue::as_bool)
                .unwrap_or(false)
        };
        assert!(!Guard::check(&ready, &scope, &0, &1));
    }

    struct Increment;

    impl ContextUpdater<u8, u8, Key> for Increment {
        fn update(&self, scope: &Scope<'_>, _: &u8, _: &u8, _: &u8) -> UpdateResult<Key> {
            let count = scope.get(&Key::Count)?.as_int().unwrap_or(0);
            Ok(ContextUpdate::single(Key::Count, count + 1))
        }
    }

    #[test]
    fn named_types_are_updaters() {
        let names = Names::default();
        let mut store = store();
        let scope: Scope<'_> = HookScope::new("m", &names, &mut store);

        let update = Increment.update(&scope, &0, &0, &0).unwrap();
        assert_eq!(update, ContextUpdate::single(Key::Count, 1));
    }
}

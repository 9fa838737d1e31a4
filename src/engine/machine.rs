//! The machine: registry, context, current state and notifications behind
//! one lock.

use super::error::{BoxError, MachineError, RoutedError};
use super::hooks::{misuse, ErrorHook, HookScope, TransitionEvent};
use super::notify::{Delivery, Notifier, StateChange, Subscription};
use super::transition::StateNode;
use crate::builder::{BuildError, MachineBuilder};
use crate::config::MachineConfig;
use crate::core::{
    ContextDecl, ContextStore, ContextValue, Identifier, NameTable, Names, StoreError,
};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Everything a transition mutates. Guarded by a single lock so dispatches
/// are linearizable.
struct Inner<S: Identifier, K: Identifier> {
    state: S,
    context: ContextStore<K>,
    stopped: bool,
    seq: u64,
}

/// An error waiting to be handed to its hook once the lock is released.
struct Pending<S: Identifier, E: Identifier, K: Identifier> {
    hook: Arc<dyn ErrorHook<S, E, K>>,
    state: S,
    error: RoutedError,
}

/// A finite state machine instance.
///
/// The shape (states, events, context keys) is fixed at construction. Only
/// the current state, context values and the notification stream change
/// afterwards. Share it across threads with `Arc<Machine<..>>`.
///
/// # Locking
///
/// `send_event` and `set` take the write lock; `get` and `current_state`
/// take the read lock, so readers never observe a transition half applied.
/// Guard, entry, exit and update hooks run under the write lock. Error and
/// success hooks run after it is released and may send events.
///
/// With [`NotifyPolicy::Block`](crate::config::NotifyPolicy::Block) the
/// state change is published while the write lock is still held. Delivery
/// order therefore equals commit order, and a full channel stalls every
/// other caller until a consumer drains it.
pub struct Machine<S: Identifier, E: Identifier, K: Identifier> {
    id: String,
    config: MachineConfig,
    events: HashSet<E>,
    states: HashMap<S, StateNode<S, E, K>>,
    error_hook: Arc<dyn ErrorHook<S, E, K>>,
    names: Names<S, E, K>,
    notifier: Notifier<S, E>,
    inner: RwLock<Inner<S, K>>,
}

impl<S: Identifier, E: Identifier, K: Identifier> Machine<S, E, K> {
    /// Construct a machine in one call.
    ///
    /// Every problem with the definition (duplicate events, keys or states,
    /// an initial state outside the registry, transitions on unregistered
    /// events or towards unknown states, a zero capacity) is reported at
    /// once in [`BuildError::InvalidDefinition`].
    pub fn new(
        id: impl Into<String>,
        channel_capacity: usize,
        initial: S,
        context: Vec<ContextDecl<K>>,
        events: Vec<E>,
        states: Vec<(S, StateNode<S, E, K>)>,
        error_hook: impl ErrorHook<S, E, K> + 'static,
    ) -> Result<Self, BuildError> {
        states
            .into_iter()
            .fold(
                MachineBuilder::new(id)
                    .channel_capacity(channel_capacity)
                    .initial(initial)
                    .contexts(context)
                    .events(events)
                    .on_error_with(error_hook),
                |builder, (state, node)| builder.state(state, node),
            )
            .build()
    }

    /// Assemble a machine from an already validated definition.
    pub(crate) fn from_parts(
        config: MachineConfig,
        initial: S,
        context: Vec<ContextDecl<K>>,
        events: Vec<E>,
        states: Vec<(S, StateNode<S, E, K>)>,
        error_hook: Arc<dyn ErrorHook<S, E, K>>,
    ) -> Self {
        let notifier = Notifier::new(config.channel_capacity, config.notify_policy);
        debug!(machine = %config.id, initial = ?initial, "machine created");
        Self {
            id: config.id.clone(),
            config,
            events: events.into_iter().collect(),
            states: states.into_iter().collect(),
            error_hook,
            names: Names::default(),
            notifier,
            inner: RwLock::new(Inner {
                state: initial,
                context: ContextStore::from_decls(context),
                stopped: false,
                seq: 0,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn current_state(&self) -> S {
        self.inner.read().state.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.read().stopped
    }

    /// Handle for reading committed transitions.
    pub fn subscribe(&self) -> Subscription<S, E> {
        self.notifier.subscribe()
    }

    /// State changes discarded under `NotifyPolicy::DropWhenFull`.
    pub fn dropped_changes(&self) -> u64 {
        self.notifier.dropped()
    }

    /// Submit an event.
    ///
    /// Returns `Ok(true)` when a transition committed and `Ok(false)` when
    /// the event has no transition in the current state, its guard
    /// rejected it, or the machine is stopped. An unregistered event is a
    /// programmer error: nothing changes, the error hook is notified and
    /// `MachineError::UnknownEvent` is returned.
    ///
    /// A context updater that writes an undeclared key does not stop the
    /// commit, but none of its writes apply and
    /// `MachineError::UnknownContextKey` is returned.
    ///
    /// Must not be called from guard, entry, exit or update hooks (they do
    /// not have access to the machine). Error and success hooks may call it.
    pub fn send_event(&self, event: E) -> Result<bool, MachineError> {
        if !self.events.contains(&event) {
            let name = self.names.event(&event);
            let err = MachineError::UnknownEvent {
                machine: self.id.clone(),
                event: name.clone(),
            };
            error!(machine = %self.id, event = %name, "unregistered event submitted");
            let state = self.current_state();
            self.route(state, RoutedError::UnknownEvent { event: name });
            return Err(err);
        }

        let mut pending = Vec::new();
        let outcome = self.dispatch(event, &mut pending);
        self.deliver(pending);
        outcome
    }

    fn dispatch(
        &self,
        event: E,
        pending: &mut Vec<Pending<S, E, K>>,
    ) -> Result<bool, MachineError> {
        let mut lock = self.inner.write();
        let inner = &mut *lock;

        if inner.stopped {
            debug!(machine = %self.id, event = ?event, "event ignored after stop");
            return Ok(false);
        }

        let current = inner.state.clone();
        let Some(transition) = self
            .states
            .get(&current)
            .and_then(|node| node.transition(&event))
        else {
            trace!(machine = %self.id, state = ?current, event = ?event, "no transition");
            if self.config.report_rejections {
                pending.push(self.pending(
                    &current,
                    RoutedError::NoTransition {
                        event: self.names.event(&event),
                        state: self.names.state(&current),
                    },
                ));
            }
            return Ok(false);
        };
        let target = transition.target.clone();

        let mut scope = HookScope::new(&self.id, &self.names, &mut inner.context);

        if let Some(guard) = &transition.guard {
            if !guard.check(&scope, &current, &target) {
                trace!(machine = %self.id, from = ?current, to = ?target, "guard rejected");
                if self.config.report_rejections {
                    pending.push(self.pending(
                        &current,
                        RoutedError::GuardRejected {
                            event: self.names.event(&event),
                            from: self.names.state(&current),
                            to: self.names.state(&target),
                        },
                    ));
                }
                return Ok(false);
            }
        }

        // Entry and exit only fire on an actual change of state.
        if current != target {
            if let Some(exit) = &transition.exit {
                exit.run(&mut scope, &current, &target, TransitionEvent::Exit);
            }
            if let Some(entry) = &transition.entry {
                entry.run(&mut scope, &current, &target, TransitionEvent::Entry);
            }
        }

        let update = transition
            .update
            .as_ref()
            .map(|updater| updater.update(&scope, &current, &target, &event));

        let mut outcome = Ok(true);
        match update {
            Some(Ok(update)) => {
                if let Err(err) = inner.context.apply(update) {
                    if let StoreError::Undeclared(key) = &err {
                        pending.push(self.pending(
                            &current,
                            RoutedError::UnknownContextKey {
                                key: self.names.key(key),
                            },
                        ));
                    }
                    outcome = Err(misuse(&self.id, &self.names, err));
                }
            }
            Some(Err(err)) => {
                warn!(machine = %self.id, from = ?current, to = ?target, error = %err, "context update failed");
                pending.push(self.pending(&current, RoutedError::context_update(err)));
            }
            None => {}
        }

        inner.state = target.clone();
        inner.seq += 1;
        debug!(machine = %self.id, from = ?current, to = ?target, event = ?event, seq = inner.seq, "transition committed");

        let change = StateChange {
            from: current,
            to: target,
            cause: Some(event),
            is_last: false,
            seq: inner.seq,
            committed_at: Utc::now(),
        };
        if self.notifier.publish(change) == Delivery::Dropped {
            warn!(machine = %self.id, seq = inner.seq, "notification channel full, state change dropped");
        }

        outcome
    }

    /// Read a context value.
    ///
    /// An undeclared key is a programmer error: the error hook is notified
    /// and `MachineError::UnknownContextKey` is returned.
    pub fn get(&self, key: &K) -> Result<ContextValue, MachineError> {
        let inner = self.inner.read();
        if let Some(value) = inner.context.get(key) {
            return Ok(value.clone());
        }
        let state = inner.state.clone();
        drop(inner);

        self.route(
            state,
            RoutedError::UnknownContextKey {
                key: self.names.key(key),
            },
        );
        Err(misuse(
            &self.id,
            &self.names,
            StoreError::Undeclared(key.clone()),
        ))
    }

    /// Overwrite a mutable context key.
    ///
    /// Protected keys are refused with `MachineError::ProtectedContextKey`
    /// and keep their value. Undeclared keys are handled like in
    /// [`get`](Self::get).
    pub fn set(&self, key: &K, value: impl Into<ContextValue>) -> Result<(), MachineError> {
        let mut inner = self.inner.write();
        let Err(err) = inner.context.set(key, value.into()) else {
            return Ok(());
        };
        let state = inner.state.clone();
        drop(inner);

        if let StoreError::Undeclared(key) = &err {
            self.route(
                state,
                RoutedError::UnknownContextKey {
                    key: self.names.key(key),
                },
            );
        }
        Err(misuse(&self.id, &self.names, err))
    }

    /// Consistent copy of every context value.
    pub fn context_snapshot(&self) -> HashMap<K, ContextValue> {
        self.inner.read().context.snapshot()
    }

    /// Signal that the current state's work completed. Runs the state's
    /// success hook if it has one; never changes state by itself.
    pub fn success(&self) {
        let state = self.current_state();
        let hook = self
            .states
            .get(&state)
            .and_then(|node| node.on_success.clone());
        match hook {
            Some(hook) => hook.on_success(self, &state, &state, TransitionEvent::Success),
            None => trace!(machine = %self.id, state = ?state, "no success hook"),
        }
    }

    /// Report an error from business logic. Goes to the current state's
    /// error hook, else the machine-level one.
    pub fn error(&self, err: impl Into<BoxError>) {
        let state = self.current_state();
        self.route(state, RoutedError::external(err.into()));
    }

    /// Publish the terminal state change and stop accepting events.
    ///
    /// Later calls are no-ops. The terminal record is never dropped: under
    /// `NotifyPolicy::Block` it waits for room in the channel, under
    /// `NotifyPolicy::DropWhenFull` the oldest queued records are evicted
    /// (and counted as dropped) to make room.
    pub fn stop(&self) {
        let mut inner = self.inner.write();
        if inner.stopped {
            return;
        }
        inner.stopped = true;
        inner.seq += 1;
        debug!(machine = %self.id, state = ?inner.state, "machine stopped");

        let change = StateChange {
            from: inner.state.clone(),
            to: inner.state.clone(),
            cause: None,
            is_last: true,
            seq: inner.seq,
            committed_at: Utc::now(),
        };
        self.notifier.publish_terminal(change);
    }

    /// Distinct states reachable with one event from the current state, in
    /// the order their transitions were registered.
    pub fn next_states(&self) -> Vec<S> {
        let state = self.current_state();
        let mut targets: Vec<S> = Vec::new();
        if let Some(node) = self.states.get(&state) {
            for transition in node.ordered() {
                if !targets.contains(&transition.target) {
                    targets.push(transition.target.clone());
                }
            }
        }
        targets
    }

    /// Events with a transition in the current state, in registration
    /// order.
    pub fn available_events(&self) -> Vec<E> {
        let state = self.current_state();
        self.states
            .get(&state)
            .map(|node| node.events().cloned().collect())
            .unwrap_or_default()
    }

    /// Attach state names for diagnostics. Only the first call has effect.
    pub fn add_state_names(&self, names: NameTable<S>) {
        if !self.names.set_states(names) {
            debug!(machine = %self.id, "state names already attached");
        }
    }

    pub fn add_event_names(&self, names: NameTable<E>) {
        if !self.names.set_events(names) {
            debug!(machine = %self.id, "event names already attached");
        }
    }

    pub fn add_context_key_names(&self, names: NameTable<K>) {
        if !self.names.set_keys(names) {
            debug!(machine = %self.id, "context key names already attached");
        }
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

    fn error_hook_for(&self, state: &S) -> Arc<dyn ErrorHook<S, E, K>> {
        self.states
            .get(state)
            .and_then(|node| node.on_error.clone())
            .unwrap_or_else(|| Arc::clone(&self.error_hook))
    }

    fn pending(&self, state: &S, error: RoutedError) -> Pending<S, E, K> {
        Pending {
            hook: self.error_hook_for(state),
            state: state.clone(),
            error,
        }
    }

    fn route(&self, state: S, error: RoutedError) {
        let pending = self.pending(&state, error);
        self.deliver(vec![pending]);
    }

    /// Run error hooks. Called with no lock held.
    fn deliver(&self, pending: Vec<Pending<S, E, K>>) {
        for Pending { hook, state, error } in pending {
            debug!(machine = %self.id, state = ?state, kind = ?error.kind(), "routing error");
            hook.on_error(self, &state, &state, &error);
        }
    }
}

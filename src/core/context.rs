//! Keyed auxiliary data owned by a machine.
//!
//! Every key is declared up front with an initial value and a mutability
//! flag. Mutable keys may be overwritten by callers; protected keys only
//! change through a transition's context updater.

use super::ids::Identifier;
use super::value::ContextValue;
use std::collections::HashMap;

/// Declaration of one context key.
///
/// # Example
///
/// ```rust
/// use latch::core::ContextDecl;
///
/// let ready = ContextDecl::mutable("ready", false);
/// let counter = ContextDecl::protected("counter", 0);
/// assert!(ready.mutable);
/// assert!(!counter.mutable);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ContextDecl<K> {
    pub key: K,
    /// `true`: writable with `Machine::set`. `false`: writable only by a
    /// transition's context updater.
    pub mutable: bool,
    pub initial: ContextValue,
}

impl<K> ContextDecl<K> {
    pub fn new(key: K, mutable: bool, initial: impl Into<ContextValue>) -> Self {
        Self {
            key,
            mutable,
            initial: initial.into(),
        }
    }

    /// Declare a key callers may overwrite directly.
    pub fn mutable(key: K, initial: impl Into<ContextValue>) -> Self {
        Self::new(key, true, initial)
    }

    /// Declare a key only transition updaters may change.
    pub fn protected(key: K, initial: impl Into<ContextValue>) -> Self {
        Self::new(key, false, initial)
    }
}

/// Set of key/value writes returned by a context updater.
///
/// Writes apply in insertion order, so a key written twice keeps the last
/// value.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextUpdate<K> {
    writes: Vec<(K, ContextValue)>,
}

impl<K> Default for ContextUpdate<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> ContextUpdate<K> {
    pub fn new() -> Self {
        Self { writes: Vec::new() }
    }

    /// An update touching a single key.
    pub fn single(key: K, value: impl Into<ContextValue>) -> Self {
        Self::new().set(key, value)
    }

    pub fn set(mut self, key: K, value: impl Into<ContextValue>) -> Self {
        self.writes.push((key, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, ContextValue)> {
        self.writes.iter()
    }
}

impl<K> FromIterator<(K, ContextValue)> for ContextUpdate<K> {
    fn from_iter<I: IntoIterator<Item = (K, ContextValue)>>(iter: I) -> Self {
        Self {
            writes: iter.into_iter().collect(),
        }
    }
}

/// Why a store write was refused.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum StoreError<K> {
    Undeclared(K),
    Protected(K),
}

#[derive(Clone, Debug)]
struct ContextEntry {
    mutable: bool,
    value: ContextValue,
}

/// The machine's context. Never handed out; all access goes through the
/// machine's lock.
#[derive(Debug)]
pub(crate) struct ContextStore<K: Identifier> {
    entries: HashMap<K, ContextEntry>,
}

impl<K: Identifier> ContextStore<K> {
    /// Build from declarations already checked for duplicates.
    pub(crate) fn from_decls(decls: Vec<ContextDecl<K>>) -> Self {
        let entries = decls
            .into_iter()
            .map(|decl| {
                (
                    decl.key,
                    ContextEntry {
                        mutable: decl.mutable,
                        value: decl.initial,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub(crate) fn get(&self, key: &K) -> Option<&ContextValue> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub(crate) fn is_mutable(&self, key: &K) -> Option<bool> {
        self.entries.get(key).map(|entry| entry.mutable)
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// External write; refused for protected keys.
    pub(crate) fn set(&mut self, key: &K, value: ContextValue) -> Result<(), StoreError<K>> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| StoreError::Undeclared(key.clone()))?;
        if !entry.mutable {
            return Err(StoreError::Protected(key.clone()));
        }
        entry.value = value;
        Ok(())
    }

    /// Transition write; bypasses the mutability flag.
    pub(crate) fn set_from_transition(
        &mut self,
        key: &K,
        value: ContextValue,
    ) -> Result<(), StoreError<K>> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| StoreError::Undeclared(key.clone()))?;
        entry.value = value;
        Ok(())
    }

    /// Apply a whole update or nothing. Returns the first undeclared key.
    pub(crate) fn apply(&mut self, update: ContextUpdate<K>) -> Result<(), StoreError<K>> {
        if let Some((key, _)) = update.iter().find(|(key, _)| !self.contains(key)) {
            return Err(StoreError::Undeclared(key.clone()));
        }
        for (key, value) in update.writes {
            self.set_from_transition(&key, value)?;
        }
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> HashMap<K, ContextValue> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }
}

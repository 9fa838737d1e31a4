//! Optional human-readable names for diagnostics.
//!
//! Names have no behavioral effect. Each table attaches once; later
//! attempts are ignored.

use super::ids::Identifier;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Map from identifier to display name.
pub type NameTable<T> = HashMap<T, String>;

/// Attach-once name tables for states, events and context keys.
#[derive(Debug)]
pub struct Names<S: Identifier, E: Identifier, K: Identifier> {
    states: OnceLock<NameTable<S>>,
    events: OnceLock<NameTable<E>>,
    keys: OnceLock<NameTable<K>>,
}

impl<S: Identifier, E: Identifier, K: Identifier> Default for Names<S, E, K> {
    fn default() -> Self {
        Self {
            states: OnceLock::new(),
            events: OnceLock::new(),
            keys: OnceLock::new(),
        }
    }
}

fn render<T: Identifier>(table: &OnceLock<NameTable<T>>, id: &T) -> String {
    table
        .get()
        .and_then(|names| names.get(id))
        .cloned()
        .unwrap_or_else(|| format!("{id:?}"))
}

impl<S: Identifier, E: Identifier, K: Identifier> Names<S, E, K> {
    /// Returns `false` if a table was already attached.
    pub fn set_states(&self, names: NameTable<S>) -> bool {
        self.states.set(names).is_ok()
    }

    pub fn set_events(&self, names: NameTable<E>) -> bool {
        self.events.set(names).is_ok()
    }

    pub fn set_keys(&self, names: NameTable<K>) -> bool {
        self.keys.set(names).is_ok()
    }

    pub fn state(&self, state: &S) -> String {
        render(&self.states, state)
    }

    pub fn event(&self, event: &E) -> String {
        render(&self.events, event)
    }

    pub fn key(&self, key: &K) -> String {
        render(&self.keys, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestNames = Names<u8, u8, u8>;

    #[test]
    fn falls_back_to_debug() {
        let names = TestNames::default();
        assert_eq!(names.state(&3), "3");
        assert_eq!(names.event(&4), "4");
        assert_eq!(names.key(&5), "5");
    }

    #[test]
    fn first_table_wins() {
        let names = TestNames::default();
        assert!(names.set_states(NameTable::from([(0, "Inactive".to_string())])));
        assert!(!names.set_states(NameTable::from([(0, "Other".to_string())])));
        assert_eq!(names.state(&0), "Inactive");
        assert_eq!(names.state(&1), "1");
    }

    #[test]
    fn tables_are_independent() {
        let names = TestNames::default();
        names.set_events(NameTable::from([(0, "Activate".to_string())]));
        assert_eq!(names.event(&0), "Activate");
        assert_eq!(names.state(&0), "0");
        assert_eq!(names.key(&0), "0");
    }
}

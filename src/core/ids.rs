//! Identifier bound shared by states, events and context keys.
//!
//! The engine never looks inside an identifier. It only compares, hashes,
//! clones and renders them, so any small value type qualifies.

use std::fmt::Debug;
use std::hash::Hash;

/// Bound for state, event and context-key identifiers.
///
/// Implemented automatically for every type that satisfies the bound.
///
/// # Required Traits
///
/// - `Clone`: identifiers are copied into transition records
/// - `Eq` + `Hash`: identifiers key the registry, event set and context store
/// - `Debug`: identifiers without a registered name render through `Debug`
/// - `Send` + `Sync`: machines are shared across threads
///
/// # Example
///
/// ```rust
/// use latch::core::Identifier;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Door {
///     Open,
///     Closed,
/// }
///
/// fn assert_identifier<T: Identifier>() {}
/// assert_identifier::<Door>();
/// assert_identifier::<String>();
/// ```
pub trait Identifier: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> Identifier for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum TestState {
        Idle,
        Running,
    }

    fn dedup<T: Identifier>(items: &[T]) -> usize {
        items.iter().cloned().collect::<HashSet<_>>().len()
    }

    #[test]
    fn enums_are_identifiers() {
        assert_eq!(
            dedup(&[TestState::Idle, TestState::Running, TestState::Idle]),
            2
        );
    }

    #[test]
    fn strings_and_integers_are_identifiers() {
        assert_eq!(dedup(&["a".to_string(), "a".to_string()]), 1);
        assert_eq!(dedup(&[1u32, 2, 3]), 3);
    }
}

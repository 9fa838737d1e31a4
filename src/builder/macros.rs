//! Macros for declaring state, event and context-key enums.

/// Declare a fieldless enum usable as a state, event or context key.
///
/// Derives `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Debug`,
/// `Serialize` and `Deserialize`, and adds:
/// - `ALL`: every variant in declaration order
/// - `name()`: the variant name
/// - `name_table()`: a [`NameTable`](crate::core::NameTable) for the
///   machine's debug names
///
/// # Example
///
/// ```
/// use latch::identifiers;
///
/// identifiers! {
///     pub enum Phase {
///         Idle,
///         Running,
///     }
/// }
///
/// assert_eq!(Phase::ALL, &[Phase::Idle, Phase::Running]);
/// assert_eq!(Phase::Running.name(), "Running");
/// assert_eq!(Phase::name_table()[&Phase::Idle], "Idle");
/// ```
#[macro_export]
macro_rules! identifiers {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Debug,
            serde::Serialize,
            serde::Deserialize
        )]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),+
        }

        #[allow(dead_code)]
        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }

            pub fn name_table() -> $crate::core::NameTable<$name> {
                Self::ALL
                    .iter()
                    .map(|id| (*id, id.name().to_string()))
                    .collect()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    identifiers! {
        enum TestState {
            Initial,
            Processing,
            Complete,
        }
    }

    #[test]
    fn identifiers_macro_generates_names() {
        assert_eq!(TestState::Initial.name(), "Initial");
        assert_eq!(TestState::ALL.len(), 3);

        let names = TestState::name_table();
        assert_eq!(names.len(), 3);
        assert_eq!(names[&TestState::Complete], "Complete");
    }

    #[test]
    fn identifiers_supports_visibility() {
        // The macro should work with pub visibility
        identifiers! {
            pub enum PublicEvent {
                Go,
                Halt,
            }
        }

        assert_eq!(PublicEvent::Halt.name(), "Halt");
    }

    #[test]
    fn identifiers_round_trip_through_serde() {
        let json = serde_json::to_string(&TestState::Processing).unwrap();
        assert_eq!(json, "\"Processing\"");
        let back: TestState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TestState::Processing);
    }
}

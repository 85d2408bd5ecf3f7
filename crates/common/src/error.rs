//! Message-built errors and the `.context()` helper each crate derives for
//! its own error type.

/// Error types that can be built from a plain message.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// `"{context}: {source}"` as an error of type `E`.
pub fn wrap<E: FromMessage>(context: &str, source: impl std::fmt::Display) -> E {
    E::from_message(format!("{context}: {source}"))
}

/// Define a `Context` trait giving `Result` and `Option` the methods
/// `.context()` and `.with_context()`, producing the invoking module's
/// `Error` (which must implement [`FromMessage`]) wrapped in its `Result`.
///
/// ```ignore
/// // crates/ledger/src/error.rs
/// tally_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T>: Sized {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T>;

            fn context(self, context: impl Into<String>) -> Result<T> {
                let context = context.into();
                self.with_context(|| context)
            }
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T> {
                self.map_err(|source| $crate::error::wrap::<Error>(&f().into(), source))
            }
        }

        impl<T> Context<T> for Option<T> {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

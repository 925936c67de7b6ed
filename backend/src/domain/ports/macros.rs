//! `define_port_error!`: the error enum every driven port returns.
//!
//! Each enum names its store once. The macro supplies the `Connection` and
//! `Query` variants every adapter can hit, snake-case constructors for all
//! variants, and the conversion into [`DomainError`]: connection failures
//! become `service_unavailable`, the rest become `internal`. Variants a
//! service must react to (duplicate codes, owned courses) are matched before
//! the conversion is reached.
//!
//! [`DomainError`]: crate::domain::DomainError

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident for $store:literal {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:literal
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            /// The store could not be reached.
            #[error("{store} connection failed: {message}", store = $store)]
            Connection { message: String },
            /// A query or mutation failed while executing.
            #[error("{store} query failed: {message}", store = $store)]
            Query { message: String },
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            /// Store label used in logs and mapped messages.
            pub const STORE: &'static str = $store;

            pub fn connection(message: impl Into<String>) -> Self {
                Self::Connection { message: message.into() }
            }

            pub fn query(message: impl Into<String>) -> Self {
                Self::Query { message: message.into() }
            }

            /// True when the store was unreachable rather than failing a
            /// statement.
            pub fn is_unavailable(&self) -> bool {
                matches!(self, Self::Connection { .. })
            }

            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }

        impl From<$name> for $crate::domain::DomainError {
            fn from(error: $name) -> Self {
                ::tracing::warn!(%error, store = $store, "store call failed");
                if error.is_unavailable() {
                    Self::service_unavailable(format!("{} unavailable: {error}", $store))
                } else {
                    Self::internal(format!("{} error: {error}", $store))
                }
            }
        }
    };
}

pub(crate) use define_port_error;

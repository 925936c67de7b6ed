//! Actix middleware shared by every registrar route.

pub mod trace;

pub use trace::Trace;

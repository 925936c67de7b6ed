//! Correlation identifier carried by every registrar request.
//!
//! The identifier sits in task-local storage for the lifetime of a request,
//! so a [`DomainError`](crate::domain::DomainError) raised deep inside an
//! admission or a grade append picks it up without extra parameters.
//! Spawned tasks do not inherit it; wrap them in [`TraceId::scope`].

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use tokio::task_local;
use uuid::Uuid;

task_local! {
    static CURRENT: TraceId;
}

/// Request correlation identifier.
///
/// # Examples
/// ```
/// use registrar::domain::TraceId;
///
/// let supplied = TraceId::accept(Some("not-a-uuid"));
/// assert_ne!(supplied.to_string(), "not-a-uuid");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reuse a caller-supplied identifier when it is a UUID, otherwise mint
    /// a new one.
    #[must_use]
    pub fn accept(supplied: Option<&str>) -> Self {
        supplied
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or_else(Self::generate)
    }

    /// Identifier of the request being served, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT.try_with(|id| *id).ok()
    }

    /// Drive `fut` with `self` as the current identifier.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT.scope(self, fut).await
    }

    /// Run `f` with `self` as the current identifier.
    pub(crate) fn scope_sync<R>(self, f: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(self, f)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn scoped_identifier_is_visible() {
        let id = TraceId::generate();
        assert_eq!(id.scope(async { TraceId::current() }).await, Some(id));
        assert!(TraceId::current().is_none());
    }

    #[rstest]
    #[case(Some("6f1c2d7e-93a4-4f0b-8d3e-2b7a5c1e9f00"), true)]
    #[case(Some(" 6f1c2d7e-93a4-4f0b-8d3e-2b7a5c1e9f00 "), true)]
    #[case(Some("enroll-42"), false)]
    #[case(None, false)]
    fn accepts_only_uuid_headers(#[case] supplied: Option<&str>, #[case] kept: bool) {
        let id = TraceId::accept(supplied);
        let expected = supplied.map(str::trim);
        assert_eq!(Some(id.to_string().as_str()) == expected, kept);
    }
}

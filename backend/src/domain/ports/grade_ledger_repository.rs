//! Port abstraction for the append-only grade ledger.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{GradeEvent, NewGradeEvent, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by grade ledger adapters.
    pub enum GradeLedgerError for "grade ledger" {}
}

/// Append-only grade event storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GradeLedgerRepository: Send + Sync {
    /// Append an event and return it with its sequence number.
    async fn append(&self, event: NewGradeEvent) -> Result<GradeEvent, GradeLedgerError>;

    /// Every event for one (student, course) pair, oldest first.
    async fn history(
        &self,
        student_id: UserId,
        course_id: Uuid,
    ) -> Result<Vec<GradeEvent>, GradeLedgerError>;
}

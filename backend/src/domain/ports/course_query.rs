//! Driving port for the course catalogue.

use async_trait::async_trait;

use crate::domain::{CourseListing, Error};

/// Catalogue reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseQuery: Send + Sync {
    /// Courses matching `query` with live seat counts.
    async fn list_courses(&self, query: &str) -> Result<Vec<CourseListing>, Error>;
}

//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::domain::{GradeScale, NewAccount};
use crate::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) grade_scale: Arc<GradeScale>,
    pub(crate) admin: Option<NewAccount>,
}

impl ServerConfig {
    /// A configuration listening on `bind_addr` with the in-memory store and
    /// the standard grade scale.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            db_pool: None,
            grade_scale: Arc::new(GradeScale::standard()),
            admin: None,
        }
    }

    /// Attach a database connection pool for persistence adapters.
    ///
    /// When provided, every port is served by the Diesel adapters instead of
    /// the in-memory store.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Replace the letter-grade point table.
    #[must_use]
    pub fn with_grade_scale(mut self, scale: GradeScale) -> Self {
        self.grade_scale = Arc::new(scale);
        self
    }

    /// Ensure this administrator exists before the server accepts requests.
    #[must_use]
    pub fn with_admin(mut self, admin: Option<NewAccount>) -> Self {
        self.admin = admin;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

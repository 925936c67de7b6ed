//! PostgreSQL persistence adapters using Diesel.
//!
//! Each adapter implements one driven port on top of a shared [`DbPool`].
//! Row structs (`models.rs`) and table definitions (`schema.rs`) stay
//! private to this module; adapters convert rows through the validating
//! domain constructors and map every database failure into the port's error
//! type.
//!
//! ```ignore
//! use registrar::outbound::persistence::{DbPool, DieselCourseRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/registrar")).await?;
//! let courses = DieselCourseRepository::new(pool.clone());
//! ```

mod diesel_academic_record_repository;
mod diesel_basic_error_mapping;
mod diesel_course_repository;
mod diesel_enrollment_repository;
mod diesel_grade_ledger_repository;
mod diesel_session_store;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;
mod search;

pub use diesel_academic_record_repository::DieselAcademicRecordRepository;
pub use diesel_course_repository::DieselCourseRepository;
pub use diesel_enrollment_repository::DieselEnrollmentRepository;
pub use diesel_grade_ledger_repository::DieselGradeLedgerRepository;
pub use diesel_session_store::DieselSessionStore;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError, PoolStage};

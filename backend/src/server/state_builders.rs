//! Builders wiring driven adapters into domain services and HTTP state.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;

use crate::domain::ports::{
    AcademicRecordRepository, AccountService, CourseCommand, CourseQuery, CourseRepository,
    EnrollmentCommand, EnrollmentQuery, EnrollmentRepository, GradeCommand,
    GradeLedgerRepository, GradeQuery, SessionStore, UserDirectory, UserRepository,
};
use crate::domain::{
    AccountDirectoryService, AdminBootstrap, CourseCatalogueService, EnrollmentService, Error,
    GradeScale, GradingService, GradingStores, NewAccount,
};
use crate::inbound::http::state::HttpState;
use crate::outbound::memory::MemoryStore;
use crate::outbound::persistence::{
    DbPool, DieselAcademicRecordRepository, DieselCourseRepository, DieselEnrollmentRepository,
    DieselGradeLedgerRepository, DieselSessionStore, DieselUserRepository,
};

/// One handle per driven port.
pub struct Stores<U, S, C, E, L, A> {
    pub users: Arc<U>,
    pub sessions: Arc<S>,
    pub courses: Arc<C>,
    pub enrollments: Arc<E>,
    pub ledger: Arc<L>,
    pub records: Arc<A>,
}

/// Every port served by one in-memory store.
pub type MemoryStores =
    Stores<MemoryStore, MemoryStore, MemoryStore, MemoryStore, MemoryStore, MemoryStore>;

/// Every port served by its Diesel adapter over a shared pool.
pub type PostgresStores = Stores<
    DieselUserRepository,
    DieselSessionStore,
    DieselCourseRepository,
    DieselEnrollmentRepository,
    DieselGradeLedgerRepository,
    DieselAcademicRecordRepository,
>;

impl MemoryStores {
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: Arc::clone(&store),
            sessions: Arc::clone(&store),
            courses: Arc::clone(&store),
            enrollments: Arc::clone(&store),
            ledger: Arc::clone(&store),
            records: store,
        }
    }
}

impl PostgresStores {
    pub fn postgres(pool: &DbPool) -> Self {
        Self {
            users: Arc::new(DieselUserRepository::new(pool.clone())),
            sessions: Arc::new(DieselSessionStore::new(pool.clone())),
            courses: Arc::new(DieselCourseRepository::new(pool.clone())),
            enrollments: Arc::new(DieselEnrollmentRepository::new(pool.clone())),
            ledger: Arc::new(DieselGradeLedgerRepository::new(pool.clone())),
            records: Arc::new(DieselAcademicRecordRepository::new(pool.clone())),
        }
    }
}

impl<U, S, C, E, L, A> Stores<U, S, C, E, L, A>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
    C: CourseRepository + 'static,
    E: EnrollmentRepository + 'static,
    L: GradeLedgerRepository + 'static,
    A: AcademicRecordRepository + 'static,
{
    /// Create the configured administrator unless the email is taken.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the user repository.
    pub async fn bootstrap_admin(&self, admin: Option<NewAccount>) -> Result<(), Error> {
        let Some(account) = admin else {
            return Ok(());
        };
        let created = AdminBootstrap::new(Arc::clone(&self.users))
            .ensure(account)
            .await?;
        if !created {
            info!("bootstrap administrator already present");
        }
        Ok(())
    }

    /// Build the domain services and bundle their driving ports.
    pub fn http_state(&self, scale: Arc<GradeScale>, clock: Arc<dyn Clock>) -> HttpState {
        let accounts = Arc::new(AccountDirectoryService::new(
            Arc::clone(&self.users),
            Arc::clone(&self.sessions),
        ));
        let catalogue = Arc::new(CourseCatalogueService::new(
            Arc::clone(&self.courses),
            Arc::clone(&self.users),
        ));
        let enrollments = Arc::new(EnrollmentService::new(
            Arc::clone(&self.enrollments),
            Arc::clone(&self.courses),
            Arc::clone(&self.records),
            Arc::clone(&clock),
        ));
        let grading = Arc::new(GradingService::new(
            GradingStores {
                ledger: Arc::clone(&self.ledger),
                courses: Arc::clone(&self.courses),
                enrollments: Arc::clone(&self.enrollments),
                records: Arc::clone(&self.records),
            },
            scale,
            clock,
        ));

        HttpState {
            accounts: accounts.clone() as Arc<dyn AccountService>,
            directory: accounts as Arc<dyn UserDirectory>,
            courses: catalogue.clone() as Arc<dyn CourseCommand>,
            courses_query: catalogue as Arc<dyn CourseQuery>,
            enrollments: enrollments.clone() as Arc<dyn EnrollmentCommand>,
            enrollments_query: enrollments as Arc<dyn EnrollmentQuery>,
            grades: grading.clone() as Arc<dyn GradeCommand>,
            grades_query: grading as Arc<dyn GradeQuery>,
        }
    }
}

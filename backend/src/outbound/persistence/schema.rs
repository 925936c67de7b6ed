//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a
//! migration changes the schema, regenerate them with `diesel print-schema`
//! or edit them by hand.

diesel::table! {
    /// Accounts for every role. Role-specific columns are nullable.
    users (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        /// `ADMIN`, `TEACHER`, or `STUDENT`.
        role -> Varchar,
        student_code -> Nullable<Varchar>,
        major -> Nullable<Varchar>,
        department -> Nullable<Varchar>,
        /// Argon2id PHC string.
        password_digest -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    courses (id) {
        id -> Uuid,
        code -> Varchar,
        name -> Varchar,
        credits -> Int4,
        enrollment_limit -> Int4,
        teacher_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Active seats. Cancelling deletes the row.
    enrollments (id) {
        id -> Uuid,
        student_id -> Uuid,
        course_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only grade ledger. `id` is the insertion order.
    grade_events (id) {
        id -> Int8,
        student_id -> Uuid,
        course_id -> Uuid,
        value -> Varchar,
        assigned_at -> Nullable<Timestamptz>,
        assigned_by -> Uuid,
    }
}

diesel::table! {
    sessions (token) {
        token -> Varchar,
        user_id -> Uuid,
        role -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(courses -> users (teacher_id));
diesel::joinable!(enrollments -> courses (course_id));
diesel::joinable!(enrollments -> users (student_id));
diesel::joinable!(sessions -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(courses, enrollments, grade_events, sessions, users);

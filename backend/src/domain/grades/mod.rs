//! Grade ledger: letter grades, append-only grade events, the canonical
//! resolver, and the GPA aggregator.

mod gpa;
mod ledger;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::openapi::schema::{ObjectBuilder, Schema, Type};
use utoipa::openapi::RefOr;
use utoipa::{PartialSchema, ToSchema};
use uuid::Uuid;

use crate::domain::user::UserId;

pub use self::gpa::{GpaSummary, GradeScale, GradeScaleError, compute_gpa};
pub use self::ledger::{resolve_latest, resolve_latest_by_student};

/// Error returned when a letter grade cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown letter grade: {0}")]
pub struct UnknownLetterGrade(pub String);

/// Letter grade on the plus/minus scale, ordered from `F` to `A+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LetterGrade {
    F,
    DMinus,
    D,
    DPlus,
    CMinus,
    C,
    CPlus,
    BMinus,
    B,
    BPlus,
    AMinus,
    A,
    APlus,
}

impl LetterGrade {
    /// Every grade from highest to lowest.
    pub const ALL: [Self; 13] = [
        Self::APlus,
        Self::A,
        Self::AMinus,
        Self::BPlus,
        Self::B,
        Self::BMinus,
        Self::CPlus,
        Self::C,
        Self::CMinus,
        Self::DPlus,
        Self::D,
        Self::DMinus,
        Self::F,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::DPlus => "D+",
            Self::D => "D",
            Self::DMinus => "D-",
            Self::F => "F",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LetterGrade {
    type Err = UnknownLetterGrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|grade| grade.as_str() == normalised)
            .ok_or_else(|| UnknownLetterGrade(s.to_owned()))
    }
}

impl From<LetterGrade> for String {
    fn from(value: LetterGrade) -> Self {
        value.as_str().to_owned()
    }
}

// Serialised as its letter, so the schema is a string enum rather than the
// variant names a derive would emit.
impl PartialSchema for LetterGrade {
    fn schema() -> RefOr<Schema> {
        ObjectBuilder::new()
            .schema_type(Type::String)
            .enum_values(Some(Self::ALL.iter().map(|grade| grade.as_str())))
            .examples([serde_json::json!("B+")])
            .into()
    }
}

impl ToSchema for LetterGrade {
    fn name() -> Cow<'static, str> {
        Cow::Borrowed("LetterGrade")
    }
}

impl TryFrom<String> for LetterGrade {
    type Error = UnknownLetterGrade;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One entry in the append-only grade ledger.
///
/// `id` is a store-assigned sequence number that increases with insertion
/// order. `assigned_at` is `None` when the stored timestamp was missing or
/// could not be parsed; such events rank below every dated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeEvent {
    pub id: i64,
    pub student_id: UserId,
    pub course_id: Uuid,
    pub value: LetterGrade,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assigned_by: UserId,
}

/// Grade event awaiting a sequence number from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGradeEvent {
    pub student_id: UserId,
    pub course_id: Uuid,
    pub value: LetterGrade,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: UserId,
}

impl NewGradeEvent {
    /// Materialise the event under the assigned sequence number.
    pub fn into_event(self, id: i64) -> GradeEvent {
        GradeEvent {
            id,
            student_id: self.student_id,
            course_id: self.course_id,
            value: self.value,
            assigned_at: Some(self.assigned_at),
            assigned_by: self.assigned_by,
        }
    }
}

/// Canonical grade for one course, joined with the course's label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseGrade {
    pub course_id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub credits: u32,
    pub grade: GradeEvent,
}

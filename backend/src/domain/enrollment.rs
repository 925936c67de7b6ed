//! Enrollment records and the read models built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::course::Course;
use crate::domain::grades::LetterGrade;
use crate::domain::user::{EmailAddress, PersonName, UserId};

/// An active seat held by one student in one course.
///
/// At most one enrollment exists per `(student_id, course_id)`. Cancelling
/// deletes the record and frees the seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: UserId,
    pub course_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// An enrollment joined with the course it holds a seat in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    pub enrollment: Enrollment,
    pub course: Course,
}

/// One student on a course roster with their current canonical grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub enrollment_id: Uuid,
    pub student_id: UserId,
    #[schema(value_type = String)]
    pub name: PersonName,
    #[schema(value_type = String)]
    pub email: EmailAddress,
    pub student_code: Option<String>,
    pub enrolled_at: DateTime<Utc>,
    pub latest_grade: Option<LetterGrade>,
}

/// Roster view for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub course: Course,
    pub available_seats: u32,
    pub students: Vec<RosterEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn roster_entries_expose_the_latest_grade() {
        let entry = RosterEntry {
            enrollment_id: Uuid::nil(),
            student_id: UserId::random(),
            name: PersonName::new("Ada Lovelace").expect("valid name"),
            email: EmailAddress::new("ada@example.edu").expect("valid email"),
            student_code: Some("S-1".to_owned()),
            enrolled_at: Utc::now(),
            latest_grade: Some(LetterGrade::BPlus),
        };
        let json = serde_json::to_value(&entry).expect("serialise entry");
        assert_eq!(json["latestGrade"], "B+");
        assert!(json.get("grade").is_none());
    }
}

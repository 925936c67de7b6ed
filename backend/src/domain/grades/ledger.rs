//! Canonical grade resolution.
//!
//! The ledger is append-only, so "the current grade" is a query, not a
//! stored value. Every view that shows a grade (student grade lists, course
//! rosters, GPA) resolves it here.
//!
//! Ordering: the greatest `assigned_at` wins; equal timestamps fall back to
//! the greater `id`. `None` timestamps sort below every `Some`, so an undated
//! event never overrides a dated one. Because the key is a total order the
//! result does not depend on input order and resolving twice is a no-op.

use std::collections::BTreeMap;

use uuid::Uuid;

use super::GradeEvent;
use crate::domain::user::UserId;

fn precedence(event: &GradeEvent) -> (Option<chrono::DateTime<chrono::Utc>>, i64) {
    (event.assigned_at, event.id)
}

fn resolve_by<'a, K, I, F>(events: I, key: F) -> BTreeMap<K, GradeEvent>
where
    K: Ord,
    I: IntoIterator<Item = &'a GradeEvent>,
    F: Fn(&GradeEvent) -> K,
{
    let mut latest: BTreeMap<K, &GradeEvent> = BTreeMap::new();
    for event in events {
        latest
            .entry(key(event))
            .and_modify(|current| {
                if precedence(event) > precedence(current) {
                    *current = event;
                }
            })
            .or_insert(event);
    }
    latest
        .into_iter()
        .map(|(k, event)| (k, event.clone()))
        .collect()
}

/// Canonical event per course for one student's history.
///
/// # Examples
/// ```
/// use registrar::domain::grades::resolve_latest;
///
/// assert!(resolve_latest(&[]).is_empty());
/// ```
pub fn resolve_latest<'a, I>(events: I) -> BTreeMap<Uuid, GradeEvent>
where
    I: IntoIterator<Item = &'a GradeEvent>,
{
    resolve_by(events, |event| event.course_id)
}

/// Canonical event per student for one course's history.
pub fn resolve_latest_by_student<'a, I>(events: I) -> BTreeMap<UserId, GradeEvent>
where
    I: IntoIterator<Item = &'a GradeEvent>,
{
    resolve_by(events, |event| event.student_id)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::grades::LetterGrade;
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::{fixture, rstest};

    #[fixture]
    fn student() -> UserId {
        UserId::random()
    }

    fn at(seconds: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(seconds, 0).single()
    }

    fn event(
        id: i64,
        student_id: UserId,
        course_id: Uuid,
        value: LetterGrade,
        assigned_at: Option<DateTime<Utc>>,
    ) -> GradeEvent {
        GradeEvent {
            id,
            student_id,
            course_id,
            value,
            assigned_at,
            assigned_by: UserId::from_uuid(Uuid::nil()),
        }
    }

    #[rstest]
    fn empty_input_yields_empty_map() {
        assert!(resolve_latest(&[]).is_empty());
        assert!(resolve_latest_by_student(&[]).is_empty());
    }

    #[rstest]
    fn later_timestamp_wins(student: UserId) {
        let course = Uuid::new_v4();
        let events = [
            event(1, student, course, LetterGrade::AMinus, at(1)),
            event(2, student, course, LetterGrade::BPlus, at(2)),
        ];
        let resolved = resolve_latest(&events);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[&course].value, LetterGrade::BPlus);
    }

    #[rstest]
    fn later_timestamp_wins_over_greater_id(student: UserId) {
        let course = Uuid::new_v4();
        let events = [
            event(9, student, course, LetterGrade::C, at(1)),
            event(3, student, course, LetterGrade::A, at(5)),
        ];
        assert_eq!(resolve_latest(&events)[&course].id, 3);
    }

    #[rstest]
    fn equal_timestamps_fall_back_to_id(student: UserId) {
        let course = Uuid::new_v4();
        let events = [
            event(7, student, course, LetterGrade::B, at(10)),
            event(4, student, course, LetterGrade::A, at(10)),
        ];
        assert_eq!(resolve_latest(&events)[&course].value, LetterGrade::B);
    }

    #[rstest]
    fn undated_events_never_override_dated(student: UserId) {
        let course = Uuid::new_v4();
        let events = [
            event(1, student, course, LetterGrade::C, at(0)),
            event(50, student, course, LetterGrade::APlus, None),
            event(60, student, course, LetterGrade::A, None),
        ];
        assert_eq!(resolve_latest(&events)[&course].id, 1);
    }

    #[rstest]
    fn undated_ties_break_on_id(student: UserId) {
        let course = Uuid::new_v4();
        let events = [
            event(60, student, course, LetterGrade::A, None),
            event(50, student, course, LetterGrade::APlus, None),
        ];
        assert_eq!(resolve_latest(&events)[&course].id, 60);
    }

    #[rstest]
    fn one_entry_per_course_independent_of_order(student: UserId) {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let events = vec![
            event(1, student, first, LetterGrade::D, at(1)),
            event(2, student, second, LetterGrade::B, at(3)),
            event(3, student, first, LetterGrade::A, at(2)),
            event(4, student, second, LetterGrade::C, at(3)),
        ];
        let forward = resolve_latest(&events);
        let mut reversed = events.clone();
        reversed.reverse();
        let backward = resolve_latest(&reversed);

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 2);
        assert_eq!(forward[&first].id, 3);
        assert_eq!(forward[&second].id, 4);
    }

    #[rstest]
    fn resolving_twice_is_idempotent(student: UserId) {
        let course = Uuid::new_v4();
        let events = [
            event(1, student, course, LetterGrade::B, at(1)),
            event(2, student, course, LetterGrade::A, at(2)),
        ];
        let once = resolve_latest(&events);
        let twice = resolve_latest(once.values());
        assert_eq!(once, twice);
    }

    #[rstest]
    fn roster_resolution_keys_by_student() {
        let course = Uuid::new_v4();
        let alice = UserId::random();
        let bob = UserId::random();
        let events = [
            event(1, alice, course, LetterGrade::B, at(1)),
            event(2, bob, course, LetterGrade::C, at(1)),
            event(3, alice, course, LetterGrade::A, at(2)),
        ];
        let resolved = resolve_latest_by_student(&events);
        assert_eq!(resolved[&alice].value, LetterGrade::A);
        assert_eq!(resolved[&bob].value, LetterGrade::C);
    }
}

//! Tests for the assignment history store.
//!
//! Verifies:
//! - Overlap detection per employee and dimension
//! - At most one open interval per employee
//! - Range validation against the evaluation day
//! - Partial updates re-validate before replacing
//! - Windowed lookups by employee and by subject

use chrono::NaiveDate;

use orgchart_protocol::*;
use orgchart_state::{AssignmentHistory, PositionHistory, PostHistory, StateError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 6, 1)
}

fn new_interval(
    subject: PositionId,
    employee: EmployeeId,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> NewInterval<PositionId> {
    NewInterval {
        subject_id: subject,
        employee_id: employee,
        start_date: start,
        end_date: end,
    }
}

// ═══════════════════════════════════════════════════════════════
// Overlap and the single-current invariant
// ═══════════════════════════════════════════════════════════════

#[test]
fn overlapping_interval_on_same_position_rejected() {
    let mut store = PositionHistory::new();
    let (p, e) = (PositionId::generate(), EmployeeId::generate());
    store
        .add_interval(new_interval(p, e, date(2020, 1, 1), Some(date(2021, 1, 1))), today())
        .unwrap();
    let err = store
        .add_interval(new_interval(p, e, date(2020, 6, 1), None), today())
        .unwrap_err();
    assert!(matches!(err, StateError::Overlap { .. }));
    assert_eq!(store.len(), 1);
}

#[test]
fn second_open_interval_rejected() {
    let mut store = PositionHistory::new();
    let e = EmployeeId::generate();
    store
        .add_interval(new_interval(PositionId::generate(), e, date(2020, 1, 1), None), today())
        .unwrap();
    let err = store
        .add_interval(new_interval(PositionId::generate(), e, date(2023, 1, 1), None), today())
        .unwrap_err();
    assert!(matches!(err, StateError::Overlap { .. }));
}

#[test]
fn consecutive_assignments_allowed() {
    let mut store = PositionHistory::new();
    let e = EmployeeId::generate();
    let (first, second) = (PositionId::generate(), PositionId::generate());
    store
        .add_interval(new_interval(first, e, date(2020, 1, 1), Some(date(2022, 1, 1))), today())
        .unwrap();
    store
        .add_interval(new_interval(second, e, date(2022, 1, 1), None), today())
        .unwrap();
    assert_eq!(store.current_assignment(e).unwrap().subject_id, second);
}

#[test]
fn different_employees_may_share_dates() {
    let mut store = PositionHistory::new();
    let p = PositionId::generate();
    for _ in 0..3 {
        store
            .add_interval(new_interval(p, EmployeeId::generate(), date(2020, 1, 1), None), today())
            .unwrap();
    }
    assert_eq!(store.current_occupants(p).len(), 3);
}

#[test]
fn dimensions_are_independent() {
    let mut positions = PositionHistory::new();
    let mut posts = PostHistory::new();
    let e = EmployeeId::generate();
    positions
        .add_interval(new_interval(PositionId::generate(), e, date(2020, 1, 1), None), today())
        .unwrap();
    posts
        .add_interval(
            NewInterval {
                subject_id: PostId::generate(),
                employee_id: e,
                start_date: date(2020, 1, 1),
                end_date: None,
            },
            today(),
        )
        .unwrap();
    assert!(positions.current_assignment(e).is_ok());
    assert!(posts.current_assignment(e).is_ok());
}

#[test]
fn at_most_one_open_interval_after_many_writes() {
    let mut store = PositionHistory::new();
    let e = EmployeeId::generate();
    let starts = [date(2015, 1, 1), date(2017, 1, 1), date(2019, 1, 1), date(2021, 1, 1)];
    let mut previous: Option<PositionId> = None;
    for start in starts {
        if let Some(p) = previous {
            store
                .update_interval(
                    p,
                    e,
                    IntervalUpdate {
                        start_date: None,
                        end_date: Some(start),
                    },
                    today(),
                )
                .unwrap();
        }
        let p = PositionId::generate();
        store.add_interval(new_interval(p, e, start, None), today()).unwrap();
        // Any attempt to open another interval fails.
        assert!(store
            .add_interval(new_interval(PositionId::generate(), e, date(2023, 1, 1), None), today())
            .is_err());
        previous = Some(p);
    }
    let open = store
        .iter()
        .filter(|i| i.employee_id == e && i.is_current())
        .count();
    assert_eq!(open, 1);
}

// ═══════════════════════════════════════════════════════════════
// Range validation
// ═══════════════════════════════════════════════════════════════

#[test]
fn start_after_end_rejected() {
    let mut store = PositionHistory::new();
    let err = store
        .add_interval(
            new_interval(
                PositionId::generate(),
                EmployeeId::generate(),
                date(2021, 1, 1),
                Some(date(2020, 1, 1)),
            ),
            today(),
        )
        .unwrap_err();
    assert!(matches!(err, StateError::InvalidRange(_)));
}

#[test]
fn future_end_rejected() {
    let mut store = PositionHistory::new();
    let err = store
        .add_interval(
            new_interval(
                PositionId::generate(),
                EmployeeId::generate(),
                date(2021, 1, 1),
                Some(date(2025, 1, 1)),
            ),
            today(),
        )
        .unwrap_err();
    assert!(matches!(err, StateError::InvalidRange(_)));
}

#[test]
fn start_today_allowed() {
    let mut store = PositionHistory::new();
    store
        .add_interval(
            new_interval(PositionId::generate(), EmployeeId::generate(), today(), None),
            today(),
        )
        .unwrap();
}

// ═══════════════════════════════════════════════════════════════
// Updates and deletes
// ═══════════════════════════════════════════════════════════════

#[test]
fn update_into_overlap_rejected_and_state_kept() {
    let mut store = PositionHistory::new();
    let e = EmployeeId::generate();
    let (old, new) = (PositionId::generate(), PositionId::generate());
    store
        .add_interval(new_interval(old, e, date(2018, 1, 1), Some(date(2020, 1, 1))), today())
        .unwrap();
    store
        .add_interval(new_interval(new, e, date(2020, 1, 1), None), today())
        .unwrap();

    let err = store
        .update_interval(
            new,
            e,
            IntervalUpdate {
                start_date: Some(date(2019, 6, 1)),
                end_date: None,
            },
            today(),
        )
        .unwrap_err();
    assert!(matches!(err, StateError::Overlap { .. }));
    assert_eq!(store.get_interval(new, e).unwrap().start_date, date(2020, 1, 1));
}

#[test]
fn update_start_only() {
    let mut store = PositionHistory::new();
    let (p, e) = (PositionId::generate(), EmployeeId::generate());
    store
        .add_interval(new_interval(p, e, date(2020, 1, 1), None), today())
        .unwrap();
    let updated = store
        .update_interval(
            p,
            e,
            IntervalUpdate {
                start_date: Some(date(2019, 1, 1)),
                end_date: None,
            },
            today(),
        )
        .unwrap();
    assert_eq!(updated.start_date, date(2019, 1, 1));
    assert!(updated.is_current());
}

#[test]
fn update_missing_is_not_found() {
    let mut store = PositionHistory::new();
    let err = store
        .update_interval(
            PositionId::generate(),
            EmployeeId::generate(),
            IntervalUpdate::default(),
            today(),
        )
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn delete_then_get_is_not_found() {
    let mut store = PositionHistory::new();
    let (p, e) = (PositionId::generate(), EmployeeId::generate());
    store
        .add_interval(new_interval(p, e, date(2020, 1, 1), None), today())
        .unwrap();
    store.delete_interval(p, e).unwrap();
    assert!(store.get_interval(p, e).unwrap_err().is_not_found());
    assert!(matches!(
        store.current_assignment(e).unwrap_err(),
        StateError::NoCurrentAssignment { .. }
    ));
    assert!(store.delete_interval(p, e).unwrap_err().is_not_found());
}

// ═══════════════════════════════════════════════════════════════
// Windowed lookups
// ═══════════════════════════════════════════════════════════════

#[test]
fn intervals_for_employee_newest_first() {
    let mut store = PositionHistory::new();
    let e = EmployeeId::generate();
    let spans = [
        (date(2016, 1, 1), Some(date(2018, 1, 1))),
        (date(2020, 1, 1), None),
        (date(2018, 1, 1), Some(date(2020, 1, 1))),
    ];
    for (start, end) in spans {
        store
            .add_interval(new_interval(PositionId::generate(), e, start, end), today())
            .unwrap();
    }
    let starts: Vec<NaiveDate> = store
        .intervals_for_employee(e, &DateWindow::all_time())
        .unwrap()
        .iter()
        .map(|i| i.start_date)
        .collect();
    assert_eq!(starts, vec![date(2020, 1, 1), date(2018, 1, 1), date(2016, 1, 1)]);
}

#[test]
fn intervals_for_employee_filters_window() {
    let mut store = PositionHistory::new();
    let e = EmployeeId::generate();
    store
        .add_interval(
            new_interval(PositionId::generate(), e, date(2016, 1, 1), Some(date(2017, 1, 1))),
            today(),
        )
        .unwrap();
    store
        .add_interval(new_interval(PositionId::generate(), e, date(2019, 1, 1), None), today())
        .unwrap();
    let window = DateWindow::new(Some(date(2018, 1, 1)), Some(date(2020, 1, 1)));
    let found = store.intervals_for_employee(e, &window).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].start_date, date(2019, 1, 1));
}

#[test]
fn inverted_window_is_invalid_range() {
    let store = PositionHistory::new();
    let window = DateWindow::new(Some(date(2021, 1, 1)), Some(date(2020, 1, 1)));
    let err = store
        .intervals_for_employee(EmployeeId::generate(), &window)
        .unwrap_err();
    assert!(matches!(err, StateError::InvalidRange(_)));
}

#[test]
fn intervals_for_subject_lists_all_holders() {
    let mut store = PositionHistory::new();
    let p = PositionId::generate();
    let (a, b) = (EmployeeId::generate(), EmployeeId::generate());
    store
        .add_interval(new_interval(p, a, date(2015, 1, 1), Some(date(2019, 1, 1))), today())
        .unwrap();
    store
        .add_interval(new_interval(p, b, date(2019, 1, 1), None), today())
        .unwrap();
    let holders: Vec<EmployeeId> = store
        .intervals_for_subject(p, &DateWindow::all_time())
        .unwrap()
        .iter()
        .map(|i| i.employee_id)
        .collect();
    assert_eq!(holders, vec![b, a]);
    assert_eq!(store.current_occupants(p), vec![b]);
}

#[test]
fn current_holder_found_by_window_after_today() {
    let mut store = PositionHistory::new();
    let p = PositionId::generate();
    let (a, b) = (EmployeeId::generate(), EmployeeId::generate());
    store
        .add_interval(new_interval(p, a, date(2015, 1, 1), Some(date(2019, 1, 1))), today())
        .unwrap();
    store
        .add_interval(new_interval(p, b, date(2019, 1, 1), None), today())
        .unwrap();
    let ahead = DateWindow::new(today().succ_opt(), None);
    let holders: Vec<EmployeeId> = store
        .intervals_for_subject(p, &ahead)
        .unwrap()
        .iter()
        .map(|i| i.employee_id)
        .collect();
    assert_eq!(holders, vec![b]);
}

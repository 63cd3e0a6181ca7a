//! Assignment history: who held which position (or post) and when.
//!
//! One store instance covers one dimension. Within it, intervals are keyed
//! by `(subject, employee)` and indexed both ways so the resolver can map
//! positions to occupants without scanning every record.
//!
//! Write-time invariants, per employee:
//! - no two intervals overlap (half-open, see [`Interval::overlaps`])
//! - at most one interval is open-ended
//! - `start_date <= end_date` and no date lies after the evaluation day

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use orgchart_protocol::{
    DateWindow, EmployeeId, Interval, IntervalUpdate, NewInterval, PositionId, PostId,
};

use crate::{AssignmentHistory, StateError, Subject};

/// History of employees occupying reporting-line positions.
pub type PositionHistory = AssignmentStore<PositionId>;

/// History of employees holding pay-grade posts.
pub type PostHistory = AssignmentStore<PostId>;

/// In-memory interval store for one dimension.
#[derive(Debug, Clone)]
pub struct AssignmentStore<S: Subject> {
    intervals: HashMap<(S, EmployeeId), Interval<S>>,
    by_employee: HashMap<EmployeeId, BTreeSet<S>>,
    by_subject: HashMap<S, BTreeSet<EmployeeId>>,
    /// Employee -> subject of their open-ended interval.
    current: HashMap<EmployeeId, S>,
}

impl<S: Subject> Default for AssignmentStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Subject> AssignmentStore<S> {
    pub fn new() -> Self {
        Self {
            intervals: HashMap::new(),
            by_employee: HashMap::new(),
            by_subject: HashMap::new(),
            current: HashMap::new(),
        }
    }

    /// Record a new interval, evaluated as of `today`.
    pub fn add_interval(
        &mut self,
        new: NewInterval<S>,
        today: NaiveDate,
    ) -> Result<Interval<S>, StateError> {
        let interval = Interval::from(new);
        validate_range(interval.start_date, interval.end_date, today)?;
        self.check_no_overlap(&interval, None)?;

        let key = (interval.subject_id, interval.employee_id);
        if self.intervals.contains_key(&key) {
            return Err(StateError::AlreadyExists(format!(
                "{} history for employee {} on {}",
                S::DIMENSION,
                interval.employee_id,
                interval.subject_id
            )));
        }

        self.index(&interval);
        self.intervals.insert(key, interval.clone());

        tracing::info!(
            dimension = %S::DIMENSION,
            subject = %interval.subject_id,
            employee = %interval.employee_id,
            start = %interval.start_date,
            end = ?interval.end_date,
            "Interval added"
        );

        Ok(interval)
    }

    pub fn get_interval(&self, subject: S, employee: EmployeeId) -> Result<&Interval<S>, StateError> {
        self.intervals
            .get(&(subject, employee))
            .ok_or_else(|| not_found(subject, employee))
    }

    /// Correct the dates of an existing interval.
    ///
    /// Only supplied fields change; the result is re-validated against the
    /// employee's other intervals before it replaces the stored record.
    pub fn update_interval(
        &mut self,
        subject: S,
        employee: EmployeeId,
        update: IntervalUpdate,
        today: NaiveDate,
    ) -> Result<Interval<S>, StateError> {
        let key = (subject, employee);
        let mut candidate = self
            .intervals
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found(subject, employee))?;

        if let Some(start) = update.start_date {
            candidate.start_date = start;
        }
        if let Some(end) = update.end_date {
            candidate.end_date = Some(end);
        }
        validate_range(candidate.start_date, candidate.end_date, today)?;
        self.check_no_overlap(&candidate, Some(subject))?;

        self.unindex(subject, employee);
        self.index(&candidate);
        self.intervals.insert(key, candidate.clone());

        tracing::info!(
            dimension = %S::DIMENSION,
            subject = %subject,
            employee = %employee,
            start = %candidate.start_date,
            end = ?candidate.end_date,
            "Interval updated"
        );

        Ok(candidate)
    }

    pub fn delete_interval(&mut self, subject: S, employee: EmployeeId) -> Result<Interval<S>, StateError> {
        let removed = self
            .intervals
            .remove(&(subject, employee))
            .ok_or_else(|| not_found(subject, employee))?;
        self.unindex(subject, employee);

        tracing::info!(
            dimension = %S::DIMENSION,
            subject = %subject,
            employee = %employee,
            "Interval deleted"
        );

        Ok(removed)
    }

    /// Whether any interval references `subject`.
    pub fn has_subject(&self, subject: S) -> bool {
        self.by_subject.get(&subject).is_some_and(|e| !e.is_empty())
    }

    pub fn subject_interval_count(&self, subject: S) -> usize {
        self.by_subject.get(&subject).map_or(0, BTreeSet::len)
    }

    /// Drop every interval referencing `subject`. Returns how many went.
    pub fn remove_subject(&mut self, subject: S) -> usize {
        let employees: Vec<EmployeeId> = self
            .by_subject
            .get(&subject)
            .map(|e| e.iter().copied().collect())
            .unwrap_or_default();
        for employee in &employees {
            self.intervals.remove(&(subject, *employee));
            self.unindex(subject, *employee);
        }
        employees.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval<S>> {
        self.intervals.values()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    fn check_no_overlap(&self, candidate: &Interval<S>, replacing: Option<S>) -> Result<(), StateError> {
        let Some(subjects) = self.by_employee.get(&candidate.employee_id) else {
            return Ok(());
        };
        let clash = subjects
            .iter()
            .filter(|s| Some(**s) != replacing)
            .filter_map(|s| self.intervals.get(&(*s, candidate.employee_id)))
            .any(|existing| existing.overlaps(candidate));
        if clash {
            return Err(StateError::Overlap {
                dimension: S::DIMENSION,
                employee: candidate.employee_id,
            });
        }
        Ok(())
    }

    fn index(&mut self, interval: &Interval<S>) {
        self.by_employee
            .entry(interval.employee_id)
            .or_default()
            .insert(interval.subject_id);
        self.by_subject
            .entry(interval.subject_id)
            .or_default()
            .insert(interval.employee_id);
        if interval.is_current() {
            self.current.insert(interval.employee_id, interval.subject_id);
        }
    }

    fn unindex(&mut self, subject: S, employee: EmployeeId) {
        if let Some(subjects) = self.by_employee.get_mut(&employee) {
            subjects.remove(&subject);
            if subjects.is_empty() {
                self.by_employee.remove(&employee);
            }
        }
        if let Some(employees) = self.by_subject.get_mut(&subject) {
            employees.remove(&employee);
            if employees.is_empty() {
                self.by_subject.remove(&subject);
            }
        }
        if self.current.get(&employee) == Some(&subject) {
            self.current.remove(&employee);
        }
    }
}

impl<S: Subject> AssignmentHistory<S> for AssignmentStore<S> {
    fn current_assignment(&self, employee: EmployeeId) -> Result<&Interval<S>, StateError> {
        self.current
            .get(&employee)
            .and_then(|subject| self.intervals.get(&(*subject, employee)))
            .ok_or(StateError::NoCurrentAssignment {
                dimension: S::DIMENSION,
                employee,
            })
    }

    fn current_occupants(&self, subject: S) -> Vec<EmployeeId> {
        self.by_subject
            .get(&subject)
            .into_iter()
            .flatten()
            .copied()
            .filter(|employee| self.current.get(employee) == Some(&subject))
            .collect()
    }

    fn intervals_for_subject(
        &self,
        subject: S,
        window: &DateWindow,
    ) -> Result<Vec<&Interval<S>>, StateError> {
        validate_window(window)?;
        let mut found: Vec<&Interval<S>> = self
            .by_subject
            .get(&subject)
            .into_iter()
            .flatten()
            .filter_map(|employee| self.intervals.get(&(subject, *employee)))
            .filter(|interval| window.admits(interval))
            .collect();
        found.sort_by(|a, b| {
            b.start_date
                .cmp(&a.start_date)
                .then_with(|| a.employee_id.cmp(&b.employee_id))
        });
        Ok(found)
    }

    fn intervals_for_employee(
        &self,
        employee: EmployeeId,
        window: &DateWindow,
    ) -> Result<Vec<&Interval<S>>, StateError> {
        validate_window(window)?;
        let mut found: Vec<&Interval<S>> = self
            .by_employee
            .get(&employee)
            .into_iter()
            .flatten()
            .filter_map(|subject| self.intervals.get(&(*subject, employee)))
            .filter(|interval| window.admits(interval))
            .collect();
        found.sort_by(|a, b| {
            b.start_date
                .cmp(&a.start_date)
                .then_with(|| a.subject_id.cmp(&b.subject_id))
        });
        Ok(found)
    }
}

fn not_found<S: Subject>(subject: S, employee: EmployeeId) -> StateError {
    StateError::IntervalNotFound {
        dimension: S::DIMENSION,
        subject: subject.to_string(),
        employee,
    }
}

fn validate_range(start: NaiveDate, end: Option<NaiveDate>, today: NaiveDate) -> Result<(), StateError> {
    if start > today {
        return Err(StateError::InvalidRange(format!(
            "start date {} is after {}",
            start, today
        )));
    }
    if let Some(end) = end {
        if start > end {
            return Err(StateError::InvalidRange(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        if end > today {
            return Err(StateError::InvalidRange(format!(
                "end date {} is after {}",
                end, today
            )));
        }
    }
    Ok(())
}

/// Reject windows whose start lies after their end.
pub fn validate_window(window: &DateWindow) -> Result<(), StateError> {
    if !window.is_well_formed() {
        return Err(StateError::InvalidRange(format!(
            "window start {:?} is after window end {:?}",
            window.start, window.end
        )));
    }
    Ok(())
}

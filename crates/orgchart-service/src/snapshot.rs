//! JSON snapshots of the whole record set.
//!
//! Loading replays every record through the validated write paths, so a
//! snapshot that violates any store invariant is rejected rather than
//! partially applied.

use std::collections::VecDeque;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use orgchart_protocol::{Interval, NewInterval, Position, PositionId, PostId};
use orgchart_state::{AssignmentStore, StateError, Subject};

use crate::error::ServiceError;
use crate::service::OrgState;

/// Serializable form of every stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub position_history: Vec<Interval<PositionId>>,
    #[serde(default)]
    pub post_history: Vec<Interval<PostId>>,
}

/// Record counts of a loaded snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub positions: usize,
    pub position_intervals: usize,
    pub post_intervals: usize,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self, ServiceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ServiceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn read(path: &Path) -> Result<Self, ServiceError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Snapshot(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn write(&self, path: &Path) -> Result<(), ServiceError> {
        std::fs::write(path, self.to_json_pretty()?).map_err(|e| {
            ServiceError::Snapshot(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

impl OrgState {
    /// Build a fresh state from a snapshot, evaluated as of `today`.
    ///
    /// Positions may appear in any order; they are inserted parents-first.
    pub fn from_snapshot(snapshot: Snapshot, today: NaiveDate) -> Result<Self, ServiceError> {
        let mut state = OrgState::default();

        let mut pending: VecDeque<Position> = snapshot.positions.into();
        while !pending.is_empty() {
            let before = pending.len();
            for _ in 0..before {
                let Some(position) = pending.pop_front() else {
                    break;
                };
                let ready = position
                    .parent_id
                    .map_or(true, |parent| state.positions.contains(parent));
                if ready {
                    state.positions.restore_position(position)?;
                } else {
                    pending.push_back(position);
                }
            }
            if pending.len() == before {
                // Nothing placed this pass: the remaining parents are missing
                // or the remaining links loop among themselves.
                let stuck = &pending[0];
                return Err(StateError::InvalidParent(format!(
                    "position {} references parent {} which is missing or cyclic ({} position(s) unplaced)",
                    stuck.id,
                    stuck.parent_id.map(|p| p.to_string()).unwrap_or_default(),
                    pending.len()
                ))
                .into());
            }
        }

        for interval in snapshot.position_history {
            state.positions.get_position(interval.subject_id)?;
            state.position_history.add_interval(to_new(interval), today)?;
        }
        for interval in snapshot.post_history {
            state.post_history.add_interval(to_new(interval), today)?;
        }

        Ok(state)
    }

    /// Export every record. Positions come parents-first, roots ordered by
    /// company then title; intervals by employee then start date.
    pub fn to_snapshot(&self) -> Snapshot {
        let mut roots: Vec<&Position> = self
            .positions
            .iter()
            .filter(|p| p.parent_id.is_none())
            .collect();
        roots.sort_by(|a, b| {
            a.company_id
                .cmp(&b.company_id)
                .then_with(|| a.title.cmp(&b.title))
        });

        let mut positions = Vec::with_capacity(self.positions.len());
        let mut queue: VecDeque<&Position> = roots.into();
        while let Some(position) = queue.pop_front() {
            positions.push(position.clone());
            if let Ok(children) = self.positions.children(position.id) {
                queue.extend(children);
            }
        }

        Snapshot {
            positions,
            position_history: sorted_intervals(&self.position_history),
            post_history: sorted_intervals(&self.post_history),
        }
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            positions: self.positions.len(),
            position_intervals: self.position_history.len(),
            post_intervals: self.post_history.len(),
        }
    }
}

fn to_new<S>(interval: Interval<S>) -> NewInterval<S> {
    NewInterval {
        subject_id: interval.subject_id,
        employee_id: interval.employee_id,
        start_date: interval.start_date,
        end_date: interval.end_date,
    }
}

fn sorted_intervals<S: Subject>(store: &AssignmentStore<S>) -> Vec<Interval<S>> {
    let mut intervals: Vec<Interval<S>> = store.iter().cloned().collect();
    intervals.sort_by(|a, b| {
        a.employee_id
            .cmp(&b.employee_id)
            .then_with(|| a.start_date.cmp(&b.start_date))
            .then_with(|| a.subject_id.cmp(&b.subject_id))
    });
    intervals
}

//! The OrgChartService that ties the stores, resolver and pagination together.
//!
//! All records live in one [`OrgState`] behind a `tokio::sync::RwLock`:
//! writes hold the write lock for the whole check-then-insert, and every
//! query resolves its full sequence under a single read lock before the
//! page is cut, so each answer reflects one consistent snapshot.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use orgchart_hierarchy::{paginate, HierarchyResolver, TraversalLimits};
use orgchart_protocol::*;
use orgchart_state::{
    validate_window, AssignmentHistory, AssignmentStore, PositionHistory, PositionStore,
    PostHistory, StateError, Subject,
};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::snapshot::{Snapshot, SnapshotSummary};

/// Every mutable record set of the engine.
#[derive(Debug, Clone, Default)]
pub struct OrgState {
    pub positions: PositionStore,
    pub position_history: PositionHistory,
    pub post_history: PostHistory,
}

/// Snapshot-consistent entry point for position and assignment CRUD and
/// every hierarchy query.
///
/// Cloning is cheap and clones share the same records.
#[derive(Debug, Clone)]
pub struct OrgChartService {
    state: Arc<RwLock<OrgState>>,
    limits: TraversalLimits,
    delete_policy: DeletePolicy,
    default_page_size: usize,
    max_page_size: usize,
    evaluation_date: Option<NaiveDate>,
}

impl Default for OrgChartService {
    fn default() -> Self {
        Self::new()
    }
}

impl OrgChartService {
    pub fn new() -> Self {
        Self::from_config(&ServiceConfig::default())
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(OrgState::default())),
            limits: config.traversal_limits(),
            delete_policy: config.hierarchy.delete_policy,
            default_page_size: config.pagination.default_page_size,
            max_page_size: config.pagination.max_page_size,
            evaluation_date: config.evaluation_date,
        }
    }

    /// Pin the date every write and query is evaluated against.
    pub fn with_evaluation_date(mut self, date: NaiveDate) -> Self {
        self.evaluation_date = Some(date);
        self
    }

    pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Handle to the shared records.
    pub fn shared_state(&self) -> Arc<RwLock<OrgState>> {
        Arc::clone(&self.state)
    }

    /// The evaluation date: the pinned one, or the current UTC date.
    pub fn today(&self) -> NaiveDate {
        self.evaluation_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    /// The policy `delete_position_default` applies.
    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    // ── Positions ──

    pub async fn add_position(&self, new: NewPosition) -> Result<Position, ServiceError> {
        let mut state = self.state.write().await;
        state.positions.add_position(new).map_err(|e| rejected("add_position", e))
    }

    pub async fn get_position(&self, id: PositionId) -> Result<Position, ServiceError> {
        let state = self.state.read().await;
        Ok(state.positions.get_position(id)?.clone())
    }

    pub async fn update_position(
        &self,
        id: PositionId,
        update: PositionUpdate,
    ) -> Result<Position, ServiceError> {
        let mut state = self.state.write().await;
        state
            .positions
            .update_position(id, update)
            .map_err(|e| rejected("update_position", e))
    }

    /// Direct children of a position, ordered by title.
    pub async fn children_of(&self, id: PositionId) -> Result<Vec<Position>, ServiceError> {
        let state = self.state.read().await;
        Ok(state
            .positions
            .children(id)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Delete a position under the configured policy.
    pub async fn delete_position_default(
        &self,
        id: PositionId,
    ) -> Result<Vec<PositionId>, ServiceError> {
        self.delete_position(id, self.delete_policy).await
    }

    /// Delete a position. Returns the ids of every removed position.
    ///
    /// With [`DeletePolicy::Reject`] a position that still has children or
    /// position history is left untouched and `HasDependents` is returned.
    /// With [`DeletePolicy::Cascade`] the whole sub-tree goes, together with
    /// every position interval on it.
    pub async fn delete_position(
        &self,
        id: PositionId,
        policy: DeletePolicy,
    ) -> Result<Vec<PositionId>, ServiceError> {
        let mut state = self.state.write().await;
        let OrgState {
            positions,
            position_history,
            ..
        } = &mut *state;

        match policy {
            DeletePolicy::Reject => {
                let children = positions.children(id)?.len();
                let intervals = position_history.subject_interval_count(id);
                if children > 0 || intervals > 0 {
                    return Err(rejected(
                        "delete_position",
                        StateError::HasDependents {
                            position: id,
                            children,
                            intervals,
                        },
                    ));
                }
                positions.delete_position(id)?;
                Ok(vec![id])
            }
            DeletePolicy::Cascade => {
                let removed = positions.remove_subtree(id)?;
                let intervals: usize = removed
                    .iter()
                    .map(|p| position_history.remove_subject(*p))
                    .sum();
                tracing::info!(
                    position = %id,
                    positions = removed.len(),
                    intervals,
                    "Cascade delete completed"
                );
                Ok(removed)
            }
        }
    }

    // ── Position history ──

    /// Record a position interval. The position must exist.
    pub async fn add_position_interval(
        &self,
        new: NewInterval<PositionId>,
    ) -> Result<Interval<PositionId>, ServiceError> {
        let today = self.today();
        let mut state = self.state.write().await;
        state.positions.get_position(new.subject_id)?;
        state
            .position_history
            .add_interval(new, today)
            .map_err(|e| rejected("add_position_interval", e))
    }

    pub async fn get_position_interval(
        &self,
        position: PositionId,
        employee: EmployeeId,
    ) -> Result<Interval<PositionId>, ServiceError> {
        let state = self.state.read().await;
        Ok(state.position_history.get_interval(position, employee)?.clone())
    }

    pub async fn update_position_interval(
        &self,
        position: PositionId,
        employee: EmployeeId,
        update: IntervalUpdate,
    ) -> Result<Interval<PositionId>, ServiceError> {
        let today = self.today();
        let mut state = self.state.write().await;
        state
            .position_history
            .update_interval(position, employee, update, today)
            .map_err(|e| rejected("update_position_interval", e))
    }

    pub async fn delete_position_interval(
        &self,
        position: PositionId,
        employee: EmployeeId,
    ) -> Result<Interval<PositionId>, ServiceError> {
        let mut state = self.state.write().await;
        Ok(state.position_history.delete_interval(position, employee)?)
    }

    pub async fn current_position(
        &self,
        employee: EmployeeId,
    ) -> Result<Interval<PositionId>, ServiceError> {
        let state = self.state.read().await;
        Ok(state.position_history.current_assignment(employee)?.clone())
    }

    // ── Post history ──

    /// Record a post interval. Post ids are opaque and not checked.
    pub async fn add_post_interval(
        &self,
        new: NewInterval<PostId>,
    ) -> Result<Interval<PostId>, ServiceError> {
        let today = self.today();
        let mut state = self.state.write().await;
        state
            .post_history
            .add_interval(new, today)
            .map_err(|e| rejected("add_post_interval", e))
    }

    pub async fn get_post_interval(
        &self,
        post: PostId,
        employee: EmployeeId,
    ) -> Result<Interval<PostId>, ServiceError> {
        let state = self.state.read().await;
        Ok(state.post_history.get_interval(post, employee)?.clone())
    }

    pub async fn update_post_interval(
        &self,
        post: PostId,
        employee: EmployeeId,
        update: IntervalUpdate,
    ) -> Result<Interval<PostId>, ServiceError> {
        let today = self.today();
        let mut state = self.state.write().await;
        state
            .post_history
            .update_interval(post, employee, update, today)
            .map_err(|e| rejected("update_post_interval", e))
    }

    pub async fn delete_post_interval(
        &self,
        post: PostId,
        employee: EmployeeId,
    ) -> Result<Interval<PostId>, ServiceError> {
        let mut state = self.state.write().await;
        Ok(state.post_history.delete_interval(post, employee)?)
    }

    pub async fn current_post(&self, employee: EmployeeId) -> Result<Interval<PostId>, ServiceError> {
        let state = self.state.read().await;
        Ok(state.post_history.current_assignment(employee)?.clone())
    }

    // ── Hierarchy queries ──

    /// The sub-tree under a position, the position itself at level 0.
    pub async fn get_subtree(
        &self,
        position: PositionId,
        page_number: usize,
        page_size: usize,
    ) -> Result<Paged<HierarchyNode>, ServiceError> {
        self.check_page_size(page_size)?;
        let state = self.state.read().await;
        let nodes = self
            .resolver(&state)
            .subtree(position)
            .map_err(|e| self.faulted(e))?;
        Ok(paginate(nodes, page_number, page_size)?)
    }

    /// Everyone currently below the employee's current position.
    pub async fn get_current_subordinates(
        &self,
        employee: EmployeeId,
        page_number: usize,
        page_size: usize,
    ) -> Result<Paged<SubordinateNode>, ServiceError> {
        self.check_page_size(page_size)?;
        let state = self.state.read().await;
        let subordinates = self
            .resolver(&state)
            .current_subordinates(&state.position_history, employee)
            .map_err(|e| self.faulted(e))?;
        Ok(paginate(subordinates, page_number, page_size)?)
    }

    /// Every interval held below the employee's current position that
    /// intersects `[range_start, range_end]`. Open bounds mean all time.
    pub async fn get_subordinates_in_range(
        &self,
        employee: EmployeeId,
        page_number: usize,
        page_size: usize,
        range_start: Option<NaiveDate>,
        range_end: Option<NaiveDate>,
    ) -> Result<Paged<HistoricalSubordinate>, ServiceError> {
        self.check_page_size(page_size)?;
        let window = DateWindow::new(range_start, range_end);
        let state = self.state.read().await;
        let subordinates = self
            .resolver(&state)
            .subordinates_in_range(&state.position_history, employee, &window)
            .map_err(|e| self.faulted(e))?;
        Ok(paginate(subordinates, page_number, page_size)?)
    }

    /// An employee's position history inside `window`, newest first.
    pub async fn get_employee_position_history(
        &self,
        employee: EmployeeId,
        page_number: usize,
        page_size: usize,
        window: DateWindow,
    ) -> Result<Paged<Interval<PositionId>>, ServiceError> {
        self.check_page_size(page_size)?;
        let state = self.state.read().await;
        let intervals = employee_history(&state.position_history, employee, &window)?;
        Ok(paginate(intervals, page_number, page_size)?)
    }

    /// An employee's post history inside `window`, newest first.
    pub async fn get_employee_post_history(
        &self,
        employee: EmployeeId,
        page_number: usize,
        page_size: usize,
        window: DateWindow,
    ) -> Result<Paged<Interval<PostId>>, ServiceError> {
        self.check_page_size(page_size)?;
        let state = self.state.read().await;
        let intervals = employee_history(&state.post_history, employee, &window)?;
        Ok(paginate(intervals, page_number, page_size)?)
    }

    /// Position history of everyone currently reporting to `manager`.
    pub async fn get_subordinates_position_history(
        &self,
        manager: EmployeeId,
        page_number: usize,
        page_size: usize,
        window: DateWindow,
    ) -> Result<Paged<Interval<PositionId>>, ServiceError> {
        self.check_page_size(page_size)?;
        validate_window(&window)?;
        let state = self.state.read().await;
        let team = self.current_team(&state, manager)?;
        let intervals = team_history(&state.position_history, &team, &window)?;
        Ok(paginate(intervals, page_number, page_size)?)
    }

    /// Post history of everyone currently reporting to `manager`.
    pub async fn get_subordinates_post_history(
        &self,
        manager: EmployeeId,
        page_number: usize,
        page_size: usize,
        window: DateWindow,
    ) -> Result<Paged<Interval<PostId>>, ServiceError> {
        self.check_page_size(page_size)?;
        validate_window(&window)?;
        let state = self.state.read().await;
        let team = self.current_team(&state, manager)?;
        let intervals = team_history(&state.post_history, &team, &window)?;
        Ok(paginate(intervals, page_number, page_size)?)
    }

    // ── Snapshots ──

    /// Replace every record with the snapshot's contents.
    ///
    /// The snapshot is validated into a fresh state first; on failure the
    /// current records are left as they were.
    pub async fn load_snapshot(&self, snapshot: Snapshot) -> Result<SnapshotSummary, ServiceError> {
        let loaded = OrgState::from_snapshot(snapshot, self.today()).map_err(|e| {
            tracing::warn!(error = %e, "Snapshot rejected");
            e
        })?;
        let summary = loaded.summary();
        *self.state.write().await = loaded;

        tracing::info!(
            positions = summary.positions,
            position_intervals = summary.position_intervals,
            post_intervals = summary.post_intervals,
            "Snapshot loaded"
        );
        Ok(summary)
    }

    pub async fn export_snapshot(&self) -> Snapshot {
        self.state.read().await.to_snapshot()
    }

    // ── Internals ──

    fn resolver<'a>(&self, state: &'a OrgState) -> HierarchyResolver<'a, PositionStore> {
        HierarchyResolver::with_limits(&state.positions, self.limits)
    }

    fn current_team(
        &self,
        state: &OrgState,
        manager: EmployeeId,
    ) -> Result<Vec<EmployeeId>, ServiceError> {
        self.resolver(state)
            .current_subordinate_ids(&state.position_history, manager)
            .map_err(|e| self.faulted(e))
    }

    fn check_page_size(&self, page_size: usize) -> Result<(), ServiceError> {
        if page_size > self.max_page_size {
            return Err(ServiceError::InvalidArgument(format!(
                "page size {} exceeds maximum of {}",
                page_size, self.max_page_size
            )));
        }
        Ok(())
    }

    fn faulted(&self, e: orgchart_hierarchy::HierarchyError) -> ServiceError {
        if e.is_integrity_fault() {
            tracing::warn!(error = %e, "Hierarchy integrity fault");
        } else if e.is_limit_exceeded() {
            tracing::debug!(error = %e, "Hierarchy walk stopped at traversal limit");
        }
        e.into()
    }
}

fn rejected(operation: &'static str, e: StateError) -> ServiceError {
    tracing::warn!(operation, error = %e, "Write rejected");
    e.into()
}

fn employee_history<S: Subject>(
    history: &AssignmentStore<S>,
    employee: EmployeeId,
    window: &DateWindow,
) -> Result<Vec<Interval<S>>, StateError> {
    Ok(history
        .intervals_for_employee(employee, window)?
        .into_iter()
        .cloned()
        .collect())
}

/// Intervals of every team member, newest start first, then by employee.
fn team_history<S: Subject>(
    history: &AssignmentStore<S>,
    team: &[EmployeeId],
    window: &DateWindow,
) -> Result<Vec<Interval<S>>, StateError> {
    let mut intervals = Vec::new();
    for employee in team {
        intervals.extend(employee_history(history, *employee, window)?);
    }
    intervals.sort_by(|a, b| {
        b.start_date
            .cmp(&a.start_date)
            .then_with(|| a.employee_id.cmp(&b.employee_id))
            .then_with(|| a.subject_id.cmp(&b.subject_id))
    });
    Ok(intervals)
}

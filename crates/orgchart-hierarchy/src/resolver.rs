//! Hierarchy resolution: transitive closure of reporting lines.
//!
//! The resolver walks a [`PositionTree`] breadth-first from a root,
//! recording each position with its distance from the root ("level").
//! Person-centric queries join that closure against an
//! [`AssignmentHistory`], either as of now or over a date window.
//!
//! Output ordering is fixed so results interoperate across callers:
//! - level ascending
//! - title ascending (ordinal, case-sensitive)
//! - within one position: start date descending, then employee id
//!
//! The walk keeps a visited set. Reaching a position twice means the stored
//! parent links are not a forest, and the walk fails with
//! [`HierarchyError::HierarchyCorrupted`] instead of looping.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use orgchart_protocol::{
    DateWindow, EmployeeId, HierarchyNode, HistoricalSubordinate, Position, PositionId,
    SubordinateNode, MAX_HIERARCHY_DEPTH, MAX_TRAVERSAL_NODES,
};
use orgchart_state::{validate_window, AssignmentHistory, PositionTree};

use crate::HierarchyError;

/// Upper bounds on a single traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalLimits {
    /// Deepest level the walk may reach.
    pub max_depth: u32,
    /// Most positions the walk may visit, root included.
    pub max_nodes: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: MAX_HIERARCHY_DEPTH,
            max_nodes: MAX_TRAVERSAL_NODES,
        }
    }
}

/// Resolves sub-trees and subordinates over a position tree snapshot.
///
/// Holds no state of its own beyond the borrowed tree and the limits.
pub struct HierarchyResolver<'a, T: PositionTree + ?Sized> {
    tree: &'a T,
    limits: TraversalLimits,
}

impl<'a, T: PositionTree + ?Sized> HierarchyResolver<'a, T> {
    pub fn new(tree: &'a T) -> Self {
        Self::with_limits(tree, TraversalLimits::default())
    }

    pub fn with_limits(tree: &'a T, limits: TraversalLimits) -> Self {
        Self { tree, limits }
    }

    /// The sub-tree under `root`, root included at level 0.
    pub fn subtree(&self, root: PositionId) -> Result<Vec<HierarchyNode>, HierarchyError> {
        self.walk(root, true)
    }

    /// Every position below `root`, starting at level 1.
    pub fn descendants(&self, root: PositionId) -> Result<Vec<HierarchyNode>, HierarchyError> {
        self.walk(root, false)
    }

    /// Employees currently holding a position below the manager's current
    /// position. Unoccupied positions are omitted.
    pub fn current_subordinates<H>(
        &self,
        history: &H,
        manager: EmployeeId,
    ) -> Result<Vec<SubordinateNode>, HierarchyError>
    where
        H: AssignmentHistory<PositionId> + ?Sized,
    {
        let root = history.current_assignment(manager)?.subject_id;
        let nodes = self.descendants(root)?;

        let subordinates: Vec<SubordinateNode> = nodes
            .into_iter()
            .flat_map(|node| {
                history
                    .current_occupants(node.position_id)
                    .into_iter()
                    .filter(move |employee| *employee != manager)
                    .map(move |employee_id| SubordinateNode {
                        employee_id,
                        position_id: node.position_id,
                        parent_id: node.parent_id,
                        title: node.title.clone(),
                        level: node.level,
                    })
            })
            .collect();

        tracing::debug!(
            manager = %manager,
            root = %root,
            subordinates = subordinates.len(),
            "Resolved current subordinates"
        );

        Ok(subordinates)
    }

    /// Distinct employees currently reporting (transitively) to `manager`,
    /// in resolver order of their first appearance.
    pub fn current_subordinate_ids<H>(
        &self,
        history: &H,
        manager: EmployeeId,
    ) -> Result<Vec<EmployeeId>, HierarchyError>
    where
        H: AssignmentHistory<PositionId> + ?Sized,
    {
        let mut seen = HashSet::new();
        Ok(self
            .current_subordinates(history, manager)?
            .into_iter()
            .map(|node| node.employee_id)
            .filter(|employee| seen.insert(*employee))
            .collect())
    }

    /// Every interval held on a position below the manager's current
    /// position that intersects `window`. Open intervals count as still
    /// running, so current holders match windows that start after today.
    ///
    /// An employee appears once per matching interval, so someone who moved
    /// between two descendant positions inside the window appears twice.
    /// The manager's own earlier intervals are excluded.
    pub fn subordinates_in_range<H>(
        &self,
        history: &H,
        manager: EmployeeId,
        window: &DateWindow,
    ) -> Result<Vec<HistoricalSubordinate>, HierarchyError>
    where
        H: AssignmentHistory<PositionId> + ?Sized,
    {
        validate_window(window)?;
        let root = history.current_assignment(manager)?.subject_id;
        let nodes = self.descendants(root)?;

        let mut subordinates = Vec::new();
        for node in nodes {
            for interval in history.intervals_for_subject(node.position_id, window)? {
                if interval.employee_id == manager {
                    continue;
                }
                subordinates.push(HistoricalSubordinate {
                    employee_id: interval.employee_id,
                    position_id: node.position_id,
                    parent_id: node.parent_id,
                    title: node.title.clone(),
                    level: node.level,
                    start_date: interval.start_date,
                    end_date: interval.end_date,
                });
            }
        }

        tracing::debug!(
            manager = %manager,
            root = %root,
            window_start = ?window.start,
            window_end = ?window.end,
            subordinates = subordinates.len(),
            "Resolved subordinates in range"
        );

        Ok(subordinates)
    }

    fn walk(&self, root: PositionId, include_root: bool) -> Result<Vec<HierarchyNode>, HierarchyError> {
        let root_position = self.tree.position(root)?;

        let mut visited = HashSet::from([root]);
        let mut nodes = Vec::new();
        if include_root {
            nodes.push(to_node(root_position, 0));
        }

        let mut frontier = vec![root];
        let mut level = 0u32;
        while !frontier.is_empty() {
            level += 1;
            let mut next = Vec::new();
            for parent in frontier {
                for child in self.tree.children_of(parent)? {
                    if !visited.insert(child.id) {
                        tracing::warn!(
                            root = %root,
                            position = %child.id,
                            "Position reached twice during hierarchy walk"
                        );
                        return Err(HierarchyError::HierarchyCorrupted {
                            root,
                            position: child.id,
                        });
                    }
                    if level > self.limits.max_depth {
                        return Err(HierarchyError::TraversalLimitExceeded(format!(
                            "depth {} below {} exceeds maximum of {}",
                            level, root, self.limits.max_depth
                        )));
                    }
                    if visited.len() > self.limits.max_nodes {
                        return Err(HierarchyError::TraversalLimitExceeded(format!(
                            "more than {} positions below {}",
                            self.limits.max_nodes, root
                        )));
                    }
                    nodes.push(to_node(child, level));
                    next.push(child.id);
                }
            }
            frontier = next;
        }

        sort_nodes(&mut nodes);

        tracing::debug!(
            root = %root,
            include_root,
            nodes = nodes.len(),
            depth = level.saturating_sub(1),
            "Resolved position closure"
        );

        Ok(nodes)
    }
}

fn to_node(position: &Position, level: u32) -> HierarchyNode {
    HierarchyNode {
        position_id: position.id,
        parent_id: position.parent_id,
        title: position.title.clone(),
        level,
    }
}

/// Level ascending, then title; the id only breaks ties that valid data
/// (unique titles per company) never produces.
fn sort_nodes(nodes: &mut [HierarchyNode]) {
    nodes.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.position_id.cmp(&b.position_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use orgchart_protocol::{CompanyId, NewPosition};
    use orgchart_state::PositionStore;

    fn chain(len: usize) -> (PositionStore, PositionId) {
        let mut store = PositionStore::new();
        let company = CompanyId::generate();
        let mut parent = None;
        let mut root = None;
        for i in 0..len {
            let p = store
                .add_position(NewPosition {
                    parent_id: parent,
                    title: format!("L{i}"),
                    company_id: company,
                })
                .unwrap();
            root.get_or_insert(p.id);
            parent = Some(p.id);
        }
        (store, root.unwrap())
    }

    #[test]
    fn test_chain_levels() {
        let (store, root) = chain(4);
        let nodes = HierarchyResolver::new(&store).subtree(root).unwrap();
        let levels: Vec<u32> = nodes.iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_leaf_has_no_descendants() {
        let (store, _) = chain(3);
        let leaf = store.iter().find(|p| p.title == "L2").unwrap().id;
        assert!(HierarchyResolver::new(&store).descendants(leaf).unwrap().is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let (store, root) = chain(5);
        let limits = TraversalLimits {
            max_depth: 2,
            max_nodes: 100,
        };
        let err = HierarchyResolver::with_limits(&store, limits)
            .subtree(root)
            .unwrap_err();
        assert!(matches!(err, HierarchyError::TraversalLimitExceeded(_)));
    }

    #[test]
    fn test_node_limit() {
        let (store, root) = chain(5);
        let limits = TraversalLimits {
            max_depth: 10,
            max_nodes: 3,
        };
        let err = HierarchyResolver::with_limits(&store, limits)
            .descendants(root)
            .unwrap_err();
        assert!(err.is_limit_exceeded());
        assert!(!err.is_integrity_fault());
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let store = PositionStore::new();
        let err = HierarchyResolver::new(&store)
            .subtree(PositionId::generate())
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

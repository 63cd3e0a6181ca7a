//! Position tree store: companies' reporting-line forests.
//!
//! Every write re-checks the structural invariants before touching state:
//! - `(company_id, title)` is unique
//! - a parent exists and belongs to the same company
//! - parent links never form a cycle
//!
//! Children are indexed per parent so tree walks never scan the whole store.

use std::collections::{BTreeSet, HashMap, VecDeque};

use orgchart_protocol::{
    CompanyId, NewPosition, ParentUpdate, Position, PositionId, PositionUpdate,
};

use crate::{PositionTree, StateError};

/// In-memory store of positions for any number of companies.
#[derive(Debug, Default, Clone)]
pub struct PositionStore {
    positions: HashMap<PositionId, Position>,
    /// Parent -> direct children.
    children: HashMap<PositionId, BTreeSet<PositionId>>,
    /// Uniqueness index for titles within a company.
    titles: HashMap<(CompanyId, String), PositionId>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a position under an optional parent.
    pub fn add_position(&mut self, new: NewPosition) -> Result<Position, StateError> {
        let position = Position {
            id: PositionId::generate(),
            parent_id: new.parent_id,
            title: new.title,
            company_id: new.company_id,
        };
        self.insert_checked(position)
    }

    /// Insert a position that already carries its identifier.
    ///
    /// Used when loading snapshots; the same invariants apply as for
    /// [`PositionStore::add_position`], and the parent must already exist.
    pub fn restore_position(&mut self, position: Position) -> Result<Position, StateError> {
        if self.positions.contains_key(&position.id) {
            return Err(StateError::AlreadyExists(format!(
                "position with id {}",
                position.id
            )));
        }
        self.insert_checked(position)
    }

    fn insert_checked(&mut self, mut position: Position) -> Result<Position, StateError> {
        position.title = normalize_title(&position.title)?;

        if let Some(parent_id) = position.parent_id {
            self.check_parent(parent_id, position.company_id)?;
        }
        self.check_title_free(position.company_id, &position.title, None)?;

        self.titles.insert(
            (position.company_id, position.title.clone()),
            position.id,
        );
        if let Some(parent_id) = position.parent_id {
            self.children.entry(parent_id).or_default().insert(position.id);
        }
        self.positions.insert(position.id, position.clone());

        tracing::info!(
            position = %position.id,
            company = %position.company_id,
            title = %position.title,
            "Position added"
        );

        Ok(position)
    }

    pub fn get_position(&self, id: PositionId) -> Result<&Position, StateError> {
        self.positions
            .get(&id)
            .ok_or(StateError::PositionNotFound(id))
    }

    pub fn contains(&self, id: PositionId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Apply a partial update to a position.
    ///
    /// The company id acts as a guard: an update addressed to the wrong
    /// company is treated as if the position did not exist.
    pub fn update_position(
        &mut self,
        id: PositionId,
        update: PositionUpdate,
    ) -> Result<Position, StateError> {
        let current = match self.positions.get(&id) {
            Some(p) if p.company_id == update.company_id => p.clone(),
            _ => return Err(StateError::PositionNotFound(id)),
        };

        let title = match update.title.as_deref() {
            Some(title) => normalize_title(title)?,
            None => current.title.clone(),
        };
        self.check_title_free(current.company_id, &title, Some(id))?;

        let parent_id = match update.parent {
            ParentUpdate::Keep => current.parent_id,
            ParentUpdate::Detach => None,
            ParentUpdate::Attach(parent_id) => {
                if parent_id == id {
                    return Err(StateError::CycleDetected {
                        position: id,
                        parent: parent_id,
                    });
                }
                self.check_parent(parent_id, current.company_id)?;
                if self.is_ancestor(id, parent_id) {
                    return Err(StateError::CycleDetected {
                        position: id,
                        parent: parent_id,
                    });
                }
                Some(parent_id)
            }
        };

        // All checks passed; reindex.
        if title != current.title {
            self.titles.remove(&(current.company_id, current.title.clone()));
            self.titles.insert((current.company_id, title.clone()), id);
        }
        if parent_id != current.parent_id {
            if let Some(old) = current.parent_id {
                self.detach_child(old, id);
            }
            if let Some(new) = parent_id {
                self.children.entry(new).or_default().insert(id);
            }
        }

        let updated = Position {
            id,
            parent_id,
            title,
            company_id: current.company_id,
        };
        self.positions.insert(id, updated.clone());

        tracing::info!(
            position = %id,
            title = %updated.title,
            parent = ?updated.parent_id,
            "Position updated"
        );

        Ok(updated)
    }

    /// Delete a leaf position. Positions with children are rejected.
    pub fn delete_position(&mut self, id: PositionId) -> Result<Position, StateError> {
        if !self.positions.contains_key(&id) {
            return Err(StateError::PositionNotFound(id));
        }
        let children = self.children.get(&id).map_or(0, BTreeSet::len);
        if children > 0 {
            return Err(StateError::HasDependents {
                position: id,
                children,
                intervals: 0,
            });
        }
        let removed = self.remove_unchecked(id)?;
        tracing::info!(position = %id, "Position deleted");
        Ok(removed)
    }

    /// Delete a position together with every descendant.
    ///
    /// Returns the removed ids, root first, in breadth-first order.
    pub fn remove_subtree(&mut self, id: PositionId) -> Result<Vec<PositionId>, StateError> {
        if !self.positions.contains_key(&id) {
            return Err(StateError::PositionNotFound(id));
        }

        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            order.push(next);
            if let Some(kids) = self.children.get(&next) {
                queue.extend(kids.iter().copied());
            }
        }

        // Leaves first so every removal sees a consistent child index.
        for position in order.iter().rev() {
            self.remove_unchecked(*position)?;
        }

        tracing::info!(position = %id, removed = order.len(), "Position sub-tree deleted");
        Ok(order)
    }

    fn remove_unchecked(&mut self, id: PositionId) -> Result<Position, StateError> {
        let position = self
            .positions
            .remove(&id)
            .ok_or(StateError::PositionNotFound(id))?;
        self.titles
            .remove(&(position.company_id, position.title.clone()));
        if let Some(parent) = position.parent_id {
            self.detach_child(parent, id);
        }
        self.children.remove(&id);
        Ok(position)
    }

    fn detach_child(&mut self, parent: PositionId, child: PositionId) {
        if let Some(kids) = self.children.get_mut(&parent) {
            kids.remove(&child);
            if kids.is_empty() {
                self.children.remove(&parent);
            }
        }
    }

    /// Direct children of a position, ordered by title.
    pub fn children(&self, id: PositionId) -> Result<Vec<&Position>, StateError> {
        if !self.positions.contains_key(&id) {
            return Err(StateError::PositionNotFound(id));
        }
        let mut kids: Vec<&Position> = self
            .children
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.positions.get(child))
            .collect();
        kids.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(kids)
    }

    /// All positions of a company, ordered by title.
    pub fn positions_for_company(&self, company_id: CompanyId) -> Vec<&Position> {
        let mut found: Vec<&Position> = self
            .positions
            .values()
            .filter(|p| p.company_id == company_id)
            .collect();
        found.sort_by(|a, b| a.title.cmp(&b.title));
        found
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    fn check_parent(&self, parent_id: PositionId, company_id: CompanyId) -> Result<(), StateError> {
        match self.positions.get(&parent_id) {
            None => Err(StateError::InvalidParent(format!(
                "parent position {} does not exist",
                parent_id
            ))),
            Some(parent) if parent.company_id != company_id => {
                Err(StateError::InvalidParent(format!(
                    "parent position {} belongs to company {}, not {}",
                    parent_id, parent.company_id, company_id
                )))
            }
            Some(_) => Ok(()),
        }
    }

    fn check_title_free(
        &self,
        company_id: CompanyId,
        title: &str,
        except: Option<PositionId>,
    ) -> Result<(), StateError> {
        match self.titles.get(&(company_id, title.to_string())) {
            Some(existing) if Some(*existing) != except => Err(StateError::AlreadyExists(format!(
                "position with title {:?} in company {}",
                title, company_id
            ))),
            _ => Ok(()),
        }
    }

    /// Whether `ancestor` lies on the parent chain of `node`.
    ///
    /// The walk is capped at the store size so a corrupted chain cannot
    /// loop forever.
    fn is_ancestor(&self, ancestor: PositionId, node: PositionId) -> bool {
        let mut cursor = self.positions.get(&node).and_then(|p| p.parent_id);
        let mut steps = 0;
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.positions.len() {
                return true;
            }
            cursor = self.positions.get(&current).and_then(|p| p.parent_id);
        }
        false
    }
}

impl PositionTree for PositionStore {
    fn position(&self, id: PositionId) -> Result<&Position, StateError> {
        self.get_position(id)
    }

    fn children_of(&self, id: PositionId) -> Result<Vec<&Position>, StateError> {
        self.children(id)
    }
}

fn normalize_title(title: &str) -> Result<String, StateError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StateError::InvalidArgument(
            "position title must not be empty".into(),
        ));
    }
    Ok(trimmed.to_string())
}

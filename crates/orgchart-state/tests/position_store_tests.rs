//! Tests for the position tree store.
//!
//! Verifies:
//! - Title uniqueness per company on create and update
//! - Parent validation (existence, same company)
//! - Acyclic invariant on re-parenting, with the store left untouched
//! - Delete semantics for leaves, parents and whole sub-trees

use orgchart_protocol::*;
use orgchart_state::{PositionStore, PositionTree, StateError};

struct Org {
    store: PositionStore,
    company: CompanyId,
    ceo: PositionId,
    cto: PositionId,
    cfo: PositionId,
    lead: PositionId,
    architect: PositionId,
}

/// Helper: CEO -> {CTO, CFO}, CTO -> {Team Lead, Architect}.
fn org() -> Org {
    let mut store = PositionStore::new();
    let company = CompanyId::generate();
    let mut add = |parent: Option<PositionId>, title: &str| {
        store
            .add_position(NewPosition {
                parent_id: parent,
                title: title.into(),
                company_id: company,
            })
            .unwrap()
            .id
    };
    let ceo = add(None, "CEO");
    let cto = add(Some(ceo), "CTO");
    let cfo = add(Some(ceo), "CFO");
    let lead = add(Some(cto), "Team Lead");
    let architect = add(Some(cto), "Architect");
    Org {
        store,
        company,
        ceo,
        cto,
        cfo,
        lead,
        architect,
    }
}

fn reparent(org: &mut Org, id: PositionId, parent: PositionId) -> Result<Position, StateError> {
    org.store.update_position(
        id,
        PositionUpdate {
            company_id: org.company,
            parent: ParentUpdate::Attach(parent),
            title: None,
        },
    )
}

// ═══════════════════════════════════════════════════════════════
// Creation
// ═══════════════════════════════════════════════════════════════

#[test]
fn duplicate_title_in_company_rejected() {
    let mut org = org();
    let err = org
        .store
        .add_position(NewPosition {
            parent_id: Some(org.ceo),
            title: "CTO".into(),
            company_id: org.company,
        })
        .unwrap_err();
    assert!(matches!(err, StateError::AlreadyExists(_)));
    assert_eq!(org.store.len(), 5);
}

#[test]
fn blank_title_rejected() {
    let mut store = PositionStore::new();
    let err = store
        .add_position(NewPosition {
            parent_id: None,
            title: "   ".into(),
            company_id: CompanyId::generate(),
        })
        .unwrap_err();
    assert!(matches!(err, StateError::InvalidArgument(_)));
}

#[test]
fn unknown_parent_rejected() {
    let mut store = PositionStore::new();
    let err = store
        .add_position(NewPosition {
            parent_id: Some(PositionId::generate()),
            title: "Orphan".into(),
            company_id: CompanyId::generate(),
        })
        .unwrap_err();
    assert!(matches!(err, StateError::InvalidParent(_)));
}

#[test]
fn parent_from_other_company_rejected() {
    let mut org = org();
    let err = org
        .store
        .add_position(NewPosition {
            parent_id: Some(org.ceo),
            title: "Intern".into(),
            company_id: CompanyId::generate(),
        })
        .unwrap_err();
    assert!(matches!(err, StateError::InvalidParent(_)));
}

#[test]
fn restore_keeps_identifier() {
    let mut store = PositionStore::new();
    let id = PositionId::generate();
    let restored = store
        .restore_position(Position {
            id,
            parent_id: None,
            title: "Board".into(),
            company_id: CompanyId::generate(),
        })
        .unwrap();
    assert_eq!(restored.id, id);
    assert!(store.contains(id));
}

#[test]
fn restore_duplicate_id_rejected() {
    let mut org = org();
    let existing = org.store.get_position(org.cfo).unwrap().clone();
    let err = org.store.restore_position(existing).unwrap_err();
    assert!(matches!(err, StateError::AlreadyExists(_)));
}

// ═══════════════════════════════════════════════════════════════
// Updates and the acyclic invariant
// ═══════════════════════════════════════════════════════════════

#[test]
fn self_parent_is_cycle() {
    let mut org = org();
    let id = org.cto;
    let err = reparent(&mut org, id, id).unwrap_err();
    assert!(matches!(err, StateError::CycleDetected { .. }));
}

#[test]
fn descendant_parent_is_cycle() {
    let mut org = org();
    let (ceo, lead) = (org.ceo, org.lead);
    let err = reparent(&mut org, ceo, lead).unwrap_err();
    assert!(matches!(err, StateError::CycleDetected { .. }));

    // Store untouched: CEO is still a root and still parents CTO.
    assert!(org.store.get_position(ceo).unwrap().parent_id.is_none());
    let children: Vec<PositionId> = org
        .store
        .children_of(ceo)
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert!(children.contains(&org.cto));
}

#[test]
fn sideways_move_allowed() {
    let mut org = org();
    let (architect, cfo) = (org.architect, org.cfo);
    let moved = reparent(&mut org, architect, cfo).unwrap();
    assert_eq!(moved.parent_id, Some(cfo));
    assert_eq!(org.store.children_of(org.cto).unwrap().len(), 1);
    assert_eq!(org.store.children_of(cfo).unwrap().len(), 1);
}

#[test]
fn rename_to_taken_title_rejected() {
    let mut org = org();
    let err = org
        .store
        .update_position(
            org.cfo,
            PositionUpdate {
                company_id: org.company,
                parent: ParentUpdate::Keep,
                title: Some("CTO".into()),
            },
        )
        .unwrap_err();
    assert!(matches!(err, StateError::AlreadyExists(_)));
}

#[test]
fn rename_to_own_title_allowed() {
    let mut org = org();
    let renamed = org
        .store
        .update_position(
            org.cfo,
            PositionUpdate {
                company_id: org.company,
                parent: ParentUpdate::Keep,
                title: Some("CFO".into()),
            },
        )
        .unwrap();
    assert_eq!(renamed.title, "CFO");
}

#[test]
fn rename_frees_old_title() {
    let mut org = org();
    org.store
        .update_position(
            org.cfo,
            PositionUpdate {
                company_id: org.company,
                parent: ParentUpdate::Keep,
                title: Some("Finance Director".into()),
            },
        )
        .unwrap();
    org.store
        .add_position(NewPosition {
            parent_id: Some(org.ceo),
            title: "CFO".into(),
            company_id: org.company,
        })
        .unwrap();
}

#[test]
fn update_with_wrong_company_is_not_found() {
    let mut org = org();
    let err = org
        .store
        .update_position(
            org.cfo,
            PositionUpdate {
                company_id: CompanyId::generate(),
                parent: ParentUpdate::Keep,
                title: Some("X".into()),
            },
        )
        .unwrap_err();
    assert_eq!(err, StateError::PositionNotFound(org.cfo));
}

// ═══════════════════════════════════════════════════════════════
// Deletion
// ═══════════════════════════════════════════════════════════════

#[test]
fn delete_leaf() {
    let mut org = org();
    org.store.delete_position(org.lead).unwrap();
    assert!(org.store.get_position(org.lead).unwrap_err().is_not_found());
    assert_eq!(org.store.children_of(org.cto).unwrap().len(), 1);
}

#[test]
fn delete_parent_rejected() {
    let mut org = org();
    let err = org.store.delete_position(org.cto).unwrap_err();
    assert_eq!(
        err,
        StateError::HasDependents {
            position: org.cto,
            children: 2,
            intervals: 0,
        }
    );
    assert_eq!(org.store.len(), 5);
}

#[test]
fn delete_missing_is_not_found() {
    let mut store = PositionStore::new();
    let id = PositionId::generate();
    assert_eq!(
        store.delete_position(id).unwrap_err(),
        StateError::PositionNotFound(id)
    );
}

#[test]
fn remove_subtree_of_root_empties_company() {
    let mut org = org();
    let removed = org.store.remove_subtree(org.ceo).unwrap();
    assert_eq!(removed.len(), 5);
    assert!(org.store.is_empty());
    assert!(org.store.positions_for_company(org.company).is_empty());
}

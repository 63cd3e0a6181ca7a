//! Page slicing shared by every hierarchy query.
//!
//! The caller resolves the full ordered sequence once; pages are cut from
//! it without re-running resolution.

use orgchart_protocol::{Page, Paged};

use crate::HierarchyError;

/// Cut page `page_number` (1-based) of `page_size` items out of `items`.
///
/// A page past the end yields no items but still reports the totals.
pub fn paginate<T>(
    items: Vec<T>,
    page_number: usize,
    page_size: usize,
) -> Result<Paged<T>, HierarchyError> {
    if page_size == 0 {
        return Err(HierarchyError::InvalidArgument(
            "page size must be positive".into(),
        ));
    }
    if page_number == 0 {
        return Err(HierarchyError::InvalidArgument(
            "page number is 1-based".into(),
        ));
    }

    let page = Page::new(page_number, page_size, items.len());
    let skip = (page_number - 1).saturating_mul(page_size);
    let items = items.into_iter().skip(skip).take(page_size).collect();

    Ok(Paged { items, page })
}

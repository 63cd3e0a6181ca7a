use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::identity::{CompanyId, EmployeeId, PositionId};

// ── Positions ──

/// A node in a company's reporting-line forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    /// `None` marks a tree root.
    pub parent_id: Option<PositionId>,
    pub title: String,
    pub company_id: CompanyId,
}

/// Request to create a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPosition {
    pub parent_id: Option<PositionId>,
    pub title: String,
    pub company_id: CompanyId,
}

/// How an update treats the parent link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "parent_id")]
pub enum ParentUpdate {
    #[default]
    Keep,
    /// Turn the position into a tree root.
    Detach,
    Attach(PositionId),
}

/// Partial update of a position. The company id must match the stored one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub company_id: CompanyId,
    #[serde(default)]
    pub parent: ParentUpdate,
    #[serde(default)]
    pub title: Option<String>,
}

/// What to do with a position that still has children or history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Refuse to delete while anything references the position.
    #[default]
    Reject,
    /// Delete the whole sub-tree and every interval referencing it.
    Cascade,
}

// ── Assignment intervals ──

/// The independent axes along which assignment history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Reporting-line positions.
    Position,
    /// Pay-grade posts.
    Post,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Position => write!(f, "position"),
            Dimension::Post => write!(f, "post"),
        }
    }
}

impl std::str::FromStr for Dimension {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "position" => Ok(Dimension::Position),
            "post" => Ok(Dimension::Post),
            other => Err(ProtocolError::UnknownDimension(other.to_string())),
        }
    }
}

/// A contiguous span during which an employee held a subject
/// (a position or a post).
///
/// `end_date` is the day the employee moved on; `None` means the
/// interval is still open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval<S> {
    pub subject_id: S,
    pub employee_id: EmployeeId,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl<S> Interval<S> {
    /// Whether this is the employee's current (open-ended) assignment.
    pub fn is_current(&self) -> bool {
        self.end_date.is_none()
    }

    /// Half-open overlap test: `[s1, e1)` against `[s2, e2)`, open ends unbounded.
    ///
    /// A successor interval may therefore start on its predecessor's end date.
    pub fn overlaps<T>(&self, other: &Interval<T>) -> bool {
        spans_overlap(
            self.start_date,
            self.end_date,
            other.start_date,
            other.end_date,
        )
    }
}

/// Half-open overlap of two date spans; `None` ends are unbounded.
pub fn spans_overlap(
    a_start: NaiveDate,
    a_end: Option<NaiveDate>,
    b_start: NaiveDate,
    b_end: Option<NaiveDate>,
) -> bool {
    let a_before_b_ends = b_end.map_or(true, |end| a_start < end);
    let b_before_a_ends = a_end.map_or(true, |end| b_start < end);
    a_before_b_ends && b_before_a_ends
}

/// Request to record a new interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInterval<S> {
    pub subject_id: S,
    pub employee_id: EmployeeId,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl<S> From<NewInterval<S>> for Interval<S> {
    fn from(new: NewInterval<S>) -> Self {
        Self {
            subject_id: new.subject_id,
            employee_id: new.employee_id,
            start_date: new.start_date,
            end_date: new.end_date,
        }
    }
}

/// Partial correction of an interval's dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntervalUpdate {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// An inclusive date window used to filter history. Open ends mean "all time".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// The unbounded window.
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn is_well_formed(&self) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    /// Whether an interval intersects this window.
    ///
    /// Both window bounds and the interval's end date are inclusive here,
    /// unlike [`spans_overlap`]: an interval ending on the window's first day
    /// is admitted even though its successor may start that same day. An open
    /// interval is still running and reaches any window that starts after it.
    pub fn admits<S>(&self, interval: &Interval<S>) -> bool {
        let starts_in_time = self.end.map_or(true, |end| interval.start_date <= end);
        let ends_in_time = match (self.start, interval.end_date) {
            (Some(start), Some(end)) => end >= start,
            _ => true,
        };
        starts_in_time && ends_in_time
    }
}

// ── Derived hierarchy nodes ──

/// A position in a resolved closure, annotated with its distance from the
/// query root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub position_id: PositionId,
    pub parent_id: Option<PositionId>,
    pub title: String,
    pub level: u32,
}

/// A descendant position joined with the employee currently holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubordinateNode {
    pub employee_id: EmployeeId,
    pub position_id: PositionId,
    pub parent_id: Option<PositionId>,
    pub title: String,
    pub level: u32,
}

/// A descendant position joined with one interval that intersected the
/// query window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalSubordinate {
    pub employee_id: EmployeeId,
    pub position_id: PositionId,
    pub parent_id: Option<PositionId>,
    pub title: String,
    pub level: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

// ── Pagination ──

/// Pagination metadata returned with every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page index that was requested.
    pub page_number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl Page {
    /// Build metadata for `total_items` split into pages of `page_size`.
    /// `page_size` must be non-zero.
    pub fn new(page_number: usize, page_size: usize, total_items: usize) -> Self {
        Self {
            page_number,
            total_pages: total_items.div_ceil(page_size),
            total_items,
        }
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page_number < self.total_pages
    }
}

/// One page of an ordered result sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: Page,
}

impl<T> Paged<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
        }
    }
}

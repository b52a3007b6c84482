//! Pairwise classification of entity spans.

use indexmap::IndexMap;

use crate::offset::{node_width, offset_of};
use crate::tree::{NodeId, Tree};

/// Span of one entity: `[offset, offset + length)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub id: String,
    pub offset: usize,
    pub length: usize,
}

impl Interval {
    #[must_use]
    pub fn new(id: impl Into<String>, offset: usize, length: usize) -> Self {
        Self {
            id: id.into(),
            offset,
            length,
        }
    }

    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Relationship of span A to span B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// A strictly contains B.
    Contains,
    /// B strictly contains A.
    ContainedBy,
    /// The spans intersect, neither contains the other.
    Overlaps,
    None,
}

/// Classify span `a` against span `b`.
///
/// # Examples
/// ```
/// use standoff_annotator::overlap::{relationship, Interval, Relationship};
///
/// let a = Interval::new("a", 0, 10);
/// let b = Interval::new("b", 5, 10);
/// assert_eq!(relationship(&a, &b), Relationship::Overlaps);
/// ```
#[must_use]
pub fn relationship(a: &Interval, b: &Interval) -> Relationship {
    let (a0, a1, b0, b1) = (a.offset, a.end(), b.offset, b.end());
    if a0 < b0 && a1 > b1 {
        Relationship::Contains
    } else if b0 < a0 && b1 > a1 {
        Relationship::ContainedBy
    } else if (a0 < b0 && b0 < a1 && a1 < b1) || (b0 < a0 && a0 < b1 && b1 < a1) {
        Relationship::Overlaps
    } else {
        Relationship::None
    }
}

/// Relationships of one entity to all others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relations {
    pub contains: Vec<String>,
    pub overlaps: Vec<String>,
}

/// Classify every ordered pair of intervals.
///
/// Overlap is recorded on both sides; containment only on the container.
#[must_use]
pub fn determine_relationships(intervals: &[Interval]) -> IndexMap<String, Relations> {
    let mut relations: IndexMap<String, Relations> = intervals
        .iter()
        .map(|interval| (interval.id.clone(), Relations::default()))
        .collect();
    for a in intervals {
        for b in intervals {
            if a.id == b.id {
                continue;
            }
            let Some(entry) = relations.get_mut(&a.id) else {
                continue;
            };
            match relationship(a, b) {
                Relationship::Contains => entry.contains.push(b.id.clone()),
                Relationship::Overlaps => entry.overlaps.push(b.id.clone()),
                Relationship::ContainedBy | Relationship::None => {}
            }
        }
    }
    relations
}

/// Intervals of every entity anchored in the tree, measured from the
/// document root.
///
/// The offset is that of the entity's first fragment; the length is the
/// combined width of all its fragments.
#[must_use]
pub fn entity_intervals(tree: &Tree) -> Vec<Interval> {
    let Some(root) = tree.root_element() else {
        return Vec::new();
    };
    let mut order: IndexMap<String, Vec<NodeId>> = IndexMap::new();
    for node in tree.descendants(root) {
        if let Some(marker) = tree.entity_marker(node) {
            order.entry(marker.entity_id.clone()).or_default().push(node);
        }
    }
    order
        .into_iter()
        .filter_map(|(id, fragments)| {
            let first = *fragments.first()?;
            let offset = offset_of(tree, root, |_, node| node == first, false)?;
            let length = fragments.iter().map(|&node| node_width(tree, node)).sum();
            Some(Interval::new(id, offset, length))
        })
        .collect()
}

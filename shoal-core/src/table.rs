//! Routing table - the group name to current primary mapping.
//!
//! The table is insertion-ordered and immutable once constructed: updates
//! go through [`RoutingTable::with_primary`], which copies the table and
//! replaces a single entry, so concurrent readers never observe a
//! partially-updated mapping.

use std::fmt;

use crate::types::{Endpoint, GroupName};

/// One routing entry: a group and its current primary endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RouteEntry {
    group: GroupName,
    primary: Endpoint,
}

/// Insertion-ordered mapping from group name to current primary endpoint.
///
/// Contains exactly one entry per configured group once bootstrap
/// completes. Entries are replaced in place on failover, never removed,
/// so the iteration order is fixed for the process lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
}

impl RoutingTable {
    /// Creates an empty routing table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts or replaces the primary for a group.
    ///
    /// A new group is appended, preserving insertion order; an existing
    /// group keeps its position and gets the new endpoint.
    pub fn insert(&mut self, group: GroupName, primary: Endpoint) {
        match self.entries.iter_mut().find(|e| e.group == group) {
            Some(entry) => entry.primary = primary,
            None => self.entries.push(RouteEntry { group, primary }),
        }
    }

    /// Returns a copy of this table with one group's primary replaced.
    ///
    /// The receiver is untouched; readers holding it keep a consistent
    /// view while the copy is being swapped in.
    #[must_use]
    pub fn with_primary(&self, group: &GroupName, primary: Endpoint) -> Self {
        let mut next = self.clone();
        next.insert(group.clone(), primary);
        next
    }

    /// Returns the current primary for a group, if present.
    #[must_use]
    pub fn primary(&self, group: &GroupName) -> Option<&Endpoint> {
        self.entries
            .iter()
            .find(|e| e.group == *group)
            .map(|e| &e.primary)
    }

    /// Returns true if the table has an entry for the group.
    #[must_use]
    pub fn contains(&self, group: &GroupName) -> bool {
        self.entries.iter().any(|e| e.group == *group)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupName, &Endpoint)> {
        self.entries.iter().map(|e| (&e.group, &e.primary))
    }

    /// Returns the endpoint sequence in insertion order.
    #[must_use]
    pub fn primaries(&self) -> Vec<Endpoint> {
        self.entries.iter().map(|e| e.primary.clone()).collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compares two tables by their endpoint sequences alone.
    ///
    /// The comparison is positional over the values in iteration order and
    /// ignores group names: two tables that assign the same endpoints to
    /// different groups in the same order compare equal here.
    #[must_use]
    pub fn same_primaries(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a.primary == b.primary)
    }
}

impl fmt::Display for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}", entry.group, entry.primary)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str, u16)]) -> RoutingTable {
        let mut t = RoutingTable::new();
        for (group, host, port) in entries {
            t.insert(GroupName::new(*group), Endpoint::new(*host, *port));
        }
        t
    }

    #[test]
    fn test_insert_preserves_order() {
        let t = table(&[("m1", "a", 1), ("m2", "b", 2), ("m3", "c", 3)]);
        let groups: Vec<_> = t.iter().map(|(g, _)| g.as_str().to_string()).collect();
        assert_eq!(groups, ["m1", "m2", "m3"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut t = table(&[("m1", "a", 1), ("m2", "b", 2)]);
        t.insert(GroupName::new("m1"), Endpoint::new("x", 9));

        let groups: Vec<_> = t.iter().map(|(g, _)| g.as_str().to_string()).collect();
        assert_eq!(groups, ["m1", "m2"]);
        assert_eq!(t.primary(&GroupName::new("m1")), Some(&Endpoint::new("x", 9)));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_with_primary_leaves_original_untouched() {
        let t = table(&[("m1", "a", 1), ("m2", "b", 2)]);
        let updated = t.with_primary(&GroupName::new("m1"), Endpoint::new("x", 9));

        assert_eq!(t.primary(&GroupName::new("m1")), Some(&Endpoint::new("a", 1)));
        assert_eq!(
            updated.primary(&GroupName::new("m1")),
            Some(&Endpoint::new("x", 9))
        );
        assert_eq!(
            updated.primary(&GroupName::new("m2")),
            Some(&Endpoint::new("b", 2))
        );
    }

    #[test]
    fn test_same_primaries_positional() {
        let a = table(&[("m1", "a", 1), ("m2", "b", 2)]);
        let b = table(&[("m1", "a", 1), ("m2", "b", 2)]);
        let c = table(&[("m1", "a", 1), ("m2", "b", 3)]);

        assert!(a.same_primaries(&b));
        assert!(!a.same_primaries(&c));
    }

    #[test]
    fn test_same_primaries_ignores_group_names() {
        // Same endpoint sequence under different names compares equal.
        let a = table(&[("m1", "a", 1), ("m2", "b", 2)]);
        let b = table(&[("x1", "a", 1), ("x2", "b", 2)]);

        assert!(a.same_primaries(&b));
    }

    #[test]
    fn test_same_primaries_length_mismatch() {
        let a = table(&[("m1", "a", 1)]);
        let b = table(&[("m1", "a", 1), ("m2", "b", 2)]);

        assert!(!a.same_primaries(&b));
    }

    #[test]
    fn test_display_joins_entries() {
        let t = table(&[("m1", "a", 1), ("m2", "b", 2)]);
        assert_eq!(format!("{t}"), "m1:a:1 m2:b:2");
    }
}

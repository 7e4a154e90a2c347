//! The sharded handle lent out by the pool.
//!
//! A handle holds one connection per group and routes keys over the
//! shard ring. It is exclusively owned by the borrowing caller until
//! returned; the connections inside are never shared across handles.

use std::sync::Arc;

use shoal_core::GroupName;

use crate::backend::ShardConnection;
use crate::shard::ShardRing;

struct Shard<C> {
    group: GroupName,
    conn: C,
}

/// A set of per-group connections routed by key.
pub struct ShardedHandle<C> {
    shards: Vec<Shard<C>>,
    ring: Arc<dyn ShardRing>,
}

impl<C: ShardConnection> ShardedHandle<C> {
    /// Assembles a handle from per-group connections in table order.
    pub(crate) fn new(shards: Vec<(GroupName, C)>, ring: Arc<dyn ShardRing>) -> Self {
        Self {
            shards: shards
                .into_iter()
                .map(|(group, conn)| Shard { group, conn })
                .collect(),
            ring,
        }
    }

    /// Number of shards in the handle.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns the group a key routes to.
    #[must_use]
    pub fn group_for_key(&self, key: &[u8]) -> &GroupName {
        &self.shards[self.ring.shard_index(key)].group
    }

    /// Returns the connection a key routes to.
    pub fn shard_for_key(&mut self, key: &[u8]) -> &mut C {
        let index = self.ring.shard_index(key);
        &mut self.shards[index].conn
    }

    /// Iterates all shard connections with their groups.
    pub fn shards_mut(&mut self) -> impl Iterator<Item = (&GroupName, &mut C)> {
        self.shards.iter_mut().map(|s| (&s.group, &mut s.conn))
    }

    /// Consumes the handle into its connections, for teardown.
    pub(crate) fn into_shards(self) -> Vec<(GroupName, C)> {
        self.shards.into_iter().map(|s| (s.group, s.conn)).collect()
    }
}

impl<C> std::fmt::Debug for ShardedHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedHandle")
            .field("shards", &self.shards.iter().map(|s| &s.group).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

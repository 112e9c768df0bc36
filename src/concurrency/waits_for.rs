//! Waits-for graph used for deadlock detection.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::common::TransactionId;

/// Directed graph: `waiter -> {holders it is waiting on}`.
///
/// Edges are only ever added after checking they would not close a cycle,
/// so the graph stays acyclic.
#[derive(Debug, Default)]
pub struct WaitsForGraph {
    edges: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl WaitsForGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the out-edges of `waiter` with `holders`.
    pub fn set_waits(&mut self, waiter: TransactionId, holders: HashSet<TransactionId>) {
        if holders.is_empty() {
            self.edges.remove(&waiter);
        } else {
            self.edges.insert(waiter, holders);
        }
    }

    /// Whether `waiter` waiting on any of `holders` would close a cycle,
    /// i.e. some holder can already reach `waiter`.
    pub fn would_deadlock(&self, waiter: TransactionId, holders: &HashSet<TransactionId>) -> bool {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<_> = holders.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            if current == waiter {
                return true;
            }
            if visited.insert(current) {
                if let Some(next) = self.edges.get(&current) {
                    queue.extend(next.iter().copied());
                }
            }
        }

        false
    }

    /// Drop the out-edges of `waiter`.
    pub fn clear_waits(&mut self, waiter: TransactionId) {
        self.edges.remove(&waiter);
    }

    /// Drop `tid` entirely, both as a waiter and as a holder.
    pub fn remove_transaction(&mut self, tid: TransactionId) {
        self.edges.remove(&tid);
        self.edges.retain(|_, holders| {
            holders.remove(&tid);
            !holders.is_empty()
        });
    }

    pub fn waits_on(&self, waiter: TransactionId) -> Option<&HashSet<TransactionId>> {
        self.edges.get(&waiter)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

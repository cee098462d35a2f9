//! Fixed-step registry of in-flight projectiles.
//!
//! The simulator only tracks handles. Each pass walks the registry in reverse
//! and hands every entry to a visitor exactly once; entries the visitor drops
//! are swap-removed in place, which is safe because everything past the
//! cursor has already been visited.
//!
//! Releases requested while a pass is running (from a callback, or from
//! another thread through a [`CancelRequest`] channel) never touch the
//! registry directly. They are marked and applied when the walk reaches the
//! entry, or at the end of the pass.

use ahash::AHashMap;
use crossbeam_channel::Receiver;
use salvo_common::{FireError, ProjectileHandle};
use tracing::debug;

use crate::events::ExpiryReason;

/// A request to end a flight early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelRequest {
    /// Flight to end
    pub handle: ProjectileHandle,
    /// Reported reason
    pub reason: ExpiryReason,
}

/// What the visitor is asked to do with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Advance the projectile by one tick.
    Advance,
    /// Release the projectile; it is leaving the registry regardless.
    Release(ExpiryReason),
}

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Entries advanced
    pub advanced: usize,
    /// Entries removed, for any reason
    pub removed: usize,
    /// Entries removed because of a release mark
    pub cancelled: usize,
}

/// Registry of active projectile handles.
#[derive(Debug, Default)]
pub struct Simulator {
    active: Vec<ProjectileHandle>,
    index: AHashMap<ProjectileHandle, usize>,
    pending: AHashMap<ProjectileHandle, ExpiryReason>,
    max_in_flight: Option<usize>,
}

impl Simulator {
    /// Create an empty registry.
    #[must_use]
    pub fn new(max_in_flight: Option<usize>) -> Self {
        Self {
            max_in_flight,
            ..Self::default()
        }
    }

    /// Check the in-flight cap without registering anything.
    pub fn check_capacity(&self) -> Result<(), FireError> {
        match self.max_in_flight {
            Some(cap) if self.active.len() >= cap => Err(FireError::InFlightCapReached { cap }),
            _ => Ok(()),
        }
    }

    /// Add `handle` to the registry.
    ///
    /// Returns `Ok(false)` if it was already registered.
    pub fn register(&mut self, handle: ProjectileHandle) -> Result<bool, FireError> {
        if self.index.contains_key(&handle) {
            return Ok(false);
        }
        self.check_capacity()?;
        self.index.insert(handle, self.active.len());
        self.active.push(handle);
        Ok(true)
    }

    /// Remove `handle` from the registry. Unknown handles are a no-op.
    pub fn unregister(&mut self, handle: ProjectileHandle) -> bool {
        self.pending.remove(&handle);
        let Some(position) = self.index.remove(&handle) else {
            return false;
        };
        self.remove_at(position);
        true
    }

    fn remove_at(&mut self, position: usize) {
        let removed = self.active.swap_remove(position);
        self.index.remove(&removed);
        if let Some(moved) = self.active.get(position) {
            self.index.insert(*moved, position);
        }
    }

    /// Mark `handle` for release on the next pass.
    ///
    /// The first reason recorded for a handle wins.
    pub fn mark_release(&mut self, handle: ProjectileHandle, reason: ExpiryReason) -> bool {
        if !self.index.contains_key(&handle) {
            return false;
        }
        self.pending.entry(handle).or_insert(reason);
        true
    }

    fn absorb(&mut self, requests: &Receiver<CancelRequest>) {
        for request in requests.try_iter() {
            self.mark_release(request.handle, request.reason);
        }
    }

    /// Run one pass over the registry.
    ///
    /// `visit` returns true to keep the entry. Release marks are always
    /// removed, whatever the visitor returns.
    pub fn step<F>(&mut self, requests: &Receiver<CancelRequest>, mut visit: F) -> PassStats
    where
        F: FnMut(ProjectileHandle, Visit) -> bool,
    {
        let mut stats = PassStats::default();
        self.absorb(requests);

        let mut cursor = self.active.len();
        while cursor > 0 {
            cursor -= 1;
            self.absorb(requests);

            let handle = self.active[cursor];
            let keep = match self.pending.remove(&handle) {
                Some(reason) => {
                    visit(handle, Visit::Release(reason));
                    stats.cancelled += 1;
                    false
                },
                None => {
                    stats.advanced += 1;
                    visit(handle, Visit::Advance)
                },
            };

            if !keep {
                self.remove_at(cursor);
                stats.removed += 1;
            }
        }

        // Marks for entries the walk had already passed.
        self.absorb(requests);
        let late: Vec<(ProjectileHandle, ExpiryReason)> = self.pending.drain().collect();
        for (handle, reason) in late {
            if let Some(position) = self.index.get(&handle).copied() {
                visit(handle, Visit::Release(reason));
                self.remove_at(position);
                stats.removed += 1;
                stats.cancelled += 1;
            }
        }

        if stats.removed > 0 {
            debug!(
                "Pass advanced {} projectiles, removed {}",
                stats.advanced, stats.removed
            );
        }
        stats
    }

    /// Whether `handle` is registered.
    #[must_use]
    pub fn contains(&self, handle: ProjectileHandle) -> bool {
        self.index.contains_key(&handle)
    }

    /// Registered handles, in no particular order.
    #[must_use]
    pub fn handles(&self) -> &[ProjectileHandle] {
        &self.active
    }

    /// Number of registered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Number of handles marked for release.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// In-flight cap, if any.
    #[must_use]
    pub const fn max_in_flight(&self) -> Option<usize> {
        self.max_in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn h(index: u32) -> ProjectileHandle {
        ProjectileHandle::new(index, 0)
    }

    fn filled(count: u32) -> Simulator {
        let mut sim = Simulator::new(None);
        for i in 0..count {
            sim.register(h(i)).expect("no cap");
        }
        sim
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut sim = Simulator::new(None);
        assert_eq!(sim.register(h(1)), Ok(true));
        assert_eq!(sim.register(h(1)), Ok(false));
        assert_eq!(sim.len(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut sim = filled(3);
        assert!(sim.unregister(h(0)));
        assert!(!sim.unregister(h(0)));
        assert_eq!(sim.len(), 2);
        assert!(sim.contains(h(1)));
        assert!(sim.contains(h(2)));
    }

    #[test]
    fn test_in_flight_cap() {
        let mut sim = Simulator::new(Some(2));
        sim.register(h(0)).expect("under cap");
        sim.register(h(1)).expect("under cap");
        assert_eq!(sim.register(h(2)), Err(FireError::InFlightCapReached { cap: 2 }));
        // Re-registering an existing entry is not a new flight.
        assert_eq!(sim.register(h(1)), Ok(false));
    }

    #[test]
    fn test_every_entry_visited_once() {
        let mut sim = filled(10);
        let (_tx, rx) = unbounded();
        let mut seen = Vec::new();

        // Drop every odd entry while walking.
        let stats = sim.step(&rx, |handle, visit| {
            assert_eq!(visit, Visit::Advance);
            seen.push(handle);
            handle.index() % 2 == 0
        });

        seen.sort();
        assert_eq!(seen, (0..10).map(h).collect::<Vec<_>>());
        assert_eq!(stats.advanced, 10);
        assert_eq!(stats.removed, 5);
        assert_eq!(sim.len(), 5);
        assert!(sim.handles().iter().all(|h| h.index() % 2 == 0));
    }

    #[test]
    fn test_marked_entries_are_released_not_advanced() {
        let mut sim = filled(4);
        let (_tx, rx) = unbounded();
        assert!(sim.mark_release(h(2), ExpiryReason::Cancelled));
        assert!(!sim.mark_release(h(99), ExpiryReason::Cancelled));

        let mut released = Vec::new();
        let stats = sim.step(&rx, |handle, visit| {
            if let Visit::Release(reason) = visit {
                released.push((handle, reason));
            }
            true
        });

        assert_eq!(released, vec![(h(2), ExpiryReason::Cancelled)]);
        assert_eq!(stats.advanced, 3);
        assert_eq!(stats.cancelled, 1);
        assert!(!sim.contains(h(2)));
    }

    #[test]
    fn test_cancel_mid_pass_for_visited_entry() {
        let mut sim = filled(4);
        let (tx, rx) = unbounded();
        let mut visits: AHashMap<ProjectileHandle, Vec<Visit>> = AHashMap::new();

        // The walk is in reverse, so h(3) is visited first. Cancel it while
        // visiting h(0), after it has been advanced.
        sim.step(&rx, |handle, visit| {
            visits.entry(handle).or_default().push(visit);
            if handle == h(0) && visit == Visit::Advance {
                tx.send(CancelRequest {
                    handle: h(3),
                    reason: ExpiryReason::Cancelled,
                })
                .expect("receiver alive");
            }
            true
        });

        assert_eq!(
            visits[&h(3)],
            vec![Visit::Advance, Visit::Release(ExpiryReason::Cancelled)]
        );
        assert!(!sim.contains(h(3)));
        assert_eq!(sim.len(), 3);
        assert_eq!(sim.pending_count(), 0);
    }

    #[test]
    fn test_cancel_mid_pass_for_unvisited_entry() {
        let mut sim = filled(4);
        let (tx, rx) = unbounded();
        let mut advanced = Vec::new();

        sim.step(&rx, |handle, visit| {
            if visit == Visit::Advance {
                advanced.push(handle);
                if handle == h(3) {
                    tx.send(CancelRequest {
                        handle: h(1),
                        reason: ExpiryReason::Culled,
                    })
                    .expect("receiver alive");
                }
            }
            true
        });

        assert!(!advanced.contains(&h(1)));
        assert!(!sim.contains(h(1)));
    }

    #[test]
    fn test_stale_cancel_is_ignored() {
        let mut sim = filled(2);
        let (tx, rx) = unbounded();
        tx.send(CancelRequest {
            handle: h(42),
            reason: ExpiryReason::Cancelled,
        })
        .expect("receiver alive");

        let stats = sim.step(&rx, |_, _| true);
        assert_eq!(stats.removed, 0);
        assert_eq!(sim.len(), 2);
    }
}

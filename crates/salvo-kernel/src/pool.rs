//! Capacity-bounded pool of reusable projectile instances.
//!
//! Instances are constructed once (up front through [`ProjectilePool::prewarm`]
//! or lazily on acquire) and recycled for the rest of the session. The pool
//! never grows past its hard capacity; what happens when every instance is in
//! flight is decided by the configured [`ExhaustionPolicy`].

use salvo_common::{PoolError, ProjectileHandle};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::profile::ProjectileProfile;
use crate::projectile::Projectile;

/// Largest number of slots reserved up front.
pub const MAX_SOFT_CAPACITY: usize = 4096;

/// What to do when a fire request arrives and every instance is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExhaustionPolicy {
    /// Refuse the request with [`PoolError::Exhausted`].
    #[default]
    Deny,
    /// Reclaim the instance that has been in flight the longest.
    RecycleOldest,
}

/// Pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Instances reserved up front
    pub soft_capacity: usize,
    /// Instances the pool may ever construct
    pub hard_capacity: usize,
    /// Instances constructed at startup
    pub prewarm: usize,
    /// Behavior at hard capacity
    pub exhaustion_policy: ExhaustionPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            soft_capacity: 50,
            hard_capacity: 200,
            prewarm: 100,
            exhaustion_policy: ExhaustionPolicy::Deny,
        }
    }
}

impl PoolConfig {
    /// Pool with a fixed hard capacity and no prewarm.
    #[must_use]
    pub fn with_hard_capacity(hard_capacity: usize) -> Self {
        Self {
            soft_capacity: hard_capacity.min(Self::default().soft_capacity),
            hard_capacity,
            prewarm: 0,
            exhaustion_policy: ExhaustionPolicy::Deny,
        }
    }

    /// Validate and clamp values to sensible ranges.
    pub fn validate(&mut self) {
        self.hard_capacity = self.hard_capacity.clamp(1, u32::MAX as usize);
        self.soft_capacity = self.soft_capacity.min(self.hard_capacity).min(MAX_SOFT_CAPACITY);
        self.prewarm = self.prewarm.min(self.hard_capacity);
    }
}

/// Result of a successful acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquired {
    /// Handle of the instance now owned by the caller
    pub handle: ProjectileHandle,
    /// Handle that was invalidated to serve this request, under `RecycleOldest`
    pub evicted: Option<ProjectileHandle>,
}

#[derive(Debug, Clone)]
struct Slot {
    projectile: Projectile,
    generation: u32,
    live: bool,
    acquired_seq: u64,
}

/// Pool of projectile instances.
#[derive(Debug, Clone)]
pub struct ProjectilePool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    config: PoolConfig,
    profile: ProjectileProfile,
    next_seq: u64,
    base_generation: u32,
}

impl ProjectilePool {
    /// Create an empty pool. Nothing is constructed until prewarm or acquire.
    #[must_use]
    pub fn new(mut config: PoolConfig, profile: ProjectileProfile) -> Self {
        config.validate();
        Self {
            slots: Vec::with_capacity(config.soft_capacity),
            free: Vec::with_capacity(config.soft_capacity),
            config,
            profile,
            next_seq: 0,
            base_generation: 0,
        }
    }

    /// Make sure at least `count` instances exist (bounded by hard capacity),
    /// all of them idle. Returns how many were constructed.
    pub fn prewarm(&mut self, count: usize) -> usize {
        let target = count.min(self.config.hard_capacity);
        let mut built = 0;
        while self.slots.len() < target {
            let index = self.push_slot();
            self.free.push(index);
            built += 1;
        }
        if built > 0 {
            debug!("Prewarmed {built} projectiles ({} allocated)", self.slots.len());
        }
        built
    }

    fn push_slot(&mut self) -> u32 {
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            projectile: Projectile::new(self.profile),
            generation: self.base_generation,
            live: false,
            acquired_seq: 0,
        });
        index
    }

    /// Take an idle, reset instance stamped with the pool's default profile.
    pub fn acquire(&mut self) -> Result<Acquired, PoolError> {
        let profile = self.profile;
        self.acquire_with(profile)
    }

    /// Take an idle, reset instance stamped with `profile`.
    pub fn acquire_with(&mut self, profile: ProjectileProfile) -> Result<Acquired, PoolError> {
        let (index, evicted) = if let Some(index) = self.free.pop() {
            (index, None)
        } else if self.slots.len() < self.config.hard_capacity {
            let index = self.push_slot();
            debug!("Projectile pool grew to {}", self.slots.len());
            (index, None)
        } else {
            match self.config.exhaustion_policy {
                ExhaustionPolicy::Deny => {
                    debug!("Projectile pool exhausted at {}", self.config.hard_capacity);
                    return Err(PoolError::Exhausted {
                        hard_capacity: self.config.hard_capacity,
                    });
                },
                ExhaustionPolicy::RecycleOldest => {
                    let index = self.oldest_live().ok_or(PoolError::Exhausted {
                        hard_capacity: self.config.hard_capacity,
                    })?;
                    let slot = &mut self.slots[index as usize];
                    let old = ProjectileHandle::new(index, slot.generation);
                    slot.generation = slot.generation.wrapping_add(1);
                    slot.live = false;
                    debug!("Recycled oldest projectile {old}");
                    (index, Some(old))
                },
            }
        };

        let seq = self.next_seq;
        self.next_seq += 1;

        let slot = &mut self.slots[index as usize];
        slot.projectile.reset();
        slot.projectile.configure(profile);
        slot.live = true;
        slot.acquired_seq = seq;

        Ok(Acquired {
            handle: ProjectileHandle::new(index, slot.generation),
            evicted,
        })
    }

    fn oldest_live(&self) -> Option<u32> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.live)
            .min_by_key(|(_, s)| s.acquired_seq)
            .map(|(i, _)| i as u32)
    }

    /// Return an instance to the free list.
    ///
    /// Releasing a stale or already-free handle is a no-op and returns false.
    pub fn release(&mut self, handle: ProjectileHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index() as usize) else {
            return false;
        };
        if !slot.live || slot.generation != handle.generation() {
            return false;
        }

        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.projectile.reset();
        self.free.push(handle.index());
        true
    }

    /// Release every live instance. Returns the handles that were live.
    pub fn release_all(&mut self) -> Vec<ProjectileHandle> {
        let live: Vec<ProjectileHandle> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, s)| ProjectileHandle::new(i as u32, s.generation))
            .collect();
        for handle in &live {
            self.release(*handle);
        }
        live
    }

    /// Destroy every instance. Outstanding handles stay stale afterwards.
    pub fn clear(&mut self) {
        let newest = self.slots.iter().map(|s| s.generation).max().unwrap_or(0);
        self.base_generation = self.base_generation.max(newest).wrapping_add(1);
        self.slots.clear();
        self.free.clear();
        debug!("Projectile pool cleared");
    }

    /// Check whether `handle` refers to a live instance.
    #[must_use]
    pub fn is_live(&self, handle: ProjectileHandle) -> bool {
        self.slots
            .get(handle.index() as usize)
            .is_some_and(|s| s.live && s.generation == handle.generation())
    }

    /// Get a live instance.
    #[must_use]
    pub fn get(&self, handle: ProjectileHandle) -> Option<&Projectile> {
        self.slots
            .get(handle.index() as usize)
            .filter(|s| s.live && s.generation == handle.generation())
            .map(|s| &s.projectile)
    }

    /// Get a mutable live instance.
    pub fn get_mut(&mut self, handle: ProjectileHandle) -> Option<&mut Projectile> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|s| s.live && s.generation == handle.generation())
            .map(|s| &mut s.projectile)
    }

    /// Number of idle instances.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of instances handed out and not yet released.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of instances constructed so far.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    /// Soft capacity.
    #[must_use]
    pub const fn soft_capacity(&self) -> usize {
        self.config.soft_capacity
    }

    /// Hard capacity.
    #[must_use]
    pub const fn hard_capacity(&self) -> usize {
        self.config.hard_capacity
    }

    /// Pool configuration.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Default profile for new flights.
    #[must_use]
    pub const fn profile(&self) -> &ProjectileProfile {
        &self.profile
    }
}

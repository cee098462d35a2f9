//! Projectile notifications and the event bus that carries them.
//!
//! Every notification is fire-and-forget: publishing never blocks the
//! simulation. When the bus is full the event is dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use glam::Vec3;
use salvo_common::{ColliderId, ProjectileHandle, SurfaceKind};
use serde::{Deserialize, Serialize};

/// Why a flight ended without an impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryReason {
    /// Flight time reached the lifetime bound.
    Lifetime,
    /// Distance from spawn reached the travel bound.
    Distance,
    /// The host reported the round as no longer visible.
    Culled,
    /// Force-released by external code (owner destroyed, level reset).
    Cancelled,
    /// Reclaimed by the pool to serve a newer fire request.
    Evicted,
    /// Advance faulted; the round was isolated and released.
    Fault,
}

/// Notifications produced by the projectile core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProjectileEvent {
    /// A round struck something and terminated.
    Impact {
        /// Projectile that hit
        handle: ProjectileHandle,
        /// Exact contact point
        position: Vec3,
        /// Surface normal at the contact
        normal: Vec3,
        /// Material of the struck surface
        surface: SurfaceKind,
        /// Object that was struck
        collider: ColliderId,
        /// Damage delivered, if the object was damageable and still there
        damage_applied: Option<f32>,
    },
    /// A round deflected and keeps flying.
    Ricochet {
        /// Projectile that bounced
        handle: ProjectileHandle,
        /// Contact point
        position: Vec3,
        /// Surface normal at the contact
        normal: Vec3,
        /// Reflections so far, including this one
        ricochet_count: u8,
    },
    /// A round ended without an impact.
    Expired {
        /// Projectile that expired
        handle: ProjectileHandle,
        /// Last committed position
        position: Vec3,
        /// Why it ended
        reason: ExpiryReason,
    },
}

impl ProjectileEvent {
    /// Projectile this event is about.
    #[must_use]
    pub const fn handle(&self) -> ProjectileHandle {
        match self {
            Self::Impact { handle, .. }
            | Self::Ricochet { handle, .. }
            | Self::Expired { handle, .. } => *handle,
        }
    }

    /// Returns true for impact events.
    #[must_use]
    pub const fn is_impact(&self) -> bool {
        matches!(self, Self::Impact { .. })
    }

    /// Returns true for ricochet events.
    #[must_use]
    pub const fn is_ricochet(&self) -> bool {
        matches!(self, Self::Ricochet { .. })
    }
}

/// Destination for projectile notifications.
pub trait EventSink {
    /// Publish an event without waiting for any subscriber.
    fn emit(&mut self, event: ProjectileEvent);
}

impl EventSink for Vec<ProjectileEvent> {
    fn emit(&mut self, event: ProjectileEvent) {
        self.push(event);
    }
}

/// Bounded multi-consumer bus for projectile notifications.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Sender<ProjectileEvent>,
    receiver: Receiver<ProjectileEvent>,
    capacity: usize,
    dropped: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: ProjectileEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            },
            // The bus owns a receiver, so it cannot be disconnected while alive.
            Err(TrySendError::Disconnected(_)) => {},
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<ProjectileEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns a receiver that competes with other receivers for events.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ProjectileEvent> {
        self.receiver.clone()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events dropped because the bus was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventSink for EventBus {
    fn emit(&mut self, event: ProjectileEvent) {
        self.publish(event);
    }
}

//! Capabilities of struck objects.
//!
//! When a round impacts, the core asks the host two things about the struck
//! collider: can it take damage, and what is it made of. Both are answered
//! once at the hit site through [`TargetResolver`].

use glam::Vec3;
use salvo_common::{ColliderId, SurfaceKind};

/// Result of delivering damage to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Damage landed.
    Applied,
    /// The target went away between the hit query and delivery; counts as a miss.
    Vanished,
}

/// Something that can take damage at a point.
pub trait Damageable {
    /// Deliver `amount` damage at `hit_point`.
    fn apply_damage(&mut self, amount: f32, hit_point: Vec3) -> DamageOutcome;
}

/// Resolves capabilities of colliders reported by sweep hits.
pub trait TargetResolver {
    /// Damageable capability of `collider`, if it has one.
    fn try_get_damageable(&mut self, collider: ColliderId) -> Option<&mut dyn Damageable>;

    /// Surface of `collider`. Cosmetic only.
    fn query_surface(&self, collider: ColliderId) -> SurfaceKind {
        let _ = collider;
        SurfaceKind::Default
    }
}

/// Resolver for worlds where nothing takes damage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTargets;

impl TargetResolver for NoTargets {
    fn try_get_damageable(&mut self, _collider: ColliderId) -> Option<&mut dyn Damageable> {
        None
    }
}

//! Reference collidable world built from primitive shapes.
//!
//! `Arena` is a small, self-contained world used by tests, benches and the
//! headless demo: one-sided planes, spheres and boxes tagged with collision
//! layers and surface kinds, plus optional [`TrainingTarget`] damageables.
//! Hosts with a real physics backend implement [`CollisionWorld`] and
//! [`TargetResolver`] themselves.

use ahash::AHashMap;
use glam::Vec3;
use salvo_common::{ColliderId, CollisionLayer, SurfaceKind, SweepError};

use crate::capability::{DamageOutcome, Damageable, TargetResolver};
use crate::collision::{
    sweep_aabb, sweep_plane, sweep_sphere, CollisionWorld, Contact, SweepHit, SweepQuery,
};

/// Shape of an arena collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// One-sided infinite plane.
    Plane {
        /// Any point on the plane
        point: Vec3,
        /// Facing direction (unit length)
        normal: Vec3,
    },
    /// Solid sphere.
    Sphere {
        /// Center
        center: Vec3,
        /// Radius
        radius: f32,
    },
    /// Axis-aligned box.
    Aabb {
        /// Minimum corner
        min: Vec3,
        /// Maximum corner
        max: Vec3,
    },
}

impl Shape {
    fn sweep(&self, query: &SweepQuery) -> Option<Contact> {
        match *self {
            Self::Plane { point, normal } => sweep_plane(query, point, normal),
            Self::Sphere { center, radius } => sweep_sphere(query, center, radius),
            Self::Aabb { min, max } => sweep_aabb(query, min, max),
        }
    }
}

/// A collidable object in the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    /// Identifier reported in hits
    pub id: ColliderId,
    /// Geometry
    pub shape: Shape,
    /// Layer flag
    pub layer: CollisionLayer::Flags,
}

/// Static geometry of an arena.
#[derive(Debug, Clone, Default)]
pub struct ArenaGeometry {
    colliders: Vec<Collider>,
}

impl ArenaGeometry {
    /// All colliders.
    #[must_use]
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }
}

impl CollisionWorld for ArenaGeometry {
    fn sweep(&self, query: &SweepQuery) -> Result<Option<SweepHit>, SweepError> {
        if !query.start.is_finite() || !query.end.is_finite() {
            return Err(SweepError::QueryFailed {
                reason: "segment is not finite".to_string(),
            });
        }

        let length = query.length();
        let closest = self
            .colliders
            .iter()
            .filter(|c| CollisionLayer::matches(query.mask, c.layer))
            .filter_map(|c| c.shape.sweep(query).map(|contact| (c.id, contact)))
            .min_by(|a, b| a.1.fraction.total_cmp(&b.1.fraction));

        Ok(closest.map(|(collider, contact)| SweepHit {
            collider,
            point: query.point_at(contact.fraction) - contact.normal * query.radius,
            normal: contact.normal,
            fraction: contact.fraction,
            distance: contact.fraction * length,
        }))
    }
}

/// Damageable dummy used by the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTarget {
    health: f32,
    alive: bool,
    hits: Vec<(f32, Vec3)>,
}

impl TrainingTarget {
    /// Create a target with `health` hit points.
    #[must_use]
    pub fn new(health: f32) -> Self {
        Self {
            health,
            alive: true,
            hits: Vec::new(),
        }
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Whether the target still accepts damage.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Damage received so far as `(amount, point)`.
    #[must_use]
    pub fn hits(&self) -> &[(f32, Vec3)] {
        &self.hits
    }

    /// Remove the target from play; further damage is reported as vanished.
    pub fn despawn(&mut self) {
        self.alive = false;
    }
}

impl Damageable for TrainingTarget {
    fn apply_damage(&mut self, amount: f32, hit_point: Vec3) -> DamageOutcome {
        if !self.alive {
            return DamageOutcome::Vanished;
        }
        self.health -= amount;
        self.hits.push((amount, hit_point));
        if self.health <= 0.0 {
            self.health = 0.0;
            self.alive = false;
        }
        DamageOutcome::Applied
    }
}

/// Capabilities of arena colliders.
#[derive(Debug, Clone, Default)]
pub struct ArenaTargets {
    surfaces: AHashMap<ColliderId, SurfaceKind>,
    targets: AHashMap<ColliderId, TrainingTarget>,
}

impl TargetResolver for ArenaTargets {
    fn try_get_damageable(&mut self, collider: ColliderId) -> Option<&mut dyn Damageable> {
        self.targets
            .get_mut(&collider)
            .map(|t| t as &mut dyn Damageable)
    }

    fn query_surface(&self, collider: ColliderId) -> SurfaceKind {
        self.surfaces.get(&collider).copied().unwrap_or_default()
    }
}

/// A complete reference world.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    geometry: ArenaGeometry,
    targets: ArenaTargets,
    next_id: u32,
}

impl Arena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, shape: Shape, layer: CollisionLayer::Flags, surface: SurfaceKind) -> ColliderId {
        let id = ColliderId::new(self.next_id);
        self.next_id += 1;
        self.geometry.colliders.push(Collider { id, shape, layer });
        self.targets.surfaces.insert(id, surface);
        id
    }

    /// Add a one-sided plane facing `normal`.
    pub fn add_plane(
        &mut self,
        point: Vec3,
        normal: Vec3,
        layer: CollisionLayer::Flags,
        surface: SurfaceKind,
    ) -> ColliderId {
        let normal = normal.normalize_or_zero();
        self.add(Shape::Plane { point, normal }, layer, surface)
    }

    /// Add a solid sphere.
    pub fn add_sphere(
        &mut self,
        center: Vec3,
        radius: f32,
        layer: CollisionLayer::Flags,
        surface: SurfaceKind,
    ) -> ColliderId {
        self.add(Shape::Sphere { center, radius }, layer, surface)
    }

    /// Add an axis-aligned box.
    pub fn add_box(
        &mut self,
        min: Vec3,
        max: Vec3,
        layer: CollisionLayer::Flags,
        surface: SurfaceKind,
    ) -> ColliderId {
        self.add(Shape::Aabb { min: min.min(max), max: min.max(max) }, layer, surface)
    }

    /// Make `collider` damageable.
    pub fn attach_target(&mut self, collider: ColliderId, target: TrainingTarget) {
        self.targets.targets.insert(collider, target);
    }

    /// Damageable attached to `collider`.
    #[must_use]
    pub fn target(&self, collider: ColliderId) -> Option<&TrainingTarget> {
        self.targets.targets.get(&collider)
    }

    /// Mutable damageable attached to `collider`.
    pub fn target_mut(&mut self, collider: ColliderId) -> Option<&mut TrainingTarget> {
        self.targets.targets.get_mut(&collider)
    }

    /// Geometry and capabilities as separate borrows, ready for a tick.
    pub fn split(&mut self) -> (&ArenaGeometry, &mut ArenaTargets) {
        (&self.geometry, &mut self.targets)
    }

    /// Geometry.
    #[must_use]
    pub const fn geometry(&self) -> &ArenaGeometry {
        &self.geometry
    }

    /// Number of colliders.
    #[must_use]
    pub fn collider_count(&self) -> usize {
        self.geometry.colliders.len()
    }
}

impl CollisionWorld for Arena {
    fn sweep(&self, query: &SweepQuery) -> Result<Option<SweepHit>, SweepError> {
        self.geometry.sweep(query)
    }
}

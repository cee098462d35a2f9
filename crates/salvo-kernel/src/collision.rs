//! Swept collision contract and primitive shape sweeps.
//!
//! The kernel only ever asks one question of the world: "moving a sphere of
//! radius `r` from `start` to `end`, what is the closest blocking surface?".
//! A radius of zero degenerates to a ray cast, so there is a single code path
//! for thin and fat rounds alike.

use glam::Vec3;
use salvo_common::{ColliderId, CollisionLayer, SweepError};

/// Smallest segment length that is worth sweeping.
pub const MIN_SWEEP_DISTANCE: f32 = 0.001;

/// A swept-sphere query along a movement segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepQuery {
    /// Segment start (previous-tick position)
    pub start: Vec3,
    /// Segment end (candidate position)
    pub end: Vec3,
    /// Sphere radius (0.0 = ray)
    pub radius: f32,
    /// Layers that block the sweep
    pub mask: CollisionLayer::Flags,
}

impl SweepQuery {
    /// Create a new sweep query.
    #[must_use]
    pub const fn new(start: Vec3, end: Vec3, radius: f32, mask: CollisionLayer::Flags) -> Self {
        Self {
            start,
            end,
            radius,
            mask,
        }
    }

    /// Segment vector.
    #[must_use]
    pub fn delta(&self) -> Vec3 {
        self.end - self.start
    }

    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.delta().length()
    }

    /// Sphere center at fraction `t` along the segment.
    #[must_use]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.start + self.delta() * t
    }
}

/// Closest blocking contact found by a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Object that was struck
    pub collider: ColliderId,
    /// Contact point on the struck surface
    pub point: Vec3,
    /// Surface normal at the contact (unit length, facing the mover)
    pub normal: Vec3,
    /// Fraction of the segment travelled before contact (0.0 - 1.0)
    pub fraction: f32,
    /// Distance travelled along the segment before contact
    pub distance: f32,
}

/// The collidable world as seen by the projectile core.
pub trait CollisionWorld {
    /// Sweep a sphere along `query`, returning the closest blocking hit.
    fn sweep(&self, query: &SweepQuery) -> Result<Option<SweepHit>, SweepError>;
}

/// Time of impact of a primitive sweep, before the hit is attributed to a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Fraction along the segment (0.0 - 1.0)
    pub fraction: f32,
    /// Surface normal
    pub normal: Vec3,
}

/// Sweep a sphere against a one-sided infinite plane.
///
/// Only approaches from the side the normal points to are reported.
#[must_use]
pub fn sweep_plane(query: &SweepQuery, plane_point: Vec3, plane_normal: Vec3) -> Option<Contact> {
    let normal = plane_normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        return None;
    }

    let d0 = normal.dot(query.start - plane_point);
    let d1 = normal.dot(query.end - plane_point);
    let approach = d0 - d1;
    if approach <= 0.0 {
        return None;
    }

    let r = query.radius;
    if d0 < r {
        // Already touching while moving inward; only report if the center is still in front.
        return (d0 >= 0.0).then_some(Contact {
            fraction: 0.0,
            normal,
        });
    }
    if d1 > r {
        return None;
    }

    Some(Contact {
        fraction: ((d0 - r) / approach).clamp(0.0, 1.0),
        normal,
    })
}

/// Sweep a sphere against a solid sphere.
#[must_use]
pub fn sweep_sphere(query: &SweepQuery, center: Vec3, radius: f32) -> Option<Contact> {
    let delta = query.delta();
    let combined = radius + query.radius;
    let m = query.start - center;

    let c = m.length_squared() - combined * combined;
    if c <= 0.0 {
        let normal = m.normalize_or_zero();
        return (delta.dot(m) < 0.0 && normal != Vec3::ZERO).then_some(Contact {
            fraction: 0.0,
            normal,
        });
    }

    let a = delta.length_squared();
    if a <= f32::EPSILON {
        return None;
    }
    let b = m.dot(delta);
    if b >= 0.0 {
        return None;
    }

    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let t = (-b - discriminant.sqrt()) / a;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let normal = (query.point_at(t) - center).normalize_or_zero();
    Some(Contact {
        fraction: t,
        normal,
    })
}

/// Sweep a sphere against an axis-aligned box.
///
/// The box is inflated by the sphere radius (slab test against the
/// Minkowski box), which overestimates contact near the edges and corners.
/// A segment starting on or inside the box and moving toward its center is
/// reported at fraction 0.0, like [`sweep_sphere`].
#[must_use]
pub fn sweep_aabb(query: &SweepQuery, min: Vec3, max: Vec3) -> Option<Contact> {
    let min = min - Vec3::splat(query.radius);
    let max = max + Vec3::splat(query.radius);
    let delta = query.delta();

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let origin = query.start[axis];
        let dir = delta[axis];

        if dir.abs() <= f32::EPSILON {
            if origin < min[axis] || origin > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / dir;
        let mut t0 = (min[axis] - origin) * inv;
        let mut t1 = (max[axis] - origin) * inv;
        let mut face = -1.0;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
            face = 1.0;
        }

        if t0 >= t_enter {
            t_enter = t0;
            normal = Vec3::ZERO;
            normal[axis] = face;
        }
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return None;
        }
    }

    // No movement across any slab.
    if normal == Vec3::ZERO || t_enter > 1.0 || t_exit < 0.0 {
        return None;
    }

    if t_enter < 0.0 {
        // Started inside: only block a mover heading deeper in.
        let center = (min + max) * 0.5;
        if delta.dot(query.start - center) >= 0.0 {
            return None;
        }
    }

    Some(Contact {
        fraction: t_enter.max(0.0),
        normal,
    })
}

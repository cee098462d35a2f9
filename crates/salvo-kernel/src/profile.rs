//! Projectile tuning profiles.
//!
//! A profile is the per-round configuration every pooled instance is stamped
//! with when it is fired: ballistics, ricochet behavior, trail history and the
//! collision layers the round can hit. Profiles are plain serde data so hosts
//! can load them from their configuration files.

use salvo_common::CollisionLayer;
use serde::{Deserialize, Serialize};

/// Largest ricochet budget a profile may request.
pub const MAX_RICOCHET_LIMIT: u8 = 10;

/// Longest trail history a profile may request.
pub const MAX_TRAIL_LENGTH: usize = 256;

/// Flight physics of a round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ballistics {
    /// Default muzzle speed used by volleys (units/second)
    pub muzzle_speed: f32,
    /// Vertical acceleration applied along +Y (negative pulls down)
    pub gravity: f32,
    /// Linear drag coefficient (0.0 - 1.0)
    pub drag: f32,
    /// Sweep radius; 0.0 degenerates the sweep to a ray
    pub collision_radius: f32,
    /// Flight time after which the round expires (seconds)
    pub max_lifetime: f32,
    /// Straight-line distance from spawn after which the round expires
    pub max_travel_distance: f32,
}

impl Default for Ballistics {
    fn default() -> Self {
        Self {
            muzzle_speed: 150.0,
            gravity: 0.0,
            drag: 0.0,
            collision_radius: 0.3,
            max_lifetime: 5.0,
            max_travel_distance: 200.0,
        }
    }
}

/// Ricochet behavior of a round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RicochetParams {
    /// Maximum reflections per flight (0 disables ricochets)
    pub max_ricochets: u8,
    /// Fraction of speed lost on each reflection (0.0 - 1.0)
    pub velocity_loss: f32,
    /// Smallest incidence angle that can ricochet (degrees)
    pub min_angle: f32,
    /// Largest incidence angle that can ricochet (degrees)
    pub max_angle: f32,
    /// Probability that an eligible hit ricochets (0.0 - 1.0)
    pub chance: f32,
}

impl Default for RicochetParams {
    fn default() -> Self {
        Self {
            max_ricochets: 0,
            velocity_loss: 0.5,
            min_angle: 10.0,
            max_angle: 60.0,
            chance: 1.0,
        }
    }
}

impl RicochetParams {
    /// Ricochets switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns true if this profile can ricochet at all.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.max_ricochets > 0
    }

    /// Returns true if `angle` (degrees) lies inside the ricochet band.
    #[must_use]
    pub fn angle_in_band(&self, angle: f32) -> bool {
        angle >= self.min_angle && angle <= self.max_angle
    }
}

/// Trail history sampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailParams {
    /// Number of samples kept
    pub length: usize,
    /// How long a sample stays visible (seconds)
    pub lifetime: f32,
}

impl Default for TrailParams {
    fn default() -> Self {
        Self {
            length: 10,
            lifetime: 0.2,
        }
    }
}

/// Complete tuning of a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileProfile {
    /// Flight physics
    pub ballistics: Ballistics,
    /// Ricochet behavior
    pub ricochet: RicochetParams,
    /// Trail history
    pub trail: TrailParams,
    /// Layers the sweep test can hit
    pub hit_mask: CollisionLayer::Flags,
}

impl Default for ProjectileProfile {
    fn default() -> Self {
        Self {
            ballistics: Ballistics::default(),
            ricochet: RicochetParams::default(),
            trail: TrailParams::default(),
            hit_mask: CollisionLayer::PLAYER_FIRE,
        }
    }
}

impl ProjectileProfile {
    /// Set gravity.
    #[must_use]
    pub const fn with_gravity(mut self, gravity: f32) -> Self {
        self.ballistics.gravity = gravity;
        self
    }

    /// Set drag coefficient.
    #[must_use]
    pub const fn with_drag(mut self, drag: f32) -> Self {
        self.ballistics.drag = drag;
        self
    }

    /// Set collision radius.
    #[must_use]
    pub const fn with_radius(mut self, radius: f32) -> Self {
        self.ballistics.collision_radius = radius;
        self
    }

    /// Set maximum lifetime.
    #[must_use]
    pub const fn with_lifetime(mut self, lifetime: f32) -> Self {
        self.ballistics.max_lifetime = lifetime;
        self
    }

    /// Set maximum travel distance.
    #[must_use]
    pub const fn with_max_distance(mut self, distance: f32) -> Self {
        self.ballistics.max_travel_distance = distance;
        self
    }

    /// Set default muzzle speed.
    #[must_use]
    pub const fn with_muzzle_speed(mut self, speed: f32) -> Self {
        self.ballistics.muzzle_speed = speed;
        self
    }

    /// Set ricochet behavior.
    #[must_use]
    pub const fn with_ricochet(mut self, ricochet: RicochetParams) -> Self {
        self.ricochet = ricochet;
        self
    }

    /// Set hit mask.
    #[must_use]
    pub const fn with_hit_mask(mut self, mask: CollisionLayer::Flags) -> Self {
        self.hit_mask = mask;
        self
    }

    /// Validate and clamp values to sensible ranges.
    pub fn validate(&mut self) {
        let b = &mut self.ballistics;
        b.muzzle_speed = b.muzzle_speed.max(0.0);
        b.drag = b.drag.clamp(0.0, 1.0);
        b.collision_radius = b.collision_radius.max(0.0);
        b.max_lifetime = b.max_lifetime.max(0.0);
        b.max_travel_distance = b.max_travel_distance.max(0.0);

        let r = &mut self.ricochet;
        r.max_ricochets = r.max_ricochets.min(MAX_RICOCHET_LIMIT);
        r.velocity_loss = r.velocity_loss.clamp(0.0, 1.0);
        r.chance = r.chance.clamp(0.0, 1.0);
        r.min_angle = r.min_angle.clamp(0.0, 90.0);
        r.max_angle = r.max_angle.clamp(r.min_angle, 90.0);

        self.trail.length = self.trail.length.clamp(2, MAX_TRAIL_LENGTH);
        self.trail.lifetime = self.trail.lifetime.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = ProjectileProfile::default();
        assert_eq!(profile.ballistics.muzzle_speed, 150.0);
        assert_eq!(profile.ballistics.max_lifetime, 5.0);
        assert_eq!(profile.ballistics.max_travel_distance, 200.0);
        assert!(!profile.ricochet.enabled());
    }

    #[test]
    fn test_profile_validation() {
        let mut profile = ProjectileProfile::default().with_drag(3.0).with_radius(-1.0);
        profile.ricochet.max_ricochets = 40;
        profile.ricochet.chance = 2.0;
        profile.ricochet.min_angle = 70.0;
        profile.ricochet.max_angle = 20.0;

        profile.validate();

        assert_eq!(profile.ballistics.drag, 1.0);
        assert_eq!(profile.ballistics.collision_radius, 0.0);
        assert_eq!(profile.ricochet.max_ricochets, MAX_RICOCHET_LIMIT);
        assert_eq!(profile.ricochet.chance, 1.0);
        assert!(profile.ricochet.max_angle >= profile.ricochet.min_angle);
    }

    #[test]
    fn test_trail_length_is_bounded() {
        let mut profile = ProjectileProfile::default();
        profile.trail.length = usize::MAX;
        profile.validate();
        assert_eq!(profile.trail.length, MAX_TRAIL_LENGTH);

        profile.trail.length = 0;
        profile.validate();
        assert_eq!(profile.trail.length, 2);
    }

    #[test]
    fn test_angle_band() {
        let ricochet = RicochetParams::default();
        assert!(ricochet.angle_in_band(45.0));
        assert!(ricochet.angle_in_band(10.0));
        assert!(!ricochet.angle_in_band(75.0));
        assert!(!ricochet.angle_in_band(5.0));
    }
}

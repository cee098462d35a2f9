//! Multi-pellet fire requests (shotguns, burst weapons).
//!
//! Fire-rate and ammunition gating stay with the weapon; a volley is only the
//! geometry of one trigger pull.

use fastrand::Rng;
use glam::{EulerRot, Quat, Vec3};
use salvo_common::{FireError, ProjectileHandle};

use crate::projectile::FORWARD;

/// Largest spread half-angle accepted (degrees).
pub const MAX_SPREAD_DEGREES: f32 = 89.0;

/// One trigger pull.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volley {
    /// Muzzle position
    pub origin: Vec3,
    /// Aim direction
    pub aim: Vec3,
    /// Number of pellets
    pub pellets: u32,
    /// Random pitch/yaw half-angle per pellet (degrees)
    pub spread_degrees: f32,
    /// Damage per pellet
    pub damage: f32,
    /// Muzzle speed
    pub muzzle_speed: f32,
}

impl Volley {
    /// Single pellet, no spread.
    #[must_use]
    pub const fn new(origin: Vec3, aim: Vec3, damage: f32, muzzle_speed: f32) -> Self {
        Self {
            origin,
            aim,
            pellets: 1,
            spread_degrees: 0.0,
            damage,
            muzzle_speed,
        }
    }

    /// Set the pellet count.
    #[must_use]
    pub const fn with_pellets(mut self, pellets: u32) -> Self {
        self.pellets = pellets;
        self
    }

    /// Set the spread half-angle.
    #[must_use]
    pub const fn with_spread(mut self, spread_degrees: f32) -> Self {
        self.spread_degrees = spread_degrees;
        self
    }

    /// Direction of one pellet: the aim rotated by a random pitch and yaw
    /// within the spread. A degenerate aim is returned as is so fire
    /// validation rejects it.
    pub fn pellet_direction(&self, rng: &mut Rng) -> Vec3 {
        let spread = self.spread_degrees.clamp(0.0, MAX_SPREAD_DEGREES).to_radians();
        let Some(aim) = self.aim.try_normalize() else {
            return self.aim;
        };
        if spread == 0.0 {
            return aim;
        }

        let pitch = (rng.f32() * 2.0 - 1.0) * spread;
        let yaw = (rng.f32() * 2.0 - 1.0) * spread;
        let frame = Quat::from_rotation_arc(FORWARD, aim);
        let jitter = Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0);
        (frame * jitter * FORWARD).normalize()
    }
}

/// Outcome of firing a volley.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolleyReport {
    /// Pellets in flight
    pub fired: Vec<ProjectileHandle>,
    /// Pellets never fired
    pub dropped: u32,
    /// Why the first dropped pellet failed
    pub first_error: Option<FireError>,
}

impl VolleyReport {
    /// Whether every pellet was fired.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.dropped == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_spread_follows_aim() {
        let mut rng = Rng::with_seed(1);
        let volley = Volley::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0), 1.0, 10.0);
        assert!((volley.pellet_direction(&mut rng) - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_pellets_stay_in_cone() {
        let mut rng = Rng::with_seed(3);
        let aim = Vec3::new(1.0, 0.5, -0.25).normalize();
        let volley = Volley::new(Vec3::ZERO, aim, 1.0, 10.0)
            .with_pellets(8)
            .with_spread(10.0);

        let mut distinct = false;
        for _ in 0..200 {
            let dir = volley.pellet_direction(&mut rng);
            assert!((dir.length() - 1.0).abs() < 1e-4);
            // Combined pitch and yaw of 10 degrees each stays under 14.2.
            assert!(dir.angle_between(aim).to_degrees() <= 14.2);
            distinct |= dir.angle_between(aim) > 1e-3;
        }
        assert!(distinct);
    }

    #[test]
    fn test_same_seed_same_pattern() {
        let volley = Volley::new(Vec3::ZERO, Vec3::X, 1.0, 10.0).with_spread(5.0);
        let mut a = Rng::with_seed(9);
        let mut b = Rng::with_seed(9);
        for _ in 0..10 {
            assert_eq!(volley.pellet_direction(&mut a), volley.pellet_direction(&mut b));
        }
    }

    #[test]
    fn test_degenerate_aim_passes_through() {
        let mut rng = Rng::with_seed(1);
        let volley = Volley::new(Vec3::ZERO, Vec3::ZERO, 1.0, 10.0).with_spread(5.0);
        assert_eq!(volley.pellet_direction(&mut rng), Vec3::ZERO);
    }
}

//! Projectile flight physics and state machine.
//!
//! A projectile is a pooled, reusable instance. While `Flying` it is advanced
//! once per fixed tick:
//! - lifetime and distance bounds are checked first
//! - gravity and linear drag are integrated into the velocity
//! - the movement segment from the previous position is swept against the world
//! - the closest hit either ricochets (reflect, lose speed, keep flying) or
//!   impacts (deliver damage at the contact point, terminate)
//!
//! Terminal outcomes are reported to the caller as a [`StepOutcome`]; the
//! simulator owns unregistering the instance and returning it to the pool.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use salvo_kernel::projectile::{FlightState, Projectile};
//! use salvo_kernel::profile::ProjectileProfile;
//!
//! let mut projectile = Projectile::new(ProjectileProfile::default());
//! projectile
//!     .fire(Vec3::ZERO, Vec3::X, 25.0, 150.0)
//!     .expect("valid fire parameters");
//! assert_eq!(projectile.state(), FlightState::Flying);
//! assert!((projectile.speed() - 150.0).abs() < 1e-4);
//! ```

use fastrand::Rng;
use glam::{Quat, Vec3};
use salvo_common::{AdvanceFault, FireError, ProjectileHandle};
use tracing::trace;

use crate::capability::{DamageOutcome, TargetResolver};
use crate::collision::{CollisionWorld, SweepHit, SweepQuery, MIN_SWEEP_DISTANCE};
use crate::events::{EventSink, ExpiryReason, ProjectileEvent};
use crate::profile::ProjectileProfile;
use crate::trail::TrailHistory;

/// Local forward axis; orientation maps it onto the flight direction.
pub const FORWARD: Vec3 = Vec3::Z;

/// Distance a ricocheting round is pushed off the struck surface.
pub const RICOCHET_SURFACE_OFFSET: f32 = 0.1;

/// Below this squared speed the orientation is left as is.
const MIN_ORIENT_SPEED_SQ: f32 = 0.01;

/// Lifecycle state of a pooled instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightState {
    /// Idle in the pool.
    #[default]
    Pooled,
    /// In flight and registered with the simulator.
    Flying,
}

/// Result of advancing a projectile by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Still flying, nothing struck.
    Flying,
    /// Deflected off a surface; still flying.
    Ricocheted,
    /// Struck something and terminated.
    Impacted,
    /// Ended without an impact.
    Expired(ExpiryReason),
    /// Was not flying when advanced.
    Inactive,
}

impl StepOutcome {
    /// Whether the instance should leave the registry and return to the pool.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Impacted | Self::Expired(_) | Self::Inactive)
    }
}

/// Collaborators a projectile talks to while advancing.
pub struct StepEnv<'a> {
    /// Handle of the projectile being advanced
    pub handle: ProjectileHandle,
    /// Collidable world
    pub world: &'a dyn CollisionWorld,
    /// Damage and surface capabilities of struck objects
    pub targets: &'a mut dyn TargetResolver,
    /// Source of ricochet rolls
    pub rng: &'a mut Rng,
    /// Notification sink
    pub events: &'a mut dyn EventSink,
}

/// A single projectile's flight state.
#[derive(Debug, Clone)]
pub struct Projectile {
    state: FlightState,
    position: Vec3,
    previous_position: Vec3,
    spawn_position: Vec3,
    orientation: Quat,
    velocity: Vec3,
    damage: f32,
    elapsed: f32,
    distance_traveled: f32,
    ricochet_count: u8,
    profile: ProjectileProfile,
    trail: TrailHistory,
}

impl Default for Projectile {
    fn default() -> Self {
        Self::new(ProjectileProfile::default())
    }
}

impl Projectile {
    /// Create an idle instance stamped with `profile`.
    #[must_use]
    pub fn new(profile: ProjectileProfile) -> Self {
        Self {
            state: FlightState::Pooled,
            position: Vec3::ZERO,
            previous_position: Vec3::ZERO,
            spawn_position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            damage: 0.0,
            elapsed: 0.0,
            distance_traveled: 0.0,
            ricochet_count: 0,
            profile,
            trail: TrailHistory::new(profile.trail),
        }
    }

    /// Check fire parameters without touching any state.
    ///
    /// Returns the normalized direction.
    pub fn validate_fire(
        origin: Vec3,
        direction: Vec3,
        damage: f32,
        muzzle_speed: f32,
    ) -> Result<Vec3, FireError> {
        if !origin.is_finite() {
            return Err(FireError::InvalidParameters {
                reason: "origin is not finite",
            });
        }
        let Some(direction) = direction.try_normalize() else {
            return Err(FireError::InvalidParameters {
                reason: "direction is zero or not finite",
            });
        };
        if !muzzle_speed.is_finite() || muzzle_speed < 0.0 {
            return Err(FireError::InvalidParameters {
                reason: "muzzle speed must be finite and non-negative",
            });
        }
        if !damage.is_finite() || damage < 0.0 {
            return Err(FireError::InvalidParameters {
                reason: "damage must be finite and non-negative",
            });
        }
        Ok(direction)
    }

    /// Clear all per-flight state and return to `Pooled`.
    pub fn reset(&mut self) {
        self.state = FlightState::Pooled;
        self.velocity = Vec3::ZERO;
        self.previous_position = self.position;
        self.damage = 0.0;
        self.elapsed = 0.0;
        self.distance_traveled = 0.0;
        self.ricochet_count = 0;
        self.trail.clear();
    }

    /// Replace the tuning profile. Only meaningful while pooled.
    pub fn configure(&mut self, profile: ProjectileProfile) {
        self.profile = profile;
        self.trail.configure(profile.trail);
    }

    /// Launch from `origin` along `direction`.
    ///
    /// Rejected parameters leave the instance untouched.
    pub fn fire(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        damage: f32,
        muzzle_speed: f32,
    ) -> Result<(), FireError> {
        let direction = Self::validate_fire(origin, direction, damage, muzzle_speed)?;

        self.position = origin;
        self.previous_position = origin;
        self.spawn_position = origin;
        self.velocity = direction * muzzle_speed;
        self.orientation = Quat::from_rotation_arc(FORWARD, direction);
        self.damage = damage;
        self.elapsed = 0.0;
        self.distance_traveled = 0.0;
        self.ricochet_count = 0;
        self.trail.activate(origin);
        self.state = FlightState::Flying;
        Ok(())
    }

    /// Advance the flight by `dt` seconds.
    pub fn advance(
        &mut self,
        dt: f32,
        env: &mut StepEnv<'_>,
    ) -> Result<StepOutcome, AdvanceFault> {
        if self.state != FlightState::Flying {
            return Ok(StepOutcome::Inactive);
        }

        let ballistics = self.profile.ballistics;

        self.elapsed += dt;
        if self.elapsed >= ballistics.max_lifetime {
            return Ok(self.expire(ExpiryReason::Lifetime, env));
        }
        if self.range_from_spawn() >= ballistics.max_travel_distance {
            return Ok(self.expire(ExpiryReason::Distance, env));
        }

        self.velocity.y += ballistics.gravity * dt;
        let speed = self.velocity.length();
        if speed > 0.0 {
            self.velocity += -ballistics.drag * speed * (self.velocity / speed) * dt;
        }
        if !self.velocity.is_finite() {
            return Err(AdvanceFault::NonFinite { what: "velocity" });
        }

        let start = self.position;
        let candidate = start + self.velocity * dt;
        if !candidate.is_finite() {
            return Err(AdvanceFault::NonFinite { what: "position" });
        }
        self.previous_position = start;

        let step = candidate - start;
        let step_len = step.length();
        if step_len < MIN_SWEEP_DISTANCE {
            self.position = candidate;
            self.distance_traveled += step_len;
            return Ok(StepOutcome::Flying);
        }

        let query = SweepQuery::new(
            start,
            candidate,
            ballistics.collision_radius,
            self.profile.hit_mask,
        );
        match env.world.sweep(&query)? {
            None => {
                self.position = candidate;
                self.distance_traveled += step_len;
                self.face_velocity();
                self.trail.record(self.position, self.elapsed);
                Ok(StepOutcome::Flying)
            },
            Some(hit) => {
                self.distance_traveled += hit.distance.clamp(0.0, step_len);
                let incoming = step / step_len;
                if self.try_ricochet(&hit, incoming, env) {
                    return Ok(StepOutcome::Ricocheted);
                }
                self.position = query.point_at(hit.fraction);
                self.impact(&hit, env);
                Ok(StepOutcome::Impacted)
            },
        }
    }

    fn expire(&mut self, reason: ExpiryReason, env: &mut StepEnv<'_>) -> StepOutcome {
        trace!(handle = %env.handle, ?reason, "projectile expired");
        env.events.emit(ProjectileEvent::Expired {
            handle: env.handle,
            position: self.position,
            reason,
        });
        StepOutcome::Expired(reason)
    }

    fn try_ricochet(&mut self, hit: &SweepHit, incoming: Vec3, env: &mut StepEnv<'_>) -> bool {
        let ricochet = self.profile.ricochet;
        if self.ricochet_count >= ricochet.max_ricochets {
            return false;
        }
        if env.rng.f32() >= ricochet.chance {
            return false;
        }
        let incidence = (-incoming).angle_between(hit.normal).to_degrees();
        if !ricochet.angle_in_band(incidence) {
            return false;
        }

        let reflected = self.velocity - 2.0 * self.velocity.dot(hit.normal) * hit.normal;
        self.velocity = reflected * (1.0 - ricochet.velocity_loss);
        self.position = hit.point
            + hit.normal * (self.profile.ballistics.collision_radius + RICOCHET_SURFACE_OFFSET);
        self.previous_position = self.position;
        self.ricochet_count += 1;
        self.face_velocity();
        self.trail.record(self.position, self.elapsed);

        trace!(handle = %env.handle, incidence, count = self.ricochet_count, "ricochet");
        env.events.emit(ProjectileEvent::Ricochet {
            handle: env.handle,
            position: hit.point,
            normal: hit.normal,
            ricochet_count: self.ricochet_count,
        });
        true
    }

    fn impact(&mut self, hit: &SweepHit, env: &mut StepEnv<'_>) {
        let damage_applied = match env.targets.try_get_damageable(hit.collider) {
            Some(target) => match target.apply_damage(self.damage, hit.point) {
                DamageOutcome::Applied => Some(self.damage),
                DamageOutcome::Vanished => {
                    trace!(handle = %env.handle, collider = %hit.collider, "target vanished before damage");
                    None
                },
            },
            None => None,
        };
        let surface = env.targets.query_surface(hit.collider);

        env.events.emit(ProjectileEvent::Impact {
            handle: env.handle,
            position: hit.point,
            normal: hit.normal,
            surface,
            collider: hit.collider,
            damage_applied,
        });
    }

    fn face_velocity(&mut self) {
        if self.velocity.length_squared() > MIN_ORIENT_SPEED_SQ {
            self.orientation = Quat::from_rotation_arc(FORWARD, self.velocity.normalize());
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> FlightState {
        self.state
    }

    /// Check if the projectile is in flight.
    #[must_use]
    pub fn is_flying(&self) -> bool {
        self.state == FlightState::Flying
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Position at the start of the last tick.
    #[must_use]
    pub const fn previous_position(&self) -> Vec3 {
        self.previous_position
    }

    /// Where the current flight started.
    #[must_use]
    pub const fn spawn_position(&self) -> Vec3 {
        self.spawn_position
    }

    /// Current orientation (forward = +Z).
    #[must_use]
    pub const fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Current velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Get current speed.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Damage delivered on impact.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Flight time so far.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Path length flown so far, including ricochet legs.
    #[must_use]
    pub const fn distance_traveled(&self) -> f32 {
        self.distance_traveled
    }

    /// Straight-line distance from the spawn point.
    #[must_use]
    pub fn range_from_spawn(&self) -> f32 {
        self.position.distance(self.spawn_position)
    }

    /// Reflections so far.
    #[must_use]
    pub const fn ricochet_count(&self) -> u8 {
        self.ricochet_count
    }

    /// Tuning profile.
    #[must_use]
    pub const fn profile(&self) -> &ProjectileProfile {
        &self.profile
    }

    /// Trail history.
    #[must_use]
    pub const fn trail(&self) -> &TrailHistory {
        &self.trail
    }
}

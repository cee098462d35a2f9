//! Explicitly constructed simulation context.
//!
//! The context owns everything a host needs to run projectiles: the pool, the
//! registry, a seeded random source for ricochet rolls and volley spread, the
//! notification bus and the cancel channel. Hosts create one per session and
//! pass it around; there is no global instance.

use crossbeam_channel::{unbounded, Receiver, Sender};
use fastrand::Rng;
use glam::Vec3;
use salvo_common::{FireError, ProjectileHandle, StepError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capability::TargetResolver;
use crate::collision::CollisionWorld;
use crate::events::{EventBus, ExpiryReason, ProjectileEvent};
use crate::pool::{PoolConfig, ProjectilePool};
use crate::profile::ProjectileProfile;
use crate::projectile::{Projectile, StepEnv, StepOutcome};
use crate::simulator::{CancelRequest, Simulator, Visit};
use crate::volley::{Volley, VolleyReport};

/// Simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed timestep (seconds)
    pub fixed_dt: f32,
    /// Global cap on simultaneous flights
    pub max_in_flight: Option<usize>,
    /// Seed for ricochet rolls and spread; random when unset
    pub rng_seed: Option<u64>,
    /// Notification bus capacity
    pub event_capacity: usize,
    /// Pool sizing
    pub pool: PoolConfig,
    /// Profile used when a fire request does not carry one
    pub profile: ProjectileProfile,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_in_flight: None,
            rng_seed: None,
            event_capacity: 1024,
            pool: PoolConfig::default(),
            profile: ProjectileProfile::default(),
        }
    }
}

impl SimulationConfig {
    /// Validate and clamp values to sensible ranges.
    pub fn validate(&mut self) {
        if !self.fixed_dt.is_finite() || self.fixed_dt <= 0.0 {
            self.fixed_dt = 1.0 / 60.0;
        }
        self.event_capacity = self.event_capacity.max(1);
        self.pool.validate();
        self.profile.validate();
    }
}

/// A request to launch one projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireRequest {
    /// Muzzle position
    pub origin: Vec3,
    /// Flight direction; need not be normalized
    pub direction: Vec3,
    /// Damage delivered on impact
    pub damage: f32,
    /// Launch speed
    pub muzzle_speed: f32,
    /// Profile override for this round
    pub profile: Option<ProjectileProfile>,
}

impl FireRequest {
    /// Request using the context's default profile.
    #[must_use]
    pub const fn new(origin: Vec3, direction: Vec3, damage: f32, muzzle_speed: f32) -> Self {
        Self {
            origin,
            direction,
            damage,
            muzzle_speed,
            profile: None,
        }
    }

    /// Use `profile` for this round.
    #[must_use]
    pub const fn with_profile(mut self, profile: ProjectileProfile) -> Self {
        self.profile = Some(profile);
        self
    }
}

/// Counters for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Projectiles advanced
    pub advanced: usize,
    /// Ricochets resolved
    pub ricochets: usize,
    /// Impacts resolved
    pub impacts: usize,
    /// Flights ended by lifetime or distance
    pub expired: usize,
    /// Flights ended by a cancel, cull or eviction mark
    pub cancelled: usize,
    /// Flights isolated after a fault
    pub faults: usize,
}

impl TickReport {
    /// Flights that left the registry this tick.
    #[must_use]
    pub const fn released(&self) -> usize {
        self.impacts + self.expired + self.cancelled + self.faults
    }
}

/// Thread-safe handle for ending flights early.
///
/// Requests are applied as release marks by the next (or current) pass.
#[derive(Debug, Clone)]
pub struct Canceller {
    sender: Sender<CancelRequest>,
}

impl Canceller {
    /// Request that `handle` be released as cancelled.
    pub fn cancel(&self, handle: ProjectileHandle) -> bool {
        self.cancel_with(handle, ExpiryReason::Cancelled)
    }

    /// Request that `handle` be released with `reason`.
    ///
    /// Returns false if the context is gone.
    pub fn cancel_with(&self, handle: ProjectileHandle, reason: ExpiryReason) -> bool {
        self.sender.send(CancelRequest { handle, reason }).is_ok()
    }
}

/// Owns the pool, registry and notification plumbing of one session.
#[derive(Debug)]
pub struct SimulationContext {
    config: SimulationConfig,
    pool: ProjectilePool,
    simulator: Simulator,
    rng: Rng,
    events: EventBus,
    cancel_tx: Sender<CancelRequest>,
    cancel_rx: Receiver<CancelRequest>,
    ticks: u64,
}

impl Default for SimulationContext {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl SimulationContext {
    /// Build a context and prewarm its pool.
    #[must_use]
    pub fn new(mut config: SimulationConfig) -> Self {
        config.validate();

        let mut pool = ProjectilePool::new(config.pool, config.profile);
        pool.prewarm(config.pool.prewarm);
        let rng = config.rng_seed.map_or_else(Rng::new, Rng::with_seed);
        let (cancel_tx, cancel_rx) = unbounded();

        info!(
            "Simulation context ready: {} projectiles prewarmed, hard capacity {}",
            pool.allocated(),
            pool.hard_capacity()
        );

        Self {
            simulator: Simulator::new(config.max_in_flight),
            events: EventBus::new(config.event_capacity),
            config,
            pool,
            rng,
            cancel_tx,
            cancel_rx,
            ticks: 0,
        }
    }

    /// Launch one projectile.
    ///
    /// Invalid parameters are rejected before anything is taken from the pool.
    pub fn fire(&mut self, request: FireRequest) -> Result<ProjectileHandle, FireError> {
        Projectile::validate_fire(
            request.origin,
            request.direction,
            request.damage,
            request.muzzle_speed,
        )?;
        self.simulator.check_capacity()?;

        let mut profile = request.profile.unwrap_or(self.config.profile);
        profile.validate();
        let acquired = self.pool.acquire_with(profile)?;
        let handle = acquired.handle;

        if let Some(evicted) = acquired.evicted {
            // Reset keeps the last position of the reclaimed instance.
            let position = self.pool.get(handle).map_or(Vec3::ZERO, Projectile::position);
            self.simulator.unregister(evicted);
            self.events.publish(ProjectileEvent::Expired {
                handle: evicted,
                position,
                reason: ExpiryReason::Evicted,
            });
        }

        let launched = match self.pool.get_mut(handle) {
            Some(projectile) => projectile.fire(
                request.origin,
                request.direction,
                request.damage,
                request.muzzle_speed,
            ),
            None => Err(FireError::InvalidParameters {
                reason: "acquired handle is not live",
            }),
        };
        if let Err(err) = launched.and_then(|()| self.simulator.register(handle).map(|_| ())) {
            self.pool.release(handle);
            return Err(err);
        }

        debug!("Fired projectile {handle}");
        Ok(handle)
    }

    /// Fire every pellet of a volley. Stops at the first rejected pellet.
    pub fn fire_volley(&mut self, volley: &Volley) -> VolleyReport {
        let mut report = VolleyReport::default();
        for fired in 0..volley.pellets {
            let direction = volley.pellet_direction(&mut self.rng);
            let request = FireRequest::new(volley.origin, direction, volley.damage, volley.muzzle_speed);
            match self.fire(request) {
                Ok(handle) => report.fired.push(handle),
                Err(err) => {
                    debug!("Volley cut short after {fired} pellets: {err}");
                    report.dropped = volley.pellets - fired;
                    report.first_error = Some(err);
                    break;
                },
            }
        }
        report
    }

    /// Advance every flight by `dt` seconds.
    pub fn step(
        &mut self,
        dt: f32,
        world: &dyn CollisionWorld,
        targets: &mut dyn TargetResolver,
    ) -> Result<TickReport, StepError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(StepError::InvalidTimestep { dt });
        }

        let Self {
            pool,
            simulator,
            rng,
            events,
            cancel_rx,
            ..
        } = self;
        let mut report = TickReport::default();

        simulator.step(cancel_rx, |handle, visit| match visit {
            Visit::Release(reason) => {
                retire(pool, events, handle, reason);
                report.cancelled += 1;
                false
            },
            Visit::Advance => {
                let Some(projectile) = pool.get_mut(handle) else {
                    return false;
                };
                report.advanced += 1;

                let mut env = StepEnv {
                    handle,
                    world,
                    targets: &mut *targets,
                    rng: &mut *rng,
                    events: &mut *events,
                };
                match projectile.advance(dt, &mut env) {
                    Ok(outcome) => {
                        match outcome {
                            StepOutcome::Ricocheted => report.ricochets += 1,
                            StepOutcome::Impacted => report.impacts += 1,
                            StepOutcome::Expired(_) => report.expired += 1,
                            StepOutcome::Flying | StepOutcome::Inactive => {},
                        }
                        if outcome.is_terminal() {
                            pool.release(handle);
                            return false;
                        }
                        true
                    },
                    Err(fault) => {
                        warn!("Projectile {handle} faulted, releasing it: {fault}");
                        retire(pool, events, handle, ExpiryReason::Fault);
                        report.faults += 1;
                        false
                    },
                }
            },
        });

        self.ticks += 1;
        Ok(report)
    }

    /// End a flight now.
    ///
    /// Returns false for stale or already released handles. Use a
    /// [`Canceller`] from inside callbacks that run during a tick.
    pub fn force_release(&mut self, handle: ProjectileHandle, reason: ExpiryReason) -> bool {
        self.simulator.unregister(handle);
        retire(&mut self.pool, &self.events, handle, reason)
    }

    /// The host lost sight of a flight; release it.
    pub fn notify_invisible(&mut self, handle: ProjectileHandle) -> bool {
        self.force_release(handle, ExpiryReason::Culled)
    }

    /// End every flight (level reset). Returns how many were released.
    pub fn release_all(&mut self, reason: ExpiryReason) -> usize {
        let handles = self.simulator.handles().to_vec();
        handles
            .into_iter()
            .filter(|handle| self.force_release(*handle, reason))
            .count()
    }

    /// Handle for cancelling flights from other threads or mid-tick callbacks.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        Canceller {
            sender: self.cancel_tx.clone(),
        }
    }

    /// Take every pending notification.
    pub fn drain_events(&self) -> Vec<ProjectileEvent> {
        self.events.drain()
    }

    /// Receiver competing for notifications with other receivers.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ProjectileEvent> {
        self.events.subscribe()
    }

    /// Notification bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// A live projectile.
    #[must_use]
    pub fn projectile(&self, handle: ProjectileHandle) -> Option<&Projectile> {
        self.pool.get(handle)
    }

    /// Whether `handle` is in flight.
    #[must_use]
    pub fn is_active(&self, handle: ProjectileHandle) -> bool {
        self.simulator.contains(handle)
    }

    /// Number of flights.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.simulator.len()
    }

    /// Handles of every flight, in no particular order.
    #[must_use]
    pub fn active_handles(&self) -> &[ProjectileHandle] {
        self.simulator.handles()
    }

    /// The pool.
    #[must_use]
    pub const fn pool(&self) -> &ProjectilePool {
        &self.pool
    }

    /// Settings in use.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Fixed timestep.
    #[must_use]
    pub const fn fixed_dt(&self) -> f32 {
        self.config.fixed_dt
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Release `handle` and announce it. No-op for stale handles.
fn retire(
    pool: &mut ProjectilePool,
    events: &EventBus,
    handle: ProjectileHandle,
    reason: ExpiryReason,
) -> bool {
    let position = pool.get(handle).map(Projectile::position);
    if !pool.release(handle) {
        return false;
    }
    events.publish(ProjectileEvent::Expired {
        handle,
        position: position.unwrap_or(Vec3::ZERO),
        reason,
    });
    debug!("Released projectile {handle} ({reason:?})");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, TrainingTarget};
    use crate::capability::NoTargets;
    use crate::collision::{SweepHit, SweepQuery};
    use salvo_common::{CollisionLayer, SurfaceKind, SweepError};

    fn config(hard: usize) -> SimulationConfig {
        SimulationConfig {
            rng_seed: Some(11),
            pool: PoolConfig {
                prewarm: hard,
                ..PoolConfig::with_hard_capacity(hard)
            },
            profile: ProjectileProfile::default().with_hit_mask(CollisionLayer::ALL),
            ..SimulationConfig::default()
        }
    }

    fn shot(direction: Vec3) -> FireRequest {
        FireRequest::new(Vec3::ZERO, direction, 10.0, 100.0)
    }

    /// World whose backend always fails.
    struct BrokenWorld;

    impl CollisionWorld for BrokenWorld {
        fn sweep(&self, _query: &SweepQuery) -> Result<Option<SweepHit>, SweepError> {
            Err(SweepError::QueryFailed {
                reason: "backend offline".to_string(),
            })
        }
    }

    #[test]
    fn test_invalid_fire_consumes_nothing() {
        let mut ctx = SimulationContext::new(config(4));
        let free = ctx.pool().free_count();

        let err = ctx.fire(shot(Vec3::ZERO));
        assert!(matches!(err, Err(FireError::InvalidParameters { .. })));
        assert_eq!(ctx.pool().free_count(), free);
        assert_eq!(ctx.active_count(), 0);
    }

    #[test]
    fn test_fire_then_zero_step() {
        let mut ctx = SimulationContext::new(config(4));
        let handle = ctx.fire(FireRequest::new(Vec3::ONE, Vec3::X, 5.0, 150.0)).expect("fire");

        let report = ctx.step(0.0, &Arena::new(), &mut NoTargets).expect("step");
        assert_eq!(report.advanced, 1);
        let proj = ctx.projectile(handle).expect("still flying");
        assert_eq!(proj.position(), Vec3::ONE);
        assert!(proj.is_flying());
    }

    #[test]
    fn test_invalid_timestep_rejected() {
        let mut ctx = SimulationContext::new(config(4));
        for dt in [-0.1, f32::NAN, f32::INFINITY] {
            assert!(ctx.step(dt, &Arena::new(), &mut NoTargets).is_err());
        }
        assert_eq!(ctx.ticks(), 0);
    }

    #[test]
    fn test_impact_returns_instance_to_pool() {
        let mut arena = Arena::new();
        let target = arena.add_sphere(
            Vec3::new(5.0, 0.0, 0.0),
            1.0,
            CollisionLayer::ENEMY,
            SurfaceKind::Flesh,
        );
        arena.attach_target(target, TrainingTarget::new(100.0));

        let mut ctx = SimulationContext::new(config(4));
        let handle = ctx.fire(shot(Vec3::X)).expect("fire");
        let (world, targets) = arena.split();
        let report = ctx.step(0.1, world, targets).expect("step");

        assert_eq!(report.impacts, 1);
        assert_eq!(ctx.active_count(), 0);
        assert!(ctx.projectile(handle).is_none());
        assert_eq!(ctx.pool().live_count(), 0);
        assert_eq!(arena.target(target).map(TrainingTarget::health), Some(90.0));
    }

    #[test]
    fn test_fault_is_isolated() {
        let mut ctx = SimulationContext::new(config(4));
        let a = ctx.fire(shot(Vec3::X)).expect("fire");
        let b = ctx.fire(shot(Vec3::Y)).expect("fire");

        let report = ctx.step(0.1, &BrokenWorld, &mut NoTargets).expect("tick survives");
        assert_eq!(report.faults, 2);
        assert_eq!(ctx.active_count(), 0);

        let events = ctx.drain_events();
        for handle in [a, b] {
            assert!(events.iter().any(|e| matches!(
                e,
                ProjectileEvent::Expired { handle: h, reason: ExpiryReason::Fault, .. } if *h == handle
            )));
        }

        // The context keeps working afterwards.
        ctx.fire(shot(Vec3::X)).expect("fire after fault");
        let report = ctx.step(0.1, &Arena::new(), &mut NoTargets).expect("step");
        assert_eq!(report.faults, 0);
        assert_eq!(ctx.active_count(), 1);
    }

    /// World whose backend fails for upward segments only.
    struct NoSkyWorld;

    impl CollisionWorld for NoSkyWorld {
        fn sweep(&self, query: &SweepQuery) -> Result<Option<SweepHit>, SweepError> {
            if query.delta().y > 0.0 {
                return Err(SweepError::QueryFailed {
                    reason: "no geometry above".to_string(),
                });
            }
            Ok(None)
        }
    }

    #[test]
    fn test_fault_leaves_other_flights_running() {
        let mut ctx = SimulationContext::new(config(4));
        let level = ctx.fire(shot(Vec3::X)).expect("fire");
        let upward = ctx.fire(shot(Vec3::Y)).expect("fire");

        let report = ctx.step(0.1, &NoSkyWorld, &mut NoTargets).expect("tick survives");
        assert_eq!(report.advanced, 2);
        assert_eq!(report.faults, 1);
        assert!(!ctx.is_active(upward));
        assert!(ctx.is_active(level));

        let proj = ctx.projectile(level).expect("still flying");
        assert!((proj.position() - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
        assert!(matches!(
            ctx.drain_events().as_slice(),
            [ProjectileEvent::Expired { handle, reason: ExpiryReason::Fault, .. }] if *handle == upward
        ));
    }

    #[test]
    fn test_profile_override_is_clamped() {
        let mut ctx = SimulationContext::new(config(4));
        let mut wild = ProjectileProfile::default().with_radius(-2.0);
        wild.ricochet.velocity_loss = -1.0;
        wild.ricochet.chance = 5.0;
        wild.ricochet.max_ricochets = 50;

        let handle = ctx
            .fire(shot(Vec3::X).with_profile(wild))
            .expect("fire");
        let profile = ctx.projectile(handle).expect("flying").profile();
        assert_eq!(profile.ballistics.collision_radius, 0.0);
        assert_eq!(profile.ricochet.velocity_loss, 0.0);
        assert_eq!(profile.ricochet.chance, 1.0);
        assert_eq!(profile.ricochet.max_ricochets, crate::profile::MAX_RICOCHET_LIMIT);
    }

    #[test]
    fn test_force_release_is_idempotent() {
        let mut ctx = SimulationContext::new(config(4));
        let handle = ctx.fire(shot(Vec3::X)).expect("fire");

        assert!(ctx.force_release(handle, ExpiryReason::Cancelled));
        assert!(!ctx.force_release(handle, ExpiryReason::Cancelled));
        assert!(!ctx.notify_invisible(handle));
        assert_eq!(ctx.active_count(), 0);
        assert_eq!(ctx.drain_events().len(), 1);
    }

    #[test]
    fn test_canceller_applies_on_next_step() {
        let mut ctx = SimulationContext::new(config(4));
        let handle = ctx.fire(shot(Vec3::X)).expect("fire");
        let canceller = ctx.canceller();

        std::thread::spawn(move || canceller.cancel(handle))
            .join()
            .expect("thread");
        assert!(ctx.is_active(handle));

        let report = ctx.step(0.01, &Arena::new(), &mut NoTargets).expect("step");
        assert_eq!(report.cancelled, 1);
        assert_eq!(report.advanced, 0);
        assert!(!ctx.is_active(handle));
    }

    #[test]
    fn test_cull_reports_reason() {
        let mut ctx = SimulationContext::new(config(4));
        let handle = ctx.fire(shot(Vec3::X)).expect("fire");
        assert!(ctx.notify_invisible(handle));
        assert!(matches!(
            ctx.drain_events().as_slice(),
            [ProjectileEvent::Expired { reason: ExpiryReason::Culled, .. }]
        ));
    }

    #[test]
    fn test_in_flight_cap_is_checked_before_acquire() {
        let mut ctx = SimulationContext::new(SimulationConfig {
            max_in_flight: Some(2),
            ..config(8)
        });
        ctx.fire(shot(Vec3::X)).expect("fire");
        ctx.fire(shot(Vec3::X)).expect("fire");
        let free = ctx.pool().free_count();

        assert_eq!(
            ctx.fire(shot(Vec3::X)),
            Err(FireError::InFlightCapReached { cap: 2 })
        );
        assert_eq!(ctx.pool().free_count(), free);
    }

    #[test]
    fn test_recycle_oldest_evicts_first_round() {
        let mut cfg = config(2);
        cfg.pool.exhaustion_policy = crate::pool::ExhaustionPolicy::RecycleOldest;
        let mut ctx = SimulationContext::new(cfg);

        let first = ctx.fire(shot(Vec3::X)).expect("fire");
        let second = ctx.fire(shot(Vec3::Y)).expect("fire");
        let third = ctx.fire(shot(Vec3::Z)).expect("recycles");

        assert!(!ctx.is_active(first));
        assert!(ctx.is_active(second));
        assert!(ctx.is_active(third));
        assert_eq!(ctx.active_count(), 2);
        assert!(ctx.drain_events().iter().any(|e| matches!(
            e,
            ProjectileEvent::Expired { handle, reason: ExpiryReason::Evicted, .. } if *handle == first
        )));
    }

    #[test]
    fn test_volley_reports_dropped_pellets() {
        let mut ctx = SimulationContext::new(config(3));
        let volley = Volley::new(Vec3::ZERO, Vec3::X, 4.0, 80.0)
            .with_pellets(5)
            .with_spread(6.0);

        let report = ctx.fire_volley(&volley);
        assert_eq!(report.fired.len(), 3);
        assert_eq!(report.dropped, 2);
        assert_eq!(
            report.first_error,
            Some(FireError::PoolExhausted { hard_capacity: 3 })
        );
        assert!(!report.is_complete());
    }

    #[test]
    fn test_release_all() {
        let mut ctx = SimulationContext::new(config(4));
        for _ in 0..3 {
            ctx.fire(shot(Vec3::X)).expect("fire");
        }
        assert_eq!(ctx.release_all(ExpiryReason::Cancelled), 3);
        assert_eq!(ctx.active_count(), 0);
        assert_eq!(ctx.pool().live_count(), 0);
    }

    #[test]
    fn test_config_validation() {
        let mut cfg = SimulationConfig {
            fixed_dt: -1.0,
            event_capacity: 0,
            ..SimulationConfig::default()
        };
        cfg.validate();
        assert!(cfg.fixed_dt > 0.0);
        assert_eq!(cfg.event_capacity, 1);
    }
}

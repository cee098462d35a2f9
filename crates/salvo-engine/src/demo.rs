//! Headless demo scene.
//!
//! A closed concrete room with a ring of training targets and a turret in
//! the middle. The turret fires a volley at the next standing target every
//! `fire_interval` seconds; frames are simulated at `frame_rate` and turned
//! into fixed ticks by [`FixedStep`].

use anyhow::Result;
use glam::{Quat, Vec3};
use salvo_common::{ColliderId, CollisionLayer, SurfaceKind};
use salvo_kernel::arena::{Arena, TrainingTarget};
use salvo_kernel::context::{SimulationContext, TickReport};
use salvo_kernel::events::ProjectileEvent;
use salvo_kernel::volley::Volley;
use tracing::{debug, info};

use crate::config::{DemoConfig, SalvoConfig};
use crate::timing::FixedStep;

/// Height of the turret muzzle above the floor.
const MUZZLE_HEIGHT: f32 = 1.5;

/// Arena and targets of the demo.
#[derive(Debug)]
pub struct DemoScene {
    arena: Arena,
    targets: Vec<(ColliderId, Vec3)>,
    muzzle: Vec3,
}

impl DemoScene {
    /// Build the room and place the targets.
    #[must_use]
    pub fn build(config: &DemoConfig) -> Self {
        let mut arena = Arena::new();
        let half = config.arena_half_extent;

        arena.add_plane(Vec3::ZERO, Vec3::Y, CollisionLayer::WORLD, SurfaceKind::Concrete);
        arena.add_plane(
            Vec3::new(0.0, half, 0.0),
            Vec3::NEG_Y,
            CollisionLayer::WORLD,
            SurfaceKind::Concrete,
        );
        for (axis, surface) in [(Vec3::X, SurfaceKind::Metal), (Vec3::Z, SurfaceKind::Stone)] {
            for sign in [1.0, -1.0] {
                arena.add_plane(axis * half * sign, -axis * sign, CollisionLayer::WORLD, surface);
            }
        }

        let ring = half * 0.6;
        let targets = (0..config.targets)
            .map(|i| {
                let angle = i as f32 / config.targets.max(1) as f32 * std::f32::consts::TAU;
                let center = Vec3::new(ring * angle.cos(), MUZZLE_HEIGHT, ring * angle.sin());
                let id = arena.add_sphere(center, 1.0, CollisionLayer::ENEMY, SurfaceKind::Flesh);
                arena.attach_target(id, TrainingTarget::new(config.target_health));
                (id, center)
            })
            .collect();

        Self {
            arena,
            targets,
            muzzle: Vec3::new(0.0, MUZZLE_HEIGHT, 0.0),
        }
    }

    /// Next standing target after `cursor`, wrapping around.
    fn next_target(&self, cursor: usize) -> Option<(usize, Vec3)> {
        let count = self.targets.len();
        (0..count)
            .map(|offset| (cursor + offset) % count)
            .find(|&i| {
                self.arena
                    .target(self.targets[i].0)
                    .is_some_and(TrainingTarget::is_alive)
            })
            .map(|i| (i, self.targets[i].1))
    }

    /// Targets destroyed so far.
    #[must_use]
    pub fn destroyed(&self) -> usize {
        self.targets
            .iter()
            .filter(|(id, _)| self.arena.target(*id).is_some_and(|t| !t.is_alive()))
            .count()
    }

    /// The arena.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }
}

/// What happened during a demo run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemoSummary {
    /// Fixed ticks simulated
    pub ticks: u64,
    /// Trigger pulls
    pub volleys: u32,
    /// Pellets launched
    pub pellets_fired: usize,
    /// Pellets refused by the pool or the in-flight cap
    pub pellets_dropped: u32,
    /// Impacts resolved
    pub impacts: usize,
    /// Ricochets resolved
    pub ricochets: usize,
    /// Flights ended by lifetime or distance
    pub expired: usize,
    /// Flights isolated after a fault
    pub faults: usize,
    /// Damage that landed on targets
    pub damage_dealt: f32,
    /// Targets brought to zero health
    pub targets_destroyed: usize,
    /// Most flights in the air at once
    pub peak_in_flight: usize,
    /// Notifications lost to a full bus
    pub events_dropped: u64,
}

impl DemoSummary {
    fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.impacts += report.impacts;
        self.ricochets += report.ricochets;
        self.expired += report.expired;
        self.faults += report.faults;
    }
}

/// Run the demo scene to completion.
pub fn run(config: &SalvoConfig) -> Result<DemoSummary> {
    let demo = &config.demo;
    let mut ctx = SimulationContext::new(config.simulation.clone());
    let mut scene = DemoScene::build(demo);
    let events = ctx.subscribe();

    let dt = ctx.fixed_dt();
    let mut clock = FixedStep::new(dt)
        .with_max_dt(config.timing.max_frame_dt)
        .with_max_steps(config.timing.max_steps_per_frame);
    let frame_dt = 1.0 / config.timing.frame_rate as f32;
    let frames = (demo.duration * config.timing.frame_rate as f32).ceil() as u64;

    info!(
        "Demo: {} targets, {} frames at {} Hz, fixed dt {:.4}s",
        scene.targets.len(),
        frames,
        config.timing.frame_rate,
        dt
    );

    let mut summary = DemoSummary::default();
    let mut sim_time = 0.0;
    let mut next_fire = 0.0;
    let mut cursor = 0;

    for _ in 0..frames {
        for _ in 0..clock.accumulate(frame_dt) {
            if sim_time >= next_fire {
                let aim = match scene.next_target(cursor) {
                    Some((index, center)) => {
                        cursor = index + 1;
                        center - scene.muzzle
                    },
                    // Nothing left standing: sweep the walls.
                    None => Quat::from_rotation_y(summary.volleys as f32 * 0.7) * Vec3::X,
                };
                let volley = Volley::new(
                    scene.muzzle,
                    aim,
                    demo.damage,
                    config.simulation.profile.ballistics.muzzle_speed,
                )
                .with_pellets(demo.pellets)
                .with_spread(demo.spread_degrees);

                let report = ctx.fire_volley(&volley);
                summary.volleys += 1;
                summary.pellets_fired += report.fired.len();
                summary.pellets_dropped += report.dropped;
                if let Some(err) = report.first_error {
                    debug!("Volley {} short by {}: {err}", summary.volleys, report.dropped);
                }
                next_fire += demo.fire_interval;
            }

            let (world, targets) = scene.arena.split();
            let report = ctx.step(dt, world, targets)?;
            summary.absorb(&report);
            sim_time += dt;
        }

        summary.peak_in_flight = summary.peak_in_flight.max(ctx.active_count());
        for event in events.try_iter() {
            if let ProjectileEvent::Impact {
                damage_applied: Some(amount),
                ..
            } = event
            {
                summary.damage_dealt += amount;
            }
        }
    }

    summary.targets_destroyed = scene.destroyed();
    summary.events_dropped = ctx.events().dropped_count();

    info!(
        "Demo finished: {} ticks, {} volleys, {} pellets ({} dropped)",
        summary.ticks, summary.volleys, summary.pellets_fired, summary.pellets_dropped
    );
    info!(
        "Impacts {}, ricochets {}, expired {}, faults {}; {:.0} damage, {}/{} targets down",
        summary.impacts,
        summary.ricochets,
        summary.expired,
        summary.faults,
        summary.damage_dealt,
        summary.targets_destroyed,
        scene.targets.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_kernel::profile::RicochetParams;

    fn short_config() -> SalvoConfig {
        let mut config = SalvoConfig::default();
        config.demo.duration = 3.0;
        config.demo.targets = 4;
        config.demo.target_health = 50.0;
        config.simulation.profile.hit_mask = CollisionLayer::PLAYER_FIRE;
        config.validate();
        config
    }

    #[test]
    fn test_scene_layout() {
        let scene = DemoScene::build(&DemoConfig {
            targets: 5,
            ..DemoConfig::default()
        });
        // Floor, ceiling, four walls and the targets.
        assert_eq!(scene.arena().collider_count(), 6 + 5);
        assert_eq!(scene.destroyed(), 0);
        assert_eq!(scene.next_target(7).map(|(i, _)| i), Some(2));
    }

    #[test]
    fn test_demo_run_hits_targets() {
        let summary = run(&short_config()).expect("demo runs");
        assert!(summary.ticks >= 170);
        assert!(summary.volleys > 0);
        assert!(summary.impacts > 0);
        assert!(summary.damage_dealt > 0.0);
        assert_eq!(summary.faults, 0);
    }

    #[test]
    fn test_demo_is_deterministic() {
        let mut config = short_config();
        config.simulation.profile.ricochet = RicochetParams {
            max_ricochets: 2,
            ..RicochetParams::default()
        };
        let first = run(&config).expect("demo runs");
        let second = run(&config).expect("demo runs");
        assert_eq!(first, second);
    }

    #[test]
    fn test_small_pool_drops_pellets() {
        let mut config = short_config();
        config.simulation.pool.hard_capacity = 4;
        config.validate();
        let summary = run(&config).expect("demo runs");
        assert!(summary.pellets_dropped > 0);
        assert!(summary.peak_in_flight <= 4);
    }
}

//! Lock-guarded context for multi-threaded hosts.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use salvo_common::{FireError, ProjectileHandle, StepError};

use crate::capability::TargetResolver;
use crate::collision::CollisionWorld;
use crate::context::{Canceller, FireRequest, SimulationContext, TickReport};
use crate::events::ProjectileEvent;

/// A [`SimulationContext`] shared between threads.
///
/// Every operation takes the lock for its duration, so there is one writer at
/// a time. Cancels and notifications can bypass the lock through
/// [`Canceller`] and the event receiver.
#[derive(Debug, Clone)]
pub struct SharedSimulation {
    inner: Arc<Mutex<SimulationContext>>,
}

impl SharedSimulation {
    /// Wrap a context.
    #[must_use]
    pub fn new(context: SimulationContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    /// Launch one projectile.
    pub fn fire(&self, request: FireRequest) -> Result<ProjectileHandle, FireError> {
        self.inner.lock().fire(request)
    }

    /// Advance every flight by `dt` seconds.
    pub fn step(
        &self,
        dt: f32,
        world: &dyn CollisionWorld,
        targets: &mut dyn TargetResolver,
    ) -> Result<TickReport, StepError> {
        self.inner.lock().step(dt, world, targets)
    }

    /// Run `f` with exclusive access to the context.
    pub fn with<R>(&self, f: impl FnOnce(&mut SimulationContext) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Cancel handle that never waits on the lock.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        self.inner.lock().canceller()
    }

    /// Notification receiver that never waits on the lock.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ProjectileEvent> {
        self.inner.lock().subscribe()
    }

    /// Number of flights.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.lock().active_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::capability::NoTargets;
    use crate::context::SimulationConfig;
    use crate::pool::PoolConfig;
    use glam::Vec3;
    use std::thread;

    #[test]
    fn test_fire_from_many_threads() {
        let shared = SharedSimulation::new(SimulationContext::new(SimulationConfig {
            rng_seed: Some(5),
            pool: PoolConfig::with_hard_capacity(64),
            ..SimulationConfig::default()
        }));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    (0..8)
                        .filter(|_| {
                            shared
                                .fire(FireRequest::new(Vec3::ZERO, Vec3::X, 1.0, 50.0))
                                .is_ok()
                        })
                        .count()
                })
            })
            .collect();

        let fired: usize = workers
            .into_iter()
            .map(|w| w.join().expect("worker panicked"))
            .sum();
        assert_eq!(fired, 32);
        assert_eq!(shared.active_count(), 32);

        let arena = Arena::new();
        let report = shared.step(0.01, &arena, &mut NoTargets).expect("step");
        assert_eq!(report.advanced, 32);
    }

    #[test]
    fn test_events_reach_subscriber_thread() {
        let shared = SharedSimulation::new(SimulationContext::new(SimulationConfig {
            pool: PoolConfig::with_hard_capacity(4),
            ..SimulationConfig::default()
        }));
        let events = shared.subscribe();
        let handle = shared
            .fire(FireRequest::new(Vec3::ZERO, Vec3::X, 1.0, 50.0))
            .expect("fire");

        shared.canceller().cancel(handle);
        shared.step(0.01, &Arena::new(), &mut NoTargets).expect("step");

        let received = thread::spawn(move || events.try_iter().collect::<Vec<_>>())
            .join()
            .expect("subscriber panicked");
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].handle(), handle);
        assert_eq!(shared.with(|ctx| ctx.active_count()), 0);
    }
}

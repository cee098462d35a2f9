//! # Salvo Kernel
//!
//! Fixed-step projectile simulation with pooled instances.
//!
//! This crate provides the core of the projectile engine:
//! - Capacity-bounded pool of reusable projectile instances
//! - Per-projectile flight physics and state machine
//! - Swept collision against a host-provided world (ray or sphere)
//! - Ricochet and impact resolution
//! - A registry stepper that is safe against removal mid-pass
//! - Fire-and-forget notifications over a bounded event bus
//!
//! ## Architecture
//!
//! A [`SimulationContext`] owns the pool and the registry. Weapons call
//! [`SimulationContext::fire`]; the host calls [`SimulationContext::step`]
//! once per fixed tick with its [`CollisionWorld`] and [`TargetResolver`].
//! Projectiles never hold references back to the pool or the registry: an
//! advance reports a [`StepOutcome`] and the context does the release.
//!
//! ## Boundaries
//!
//! The kernel asks the host three things and tells it one:
//! - **Sweep**: closest blocking hit along a segment, filtered by layer
//! - **Damage**: does the struck collider take damage, and deliver it
//! - **Surface**: what the struck collider is made of (cosmetic)
//! - **Events**: impact, ricochet and expiry notifications
//!
//! [`arena::Arena`] is a small reference world implementing all of them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod arena;
pub mod capability;
pub mod collision;
pub mod context;
pub mod events;
pub mod pool;
pub mod profile;
pub mod projectile;
pub mod shared;
pub mod simulator;
pub mod trail;
pub mod volley;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::arena::*;
    pub use crate::capability::*;
    pub use crate::collision::*;
    pub use crate::context::*;
    pub use crate::events::*;
    pub use crate::pool::*;
    pub use crate::profile::*;
    pub use crate::projectile::*;
    pub use crate::shared::*;
    pub use crate::simulator::*;
    pub use crate::trail::*;
    pub use crate::volley::*;
    pub use salvo_common::prelude::*;
}

pub use prelude::*;

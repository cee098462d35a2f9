//! Salvo Engine - headless host for the projectile engine.
//!
//! This crate wires the kernel into a runnable program: configuration
//! loading, fixed-step frame timing and a demo scene.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod demo;
pub mod timing;

pub use config::SalvoConfig;
pub use demo::{run, DemoScene, DemoSummary};
pub use timing::FixedStep;

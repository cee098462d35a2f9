//! # Salvo Common
//!
//! Common types shared by the Salvo projectile engine crates:
//! - Handle and ID types (ProjectileHandle, ColliderId)
//! - Surface kinds and collision layers
//! - The error taxonomy
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod surface;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::surface::*;
}

pub use prelude::*;

//! Surface kinds and collision layers.

use serde::{Deserialize, Serialize};

/// Material of a struck surface.
///
/// Only used in notification payloads so audio/VFX collaborators can pick
/// their feedback. Never gates gameplay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// Concrete floors and walls.
    Concrete,
    /// Metal plates, vehicles.
    Metal,
    /// Dirt ground.
    Dirt,
    /// Living bodies.
    Flesh,
    /// Wooden props.
    Wood,
    /// Natural stone.
    Stone,
    /// Grass.
    Grass,
    /// Water surface.
    Water,
    /// Fallback when the struck object declares no surface.
    #[default]
    Default,
}

/// Collision layer flags for filtering sweep tests.
#[allow(non_snake_case)]
pub mod CollisionLayer {
    /// Layer flag type.
    pub type Flags = u32;

    /// Static level geometry.
    pub const WORLD: Flags = 1 << 0;
    /// Enemy bodies.
    pub const ENEMY: Flags = 1 << 1;
    /// Player body.
    pub const PLAYER: Flags = 1 << 2;
    /// Props and destructibles.
    pub const PROP: Flags = 1 << 3;
    /// Shields and barriers.
    pub const SHIELD: Flags = 1 << 4;
    /// Trigger volumes (never blocking by default).
    pub const TRIGGER: Flags = 1 << 5;
    /// All layers.
    pub const ALL: Flags = 0xFFFF_FFFF;
    /// No layers.
    pub const NONE: Flags = 0;

    /// Default mask for player-fired rounds.
    pub const PLAYER_FIRE: Flags = WORLD | ENEMY | PROP | SHIELD;
    /// Default mask for enemy-fired rounds.
    pub const ENEMY_FIRE: Flags = WORLD | PLAYER | PROP | SHIELD;

    /// Returns true if `layer` is selected by `mask`.
    #[must_use]
    pub const fn matches(mask: Flags, layer: Flags) -> bool {
        mask & layer != 0
    }
}

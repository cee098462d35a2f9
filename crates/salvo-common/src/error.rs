//! Error types for Salvo.

use thiserror::Error;

/// Top-level error type for Salvo operations.
#[derive(Debug, Error)]
pub enum SalvoError {
    /// Fire request rejected
    #[error("Fire rejected: {0}")]
    Fire(#[from] FireError),

    /// Pool errors
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Tick rejected
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Projectile pool errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// No free instance and the hard capacity is reached.
    #[error("projectile pool exhausted (hard capacity {hard_capacity})")]
    Exhausted {
        /// Hard capacity of the pool
        hard_capacity: usize,
    },
}

/// Reasons a fire request is rejected before any state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FireError {
    /// Degenerate direction, or non-finite/negative speed or damage.
    #[error("invalid fire parameters: {reason}")]
    InvalidParameters {
        /// What was wrong with the request
        reason: &'static str,
    },

    /// The pool could not supply an instance.
    #[error("projectile pool exhausted (hard capacity {hard_capacity})")]
    PoolExhausted {
        /// Hard capacity of the pool
        hard_capacity: usize,
    },

    /// The simulator's global in-flight cap is reached.
    #[error("in-flight projectile cap of {cap} reached")]
    InFlightCapReached {
        /// Configured cap
        cap: usize,
    },
}

impl From<PoolError> for FireError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Exhausted { hard_capacity } => Self::PoolExhausted { hard_capacity },
        }
    }
}

/// Failure reported by a collision backend during a sweep query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweepError {
    /// The backend could not answer the query
    #[error("sweep query failed: {reason}")]
    QueryFailed {
        /// Reason for failure
        reason: String,
    },
}

/// Fault local to a single projectile's advance.
///
/// The simulator isolates these: the faulting projectile is logged and
/// force-released, every other projectile keeps simulating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdvanceFault {
    /// Position or velocity became NaN or infinite
    #[error("non-finite {what} after integration")]
    NonFinite {
        /// Which quantity went bad
        what: &'static str,
    },

    /// The collision backend failed
    #[error(transparent)]
    Sweep(#[from] SweepError),
}

/// Errors rejecting a whole simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StepError {
    /// Timestep was negative, NaN or infinite
    #[error("invalid timestep {dt}")]
    InvalidTimestep {
        /// Offending timestep
        dt: f32,
    },
}

/// Result type alias for Salvo operations.
pub type SalvoResult<T> = Result<T, SalvoError>;

//! Error types for pool allocation and component-type registration.
//!
//! This module declares focused, composable error types used across the
//! storage and registration layers. Each error carries enough context to
//! make failures actionable while remaining small and cheap to pass around
//! or convert into the aggregate [`EcsError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure mode
//!   (pool exhaustion, registry capacity, duplicate registration).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into [`EcsError`].
//! * **Actionability:** Structured fields (requested vs. available
//!   capacity, the offending name) make logs useful without reproducing
//!   the issue.
//!
//! ## What is *not* an error
//! Lookups that miss — an unknown component name, a stale handle, an
//! entity id that was destroyed — return sentinel values (`None`, an
//! invalid handle) rather than an `Err`. Precondition violations such as
//! attaching a duplicate component type or parenting a cycle are rejected
//! with a debug assertion and degrade to a logged no-op in release builds.
//! Only resource exhaustion surfaces through these types.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is optimized for operator logs (short, single-line).
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

/// Returned when a pool cannot grow to satisfy an allocation because its
/// index space is exhausted.
///
/// This arises when the number of slots would exceed what a pool index can
/// address; the reserved sentinel index is never handed out.
///
/// ### Fields
/// * `slots_needed` — Total number of slots the operation required.
/// * `capacity` — The maximum addressable slot count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolExhaustedError {
    /// Total slots the operation attempted to address.
    pub slots_needed: u64,

    /// Maximum addressable slot count for the pool.
    pub capacity: u64,
}

impl fmt::Display for PoolExhaustedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pool slot limit reached ({} needed; capacity {})",
            self.slots_needed, self.capacity
        )
    }
}

impl std::error::Error for PoolExhaustedError {}

/// Errors produced while registering component types.
///
/// ## Context
/// Registration is a setup-time operation; these errors indicate a
/// misconfigured world rather than a recoverable runtime condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry cannot assign another type id.
    CapacityExceeded {
        /// Maximum number of registrable component types.
        cap: usize,
    },

    /// Another component type already registered under this name.
    DuplicateName {
        /// The name that collided.
        name: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::CapacityExceeded { cap } => {
                write!(f, "component type capacity exceeded (cap {})", cap)
            }
            RegistryError::DuplicateName { name } => {
                write!(f, "component name already registered: {}", name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Aggregate error for ECS operations.
///
/// `From<T>` conversions allow `?` from low-level operations while callers
/// keep matching on a single expressive type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A pool could not allocate another slot.
    Pool(PoolExhaustedError),

    /// Component-type registration failed.
    Registry(RegistryError),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::Pool(e) => write!(f, "{e}"),
            EcsError::Registry(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<PoolExhaustedError> for EcsError {
    fn from(e: PoolExhaustedError) -> Self {
        EcsError::Pool(e)
    }
}

impl From<RegistryError> for EcsError {
    fn from(e: RegistryError) -> Self {
        EcsError::Registry(e)
    }
}

/// Result alias used across the crate.
pub type EcsResult<T> = Result<T, EcsError>;

//! ECS System Abstractions
//!
//! This module defines the *system execution model* used by the runtime.
//!
//! A **system** is a unit of per-tick behavior. Systems:
//! - expose a numeric priority that orders them within a tick,
//! - are initialized lazily at the first tick boundary after registration,
//! - receive the full [`Manager`] during `update`,
//! - are torn down on removal or when the scheduler shuts down.
//!
//! ## Capability Set
//!
//! The [`System`] trait is the capability record the scheduler dispatches
//! through: `init`, `update`, `teardown`, and a `priority` accessor. Lower
//! priorities update earlier; registration order breaks ties.
//!
//! ## Function-backed Systems
//!
//! [`FnSystem`] defines a system from a closure without a dedicated type,
//! for simulation logic that has no state of its own.

use crate::engine::manager::Manager;
use crate::engine::types::SystemPriority;

/// A unit of per-tick behavior with a numeric priority.
///
/// Structural mutations performed from `update` follow the deferral rules
/// of the scheduler: entity and component mutations apply immediately,
/// system registration and removal are buffered until the tick boundary.
pub trait System {
    /// Human-readable name, for logs.
    fn name(&self) -> &str {
        "<system>"
    }

    /// Ordering key; lower values update first. Re-read by the scheduler
    /// after [`Manager::notify_system_priority_changed`].
    fn priority(&self) -> SystemPriority {
        0
    }

    /// Called once, at the first tick boundary after registration.
    fn init(&mut self, _ecs: &mut Manager) {}

    /// Called every tick, in priority order.
    fn update(&mut self, ecs: &mut Manager);

    /// Called on removal, or at scheduler shutdown in reverse priority
    /// order.
    fn teardown(&mut self, _ecs: &mut Manager) {}
}

/// A [`System`] backed by a closure.
pub struct FnSystem<F>
where
    F: FnMut(&mut Manager) + 'static,
{
    name: &'static str,
    priority: SystemPriority,
    update: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut Manager) + 'static,
{
    /// Creates a function-backed system.
    pub fn new(name: &'static str, priority: SystemPriority, update: F) -> Self {
        Self {
            name,
            priority,
            update,
        }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut Manager) + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> SystemPriority {
        self.priority
    }

    fn update(&mut self, ecs: &mut Manager) {
        (self.update)(ecs)
    }
}

//! System scheduling and execution.
//!
//! The scheduler owns registered systems and keeps them in a list sorted
//! stably by `(priority, registration order)`. One tick proceeds in four
//! phases:
//!
//! 1. **Integrate** — systems registered since the last tick are already in
//!    the ordered list; any whose priorities changed are re-sorted first
//!    (set-and-forget dirty flag), then every not-yet-initialized system
//!    gets `init`, in sorted order.
//! 2. **Update pass** — `update` on every system, in order.
//! 3. **Absorb** — registrations and removal requests buffered during the
//!    pass are folded in (handled by the manager, which detaches the
//!    scheduler for the duration of the pass).
//! 4. **Drain removals** — systems marked for removal during the pass get
//!    `teardown` and are erased.
//!
//! Registration outside a tick takes effect immediately (insertion into the
//! ordered list); `init` is always deferred to the next tick boundary.
//! Removal outside a tick tears the system down on the spot. Scheduler
//! shutdown tears systems down in reverse priority order.

use crate::engine::manager::Manager;
use crate::engine::systems::System;
use crate::engine::types::SystemPriority;

/// Identifies a registered system for later removal.
pub type SystemToken = u64;

struct SystemEntry {
    token: SystemToken,
    /// Priority cached at the last sort; refreshed when the dirty flag is
    /// set.
    priority: SystemPriority,
    initialized: bool,
    system: Box<dyn System>,
}

/// Priority-ordered system list with deferred structural mutation.
#[derive(Default)]
pub struct Scheduler {
    /// Sorted by `(priority, token)`; tokens grow with registration order.
    entries: Vec<SystemEntry>,
    /// Systems registered while a tick was running, not yet ordered.
    pending_new: Vec<(SystemToken, Box<dyn System>)>,
    /// Removal requests buffered during a tick.
    pending_removal: Vec<SystemToken>,
    priorities_dirty: bool,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of systems in the ordered list.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no system is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.pending_new.is_empty()
    }

    fn insertion_point(&self, priority: SystemPriority, token: SystemToken) -> usize {
        self.entries
            .partition_point(|entry| (entry.priority, entry.token) <= (priority, token))
    }

    /// Inserts a system into the ordered list immediately. Used for
    /// registrations outside a tick; `init` still waits for the next tick
    /// boundary.
    pub(crate) fn insert(&mut self, token: SystemToken, system: Box<dyn System>) {
        let priority = system.priority();
        let position = self.insertion_point(priority, token);
        log::debug!(
            "system '{}' registered (priority {}, token {})",
            system.name(),
            priority,
            token
        );
        self.entries.insert(
            position,
            SystemEntry {
                token,
                priority,
                initialized: false,
                system,
            },
        );
    }

    /// Buffers a registration received while a tick is running.
    pub(crate) fn buffer(&mut self, token: SystemToken, system: Box<dyn System>) {
        log::debug!(
            "system '{}' registration deferred to tick boundary (token {})",
            system.name(),
            token
        );
        self.pending_new.push((token, system));
    }

    /// Buffers a removal received while a tick is running.
    pub(crate) fn defer_removal(&mut self, token: SystemToken) {
        self.pending_removal.push(token);
    }

    /// Marks the ordered list as needing a re-sort before the next update
    /// pass.
    pub fn notify_priority_changed(&mut self) {
        self.priorities_dirty = true;
    }

    /// Folds another scheduler's buffered state into this one. The manager
    /// detaches the scheduler during a tick and leaves a stub in its place;
    /// everything the stub accumulated lands here.
    pub(crate) fn absorb(&mut self, mut stub: Scheduler) {
        for (token, system) in stub.pending_new.drain(..) {
            self.insert(token, system);
        }
        for entry in stub.entries.drain(..) {
            // Registrations that reached the stub outside a pass.
            let SystemEntry { token, system, .. } = entry;
            self.insert(token, system);
        }
        self.pending_removal.append(&mut stub.pending_removal);
        self.priorities_dirty |= stub.priorities_dirty;
    }

    fn refresh_order(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.priority = entry.system.priority();
        }
        self.entries
            .sort_by_key(|entry| (entry.priority, entry.token));
        self.priorities_dirty = false;
    }

    /// Integrate phase: re-sorts if priorities changed and initializes
    /// every not-yet-initialized system, in sorted order.
    pub(crate) fn begin_tick(&mut self, ecs: &mut Manager) {
        if self.priorities_dirty {
            self.refresh_order();
        }
        for position in 0..self.entries.len() {
            if !self.entries[position].initialized {
                self.entries[position].initialized = true;
                self.entries[position].system.init(ecs);
            }
        }
    }

    /// Update pass: calls `update` on every system in order.
    pub(crate) fn run_update_pass(&mut self, ecs: &mut Manager) {
        for position in 0..self.entries.len() {
            self.entries[position].system.update(ecs);
        }
    }

    /// Tears down and erases every system whose removal was requested
    /// during the pass.
    pub(crate) fn drain_removals(&mut self, ecs: &mut Manager) {
        let tokens: Vec<SystemToken> = self.pending_removal.drain(..).collect();
        for token in tokens {
            self.remove_now(token, ecs);
        }
    }

    /// Removes one system immediately, calling `teardown` if it was ever
    /// initialized.
    pub(crate) fn remove_now(&mut self, token: SystemToken, ecs: &mut Manager) {
        let Some(position) = self.entries.iter().position(|entry| entry.token == token) else {
            log::warn!("removal of unknown system token {}", token);
            return;
        };
        let mut entry = self.entries.remove(position);
        log::debug!("system '{}' removed (token {})", entry.system.name(), token);
        if entry.initialized {
            entry.system.teardown(ecs);
        }
    }

    /// Tears down every system in reverse priority order and clears the
    /// scheduler.
    pub(crate) fn teardown_all(&mut self, ecs: &mut Manager) {
        // A priority change may not have seen a tick boundary yet; the
        // reverse walk must follow current priorities.
        if self.priorities_dirty {
            self.refresh_order();
        }
        let mut entries = std::mem::take(&mut self.entries);
        for entry in entries.iter_mut().rev() {
            if entry.initialized {
                entry.system.teardown(ecs);
            }
        }
        self.pending_new.clear();
        self.pending_removal.clear();
        self.priorities_dirty = false;
    }
}

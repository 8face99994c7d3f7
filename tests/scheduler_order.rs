// Tick protocol: priority ordering, lazy init, deferred registration and
// removal, reverse-order teardown.
//
// Run:
//   cargo test --test scheduler_order -- --nocapture

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ecs_runtime::{FnSystem, Manager, System, SystemPriority};

type CallLog = Rc<RefCell<Vec<String>>>;

struct Probe {
    name: &'static str,
    priority: Rc<Cell<SystemPriority>>,
    log: CallLog,
}

impl Probe {
    fn new(name: &'static str, priority: SystemPriority, log: &CallLog) -> (Self, Rc<Cell<SystemPriority>>) {
        let priority = Rc::new(Cell::new(priority));
        (
            Self {
                name,
                priority: priority.clone(),
                log: log.clone(),
            },
            priority,
        )
    }
}

impl System for Probe {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> SystemPriority {
        self.priority.get()
    }

    fn init(&mut self, _ecs: &mut Manager) {
        self.log.borrow_mut().push(format!("{}.init", self.name));
    }

    fn update(&mut self, _ecs: &mut Manager) {
        self.log.borrow_mut().push(format!("{}.update", self.name));
    }

    fn teardown(&mut self, _ecs: &mut Manager) {
        self.log.borrow_mut().push(format!("{}.teardown", self.name));
    }
}

fn drain(log: &CallLog) -> Vec<String> {
    log.borrow_mut().drain(..).collect()
}

#[test]
fn priority_orders_init_and_update() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut ecs = Manager::new();

    let (a, a_priority) = Probe::new("a", 10, &log);
    let (b, _) = Probe::new("b", 5, &log);
    ecs.register_system(a);
    ecs.register_system(b);

    ecs.update();
    assert_eq!(drain(&log), ["b.init", "a.init", "b.update", "a.update"]);

    // Re-sort happens at the next tick boundary once notified.
    a_priority.set(1);
    ecs.notify_system_priority_changed();
    ecs.update();
    assert_eq!(drain(&log), ["a.update", "b.update"]);
}

#[test]
fn registration_order_breaks_priority_ties() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut ecs = Manager::new();

    let (first, _) = Probe::new("first", 3, &log);
    let (second, _) = Probe::new("second", 3, &log);
    ecs.register_system(first);
    ecs.register_system(second);

    ecs.update();
    assert_eq!(
        drain(&log),
        ["first.init", "second.init", "first.update", "second.update"]
    );
}

#[test]
fn system_registered_during_tick_joins_next_tick() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut ecs = Manager::new();

    let inner_log = log.clone();
    let registered = Rc::new(Cell::new(false));
    let registered_flag = registered.clone();
    let driver = FnSystem::new("driver", 0, move |ecs: &mut Manager| {
        inner_log.borrow_mut().push("driver.update".to_string());
        if !registered_flag.get() {
            registered_flag.set(true);
            let (late, _) = Probe::new("late", -1, &inner_log);
            ecs.register_system(late);
        }
    });
    ecs.register_system(driver);

    // The tick that performs the registration must not run the newcomer.
    ecs.update();
    assert_eq!(drain(&log), ["driver.update"]);

    // Next tick: initialized at the boundary, updated in priority order.
    ecs.update();
    assert_eq!(drain(&log), ["late.init", "late.update", "driver.update"]);
}

/// Registers a lower-priority probe from inside its own `init`.
struct Registrar {
    log: CallLog,
}

impl System for Registrar {
    fn name(&self) -> &str {
        "registrar"
    }

    fn priority(&self) -> SystemPriority {
        5
    }

    fn init(&mut self, ecs: &mut Manager) {
        self.log.borrow_mut().push("registrar.init".to_string());
        let (eager, _) = Probe::new("eager", 1, &self.log);
        ecs.register_system(eager);
    }

    fn update(&mut self, _ecs: &mut Manager) {
        self.log.borrow_mut().push("registrar.update".to_string());
    }
}

#[test]
fn system_registered_during_init_joins_the_current_tick() {
    // Only the update pass defers registrations; a system registered from
    // another system's init enters the ordered list immediately and is
    // initialized and updated within the same tick, in priority order.
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut ecs = Manager::new();
    ecs.register_system(Registrar { log: log.clone() });

    ecs.update();
    assert_eq!(
        drain(&log),
        [
            "registrar.init",
            "eager.init",
            "eager.update",
            "registrar.update"
        ]
    );

    ecs.update();
    assert_eq!(drain(&log), ["eager.update", "registrar.update"]);
}

#[test]
fn removal_during_tick_is_drained_at_the_boundary() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut ecs = Manager::new();

    let (victim, _) = Probe::new("victim", 10, &log);
    let victim_token = Rc::new(Cell::new(0));

    let inner_log = log.clone();
    let token_cell = victim_token.clone();
    let removed = Rc::new(Cell::new(false));
    let removed_flag = removed.clone();
    let driver = FnSystem::new("driver", 0, move |ecs: &mut Manager| {
        inner_log.borrow_mut().push("driver.update".to_string());
        if !removed_flag.get() {
            removed_flag.set(true);
            ecs.remove_system(token_cell.get());
        }
    });

    ecs.register_system(driver);
    victim_token.set(ecs.register_system(victim));

    // The victim still updates this tick; teardown fires at the boundary.
    // The init phase runs before the update pass, so victim.init leads.
    ecs.update();
    assert_eq!(
        drain(&log),
        ["victim.init", "driver.update", "victim.update", "victim.teardown"]
    );

    ecs.update();
    assert_eq!(drain(&log), ["driver.update"]);
}

#[test]
fn removal_outside_tick_is_immediate() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut ecs = Manager::new();

    let (probe, _) = Probe::new("p", 0, &log);
    let token = ecs.register_system(probe);
    ecs.update();
    drain(&log);

    ecs.remove_system(token);
    assert_eq!(drain(&log), ["p.teardown"]);

    ecs.update();
    assert!(drain(&log).is_empty());
}

#[test]
fn manager_teardown_destroys_in_reverse_priority_order() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut ecs = Manager::new();

    let (early, _) = Probe::new("early", 1, &log);
    let (late, _) = Probe::new("late", 2, &log);
    ecs.register_system(early);
    ecs.register_system(late);
    ecs.update();
    drain(&log);

    ecs.teardown();
    assert_eq!(drain(&log), ["late.teardown", "early.teardown"]);
}

#[test]
fn teardown_uses_current_priorities_after_a_change() {
    // A priority change without an intervening tick must still govern the
    // reverse-order teardown walk.
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut ecs = Manager::new();

    let (a, a_priority) = Probe::new("a", 1, &log);
    let (b, _) = Probe::new("b", 2, &log);
    ecs.register_system(a);
    ecs.register_system(b);
    ecs.update();
    drain(&log);

    // "a" now updates last, so it must be torn down first.
    a_priority.set(3);
    ecs.notify_system_priority_changed();
    ecs.teardown();
    assert_eq!(drain(&log), ["a.teardown", "b.teardown"]);
}

#[test]
fn uninitialized_system_is_not_torn_down() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut ecs = Manager::new();

    // Registered but never ticked: teardown must not fire for it.
    let (probe, _) = Probe::new("p", 0, &log);
    ecs.register_system(probe);
    ecs.teardown();
    assert!(drain(&log).is_empty());
}

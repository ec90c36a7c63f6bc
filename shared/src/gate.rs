//! Round-phase gate consumed by movement and shooting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Answers whether the match is currently in an active round.
pub trait CombatGate: Send + Sync {
    fn combat_enabled(&self) -> bool;
}

/// Gate that never closes. Used when no round controller is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOpen;

impl CombatGate for AlwaysOpen {
    fn combat_enabled(&self) -> bool {
        true
    }
}

/// Shared flag flipped by an external round controller.
#[derive(Debug, Clone)]
pub struct RoundGate {
    active: Arc<AtomicBool>,
}

impl RoundGate {
    pub fn new(active: bool) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(active)),
        }
    }

    pub fn open(&self) {
        self.active.store(true, Ordering::Release);
    }

    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl CombatGate for RoundGate {
    fn combat_enabled(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_gate_is_shared_between_clones() {
        let gate = RoundGate::new(false);
        let observer = gate.clone();
        assert!(!observer.combat_enabled());
        gate.open();
        assert!(observer.combat_enabled());
        gate.close();
        assert!(!observer.combat_enabled());
        assert!(AlwaysOpen.combat_enabled());
    }
}

//! Correction hysteresis: reconciliation and extrapolation cooldowns.
//!
//! Each entity owns a `CorrectionState` holding two restartable countdowns.
//! At most one of them runs at any instant; starting one stops the other.
//! The extrapolation cooldown additionally drives the transform authority mode:
//! it is `ServerOwned` exactly while extrapolation is running.
//!
//! ```text
//!   ClientOwned ──start_extrapolation──▶ ServerOwned(Extrapolating)
//!        ▲                                   │
//!        └──── stop / expiry / start_reconciliation ───┘
//! ```

use serde::{Deserialize, Serialize};

/// Restartable countdown timer.
#[derive(Debug, Clone)]
pub struct CooldownTimer {
    duration: f32,
    remaining: f32,
    running: bool,
}

impl CooldownTimer {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            remaining: 0.0,
            running: false,
        }
    }

    /// (Re)starts the countdown from its full duration.
    pub fn start(&mut self) {
        self.remaining = self.duration;
        self.running = true;
    }

    /// Stops the countdown. Returns true if it was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        self.remaining = 0.0;
        was_running
    }

    /// Advances the countdown. Returns true on the frame it expires.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.stop();
            true
        } else {
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }
}

/// Which side is the source of truth for an entity's transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthorityMode {
    #[default]
    ClientOwned,
    ServerOwned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionPhase {
    Idle,
    Reconciling,
    Extrapolating,
}

/// Authority transitions reported by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    EnteredExtrapolation,
    LeftExtrapolation,
}

#[derive(Debug, Clone)]
pub struct CorrectionState {
    reconciliation: CooldownTimer,
    extrapolation: CooldownTimer,
    authority: AuthorityMode,
}

impl CorrectionState {
    pub fn new(reconciliation_cooldown: f32, extrapolation_limit: f32) -> Self {
        Self {
            reconciliation: CooldownTimer::new(reconciliation_cooldown),
            extrapolation: CooldownTimer::new(extrapolation_limit),
            authority: AuthorityMode::ClientOwned,
        }
    }

    /// Starts the reconciliation cooldown, forcibly ending any extrapolation.
    pub fn start_reconciliation(&mut self) -> Option<Transition> {
        let transition = self.stop_extrapolation();
        self.reconciliation.start();
        self.debug_check();
        transition
    }

    /// Starts or refreshes the extrapolation cooldown, forcibly stopping reconciliation.
    pub fn start_extrapolation(&mut self) -> Option<Transition> {
        self.reconciliation.stop();
        let entered = !self.extrapolation.is_running();
        self.extrapolation.start();
        self.authority = AuthorityMode::ServerOwned;
        self.debug_check();
        entered.then_some(Transition::EnteredExtrapolation)
    }

    pub fn stop_extrapolation(&mut self) -> Option<Transition> {
        if self.extrapolation.stop() {
            self.authority = AuthorityMode::ClientOwned;
            Some(Transition::LeftExtrapolation)
        } else {
            None
        }
    }

    /// Advances both cooldowns by one frame.
    pub fn advance(&mut self, dt: f32) -> Option<Transition> {
        self.reconciliation.tick(dt);
        if self.extrapolation.tick(dt) {
            self.authority = AuthorityMode::ClientOwned;
            return Some(Transition::LeftExtrapolation);
        }
        None
    }

    /// Reconciliation is only permitted while client-owned with both cooldowns idle.
    pub fn can_reconcile(&self) -> bool {
        self.authority == AuthorityMode::ClientOwned
            && !self.reconciliation.is_running()
            && !self.extrapolation.is_running()
    }

    pub fn is_reconciling(&self) -> bool {
        self.reconciliation.is_running()
    }

    pub fn is_extrapolating(&self) -> bool {
        self.extrapolation.is_running()
    }

    pub fn authority(&self) -> AuthorityMode {
        self.authority
    }

    pub fn phase(&self) -> CorrectionPhase {
        if self.extrapolation.is_running() {
            CorrectionPhase::Extrapolating
        } else if self.reconciliation.is_running() {
            CorrectionPhase::Reconciling
        } else {
            CorrectionPhase::Idle
        }
    }

    /// True when the mutual-exclusion and authority invariants hold.
    pub fn invariant_holds(&self) -> bool {
        let exclusive = !(self.reconciliation.is_running() && self.extrapolation.is_running());
        let authority_matches = (self.authority == AuthorityMode::ServerOwned)
            == self.extrapolation.is_running();
        exclusive && authority_matches
    }

    fn debug_check(&self) {
        debug_assert!(self.invariant_holds(), "correction cooldowns overlap");
    }
}

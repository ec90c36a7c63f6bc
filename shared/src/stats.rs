//! Replicated combat stats and the authoritative damage entry point.

use serde::{Deserialize, Serialize};

pub type TeamId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub team: TeamId,
    pub health: f32,
    pub max_health: f32,
    pub defense: f32,
    pub is_dead: bool,
}

impl PlayerStats {
    pub fn new(team: TeamId) -> Self {
        Self {
            team,
            health: 100.0,
            max_health: 100.0,
            defense: 5.0,
            is_dead: false,
        }
    }

    pub fn with_defense(mut self, defense: f32) -> Self {
        self.defense = defense;
        self
    }
}

/// Result of one `apply_damage` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    /// Health actually removed after defense and the zero floor.
    pub applied: f32,
    pub new_health: f32,
    /// True only on the call that performed the death transition.
    pub died: bool,
}

impl PlayerStats {
    /// Applies `max(amount - defense, 0)` and flips `is_dead` at most once.
    pub fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        let effective = (amount - self.defense).max(0.0);
        let previous = self.health;
        self.health = (self.health - effective).max(0.0);

        let died = self.health <= 0.0 && !self.is_dead;
        if died {
            self.is_dead = true;
        }

        DamageOutcome {
            applied: previous - self.health,
            new_health: self.health,
            died,
        }
    }

    pub fn is_enemy_of(&self, other: &PlayerStats) -> bool {
        self.opposes(other.team)
    }

    /// Whether damage from `team` counts against this player.
    pub fn opposes(&self, team: TeamId) -> bool {
        self.team != team
    }
}

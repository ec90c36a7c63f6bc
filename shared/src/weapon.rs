//! Weapon definitions and the client-side fire cadence.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Resolved instantly by a server raycast.
    Hitscan,
    /// Spawns a server-simulated projectile moving at `speed` units/s.
    Projectile { speed: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub kind: WeaponKind,
    /// Seconds this weapon contributes to the fire interval.
    pub delay: f32,
    pub damage: f32,
}

impl Weapon {
    pub fn hitscan(name: &str, delay: f32, damage: f32) -> Self {
        Self {
            name: name.to_string(),
            kind: WeaponKind::Hitscan,
            delay,
            damage,
        }
    }

    pub fn projectile(name: &str, speed: f32, delay: f32, damage: f32) -> Self {
        Self {
            name: name.to_string(),
            kind: WeaponKind::Projectile { speed },
            delay,
            damage,
        }
    }
}

/// Sum of all weapon delays, floored at `min_interval`.
pub fn total_fire_interval(weapons: &[Weapon], min_interval: f32) -> f32 {
    let total: f32 = weapons.iter().map(|weapon| weapon.delay).sum();
    total.max(min_interval)
}

/// Restartable fire loop. Holding the trigger fires immediately, then once per
/// interval, cycling through the weapon list. Releasing cancels the pending shot.
#[derive(Debug, Clone)]
pub struct FireLoop {
    interval: f32,
    weapon_count: usize,
    next_weapon: usize,
    firing: bool,
    until_next: f32,
}

impl FireLoop {
    pub fn new(weapons: &[Weapon], min_interval: f32) -> Self {
        Self {
            interval: total_fire_interval(weapons, min_interval),
            weapon_count: weapons.len(),
            next_weapon: 0,
            firing: false,
            until_next: 0.0,
        }
    }

    /// Trigger pressed. Returns the weapon index to fire now, if any.
    pub fn press(&mut self) -> Option<usize> {
        if self.firing || self.weapon_count == 0 {
            return None;
        }
        self.firing = true;
        Some(self.fire())
    }

    /// Trigger released: the scheduled shot is discarded.
    pub fn release(&mut self) {
        self.firing = false;
        self.until_next = 0.0;
    }

    /// Advances the loop by one frame. Returns a weapon index when a shot is due.
    pub fn update(&mut self, dt: f32) -> Option<usize> {
        if !self.firing {
            return None;
        }
        self.until_next -= dt;
        if self.until_next <= 0.0 {
            Some(self.fire())
        } else {
            None
        }
    }

    fn fire(&mut self) -> usize {
        let index = self.next_weapon;
        self.next_weapon = (self.next_weapon + 1) % self.weapon_count;
        self.until_next = self.interval;
        index
    }

    pub fn is_firing(&self) -> bool {
        self.firing
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn loadout() -> Vec<Weapon> {
        vec![
            Weapon::hitscan("bolt", 0.2, 20.0),
            Weapon::projectile("orb", 31.0, 0.3, 35.0),
        ]
    }

    #[test]
    fn test_interval_is_sum_of_delays() {
        assert_approx_eq!(total_fire_interval(&loadout(), 1.0 / 28.0), 0.5, 1e-6);
    }

    #[test]
    fn test_interval_floor() {
        let weapons = vec![Weapon::hitscan("fast", 0.0, 5.0)];
        assert_approx_eq!(total_fire_interval(&weapons, 1.0 / 28.0), 1.0 / 28.0, 1e-6);
        assert_approx_eq!(total_fire_interval(&[], 1.0 / 28.0), 1.0 / 28.0, 1e-6);
    }

    #[test]
    fn test_press_fires_immediately_and_cycles() {
        let mut fire = FireLoop::new(&loadout(), 1.0 / 28.0);
        assert_eq!(fire.press(), Some(0));
        assert_eq!(fire.press(), None);
        assert_eq!(fire.update(0.3), None);
        assert_eq!(fire.update(0.25), Some(1));
        assert_eq!(fire.update(0.5), Some(0));
    }

    #[test]
    fn test_release_cancels_pending_shot() {
        let mut fire = FireLoop::new(&loadout(), 1.0 / 28.0);
        fire.press();
        fire.update(0.4);
        fire.release();
        assert!(!fire.is_firing());
        assert_eq!(fire.update(1.0), None);
        // The rotation continues where it left off.
        assert_eq!(fire.press(), Some(1));
    }

    #[test]
    fn test_empty_loadout_never_fires() {
        let mut fire = FireLoop::new(&[], 1.0 / 28.0);
        assert_eq!(fire.press(), None);
        assert_eq!(fire.update(1.0), None);
    }
}

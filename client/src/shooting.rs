//! Fire control: turns trigger presses into `ShotRecord`s for the server.

use shared::{
    CombatConfig, CombatGate, EntityId, FireLoop, Outbox, Packet, Quat, ShotRecord, Tick, Vec3,
};

/// Where a shot leaves from and which way it goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aim {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Aim {
    /// Aim from eye height along the body's facing.
    pub fn from_pose(position: Vec3, rotation: Quat, eye_height: f32) -> Self {
        Self {
            origin: position + Vec3::new(0.0, eye_height, 0.0),
            direction: rotation.mul_vec3(Vec3::Z),
        }
    }
}

pub struct Shooter {
    entity_id: EntityId,
    fire_loop: FireLoop,
    shots_fired: u32,
}

impl Shooter {
    pub fn new(entity_id: EntityId, combat: &CombatConfig) -> Self {
        Self {
            entity_id,
            fire_loop: FireLoop::new(&combat.weapons, combat.min_fire_interval),
            shots_fired: 0,
        }
    }

    /// Trigger pressed: fires at once unless combat is disabled.
    pub fn press(
        &mut self,
        aim: Aim,
        tick: Tick,
        now_ms: u64,
        gate: &dyn CombatGate,
        outbox: &Outbox,
    ) -> Option<ShotRecord> {
        if !gate.combat_enabled() {
            return None;
        }
        let weapon = self.fire_loop.press()?;
        Some(self.fire(weapon, aim, tick, now_ms, outbox))
    }

    pub fn release(&mut self) {
        self.fire_loop.release();
    }

    /// Per-frame update of the fire loop. A closed gate cancels held fire.
    pub fn update(
        &mut self,
        dt: f32,
        aim: Aim,
        tick: Tick,
        now_ms: u64,
        gate: &dyn CombatGate,
        outbox: &Outbox,
    ) -> Option<ShotRecord> {
        if !gate.combat_enabled() {
            self.fire_loop.release();
            return None;
        }
        let weapon = self.fire_loop.update(dt)?;
        Some(self.fire(weapon, aim, tick, now_ms, outbox))
    }

    fn fire(&mut self, weapon_index: usize, aim: Aim, tick: Tick, now_ms: u64, outbox: &Outbox) -> ShotRecord {
        let shot = ShotRecord {
            tick,
            shooter_id: self.entity_id,
            origin: aim.origin,
            direction: aim.direction.normalize_or_zero(),
            sent_at: now_ms,
            weapon_index,
        };
        self.shots_fired += 1;
        outbox.to_server(Packet::Shot(shot));
        shot
    }

    pub fn is_firing(&self) -> bool {
        self.fire_loop.is_firing()
    }

    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::bus::drain;
    use shared::{AlwaysOpen, Role, RoundGate};

    fn aim() -> Aim {
        Aim::from_pose(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY, 0.5)
    }

    #[test]
    fn test_aim_from_pose() {
        let aim = Aim::from_pose(Vec3::new(1.0, 1.0, 0.0), Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), 0.5);
        assert_approx_eq!(aim.origin.y, 1.5);
        assert_approx_eq!(aim.direction.length(), 1.0, 1e-5);
        assert_approx_eq!(aim.direction.y, 0.0, 1e-5);
    }

    #[test]
    fn test_press_fires_and_sends() {
        let mut shooter = Shooter::new(3, &CombatConfig::default());
        let (outbox, mut rx) = Outbox::channel(Role::Client(3));

        let shot = shooter.press(aim(), 12, 500, &AlwaysOpen, &outbox).unwrap();
        assert_eq!(shot.tick, 12);
        assert_eq!(shot.shooter_id, 3);
        assert_eq!(shot.weapon_index, 0);
        assert_eq!(shot.sent_at, 500);

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].packet, Packet::Shot(shot));
    }

    #[test]
    fn test_held_fire_cycles_weapons() {
        let combat = CombatConfig::default();
        let interval = FireLoop::new(&combat.weapons, combat.min_fire_interval).interval();
        let mut shooter = Shooter::new(1, &combat);
        let (outbox, _rx) = Outbox::channel(Role::Client(1));

        shooter.press(aim(), 1, 0, &AlwaysOpen, &outbox);
        assert!(shooter
            .update(interval * 0.5, aim(), 2, 0, &AlwaysOpen, &outbox)
            .is_none());
        let second = shooter
            .update(interval * 0.6, aim(), 3, 0, &AlwaysOpen, &outbox)
            .unwrap();
        assert_eq!(second.weapon_index, 1);
        assert_eq!(shooter.shots_fired(), 2);
    }

    #[test]
    fn test_release_cancels_pending_shot() {
        let mut shooter = Shooter::new(1, &CombatConfig::default());
        let (outbox, _rx) = Outbox::channel(Role::Client(1));

        shooter.press(aim(), 1, 0, &AlwaysOpen, &outbox);
        shooter.release();
        assert!(!shooter.is_firing());
        assert!(shooter.update(10.0, aim(), 2, 0, &AlwaysOpen, &outbox).is_none());
    }

    #[test]
    fn test_closed_gate_blocks_fire() {
        let mut shooter = Shooter::new(1, &CombatConfig::default());
        let (outbox, mut rx) = Outbox::channel(Role::Client(1));
        let gate = RoundGate::new(false);

        assert!(shooter.press(aim(), 1, 0, &gate, &outbox).is_none());
        assert!(drain(&mut rx).is_empty());

        gate.open();
        shooter.press(aim(), 1, 0, &gate, &outbox);
        gate.close();
        assert!(shooter.update(10.0, aim(), 2, 0, &gate, &outbox).is_none());
        assert!(!shooter.is_firing());
    }
}

//! Deterministic player movement shared by prediction, authority and replay.
//!
//! `simulate` is a pure function of the current physical state, the movement
//! command and the ground sensor reading. Re-running it with identical
//! arguments yields identical results, which is what makes reconciliation
//! replay converge on the authoritative state.

use crate::math::{project_on_plane, wrap_angle, yaw, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Movement tuning. Both roles must use identical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub move_speed: f32,
    pub movement_multiplier: f32,
    pub air_multiplier: f32,
    pub ground_drag: f32,
    pub air_drag: f32,
    pub gravity: f32,
    pub jump_force: f32,
    pub player_height: f32,
    /// Extra reach below the feet that still counts as grounded.
    pub ground_distance: f32,
    /// Stick deflection at or beyond this is treated as full input.
    pub input_snap: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            movement_multiplier: 10.0,
            air_multiplier: 0.4,
            ground_drag: 6.0,
            air_drag: 1.0,
            gravity: 9.81,
            jump_force: 5.0,
            player_height: 2.0,
            ground_distance: 0.4,
            input_snap: 0.7,
        }
    }
}

/// Two-axis movement input in the entity's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveInput {
    pub forward: f32,
    pub strafe: f32,
}

impl MoveInput {
    pub const fn new(forward: f32, strafe: f32) -> Self {
        Self { forward, strafe }
    }
}

/// Everything a single simulation step consumes from the player.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveCommand {
    pub movement: MoveInput,
    pub look_yaw: f32,
    pub jump: bool,
}

impl MoveCommand {
    /// Same heading, no player-driven motion.
    pub fn idle(&self) -> MoveCommand {
        MoveCommand {
            movement: MoveInput::default(),
            look_yaw: self.look_yaw,
            jump: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhysicalState {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl PhysicalState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// Ground/slope sensor reading taken at the state's position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroundSensor {
    pub grounded: bool,
    /// Surface normal when standing on a non-flat surface.
    pub slope_normal: Option<Vec3>,
}

impl GroundSensor {
    pub fn on_slope(&self) -> bool {
        self.grounded && self.slope_normal.is_some()
    }
}

fn snap_axis(value: f32, snap: f32) -> f32 {
    if value >= snap {
        1.0
    } else if value <= -snap {
        -1.0
    } else {
        value
    }
}

fn drag_factor(drag: f32, dt: f32) -> f32 {
    (1.0 - drag * dt).clamp(0.0, 1.0)
}

/// Advances one fixed step.
pub fn simulate(
    config: &MovementConfig,
    state: &PhysicalState,
    command: &MoveCommand,
    ground: GroundSensor,
    dt: f32,
) -> PhysicalState {
    let forward_input = snap_axis(command.movement.forward, config.input_snap);
    let strafe_input = snap_axis(command.movement.strafe, config.input_snap);

    let rotation = Quat::from_rotation_y(command.look_yaw);
    let wish = rotation.mul_vec3(Vec3::Z) * forward_input
        + rotation.mul_vec3(Vec3::X) * strafe_input;
    let has_input = wish.length() > 0.0;
    let speed = config.move_speed * config.movement_multiplier;

    let mut velocity = state.velocity;

    if ground.grounded {
        // Gravity is off while grounded: falling speed is cancelled, rising speed kept.
        if has_input {
            velocity = match ground.slope_normal {
                Some(normal) => project_on_plane(wish, normal).normalize_or_zero() * speed,
                None => {
                    let moved = wish.normalize_or_zero() * speed;
                    Vec3::new(moved.x, velocity.y.max(0.0), moved.z)
                }
            };
        } else {
            let decay = drag_factor(config.ground_drag, dt);
            velocity = Vec3::new(velocity.x * decay, velocity.y.max(0.0), velocity.z * decay);
        }
        if command.jump {
            velocity.y += config.jump_force;
        }
    } else {
        if has_input {
            let air = wish.normalize_or_zero() * (speed * config.air_multiplier);
            velocity = Vec3::new(air.x, velocity.y, air.z);
        } else {
            let decay = drag_factor(config.air_drag, dt);
            velocity = Vec3::new(velocity.x * decay, velocity.y, velocity.z * decay);
        }
        velocity.y -= config.gravity * dt;
    }

    let yaw_delta = wrap_angle(command.look_yaw - yaw(state.rotation));
    let angular_velocity = if dt > 0.0 {
        Vec3::new(0.0, yaw_delta / dt, 0.0)
    } else {
        Vec3::ZERO
    };

    PhysicalState {
        position: state.position + velocity * dt,
        rotation,
        velocity,
        angular_velocity,
    }
}

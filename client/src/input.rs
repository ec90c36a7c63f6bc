//! Client input sampling with edge detection

use macroquad::prelude::*;
use shared::math::wrap_angle;
use shared::{MoveCommand, MoveInput};
use std::collections::VecDeque;

/// Everything the player did during one rendered frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameInput {
    pub movement: MoveInput,
    pub look_yaw: f32,
    pub jump: bool,
    /// Fire button went down this frame
    pub fire_pressed: bool,
    /// Fire button went up this frame
    pub fire_released: bool,
    pub toggle_debug: bool,
    pub quit: bool,
}

impl FrameInput {
    pub fn command(&self) -> MoveCommand {
        MoveCommand {
            movement: self.movement,
            look_yaw: self.look_yaw,
            jump: self.jump,
        }
    }
}

/// Source of per-frame input for the client scheduler
pub trait InputSource {
    fn sample(&mut self, dt: f32) -> FrameInput;
}

/// Keyboard and mouse input read through macroquad
pub struct KeyboardInput {
    yaw: f32,
    turn_speed: f32,

    // Previous frame states for edge detection
    prev_fire: bool,
    prev_key_g: bool,
}

impl KeyboardInput {
    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            turn_speed: 2.5,
            prev_fire: false,
            prev_key_g: false,
        }
    }
}

impl Default for KeyboardInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for KeyboardInput {
    fn sample(&mut self, dt: f32) -> FrameInput {
        let axis = |positive: bool, negative: bool| match (positive, negative) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };

        let forward = axis(
            is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
        );
        let strafe = axis(is_key_down(KeyCode::D), is_key_down(KeyCode::A));
        let turn = axis(
            is_key_down(KeyCode::E) || is_key_down(KeyCode::Right),
            is_key_down(KeyCode::Q) || is_key_down(KeyCode::Left),
        );
        self.yaw = wrap_angle(self.yaw + turn * self.turn_speed * dt);

        let fire = is_mouse_button_down(MouseButton::Left) || is_key_down(KeyCode::F);
        let key_g = is_key_down(KeyCode::G);

        let input = FrameInput {
            movement: MoveInput::new(forward, strafe),
            look_yaw: self.yaw,
            jump: is_key_down(KeyCode::Space),
            fire_pressed: fire && !self.prev_fire,
            fire_released: !fire && self.prev_fire,
            toggle_debug: key_g && !self.prev_key_g,
            quit: is_key_pressed(KeyCode::Escape),
        };

        self.prev_fire = fire;
        self.prev_key_g = key_g;

        input
    }
}

/// Replays a fixed list of frames, then repeats a fallback frame
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    frames: VecDeque<FrameInput>,
    fallback: FrameInput,
}

impl ScriptedInput {
    pub fn new(frames: impl IntoIterator<Item = FrameInput>, fallback: FrameInput) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            fallback,
        }
    }

    /// Same frame forever
    pub fn constant(frame: FrameInput) -> Self {
        Self::new(Vec::new(), frame)
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self, _dt: f32) -> FrameInput {
        self.frames.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input_then_fallback() {
        let press = FrameInput {
            fire_pressed: true,
            ..Default::default()
        };
        let walk = FrameInput {
            movement: MoveInput::new(1.0, 0.0),
            ..Default::default()
        };
        let mut source = ScriptedInput::new(vec![press], walk);

        assert!(source.sample(0.016).fire_pressed);
        assert_eq!(source.sample(0.016), walk);
        assert_eq!(source.sample(0.016), walk);
    }

    #[test]
    fn test_frame_input_command() {
        let frame = FrameInput {
            movement: MoveInput::new(0.5, -1.0),
            look_yaw: 1.2,
            jump: true,
            ..Default::default()
        };
        let command = frame.command();
        assert_eq!(command.movement, frame.movement);
        assert_eq!(command.look_yaw, 1.2);
        assert!(command.jump);
    }
}

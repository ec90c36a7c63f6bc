//! Latency-triggered extrapolation and transform authority hand-off.
//!
//! When the measured latency of the newest authoritative snapshot falls
//! strictly between one tick interval and the configured limit, the entity's
//! pose is projected forward by that latency and transform authority moves to
//! the server until the extrapolation cooldown expires or latency leaves the
//! window again.

use crate::cooldown::{CorrectionState, Transition};
use crate::math::{horizontal, Quat, Vec3};
use crate::protocol::StateSnapshot;
use log::debug;

/// Projected pose held while extrapolating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrapolatedState {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Positional offset covered over `latency` seconds.
    pub delta: Vec3,
    pub latency: f32,
}

#[derive(Debug, Clone)]
pub struct ExtrapolationController {
    limit: f32,
    multiplier: f32,
    fixed_delta: f32,
    held: Option<ExtrapolatedState>,
}

impl ExtrapolationController {
    pub fn new(limit: f32, multiplier: f32, fixed_delta: f32) -> Self {
        Self {
            limit,
            multiplier,
            fixed_delta,
            held: None,
        }
    }

    pub fn qualifies(&self, latency: f32) -> bool {
        latency > self.fixed_delta && latency < self.limit
    }

    /// Feeds the latest authoritative snapshot and its measured latency.
    pub fn update(
        &mut self,
        correction: &mut CorrectionState,
        snapshot: &StateSnapshot,
        latency: f32,
    ) -> Option<Transition> {
        if !self.qualifies(latency) {
            self.held = None;
            let transition = correction.stop_extrapolation();
            if transition.is_some() {
                debug!(
                    "Entity {} left extrapolation at tick {} (latency {:.3}s)",
                    snapshot.entity_id, snapshot.tick, latency
                );
            }
            return transition;
        }

        let (position, rotation, velocity, angular_velocity) = match self.held {
            Some(held) => (held.position, held.rotation, held.velocity, held.angular_velocity),
            None => (
                snapshot.position,
                snapshot.rotation,
                snapshot.velocity,
                snapshot.angular_velocity,
            ),
        };

        let spin = Quat::from_scaled_axis(angular_velocity * latency);
        let delta = velocity * (latency * self.multiplier);
        self.held = Some(ExtrapolatedState {
            position: position + delta,
            rotation: (spin * rotation).normalize(),
            velocity,
            angular_velocity,
            delta,
            latency,
        });

        let transition = correction.start_extrapolation();
        if transition.is_some() {
            debug!(
                "Entity {} entered extrapolation at tick {} (latency {:.3}s)",
                snapshot.entity_id, snapshot.tick, latency
            );
        }
        transition
    }

    /// Drops the held pose once the cooldown is no longer running.
    pub fn sync(&mut self, correction: &CorrectionState) {
        if !correction.is_extrapolating() {
            self.held = None;
        }
    }

    /// Moves `position` horizontally by this frame's share of the held delta.
    /// Returns true if anything moved.
    pub fn advance_visible(&self, correction: &CorrectionState, position: &mut Vec3, frame_dt: f32) -> bool {
        match self.held {
            Some(held) if correction.is_extrapolating() && held.latency > 0.0 => {
                *position += horizontal(held.delta) * (frame_dt / held.latency);
                true
            }
            _ => false,
        }
    }

    pub fn held(&self) -> Option<&ExtrapolatedState> {
        self.held.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.held.is_some()
    }
}

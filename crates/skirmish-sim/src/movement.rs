//! Movement Integrator: locomotion state and input to a velocity command.
//!
//! The integrator only produces velocity. Position integration is left to
//! the caller so the same output is valid whether it is applied at once or
//! during a replay.

use crate::math::{lerp, Vec2};

/// Deceleration applied when a state or ability halts movement.
pub const STOP_DECELERATION: f64 = 10_000.0;

/// Deceleration applied when there is no movement input.
pub const IDLE_DECELERATION: f64 = 10_000.0;

/// Acceleration used to track the dash curve.
pub const DASH_ACCELERATION: f64 = 100_000.0;

/// How the entity is being driven this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementMode {
    /// Brake towards zero.
    Halt,
    /// Follow a dash curve. Speed decays linearly from `speed` to zero over
    /// `duration` ticks, measured from dash start.
    Dash {
        direction: Vec2,
        speed: f64,
        elapsed: u64,
        duration: u64,
    },
    /// Walk along the movement input. `speed_factor` is the product of the
    /// state, ability and stat multipliers.
    Walk { speed_factor: f64 },
}

/// Per-kit movement constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementParams {
    /// Units per second.
    pub base_speed: f64,
    /// Units per second squared.
    pub acceleration: f64,
}

/// The velocity after one tick of `dt` seconds.
pub fn integrate_velocity(
    current: Vec2,
    mode: MovementMode,
    movement: Vec2,
    params: MovementParams,
    dt: f64,
) -> Vec2 {
    match mode {
        MovementMode::Halt => Vec2::move_towards(current, Vec2::ZERO, STOP_DECELERATION * dt),
        MovementMode::Dash {
            direction,
            speed,
            elapsed,
            duration,
        } => {
            let progress = if duration == 0 {
                1.0
            } else {
                elapsed as f64 / duration as f64
            };
            let target = direction * lerp(speed, 0.0, progress);
            Vec2::move_towards(current, target, DASH_ACCELERATION * dt)
        }
        MovementMode::Walk { speed_factor } => {
            if movement.is_zero() {
                Vec2::move_towards(current, Vec2::ZERO, IDLE_DECELERATION * dt)
            } else {
                let target = movement * (params.base_speed * speed_factor);
                Vec2::move_towards(current, target, params.acceleration * dt)
            }
        }
    }
}

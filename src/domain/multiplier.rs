//! Speed based damage multiplier.
//!
//! Gains quickly toward the speed target, holds at the last peak for a grace
//! window when the target drops, then decays at a constant rate. Death forces a
//! decay toward 1.0 with no hold.

use crate::utils::mathf::{clamp01, inverse_lerp, lerp, move_towards};
use crate::utils::weapondb::MultiplierTuning;

/// Per-weapon multiplier bookkeeping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiplierState {
    pub current: f32,
    /// Value recorded at the last peak, or the decaying value once decay started
    pub peak: f32,
    /// Seconds since `peak` was last recorded
    pub since_peak: f32,
}

impl MultiplierState {
    pub fn baseline() -> Self {
        Self {
            current: 1.0,
            peak: 1.0,
            since_peak: f32::INFINITY,
        }
    }
}

impl Default for MultiplierState {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Multiplier the player's speed asks for
pub fn target_multiplier(tuning: &MultiplierTuning, player_speed: f32) -> f32 {
    if player_speed < tuning.min_speed_threshold {
        return 1.0;
    }
    let t = clamp01(inverse_lerp(
        tuning.min_speed_threshold,
        tuning.max_speed_threshold,
        player_speed,
    ));
    lerp(1.0, tuning.max_damage_multiplier, t)
}

/// Advance the multiplier by one tick
pub fn update_multiplier(
    state: MultiplierState,
    tuning: &MultiplierTuning,
    player_speed: f32,
    is_dead: bool,
    dt: f32,
) -> MultiplierState {
    let max = tuning.max_damage_multiplier.max(1.0);
    let dt = dt.max(0.0);

    let next = if is_dead {
        let current = move_towards(state.current, 1.0, tuning.decay_rate * dt);
        MultiplierState {
            current,
            peak: current,
            since_peak: f32::INFINITY,
        }
    } else {
        let target = target_multiplier(tuning, player_speed);
        let elapsed = state.since_peak + dt;

        if target >= state.current {
            let current = lerp(state.current, target, tuning.gain_rate * dt);
            MultiplierState {
                current,
                peak: current,
                since_peak: 0.0,
            }
        } else if elapsed < tuning.grace_period {
            MultiplierState {
                current: state.peak,
                peak: state.peak,
                since_peak: elapsed,
            }
        } else {
            let current = move_towards(state.peak, target, tuning.decay_rate * dt);
            MultiplierState {
                current,
                peak: current,
                since_peak: elapsed,
            }
        }
    };

    MultiplierState {
        current: next.current.clamp(1.0, max),
        peak: next.peak.clamp(1.0, max),
        since_peak: next.since_peak,
    }
}

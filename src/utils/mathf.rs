/// Clamp to the unit interval
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Linear interpolation with `t` clamped to [0, 1]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * clamp01(t)
}

/// Where `value` sits between `a` and `b`, clamped to [0, 1]
/// Returns 0 for a degenerate range
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() <= f32::EPSILON {
        return 0.0;
    }
    clamp01((value - a) / (b - a))
}

/// Move `current` toward `target` by at most `max_delta`
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_clamps_t() {
        assert_eq!(lerp(1.0, 2.0, 0.5), 1.5);
        assert_eq!(lerp(1.0, 2.0, 3.0), 2.0);
        assert_eq!(lerp(1.0, 2.0, -1.0), 1.0);
    }

    #[test]
    fn test_inverse_lerp() {
        assert_eq!(inverse_lerp(15.0, 28.0, 15.0), 0.0);
        assert_eq!(inverse_lerp(15.0, 28.0, 28.0), 1.0);
        assert_eq!(inverse_lerp(15.0, 28.0, 40.0), 1.0);
        assert_eq!(inverse_lerp(5.0, 5.0, 7.0), 0.0);
    }

    #[test]
    fn test_move_towards() {
        assert_eq!(move_towards(2.0, 1.0, 0.25), 1.75);
        assert_eq!(move_towards(1.1, 1.0, 0.25), 1.0);
        assert_eq!(move_towards(1.0, 2.0, 0.5), 1.5);
    }
}

//! Easing curves for transitions and click feedback.

/// Easing functions mapping linear progress to eased progress.
///
/// All variants clamp their input to `0.0..=1.0` and satisfy
/// `apply(0.0) == 0.0` and `apply(1.0) == 1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed throughout.
    #[default]
    Linear,
    /// Start slow, accelerate (quadratic).
    EaseIn,
    /// Start fast, decelerate (quadratic).
    EaseOut,
    /// Start slow, speed up, then slow down.
    EaseInOut,
    /// Cubic acceleration.
    EaseInCubic,
    /// Cubic deceleration. Used by click rings.
    EaseOutCubic,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }

    /// Interpolate between `from` and `to` using this curve.
    pub fn lerp(&self, from: f32, to: f32, t: f32) -> f32 {
        from + (to - from) * self.apply(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 6] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
    ];

    #[test]
    fn endpoints_are_fixed() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-6, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing:?} at 1");
        }
    }

    #[test]
    fn input_is_clamped() {
        assert_eq!(Easing::EaseIn.apply(-3.0), 0.0);
        assert_eq!(Easing::EaseOut.apply(7.0), 1.0);
    }

    #[test]
    fn ease_in_lags_and_ease_out_leads() {
        assert!(Easing::EaseIn.apply(0.5) < 0.5);
        assert!(Easing::EaseOut.apply(0.5) > 0.5);
        assert!(Easing::EaseOutCubic.apply(0.5) > Easing::EaseOut.apply(0.5));
    }

    #[test]
    fn lerp_runs_in_either_direction() {
        assert_eq!(Easing::Linear.lerp(1.0, 0.0, 0.25), 0.75);
        assert_eq!(Easing::EaseIn.lerp(0.0, 2.0, 1.0), 2.0);
    }
}

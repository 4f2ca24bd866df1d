//! Time-based transitions
//!
//! Node positions, link endpoints, opacities and the viewport transform all
//! move through a [`Tween`]: a fixed-duration eased interpolation that can be
//! retargeted mid-flight. Retargeting starts the new transition from the
//! value currently on screen, so the latest target always wins without a jump.

use egui::Pos2;
use serde::{Deserialize, Serialize};

use crate::config::AnimationSettings;

// =============================================================================
// EASING FUNCTIONS
// =============================================================================

/// Cubic ease-out: fast start, slow finish
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Cubic ease-in-out: slow start, fast middle, slow finish
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[inline]
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Exponential ease-out: very fast start, long tail
#[inline]
pub fn ease_out_expo(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t >= 1.0 {
        1.0
    } else {
        1.0 - 2.0_f32.powf(-10.0 * t)
    }
}

#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Easing curve selectable from settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingFn {
    Linear,
    EaseOutCubic,
    #[default]
    EaseInOutCubic,
    EaseOutQuad,
    EaseOutExpo,
}

impl EasingFn {
    pub fn apply(&self, t: f32) -> f32 {
        match self {
            EasingFn::Linear => linear(t),
            EasingFn::EaseOutCubic => ease_out_cubic(t),
            EasingFn::EaseInOutCubic => ease_in_out_cubic(t),
            EasingFn::EaseOutQuad => ease_out_quad(t),
            EasingFn::EaseOutExpo => ease_out_expo(t),
        }
    }
}

// =============================================================================
// INTERPOLATION
// =============================================================================

#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_pos2(a: Pos2, b: Pos2, t: f32) -> Pos2 {
    Pos2::new(lerp_f32(a.x, b.x, t), lerp_f32(a.y, b.y, t))
}

/// Values a [`Tween`] can interpolate
pub trait Lerp: Copy + PartialEq {
    fn lerp(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, to: Self, t: f32) -> Self {
        lerp_f32(self, to, t)
    }
}

impl Lerp for Pos2 {
    fn lerp(self, to: Self, t: f32) -> Self {
        lerp_pos2(self, to, t)
    }
}

// =============================================================================
// TWEEN
// =============================================================================

/// Retargetable fixed-duration transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween<T> {
    from: T,
    to: T,
    /// Seconds since the current transition started
    elapsed: f32,
    /// Seconds
    duration: f32,
    easing: EasingFn,
}

impl<T: Lerp> Tween<T> {
    /// A tween at rest on `value`
    pub fn settled(value: T, duration: f32, easing: EasingFn) -> Self {
        Self {
            from: value,
            to: value,
            elapsed: duration.max(0.0),
            duration: duration.max(0.0),
            easing,
        }
    }

    pub fn from_settings(value: T, settings: &AnimationSettings) -> Self {
        Self::settled(value, settings.duration_secs(), settings.easing)
    }

    /// A tween that starts at `from` and heads for `to`
    pub fn new(from: T, to: T, duration: f32, easing: EasingFn) -> Self {
        let mut tween = Self::settled(from, duration, easing);
        tween.retarget(to);
        tween
    }

    /// Head for `target`, starting from the value currently shown
    ///
    /// Retargeting to the current target leaves an in-flight transition alone.
    pub fn retarget(&mut self, target: T) {
        if target == self.to {
            return;
        }
        self.from = self.value();
        self.to = target;
        self.elapsed = 0.0;
    }

    /// Jump to `value` with no transition
    pub fn set_immediate(&mut self, value: T) {
        self.from = value;
        self.to = value;
        self.elapsed = self.duration;
    }

    /// Advance by `dt` seconds. Returns true while still animating.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.is_animating() {
            return false;
        }
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
        self.is_animating()
    }

    /// Current interpolated value
    pub fn value(&self) -> T {
        if !self.is_animating() {
            return self.to;
        }
        let t = self.easing.apply(self.elapsed / self.duration);
        self.from.lerp(self.to, t)
    }

    pub fn target(&self) -> T {
        self.to
    }

    pub fn is_animating(&self) -> bool {
        self.duration > 0.0 && self.elapsed < self.duration
    }

    /// Linear progress in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Skip to the end of the current transition
    pub fn finish(&mut self) {
        self.elapsed = self.duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            EasingFn::Linear,
            EasingFn::EaseOutCubic,
            EasingFn::EaseInOutCubic,
            EasingFn::EaseOutQuad,
            EasingFn::EaseOutExpo,
        ] {
            assert!(easing.apply(0.0).abs() < 1e-6, "{:?} at 0", easing);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{:?} at 1", easing);
        }
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tween_reaches_target_after_duration() {
        let mut tween = Tween::new(0.0_f32, 10.0, 0.3, EasingFn::Linear);
        assert!(tween.is_animating());

        assert!(tween.tick(0.15));
        assert!((tween.value() - 5.0).abs() < 1e-4);

        assert!(!tween.tick(0.2));
        assert_eq!(tween.value(), 10.0);
        assert!(!tween.is_animating());
    }

    #[test]
    fn test_retarget_starts_from_current_value() {
        let mut tween = Tween::new(Pos2::ZERO, Pos2::new(100.0, 0.0), 1.0, EasingFn::Linear);
        tween.tick(0.5);

        tween.retarget(Pos2::new(0.0, 100.0));

        assert_eq!(tween.value(), Pos2::new(50.0, 0.0));
        assert_eq!(tween.target(), Pos2::new(0.0, 100.0));
        tween.tick(1.0);
        assert_eq!(tween.value(), Pos2::new(0.0, 100.0));
    }

    #[test]
    fn test_retarget_same_target_keeps_progress() {
        let mut tween = Tween::new(0.0_f32, 1.0, 1.0, EasingFn::Linear);
        tween.tick(0.4);
        tween.retarget(1.0);
        assert!((tween.progress() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_zero_duration_is_immediate() {
        let mut tween = Tween::settled(0.0_f32, 0.0, EasingFn::EaseInOutCubic);
        tween.retarget(3.0);
        assert!(!tween.is_animating());
        assert_eq!(tween.value(), 3.0);
    }

    #[test]
    fn test_set_immediate_interrupts() {
        let mut tween = Tween::new(0.0_f32, 1.0, 1.0, EasingFn::Linear);
        tween.tick(0.2);
        tween.set_immediate(7.0);
        assert!(!tween.is_animating());
        assert_eq!(tween.value(), 7.0);
    }

    proptest! {
        #[test]
        fn prop_value_stays_between_endpoints(
            from in -1000.0f32..1000.0,
            to in -1000.0f32..1000.0,
            steps in proptest::collection::vec(0.0f32..0.1, 0..20),
        ) {
            let mut tween = Tween::new(from, to, 0.3, EasingFn::EaseInOutCubic);
            for dt in steps {
                tween.tick(dt);
                let v = tween.value();
                let (lo, hi) = if from < to { (from, to) } else { (to, from) };
                prop_assert!(v >= lo - 1e-3 && v <= hi + 1e-3);
            }
        }
    }
}

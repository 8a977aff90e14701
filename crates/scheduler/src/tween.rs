use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EasingCurve {
    Linear,
    Smoothstep,
    #[default]
    EaseInOut,
    EaseOutCubic,
}

impl EasingCurve {
    /// Maps linear progress to eased progress. Both ends are exact.
    pub fn sample(self, t: f32) -> f32 {
        let clamped = t.clamp(0.0, 1.0);
        match self {
            EasingCurve::Linear => clamped,
            EasingCurve::Smoothstep => clamped * clamped * (3.0 - 2.0 * clamped),
            EasingCurve::EaseInOut => {
                if clamped < 0.5 {
                    2.0 * clamped * clamped
                } else {
                    -1.0 + (4.0 - 2.0 * clamped) * clamped
                }
            }
            EasingCurve::EaseOutCubic => {
                let inv = 1.0 - clamped;
                1.0 - inv * inv * inv
            }
        }
    }
}

pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

pub fn lerp2(from: [f32; 2], to: [f32; 2], t: f32) -> [f32; 2] {
    [lerp(from[0], to[0], t), lerp(from[1], to[1], t)]
}

/// Fixed-duration interpolation anchored at a start instant.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    start: Instant,
    duration: Duration,
    curve: EasingCurve,
}

impl Tween {
    /// `None` for a zero duration: the change should be applied at once.
    pub fn new(duration: Duration, curve: EasingCurve, now: Instant) -> Option<Self> {
        if duration.is_zero() {
            None
        } else {
            Some(Self {
                start: now,
                duration,
                curve,
            })
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Eased progress at `now` and whether the tween has run its course.
    pub fn progress(&self, now: Instant) -> (f32, bool) {
        let elapsed = now.saturating_duration_since(self.start);
        let linear = elapsed.as_secs_f32() / self.duration.as_secs_f32().max(f32::EPSILON);
        if linear >= 1.0 {
            (1.0, true)
        } else {
            (self.curve.sample(linear), false)
        }
    }
}

use glam::{Quat, Vec3};
use signage_config::{AnimationConfig, Axis, RepeatMode};
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Constant-rate rotation about a principal axis.
#[derive(Debug, Clone)]
pub struct AxisRotation {
    axis: Vec3,
    from: f32,
    to: f32,
    duration: Duration,
    repeat: RepeatMode,
    /// Time into the current period.
    elapsed: Duration,
}

impl AxisRotation {
    pub fn new(
        axis: Axis,
        from_degrees: f32,
        to_degrees: f32,
        duration: Duration,
        repeat: RepeatMode,
    ) -> Self {
        Self {
            axis: axis.unit(),
            from: from_degrees.to_radians(),
            to: to_degrees.to_radians(),
            duration,
            repeat,
            elapsed: Duration::ZERO,
        }
    }

    pub fn from_config(config: &AnimationConfig) -> Self {
        match *config {
            AnimationConfig::RotateOnAxis {
                axis,
                from_degrees,
                to_degrees,
                duration_ms,
                repeat,
            } => Self::new(
                axis,
                from_degrees,
                to_degrees,
                Duration::from_millis(duration_ms),
                repeat,
            ),
        }
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed += dt;

        let period = match self.repeat {
            RepeatMode::Once => return,
            RepeatMode::Infinite => self.duration,
            RepeatMode::ReverseInfinite => self.duration * 2,
        };
        if !period.is_zero() {
            // `wrapped < period`, so the seconds always fit back into a Duration.
            let wrapped = self.elapsed.as_nanos() % period.as_nanos();
            self.elapsed = Duration::new(
                (wrapped / NANOS_PER_SEC) as u64,
                (wrapped % NANOS_PER_SEC) as u32,
            );
        }
    }

    /// Interpolation factor in `0..=1`.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let t = self.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        match self.repeat {
            RepeatMode::Once | RepeatMode::Infinite => t.min(1.0),
            RepeatMode::ReverseInfinite => {
                if t <= 1.0 {
                    t
                } else {
                    2.0 - t
                }
            }
        }
    }

    /// Current angle in radians.
    pub fn angle(&self) -> f32 {
        self.from + (self.to - self.from) * self.progress()
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_axis_angle(self.axis, self.angle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spin(repeat: RepeatMode) -> AxisRotation {
        AxisRotation::new(Axis::Y, 0.0, 180.0, Duration::from_secs(60), repeat)
    }

    fn assert_degrees(anim: &AxisRotation, expected: f32) {
        let got = anim.angle().to_degrees();
        assert!((got - expected).abs() < 1e-3, "got {got}, expected {expected}");
    }

    #[test]
    fn linear_interpolation() {
        let mut anim = spin(RepeatMode::Infinite);
        assert_degrees(&anim, 0.0);
        anim.advance(Duration::from_secs(15));
        assert_degrees(&anim, 45.0);
        anim.advance(Duration::from_secs(15));
        assert_degrees(&anim, 90.0);
    }

    #[test]
    fn infinite_wraps_to_start() {
        let mut anim = spin(RepeatMode::Infinite);
        anim.advance(Duration::from_secs(90));
        assert_degrees(&anim, 90.0);
    }

    #[test]
    fn reverse_infinite_plays_back() {
        let mut anim = spin(RepeatMode::ReverseInfinite);
        anim.advance(Duration::from_secs(75));
        assert_degrees(&anim, 135.0);
        anim.advance(Duration::from_secs(60));
        // 135 s is one 120 s round trip plus 15 s into the forward half.
        assert_degrees(&anim, 45.0);
    }

    #[test]
    fn once_holds_final_angle() {
        let mut anim = spin(RepeatMode::Once);
        anim.advance(Duration::from_secs(600));
        assert_degrees(&anim, 180.0);
    }

    #[test]
    fn very_long_periods_wrap_without_overflow() {
        const YEAR_SECS: u64 = 365 * 24 * 3600;
        let config = AnimationConfig::RotateOnAxis {
            axis: Axis::Y,
            from_degrees: 0.0,
            to_degrees: 180.0,
            duration_ms: 1_000 * YEAR_SECS * 1_000,
            repeat: RepeatMode::Infinite,
        };
        let mut anim = AxisRotation::from_config(&config);
        // More nanoseconds than a u64 holds.
        anim.advance(Duration::from_secs(600 * YEAR_SECS));
        assert!((anim.progress() - 0.6).abs() < 1e-4, "progress {}", anim.progress());
        assert_degrees(&anim, 108.0);
    }

    #[test]
    fn rotation_is_about_configured_axis() {
        let mut anim = spin(RepeatMode::Once);
        anim.advance(Duration::from_secs(30));
        let turned = anim.rotation() * Vec3::X;
        assert!(turned.abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }

    #[test]
    fn builds_from_config() {
        let config = AnimationConfig::RotateOnAxis {
            axis: Axis::Y,
            from_degrees: 0.0,
            to_degrees: 180.0,
            duration_ms: 60_000,
            repeat: RepeatMode::Infinite,
        };
        let mut anim = AxisRotation::from_config(&config);
        anim.advance(Duration::from_secs(30));
        assert_degrees(&anim, 90.0);
    }
}

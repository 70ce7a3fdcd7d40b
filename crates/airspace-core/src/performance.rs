//! Aircraft performance models and minimum-time intercept arithmetic.
//!
//! A performance model reduces the aircraft to six numbers; the solution_*
//! functions answer "how long to reach that boundary" under those numbers.
//! Infeasible branches surface as `None` at the public seams — a very large
//! internal duration is used during searches but never escapes this module.

use serde::{Deserialize, Serialize};

use crate::aircraft::AircraftState;
use crate::filter::AircraftStateFilter;
use crate::geo::GeoPoint;
use crate::solver;

/// Internal search sentinel for "cannot be done".
const TIME_BIG: f64 = 1.0e6;
/// Height band below which the vertical search degenerates to closed form.
const HEIGHT_TOLERANCE_M: f64 = 1.0;
/// Distance band below which the horizontal search degenerates to closed form.
const DISTANCE_TOLERANCE_M: f64 = 1.0;

/// Minimum-time trajectory to a boundary point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterceptSolution {
    /// Where the boundary is reached.
    pub location: GeoPoint,
    /// Lateral distance to the intercept in meters.
    pub distance: f64,
    /// Altitude AMSL at the intercept in meters.
    pub altitude: f64,
    /// Time to the intercept in seconds.
    pub elapsed_time: f64,
}

/// Glide polar figures consumed from the task/glide solver (read-only per tick).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlidePolar {
    /// Speed at best glide ratio, m/s.
    pub v_best_ld: f64,
    /// Sink rate at best glide speed, m/s (positive down).
    pub s_best_ld: f64,
    /// Sink rate at maximum speed, m/s (positive down).
    pub s_max: f64,
    /// Maximum speed, m/s.
    pub v_max: f64,
    /// Expected climb rate (MacCready), m/s.
    pub mc: f64,
}

impl Default for GlidePolar {
    fn default() -> Self {
        // club-class-ish numbers
        Self {
            v_best_ld: 30.0,
            s_best_ld: 0.6,
            s_max: 3.5,
            v_max: 60.0,
            mc: 1.0,
        }
    }
}

/// Current-leg glide solution consumed from the task manager.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskSolution {
    /// Remaining-leg target location.
    pub target: GeoPoint,
    /// Remaining distance to the target in meters.
    pub distance_remaining: f64,
    /// Planned time to the target in seconds.
    pub time_remaining: f64,
    /// Planned height loss over the remaining leg in meters.
    pub height_loss: f64,
}

/// Simplified aircraft performance envelope for intercept calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AircraftPerformance {
    /// Cruise speed, m/s.
    pub cruise_speed: f64,
    /// Sink rate while cruising, m/s (positive down).
    pub cruise_descent: f64,
    /// Maximum achievable descent rate, m/s (positive down).
    pub descent_rate: f64,
    /// Achievable climb rate, m/s (positive up).
    pub climb_rate: f64,
    /// Maximum speed, m/s.
    pub max_speed: f64,
    /// Slack added to the vertical rates during feasibility checks, m/s.
    pub vertical_tolerance: f64,
}

impl Default for AircraftPerformance {
    fn default() -> Self {
        Self::standard()
    }
}

impl AircraftPerformance {
    /// Fixed conservative constants, used when no better model is available.
    pub fn standard() -> Self {
        Self {
            cruise_speed: 30.0,
            cruise_descent: 2.0,
            descent_rate: 10.0,
            climb_rate: 5.0,
            max_speed: 60.0,
            vertical_tolerance: 0.0,
        }
    }

    /// Performance of a glider flying its polar.
    pub fn from_polar(polar: &GlidePolar) -> Self {
        Self {
            cruise_speed: polar.v_best_ld,
            cruise_descent: polar.s_best_ld,
            descent_rate: polar.s_max,
            climb_rate: polar.mc,
            max_speed: polar.v_max,
            vertical_tolerance: 0.0,
        }
    }

    /// Rigid extrapolation of the filtered state: the aircraft keeps doing
    /// whatever the filter currently sees.
    pub fn from_filter(filter: &AircraftStateFilter) -> Self {
        let speed = filter.speed();
        let climb = filter.climb_rate();
        Self {
            cruise_speed: speed,
            cruise_descent: -climb,
            descent_rate: -climb,
            climb_rate: climb,
            max_speed: speed,
            vertical_tolerance: 0.01,
        }
    }

    /// Performance implied by the planned task leg.
    pub fn from_task(polar: &GlidePolar, task: &TaskSolution) -> Self {
        let (speed, descent) = if task.time_remaining > 0.0 {
            (
                task.distance_remaining / task.time_remaining,
                task.height_loss / task.time_remaining,
            )
        } else {
            (polar.v_best_ld, polar.s_best_ld)
        };
        Self {
            cruise_speed: speed,
            cruise_descent: descent,
            descent_rate: polar.s_max,
            climb_rate: polar.mc,
            max_speed: polar.v_max,
            vertical_tolerance: 0.01,
        }
    }

    /// Time to cover `distance` while changing height by `-dh` (positive `dh`
    /// means the target is below). Returns the big sentinel when the model
    /// cannot do it.
    pub(crate) fn solution_general(&self, distance: f64, dh: f64) -> f64 {
        if self.cruise_speed <= 0.0 {
            return TIME_BIG;
        }

        let t_cruise = if distance > 0.0 {
            distance / self.cruise_speed
        } else {
            0.0
        };
        let h_descent = dh - t_cruise * self.cruise_descent;

        if h_descent.abs() < HEIGHT_TOLERANCE_M {
            return t_cruise;
        }

        if h_descent > 0.0 {
            // requires descending steeper than the cruise sink
            let mod_descent_rate = self.descent_rate + self.vertical_tolerance;
            if mod_descent_rate <= 0.0 {
                return TIME_BIG;
            }
            let t_descent = h_descent / mod_descent_rate;
            return t_cruise.max(t_descent);
        }

        // requires climb
        let mod_climb_rate = self.climb_rate + self.vertical_tolerance;
        if mod_climb_rate <= 0.0 {
            return TIME_BIG;
        }
        t_cruise + (-h_descent) / mod_climb_rate
    }

    /// Cheap feasibility guard before running a bounded search.
    fn solution_exists(&self, altitude: f64, h_min: f64, h_max: f64) -> bool {
        if self.cruise_speed <= 0.0 {
            return false;
        }
        if altitude > h_max
            && self.cruise_descent.max(self.descent_rate) + self.vertical_tolerance <= 0.0
        {
            // must descend but cannot
            return false;
        }
        if altitude < h_min && self.climb_rate + self.vertical_tolerance <= 0.0 {
            // must climb but cannot
            return false;
        }
        true
    }

    /// Minimum-time intercept of the vertical band `[base, top]` at a fixed
    /// lateral distance. Returns `(elapsed_time, intercept_altitude)`.
    pub fn solution_vertical(
        &self,
        distance: f64,
        altitude: f64,
        base: f64,
        top: f64,
    ) -> Option<(f64, f64)> {
        if !self.solution_exists(altitude, base, top) {
            return None;
        }

        if top - base <= HEIGHT_TOLERANCE_M {
            // degenerate band, unique target height
            let elapsed = self.solution_general(distance, altitude - top);
            return Self::accept(elapsed, top);
        }

        // time-to-intercept over candidate height is not guaranteed convex;
        // the bounded search returns a candidate which is then validated
        let (height, elapsed) = solver::minimize(
            |h| self.solution_general(distance, altitude - h),
            base,
            top,
            HEIGHT_TOLERANCE_M,
        );
        Self::accept(elapsed, height)
    }

    /// Minimum-time intercept of the horizontal plane at height `h`, with the
    /// lateral distance free in `[distance_min, distance_max]`. Returns
    /// `(elapsed_time, intercept_distance)`.
    pub fn solution_horizontal(
        &self,
        distance_min: f64,
        distance_max: f64,
        altitude: f64,
        h: f64,
    ) -> Option<(f64, f64)> {
        if !self.solution_exists(altitude, h, h) {
            return None;
        }

        let (d_min, d_max) = if distance_min <= distance_max {
            (distance_min, distance_max)
        } else {
            (distance_max, distance_min)
        };

        if d_max - d_min <= DISTANCE_TOLERANCE_M {
            let elapsed = self.solution_general(d_min, altitude - h);
            return Self::accept(elapsed, d_min);
        }

        let (distance, elapsed) = solver::minimize(
            |d| self.solution_general(d, altitude - h),
            d_min,
            d_max,
            DISTANCE_TOLERANCE_M,
        );
        Self::accept(elapsed, distance)
    }

    fn accept(elapsed: f64, value: f64) -> Option<(f64, f64)> {
        if elapsed >= TIME_BIG || elapsed < 0.0 {
            None
        } else {
            Some((elapsed, value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_cruise_is_pure_distance() {
        let perf = AircraftPerformance::standard();
        let t = perf.solution_general(3000.0, 0.0);
        assert!((t - 100.0).abs() < 1e-9);
    }

    #[test]
    fn steep_descent_takes_the_longer_leg() {
        let perf = AircraftPerformance {
            cruise_speed: 30.0,
            cruise_descent: 1.0,
            descent_rate: 5.0,
            climb_rate: 0.0,
            max_speed: 60.0,
            vertical_tolerance: 0.0,
        };
        // 60s of cruise sinks 60m; remaining 440m at 5 m/s takes 88s
        let t = perf.solution_general(1800.0, 500.0);
        assert!((t - 88.0).abs() < 1e-6);
    }

    #[test]
    fn climb_adds_time() {
        let perf = AircraftPerformance {
            cruise_speed: 30.0,
            cruise_descent: 1.0,
            descent_rate: 5.0,
            climb_rate: 2.0,
            max_speed: 60.0,
            vertical_tolerance: 0.0,
        };
        // 30s cruise sinks 30m, so 130m must be climbed at 2 m/s
        let t = perf.solution_general(900.0, -100.0);
        assert!((t - (30.0 + 65.0)).abs() < 1e-6);
    }

    #[test]
    fn impossible_climb_is_infeasible() {
        let perf = AircraftPerformance {
            cruise_speed: 30.0,
            cruise_descent: 1.0,
            descent_rate: 5.0,
            climb_rate: 0.0,
            max_speed: 60.0,
            vertical_tolerance: 0.0,
        };
        assert!(perf.solution_vertical(1000.0, 0.0, 500.0, 800.0).is_none());
    }

    #[test]
    fn vertical_inside_band_is_free() {
        let perf = AircraftPerformance::standard();
        // aircraft altitude already within [base, top] at zero distance
        let (elapsed, altitude) = perf.solution_vertical(0.0, 400.0, 0.0, 1000.0).unwrap();
        assert!(elapsed < 0.2);
        assert!((altitude - 400.0).abs() < 5.0);
    }

    #[test]
    fn vertical_prefers_cruise_reachable_height() {
        let perf = AircraftPerformance::from_polar(&GlidePolar::default());
        // 3km away, band [0, 1000], aircraft at 500: gliding straight in
        // arrives around 440m with no extra maneuvering
        let (elapsed, altitude) = perf.solution_vertical(3000.0, 500.0, 0.0, 1000.0).unwrap();
        assert!((elapsed - 100.0).abs() < 1.0);
        assert!((altitude - 440.0).abs() < 10.0);
    }

    #[test]
    fn horizontal_picks_nearest_distance_when_level() {
        let perf = AircraftPerformance::standard();
        let (elapsed, distance) = perf
            .solution_horizontal(1200.0, 4000.0, 500.0, 500.0)
            .unwrap();
        assert!((distance - 1200.0).abs() < 5.0);
        assert!((elapsed - 1200.0 / 30.0).abs() < 0.5);
    }

    #[test]
    fn horizontal_unreachable_plane_is_infeasible() {
        let perf = AircraftPerformance {
            cruise_speed: 30.0,
            cruise_descent: 1.0,
            descent_rate: 5.0,
            climb_rate: 0.0,
            max_speed: 60.0,
            vertical_tolerance: 0.0,
        };
        // plane is above and the model cannot climb
        assert!(perf.solution_horizontal(0.0, 5000.0, 200.0, 800.0).is_none());
    }

    #[test]
    fn filter_model_cannot_reverse_its_trend() {
        let mut filter = AircraftStateFilter::new(5.0);
        let mut state = AircraftState::new(GeoPoint::new(0.0, 0.0), 1000.0).with_velocity(
            90.0, 25.0, -1.5,
        );
        filter.reset(&state);
        state.time = 1.0;
        filter.update(&state);

        let perf = AircraftPerformance::from_filter(&filter);
        assert!(perf.climb_rate < 0.0);
        assert!(perf.cruise_descent > 0.0);
        // climbing 100m is not available to a sinking trend
        assert!(perf.solution_vertical(500.0, 0.0, 100.0, 100.5).is_none());
    }
}

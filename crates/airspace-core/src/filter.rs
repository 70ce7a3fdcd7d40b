//! Low-pass filtered aircraft state prediction.
//!
//! Smooths the velocity implied by successive fixes so short-term jinks and
//! thermalling circles do not whip the predicted position around. The warning
//! manager keeps one filter tuned for cruise and one for circling flight.

use crate::aircraft::AircraftState;
use crate::geo::GeoPoint;

/// First-order low-pass over the aircraft's ENU velocity.
#[derive(Debug, Clone)]
pub struct AircraftStateFilter {
    /// Filter time constant in seconds.
    cutoff: f64,
    last: Option<AircraftState>,
    /// Filtered velocity, east/north/up in m/s.
    vx: f64,
    vy: f64,
    vz: f64,
}

impl AircraftStateFilter {
    pub fn new(cutoff_seconds: f64) -> Self {
        Self {
            cutoff: cutoff_seconds.max(1.0),
            last: None,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
        }
    }

    /// Re-tune the filter time constant.
    pub fn design(&mut self, cutoff_seconds: f64) {
        self.cutoff = cutoff_seconds.max(1.0);
    }

    /// Discard history and seed the filter from one fix.
    pub fn reset(&mut self, state: &AircraftState) {
        let track = state.track_deg.to_radians();
        self.vx = state.ground_speed * track.sin();
        self.vy = state.ground_speed * track.cos();
        self.vz = state.vertical_speed;
        self.last = Some(*state);
    }

    /// Feed one fix. Out-of-order or duplicate fixes replace the stored
    /// sample without disturbing the filtered velocity.
    pub fn update(&mut self, state: &AircraftState) {
        let Some(prev) = self.last else {
            self.reset(state);
            return;
        };

        let dt = state.time - prev.time;
        if dt <= 0.0 {
            self.last = Some(*state);
            return;
        }

        let distance = prev.location.distance_to(&state.location);
        let bearing = prev.location.bearing_to(&state.location);
        let raw_vx = distance * bearing.sin() / dt;
        let raw_vy = distance * bearing.cos() / dt;
        let raw_vz = (state.altitude - prev.altitude) / dt;

        let alpha = dt / (self.cutoff + dt);
        self.vx += alpha * (raw_vx - self.vx);
        self.vy += alpha * (raw_vy - self.vy);
        self.vz += alpha * (raw_vz - self.vz);

        self.last = Some(*state);
    }

    /// Filtered ground speed in m/s.
    pub fn speed(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    /// Filtered vertical rate in m/s, positive up.
    pub fn climb_rate(&self) -> f64 {
        self.vz
    }

    /// Filtered track in radians.
    pub fn bearing_rad(&self) -> f64 {
        self.vx.atan2(self.vy)
    }

    /// State extrapolated `dt` seconds ahead with the filtered velocity.
    /// `None` until at least one fix has been fed.
    pub fn predicted_state(&self, dt: f64) -> Option<AircraftState> {
        let last = self.last?;
        let speed = self.speed();
        let location = if speed > 0.0 {
            last.location.offset_by_bearing(speed * dt, self.bearing_rad())
        } else {
            last.location
        };

        Some(AircraftState {
            location,
            altitude: last.altitude + self.vz * dt,
            altitude_agl: last.altitude_agl + self.vz * dt,
            ground_speed: speed,
            track_deg: self.bearing_rad().to_degrees().rem_euclid(360.0),
            vertical_speed: self.vz,
            time: last.time + dt,
            circling: last.circling,
        })
    }
}

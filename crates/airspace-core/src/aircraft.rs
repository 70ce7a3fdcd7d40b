//! Aircraft state snapshot consumed once per tick.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Position, altitude and velocity of the aircraft at one fix.
///
/// Fix-quality validation is the caller's responsibility; the engine assumes
/// every snapshot it is handed is usable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AircraftState {
    pub location: GeoPoint,
    /// Altitude AMSL in meters.
    pub altitude: f64,
    /// Height above ground in meters.
    pub altitude_agl: f64,
    /// Ground speed in m/s.
    pub ground_speed: f64,
    /// Track over ground in degrees (0 = north, clockwise).
    pub track_deg: f64,
    /// Vertical speed in m/s, positive up.
    pub vertical_speed: f64,
    /// Monotonic time of the fix in seconds.
    pub time: f64,
    /// Whether the aircraft is currently thermalling.
    pub circling: bool,
}

impl AircraftState {
    pub fn new(location: GeoPoint, altitude: f64) -> Self {
        Self {
            location,
            altitude,
            altitude_agl: altitude,
            ground_speed: 0.0,
            track_deg: 0.0,
            vertical_speed: 0.0,
            time: 0.0,
            circling: false,
        }
    }

    /// Set track and speeds.
    pub fn with_velocity(mut self, track_deg: f64, ground_speed: f64, vertical_speed: f64) -> Self {
        self.track_deg = track_deg;
        self.ground_speed = ground_speed;
        self.vertical_speed = vertical_speed;
        self
    }

    /// State predicted `dt` seconds ahead assuming unchanged track and speeds.
    pub fn predicted(&self, dt: f64) -> AircraftState {
        let mut next = *self;
        if self.ground_speed > 0.0 {
            next.location = self
                .location
                .offset_by_bearing(self.ground_speed * dt, self.track_deg.to_radians());
        }
        next.altitude += self.vertical_speed * dt;
        next.altitude_agl += self.vertical_speed * dt;
        next.time += dt;
        next
    }
}

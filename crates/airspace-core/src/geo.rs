//! Geographic points and spherical distance/bearing math.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A position on the earth in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another point in meters (Haversine).
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let dphi = (other.latitude - self.latitude).to_radians();
        let dlambda = (other.longitude - self.longitude).to_radians();
        let a = (dphi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Initial bearing towards another point in radians, 0 = north, π/2 = east.
    pub fn bearing_to(&self, other: &GeoPoint) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let delta_lambda = (other.longitude - self.longitude).to_radians();

        let x = delta_lambda.sin() * phi2.cos();
        let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

        x.atan2(y)
    }

    /// Offset this position by distance and bearing.
    ///
    /// # Arguments
    /// * `distance_m` - Distance in meters
    /// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
    pub fn offset_by_bearing(&self, distance_m: f64, bearing_rad: f64) -> GeoPoint {
        if distance_m.abs() <= f64::EPSILON {
            return *self;
        }

        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();
        let angular_distance = distance_m / EARTH_RADIUS_M;

        let sin_lat1 = lat1.sin();
        let cos_lat1 = lat1.cos();
        let sin_ad = angular_distance.sin();
        let cos_ad = angular_distance.cos();

        let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
        let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

        let y = bearing_rad.sin() * sin_ad * cos_lat1;
        let x = cos_ad - sin_lat1 * sin_lat2;
        let mut lon2 = lon1 + y.atan2(x);
        lon2 = (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI)
            - std::f64::consts::PI;

        GeoPoint::new(lat2.to_degrees(), lon2.to_degrees())
    }

    /// Point at fraction `t` of the way towards `other` (0 = self, 1 = other).
    pub fn interpolate(&self, other: &GeoPoint, t: f64) -> GeoPoint {
        let t = t.clamp(0.0, 1.0);
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *other;
        }
        let distance = self.distance_to(other);
        let bearing = self.bearing_to(other);
        self.offset_by_bearing(distance * t, bearing)
    }
}

// ==== ENU (East-North-Up) Coordinate Conversion ====
// These functions convert between meters and degrees using latitude-aware scaling.

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0);
        assert!((a.distance_to(&b) - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn haversine_same_point() {
        let p = GeoPoint::new(46.8, 8.2);
        assert!(p.distance_to(&p) < 0.001);
    }

    #[test]
    fn offset_round_trip() {
        let origin = GeoPoint::new(46.8, 8.2);
        let moved = origin.offset_by_bearing(5_000.0, std::f64::consts::FRAC_PI_2);
        assert!((origin.distance_to(&moved) - 5_000.0).abs() < 1.0);

        let back = moved.offset_by_bearing(5_000.0, -std::f64::consts::FRAC_PI_2);
        assert!(origin.distance_to(&back) < 1.0);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        let north = GeoPoint::new(1.0, 0.0);
        let east = GeoPoint::new(0.0, 1.0);

        assert!(origin.bearing_to(&north).abs() < 1e-6);
        assert!((origin.bearing_to(&east) - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn interpolate_midpoint() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let mid = a.interpolate(&b, 0.5);
        let d_total = a.distance_to(&b);
        assert!((a.distance_to(&mid) - d_total / 2.0).abs() < 1.0);
    }
}

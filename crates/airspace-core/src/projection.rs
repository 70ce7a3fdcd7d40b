//! Flat-earth projection for fast bounding-box and segment math.
//!
//! Projects geographic coordinates into integer meters east/north of a
//! reference point. The projection is locally linear and non-geodesic; it is
//! only used to accelerate superset filtering and flat-space intersection
//! tests near the reference, never for exact containment.

use serde::{Deserialize, Serialize};

use crate::geo::{meters_per_deg_lat, meters_per_deg_lon, GeoPoint};

/// A projected position in integer meters relative to the projection reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatGeoPoint {
    pub x: i32,
    pub y: i32,
}

impl FlatGeoPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box in flat coordinates, outward-rounded so it always
/// encloses the geometry it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatBoundingBox {
    pub min: FlatGeoPoint,
    pub max: FlatGeoPoint,
}

impl FlatBoundingBox {
    /// Build an enclosing box from projected f64 positions, rounding outward
    /// by one extra unit to absorb projection error.
    pub fn enclosing(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y) = first;
        let (mut max_x, mut max_y) = first;
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self {
            min: FlatGeoPoint::new(min_x.floor() as i32 - 1, min_y.floor() as i32 - 1),
            max: FlatGeoPoint::new(max_x.ceil() as i32 + 1, max_y.ceil() as i32 + 1),
        })
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min.x as f64
            && x <= self.max.x as f64
            && y >= self.min.y as f64
            && y <= self.max.y as f64
    }

    /// Whether the segment a→b touches this box (Liang-Barsky clip).
    pub fn intersects_segment(&self, a: (f64, f64), b: (f64, f64)) -> bool {
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;

        let edges = [
            (-dx, a.0 - self.min.x as f64),
            (dx, self.max.x as f64 - a.0),
            (-dy, a.1 - self.min.y as f64),
            (dy, self.max.y as f64 - a.1),
        ];

        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return false;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }

        t0 <= t1
    }
}

/// Locally-linear projection around a reference point.
#[derive(Debug, Clone, Copy)]
pub struct FlatProjection {
    reference: GeoPoint,
    m_per_deg_lat: f64,
    m_per_deg_lon: f64,
}

impl FlatProjection {
    pub fn new(reference: GeoPoint) -> Self {
        Self {
            reference,
            m_per_deg_lat: meters_per_deg_lat(reference.latitude),
            m_per_deg_lon: meters_per_deg_lon(reference.latitude).max(1e-9),
        }
    }

    pub fn reference(&self) -> GeoPoint {
        self.reference
    }

    /// Project to fractional flat meters.
    pub fn project_f64(&self, loc: &GeoPoint) -> (f64, f64) {
        (
            (loc.longitude - self.reference.longitude) * self.m_per_deg_lon,
            (loc.latitude - self.reference.latitude) * self.m_per_deg_lat,
        )
    }

    pub fn unproject_f64(&self, x: f64, y: f64) -> GeoPoint {
        GeoPoint::new(
            self.reference.latitude + y / self.m_per_deg_lat,
            self.reference.longitude + x / self.m_per_deg_lon,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_unproject_round_trip() {
        let projection = FlatProjection::new(GeoPoint::new(46.8, 8.2));
        let loc = GeoPoint::new(46.85, 8.31);

        let (x, y) = projection.project_f64(&loc);
        let back = projection.unproject_f64(x, y);

        assert!(loc.distance_to(&back) < 0.01);
    }

    #[test]
    fn projected_distance_matches_haversine_nearby() {
        let reference = GeoPoint::new(46.8, 8.2);
        let projection = FlatProjection::new(reference);
        let loc = reference.offset_by_bearing(8_000.0, 0.7);

        let (x, y) = projection.project_f64(&loc);
        let flat_distance = (x * x + y * y).sqrt();

        // within 0.5% over a few kilometers
        assert!((flat_distance - 8_000.0).abs() < 40.0);
    }

    #[test]
    fn enclosing_box_rounds_outward() {
        let bb = FlatBoundingBox::enclosing([(0.4, 0.4), (10.6, 20.2)]).unwrap();
        assert!(bb.min.x <= 0 && bb.min.y <= 0);
        assert!(bb.max.x >= 11 && bb.max.y >= 21);
        assert!(bb.contains(0.4, 0.4));
        assert!(bb.contains(10.6, 20.2));
    }

    #[test]
    fn segment_clip_hits_and_misses() {
        let bb = FlatBoundingBox {
            min: FlatGeoPoint::new(-10, -10),
            max: FlatGeoPoint::new(10, 10),
        };

        // crossing straight through
        assert!(bb.intersects_segment((-20.0, 0.0), (20.0, 0.0)));
        // fully inside
        assert!(bb.intersects_segment((-5.0, -5.0), (5.0, 5.0)));
        // passing by
        assert!(!bb.intersects_segment((-20.0, 15.0), (20.0, 15.0)));
        // degenerate point inside
        assert!(bb.intersects_segment((0.0, 0.0), (0.0, 0.0)));
    }
}

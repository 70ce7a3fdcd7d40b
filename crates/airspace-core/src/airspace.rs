//! Airspace volumes: shape, altitude band, class, schedule.
//!
//! A volume is a lateral shape (circle or polygon) extruded between two
//! altitude boundaries. Exact containment and boundary math live here;
//! superset filtering is the index's job. Handles are shared between the
//! spatial index and the warning list, so the mutating resolution calls
//! (`set_ground_level`, `set_flight_level`, `set_activity`) go through
//! interior-mutable caches and work on `&self`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::activity::AirspaceActivity;
use crate::aircraft::AircraftState;
use crate::altitude::{AirspaceAltitude, AtmosphericPressure};
use crate::error::AirspaceError;
use crate::geo::GeoPoint;
use crate::performance::{AircraftPerformance, InterceptSolution};
use crate::projection::{FlatBoundingBox, FlatProjection};

/// Shared handle to one airspace volume.
pub type AirspaceRef = Arc<Airspace>;

/// Number of points used to pre-tessellate a circle boundary for the
/// generic ring-based code paths.
const CIRCLE_BOUNDARY_POINTS: usize = 24;

/// Parametric positions along a query segment closer than this collapse
/// into one crossing.
const CROSSING_MERGE_EPSILON: f64 = 1.0e-9;

/// Airspace classification as parsed from OpenAir-style files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirspaceClass {
    ClassA,
    ClassB,
    ClassC,
    ClassD,
    ClassE,
    ClassF,
    ClassG,
    Danger,
    Restricted,
    Prohibited,
    NoGliders,
    Ctr,
    Tmz,
    Wave,
    Other,
}

impl AirspaceClass {
    pub const ALL: [AirspaceClass; 15] = [
        AirspaceClass::ClassA,
        AirspaceClass::ClassB,
        AirspaceClass::ClassC,
        AirspaceClass::ClassD,
        AirspaceClass::ClassE,
        AirspaceClass::ClassF,
        AirspaceClass::ClassG,
        AirspaceClass::Danger,
        AirspaceClass::Restricted,
        AirspaceClass::Prohibited,
        AirspaceClass::NoGliders,
        AirspaceClass::Ctr,
        AirspaceClass::Tmz,
        AirspaceClass::Wave,
        AirspaceClass::Other,
    ];
}

impl fmt::Display for AirspaceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AirspaceClass::ClassA => "Class A",
            AirspaceClass::ClassB => "Class B",
            AirspaceClass::ClassC => "Class C",
            AirspaceClass::ClassD => "Class D",
            AirspaceClass::ClassE => "Class E",
            AirspaceClass::ClassF => "Class F",
            AirspaceClass::ClassG => "Class G",
            AirspaceClass::Danger => "Danger",
            AirspaceClass::Restricted => "Restricted",
            AirspaceClass::Prohibited => "Prohibited",
            AirspaceClass::NoGliders => "No gliders",
            AirspaceClass::Ctr => "CTR",
            AirspaceClass::Tmz => "TMZ",
            AirspaceClass::Wave => "Wave",
            AirspaceClass::Other => "Other",
        };
        f.write_str(text)
    }
}

/// Lateral shape of a volume. Closed over exactly these two variants.
#[derive(Debug, Clone)]
pub enum AirspaceGeometry {
    Circle {
        center: GeoPoint,
        /// Radius in meters.
        radius: f64,
    },
    Polygon {
        /// Closed ring, first vertex repeated as the last.
        ring: Vec<GeoPoint>,
    },
}

/// One airspace volume.
#[derive(Debug)]
pub struct Airspace {
    name: String,
    class: AirspaceClass,
    geometry: AirspaceGeometry,
    base: AirspaceAltitude,
    top: AirspaceAltitude,
    radio: Option<String>,
    days_of_operation: AirspaceActivity,
    /// Derived from the schedule, see `set_activity`.
    active: AtomicBool,
    /// Circle boundary pre-tessellated for the generic ring paths; polygons
    /// reuse their own ring.
    boundary: Vec<GeoPoint>,
}

impl Airspace {
    /// Circular volume around `center`.
    pub fn circle(
        name: impl Into<String>,
        class: AirspaceClass,
        center: GeoPoint,
        radius: f64,
        base: AirspaceAltitude,
        top: AirspaceAltitude,
    ) -> Self {
        let boundary = tessellate_circle(&center, radius);
        Self {
            name: name.into(),
            class,
            geometry: AirspaceGeometry::Circle { center, radius },
            base,
            top,
            radio: None,
            days_of_operation: AirspaceActivity::every_day(),
            active: AtomicBool::new(true),
            boundary,
        }
    }

    /// Polygonal volume. The ring is closed here if the parser did not
    /// already close it.
    pub fn polygon(
        name: impl Into<String>,
        class: AirspaceClass,
        mut ring: Vec<GeoPoint>,
        base: AirspaceAltitude,
        top: AirspaceAltitude,
    ) -> Self {
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last()) {
            if first != *last {
                ring.push(first);
            }
        }
        Self {
            name: name.into(),
            class,
            geometry: AirspaceGeometry::Polygon {
                ring: ring.clone(),
            },
            base,
            top,
            radio: None,
            days_of_operation: AirspaceActivity::every_day(),
            active: AtomicBool::new(true),
            boundary: ring,
        }
    }

    /// Attach a radio frequency string.
    pub fn with_radio(mut self, radio: impl Into<String>) -> Self {
        self.radio = Some(radio.into());
        self
    }

    /// Restrict the days of operation.
    pub fn with_days(mut self, days: AirspaceActivity) -> Self {
        self.days_of_operation = days;
        self
    }

    /// Check the definition handed in by the parser.
    pub fn validate(&self) -> Result<(), AirspaceError> {
        match &self.geometry {
            AirspaceGeometry::Circle { radius, .. } => {
                if *radius <= 0.0 {
                    return Err(AirspaceError::InvalidRadius(*radius));
                }
            }
            AirspaceGeometry::Polygon { ring } => {
                let distinct = distinct_vertices(ring);
                if distinct < 3 {
                    return Err(AirspaceError::TooFewVertices(distinct));
                }
            }
        }
        if self.base.amsl() > self.top.amsl() {
            return Err(AirspaceError::InvertedAltitudeBand {
                base: self.base.amsl(),
                top: self.top.amsl(),
            });
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> AirspaceClass {
        self.class
    }

    pub fn geometry(&self) -> &AirspaceGeometry {
        &self.geometry
    }

    pub fn base(&self) -> &AirspaceAltitude {
        &self.base
    }

    pub fn top(&self) -> &AirspaceAltitude {
        &self.top
    }

    pub fn radio(&self) -> Option<&str> {
        self.radio.as_deref()
    }

    pub fn days_of_operation(&self) -> AirspaceActivity {
        self.days_of_operation
    }

    /// Whether the schedule currently allows this volume to alert.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Re-derive the active flag against a day mask (normally just today).
    pub fn set_activity(&self, mask: AirspaceActivity) {
        self.active
            .store(self.days_of_operation.intersects(&mask), Ordering::Relaxed);
    }

    /// Whether the base rests on the surface; such a volume cannot be
    /// intercepted from below.
    pub fn is_base_terrain(&self) -> bool {
        self.base.is_terrain()
    }

    /// Resolve AGL boundaries against terrain height at this airspace.
    pub fn set_ground_level(&self, terrain_altitude: f64) {
        self.base.resolve_ground_level(terrain_altitude);
        self.top.resolve_ground_level(terrain_altitude);
    }

    /// Resolve flight-level boundaries against the given QNH.
    pub fn set_flight_level(&self, pressure: &AtmosphericPressure) {
        self.base.resolve_flight_level(pressure);
        self.top.resolve_flight_level(pressure);
    }

    /// "base - top" style vertical extent text for display lists.
    pub fn vertical_text(&self) -> String {
        format!("{:.0}m - {:.0}m", self.base.amsl(), self.top.amsl())
    }

    /// Boundary ring for envelope building and generic scans. Circles return
    /// their pre-tessellated ring.
    pub fn boundary(&self) -> &[GeoPoint] {
        &self.boundary
    }

    /// A representative point for projection reference accounting.
    pub fn reference_point(&self) -> GeoPoint {
        match &self.geometry {
            AirspaceGeometry::Circle { center, .. } => *center,
            AirspaceGeometry::Polygon { ring } => {
                let open = if ring.len() >= 2 && ring.first() == ring.last() {
                    &ring[..ring.len() - 1]
                } else {
                    &ring[..]
                };
                if open.is_empty() {
                    return GeoPoint::new(0.0, 0.0);
                }
                let n = open.len() as f64;
                let (lat, lon) = open.iter().fold((0.0, 0.0), |acc, p| {
                    (acc.0 + p.latitude, acc.1 + p.longitude)
                });
                GeoPoint::new(lat / n, lon / n)
            }
        }
    }

    /// Outward-rounded flat box around the boundary, `None` for degenerate
    /// geometry.
    pub fn envelope(&self, projection: &FlatProjection) -> Option<FlatBoundingBox> {
        if !self.is_valid_shape() {
            return None;
        }
        FlatBoundingBox::enclosing(self.boundary.iter().map(|p| projection.project_f64(p)))
    }

    fn is_valid_shape(&self) -> bool {
        match &self.geometry {
            AirspaceGeometry::Circle { radius, .. } => *radius > 0.0,
            AirspaceGeometry::Polygon { ring } => distinct_vertices(ring) >= 3,
        }
    }

    /// Exact lateral containment, no altitude taken into account.
    pub fn inside(&self, loc: &GeoPoint) -> bool {
        match &self.geometry {
            AirspaceGeometry::Circle { center, radius } => loc.distance_to(center) <= *radius,
            AirspaceGeometry::Polygon { ring } => {
                distinct_vertices(ring) >= 3 && ring_contains(ring, loc)
            }
        }
    }

    /// Exact containment including the resolved altitude band.
    pub fn inside_state(&self, state: &AircraftState) -> bool {
        state.altitude >= self.base.amsl_for(state)
            && state.altitude <= self.top.amsl_for(state)
            && self.inside(&state.location)
    }

    /// Ordered entry/exit pairs where the segment `start`→`end` crosses the
    /// boundary. An intersection exactly at either segment endpoint counts
    /// (closed parametric interval). A segment that stays strictly inside
    /// produces no pairs; the index synthesizes those when asked to.
    pub fn intersections(
        &self,
        start: &GeoPoint,
        end: &GeoPoint,
        projection: &FlatProjection,
    ) -> Vec<(GeoPoint, GeoPoint)> {
        match &self.geometry {
            AirspaceGeometry::Circle { center, radius } => {
                circle_intersections(center, *radius, start, end, projection)
            }
            AirspaceGeometry::Polygon { ring } => {
                if distinct_vertices(ring) < 3 {
                    return Vec::new();
                }
                polygon_intersections(ring, start, end, projection, |p| self.inside(p))
            }
        }
    }

    /// Closest point of the boundary to `loc`; `loc` itself when inside.
    /// Exact for circles and convex rings.
    pub fn closest_point(&self, loc: &GeoPoint, projection: &FlatProjection) -> GeoPoint {
        match &self.geometry {
            AirspaceGeometry::Circle { center, radius } => {
                if loc.distance_to(center) <= *radius {
                    *loc
                } else {
                    center.offset_by_bearing(*radius, center.bearing_to(loc))
                }
            }
            AirspaceGeometry::Polygon { ring } => {
                if distinct_vertices(ring) < 3 {
                    return *loc;
                }
                if ring_contains(ring, loc) {
                    return *loc;
                }
                let p = projection.project_f64(loc);
                let mut best = p;
                let mut best_d2 = f64::INFINITY;
                for edge in ring.windows(2) {
                    let a = projection.project_f64(&edge[0]);
                    let b = projection.project_f64(&edge[1]);
                    let q = nearest_on_segment(p, a, b);
                    let d2 = (q.0 - p.0).powi(2) + (q.1 - p.1).powi(2);
                    if d2 < best_d2 {
                        best_d2 = d2;
                        best = q;
                    }
                }
                projection.unproject_f64(best.0, best.1)
            }
        }
    }

    /// Minimum time to reach the boundary chord `[start, end]` honoring both
    /// the lateral travel and the vertical band. Scans the near wall, and
    /// when the chord has extent, the far wall and the top/bottom faces.
    pub fn intercept(
        &self,
        state: &AircraftState,
        perf: &AircraftPerformance,
        start: &GeoPoint,
        end: &GeoPoint,
    ) -> Option<InterceptSolution> {
        let distance_start = state.location.distance_to(start);
        let distance_end = if start == end {
            distance_start
        } else {
            state.location.distance_to(end)
        };

        let base = self.base.amsl_for(state);
        let top = self.top.amsl_for(state);

        let mut best: Option<InterceptSolution> = None;
        let mut consider = |candidate: Option<InterceptSolution>| {
            if let Some(candidate) = candidate {
                if best
                    .as_ref()
                    .map(|b| candidate.elapsed_time < b.elapsed_time)
                    .unwrap_or(true)
                {
                    best = Some(candidate);
                }
            }
        };

        consider(intercept_vertical(state, perf, distance_start, base, top));

        if (distance_end - distance_start).abs() > f64::EPSILON {
            consider(intercept_vertical(state, perf, distance_end, base, top));
            consider(intercept_horizontal(
                state,
                perf,
                distance_start,
                distance_end,
                top,
            ));
            if !self.is_base_terrain() {
                consider(intercept_horizontal(
                    state,
                    perf,
                    distance_start,
                    distance_end,
                    base,
                ));
            }
        }

        let mut solution = best?;
        // map the winning distance back onto the chord
        solution.location = if (solution.distance - distance_start).abs() <= 1.0 {
            *start
        } else if (solution.distance - distance_end).abs() <= 1.0 {
            *end
        } else if distance_end > distance_start {
            let t = (solution.distance - distance_start) / (distance_end - distance_start);
            start.interpolate(end, t)
        } else {
            *start
        };
        Some(solution)
    }
}

fn intercept_vertical(
    state: &AircraftState,
    perf: &AircraftPerformance,
    distance: f64,
    base: f64,
    top: f64,
) -> Option<InterceptSolution> {
    let (elapsed_time, altitude) = perf.solution_vertical(distance, state.altitude, base, top)?;
    Some(InterceptSolution {
        location: state.location,
        distance,
        altitude,
        elapsed_time,
    })
}

fn intercept_horizontal(
    state: &AircraftState,
    perf: &AircraftPerformance,
    distance_start: f64,
    distance_end: f64,
    altitude: f64,
) -> Option<InterceptSolution> {
    let (elapsed_time, distance) =
        perf.solution_horizontal(distance_start, distance_end, state.altitude, altitude)?;
    Some(InterceptSolution {
        location: state.location,
        distance,
        altitude,
        elapsed_time,
    })
}

fn tessellate_circle(center: &GeoPoint, radius: f64) -> Vec<GeoPoint> {
    let mut ring = Vec::with_capacity(CIRCLE_BOUNDARY_POINTS + 1);
    for i in 0..CIRCLE_BOUNDARY_POINTS {
        let bearing = 2.0 * std::f64::consts::PI * i as f64 / CIRCLE_BOUNDARY_POINTS as f64;
        ring.push(center.offset_by_bearing(radius, bearing));
    }
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

fn distinct_vertices(ring: &[GeoPoint]) -> usize {
    let open = if ring.len() >= 2 && ring.first() == ring.last() {
        &ring[..ring.len() - 1]
    } else {
        ring
    };
    let mut count = 0;
    for (i, p) in open.iter().enumerate() {
        if !open[..i].contains(p) {
            count += 1;
        }
    }
    count
}

/// Ray-cast point-in-ring test in geographic coordinates.
fn ring_contains(ring: &[GeoPoint], loc: &GeoPoint) -> bool {
    let mut inside = false;
    for edge in ring.windows(2) {
        let (a, b) = (&edge[0], &edge[1]);
        let crosses = (a.latitude > loc.latitude) != (b.latitude > loc.latitude);
        if crosses {
            let t = (loc.latitude - a.latitude) / (b.latitude - a.latitude);
            let lon = a.longitude + t * (b.longitude - a.longitude);
            if loc.longitude < lon {
                inside = !inside;
            }
        }
    }
    inside
}

fn nearest_on_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    let ab = (b.0 - a.0, b.1 - a.1);
    let len2 = ab.0 * ab.0 + ab.1 * ab.1;
    if len2 <= f64::EPSILON {
        return a;
    }
    let t = (((p.0 - a.0) * ab.0 + (p.1 - a.1) * ab.1) / len2).clamp(0.0, 1.0);
    (a.0 + t * ab.0, a.1 + t * ab.1)
}

/// Line/circle intersection in projected space, roots mapped back to geo.
fn circle_intersections(
    center: &GeoPoint,
    radius: f64,
    start: &GeoPoint,
    end: &GeoPoint,
    projection: &FlatProjection,
) -> Vec<(GeoPoint, GeoPoint)> {
    if radius <= 0.0 {
        return Vec::new();
    }
    let c = projection.project_f64(center);
    let a = projection.project_f64(start);
    let b = projection.project_f64(end);

    let d = (b.0 - a.0, b.1 - a.1);
    let f = (a.0 - c.0, a.1 - c.1);

    let qa = d.0 * d.0 + d.1 * d.1;
    let qb = 2.0 * (f.0 * d.0 + f.1 * d.1);
    let qc = f.0 * f.0 + f.1 * f.1 - radius * radius;

    if qa <= f64::EPSILON {
        // degenerate segment, no chord to cross
        return Vec::new();
    }

    let discriminant = qb * qb - 4.0 * qa * qc;
    if discriminant < 0.0 {
        return Vec::new();
    }

    let sqrt_d = discriminant.sqrt();
    let t0 = (-qb - sqrt_d) / (2.0 * qa);
    let t1 = (-qb + sqrt_d) / (2.0 * qa);

    // the boundary must actually be crossed within the segment
    let crosses = (0.0..=1.0).contains(&t0) || (0.0..=1.0).contains(&t1);
    if !crosses {
        return Vec::new();
    }

    let entry_t = t0.clamp(0.0, 1.0);
    let exit_t = t1.clamp(0.0, 1.0);
    let entry = start.interpolate(end, entry_t);
    let exit = if (exit_t - entry_t).abs() <= CROSSING_MERGE_EPSILON {
        entry
    } else {
        start.interpolate(end, exit_t)
    };
    vec![(entry, exit)]
}

/// Edge-walking intersection in flat space; pairs are rebuilt from sorted
/// crossings by testing midpoint insideness.
fn polygon_intersections(
    ring: &[GeoPoint],
    start: &GeoPoint,
    end: &GeoPoint,
    projection: &FlatProjection,
    inside: impl Fn(&GeoPoint) -> bool,
) -> Vec<(GeoPoint, GeoPoint)> {
    let a = projection.project_f64(start);
    let b = projection.project_f64(end);

    let mut crossings: Vec<f64> = Vec::new();
    for edge in ring.windows(2) {
        let p = projection.project_f64(&edge[0]);
        let q = projection.project_f64(&edge[1]);
        if let Some(t) = segment_intersection_t(a, b, p, q) {
            crossings.push(t);
        }
    }

    if crossings.is_empty() {
        return Vec::new();
    }

    crossings.sort_by(f64::total_cmp);
    crossings.dedup_by(|x, y| (*x - *y).abs() <= CROSSING_MERGE_EPSILON);

    // sub-interval walk: [0] + crossings + [1]
    let mut cuts = Vec::with_capacity(crossings.len() + 2);
    if crossings.first().map(|t| *t > CROSSING_MERGE_EPSILON).unwrap_or(true) {
        cuts.push(0.0);
    }
    cuts.extend_from_slice(&crossings);
    if crossings
        .last()
        .map(|t| *t < 1.0 - CROSSING_MERGE_EPSILON)
        .unwrap_or(true)
    {
        cuts.push(1.0);
    }

    let mut pairs: Vec<(f64, f64)> = Vec::new();
    for window in cuts.windows(2) {
        let (lo, hi) = (window[0], window[1]);
        if hi - lo <= CROSSING_MERGE_EPSILON {
            continue;
        }
        let midpoint = start.interpolate(end, (lo + hi) * 0.5);
        if inside(&midpoint) {
            match pairs.last_mut() {
                // merge contiguous inside sub-intervals
                Some(last) if (last.1 - lo).abs() <= CROSSING_MERGE_EPSILON => last.1 = hi,
                _ => pairs.push((lo, hi)),
            }
        }
    }

    if pairs.is_empty() {
        // tangential touch: a crossing with no inside interval around it
        let t = crossings[0];
        let touch = start.interpolate(end, t);
        return vec![(touch, touch)];
    }

    pairs
        .into_iter()
        .map(|(lo, hi)| {
            (
                start.interpolate(end, lo),
                start.interpolate(end, hi),
            )
        })
        .collect()
}

/// Parametric position along a→b where it crosses p→q, closed interval on
/// both segments. `None` for parallel or out-of-range configurations.
fn segment_intersection_t(
    a: (f64, f64),
    b: (f64, f64),
    p: (f64, f64),
    q: (f64, f64),
) -> Option<f64> {
    let r = (b.0 - a.0, b.1 - a.1);
    let s = (q.0 - p.0, q.1 - p.1);
    let denom = r.0 * s.1 - r.1 * s.0;
    if denom.abs() <= f64::EPSILON {
        return None;
    }
    let ap = (p.0 - a.0, p.1 - a.1);
    let t = (ap.0 * s.1 - ap.1 * s.0) / denom;
    let u = (ap.0 * r.1 - ap.1 * r.0) / -denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}

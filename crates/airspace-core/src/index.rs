//! Bounding-box-tree container over airspace volumes.
//!
//! Additions are buffered and only become queryable after `optimise()`,
//! which (re)builds the flat projection and bulk-loads the R-tree. Box
//! queries are superset filters; the `query_inside`/`visit_intersecting`
//! entry points refine them with exact geometry.

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use tracing::debug;

use crate::activity::AirspaceActivity;
use crate::aircraft::AircraftState;
use crate::airspace::{Airspace, AirspaceRef};
use crate::altitude::AtmosphericPressure;
use crate::geo::GeoPoint;
use crate::projection::{FlatBoundingBox, FlatGeoPoint, FlatProjection};

/// Reference drift beyond which optimise() re-projects everything. Cached
/// flat coordinates go stale with the projection, so this forces a full
/// rebuild.
const PROJECTION_REBUILD_THRESHOLD_M: f64 = 10_000.0;

type Envelope = GeomWithData<Rectangle<[i32; 2]>, AirspaceRef>;

/// Spatial index over shared airspace handles.
///
/// Invariant: after `optimise()`, every entry's box fully (outward-rounded)
/// encloses its true projected geometry.
pub struct AirspaceIndex {
    tree: RTree<Envelope>,
    projection: Option<FlatProjection>,
    /// Buffered by `add()`, consumed by `optimise()`.
    pending: Vec<AirspaceRef>,
    /// Every airspace the container knows, indexed or degenerate.
    all: Vec<AirspaceRef>,
    serial: u64,
}

impl Default for AirspaceIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AirspaceIndex {
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            projection: None,
            pending: Vec::new(),
            all: Vec::new(),
            serial: 0,
        }
    }

    /// Buffer an airspace for insertion. No query effect until `optimise()`.
    pub fn add(&mut self, airspace: AirspaceRef) {
        self.pending.push(airspace);
    }

    /// Number of airspaces the container knows (including pending ones).
    pub fn len(&self) -> usize {
        self.all.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Version number; bumps whenever optimise() changes the container.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Iterate over every airspace the container knows.
    pub fn iter(&self) -> impl Iterator<Item = &AirspaceRef> {
        self.all.iter().chain(self.pending.iter())
    }

    /// The current projection, `None` before the first optimise().
    pub fn projection(&self) -> Option<&FlatProjection> {
        self.projection.as_ref()
    }

    /// Drop everything, including the projection.
    pub fn clear(&mut self) {
        let was_empty = self.is_empty();
        self.tree = RTree::new();
        self.projection = None;
        self.pending.clear();
        self.all.clear();
        if !was_empty {
            self.serial = self.serial.wrapping_add(1);
        }
    }

    /// Fold pending additions into the tree, rebuilding the projection (and
    /// therefore the whole tree) when the reference point set moved
    /// materially. Must run before querying after any `add()`.
    pub fn optimise(&mut self) {
        if self.pending.is_empty() && self.projection.is_some() {
            return;
        }
        if self.is_empty() {
            return;
        }

        let reference = self.mean_reference();
        let rebuild = match &self.projection {
            Some(projection) => {
                projection.reference().distance_to(&reference) > PROJECTION_REBUILD_THRESHOLD_M
            }
            None => true,
        };

        let appended = std::mem::take(&mut self.pending);
        self.all.extend(appended.iter().cloned());

        if rebuild {
            let projection = FlatProjection::new(reference);
            let entries: Vec<Envelope> = self
                .all
                .iter()
                .filter_map(|airspace| envelope_entry(airspace, &projection))
                .collect();
            debug!(
                airspaces = self.all.len(),
                indexed = entries.len(),
                "rebuilding airspace index"
            );
            self.tree = RTree::bulk_load(entries);
            self.projection = Some(projection);
        } else if let Some(projection) = &self.projection {
            for airspace in &appended {
                if let Some(entry) = envelope_entry(airspace, projection) {
                    self.tree.insert(entry);
                }
            }
        }

        self.serial = self.serial.wrapping_add(1);
    }

    fn mean_reference(&self) -> GeoPoint {
        let mut lat = 0.0;
        let mut lon = 0.0;
        let mut n = 0usize;
        for airspace in self.all.iter().chain(self.pending.iter()) {
            let p = airspace.reference_point();
            lat += p.latitude;
            lon += p.longitude;
            n += 1;
        }
        if n == 0 {
            GeoPoint::new(0.0, 0.0)
        } else {
            GeoPoint::new(lat / n as f64, lon / n as f64)
        }
    }

    /// Superset filter: airspaces whose box intersects the square of
    /// half-side `range` meters around `loc`. Exact distance testing is the
    /// caller's responsibility.
    pub fn query_within_range(&self, loc: &GeoPoint, range: f64) -> Vec<AirspaceRef> {
        let Some(projection) = &self.projection else {
            return Vec::new();
        };
        let (x, y) = projection.project_f64(loc);
        let r = range.max(0.0);
        let envelope = AABB::from_corners(
            [(x - r).floor() as i32, (y - r).floor() as i32],
            [(x + r).ceil() as i32, (y + r).ceil() as i32],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data.clone())
            .collect()
    }

    /// Superset filter on the segment a→b: box overlap refined by a flat
    /// segment-vs-box clip, but no exact geometry test.
    pub fn query_intersecting(&self, a: &GeoPoint, b: &GeoPoint) -> Vec<AirspaceRef> {
        let Some(projection) = &self.projection else {
            return Vec::new();
        };
        let pa = projection.project_f64(a);
        let pb = projection.project_f64(b);
        let envelope = AABB::from_corners(
            [
                pa.0.min(pb.0).floor() as i32,
                pa.1.min(pb.1).floor() as i32,
            ],
            [pa.0.max(pb.0).ceil() as i32, pa.1.max(pb.1).ceil() as i32],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| {
                rectangle_box(entry.geom()).intersects_segment(pa, pb)
            })
            .map(|entry| entry.data.clone())
            .collect()
    }

    /// Exact: box filter refined by lateral containment.
    pub fn query_inside(&self, loc: &GeoPoint) -> Vec<AirspaceRef> {
        self.query_within_range(loc, 0.0)
            .into_iter()
            .filter(|airspace| airspace.inside(loc))
            .collect()
    }

    /// Exact: box filter refined by containment including the altitude band.
    pub fn query_inside_state(&self, state: &AircraftState) -> Vec<AirspaceRef> {
        self.query_within_range(&state.location, 0.0)
            .into_iter()
            .filter(|airspace| airspace.inside_state(state))
            .collect()
    }

    /// Visit every airspace whose boundary the segment `loc`→`end` crosses,
    /// with the exact entry/exit pairs. With `include_inside`, an airspace
    /// containing the whole segment is visited with a synthesized
    /// `(loc, end)` pair, so flight fully inside a volume still alerts.
    pub fn visit_intersecting<F>(
        &self,
        loc: &GeoPoint,
        end: &GeoPoint,
        include_inside: bool,
        mut visitor: F,
    ) where
        F: FnMut(&AirspaceRef, &[(GeoPoint, GeoPoint)]),
    {
        let Some(projection) = &self.projection else {
            return;
        };
        for airspace in self.query_intersecting(loc, end) {
            let pairs = airspace.intersections(loc, end, projection);
            if !pairs.is_empty() {
                visitor(&airspace, &pairs);
            } else if include_inside && airspace.inside(loc) {
                let synthesized = [(*loc, *end)];
                visitor(&airspace, &synthesized);
            }
        }
    }

    /// Resolve AGL boundaries for every airspace against a terrain lookup.
    pub fn set_ground_levels(&self, terrain: impl Fn(&Airspace) -> f64) {
        for airspace in self.iter() {
            airspace.set_ground_level(terrain(airspace));
        }
    }

    /// Resolve flight-level boundaries for every airspace against QNH.
    pub fn set_flight_levels(&self, pressure: &AtmosphericPressure) {
        for airspace in self.iter() {
            airspace.set_flight_level(pressure);
        }
    }

    /// Re-derive every airspace's active flag against a day mask.
    pub fn set_activity(&self, mask: AirspaceActivity) {
        for airspace in self.iter() {
            airspace.set_activity(mask);
        }
    }
}

fn envelope_entry(airspace: &AirspaceRef, projection: &FlatProjection) -> Option<Envelope> {
    let bb = airspace.envelope(projection)?;
    let rect = Rectangle::from_corners([bb.min.x, bb.min.y], [bb.max.x, bb.max.y]);
    Some(GeomWithData::new(rect, airspace.clone()))
}

fn rectangle_box(rect: &Rectangle<[i32; 2]>) -> FlatBoundingBox {
    let lower = rect.lower();
    let upper = rect.upper();
    FlatBoundingBox {
        min: FlatGeoPoint::new(lower[0], lower[1]),
        max: FlatGeoPoint::new(upper[0], upper[1]),
    }
}

//! Priority-queue rankings over spatial query results.
//!
//! Both sorts push every box-filtered candidate onto a heap with its exact
//! metric and pop the best; the heap keeps the exact work proportional to
//! the candidate count, not the container size.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::aircraft::AircraftState;
use crate::airspace::{Airspace, AirspaceRef};
use crate::geo::GeoPoint;
use crate::index::AirspaceIndex;
use crate::performance::{AircraftPerformance, InterceptSolution};

struct Ranked<T> {
    metric: f64,
    value: T,
}

impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.metric == other.metric
    }
}

impl<T> Eq for Ranked<T> {}

impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap, we pop the smallest metric
        other.metric.total_cmp(&self.metric)
    }
}

/// Ranks airspaces by distance from a reference location to their closest
/// boundary point; zero when the reference is inside.
pub struct AirspaceNearestSort {
    reference: GeoPoint,
}

impl AirspaceNearestSort {
    pub fn new(reference: GeoPoint) -> Self {
        Self { reference }
    }

    /// Nearest airspace within `range` meters, with its boundary distance.
    pub fn find_nearest(&self, index: &AirspaceIndex, range: f64) -> Option<(AirspaceRef, f64)> {
        self.find_nearest_if(index, range, |_| true)
    }

    /// Nearest airspace within `range` meters passing `predicate`.
    pub fn find_nearest_if(
        &self,
        index: &AirspaceIndex,
        range: f64,
        predicate: impl Fn(&Airspace) -> bool,
    ) -> Option<(AirspaceRef, f64)> {
        let projection = index.projection()?;
        let mut queue = BinaryHeap::new();

        for airspace in index.query_within_range(&self.reference, range) {
            if !predicate(&airspace) {
                continue;
            }
            let distance = if airspace.inside(&self.reference) {
                0.0
            } else {
                let closest = airspace.closest_point(&self.reference, projection);
                self.reference.distance_to(&closest)
            };
            if distance <= range {
                queue.push(Ranked {
                    metric: distance,
                    value: airspace,
                });
            }
        }

        queue.pop().map(|ranked| (ranked.value, ranked.metric))
    }
}

/// Ranks airspaces by minimum intercept time toward their closest boundary
/// point under a performance model.
pub struct AirspaceSoonestSort {
    state: AircraftState,
    perf: AircraftPerformance,
    /// Candidates beyond this intercept time are ignored.
    max_time: f64,
}

impl AirspaceSoonestSort {
    pub fn new(state: AircraftState, perf: AircraftPerformance, max_time: f64) -> Self {
        Self {
            state,
            perf,
            max_time,
        }
    }

    /// Airspace reachable soonest, with its intercept solution.
    pub fn find_soonest(&self, index: &AirspaceIndex) -> Option<(AirspaceRef, InterceptSolution)> {
        self.find_soonest_if(index, |_| true)
    }

    /// Airspace reachable soonest among those passing `predicate`.
    pub fn find_soonest_if(
        &self,
        index: &AirspaceIndex,
        predicate: impl Fn(&Airspace) -> bool,
    ) -> Option<(AirspaceRef, InterceptSolution)> {
        let projection = index.projection()?;
        // lateral reach within the time bound gives the range filter
        let range = (self.perf.max_speed * self.max_time).max(0.0);
        let mut queue = BinaryHeap::new();

        for airspace in index.query_within_range(&self.state.location, range) {
            if !predicate(&airspace) {
                continue;
            }
            let closest = airspace.closest_point(&self.state.location, projection);
            let Some(solution) = airspace.intercept(&self.state, &self.perf, &closest, &closest)
            else {
                continue;
            };
            if solution.elapsed_time <= self.max_time {
                queue.push(Ranked {
                    metric: solution.elapsed_time,
                    value: (airspace, solution),
                });
            }
        }

        queue.pop().map(|ranked| ranked.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airspace::AirspaceClass;
    use crate::altitude::AirspaceAltitude;
    use std::sync::Arc;

    fn circle_at(name: &str, center: GeoPoint, radius: f64) -> AirspaceRef {
        Arc::new(Airspace::circle(
            name,
            AirspaceClass::Restricted,
            center,
            radius,
            AirspaceAltitude::surface(),
            AirspaceAltitude::msl(3000.0),
        ))
    }

    fn index_with(airspaces: Vec<AirspaceRef>) -> AirspaceIndex {
        let mut index = AirspaceIndex::new();
        for airspace in airspaces {
            index.add(airspace);
        }
        index.optimise();
        index
    }

    #[test]
    fn nearest_prefers_closer_boundary() {
        let origin = GeoPoint::new(46.8, 8.2);
        let near = circle_at("near", origin.offset_by_bearing(3000.0, 0.0), 1000.0);
        let far = circle_at("far", origin.offset_by_bearing(8000.0, 0.0), 1000.0);
        let index = index_with(vec![near, far]);

        let (best, distance) = AirspaceNearestSort::new(origin)
            .find_nearest(&index, 50_000.0)
            .unwrap();
        assert_eq!(best.name(), "near");
        assert!((distance - 2000.0).abs() < 20.0);
    }

    #[test]
    fn nearest_inside_is_distance_zero() {
        let origin = GeoPoint::new(46.8, 8.2);
        let index = index_with(vec![circle_at("around", origin, 5000.0)]);

        let (_, distance) = AirspaceNearestSort::new(origin)
            .find_nearest(&index, 50_000.0)
            .unwrap();
        assert_eq!(distance, 0.0);
    }

    #[test]
    fn nearest_respects_predicate_and_range() {
        let origin = GeoPoint::new(46.8, 8.2);
        let near = circle_at("near", origin.offset_by_bearing(3000.0, 0.0), 1000.0);
        let far = circle_at("far", origin.offset_by_bearing(8000.0, 0.0), 1000.0);
        let index = index_with(vec![near, far]);

        let sort = AirspaceNearestSort::new(origin);
        let (best, _) = sort
            .find_nearest_if(&index, 50_000.0, |a| a.name() != "near")
            .unwrap();
        assert_eq!(best.name(), "far");

        assert!(sort.find_nearest(&index, 500.0).is_none());
    }

    #[test]
    fn soonest_ranks_by_intercept_time() {
        let origin = GeoPoint::new(46.8, 8.2);
        let near = circle_at("near", origin.offset_by_bearing(3000.0, 0.0), 1000.0);
        let far = circle_at("far", origin.offset_by_bearing(9000.0, 0.0), 1000.0);
        let index = index_with(vec![near, far]);

        let state = AircraftState::new(origin, 500.0);
        let perf = AircraftPerformance::standard();
        let sort = AirspaceSoonestSort::new(state, perf, 1000.0);

        let (best, solution) = sort.find_soonest(&index).unwrap();
        assert_eq!(best.name(), "near");
        // 2000m to the boundary at 30 m/s cruise
        assert!((solution.elapsed_time - 2000.0 / 30.0).abs() < 5.0);
    }

    #[test]
    fn soonest_bounded_by_max_time() {
        let origin = GeoPoint::new(46.8, 8.2);
        let index = index_with(vec![circle_at(
            "far",
            origin.offset_by_bearing(9000.0, 0.0),
            1000.0,
        )]);

        let state = AircraftState::new(origin, 500.0);
        let perf = AircraftPerformance::standard();
        // boundary is ~267s away at cruise; 60s bound excludes it
        let sort = AirspaceSoonestSort::new(state, perf, 60.0);
        assert!(sort.find_soonest(&index).is_none());
    }
}

//! Shared engine state and the cross-thread lease discipline.
//!
//! One coarse mutex covers the spatial index and the warning manager. The
//! calculation thread runs `update()` once per tick under the lock; the UI
//! thread takes a scoped read lease for queries and list iteration. Lock
//! hold time is bounded by one query or one update pass; solvers are
//! iteration-capped and nothing does I/O under the lock.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::aircraft::AircraftState;
use crate::airspace::AirspaceRef;
use crate::index::AirspaceIndex;
use crate::manager::{AirspaceWarningConfig, AirspaceWarningManager};
use crate::performance::{GlidePolar, TaskSolution};

/// Version numbers for cheap "unchanged since last read" detection without
/// re-walking the structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSerials {
    pub index: u64,
    pub warnings: u64,
}

/// The airspace index and warning manager, owned together so one lock can
/// cover both.
pub struct AirspaceEngine {
    index: AirspaceIndex,
    manager: AirspaceWarningManager,
}

impl AirspaceEngine {
    pub fn new(config: AirspaceWarningConfig) -> Self {
        Self {
            index: AirspaceIndex::new(),
            manager: AirspaceWarningManager::new(config),
        }
    }

    pub fn index(&self) -> &AirspaceIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut AirspaceIndex {
        &mut self.index
    }

    pub fn manager(&self) -> &AirspaceWarningManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut AirspaceWarningManager {
        &mut self.manager
    }

    pub fn serials(&self) -> EngineSerials {
        EngineSerials {
            index: self.index.serial(),
            warnings: self.manager.serial(),
        }
    }

    /// One calculation tick: fold pending index changes, then run the
    /// warning passes. Returns whether the warning list visibly changed.
    pub fn update(
        &mut self,
        state: &AircraftState,
        polar: &GlidePolar,
        task: Option<&TaskSolution>,
        dt: f64,
    ) -> bool {
        self.index.optimise();
        self.manager.update(&self.index, state, polar, task, dt)
    }
}

/// Scoped read-only view of the engine. Holding the lease keeps the lock;
/// drop it promptly.
pub struct AirspaceLease<'a> {
    guard: MutexGuard<'a, AirspaceEngine>,
}

impl Deref for AirspaceLease<'_> {
    type Target = AirspaceEngine;

    fn deref(&self) -> &AirspaceEngine {
        &self.guard
    }
}

/// Scoped writable view for the calculation thread.
pub struct AirspaceEdit<'a> {
    guard: MutexGuard<'a, AirspaceEngine>,
}

impl Deref for AirspaceEdit<'_> {
    type Target = AirspaceEngine;

    fn deref(&self) -> &AirspaceEngine {
        &self.guard
    }
}

impl DerefMut for AirspaceEdit<'_> {
    fn deref_mut(&mut self) -> &mut AirspaceEngine {
        &mut self.guard
    }
}

/// Cloneable handle to the engine shared between the calculation and UI
/// threads.
#[derive(Clone)]
pub struct SharedAirspaceEngine {
    inner: Arc<Mutex<AirspaceEngine>>,
}

impl SharedAirspaceEngine {
    pub fn new(engine: AirspaceEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Read lease for display queries and warning-list iteration.
    pub fn lease(&self) -> AirspaceLease<'_> {
        AirspaceLease {
            guard: self.inner.lock(),
        }
    }

    /// Write access for the calculation thread.
    pub fn edit(&self) -> AirspaceEdit<'_> {
        AirspaceEdit {
            guard: self.inner.lock(),
        }
    }

    /// Run one calculation tick under the lock.
    pub fn update(
        &self,
        state: &AircraftState,
        polar: &GlidePolar,
        task: Option<&TaskSolution>,
        dt: f64,
    ) -> bool {
        self.inner.lock().update(state, polar, task, dt)
    }

    /// Current version numbers, without keeping the lock across later reads.
    pub fn serials(&self) -> EngineSerials {
        self.inner.lock().serials()
    }

    /// User-triggered acknowledgement; takes the lock internally.
    pub fn acknowledge_warning(&self, airspace: &AirspaceRef, set: bool) {
        self.inner.lock().manager.acknowledge_warning(airspace, set);
    }

    pub fn acknowledge_inside(&self, airspace: &AirspaceRef, set: bool) {
        self.inner.lock().manager.acknowledge_inside(airspace, set);
    }

    pub fn acknowledge_day(&self, airspace: &AirspaceRef, set: bool) {
        self.inner.lock().manager.acknowledge_day(airspace, set);
    }

    pub fn acknowledge_all(&self) {
        self.inner.lock().manager.acknowledge_all();
    }

    pub fn set_config(&self, config: AirspaceWarningConfig) {
        self.inner.lock().manager.set_config(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airspace::{Airspace, AirspaceClass};
    use crate::altitude::AirspaceAltitude;
    use crate::geo::GeoPoint;
    use crate::warning::WarningState;
    use std::sync::Arc;

    fn engine_with_circle(center: GeoPoint) -> SharedAirspaceEngine {
        let mut engine = AirspaceEngine::new(AirspaceWarningConfig::default());
        engine.index_mut().add(Arc::new(Airspace::circle(
            "R-1",
            AirspaceClass::Restricted,
            center,
            1000.0,
            AirspaceAltitude::surface(),
            AirspaceAltitude::agl(1000.0),
        )));
        SharedAirspaceEngine::new(engine)
    }

    #[test]
    fn update_optimises_then_warns() {
        let center = GeoPoint::new(46.8, 8.2);
        let shared = engine_with_circle(center);

        let state = AircraftState::new(center, 0.0);
        let changed = shared.update(&state, &GlidePolar::default(), None, 1.0);
        assert!(changed);

        let lease = shared.lease();
        assert_eq!(lease.manager().len(), 1);
        assert_eq!(lease.manager().warnings()[0].state(), WarningState::Inside);
    }

    #[test]
    fn lease_sees_consistent_state_across_threads() {
        let center = GeoPoint::new(46.8, 8.2);
        let shared = engine_with_circle(center);
        let state = AircraftState::new(center, 0.0);
        shared.update(&state, &GlidePolar::default(), None, 1.0);

        let reader = {
            let shared = shared.clone();
            std::thread::spawn(move || {
                let lease = shared.lease();
                lease.manager().len()
            })
        };
        assert_eq!(reader.join().unwrap(), 1);
    }

    #[test]
    fn serials_detect_changes_without_releasing_reads() {
        let center = GeoPoint::new(46.8, 8.2);
        let shared = engine_with_circle(center);
        let before = shared.serials();

        let state = AircraftState::new(center, 0.0);
        shared.update(&state, &GlidePolar::default(), None, 1.0);

        let after = shared.serials();
        assert_ne!(before.index, after.index);
        assert_ne!(before.warnings, after.warnings);

        // another tick with nothing new leaves both serials alone
        let again = {
            shared.update(&state, &GlidePolar::default(), None, 1.0);
            shared.serials()
        };
        assert_eq!(after.index, again.index);
    }

    #[test]
    fn edit_adds_airspace_mid_session() {
        let center = GeoPoint::new(46.8, 8.2);
        let shared = engine_with_circle(center);
        let state = AircraftState::new(center, 0.0);
        shared.update(&state, &GlidePolar::default(), None, 1.0);

        {
            let mut edit = shared.edit();
            edit.index_mut().add(Arc::new(Airspace::circle(
                "R-2",
                AirspaceClass::Danger,
                center.offset_by_bearing(500.0, 0.0),
                800.0,
                AirspaceAltitude::surface(),
                AirspaceAltitude::agl(1000.0),
            )));
        }

        // next tick folds the addition in and warns for both
        shared.update(&state, &GlidePolar::default(), None, 1.0);
        let lease = shared.lease();
        assert_eq!(lease.index().len(), 2);
        assert_eq!(lease.manager().len(), 2);
    }

    #[test]
    fn acknowledgement_goes_through_the_lock() {
        let center = GeoPoint::new(46.8, 8.2);
        let shared = engine_with_circle(center);
        let state = AircraftState::new(center, 0.0);
        shared.update(&state, &GlidePolar::default(), None, 1.0);

        let airspace = shared.lease().manager().warnings()[0].airspace().clone();
        shared.acknowledge_inside(&airspace, true);

        shared.update(&state, &GlidePolar::default(), None, 1.0);
        assert!(!shared.lease().manager().warnings()[0].is_ack_expired());
    }
}

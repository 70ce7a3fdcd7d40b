//! Per-tick orchestration of the warning list.
//!
//! Once per tick, `update()` snapshots every warning, runs the four
//! prediction passes in decreasing severity (inside, glide, filter, task),
//! sweeps liveness/acknowledgement timers, purges dead warnings and re-sorts
//! the list. The manager owns the low-pass filter pair and the derived
//! performance models; the shared index is passed in by the caller.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::aircraft::AircraftState;
use crate::airspace::{Airspace, AirspaceClass, AirspaceRef};
use crate::error::AirspaceError;
use crate::filter::AircraftStateFilter;
use crate::geo::GeoPoint;
use crate::index::AirspaceIndex;
use crate::performance::{AircraftPerformance, GlidePolar, TaskSolution};
use crate::warning::{AirspaceWarning, WarningState};

/// Warning-system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirspaceWarningConfig {
    /// Time window for task-pass intercepts in seconds.
    pub warning_time: f64,
    /// Acknowledgement countdown duration in seconds.
    pub acknowledgement_time: f64,
    /// Glide-pass extrapolation horizon in seconds.
    pub prediction_time_glide: f64,
    /// Filter-pass extrapolation horizon in seconds.
    pub prediction_time_filter: f64,
    /// Airspace whose base is more than this above the aircraft is ignored,
    /// meters.
    pub altitude_headroom: f64,
    /// Classes that never warn.
    pub disabled_classes: Vec<AirspaceClass>,
}

impl Default for AirspaceWarningConfig {
    fn default() -> Self {
        Self {
            warning_time: 600.0,
            acknowledgement_time: 60.0,
            prediction_time_glide: 90.0,
            prediction_time_filter: 60.0,
            altitude_headroom: 1000.0,
            disabled_classes: Vec::new(),
        }
    }
}

impl AirspaceWarningConfig {
    pub fn validate(&self) -> Result<(), AirspaceError> {
        for (name, value) in [
            ("warning_time", self.warning_time),
            ("acknowledgement_time", self.acknowledgement_time),
            ("prediction_time_glide", self.prediction_time_glide),
            ("prediction_time_filter", self.prediction_time_filter),
        ] {
            if value <= 0.0 {
                return Err(AirspaceError::NonPositiveTime { name, value });
            }
        }
        Ok(())
    }

    pub fn is_class_enabled(&self, class: AirspaceClass) -> bool {
        !self.disabled_classes.contains(&class)
    }
}

/// Severity-sorted warning list plus the prediction machinery feeding it.
pub struct AirspaceWarningManager {
    config: AirspaceWarningConfig,
    warnings: Vec<AirspaceWarning>,
    filter_cruise: AircraftStateFilter,
    filter_circling: AircraftStateFilter,
    serial: u64,
}

impl AirspaceWarningManager {
    pub fn new(config: AirspaceWarningConfig) -> Self {
        let filter_cutoff = config.prediction_time_filter;
        Self {
            config,
            warnings: Vec::new(),
            filter_cruise: AircraftStateFilter::new(filter_cutoff),
            filter_circling: AircraftStateFilter::new(filter_cutoff / 2.0),
            serial: 0,
        }
    }

    pub fn config(&self) -> &AirspaceWarningConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AirspaceWarningConfig) {
        self.filter_cruise.design(config.prediction_time_filter);
        self.filter_circling.design(config.prediction_time_filter / 2.0);
        self.config = config;
        self.serial = self.serial.wrapping_add(1);
    }

    pub fn set_prediction_time_glide(&mut self, time: f64) {
        self.config.prediction_time_glide = time;
    }

    pub fn set_prediction_time_filter(&mut self, time: f64) {
        self.config.prediction_time_filter = time;
        self.filter_cruise.design(time);
        self.filter_circling.design(time / 2.0);
    }

    /// Version number; bumps when the warning list visibly changes.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Severity-sorted warnings, most urgent first.
    pub fn warnings(&self) -> &[AirspaceWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Warning tracking the given airspace, if any.
    pub fn find_warning(&self, airspace: &AirspaceRef) -> Option<&AirspaceWarning> {
        self.warnings.iter().find(|w| w.is_for(airspace))
    }

    /// Position of the given airspace in the sorted list.
    pub fn find_warning_index(&self, airspace: &AirspaceRef) -> Option<usize> {
        self.warnings.iter().position(|w| w.is_for(airspace))
    }

    /// Drop all warnings and filter history.
    pub fn reset(&mut self, state: &AircraftState) {
        self.warnings.clear();
        self.filter_cruise.reset(state);
        self.filter_circling.reset(state);
        self.serial = self.serial.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        if !self.warnings.is_empty() {
            self.warnings.clear();
            self.serial = self.serial.wrapping_add(1);
        }
    }

    /// Start (or cancel) the predicted-warning acknowledgement for one
    /// airspace.
    pub fn acknowledge_warning(&mut self, airspace: &AirspaceRef, set: bool) {
        let duration = self.config.acknowledgement_time;
        self.get_warning_mut(airspace).acknowledge_warning(set, duration);
        self.serial = self.serial.wrapping_add(1);
    }

    /// Start (or cancel) the inside acknowledgement for one airspace.
    pub fn acknowledge_inside(&mut self, airspace: &AirspaceRef, set: bool) {
        let duration = self.config.acknowledgement_time;
        self.get_warning_mut(airspace).acknowledge_inside(set, duration);
        self.serial = self.serial.wrapping_add(1);
    }

    /// Pin (or release) a session acknowledgement for one airspace.
    pub fn acknowledge_day(&mut self, airspace: &AirspaceRef, set: bool) {
        self.get_warning_mut(airspace).acknowledge_day(set);
        self.serial = self.serial.wrapping_add(1);
    }

    /// Day-pin every current warning.
    pub fn acknowledge_all(&mut self) {
        for warning in &mut self.warnings {
            warning.acknowledge_day(true);
        }
        self.serial = self.serial.wrapping_add(1);
    }

    /// Run one tick: four prediction passes, liveness sweep, purge, sort.
    /// Returns whether anything the UI shows changed.
    pub fn update(
        &mut self,
        index: &AirspaceIndex,
        state: &AircraftState,
        polar: &GlidePolar,
        task: Option<&TaskSolution>,
        dt: f64,
    ) -> bool {
        for warning in &mut self.warnings {
            warning.save_state();
        }

        // both filters track every fix; prediction picks by flight mode
        self.filter_cruise.update(state);
        self.filter_circling.update(state);

        self.update_inside(index, state, polar);
        self.update_glide(index, state, polar);
        self.update_filter(index, state);
        self.update_task(index, state, polar, task);

        let mut changed = false;
        self.warnings.retain_mut(|warning| {
            if warning.warning_live(dt) {
                if warning.changed_state() {
                    changed = true;
                }
                true
            } else {
                trace!(airspace = warning.airspace().name(), "warning purged");
                false
            }
        });

        self.warnings.sort_by(|a, b| a.ranking_cmp(b));

        if changed {
            self.serial = self.serial.wrapping_add(1);
            debug!(warnings = self.warnings.len(), "warning list changed");
        }
        changed
    }

    /// Aircraft inside a volume right now: compute the exit intercept under
    /// the glide model and mark inside.
    fn update_inside(&mut self, index: &AirspaceIndex, state: &AircraftState, polar: &GlidePolar) {
        let Some(projection) = index.projection() else {
            return;
        };
        let perf = AircraftPerformance::from_polar(polar);

        for airspace in index.query_inside_state(state) {
            if self.excluded(&airspace, state) {
                continue;
            }
            let warning = get_warning_entry(&mut self.warnings, &airspace);
            if !warning.state_accepted(WarningState::Inside) {
                continue;
            }
            let exit = airspace.closest_point(&state.location, projection);
            if let Some(solution) = airspace.intercept(state, &perf, &exit, &exit) {
                warning.update_solution(WarningState::Inside, solution);
            }
        }
    }

    /// Straight-line glide extrapolation pass.
    fn update_glide(&mut self, index: &AirspaceIndex, state: &AircraftState, polar: &GlidePolar) {
        let predicted = state.predicted(self.config.prediction_time_glide);
        let perf = AircraftPerformance::from_polar(polar);
        self.update_predicted(
            index,
            state,
            &predicted.location,
            &perf,
            WarningState::Glide,
            self.config.prediction_time_glide,
        );
    }

    /// Low-pass filter extrapolation pass; the circling filter predicts
    /// while thermalling, the cruise filter otherwise.
    fn update_filter(&mut self, index: &AirspaceIndex, state: &AircraftState) {
        let filter = if state.circling {
            &self.filter_circling
        } else {
            &self.filter_cruise
        };
        let Some(predicted) = filter.predicted_state(self.config.prediction_time_filter) else {
            return;
        };
        let perf = AircraftPerformance::from_filter(filter);
        self.update_predicted(
            index,
            state,
            &predicted.location,
            &perf,
            WarningState::Filter,
            self.config.prediction_time_filter,
        );
    }

    /// Remaining-task-leg pass; only runs with a valid task solution. The
    /// target is capped to the distance reachable within the warning time.
    fn update_task(
        &mut self,
        index: &AirspaceIndex,
        state: &AircraftState,
        polar: &GlidePolar,
        task: Option<&TaskSolution>,
    ) {
        let Some(task) = task else {
            return;
        };
        if task.time_remaining <= 0.0 || task.distance_remaining <= 0.0 {
            return;
        }

        let perf = AircraftPerformance::from_task(polar, task);
        let target = cap_target(
            &state.location,
            &task.target,
            perf.cruise_speed * self.config.warning_time.min(task.time_remaining),
        );
        let max_time = task.time_remaining.min(self.config.warning_time);
        self.update_predicted(index, state, &target, &perf, WarningState::Task, max_time);
    }

    /// Shared body of the three predicted passes: intersect the index
    /// against the segment to the predicted position, intercept each hit,
    /// and feed accepted solutions into the warning list.
    fn update_predicted(
        &mut self,
        index: &AirspaceIndex,
        state: &AircraftState,
        location_predicted: &GeoPoint,
        perf: &AircraftPerformance,
        warning_state: WarningState,
        max_time: f64,
    ) {
        let config = self.config.clone();
        let warnings = &mut self.warnings;

        index.visit_intersecting(&state.location, location_predicted, true, |airspace, pairs| {
            if excluded_by(&config, airspace, state) {
                return;
            }
            let warning = get_warning_entry(warnings, airspace);
            if !warning.state_accepted(warning_state) {
                return;
            }
            let Some((entry, exit)) = pairs.first() else {
                return;
            };
            if let Some(solution) = airspace.intercept(state, perf, entry, exit) {
                if solution.elapsed_time <= max_time {
                    warning.update_solution(warning_state, solution);
                }
            }
        });
    }

    fn excluded(&self, airspace: &Airspace, state: &AircraftState) -> bool {
        excluded_by(&self.config, airspace, state)
    }

    fn get_warning_mut(&mut self, airspace: &AirspaceRef) -> &mut AirspaceWarning {
        get_warning_entry(&mut self.warnings, airspace)
    }
}

/// Exclusion predicate shared by all four passes: disabled class, inactive
/// schedule, or base too far above the aircraft.
fn excluded_by(
    config: &AirspaceWarningConfig,
    airspace: &Airspace,
    state: &AircraftState,
) -> bool {
    if !config.is_class_enabled(airspace.class()) {
        return true;
    }
    if !airspace.is_active() {
        return true;
    }
    airspace.base().amsl() > state.altitude + config.altitude_headroom
}

fn get_warning_entry<'a>(
    warnings: &'a mut Vec<AirspaceWarning>,
    airspace: &AirspaceRef,
) -> &'a mut AirspaceWarning {
    let i = match warnings.iter().position(|w| w.is_for(airspace)) {
        Some(i) => i,
        None => {
            warnings.push(AirspaceWarning::new(airspace.clone()));
            warnings.len() - 1
        }
    };
    &mut warnings[i]
}

/// Pull `target` toward `from` onto the circle of radius `max_distance`.
fn cap_target(from: &GeoPoint, target: &GeoPoint, max_distance: f64) -> GeoPoint {
    let distance = from.distance_to(target);
    if distance <= max_distance || distance <= 0.0 {
        *target
    } else {
        from.interpolate(target, max_distance / distance)
    }
}

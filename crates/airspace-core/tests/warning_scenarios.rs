//! End-to-end warning-engine scenarios.
//!
//! Each test drives a `SharedAirspaceEngine` the way the calculation thread
//! does: add airspace, then tick `update()` with aircraft fixes and check
//! the warning list through a read lease.

use std::sync::Arc;

use airspace_core::{
    AircraftState, Airspace, AirspaceAltitude, AirspaceClass, AirspaceEngine, AirspaceRef,
    AirspaceWarningConfig, GeoPoint, GlidePolar, SharedAirspaceEngine, WarningState,
};

const CENTER: GeoPoint = GeoPoint {
    latitude: 0.0,
    longitude: 0.0,
};

fn restricted_cylinder() -> AirspaceRef {
    // r = 1000 m at (0,0), base SFC, top 1000 m AGL
    Arc::new(Airspace::circle(
        "TEST R-1",
        AirspaceClass::Restricted,
        CENTER,
        1000.0,
        AirspaceAltitude::surface(),
        AirspaceAltitude::agl(1000.0),
    ))
}

fn engine_with(airspace: AirspaceRef, config: AirspaceWarningConfig) -> SharedAirspaceEngine {
    let mut engine = AirspaceEngine::new(config);
    engine.index_mut().add(airspace);
    SharedAirspaceEngine::new(engine)
}

fn test_polar() -> GlidePolar {
    GlidePolar {
        v_best_ld: 27.0,
        s_best_ld: 0.6,
        s_max: 3.5,
        v_max: 55.0,
        mc: 0.5,
    }
}

#[test]
fn scenario_inside_at_surface() {
    let shared = engine_with(restricted_cylinder(), AirspaceWarningConfig::default());

    // aircraft at the center, altitude 0
    let state = AircraftState::new(CENTER, 0.0);
    let changed = shared.update(&state, &test_polar(), None, 1.0);
    assert!(changed);

    let lease = shared.lease();
    let warnings = lease.manager().warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].state(), WarningState::Inside);

    let solution = warnings[0].solution().unwrap();
    assert!(
        solution.elapsed_time < 0.5,
        "exit intercept should be immediate, got {}",
        solution.elapsed_time
    );
}

#[test]
fn scenario_glide_prediction_toward_cylinder() {
    let config = AirspaceWarningConfig {
        prediction_time_glide: 60.0,
        prediction_time_filter: 60.0,
        ..AirspaceWarningConfig::default()
    };
    let shared = engine_with(restricted_cylinder(), config);

    // ~2.2 km north, flying south at 50 m/s straight at the center
    let start = CENTER.offset_by_bearing(2200.0, 0.0);
    let state = AircraftState::new(start, 500.0).with_velocity(180.0, 50.0, 0.0);

    let changed = shared.update(&state, &test_polar(), None, 1.0);
    assert!(changed);

    let lease = shared.lease();
    let warnings = lease.manager().warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].state() >= WarningState::Glide);

    // 1200 m to the boundary at the polar's 27 m/s cruise
    let elapsed = warnings[0].solution().unwrap().elapsed_time;
    assert!((elapsed - 44.4).abs() < 3.0, "elapsed {elapsed}");
}

#[test]
fn scenario_acknowledgement_expiry() {
    let config = AirspaceWarningConfig {
        acknowledgement_time: 30.0,
        ..AirspaceWarningConfig::default()
    };
    let shared = engine_with(restricted_cylinder(), config);
    let polar = test_polar();

    let mut state = AircraftState::new(CENTER, 0.0);
    shared.update(&state, &polar, None, 1.0);

    let airspace = shared.lease().manager().warnings()[0].airspace().clone();
    shared.acknowledge_inside(&airspace, true);

    // while the acknowledgement runs, the warning stays listed but quiet
    for tick in 1..=20 {
        state.time = tick as f64;
        let changed = shared.update(&state, &polar, None, 1.0);
        assert!(!changed, "tick {tick} should be quiet");

        let lease = shared.lease();
        assert_eq!(lease.manager().len(), 1);
        assert!(!lease.manager().warnings()[0].is_ack_expired());
    }

    // the lapse tick resurfaces the warning with a state-change edge
    let mut resurfaced = false;
    for tick in 21..=40 {
        state.time = tick as f64;
        let changed = shared.update(&state, &polar, None, 1.0);
        let lease = shared.lease();
        if lease.manager().warnings()[0].is_ack_expired() {
            assert!(changed, "expiry must report a change");
            resurfaced = true;
            break;
        }
    }
    assert!(resurfaced, "acknowledgement never lapsed");
}

#[test]
fn scenario_shared_edge_is_deterministic() {
    let p = |lat: f64, lon: f64| GeoPoint::new(lat, lon);
    let west = Arc::new(Airspace::polygon(
        "WEST",
        AirspaceClass::Danger,
        vec![
            p(-0.01, -0.01),
            p(0.01, -0.01),
            p(0.01, 0.0),
            p(-0.01, 0.0),
        ],
        AirspaceAltitude::surface(),
        AirspaceAltitude::msl(3000.0),
    ));
    let east = Arc::new(Airspace::polygon(
        "EAST",
        AirspaceClass::Danger,
        vec![
            p(-0.01, 0.0),
            p(0.01, 0.0),
            p(0.01, 0.01),
            p(-0.01, 0.01),
        ],
        AirspaceAltitude::surface(),
        AirspaceAltitude::msl(3000.0),
    ));

    let mut engine = AirspaceEngine::new(AirspaceWarningConfig::default());
    engine.index_mut().add(west);
    engine.index_mut().add(east);
    engine.index_mut().optimise();
    let shared = SharedAirspaceEngine::new(engine);

    // exactly on the shared edge
    let on_edge = AircraftState::new(p(0.0, 0.0), 100.0);

    let first: Vec<String> = {
        let lease = shared.lease();
        lease
            .index()
            .query_inside_state(&on_edge)
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    };
    assert_eq!(first.len(), 1, "edge decision must be unambiguous");

    for _ in 0..20 {
        let lease = shared.lease();
        let again: Vec<String> = lease
            .index()
            .query_inside_state(&on_edge)
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(again, first);
    }
}

#[test]
fn warning_follows_flight_through_the_volume() {
    let config = AirspaceWarningConfig {
        prediction_time_glide: 60.0,
        prediction_time_filter: 60.0,
        ..AirspaceWarningConfig::default()
    };
    let shared = engine_with(restricted_cylinder(), config);
    let polar = test_polar();

    // approach from 5 km north at 50 m/s, descend through, leave south
    let start = CENTER.offset_by_bearing(5000.0, 0.0);
    let mut saw_glide = false;
    let mut saw_inside = false;

    for tick in 0..260 {
        let t = tick as f64;
        let mut state = AircraftState::new(start.offset_by_bearing(50.0 * t, std::f64::consts::PI), 500.0)
            .with_velocity(180.0, 50.0, 0.0);
        state.time = t;
        shared.update(&state, &polar, None, 1.0);

        let lease = shared.lease();
        match lease.manager().warnings().first().map(|w| w.state()) {
            Some(WarningState::Inside) => saw_inside = true,
            Some(state) if state >= WarningState::Glide => saw_glide = true,
            _ => {}
        }
    }

    assert!(saw_glide, "approach never produced a glide warning");
    assert!(saw_inside, "transit never produced an inside warning");

    // well past the cylinder, the warning list drains
    for tick in 260..300 {
        let t = tick as f64;
        let mut state = AircraftState::new(start.offset_by_bearing(50.0 * t, std::f64::consts::PI), 500.0)
            .with_velocity(180.0, 50.0, 0.0);
        state.time = t;
        shared.update(&state, &polar, None, 1.0);
    }
    assert!(shared.lease().manager().is_empty());
}

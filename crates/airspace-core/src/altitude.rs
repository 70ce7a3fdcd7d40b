//! Airspace altitude boundaries and their resolution to AMSL.
//!
//! A boundary can be declared above mean sea level, above ground, or as a
//! flight level. AGL and FL boundaries only become comparable to an aircraft
//! altitude once resolved against terrain height or QNH; resolution writes a
//! cached AMSL value so queries stay cheap between terrain/pressure updates.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::aircraft::AircraftState;

const METERS_PER_FLIGHT_LEVEL: f64 = 100.0 * 0.3048;
const STANDARD_QNH_HPA: f64 = 1013.25;
/// Altimetry rule of thumb near sea level: one hectopascal is about 27 ft.
const METERS_PER_HPA: f64 = 8.23;

/// Shared mutable f64, stored as bits.
///
/// Resolved altitudes are updated through shared `Arc` handles while the
/// engine lock is held, so plain fields cannot be used.
#[derive(Debug)]
pub(crate) struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub(crate) fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub(crate) fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Clone for AtomicF64 {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

/// Reference datum of an airspace boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltitudeReference {
    /// Above mean sea level
    Msl,
    /// Above ground level
    Agl,
    /// Pressure flight level
    FlightLevel,
}

/// QNH pressure used to resolve flight levels to AMSL altitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericPressure {
    pub qnh_hpa: f64,
}

impl Default for AtmosphericPressure {
    fn default() -> Self {
        Self {
            qnh_hpa: STANDARD_QNH_HPA,
        }
    }
}

impl AtmosphericPressure {
    pub fn new(qnh_hpa: f64) -> Self {
        Self { qnh_hpa }
    }

    /// AMSL altitude of a flight level under this QNH.
    pub fn flight_level_to_altitude(&self, flight_level: f64) -> f64 {
        flight_level * METERS_PER_FLIGHT_LEVEL + (self.qnh_hpa - STANDARD_QNH_HPA) * METERS_PER_HPA
    }
}

/// One vertical boundary of an airspace volume.
#[derive(Debug, Clone)]
pub struct AirspaceAltitude {
    pub reference: AltitudeReference,
    /// Resolved AMSL cache, see `resolve_ground_level`/`resolve_flight_level`.
    amsl: AtomicF64,
    /// Declared flight level (FlightLevel reference only).
    pub flight_level: f64,
    /// Declared height above terrain in meters (Agl reference only).
    pub above_terrain: f64,
}

impl AirspaceAltitude {
    /// Boundary at a fixed AMSL altitude in meters.
    pub fn msl(altitude: f64) -> Self {
        Self {
            reference: AltitudeReference::Msl,
            amsl: AtomicF64::new(altitude),
            flight_level: 0.0,
            above_terrain: 0.0,
        }
    }

    /// Boundary at a height above terrain in meters. Until terrain is known
    /// the cache assumes terrain at sea level.
    pub fn agl(above_terrain: f64) -> Self {
        Self {
            reference: AltitudeReference::Agl,
            amsl: AtomicF64::new(above_terrain),
            flight_level: 0.0,
            above_terrain,
        }
    }

    /// Boundary at the surface.
    pub fn surface() -> Self {
        Self::agl(0.0)
    }

    /// Boundary at a flight level. Until QNH is known the cache assumes
    /// standard pressure.
    pub fn flight_level(flight_level: f64) -> Self {
        Self {
            reference: AltitudeReference::FlightLevel,
            amsl: AtomicF64::new(AtmosphericPressure::default().flight_level_to_altitude(flight_level)),
            flight_level,
            above_terrain: 0.0,
        }
    }

    /// Resolved AMSL value from the cache.
    pub fn amsl(&self) -> f64 {
        self.amsl.get()
    }

    /// AMSL value against a concrete aircraft state. AGL boundaries prefer
    /// the terrain height implied by the aircraft's own ground clearance.
    pub fn amsl_for(&self, state: &AircraftState) -> f64 {
        match self.reference {
            AltitudeReference::Agl => self.above_terrain + (state.altitude - state.altitude_agl),
            _ => self.amsl.get(),
        }
    }

    /// Cache the AMSL value for an AGL boundary given terrain height at the
    /// airspace. No effect on other references.
    pub fn resolve_ground_level(&self, terrain_altitude: f64) {
        if self.reference == AltitudeReference::Agl {
            self.amsl.set(self.above_terrain + terrain_altitude);
        }
    }

    /// Cache the AMSL value for a flight-level boundary under the given QNH.
    /// No effect on other references.
    pub fn resolve_flight_level(&self, pressure: &AtmosphericPressure) {
        if self.reference == AltitudeReference::FlightLevel {
            self.amsl
                .set(pressure.flight_level_to_altitude(self.flight_level));
        }
    }

    /// Whether this boundary rests on the surface.
    pub fn is_terrain(&self) -> bool {
        self.reference == AltitudeReference::Agl && self.above_terrain <= 0.0
    }
}

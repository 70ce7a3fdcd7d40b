//! Real-time airspace spatial index and predictive intrusion-warning engine
//! for a glide computer.
//!
//! The index holds shared airspace handles in a bounding-box tree over a
//! flat-earth projection; the warning manager runs four prediction passes
//! per tick and maintains a severity-sorted warning list with
//! acknowledgement timers. `SharedAirspaceEngine` wraps both behind one
//! mutex with a scoped read lease for the UI thread.
//!
//! No logging subscriber is installed here; embedders install their own.

pub mod activity;
pub mod aircraft;
pub mod airspace;
pub mod altitude;
pub mod engine;
pub mod error;
pub mod filter;
pub mod geo;
pub mod index;
pub mod manager;
pub mod performance;
pub mod projection;
pub mod solver;
pub mod sort;
pub mod warning;

pub use activity::AirspaceActivity;
pub use aircraft::AircraftState;
pub use airspace::{Airspace, AirspaceClass, AirspaceGeometry, AirspaceRef};
pub use altitude::{AirspaceAltitude, AltitudeReference, AtmosphericPressure};
pub use engine::{AirspaceEdit, AirspaceEngine, AirspaceLease, EngineSerials, SharedAirspaceEngine};
pub use error::AirspaceError;
pub use filter::AircraftStateFilter;
pub use geo::GeoPoint;
pub use index::AirspaceIndex;
pub use manager::{AirspaceWarningConfig, AirspaceWarningManager};
pub use performance::{AircraftPerformance, GlidePolar, InterceptSolution, TaskSolution};
pub use projection::{FlatBoundingBox, FlatGeoPoint, FlatProjection};
pub use sort::{AirspaceNearestSort, AirspaceSoonestSort};
pub use warning::{AirspaceWarning, WarningState};

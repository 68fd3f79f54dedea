//! # odsutils
//!
//! Engine for Observation Data Set (ODS) record collections.
//!
//! An ODS file advertises upcoming radio observations so that co-located
//! instruments can coordinate around them. This crate provides the full
//! lifecycle for such collections: a versioned schema registry, a record
//! store with validation and derived aggregates, reconciliation algorithms
//! over time windows, and an engine facade that ties named stores together
//! behind one mutation and query API.
//!
//! ## Architecture
//!
//! - [`standard`]: versioned field schemas and record validation
//! - [`record`]: the dynamic record value model and JSON conversion
//! - [`instance`]: one named record store with derived aggregates
//! - [`check`]: sorting, deduplication, continuity, coverage, visibility
//!   windows
//! - [`visibility`]: the elevation-model collaborator seam
//! - [`engine`]: the [`Ods`](engine::Ods) facade over named stores
//! - [`tools`]: time parsing, file I/O, and remote fetch at the boundary
//! - [`config`]: monitor settings
//!
//! All I/O happens at the boundary: the algorithm layers operate on decoded
//! records and return values, never touching files or the network.

pub mod check;
pub mod config;
pub mod engine;
pub mod error;
pub mod instance;
pub mod record;
pub mod standard;
pub mod tools;
pub mod visibility;

pub use check::{ContinuityAdjust, ContinuityReport, CoverageReport, ObservationWindow};
pub use config::MonitorConfig;
pub use engine::{CullMode, DefaultsSource, Ods};
pub use error::{OdsError, OdsResult};
pub use instance::{OdsInstance, TimeFormat};
pub use record::{OdsRecord, Value};
pub use standard::{FieldType, Standard, LATEST};
pub use tools::{HttpFetch, RemoteFetch};
pub use visibility::{ElevationModel, EquatorialCoord, HourAngleModel, SiteLocation};

//! Elevation computation seam for observation-window checks.
//!
//! The record-set engine never computes coordinates itself; it asks an
//! [`ElevationModel`] for the elevation of a target above the horizon at a
//! sample time. [`HourAngleModel`] is the built-in implementation, a plain
//! spherical-trig transform adequate for window screening. Callers with a
//! full ephemerides stack can supply their own model.

use chrono::{DateTime, Utc};

use crate::error::OdsResult;

/// Observer location on Earth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteLocation {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub height_m: f64,
}

/// J2000 equatorial coordinates of a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquatorialCoord {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

/// Coordinate-transform collaborator: elevation of a target above the
/// horizon for a site at an instant.
pub trait ElevationModel {
    fn elevation_deg(
        &self,
        site: &SiteLocation,
        target: &EquatorialCoord,
        at: DateTime<Utc>,
    ) -> OdsResult<f64>;
}

/// Hour-angle elevation model.
///
/// Uses Greenwich mean sidereal time from the linearized IAU expression and
/// the standard altitude relation
/// `sin(alt) = sin(dec) sin(lat) + cos(dec) cos(lat) cos(ha)`.
/// Refraction and observer height are neglected; accuracy is a fraction of
/// a degree, which is sufficient for screening against an elevation limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct HourAngleModel;

impl HourAngleModel {
    /// Greenwich mean sidereal time in degrees at `at`.
    fn gmst_deg(at: DateTime<Utc>) -> f64 {
        let unix = at.timestamp() as f64 + f64::from(at.timestamp_subsec_millis()) / 1e3;
        let jd = unix / 86400.0 + 2440587.5;
        let days_since_j2000 = jd - 2451545.0;
        (280.46061837 + 360.98564736629 * days_since_j2000).rem_euclid(360.0)
    }
}

impl ElevationModel for HourAngleModel {
    fn elevation_deg(
        &self,
        site: &SiteLocation,
        target: &EquatorialCoord,
        at: DateTime<Utc>,
    ) -> OdsResult<f64> {
        let lst_deg = Self::gmst_deg(at) + site.lon_deg;
        let ha = (lst_deg - target.ra_deg).to_radians();
        let lat = site.lat_deg.to_radians();
        let dec = target.dec_deg.to_radians();
        let sin_alt = dec.sin() * lat.sin() + dec.cos() * lat.cos() * ha.cos();
        Ok(sin_alt.clamp(-1.0, 1.0).asin().to_degrees())
    }
}

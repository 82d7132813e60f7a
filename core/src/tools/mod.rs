//! Per-tool descriptors plugged into the shared generate/ingest/extract pipeline.

pub mod earthquake;
pub mod gpr;
pub mod gravity;
pub mod remote_sensing;
pub mod resistivity;
pub mod seismic;
pub mod spatial;

pub use earthquake::{Earthquake, EarthquakeFilter, EarthquakeParams, MagnitudeClass, QuakePoint};
pub use gpr::{Gpr, GprParams};
pub use gravity::{Gravity, GravityParams, GravityStation};
pub use remote_sensing::{LandCover, RemoteSensing, RemoteSensingParams, SpectralPoint};
pub use resistivity::{Resistivity, ResistivityParams};
pub use seismic::{Seismic, SeismicParams, SeismicPoint, TraceSection};
pub use spatial::SpatialPoint;

/// Clamps to `min`; non-finite input falls back to `min`.
pub(crate) fn at_least(value: f64, min: f64) -> f64 {
    if value.is_finite() {
        value.max(min)
    } else {
        min
    }
}

/// Clamps into `[min, max]`; non-finite input falls back to `min`.
pub(crate) fn within(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}

/// Clamps into `[0, 1]`; non-finite input falls back to the midpoint.
pub(crate) fn unit_fraction(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Arithmetic mean of latitude/longitude pairs.
pub(crate) fn centroid<I: IntoIterator<Item = (f64, f64)>>(coords: I) -> Option<(f64, f64)> {
    let (count, lat, lon) = coords
        .into_iter()
        .fold((0usize, 0.0, 0.0), |(n, la, lo), (lat, lon)| (n + 1, la + lat, lo + lon));
    if count == 0 {
        return None;
    }
    Some((lat / count as f64, lon / count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_replaces_nan_and_small_values() {
        assert_eq!(at_least(f64::NAN, 0.1), 0.1);
        assert_eq!(at_least(0.01, 0.1), 0.1);
        assert_eq!(at_least(2.0, 0.1), 2.0);
    }

    #[test]
    fn within_caps_both_ends() {
        assert_eq!(within(1e308, 0.01, 90.0), 90.0);
        assert_eq!(within(-4.0, 0.01, 90.0), 0.01);
        assert_eq!(within(f64::NEG_INFINITY, 0.01, 90.0), 0.01);
        assert_eq!(within(12.5, 0.01, 90.0), 12.5);
    }

    #[test]
    fn unit_fraction_clamps() {
        assert_eq!(unit_fraction(1.4), 1.0);
        assert_eq!(unit_fraction(-0.2), 0.0);
        assert_eq!(unit_fraction(f64::INFINITY), 0.5);
    }

    #[test]
    fn centroid_of_nothing_is_none() {
        assert_eq!(centroid(Vec::new()), None);
        assert_eq!(centroid(vec![(0.0, 10.0), (2.0, 20.0)]), Some((1.0, 15.0)));
    }
}

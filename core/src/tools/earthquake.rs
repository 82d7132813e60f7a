use crate::analysis::prompt::{background, rule_phrase, CLOSING};
use crate::ingest::table::{parse_table, write_table, HeaderSpec};
use crate::math::{haversine_km, StatsHelper};
use crate::model::DataSet;
use crate::prelude::{
    Observation, SurveyError, SurveyParameters, SurveyResult, SurveyTool, ThresholdRule, ToolKind,
    UploadKind,
};
use crate::tools::{centroid, within};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

const HEADER: &[&str] = &["latitude", "longitude", "magnitude", "depth", "hours_ago"];

pub const MAX_MAGNITUDE: f64 = 10.0;
/// Deepest recorded hypocentres sit near 700 km.
pub const MAX_DEPTH_KM: f64 = 700.0;
pub const MAX_SPREAD_DEGREES: f64 = 90.0;
pub const MAX_WINDOW_DAYS: f64 = 3650.0;

/// Synthetic seismicity catalogue around one epicentral region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarthquakeParams {
    pub points: usize,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    /// Kilometres.
    pub min_depth: f64,
    pub max_depth: f64,
    pub spread_degrees: f64,
    pub window_days: f64,
}

impl Default for EarthquakeParams {
    fn default() -> Self {
        Self {
            points: 20,
            min_magnitude: 2.0,
            max_magnitude: 6.0,
            min_depth: 5.0,
            max_depth: 100.0,
            spread_degrees: 2.0,
            window_days: 30.0,
        }
    }
}

impl SurveyParameters for EarthquakeParams {
    fn normalized(&self) -> Self {
        let min_magnitude = within(self.min_magnitude, 0.0, MAX_MAGNITUDE);
        let min_depth = within(self.min_depth, 0.0, MAX_DEPTH_KM);
        Self {
            points: self.points.max(1),
            min_magnitude,
            max_magnitude: within(self.max_magnitude, min_magnitude, MAX_MAGNITUDE),
            min_depth,
            max_depth: within(self.max_depth, min_depth, MAX_DEPTH_KM),
            spread_degrees: within(self.spread_degrees, 0.01, MAX_SPREAD_DEGREES),
            window_days: within(self.window_days, 1.0, MAX_WINDOW_DAYS),
        }
    }

    fn expected_points(&self) -> usize {
        self.normalized().points
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeClass {
    Micro,
    Minor,
    Light,
    Moderate,
    Strong,
    Major,
    Great,
}

impl MagnitudeClass {
    pub fn from_magnitude(magnitude: f64) -> Self {
        match magnitude {
            m if m < 2.0 => MagnitudeClass::Micro,
            m if m < 4.0 => MagnitudeClass::Minor,
            m if m < 5.0 => MagnitudeClass::Light,
            m if m < 6.0 => MagnitudeClass::Moderate,
            m if m < 7.0 => MagnitudeClass::Strong,
            m if m < 8.0 => MagnitudeClass::Major,
            _ => MagnitudeClass::Great,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MagnitudeClass::Micro => "micro",
            MagnitudeClass::Minor => "minor",
            MagnitudeClass::Light => "light",
            MagnitudeClass::Moderate => "moderate",
            MagnitudeClass::Strong => "strong",
            MagnitudeClass::Major => "major",
            MagnitudeClass::Great => "great",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuakePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    /// Hypocentre depth, km.
    pub depth: f64,
    pub hours_ago: f64,
    pub class: MagnitudeClass,
}

impl QuakePoint {
    pub fn new(latitude: f64, longitude: f64, magnitude: f64, depth: f64, hours_ago: f64) -> Self {
        Self {
            latitude,
            longitude,
            magnitude,
            depth,
            hours_ago,
            class: MagnitudeClass::from_magnitude(magnitude),
        }
    }
}

impl Observation for QuakePoint {
    fn value(&self) -> f64 {
        self.magnitude
    }

    fn placement(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }
}

/// Catalogue query; every bound is inclusive and `None` means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarthquakeFilter {
    pub min_magnitude: Option<f64>,
    pub max_magnitude: Option<f64>,
    pub min_depth: Option<f64>,
    pub max_depth: Option<f64>,
    /// Only events from the last N hours.
    pub within_hours: Option<f64>,
}

impl EarthquakeFilter {
    pub fn matches(&self, quake: &QuakePoint) -> bool {
        let above = |bound: Option<f64>, v: f64| bound.map_or(true, |b| v >= b);
        let below = |bound: Option<f64>, v: f64| bound.map_or(true, |b| v <= b);
        above(self.min_magnitude, quake.magnitude)
            && below(self.max_magnitude, quake.magnitude)
            && above(self.min_depth, quake.depth)
            && below(self.max_depth, quake.depth)
            && below(self.within_hours, quake.hours_ago)
    }

    pub fn apply(&self, data: &DataSet<QuakePoint>) -> DataSet<QuakePoint> {
        data.iter().filter(|q| self.matches(q)).copied().collect()
    }
}

pub struct Earthquake;

impl SurveyTool for Earthquake {
    type Params = EarthquakeParams;
    type Point = QuakePoint;

    const KIND: ToolKind = ToolKind::Earthquake;
    const RULE: ThresholdRule = ThresholdRule::Upper { fraction: 0.10 };
    const AXES: (&'static str, &'static str) = ("longitude", "latitude");

    fn generate<R: Rng + ?Sized>(params: &Self::Params, rng: &mut R) -> DataSet<Self::Point> {
        let params = params.normalized();
        let spread = params.spread_degrees;
        let centre_lat = rng.gen_range(-60.0..60.0);
        let centre_lon = rng.gen_range(-180.0..180.0);
        let window_hours = 24.0 * params.window_days;
        debug!(
            "earthquake catalogue of {} events around ({:.3}, {:.3})",
            params.points, centre_lat, centre_lon
        );

        (0..params.points)
            .map(|_| {
                QuakePoint::new(
                    centre_lat + rng.gen_range(-spread..=spread),
                    centre_lon + rng.gen_range(-spread..=spread),
                    rng.gen_range(params.min_magnitude..=params.max_magnitude),
                    rng.gen_range(params.min_depth..=params.max_depth),
                    rng.gen_range(0.0..window_hours),
                )
            })
            .collect()
    }

    fn ingest(content: &str, kind: UploadKind) -> SurveyResult<DataSet<Self::Point>> {
        if kind != UploadKind::Survey {
            return Err(SurveyError::UnsupportedUpload {
                tool: Self::KIND,
                kind,
            });
        }
        let table = parse_table(content, HeaderSpec::Named(HEADER))?;
        Ok(table
            .rows
            .iter()
            .map(|row| {
                let v = &row.values;
                QuakePoint::new(v[0], v[1], v[2], v[3], v[4])
            })
            .collect())
    }

    fn export(data: &DataSet<Self::Point>, kind: UploadKind) -> SurveyResult<String> {
        if kind != UploadKind::Survey {
            return Err(SurveyError::UnsupportedUpload {
                tool: Self::KIND,
                kind,
            });
        }
        Ok(write_table(
            HEADER,
            data.iter()
                .map(|q| vec![q.latitude, q.longitude, q.magnitude, q.depth, q.hours_ago]),
        ))
    }

    fn prompt(data: &DataSet<Self::Point>) -> SurveyResult<String> {
        let stats = Self::statistics(data)?;
        let anomaly = stats.require_anomaly()?;
        let (lat, lon) = centroid(data.iter().map(|q| (q.latitude, q.longitude)))
            .ok_or(SurveyError::EmptyDataset)?;
        let strongest: Vec<&QuakePoint> = data
            .iter()
            .filter(|q| stats.band.selects(q.magnitude))
            .collect();
        let (strong_lat, strong_lon) = centroid(strongest.iter().map(|q| (q.latitude, q.longitude)))
            .ok_or(SurveyError::NoClearAnomaly)?;
        let depths: Vec<f64> = data.iter().map(|q| q.depth).collect();
        let depth_range = StatsHelper::min_max(&depths).unwrap_or((0.0, 0.0));
        let strongest_depth =
            strongest.iter().map(|q| q.depth).sum::<f64>() / strongest.len() as f64;

        Ok(format!(
            "Earthquake catalogue of {} events centred near {:.3}, {:.3}. Magnitudes range \
             from {:.1} to {:.1} (mean {:.2}) and depths from {:.1} to {:.1} km. The strongest \
             events ({}, {} events) average magnitude {:.2} {} at a mean depth of {:.1} km, \
             clustered {:.2} km from the catalogue centroid. {}",
            stats.count,
            lat,
            lon,
            stats.min,
            stats.max,
            stats.mean,
            depth_range.0,
            depth_range.1,
            rule_phrase(Self::RULE),
            anomaly.count,
            anomaly.mean,
            background(stats.background_mean, 2, ""),
            strongest_depth,
            haversine_km(lat, lon, strong_lat, strong_lon),
            CLOSING
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn twenty_events_stay_in_range() {
        let params = EarthquakeParams {
            points: 20,
            min_magnitude: 2.0,
            max_magnitude: 6.0,
            min_depth: 5.0,
            max_depth: 100.0,
            ..Default::default()
        };
        let data = Earthquake::generate(&params, &mut StdRng::seed_from_u64(20));
        assert_eq!(data.len(), 20);
        for q in data.iter() {
            assert!((2.0..=6.0).contains(&q.magnitude));
            assert!((5.0..=100.0).contains(&q.depth));
            assert!((0.0..24.0 * 30.0).contains(&q.hours_ago));
        }
    }

    #[test]
    fn inverted_bounds_collapse_to_the_minimum() {
        let params = EarthquakeParams {
            min_magnitude: 5.0,
            max_magnitude: 3.0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(params.max_magnitude, 5.0);
        let data = Earthquake::generate(&params, &mut StdRng::seed_from_u64(1));
        assert!(data.iter().all(|q| q.magnitude == 5.0));
    }

    #[test]
    fn huge_ranges_are_capped_before_generation() {
        let params = EarthquakeParams {
            spread_degrees: 1e308,
            max_magnitude: 1e308,
            max_depth: f64::MAX,
            window_days: 1e308,
            ..Default::default()
        };
        let normalized = params.normalized();
        assert_eq!(normalized.spread_degrees, MAX_SPREAD_DEGREES);
        assert_eq!(normalized.max_magnitude, MAX_MAGNITUDE);
        assert_eq!(normalized.max_depth, MAX_DEPTH_KM);
        assert_eq!(normalized.window_days, MAX_WINDOW_DAYS);

        let data = Earthquake::generate(&params, &mut StdRng::seed_from_u64(8));
        assert_eq!(data.len(), 20);
        assert!(data
            .iter()
            .all(|q| q.latitude.is_finite() && q.magnitude <= MAX_MAGNITUDE && q.depth <= MAX_DEPTH_KM));
    }

    #[test]
    fn magnitude_classes() {
        assert_eq!(MagnitudeClass::from_magnitude(1.9), MagnitudeClass::Micro);
        assert_eq!(MagnitudeClass::from_magnitude(4.0), MagnitudeClass::Light);
        assert_eq!(MagnitudeClass::from_magnitude(6.5), MagnitudeClass::Strong);
        assert_eq!(MagnitudeClass::from_magnitude(9.1), MagnitudeClass::Great);
    }

    #[test]
    fn filter_applies_every_bound() {
        let data: DataSet<QuakePoint> = vec![
            QuakePoint::new(0.0, 0.0, 2.5, 10.0, 5.0),
            QuakePoint::new(0.0, 0.0, 4.5, 40.0, 30.0),
            QuakePoint::new(0.0, 0.0, 5.5, 80.0, 2.0),
        ]
        .into_iter()
        .collect();
        let filter = EarthquakeFilter {
            min_magnitude: Some(3.0),
            max_depth: Some(90.0),
            within_hours: Some(24.0),
            ..Default::default()
        };
        let kept = filter.apply(&data);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.points()[0].magnitude, 5.5);
        assert_eq!(EarthquakeFilter::default().apply(&data), data);
    }

    #[test]
    fn exported_catalogue_ingests_back_unchanged() {
        let data = Earthquake::generate(&EarthquakeParams::default(), &mut StdRng::seed_from_u64(9));
        let csv = Earthquake::export(&data, UploadKind::Survey).unwrap();
        assert!(csv.starts_with("latitude,longitude,magnitude,depth,hours_ago\n"));
        assert_eq!(Earthquake::ingest(&csv, UploadKind::Survey).unwrap(), data);
    }

    #[test]
    fn prompt_describes_the_strongest_events() {
        let data = Earthquake::generate(&EarthquakeParams::default(), &mut StdRng::seed_from_u64(9));
        let prompt = Earthquake::prompt(&data).unwrap();
        assert!(prompt.starts_with("Earthquake catalogue of 20 events"));
        assert!(prompt.contains("top 10% of values"));
        assert!(prompt.contains("km from the catalogue centroid"));
    }
}

use crate::analysis::prompt::{background, rule_phrase, span, CLOSING};
use crate::ingest::table::{parse_table, write_table, HeaderSpec};
use crate::math::stats::StatsHelper;
use crate::model::DataSet;
use crate::prelude::{
    Observation, SurveyError, SurveyParameters, SurveyResult, SurveyTool, ThresholdRule, ToolKind,
    UploadKind,
};
use crate::tools::{at_least, unit_fraction, within};
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Reference gravity (mGal) subtracted before the free-air step.
pub const NORMAL_GRAVITY_MGAL: f64 = 978_032.677_15;
/// mGal per metre of elevation.
pub const FREE_AIR_GRADIENT: f64 = 0.3086;
/// mGal per metre per g/cm³ of an infinite Bouguer slab.
pub const BOUGUER_FACTOR: f64 = 0.04193;
/// kg/m³
pub const CRUST_DENSITY: f64 = 2670.0;
/// mGal per metre of departure from the line's mean elevation.
pub const TERRAIN_FACTOR: f64 = 0.002;

const HEADER: &[&str] = &["station_position", "elevation", "observed_gravity_value"];

/// Gravity line with one planted Gaussian anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityParams {
    pub station_count: usize,
    /// Metres between stations.
    pub station_spacing: f64,
    /// Anomaly centre as a fraction of the line length.
    pub anomaly_center: f64,
    /// Peak of the planted anomaly in mGal.
    pub anomaly_amplitude: f64,
    /// Gaussian standard deviation in metres.
    pub anomaly_width: f64,
    pub base_elevation: f64,
    pub elevation_relief: f64,
    /// Standard deviation of reading noise in mGal.
    pub noise: f64,
}

impl Default for GravityParams {
    fn default() -> Self {
        Self {
            station_count: 50,
            station_spacing: 20.0,
            anomaly_center: 0.5,
            anomaly_amplitude: 5.0,
            anomaly_width: 100.0,
            base_elevation: 250.0,
            elevation_relief: 15.0,
            noise: 0.05,
        }
    }
}

impl SurveyParameters for GravityParams {
    fn normalized(&self) -> Self {
        Self {
            station_count: self.station_count.max(3),
            station_spacing: within(self.station_spacing, 0.1, 10_000.0),
            anomaly_center: unit_fraction(self.anomaly_center),
            anomaly_amplitude: at_least(self.anomaly_amplitude, 0.0),
            anomaly_width: at_least(self.anomaly_width, 0.1),
            base_elevation: within(self.base_elevation, 0.0, 9_000.0),
            elevation_relief: within(self.elevation_relief, 0.0, 2_000.0),
            noise: at_least(self.noise, 0.0),
        }
    }

    fn expected_points(&self) -> usize {
        self.normalized().station_count
    }
}

/// One gravity reading with its chained corrections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GravityStation {
    pub position: f64,
    pub elevation: f64,
    pub observed: f64,
    pub free_air_anomaly: f64,
    pub bouguer_anomaly: f64,
    /// Bouguer anomaly after terrain correction.
    pub complete_anomaly: f64,
}

impl GravityStation {
    pub fn reading(position: f64, elevation: f64, observed: f64) -> Self {
        Self {
            position,
            elevation,
            observed,
            free_air_anomaly: 0.0,
            bouguer_anomaly: 0.0,
            complete_anomaly: 0.0,
        }
    }
}

impl Observation for GravityStation {
    fn value(&self) -> f64 {
        self.complete_anomaly
    }

    fn placement(&self) -> (f64, f64) {
        (self.position, self.elevation)
    }
}

fn bouguer_slab(elevation: f64) -> f64 {
    BOUGUER_FACTOR * (CRUST_DENSITY / 1000.0) * elevation
}

fn terrain_correction(elevation: f64, mean_elevation: f64) -> f64 {
    TERRAIN_FACTOR * (elevation - mean_elevation).abs()
}

/// Recomputes free-air, Bouguer and terrain-corrected anomalies in place.
pub fn apply_corrections(stations: &mut [GravityStation]) {
    let elevations: Vec<f64> = stations.iter().map(|s| s.elevation).collect();
    let mean_elevation = StatsHelper::mean(&elevations).unwrap_or(0.0);
    for station in stations.iter_mut() {
        station.free_air_anomaly =
            station.observed - NORMAL_GRAVITY_MGAL + FREE_AIR_GRADIENT * station.elevation;
        station.bouguer_anomaly = station.free_air_anomaly - bouguer_slab(station.elevation);
        station.complete_anomaly =
            station.bouguer_anomaly + terrain_correction(station.elevation, mean_elevation);
    }
}

pub struct Gravity;

impl SurveyTool for Gravity {
    type Params = GravityParams;
    type Point = GravityStation;

    const KIND: ToolKind = ToolKind::Gravity;
    const RULE: ThresholdRule = ThresholdRule::Upper { fraction: 0.15 };
    const AXES: (&'static str, &'static str) = ("station position (m)", "elevation (m)");

    fn generate<R: Rng + ?Sized>(params: &Self::Params, rng: &mut R) -> DataSet<Self::Point> {
        let params = params.normalized();
        let count = params.station_count;
        let length = (count - 1) as f64 * params.station_spacing;
        let centre = params.anomaly_center * length;
        let noise = Normal::new(0.0, params.noise).ok();
        debug!("gravity line {} stations over {:.1} m", count, length);

        let elevations: Vec<f64> = (0..count)
            .map(|_| {
                params.base_elevation
                    + rng.gen_range(-params.elevation_relief..=params.elevation_relief)
            })
            .collect();
        let mean_elevation = StatsHelper::mean(&elevations).unwrap_or(params.base_elevation);

        let mut stations: Vec<GravityStation> = elevations
            .iter()
            .enumerate()
            .map(|(idx, &elevation)| {
                let position = idx as f64 * params.station_spacing;
                let bump = params.anomaly_amplitude
                    * (-(position - centre).powi(2) / (2.0 * params.anomaly_width.powi(2))).exp();
                let jitter = noise.as_ref().map_or(0.0, |n| n.sample(rng));
                let observed = NORMAL_GRAVITY_MGAL + bump + jitter
                    - FREE_AIR_GRADIENT * elevation
                    + bouguer_slab(elevation)
                    - terrain_correction(elevation, mean_elevation);
                GravityStation::reading(position, elevation, observed)
            })
            .collect();

        apply_corrections(&mut stations);
        DataSet::new(stations)
    }

    fn ingest(content: &str, kind: UploadKind) -> SurveyResult<DataSet<Self::Point>> {
        if kind != UploadKind::Survey {
            return Err(SurveyError::UnsupportedUpload {
                tool: Self::KIND,
                kind,
            });
        }
        let table = parse_table(content, HeaderSpec::Named(HEADER))?;
        let mut stations: Vec<GravityStation> = table
            .rows
            .into_iter()
            .map(|row| GravityStation::reading(row.values[0], row.values[1], row.values[2]))
            .collect();
        apply_corrections(&mut stations);
        Ok(DataSet::new(stations))
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
            data.iter().map(|s| vec![s.position, s.elevation, s.observed]),
        ))
    }

    fn prompt(data: &DataSet<Self::Point>) -> SurveyResult<String> {
        let stats = Self::statistics(data)?;
        let anomaly = stats.require_anomaly()?;
        Ok(format!(
            "Gravity survey with {} stations. After free-air, Bouguer (density {:.0} kg/m3) \
             and terrain corrections the complete Bouguer anomaly ranges from {:.3} to {:.3} mGal \
             with a mean of {:.3} mGal. The strongest positive anomaly ({}, {} stations) lies \
             between {} along the line at elevations of {}, averaging {:.3} mGal {}. {}",
            stats.count,
            CRUST_DENSITY,
            stats.min,
            stats.max,
            stats.mean,
            rule_phrase(Self::RULE),
            anomaly.count,
            span(anomaly.horizontal, 1, "m"),
            span(anomaly.vertical, 1, "m"),
            anomaly.mean,
            background(stats.background_mean, 3, "mGal"),
            CLOSING
        ))
    }
}

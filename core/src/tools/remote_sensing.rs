use crate::analysis::prompt::{background, rule_phrase, CLOSING};
use crate::ingest::table::{parse_table, write_table, HeaderSpec};
use crate::math::haversine_km;
use crate::model::DataSet;
use crate::prelude::{
    Observation, SurveyError, SurveyParameters, SurveyResult, SurveyTool, ThresholdRule, ToolKind,
    UploadKind,
};
use crate::tools::{centroid, within};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

const HEADER: &[&str] = &["latitude", "longitude", "band1", "band2", "band3", "value"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSensingParams {
    pub point_count: usize,
    /// Half-width of the scatter around the scene centre, degrees.
    pub spread_degrees: f64,
}

impl Default for RemoteSensingParams {
    fn default() -> Self {
        Self {
            point_count: 200,
            spread_degrees: 0.5,
        }
    }
}

impl SurveyParameters for RemoteSensingParams {
    fn normalized(&self) -> Self {
        Self {
            point_count: self.point_count.max(1),
            spread_degrees: within(self.spread_degrees, 0.01, 90.0),
        }
    }

    fn expected_points(&self) -> usize {
        self.normalized().point_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandCover {
    Water,
    BareSoil,
    SparseVegetation,
    DenseVegetation,
}

impl LandCover {
    pub fn from_ndvi(ndvi: f64) -> Self {
        if ndvi < 0.0 {
            LandCover::Water
        } else if ndvi < 0.2 {
            LandCover::BareSoil
        } else if ndvi < 0.5 {
            LandCover::SparseVegetation
        } else {
            LandCover::DenseVegetation
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LandCover::Water => "water",
            LandCover::BareSoil => "bare soil",
            LandCover::SparseVegetation => "sparse vegetation",
            LandCover::DenseVegetation => "dense vegetation",
        }
    }
}

/// `(nir - red) / (nir + red)`, zero when both bands are dark.
pub fn ndvi(red: f64, nir: f64) -> f64 {
    let total = nir + red;
    if total == 0.0 {
        0.0
    } else {
        (nir - red) / total
    }
}

/// One pixel: three reflectance bands (band2 red, band3 near-infrared) and its NDVI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub band1: f64,
    pub band2: f64,
    pub band3: f64,
    pub ndvi: f64,
    pub cover: LandCover,
}

impl SpectralPoint {
    pub fn new(latitude: f64, longitude: f64, bands: [f64; 3], ndvi: f64) -> Self {
        Self {
            latitude,
            longitude,
            band1: bands[0],
            band2: bands[1],
            band3: bands[2],
            ndvi,
            cover: LandCover::from_ndvi(ndvi),
        }
    }
}

impl Observation for SpectralPoint {
    fn value(&self) -> f64 {
        self.ndvi
    }

    fn placement(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }
}

pub struct RemoteSensing;

impl SurveyTool for RemoteSensing {
    type Params = RemoteSensingParams;
    type Point = SpectralPoint;

    const KIND: ToolKind = ToolKind::RemoteSensing;
    const RULE: ThresholdRule = ThresholdRule::Symmetric { fraction: 0.30 };
    const AXES: (&'static str, &'static str) = ("longitude", "latitude");

    fn generate<R: Rng + ?Sized>(params: &Self::Params, rng: &mut R) -> DataSet<Self::Point> {
        let params = params.normalized();
        let spread = params.spread_degrees;
        let centre_lat = rng.gen_range(-60.0..60.0);
        let centre_lon = rng.gen_range(-180.0..180.0);
        debug!(
            "remote sensing scene of {} pixels around ({:.3}, {:.3})",
            params.point_count, centre_lat, centre_lon
        );

        (0..params.point_count)
            .map(|_| {
                let latitude = centre_lat + rng.gen_range(-spread..=spread);
                let longitude = centre_lon + rng.gen_range(-spread..=spread);
                let bands = [
                    rng.gen_range(0.0..0.3),
                    rng.gen_range(0.02..0.4),
                    rng.gen_range(0.05..0.6),
                ];
                SpectralPoint::new(latitude, longitude, bands, ndvi(bands[1], bands[2]))
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
                SpectralPoint::new(v[0], v[1], [v[2], v[3], v[4]], v[5])
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
            data.iter().map(|p| {
                vec![p.latitude, p.longitude, p.band1, p.band2, p.band3, p.ndvi]
            }),
        ))
    }

    fn prompt(data: &DataSet<Self::Point>) -> SurveyResult<String> {
        let stats = Self::statistics(data)?;
        let anomaly = stats.require_anomaly()?;
        let (scene_lat, scene_lon) = centroid(data.iter().map(|p| (p.latitude, p.longitude)))
            .ok_or(SurveyError::EmptyDataset)?;
        let selected = || data.iter().filter(|p| stats.band.selects(p.ndvi));
        let (anomaly_lat, anomaly_lon) = centroid(selected().map(|p| (p.latitude, p.longitude)))
            .ok_or(SurveyError::NoClearAnomaly)?;
        let offset = haversine_km(scene_lat, scene_lon, anomaly_lat, anomaly_lon);
        let high = selected().filter(|p| p.ndvi > stats.band.upper).count();
        let low = anomaly.count - high;

        let covers = [
            LandCover::DenseVegetation,
            LandCover::SparseVegetation,
            LandCover::BareSoil,
            LandCover::Water,
        ]
        .iter()
        .filter_map(|cover| {
            let n = data.iter().filter(|p| p.cover == *cover).count();
            (n > 0).then(|| format!("{} {}", n, cover.label()))
        })
        .collect::<Vec<_>>()
        .join(", ");

        Ok(format!(
            "Multispectral remote sensing scene with {} pixels centred near {:.3}, {:.3}. \
             NDVI ranges from {:.3} to {:.3} with a mean of {:.3}; land cover: {}. \
             The NDVI extremes ({}, {} pixels: {} high, {} low) span latitudes {:.3} to {:.3} \
             and longitudes {:.3} to {:.3}, averaging {:.3} {}. Their centroid lies {:.2} km \
             from the scene centroid. {}",
            stats.count,
            scene_lat,
            scene_lon,
            stats.min,
            stats.max,
            stats.mean,
            covers,
            rule_phrase(Self::RULE),
            anomaly.count,
            high,
            low,
            anomaly.vertical.0,
            anomaly.vertical.1,
            anomaly.horizontal.0,
            anomaly.horizontal.1,
            anomaly.mean,
            background(stats.background_mean, 3, ""),
            offset,
            CLOSING
        ))
    }
}

use crate::analysis::prompt::{background, rule_phrase, span, CLOSING};
use crate::model::DataSet;
use crate::prelude::{
    SurveyError, SurveyParameters, SurveyResult, SurveyTool, ThresholdRule, ToolKind, UploadKind,
};
use crate::tools::at_least;
use crate::tools::spatial::{export_spatial, ingest_spatial, planted_grid, GridSpec, SpatialPoint};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Electrode line of an electrical resistivity tomography survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResistivityParams {
    pub electrode_count: usize,
    /// Metres between neighbouring electrodes.
    pub electrode_spacing: f64,
    pub depth_levels: usize,
    /// Ohm-metres.
    pub background_resistivity: f64,
}

impl Default for ResistivityParams {
    fn default() -> Self {
        Self {
            electrode_count: 24,
            electrode_spacing: 2.0,
            depth_levels: 8,
            background_resistivity: 100.0,
        }
    }
}

impl SurveyParameters for ResistivityParams {
    fn normalized(&self) -> Self {
        Self {
            electrode_count: self.electrode_count.max(4),
            electrode_spacing: at_least(self.electrode_spacing, 0.1),
            depth_levels: self.depth_levels.max(2),
            background_resistivity: at_least(self.background_resistivity, 1.0),
        }
    }

    fn expected_points(&self) -> usize {
        let params = self.normalized();
        params.electrode_count * params.depth_levels
    }
}

impl ResistivityParams {
    fn grid(&self) -> GridSpec {
        GridSpec {
            columns: self.electrode_count,
            rows: self.depth_levels,
            column_step: self.electrode_spacing,
            row_step: self.electrode_spacing / 2.0,
        }
    }
}

pub struct Resistivity;

const HEADER: [&str; 3] = ["position", "depth", "resistivity"];

impl SurveyTool for Resistivity {
    type Params = ResistivityParams;
    type Point = SpatialPoint;

    const KIND: ToolKind = ToolKind::Resistivity;
    const RULE: ThresholdRule = ThresholdRule::Upper { fraction: 0.10 };
    const AXES: (&'static str, &'static str) = ("position (m)", "pseudo-depth (m)");

    fn generate<R: Rng + ?Sized>(params: &Self::Params, rng: &mut R) -> DataSet<Self::Point> {
        let params = params.normalized();
        debug!(
            "resistivity grid {} electrodes x {} levels",
            params.electrode_count, params.depth_levels
        );
        planted_grid(params.grid(), params.background_resistivity, rng)
    }

    fn ingest(content: &str, kind: UploadKind) -> SurveyResult<DataSet<Self::Point>> {
        match kind {
            UploadKind::Survey => ingest_spatial(content),
            UploadKind::Model => Err(SurveyError::UnsupportedUpload {
                tool: Self::KIND,
                kind,
            }),
        }
    }

    fn export(data: &DataSet<Self::Point>, kind: UploadKind) -> SurveyResult<String> {
        match kind {
            UploadKind::Survey => Ok(export_spatial(data, &HEADER)),
            UploadKind::Model => Err(SurveyError::UnsupportedUpload {
                tool: Self::KIND,
                kind,
            }),
        }
    }

    fn prompt(data: &DataSet<Self::Point>) -> SurveyResult<String> {
        let stats = Self::statistics(data)?;
        let anomaly = stats.require_anomaly()?;
        Ok(format!(
            "Electrical resistivity tomography survey with {} measurements. \
             Apparent resistivity ranges from {:.2} to {:.2} ohm-m with an average of {:.2} ohm-m. \
             A high-resistivity zone ({}, {} points) spans {} along the line and {} in depth, \
             averaging {:.2} ohm-m {}. {}",
            stats.count,
            stats.min,
            stats.max,
            stats.mean,
            rule_phrase(Self::RULE),
            anomaly.count,
            span(anomaly.horizontal, 1, "m"),
            span(anomaly.vertical, 1, "m"),
            anomaly.mean,
            background(stats.background_mean, 2, "ohm-m"),
            CLOSING
        ))
    }
}

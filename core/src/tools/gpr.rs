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

/// Ground-penetrating radar profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GprParams {
    pub trace_count: usize,
    /// Metres between traces.
    pub trace_spacing: f64,
    pub samples_per_trace: usize,
    /// Two-way travel time window in nanoseconds.
    pub time_window_ns: f64,
    pub background_amplitude: f64,
}

impl Default for GprParams {
    fn default() -> Self {
        Self {
            trace_count: 40,
            trace_spacing: 0.25,
            samples_per_trace: 64,
            time_window_ns: 100.0,
            background_amplitude: 1.0,
        }
    }
}

impl SurveyParameters for GprParams {
    fn normalized(&self) -> Self {
        Self {
            trace_count: self.trace_count.max(4),
            trace_spacing: at_least(self.trace_spacing, 0.01),
            samples_per_trace: self.samples_per_trace.max(2),
            time_window_ns: at_least(self.time_window_ns, 1.0),
            background_amplitude: at_least(self.background_amplitude, 0.01),
        }
    }

    fn expected_points(&self) -> usize {
        let params = self.normalized();
        params.trace_count * params.samples_per_trace
    }
}

pub struct Gpr;

const HEADER: [&str; 3] = ["position", "twtt", "amplitude"];

impl SurveyTool for Gpr {
    type Params = GprParams;
    type Point = SpatialPoint;

    const KIND: ToolKind = ToolKind::Gpr;
    const RULE: ThresholdRule = ThresholdRule::Upper { fraction: 0.20 };
    const AXES: (&'static str, &'static str) = ("position (m)", "two-way travel time (ns)");

    fn generate<R: Rng + ?Sized>(params: &Self::Params, rng: &mut R) -> DataSet<Self::Point> {
        let params = params.normalized();
        debug!(
            "gpr profile {} traces x {} samples",
            params.trace_count, params.samples_per_trace
        );
        let grid = GridSpec {
            columns: params.trace_count,
            rows: params.samples_per_trace,
            column_step: params.trace_spacing,
            row_step: params.time_window_ns / params.samples_per_trace as f64,
        };
        planted_grid(grid, params.background_amplitude, rng)
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
            "Ground-penetrating radar profile with {} samples. Reflection amplitude ranges \
             from {:.3} to {:.3} (mean {:.3}). The strongest reflections ({}, {} samples) \
             occur between {} along the profile at two-way travel times of {}, averaging \
             {:.3} {}. {}",
            stats.count,
            stats.min,
            stats.max,
            stats.mean,
            rule_phrase(Self::RULE),
            anomaly.count,
            span(anomaly.horizontal, 2, "m"),
            span(anomaly.vertical, 1, "ns"),
            anomaly.mean,
            background(stats.background_mean, 3, ""),
            CLOSING
        ))
    }
}

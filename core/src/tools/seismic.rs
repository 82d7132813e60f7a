//! Two-layer seismic model: reflection traces over a time axis plus a
//! depth/velocity step profile. The two halves upload independently; either
//! upload replaces the whole dataset.

use crate::analysis::prompt::{background, rule_phrase, span, CLOSING};
use crate::analysis::DerivedStatistics;
use crate::ingest::table::{parse_table, trace_index, write_table, HeaderSpec};
use crate::math::{ricker, FftHelper, StatsHelper};
use crate::model::DataSet;
use crate::prelude::{
    Observation, SurveyError, SurveyParameters, SurveyResult, SurveyTool, ThresholdRule, ToolKind,
    UploadKind,
};
use crate::tools::at_least;
use log::debug;
use ndarray::{Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MODEL_HEADER: &[&str] = &["depth", "velocity"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeismicParams {
    pub trace_count: usize,
    /// Source-receiver offset increment in metres.
    pub trace_spacing: f64,
    pub sample_count: usize,
    pub sample_interval_ms: f64,
    /// Thickness of the upper layer in metres.
    pub layer_thickness: f64,
    /// m/s
    pub upper_velocity: f64,
    /// m/s
    pub lower_velocity: f64,
    /// Ricker peak frequency in Hz.
    pub dominant_frequency: f64,
    pub noise_level: f64,
    pub profile_points: usize,
}

impl Default for SeismicParams {
    fn default() -> Self {
        Self {
            trace_count: 12,
            trace_spacing: 25.0,
            sample_count: 256,
            sample_interval_ms: 2.0,
            layer_thickness: 400.0,
            upper_velocity: 1800.0,
            lower_velocity: 3200.0,
            dominant_frequency: 30.0,
            noise_level: 0.02,
            profile_points: 50,
        }
    }
}

impl SurveyParameters for SeismicParams {
    fn normalized(&self) -> Self {
        Self {
            trace_count: self.trace_count.max(1),
            trace_spacing: at_least(self.trace_spacing, 1.0),
            sample_count: self.sample_count.max(16),
            sample_interval_ms: at_least(self.sample_interval_ms, 0.1),
            layer_thickness: at_least(self.layer_thickness, 1.0),
            upper_velocity: at_least(self.upper_velocity, 100.0),
            lower_velocity: at_least(self.lower_velocity, 100.0),
            dominant_frequency: at_least(self.dominant_frequency, 1.0),
            noise_level: at_least(self.noise_level, 0.0),
            profile_points: self.profile_points.max(2),
        }
    }

    fn expected_points(&self) -> usize {
        let params = self.normalized();
        params.trace_count * params.sample_count + params.profile_points
    }
}

impl SeismicParams {
    /// Zero-offset two-way travel time to the layer interface, seconds.
    pub fn reflector_twtt(&self) -> f64 {
        2.0 * self.layer_thickness / self.upper_velocity
    }

    pub fn reflection_coefficient(&self) -> f64 {
        (self.lower_velocity - self.upper_velocity) / (self.lower_velocity + self.upper_velocity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeismicPoint {
    /// One sample of a reflection trace; `time` in seconds.
    Trace {
        time: f64,
        trace: usize,
        amplitude: f64,
    },
    /// One velocity-model sample; `depth` is negative below the surface.
    Velocity { depth: f64, velocity: f64 },
}

impl SeismicPoint {
    pub fn is_trace(&self) -> bool {
        matches!(self, SeismicPoint::Trace { .. })
    }
}

impl Observation for SeismicPoint {
    fn value(&self) -> f64 {
        match self {
            SeismicPoint::Trace { amplitude, .. } => *amplitude,
            SeismicPoint::Velocity { velocity, .. } => *velocity,
        }
    }

    fn placement(&self) -> (f64, f64) {
        match self {
            SeismicPoint::Trace { time, trace, .. } => (*trace as f64, *time),
            SeismicPoint::Velocity { depth, .. } => (0.0, *depth),
        }
    }
}

/// Trace samples laid out as a `(time, trace)` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSection {
    pub times: Vec<f64>,
    pub amplitudes: Array2<f64>,
}

impl TraceSection {
    /// `None` when the points hold no trace samples.
    pub fn from_points(points: &[SeismicPoint]) -> Option<Self> {
        let mut times = Vec::new();
        let mut rows: HashMap<u64, usize> = HashMap::new();
        let mut trace_count = 0;
        for point in points {
            if let SeismicPoint::Trace { time, trace, .. } = *point {
                rows.entry(time.to_bits()).or_insert_with(|| {
                    times.push(time);
                    times.len() - 1
                });
                trace_count = trace_count.max(trace + 1);
            }
        }
        if times.is_empty() {
            return None;
        }

        let mut amplitudes = Array2::zeros((times.len(), trace_count));
        for point in points {
            if let SeismicPoint::Trace {
                time,
                trace,
                amplitude,
            } = *point
            {
                if let Some(&row) = rows.get(&time.to_bits()) {
                    amplitudes[[row, trace]] = amplitude;
                }
            }
        }
        Some(Self { times, amplitudes })
    }

    pub fn trace_count(&self) -> usize {
        self.amplitudes.ncols()
    }

    pub fn sample_interval(&self) -> Option<f64> {
        match self.times.as_slice() {
            [first, second, ..] => Some(second - first),
            _ => None,
        }
    }

    /// Mean of all traces at each time sample.
    pub fn stacked(&self) -> Vec<f64> {
        self.amplitudes
            .mean_axis(Axis(1))
            .map(|stack| stack.to_vec())
            .unwrap_or_default()
    }

    pub fn rms(&self) -> f64 {
        let all: Vec<f64> = self.amplitudes.iter().copied().collect();
        StatsHelper::rms(&all)
    }
}

/// Depths (positive, metres) where the velocity model steps, with the velocities on either side.
pub fn velocity_interfaces(points: &[SeismicPoint]) -> Vec<(f64, f64, f64)> {
    let mut profile: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| match *p {
            SeismicPoint::Velocity { depth, velocity } => Some((depth.abs(), velocity)),
            SeismicPoint::Trace { .. } => None,
        })
        .collect();
    profile.sort_by(|a, b| a.0.total_cmp(&b.0));
    profile
        .windows(2)
        .filter(|pair| pair[0].1 != pair[1].1)
        .map(|pair| (pair[1].0, pair[0].1, pair[1].1))
        .collect()
}

pub struct Seismic;

impl Seismic {
    fn traces<R: Rng + ?Sized>(params: &SeismicParams, rng: &mut R) -> Vec<SeismicPoint> {
        let dt = params.sample_interval_ms / 1000.0;
        let t0 = params.reflector_twtt();
        let rc = params.reflection_coefficient();
        let noise = Normal::new(0.0, params.noise_level).ok();
        let arrivals: Vec<f64> = (0..params.trace_count)
            .map(|trace| {
                let offset = trace as f64 * params.trace_spacing;
                (t0 * t0 + (offset / params.upper_velocity).powi(2)).sqrt()
            })
            .collect();

        let mut section = Array2::<f64>::zeros((params.sample_count, params.trace_count));
        for ((sample, trace), amplitude) in section.indexed_iter_mut() {
            let time = sample as f64 * dt;
            let jitter = noise.as_ref().map_or(0.0, |n| n.sample(rng));
            *amplitude = rc * ricker(time - arrivals[trace], params.dominant_frequency) + jitter;
        }

        section
            .indexed_iter()
            .map(|((sample, trace), &amplitude)| SeismicPoint::Trace {
                time: sample as f64 * dt,
                trace,
                amplitude,
            })
            .collect()
    }

    fn velocity_profile(params: &SeismicParams) -> Vec<SeismicPoint> {
        let max_depth = 2.0 * params.layer_thickness;
        let step = max_depth / (params.profile_points - 1) as f64;
        (0..params.profile_points)
            .map(|idx| {
                let depth = idx as f64 * step;
                let velocity = if depth < params.layer_thickness {
                    params.upper_velocity
                } else {
                    params.lower_velocity
                };
                SeismicPoint::Velocity {
                    depth: -depth,
                    velocity,
                }
            })
            .collect()
    }

    fn velocity_summary(interfaces: &[(f64, f64, f64)], samples: usize) -> String {
        if interfaces.is_empty() {
            return format!(
                "The velocity model ({} samples) shows no velocity contrast.",
                samples
            );
        }
        let steps = interfaces
            .iter()
            .map(|(depth, above, below)| {
                format!("from {:.0} to {:.0} m/s at {:.1} m depth", above, below, depth)
            })
            .collect::<Vec<_>>()
            .join(", then ");
        format!(
            "The velocity model ({} samples) changes {}.",
            samples, steps
        )
    }
}

impl SurveyTool for Seismic {
    type Params = SeismicParams;
    type Point = SeismicPoint;

    const KIND: ToolKind = ToolKind::Seismic;
    const RULE: ThresholdRule = ThresholdRule::Symmetric { fraction: 0.05 };
    const AXES: (&'static str, &'static str) = ("trace", "two-way travel time (s)");

    fn generate<R: Rng + ?Sized>(params: &Self::Params, rng: &mut R) -> DataSet<Self::Point> {
        let params = params.normalized();
        debug!(
            "seismic section {} traces x {} samples, reflector at {:.3} s",
            params.trace_count,
            params.sample_count,
            params.reflector_twtt()
        );
        let mut points = Self::traces(&params, rng);
        points.extend(Self::velocity_profile(&params));
        DataSet::new(points)
    }

    fn ingest(content: &str, kind: UploadKind) -> SurveyResult<DataSet<Self::Point>> {
        match kind {
            UploadKind::Survey => {
                let table = parse_table(content, HeaderSpec::TimeTraces)?;
                let traces: Vec<usize> = table.columns[1..]
                    .iter()
                    .filter_map(|name| trace_index(name))
                    .collect();
                Ok(table
                    .rows
                    .iter()
                    .flat_map(|row| {
                        let time = row.values[0];
                        traces
                            .iter()
                            .zip(&row.values[1..])
                            .map(move |(&trace, &amplitude)| SeismicPoint::Trace {
                                time,
                                trace,
                                amplitude,
                            })
                    })
                    .collect())
            }
            UploadKind::Model => {
                let table = parse_table(content, HeaderSpec::Named(MODEL_HEADER))?;
                Ok(table
                    .rows
                    .into_iter()
                    .map(|row| SeismicPoint::Velocity {
                        depth: -row.values[0],
                        velocity: row.values[1],
                    })
                    .collect())
            }
        }
    }

    fn export(data: &DataSet<Self::Point>, kind: UploadKind) -> SurveyResult<String> {
        match kind {
            UploadKind::Survey => {
                let section =
                    TraceSection::from_points(data.points()).ok_or(SurveyError::EmptyDataset)?;
                let mut header = vec!["time".to_string()];
                header.extend((1..=section.trace_count()).map(|n| format!("trace{}", n)));
                let rows = section
                    .times
                    .iter()
                    .zip(section.amplitudes.rows())
                    .map(|(&time, row)| {
                        let mut values = vec![time];
                        values.extend(row.iter().copied());
                        values
                    });
                Ok(write_table(&header, rows))
            }
            UploadKind::Model => {
                let rows: Vec<Vec<f64>> = data
                    .iter()
                    .filter_map(|p| match *p {
                        SeismicPoint::Velocity { depth, velocity } => Some(vec![-depth, velocity]),
                        SeismicPoint::Trace { .. } => None,
                    })
                    .collect();
                if rows.is_empty() {
                    return Err(SurveyError::EmptyDataset);
                }
                Ok(write_table(MODEL_HEADER, rows))
            }
        }
    }

    fn statistics(data: &DataSet<Self::Point>) -> SurveyResult<DerivedStatistics> {
        if data.iter().any(SeismicPoint::is_trace) {
            DerivedStatistics::compute(data.iter().filter(|p| p.is_trace()), Self::RULE)
        } else {
            DerivedStatistics::compute(data.iter(), Self::RULE)
        }
    }

    fn prompt(data: &DataSet<Self::Point>) -> SurveyResult<String> {
        let interfaces = velocity_interfaces(data.points());
        let velocity_samples = data.len() - data.iter().filter(|p| p.is_trace()).count();

        let Some(section) = TraceSection::from_points(data.points()) else {
            if velocity_samples == 0 {
                return Err(SurveyError::EmptyDataset);
            }
            return Ok(format!(
                "Seismic velocity model without reflection data. {} {}",
                Self::velocity_summary(&interfaces, velocity_samples),
                CLOSING
            ));
        };

        let stats = Self::statistics(data)?;
        let anomaly = stats.require_anomaly()?;
        let frequency = section
            .sample_interval()
            .and_then(|dt| FftHelper::dominant_frequency(&section.stacked(), dt))
            .map(|f| format!("{:.1} Hz", f))
            .unwrap_or_else(|| "undetermined".to_string());
        let model = if velocity_samples > 0 {
            format!(" {}", Self::velocity_summary(&interfaces, velocity_samples))
        } else {
            String::new()
        };

        Ok(format!(
            "Seismic reflection section with {} traces of {} samples. Amplitudes range from \
             {:.3} to {:.3} (RMS {:.3}); the stacked trace has a dominant frequency of {}. \
             The strongest reflections ({}, {} samples) appear on traces {} at two-way times \
             of {}, with a mean amplitude of {:.3} {}.{} {}",
            section.trace_count(),
            section.times.len(),
            stats.min,
            stats.max,
            section.rms(),
            frequency,
            rule_phrase(Self::RULE),
            anomaly.count,
            span((anomaly.horizontal.0 + 1.0, anomaly.horizontal.1 + 1.0), 0, ""),
            span(anomaly.vertical, 3, "s"),
            anomaly.mean,
            background(stats.background_mean, 3, ""),
            model,
            CLOSING
        ))
    }
}

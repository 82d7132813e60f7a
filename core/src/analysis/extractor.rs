use crate::math::stats::StatsHelper;
use crate::prelude::{Observation, SurveyError, SurveyResult, ThresholdRule};
use serde::Serialize;

/// Resolved cut-off values of a [`ThresholdRule`] for one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdBand {
    pub upper: f64,
    pub lower: Option<f64>,
}

impl ThresholdBand {
    pub fn resolve(rule: ThresholdRule, sorted: &[f64]) -> Option<Self> {
        match rule {
            ThresholdRule::Upper { fraction } => Some(Self {
                upper: StatsHelper::percentile(sorted, 1.0 - fraction)?,
                lower: None,
            }),
            ThresholdRule::Symmetric { fraction } => Some(Self {
                upper: StatsHelper::percentile(sorted, 1.0 - fraction)?,
                lower: Some(StatsHelper::percentile(sorted, fraction)?),
            }),
        }
    }

    pub fn selects(&self, value: f64) -> bool {
        value > self.upper || self.lower.is_some_and(|lower| value < lower)
    }
}

/// Bounds and mean of the threshold-selected subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalySummary {
    pub count: usize,
    pub horizontal: (f64, f64),
    pub vertical: (f64, f64),
    pub mean: f64,
}

/// Summary numbers interpolated into an interpretation prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub band: ThresholdBand,
    pub anomaly: Option<AnomalySummary>,
    pub background_mean: Option<f64>,
}

impl DerivedStatistics {
    pub fn compute<'a, P, I>(points: I, rule: ThresholdRule) -> SurveyResult<Self>
    where
        P: Observation,
        I: IntoIterator<Item = &'a P>,
    {
        let points: Vec<&P> = points.into_iter().collect();
        let values: Vec<f64> = points.iter().map(|p| p.value()).collect();

        let (min, max) = StatsHelper::min_max(&values).ok_or(SurveyError::EmptyDataset)?;
        let mean = StatsHelper::mean(&values).ok_or(SurveyError::EmptyDataset)?;

        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        let band = ThresholdBand::resolve(rule, &sorted).ok_or(SurveyError::EmptyDataset)?;

        let (anomalous, background): (Vec<&P>, Vec<&P>) =
            points.into_iter().partition(|p| band.selects(p.value()));

        let background_values: Vec<f64> = background.iter().map(|p| p.value()).collect();

        Ok(Self {
            count: values.len(),
            min,
            max,
            mean,
            band,
            anomaly: summarize(&anomalous),
            background_mean: StatsHelper::mean(&background_values),
        })
    }

    pub fn require_anomaly(&self) -> SurveyResult<&AnomalySummary> {
        self.anomaly.as_ref().ok_or(SurveyError::NoClearAnomaly)
    }
}

fn summarize<P: Observation>(subset: &[&P]) -> Option<AnomalySummary> {
    let xs: Vec<f64> = subset.iter().map(|p| p.placement().0).collect();
    let ys: Vec<f64> = subset.iter().map(|p| p.placement().1).collect();
    let values: Vec<f64> = subset.iter().map(|p| p.value()).collect();
    Some(AnomalySummary {
        count: subset.len(),
        horizontal: StatsHelper::min_max(&xs)?,
        vertical: StatsHelper::min_max(&ys)?,
        mean: StatsHelper::mean(&values)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::spatial::SpatialPoint;

    fn line(values: &[f64]) -> Vec<SpatialPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| SpatialPoint::new(i as f64, 1.0 + i as f64, v))
            .collect()
    }

    #[test]
    fn empty_input_fails_with_empty_dataset() {
        let points: Vec<SpatialPoint> = Vec::new();
        let err = DerivedStatistics::compute(&points, ThresholdRule::Upper { fraction: 0.1 })
            .unwrap_err();
        assert_eq!(err, SurveyError::EmptyDataset);
    }

    #[test]
    fn upper_rule_selects_top_values_and_bounds_them() {
        let points = line(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 9.0, 10.0]);
        let stats =
            DerivedStatistics::compute(&points, ThresholdRule::Upper { fraction: 0.1 }).unwrap();

        assert_eq!(stats.count, 10);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 10.0);
        assert!((stats.mean - 2.7).abs() < 1e-12);

        let anomaly = stats.require_anomaly().unwrap();
        assert_eq!(anomaly.count, 1);
        assert_eq!(anomaly.horizontal, (9.0, 9.0));
        assert_eq!(anomaly.vertical, (10.0, 10.0));
        assert_eq!(anomaly.mean, 10.0);
        assert!((stats.background_mean.unwrap() - 17.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn symmetric_rule_selects_both_tails() {
        let points = line(&[-5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0]);
        let stats = DerivedStatistics::compute(&points, ThresholdRule::Symmetric { fraction: 0.05 })
            .unwrap();
        let anomaly = stats.require_anomaly().unwrap();
        assert_eq!(anomaly.count, 2);
        assert_eq!(anomaly.horizontal, (0.0, 9.0));
        assert_eq!(anomaly.mean, 0.0);
        assert_eq!(stats.background_mean, Some(0.0));
    }

    #[test]
    fn uniform_values_report_no_clear_anomaly() {
        let points = line(&[3.0, 3.0, 3.0]);
        let stats =
            DerivedStatistics::compute(&points, ThresholdRule::Upper { fraction: 0.1 }).unwrap();
        assert!(stats.anomaly.is_none());
        assert_eq!(stats.require_anomaly().unwrap_err(), SurveyError::NoClearAnomaly);
        assert_eq!(stats.background_mean, Some(3.0));
    }
}

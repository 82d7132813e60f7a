use serde::Serialize;
use surveycore::analysis::DerivedStatistics;
use surveycore::model::DataOrigin;
use surveycore::prelude::{SurveyParameters, SurveyTool, ToolKind};
use surveycore::view::{Pending, ToolView};

/// JSON view of one tool, served to the dashboard. User-facing failures
/// travel in `error` as their display message.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSnapshot {
    pub tool: ToolKind,
    pub title: &'static str,
    pub axes: (&'static str, &'static str),
    pub parameters: serde_json::Value,
    pub expected_points: usize,
    pub pending: Pending,
    pub origin: Option<DataOrigin>,
    pub point_count: usize,
    pub statistics: Option<DerivedStatistics>,
    pub interpretation: Option<String>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<serde_json::Value>,
}

impl ToolSnapshot {
    pub fn of<T: SurveyTool>(view: &ToolView<T>, with_points: bool) -> Self {
        let dataset = view.dataset();
        Self {
            tool: T::KIND,
            title: T::KIND.title(),
            axes: T::AXES,
            parameters: serde_json::to_value(view.params()).unwrap_or_default(),
            expected_points: view.params().expected_points(),
            pending: view.pending(),
            origin: view.origin(),
            point_count: dataset.map_or(0, |d| d.len()),
            statistics: view.statistics().and_then(Result::ok),
            interpretation: view.interpretation().map(str::to_string),
            error: view.error().map(ToString::to_string),
            points: dataset
                .filter(|_| with_points)
                .and_then(|d| serde_json::to_value(d).ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surveycore::prelude::SurveyError;
    use surveycore::tools::Gpr;
    use surveycore::view::Action;

    #[test]
    fn empty_view_snapshot() {
        let view = ToolView::<Gpr>::default();
        let snapshot = ToolSnapshot::of(&view, true);
        assert_eq!(snapshot.tool, ToolKind::Gpr);
        assert_eq!(snapshot.expected_points, 40 * 64);
        assert_eq!(snapshot.point_count, 0);
        assert!(snapshot.points.is_none());
        assert_eq!(snapshot.parameters["trace_count"], 40);
    }

    #[test]
    fn error_is_rendered_as_message() {
        let view = ToolView::<Gpr>::default().reduce(Action::Error(SurveyError::NoClearAnomaly));
        let json = serde_json::to_value(ToolSnapshot::of(&view, false)).unwrap();
        assert_eq!(
            json["error"],
            "no clear anomaly could be identified in the dataset"
        );
        assert_eq!(json["tool"], "gpr");
        assert_eq!(json["pending"]["state"], "idle");
        assert!(json.get("points").is_none());
    }
}

use crate::analysis::DerivedStatistics;
use crate::model::DataSet;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six survey tools exposed by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    Resistivity,
    Gpr,
    Gravity,
    Seismic,
    RemoteSensing,
    Earthquake,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Resistivity,
        ToolKind::Gpr,
        ToolKind::Gravity,
        ToolKind::Seismic,
        ToolKind::RemoteSensing,
        ToolKind::Earthquake,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ToolKind::Resistivity => "resistivity",
            ToolKind::Gpr => "gpr",
            ToolKind::Gravity => "gravity",
            ToolKind::Seismic => "seismic",
            ToolKind::RemoteSensing => "remote-sensing",
            ToolKind::Earthquake => "earthquake",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ToolKind::Resistivity => "Resistivity Tomography",
            ToolKind::Gpr => "GPR Tomography",
            ToolKind::Gravity => "Gravity Anomaly",
            ToolKind::Seismic => "Seismic Tomography",
            ToolKind::RemoteSensing => "Remote Sensing",
            ToolKind::Earthquake => "Earthquake Monitoring",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ToolKind {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ToolKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == needle)
            .ok_or_else(|| SurveyError::UnknownName {
                what: "tool",
                name: s.to_string(),
            })
    }
}

/// Which schema an upload is expected to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    /// Measured or observed survey data.
    #[default]
    Survey,
    /// A subsurface model, e.g. a depth/velocity profile.
    Model,
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadKind::Survey => f.write_str("survey"),
            UploadKind::Model => f.write_str("model"),
        }
    }
}

impl FromStr for UploadKind {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "survey" | "data" => Ok(UploadKind::Survey),
            "model" => Ok(UploadKind::Model),
            _ => Err(SurveyError::UnknownName {
                what: "upload kind",
                name: s.to_string(),
            }),
        }
    }
}

/// Why a single CSV row was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowProblem {
    ColumnCount { expected: usize, found: usize },
    NonNumeric { column: String, value: String },
}

impl fmt::Display for RowProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowProblem::ColumnCount { expected, found } => {
                write!(f, "expected {} columns, found {}", expected, found)
            }
            RowProblem::NonNumeric { column, value } => {
                write!(f, "column '{}' is not a finite number: '{}'", column, value)
            }
        }
    }
}

/// Every failure a tool view can surface. Messages are shown to the user as-is.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SurveyError {
    #[error("no file selected")]
    MissingFile,
    #[error("expected a text/csv file, got '{found}'")]
    WrongMimeType { found: String },
    #[error("the uploaded file contains no data rows")]
    EmptyFile,
    #[error("the uploaded file is not UTF-8 text (invalid byte at offset {offset})")]
    NotText { offset: usize },
    #[error("line {line}: {problem}")]
    MalformedRow { line: usize, problem: RowProblem },
    #[error("missing required column '{name}'")]
    MissingHeader { name: String },
    #[error("unexpected column '{found}' at position {position}")]
    UnexpectedHeader { position: usize, found: String },
    #[error("{tool} does not accept {kind} uploads")]
    UnsupportedUpload { tool: ToolKind, kind: UploadKind },
    #[error("no data loaded; simulate or upload a dataset first")]
    EmptyDataset,
    #[error("no clear anomaly could be identified in the dataset")]
    NoClearAnomaly,
    #[error("interpretation service unavailable; please try again")]
    InterpretationUnavailable,
    #[error("unknown {what} '{name}'")]
    UnknownName { what: &'static str, name: String },
    #[error("invalid parameters: {reason}")]
    InvalidParameters { reason: String },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

/// Percentile rule used to pick the "anomaly" subset of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ThresholdRule {
    /// Values strictly above the `1 - fraction` percentile.
    Upper { fraction: f64 },
    /// Values strictly above the `1 - fraction` or strictly below the `fraction` percentile.
    Symmetric { fraction: f64 },
}

/// A single observation of any tool.
pub trait Observation: Clone + fmt::Debug + PartialEq + Serialize + Send + Sync + 'static {
    /// The field statistics and thresholds operate on.
    fn value(&self) -> f64;
    /// Horizontal and vertical placement used for anomaly bounds.
    fn placement(&self) -> (f64, f64);
}

/// User-editable numeric parameters of a tool.
pub trait SurveyParameters:
    Clone + Default + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Copy with every field clamped to its documented minimum.
    fn normalized(&self) -> Self;
    /// Number of points the generator emits for these parameters.
    fn expected_points(&self) -> usize;
}

/// Descriptor that plugs one tool into the shared generate/ingest/extract pipeline.
pub trait SurveyTool: Send + Sync + 'static {
    type Params: SurveyParameters;
    type Point: Observation;

    const KIND: ToolKind;
    const RULE: ThresholdRule;
    /// Labels of the horizontal and vertical placement axes.
    const AXES: (&'static str, &'static str);

    fn generate<R: Rng + ?Sized>(params: &Self::Params, rng: &mut R) -> DataSet<Self::Point>;

    fn ingest(content: &str, kind: UploadKind) -> SurveyResult<DataSet<Self::Point>>;

    fn export(data: &DataSet<Self::Point>, kind: UploadKind) -> SurveyResult<String>;

    fn statistics(data: &DataSet<Self::Point>) -> SurveyResult<DerivedStatistics> {
        DerivedStatistics::compute(data.iter(), Self::RULE)
    }

    fn prompt(data: &DataSet<Self::Point>) -> SurveyResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_kind_parses_its_own_slug() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.slug().parse::<ToolKind>().unwrap(), kind);
        }
        assert_eq!(" Remote-Sensing ".parse::<ToolKind>().unwrap(), ToolKind::RemoteSensing);
    }

    #[test]
    fn unknown_tool_is_reported_by_name() {
        let err = "magnetics".parse::<ToolKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown tool 'magnetics'");
    }

    #[test]
    fn malformed_row_message_cites_line() {
        let err = SurveyError::MalformedRow {
            line: 3,
            problem: RowProblem::NonNumeric {
                column: "z".into(),
                value: "bad".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "line 3: column 'z' is not a finite number: 'bad'"
        );
    }
}

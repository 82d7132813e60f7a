//! Per-tool view state as a value transitioned by [`ToolView::reduce`].
//!
//! Every request (simulate, interpret, upload, reset) bumps the view's
//! epoch. Completions carry the epoch they were started under and are
//! dropped when it no longer matches, which is how a reset or a newer
//! request discards an in-flight result.

use crate::analysis::DerivedStatistics;
use crate::model::{DataOrigin, DataSet};
use crate::prelude::{SurveyError, SurveyParameters, SurveyResult, SurveyTool};
use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "epoch", rename_all = "snake_case")]
pub enum Pending {
    #[default]
    Idle,
    Simulating(u64),
    Interpreting(u64),
}

pub enum Action<T: SurveyTool> {
    SetParameters(T::Params),
    Simulate,
    SimulationFinished {
        epoch: u64,
        dataset: DataSet<T::Point>,
    },
    Upload(SurveyResult<DataSet<T::Point>>),
    Reset,
    InterpretRequested,
    InterpretReceived {
        epoch: u64,
        result: SurveyResult<String>,
    },
    Error(SurveyError),
}

pub struct ToolView<T: SurveyTool> {
    params: T::Params,
    dataset: Option<DataSet<T::Point>>,
    origin: Option<DataOrigin>,
    interpretation: Option<String>,
    error: Option<SurveyError>,
    pending: Pending,
    epoch: u64,
}

impl<T: SurveyTool> Default for ToolView<T> {
    fn default() -> Self {
        Self::with_params(T::Params::default())
    }
}

impl<T: SurveyTool> ToolView<T> {
    pub fn with_params(params: T::Params) -> Self {
        Self {
            params: params.normalized(),
            dataset: None,
            origin: None,
            interpretation: None,
            error: None,
            pending: Pending::Idle,
            epoch: 0,
        }
    }

    pub fn reduce(self, action: Action<T>) -> Self {
        match action {
            Action::SetParameters(params) => Self {
                params: params.normalized(),
                error: None,
                ..self
            },
            Action::Simulate => {
                let epoch = self.epoch + 1;
                Self {
                    pending: Pending::Simulating(epoch),
                    error: None,
                    epoch,
                    ..self
                }
            }
            Action::SimulationFinished { epoch, dataset } => {
                if self.pending != Pending::Simulating(epoch) {
                    debug!("{}: dropping stale simulation {}", T::KIND, epoch);
                    return self;
                }
                self.replace(dataset, DataOrigin::Simulated)
            }
            Action::Upload(Ok(dataset)) => {
                let epoch = self.epoch + 1;
                Self { epoch, ..self }.replace(dataset, DataOrigin::Uploaded)
            }
            Action::Upload(Err(error)) => Self {
                error: Some(error),
                ..self
            },
            Action::Reset => Self {
                epoch: self.epoch + 1,
                ..Self::with_params(self.params)
            },
            Action::InterpretRequested => {
                if self.dataset.is_none() {
                    return Self {
                        error: Some(SurveyError::EmptyDataset),
                        ..self
                    };
                }
                let epoch = self.epoch + 1;
                Self {
                    pending: Pending::Interpreting(epoch),
                    interpretation: None,
                    error: None,
                    epoch,
                    ..self
                }
            }
            Action::InterpretReceived { epoch, result } => {
                if self.pending != Pending::Interpreting(epoch) {
                    debug!("{}: dropping stale interpretation {}", T::KIND, epoch);
                    return self;
                }
                let (interpretation, error) = match result {
                    Ok(text) => (Some(text), None),
                    Err(error) => (None, Some(error)),
                };
                Self {
                    interpretation,
                    error,
                    pending: Pending::Idle,
                    ..self
                }
            }
            Action::Error(error) => Self {
                error: Some(error),
                pending: Pending::Idle,
                ..self
            },
        }
    }

    fn replace(self, dataset: DataSet<T::Point>, origin: DataOrigin) -> Self {
        Self {
            dataset: Some(dataset),
            origin: Some(origin),
            interpretation: None,
            error: None,
            pending: Pending::Idle,
            ..self
        }
    }

    pub fn params(&self) -> &T::Params {
        &self.params
    }

    pub fn dataset(&self) -> Option<&DataSet<T::Point>> {
        self.dataset.as_ref()
    }

    pub fn origin(&self) -> Option<DataOrigin> {
        self.origin
    }

    pub fn interpretation(&self) -> Option<&str> {
        self.interpretation.as_deref()
    }

    pub fn error(&self) -> Option<&SurveyError> {
        self.error.as_ref()
    }

    pub fn pending(&self) -> Pending {
        self.pending
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_busy(&self) -> bool {
        self.pending != Pending::Idle
    }

    /// `None` while nothing is loaded.
    pub fn statistics(&self) -> Option<SurveyResult<DerivedStatistics>> {
        self.dataset.as_ref().map(T::statistics)
    }

    pub fn prompt(&self) -> SurveyResult<String> {
        let dataset = self.dataset.as_ref().ok_or(SurveyError::EmptyDataset)?;
        T::prompt(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{RowProblem, UploadKind};
    use crate::tools::{Earthquake, EarthquakeParams, Resistivity, ResistivityParams};
    use rand::{rngs::StdRng, SeedableRng};

    fn simulated() -> ToolView<Resistivity> {
        let view = ToolView::<Resistivity>::default().reduce(Action::Simulate);
        let Pending::Simulating(epoch) = view.pending() else {
            panic!("simulation not pending");
        };
        let dataset = Resistivity::generate(view.params(), &mut StdRng::seed_from_u64(1));
        view.reduce(Action::SimulationFinished { epoch, dataset })
    }

    #[test]
    fn simulation_publishes_dataset() {
        let view = simulated();
        assert_eq!(view.pending(), Pending::Idle);
        assert_eq!(view.origin(), Some(DataOrigin::Simulated));
        assert_eq!(view.dataset().map(DataSet::len), Some(192));
    }

    #[test]
    fn bad_upload_on_empty_view_cites_line_three() {
        let upload = Resistivity::ingest("x,y,z\n0,0,10\n1,1,bad\n", UploadKind::Survey);
        let view = ToolView::<Resistivity>::default().reduce(Action::Upload(upload));
        assert!(view.dataset().is_none());
        assert_eq!(
            view.error(),
            Some(&SurveyError::MalformedRow {
                line: 3,
                problem: RowProblem::NonNumeric {
                    column: "z".into(),
                    value: "bad".into()
                }
            })
        );
    }

    #[test]
    fn bad_upload_keeps_previous_dataset() {
        let view = simulated();
        let before = view.dataset().cloned();
        let upload = Resistivity::ingest("x,y\n1,2\n", UploadKind::Survey);
        let view = view.reduce(Action::Upload(upload));
        assert!(matches!(view.error(), Some(SurveyError::MalformedRow { line: 1, .. })));
        assert_eq!(view.dataset().cloned(), before);
        assert_eq!(view.origin(), Some(DataOrigin::Simulated));
    }

    #[test]
    fn good_upload_replaces_dataset_and_clears_interpretation() {
        let view = simulated().reduce(Action::InterpretRequested);
        let Pending::Interpreting(epoch) = view.pending() else {
            panic!("interpretation not pending");
        };
        let view = view.reduce(Action::InterpretReceived {
            epoch,
            result: Ok("a resistive body".into()),
        });
        assert_eq!(view.interpretation(), Some("a resistive body"));

        let upload = Resistivity::ingest("x,y,z\n0,0,10\n1,1,20\n", UploadKind::Survey);
        let view = view.reduce(Action::Upload(upload));
        assert_eq!(view.origin(), Some(DataOrigin::Uploaded));
        assert_eq!(view.dataset().map(DataSet::len), Some(2));
        assert!(view.interpretation().is_none());
    }

    #[test]
    fn reset_discards_in_flight_simulation() {
        let view = ToolView::<Resistivity>::default().reduce(Action::Simulate);
        let Pending::Simulating(epoch) = view.pending() else {
            panic!("simulation not pending");
        };
        let dataset = Resistivity::generate(view.params(), &mut StdRng::seed_from_u64(1));
        let view = view
            .reduce(Action::Reset)
            .reduce(Action::SimulationFinished { epoch, dataset });
        assert!(view.dataset().is_none());
        assert_eq!(view.pending(), Pending::Idle);
    }

    #[test]
    fn newer_request_wins_over_older_interpretation() {
        let view = simulated().reduce(Action::InterpretRequested);
        let Pending::Interpreting(first) = view.pending() else {
            panic!("interpretation not pending");
        };
        let view = view.reduce(Action::InterpretRequested);
        let view = view.reduce(Action::InterpretReceived {
            epoch: first,
            result: Ok("stale".into()),
        });
        assert!(view.interpretation().is_none());
        assert!(view.is_busy());
    }

    #[test]
    fn interpreting_nothing_is_an_error() {
        let view = ToolView::<Earthquake>::default().reduce(Action::InterpretRequested);
        assert_eq!(view.error(), Some(&SurveyError::EmptyDataset));
        assert_eq!(view.pending(), Pending::Idle);
        assert!(view.statistics().is_none());
        assert_eq!(view.prompt().unwrap_err(), SurveyError::EmptyDataset);
    }

    #[test]
    fn parameters_are_clamped_on_entry() {
        let view = ToolView::<Resistivity>::default().reduce(Action::SetParameters(ResistivityParams {
            electrode_count: 1,
            ..Default::default()
        }));
        assert_eq!(view.params().electrode_count, 4);

        let view = ToolView::<Earthquake>::with_params(EarthquakeParams {
            points: 0,
            ..Default::default()
        });
        assert_eq!(view.params().points, 1);
    }
}

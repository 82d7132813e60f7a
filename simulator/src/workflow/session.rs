use crate::gui_bridge::model::ToolSnapshot;
use rand::{rngs::StdRng, SeedableRng};
use std::mem;
use std::sync::{Arc, Mutex};
use surveycore::ingest::FileUpload;
use surveycore::prelude::{
    SurveyError, SurveyParameters, SurveyResult, SurveyTool, ToolKind, UploadKind,
};
use surveycore::telemetry::{LogManager, MetricsRecorder};
use surveycore::view::{Action, Pending, ToolView};

/// Type-erased access to one tool's session, so all six can share one map.
pub trait ToolHandle: Send {
    fn kind(&self) -> ToolKind;

    /// Replaces the parameters from their JSON form; omitted fields take defaults.
    fn update_parameters(&mut self, params: serde_json::Value) -> SurveyResult<()>;

    /// Marks a simulation as pending and returns its epoch.
    fn begin_simulation(&mut self) -> u64;

    /// Generates and publishes the dataset unless `epoch` has gone stale.
    fn finish_simulation(&mut self, epoch: u64);

    fn upload(&mut self, upload: FileUpload<'_>) -> SurveyResult<()>;

    /// Epoch and prompt of a new interpretation, or `None` when the view
    /// recorded why it cannot be interpreted.
    fn begin_interpretation(&mut self) -> Option<(u64, String)>;

    fn finish_interpretation(&mut self, epoch: u64, result: SurveyResult<String>);

    fn reset(&mut self);

    fn export(&self, kind: UploadKind) -> SurveyResult<String>;

    fn snapshot(&self, with_points: bool) -> ToolSnapshot;
}

pub type SharedHandle = Arc<Mutex<Box<dyn ToolHandle>>>;

pub struct Session<T: SurveyTool> {
    view: ToolView<T>,
    rng: StdRng,
    log: LogManager,
    metrics: Arc<MetricsRecorder>,
}

impl<T: SurveyTool> Session<T> {
    pub fn new(params: T::Params, seed: Option<u64>, metrics: Arc<MetricsRecorder>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            view: ToolView::with_params(params),
            rng,
            log: LogManager::for_tool(T::KIND),
            metrics,
        }
    }

    #[cfg(test)]
    pub fn view(&self) -> &ToolView<T> {
        &self.view
    }

    fn apply(&mut self, action: Action<T>) {
        let view = mem::take(&mut self.view);
        self.view = view.reduce(action);
    }

    fn fail(&mut self, action: &str, error: SurveyError) {
        self.log.failure(action, &error);
        self.metrics.record_error();
        self.apply(Action::Error(error));
    }
}

impl<T: SurveyTool> ToolHandle for Session<T> {
    fn kind(&self) -> ToolKind {
        T::KIND
    }

    fn update_parameters(&mut self, params: serde_json::Value) -> SurveyResult<()> {
        match serde_json::from_value::<T::Params>(params) {
            Ok(params) => {
                self.apply(Action::SetParameters(params));
                Ok(())
            }
            Err(err) => {
                let error = SurveyError::InvalidParameters {
                    reason: err.to_string(),
                };
                self.fail("parameter update", error.clone());
                Err(error)
            }
        }
    }

    fn begin_simulation(&mut self) -> u64 {
        self.apply(Action::Simulate);
        self.view.epoch()
    }

    fn finish_simulation(&mut self, epoch: u64) {
        if self.view.pending() != Pending::Simulating(epoch) {
            self.log.record("simulation result discarded");
            return;
        }
        let dataset = T::generate(self.view.params(), &mut self.rng);
        self.log.record(&format!("simulated {} points", dataset.len()));
        self.metrics.record_simulation();
        self.apply(Action::SimulationFinished { epoch, dataset });
    }

    fn upload(&mut self, upload: FileUpload<'_>) -> SurveyResult<()> {
        let result = upload
            .accept()
            .and_then(|content| T::ingest(content, upload.kind));
        match &result {
            Ok(dataset) => {
                self.log
                    .record(&format!("ingested {} points ({})", dataset.len(), upload.kind));
                self.metrics.record_upload();
            }
            Err(error) => {
                self.log.failure("upload", error);
                self.metrics.record_error();
            }
        }
        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        self.apply(Action::Upload(result));
        outcome
    }

    fn begin_interpretation(&mut self) -> Option<(u64, String)> {
        self.apply(Action::InterpretRequested);
        let Pending::Interpreting(epoch) = self.view.pending() else {
            if let Some(error) = self.view.error() {
                self.log.failure("interpretation", error);
            }
            self.metrics.record_error();
            return None;
        };
        match self.view.prompt() {
            Ok(prompt) => Some((epoch, prompt)),
            Err(error) => {
                self.fail("interpretation", error);
                None
            }
        }
    }

    fn finish_interpretation(&mut self, epoch: u64, result: SurveyResult<String>) {
        match &result {
            Ok(_) => self.metrics.record_interpretation(),
            Err(_) => self.metrics.record_error(),
        }
        self.apply(Action::InterpretReceived { epoch, result });
    }

    fn reset(&mut self) {
        self.log.record("reset");
        self.apply(Action::Reset);
    }

    fn export(&self, kind: UploadKind) -> SurveyResult<String> {
        let dataset = self.view.dataset().ok_or(SurveyError::EmptyDataset)?;
        T::export(dataset, kind)
    }

    fn snapshot(&self, with_points: bool) -> ToolSnapshot {
        ToolSnapshot::of(&self.view, with_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use surveycore::model::DataOrigin;
    use surveycore::tools::{Gravity, Resistivity, Seismic};

    fn session<T: SurveyTool>() -> Session<T> {
        Session::new(T::Params::default(), Some(3), Arc::new(MetricsRecorder::new()))
    }

    #[test]
    fn simulation_runs_through_the_view() {
        let mut s = session::<Resistivity>();
        let epoch = s.begin_simulation();
        assert_eq!(s.view().pending(), Pending::Simulating(epoch));
        s.finish_simulation(epoch);
        assert_eq!(s.view().origin(), Some(DataOrigin::Simulated));
        assert_eq!(s.metrics.snapshot().simulations, 1);
    }

    #[test]
    fn same_seed_same_dataset() {
        let mut a = session::<Gravity>();
        let mut b = session::<Gravity>();
        for s in [&mut a, &mut b] {
            let epoch = s.begin_simulation();
            s.finish_simulation(epoch);
        }
        assert_eq!(a.view().dataset(), b.view().dataset());
    }

    #[test]
    fn reset_before_completion_discards_the_run() {
        let mut s = session::<Resistivity>();
        let epoch = s.begin_simulation();
        s.reset();
        s.finish_simulation(epoch);
        assert!(s.view().dataset().is_none());
        assert_eq!(s.metrics.snapshot().simulations, 0);
    }

    #[test]
    fn parameters_update_from_json() {
        let mut s = session::<Resistivity>();
        s.update_parameters(json!({"electrode_count": 10})).unwrap();
        assert_eq!(s.view().params().electrode_count, 10);
        assert_eq!(s.view().params().depth_levels, 8);

        let err = s
            .update_parameters(json!({"electrode_count": "many"}))
            .unwrap_err();
        assert!(matches!(err, SurveyError::InvalidParameters { .. }));
        assert_eq!(s.view().params().electrode_count, 10);
    }

    #[test]
    fn rejected_upload_is_reported_and_recorded() {
        let mut s = session::<Resistivity>();
        let upload = FileUpload {
            content: Some(b"x,y,z\n0,0,1\n".as_slice()),
            mime: Some("application/json"),
            kind: UploadKind::Survey,
        };
        let err = s.upload(upload).unwrap_err();
        assert_eq!(
            err,
            SurveyError::WrongMimeType {
                found: "application/json".into()
            }
        );
        assert_eq!(s.view().error(), Some(&err));
        assert_eq!(s.metrics.snapshot().errors, 1);
    }

    #[test]
    fn seismic_model_upload_replaces_everything() {
        let mut s = session::<Seismic>();
        let epoch = s.begin_simulation();
        s.finish_simulation(epoch);
        s.upload(FileUpload::csv("depth,velocity\n0,1500\n50,2500\n", UploadKind::Model))
            .unwrap();
        assert_eq!(s.view().dataset().map(|d| d.len()), Some(2));
        assert_eq!(s.view().origin(), Some(DataOrigin::Uploaded));
    }

    #[test]
    fn interpretation_needs_data() {
        let mut s = session::<Gravity>();
        assert!(s.begin_interpretation().is_none());
        assert_eq!(s.view().error(), Some(&SurveyError::EmptyDataset));

        let epoch = s.begin_simulation();
        s.finish_simulation(epoch);
        let (epoch, prompt) = s.begin_interpretation().unwrap();
        assert!(prompt.starts_with("Gravity survey"));
        s.finish_interpretation(epoch, Err(SurveyError::InterpretationUnavailable));
        assert_eq!(s.view().error(), Some(&SurveyError::InterpretationUnavailable));
        assert_eq!(s.view().pending(), Pending::Idle);
    }

    #[test]
    fn export_requires_data() {
        let s = session::<Resistivity>();
        assert_eq!(s.export(UploadKind::Survey).unwrap_err(), SurveyError::EmptyDataset);
    }
}

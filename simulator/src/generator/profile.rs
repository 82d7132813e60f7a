use crate::workflow::session::{Session, SharedHandle, ToolHandle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use surveycore::prelude::ToolKind;
use surveycore::telemetry::MetricsRecorder;
use surveycore::tools::{
    Earthquake, EarthquakeParams, Gpr, GprParams, Gravity, GravityParams, RemoteSensing,
    RemoteSensingParams, Resistivity, ResistivityParams, Seismic, SeismicParams,
};

/// Starting parameters of each tool; any omitted section keeps its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolDefaults {
    pub resistivity: ResistivityParams,
    pub gpr: GprParams,
    pub gravity: GravityParams,
    pub seismic: SeismicParams,
    pub remote_sensing: RemoteSensingParams,
    pub earthquake: EarthquakeParams,
}

/// One session per tool, keyed by kind, sharing a metrics recorder.
pub struct Workbench {
    sessions: HashMap<ToolKind, SharedHandle>,
    metrics: Arc<MetricsRecorder>,
}

impl Workbench {
    pub fn session(&self, kind: ToolKind) -> Option<SharedHandle> {
        self.sessions.get(&kind).cloned()
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }
}

fn tool_seed(seed: Option<u64>, kind: ToolKind) -> Option<u64> {
    let offset = ToolKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or_default() as u64;
    seed.map(|s| s.wrapping_add(offset))
}

fn shared<T: surveycore::SurveyTool>(
    params: T::Params,
    seed: Option<u64>,
    metrics: &Arc<MetricsRecorder>,
) -> SharedHandle {
    let session: Box<dyn ToolHandle> =
        Box::new(Session::<T>::new(params, tool_seed(seed, T::KIND), metrics.clone()));
    Arc::new(Mutex::new(session))
}

/// Builds all six sessions. A configured seed makes every tool reproducible
/// while still giving each its own stream.
pub fn build_workbench(defaults: &ToolDefaults, seed: Option<u64>) -> Workbench {
    let metrics = Arc::new(MetricsRecorder::new());
    let sessions = HashMap::from([
        (
            ToolKind::Resistivity,
            shared::<Resistivity>(defaults.resistivity.clone(), seed, &metrics),
        ),
        (
            ToolKind::Gpr,
            shared::<Gpr>(defaults.gpr.clone(), seed, &metrics),
        ),
        (
            ToolKind::Gravity,
            shared::<Gravity>(defaults.gravity.clone(), seed, &metrics),
        ),
        (
            ToolKind::Seismic,
            shared::<Seismic>(defaults.seismic.clone(), seed, &metrics),
        ),
        (
            ToolKind::RemoteSensing,
            shared::<RemoteSensing>(defaults.remote_sensing.clone(), seed, &metrics),
        ),
        (
            ToolKind::Earthquake,
            shared::<Earthquake>(defaults.earthquake.clone(), seed, &metrics),
        ),
    ]);
    Workbench { sessions, metrics }
}

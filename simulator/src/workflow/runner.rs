use crate::interpret::InterpretationClient;
use crate::workflow::config::WorkflowConfig;
use crate::workflow::session::{SharedHandle, ToolHandle};
use anyhow::anyhow;
use log::warn;
use std::sync::MutexGuard;
use std::time::Duration;
use surveycore::ingest::FileUpload;
use surveycore::prelude::{SurveyError, SurveyResult};

/// Performs the side effects of a tool action. Session locks are only held
/// between suspension points, never across them.
#[derive(Clone)]
pub struct Runner {
    delay: Duration,
    client: InterpretationClient,
}

fn lock(handle: &SharedHandle) -> anyhow::Result<MutexGuard<'_, Box<dyn ToolHandle>>> {
    handle
        .lock()
        .map_err(|_| anyhow!("tool session lock poisoned"))
}

impl Runner {
    pub fn new(delay: Duration, client: InterpretationClient) -> Self {
        Self { delay, client }
    }

    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self::new(
            Duration::from_millis(config.simulation_delay_ms),
            InterpretationClient::from_config(&config.interpretation),
        )
    }

    /// Begin, wait out the artificial delay, then generate and publish.
    pub async fn simulate(&self, handle: &SharedHandle) -> anyhow::Result<()> {
        let epoch = lock(handle)?.begin_simulation();
        tokio::time::sleep(self.delay).await;
        lock(handle)?.finish_simulation(epoch);
        Ok(())
    }

    /// The returned user error is also recorded on the view.
    pub fn upload(
        &self,
        handle: &SharedHandle,
        upload: FileUpload<'_>,
    ) -> anyhow::Result<SurveyResult<()>> {
        Ok(lock(handle)?.upload(upload))
    }

    pub async fn interpret(&self, handle: &SharedHandle) -> anyhow::Result<()> {
        let request = lock(handle)?.begin_interpretation();
        let Some((epoch, prompt)) = request else {
            return Ok(());
        };
        let result = self.client.interpret(&prompt).await.map_err(|err| {
            warn!("interpretation request failed: {:#}", err);
            SurveyError::InterpretationUnavailable
        });
        lock(handle)?.finish_interpretation(epoch, result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_workbench, ToolDefaults};
    use serde_json::json;
    use surveycore::prelude::{ToolKind, UploadKind};
    use surveycore::view::Pending;
    use warp::Filter;

    fn runner(endpoint: String) -> Runner {
        Runner::new(Duration::from_millis(5), InterpretationClient::new(endpoint, None))
    }

    #[tokio::test]
    async fn simulate_publishes_after_the_delay() {
        let bench = build_workbench(&ToolDefaults::default(), Some(1));
        let handle = bench.session(ToolKind::Gpr).unwrap();
        runner("http://127.0.0.1:9/unused".into())
            .simulate(&handle)
            .await
            .unwrap();
        let snapshot = handle.lock().unwrap().snapshot(false);
        assert_eq!(snapshot.point_count, 40 * 64);
        assert_eq!(snapshot.pending, Pending::Idle);
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_generic_message() {
        let bench = build_workbench(&ToolDefaults::default(), Some(2));
        let handle = bench.session(ToolKind::Resistivity).unwrap();
        let runner = runner("http://127.0.0.1:9/unreachable".into());
        runner.simulate(&handle).await.unwrap();
        runner.interpret(&handle).await.unwrap();
        let snapshot = handle.lock().unwrap().snapshot(false);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("interpretation service unavailable; please try again")
        );
        assert_eq!(bench.metrics().snapshot().errors, 1);
    }

    #[tokio::test]
    async fn interpretation_text_is_shown_verbatim() {
        let route = warp::post().map(|| {
            warp::reply::json(&json!({"candidates": [{"content": {"parts": [{"text": "Likely a buried channel."}]}}]}))
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let bench = build_workbench(&ToolDefaults::default(), Some(3));
        let handle = bench.session(ToolKind::Gravity).unwrap();
        let runner = runner(format!("http://{}/", addr));
        runner.simulate(&handle).await.unwrap();
        runner.interpret(&handle).await.unwrap();
        let snapshot = handle.lock().unwrap().snapshot(false);
        assert_eq!(snapshot.interpretation.as_deref(), Some("Likely a buried channel."));
        assert_eq!(bench.metrics().snapshot().interpretations, 1);
    }

    #[test]
    fn upload_errors_stay_user_facing() {
        let bench = build_workbench(&ToolDefaults::default(), None);
        let handle = bench.session(ToolKind::Resistivity).unwrap();
        let outcome = runner("http://127.0.0.1:9/".into())
            .upload(&handle, FileUpload::csv("x,y,z\n0,0,10\n1,1,bad\n", UploadKind::Survey))
            .unwrap();
        assert!(matches!(
            outcome,
            Err(SurveyError::MalformedRow { line: 3, .. })
        ));
        assert_eq!(handle.lock().unwrap().snapshot(false).point_count, 0);
    }
}

use crate::generator::profile::Workbench;
use crate::gui_bridge::model::ToolSnapshot;
use crate::workflow::runner::Runner;
use crate::workflow::session::SharedHandle;
use anyhow::Context;
use log::{debug, error, info};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use surveycore::ingest::FileUpload;
use surveycore::prelude::{ToolKind, UploadKind};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::{self, Response};
use warp::{Filter, Rejection, Reply};

#[derive(Debug, Default, Deserialize)]
struct ModeQuery {
    #[serde(default)]
    mode: UploadKind,
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotQuery {
    #[serde(default)]
    points: bool,
}

/// HTTP surface over the workbench: one JSON snapshot per tool plus the
/// simulate/upload/interpret/reset/export actions.
#[derive(Clone)]
pub struct GuiBridge {
    workbench: Arc<Workbench>,
    runner: Runner,
}

fn internal(err: anyhow::Error) -> Response {
    error!("bridge failure: {:#}", err);
    reply::with_status(
        reply::json(&json!({"error": "internal error"})),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .into_response()
}

fn snapshot(handle: &SharedHandle, with_points: bool) -> Response {
    match handle.lock() {
        Ok(session) => reply::json(&session.snapshot(with_points)).into_response(),
        Err(_) => internal(anyhow::anyhow!("tool session lock poisoned")),
    }
}

impl GuiBridge {
    pub fn new(workbench: Arc<Workbench>, runner: Runner) -> Self {
        Self { workbench, runner }
    }

    fn session(&self, kind: ToolKind) -> Result<SharedHandle, Rejection> {
        self.workbench.session(kind).ok_or_else(warp::reject::not_found)
    }

    pub fn routes(&self) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
        let bridge = self.clone();
        let with_bridge = warp::any().map(move || bridge.clone());

        let list = warp::path!("tools")
            .and(warp::get())
            .and(with_bridge.clone())
            .map(|bridge: GuiBridge| {
                let snapshots: Vec<ToolSnapshot> = ToolKind::ALL
                    .iter()
                    .filter_map(|kind| bridge.workbench.session(*kind))
                    .filter_map(|handle| handle.lock().ok().map(|s| s.snapshot(false)))
                    .collect();
                reply::json(&snapshots).into_response()
            });

        let show = warp::path!("tools" / ToolKind)
            .and(warp::get())
            .and(warp::query::<SnapshotQuery>())
            .and(with_bridge.clone())
            .and_then(|kind: ToolKind, query: SnapshotQuery, bridge: GuiBridge| async move {
                let handle = bridge.session(kind)?;
                Ok::<_, Rejection>(snapshot(&handle, query.points))
            });

        let parameters = warp::path!("tools" / ToolKind / "parameters")
            .and(warp::put())
            .and(warp::body::json())
            .and(with_bridge.clone())
            .and_then(
                |kind: ToolKind, params: serde_json::Value, bridge: GuiBridge| async move {
                    let handle = bridge.session(kind)?;
                    if let Ok(mut session) = handle.lock() {
                        if let Err(err) = session.update_parameters(params) {
                            debug!("{} parameters rejected: {}", kind, err);
                        }
                    }
                    Ok::<_, Rejection>(snapshot(&handle, false))
                },
            );

        let simulate = warp::path!("tools" / ToolKind / "simulate")
            .and(warp::post())
            .and(with_bridge.clone())
            .and_then(|kind: ToolKind, bridge: GuiBridge| async move {
                let handle = bridge.session(kind)?;
                Ok::<_, Rejection>(match bridge.runner.simulate(&handle).await {
                    Ok(()) => snapshot(&handle, true),
                    Err(err) => internal(err),
                })
            });

        let upload = warp::path!("tools" / ToolKind / "upload")
            .and(warp::post())
            .and(warp::query::<ModeQuery>())
            .and(warp::header::optional::<String>("content-type"))
            .and(warp::body::bytes())
            .and(with_bridge.clone())
            .and_then(
                |kind: ToolKind, query: ModeQuery,
                 mime: Option<String>,
                 body: Bytes,
                 bridge: GuiBridge| async move {
                    let handle = bridge.session(kind)?;
                    // an empty body means no file was attached
                    let upload = FileUpload {
                        content: (!body.is_empty()).then_some(&body[..]),
                        mime: mime.as_deref(),
                        kind: query.mode,
                    };
                    Ok::<_, Rejection>(match bridge.runner.upload(&handle, upload) {
                        Ok(_) => snapshot(&handle, true),
                        Err(err) => internal(err),
                    })
                },
            );

        let interpret = warp::path!("tools" / ToolKind / "interpret")
            .and(warp::post())
            .and(with_bridge.clone())
            .and_then(|kind: ToolKind, bridge: GuiBridge| async move {
                let handle = bridge.session(kind)?;
                Ok::<_, Rejection>(match bridge.runner.interpret(&handle).await {
                    Ok(()) => snapshot(&handle, false),
                    Err(err) => internal(err),
                })
            });

        let reset = warp::path!("tools" / ToolKind / "reset")
            .and(warp::post())
            .and(with_bridge.clone())
            .and_then(|kind: ToolKind, bridge: GuiBridge| async move {
                let handle = bridge.session(kind)?;
                if let Ok(mut session) = handle.lock() {
                    session.reset();
                }
                Ok::<_, Rejection>(snapshot(&handle, false))
            });

        let export = warp::path!("tools" / ToolKind / "export")
            .and(warp::get())
            .and(warp::query::<ModeQuery>())
            .and(with_bridge.clone())
            .and_then(|kind: ToolKind, query: ModeQuery, bridge: GuiBridge| async move {
                let handle = bridge.session(kind)?;
                let exported = match handle.lock() {
                    Ok(session) => session.export(query.mode),
                    Err(_) => {
                        return Ok::<_, Rejection>(internal(anyhow::anyhow!(
                            "tool session lock poisoned"
                        )))
                    }
                };
                Ok(match exported {
                    Ok(csv) => reply::with_header(csv, "content-type", "text/csv").into_response(),
                    Err(err) => reply::with_status(
                        reply::json(&json!({"error": err.to_string()})),
                        StatusCode::UNPROCESSABLE_ENTITY,
                    )
                    .into_response(),
                })
            });

        let metrics = warp::path!("metrics")
            .and(warp::get())
            .and(with_bridge)
            .map(|bridge: GuiBridge| reply::json(&bridge.workbench.metrics().snapshot()).into_response());

        list.or(show)
            .unify()
            .or(parameters)
            .unify()
            .or(simulate)
            .unify()
            .or(upload)
            .unify()
            .or(interpret)
            .unify()
            .or(reset)
            .unify()
            .or(export)
            .unify()
            .or(metrics)
            .unify()
    }

    /// Serves until `shutdown` resolves.
    pub async fn serve(
        &self,
        addr: SocketAddr,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let routes = self.routes().recover(|rejection: Rejection| async move {
            let status = if rejection.is_not_found() {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::BAD_REQUEST
            };
            Ok::<_, Infallible>(reply::with_status(
                reply::json(&json!({"error": status.canonical_reason().unwrap_or("error")})),
                status,
            ))
        });
        let (bound, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .with_context(|| format!("binding survey bridge to {}", addr))?;
        info!("survey bridge listening on http://{}", bound);
        server.await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_workbench, ToolDefaults};
    use crate::interpret::InterpretationClient;
    use serde_json::Value;
    use std::time::Duration;

    fn bridge() -> GuiBridge {
        let workbench = Arc::new(build_workbench(&ToolDefaults::default(), Some(11)));
        let runner = Runner::new(
            Duration::from_millis(1),
            InterpretationClient::new("http://127.0.0.1:9/", None),
        );
        GuiBridge::new(workbench, runner)
    }

    fn body(res: &warp::http::Response<Bytes>) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn lists_all_tools() {
        let res = warp::test::request()
            .path("/tools")
            .reply(&bridge().routes())
            .await;
        assert_eq!(res.status(), 200);
        let tools = body(&res);
        assert_eq!(tools.as_array().map(Vec::len), Some(6));
        assert_eq!(tools[4]["tool"], "remote-sensing");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let res = warp::test::request()
            .path("/tools/magnetics")
            .reply(&bridge().routes())
            .await;
        assert_eq!(res.status(), 404);
    }

    #[tokio::test]
    async fn simulate_then_export() {
        let routes = bridge().routes();
        let res = warp::test::request()
            .method("POST")
            .path("/tools/resistivity/simulate")
            .reply(&routes)
            .await;
        let snapshot = body(&res);
        assert_eq!(snapshot["point_count"], 192);
        assert_eq!(snapshot["origin"], "simulated");
        assert_eq!(snapshot["points"].as_array().map(Vec::len), Some(192));

        let res = warp::test::request()
            .path("/tools/resistivity/export")
            .reply(&routes)
            .await;
        assert_eq!(res.headers()["content-type"], "text/csv");
        assert!(res.body().starts_with(b"position,depth,resistivity\n"));
    }

    #[tokio::test]
    async fn bad_csv_reports_line_and_keeps_view_empty() {
        let routes = bridge().routes();
        let res = warp::test::request()
            .method("POST")
            .path("/tools/gpr/upload")
            .header("content-type", "text/csv")
            .body("x,y,z\n0,0,10\n1,1,bad\n")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 200);
        let snapshot = body(&res);
        assert_eq!(
            snapshot["error"],
            "line 3: column 'z' is not a finite number: 'bad'"
        );
        assert_eq!(snapshot["point_count"], 0);
    }

    #[tokio::test]
    async fn non_utf8_upload_is_rejected() {
        let res = warp::test::request()
            .method("POST")
            .path("/tools/resistivity/upload")
            .header("content-type", "text/csv")
            .body(&b"x,y,\xffz\n0,0,1\n"[..])
            .reply(&bridge().routes())
            .await;
        let snapshot = body(&res);
        assert_eq!(
            snapshot["error"],
            "the uploaded file is not UTF-8 text (invalid byte at offset 4)"
        );
        assert_eq!(snapshot["point_count"], 0);
    }

    #[tokio::test]
    async fn upload_without_body_is_missing_file() {
        let res = warp::test::request()
            .method("POST")
            .path("/tools/seismic/upload?mode=model")
            .header("content-type", "text/csv")
            .reply(&bridge().routes())
            .await;
        assert_eq!(body(&res)["error"], "no file selected");
    }

    #[tokio::test]
    async fn parameters_are_clamped() {
        let routes = bridge().routes();
        let res = warp::test::request()
            .method("PUT")
            .path("/tools/earthquake/parameters")
            .json(&json!({"points": 0, "min_magnitude": 3.0}))
            .reply(&routes)
            .await;
        let snapshot = body(&res);
        assert_eq!(snapshot["parameters"]["points"], 1);
        assert_eq!(snapshot["parameters"]["max_magnitude"], 6.0);
        assert_eq!(snapshot["expected_points"], 1);
    }

    #[tokio::test]
    async fn interpret_without_data_and_metrics() {
        let routes = bridge().routes();
        let res = warp::test::request()
            .method("POST")
            .path("/tools/gravity/interpret")
            .reply(&routes)
            .await;
        assert_eq!(
            body(&res)["error"],
            "no data loaded; simulate or upload a dataset first"
        );

        let res = warp::test::request().path("/metrics").reply(&routes).await;
        assert_eq!(body(&res)["errors"], 1);
    }

    #[tokio::test]
    async fn export_of_empty_tool_is_unprocessable() {
        let res = warp::test::request()
            .path("/tools/gravity/export")
            .reply(&bridge().routes())
            .await;
        assert_eq!(res.status(), 422);
    }
}

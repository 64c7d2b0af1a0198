//! Server-Sent Events stream replaying generated code line by line.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use etlgen::core::typewriter::code_lines;
use futures::stream::Stream;
use serde::Serialize;
use tracing::{debug, warn};

use crate::routes::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinePayload {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Serialize)]
struct DonePayload<'a> {
    run_id: &'a str,
    line_count: usize,
}

/// Payloads for each `line` event, in display order.
///
/// Sent as JSON so lines with carriage returns or leading whitespace survive
/// the SSE framing intact.
pub fn line_payloads(code: &str) -> Vec<LinePayload> {
    code_lines(code)
        .into_iter()
        .enumerate()
        .map(|(index, text)| LinePayload {
            index,
            text: text.to_string(),
        })
        .collect()
}

/// GET /api/runs/:run_id/code - `line` events with the configured delay, then `done`.
pub async fn code_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let run = state
        .get_run(&run_id)
        .await
        .ok_or_else(|| ApiError::not_found(&run_id))?;
    let delay = state.animation_delay();
    let lines = line_payloads(&run.code);
    debug!(run_id = %run.run_id, lines = lines.len(), "streaming code");

    let stream = async_stream::stream! {
        let line_count = lines.len();
        for (position, line) in lines.into_iter().enumerate() {
            if position > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match Event::default().event("line").json_data(&line) {
                Ok(event) => {
                    yield Ok(event);
                }
                Err(err) => warn!(error = %err, "failed to encode code line"),
            }
        }

        let done = DonePayload {
            run_id: &run.run_id,
            line_count,
        };
        match Event::default().event("done").json_data(&done) {
            Ok(event) => {
                yield Ok(event);
            }
            Err(err) => warn!(error = %err, "failed to encode done event"),
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use etlgen::io::pipeline::{PipelineRequest, run_pipeline};
    use etlgen::test_support::{ScriptedGenerator, TestWorkspace, sh_config};

    use crate::state::RunRecord;

    /// `(event, data)` pairs of a complete SSE body, keep-alive comments skipped.
    fn parse_events(body: &str) -> Vec<(String, String)> {
        body.split("\n\n")
            .filter_map(|frame| {
                let mut event = None;
                let mut data = None;
                for line in frame.lines() {
                    let field = |prefix: &str| {
                        line.strip_prefix(prefix)
                            .map(|value| value.strip_prefix(' ').unwrap_or(value).to_string())
                    };
                    if let Some(name) = field("event:") {
                        event = Some(name);
                    } else if let Some(value) = field("data:") {
                        data = Some(value);
                    }
                }
                Some((event?, data.unwrap_or_default()))
            })
            .collect()
    }

    #[tokio::test]
    async fn stream_emits_every_line_then_done() {
        let workspace = TestWorkspace::new().expect("workspace");
        let state = AppState::new(
            workspace.path().to_path_buf(),
            sh_config(),
            Arc::new(ScriptedGenerator::new(Vec::new())),
        );
        let code = "echo one\n\n  echo two";
        let request = PipelineRequest::from_config(&state.base_dir, &state.config);
        let outcome = run_pipeline(&request, code).expect("pipeline");
        let run = state
            .record_run(RunRecord::new(code.to_string(), outcome))
            .await;

        let sse = code_handler(State(state), Path(run.run_id.clone()))
            .await
            .expect("handler");
        let response = sse.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let events = parse_events(&String::from_utf8_lossy(&bytes));

        let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["line", "line", "line", "done"]);

        let texts: Vec<String> = events[..3]
            .iter()
            .map(|(_, data)| {
                let value: serde_json::Value = serde_json::from_str(data).expect("line json");
                value["text"].as_str().expect("text").to_string()
            })
            .collect();
        assert_eq!(texts, vec!["echo one", "", "  echo two"]);

        let done: serde_json::Value = serde_json::from_str(&events[3].1).expect("done json");
        assert_eq!(done["run_id"], run.run_id.as_str());
        assert_eq!(done["line_count"], 3);
    }

    #[tokio::test]
    async fn unknown_run_is_not_found() {
        let workspace = TestWorkspace::new().expect("workspace");
        let state = AppState::new(
            workspace.path().to_path_buf(),
            sh_config(),
            Arc::new(ScriptedGenerator::new(Vec::new())),
        );
        let Err(err) = code_handler(State(state), Path("missing".to_string())).await else {
            panic!("expected missing run to be rejected");
        };
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn payloads_follow_code_lines() {
        let payloads = line_payloads("\n  import os\n\nprint(1)\n");
        assert_eq!(
            payloads,
            vec![
                LinePayload {
                    index: 0,
                    text: "import os".to_string()
                },
                LinePayload {
                    index: 1,
                    text: String::new()
                },
                LinePayload {
                    index: 2,
                    text: "print(1)".to_string()
                },
            ]
        );
    }

    #[test]
    fn payload_serializes_carriage_returns_escaped() {
        let json = serde_json::to_string(&LinePayload {
            index: 0,
            text: "a\r".to_string(),
        })
        .expect("json");
        assert_eq!(json, r#"{"index":0,"text":"a\r"}"#);
    }
}

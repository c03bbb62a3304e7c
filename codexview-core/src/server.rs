//! HTTP surface: two read-only HTML views over an already-loaded log.
//!
//! - GET /, /index.html   timeline of rendered entries
//! - GET /run_code_log.html  captured uploads and their synthetic git history
//!
//! Only GET is served; HEAD and every other method get 405.
//!
//! The upload view shells out to git, so it runs on the blocking pool; every
//! request builds its own throwaway repository.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::{Result, ViewerError};
use crate::page::{TIMELINE_ROUTE, UPLOADS_ROUTE};
use crate::revision::HistoryBuilder;
use crate::service::{self, LoadedLog};

pub struct AppState {
    pub log: LoadedLog,
    pub upload_function: String,
    pub history: Arc<dyn HistoryBuilder>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(timeline_handler).head(head_not_allowed))
        .route(TIMELINE_ROUTE, get(timeline_handler).head(head_not_allowed))
        .route(UPLOADS_ROUTE, get(uploads_handler).head(head_not_allowed))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ViewerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!(%addr, "listening");
    Ok(listener)
}

/// Serve on an already-bound listener until Ctrl+C.
pub async fn serve(state: Arc<AppState>, listener: TcpListener) -> Result<()> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .map_err(ViewerError::Serve)
}

async fn timeline_handler(State(state): State<Arc<AppState>>) -> Response {
    info!(route = TIMELINE_ROUTE, entries = state.log.entries.len(), "GET");
    html_page(service::render_timeline(&state.log))
}

async fn uploads_handler(State(state): State<Arc<AppState>>) -> Response {
    info!(route = UPLOADS_ROUTE, "GET");
    let rendered = tokio::task::spawn_blocking(move || {
        service::render_upload_report(&state.log, &state.upload_function, state.history.as_ref())
    })
    .await;

    match rendered {
        Ok(page) => html_page(page),
        Err(err) => {
            error!(error = %err, "upload report task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

fn html_page(page: String) -> Response {
    let length = page.len();
    ([(header::CONTENT_LENGTH, length.to_string())], Html(page)).into_response()
}

// axum answers HEAD through the GET handler unless HEAD has its own endpoint.
async fn head_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET")],
        "Method Not Allowed",
    )
}

async fn not_found_handler(uri: Uri) -> (StatusCode, &'static str) {
    info!(path = %uri.path(), "not found");
    (StatusCode::NOT_FOUND, "Not Found")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::model::{DiffEntry, UploadSnapshot};
    use crate::revision::{HistoryBuilder, RevisionBuildError};
    use crate::error::ViewerError;
    use crate::server::{AppState, bind, build_router};
    use crate::service::LoadedLog;
    use crate::upload::DEFAULT_UPLOAD_FUNCTION;

    struct StaticHistory;

    impl HistoryBuilder for StaticHistory {
        fn build_history(
            &self,
            snapshots: &[UploadSnapshot],
        ) -> Result<Vec<DiffEntry>, RevisionBuildError> {
            Ok(snapshots
                .iter()
                .map(|snapshot| DiffEntry {
                    label: format!("0000000 · upload {}", snapshot.index),
                    diff: format!("+{}", snapshot.code),
                })
                .collect())
        }
    }

    struct BrokenHistory;

    impl HistoryBuilder for BrokenHistory {
        fn build_history(
            &self,
            _snapshots: &[UploadSnapshot],
        ) -> Result<Vec<DiffEntry>, RevisionBuildError> {
            Err(RevisionBuildError::Spawn {
                command: "git init".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "git not installed"),
            })
        }
    }

    fn state(history: Arc<dyn HistoryBuilder>) -> Arc<AppState> {
        let user = r#"{"type":"event_msg","timestamp":"t1","payload":{"type":"user_message","kind":"plain","message":"hi"}}"#;
        let upload = format!(
            r#"{{"type":"response_item","timestamp":"t2","payload":{{"type":"function_call","name":"{DEFAULT_UPLOAD_FUNCTION}","arguments":{{"code":"int main;","flags":["-O2"]}}}}}}"#
        );
        let raw = format!("{user}\n{upload}\n");
        Arc::new(AppState {
            log: LoadedLog::from_raw("/tmp/session.jsonl", &raw),
            upload_function: DEFAULT_UPLOAD_FUNCTION.to_string(),
            history,
        })
    }

    async fn fetch(
        state: Arc<AppState>,
        path: &str,
    ) -> (StatusCode, Option<String>, String, Option<usize>) {
        let req = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request");
        let resp = build_router(state).oneshot(req).await.expect("response");
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let content_length = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body");
        (
            status,
            content_type,
            String::from_utf8(body.to_vec()).expect("utf-8 body"),
            content_length,
        )
    }

    #[tokio::test]
    async fn root_and_index_serve_the_timeline() {
        for path in ["/", "/index.html"] {
            let (status, content_type, body, content_length) =
                fetch(state(Arc::new(StaticHistory)), path).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8"));
            assert_eq!(content_length, Some(body.len()));
            assert!(body.contains("Conversation Viewer"));
            assert!(body.contains("Event · user_message"));
        }
    }

    #[tokio::test]
    async fn upload_route_serves_history() {
        let (status, content_type, body, _) =
            fetch(state(Arc::new(StaticHistory)), "/run_code_log.html").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert!(body.contains("Captured uploads (1)"));
        assert!(body.contains("0000000 · upload 1"));
    }

    #[tokio::test]
    async fn failing_history_degrades_to_banner() {
        let (status, _, body, _) = fetch(state(Arc::new(BrokenHistory)), "/run_code_log.html").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("error-banner"));
        assert!(body.contains("git not installed"));
        assert!(body.contains("Captured uploads (1)"));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (status, _, _, _) = fetch(state(Arc::new(StaticHistory)), "/favicon.ico").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_get_methods_are_rejected() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/index.html")
            .body(Body::empty())
            .expect("request");
        let resp = build_router(state(Arc::new(StaticHistory)))
            .oneshot(req)
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn head_is_rejected_on_every_view() {
        for path in ["/", "/index.html", "/run_code_log.html"] {
            let req = Request::builder()
                .method(Method::HEAD)
                .uri(path)
                .body(Body::empty())
                .expect("request");
            let resp = build_router(state(Arc::new(StaticHistory)))
                .oneshot(req)
                .await
                .expect("response");
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{path}");
            assert_eq!(
                resp.headers()
                    .get(header::ALLOW)
                    .and_then(|value| value.to_str().ok()),
                Some("GET")
            );
        }
    }

    #[tokio::test]
    async fn bind_reports_occupied_address() {
        let holder = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = holder.local_addr().expect("addr").to_string();

        let err = bind(&addr).await.expect_err("must fail");
        assert!(matches!(err, ViewerError::Bind { .. }));
        assert!(err.to_string().starts_with(&format!("failed to bind {addr}")));
    }
}

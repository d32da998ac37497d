//! Axum routes over the request pipeline.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use tracing::error;

use super::SERVER_TARGET;
use crate::health::HealthReporter;
use crate::pipeline::{Pipeline, Reply, ReplyBody};

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    reporter: Arc<dyn HealthReporter>,
}

#[derive(Debug, Clone, Copy)]
enum Route {
    Liveness,
    Check,
    RunTask,
    ExecuteCatalog,
}

impl Route {
    const fn path(self) -> &'static str {
        match self {
            Self::Liveness => "/",
            Self::Check => "/check",
            Self::RunTask => "/run_task",
            Self::ExecuteCatalog => "/execute_catalog",
        }
    }
}

/// Builds the service router.
pub fn router(pipeline: Arc<Pipeline>, reporter: Arc<dyn HealthReporter>) -> Router {
    let state = AppState { pipeline, reporter };
    Router::new()
        .route(
            Route::Liveness.path(),
            get(|State(state): State<AppState>| dispatch(state, Route::Liveness, Bytes::new())),
        )
        .route(
            Route::Check.path(),
            post(|State(state): State<AppState>| dispatch(state, Route::Check, Bytes::new())),
        )
        .route(
            Route::RunTask.path(),
            post(|State(state): State<AppState>, body: Bytes| {
                dispatch(state, Route::RunTask, body)
            }),
        )
        .route(
            Route::ExecuteCatalog.path(),
            post(|State(state): State<AppState>, body: Bytes| {
                dispatch(state, Route::ExecuteCatalog, body)
            }),
        )
        .with_state(state)
}

async fn dispatch(state: AppState, route: Route, body: Bytes) -> Response {
    let pipeline = Arc::clone(&state.pipeline);
    let handled = tokio::task::spawn_blocking(move || match route {
        Route::Liveness => pipeline.liveness(),
        Route::Check => pipeline.check(),
        Route::RunTask => pipeline.run_task(&body),
        Route::ExecuteCatalog => pipeline.execute_catalog(&body),
    })
    .await;

    let reply = handled.unwrap_or_else(|join_error| {
        error!(
            target: SERVER_TARGET,
            route = route.path(),
            error = %join_error,
            "request handler did not complete"
        );
        Reply {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ReplyBody::Json(json!({
                "_error": {
                    "msg": "request handler did not complete",
                    "kind": "internal_error",
                    "details": {},
                },
            })),
        }
    });
    state
        .reporter
        .request_served(route.path(), reply.status.as_u16());
    into_response(reply)
}

fn into_response(reply: Reply) -> Response {
    let content_type = [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)];
    match reply.body {
        ReplyBody::Json(value) => (reply.status, content_type, value.to_string()).into_response(),
        ReplyBody::Text(text) => (reply.status, content_type, text).into_response(),
        ReplyBody::Empty => (reply.status, content_type).into_response(),
    }
}

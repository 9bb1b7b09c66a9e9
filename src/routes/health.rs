//! Health, readiness, and version probes

use bson::doc;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
    commit: &'static str,
    built_at: &'static str,
}

/// Liveness probe - 200 whenever the process is serving
pub fn health_check() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            service: "signet",
        },
    )
}

/// Readiness probe - 200 only when MongoDB answers a ping
pub async fn readiness_check(state: Arc<AppState>) -> Response<BoxBody> {
    let ping = state
        .mongo
        .inner()
        .database(state.mongo.db_name())
        .run_command(doc! { "ping": 1 })
        .await;

    match ping {
        Ok(_) => json_response(
            StatusCode::OK,
            &HealthResponse {
                status: "ready",
                service: "signet",
            },
        ),
        Err(_) => json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &HealthResponse {
                status: "database unavailable",
                service: "signet",
            },
        ),
    }
}

/// Version info for deployment verification
pub fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            service: "signet",
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("GIT_COMMIT_SHORT"),
            built_at: env!("BUILD_TIMESTAMP"),
        },
    )
}

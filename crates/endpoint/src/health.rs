use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::EndpointState;

/// `GET /healthz` response body
#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `ok` while at least one upstream subscription is live, else `degraded`
    pub status: &'static str,
    pub viewers: usize,
    pub upstream: usize,
}

pub async fn healthz(State(state): State<EndpointState>) -> Json<HealthReport> {
    let upstream = state
        .upstream
        .as_ref()
        .map(|u| u.live_handles())
        .unwrap_or(0);

    Json(HealthReport {
        status: if upstream > 0 { "ok" } else { "degraded" },
        viewers: state.broadcaster.len(),
        upstream,
    })
}

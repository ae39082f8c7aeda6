//! Local status API served while a session is running.
//!
//! Provides HTTP endpoints for:
//! - Join status (GET /status)
//! - Roster snapshot (GET /roster)

pub mod routes;

use crate::meeting::JoinStatusHandle;
use crate::roster::RosterHandle;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::info;

pub use routes::meeting::MeetingApiState;

pub struct ApiServer {
    port: u16,
    state: MeetingApiState,
}

impl ApiServer {
    pub fn new(status: JoinStatusHandle, roster: RosterHandle, port: u16) -> Self {
        Self {
            port,
            state: MeetingApiState { status, roster },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(service_info))
            .merge(routes::meeting::router(self.state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /        - Service info");
        info!("  GET  /status  - Current join status");
        info!("  GET  /roster  - Roster snapshot");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "rollcall",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

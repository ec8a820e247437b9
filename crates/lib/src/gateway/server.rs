//! Interaction endpoint HTTP server.

use crate::config::VerificationSecret;
use crate::gateway::action::InteractionAction;
use crate::gateway::protocol::decode_payload;
use crate::gateway::verify::verify_token;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const INTERACTION_PATH: &str = "/interaction";

/// Read-only state shared by every request.
#[derive(Clone)]
pub struct GatewayState {
    pub verification: Arc<VerificationSecret>,
    pub action: Arc<dyn InteractionAction>,
}

impl GatewayState {
    pub fn new(verification: VerificationSecret, action: Arc<dyn InteractionAction>) -> Self {
        Self {
            verification: Arc::new(verification),
            action,
        }
    }
}

/// Router with the single interaction route. Other methods on it get 405.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(INTERACTION_PATH, post(interaction))
        .with_state(state)
}

/// A bound but not yet serving endpoint.
pub struct Gateway {
    listener: TcpListener,
    state: GatewayState,
}

/// Bind the listener. Failing here is a startup error.
pub async fn bind_gateway(bind: &str, port: u16, state: GatewayState) -> Result<Gateway> {
    let bind_addr = format!("{}:{}", bind, port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("interaction endpoint listening on {}", bind_addr);
    Ok(Gateway { listener, state })
}

impl Gateway {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("reading listener address")
    }

    /// Serve until `shutdown` completes, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .context("interaction endpoint exited")?;
        log::info!("interaction endpoint stopped");
        Ok(())
    }
}

/// POST /interaction: decode, verify the token, then forward and acknowledge.
async fn interaction(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let payload = match decode_payload(content_type, &body) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("interaction: rejecting body: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if !verify_token(&state.verification, &payload.token) {
        log::warn!("interaction: verification token mismatch");
        return StatusCode::FORBIDDEN.into_response();
    }
    match state.action.on_interaction(&payload).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => {
            log::error!("interaction: action failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

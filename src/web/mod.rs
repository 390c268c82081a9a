//! HTTP API for submitting and tracking scans.
//!
//! ## Endpoints
//!
//! - `POST /api/scans` - submit a scan; admission-checked before the
//!   engine is touched, answers 202 with the created record
//! - `GET /api/scans` - the caller's scans, newest first
//! - `GET /api/scans/{id}` - one scan, owner-scoped
//! - `GET /api/limits` - remaining submission quota for the caller
//! - `GET /health` - liveness
//!
//! The upstream auth layer forwards the authenticated user id in the
//! `X-Scand-User` header; without it a caller is known only by socket
//! address, which is enough for rate limiting but not for owning jobs.

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::context::AppContext;
use crate::core::models::{ScanJob, ScanKind, ScanParams};
use crate::core::admission::QuotaStatus;
use crate::error::ScanError;
use crate::identity::Principal;

pub const USER_HEADER: &str = "x-scand-user";

/// HTTP server for the scan API.
pub struct WebServer {
    bind_addr: SocketAddr,
    ctx: AppContext,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebServer {
    pub fn new(ctx: AppContext, bind_addr: SocketAddr) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            bind_addr,
            ctx,
            shutdown_tx,
        }
    }

    /// Start the server. Runs until shutdown() is called.
    pub async fn start(&self) -> anyhow::Result<()> {
        let app = router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        tracing::info!(addr = %self.bind_addr, "scan API listening");

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

        Ok(())
    }

    /// Signal the server to shut down gracefully.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/scans", post(submit_scan).get(list_scans))
        .route("/api/scans/{id}", get(get_scan))
        .route("/api/limits", get(quota))
        .with_state(ctx)
}

/// Error envelope for the HTTP surface.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Scan(ScanError),
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        Self::Scan(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "authentication required".to_string(),
            ),
            Self::Scan(err @ ScanError::RateLimited { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, err.to_string())
            }
            Self::Scan(err @ ScanError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Scan(err @ ScanError::NotFound) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Scan(ScanError::Store(err)) => {
                tracing::error!(error = %err, "record store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok());

        if let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>().cloned()
        {
            return Ok(Principal::resolve(user_id, peer));
        }

        // No socket info (reverse proxy or in-process testing): only an
        // authenticated user can be identified
        match user_id {
            Some(id) if !id.trim().is_empty() => Ok(Principal::User(id.trim().to_string())),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitScanRequest {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    ports: Option<String>,
    #[serde(default)]
    wordlist: Option<String>,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "scand" }))
}

async fn submit_scan(
    State(ctx): State<AppContext>,
    who: Principal,
    Json(req): Json<SubmitScanRequest>,
) -> Result<(StatusCode, Json<ScanJob>), ApiError> {
    let Some(owner_id) = who.user_id().map(str::to_string) else {
        return Err(ApiError::Unauthorized);
    };

    let limits = &ctx.config.rate_limit;
    if limits.enabled {
        let decision = ctx
            .gate
            .allow(&who.rate_key(), limits.requests, limits.window())
            .await;
        if !decision.allowed {
            return Err(ScanError::RateLimited {
                retry_after: limits.window(),
            }
            .into());
        }
    }

    let kind = ScanKind::from_str(&req.kind)
        .ok_or_else(|| ScanError::Validation(format!("unknown scan kind: {}", req.kind)))?;
    let parameters = ScanParams {
        ports: req.ports,
        wordlist: req.wordlist,
    };

    let job = ctx
        .engine
        .submit(&owner_id, kind, &req.target, parameters)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

async fn get_scan(
    State(ctx): State<AppContext>,
    who: Principal,
    Path(id): Path<String>,
) -> Result<Json<ScanJob>, ApiError> {
    let Some(owner_id) = who.user_id() else {
        return Err(ApiError::Unauthorized);
    };

    let job = ctx.engine.get(&id, owner_id).await?;
    Ok(Json(job))
}

async fn list_scans(
    State(ctx): State<AppContext>,
    who: Principal,
) -> Result<Json<Vec<ScanJob>>, ApiError> {
    let Some(owner_id) = who.user_id() else {
        return Err(ApiError::Unauthorized);
    };

    let jobs = ctx.engine.list(owner_id).await?;
    Ok(Json(jobs))
}

async fn quota(
    State(ctx): State<AppContext>,
    who: Principal,
) -> Result<Json<QuotaStatus>, ApiError> {
    let limits = &ctx.config.rate_limit;
    let status = ctx
        .gate
        .status(&who.rate_key(), limits.requests, limits.window())
        .await
        .map_err(|err| ScanError::Store(anyhow::Error::new(err)))?;
    Ok(Json(status))
}

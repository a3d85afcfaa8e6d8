//! HTTP transport.
//!
//! The whole API surface is a single axum fallback handler: axum never
//! routes, it only feeds the verb, path, headers and body into the funnel
//! and wraps the outcome. Successful results are enveloped as
//! `{"result": ...}`, failures as `{"error": {...}}`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, Method, Uri, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::{ApiError, Funnel, RequestParts};
use crate::config::ServerConfig;
use crate::state::{BackendState, StateHandle};

pub fn build_app(funnel: Arc<Funnel>) -> axum::Router {
    axum::Router::new()
        .fallback(dispatch)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(funnel)
}

/// Bind and serve until SIGINT or SIGTERM. The state handle flips to
/// `ShuttingDown` on the first signal so in-flight connections see 503s
/// while the listener drains.
pub async fn serve(
    config: &ServerConfig,
    funnel: Arc<Funnel>,
    state: StateHandle,
) -> std::io::Result<()> {
    let app = build_app(funnel);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("server listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(state))
    .await
}

async fn dispatch(
    State(funnel): State<Arc<Funnel>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let parts = match request_parts(&headers, query, addr, &body) {
        Ok(parts) => parts,
        Err(err) => return err.into_response(),
    };

    match funnel.execute(method.as_str(), uri.path(), parts).await {
        Ok(result) => Json(json!({ "result": result })).into_response(),
        Err(err) => err.into_response(),
    }
}

fn request_parts(
    headers: &HeaderMap,
    query: HashMap<String, String>,
    addr: SocketAddr,
    body: &Bytes,
) -> Result<RequestParts, ApiError> {
    let jwt = bearer_token(headers)?;

    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body)
            .map_err(|_| ApiError::bad_request("request body is not valid JSON"))?
    };

    Ok(RequestParts {
        jwt,
        query,
        body,
        client_ip: Some(addr.ip()),
    })
}

/// The raw token from the `Authorization` header; a `Bearer` prefix is
/// accepted but not required.
fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::bad_request("authorization header is not valid UTF-8"))?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        return Ok(None);
    }
    Ok(Some(token.to_string()))
}

async fn shutdown_signal(state: StateHandle) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.set(BackendState::ShuttingDown);
    tracing::info!("shutdown signal received, draining connections");
}

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, info};

use super::ControlState;
use crate::config::{parse_document, DomainCertConfig, IpCertConfig, SystemConfig};
use crate::error::ConfigError;

/// GET /api/system
pub async fn get_system(State(state): State<ControlState>) -> Json<SystemConfig> {
    Json(state.store().system().await)
}

/// GET /api/ip
pub async fn get_ip(State(state): State<ControlState>) -> Json<IpCertConfig> {
    Json(state.store().ip().await)
}

/// GET /api/domain
pub async fn get_domain(State(state): State<ControlState>) -> Json<DomainCertConfig> {
    Json(state.store().domain().await)
}

/// POST /api/system - replace the whole document
pub async fn replace_system(State(state): State<ControlState>, body: Bytes) -> Response {
    let result = match parse_document::<SystemConfig>(&body) {
        Ok(doc) => state.store().replace_system(doc).await,
        Err(e) => Err(e),
    };
    respond("system", result)
}

/// POST /api/ip - replace the whole document
pub async fn replace_ip(State(state): State<ControlState>, body: Bytes) -> Response {
    let result = match parse_document::<IpCertConfig>(&body) {
        Ok(doc) => state.store().replace_ip(doc).await,
        Err(e) => Err(e),
    };
    respond("ip", result)
}

/// POST /api/domain - replace the whole document
pub async fn replace_domain(State(state): State<ControlState>, body: Bytes) -> Response {
    let result = match parse_document::<DomainCertConfig>(&body) {
        Ok(doc) => state.store().replace_domain(doc).await,
        Err(e) => Err(e),
    };
    respond("domain", result)
}

fn respond(name: &str, result: Result<(), ConfigError>) -> Response {
    match result {
        Ok(()) => {
            info!("Updated {} configuration", name);
            (StatusCode::OK, "ok").into_response()
        }
        Err(e) if e.is_client_error() => {
            info!("Rejected {} configuration: {}", name, e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            error!("Failed to persist {} configuration: {}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

use anyhow::Result;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::services::ServeFile;
use tracing::info;

use crate::api::{auth, documents, issue, ControlState};
use crate::config::parse_listen_addr;

/// Create the control server router with all routes
pub fn create_api_server(listen: &str, state: ControlState) -> Result<(SocketAddr, Router)> {
    let addr = parse_listen_addr(listen)?;
    let index = ServeFile::new(state.store().layout().index_page());

    let app = Router::new()
        .route_service("/", index)
        .route("/api/system", get(documents::get_system).post(documents::replace_system))
        .route("/api/ip", get(documents::get_ip).post(documents::replace_ip))
        .route("/api/domain", get(documents::get_domain).post(documents::replace_domain))
        .route("/api/ip/issue", post(issue::issue_ip))
        .route("/api/domain/issue", post(issue::issue_domain))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_admin))
        .with_state(state);

    info!("Control server configured to bind on {}", addr);

    Ok((addr, app))
}

/// Run the control server
pub async fn run_api_server(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Control server listening on {}", addr);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

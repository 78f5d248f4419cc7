use axum::extract::State;

use super::ControlState;
use crate::workflow::WorkflowKind;

/// POST /api/ip/issue - start IP issuance and acknowledge immediately
pub async fn issue_ip(State(state): State<ControlState>) -> &'static str {
    let _ = state.dispatcher().launch(WorkflowKind::Ip).await;
    "ok"
}

/// POST /api/domain/issue - start domain issuance and acknowledge immediately
pub async fn issue_domain(State(state): State<ControlState>) -> &'static str {
    let _ = state.dispatcher().launch(WorkflowKind::Domain).await;
    "ok"
}

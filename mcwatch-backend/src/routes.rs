use crate::AppState;
use crate::error::AppError;
use crate::helpers::now;
use crate::snapshot::StatusView;
use crate::validation;

use axum::{
    Json,
    extract::{Path, State},
};
use axum_macros::debug_handler;
use mcwatch_db::ServerIdentity;
use std::sync::Arc;

#[debug_handler]
pub(crate) async fn servers(State(state): State<Arc<AppState>>) -> Json<Vec<ServerIdentity>> {
    let servers = state
        .tracker
        .servers()
        .iter()
        .map(|s| ServerIdentity::new(s.host(), s.port))
        .collect();
    Json(servers)
}

#[debug_handler]
pub(crate) async fn status(
    State(state): State<Arc<AppState>>,
    Path((host, port)): Path<(String, u16)>,
) -> Result<Json<StatusView>, AppError> {
    validation::validate_hostname(&host)?;

    let identity = state
        .tracker
        .find_server(&host, port)
        .cloned()
        .ok_or_else(|| AppError::ServerNotTracked {
            hostname: host.clone(),
            port,
        })?;

    let now = now();
    let view = state.latest_view(&identity, now).await;

    Ok(Json(view.with_relative_times(now)))
}

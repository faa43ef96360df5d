//! REST API handlers
//!
//! Channel queries and control operations, forwarded one-to-one to the fleet.

use axum::extract::{Path, State};
use axum::response::Json;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use shared::{ChannelId, FleetSnapshot};

use crate::error::WebServerResult;
use crate::state::AppState;
use crate::types::{ChannelCommand, ChannelCreated, ChannelUpdate, CommandResponse, HealthResponse, NewChannel};

fn parse_channel_id(raw: &str) -> WebServerResult<ChannelId> {
    Ok(raw.parse::<ChannelId>()?)
}

/// GET /api/channels
pub async fn list_channels(State(state): State<Arc<AppState>>) -> Json<FleetSnapshot> {
    Json(state.fleet.get_all_statuses())
}

/// POST /api/channels
pub async fn create_channel(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewChannel>,
) -> WebServerResult<Json<ChannelCreated>> {
    let id = state.fleet.add_channel(request).await?;
    info!(channel = %id, "➕ Channel created via API");
    Ok(Json(ChannelCreated::new(id)))
}

/// PUT /api/channels/:id
pub async fn update_channel(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Json(update): Json<ChannelUpdate>,
) -> WebServerResult<Json<CommandResponse>> {
    let id = parse_channel_id(&raw_id)?;
    state.fleet.update_channel(id, update).await?;
    Ok(Json(CommandResponse::success(format!("Channel {} updated", id))))
}

async fn run_command(state: &AppState, raw_id: &str, command: ChannelCommand) -> WebServerResult<Json<CommandResponse>> {
    let id = parse_channel_id(raw_id)?;
    match command {
        ChannelCommand::Start => state.fleet.start_channel(id).await?,
        ChannelCommand::Stop => state.fleet.stop_channel(id).await?,
        ChannelCommand::Restart => state.fleet.restart_channel(id).await?,
    }
    info!(channel = %id, "Channel {} via API", command.past_tense());
    Ok(Json(CommandResponse::success(format!("Channel {} {}", id, command.past_tense()))))
}

/// POST /api/start/:id
pub async fn start_channel(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> WebServerResult<Json<CommandResponse>> {
    run_command(&state, &raw_id, ChannelCommand::Start).await
}

/// POST /api/stop/:id
pub async fn stop_channel(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> WebServerResult<Json<CommandResponse>> {
    run_command(&state, &raw_id, ChannelCommand::Stop).await
}

/// POST /api/restart/:id
pub async fn restart_channel(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> WebServerResult<Json<CommandResponse>> {
    run_command(&state, &raw_id, ChannelCommand::Restart).await
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().timestamp(),
        uptime_seconds: state.get_uptime_seconds(),
        channels: state.fleet.channel_ids().len(),
        connections: state.get_connection_count(),
    })
}

//! Pipeline configuration HTTP handlers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::Actor;
use crate::services::pipeline_config::{PipelineConfigService, PipelineSettings, UpdateConfigInput};
use crate::AppState;

/// Get the effective pipeline settings
pub async fn get_pipeline_config(
    State(state): State<AppState>,
) -> AppResult<Json<PipelineSettings>> {
    let service = PipelineConfigService::new(state.db);
    let settings = service.get().await?;
    Ok(Json(settings))
}

/// Replace the pipeline configuration
pub async fn update_pipeline_config(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<UpdateConfigInput>,
) -> AppResult<Json<PipelineSettings>> {
    let service = PipelineConfigService::new(state.db);
    let settings = service.update(&actor, input).await?;
    Ok(Json(settings))
}

//! Stage configuration service
//!
//! The pipeline configuration is operator-editable and therefore validated on
//! every read: malformed stored data falls back to the built-in default so
//! the pipeline keeps operating, with the fallback reported rather than
//! raised. Updates are validated strictly and never store a broken config.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use shared::{RawStageConfig, ShortagePolicy, StageConfig};

use crate::error::{AppError, AppResult};
use crate::middleware::Actor;

/// Pipeline configuration service
#[derive(Clone)]
pub struct PipelineConfigService {
    db: PgPool,
}

/// The effective pipeline settings
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSettings {
    pub stages: Vec<String>,
    pub trigger_stage: String,
    pub shortage_policy: ShortagePolicy,
    /// Default pricing margin applied when a line has no manual price.
    pub margin_default: Decimal,
    /// True when the stored configuration was malformed and the built-in
    /// default was substituted.
    pub fell_back: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for updating the pipeline configuration
#[derive(Debug, Deserialize)]
pub struct UpdateConfigInput {
    pub stages: Vec<String>,
    pub trigger_stage: String,
    #[serde(default)]
    pub shortage_policy: ShortagePolicy,
    pub margin_default: Option<Decimal>,
}

#[derive(Debug, FromRow)]
struct ConfigRow {
    stages: serde_json::Value,
    trigger_stage: String,
    shortage_policy: String,
    margin_default: Decimal,
    updated_at: DateTime<Utc>,
}

const SELECT_CONFIG: &str =
    "SELECT stages, trigger_stage, shortage_policy, margin_default, updated_at FROM pipeline_config WHERE id";

fn parse_row(row: &ConfigRow) -> (StageConfig, bool) {
    let stages: Vec<String> = serde_json::from_value(row.stages.clone()).unwrap_or_default();
    let shortage_policy = match row.shortage_policy.as_str() {
        "block" => ShortagePolicy::Block,
        _ => ShortagePolicy::Proceed,
    };
    let (config, fell_back) = StageConfig::from_raw(RawStageConfig {
        stages,
        trigger_stage: row.trigger_stage.clone(),
        shortage_policy,
    });
    if fell_back {
        tracing::warn!("stored pipeline configuration is invalid; using the built-in default");
    }
    (config, fell_back)
}

impl PipelineConfigService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Effective settings, with the fallback flag for operator visibility
    pub async fn get(&self) -> AppResult<PipelineSettings> {
        let row = sqlx::query_as::<_, ConfigRow>(SELECT_CONFIG)
            .fetch_optional(&self.db)
            .await?;

        Ok(match row {
            Some(row) => {
                let (config, fell_back) = parse_row(&row);
                PipelineSettings {
                    stages: config.stages().to_vec(),
                    trigger_stage: config.trigger_stage().to_string(),
                    shortage_policy: config.shortage_policy,
                    margin_default: row.margin_default,
                    fell_back,
                    updated_at: Some(row.updated_at),
                }
            }
            None => {
                tracing::warn!("pipeline configuration row missing; using the built-in default");
                let config = StageConfig::default();
                PipelineSettings {
                    stages: config.stages().to_vec(),
                    trigger_stage: config.trigger_stage().to_string(),
                    shortage_policy: config.shortage_policy,
                    margin_default: Decimal::new(60, 2),
                    fell_back: true,
                    updated_at: None,
                }
            }
        })
    }

    /// Validated stage configuration for pipeline decisions
    pub async fn stage_config(&self) -> AppResult<StageConfig> {
        let row = sqlx::query_as::<_, ConfigRow>(SELECT_CONFIG)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|r| parse_row(&r).0).unwrap_or_default())
    }

    /// Default pricing margin for suggested line prices
    pub async fn margin_default(&self) -> AppResult<Decimal> {
        let row = sqlx::query_as::<_, ConfigRow>(SELECT_CONFIG)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|r| r.margin_default).unwrap_or_else(|| Decimal::new(60, 2)))
    }

    /// Replace the configuration; invalid input is rejected, never stored
    pub async fn update(&self, _actor: &Actor, input: UpdateConfigInput) -> AppResult<PipelineSettings> {
        let raw = RawStageConfig {
            stages: input.stages,
            trigger_stage: input.trigger_stage,
            shortage_policy: input.shortage_policy,
        };
        let config = StageConfig::try_from_raw(&raw).map_err(|e| AppError::Validation {
            field: "stages".to_string(),
            message: e.clone(),
            message_pt: format!("Configuração de estágios inválida: {e}"),
        })?;

        if let Some(margin) = input.margin_default {
            if margin < Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "margin_default".to_string(),
                    message: "margin cannot be negative".to_string(),
                    message_pt: "A margem não pode ser negativa".to_string(),
                });
            }
        }

        sqlx::query(
            r#"
            UPDATE pipeline_config
            SET stages = $1,
                trigger_stage = $2,
                shortage_policy = $3,
                margin_default = COALESCE($4, margin_default),
                updated_at = now()
            WHERE id
            "#,
        )
        .bind(serde_json::to_value(config.stages()).map_err(anyhow::Error::from)?)
        .bind(config.trigger_stage())
        .bind(match config.shortage_policy {
            ShortagePolicy::Proceed => "proceed",
            ShortagePolicy::Block => "block",
        })
        .bind(input.margin_default)
        .execute(&self.db)
        .await?;

        self.get().await
    }
}

/// Stage configuration read inside an open transaction
///
/// Used by the order pipeline so a transition decides against the same
/// configuration for its whole transaction.
pub(crate) async fn stage_config_in_tx(
    tx: &mut Transaction<'_, Postgres>,
) -> AppResult<StageConfig> {
    let row = sqlx::query_as::<_, ConfigRow>(SELECT_CONFIG)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|r| parse_row(&r).0).unwrap_or_default())
}

/// Pricing margin read inside an open transaction
pub(crate) async fn margin_in_tx(tx: &mut Transaction<'_, Postgres>) -> AppResult<Decimal> {
    let margin = sqlx::query_scalar::<_, Decimal>("SELECT margin_default FROM pipeline_config WHERE id")
        .fetch_optional(&mut **tx)
        .await?;
    Ok(margin.unwrap_or_else(|| Decimal::new(60, 2)))
}

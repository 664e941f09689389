//! Rule and field catalog queries (read-only)

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{optional_u32_column, uuid_column};
use crate::error::decode_error;
use crate::model::{
    ConfigurationField, FieldMetadata, InputKind, ModalityMeta, RuleField, RuleType, ScoringModel,
};

/// Modality flags, or `None` when the modality is not in the catalog
pub async fn modality_meta(
    db: &SqlitePool,
    modality_id: Uuid,
) -> Result<Option<ModalityMeta>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT guid, name, rule_type, uses_heats, lane_count, allows_final_heat, is_team
        FROM modalities
        WHERE guid = ?
        "#,
    )
    .bind(modality_id.to_string())
    .fetch_optional(db)
    .await?;

    row.as_ref().map(meta_from_row).transpose()
}

fn meta_from_row(row: &SqliteRow) -> Result<ModalityMeta, sqlx::Error> {
    Ok(ModalityMeta {
        modality_id: uuid_column(row, "guid")?,
        name: row.try_get("name")?,
        rule_type: rule_type_column(row)?,
        uses_heats: row.try_get::<i64, _>("uses_heats")? != 0,
        lane_count: optional_u32_column(row, "lane_count")?,
        allows_final_heat: row.try_get::<i64, _>("allows_final_heat")? != 0,
        is_team: row.try_get::<i64, _>("is_team")? != 0,
    })
}

fn rule_type_column(row: &SqliteRow) -> Result<RuleType, sqlx::Error> {
    let text: String = row.try_get("rule_type")?;
    RuleType::from_str(&text).ok_or_else(|| decode_error("rule_type", &text))
}

/// Authored scoring model for a modality
///
/// Scoring fields come back ordered by `display_order`, then key.
pub async fn scoring_model(
    db: &SqlitePool,
    modality_id: Uuid,
) -> Result<Option<ScoringModel>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT sm.guid AS model_id, sm.rule_type,
               m.uses_heats, m.lane_count, m.allows_final_heat
        FROM scoring_models sm
        JOIN modalities m ON m.guid = sm.modality_id
        WHERE sm.modality_id = ?
        "#,
    )
    .bind(modality_id.to_string())
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        debug!(%modality_id, "No scoring model authored");
        return Ok(None);
    };

    let model_id = uuid_column(&row, "model_id")?;

    let field_rows = sqlx::query(
        r#"
        SELECT field_key, category, label, input_kind, required, display_order, metadata, value
        FROM rule_fields
        WHERE model_id = ?
        ORDER BY display_order ASC, field_key ASC
        "#,
    )
    .bind(model_id.to_string())
    .fetch_all(db)
    .await?;

    let mut scoring_fields = Vec::new();
    let mut configuration_fields = Vec::new();

    for field_row in &field_rows {
        let category: String = field_row.try_get("category")?;
        match category.as_str() {
            "scoring" => scoring_fields.push(rule_field_from_row(field_row)?),
            "configuration" => configuration_fields.push(ConfigurationField {
                key: field_row.try_get("field_key")?,
                value: field_row
                    .try_get::<Option<String>, _>("value")?
                    .unwrap_or_default(),
            }),
            other => return Err(decode_error("category", other)),
        }
    }

    debug!(
        %modality_id,
        %model_id,
        scoring = scoring_fields.len(),
        configuration = configuration_fields.len(),
        "Loaded scoring model"
    );

    Ok(Some(ScoringModel {
        model_id: Some(model_id),
        modality_id,
        rule_type: rule_type_column(&row)?,
        scoring_fields,
        configuration_fields,
        uses_heats: row.try_get::<i64, _>("uses_heats")? != 0,
        lane_count: optional_u32_column(&row, "lane_count")?,
        allows_final_heat: row.try_get::<i64, _>("allows_final_heat")? != 0,
    }))
}

fn rule_field_from_row(row: &SqliteRow) -> Result<RuleField, sqlx::Error> {
    let key: String = row.try_get("field_key")?;
    let kind_text: Option<String> = row.try_get("input_kind")?;
    let kind = kind_text
        .as_deref()
        .and_then(InputKind::from_str)
        .ok_or_else(|| decode_error("input_kind", format!("{:?} for field {}", kind_text, key)))?;
    let metadata_json: String = row.try_get("metadata")?;
    let metadata = FieldMetadata::from_json(kind, &metadata_json)
        .map_err(|e| decode_error("metadata", format!("field {}: {}", key, e)))?;

    Ok(RuleField {
        label: row.try_get("label")?,
        required: row.try_get::<i64, _>("required")? != 0,
        display_order: row.try_get("display_order")?,
        metadata,
        key,
    })
}

/// Athletes registered under a team for one event and modality
pub async fn team_roster(
    db: &SqlitePool,
    modality_id: Uuid,
    event_id: Uuid,
    team_id: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT athlete_id
        FROM team_members
        WHERE modality_id = ? AND event_id = ? AND team_id = ?
        ORDER BY athlete_id
        "#,
    )
    .bind(modality_id.to_string())
    .bind(event_id.to_string())
    .bind(team_id.to_string())
    .fetch_all(db)
    .await?;

    rows.iter().map(|r| uuid_column(r, "athlete_id")).collect()
}

//! Catalog import
//!
//! Rule models and rosters are authored outside the engine. This loads an
//! exported catalog document into the local store so the engine can read it.
//! Re-importing a modality replaces its flags, model and fields; rosters are
//! added to, never pruned.

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, ScoringError};
use crate::model::{ConfigurationField, RuleField, RuleType};

/// Exported catalog: modalities with their models, plus team rosters
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub modalities: Vec<CatalogModality>,
    #[serde(default)]
    pub teams: Vec<CatalogTeam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogModality {
    pub id: Uuid,
    pub name: String,
    pub rule_type: RuleType,
    #[serde(default)]
    pub uses_heats: bool,
    #[serde(default)]
    pub lane_count: Option<u32>,
    #[serde(default)]
    pub allows_final_heat: bool,
    #[serde(default)]
    pub is_team: bool,
    #[serde(default)]
    pub model: Option<CatalogModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogModel {
    pub id: Uuid,
    /// Defaults to the modality's rule type
    #[serde(default)]
    pub rule_type: Option<RuleType>,
    #[serde(default)]
    pub scoring_fields: Vec<RuleField>,
    #[serde(default)]
    pub configuration_fields: Vec<ConfigurationField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogTeam {
    pub team_id: Uuid,
    pub event_id: Uuid,
    pub modality_id: Uuid,
    pub athletes: Vec<Uuid>,
}

/// Counts of what an import wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub modalities: usize,
    pub models: usize,
    pub fields: usize,
    pub roster_entries: usize,
}

/// Write a catalog document in a single transaction
pub async fn import_catalog(db: &SqlitePool, doc: &CatalogDocument) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut tx = db
        .begin()
        .await
        .map_err(ScoringError::persistence("begin catalog import"))?;

    for modality in &doc.modalities {
        sqlx::query(
            r#"
            INSERT INTO modalities (guid, name, rule_type, uses_heats, lane_count, allows_final_heat, is_team)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(guid) DO UPDATE SET
                name = excluded.name,
                rule_type = excluded.rule_type,
                uses_heats = excluded.uses_heats,
                lane_count = excluded.lane_count,
                allows_final_heat = excluded.allows_final_heat,
                is_team = excluded.is_team
            "#,
        )
        .bind(modality.id.to_string())
        .bind(&modality.name)
        .bind(modality.rule_type.to_db_string())
        .bind(modality.uses_heats)
        .bind(modality.lane_count.map(i64::from))
        .bind(modality.allows_final_heat)
        .bind(modality.is_team)
        .execute(&mut *tx)
        .await
        .map_err(ScoringError::persistence(format!("import modality {}", modality.id)))?;
        summary.modalities += 1;

        let Some(model) = &modality.model else {
            continue;
        };

        sqlx::query(
            "DELETE FROM rule_fields WHERE model_id IN (SELECT guid FROM scoring_models WHERE modality_id = ?)",
        )
        .bind(modality.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(ScoringError::persistence(format!("replace fields of model {}", model.id)))?;

        sqlx::query("DELETE FROM scoring_models WHERE modality_id = ?")
            .bind(modality.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(ScoringError::persistence(format!("replace model {}", model.id)))?;

        sqlx::query("INSERT INTO scoring_models (guid, modality_id, rule_type) VALUES (?, ?, ?)")
            .bind(model.id.to_string())
            .bind(modality.id.to_string())
            .bind(model.rule_type.unwrap_or(modality.rule_type).to_db_string())
            .execute(&mut *tx)
            .await
            .map_err(ScoringError::persistence(format!("import model {}", model.id)))?;
        summary.models += 1;

        for field in &model.scoring_fields {
            sqlx::query(
                r#"
                INSERT INTO rule_fields (model_id, field_key, category, label, input_kind, required, display_order, metadata)
                VALUES (?, ?, 'scoring', ?, ?, ?, ?, ?)
                "#,
            )
            .bind(model.id.to_string())
            .bind(&field.key)
            .bind(&field.label)
            .bind(field.input_kind().to_db_string())
            .bind(field.required)
            .bind(field.display_order)
            .bind(field.metadata.to_json())
            .execute(&mut *tx)
            .await
            .map_err(ScoringError::persistence(format!("import field {}", field.key)))?;
            summary.fields += 1;
        }

        for config in &model.configuration_fields {
            sqlx::query(
                r#"
                INSERT INTO rule_fields (model_id, field_key, category, value)
                VALUES (?, ?, 'configuration', ?)
                "#,
            )
            .bind(model.id.to_string())
            .bind(&config.key)
            .bind(&config.value)
            .execute(&mut *tx)
            .await
            .map_err(ScoringError::persistence(format!("import setting {}", config.key)))?;
            summary.fields += 1;
        }
    }

    for team in &doc.teams {
        for athlete in &team.athletes {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO team_members (team_id, event_id, modality_id, athlete_id)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(team.team_id.to_string())
            .bind(team.event_id.to_string())
            .bind(team.modality_id.to_string())
            .bind(athlete.to_string())
            .execute(&mut *tx)
            .await
            .map_err(ScoringError::persistence(format!("import roster of team {}", team.team_id)))?;
            summary.roster_entries += result.rows_affected() as usize;
        }
    }

    tx.commit()
        .await
        .map_err(ScoringError::persistence("commit catalog import"))?;

    info!(
        modalities = summary.modalities,
        models = summary.models,
        fields = summary.fields,
        roster_entries = summary.roster_entries,
        "Catalog imported"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mse_common::db::init_memory_database;
    use serde_json::json;

    #[tokio::test]
    async fn test_reimport_replaces_fields() {
        let db = init_memory_database().await.unwrap();
        let modality = Uuid::new_v4();
        let first: CatalogDocument = serde_json::from_value(json!({
            "modalities": [{"id": modality, "name": "100m", "rule_type": "time",
                "model": {"id": Uuid::new_v4(), "scoring_fields": [
                    {"key": "seconds", "label": "s", "required": true, "display_order": 1,
                     "input_kind": "numeric", "metadata": {"step": 0.01}},
                    {"key": "minutes", "label": "min", "required": false, "display_order": 0,
                     "input_kind": "integer", "metadata": {}}
                ]}}]
        }))
        .unwrap();
        let second: CatalogDocument = serde_json::from_value(json!({
            "modalities": [{"id": modality, "name": "100 m", "rule_type": "time",
                "model": {"id": Uuid::new_v4(), "scoring_fields": [
                    {"key": "time", "label": "Time", "required": true, "display_order": 0,
                     "input_kind": "text", "metadata": {"result_format": "time"}}
                ]}}]
        }))
        .unwrap();

        let summary = import_catalog(&db, &first).await.unwrap();
        assert_eq!(summary.fields, 2);
        import_catalog(&db, &second).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rule_fields")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);
        let name: String = sqlx::query_scalar("SELECT name FROM modalities")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(name, "100 m");
    }

    #[tokio::test]
    async fn test_roster_import_is_additive() {
        let db = init_memory_database().await.unwrap();
        let athlete = Uuid::new_v4();
        let doc: CatalogDocument = serde_json::from_value(json!({
            "teams": [{"team_id": Uuid::new_v4(), "event_id": Uuid::new_v4(),
                       "modality_id": Uuid::new_v4(), "athletes": [athlete, athlete]}]
        }))
        .unwrap();

        let summary = import_catalog(&db, &doc).await.unwrap();
        assert_eq!(summary.roster_entries, 1);
    }
}

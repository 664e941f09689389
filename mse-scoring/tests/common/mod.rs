//! Shared fixtures: a database seeded with a small catalog

#![allow(dead_code)]

use mse_common::db::{init_database, init_memory_database};
use mse_scoring::db::import::{import_catalog, CatalogDocument};
use serde_json::json;
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

/// Identifiers of the seeded catalog
pub struct Fixture {
    pub db: SqlitePool,
    pub event: Uuid,
    pub judge: Uuid,
    /// Time, heats, final allowed, team
    pub relay: Uuid,
    /// Distance, heats, no final
    pub long_jump: Uuid,
    /// Points, no heats, no authored model
    pub shot_put: Uuid,
    pub relay_team: Uuid,
    pub relay_members: Vec<Uuid>,
}

pub async fn setup_test_db() -> Fixture {
    let db = init_memory_database()
        .await
        .expect("Should create in-memory database");
    seed(db).await
}

/// Same catalog on a pooled on-disk database, for tests that need more than
/// one connection
pub async fn setup_on_disk_db(path: &Path) -> Fixture {
    let db = init_database(path)
        .await
        .expect("Should create on-disk database");
    seed(db).await
}

async fn seed(db: SqlitePool) -> Fixture {
    let fixture = Fixture {
        db,
        event: Uuid::new_v4(),
        judge: Uuid::new_v4(),
        relay: Uuid::new_v4(),
        long_jump: Uuid::new_v4(),
        shot_put: Uuid::new_v4(),
        relay_team: Uuid::new_v4(),
        relay_members: (0..4).map(|_| Uuid::new_v4()).collect(),
    };

    let doc: CatalogDocument = serde_json::from_value(json!({
        "modalities": [
            {
                "id": fixture.relay,
                "name": "4x100m relay",
                "rule_type": "time",
                "uses_heats": true,
                "lane_count": 8,
                "allows_final_heat": true,
                "is_team": true,
                "model": {
                    "id": Uuid::new_v4(),
                    "scoring_fields": [
                        {"key": "time", "label": "Time", "required": true, "display_order": 1,
                         "input_kind": "text", "metadata": {"result_format": "time"}},
                        {"key": "lane", "label": "Lane", "required": false, "display_order": 2,
                         "input_kind": "integer", "metadata": {"min": 1, "max": 8}}
                    ]
                }
            },
            {
                "id": fixture.long_jump,
                "name": "Long jump",
                "rule_type": "distance",
                "uses_heats": true,
                "model": {
                    "id": Uuid::new_v4(),
                    "scoring_fields": [
                        {"key": "meters", "label": "m", "required": true, "display_order": 1,
                         "input_kind": "integer", "metadata": {"min": 0}},
                        {"key": "centimeters", "label": "cm", "required": false, "display_order": 2,
                         "input_kind": "integer", "metadata": {"min": 0, "max": 99}}
                    ],
                    "configuration_fields": [{"key": "attempts", "value": "3"}]
                }
            },
            {
                "id": fixture.shot_put,
                "name": "Shot put",
                "rule_type": "points"
            }
        ],
        "teams": [
            {
                "team_id": fixture.relay_team,
                "event_id": fixture.event,
                "modality_id": fixture.relay,
                "athletes": fixture.relay_members
            }
        ]
    }))
    .expect("Fixture catalog should deserialize");

    import_catalog(&fixture.db, &doc)
        .await
        .expect("Should import fixture catalog");

    fixture
}

pub async fn score_count(db: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM score_records")
        .fetch_one(db)
        .await
        .expect("Should count score records")
}

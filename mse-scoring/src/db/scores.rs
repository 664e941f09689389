//! Score record queries

use mse_common::time;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use uuid::Uuid;

use super::{optional_u32_column, optional_uuid_column, uuid_column};
use crate::error::decode_error;
use crate::model::{AttemptValues, HeatNumber, Magnitude, ScoreKey, ScoreRecord, ScoreUnit};

const RECORD_COLUMNS: &str = "guid, event_id, modality_id, athlete_id, team_id, heat_number, \
     judge_id, magnitude, unit, lane, attempt_values, notes, recorded_at";

/// Record stored under `key`
///
/// `heat_number IS ?` matches a NULL heat against a NULL bind.
pub async fn find_record(
    conn: &mut SqliteConnection,
    key: &ScoreKey,
) -> Result<Option<ScoreRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM score_records \
         WHERE event_id = ? AND modality_id = ? AND athlete_id = ? AND heat_number IS ?",
        RECORD_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(key.event_id.to_string())
        .bind(key.modality_id.to_string())
        .bind(key.athlete_id.to_string())
        .bind(key.heat_number.map(|h| i64::from(h.get())))
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Records for any of `athletes` in one event, modality and heat
pub async fn find_records_for_athletes(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    modality_id: Uuid,
    heat_number: Option<HeatNumber>,
    athletes: &[Uuid],
) -> Result<Vec<ScoreRecord>, sqlx::Error> {
    if athletes.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM score_records WHERE event_id = ",
        RECORD_COLUMNS
    ));
    query.push_bind(event_id.to_string());
    query.push(" AND modality_id = ");
    query.push_bind(modality_id.to_string());
    query.push(" AND heat_number IS ");
    query.push_bind(heat_number.map(|h| i64::from(h.get())));
    query.push(" AND athlete_id IN (");
    let mut ids = query.separated(", ");
    for athlete in athletes {
        ids.push_bind(athlete.to_string());
    }
    ids.push_unseparated(")");

    let rows = query.build().fetch_all(&mut *conn).await?;
    rows.iter().map(record_from_row).collect()
}

pub async fn insert_record(
    conn: &mut SqliteConnection,
    record: &ScoreRecord,
) -> Result<(), sqlx::Error> {
    let attempts = attempts_json(record)?;

    sqlx::query(
        r#"
        INSERT INTO score_records (
            guid, event_id, modality_id, athlete_id, team_id, heat_number,
            judge_id, magnitude, unit, lane, attempt_values, notes, recorded_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.event_id.to_string())
    .bind(record.modality_id.to_string())
    .bind(record.athlete_id.to_string())
    .bind(record.team_id.map(|t| t.to_string()))
    .bind(record.heat_number.map(|h| i64::from(h.get())))
    .bind(record.judge_id.to_string())
    .bind(record.magnitude.to_storage())
    .bind(record.unit.to_db_string())
    .bind(record.lane.map(i64::from))
    .bind(attempts)
    .bind(&record.notes)
    .bind(time::to_storage(&record.recorded_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrite the mutable columns of an existing row (matched by id)
pub async fn update_record(
    conn: &mut SqliteConnection,
    record: &ScoreRecord,
) -> Result<(), sqlx::Error> {
    let attempts = attempts_json(record)?;

    let result = sqlx::query(
        r#"
        UPDATE score_records
        SET team_id = ?, judge_id = ?, magnitude = ?, unit = ?, lane = ?,
            attempt_values = ?, notes = ?, recorded_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(record.team_id.map(|t| t.to_string()))
    .bind(record.judge_id.to_string())
    .bind(record.magnitude.to_storage())
    .bind(record.unit.to_db_string())
    .bind(record.lane.map(i64::from))
    .bind(attempts)
    .bind(&record.notes)
    .bind(time::to_storage(&record.recorded_at))
    .bind(record.id.to_string())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }

    Ok(())
}

/// Records a judge entered for an event and modality
///
/// With `heat_number` set only that heat is returned; otherwise every heat
/// (including records without a heat).
pub async fn list_records(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    modality_id: Uuid,
    judge_id: Uuid,
    heat_number: Option<HeatNumber>,
) -> Result<Vec<ScoreRecord>, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM score_records WHERE event_id = ",
        RECORD_COLUMNS
    ));
    query.push_bind(event_id.to_string());
    query.push(" AND modality_id = ");
    query.push_bind(modality_id.to_string());
    query.push(" AND judge_id = ");
    query.push_bind(judge_id.to_string());
    if let Some(heat) = heat_number {
        query.push(" AND heat_number = ");
        query.push_bind(i64::from(heat.get()));
    }
    query.push(" ORDER BY heat_number, athlete_id");

    let rows = query.build().fetch_all(&mut *conn).await?;
    rows.iter().map(record_from_row).collect()
}

fn attempts_json(record: &ScoreRecord) -> Result<String, sqlx::Error> {
    serde_json::to_string(&record.attempt_values).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

pub(crate) fn record_from_row(row: &SqliteRow) -> Result<ScoreRecord, sqlx::Error> {
    let unit_text: String = row.try_get("unit")?;
    let unit = ScoreUnit::from_str(&unit_text).ok_or_else(|| decode_error("unit", &unit_text))?;

    let magnitude_text: String = row.try_get("magnitude")?;
    let magnitude = Magnitude::from_storage(unit, &magnitude_text)
        .ok_or_else(|| decode_error("magnitude", &magnitude_text))?;

    let heat_number = match optional_u32_column(row, "heat_number")? {
        Some(n) => Some(HeatNumber::new(n).ok_or_else(|| decode_error("heat_number", n))?),
        None => None,
    };

    let attempts_text: String = row.try_get("attempt_values")?;
    let attempt_values: AttemptValues =
        serde_json::from_str(&attempts_text).map_err(|e| decode_error("attempt_values", e))?;

    let recorded_text: String = row.try_get("recorded_at")?;
    let recorded_at =
        time::from_storage(&recorded_text).ok_or_else(|| decode_error("recorded_at", &recorded_text))?;

    Ok(ScoreRecord {
        id: uuid_column(row, "guid")?,
        event_id: uuid_column(row, "event_id")?,
        modality_id: uuid_column(row, "modality_id")?,
        athlete_id: uuid_column(row, "athlete_id")?,
        team_id: optional_uuid_column(row, "team_id")?,
        heat_number,
        judge_id: uuid_column(row, "judge_id")?,
        magnitude,
        unit,
        lane: optional_u32_column(row, "lane")?,
        attempt_values,
        notes: row.try_get("notes")?,
        recorded_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttemptValue;
    use chrono::{TimeZone, Utc};
    use mse_common::db::init_memory_database;
    use mse_common::RaceTime;

    fn record(heat: Option<u32>) -> ScoreRecord {
        let mut attempt_values = AttemptValues::new();
        attempt_values.insert(
            "time".to_string(),
            AttemptValue {
                raw_value: "1:05.25".to_string(),
                formatted_value: "01:05.250".to_string(),
            },
        );
        ScoreRecord {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            modality_id: Uuid::new_v4(),
            athlete_id: Uuid::new_v4(),
            team_id: None,
            heat_number: heat.and_then(HeatNumber::new),
            judge_id: Uuid::new_v4(),
            magnitude: Magnitude::Time(RaceTime::from_parts(1, 5, 250).unwrap()),
            unit: ScoreUnit::Time,
            lane: Some(4),
            attempt_values,
            notes: Some("photo finish".to_string()),
            recorded_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let db = init_memory_database().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let rec = record(Some(2));

        insert_record(&mut conn, &rec).await.unwrap();
        let found = find_record(&mut conn, &rec.key()).await.unwrap();
        assert_eq!(found, Some(rec));
    }

    #[tokio::test]
    async fn test_null_heat_is_its_own_key() {
        let db = init_memory_database().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let rec = record(None);
        insert_record(&mut conn, &rec).await.unwrap();

        assert!(find_record(&mut conn, &rec.key()).await.unwrap().is_some());

        let mut heat_one = rec.key();
        heat_one.heat_number = HeatNumber::new(1);
        assert!(find_record(&mut conn, &heat_one).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_overwrites_in_place() {
        let db = init_memory_database().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let mut rec = record(Some(1));
        insert_record(&mut conn, &rec).await.unwrap();

        rec.magnitude = Magnitude::Time(RaceTime::from_parts(0, 59, 990).unwrap());
        rec.notes = None;
        update_record(&mut conn, &rec).await.unwrap();

        let found = find_record(&mut conn, &rec.key()).await.unwrap().unwrap();
        assert_eq!(found.magnitude.to_string(), "00:59.990");
        assert_eq!(found.notes, None);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM score_records")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let db = init_memory_database().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let result = update_record(&mut conn, &record(None)).await;
        assert!(matches!(result, Err(sqlx::Error::RowNotFound)));
    }

    #[tokio::test]
    async fn test_find_for_athletes_scopes_heat() {
        let db = init_memory_database().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let first = record(Some(1));
        let mut second = first.clone();
        second.id = Uuid::new_v4();
        second.athlete_id = Uuid::new_v4();
        let mut other_heat = first.clone();
        other_heat.id = Uuid::new_v4();
        other_heat.heat_number = HeatNumber::new(2);
        for r in [&first, &second, &other_heat] {
            insert_record(&mut conn, r).await.unwrap();
        }

        let found = find_records_for_athletes(
            &mut conn,
            first.event_id,
            first.modality_id,
            first.heat_number,
            &[first.athlete_id, second.athlete_id, Uuid::new_v4()],
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 2);

        let none = find_records_for_athletes(&mut conn, first.event_id, first.modality_id, None, &[])
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_list_records_by_judge_and_heat() {
        let db = init_memory_database().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let first = record(Some(1));
        let mut second = first.clone();
        second.id = Uuid::new_v4();
        second.heat_number = HeatNumber::new(2);
        let mut other_judge = first.clone();
        other_judge.id = Uuid::new_v4();
        other_judge.athlete_id = Uuid::new_v4();
        other_judge.judge_id = Uuid::new_v4();
        for r in [&first, &second, &other_judge] {
            insert_record(&mut conn, r).await.unwrap();
        }

        let all = list_records(&mut conn, first.event_id, first.modality_id, first.judge_id, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let heat_two = list_records(
            &mut conn,
            first.event_id,
            first.modality_id,
            first.judge_id,
            HeatNumber::new(2),
        )
        .await
        .unwrap();
        assert_eq!(heat_two.len(), 1);
        assert_eq!(heat_two[0].id, second.id);
    }
}

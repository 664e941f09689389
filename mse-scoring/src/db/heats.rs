//! Heat queries

use chrono::{DateTime, Utc};
use mse_common::time;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::error::decode_error;
use crate::model::{Heat, HeatNumber};

/// Heats of a modality, final last, with the number of scored athletes each
pub async fn list_heats(
    conn: &mut SqliteConnection,
    modality_id: Uuid,
) -> Result<Vec<Heat>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT h.number, h.created_at,
               (SELECT COUNT(DISTINCT s.athlete_id)
                FROM score_records s
                WHERE s.modality_id = h.modality_id AND s.heat_number = h.number) AS athlete_count
        FROM heats h
        WHERE h.modality_id = ?
        ORDER BY CASE WHEN h.number = ? THEN 1 ELSE 0 END, h.number
        "#,
    )
    .bind(modality_id.to_string())
    .bind(i64::from(HeatNumber::FINAL.get()))
    .fetch_all(&mut *conn)
    .await?;

    let mut heats = Vec::with_capacity(rows.len());
    for row in rows {
        let raw_number: i64 = row.try_get("number")?;
        let number = u32::try_from(raw_number)
            .ok()
            .and_then(HeatNumber::new)
            .ok_or_else(|| decode_error("number", raw_number))?;
        let created_text: String = row.try_get("created_at")?;
        let created_at = time::from_storage(&created_text)
            .ok_or_else(|| decode_error("created_at", &created_text))?;
        let athlete_count: i64 = row.try_get("athlete_count")?;

        heats.push(Heat {
            modality_id,
            number,
            display_name: number.display_name(),
            athlete_count: u32::try_from(athlete_count).unwrap_or(u32::MAX),
            created_at,
        });
    }

    Ok(heats)
}

/// Next regular heat number: highest non-final number plus one, skipping the
/// final's reserved number
pub async fn next_heat_number(
    conn: &mut SqliteConnection,
    modality_id: Uuid,
) -> Result<HeatNumber, sqlx::Error> {
    let max: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(number), 0) FROM heats WHERE modality_id = ? AND number != ?",
    )
    .bind(modality_id.to_string())
    .bind(i64::from(HeatNumber::FINAL.get()))
    .fetch_one(&mut *conn)
    .await?;

    let mut next = u32::try_from(max + 1).map_err(|e| decode_error("number", e))?;
    if next == HeatNumber::FINAL.get() {
        next += 1;
    }
    HeatNumber::new(next).ok_or_else(|| decode_error("number", next))
}

pub async fn heat_exists(
    conn: &mut SqliteConnection,
    modality_id: Uuid,
    number: HeatNumber,
) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM heats WHERE modality_id = ? AND number = ?")
            .bind(modality_id.to_string())
            .bind(i64::from(number.get()))
            .fetch_one(&mut *conn)
            .await?;
    Ok(count > 0)
}

/// Insert a heat; a duplicate `(modality, number)` surfaces as a unique violation
pub async fn insert_heat(
    conn: &mut SqliteConnection,
    modality_id: Uuid,
    number: HeatNumber,
    created_at: &DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO heats (modality_id, number, created_at) VALUES (?, ?, ?)")
        .bind(modality_id.to_string())
        .bind(i64::from(number.get()))
        .bind(time::to_storage(created_at))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::is_unique_violation;
    use mse_common::db::init_memory_database;

    #[tokio::test]
    async fn test_numbering_skips_final() {
        let db = init_memory_database().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let modality = Uuid::new_v4();
        let now = Utc::now();

        assert_eq!(next_heat_number(&mut conn, modality).await.unwrap().get(), 1);
        insert_heat(&mut conn, modality, HeatNumber::FINAL, &now).await.unwrap();
        assert_eq!(next_heat_number(&mut conn, modality).await.unwrap().get(), 1);

        insert_heat(&mut conn, modality, HeatNumber::new(998).unwrap(), &now)
            .await
            .unwrap();
        assert_eq!(next_heat_number(&mut conn, modality).await.unwrap().get(), 1000);
    }

    #[tokio::test]
    async fn test_duplicate_is_unique_violation() {
        let db = init_memory_database().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let modality = Uuid::new_v4();
        let now = Utc::now();

        insert_heat(&mut conn, modality, HeatNumber::FINAL, &now).await.unwrap();
        let err = insert_heat(&mut conn, modality, HeatNumber::FINAL, &now)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(heat_exists(&mut conn, modality, HeatNumber::FINAL).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_orders_final_last() {
        let db = init_memory_database().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let modality = Uuid::new_v4();
        let now = Utc::now();
        for n in [999, 2, 1] {
            insert_heat(&mut conn, modality, HeatNumber::new(n).unwrap(), &now)
                .await
                .unwrap();
        }

        let heats = list_heats(&mut conn, modality).await.unwrap();
        let names: Vec<&str> = heats.iter().map(|h| h.display_name.as_str()).collect();
        assert_eq!(names, vec!["1", "2", "Final"]);
        assert!(heats.iter().all(|h| h.athlete_count == 0));
    }
}
